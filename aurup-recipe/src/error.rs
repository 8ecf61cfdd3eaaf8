use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Variable \"{0}\" not found in the recipe")]
    VariableNotFound(String),

    #[error("Array \"{name}\" has {slots} slot(s) but {values} value(s) were given")]
    SlotMismatch {
        name: String,
        slots: usize,
        values: usize,
    },

    #[error("vercmp failed: {0}")]
    Vercmp(String),
}

impl Error {
    /// Whether this error only means the recipe lacks an optional field.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::VariableNotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
