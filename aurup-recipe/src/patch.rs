//! Assignment extraction and template-based replacement
//!
//! Only two statement shapes are recognized, without a shell grammar:
//! - scalar: `name=value`, `name='value'`, `name="value"`
//! - array: `name=(elem elem ...)`, closed by the first `)`
//!
//! A located [`Assignment`] is turned into a [`Template`]: the matched span
//! with literal braces doubled and `{}` slots where the values sit. Filling
//! the template and splicing it back over the span changes nothing but the
//! value text, so comments, quoting and layout survive.

use std::ops::Range;

use crate::{Error, Result};

/// Shape of a located assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentKind {
    Scalar {
        quote: Option<char>,
        value: Range<usize>,
    },
    Array {
        interior: Range<usize>,
        elements: Vec<Range<usize>>,
    },
}

/// A variable assignment found in recipe text.
///
/// All ranges are byte offsets into the text that was searched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment<'a> {
    pub name: String,
    pub span: Range<usize>,
    pub kind: AssignmentKind,
    text: &'a str,
}

impl<'a> Assignment<'a> {
    /// The whole matched `name=value` text.
    pub fn as_str(&self) -> &'a str {
        &self.text[self.span.clone()]
    }

    /// Scalar value without its surrounding quotes.
    ///
    /// For arrays this is the raw parenthesized interior.
    pub fn value(&self) -> &'a str {
        match &self.kind {
            AssignmentKind::Scalar { value, .. } => &self.text[value.clone()],
            AssignmentKind::Array { interior, .. } => &self.text[interior.clone()],
        }
    }

    /// Array elements without quotes. A scalar yields its single value.
    pub fn elements(&self) -> Vec<&'a str> {
        match &self.kind {
            AssignmentKind::Scalar { value, .. } => vec![&self.text[value.clone()]],
            AssignmentKind::Array { elements, .. } => elements
                .iter()
                .map(|range| &self.text[range.clone()])
                .collect(),
        }
    }

    pub fn slots(&self) -> usize {
        match &self.kind {
            AssignmentKind::Scalar { .. } => 1,
            AssignmentKind::Array { elements, .. } => elements.len(),
        }
    }

    /// Build the replacement template for this assignment.
    pub fn template(&self) -> Template {
        let slots: Vec<Range<usize>> = match &self.kind {
            AssignmentKind::Scalar { value, .. } => vec![value.clone()],
            AssignmentKind::Array { elements, .. } => elements.clone(),
        };

        let mut template = String::with_capacity(self.span.len() + 2 * slots.len());
        let mut cursor = self.span.start;
        for slot in slots {
            template.push_str(&Template::escape(&self.text[cursor..slot.start]));
            template.push_str("{}");
            cursor = slot.end;
        }
        template.push_str(&Template::escape(&self.text[cursor..self.span.end]));

        Template(template)
    }

    /// Return the full text with this assignment's values replaced.
    ///
    /// The number of values must match the number of slots.
    pub fn replace<S: AsRef<str>>(&self, values: &[S]) -> Result<String> {
        let filled = self
            .template()
            .fill(values)
            .ok_or_else(|| Error::SlotMismatch {
                name: self.name.clone(),
                slots: self.slots(),
                values: values.len(),
            })?;

        let mut out = String::with_capacity(self.text.len() + filled.len());
        out.push_str(&self.text[..self.span.start]);
        out.push_str(&filled);
        out.push_str(&self.text[self.span.end..]);
        Ok(out)
    }
}

/// Literal text with `{}` slots; literal `{` and `}` are stored doubled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template(String);

impl Template {
    fn escape(literal: &str) -> String {
        literal.replace('{', "{{").replace('}', "}}")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of `{}` slots.
    pub fn slots(&self) -> usize {
        let mut count = 0;
        let mut chars = self.0.chars().peekable();
        while let Some(c) = chars.next() {
            match (c, chars.peek()) {
                ('{', Some('{')) | ('}', Some('}')) => {
                    chars.next();
                }
                ('{', Some('}')) => {
                    chars.next();
                    count += 1;
                }
                _ => {}
            }
        }
        count
    }

    /// Substitute `values` into the slots in order.
    ///
    /// Returns `None` when the value count differs from the slot count.
    pub fn fill<S: AsRef<str>>(&self, values: &[S]) -> Option<String> {
        if values.len() != self.slots() {
            return None;
        }

        let mut out = String::with_capacity(self.0.len());
        let mut values = values.iter();
        let mut chars = self.0.chars().peekable();
        while let Some(c) = chars.next() {
            match (c, chars.peek()) {
                ('{', Some('{')) | ('}', Some('}')) => {
                    chars.next();
                    out.push(c);
                }
                ('{', Some('}')) => {
                    chars.next();
                    out.push_str(values.next()?.as_ref());
                }
                _ => out.push(c),
            }
        }
        Some(out)
    }
}

/// Find the first scalar assignment of `name`.
pub fn find_scalar<'a>(text: &'a str, name: &str) -> Result<Assignment<'a>> {
    for start in assignment_starts(text, name) {
        let value_start = start + name.len() + 1;
        if let Some((kind, end)) = scalar_at(text, value_start) {
            return Ok(Assignment {
                name: name.to_string(),
                span: start..end,
                kind,
                text,
            });
        }
    }
    Err(Error::VariableNotFound(name.to_string()))
}

/// Find the first array assignment of `name`.
pub fn find_array<'a>(text: &'a str, name: &str) -> Result<Assignment<'a>> {
    for start in assignment_starts(text, name) {
        let value_start = start + name.len() + 1;
        if let Some((kind, end)) = array_at(text, value_start) {
            return Ok(Assignment {
                name: name.to_string(),
                span: start..end,
                kind,
                text,
            });
        }
    }
    Err(Error::VariableNotFound(name.to_string()))
}

// `name=` occurrences not preceded by an identifier character, so that
// `pkgver` never matches inside `_pkgver=`.
fn assignment_starts(text: &str, name: &str) -> Vec<usize> {
    if name.is_empty() {
        return Vec::new();
    }
    let needle = format!("{}=", name);
    text.match_indices(needle.as_str())
        .map(|(idx, _)| idx)
        .filter(|&idx| {
            text[..idx]
                .chars()
                .next_back()
                .map_or(true, |c| !(c.is_ascii_alphanumeric() || c == '_'))
        })
        .collect()
}

fn scalar_at(text: &str, value_start: usize) -> Option<(AssignmentKind, usize)> {
    let rest = &text[value_start..];
    let first = rest.chars().next()?;

    if first == '\'' || first == '"' {
        let line_end = rest.find('\n').unwrap_or(rest.len());
        if let Some(close) = rest[1..line_end].find(first) {
            let value = value_start + 1..value_start + 1 + close;
            let end = value.end + 1;
            return Some((
                AssignmentKind::Scalar {
                    quote: Some(first),
                    value,
                },
                end,
            ));
        }
    }

    // Unquoted (or unterminated quote): a run of non-space, non-comment chars
    let len = rest
        .find(|c: char| c.is_whitespace() || c == '#')
        .unwrap_or(rest.len());
    if len == 0 {
        return None;
    }
    let value = value_start..value_start + len;
    let end = value.end;
    Some((AssignmentKind::Scalar { quote: None, value }, end))
}

fn array_at(text: &str, value_start: usize) -> Option<(AssignmentKind, usize)> {
    let rest = &text[value_start..];
    if !rest.starts_with('(') {
        return None;
    }
    // Nested or quoted parentheses are not supported
    let close = rest.find(')')?;
    if close == 1 {
        return None;
    }
    let interior = value_start + 1..value_start + close;
    let elements = array_elements(text, interior.clone());
    Some((AssignmentKind::Array { interior, elements }, value_start + close + 1))
}

// Quoted elements become slots; an array without any quoted element falls
// back to its whitespace-separated words.
fn array_elements(text: &str, interior: Range<usize>) -> Vec<Range<usize>> {
    let body = &text[interior.clone()];
    let base = interior.start;

    let mut quoted = Vec::new();
    let mut idx = 0;
    while idx < body.len() {
        let c = match body[idx..].chars().next() {
            Some(c) => c,
            None => break,
        };
        if c == '\'' || c == '"' {
            let after = &body[idx + 1..];
            let line_end = after.find('\n').unwrap_or(after.len());
            if let Some(close) = after[..line_end].find(c) {
                quoted.push(base + idx + 1..base + idx + 1 + close);
                idx += close + 2;
                continue;
            }
        }
        idx += c.len_utf8();
    }
    if !quoted.is_empty() {
        return quoted;
    }

    let mut words = Vec::new();
    let mut word_start = None;
    for (idx, c) in body.char_indices() {
        match (c.is_whitespace(), word_start) {
            (false, None) => word_start = Some(idx),
            (true, Some(start)) => {
                words.push(base + start..base + idx);
                word_start = None;
            }
            _ => {}
        }
    }
    if let Some(start) = word_start {
        words.push(base + start..base + body.len());
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    const PKGBUILD: &str = r#"# Maintainer: someone
pkgname=android-platform
_apilevel=30
_rev='r03'
pkgver="${_apilevel}_${_rev}"
pkgrel=2 # bumped for rebuild
arch=('any')
source=("https://dl.google.com/android/repository/platform-30_r03.zip"
        'source.properties')
sha1sums=('0123abcd'
          'ffff0000')
"#;

    #[test]
    fn test_scalar_unquoted() {
        let a = find_scalar(PKGBUILD, "_apilevel").unwrap();
        assert_eq!(a.as_str(), "_apilevel=30");
        assert_eq!(a.value(), "30");
    }

    #[test]
    fn test_scalar_quoted() {
        let a = find_scalar(PKGBUILD, "_rev").unwrap();
        assert_eq!(a.as_str(), "_rev='r03'");
        assert_eq!(a.value(), "r03");

        let a = find_scalar(PKGBUILD, "pkgver").unwrap();
        assert_eq!(a.value(), "${_apilevel}_${_rev}");
    }

    #[test]
    fn test_scalar_stops_at_comment_and_space() {
        let a = find_scalar(PKGBUILD, "pkgrel").unwrap();
        assert_eq!(a.as_str(), "pkgrel=2");

        let a = find_scalar("pkgrel=3#note\n", "pkgrel").unwrap();
        assert_eq!(a.value(), "3");
    }

    #[test]
    fn test_scalar_not_found() {
        let err = find_scalar(PKGBUILD, "_pypi_pkgname").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_name_boundary() {
        let text = "_pkgver=1.0\npkgver=2.0\n";
        let a = find_scalar(text, "pkgver").unwrap();
        assert_eq!(a.span.start, 12);
        assert_eq!(a.value(), "2.0");
    }

    #[test]
    fn test_empty_value_is_skipped() {
        let text = "pkgver=\npkgver=1.2\n";
        assert_eq!(find_scalar(text, "pkgver").unwrap().value(), "1.2");
    }

    #[test]
    fn test_scalar_template_escapes_braces() {
        let a = find_scalar(PKGBUILD, "pkgver").unwrap();
        assert_eq!(a.template().as_str(), "pkgver=\"{}\"");

        let a = find_scalar("x={a}\n", "x").unwrap();
        assert_eq!(a.template().as_str(), "x={}");

        let a = find_scalar("x='}'{\n", "x").unwrap();
        assert_eq!(a.template().as_str(), "x='{}'");
    }

    #[test]
    fn test_template_literal_braces_round_trip() {
        let text = "arr=('${a}' '{b}')\n";
        let a = find_array(text, "arr").unwrap();
        assert_eq!(a.template().as_str(), "arr=('{}' '{}')");
        assert_eq!(a.replace(&["{x}", "y"]).unwrap(), "arr=('{x}' 'y')\n");
    }

    #[test]
    fn test_scalar_replace_keeps_quotes() {
        let a = find_scalar(PKGBUILD, "_rev").unwrap();
        let out = a.replace(&["r04"]).unwrap();
        assert!(out.contains("_rev='r04'\n"));
        assert_eq!(out.len(), PKGBUILD.len());
    }

    #[test]
    fn test_replace_with_same_value_is_identity() {
        for name in ["pkgname", "_apilevel", "_rev", "pkgver", "pkgrel"] {
            let a = find_scalar(PKGBUILD, name).unwrap();
            let value = a.value().to_string();
            assert_eq!(a.replace(&[value]).unwrap(), PKGBUILD);
        }
        for name in ["arch", "source", "sha1sums"] {
            let a = find_array(PKGBUILD, name).unwrap();
            let values: Vec<String> = a.elements().iter().map(|s| s.to_string()).collect();
            assert_eq!(a.replace(&values).unwrap(), PKGBUILD);
        }
    }

    #[test]
    fn test_array_multiline() {
        let a = find_array(PKGBUILD, "source").unwrap();
        assert_eq!(
            a.elements(),
            vec![
                "https://dl.google.com/android/repository/platform-30_r03.zip",
                "source.properties"
            ]
        );
        assert_eq!(a.template().as_str(), "source=(\"{}\"\n        '{}')");
    }

    #[test]
    fn test_array_replace() {
        let text = "pkgname=foo\nsource=('http://old/a.tar.gz')\nsha256sums=('deadbeef')\n";
        let a = find_array(text, "source").unwrap();
        let text = a.replace(&["http://new/b.tar.gz"]).unwrap();
        let a = find_array(&text, "sha256sums").unwrap();
        let text = a.replace(&["cafef00d"]).unwrap();
        assert_eq!(
            text,
            "pkgname=foo\nsource=('http://new/b.tar.gz')\nsha256sums=('cafef00d')\n"
        );
    }

    #[test]
    fn test_array_unquoted_words() {
        let a = find_array("md5sums=(abc  def)\n", "md5sums").unwrap();
        assert_eq!(a.elements(), vec!["abc", "def"]);
        assert_eq!(a.template().as_str(), "md5sums=({}  {})");
    }

    #[test]
    fn test_array_empty_is_not_found() {
        assert!(find_array("source=()\n", "source").unwrap_err().is_not_found());
    }

    #[test]
    fn test_array_slot_mismatch() {
        let a = find_array(PKGBUILD, "sha1sums").unwrap();
        match a.replace(&["only-one"]) {
            Err(Error::SlotMismatch { slots, values, .. }) => {
                assert_eq!(slots, 2);
                assert_eq!(values, 1);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unterminated_quote_falls_back_to_word() {
        let a = find_scalar("x='abc\n", "x").unwrap();
        assert_eq!(a.value(), "'abc");
    }
}
