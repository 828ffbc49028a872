use serde::Serialize;

/// A marker in the source text, containing the byte index, 1-based line number,
/// and 0-based column (in characters).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Pos {
    index: usize,
    line: usize,
    column: usize,
}

impl Pos {
    /// Position of the very first character of a document.
    pub const START: Self = Self {
        index: 0,
        line: 1,
        column: 0,
    };

    pub fn new(index: usize, line: usize, column: usize) -> Self {
        Self {
            index,
            line,
            column,
        }
    }

    /// Locate `index` in `text`. Indexes past the end are clamped to the length
    /// of the text, and indexes inside a multi-byte character snap back to its start.
    pub fn from_str_index(text: &str, index: usize) -> Self {
        let mut index = index.min(text.len());
        while !text.is_char_boundary(index) {
            index -= 1;
        }

        let before = &text[..index];
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        Self {
            index,
            line: before.matches('\n').count() + 1,
            column: before[line_start..].chars().count(),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    /// Position reached after reading `text` starting from this position.
    pub fn advance(self, text: &str) -> Self {
        let column = match text.rfind('\n') {
            Some(i) => text[i + 1..].chars().count(),
            None => self.column + text.chars().count(),
        };
        Self {
            index: self.index + text.len(),
            line: self.line + text.matches('\n').count(),
            column,
        }
    }
}

/// Decoded value of a scalar: its text, or a boolean when the boolean
/// literals are enabled and the text spells one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Str(String),
    Bool(bool),
}

impl Scalar {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            Scalar::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            Scalar::Str(_) => None,
        }
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Str(s) => s.fmt(f),
            Scalar::Bool(b) => b.fmt(f),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_owned())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// A labeled slice of the source text together with its decoded value.
///
/// Two sources are equal when their text and value are equal, wherever they
/// are located. This lets spans serve as mapping keys with the same
/// last-write-wins behavior as their plain values.
#[derive(Clone, Serialize)]
pub struct Source {
    filename: Option<String>,
    start: Pos,
    end: Pos,
    text: String,
    value: Scalar,
}

impl Source {
    pub fn new(
        filename: Option<String>,
        start: Pos,
        end: Pos,
        text: String,
        value: Scalar,
    ) -> Self {
        Self {
            filename,
            start,
            end,
            text,
            value,
        }
    }

    /// Span of `text` starting at `start`, its value being the text itself.
    pub fn text_at(filename: Option<String>, start: Pos, text: &str) -> Self {
        Self::new(
            filename,
            start,
            start.advance(text),
            text.to_owned(),
            Scalar::Str(text.to_owned()),
        )
    }

    /// Span of the first occurrence of `needle` within `document`.
    pub fn locate(document: &str, needle: &str) -> Option<Self> {
        let index = document.find(needle)?;
        let start = Pos::from_str_index(document, index);
        Some(Self::text_at(None, start, needle))
    }

    /// Replace the decoded value, keeping the text and location.
    pub fn with_value(mut self, value: impl Into<Scalar>) -> Self {
        self.value = value.into();
        self
    }

    pub fn with_filename(mut self, filename: Option<String>) -> Self {
        self.filename = filename;
        self
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn start(&self) -> Pos {
        self.start
    }

    pub fn end(&self) -> Pos {
        self.end
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn value(&self) -> &Scalar {
        &self.value
    }

    pub fn into_value(self) -> Scalar {
        self.value
    }

    /// The value as it reads in a joined multi-line scalar. Booleans keep their literal
    /// spelling so that `yes` stays `yes` when followed by a continuation line.
    fn value_text(&self) -> &str {
        match &self.value {
            Scalar::Str(s) => s,
            Scalar::Bool(_) => &self.text,
        }
    }

    fn joined(&self, text: &str, value: &str) -> (String, Scalar) {
        let text = format!("{}\n{}", self.text, text);
        let value = Scalar::Str(format!("{}\n{}", self.value_text(), value));
        (text, value)
    }

    /// Human readable location and text, as used in diagnostics.
    pub fn describe(&self) -> String {
        let filename = self
            .filename
            .as_deref()
            .map(|f| format!("{f}, "))
            .unwrap_or_default();
        format!(
            "<Source: {filename}Line {}, Column {} (index {}): {:?}>",
            self.start.line, self.start.column, self.start.index, self.text
        )
    }
}

impl std::ops::Add<&Source> for &Source {
    type Output = Source;

    fn add(self, other: &Source) -> Source {
        let (text, value) = self.joined(&other.text, other.value_text());
        Source {
            filename: self.filename.clone(),
            start: self.start,
            end: other.end,
            text,
            value,
        }
    }
}

impl std::ops::Add<&Source> for Source {
    type Output = Source;

    fn add(mut self, other: &Source) -> Source {
        if let Scalar::Bool(_) = self.value {
            self.value = Scalar::Str(self.text.clone());
        }
        if let Scalar::Str(value) = &mut self.value {
            value.push('\n');
            value.push_str(other.value_text());
        }
        self.text.push('\n');
        self.text.push_str(&other.text);
        self.end = other.end;
        self
    }
}

impl std::ops::Add<&str> for &Source {
    type Output = Source;

    /// Append a raw line of text, placed right after a line break following this span.
    fn add(self, other: &str) -> Source {
        let (text, value) = self.joined(other, other);
        Source {
            filename: self.filename.clone(),
            start: self.start,
            end: self.end.advance("\n").advance(other),
            text,
            value,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.text.fmt(f)
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:?})", self.describe(), self.value)
    }
}

impl std::cmp::PartialEq for Source {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text && self.value == other.value
    }
}

impl std::cmp::Eq for Source {}

impl std::hash::Hash for Source {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.text.hash(state);
    }
}

impl AsRef<str> for Source {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

/// Return the line of `text` containing byte `index`, without its line terminator.
pub fn line_at(text: &str, index: usize) -> &str {
    let index = Pos::from_str_index(text, index).index;
    let start = text[..index].rfind('\n').map_or(0, |i| i + 1);
    let end = text[index..].find('\n').map_or(text.len(), |i| index + i);
    &text[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "\n\nfoo\n    bar\n        baz blah blargh\nboo\n";

    #[test]
    fn pos_at_start_of_line() {
        let start = TEXT.find("foo").unwrap();
        assert_eq!(Pos::from_str_index(TEXT, start), Pos::new(start, 3, 0));
    }

    #[test]
    fn pos_of_indented_text() {
        let start = TEXT.find("bar").unwrap();
        assert_eq!(Pos::from_str_index(TEXT, start), Pos::new(start, 4, 4));
    }

    #[test]
    fn pos_of_midline_text() {
        let start = TEXT.find("blah").unwrap();
        assert_eq!(Pos::from_str_index(TEXT, start), Pos::new(start, 5, 12));
    }

    #[test]
    fn pos_past_the_end_is_clamped() {
        let pos = Pos::from_str_index(TEXT, TEXT.len() + 5);
        assert_eq!(pos, Pos::new(TEXT.len(), 7, 0));
    }

    #[test]
    fn pos_counts_columns_in_chars() {
        let text = "é: ü";
        let start = text.find('ü').unwrap();
        assert_eq!(Pos::from_str_index(text, start), Pos::new(start, 1, 3));
    }

    #[test]
    fn advance_over_lines() {
        let pos = Pos::new(3, 2, 2).advance("foo\n  baz");
        assert_eq!(pos, Pos::new(12, 3, 5));
    }

    #[test]
    fn describe_source() {
        let text = "\n- foo\n- bar\n- baz\n";
        let source = Source::locate(text, "foo")
            .unwrap()
            .with_filename(Some("foo.txt".to_owned()));
        assert_eq!(source.start(), Pos::new(3, 2, 2));
        assert_eq!(source.end(), Pos::new(6, 2, 5));
        assert_eq!(
            source.describe(),
            "<Source: foo.txt, Line 2, Column 2 (index 3): \"foo\">"
        );
        assert_eq!(source.to_string(), "foo");
    }

    #[test]
    fn add_more_text() {
        let text = "\n- foo\n- bar\n  baz\n";
        let source = Source::locate(text, "foo").unwrap();
        let joined = &source + "  baz";

        assert_eq!(joined.text(), "foo\n  baz");
        assert_eq!(joined.value(), &Scalar::from("foo\n  baz"));
        assert_eq!(joined.start(), source.start());
        assert_eq!(joined.end(), Pos::new(12, 3, 5));
        // Operands are left untouched.
        assert_eq!(source.text(), "foo");
    }

    #[test]
    fn add_more_source() {
        let text = "\n- foo\n- bar\n  baz\n";
        let foo = Source::locate(text, "foo").unwrap();
        let baz = Source::locate(text, "baz").unwrap();

        let joined = &foo + &baz;
        assert_eq!(joined.text(), "foo\nbaz");
        assert_eq!(joined.start(), Pos::new(3, 2, 2));
        assert_eq!(joined.end(), Pos::new(18, 4, 5));

        let owned = foo.clone() + &baz;
        assert_eq!(owned, joined);
        assert_eq!(owned.end(), joined.end());
    }

    #[test]
    fn joining_a_boolean_keeps_its_spelling() {
        let yes = Source::locate("yes\nmore", "yes").unwrap().with_value(true);
        let more = Source::locate("yes\nmore", "more").unwrap();

        assert_eq!((&yes + &more).value(), &Scalar::from("yes\nmore"));
        assert_eq!((yes + &more).value(), &Scalar::from("yes\nmore"));
    }

    #[test]
    fn equality_ignores_location() {
        let text = "foo\nfoo\n";
        let first = Source::locate(text, "foo").unwrap();
        let second = Source::text_at(None, Pos::new(4, 2, 0), "foo");
        assert_eq!(first, second);
        assert_ne!(first, second.clone().with_value(true));
    }

    #[test]
    fn line_lookup() {
        assert_eq!(line_at(TEXT, TEXT.find("blah").unwrap()), "        baz blah blargh");
        assert_eq!(line_at(TEXT, TEXT.len() + 10), "");
        assert_eq!(line_at("last", 2), "last");
    }
}
