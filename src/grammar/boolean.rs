use logos::Logos;

/// Which literal spellings are read as booleans.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BooleanMode {
    /// Every scalar is text.
    #[default]
    Disabled,

    /// `true`, `True`, `TRUE` and `false`, `False`, `FALSE`.
    Strict,

    /// Strict spellings plus the YAML-like `yes`/`no`, `y`/`n` and `on`/`off`
    /// in lower, title and upper case.
    Extended,
}

impl From<bool> for BooleanMode {
    fn from(enabled: bool) -> Self {
        if enabled {
            BooleanMode::Extended
        } else {
            BooleanMode::Disabled
        }
    }
}

/// Lexical element of a boolean literal.
#[derive(Debug, Logos, PartialEq, Eq, Clone, Copy)]
enum BoolLex {
    #[token("true")]
    #[token("True")]
    #[token("TRUE")]
    True,

    #[token("false")]
    #[token("False")]
    #[token("FALSE")]
    False,

    #[token("yes")]
    #[token("Yes")]
    #[token("YES")]
    #[token("y")]
    #[token("Y")]
    #[token("on")]
    #[token("On")]
    #[token("ON")]
    Yes,

    #[token("no")]
    #[token("No")]
    #[token("NO")]
    #[token("n")]
    #[token("N")]
    #[token("off")]
    #[token("Off")]
    #[token("OFF")]
    No,
}

/// Decode `text` as a boolean literal. The whole text must be a single literal
/// allowed by `mode`, otherwise it stays text.
pub fn recognize(text: &str, mode: BooleanMode) -> Option<bool> {
    if mode == BooleanMode::Disabled {
        return None;
    }

    let mut lex = BoolLex::lexer(text);
    let token = lex.next()?.ok()?;
    if lex.span() != (0..text.len()) {
        return None;
    }

    match (token, mode) {
        (BoolLex::True, _) => Some(true),
        (BoolLex::False, _) => Some(false),
        (BoolLex::Yes, BooleanMode::Extended) => Some(true),
        (BoolLex::No, BooleanMode::Extended) => Some(false),
        _ => None,
    }
}
