//! String processing utilities for the datapol parser
//!
//! Quote removal, escape handling and rendering of raw atoms for error
//! messages.

use datapol_lexer::SpannedToken;

use crate::tree::{RawAtom, RawParam};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LiteralError {
    #[error("unknown escape sequence \\{0}")]
    UnknownEscape(char),
    #[error("string literal ends with a lone backslash")]
    TrailingBackslash,
}

/// Remove surrounding quotes from a string token while preserving the content
pub fn remove_quotes(text: &str) -> &str {
    if text.len() < 2 {
        return text;
    }
    let quoted = (text.starts_with('"') && text.ends_with('"'))
        || (text.starts_with('\'') && text.ends_with('\''));
    if quoted { &text[1..text.len() - 1] } else { text }
}

/// Resolve backslash escapes: `\\`, `\"`, `\'`, `\n`, `\t`, `\r`
///
/// # Errors
///
/// Returns `LiteralError` on an unknown escape or a trailing backslash
pub fn unescape(text: &str) -> Result<String, LiteralError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => return Err(LiteralError::UnknownEscape(other)),
            None => return Err(LiteralError::TrailingBackslash),
        }
    }
    Ok(out)
}

/// Contents of a string token with quotes removed and escapes resolved
///
/// # Errors
///
/// Returns `LiteralError` when the escapes are malformed
pub fn string_value(token: &SpannedToken) -> Result<String, LiteralError> {
    unescape(remove_quotes(&token.text))
}

/// Source-like rendering of a raw atom, e.g. `nova:servers(x, name=y)`
pub fn atom_str(atom: &RawAtom) -> String {
    let args = atom
        .params
        .iter()
        .map(|param| match param {
            RawParam::Positional(term) => term.0.text.clone(),
            RawParam::Named { column, term } => format!("{}={}", column.text, term.0.text),
        })
        .collect::<Vec<_>>()
        .join(",");
    format!("{}({args})", atom.relation.text())
}

#[cfg(test)]
mod tests {
    use super::*;
    use datapol_ast::Span;
    use datapol_lexer::Token;

    fn token(kind: Token, text: &str) -> SpannedToken {
        SpannedToken {
            token: kind,
            span: Span::new(0, text.len()),
            text: text.to_string(),
        }
    }

    #[test]
    fn test_remove_quotes() {
        assert_eq!(remove_quotes("\"hello\""), "hello");
        assert_eq!(remove_quotes("'hello'"), "hello");
        assert_eq!(remove_quotes("\"\""), "");
        assert_eq!(remove_quotes("hello"), "hello");
        assert_eq!(remove_quotes("\"mixed'"), "\"mixed'");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r#"a \"b\" c"#).unwrap(), "a \"b\" c");
        assert_eq!(unescape(r"tab\there").unwrap(), "tab\there");
        assert_eq!(unescape(r"back\\slash").unwrap(), "back\\slash");
        assert_eq!(unescape(r"bad\q"), Err(LiteralError::UnknownEscape('q')));
        assert_eq!(unescape("end\\"), Err(LiteralError::TrailingBackslash));
    }

    #[test]
    fn test_string_value() {
        let tok = token(Token::String, r#""on \"call\"""#);
        assert_eq!(string_value(&tok).unwrap(), "on \"call\"");
    }
}
