use crate::{FilterParseError, FilterToken, TokenKind};

/// Lines of a filter as they are displayed, produced lazily.
///
/// Every token is appended to the current line followed by a space. A
/// condition token starts a new line, unless the current line is still
/// empty. Each line is trimmed when it is emitted.
#[derive(Debug, Clone)]
pub struct FilterLines<'a> {
    tokens: std::slice::Iter<'a, FilterToken>,
    current: String,
}

pub fn display_lines(tokens: &[FilterToken]) -> FilterLines<'_> {
    FilterLines {
        tokens: tokens.iter(),
        current: String::new(),
    }
}

impl Iterator for FilterLines<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        for token in self.tokens.by_ref() {
            if token.kind == TokenKind::Condition && !self.current.is_empty() {
                let line = self.current.trim().to_string();
                self.current.clear();
                self.current.push_str(&token.text);
                self.current.push(' ');
                return Some(line);
            }
            self.current.push_str(&token.text);
            self.current.push(' ');
        }

        if self.current.is_empty() {
            return None;
        }
        let line = self.current.trim().to_string();
        self.current.clear();
        Some(line)
    }
}

/// Kind of the first token whose text is exactly `word`.
pub fn kind_of_word(tokens: &[FilterToken], word: &str) -> Option<TokenKind> {
    tokens.iter().find(|t| t.text == word).map(|t| t.kind)
}

fn parse_kind(word: &str) -> Option<TokenKind> {
    match word.to_lowercase().as_str() {
        "c" | "cond" | "condition" => Some(TokenKind::Condition),
        "o" | "op" | "operator" => Some(TokenKind::Operator),
        "v" | "val" | "value" => Some(TokenKind::Value),
        _ => None,
    }
}

/// Parse a compact filter description:
/// `c tags | o contains | v onsale`
///
/// Segments are separated by `|`, each starts with its kind (`c`, `o`, `v`
/// or the long names) followed by the text, which may contain spaces.
pub fn parse_filter_spec(spec: &str) -> Result<Vec<FilterToken>, FilterParseError> {
    if spec.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut out = Vec::new();
    for (i, segment) in spec.split('|').enumerate() {
        let segment = segment.trim();
        if segment.is_empty() {
            return Err(FilterParseError::EmptySegment(i));
        }

        let (kind_word, text) = match segment.split_once(char::is_whitespace) {
            Some((k, t)) => (k, t.trim()),
            None => (segment, ""),
        };

        let kind = parse_kind(kind_word)
            .ok_or_else(|| FilterParseError::UnknownKind(kind_word.to_string()))?;
        if text.is_empty() {
            return Err(FilterParseError::MissingText(kind_word.to_string()));
        }

        out.push(FilterToken::new(text, kind));
    }

    Ok(out)
}
