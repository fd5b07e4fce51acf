//! The bracketed list syntax shared between the text-based formats.
//!
//! Lists are written as `{item, item, ...}`: comma-separated, whitespace
//! around items ignored, string items single-quoted with doubled-quote
//! escaping, lists nestable. `{18.2, 'AB C', 22}` parses to a double, a
//! text, and an integer.

use crate::error::StreamError;
use crate::translate::{ObjectTranslator, ObjectValue};

/// Translator for the bracketed list syntax.
#[derive(Debug, Default)]
pub struct ListTranslator;

impl ObjectTranslator for ListTranslator {
    fn datatype(&self) -> &str {
        "phylostream:list"
    }

    fn to_text(&self, value: &ObjectValue) -> Result<String, StreamError> {
        match value {
            ObjectValue::List(items) => Ok(format_list(items)),
            other => Err(StreamError::invalid_object_data(format!(
                "expected a list value, got {other:?}"
            ))),
        }
    }

    fn from_text(&self, text: &str) -> Result<ObjectValue, StreamError> {
        let mut cursor = Cursor::new(text.trim());
        let value = cursor.parse_list()?;
        cursor.skip_whitespace();
        if !cursor.is_at_end() {
            return Err(StreamError::invalid_object_data(format!(
                "trailing characters after list: '{}'",
                cursor.rest()
            )));
        }
        Ok(value)
    }
}

/// Formats list items into the bracketed syntax, quoting text items that
/// contain structural characters.
pub(crate) fn format_list(items: &[ObjectValue]) -> String {
    let mut out = String::from("{");
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        match item {
            ObjectValue::Text(text) => out.push_str(&format_text_item(text)),
            ObjectValue::List(inner) => out.push_str(&format_list(inner)),
            other => out.push_str(&other.to_string()),
        }
    }
    out.push('}');
    out
}

fn format_text_item(text: &str) -> String {
    let needs_quotes = text.is_empty()
        || text
            .chars()
            .any(|c| matches!(c, ',' | '\'' | '{' | '}' | ' ' | '\t' | '\n' | '\r'));
    if needs_quotes {
        format!("'{}'", text.replace('\'', "''"))
    } else {
        text.to_string()
    }
}

// =#========================================================================#=
// LIST CURSOR (private)
// =#========================================================================#=
/// Character-level cursor for the recursive list parse.
struct Cursor<'a> {
    chars: Vec<char>,
    pos: usize,
    text: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { chars: text.chars().collect(), pos: 0, text }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn rest(&self) -> String {
        self.chars[self.pos..].iter().collect()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse_list(&mut self) -> Result<ObjectValue, StreamError> {
        self.skip_whitespace();
        if self.next() != Some('{') {
            return Err(StreamError::invalid_object_data(format!(
                "list must start with '{{': '{}'",
                self.text
            )));
        }

        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                Some('}') => {
                    self.next();
                    return Ok(ObjectValue::List(items));
                }
                None => {
                    return Err(StreamError::invalid_object_data(format!(
                        "unterminated list: '{}'",
                        self.text
                    )));
                }
                _ => {
                    items.push(self.parse_item()?);
                    self.skip_whitespace();
                    // Items are separated by commas; the closing brace ends the list
                    if !matches!(self.peek(), Some(',') | Some('}')) {
                        return Err(StreamError::invalid_object_data(format!(
                            "expected ',' or '}}' in list: '{}'",
                            self.text
                        )));
                    }
                    if self.peek() == Some(',') {
                        self.next();
                    }
                }
            }
        }
    }

    fn parse_item(&mut self) -> Result<ObjectValue, StreamError> {
        match self.peek() {
            Some('{') => self.parse_list(),
            Some('\'') => self.parse_quoted(),
            _ => self.parse_bare(),
        }
    }

    fn parse_quoted(&mut self) -> Result<ObjectValue, StreamError> {
        self.next(); // opening quote
        let mut text = String::new();
        loop {
            match self.next() {
                Some('\'') => {
                    if self.peek() == Some('\'') {
                        text.push('\'');
                        self.next();
                    } else {
                        return Ok(ObjectValue::Text(text));
                    }
                }
                Some(c) => text.push(c),
                None => {
                    return Err(StreamError::invalid_object_data(format!(
                        "unterminated quoted item: '{}'",
                        self.text
                    )));
                }
            }
        }
    }

    fn parse_bare(&mut self) -> Result<ObjectValue, StreamError> {
        let mut raw = String::new();
        while let Some(c) = self.peek() {
            if matches!(c, ',' | '}') {
                break;
            }
            raw.push(c);
            self.next();
        }
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(StreamError::invalid_object_data("empty list item"));
        }

        // Most specific numeric interpretation wins; anything else is text
        if let Ok(value) = raw.parse::<i64>() {
            return Ok(ObjectValue::Integer(value));
        }
        if let Ok(value) = raw.parse::<f64>() {
            return Ok(ObjectValue::Double(value));
        }
        match raw.to_ascii_lowercase().as_str() {
            "true" => Ok(ObjectValue::Boolean(true)),
            "false" => Ok(ObjectValue::Boolean(false)),
            _ => Ok(ObjectValue::Text(raw.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixed_list_round_trip() {
        let translator = ListTranslator;
        let value = translator.from_text("{18.2, 'AB C', 22}").unwrap();
        assert_eq!(
            value,
            ObjectValue::List(vec![
                ObjectValue::Double(18.2),
                ObjectValue::Text("AB C".to_string()),
                ObjectValue::Integer(22),
            ])
        );
        assert_eq!(translator.to_text(&value).unwrap(), "{18.2, 'AB C', 22}");
    }

    #[test]
    fn nested_lists_and_escapes() {
        let translator = ListTranslator;
        let value = translator.from_text("{{1, 2}, 'it''s'}").unwrap();
        assert_eq!(
            value,
            ObjectValue::List(vec![
                ObjectValue::List(vec![ObjectValue::Integer(1), ObjectValue::Integer(2)]),
                ObjectValue::Text("it's".to_string()),
            ])
        );
    }

    #[test]
    fn malformed_lists_are_rejected() {
        let translator = ListTranslator;
        assert!(translator.from_text("{1, 2").is_err());
        assert!(translator.from_text("1, 2}").is_err());
        assert!(translator.from_text("{1,,2}").is_err());
    }
}
