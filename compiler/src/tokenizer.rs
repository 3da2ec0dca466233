use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ConvertError;
use crate::utils::quote;

lazy_static! {
    pub static ref TOKEN_REGEX: Regex = Regex::new(
        r#"(\.\.\.|<-|[A-Za-z_][A-Za-z0-9_]*|\d+|[()\[\]{},.*&;:=<>!~^|+\-/%]|"(?:[^"\\]|\\.)*"|`[^`]*`|\s+)"#
    )
    .unwrap();
}

/// A signature token with its byte span in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub text:  String,
    pub start: usize,
    pub end:   usize,
}

impl Token {
    pub fn is_identifier(&self) -> bool {
        self.text
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
    }

    pub fn column(&self) -> usize {
        self.start + 1
    }
}

pub fn parse_error(msg: String, column: usize) -> ConvertError {
    ConvertError::ParseError { msg, column }
}

/// Splits a function signature into tokens, dropping whitespace.
pub fn tokenize_signature(text: &str) -> Result<Vec<Token>, ConvertError> {
    let mut tokens = Vec::new();
    let mut last_end = 0;

    for mat in TOKEN_REGEX.find_iter(text) {
        if mat.start() > last_end {
            let unexpected = &text[last_end..mat.start()];
            return Err(parse_error(format!("Syntax error: {}", quote(unexpected)), last_end + 1));
        }

        if !mat.as_str().trim().is_empty() {
            tokens.push(Token {
                text:  mat.as_str().to_string(),
                start: mat.start(),
                end:   mat.end(),
            });
        }
        last_end = mat.end();
    }

    if last_end != text.len() {
        let unexpected = &text[last_end..];
        return Err(parse_error(format!("Syntax error: {}", quote(unexpected)), last_end + 1));
    }

    Ok(tokens)
}
