//! Hand-written lexer producing spanned tokens.
//!
//! Identifiers may contain `.` and `$`, which is how the wasm dialect's
//! builtin names (`i64.add`, `eth.finish`) stay ordinary identifiers.

use crate::{ParseError, Span};
use alloy_primitives::{
    U256, hex,
    ruint::{BaseConvertError, ParseError as UintParseError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Ident(String),
    Number(U256),
    StringLit(String),
    HexLit(Vec<u8>),
    LBrace,
    RBrace,
    LParen,
    RParen,
    Comma,
    Arrow,
    Assign,
    Let,
    If,
    Switch,
    Case,
    Default,
    For,
    Break,
    Continue,
    Leave,
    Function,
    Object,
    Data,
    Code,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier `{name}`"),
            Token::Number(value) => format!("literal `{value}`"),
            Token::StringLit(_) => "string literal".to_string(),
            Token::HexLit(_) => "hex literal".to_string(),
            Token::LBrace => "`{`".to_string(),
            Token::RBrace => "`}`".to_string(),
            Token::LParen => "`(`".to_string(),
            Token::RParen => "`)`".to_string(),
            Token::Comma => "`,`".to_string(),
            Token::Arrow => "`->`".to_string(),
            Token::Assign => "`:=`".to_string(),
            Token::Let => "`let`".to_string(),
            Token::If => "`if`".to_string(),
            Token::Switch => "`switch`".to_string(),
            Token::Case => "`case`".to_string(),
            Token::Default => "`default`".to_string(),
            Token::For => "`for`".to_string(),
            Token::Break => "`break`".to_string(),
            Token::Continue => "`continue`".to_string(),
            Token::Leave => "`leave`".to_string(),
            Token::Function => "`function`".to_string(),
            Token::Object => "`object`".to_string(),
            Token::Data => "`data`".to_string(),
            Token::Code => "`code`".to_string(),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || c == '.'
}

fn keyword(word: &str) -> Option<Token> {
    Some(match word {
        "let" => Token::Let,
        "if" => Token::If,
        "switch" => Token::Switch,
        "case" => Token::Case,
        "default" => Token::Default,
        "for" => Token::For,
        "break" => Token::Break,
        "continue" => Token::Continue,
        "leave" => Token::Leave,
        "function" => Token::Function,
        "object" => Token::Object,
        "data" => Token::Data,
        "code" => Token::Code,
        _ => return None,
    })
}

/// Tokenizes the whole source up front; the parser indexes into the result.
pub fn tokenize(source: &str) -> Result<Vec<(Token, Span)>, ParseError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            '/' if bytes.get(i + 1) == Some(&b'*') => {
                let start = i;
                i += 2;
                loop {
                    if i + 1 >= bytes.len() {
                        return Err(ParseError::new("unterminated block comment", start..i));
                    }
                    if bytes[i] == b'*' && bytes[i + 1] == b'/' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            '{' => push_single(&mut tokens, Token::LBrace, &mut i),
            '}' => push_single(&mut tokens, Token::RBrace, &mut i),
            '(' => push_single(&mut tokens, Token::LParen, &mut i),
            ')' => push_single(&mut tokens, Token::RParen, &mut i),
            ',' => push_single(&mut tokens, Token::Comma, &mut i),
            '-' if bytes.get(i + 1) == Some(&b'>') => {
                tokens.push((Token::Arrow, i..i + 2));
                i += 2;
            }
            ':' if bytes.get(i + 1) == Some(&b'=') => {
                tokens.push((Token::Assign, i..i + 2));
                i += 2;
            }
            '"' => {
                let (token, end) = lex_string(source, i)?;
                tokens.push((Token::StringLit(token), i..end));
                i = end;
            }
            '0'..='9' => {
                let (value, end) = lex_number(source, i)?;
                tokens.push((Token::Number(value), i..end));
                i = end;
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < bytes.len() && is_ident_continue(bytes[i] as char) {
                    i += 1;
                }
                let word = &source[start..i];
                if word == "hex" && bytes.get(i) == Some(&b'"') {
                    let (literal, end) = lex_string(source, i)?;
                    if literal.len() % 2 != 0 {
                        return Err(ParseError::new(
                            "hex literal with an odd number of nibbles is ambiguous",
                            start..end,
                        ));
                    }
                    let decoded = hex::decode(&literal).map_err(|err| {
                        ParseError::new(format!("invalid hex literal: {err}"), start..end)
                    })?;
                    tokens.push((Token::HexLit(decoded), start..end));
                    i = end;
                } else {
                    let token = keyword(word).unwrap_or_else(|| Token::Ident(word.to_string()));
                    tokens.push((token, start..i));
                }
            }
            _ => {
                return Err(ParseError::new(format!("unexpected character `{c}`"), i..i + 1));
            }
        }
    }

    Ok(tokens)
}

fn push_single(tokens: &mut Vec<(Token, Span)>, token: Token, i: &mut usize) {
    tokens.push((token, *i..*i + 1));
    *i += 1;
}

fn lex_string(source: &str, start: usize) -> Result<(String, usize), ParseError> {
    let bytes = source.as_bytes();
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == b'"' {
            return Ok((source[start + 1..i].to_string(), i + 1));
        }
        i += 1;
    }
    Err(ParseError::new("unterminated string literal", start..bytes.len()))
}

fn lex_number(source: &str, start: usize) -> Result<(U256, usize), ParseError> {
    let bytes = source.as_bytes();
    let mut i = start;
    let hex = bytes[start] == b'0' && bytes.get(start + 1).is_some_and(|b| *b == b'x');
    if hex {
        i += 2;
    }
    while i < bytes.len() && (bytes[i] as char).is_ascii_alphanumeric() {
        i += 1;
    }
    let text = &source[start..i];
    let parsed = if hex {
        U256::from_str_radix(text.trim_start_matches("0x"), 16)
    } else {
        text.parse::<U256>()
    };
    let value = parsed.map_err(|err| match err {
        UintParseError::BaseConvertError(BaseConvertError::Overflow) => {
            ParseError::new(format!("literal {text:?} doesn't fit into 256 bits"), start..i)
        }
        _ => ParseError::new(format!("invalid numeric literal {text:?}"), start..i),
    })?;
    Ok((value, i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_punctuation_and_idents() {
        let tokens = tokenize("let i64.x := f(0x10, 2) -> // tail\n").unwrap();
        let kinds: Vec<Token> = tokens.into_iter().map(|(token, _)| token).collect();
        assert_eq!(kinds, vec![
            Token::Let,
            Token::Ident("i64.x".into()),
            Token::Assign,
            Token::Ident("f".into()),
            Token::LParen,
            Token::Number(U256::from(16u64)),
            Token::Comma,
            Token::Number(U256::from(2u64)),
            Token::RParen,
            Token::Arrow,
        ]);
    }

    #[test]
    fn lexes_hex_data() {
        let tokens = tokenize(r#"data "blob" hex"00ff""#).unwrap();
        assert_eq!(tokens[2].0, Token::HexLit(vec![0x00, 0xff]));
    }

    #[test]
    fn rejects_overflowing_literal() {
        let source = "0x10000000000000000000000000000000000000000000000000000000000000000";
        let err = tokenize(source).unwrap_err();
        assert!(err.to_string().contains("doesn't fit"));
    }
}
