//! Recursive-descent parser over the token stream.

use crate::{
    ParseError, Span,
    lexer::{Token, tokenize},
};
use alloy_primitives::U256;
use sasm_data::{
    Assignment, Block, Case, Data, Expression, ForLoop, FunctionCall, FunctionDefinition,
    Identifier, If, Literal, Object, ObjectMember, Statement, Switch, VariableDeclaration,
};

/// Parses a bare block, e.g. the polyfill text.
pub fn parse_block(source: &str) -> Result<Block, ParseError> {
    let mut parser = Parser::new(source)?;
    let block = parser.block()?;
    parser.expect_eof()?;
    Ok(block)
}

/// Parses an `object "name" { code { ... } ... }` tree.
pub fn parse_object(source: &str) -> Result<Object, ParseError> {
    let mut parser = Parser::new(source)?;
    let object = parser.object()?;
    parser.expect_eof()?;
    Ok(object)
}

/// Parses either an object or a bare block; a bare block is wrapped into an
/// object named `"object"`.
pub fn parse_program(source: &str) -> Result<Object, ParseError> {
    let mut parser = Parser::new(source)?;
    let object = match parser.peek() {
        Some(Token::Object) => parser.object()?,
        _ => Object::new("object", parser.block()?),
    };
    parser.expect_eof()?;
    Ok(object)
}

struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
    source_len: usize,
}

impl Parser {
    fn new(source: &str) -> Result<Self, ParseError> {
        Ok(Self { tokens: tokenize(source)?, pos: 0, source_len: source.len() })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| span.clone())
            .unwrap_or(self.source_len..self.source_len)
    }

    fn bump(&mut self) -> Option<(Token, Span)> {
        let entry = self.tokens.get(self.pos).cloned();
        if entry.is_some() {
            self.pos += 1;
        }
        entry
    }

    fn error(&self, expected: &str) -> ParseError {
        let message = match self.peek() {
            Some(token) => format!("expected {expected}, found {}", token.describe()),
            None => format!("expected {expected}, found end of input"),
        };
        ParseError::new(message, self.peek_span())
    }

    fn expect(&mut self, token: Token, expected: &str) -> Result<Span, ParseError> {
        match self.peek() {
            Some(found) if *found == token => Ok(self.bump().expect("peeked").1),
            _ => Err(self.error(expected)),
        }
    }

    fn expect_eof(&self) -> Result<(), ParseError> {
        if self.pos == self.tokens.len() { Ok(()) } else { Err(self.error("end of input")) }
    }

    fn ident(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Ident(_)) => {
                let Some((Token::Ident(name), _)) = self.bump() else { unreachable!() };
                Ok(name)
            }
            _ => Err(self.error("an identifier")),
        }
    }

    fn number(&mut self) -> Result<U256, ParseError> {
        match self.peek() {
            Some(Token::Number(_)) => {
                let Some((Token::Number(value), _)) = self.bump() else { unreachable!() };
                Ok(value)
            }
            _ => Err(self.error("a numeric literal")),
        }
    }

    fn string_lit(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::StringLit(_)) => {
                let Some((Token::StringLit(value), _)) = self.bump() else { unreachable!() };
                Ok(value)
            }
            _ => Err(self.error("a string literal")),
        }
    }

    fn ident_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = vec![self.ident()?];
        while self.peek() == Some(&Token::Comma) {
            self.bump();
            names.push(self.ident()?);
        }
        Ok(names)
    }

    fn block(&mut self) -> Result<Block, ParseError> {
        self.expect(Token::LBrace, "`{`")?;
        let mut statements = Vec::new();
        while self.peek() != Some(&Token::RBrace) {
            if self.peek().is_none() {
                return Err(self.error("`}`"));
            }
            statements.push(self.statement()?);
        }
        self.bump();
        Ok(Block { statements })
    }

    fn statement(&mut self) -> Result<Statement, ParseError> {
        match self.peek() {
            Some(Token::LBrace) => Ok(Statement::Block(self.block()?)),
            Some(Token::Let) => {
                self.bump();
                let variables = self.ident_list()?;
                let value = if self.peek() == Some(&Token::Assign) {
                    self.bump();
                    Some(self.expression()?)
                } else {
                    None
                };
                Ok(Statement::VariableDeclaration(VariableDeclaration { variables, value }))
            }
            Some(Token::If) => {
                self.bump();
                let condition = self.expression()?;
                let body = self.block()?;
                Ok(Statement::If(If { condition, body }))
            }
            Some(Token::Switch) => self.switch(),
            Some(Token::For) => {
                self.bump();
                let pre = self.block()?;
                let condition = self.expression()?;
                let post = self.block()?;
                let body = self.block()?;
                Ok(Statement::ForLoop(ForLoop { pre, condition, post, body }))
            }
            Some(Token::Break) => {
                self.bump();
                Ok(Statement::Break)
            }
            Some(Token::Continue) => {
                self.bump();
                Ok(Statement::Continue)
            }
            Some(Token::Leave) => {
                self.bump();
                Ok(Statement::Leave)
            }
            Some(Token::Function) => self.function_definition(),
            Some(Token::Ident(_)) => {
                let first = self.ident()?;
                if self.peek() == Some(&Token::LParen) {
                    return Ok(Statement::Expression(self.call_with(first)?));
                }
                let mut targets = vec![first];
                while self.peek() == Some(&Token::Comma) {
                    self.bump();
                    targets.push(self.ident()?);
                }
                self.expect(Token::Assign, "`:=`")?;
                let value = self.expression()?;
                Ok(Statement::Assignment(Assignment { targets, value }))
            }
            _ => Err(self.error("a statement")),
        }
    }

    fn switch(&mut self) -> Result<Statement, ParseError> {
        self.bump();
        let expression = self.expression()?;
        let mut cases = Vec::new();
        while self.peek() == Some(&Token::Case) {
            self.bump();
            let value = Literal { value: self.number()? };
            let body = self.block()?;
            cases.push(Case { value, body });
        }
        let default = if self.peek() == Some(&Token::Default) {
            self.bump();
            Some(self.block()?)
        } else {
            None
        };
        if cases.is_empty() && default.is_none() {
            return Err(self.error("`case` or `default`"));
        }
        Ok(Statement::Switch(Switch { expression, cases, default }))
    }

    fn function_definition(&mut self) -> Result<Statement, ParseError> {
        self.bump();
        let name = self.ident()?;
        self.expect(Token::LParen, "`(`")?;
        let parameters = if self.peek() == Some(&Token::RParen) {
            Vec::new()
        } else {
            self.ident_list()?
        };
        self.expect(Token::RParen, "`)`")?;
        let returns = if self.peek() == Some(&Token::Arrow) {
            self.bump();
            self.ident_list()?
        } else {
            Vec::new()
        };
        let body = self.block()?;
        Ok(Statement::FunctionDefinition(FunctionDefinition { name, parameters, returns, body }))
    }

    fn expression(&mut self) -> Result<Expression, ParseError> {
        match self.peek() {
            Some(Token::Number(_)) => Ok(Expression::Literal(Literal { value: self.number()? })),
            Some(Token::Ident(_)) => {
                let name = self.ident()?;
                if self.peek() == Some(&Token::LParen) {
                    Ok(Expression::FunctionCall(self.call_with(name)?))
                } else {
                    Ok(Expression::Identifier(Identifier { name }))
                }
            }
            _ => Err(self.error("an expression")),
        }
    }

    fn call_with(&mut self, name: String) -> Result<FunctionCall, ParseError> {
        self.expect(Token::LParen, "`(`")?;
        let mut arguments = Vec::new();
        if self.peek() != Some(&Token::RParen) {
            arguments.push(self.expression()?);
            while self.peek() == Some(&Token::Comma) {
                self.bump();
                arguments.push(self.expression()?);
            }
        }
        self.expect(Token::RParen, "`)`")?;
        Ok(FunctionCall { name, arguments })
    }

    fn object(&mut self) -> Result<Object, ParseError> {
        self.expect(Token::Object, "`object`")?;
        let name = self.string_lit()?;
        self.expect(Token::LBrace, "`{`")?;
        self.expect(Token::Code, "`code`")?;
        let code = self.block()?;
        let mut object = Object::new(name, code);
        loop {
            match self.peek() {
                Some(Token::Object) => {
                    let subobject = self.object()?;
                    object.push_member(ObjectMember::Object(subobject));
                }
                Some(Token::Data) => {
                    self.bump();
                    let name = self.string_lit()?;
                    let contents = match self.peek() {
                        Some(Token::HexLit(_)) => {
                            let Some((Token::HexLit(bytes), _)) = self.bump() else {
                                unreachable!()
                            };
                            bytes
                        }
                        Some(Token::StringLit(_)) => self.string_lit()?.into_bytes(),
                        _ => return Err(self.error("a hex or string literal")),
                    };
                    object.push_member(ObjectMember::Data(Data { name, contents }));
                }
                Some(Token::RBrace) => {
                    self.bump();
                    return Ok(object);
                }
                _ => return Err(self.error("`object`, `data` or `}`")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_text_eq;

    fn round_trip(source: &str) {
        let block = parse_block(source).expect("parse failed");
        assert_text_eq(&block.to_string(), source, "Round-tripped block");
    }

    #[test]
    fn parses_and_round_trips_statements() {
        round_trip(
            r#"
{
    let x := add(1, 2)
    let y, z := f(x)
    y := 0x10000
    if i64.eqz(x) {
        pop(x)
    }
    for { } 1 { } {
        break
    }
    function f(a) -> r1, r2 {
        leave
    }
}
"#,
        );
    }

    #[test]
    fn parses_switch() {
        let block = parse_block(
            r#"
{
    switch calldatasize()
    case 0 { }
    case 1 {
        pop(1)
    }
    default {
        pop(2)
    }
}
"#,
        )
        .unwrap();
        let Statement::Switch(switch) = &block.statements[0] else {
            panic!("expected a switch");
        };
        assert_eq!(switch.cases.len(), 2);
        assert!(switch.default.is_some());
    }

    #[test]
    fn parses_objects_with_members() {
        let object = parse_object(
            r#"
object "root" {
    code {
        let x := 1
    }
    object "child" {
        code { }
    }
    data "blob" hex"c0ffee"
}
"#,
        )
        .unwrap();
        assert_eq!(object.name, "root");
        assert_eq!(object.subobjects.len(), 2);
        assert_eq!(object.sub_index_by_name["child"], 0);
        assert_eq!(object.sub_index_by_name["blob"], 1);
        let ObjectMember::Data(data) = &object.subobjects[1] else {
            panic!("expected data member");
        };
        assert_eq!(data.contents, vec![0xc0, 0xff, 0xee]);
    }

    #[test]
    fn reports_missing_brace() {
        let err = parse_block("{ let x := 1 ").unwrap_err();
        assert!(err.to_string().contains("expected `}`"), "{err}");
    }
}
