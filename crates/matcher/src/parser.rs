// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Expression parser: tokens to a compiled tree.
//!
//! Tests and boolean literals are parsed directly; the logical
//! operators are linearised with an operator stack (shunting yard,
//! `&&` binding tighter than `||`) and reduced into the final tree.

use crate::lexer::{lex, Token, TokenKind};
use crate::node::{Literal, Node, RelOp, Test, Var};
use crate::MatcherError;

pub(crate) fn parse(input: &str) -> Result<Node, MatcherError> {
    let tokens = lex(input)?;
    if tokens.is_empty() {
        return Err(MatcherError::Empty);
    }
    Parser { input, tokens, pos: 0 }.parse_expression()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackOp {
    And,
    Or,
    LParen,
}

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser<'_> {
    fn parse_expression(mut self) -> Result<Node, MatcherError> {
        let mut output: Vec<Node> = Vec::new();
        let mut ops: Vec<StackOp> = Vec::new();
        // Tracks whether the previous token completed an operand, so
        // `a && && b` and `a b` are both rejected.
        let mut have_operand = false;

        while let Some(token) = self.peek().cloned() {
            match token.kind {
                TokenKind::And | TokenKind::Or => {
                    if !have_operand {
                        return Err(self.unexpected(&token));
                    }
                    let incoming = if token.kind == TokenKind::And {
                        StackOp::And
                    } else {
                        StackOp::Or
                    };
                    while let Some(&top) = ops.last() {
                        let reduce_now = match (top, incoming) {
                            (StackOp::LParen, _) => false,
                            (StackOp::And, _) => true,
                            (StackOp::Or, StackOp::Or) => true,
                            (StackOp::Or, StackOp::And) => false,
                            (_, StackOp::LParen) => false,
                        };
                        if !reduce_now {
                            break;
                        }
                        ops.pop();
                        self.reduce(top, &mut output, &token)?;
                    }
                    ops.push(incoming);
                    self.advance();
                    have_operand = false;
                }
                TokenKind::LParen => {
                    if have_operand {
                        return Err(self.unexpected(&token));
                    }
                    ops.push(StackOp::LParen);
                    self.advance();
                }
                TokenKind::RParen => {
                    if !have_operand {
                        return Err(self.unexpected(&token));
                    }
                    loop {
                        match ops.pop() {
                            Some(StackOp::LParen) => break,
                            Some(op) => self.reduce(op, &mut output, &token)?,
                            None => return Err(self.unexpected(&token)),
                        }
                    }
                    self.advance();
                }
                _ => {
                    if have_operand {
                        return Err(self.unexpected(&token));
                    }
                    let node = self.parse_operand()?;
                    output.push(node);
                    have_operand = true;
                }
            }
        }

        let end = Token { kind: TokenKind::RParen, pos: self.input.len() };
        while let Some(op) = ops.pop() {
            if op == StackOp::LParen {
                return Err(MatcherError::Syntax {
                    token: "(".to_string(),
                    pos: self.input.len(),
                });
            }
            self.reduce(op, &mut output, &end)?;
        }
        match (output.pop(), output.is_empty()) {
            (Some(root), true) => Ok(root),
            _ => Err(self.end_of_input()),
        }
    }

    fn reduce(
        &self,
        op: StackOp,
        output: &mut Vec<Node>,
        at: &Token,
    ) -> Result<(), MatcherError> {
        let (Some(right), Some(left)) = (output.pop(), output.pop()) else {
            return Err(self.unexpected(at));
        };
        let node = match op {
            StackOp::And => Node::And(Box::new(left), Box::new(right)),
            StackOp::Or => Node::Or(Box::new(left), Box::new(right)),
            StackOp::LParen => return Err(self.unexpected(at)),
        };
        output.push(node);
        Ok(())
    }

    /// One test or boolean literal.
    fn parse_operand(&mut self) -> Result<Node, MatcherError> {
        let token = self.next_token()?;
        match &token.kind {
            TokenKind::True => Ok(Node::Bool(true)),
            TokenKind::False => Ok(Node::Bool(false)),
            TokenKind::Ident(name) => match name.as_str() {
                "Fields" => self.parse_field_test(),
                "Uuid" => self.parse_string_test(Var::Uuid),
                "Type" => self.parse_string_test(Var::MsgType),
                "Logger" => self.parse_string_test(Var::Logger),
                "Payload" => self.parse_string_test(Var::Payload),
                "EnvVersion" => self.parse_string_test(Var::EnvVersion),
                "Hostname" => self.parse_string_test(Var::Hostname),
                "Timestamp" => self.parse_numeric_test(Var::Timestamp),
                "Severity" => self.parse_numeric_test(Var::Severity),
                "Pid" => self.parse_numeric_test(Var::Pid),
                _ => Err(self.unexpected(&token)),
            },
            _ => Err(self.unexpected(&token)),
        }
    }

    fn parse_string_test(&mut self, var: Var) -> Result<Node, MatcherError> {
        let op = self.parse_relop()?;
        let token = self.next_token()?;
        let TokenKind::Str(literal) = &token.kind else {
            return Err(self.unexpected(&token));
        };
        Ok(Node::Test(Test { var, op, literal: Literal::Str(literal.clone()) }))
    }

    fn parse_numeric_test(&mut self, var: Var) -> Result<Node, MatcherError> {
        let op = self.parse_relop()?;
        let token = self.next_token()?;
        let TokenKind::Num(literal) = token.kind else {
            return Err(self.unexpected(&token));
        };
        Ok(Node::Test(Test { var, op, literal: Literal::Num(literal) }))
    }

    /// `Fields[name]`, `Fields[name][occ]`, or `Fields[name][occ][idx]`
    /// followed by a relational operator and any literal.
    fn parse_field_test(&mut self) -> Result<Node, MatcherError> {
        self.expect(TokenKind::LBracket)?;
        let token = self.next_token()?;
        let name = match &token.kind {
            TokenKind::Ident(name) => name.clone(),
            TokenKind::Str(name) => name.clone(),
            _ => return Err(self.unexpected(&token)),
        };
        self.expect(TokenKind::RBracket)?;

        let occurrence = self.parse_optional_index()?.unwrap_or(0);
        let index = self.parse_optional_index()?.unwrap_or(0);

        let op = self.parse_relop()?;
        let token = self.next_token()?;
        let literal = match &token.kind {
            TokenKind::Str(s) => Literal::Str(s.clone()),
            TokenKind::Num(n) => Literal::Num(*n),
            TokenKind::True | TokenKind::False => {
                if op != RelOp::Eq && op != RelOp::Ne {
                    return Err(self.unexpected(&token));
                }
                Literal::Bool(token.kind == TokenKind::True)
            }
            _ => return Err(self.unexpected(&token)),
        };
        Ok(Node::Test(Test { var: Var::Field { name, occurrence, index }, op, literal }))
    }

    fn parse_optional_index(&mut self) -> Result<Option<usize>, MatcherError> {
        if self.peek().map(|t| &t.kind) != Some(&TokenKind::LBracket) {
            return Ok(None);
        }
        self.advance();
        let token = self.next_token()?;
        let TokenKind::Num(value) = token.kind else {
            return Err(self.unexpected(&token));
        };
        if value < 0.0 || value.fract() != 0.0 {
            return Err(self.unexpected(&token));
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Some(value as usize))
    }

    fn parse_relop(&mut self) -> Result<RelOp, MatcherError> {
        let token = self.next_token()?;
        match token.kind {
            TokenKind::Eq => Ok(RelOp::Eq),
            TokenKind::Ne => Ok(RelOp::Ne),
            TokenKind::Gt => Ok(RelOp::Gt),
            TokenKind::Ge => Ok(RelOp::Ge),
            TokenKind::Lt => Ok(RelOp::Lt),
            TokenKind::Le => Ok(RelOp::Le),
            _ => Err(self.unexpected(&token)),
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<(), MatcherError> {
        let token = self.next_token()?;
        if token.kind == kind {
            Ok(())
        } else {
            Err(self.unexpected(&token))
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn next_token(&mut self) -> Result<Token, MatcherError> {
        let token = self.tokens.get(self.pos).cloned().ok_or_else(|| self.end_of_input())?;
        self.pos += 1;
        Ok(token)
    }

    fn unexpected(&self, token: &Token) -> MatcherError {
        MatcherError::Syntax { token: token.describe(), pos: token.pos }
    }

    fn end_of_input(&self) -> MatcherError {
        MatcherError::Syntax {
            token: "end of expression".to_string(),
            pos: self.input.len(),
        }
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
