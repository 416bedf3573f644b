// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message matcher expression language.
//!
//! A matcher is a compiled boolean expression over message header
//! variables and user fields, e.g.
//! `Type == "metric" && Fields[status] >= 500`. Compilation rejects
//! bad syntax with the offending token and byte position; evaluation
//! can never fail, it only answers true or false.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod lexer;
mod node;
mod parser;

use thiserror::Error;
use weir_core::Message;

use node::Node;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatcherError {
    #[error("syntax error at byte {pos}: unexpected {token:?}")]
    Syntax { token: String, pos: usize },
    #[error("empty matcher expression")]
    Empty,
}

/// An immutable compiled matcher expression.
pub struct MatcherSpecification {
    expression: String,
    root: Node,
}

impl MatcherSpecification {
    pub fn new(expression: &str) -> Result<Self, MatcherError> {
        let root = parser::parse(expression)?;
        Ok(Self { expression: expression.to_string(), root })
    }

    /// Evaluates the expression against a message. Left-to-right with
    /// short-circuiting; ill-typed or missing-field comparisons are
    /// false.
    pub fn is_match(&self, message: &Message) -> bool {
        self.root.eval(message)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }
}

impl std::fmt::Debug for MatcherSpecification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("MatcherSpecification").field(&self.expression).finish()
    }
}

#[cfg(test)]
#[path = "matcher_tests.rs"]
mod tests;
