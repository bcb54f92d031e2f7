//! Splits formula text into its two terms and each term into tokens.
//!
//! Only structural problems are caught here: the separator count, stray
//! brackets, and operators hanging off either end of a term.  Whether
//! the tokens make sense together is the compiler's business.

use crate::errors::CompileError;
use crate::formula::{BinaryOperator, Special, UnaryOperator};

/// One syntactic unit of a term.
#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    /// `+`, `-` or `*`.
    Binary(BinaryOperator),
    /// `a`, `r` or `i`.
    Unary(UnaryOperator),
    /// `c`, `p`, `f` or `u`.
    Special(Special),
    /// A whole `[...]` literal, brackets included, not yet looked inside.
    Bracketed(String),
    /// A run of characters that ought to be a number.
    Literal(String),
}

/// Separates the first term from the rule for the next term.
pub fn split_formula(raw: &str) -> Result<(&str, &str), CompileError> {
    let mut parts = raw.split(';');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(first), Some(next), None) => Ok((first, next)),
        (_, None, _) => Err(CompileError::MissingSeparator),
        _ => Err(CompileError::ExtraSeparator),
    }
}

/// Tokenizes both terms of a formula.
pub fn tokenize_formula(raw: &str) -> Result<(Vec<Token>, Vec<Token>), CompileError> {
    let (first, next) = split_formula(raw)?;
    if let Some(c) = first.chars().find(|c| *c == 'f' || *c == 'p') {
        return Err(CompileError::SpecialReferenceInFirstTerm(c));
    }
    Ok((tokenize_term(first)?, tokenize_term(next)?))
}

fn flush(literal: &mut String, tokens: &mut Vec<Token>) {
    if !literal.is_empty() {
        tokens.push(Token::Literal(std::mem::replace(literal, String::new())));
    }
}

/// Tokenizes a single term (or one half of a bracketed literal).
pub fn tokenize_term(text: &str) -> Result<Vec<Token>, CompileError> {
    let chars: Vec<char> = text.chars().collect();
    let last = chars.len().saturating_sub(1);
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut bracket: Option<String> = None;

    for (pos, &ch) in chars.iter().enumerate() {
        if let Some(capture) = bracket.as_mut() {
            match ch {
                '[' => return Err(CompileError::NestedBracket),
                ']' => {
                    capture.push(ch);
                    tokens.push(Token::Bracketed(std::mem::replace(capture, String::new())));
                    bracket = None;
                }
                _ => capture.push(ch),
            }
            continue;
        }

        if ch == '[' {
            flush(&mut literal, &mut tokens);
            bracket = Some(ch.to_string());
        } else if ch == ']' {
            return Err(CompileError::UnmatchedCloseBracket);
        } else if let Some(op) = BinaryOperator::from_symbol(ch) {
            if pos == 0 {
                return Err(CompileError::LeadingBinaryOperator(ch));
            }
            if pos == last {
                return Err(CompileError::TrailingBinaryOperator(ch));
            }
            flush(&mut literal, &mut tokens);
            tokens.push(Token::Binary(op));
        } else if let Some(op) = UnaryOperator::from_symbol(ch) {
            if pos == last {
                return Err(CompileError::TrailingUnaryOperator(ch));
            }
            flush(&mut literal, &mut tokens);
            tokens.push(Token::Unary(op));
        } else if let Some(special) = Special::from_symbol(ch) {
            flush(&mut literal, &mut tokens);
            tokens.push(Token::Special(special));
        } else {
            literal.push(ch);
        }
    }

    if bracket.is_some() {
        return Err(CompileError::UnbalancedBracket);
    }
    flush(&mut literal, &mut tokens);
    Ok(tokens)
}
