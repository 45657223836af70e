//! Operator-precedence conversion to postfix order and well-formedness checking
//!
//! Precedence, highest first:
//!
//! ```text
//! !    unary, right-associative
//! &    binary, left-associative
//! |    binary, left-associative
//! ```
//!
//! Parentheses override precedence and must balance.

use std::fmt;

use super::lexer::Token;
use crate::error::QuarryError;
use crate::Result;

/// A validated boolean expression in postfix order.
///
/// Only built through [`PostfixExpr::from_tokens`], so the token sequence
/// always reduces to exactly one operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostfixExpr {
    tokens: Vec<Token>,
    term_count: usize,
}

impl PostfixExpr {
    /// Convert infix tokens to postfix order and validate the result
    pub fn from_tokens(tokens: Vec<Token>) -> Result<Self> {
        let postfix = to_postfix(tokens)?;
        let term_count = check(&postfix)?;
        Ok(Self {
            tokens: postfix,
            term_count,
        })
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of atomic terms; phrase words count individually
    pub fn term_count(&self) -> usize {
        self.term_count
    }

    /// Leaf tokens in expression order
    pub fn leaves(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter().filter(|t| t.is_leaf())
    }

    /// Fully parenthesized infix form that compiles back to this expression
    pub fn to_infix(&self) -> String {
        let mut stack: Vec<String> = Vec::new();

        for token in &self.tokens {
            match token {
                Token::Not => {
                    if let Some(operand) = stack.pop() {
                        stack.push(format!("!({})", operand));
                    }
                }
                Token::And | Token::Or => {
                    if let (Some(right), Some(left)) = (stack.pop(), stack.pop()) {
                        stack.push(format!("({} {} {})", left, token, right));
                    }
                }
                leaf => stack.push(leaf.to_string()),
            }
        }

        stack.pop().unwrap_or_default()
    }
}

impl fmt::Display for PostfixExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.tokens.iter().map(Token::to_string).collect();
        write!(f, "{}", parts.join(" "))
    }
}

/// Shunting-yard conversion of infix tokens to postfix order.
///
/// Fails on unbalanced parentheses; operator arity is checked separately by [`check`].
pub fn to_postfix(tokens: Vec<Token>) -> Result<Vec<Token>> {
    let mut output = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    for token in tokens {
        match token {
            Token::Term(_) | Token::Phrase { .. } => output.push(token),
            Token::LeftParen => stack.push(token),
            Token::RightParen => loop {
                match stack.pop() {
                    Some(Token::LeftParen) => break,
                    Some(op) => output.push(op),
                    None => {
                        return Err(QuarryError::MalformedExpression(
                            "unmatched ')'".to_string(),
                        ))
                    }
                }
            },
            Token::And | Token::Or | Token::Not => {
                let right_assoc = token == Token::Not;
                while let Some(top) = stack.last() {
                    if *top == Token::LeftParen {
                        break;
                    }
                    let pops = if right_assoc {
                        top.precedence() > token.precedence()
                    } else {
                        top.precedence() >= token.precedence()
                    };
                    if !pops {
                        break;
                    }
                    if let Some(op) = stack.pop() {
                        output.push(op);
                    }
                }
                stack.push(token);
            }
        }
    }

    while let Some(op) = stack.pop() {
        if matches!(op, Token::LeftParen | Token::RightParen) {
            return Err(QuarryError::MalformedExpression(
                "unmatched '('".to_string(),
            ));
        }
        output.push(op);
    }

    Ok(output)
}

/// Simulate a postfix sequence on an operand stack.
///
/// Returns the number of atomic terms when exactly one operand remains.
pub fn check(postfix: &[Token]) -> Result<usize> {
    let mut operands = 0usize;
    let mut term_count = 0usize;

    for (i, token) in postfix.iter().enumerate() {
        match token {
            Token::And | Token::Or => {
                if operands < 2 {
                    return Err(QuarryError::MalformedExpression(format!(
                        "operator '{}' at position {} is missing an operand",
                        token, i
                    )));
                }
                operands -= 1;
            }
            Token::Not => {
                if operands < 1 {
                    return Err(QuarryError::MalformedExpression(format!(
                        "operator '!' at position {} is missing an operand",
                        i
                    )));
                }
            }
            Token::Term(_) | Token::Phrase { .. } => {
                operands += 1;
                term_count += token.atomic_terms();
            }
            Token::LeftParen | Token::RightParen => {
                return Err(QuarryError::MalformedExpression(
                    "parenthesis in postfix expression".to_string(),
                ))
            }
        }
    }

    if operands != 1 {
        return Err(QuarryError::MalformedExpression(format!(
            "expression reduces to {} operands",
            operands
        )));
    }

    Ok(term_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::lexer::Lexer;

    fn postfix(input: &str) -> Result<PostfixExpr> {
        PostfixExpr::from_tokens(Lexer::tokenize(input)?)
    }

    fn rpn(input: &str) -> String {
        postfix(input).unwrap().to_string()
    }

    fn term(s: &str) -> Token {
        Token::Term(s.to_string())
    }

    #[test]
    fn test_single_term() {
        assert_eq!(rpn("rust"), "rust");
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        assert_eq!(rpn("a | b & c"), "a b c & |");
        assert_eq!(rpn("a & b | c"), "a b & c |");
    }

    #[test]
    fn test_not_binds_tightest() {
        assert_eq!(rpn("!a & b"), "a ! b &");
        assert_eq!(rpn("a & !b"), "a b ! &");
    }

    #[test]
    fn test_left_associative() {
        assert_eq!(rpn("a | b | c"), "a b | c |");
        assert_eq!(rpn("a & b & c"), "a b & c &");
    }

    #[test]
    fn test_double_negation() {
        assert_eq!(rpn("!!a"), "a ! !");
    }

    #[test]
    fn test_parentheses_override_precedence() {
        assert_eq!(rpn("(a | b) & c"), "a b | c &");
        assert_eq!(rpn("!(a | b)"), "a b | !");
    }

    #[test]
    fn test_implicit_and_matches_explicit() {
        assert_eq!(postfix("cat dog").unwrap(), postfix("cat & dog").unwrap());
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert!(postfix("(a & b").is_err());
        assert!(postfix("a & b)").is_err());
        assert!(postfix(")a(").is_err());
    }

    #[test]
    fn test_arity_failures() {
        assert!(postfix("a &").is_err());
        assert!(postfix("& a").is_err());
        assert!(postfix("a | | b").is_err());
        assert!(postfix("!").is_err());
        assert!(postfix("a !").is_err());
        assert!(postfix("()").is_err());
    }

    #[test]
    fn test_check_counts_phrase_words() {
        let tokens = vec![
            term("a"),
            Token::Phrase {
                terms: vec!["b".to_string(), "c".to_string(), "d".to_string()],
                distance: Some(5),
            },
            Token::And,
            term("e"),
            Token::Not,
            Token::Or,
        ];
        assert_eq!(check(&tokens).unwrap(), 5);
    }

    #[test]
    fn test_check_rejects_trailing_operator() {
        assert!(check(&[term("a"), Token::And]).is_err());
        assert!(check(&[term("a"), term("b")]).is_err());
        assert!(check(&[]).is_err());
    }

    #[test]
    fn test_infix_round_trip() {
        for input in [
            "a",
            "a b c",
            "a | b & c",
            "!a & (b | !c)",
            "\"x y\"/3 | (p q) !r",
            "!!(a | b) c",
        ] {
            let compiled = postfix(input).unwrap();
            let recompiled = postfix(&compiled.to_infix()).unwrap();
            assert_eq!(compiled, recompiled, "round trip of {:?}", input);
        }
    }

    #[test]
    fn test_infix_form() {
        assert_eq!(postfix("a | b & c").unwrap().to_infix(), "(a | (b & c))");
        assert_eq!(postfix("!a").unwrap().to_infix(), "!(a)");
    }
}
