//! Lexer for boolean query strings
//!
//! Splits a raw query into terms, quoted phrases and the operators
//! `&`, `|`, `!`, `(`, `)`, inserting implicit `&` between adjacent operands.

use std::fmt;

use crate::error::QuarryError;
use crate::Result;

/// Token types for boolean query strings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A bare word
    Term(String),
    /// A quoted phrase with an optional maximum distance between its words
    Phrase {
        terms: Vec<String>,
        distance: Option<u32>,
    },
    /// `&` (or `&&`)
    And,
    /// `|` (or `||`)
    Or,
    /// `!`
    Not,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
}

impl Token {
    /// Operand leaves of an expression
    pub fn is_leaf(&self) -> bool {
        matches!(self, Token::Term(_) | Token::Phrase { .. })
    }

    pub fn is_operator(&self) -> bool {
        matches!(self, Token::And | Token::Or | Token::Not)
    }

    /// Binding strength: `!` > `&` > `|`
    pub fn precedence(&self) -> u8 {
        match self {
            Token::Not => 3,
            Token::And => 2,
            Token::Or => 1,
            _ => 0,
        }
    }

    /// Number of atomic terms this leaf contributes
    pub fn atomic_terms(&self) -> usize {
        match self {
            Token::Term(_) => 1,
            Token::Phrase { terms, .. } => terms.len(),
            _ => 0,
        }
    }

    /// Whether the token begins with an ordinary character: a word, a phrase, `!` or `(`
    fn opens_operand(&self) -> bool {
        matches!(
            self,
            Token::Term(_) | Token::Phrase { .. } | Token::Not | Token::LeftParen
        )
    }

    /// Whether the token ends with an ordinary character or `)`
    fn closes_operand(&self) -> bool {
        matches!(
            self,
            Token::Term(_) | Token::Phrase { .. } | Token::RightParen
        )
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Term(term) => write!(f, "{}", term),
            Token::Phrase { terms, distance } => {
                write!(f, "\"{}\"", terms.join(" "))?;
                if let Some(distance) = distance {
                    write!(f, "/{}", distance)?;
                }
                Ok(())
            }
            Token::And => write!(f, "&"),
            Token::Or => write!(f, "|"),
            Token::Not => write!(f, "!"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
        }
    }
}

/// Lexer for tokenizing boolean query strings
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    /// Set once a quote without a closing partner is seen; later quotes cannot pair either
    quotes_exhausted: bool,
}

impl Lexer {
    /// Create a new lexer for the given input string.
    ///
    /// Whitespace runs are collapsed and `&&`/`||` are folded to `&`/`|`.
    pub fn new(input: &str) -> Self {
        let collapsed = input
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .replace("&&", "&")
            .replace("||", "|");

        Self {
            input: collapsed.chars().collect(),
            position: 0,
            quotes_exhausted: false,
        }
    }

    /// Tokenize a query, inserting `&` wherever two operands are adjacent
    pub fn tokenize(input: &str) -> Result<Vec<Token>> {
        let mut lexer = Lexer::new(input);
        let mut tokens: Vec<Token> = Vec::new();

        while let Some(token) = lexer.next_token()? {
            let implicit_and = token.opens_operand()
                && tokens.last().map(Token::closes_operand).unwrap_or(false);
            if implicit_and {
                tokens.push(Token::And);
            }
            tokens.push(token);
        }

        Ok(tokens)
    }

    /// Get the next raw token from the input, without implicit conjunctions
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();

        if self.is_eof() {
            return Ok(None);
        }

        let ch = self.current_char();

        match ch {
            '&' => {
                self.advance();
                Ok(Some(Token::And))
            }
            '|' => {
                self.advance();
                Ok(Some(Token::Or))
            }
            '!' => {
                self.advance();
                Ok(Some(Token::Not))
            }
            '(' => {
                self.advance();
                Ok(Some(Token::LeftParen))
            }
            ')' => {
                self.advance();
                Ok(Some(Token::RightParen))
            }
            '"' => match self.closing_quote() {
                Some(close) => self.read_phrase(close).map(Some),
                None => Ok(Some(self.read_term())),
            },
            _ => Ok(Some(self.read_term())),
        }
    }

    /// Check if the lexer has reached the end of input
    pub fn is_eof(&self) -> bool {
        self.position >= self.input.len()
    }

    /// Position of the quote closing the phrase opened at the current position.
    ///
    /// A phrase holds at least one character, so the search starts two
    /// characters after the opening quote.
    fn closing_quote(&mut self) -> Option<usize> {
        if self.quotes_exhausted {
            return None;
        }
        let found = (self.position + 2..self.input.len()).find(|&i| self.input[i] == '"');
        if found.is_none() {
            self.quotes_exhausted = true;
        }
        found
    }

    fn read_phrase(&mut self, close: usize) -> Result<Token> {
        let body: String = self.input[self.position + 1..close]
            .iter()
            .map(|&c| if Self::is_reserved(c) { ' ' } else { c })
            .collect();
        self.position = close + 1;

        let terms: Vec<String> = body.split_whitespace().map(str::to_string).collect();
        if terms.is_empty() {
            return Err(QuarryError::MalformedExpression(
                "quoted phrase contains no words".to_string(),
            ));
        }

        let distance = self.read_distance()?;

        Ok(Token::Phrase { terms, distance })
    }

    /// Read an optional `/<digits>` suffix following a phrase
    fn read_distance(&mut self) -> Result<Option<u32>> {
        let mut cursor = self.position;
        while cursor < self.input.len() && self.input[cursor] == ' ' {
            cursor += 1;
        }
        if cursor >= self.input.len() || self.input[cursor] != '/' {
            return Ok(None);
        }
        cursor += 1;

        let digits_start = cursor;
        while cursor < self.input.len() && self.input[cursor].is_ascii_digit() {
            cursor += 1;
        }
        if cursor == digits_start {
            return Ok(None);
        }

        let digits: String = self.input[digits_start..cursor].iter().collect();
        let distance = digits.parse::<u32>().map_err(|_| {
            QuarryError::MalformedExpression(format!("phrase distance out of range: {}", digits))
        })?;
        self.position = cursor;
        Ok(Some(distance))
    }

    fn read_term(&mut self) -> Token {
        let mut term = String::new();

        while !self.is_eof() {
            let ch = self.current_char();
            if ch == ' ' || Self::is_reserved(ch) {
                break;
            }
            if ch == '"' && !term.is_empty() && self.closing_quote().is_some() {
                break;
            }
            term.push(ch);
            self.advance();
        }

        Token::Term(term)
    }

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while !self.is_eof() && self.current_char() == ' ' {
            self.advance();
        }
    }

    /// Operator characters that can never be part of a term
    fn is_reserved(ch: char) -> bool {
        matches!(ch, '&' | '|' | '!' | '(' | ')')
    }
}
