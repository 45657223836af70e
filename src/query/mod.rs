//! Boolean query compilation
//!
//! Supports syntax like:
//! - `rust & cargo` (also `rust && cargo`, or just `rust cargo`)
//! - `rust | python`
//! - `!draft`
//! - `(rust | python) & tutorial`
//! - `"borrow checker"` and `"borrow checker" /3`
//!
//! # Grammar
//!
//! ```text
//! query    := or_expr
//! or_expr  := and_expr ('|' and_expr)*
//! and_expr := not_expr ('&'? not_expr)*
//! not_expr := '!'* primary
//! primary  := TERM | PHRASE | '(' or_expr ')'
//! PHRASE   := '"' WORD+ '"' ('/' DIGITS)?
//! ```
//!
//! # Example
//!
//! ```rust
//! use quarry::query::QueryCompiler;
//!
//! let compiled = QueryCompiler::default().compile("rust cargo | crates").unwrap();
//! assert_eq!(compiled.expr().to_string(), "rust cargo & crates |");
//! ```

pub mod compiler;
pub mod lexer;
pub mod postfix;

pub use compiler::{CompiledQuery, QueryCompiler};
pub use lexer::{Lexer, Token};
pub use postfix::{check, to_postfix, PostfixExpr};
