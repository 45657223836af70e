use std::fmt;

/// Postfix token with its terms replaced by vocabulary IDs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedToken {
    Id(u32),
    Phrase { ids: Vec<u32>, distance: Option<u32> },
    And,
    Or,
    Not,
}

impl fmt::Display for ResolvedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedToken::Id(id) => write!(f, "{}", id),
            ResolvedToken::Phrase { ids, distance } => {
                write!(f, "\"")?;
                for id in ids {
                    write!(f, " {}", id)?;
                }
                if let Some(distance) = distance {
                    write!(f, " /{}", distance)?;
                }
                write!(f, " \"")
            }
            ResolvedToken::And => write!(f, "&"),
            ResolvedToken::Or => write!(f, "|"),
            ResolvedToken::Not => write!(f, "!"),
        }
    }
}

/// A fully resolved expression, ready to be sent to the retrieval backend.
///
/// The wire string doubles as the cache key: two queries that resolve to the
/// same string share one backend handle and one result list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedExpr {
    tokens: Vec<ResolvedToken>,
    wire: String,
}

impl ResolvedExpr {
    pub fn new(tokens: Vec<ResolvedToken>) -> Self {
        let wire = tokens
            .iter()
            .map(ResolvedToken::to_string)
            .collect::<Vec<_>>()
            .join(" ");
        Self { tokens, wire }
    }

    pub fn tokens(&self) -> &[ResolvedToken] {
        &self.tokens
    }

    /// Space-separated postfix form, e.g. `4 " 7 9 /3 " & 2 ! |`
    pub fn wire(&self) -> &str {
        &self.wire
    }
}

impl fmt::Display for ResolvedExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.wire)
    }
}
