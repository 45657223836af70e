//! Term normalization shared by vocabulary resolution and snippet matching.

mod normalizer;

pub use normalizer::{remove_accents, Normalize, TermNormalizer};
