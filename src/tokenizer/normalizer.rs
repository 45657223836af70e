use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::config::NormalizerConfig;
use crate::error::QuarryError;
use crate::Result;

/// Maps a raw surface token to its canonical lexical form.
///
/// Implementations must be pure and deterministic: the same input always
/// yields the same output, otherwise vocabulary lookups and snippet matching
/// disagree with each other.
pub trait Normalize: Send + Sync {
    fn normalize(&self, token: &str) -> String;
}

impl<F> Normalize for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn normalize(&self, token: &str) -> String {
        self(token)
    }
}

/// Term normalizer with accent stripping, case folding and optional stemming
pub struct TermNormalizer {
    config: NormalizerConfig,
    stemmer: Option<Stemmer>,
}

impl TermNormalizer {
    /// Create a new normalizer from configuration
    pub fn new(config: &NormalizerConfig) -> Result<Self> {
        let stemmer = if config.stem {
            let algorithm = stemming_algorithm(&config.language).ok_or_else(|| {
                QuarryError::Config(format!(
                    "no stemmer available for language '{}'",
                    config.language
                ))
            })?;
            Some(Stemmer::create(algorithm))
        } else {
            None
        };

        Ok(Self {
            config: config.clone(),
            stemmer,
        })
    }

    pub fn config(&self) -> &NormalizerConfig {
        &self.config
    }
}

impl Default for TermNormalizer {
    fn default() -> Self {
        Self {
            config: NormalizerConfig::default(),
            stemmer: None,
        }
    }
}

impl Normalize for TermNormalizer {
    fn normalize(&self, token: &str) -> String {
        let mut term = if self.config.strip_accents {
            remove_accents(token)
        } else {
            token.to_string()
        };

        if self.config.lowercase {
            term = term.to_lowercase();
        }

        if let Some(stemmer) = &self.stemmer {
            term = stemmer.stem(&term).into_owned();
        }

        term
    }
}

/// Decompose to NFKD and drop combining marks
pub fn remove_accents(input: &str) -> String {
    input.nfkd().filter(|c| !is_combining_mark(*c)).collect()
}

fn stemming_algorithm(language: &str) -> Option<Algorithm> {
    let algorithm = match language.to_lowercase().as_str() {
        "arabic" => Algorithm::Arabic,
        "danish" => Algorithm::Danish,
        "dutch" => Algorithm::Dutch,
        "english" => Algorithm::English,
        "finnish" => Algorithm::Finnish,
        "french" => Algorithm::French,
        "german" => Algorithm::German,
        "greek" => Algorithm::Greek,
        "hungarian" => Algorithm::Hungarian,
        "italian" => Algorithm::Italian,
        "norwegian" => Algorithm::Norwegian,
        "portuguese" => Algorithm::Portuguese,
        "romanian" => Algorithm::Romanian,
        "russian" => Algorithm::Russian,
        "spanish" => Algorithm::Spanish,
        "swedish" => Algorithm::Swedish,
        "tamil" => Algorithm::Tamil,
        "turkish" => Algorithm::Turkish,
        _ => return None,
    };
    Some(algorithm)
}
