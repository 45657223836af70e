use std::collections::HashMap;

use crate::tokenizer::Normalize;

/// A query-term hit in the token stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    pub position: usize,
    /// 1-based, in order of first appearance in the document
    pub rank: usize,
}

/// Document text split into word and separator tokens.
///
/// Words are maximal alphanumeric runs; every other character is a token of
/// its own. Concatenating the tokens gives back the original text.
#[derive(Debug, Clone, Default)]
pub struct ScannedText {
    pub tokens: Vec<String>,
    pub occurrences: Vec<Occurrence>,
    /// Number of distinct query terms found
    pub distinct: usize,
}

impl ScannedText {
    pub fn scan(text: &str, terms: &[String], normalizer: &dyn Normalize) -> Self {
        let mut ranks: HashMap<&str, usize> = terms.iter().map(|t| (t.as_str(), 0)).collect();
        let mut scanned = ScannedText::default();
        let mut word = String::new();

        for c in text.chars() {
            if c.is_alphanumeric() {
                word.push(c);
                continue;
            }
            if !word.is_empty() {
                scanned.push_word(std::mem::take(&mut word), &mut ranks, normalizer);
            }
            scanned.tokens.push(c.to_string());
        }
        if !word.is_empty() {
            scanned.push_word(word, &mut ranks, normalizer);
        }

        scanned
    }

    fn push_word(
        &mut self,
        word: String,
        ranks: &mut HashMap<&str, usize>,
        normalizer: &dyn Normalize,
    ) {
        let canonical = normalizer.normalize(&word);
        if let Some(rank) = ranks.get_mut(canonical.as_str()) {
            if *rank == 0 {
                self.distinct += 1;
                *rank = self.distinct;
            }
            self.occurrences.push(Occurrence {
                position: self.tokens.len(),
                rank: *rank,
            });
        }
        self.tokens.push(word);
    }

    /// Length of the text in characters
    pub fn char_len(&self) -> usize {
        self.tokens.iter().map(|t| t.chars().count()).sum()
    }
}

/// Inclusive token range covering every distinct query term
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn span(&self) -> usize {
        self.end - self.start
    }
}

/// Shortest span of occurrences containing all `distinct` ranks.
///
/// On ties the earliest window wins. Returns `None` when there are no
/// occurrences.
pub fn min_covering_window(occurrences: &[Occurrence], distinct: usize) -> Option<Window> {
    if occurrences.is_empty() || distinct == 0 {
        return None;
    }

    let mut counts = vec![0usize; distinct + 1];
    let mut covered = 0;
    let mut best: Option<Window> = None;
    let mut left = 0;

    for right in 0..occurrences.len() {
        let rank = occurrences[right].rank;
        if counts[rank] == 0 {
            covered += 1;
        }
        counts[rank] += 1;

        while covered == distinct {
            let window = Window {
                start: occurrences[left].position,
                end: occurrences[right].position,
            };
            if best.map_or(true, |b| window.span() < b.span()) {
                best = Some(window);
            }

            let rank = occurrences[left].rank;
            counts[rank] -= 1;
            if counts[rank] == 0 {
                covered -= 1;
            }
            left += 1;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity(token: &str) -> String {
        token.to_lowercase()
    }

    fn terms(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_scan_positions_include_separators() {
        let scanned = ScannedText::scan("Hello, world", &terms(&["world"]), &identity);
        assert_eq!(scanned.tokens, vec!["Hello", ",", " ", "world"]);
        assert_eq!(
            scanned.occurrences,
            vec![Occurrence {
                position: 3,
                rank: 1
            }]
        );
        assert_eq!(scanned.tokens.concat(), "Hello, world");
        assert_eq!(scanned.char_len(), 12);
    }

    #[test]
    fn test_ranks_follow_first_appearance() {
        let scanned = ScannedText::scan("b a b", &terms(&["a", "b"]), &identity);
        let ranks: Vec<usize> = scanned.occurrences.iter().map(|o| o.rank).collect();
        assert_eq!(ranks, vec![1, 2, 1]);
        assert_eq!(scanned.distinct, 2);
    }

    #[test]
    fn test_minimal_window() {
        // tokens: x a x x b x, separators left out
        let occurrences = vec![
            Occurrence {
                position: 1,
                rank: 1,
            },
            Occurrence {
                position: 4,
                rank: 2,
            },
        ];
        assert_eq!(
            min_covering_window(&occurrences, 2),
            Some(Window { start: 1, end: 4 })
        );
    }

    #[test]
    fn test_minimal_window_from_scanned_text() {
        let scanned = ScannedText::scan("x a x x b x", &terms(&["a", "b"]), &identity);
        let window = min_covering_window(&scanned.occurrences, scanned.distinct).unwrap();

        // words sit at even positions, separators in between
        assert_eq!(window, Window { start: 2, end: 8 });
        assert_eq!(scanned.tokens[window.start..=window.end].concat(), "a x x b");
    }

    #[test]
    fn test_window_skips_repeated_terms() {
        let scanned = ScannedText::scan("A x a x x b", &terms(&["a", "b"]), &identity);
        let window = min_covering_window(&scanned.occurrences, scanned.distinct).unwrap();
        assert_eq!(scanned.tokens[window.start..=window.end].concat(), "a x x b");
    }

    #[test]
    fn test_window_prefers_shorter_then_earlier() {
        let scanned = ScannedText::scan("a x x b a b x a b", &terms(&["a", "b"]), &identity);
        let window = min_covering_window(&scanned.occurrences, scanned.distinct).unwrap();
        // "b a" at positions 6..8 is the first span of length 2
        assert_eq!(window, Window { start: 6, end: 8 });
    }

    #[test]
    fn test_no_occurrences() {
        assert_eq!(min_covering_window(&[], 0), None);
    }
}
