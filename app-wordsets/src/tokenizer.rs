use common::{DocId, Document, Token};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One tokenizer emission: `doc` contains the token and has `doc_tokens`
/// distinct tokens in total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc: DocId,
    pub doc_tokens: usize,
}

/// The distinct normalized tokens of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSet {
    pub doc: DocId,
    pub tokens: BTreeSet<Token>,
}

impl WordSet {
    /// One `(token, posting)` pair per distinct token.
    pub fn postings(self) -> Vec<(Token, Posting)> {
        let doc_tokens = self.tokens.len();
        let doc = self.doc;
        self.tokens
            .into_iter()
            .map(|token| {
                let posting = Posting {
                    doc: doc.clone(),
                    doc_tokens,
                };
                (token, posting)
            })
            .collect()
    }
}

/// Lower-cases `text`, splits it on runs of non-alphanumeric characters and
/// keeps the distinct fragments of at least `min_len` characters.
pub fn tokens(text: &str, min_len: usize) -> BTreeSet<Token> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && w.chars().count() >= min_len)
        .map(|w| w.to_owned())
        .collect()
}

pub fn tokenize(document: &Document, min_len: usize) -> WordSet {
    WordSet {
        doc: document.id.clone(),
        tokens: tokens(&document.text, min_len),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(id: &str, text: &str) -> Document {
        Document {
            id: id.to_owned(),
            text: text.to_owned(),
        }
    }

    fn set(words: &[&str]) -> BTreeSet<Token> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn normalizes_and_deduplicates() {
        let ws = tokenize(&doc("d", "The cat, the CAT... and--the hat!"), 1);
        assert_eq!(ws.tokens, set(&["the", "cat", "and", "hat"]));
        assert_eq!(ws.tokens.len(), 4);
    }

    #[test]
    fn keeps_digits_and_unicode_letters() {
        assert_eq!(tokens("Café 42 naïve_x", 1), set(&["café", "42", "naïve", "x"]));
    }

    #[test]
    fn min_len_counts_characters() {
        assert_eq!(tokens("a an ant été", 3), set(&["ant", "été"]));
        assert_eq!(tokens("a an ant", 1), set(&["a", "an", "ant"]));
    }

    #[test]
    fn empty_text_yields_empty_set() {
        let ws = tokenize(&doc("d", ""), 1);
        assert!(ws.tokens.is_empty());
        assert!(ws.postings().is_empty());
        assert!(tokens("  ...!?  ", 1).is_empty());
    }

    #[test]
    fn is_deterministic() {
        let d = doc("d", "one two three two one");
        assert_eq!(tokenize(&d, 1), tokenize(&d, 1));
    }

    #[test]
    fn postings_carry_set_size() {
        let postings = tokenize(&doc("doc1", "the cat sat"), 1).postings();
        let words: Vec<&str> = postings.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(words, vec!["cat", "sat", "the"]);
        for (_, posting) in postings {
            assert_eq!(posting.doc, "doc1");
            assert_eq!(posting.doc_tokens, 3);
        }
    }
}
