//! Document word extraction: tokenizes documents in the map phase and inverts
//! the resulting word sets into per-token document sets in the reduce phase.

use common::{check_doc_id, App, Config, DocId, Document, Token};
use log::{debug, warn};

pub mod inverter;
pub mod tokenizer;

pub use inverter::{invert, InvertedEntry};
pub use tokenizer::{tokenize, tokens, Posting, WordSet};

#[derive(Debug, Clone)]
pub struct WordSetApp {
    min_token_len: usize,
    max_doc_freq: Option<usize>,
}

impl WordSetApp {
    pub fn new(config: &Config) -> Self {
        Self {
            min_token_len: config.min_token_len,
            max_doc_freq: config.max_doc_freq,
        }
    }
}

impl App for WordSetApp {
    type InKey = DocId;
    type InValue = String;
    type Key = Token;
    type Value = Posting;
    type Output = InvertedEntry;

    fn map(&self, id: DocId, text: String) -> Vec<(Token, Posting)> {
        if let Err(reason) = check_doc_id(&id) {
            warn!(
                "skipping document with unusable id {:?} ({:?}, {} bytes of text)",
                id,
                reason,
                text.len()
            );
            return vec![];
        }
        tokenize(&Document { id, text }, self.min_token_len).postings()
    }

    fn reduce(&self, token: &Token, postings: Vec<Posting>) -> Option<InvertedEntry> {
        let entry = invert(postings);
        match self.max_doc_freq {
            Some(max) if entry.len() > max => {
                debug!(
                    "dropping token {:?}: found in {} documents (max {})",
                    token,
                    entry.len(),
                    max
                );
                None
            }
            _ => Some(entry),
        }
    }
}
