//! Recursive character text splitter.
//!
//! Text is cut on the coarsest separator present (paragraph, line, sentence,
//! word, then character) and the pieces are merged back into chunks of at
//! most `chunk_size` characters, each chunk starting with up to
//! `chunk_overlap` characters carried over from the previous one.

use std::collections::VecDeque;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{KbChunk, KbDocument};

pub const DEFAULT_SEPARATORS: [&str; 5] = ["\n\n", "\n", ". ", " ", ""];

#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl TextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Split one text into chunks.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    /// Split documents into indexed chunks; `chunk_index` restarts per document.
    pub fn split_documents(&self, docs: &[KbDocument]) -> Vec<KbChunk> {
        let mut chunks = Vec::new();
        for doc in docs {
            for (chunk_index, content) in self.split_text(&doc.text).into_iter().enumerate() {
                chunks.push(KbChunk {
                    id: Uuid::new_v4(),
                    source: doc.source.clone(),
                    chunk_index,
                    content,
                });
            }
        }

        if !chunks.is_empty() {
            let total: usize = chunks.iter().map(|c| c.content.chars().count()).sum();
            info!(
                chunks = chunks.len(),
                avg_chars = total / chunks.len(),
                "Split documents into chunks"
            );
        }
        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        // Coarsest separator that occurs in the text; "" means per character.
        let mut separator = "";
        let mut remaining: &[String] = &[];
        for (i, sep) in separators.iter().enumerate() {
            if sep.is_empty() {
                break;
            }
            if text.contains(sep.as_str()) {
                separator = sep;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let pieces: Vec<String> = if separator.is_empty() {
            text.chars().map(String::from).collect()
        } else {
            text.split(separator)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect()
        };

        let mut out = Vec::new();
        let mut fitting: Vec<String> = Vec::new();
        for piece in pieces {
            if char_len(&piece) < self.chunk_size {
                fitting.push(piece);
                continue;
            }
            if !fitting.is_empty() {
                out.extend(self.merge(&fitting, separator));
                fitting.clear();
            }
            if remaining.is_empty() {
                out.push(piece);
            } else {
                out.extend(self.split_recursive(&piece, remaining));
            }
        }
        if !fitting.is_empty() {
            out.extend(self.merge(&fitting, separator));
        }
        out
    }

    fn merge(&self, pieces: &[String], separator: &str) -> Vec<String> {
        let sep_len = char_len(separator);
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in pieces {
            let len = char_len(piece);
            let joiner = if current.is_empty() { 0 } else { sep_len };

            if total + len + joiner > self.chunk_size && !current.is_empty() {
                if total > self.chunk_size {
                    debug!(total, chunk_size = self.chunk_size, "Created an oversized chunk");
                }
                if let Some(doc) = join_pieces(&current, separator) {
                    docs.push(doc);
                }
                // Shrink the window until it fits the overlap and leaves room for `piece`.
                loop {
                    let joiner = if current.is_empty() { 0 } else { sep_len };
                    let too_long = total > 0 && total + len + joiner > self.chunk_size;
                    if total <= self.chunk_overlap && !too_long {
                        break;
                    }
                    let Some(first) = current.pop_front() else { break };
                    let dropped_joiner = if current.is_empty() { 0 } else { sep_len };
                    total -= char_len(first) + dropped_joiner;
                }
            }

            current.push_back(piece.as_str());
            if current.len() > 1 {
                total += sep_len;
            }
            total += len;
        }

        if let Some(doc) = join_pieces(&current, separator) {
            docs.push(doc);
        }
        docs
    }
}

fn join_pieces(pieces: &VecDeque<&str>, separator: &str) -> Option<String> {
    let joined = pieces.iter().copied().collect::<Vec<_>>().join(separator);
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}
