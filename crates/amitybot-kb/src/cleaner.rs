//! Document cleaning before splitting.

use tracing::{info, warn};

use crate::models::KbDocument;

/// Collapse whitespace runs to single spaces and drop documents shorter
/// than `min_chars` characters.
pub fn clean_documents(docs: Vec<KbDocument>, min_chars: usize) -> Vec<KbDocument> {
    let before = docs.len();
    let cleaned: Vec<KbDocument> = docs
        .into_iter()
        .filter_map(|doc| {
            let text = doc.text.split_whitespace().collect::<Vec<_>>().join(" ");
            if text.chars().count() < min_chars {
                warn!(source = %doc.source, chars = text.chars().count(), "Skipping short document");
                return None;
            }
            Some(KbDocument { source: doc.source, text })
        })
        .collect();

    info!(kept = cleaned.len(), removed = before - cleaned.len(), "Cleaned documents");
    cleaned
}
