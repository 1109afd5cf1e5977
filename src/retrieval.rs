//! Keyword-ranked knowledge retrieval.
//!
//! A lexical heuristic, not semantic search: query words are matched by
//! substring against title, keywords, tags, and content with fixed
//! weights, plus a bonus when the whole query appears verbatim. That
//! limitation is deliberate and documented — swapping in an embedding
//! index would change this module only.

use std::sync::Arc;

use tracing::debug;

use crate::domain::KnowledgeItem;
use crate::store::KnowledgeStore;

const TITLE_WEIGHT: f64 = 3.0;
const KEYWORD_WEIGHT: f64 = 2.0;
const TAG_WEIGHT: f64 = 1.5;
const CONTENT_WEIGHT: f64 = 1.0;
const EXACT_PHRASE_BONUS: f64 = 5.0;

/// Retrieves the top-K knowledge items for a query.
pub struct KnowledgeRetriever {
    store: Arc<dyn KnowledgeStore>,
}

impl KnowledgeRetriever {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self { store }
    }

    /// Score all items against the query and return the top `top_k`.
    ///
    /// Deterministic and restartable: same store state, same results,
    /// same order. Ties keep the store's original item order.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Vec<KnowledgeItem> {
        let items = self.store.read().await;
        let ranked = rank(items, query, top_k);
        debug!(query = %query, count = ranked.len(), "Retrieved knowledge items");
        ranked
    }
}

/// Pure ranking over an item list.
fn rank(items: Vec<KnowledgeItem>, query: &str, top_k: usize) -> Vec<KnowledgeItem> {
    let query_lower = query.to_lowercase();
    let query_words: Vec<&str> = query_lower
        .split_whitespace()
        .filter(|w| w.len() > 2)
        .collect();

    let mut scored: Vec<(f64, KnowledgeItem)> = items
        .into_iter()
        .map(|item| (score_item(&item, &query_lower, &query_words), item))
        .filter(|(score, _)| *score > 0.0)
        .collect();

    // Stable sort keeps original order for equal scores.
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    scored
        .into_iter()
        .take(top_k)
        .map(|(_, item)| item)
        .collect()
}

fn score_item(item: &KnowledgeItem, query_lower: &str, query_words: &[&str]) -> f64 {
    let title_lower = item.title.to_lowercase();
    let content_lower = item.content.to_lowercase();
    let keywords_lower = item.keywords.join(" ").to_lowercase();
    let tags_lower = item.tags.join(" ").to_lowercase();

    let mut score = 0.0;
    for word in query_words {
        if title_lower.contains(word) {
            score += TITLE_WEIGHT;
        }
        if keywords_lower.contains(word) {
            score += KEYWORD_WEIGHT;
        }
        if tags_lower.contains(word) {
            score += TAG_WEIGHT;
        }
        if content_lower.contains(word) {
            score += CONTENT_WEIGHT;
        }
    }

    // Verbatim query in title or content counts once.
    if content_lower.contains(query_lower) || title_lower.contains(query_lower) {
        score += EXACT_PHRASE_BONUS;
    }

    score
}
