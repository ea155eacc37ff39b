//! Topic-exchange routing key matching
//!
//! Keys and patterns are `.`-separated words. In a pattern `*` matches
//! exactly one word and `#` matches zero or more words.

use std::collections::BTreeSet;

use crate::message::QueueBinding;

pub fn topic_matches(pattern: &str, routing_key: &str) -> bool {
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = routing_key.split('.').collect();
    matches_words(&pattern, &key)
}

fn matches_words(pattern: &[&str], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((&"#", rest)) => {
            // Collapse runs of `#`
            if rest.first() == Some(&"#") {
                return matches_words(rest, key);
            }
            (0..=key.len()).any(|skip| matches_words(rest, &key[skip..]))
        }
        Some((&word, rest)) => match key.split_first() {
            Some((&k, key_rest)) if word == "*" || word == k => matches_words(rest, key_rest),
            _ => false,
        },
    }
}

/// Queues bound to `exchange` whose pattern matches `routing_key`, or
/// `None` when no binding mentions the exchange at all
pub fn route(
    bindings: &[QueueBinding],
    exchange: &str,
    routing_key: &str,
) -> Option<BTreeSet<String>> {
    let mut known = false;
    let mut targets = BTreeSet::new();
    for binding in bindings.iter().filter(|b| b.exchange == exchange) {
        known = true;
        if topic_matches(&binding.pattern, routing_key) {
            targets.insert(binding.queue.clone());
        }
    }
    known.then_some(targets)
}
