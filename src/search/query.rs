//! Turning user input into FTS5 expressions.

use crate::{AgoraError, Result};

/// Most terms kept from one query.
pub const MAX_TERMS: usize = 16;

/// Build a safe FTS5 `MATCH` expression from free-form user input.
///
/// Every whitespace-separated term is double-quoted, with embedded quotes
/// doubled, so FTS5 operators in the input are matched literally. Terms are
/// ANDed. A trailing `*` turns a term into a prefix query.
///
/// # Examples
///
/// ```
/// use agora::search::build_match_query;
///
/// assert_eq!(build_match_query("rust async*").unwrap(), "\"rust\" AND \"async\"*");
/// assert_eq!(build_match_query("say \"hi\"").unwrap(), "\"say\" AND \"\"\"hi\"\"\"");
/// assert!(build_match_query("   ").is_err());
/// ```
pub fn build_match_query(input: &str) -> Result<String> {
    let terms: Vec<String> = input
        .split_whitespace()
        .filter_map(|raw| {
            let (term, prefix) = match raw.strip_suffix('*') {
                Some(stem) => (stem.trim_end_matches('*'), true),
                None => (raw, false),
            };
            if term.is_empty() {
                return None;
            }
            let quoted = format!("\"{}\"", term.replace('"', "\"\""));
            Some(if prefix { quoted + "*" } else { quoted })
        })
        .take(MAX_TERMS)
        .collect();

    if terms.is_empty() {
        return Err(AgoraError::Validation(
            "search query must not be empty".to_string(),
        ));
    }
    Ok(terms.join(" AND "))
}
