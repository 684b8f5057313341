//! Fuzzy Name Matching
//!
//! Resolves free-text user input against catalog entries and the live
//! player/location sets. Matching is deliberately simple and fully
//! deterministic:
//!
//! - case-insensitive
//! - a query matches when every one of its characters appears in the
//!   candidate's display string in order (subsequence match)
//! - exact matches rank above prefix matches, prefix above plain
//!   subsequence; ties break on shorter display string, then on the
//!   candidate's stable catalog order
//!
//! The matcher only ranks. It never picks among multiple hits; zero and
//! ambiguous results are ordinary outcomes the caller must present to
//! the user, not errors.

use crate::catalog::CatalogEntry;

/// Anything with a display string the matcher can rank.
pub trait Named {
    fn display_name(&self) -> &str;
}

impl Named for CatalogEntry {
    fn display_name(&self) -> &str {
        &self.display_name
    }
}

impl Named for String {
    fn display_name(&self) -> &str {
        self
    }
}

/// How strongly a candidate matched, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    Exact,
    Prefix,
    Subsequence,
}

/// One ranked hit. `score` is `None` only for the empty query, which
/// returns every candidate unscored in catalog order.
#[derive(Debug, Clone, Copy)]
pub struct Match<'a, T: Named> {
    pub item: &'a T,
    pub score: Option<MatchKind>,
}

/// Rank `candidates` against `query`.
///
/// An empty (or all-whitespace) query returns all candidates unscored in
/// their original order. Otherwise only matching candidates are
/// returned, best first.
pub fn search<'a, T: Named>(query: &str, candidates: &'a [T]) -> Vec<Match<'a, T>> {
    let query = query.trim();
    if query.is_empty() {
        return candidates
            .iter()
            .map(|item| Match { item, score: None })
            .collect();
    }

    let needle = query.to_lowercase();
    let mut hits: Vec<Match<'a, T>> = candidates
        .iter()
        .filter_map(|item| {
            classify(&needle, item.display_name()).map(|kind| Match {
                item,
                score: Some(kind),
            })
        })
        .collect();

    // Stable sort: ties on (kind, length) keep candidate order.
    hits.sort_by_key(|m| (m.score, m.item.display_name().chars().count()));
    hits
}

/// Resolution outcome for callers that need a single entity.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveResult<T> {
    /// Single unambiguous entity.
    Found(T),
    /// Multiple candidates matched; the caller must disambiguate.
    Ambiguous(Vec<T>),
    /// Nothing matched.
    NotFound,
}

/// Resolve a free-text reference to exactly one candidate.
///
/// A reference resolves when it matches exactly one candidate, or when
/// it is a case-insensitive exact match of exactly one display name
/// (typing the full name is not fuzzy ambiguity). Everything else is
/// `Ambiguous` or `NotFound` for the caller to surface.
pub fn resolve<'a, T: Named>(query: &str, candidates: &'a [T]) -> ResolveResult<&'a T> {
    let hits = search(query, candidates);
    if query.trim().is_empty() {
        return ResolveResult::NotFound;
    }
    match hits.len() {
        0 => ResolveResult::NotFound,
        1 => ResolveResult::Found(hits[0].item),
        _ => {
            let exact: Vec<&T> = hits
                .iter()
                .filter(|m| m.score == Some(MatchKind::Exact))
                .map(|m| m.item)
                .collect();
            if exact.len() == 1 {
                ResolveResult::Found(exact[0])
            } else {
                ResolveResult::Ambiguous(hits.into_iter().map(|m| m.item).collect())
            }
        }
    }
}

/// Classify one candidate against a lowercased query, or `None` if the
/// query is not a subsequence of the display name.
fn classify(needle: &str, display: &str) -> Option<MatchKind> {
    let haystack = display.to_lowercase();
    if haystack == needle {
        return Some(MatchKind::Exact);
    }
    if haystack.starts_with(needle) {
        return Some(MatchKind::Prefix);
    }
    if is_subsequence(needle, &haystack) {
        return Some(MatchKind::Subsequence);
    }
    None
}

/// True when every char of `needle` appears in `haystack` in order.
fn is_subsequence(needle: &str, haystack: &str) -> bool {
    let mut hay = haystack.chars();
    needle
        .chars()
        .all(|n| hay.by_ref().any(|h| h == n))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exact_match_ranks_first() {
        let candidates = names(&["Sharpness II", "Sharpness", "Sharpshooter"]);
        let hits = search("sharpness", &candidates);
        assert_eq!(hits[0].item, "Sharpness");
        assert_eq!(hits[0].score, Some(MatchKind::Exact));
    }

    #[test]
    fn test_prefix_beats_subsequence() {
        let candidates = names(&["Enchanted Golden Apple", "Golden Apple"]);
        let hits = search("golden", &candidates);
        assert_eq!(hits[0].item, "Golden Apple");
        assert_eq!(hits[0].score, Some(MatchKind::Prefix));
        assert_eq!(hits[1].score, Some(MatchKind::Subsequence));
    }

    #[test]
    fn test_subsequence_matching() {
        let candidates = names(&["Diamond Sword", "Dirt"]);
        let hits = search("dmdsw", &candidates);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item, "Diamond Sword");
    }

    #[test]
    fn test_shorter_candidate_wins_ties() {
        // Both are prefix matches; the shorter display string ranks first
        // even though it was seeded later.
        let candidates = names(&["Iron Pickaxe", "Iron Axe"]);
        let hits = search("iron", &candidates);
        assert_eq!(hits[0].item, "Iron Axe");
        assert_eq!(hits[1].item, "Iron Pickaxe");
    }

    #[test]
    fn test_stable_order_breaks_remaining_ties() {
        let candidates = names(&["Red Bed", "Rod Bar"]);
        let hits = search("rb", &candidates);
        assert_eq!(hits.len(), 2);
        // Same kind, same length: seed order preserved.
        assert_eq!(hits[0].item, "Red Bed");
    }

    #[test]
    fn test_empty_query_returns_all_unscored() {
        let candidates = names(&["Stone", "Dirt", "Sand"]);
        let hits = search("", &candidates);
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|m| m.score.is_none()));
        let order: Vec<_> = hits.iter().map(|m| m.item.as_str()).collect();
        assert_eq!(order, vec!["Stone", "Dirt", "Sand"]);
    }

    #[test]
    fn test_no_match_is_empty_not_error() {
        let candidates = names(&["Stone"]);
        assert!(search("zzz", &candidates).is_empty());
    }

    #[test]
    fn test_resolve_unique() {
        let candidates = names(&["Steve", "Alex"]);
        assert_eq!(
            resolve("ste", &candidates),
            ResolveResult::Found(&candidates[0])
        );
    }

    #[test]
    fn test_resolve_exact_among_many() {
        let candidates = names(&["Sharpness", "Sharpness Plus"]);
        assert_eq!(
            resolve("sharpness", &candidates),
            ResolveResult::Found(&candidates[0])
        );
    }

    #[test]
    fn test_resolve_ambiguous_and_not_found() {
        let candidates = names(&["Steve", "Stella"]);
        assert!(matches!(
            resolve("ste", &candidates),
            ResolveResult::Ambiguous(_)
        ));
        assert_eq!(resolve("zelda", &candidates), ResolveResult::NotFound);
        assert_eq!(resolve("", &candidates), ResolveResult::NotFound);
    }
}
