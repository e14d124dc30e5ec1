//! Entity resolution: map a human-supplied title to exactly one item.
//!
//! Every name lookup in the tool catalog funnels through the same
//! three-way outcome: exactly one match proceeds, zero matches is an
//! error, and multiple matches come back as a disambiguation list rather
//! than a guess. A single exact (case-insensitive) title match
//! short-circuits ambiguity even when fuzzier candidates exist.

use serde::Serialize;

use crate::plex::types::MediaItem;

/// Disambiguation stub handed back when a lookup stays ambiguous.
#[derive(Debug, Clone, Serialize)]
pub struct MatchStub {
    pub title: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl From<&MediaItem> for MatchStub {
    fn from(item: &MediaItem) -> Self {
        Self {
            title: item.title.clone(),
            id: item.rating_key.clone(),
            kind: item.kind.clone(),
            year: item.year,
        }
    }
}

#[derive(Debug)]
pub enum Resolution {
    One(Box<MediaItem>),
    NotFound,
    Ambiguous(Vec<MatchStub>),
}

/// Resolve a title against an already-fetched candidate list.
pub fn resolve_title(query: &str, mut candidates: Vec<MediaItem>) -> Resolution {
    if candidates.is_empty() {
        return Resolution::NotFound;
    }
    if candidates.len() == 1 {
        let only = candidates.remove(0);
        return Resolution::One(Box::new(only));
    }

    let wanted = query.to_lowercase();
    let exact: Vec<usize> = candidates
        .iter()
        .enumerate()
        .filter(|(_, c)| c.title.to_lowercase() == wanted)
        .map(|(i, _)| i)
        .collect();

    // Exactly one exact title match wins over any number of fuzzy hits.
    // Two identical titles (remakes, reissues) stay ambiguous.
    if let [index] = exact.as_slice() {
        let chosen = candidates.swap_remove(*index);
        return Resolution::One(Box::new(chosen));
    }

    Resolution::Ambiguous(candidates.iter().map(MatchStub::from).collect())
}

/// Batch resolution for create/add flows: each title resolves
/// independently and in input order. Unresolved titles are collected for
/// the caller to report; the first ambiguous title aborts the batch with
/// its stubs so nothing is guessed.
pub struct BatchResolution {
    pub items: Vec<MediaItem>,
    pub not_found: Vec<String>,
}

pub enum BatchOutcome {
    Resolved(BatchResolution),
    Ambiguous {
        title: String,
        matches: Vec<MatchStub>,
    },
}

/// Fold per-title resolutions into a batch outcome. `resolutions` must be
/// in the same order as the submitted titles.
pub fn fold_batch(titles: &[String], resolutions: Vec<Resolution>) -> BatchOutcome {
    let mut items = Vec::new();
    let mut not_found = Vec::new();
    for (title, resolution) in titles.iter().zip(resolutions) {
        match resolution {
            Resolution::One(item) => items.push(*item),
            Resolution::NotFound => not_found.push(title.clone()),
            Resolution::Ambiguous(matches) => {
                return BatchOutcome::Ambiguous {
                    title: title.clone(),
                    matches,
                }
            }
        }
    }
    BatchOutcome::Resolved(BatchResolution { items, not_found })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, id: &str, kind: &str, year: Option<i32>) -> MediaItem {
        MediaItem {
            title: title.to_string(),
            rating_key: id.to_string(),
            kind: kind.to_string(),
            year,
            ..Default::default()
        }
    }

    #[test]
    fn test_zero_candidates_is_not_found() {
        assert!(matches!(resolve_title("Heat", vec![]), Resolution::NotFound));
    }

    #[test]
    fn test_single_candidate_wins_without_exact_match() {
        let resolution = resolve_title("heat", vec![item("Heat 2", "9", "movie", Some(2029))]);
        match resolution {
            Resolution::One(chosen) => assert_eq!(chosen.rating_key, "9"),
            other => panic!("expected One, got {other:?}"),
        }
    }

    #[test]
    fn test_exact_match_short_circuits_fuzzy_candidates() {
        let candidates = vec![
            item("Alien Covenant", "2", "movie", Some(2017)),
            item("Aliens", "3", "movie", Some(1986)),
            item("Alien", "1", "movie", Some(1979)),
        ];
        match resolve_title("alien", candidates) {
            Resolution::One(chosen) => {
                assert_eq!(chosen.rating_key, "1");
                assert_eq!(chosen.title, "Alien");
            }
            other => panic!("expected One, got {other:?}"),
        }
    }

    #[test]
    fn test_multiple_without_exact_returns_every_stub() {
        let candidates = vec![
            item("Star Wars: A New Hope", "1", "movie", Some(1977)),
            item("Star Wars: The Empire Strikes Back", "2", "movie", Some(1980)),
            item("Star Wars Rebels", "3", "show", Some(2014)),
        ];
        match resolve_title("Star Wars", candidates) {
            Resolution::Ambiguous(stubs) => {
                assert_eq!(stubs.len(), 3);
                assert_eq!(stubs[0].id, "1");
                assert_eq!(stubs[2].kind, "show");
                assert_eq!(stubs[1].year, Some(1980));
            }
            other => panic!("expected Ambiguous, got {other:?}"),
        }
    }

    #[test]
    fn test_duplicate_exact_titles_stay_ambiguous() {
        let candidates = vec![
            item("Dune", "1", "movie", Some(1984)),
            item("Dune", "2", "movie", Some(2021)),
        ];
        assert!(matches!(
            resolve_title("dune", candidates),
            Resolution::Ambiguous(_)
        ));
    }

    #[test]
    fn test_batch_preserves_submitted_order() {
        let titles: Vec<String> = ["Heat", "Ronin", "Collateral"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let resolutions = vec![
            Resolution::One(Box::new(item("Heat", "1", "movie", Some(1995)))),
            Resolution::NotFound,
            Resolution::One(Box::new(item("Collateral", "3", "movie", Some(2004)))),
        ];
        match fold_batch(&titles, resolutions) {
            BatchOutcome::Resolved(batch) => {
                let ids: Vec<&str> = batch.items.iter().map(|i| i.rating_key.as_str()).collect();
                assert_eq!(ids, vec!["1", "3"]);
                assert_eq!(batch.not_found, vec!["Ronin".to_string()]);
            }
            BatchOutcome::Ambiguous { .. } => panic!("expected Resolved"),
        }
    }

    #[test]
    fn test_batch_aborts_on_first_ambiguity() {
        let titles: Vec<String> = ["Dune", "Heat"].iter().map(|s| s.to_string()).collect();
        let resolutions = vec![
            Resolution::Ambiguous(vec![MatchStub {
                title: "Dune".into(),
                id: "1".into(),
                kind: "movie".into(),
                year: Some(1984),
            }]),
            Resolution::One(Box::new(item("Heat", "2", "movie", Some(1995)))),
        ];
        match fold_batch(&titles, resolutions) {
            BatchOutcome::Ambiguous { title, matches } => {
                assert_eq!(title, "Dune");
                assert_eq!(matches.len(), 1);
            }
            BatchOutcome::Resolved(_) => panic!("expected Ambiguous"),
        }
    }
}
