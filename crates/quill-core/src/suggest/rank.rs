use super::{IdGenerator, Suggestion};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Order suggestions by confidence (highest first) and fill in ids.
///
/// The sort is stable, so equal-confidence suggestions keep their input
/// order. Missing or repeated ids are replaced with fresh ones from `ids`.
pub fn rank(mut suggestions: Vec<Suggestion>, ids: &dyn IdGenerator) -> Vec<Suggestion> {
    suggestions.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    let mut seen: HashSet<String> = HashSet::with_capacity(suggestions.len());
    for (index, suggestion) in suggestions.iter_mut().enumerate() {
        let keep = matches!(&suggestion.id, Some(id) if !id.is_empty() && !seen.contains(id));
        if !keep {
            suggestion.id = Some(fresh_id(ids, &seen, index));
        }
        if let Some(id) = &suggestion.id {
            seen.insert(id.clone());
        }
    }

    suggestions
}

/// Draws from the generator before switching to index-derived ids
const MAX_ID_ATTEMPTS: usize = 8;

/// An id not yet in `seen`. Terminates even when `ids` keeps repeating itself.
fn fresh_id(ids: &dyn IdGenerator, seen: &HashSet<String>, index: usize) -> String {
    for _ in 0..MAX_ID_ATTEMPTS {
        let id = ids.next_id();
        if !id.is_empty() && !seen.contains(&id) {
            return id;
        }
    }

    let mut n = index;
    loop {
        let id = format!("suggestion-{}", n);
        if !seen.contains(&id) {
            return id;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggest::{
        Position, ProviderModel, SequentialIds, SuggestionMetadata, SuggestionType,
    };
    use pretty_assertions::assert_eq;

    fn make(text: &str, confidence: f64, model: ProviderModel) -> Suggestion {
        Suggestion::new(
            text,
            SuggestionType::Style,
            "Test",
            confidence,
            model,
            SuggestionMetadata {
                position: Position::new(0, 0),
                context: String::new(),
                original_text: String::new(),
            },
        )
    }

    fn texts(suggestions: &[Suggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_rank_sorts_by_confidence_desc() {
        let ranked = rank(
            vec![
                make("low", 0.2, ProviderModel::Remote),
                make("high", 0.95, ProviderModel::Local),
                make("mid", 0.5, ProviderModel::Remote),
            ],
            &SequentialIds::default(),
        );
        assert_eq!(texts(&ranked), vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_rank_ties_keep_remote_before_local() {
        let ranked = rank(
            vec![
                make("r1", 0.85, ProviderModel::Remote),
                make("r2", 0.85, ProviderModel::Remote),
                make("l1", 0.85, ProviderModel::Local),
                make("l2", 0.9, ProviderModel::Local),
            ],
            &SequentialIds::default(),
        );
        assert_eq!(texts(&ranked), vec!["l2", "r1", "r2", "l1"]);
    }

    #[test]
    fn test_rank_assigns_missing_ids_in_output_order() {
        let ranked = rank(
            vec![
                make("b", 0.1, ProviderModel::Remote),
                make("a", 0.9, ProviderModel::Remote).with_id("keep-me"),
                make("c", 0.5, ProviderModel::Local),
            ],
            &SequentialIds::new("id"),
        );
        let ids: Vec<_> = ranked.iter().map(|s| s.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["keep-me", "id-1", "id-2"]);
    }

    #[test]
    fn test_rank_replaces_duplicate_and_empty_ids() {
        let ranked = rank(
            vec![
                make("a", 0.9, ProviderModel::Local).with_id("t5_0"),
                make("b", 0.8, ProviderModel::Local).with_id("t5_0"),
                make("c", 0.7, ProviderModel::Local).with_id(""),
            ],
            &SequentialIds::new("id"),
        );
        let ids: Vec<_> = ranked.iter().map(|s| s.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["t5_0", "id-1", "id-2"]);
    }

    #[test]
    fn test_rank_skips_generated_id_that_collides() {
        let ranked = rank(
            vec![
                make("a", 0.9, ProviderModel::Local).with_id("id-1"),
                make("b", 0.8, ProviderModel::Local),
            ],
            &SequentialIds::new("id"),
        );
        assert_eq!(ranked[1].id.as_deref(), Some("id-2"));
    }

    #[test]
    fn test_rank_empty() {
        assert!(rank(Vec::new(), &SequentialIds::default()).is_empty());
    }

    struct RepeatingIds(&'static str);

    impl IdGenerator for RepeatingIds {
        fn next_id(&self) -> String {
            self.0.to_string()
        }
    }

    #[test]
    fn test_rank_survives_generator_that_repeats() {
        let ranked = rank(
            vec![
                make("a", 0.9, ProviderModel::Remote),
                make("b", 0.8, ProviderModel::Remote),
                make("c", 0.7, ProviderModel::Local).with_id("suggestion-1"),
                make("d", 0.6, ProviderModel::Local),
            ],
            &RepeatingIds("same"),
        );
        let ids: Vec<_> = ranked.iter().map(|s| s.id.clone().unwrap()).collect();
        assert_eq!(ids, vec!["same", "suggestion-1", "suggestion-2", "suggestion-3"]);
    }

    #[test]
    fn test_rank_rejects_empty_generated_ids() {
        let ranked = rank(vec![make("a", 0.5, ProviderModel::Local)], &RepeatingIds(""));
        assert_eq!(ranked[0].id.as_deref(), Some("suggestion-0"));
    }

    mod prop_tests {
        use super::*;
        use proptest::prelude::*;
        use std::collections::HashSet;

        fn arb_suggestions() -> impl Strategy<Value = Vec<Suggestion>> {
            prop::collection::vec((0.0f64..=1.0, prop::option::of("[ab]{0,2}")), 0..40).prop_map(
                |items| {
                    items
                        .into_iter()
                        .enumerate()
                        .map(|(i, (confidence, id))| {
                            let s = make(&i.to_string(), confidence, ProviderModel::Remote);
                            match id {
                                Some(id) => s.with_id(id),
                                None => s,
                            }
                        })
                        .collect()
                },
            )
        }

        proptest! {
            #[test]
            fn prop_rank_orders_by_confidence_stably(input in arb_suggestions()) {
                let ranked = rank(input.clone(), &SequentialIds::default());
                prop_assert_eq!(ranked.len(), input.len());

                for pair in ranked.windows(2) {
                    prop_assert!(pair[0].confidence >= pair[1].confidence);
                    if pair[0].confidence == pair[1].confidence {
                        let a: usize = pair[0].text.parse().unwrap();
                        let b: usize = pair[1].text.parse().unwrap();
                        prop_assert!(a < b, "tie order changed: {} before {}", a, b);
                    }
                }
            }

            #[test]
            fn prop_rank_ids_are_unique_and_non_empty(input in arb_suggestions()) {
                let ranked = rank(input, &RepeatingIds("a"));
                let mut seen = HashSet::new();
                for s in &ranked {
                    let id = s.id.clone().unwrap_or_default();
                    prop_assert!(!id.is_empty());
                    prop_assert!(seen.insert(id.clone()), "duplicate id {}", id);
                }
            }
        }
    }
}
