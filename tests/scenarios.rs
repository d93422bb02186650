//! End-to-end behavior of the tagging components on small, fully specified
//! inputs: one rule match, the novel-combo lifecycle and the sole-tag score.

mod common;

use common::{as_dyn, attach, manual_clock, memory_store, seed_paper, seed_tag, start};
use papertag::classify::{RuleMatcher, MATCH_WEIGHT};
use papertag::combo::{ComboStats, ComboTracker, DEFAULT_NOVEL_MIN_FREQUENCY, DEFAULT_QUERY_LIMIT};
use papertag::scoring::tag_weight;
use papertag::storage::{ComboStore, PaperTagStore};
use papertag::{BaselineCache, ComboKey, Lexicon, RelevanceScorer};
use std::sync::Arc;
use std::time::Duration;

#[test]
fn test_single_rule_match_scores_one_weight() {
    let lexicon = Lexicon::from_keywords([("alignment", vec!["alignment"])]);
    let matcher = RuleMatcher::new(&lexicon).unwrap();

    let scores = matcher.score(&"A Study of Value Alignment in Agents".to_lowercase());

    assert_eq!(scores.len(), 1);
    assert_eq!(scores["alignment"], MATCH_WEIGHT);
    assert_eq!(scores["alignment"], 0.3);
}

#[test]
fn test_novel_combo_lifecycle() {
    let store = memory_store();
    let clock = manual_clock();
    let tracker = ComboTracker::new(Arc::clone(&store), as_dyn(&clock));

    let t1 = seed_tag(&store, "alignment", 1, 0.0);
    let t2 = seed_tag(&store, "interpretability", 1, 0.0);
    let key = ComboKey::new(t1.id, t2.id).unwrap();

    // First paper creates the combo
    let p = seed_paper(&store, "P");
    attach(&store, &p, &[&t1, &t2]);
    let stats = tracker.track_combinations(p.id).unwrap();
    assert_eq!(
        stats,
        ComboStats {
            tracked: 1,
            created: 1,
            novel: 1
        }
    );
    let combo = store.find_combo(&key).unwrap().unwrap();
    assert_eq!(combo.frequency, 1);
    assert!(combo.is_novel);
    assert_eq!(combo.first_paper_id, Some(p.id));
    assert_eq!(combo.created_at, start());
    assert!(store.list_by_paper(p.id).unwrap().iter().all(|pt| pt.is_novel_combo));

    // Second paper with the same pair counts a sighting
    let q = seed_paper(&store, "Q");
    attach(&store, &q, &[&t2, &t1]);
    let stats = tracker.track_combinations(q.id).unwrap();
    assert_eq!(
        stats,
        ComboStats {
            tracked: 1,
            created: 0,
            novel: 1
        }
    );
    let combo = store.find_combo(&key).unwrap().unwrap();
    assert_eq!(combo.frequency, 2);
    assert_eq!(combo.first_paper_id, Some(p.id));

    // Third sighting is still novel
    let r = seed_paper(&store, "R");
    attach(&store, &r, &[&t1, &t2]);
    assert_eq!(tracker.track_combinations(r.id).unwrap().novel, 1);
    assert!(store.find_combo(&key).unwrap().unwrap().is_novel);

    // Fourth sighting pushes it past the threshold
    let s = seed_paper(&store, "S");
    attach(&store, &s, &[&t1, &t2]);
    let stats = tracker.track_combinations(s.id).unwrap();
    assert_eq!(stats.novel, 0);

    let combo = store.find_combo(&key).unwrap().unwrap();
    assert_eq!(combo.frequency, 4);
    assert!(!combo.is_novel);
    assert!(tracker
        .novel_combinations(DEFAULT_NOVEL_MIN_FREQUENCY, DEFAULT_QUERY_LIMIT)
        .unwrap()
        .is_empty());
    assert!(!tracker.is_novel_pair(t1.id, t2.id).unwrap());
    assert!(store.list_by_paper(s.id).unwrap().iter().all(|pt| !pt.is_novel_combo));
}

#[test]
fn test_sole_system_tag_scores_hundred() {
    let store = memory_store();
    let clock = manual_clock();
    let baseline = Arc::new(BaselineCache::new(Duration::from_secs(3600), as_dyn(&clock)));
    let scorer = RelevanceScorer::new(Arc::clone(&store), as_dyn(&clock), baseline);

    let tag = seed_tag(&store, "llm", 100, 8.0);
    let paper = seed_paper(&store, "P");
    attach(&store, &paper, &[&tag]);

    assert_eq!(scorer.max_possible_weight().unwrap(), tag_weight(&tag, start()));
    assert_eq!(scorer.score_paper(paper.id).unwrap(), 100.0);
}
