//! Identity resolution: priority order, title matching limits and the
//! fill-missing update path.

mod common;

use common::{harness, memory_store, start};
use papertag::identity::{dedupe, normalize_title, MIN_TITLE_MATCH_LEN};
use papertag::storage::PaperStore;
use papertag::{IdentityKey, IdentityResolver, PaperRecord, PaperSource};
use std::sync::Arc;

const LONG_TITLE_A: &str = "Constitutional Methods for Harmless Assistants";
const LONG_TITLE_B: &str = "Reward Hacking in Reinforcement Learning Agents";

#[test]
fn test_doi_beats_title() {
    let store = memory_store();
    let by_doi = store
        .create_paper(&PaperRecord::new(LONG_TITLE_A).with_doi("10.1000/a"), start())
        .unwrap();
    let by_title = store
        .create_paper(&PaperRecord::new(LONG_TITLE_B), start())
        .unwrap();

    let resolver = IdentityResolver::new(Arc::clone(&store));
    let candidate = PaperRecord::new(LONG_TITLE_B).with_doi("10.1000/a");
    let (paper, key) = resolver.resolve_with_key(&candidate).unwrap().unwrap();

    assert_eq!(paper.id, by_doi.id);
    assert_ne!(paper.id, by_title.id);
    assert_eq!(key, IdentityKey::Doi("10.1000/a".to_string()));
}

#[test]
fn test_unmatched_doi_falls_through_to_title() {
    let store = memory_store();
    let existing = store
        .create_paper(&PaperRecord::new(LONG_TITLE_A), start())
        .unwrap();

    let resolver = IdentityResolver::new(Arc::clone(&store));
    let candidate = PaperRecord::new(format!("  {}  ", LONG_TITLE_A.to_uppercase()))
        .with_doi("10.1000/unseen");
    let (paper, key) = resolver.resolve_with_key(&candidate).unwrap().unwrap();

    assert_eq!(paper.id, existing.id);
    assert_eq!(key.kind(), "title");
}

#[test]
fn test_short_identical_titles_are_not_matched() {
    let h = harness();
    let title = "Short title 15c";
    assert_eq!(title.len(), 15);

    let first = h.pipeline.ingest(&PaperRecord::new(title)).unwrap();
    let second = h.pipeline.ingest(&PaperRecord::new(title)).unwrap();

    assert!(first.created);
    assert!(second.created);
    assert_ne!(first.paper.id, second.paper.id);
    assert_eq!(h.store.count_papers().unwrap(), 2);
}

#[test]
fn test_title_length_boundary() {
    let exact = "a".repeat(MIN_TITLE_MATCH_LEN);
    let longer = "a".repeat(MIN_TITLE_MATCH_LEN + 1);
    assert_eq!(normalize_title(&exact), None);
    assert_eq!(normalize_title(&longer), Some(longer.clone()));
}

#[test]
fn test_source_ids_are_scoped_by_source() {
    let store = memory_store();
    let arxiv = store
        .create_paper(
            &PaperRecord::new("a").with_source(PaperSource::Arxiv, "1234"),
            start(),
        )
        .unwrap();

    let resolver = IdentityResolver::new(Arc::clone(&store));
    let same = PaperRecord::new("b").with_source(PaperSource::Arxiv, "1234");
    let other = PaperRecord::new("c").with_source(PaperSource::Crossref, "1234");

    assert_eq!(resolver.resolve(&same).unwrap().map(|p| p.id), Some(arxiv.id));
    assert_eq!(resolver.resolve(&other).unwrap(), None);
}

#[test]
fn test_fill_missing_never_overwrites() {
    let h = harness();
    let first_sighting = PaperRecord::new(LONG_TITLE_A)
        .with_doi("10.1000/keep")
        .with_citation_count(10);
    let created = h.pipeline.ingest(&first_sighting).unwrap().paper;
    assert_eq!(created.abstract_text, None);

    let later = PaperRecord::new("A different display title for the same paper")
        .with_doi("10.1000/keep")
        .with_abstract("Now with an abstract.")
        .with_arxiv_id("2401.99999")
        .with_citation_count(4);
    let outcome = h.pipeline.ingest(&later).unwrap();

    assert!(!outcome.created);
    let paper = outcome.paper;
    assert_eq!(paper.id, created.id);
    assert_eq!(paper.title, LONG_TITLE_A);
    assert_eq!(paper.abstract_text.as_deref(), Some("Now with an abstract."));
    assert_eq!(paper.arxiv_id.as_deref(), Some("2401.99999"));
    assert_eq!(paper.citation_count, 10);

    let again = PaperRecord::new(LONG_TITLE_A).with_abstract("Replacement abstract.");
    let paper = h.pipeline.ingest(&again).unwrap().paper;
    assert_eq!(paper.abstract_text.as_deref(), Some("Now with an abstract."));
}

#[test]
fn test_batch_dedupe_uses_every_key() {
    let records = vec![
        PaperRecord::new(LONG_TITLE_A).with_doi("10.1/x"),
        PaperRecord::new("mirror").with_doi("10.1/x"),
        PaperRecord::new("preprint").with_arxiv_id("2402.1"),
        PaperRecord::new("preprint again").with_arxiv_id("2402.1"),
        PaperRecord::new(LONG_TITLE_B),
        PaperRecord::new(LONG_TITLE_B.to_lowercase()),
        PaperRecord::new("tiny"),
        PaperRecord::new("tiny"),
    ];

    let unique = dedupe(records);
    let titles: Vec<_> = unique.iter().map(|r| r.title.as_str()).collect();
    assert_eq!(titles, vec![LONG_TITLE_A, "preprint", LONG_TITLE_B, "tiny", "tiny"]);
}
