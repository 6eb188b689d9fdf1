//! Behavioral tests for context assembly: precedence, budgets, determinism.

use tutor_core::{Citation, Passage, ScoredPassage, TokenCounter};
use tutor_rag::{AssemblerConfig, ContextAssembler};

fn passage(id: &str, chapter: &str, section: &str, position: u32, text: &str) -> Passage {
    Passage {
        id: id.to_string(),
        text: text.to_string(),
        embedding: vec![],
        chapter_id: chapter.to_string(),
        section_title: section.to_string(),
        position,
    }
}

fn scored(p: Passage, score: f32) -> ScoredPassage {
    ScoredPassage { passage: p, score }
}

fn assembler(context_budget: usize, selected_budget: usize) -> ContextAssembler {
    ContextAssembler::new(
        AssemblerConfig {
            context_budget_tokens: context_budget,
            selected_text_budget_tokens: selected_budget,
        },
        TokenCounter::new().unwrap(),
    )
}

#[test]
fn passages_admitted_in_score_order_within_budget() {
    let retrieval = vec![
        scored(passage("p1", "neural-networks", "Backprop", 0, "Gradients flow backwards."), 0.91),
        scored(passage("p2", "neural-networks", "Backprop", 1, "The chain rule applies."), 0.85),
        scored(passage("p3", "neural-networks", "Training", 4, "Loss decreases per epoch."), 0.72),
    ];
    let context = assembler(2000, 2000).assemble(&retrieval, None);

    assert_eq!(context.passages().len(), 3);
    assert_eq!(context.passages()[0].citation.section_title, "Backprop");
    assert!(context.passages()[0].score >= context.passages()[1].score);
    assert!(context.token_count() <= 2000);
}

#[test]
fn passage_admission_is_all_or_nothing() {
    let counter = TokenCounter::new().unwrap();
    let first = "Convolutions slide a kernel across the input image.";
    let second = "Pooling layers reduce spatial resolution between convolutions.";
    let third = "Fully connected layers map features to class scores at the end.";
    // Budget fits exactly the first two passages; the third must be
    // excluded entirely, not truncated.
    let budget = counter.count(first) + counter.count(second);

    let retrieval = vec![
        scored(passage("p1", "cnns", "Intro", 0, first), 0.95),
        scored(passage("p2", "cnns", "Pooling", 1, second), 0.88),
        scored(passage("p3", "cnns", "Heads", 2, third), 0.80),
    ];
    let context = assembler(budget, 2000).assemble(&retrieval, None);

    assert_eq!(context.passages().len(), 2);
    assert_eq!(context.passages()[1].text, second);
    assert!(context.token_count() <= budget);
}

#[test]
fn selected_text_is_always_the_first_block() {
    let retrieval =
        vec![scored(passage("p1", "cnns", "Intro", 0, "CNNs process images in layers."), 0.99)];
    let context = assembler(2000, 2000).assemble(&retrieval, Some("  the highlighted sentence  "));

    assert_eq!(context.selected_text(), Some("the highlighted sentence"));
    assert_eq!(context.passages().len(), 1);
}

#[test]
fn oversized_selected_text_is_truncated_and_retrieval_dropped() {
    let counter = TokenCounter::new().unwrap();
    let selected = "attention is all you need ".repeat(200);
    assert!(counter.count(&selected) > 50);

    let retrieval =
        vec![scored(passage("p1", "transformers", "Attention", 0, "Attention weighs tokens."), 0.97)];
    let context = assembler(2000, 50).assemble(&retrieval, Some(&selected));

    assert!(context.passages().is_empty());
    let kept = context.selected_text().unwrap();
    assert!(counter.count(kept) <= 50);
    assert!(selected.starts_with(kept));
}

#[test]
fn duplicate_chapter_position_pairs_are_deduplicated() {
    let retrieval = vec![
        scored(passage("p1", "cnns", "Intro", 3, "Overlapping window A."), 0.92),
        scored(passage("p2", "cnns", "Intro", 3, "Overlapping window B."), 0.90),
        scored(passage("p3", "cnns", "Intro", 4, "Distinct window."), 0.88),
    ];
    let context = assembler(2000, 2000).assemble(&retrieval, None);

    assert_eq!(context.passages().len(), 2);
    assert_eq!(context.passages()[0].text, "Overlapping window A.");
}

#[test]
fn passages_without_provenance_are_excluded() {
    let retrieval = vec![
        scored(passage("p1", "", "Orphan", 0, "No chapter id, cannot be cited."), 0.95),
        scored(passage("p2", "cnns", "Intro", 0, "Citable passage."), 0.90),
    ];
    let context = assembler(2000, 2000).assemble(&retrieval, None);

    assert_eq!(context.passages().len(), 1);
    assert_eq!(context.passages()[0].citation.chapter_id, "cnns");
}

#[test]
fn assembly_is_deterministic() {
    let retrieval = vec![
        scored(passage("p1", "rl", "Rewards", 0, "The agent maximizes expected reward."), 0.9),
        scored(passage("p2", "rl", "Policies", 1, "A policy maps states to actions."), 0.8),
    ];
    let assembler = assembler(2000, 2000);
    let first = assembler.assemble(&retrieval, Some("selected"));
    let second = assembler.assemble(&retrieval, Some("selected"));
    assert_eq!(first, second);
}

#[test]
fn empty_retrieval_and_no_selection_yields_empty_context() {
    let context = assembler(2000, 2000).assemble(&vec![], None);
    assert!(context.is_empty());
    assert_eq!(context.token_count(), 0);
}

#[test]
fn contains_citation_only_covers_admitted_passages() {
    let retrieval = vec![scored(passage("p1", "cnns", "Intro", 0, "Citable."), 0.9)];
    let context = assembler(2000, 2000).assemble(&retrieval, None);

    assert!(context.contains_citation(&Citation {
        chapter_id: "cnns".into(),
        section_title: "Intro".into()
    }));
    assert!(!context.contains_citation(&Citation {
        chapter_id: "transformers".into(),
        section_title: "Attention".into()
    }));
}

#[test]
fn shrink_drops_lowest_scored_passages_first() {
    let retrieval = vec![
        scored(passage("p1", "cnns", "Intro", 0, "Highest scored passage text."), 0.95),
        scored(passage("p2", "cnns", "Pooling", 1, "Middle scored passage text."), 0.85),
        scored(passage("p3", "cnns", "Heads", 2, "Lowest scored passage text."), 0.75),
    ];
    let counter = TokenCounter::new().unwrap();
    let mut context = assembler(2000, 2000).assemble(&retrieval, None);
    let keep_two =
        context.passages()[0].tokens + context.passages()[1].tokens;

    context.shrink_to(keep_two, &counter);

    assert_eq!(context.passages().len(), 2);
    assert_eq!(context.passages()[1].citation.section_title, "Pooling");
    assert!(context.token_count() <= keep_two);
}
