//! Context assembly: fold retrieved passages and selected text into a
//! token-bounded context block.

use tracing::debug;

use tutor_core::{Citation, RetrievalResult, TokenCounter};

use crate::config::AssemblerConfig;

/// A passage admitted into the assembled context.
#[derive(Debug, Clone, PartialEq)]
pub struct ContextPassage {
    /// The passage text.
    pub text: String,
    /// Citation provenance for this passage.
    pub citation: Citation,
    /// Position of the passage within its chapter (dedup key component).
    pub position: u32,
    /// Similarity score from retrieval.
    pub score: f32,
    /// Token count of `text`, measured at assembly time.
    pub tokens: usize,
}

/// A token-bounded context ready for grounded generation.
///
/// Owned exclusively by the request that created it; never cached or shared.
/// The optional selected-text block always precedes the passage blocks, and
/// the passage blocks retain retrieval order (score descending).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AssembledContext {
    selected_text: Option<String>,
    selected_text_tokens: usize,
    passages: Vec<ContextPassage>,
}

impl AssembledContext {
    /// The user-selected text block, if any.
    pub fn selected_text(&self) -> Option<&str> {
        self.selected_text.as_deref()
    }

    /// The admitted passages, score-descending.
    pub fn passages(&self) -> &[ContextPassage] {
        &self.passages
    }

    /// Total token count across all blocks.
    pub fn token_count(&self) -> usize {
        self.selected_text_tokens + self.passages.iter().map(|p| p.tokens).sum::<usize>()
    }

    /// Whether the context carries no content at all.
    pub fn is_empty(&self) -> bool {
        self.selected_text.is_none() && self.passages.is_empty()
    }

    /// Whether a citation is traceable to a passage in this context.
    ///
    /// Selected text is caller-supplied and does not create citable
    /// provenance; only retrieved passages do.
    pub fn contains_citation(&self, citation: &Citation) -> bool {
        self.passages.iter().any(|p| p.citation == *citation)
    }

    /// The distinct citations available in this context.
    pub fn citations(&self) -> Vec<Citation> {
        let mut seen = Vec::new();
        for passage in &self.passages {
            if !seen.contains(&passage.citation) {
                seen.push(passage.citation.clone());
            }
        }
        seen
    }

    /// Shrink the context to fit `budget` tokens, dropping lowest-scored
    /// passages first and truncating selected text only as a last resort.
    ///
    /// This is the answerer's defensive re-check; under normal operation
    /// the assembler has already bounded the context and this is a no-op.
    pub fn shrink_to(&mut self, budget: usize, counter: &TokenCounter) {
        while self.token_count() > budget {
            if self.passages.pop().is_none() {
                break;
            }
        }
        if self.token_count() > budget {
            if let Some(text) = self.selected_text.take() {
                let truncated = truncate_to_tokens(&text, budget, counter);
                self.selected_text_tokens = counter.count(&truncated);
                self.selected_text = Some(truncated);
            }
        }
    }
}

/// Assembles retrieval output into an [`AssembledContext`].
///
/// Pure and deterministic: identical inputs (and configuration) produce
/// byte-identical contexts, which the response cache relies on.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    config: AssemblerConfig,
    counter: TokenCounter,
}

impl ContextAssembler {
    /// Create an assembler with the given budgets and token counter.
    pub fn new(config: AssemblerConfig, counter: TokenCounter) -> Self {
        Self { config, counter }
    }

    /// Fold `retrieval` and optional `selected_text` into a bounded context.
    ///
    /// Selected text takes strict precedence: it is always the first block,
    /// and if it alone exceeds its budget it is truncated to that budget
    /// and the retrieval results are dropped entirely (user-highlighted
    /// text is the authoritative scope). Passages are admitted whole in
    /// score-descending order until the next passage would exceed the
    /// retrieved-context budget; passages lacking provenance metadata or
    /// duplicating an already-admitted `(chapter, position)` are skipped.
    pub fn assemble(
        &self,
        retrieval: &RetrievalResult,
        selected_text: Option<&str>,
    ) -> AssembledContext {
        let mut context = AssembledContext::default();

        if let Some(raw) = selected_text {
            let trimmed = raw.trim();
            if !trimmed.is_empty() {
                let tokens = self.counter.count(trimmed);
                if tokens > self.config.selected_text_budget_tokens {
                    let truncated = truncate_to_tokens(
                        trimmed,
                        self.config.selected_text_budget_tokens,
                        &self.counter,
                    );
                    context.selected_text_tokens = self.counter.count(&truncated);
                    context.selected_text = Some(truncated);
                    debug!(
                        budget = self.config.selected_text_budget_tokens,
                        "selected text exceeded budget; retrieval dropped"
                    );
                    return context;
                }
                context.selected_text_tokens = tokens;
                context.selected_text = Some(trimmed.to_string());
            }
        }

        let mut passage_tokens = 0usize;
        for scored in retrieval {
            let passage = &scored.passage;
            if !passage.is_citable() {
                debug!(passage_id = %passage.id, "skipping passage without provenance");
                continue;
            }
            let duplicate = context
                .passages
                .iter()
                .any(|p| p.citation.chapter_id == passage.chapter_id && p.position == passage.position);
            if duplicate {
                continue;
            }
            let tokens = self.counter.count(&passage.text);
            if passage_tokens + tokens > self.config.context_budget_tokens {
                break;
            }
            passage_tokens += tokens;
            context.passages.push(ContextPassage {
                text: passage.text.clone(),
                citation: Citation {
                    chapter_id: passage.chapter_id.clone(),
                    section_title: passage.section_title.clone(),
                },
                position: passage.position,
                score: scored.score,
                tokens,
            });
        }

        debug!(
            passage_count = context.passages.len(),
            token_count = context.token_count(),
            has_selected_text = context.selected_text.is_some(),
            "context assembled"
        );
        context
    }
}

/// Truncate `text` to the longest char-boundary prefix within `budget` tokens.
fn truncate_to_tokens(text: &str, budget: usize, counter: &TokenCounter) -> String {
    if counter.count(text) <= budget {
        return text.to_string();
    }
    let boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).chain([text.len()]).collect();
    // Binary search over prefix length in chars.
    let mut lo = 0usize;
    let mut hi = boundaries.len() - 1;
    while lo < hi {
        let mid = (lo + hi).div_ceil(2);
        if counter.count(&text[..boundaries[mid]]) <= budget {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    text[..boundaries[lo]].to_string()
}
