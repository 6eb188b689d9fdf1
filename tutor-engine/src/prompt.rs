//! Prompt templates for the grounded tutor and its sibling flows.
//!
//! The grounding rules and the citation marker format are load-bearing:
//! the answerer's citation validator parses the exact `[Source: …]`
//! markers this module instructs the model to emit, and the refusal
//! marker is what lets the pipeline classify a response as a refusal
//! without trusting free-form phrasing.

use std::fmt::Write as _;

use tutor_rag::AssembledContext;

/// The marker a compliant model emits when the context cannot support an
/// answer.
pub const REFUSAL_MARKER: &str = "INSUFFICIENT_CONTEXT";

/// System instruction for grounded question answering.
pub const GROUNDED_SYSTEM_PROMPT: &str = "\
You are a helpful AI tutor for an interactive textbook.

Rules:
1. Answer ONLY using information from the context provided by the user.
2. Support every factual claim by copying the exact [Source: chapter - section] \
marker of the context block it came from.
3. If the context does not contain enough information to answer, reply with \
exactly: INSUFFICIENT_CONTEXT
4. Keep answers concise and educational.
5. Use examples from the context when available.";

/// Render the user-turn prompt: context blocks, then the question.
///
/// Selected text is always the first block. Each retrieved passage is
/// prefixed with its `[Source: …]` marker so the model can copy it
/// verbatim into the answer.
pub fn grounded_user_prompt(context: &AssembledContext, question: &str) -> String {
    let mut prompt = String::from("Context from textbook:\n");

    if let Some(selected) = context.selected_text() {
        let _ = writeln!(prompt, "\n[Selected by the reader]\n{selected}");
    }

    for passage in context.passages() {
        let _ = writeln!(
            prompt,
            "\n[Source: {} - {}]\n{}",
            passage.citation.chapter_id, passage.citation.section_title, passage.text
        );
    }

    let _ = write!(
        prompt,
        "\nQuestion: {question}\n\n\
         Answer the question based only on the context above, citing the \
         relevant chapter and section."
    );
    prompt
}

/// Render a citation marker the way the context blocks do.
pub fn citation_marker(chapter_id: &str, section_title: &str) -> String {
    format!("[Source: {chapter_id} - {section_title}]")
}

/// Reading-level guidelines for chapter personalization.
fn level_guidelines(level: &str) -> &'static str {
    match level {
        "advanced" => {
            "Technical depth, advanced concepts, research references, optimization techniques"
        }
        "intermediate" => {
            "Balance theory and practice, some technical terms ok, add coding examples"
        }
        _ => "Use simple language, add many examples, explain basic concepts, avoid jargon",
    }
}

/// System instruction for the personalization flow.
pub fn personalize_system_prompt(level: &str) -> String {
    format!(
        "You are adapting a textbook chapter for a {level} level student.\n\n\
         Guidelines:\n{}\n\n\
         Keep the core information accurate but adapt the presentation style.",
        level_guidelines(level)
    )
}

/// User-turn prompt for the personalization flow.
pub fn personalize_user_prompt(chapter_content: &str, level: &str) -> String {
    format!(
        "Original chapter content:\n{chapter_content}\n\n\
         Please adapt this for a {level} level student."
    )
}

/// System instruction for the translation flow (educational Urdu).
pub const TRANSLATE_SYSTEM_PROMPT: &str = "\
You are translating a textbook to educational Urdu.

Guidelines:
1. Translate naturally, not word-for-word
2. Keep technical terms in English when appropriate (e.g. CNN, GPU, PyTorch)
3. Use educational Urdu suitable for university students
4. Maintain technical accuracy
5. Use proper Urdu script (not Roman Urdu)";

/// User-turn prompt for the translation flow.
pub fn translate_user_prompt(chapter_content: &str) -> String {
    format!("Translate this textbook content to educational Urdu:\n\n{chapter_content}")
}

#[cfg(test)]
mod tests {
    use tutor_core::{Passage, ScoredPassage, TokenCounter};
    use tutor_rag::{AssemblerConfig, ContextAssembler};

    use super::*;

    fn context_with(selected: Option<&str>) -> AssembledContext {
        let retrieval = vec![ScoredPassage {
            passage: Passage {
                id: "p1".into(),
                text: "Gradients flow backwards through the network.".into(),
                embedding: vec![],
                chapter_id: "neural-networks".into(),
                section_title: "Backprop".into(),
                position: 0,
            },
            score: 0.9,
        }];
        ContextAssembler::new(AssemblerConfig::default(), TokenCounter::new().unwrap())
            .assemble(&retrieval, selected)
    }

    #[test]
    fn selected_text_precedes_passages() {
        let prompt = grounded_user_prompt(&context_with(Some("the highlighted bit")), "why?");
        let selected_at = prompt.find("[Selected by the reader]").unwrap();
        let source_at = prompt.find("[Source: neural-networks - Backprop]").unwrap();
        assert!(selected_at < source_at);
    }

    #[test]
    fn question_comes_after_all_context() {
        let prompt = grounded_user_prompt(&context_with(None), "How does backpropagation work?");
        let source_at = prompt.find("[Source:").unwrap();
        let question_at = prompt.find("Question: How does backpropagation work?").unwrap();
        assert!(source_at < question_at);
    }

    #[test]
    fn marker_format_matches_system_prompt_contract() {
        assert_eq!(
            citation_marker("neural-networks", "Backprop"),
            "[Source: neural-networks - Backprop]"
        );
    }
}
