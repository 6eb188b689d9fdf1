//! Property tests for in-memory vector store search ordering.

use std::collections::HashMap;

use proptest::prelude::*;
use tutor_core::Passage;
use tutor_rag::{InMemoryVectorStore, VectorStore};

/// Generate a non-zero L2-normalized embedding of the given dimension.
fn arb_normalized_embedding(dim: usize) -> impl Strategy<Value = Vec<f32>> {
    proptest::collection::vec(-1.0f32..1.0f32, dim).prop_filter_map(
        "non-zero embedding",
        |mut v| {
            let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-8 {
                return None;
            }
            for val in &mut v {
                *val /= norm;
            }
            Some(v)
        },
    )
}

/// Generate a passage with a normalized embedding.
fn arb_passage(dim: usize) -> impl Strategy<Value = Passage> {
    ("[a-z]{3,8}", "[a-z ]{5,30}", arb_normalized_embedding(dim), 0u32..50).prop_map(
        |(id, text, embedding, position)| Passage {
            id,
            text,
            embedding,
            chapter_id: "chapter-1".to_string(),
            section_title: "Section".to_string(),
            position,
        },
    )
}

mod prop_inmemory_search_ordering {
    use super::*;

    const DIM: usize = 16;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// For any set of stored passages, search returns results ordered by
        /// descending cosine similarity, bounded by top_k.
        #[test]
        fn results_ordered_descending_and_bounded_by_top_k(
            passages in proptest::collection::vec(arb_passage(DIM), 1..20),
            query in arb_normalized_embedding(DIM),
            top_k in 1usize..25,
        ) {
            let rt = tokio::runtime::Runtime::new().unwrap();
            let (results, unique_count) = rt.block_on(async {
                let store = InMemoryVectorStore::new();
                store.create_collection("test", DIM).await.unwrap();

                // Deduplicate passages by id to avoid upsert overwriting
                let mut deduped: HashMap<String, Passage> = HashMap::new();
                for passage in &passages {
                    deduped.entry(passage.id.clone()).or_insert_with(|| passage.clone());
                }
                let unique: Vec<Passage> = deduped.into_values().collect();
                let count = unique.len();

                store.upsert("test", &unique).await.unwrap();
                let results = store.search("test", &query, top_k).await.unwrap();
                (results, count)
            });

            prop_assert!(results.len() <= top_k);
            prop_assert!(results.len() <= unique_count);

            for window in results.windows(2) {
                prop_assert!(
                    window[0].score >= window[1].score,
                    "results not in descending order: {} < {}",
                    window[0].score,
                    window[1].score,
                );
            }
        }
    }
}

#[tokio::test]
async fn search_on_missing_collection_errors() {
    let store = InMemoryVectorStore::new();
    assert!(store.search("missing", &[1.0, 0.0], 5).await.is_err());
}

#[tokio::test]
async fn upsert_overwrites_by_id() {
    let store = InMemoryVectorStore::new();
    store.create_collection("test", 2).await.unwrap();

    let mut passage = Passage {
        id: "p1".to_string(),
        text: "old".to_string(),
        embedding: vec![1.0, 0.0],
        chapter_id: "ch".to_string(),
        section_title: "s".to_string(),
        position: 0,
    };
    store.upsert("test", std::slice::from_ref(&passage)).await.unwrap();
    passage.text = "new".to_string();
    store.upsert("test", std::slice::from_ref(&passage)).await.unwrap();

    let results = store.search("test", &[1.0, 0.0], 5).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].passage.text, "new");
}
