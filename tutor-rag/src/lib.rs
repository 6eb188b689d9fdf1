//! Retrieval and context assembly for the Tutor engine.
//!
//! Given a user question, the [`Retriever`] embeds it and searches a
//! [`VectorStore`] for the most similar textbook passages above a
//! similarity threshold. The [`ContextAssembler`] then folds those
//! passages (and any user-selected text) into a token-bounded
//! [`AssembledContext`] ready for grounded generation.
//!
//! Vector store backends: [`InMemoryVectorStore`] always, Qdrant behind the
//! `qdrant` feature. Embedding backends: the OpenAI embeddings API behind
//! the `openai` feature.

pub mod assembler;
pub mod config;
pub mod embedding;
pub mod inmemory;
#[cfg(feature = "openai")]
pub mod openai;
#[cfg(feature = "qdrant")]
pub mod qdrant;
pub mod retriever;
pub mod vectorstore;

pub use assembler::{AssembledContext, ContextAssembler, ContextPassage};
pub use config::{AssemblerConfig, RetrieverConfig};
pub use embedding::EmbeddingProvider;
pub use inmemory::InMemoryVectorStore;
#[cfg(feature = "openai")]
pub use openai::OpenAiEmbeddings;
#[cfg(feature = "qdrant")]
pub use qdrant::QdrantVectorStore;
pub use retriever::Retriever;
pub use vectorstore::VectorStore;
