pub mod client;
pub mod embeddings;
pub mod memory;
pub mod qdrant_retrieval;
pub mod retrieval;
pub mod retry;

pub use client::{RetrievalClient, RetrievalSettings};
pub use embeddings::EmbeddingClient;
pub use memory::InMemoryRetrieval;
pub use qdrant_retrieval::QdrantRetrieval;
pub use retrieval::{KnowledgeRetrieval, RetrievalError, RetrievalRequest, ScoredDocument};
pub use retry::{RetryPolicy, RetrySettings};
