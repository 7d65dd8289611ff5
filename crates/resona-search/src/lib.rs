//! Retrieval and personalization engines for resona.
//!
//! Implements the vector similarity store, the embedding-gateway
//! collaborator boundary, the taste fingerprint builder, the
//! recommender, and the semantic search resolver.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod error;
pub mod fingerprint;
pub mod gateway;
pub mod recommend;
pub mod search;
pub mod vector_store;

pub use error::{EngineError, EngineResult};
pub use fingerprint::build_fingerprint;
pub use gateway::{EmbeddingGateway, HttpEmbeddingGateway};
pub use recommend::recommend;
pub use search::search;
pub use vector_store::{Neighbor, VectorRecord, VectorStore};
