//! fille-vector
//!
//! In-memory exact nearest-neighbour index over corpus embeddings. Built once
//! at startup and shared read-only across requests.

pub mod index;
pub mod metric;

pub use fille_core::Metric;
pub use index::{Neighbor, SimilarityIndex};
