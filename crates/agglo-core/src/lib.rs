//! agglo-core library.
//!
//! Canonical dendrogram fixtures and partition divergence checks used to
//! regression-test agglomerative clustering engines against each other.
//!
//! # Conventions
//!
//! - **Errors**: Core operations return [`error::CoreError`]; configuration
//!   loading uses `anyhow::Result`.
//! - **Logging**: The core never logs. Callers decide how to report failures.

pub mod config;
pub mod dendrogram;
pub mod error;
pub mod io;
pub mod partition;

pub use dendrogram::{CanonicalTree, MergeRecord, NodeId, canonicalize};
pub use error::{AlignmentError, CoreError, DegenerateInputError, ErrorCode, StructuralError};
pub use partition::{
    CanonicalCluster, DisagreementGroup, DisagreementPair, Divergence, Label, Vocabulary,
    canonical_clusters, compare_partitions,
};
