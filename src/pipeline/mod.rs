//! Artifact Pipeline.
//!
//! Per component, in fixed order: metadata, pre-METS conversion, METS
//! transform, EAD link, PDF assembly. Every stage must succeed before the
//! next one starts; a failure leaves earlier artifacts in place for the next
//! run to overwrite.

pub mod executor;
pub mod stages;

use std::fmt;

use serde::Serialize;

pub use executor::{Artifacts, PipelineExecutor, StageFailure};

/// A step of the per-component pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Collection-level preflight (repository id, finding aid present).
    Collection,
    Metadata,
    PreMets,
    Transform,
    Ead,
    Pdf,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Collection => "collection",
            Stage::Metadata => "metadata",
            Stage::PreMets => "pre-mets",
            Stage::Transform => "transform",
            Stage::Ead => "ead",
            Stage::Pdf => "pdf",
        };
        f.write_str(name)
    }
}
