//! Publication State Check.
//!
//! State is recomputed from the filesystem on every run. The PDF in the
//! image store is the publication marker: a component with a PDF is done,
//! a component without one runs the whole pipeline again.

use std::path::PathBuf;

use daopub_common::{CallNumber, ComponentId};
use serde::Serialize;

use crate::config::Config;

/// Which part of the pipeline a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Metadata, pre-METS, transform, EAD link, PDF.
    Publish,
    /// Regenerate METS for already published components only.
    MetsOnly,
    /// PDF assembly only.
    PdfOnly,
}

impl RunMode {
    /// Whether this mode links components from the finding aid.
    pub fn updates_ead(self) -> bool {
        matches!(self, RunMode::Publish)
    }

    /// Whether this mode needs the component title.
    pub fn needs_metadata(self) -> bool {
        !matches!(self, RunMode::PdfOnly)
    }
}

/// Artifact locations for one component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentPaths {
    pub image_dir: PathBuf,
    pub archival_dir: PathBuf,
    pub pdf: PathBuf,
    pub pre_mets: PathBuf,
    pub mets: PathBuf,
    /// Public URL of the METS file; the converter docid and the DAO href.
    pub mets_url: String,
}

impl ComponentPaths {
    pub fn new(config: &Config, id: &ComponentId) -> Self {
        let stores = &config.stores;
        let callno = id.call_number().as_str();
        let name = id.name();
        let work_root = stores.work_dir.as_ref().unwrap_or(&stores.image_store);

        Self {
            image_dir: stores.image_store.join(callno).join(name),
            archival_dir: stores.archival_store.join(callno).join(name),
            pdf: stores.image_store.join(callno).join(format!("{name}.pdf")),
            pre_mets: work_root.join(callno).join(format!("{name}.xml")),
            mets: stores.mets_root.join(callno).join(format!("{name}.mets")),
            mets_url: format!(
                "{}/{}/{}.mets",
                config.finding_aids.folders_url.trim_end_matches('/'),
                callno,
                name
            ),
        }
    }
}

/// The EAD finding aid of a collection held by `repository`.
pub fn ead_path(config: &Config, repository: &str, call_number: &CallNumber) -> PathBuf {
    config
        .stores
        .ead_root
        .join(repository)
        .join(format!("{call_number}.EAD.xml"))
}

/// Observable artifacts of one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PublicationState {
    pub pdf: bool,
    pub pre_mets: bool,
    pub mets: bool,
    pub archival_images: bool,
}

impl PublicationState {
    /// Stat the component's artifacts.
    pub fn inspect(paths: &ComponentPaths) -> Self {
        Self {
            pdf: paths.pdf.is_file(),
            pre_mets: paths.pre_mets.is_file(),
            mets: paths.mets.is_file(),
            archival_images: paths.archival_dir.is_dir(),
        }
    }

    /// The publication marker is present.
    pub fn is_published(&self) -> bool {
        self.pdf
    }
}

/// Whether a component needs work in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Run,
    SkipPublished,
    SkipUnpublished,
}

/// Apply the publication gate.
///
/// `force` only overrides the gate of modes that would otherwise skip
/// published components; METS-only runs always require a PDF, which is one
/// of the converter's inputs.
pub fn decide(state: &PublicationState, mode: RunMode, force: bool) -> Decision {
    match mode {
        RunMode::Publish | RunMode::PdfOnly if state.is_published() && !force => {
            Decision::SkipPublished
        }
        RunMode::MetsOnly if !state.is_published() => Decision::SkipUnpublished,
        _ => Decision::Run,
    }
}
