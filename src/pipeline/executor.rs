use std::path::{Path, PathBuf};
use std::sync::Arc;

use daopub_common::error::IoResultExt;
use daopub_common::{ComponentId, Error, Result};
use tempfile::TempPath;
use tracing::{debug, info, warn};

use super::stages::{pdf_command, pre_mets_command, transform_command, ConverterInputs};
use super::Stage;
use crate::collection::Collection;
use crate::config::Config;
use crate::ead::{self, DaoOutcome};
use crate::metadata::MetadataProvider;
use crate::sequencer::DirectoryLock;
use crate::state::{self, ComponentPaths, RunMode};
use crate::tools::ToolCommand;

/// A stage error, tagged with the stage that produced it.
#[derive(Debug)]
pub struct StageFailure {
    pub stage: Stage,
    pub error: Error,
}

/// Attach the failing stage to a library error.
trait AtStage<T> {
    fn at_stage(self, stage: Stage) -> std::result::Result<T, StageFailure>;
}

impl<T> AtStage<T> for Result<T> {
    fn at_stage(self, stage: Stage) -> std::result::Result<T, StageFailure> {
        self.map_err(|error| StageFailure { stage, error })
    }
}

/// Artifacts produced for one component.
#[derive(Debug, Clone, Default)]
pub struct Artifacts {
    pub title: Option<String>,
    pub mets: Option<PathBuf>,
    pub pdf: Option<PathBuf>,
    pub dao: Option<DaoOutcome>,
}

/// Runs the stages of one component.
pub struct PipelineExecutor {
    config: Arc<Config>,
    provider: Arc<dyn MetadataProvider>,
}

impl PipelineExecutor {
    pub fn new(config: Arc<Config>, provider: Arc<dyn MetadataProvider>) -> Self {
        Self { config, provider }
    }

    /// Execute the stages `mode` calls for, stopping at the first failure.
    pub async fn execute(
        &self,
        mode: RunMode,
        id: &ComponentId,
        paths: &ComponentPaths,
        collection: &Collection,
    ) -> std::result::Result<Artifacts, StageFailure> {
        let mut artifacts = Artifacts::default();

        let title = if mode.needs_metadata() {
            let title = self
                .provider
                .component_title(id)
                .await
                .at_stage(Stage::Metadata)?
                .display();
            debug!(title = %title, "Fetched component title");
            Some(title)
        } else {
            None
        };

        // Held until the component is done, so the image sequence cannot be
        // renumbered under the tools reading it.
        let first_stage = if title.is_some() {
            Stage::PreMets
        } else {
            Stage::Pdf
        };
        let _sources = lock_sources(paths).await.at_stage(first_stage)?;

        if let Some(title) = title {
            let inputs = ConverterInputs {
                archival: paths.archival_dir.is_dir(),
                pdf: mode == RunMode::MetsOnly,
            };
            let staged = StagedOutput::new(&paths.pre_mets).at_stage(Stage::PreMets)?;
            let cmd = pre_mets_command(&self.config.tools, paths, id, inputs, staged.path());
            run_tool(&cmd, staged.path()).await.at_stage(Stage::PreMets)?;
            staged.commit().at_stage(Stage::PreMets)?;

            let staged = StagedOutput::new(&paths.mets).at_stage(Stage::Transform)?;
            let cmd = transform_command(&self.config.tools, paths, &title, staged.path());
            run_tool(&cmd, staged.path()).await.at_stage(Stage::Transform)?;
            staged.commit().at_stage(Stage::Transform)?;

            artifacts.title = Some(title);
            artifacts.mets = Some(paths.mets.clone());
        }

        if mode.updates_ead() {
            let repository = collection
                .repository_id(self.provider.as_ref())
                .await
                .at_stage(Stage::Ead)?;
            let ead_path = state::ead_path(&self.config, repository, id.call_number());
            let outcome =
                ead::link_component(collection, ead_path, id, paths.mets_url.clone())
                    .await
                    .at_stage(Stage::Ead)?;
            artifacts.dao = Some(outcome);
        }

        // Last: the PDF marks the component as published.
        if matches!(mode, RunMode::Publish | RunMode::PdfOnly) {
            let archival = paths.archival_dir.is_dir();
            if !archival {
                warn!(
                    archival_dir = %paths.archival_dir.display(),
                    "No archival images; assembling PDF from derivatives"
                );
            }
            // A partial PDF must never land on the publication marker.
            let staged = StagedOutput::new(&paths.pdf).at_stage(Stage::Pdf)?;
            let cmd = pdf_command(&self.config.tools, paths, archival, staged.path());
            run_tool(&cmd, staged.path()).await.at_stage(Stage::Pdf)?;
            staged.commit().at_stage(Stage::Pdf)?;
            artifacts.pdf = Some(paths.pdf.clone());
        }

        info!(component = %id, "Component complete");
        Ok(artifacts)
    }
}

/// Shared locks on the component's image directories.
///
/// Waits (off the async workers) while a sequencer holds a directory.
async fn lock_sources(paths: &ComponentPaths) -> Result<Vec<DirectoryLock>> {
    let mut locks = Vec::with_capacity(2);
    for dir in [&paths.image_dir, &paths.archival_dir] {
        if !dir.is_dir() {
            continue;
        }
        if let Some(lock) = DirectoryLock::try_shared(dir)? {
            locks.push(lock);
            continue;
        }

        info!(dir = %dir.display(), "Waiting for image sequencing to finish");
        let dir = dir.to_path_buf();
        let lock = tokio::task::spawn_blocking(move || DirectoryLock::shared(&dir))
            .await
            .map_err(|e| Error::validation(format!("directory lock task failed: {e}")))??;
        locks.push(lock);
    }
    Ok(locks)
}

/// A tool output written to a hidden sibling of its final path and renamed
/// into place only once the tool has succeeded.
///
/// The sibling does not exist when the tool starts, so a tool that exits 0
/// without writing is caught even when an older artifact is in place.
/// Dropping an uncommitted output removes whatever the tool left behind.
struct StagedOutput {
    temp: TempPath,
    target: PathBuf,
}

impl StagedOutput {
    fn new(target: &Path) -> Result<Self> {
        let dir = target.parent().unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).at_path(dir)?;
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let temp = tempfile::Builder::new()
            .prefix(".tmp-")
            .suffix(&format!("-{name}"))
            .tempfile_in(dir)
            .at_path(dir)?
            .into_temp_path();
        std::fs::remove_file(&temp).at_path(&temp)?;

        Ok(Self {
            temp,
            target: target.to_path_buf(),
        })
    }

    fn path(&self) -> &Path {
        &self.temp
    }

    fn commit(self) -> Result<()> {
        self.temp
            .persist(&self.target)
            .map_err(|e| Error::fs(&self.target, e.error))
    }
}

/// Run a tool and check that it wrote `output`.
async fn run_tool(cmd: &ToolCommand, output: &Path) -> Result<()> {
    let out = cmd.execute().await?;
    if !out.stdout.trim().is_empty() {
        debug!(tool = cmd.name(), stdout = %out.stdout.trim(), "Tool output");
    }
    if !output.is_file() {
        return Err(Error::ExternalTool {
            tool: cmd.name().to_string(),
            status: out.status.code(),
            stderr: out.stderr,
            message: format!("exited successfully but did not write {}", output.display()),
        });
    }
    Ok(())
}
