//! Run orchestration for one call number.
//!
//! Discovery and the publication gate run up front on the calling task.
//! Components that need work are then dispatched as tasks, at most
//! `workers` at a time, each inside its own `component` tracing span.
//! Component failures are recorded in the [`RunReport`]; only a missing call
//! number directory fails the run as a whole.

use std::sync::Arc;

use daopub_common::{CallNumber, ComponentId, Error, Result};
use tokio::sync::Semaphore;
use tracing::{error, info, warn, Instrument};

use crate::collection::{Collection, CollectionRegistry};
use crate::config::Config;
use crate::ead;
use crate::metadata::{FindingAidsClient, MetadataProvider};
use crate::pipeline::{PipelineExecutor, Stage, StageFailure};
use crate::report::{OutcomeStatus, RunReport, SkipReason};
use crate::scanner;
use crate::state::{self, ComponentPaths, Decision, PublicationState, RunMode};

/// Options for one run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    pub mode: RunMode,
    /// Ignore the PDF gate.
    pub force: bool,
    /// Report what would run without running it.
    pub dry_run: bool,
    /// Override `pipeline.workers`.
    pub jobs: Option<usize>,
}

impl RunOptions {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            force: false,
            dry_run: false,
            jobs: None,
        }
    }
}

/// Publishes the components of a collection.
pub struct Processor {
    config: Arc<Config>,
    provider: Arc<dyn MetadataProvider>,
    registry: Arc<CollectionRegistry>,
}

impl Processor {
    /// Build a processor backed by the finding-aids service.
    pub fn new(config: Config) -> Result<Self> {
        let provider = FindingAidsClient::new(&config.finding_aids)?;
        Ok(Self::with_provider(config, Arc::new(provider)))
    }

    /// Build a processor with a specific metadata provider.
    pub fn with_provider(config: Config, provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            config: Arc::new(config),
            provider,
            registry: Arc::new(CollectionRegistry::new()),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process every component of `call_number`.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] when the call number has no directory in the
    /// image store, or a filesystem error while listing it. Everything past
    /// discovery is reported per component.
    pub async fn run(&self, call_number: &CallNumber, options: RunOptions) -> Result<RunReport> {
        let mut report = RunReport::new(call_number.clone(), options.mode, options.dry_run);
        let components = scanner::list_components(&self.config.stores.image_store, call_number)?;
        info!(
            collection = %call_number,
            components = components.len(),
            mode = ?options.mode,
            force = options.force,
            "Discovered components"
        );

        let mut pending: Vec<(ComponentId, ComponentPaths)> = Vec::new();
        for id in components {
            let paths = ComponentPaths::new(&self.config, &id);
            let state = PublicationState::inspect(&paths);
            match state::decide(&state, options.mode, options.force) {
                Decision::Run => pending.push((id, paths)),
                Decision::SkipPublished => report.record(
                    id,
                    OutcomeStatus::Skipped {
                        reason: SkipReason::AlreadyPublished,
                    },
                ),
                Decision::SkipUnpublished => report.record(
                    id,
                    OutcomeStatus::Skipped {
                        reason: SkipReason::NotPublished,
                    },
                ),
            }
        }

        if options.dry_run {
            for (id, _) in pending {
                info!(component = %id, "[DRY RUN] Would process");
                report.record(id, OutcomeStatus::WouldRun);
            }
            report.finish();
            return Ok(report);
        }

        let collection = self.registry.get(call_number);

        if !pending.is_empty() && options.mode.updates_ead() {
            if let Err(e) = self.preflight(&collection).await {
                error!(collection = %call_number, error = %e, "Collection preflight failed");
                for (id, _) in pending {
                    report.record(id, OutcomeStatus::failed(Stage::Collection, &e));
                }
                report.collection_error = Some(e.to_string());
                report.finish();
                return Ok(report);
            }
        }

        let workers = options.jobs.unwrap_or(self.config.pipeline.workers).max(1);
        let semaphore = Arc::new(Semaphore::new(workers));
        let executor = Arc::new(PipelineExecutor::new(
            self.config.clone(),
            self.provider.clone(),
        ));

        let mut handles = Vec::with_capacity(pending.len());
        for (id, paths) in pending {
            let semaphore = semaphore.clone();
            let executor = executor.clone();
            let collection = collection.clone();
            let mode = options.mode;
            let span = tracing::info_span!("component", id = %id);
            let task_id = id.clone();

            let handle = tokio::spawn(
                async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return Err(StageFailure {
                                stage: Stage::Collection,
                                error: Error::validation("worker pool closed"),
                            })
                        }
                    };
                    info!("Processing component");
                    executor
                        .execute(mode, &task_id, &paths, &collection)
                        .await
                }
                .instrument(span),
            );
            handles.push((id, handle));
        }

        for (id, handle) in handles {
            let status = match handle.await {
                Ok(Ok(artifacts)) => OutcomeStatus::Published { dao: artifacts.dao },
                Ok(Err(failure)) => {
                    warn!(
                        component = %id,
                        stage = %failure.stage,
                        error = %failure.error,
                        "Component failed"
                    );
                    OutcomeStatus::from(failure)
                }
                Err(join_error) => {
                    error!(component = %id, error = %join_error, "Component task aborted");
                    OutcomeStatus::failed(
                        Stage::Collection,
                        &Error::validation(format!("component task aborted: {join_error}")),
                    )
                }
            };
            report.record(id, status);
        }

        report.finish();
        info!(
            collection = %call_number,
            published = report.summary.published,
            skipped = report.summary.skipped,
            failed = report.summary.failed,
            "Run complete"
        );
        Ok(report)
    }

    /// Resolve the repository id and check the finding aid once, before any
    /// component touches it.
    async fn preflight(&self, collection: &Collection) -> Result<()> {
        let repository = collection.repository_id(self.provider.as_ref()).await?;
        let path = state::ead_path(&self.config, repository, collection.call_number());
        tokio::task::spawn_blocking({
            let path = path.clone();
            move || ead::check_document(&path)
        })
        .await
        .map_err(|e| Error::invalid_document(&path, format!("EAD check task failed: {e}")))?
    }
}
