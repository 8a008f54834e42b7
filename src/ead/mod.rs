//! EAD Updater.
//!
//! Links a component's `<did>` to its METS record with an idempotent
//! `<dao>` upsert. The finding aid of a collection is shared by all of its
//! components, so callers serialize updates through
//! [`Collection::lock_ead`](crate::collection::Collection::lock_ead).

mod dao;

pub use dao::{upsert_dao, Upsert, UpsertError, METS_ROLE};

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use daopub_common::error::IoResultExt;
use daopub_common::{ComponentId, Error, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::collection::Collection;
use crate::xml::check_well_formed;

/// What an EAD update did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DaoOutcome {
    Inserted,
    AlreadyPresent,
}

/// Modification time and length, compared before replacing the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

impl Fingerprint {
    fn of(path: &Path) -> Result<Self> {
        let meta = fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::not_found("EAD document", path.display()),
            _ => Error::fs(path, e),
        })?;
        Ok(Self {
            modified: meta.modified().ok(),
            len: meta.len(),
        })
    }
}

/// Check that a finding aid exists and is well-formed.
pub fn check_document(path: &Path) -> Result<()> {
    Fingerprint::of(path)?;
    let xml = fs::read_to_string(path).at_path(path)?;
    check_well_formed(&xml).map_err(|message| Error::invalid_document(path, message))
}

/// Upsert the `<dao>` for `component_id` into the finding aid at `path`.
///
/// The file is replaced (temp file in the same directory, then rename) only
/// when a `<dao>` was inserted. If the file changed between the read and the
/// replace, nothing is written and [`Error::ConcurrentMutation`] is returned.
pub fn upsert_dao_file(path: &Path, component_id: &str, href: &str) -> Result<DaoOutcome> {
    let before = Fingerprint::of(path)?;
    let xml = fs::read_to_string(path).at_path(path)?;

    let updated = match upsert_dao(&xml, component_id, href) {
        Ok(Upsert::AlreadyPresent) => {
            debug!(ead = %path.display(), component = component_id, "DAO already present");
            return Ok(DaoOutcome::AlreadyPresent);
        }
        Ok(Upsert::Inserted(doc)) => doc,
        Err(UpsertError::Malformed(message)) => {
            return Err(Error::invalid_document(path, message));
        }
        Err(UpsertError::ComponentNotFound) => {
            return Err(Error::not_found(
                format!("component in {}", path.display()),
                component_id,
            ));
        }
        Err(UpsertError::MissingDid) => {
            return Err(Error::invalid_document(
                path,
                format!("component {component_id} has no <did>"),
            ));
        }
    };

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir).at_path(dir)?;
    tmp.write_all(updated.as_bytes()).at_path(tmp.path())?;
    tmp.as_file().sync_all().at_path(tmp.path())?;
    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions()).at_path(tmp.path())?;
    }

    if Fingerprint::of(path)? != before {
        return Err(Error::ConcurrentMutation {
            path: path.to_path_buf(),
        });
    }

    tmp.persist(path).map_err(|e| Error::fs(path, e.error))?;
    info!(ead = %path.display(), component = component_id, href, "Inserted DAO");
    Ok(DaoOutcome::Inserted)
}

/// Link `id` to its METS record in the collection's finding aid.
///
/// Holds the collection's EAD lock across the whole read-modify-write and
/// runs the file work on the blocking pool.
pub async fn link_component(
    collection: &Collection,
    ead_path: PathBuf,
    id: &ComponentId,
    href: String,
) -> Result<DaoOutcome> {
    let _guard = collection.lock_ead().await;
    let sanitized = id.sanitized();
    let path = ead_path.clone();

    tokio::task::spawn_blocking(move || upsert_dao_file(&path, &sanitized, &href))
        .await
        .map_err(|e| Error::invalid_document(ead_path, format!("EAD update task failed: {e}")))?
}
