//! Image Sequencer: merges a delivered batch of page images into a
//! component's canonical `00000001.ext, 00000002.ext, ...` sequence.
//!
//! Appended files keep the lexical order of the batch directory and are
//! numbered from `count + 1`, where `count` is the number of files with the
//! same extension already in the destination. Existing files are never
//! touched. The destination is held under an exclusive lock for the whole
//! batch so a concurrent ingest cannot interleave indices.

mod lock;

pub use lock::DirectoryLock;

use std::fs;
use std::path::{Path, PathBuf};

use daopub_common::error::IoResultExt;
use daopub_common::paths::{has_extension, sequence_file_name};
use daopub_common::{ComponentId, Error, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::Config;

/// One file moved into the sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub source: PathBuf,
    pub index: u32,
    pub destination: PathBuf,
}

/// Result of appending one batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SequenceReport {
    /// Files with the extension present before the batch.
    pub existing: u32,
    /// Files appended, in assignment order.
    pub assigned: Vec<Assignment>,
}

impl SequenceReport {
    /// Highest index in the destination after the batch.
    pub fn last_index(&self) -> u32 {
        self.assigned
            .last()
            .map(|a| a.index)
            .unwrap_or(self.existing)
    }
}

/// Append every `ext` file of `source` to the sequence in `dest`.
///
/// `dest` (and its parents) are created if absent. On the first file that
/// cannot be moved the batch stops with [`Error::Sequence`] naming that file
/// and the last index that was assigned, so a retry resumes cleanly: already
/// moved files are gone from `source` and counted in `dest`.
pub fn append_sequence(source: &Path, dest: &Path, ext: &str) -> Result<SequenceReport> {
    if !source.is_dir() {
        return Err(Error::not_found("batch directory", source.display()));
    }

    fs::create_dir_all(dest).at_path(dest)?;
    let source_real = fs::canonicalize(source).at_path(source)?;
    let dest_real = fs::canonicalize(dest).at_path(dest)?;
    if source_real.starts_with(&dest_real) || dest_real.starts_with(&source_real) {
        return Err(Error::validation(format!(
            "batch {} and destination {} must be separate directories",
            source.display(),
            dest.display()
        )));
    }

    let _lock = DirectoryLock::exclusive(dest)?;

    let existing = count_with_extension(dest, ext)?;
    let batch = sorted_batch(source, ext)?;
    debug!(
        source = %source.display(),
        dest = %dest.display(),
        existing,
        incoming = batch.len(),
        "Appending image batch"
    );

    let mut report = SequenceReport {
        existing,
        assigned: Vec::with_capacity(batch.len()),
    };
    let mut next = existing;

    for file in batch {
        let last_assigned = next;
        next = next.checked_add(1).ok_or_else(|| Error::Sequence {
            file: file.clone(),
            last_assigned,
            reason: "sequence index overflow".to_string(),
        })?;

        let target = dest.join(sequence_file_name(next, ext));
        if target.exists() {
            return Err(Error::Sequence {
                file,
                last_assigned,
                reason: format!(
                    "{} already exists; destination sequence is not contiguous",
                    target.display()
                ),
            });
        }

        move_file(&file, &target).map_err(|e| Error::Sequence {
            file: file.clone(),
            last_assigned,
            reason: e.to_string(),
        })?;

        report.assigned.push(Assignment {
            source: file,
            index: next,
            destination: target,
        });
    }

    info!(
        dest = %dest.display(),
        appended = report.assigned.len(),
        last_index = report.last_index(),
        "Image batch sequenced"
    );

    Ok(report)
}

/// Reports for both stores of an ingested batch.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub component: ComponentId,
    pub images: SequenceReport,
    pub archival: SequenceReport,
}

/// Move a delivered batch into a component in both stores.
///
/// Derivative images go from `<image_store>/<batch>` to
/// `<image_store>/<callno>/<component>`; masters from
/// `<archival_store>/<batch>` to `<archival_store>/<callno>/<component>`.
/// The archival side is skipped when the batch carries no masters.
pub fn ingest_batch(config: &Config, batch: &str, component: &ComponentId) -> Result<IngestReport> {
    if batch.is_empty() || batch.contains('/') || batch.contains('\\') || batch.starts_with('.') {
        return Err(Error::validation(format!(
            "batch '{batch}' must be a single directory name"
        )));
    }

    let stores = &config.stores;
    let relative = Path::new(component.call_number().as_str()).join(component.name());

    let images = append_sequence(
        &stores.image_store.join(batch),
        &stores.image_store.join(&relative),
        &config.pipeline.image_extension,
    )?;

    let archival_batch = stores.archival_store.join(batch);
    let archival = if archival_batch.is_dir() {
        append_sequence(
            &archival_batch,
            &stores.archival_store.join(&relative),
            &config.pipeline.archival_extension,
        )?
    } else {
        debug!(batch = %archival_batch.display(), "No archival batch to ingest");
        SequenceReport::default()
    };

    Ok(IngestReport {
        component: component.clone(),
        images,
        archival,
    })
}

fn count_with_extension(dir: &Path, ext: &str) -> Result<u32> {
    let mut count: u32 = 0;
    for entry in fs::read_dir(dir).at_path(dir)? {
        let path = entry.at_path(dir)?.path();
        if path.is_file() && has_extension(&path, ext) {
            count += 1;
        }
    }
    Ok(count)
}

fn sorted_batch(source: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(source).at_path(source)? {
        let path = entry.at_path(source)?.path();
        if path.is_file() && has_extension(&path, ext) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Rename, falling back to copy + remove when the rename cannot cross
/// filesystems. On error the file is left only at `from`.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            if fs::copy(from, to).is_err() {
                let _ = fs::remove_file(to);
                return Err(rename_err);
            }
            if let Err(e) = fs::remove_file(from) {
                let _ = fs::remove_file(to);
                return Err(e);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, body: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn creates_missing_destination_and_parent() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("batch");
        touch(&src, "b.jp2", "b");
        touch(&src, "a.jp2", "a");
        let dest = tmp.path().join("C0022").join("c0031");

        let report = append_sequence(&src, &dest, "jp2").unwrap();

        assert_eq!(report.existing, 0);
        assert_eq!(report.last_index(), 2);
        assert_eq!(fs::read_to_string(dest.join("00000001.jp2")).unwrap(), "a");
        assert_eq!(fs::read_to_string(dest.join("00000002.jp2")).unwrap(), "b");
    }

    #[test]
    fn ignores_other_extensions() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("batch");
        touch(&src, "scan.jp2", "x");
        touch(&src, "Thumbs.db", "");
        touch(&src, "scan.tif", "");
        let dest = tmp.path().join("dest");
        touch(&dest, "00000001.jp2", "");
        touch(&dest, "c0031.pdf", "");

        let report = append_sequence(&src, &dest, ".jp2").unwrap();

        assert_eq!(report.existing, 1);
        assert_eq!(report.assigned.len(), 1);
        assert_eq!(report.assigned[0].index, 2);
        assert!(src.join("scan.tif").exists());
    }

    #[test]
    fn collision_stops_with_last_assigned_index() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("batch");
        touch(&src, "a.jp2", "");
        touch(&src, "b.jp2", "");
        let dest = tmp.path().join("dest");
        // Gappy destination: one file counted, but index 3 already taken.
        touch(&dest, "00000003.jp2", "");

        let err = append_sequence(&src, &dest, "jp2").unwrap_err();
        match err {
            Error::Sequence {
                file,
                last_assigned,
                ..
            } => {
                assert_eq!(file, src.join("b.jp2"));
                assert_eq!(last_assigned, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The first file was moved and stays moved.
        assert!(dest.join("00000002.jp2").exists());
        assert!(!src.join("a.jp2").exists());
    }

    #[test]
    fn same_source_and_destination_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("C0022/c0031");
        for n in 1..=3 {
            touch(&dir, &format!("{n:08}.jp2"), "");
        }

        let err = append_sequence(&dir, &dir, "jp2").unwrap_err();
        assert_eq!(err.kind(), daopub_common::ErrorKind::Validation);

        // Same directory through a different spelling.
        let dotted = tmp.path().join("C0022/./c0031");
        assert!(append_sequence(&dotted, &dir, "jp2").is_err());

        let mut names: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        names.sort();
        assert_eq!(names, ["00000001.jp2", "00000002.jp2", "00000003.jp2"]);
    }

    #[test]
    fn nested_directories_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let dest = tmp.path().join("c0031");
        let inner = dest.join("incoming");
        touch(&inner, "a.jp2", "");

        assert!(append_sequence(&inner, &dest, "jp2").is_err());
        assert!(append_sequence(&dest, &inner, "jp2").is_err());
        assert!(inner.join("a.jp2").exists());
    }

    #[cfg(unix)]
    #[test]
    fn failed_move_leaves_no_copy_behind() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("batch");
        touch(&src, "a.jp2", "page");
        let dest = tmp.path().join("dest");
        fs::create_dir(&dest).unwrap();

        // A read-only batch directory lets the copy succeed but not the removal.
        fs::set_permissions(&src, fs::Permissions::from_mode(0o555)).unwrap();
        let permissions_enforced = fs::write(src.join("check"), "").is_err();
        if !permissions_enforced {
            // Running with privileges that ignore directory permissions.
            let _ = fs::remove_file(src.join("check"));
            fs::set_permissions(&src, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = move_file(&src.join("a.jp2"), &dest.join("00000001.jp2"));
        fs::set_permissions(&src, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(result.is_err());
        assert!(src.join("a.jp2").exists());
        assert!(!dest.join("00000001.jp2").exists());
    }

    #[test]
    fn missing_source_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = append_sequence(&tmp.path().join("nope"), &tmp.path().join("dest"), "jp2")
            .unwrap_err();
        assert_eq!(err.kind(), daopub_common::ErrorKind::NotFound);
    }

    #[test]
    fn ingest_moves_both_stores() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.stores.image_store = tmp.path().join("jp2s");
        config.stores.archival_store = tmp.path().join("tiffs");
        touch(&config.stores.image_store.join("delivery7"), "p1.jp2", "");
        touch(&config.stores.archival_store.join("delivery7"), "p1.tif", "");

        let id: ComponentId = "C0022/c0031".parse().unwrap();
        let report = ingest_batch(&config, "delivery7", &id).unwrap();

        assert_eq!(report.images.assigned.len(), 1);
        assert_eq!(report.archival.assigned.len(), 1);
        assert!(config
            .stores
            .archival_store
            .join("C0022/c0031/00000001.tif")
            .exists());
    }

    #[test]
    fn ingest_rejects_path_like_batch() {
        let config = Config::default();
        let id: ComponentId = "C0022/c0031".parse().unwrap();
        assert!(ingest_batch(&config, "../etc", &id).is_err());
    }
}
