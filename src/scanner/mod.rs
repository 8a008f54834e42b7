//! Component Discovery.
//!
//! Enumerates the components of a collection by listing
//! `<image_store>/<callno>` and classifying each entry by name with
//! [`is_component_name`]. Publication artifacts (`c0031.pdf`), pre-METS
//! descriptors (`c0031.xml`) and hidden lock files are skipped by that rule.

use std::fs::{self, ReadDir};
use std::path::{Path, PathBuf};

use daopub_common::error::IoResultExt;
use daopub_common::paths::is_component_name;
use daopub_common::{CallNumber, ComponentId, Error, Result};
use tracing::{debug, warn};

/// Lazy iterator over the components of one collection.
///
/// Yields entries in directory order. A per-entry read error is yielded as
/// an `Err` item and iteration continues with the next entry.
#[derive(Debug)]
pub struct Components {
    call_number: CallNumber,
    dir: PathBuf,
    entries: ReadDir,
}

impl Components {
    /// The collection directory being listed.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Iterator for Components {
    type Item = Result<ComponentId>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.entries.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(Error::fs(&self.dir, e))),
            };

            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    warn!(dir = %self.dir.display(), name = ?raw, "Skipping non-UTF-8 entry");
                    continue;
                }
            };

            if !is_component_name(&name) {
                debug!(entry = %name, "Not a component");
                continue;
            }

            return Some(ComponentId::new(self.call_number.clone(), name));
        }
    }
}

/// List the components of `call_number` under `root`.
///
/// # Errors
///
/// [`Error::NotFound`] when `root/call_number` does not exist; a missing
/// collection is never reported as "zero components".
pub fn discover_components(root: &Path, call_number: &CallNumber) -> Result<Components> {
    let dir = root.join(call_number.as_str());
    if !dir.is_dir() {
        return Err(Error::not_found("call number directory", dir.display()));
    }

    let entries = fs::read_dir(&dir).at_path(&dir)?;
    Ok(Components {
        call_number: call_number.clone(),
        dir,
        entries,
    })
}

/// Collect and sort every component, failing on the first unreadable entry.
pub fn list_components(root: &Path, call_number: &CallNumber) -> Result<Vec<ComponentId>> {
    let mut components = discover_components(root, call_number)?.collect::<Result<Vec<_>>>()?;
    components.sort();
    Ok(components)
}
