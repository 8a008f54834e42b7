//! Trait definition and types for descriptive metadata sources.

use std::fmt;

use async_trait::async_trait;
use daopub_common::{CallNumber, ComponentId, Result};
use serde::{Deserialize, Serialize};

use crate::xml::normalize_whitespace;

/// Unit title and date of a component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentTitle {
    pub title: String,
    pub date: Option<String>,
}

impl ComponentTitle {
    /// Whitespace-normalize both parts; an empty date counts as absent.
    pub fn new(title: &str, date: Option<&str>) -> Self {
        Self {
            title: normalize_whitespace(title),
            date: date.map(normalize_whitespace).filter(|d| !d.is_empty()),
        }
    }

    /// The METS title parameter: `"<title>: <date>"` with double quotes
    /// removed, or the bare title when the component is undated.
    pub fn display(&self) -> String {
        let joined = match &self.date {
            Some(date) => format!("{}: {}", self.title, date),
            None => self.title.clone(),
        };
        joined.replace('"', "")
    }
}

impl fmt::Display for ComponentTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Source of component titles and collection repository ids.
///
/// Implementations are shared across worker tasks behind an `Arc`.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"findingaids"`).
    fn name(&self) -> &'static str;

    /// Fetch the unit title and date of a component.
    ///
    /// Fails with `MetadataUnavailable` when the document cannot be fetched
    /// or has no unit title.
    async fn component_title(&self, id: &ComponentId) -> Result<ComponentTitle>;

    /// Fetch the id of the repository holding a collection.
    async fn repository_id(&self, call_number: &CallNumber) -> Result<String>;
}
