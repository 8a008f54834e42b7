//! Typed identifiers for collections and components.
//!
//! A [`CallNumber`] names a collection (e.g. `C0022`). A [`ComponentId`] is
//! the two-segment key `callNumber/componentName` used for image directories,
//! METS paths, DAO hrefs and (with `/` replaced by `_`) EAD `<c>` ids.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};
use crate::paths::is_component_name;

/// Identifier of an archival collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallNumber(String);

impl CallNumber {
    /// Validate and wrap a call number.
    ///
    /// Call numbers become a single path segment, so they may not be empty,
    /// contain a path separator, or be a relative path marker.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::validation("call number is empty"));
        }
        if trimmed.contains('/') || trimmed.contains('\\') {
            return Err(Error::validation(format!(
                "call number '{trimmed}' contains a path separator"
            )));
        }
        if trimmed == "." || trimmed == ".." {
            return Err(Error::validation(format!(
                "call number '{trimmed}' is not a directory name"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The call number as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for CallNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl fmt::Display for CallNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for CallNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for CallNumber {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Identifier of one component (a folder of page images) within a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId {
    call_number: CallNumber,
    name: String,
}

impl ComponentId {
    /// Build a component id, enforcing the component naming rule.
    pub fn new(call_number: CallNumber, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !is_component_name(&name) || name.contains('/') || name.contains('\\') {
            return Err(Error::validation(format!(
                "'{name}' is not a valid component name"
            )));
        }
        Ok(Self { call_number, name })
    }

    /// The owning collection.
    pub fn call_number(&self) -> &CallNumber {
        &self.call_number
    }

    /// The component directory name (e.g. `c0031`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The id used for `<c id="...">` in the finding aid (`C0022_c0031`).
    pub fn sanitized(&self) -> String {
        format!("{}_{}", self.call_number, self.name)
    }
}

impl FromStr for ComponentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (call_number, name) = s.trim().split_once('/').ok_or_else(|| {
            Error::validation(format!("component id '{s}' must look like CALLNO/COMPONENT"))
        })?;
        Self::new(call_number.parse()?, name)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.call_number, self.name)
    }
}

impl Serialize for ComponentId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ComponentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
