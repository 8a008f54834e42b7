//! Descriptive metadata for components and collections.
//!
//! - [`provider`] -- the [`MetadataProvider`] trait and [`ComponentTitle`].
//! - [`findingaids`] -- HTTP client for the finding-aids XML service.

pub mod findingaids;
pub mod provider;

pub use findingaids::FindingAidsClient;
pub use provider::{ComponentTitle, MetadataProvider};
