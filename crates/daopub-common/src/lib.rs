//! Daopub-Common: shared types and rules for the finding-aid publisher.
//!
//! This crate provides functionality used across daopub:
//!
//! - **Typed IDs**: [`CallNumber`] and [`ComponentId`] so a collection key is
//!   never confused with a `callNumber/component` key
//! - **Path Rules**: the component classification rule and image sequence
//!   naming
//! - **Error Handling**: the unified [`Error`] type and result alias
//!
//! # Examples
//!
//! ```
//! use daopub_common::{CallNumber, ComponentId, Error, Result};
//! use daopub_common::paths::is_component_name;
//!
//! let call_number: CallNumber = "C0022".parse().unwrap();
//! let component = ComponentId::new(call_number, "c0031").unwrap();
//! assert_eq!(component.to_string(), "C0022/c0031");
//! assert_eq!(component.sanitized(), "C0022_c0031");
//!
//! assert!(is_component_name("c0031"));
//! assert!(!is_component_name("c0031.pdf"));
//!
//! fn example() -> Result<()> {
//!     Err(Error::not_found("call number directory", "C9999"))
//! }
//! assert!(example().is_err());
//! ```

pub mod error;
pub mod ids;
pub mod paths;

pub use error::{Error, ErrorKind, Result};
pub use ids::*;
