//! daopub - publishes digitized archival folders.
//!
//! For each component (a folder of page images under a call number) the
//! pipeline produces a METS record and a PDF, and links the METS record from
//! the collection's EAD finding aid. This library crate exposes the core
//! functionality for the `daopub` binary and for integration testing.

pub mod collection;
pub mod config;
pub mod ead;
pub mod metadata;
pub mod pipeline;
pub mod processor;
pub mod report;
pub mod scanner;
pub mod sequencer;
pub mod state;
pub mod tools;
pub mod xml;
