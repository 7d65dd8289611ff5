//! Core domain model for resona.
//!
//! This crate defines the catalog data model (Track, ListeningEvent,
//! TasteProfile), the embedding byte codec and vector math, and the
//! SQLite catalog store.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod embedding;
pub mod error;
pub mod model;
pub mod schema;

pub use error::{Error, Result};
