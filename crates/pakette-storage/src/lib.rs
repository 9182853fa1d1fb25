//! pk3 archive store and per-map dependency resolution
//!
//! This crate turns a Quake 3 installation (a directory of pk3 archives per
//! game variant) into servable pieces:
//!
//! - a case-insensitive file index across all archives in load order
//! - a baseline archive of the assets every map shares
//! - a persisted [`manifest::Manifest`] snapshotting index, baseline set and
//!   shader corpus
//! - one archive per map, containing only that map's non-baseline
//!   dependencies, computed by [`resolver`] from the map geometry, shader
//!   scripts and referenced models
//!
//! The manifest is built once and read-only afterwards; per-map resolution
//! shares it without locking.

#![warn(missing_docs)]

pub mod baseline;
mod error;
pub mod manifest;
pub mod pk3;
pub mod resolver;
pub mod texture;

pub use error::{Result, StorageError};
