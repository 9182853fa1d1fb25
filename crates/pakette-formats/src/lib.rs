//! File format decoders for Quake 3 asset packaging
//!
//! This crate parses the on-disk formats that carry asset references in a
//! Quake 3 content distribution, extracting exactly the information needed
//! to compute a map's (or a recorded demo's) file dependencies:
//!
//! - **BSP**: compiled map geometry, entity text and surface shader lumps
//! - **MD3**: skeletal models and their per-surface shader references
//! - **Shader scripts**: brace-scoped material definitions and their
//!   texture maps
//! - **Skin files**: per-player-model surface/texture assignments
//! - **TVD demos**: recorded matches, with configstring state recovered
//!   from the bit-packed snapshot-delta frame stream
//!
//! All binary decoders read through the bounds-checked [`cursor::Cursor`];
//! truncated or undersized input surfaces as a structural parse error,
//! never as an out-of-bounds access.

#![warn(missing_docs)]

pub mod bsp;
pub mod cursor;
pub mod demo;
pub mod md3;
pub mod shader;
pub mod skin;
