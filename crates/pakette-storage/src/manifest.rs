//! Build manifest
//!
//! The manifest is a serialized snapshot of one build's resolver state: the
//! cross-archive file index, the baseline exclusion set, and the parsed
//! shader corpus, per game variant. It is written once by the baseline
//! builder and reloaded read-only by per-map and demo packaging; rebuilding
//! it means re-scanning every pk3, which is exactly what the snapshot
//! exists to avoid.

use crate::{pk3, Result, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Per-build manifest covering all game variants
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Manifest {
    /// Game variant name -> its manifest
    pub games: BTreeMap<String, GameManifest>,
}

/// Per-game-variant manifest data
///
/// All keys are lowercased virtual paths or shader names; matching is never
/// case-sensitive.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameManifest {
    /// Lowercased virtual path -> source pk3
    pub file_index: BTreeMap<String, PathBuf>,
    /// Paths excluded from per-map archives (baseline + override pak
    /// contents)
    pub baseline_files: BTreeSet<String>,
    /// Lowercased shader name -> raw texture references it declares
    pub shaders: BTreeMap<String, Vec<String>>,
    /// Lowercased shader name -> script file that defined it
    pub shader_files: BTreeMap<String, String>,
}

impl Manifest {
    /// Load a manifest from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        serde_json::from_slice(&data).map_err(|source| StorageError::Manifest {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the manifest to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let data = serde_json::to_vec(self).map_err(|source| StorageError::Manifest {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, data)?;
        Ok(())
    }

    /// Borrow one game's manifest, failing when the variant is unknown
    pub fn game(&self, game: &str) -> Result<&GameManifest> {
        self.games
            .get(game)
            .ok_or_else(|| StorageError::UnknownGame(game.to_string()))
    }
}

impl GameManifest {
    /// Read a file through the index, locating its source pk3
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let lower = path.to_ascii_lowercase();
        let pk3_path = self
            .file_index
            .get(&lower)
            .ok_or_else(|| StorageError::NotIndexed(path.to_string()))?;
        pk3::read_file(pk3_path, &lower)
    }

    /// Rebuild this manifest on top of `base`
    ///
    /// Used when an expansion shares assets with its base game: the result
    /// is a copy holding the union of both, with this manifest's entries
    /// winning on conflicting keys. Neither input is modified.
    pub fn merged_over(&self, base: &Self) -> Self {
        let mut merged = base.clone();
        merged.file_index.extend(
            self.file_index
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged
            .baseline_files
            .extend(self.baseline_files.iter().cloned());
        merged
            .shaders
            .extend(self.shaders.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged.shader_files.extend(
            self.shader_files
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged
    }
}
