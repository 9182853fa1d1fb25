//! Texture path probing
//!
//! Shader scripts and geometry reference textures by abstract path, often
//! with an extension that does not match the shipped file (authored as
//! `.tga`, shipped as `.jpg`). Resolution probes the engine's search order.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Image extension search order
pub const TEXTURE_EXTENSIONS: [&str; 3] = [".tga", ".jpg", ".png"];

/// Find the actual indexed file for an abstract texture path
///
/// A path already carrying a known extension is looked up literally first,
/// then stripped and re-probed across all extensions; a bare path probes all
/// extensions in order. Returns the lowercased resolved path, or `None` when
/// no candidate is indexed.
pub fn resolve(path: &str, file_index: &BTreeMap<String, PathBuf>) -> Option<String> {
    let lower = path.to_ascii_lowercase();

    for ext in TEXTURE_EXTENSIONS {
        if let Some(base) = lower.strip_suffix(ext) {
            if file_index.contains_key(&lower) {
                return Some(lower);
            }
            return resolve_with_extensions(base, file_index);
        }
    }

    resolve_with_extensions(&lower, file_index)
}

fn resolve_with_extensions(
    base: &str,
    file_index: &BTreeMap<String, PathBuf>,
) -> Option<String> {
    TEXTURE_EXTENSIONS
        .iter()
        .map(|ext| format!("{base}{ext}"))
        .find(|candidate| file_index.contains_key(candidate))
}
