//! Per-map dependency resolution
//!
//! Computes the transitive closure of files a map needs beyond the
//! baseline: geometry -> surface shaders -> textures, geometry -> models ->
//! shaders -> textures, plus sounds, music, the level preview image and the
//! arena description.
//!
//! Each step is a pure accumulator returning the paths it contributes; the
//! top-level [`map_assets`] unions them and subtracts the baseline set once
//! at the end. Nothing here mutates the manifest, so any number of maps can
//! resolve concurrently against one manifest reference.
//!
//! Missing assets are dropped silently throughout: shipped game content
//! routinely references textures and sounds behind disabled shader paths.

use crate::manifest::GameManifest;
use crate::{texture, Result, StorageError};
use pakette_formats::{bsp, md3};
use std::collections::BTreeSet;
use tracing::debug;

/// Resolve one shader reference to the files that make it renderable
///
/// A known shader contributes its declared textures (extension-probed) plus
/// the script file defining it; a definition with no texture references
/// falls back to the shader's own name as an implicit texture. An unknown
/// name is treated as a direct texture path.
pub fn shader_textures(shader_name: &str, manifest: &GameManifest) -> BTreeSet<String> {
    let lower = shader_name.to_ascii_lowercase();
    let mut needed = BTreeSet::new();

    if let Some(textures) = manifest.shaders.get(&lower) {
        for reference in textures {
            if let Some(resolved) = texture::resolve(reference, &manifest.file_index) {
                needed.insert(resolved);
            }
        }
        if textures.is_empty() {
            if let Some(resolved) = texture::resolve(&lower, &manifest.file_index) {
                needed.insert(resolved);
            }
        }
        // The script travels with the archive so the engine can find the
        // definition at load time
        if let Some(script) = manifest.shader_files.get(&lower) {
            needed.insert(script.clone());
        }
    } else if let Some(resolved) = texture::resolve(&lower, &manifest.file_index) {
        needed.insert(resolved);
    }

    needed
}

/// Resolve a model reference: the model file plus its shader closure
///
/// A model absent from the index contributes nothing. A model that fails
/// structural parsing still contributes itself, just without a shader
/// closure.
pub fn model_dependencies(model_path: &str, manifest: &GameManifest) -> BTreeSet<String> {
    let lower = model_path.to_ascii_lowercase();
    let mut needed = BTreeSet::new();

    if !manifest.file_index.contains_key(&lower) {
        return needed;
    }
    needed.insert(lower.clone());

    let Ok(data) = manifest.read_file(&lower) else {
        return needed;
    };
    match md3::parse_shaders(&data) {
        Ok(shader_refs) => {
            for reference in shader_refs {
                needed.extend(shader_textures(&reference, manifest));
            }
        }
        Err(err) => debug!(model = %lower, "skipping model shaders: {err}"),
    }

    needed
}

/// Compute the non-baseline file set for one map
///
/// The map's compiled geometry must exist in the index; its absence, or a
/// structural parse failure, is fatal for this map (and only this map).
/// An empty result is valid: the map needs nothing beyond the baseline.
pub fn map_assets(map_name: &str, manifest: &GameManifest) -> Result<BTreeSet<String>> {
    let map_name = map_name.to_ascii_lowercase();
    let bsp_path = format!("maps/{map_name}.bsp");

    if !manifest.file_index.contains_key(&bsp_path) {
        return Err(StorageError::MapNotFound(bsp_path));
    }

    let mut needed = BTreeSet::new();
    needed.insert(bsp_path.clone());

    let bsp_data = manifest.read_file(&bsp_path)?;
    let assets = bsp::parse(&bsp_data)?;
    debug!(
        map = %map_name,
        shaders = assets.shaders.len(),
        models = assets.models.len(),
        sounds = assets.sounds.len(),
        music = assets.music.len(),
        "decoded map geometry"
    );

    for shader_name in &assets.shaders {
        needed.extend(shader_textures(shader_name, manifest));
    }

    for model_path in &assets.models {
        needed.extend(model_dependencies(model_path, manifest));
    }

    for sound_path in assets.sounds.iter().chain(assets.music.iter()) {
        let lower = sound_path.to_ascii_lowercase();
        if manifest.file_index.contains_key(&lower) {
            needed.insert(lower);
        }
    }

    for ext in [".jpg", ".tga"] {
        let levelshot = format!("levelshots/{map_name}{ext}");
        if manifest.file_index.contains_key(&levelshot) {
            needed.insert(levelshot);
            break;
        }
    }

    let arena = format!("scripts/{map_name}.arena");
    if manifest.file_index.contains_key(&arena) {
        needed.insert(arena);
    }

    // Baseline subtraction happens exactly once, here, regardless of how
    // many resolution paths rediscovered a baseline file
    Ok(&needed - &manifest.baseline_files)
}
