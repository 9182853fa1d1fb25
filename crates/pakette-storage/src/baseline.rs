//! Baseline builder and build orchestration
//!
//! The baseline archive holds the assets common to every map (UI, HUD,
//! weapon and powerup models, shared sounds, scripts) so per-map archives
//! only carry what a specific map adds. Classification is by path prefix:
//! the include list wins over the exclude list, then a root-level config
//! rule, then map-specific by default. Both lists encode shipped-content
//! knowledge and are not derivable from anything; change them only against
//! real game data.

use crate::manifest::{GameManifest, Manifest};
use crate::{pk3, resolver, Result, StorageError};
use pakette_formats::shader;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Path prefixes always packaged into the baseline
pub const BASELINE_INCLUDE_PREFIXES: [&str; 26] = [
    "gfx/",
    "sprites/",
    "icons/",
    "fonts/",
    "menu/",
    "ui/",
    "botfiles/",
    "models/weapons/",
    "models/weapons2/",
    "models/weaphits/",
    "models/powerups/",
    "models/mapobjects/",
    "models/flags/",
    "models/ammo/",
    "models/gibs/",
    "models/misc/",
    "sound/",
    "scripts/",
    "vm/",
    "textures/sfx/",
    "textures/effects/",
    "textures/sfx2/",
    "textures/effects2/",
    "textures/ctf2/",
    "team_icon/",
    "models/players/",
];

/// Path prefixes kept out of the baseline when no include prefix matched
pub const BASELINE_EXCLUDE_PREFIXES: [&str; 8] = [
    "textures/",
    "maps/",
    "env/",
    "levelshots/",
    "demos/",
    "video/",
    "music/",
    "models/players/",
];

/// Classify a lowercased path as baseline (common) or map-specific
pub fn is_baseline_path(lower_path: &str) -> bool {
    // Specific includes override the broad excludes
    if BASELINE_INCLUDE_PREFIXES
        .iter()
        .any(|prefix| lower_path.starts_with(prefix))
    {
        return true;
    }

    if BASELINE_EXCLUDE_PREFIXES
        .iter()
        .any(|prefix| lower_path.starts_with(prefix))
    {
        return false;
    }

    // Root-level config files
    !lower_path.contains('/') && lower_path.ends_with(".cfg")
}

/// Build one game variant's baseline archive and manifest entry
///
/// Baseline archive content comes from official paks only. Override pak
/// contents join the baseline *set* but never the baseline archive: the
/// playback runtime mounts override paks itself, and a copy in any output
/// archive would shadow that mount.
pub fn build_game_baseline(
    game: &str,
    pk3_paths: &[PathBuf],
    output_dir: &Path,
) -> Result<GameManifest> {
    let file_index = pk3::build_file_index(pk3_paths)?;

    let mut official_paks = Vec::new();
    let mut override_paks = Vec::new();
    for pk3_path in pk3_paths {
        let name = pk3_path.to_string_lossy();
        if pk3::is_official_pak(&name) {
            official_paks.push(pk3_path.clone());
        } else if pk3::is_override_pak(&name) {
            override_paks.push(pk3_path.clone());
        }
    }

    // Later official paks override earlier ones for the same path
    let mut baseline_content: BTreeMap<String, Vec<u8>> = BTreeMap::new();
    for pk3_path in &official_paks {
        pk3::iterate_pk3(pk3_path, |name, file| {
            if name.ends_with('/') {
                return Ok(());
            }
            let lower = name.to_ascii_lowercase();
            if !is_baseline_path(&lower) {
                return Ok(());
            }
            let mut data = Vec::new();
            file.read_to_end(&mut data).map_err(|source| StorageError::Entry {
                archive: pk3_path.clone(),
                entry: lower.clone(),
                source,
            })?;
            baseline_content.insert(lower, data);
            Ok(())
        })?;
    }

    let output_path = output_dir.join(format!("{game}.pk3"));
    pk3::write_pk3(&output_path, &baseline_content)?;
    info!(
        game,
        files = baseline_content.len(),
        output = %output_path.display(),
        "baseline archive written"
    );

    let mut baseline_files: BTreeSet<String> = baseline_content.into_keys().collect();

    for pk3_path in &override_paks {
        let before = baseline_files.len();
        pk3::iterate_pk3(pk3_path, |name, _| {
            if !name.ends_with('/') {
                baseline_files.insert(name.to_ascii_lowercase());
            }
            Ok(())
        })?;
        debug!(
            archive = %pk3_path.display(),
            added = baseline_files.len() - before,
            "override pak contents added to baseline set"
        );
    }

    // Shader corpus, in load order: later definitions shadow earlier ones,
    // matching the engine's script loading
    let mut shaders = BTreeMap::new();
    let mut shader_files = BTreeMap::new();
    for pk3_path in pk3_paths {
        if let Err(err) = parse_shader_corpus(pk3_path, &mut shaders, &mut shader_files) {
            warn!(archive = %pk3_path.display(), "shader parse skipped: {err}");
        }
    }
    debug!(game, shaders = shaders.len(), "shader corpus parsed");

    Ok(GameManifest {
        file_index,
        baseline_files,
        shaders,
        shader_files,
    })
}

/// Collect shader definitions from one pk3's `scripts/*.shader` entries
fn parse_shader_corpus(
    pk3_path: &Path,
    shaders: &mut BTreeMap<String, Vec<String>>,
    shader_files: &mut BTreeMap<String, String>,
) -> Result<()> {
    pk3::iterate_pk3(pk3_path, |name, file| {
        let lower = name.to_ascii_lowercase();
        if !lower.starts_with("scripts/") || !lower.ends_with(".shader") {
            return Ok(());
        }

        let mut text = Vec::new();
        if file.read_to_end(&mut text).is_err() {
            // A single unreadable script forfeits its definitions, nothing
            // else
            return Ok(());
        }

        for def in shader::parse(&String::from_utf8_lossy(&text)) {
            let key = def.name.to_ascii_lowercase();
            shaders.insert(key.clone(), def.textures);
            shader_files.insert(key, lower.clone());
        }
        Ok(())
    })
}

/// Resolve one map and write its archive
///
/// Returns the number of files written, or `None` when the map needs
/// nothing beyond the baseline (no archive is produced).
pub fn build_map_archive(
    map_name: &str,
    manifest: &GameManifest,
    output_path: &Path,
) -> Result<Option<usize>> {
    let needed = resolver::map_assets(map_name, manifest)?;
    if needed.is_empty() {
        info!(map = map_name, "no files needed beyond baseline");
        return Ok(None);
    }

    let paths: Vec<String> = needed.into_iter().collect();
    let files = pk3::extract_files(&paths, &manifest.file_index)?;
    pk3::write_pk3(output_path, &files)?;
    info!(
        map = map_name,
        files = files.len(),
        output = %output_path.display(),
        "map archive written"
    );
    Ok(Some(files.len()))
}

/// Build everything for a game installation
///
/// Builds each variant's baseline and manifest entry, rebuilds the
/// expansion's manifest as the union with the base game, persists the
/// manifest, then builds every map discovered across the merged indexes
/// exactly once. Per-map failures are logged and skipped; a malformed map
/// must not sink the batch.
pub fn build_all(quake3_dir: &Path, output_dir: &Path) -> Result<Manifest> {
    std::fs::create_dir_all(output_dir)?;
    std::fs::create_dir_all(output_dir.join("maps"))?;

    let game_pk3s = pk3::collect_game_pk3s(quake3_dir);
    if game_pk3s.is_empty() {
        return Err(StorageError::NoGameData(quake3_dir.to_path_buf()));
    }

    let mut manifest = Manifest::default();

    for game in pk3::GAME_DIRS {
        let Some(pk3_paths) = game_pk3s.get(game) else {
            continue;
        };
        info!(game, archives = pk3_paths.len(), "building baseline");
        let game_manifest = build_game_baseline(game, pk3_paths, output_dir)?;
        manifest.games.insert(game.to_string(), game_manifest);
    }

    // The expansion loads on top of the base game: rebuild its manifest as
    // the union, expansion entries winning
    if let (Some(base), Some(expansion)) =
        (manifest.games.get("baseq3"), manifest.games.get("missionpack"))
    {
        let merged = expansion.merged_over(base);
        manifest.games.insert("missionpack".to_string(), merged);
    }

    let manifest_path = output_dir.join("manifest.json");
    manifest.save(&manifest_path)?;
    info!(path = %manifest_path.display(), "manifest saved");

    let mut built_maps = BTreeSet::new();
    for game in pk3::GAME_DIRS {
        let Some(game_manifest) = manifest.games.get(game) else {
            continue;
        };

        let map_names: Vec<String> = game_manifest
            .file_index
            .keys()
            .filter_map(|path| {
                path.strip_prefix("maps/")
                    .and_then(|rest| rest.strip_suffix(".bsp"))
                    .map(ToString::to_string)
            })
            .collect();

        for map_name in map_names {
            if !built_maps.insert(map_name.clone()) {
                continue;
            }
            let output_path = output_dir.join("maps").join(format!("{map_name}.pk3"));
            if let Err(err) = build_map_archive(&map_name, game_manifest, &output_path) {
                warn!(map = %map_name, game, "map archive failed: {err}");
            }
        }
    }

    Ok(manifest)
}
