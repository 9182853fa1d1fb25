//! pk3 archive store
//!
//! pk3 files are plain zip containers. This module handles discovery in
//! engine load order, the case-insensitive cross-archive file index, grouped
//! bulk extraction, streaming iteration, and deterministic archive writing.
//!
//! Load order matters: the engine mounts `pak0.pk3`..`pak9.pk3` first, then
//! every other pk3 alphabetically, and a file in a later archive shadows the
//! same path in an earlier one. The index reproduces exactly that shadowing.

use crate::{Result, StorageError};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::read::{ZipArchive, ZipFile};
use zip::write::FileOptions;
use zip::CompressionMethod;

/// Game variant subdirectories, in manifest build order
pub const GAME_DIRS: [&str; 2] = ["baseq3", "missionpack"];

/// Collect pk3 paths per game variant directory under `root`
///
/// Variants without any pk3s are omitted.
pub fn collect_game_pk3s(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut result = BTreeMap::new();
    for game in GAME_DIRS {
        let dir = root.join(game);
        if !dir.is_dir() {
            continue;
        }
        let files = collect_pk3s_from_dir(&dir);
        if !files.is_empty() {
            result.insert(game.to_string(), files);
        }
    }
    result
}

/// Collect pk3 files from one game directory in engine load order:
/// root-level `pakN.pk3` first (numerically), everything else after,
/// lexicographically.
fn collect_pk3s_from_dir(dir: &Path) -> Vec<PathBuf> {
    let mut pak_files = Vec::new();
    let mut other_files = Vec::new();

    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
        if !name.ends_with(".pk3") {
            continue;
        }

        let is_root_level = entry.path().parent() == Some(dir);
        if is_root_level
            && name.len() == 8
            && name.starts_with("pak")
            && name.as_bytes()[3].is_ascii_digit()
        {
            pak_files.push(entry.path().to_path_buf());
        } else {
            other_files.push(entry.path().to_path_buf());
        }
    }

    pak_files.sort();
    other_files.sort();
    pak_files.extend(other_files);
    pak_files
}

/// Whether a filename is an official `pakN.pk3` archive
///
/// These seed the baseline; anything else is community or override content.
pub fn is_official_pak(filename: &str) -> bool {
    let lower = base_name(filename).to_ascii_lowercase();
    lower.len() == 8
        && lower.starts_with("pak")
        && lower.as_bytes()[3].is_ascii_digit()
        && &lower[4..] == ".pk3"
}

/// Whether a filename is a `pakNt.pk3` override archive
///
/// Override archives are mounted through a separate mechanism at playback
/// time; their contents must never be duplicated into the baseline or any
/// per-map archive.
pub fn is_override_pak(filename: &str) -> bool {
    let lower = base_name(filename).to_ascii_lowercase();
    lower.len() == 9
        && lower.starts_with("pak")
        && lower.as_bytes()[3].is_ascii_digit()
        && &lower[4..] == "t.pk3"
}

fn base_name(filename: &str) -> &str {
    Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(filename)
}

/// Build the case-insensitive file index across archives in load order
///
/// Later archives overwrite earlier ones for the same lowercased path.
pub fn build_file_index(pk3_paths: &[PathBuf]) -> Result<BTreeMap<String, PathBuf>> {
    let mut index = BTreeMap::new();
    for pk3_path in pk3_paths {
        let mut archive = open_archive(pk3_path)?;
        for i in 0..archive.len() {
            let file = archive.by_index(i).map_err(|source| StorageError::Archive {
                archive: pk3_path.clone(),
                source,
            })?;
            if file.is_dir() {
                continue;
            }
            index.insert(file.name().to_ascii_lowercase(), pk3_path.clone());
        }
    }
    debug!("indexed {} paths across {} archives", index.len(), pk3_paths.len());
    Ok(index)
}

/// Read a single entry from a pk3, matching the path case-insensitively
pub fn read_file(pk3_path: &Path, virtual_path: &str) -> Result<Vec<u8>> {
    let mut archive = open_archive(pk3_path)?;
    let target = virtual_path.to_ascii_lowercase();

    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|source| StorageError::Archive {
            archive: pk3_path.to_path_buf(),
            source,
        })?;
        if file.name().to_ascii_lowercase() != target {
            continue;
        }
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data).map_err(|source| StorageError::Entry {
            archive: pk3_path.to_path_buf(),
            entry: virtual_path.to_string(),
            source,
        })?;
        return Ok(data);
    }

    Err(StorageError::NotIndexed(virtual_path.to_string()))
}

/// Extract the given virtual paths using the file index
///
/// Wanted paths are grouped per source archive so each pk3 opens once.
/// Paths absent from the index are silently skipped; referencing optional
/// assets that shipped in no archive is normal for game content.
pub fn extract_files(
    paths: &[String],
    index: &BTreeMap<String, PathBuf>,
) -> Result<BTreeMap<String, Vec<u8>>> {
    let mut by_pk3: BTreeMap<&PathBuf, Vec<String>> = BTreeMap::new();
    for path in paths {
        let lower = path.to_ascii_lowercase();
        if let Some(pk3) = index.get(&lower) {
            by_pk3.entry(pk3).or_default().push(lower);
        }
    }

    let mut result = BTreeMap::new();

    for (pk3_path, wanted_paths) in by_pk3 {
        let wanted: std::collections::BTreeSet<&str> =
            wanted_paths.iter().map(String::as_str).collect();

        let mut archive = open_archive(pk3_path)?;
        for i in 0..archive.len() {
            let mut file = archive.by_index(i).map_err(|source| StorageError::Archive {
                archive: pk3_path.clone(),
                source,
            })?;
            let lower = file.name().to_ascii_lowercase();
            if !wanted.contains(lower.as_str()) {
                continue;
            }
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data).map_err(|source| StorageError::Entry {
                archive: pk3_path.clone(),
                entry: lower.clone(),
                source,
            })?;
            result.insert(lower, data);
        }
    }

    Ok(result)
}

/// Write a pk3 to `output_path` with deterministic entry order
pub fn write_pk3(output_path: &Path, files: &BTreeMap<String, Vec<u8>>) -> Result<()> {
    let file = File::create(output_path)?;
    write_pk3_to(file, files)
}

/// Write a pk3 to any writer
///
/// Entries are written in sorted path order with Deflate compression and a
/// fixed timestamp, so the same input set always produces byte-identical
/// output.
pub fn write_pk3_to<W: Write + Seek>(writer: W, files: &BTreeMap<String, Vec<u8>>) -> Result<()> {
    let mut zip_writer = zip::ZipWriter::new(writer);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    // BTreeMap iteration is already sorted by path
    for (name, data) in files {
        zip_writer
            .start_file(name.as_str(), options)
            .map_err(|source| StorageError::EntryWrite {
                entry: name.clone(),
                source,
            })?;
        zip_writer.write_all(data)?;
    }

    zip_writer.finish().map_err(|source| StorageError::EntryWrite {
        entry: String::new(),
        source,
    })?;
    Ok(())
}

/// Stream entries of a pk3 through a visitor without eager content reads
pub fn iterate_pk3<F>(pk3_path: &Path, mut visitor: F) -> Result<()>
where
    F: FnMut(&str, &mut ZipFile<'_>) -> Result<()>,
{
    let mut archive = open_archive(pk3_path)?;
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|source| StorageError::Archive {
            archive: pk3_path.to_path_buf(),
            source,
        })?;
        let name = file.name().to_string();
        visitor(&name, &mut file)?;
    }
    Ok(())
}

fn open_archive(pk3_path: &Path) -> Result<ZipArchive<File>> {
    let file = File::open(pk3_path).map_err(|source| StorageError::ArchiveOpen {
        archive: pk3_path.to_path_buf(),
        source,
    })?;
    ZipArchive::new(file).map_err(|source| StorageError::Archive {
        archive: pk3_path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn make_pk3(path: &Path, files: &[(&str, &[u8])]) {
        let map: BTreeMap<String, Vec<u8>> = files
            .iter()
            .map(|(name, data)| ((*name).to_string(), data.to_vec()))
            .collect();
        write_pk3(path, &map).unwrap();
    }

    #[test]
    fn official_and_override_classification_is_disjoint() {
        assert!(is_official_pak("pak0.pk3"));
        assert!(is_official_pak("PAK8.PK3"));
        assert!(!is_official_pak("pak0t.pk3"));
        assert!(!is_official_pak("pakx.pk3"));
        assert!(!is_official_pak("mypak0.pk3"));
        assert!(!is_official_pak("pak10.pk3"));

        assert!(is_override_pak("pak0t.pk3"));
        assert!(is_override_pak("PAK9T.PK3"));
        assert!(!is_override_pak("pak0.pk3"));
        assert!(!is_override_pak("pak0s.pk3"));

        for name in ["pak0.pk3", "pak0t.pk3", "pak5.pk3", "pak9t.pk3", "map.pk3"] {
            assert!(
                !(is_official_pak(name) && is_override_pak(name)),
                "{name} classified as both official and override"
            );
        }
    }

    #[test]
    fn index_is_case_insensitive_last_write_wins() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("pak0.pk3");
        let second = dir.path().join("pak1.pk3");
        make_pk3(&first, &[("Maps/Q3DM1.bsp", b"old"), ("scripts/a.shader", b"a")]);
        make_pk3(&second, &[("maps/q3dm1.BSP", b"new")]);

        let index = build_file_index(&[first, second.clone()]).unwrap();

        assert_eq!(index.get("maps/q3dm1.bsp").unwrap(), &second);
        assert!(index.contains_key("scripts/a.shader"));
        assert!(!index.contains_key("Maps/Q3DM1.bsp"));
    }

    #[test]
    fn load_order_puts_numbered_paks_first() {
        let dir = tempdir().unwrap();
        let game = dir.path().join("baseq3");
        std::fs::create_dir_all(game.join("extra")).unwrap();
        make_pk3(&game.join("zzz-map.pk3"), &[("a", b"1")]);
        make_pk3(&game.join("pak2.pk3"), &[("a", b"1")]);
        make_pk3(&game.join("pak0.pk3"), &[("a", b"1")]);
        make_pk3(&game.join("aaa.pk3"), &[("a", b"1")]);
        // Nested pakN.pk3 does not count as a numbered pak
        make_pk3(&game.join("extra").join("pak1.pk3"), &[("a", b"1")]);

        let games = collect_game_pk3s(dir.path());
        let order: Vec<String> = games["baseq3"]
            .iter()
            .map(|p| p.strip_prefix(&game).unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(order, vec!["pak0.pk3", "pak2.pk3", "aaa.pk3", "extra/pak1.pk3", "zzz-map.pk3"]);
    }

    #[test]
    fn extract_groups_by_source_archive() {
        let dir = tempdir().unwrap();
        let first = dir.path().join("pak0.pk3");
        let second = dir.path().join("pak1.pk3");
        make_pk3(&first, &[("textures/wall.tga", b"wall"), ("sound/a.wav", b"a")]);
        make_pk3(&second, &[("sound/a.wav", b"override")]);

        let index = build_file_index(&[first, second]).unwrap();
        let extracted = extract_files(
            &[
                "textures/WALL.tga".to_string(),
                "sound/a.wav".to_string(),
                "missing/file.tga".to_string(),
            ],
            &index,
        )
        .unwrap();

        assert_eq!(extracted.len(), 2);
        assert_eq!(extracted["textures/wall.tga"], b"wall");
        assert_eq!(extracted["sound/a.wav"], b"override");
    }

    #[test]
    fn pk3_output_is_deterministic() {
        let mut files = BTreeMap::new();
        files.insert("zeta/file.txt".to_string(), b"zzz".to_vec());
        files.insert("alpha/file.txt".to_string(), b"aaa".to_vec());

        let mut first = Cursor::new(Vec::new());
        let mut second = Cursor::new(Vec::new());
        write_pk3_to(&mut first, &files).unwrap();
        write_pk3_to(&mut second, &files).unwrap();

        assert!(!first.get_ref().is_empty());
        assert_eq!(first.get_ref(), second.get_ref());
    }

    #[test]
    fn read_file_matches_case_insensitively() {
        let dir = tempdir().unwrap();
        let pk3 = dir.path().join("pak0.pk3");
        make_pk3(&pk3, &[("Scripts/Base.shader", b"content")]);

        let data = read_file(&pk3, "scripts/base.SHADER").unwrap();
        assert_eq!(data, b"content");

        assert!(matches!(
            read_file(&pk3, "absent.txt"),
            Err(StorageError::NotIndexed(_))
        ));
    }

    #[test]
    fn iterate_streams_all_entries() {
        let dir = tempdir().unwrap();
        let pk3 = dir.path().join("pak0.pk3");
        make_pk3(&pk3, &[("a.txt", b"1"), ("b/c.txt", b"2")]);

        let mut names = Vec::new();
        iterate_pk3(&pk3, |name, _| {
            names.push(name.to_string());
            Ok(())
        })
        .unwrap();

        assert_eq!(names, vec!["a.txt", "b/c.txt"]);
    }
}
