//! BSP compiled-map decoder
//!
//! Parses the IBSP version 46 container far enough to extract asset
//! references: surface shader names from the shader lump, and music, ambient
//! sound and external model references from the entity text lump. Geometry
//! lumps are never touched.
//!
//! The header is a fixed 144-byte table: 4-byte magic, 4-byte version, then
//! 17 `(offset, length)` lump descriptors of 8 bytes each. Any magic or
//! version mismatch fails the parse; there is no forward-compatibility
//! tolerance.

mod error;

pub use error::{BspError, BspResult};

use crate::cursor::Cursor;

const BSP_MAGIC: &[u8; 4] = b"IBSP";
const BSP_VERSION: u32 = 46;
const LUMP_ENTITIES: usize = 0;
const LUMP_SHADERS: usize = 1;
const LUMP_COUNT: usize = 17;
/// magic(4) + version(4) + 17 lumps * (offset(4) + length(4))
const HEADER_SIZE: usize = 8 + LUMP_COUNT * 8;
/// 64-byte name + surfaceFlags + contentFlags
const SHADER_RECORD_SIZE: usize = 72;

/// Asset references extracted from one BSP file
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BspAssets {
    /// Surface shader names from the shader lump, in lump order
    pub shaders: Vec<String>,
    /// `music` worldspawn entries (first token only; the rest is a loop flag)
    pub music: Vec<String>,
    /// `noise` entity sound references
    pub sounds: Vec<String>,
    /// `model2` external model references
    pub models: Vec<String>,
}

/// Parse a BSP buffer and extract its asset references
pub fn parse(data: &[u8]) -> BspResult<BspAssets> {
    let cursor = Cursor::new(data);

    let magic = cursor.bytes(0, 4)?;
    if magic != BSP_MAGIC {
        return Err(BspError::InvalidMagic([magic[0], magic[1], magic[2], magic[3]]));
    }
    let version = cursor.u32_at(4)?;
    if version != BSP_VERSION {
        return Err(BspError::UnsupportedVersion(version));
    }
    // Validate the full lump table is present before dereferencing any lump
    cursor.bytes(0, HEADER_SIZE)?;

    let mut assets = BspAssets::default();

    let ent_offset = cursor.u32_at(8 + LUMP_ENTITIES * 8)? as usize;
    let ent_length = cursor.u32_at(8 + LUMP_ENTITIES * 8 + 4)? as usize;
    if ent_length > 0 {
        let text = cursor.bytes(ent_offset, ent_length)?;
        parse_entities(&String::from_utf8_lossy(text), &mut assets);
    }

    let shader_offset = cursor.u32_at(8 + LUMP_SHADERS * 8)? as usize;
    let shader_length = cursor.u32_at(8 + LUMP_SHADERS * 8 + 4)? as usize;
    let record_count = shader_length / SHADER_RECORD_SIZE;
    for i in 0..record_count {
        let name = cursor.fixed_str(shader_offset + i * SHADER_RECORD_SIZE, 64)?;
        let name = name.replace('\\', "/");
        // '*' marks internal references (inline brush models), not files
        if !name.is_empty() && !name.starts_with('*') {
            assets.shaders.push(name);
        }
    }

    Ok(assets)
}

/// Extract asset references from the entity lump text
///
/// The lump is a sequence of `{ "key" "value" ... }` records. Braces and
/// record structure carry no information for dependency purposes, so the
/// scan is purely line-oriented.
fn parse_entities(text: &str, assets: &mut BspAssets) {
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line == "{" || line == "}" {
            continue;
        }

        let Some((key, value)) = parse_entity_kv(line) else {
            continue;
        };

        let value = value.replace('\\', "/");

        match key.to_ascii_lowercase().as_str() {
            "music" => {
                // Value may carry a space-separated looping flag after the path
                if let Some(first) = value.split_whitespace().next() {
                    assets.music.push(first.to_string());
                }
            }
            "noise" => {
                if !value.is_empty() && !value.starts_with('*') {
                    assets.sounds.push(value);
                }
            }
            "model2" => {
                if !value.is_empty() && !value.starts_with('*') {
                    assets.models.push(value);
                }
            }
            _ => {}
        }
    }
}

/// Parse a `"key" "value"` line; returns `None` when no quoted key exists
fn parse_entity_kv(line: &str) -> Option<(&str, &str)> {
    let (key, rest) = next_quoted(line)?;
    let value = next_quoted(rest).map(|(value, _)| value).unwrap_or("");
    Some((key, value))
}

/// Extract the next double-quoted token, returning it and the remainder
fn next_quoted(s: &str) -> Option<(&str, &str)> {
    let start = s.find('"')?;
    let rest = &s[start + 1..];
    let end = rest.find('"')?;
    Some((&rest[..end], &rest[end + 1..]))
}
