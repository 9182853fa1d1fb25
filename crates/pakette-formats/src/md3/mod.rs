//! MD3 skeletal-model decoder
//!
//! Extracts surface shader references from an IDP3 version 15 model.
//! Surfaces are variable-size records chained by each surface's `ofs_end`
//! field; nothing past the shader name list of each surface is read.
//!
//! Bounds handling follows the format's forgiving reality: a surface or
//! shader record that would run past the buffer stops the walk with the
//! references collected so far, while a wrong surface magic is a structural
//! error (the chain offset landed somewhere that is not a surface).

mod error;

pub use error::{Md3Error, Md3Result};

use crate::cursor::Cursor;

const MD3_MAGIC: &[u8; 4] = b"IDP3";
const MD3_VERSION: u32 = 15;
const HEADER_SIZE: usize = 108;
/// Surface header prefix: ident(4) + name(64) + 10 counts/offsets (40)
const SURFACE_HEADER_SIZE: usize = 116;
/// 64-byte name + shader index
const SHADER_RECORD_SIZE: usize = 68;

const OFS_NUM_SURFACES: usize = 76;
const OFS_SURFACES: usize = 96;
const SURF_NUM_SHADERS: usize = 72;
const SURF_OFS_SHADERS: usize = 88;
const SURF_OFS_END: usize = 104;

/// Parse an MD3 buffer and return its shader references
///
/// References are deduplicated across all surfaces in first-seen order and
/// path-normalized to forward slashes.
pub fn parse_shaders(data: &[u8]) -> Md3Result<Vec<String>> {
    let cursor = Cursor::new(data);

    let magic = cursor.bytes(0, 4)?;
    if magic != MD3_MAGIC {
        return Err(Md3Error::InvalidMagic([magic[0], magic[1], magic[2], magic[3]]));
    }
    let version = cursor.u32_at(4)?;
    if version != MD3_VERSION {
        return Err(Md3Error::UnsupportedVersion(version));
    }
    cursor.bytes(0, HEADER_SIZE)?;

    let num_surfaces = cursor.u32_at(OFS_NUM_SURFACES)?;
    let mut surface_ofs = cursor.u32_at(OFS_SURFACES)? as usize;

    let mut shaders = Vec::new();

    for _ in 0..num_surfaces {
        let Ok(surf) = cursor.bytes(surface_ofs, SURFACE_HEADER_SIZE) else {
            break;
        };
        if &surf[0..4] != MD3_MAGIC {
            return Err(Md3Error::InvalidSurfaceMagic(surface_ofs));
        }

        let surf = Cursor::new(surf);
        let num_shaders = surf.u32_at(SURF_NUM_SHADERS)?;
        let ofs_shaders = surf.u32_at(SURF_OFS_SHADERS)? as usize;
        let ofs_end = surf.u32_at(SURF_OFS_END)? as usize;

        for j in 0..num_shaders as usize {
            let shader_ofs = surface_ofs + ofs_shaders + j * SHADER_RECORD_SIZE;
            let Ok(name) = cursor.fixed_str(shader_ofs, 64) else {
                break;
            };
            let name = name.replace('\\', "/");
            if !name.is_empty() && !shaders.contains(&name) {
                shaders.push(name);
            }
        }

        surface_ofs += ofs_end;
    }

    Ok(shaders)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    /// Build an MD3 with one surface per shader-name group
    fn build_md3(surfaces: &[&[&str]]) -> Vec<u8> {
        let mut data = vec![0u8; HEADER_SIZE];
        data[0..4].copy_from_slice(MD3_MAGIC);
        data[4..8].copy_from_slice(&MD3_VERSION.to_le_bytes());
        data[OFS_NUM_SURFACES..OFS_NUM_SURFACES + 4]
            .copy_from_slice(&(surfaces.len() as u32).to_le_bytes());
        data[OFS_SURFACES..OFS_SURFACES + 4].copy_from_slice(&(HEADER_SIZE as u32).to_le_bytes());

        for names in surfaces {
            let surf_start = data.len();
            let ofs_shaders = SURFACE_HEADER_SIZE;
            let ofs_end = ofs_shaders + names.len() * SHADER_RECORD_SIZE;

            let mut surf = vec![0u8; SURFACE_HEADER_SIZE];
            surf[0..4].copy_from_slice(MD3_MAGIC);
            surf[SURF_NUM_SHADERS..SURF_NUM_SHADERS + 4]
                .copy_from_slice(&(names.len() as u32).to_le_bytes());
            surf[SURF_OFS_SHADERS..SURF_OFS_SHADERS + 4]
                .copy_from_slice(&(ofs_shaders as u32).to_le_bytes());
            surf[SURF_OFS_END..SURF_OFS_END + 4].copy_from_slice(&(ofs_end as u32).to_le_bytes());
            data.extend_from_slice(&surf);

            for name in *names {
                let mut record = [0u8; SHADER_RECORD_SIZE];
                record[..name.len()].copy_from_slice(name.as_bytes());
                data.extend_from_slice(&record);
            }
            debug_assert_eq!(data.len(), surf_start + ofs_end);
        }
        data
    }

    #[test]
    fn collects_shaders_across_surfaces() {
        let data = build_md3(&[
            &["models/mapobjects/pipe/pipe_main"],
            &["models/mapobjects/pipe/pipe_end", "models/mapobjects/pipe/pipe_main"],
        ]);

        let shaders = parse_shaders(&data).unwrap();

        assert_eq!(
            shaders,
            vec![
                "models/mapobjects/pipe/pipe_main",
                "models/mapobjects/pipe/pipe_end",
            ]
        );
    }

    #[test]
    fn rejects_bad_magic_and_version() {
        let mut data = build_md3(&[]);
        data[0] = b'X';
        assert!(matches!(parse_shaders(&data), Err(Md3Error::InvalidMagic(_))));

        let mut data = build_md3(&[]);
        data[4..8].copy_from_slice(&16u32.to_le_bytes());
        assert!(matches!(
            parse_shaders(&data),
            Err(Md3Error::UnsupportedVersion(16))
        ));
    }

    #[test]
    fn bad_surface_magic_is_structural() {
        let mut data = build_md3(&[&["models/gibs/leg"]]);
        data[HEADER_SIZE] = b'Z';

        assert!(matches!(
            parse_shaders(&data),
            Err(Md3Error::InvalidSurfaceMagic(_))
        ));
    }

    #[test]
    fn truncated_surface_chain_stops_cleanly() {
        let mut data = build_md3(&[&["models/gibs/leg"], &["models/gibs/arm"]]);
        // Cut the second surface in half: the walk keeps what it has
        data.truncate(HEADER_SIZE + SURFACE_HEADER_SIZE + SHADER_RECORD_SIZE + 20);

        let shaders = parse_shaders(&data).unwrap();
        assert_eq!(shaders, vec!["models/gibs/leg"]);
    }

    #[test]
    fn undersized_header_is_rejected() {
        assert!(parse_shaders(b"IDP3").is_err());
    }
}
