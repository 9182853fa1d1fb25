//! TVD demo decoder
//!
//! Parses recorded match files far enough to answer one question: which
//! assets does playing this demo back require? The decoder never simulates
//! gameplay; it recovers the final configstring table (map name, model and
//! sound registries, player info strings) and discards everything else.
//!
//! Container layout:
//!
//! - 4 bytes `TVD1` magic
//! - protocol version, sv_fps, maxclients (each i32 LE)
//! - map name, creation timestamp (each NUL-terminated)
//! - configstring records `[index:u16][length:u16][data]`, terminated by
//!   index `0xFFFF`
//! - zstd-compressed frame stream; a non-stream file trailer after the
//!   compressed payload is expected
//!
//! Each decompressed frame is `[length:u32 LE][bit-packed body]`. The body
//! interleaves entity and player state deltas with configstring updates;
//! the deltas are skipped by consuming exactly the number of bits the
//! protocol field tables ([`ENTITY_FIELD_BITS`], [`PLAYER_FIELD_BITS`])
//! declare, because the updates sit after them with no framing of their
//! own. A frame that desynchronizes is
//! abandoned; every active configstring is retransmitted in later frames,
//! so losing one frame's tail costs nothing.

mod bitstream;
mod error;
mod fields;

pub use bitstream::{BitReader, BitResult, BitStreamExhausted, BitWriter};
pub use error::{DemoError, DemoResult};
pub use fields::{
    ENTITY_FIELD_BITS, ENTITY_FIELD_COUNT, PLAYER_FIELD_BITS, PLAYER_FIELD_COUNT,
};

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// First configstring index of the model registry
pub const CS_MODELS: u16 = 32;
/// First configstring index of the sound registry
pub const CS_SOUNDS: u16 = 288;
/// First configstring index of the per-player info strings
pub const CS_PLAYERS: u16 = 544;
/// Total configstring slots
pub const CS_MAX: u16 = 1024;

const CS_SERVERINFO: u16 = 0;
const CS_SYSTEMINFO: u16 = 1;
const CS_END_MARKER: u16 = 0xFFFF;

const MAX_GENTITIES: u32 = 1024;
const GENTITYNUM_BITS: u32 = 10;
const MAX_CLIENTS: usize = 64;
const FLOAT_INT_BITS: u32 = 13;
const MAX_MODELS: u16 = 256;
const MAX_SOUNDS: u16 = 256;
const MAX_STATS: usize = 16;
const MAX_PERSISTANT: usize = 16;
const MAX_WEAPONS: usize = 16;
const MAX_POWERUPS: usize = 16;

/// Fixed header prefix: magic + protocol + sv_fps + maxclients
const HEADER_PREFIX: usize = 16;
const DEMO_MAGIC: &[u8; 4] = b"TVD1";

/// Asset references extracted from one demo
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DemoInfo {
    /// Map name from the server info string
    pub map_name: String,
    /// Mod / game-variant directory, from server info with system info as
    /// fallback
    pub fs_game: String,
    /// Game type number from the server info string
    pub game_type: i32,
    /// Registered model paths (internal `*` references excluded)
    pub models: Vec<String>,
    /// Registered sound paths
    pub sounds: Vec<String>,
    /// Player model identities, deduplicated
    pub player_infos: Vec<PlayerInfo>,
}

/// Player model identity from a player info configstring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    /// Body model (possibly with a `/skin` suffix)
    pub model: String,
    /// Head model; empty when the player does not override it
    pub head_model: String,
}

/// Parse a demo file from disk
pub fn summarize<P: AsRef<Path>>(path: P) -> DemoResult<DemoInfo> {
    let data = std::fs::read(path)?;
    parse(&data)
}

/// Parse a demo from an in-memory buffer
pub fn parse(data: &[u8]) -> DemoResult<DemoInfo> {
    if data.len() < HEADER_PREFIX + 4 || &data[0..4] != DEMO_MAGIC {
        return Err(DemoError::InvalidMagic);
    }

    let mut offset = HEADER_PREFIX;
    offset = skip_cstring(data, offset);
    offset = skip_cstring(data, offset);

    let mut configstrings = BTreeMap::new();

    // Header configstring table
    while offset + 4 <= data.len() {
        let index = u16::from_le_bytes([data[offset], data[offset + 1]]);
        offset += 2;
        if index == CS_END_MARKER {
            break;
        }
        let length = u16::from_le_bytes([data[offset], data[offset + 1]]) as usize;
        offset += 2;
        if offset + length > data.len() {
            break;
        }
        let value = String::from_utf8_lossy(&data[offset..offset + length]).into_owned();
        offset += length;
        if !value.is_empty() {
            configstrings.insert(index, value);
        }
    }

    // Frame stream: updates overwrite the header table, which is what makes
    // mid-match joins come out right, since the server rebroadcasts every
    // active string periodically.
    if offset < data.len() {
        let decompressed = decompress_frames(&data[offset..]);
        walk_frames(&decompressed, &mut configstrings);
    }

    Ok(build_info(&configstrings))
}

/// Skip a NUL-terminated string, returning the offset past its terminator
fn skip_cstring(data: &[u8], mut offset: usize) -> usize {
    while offset < data.len() && data[offset] != 0 {
        offset += 1;
    }
    offset + 1
}

/// Decompress the zstd frame stream, tolerating a trailing non-stream tail
///
/// The file ends with bytes that are not part of the compressed payload, so
/// the decoder is read incrementally and whatever decompressed before the
/// first error is kept.
fn decompress_frames(compressed: &[u8]) -> Vec<u8> {
    let mut decompressed = Vec::new();
    let Ok(mut decoder) = zstd::stream::read::Decoder::new(compressed) else {
        return decompressed;
    };

    let mut buffer = [0u8; 8192];
    loop {
        match decoder.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => decompressed.extend_from_slice(&buffer[..n]),
            // Trailing garbage after the last zstd frame lands here
            Err(_) => break,
        }
    }
    decompressed
}

/// Walk the decompressed frame stream, applying configstring updates
fn walk_frames(stream: &[u8], configstrings: &mut BTreeMap<u16, String>) {
    let mut pos = 0usize;

    while pos + 4 <= stream.len() {
        let frame_size =
            u32::from_le_bytes([stream[pos], stream[pos + 1], stream[pos + 2], stream[pos + 3]])
                as usize;
        pos += 4;

        if frame_size == 0 || pos + frame_size > stream.len() {
            break;
        }

        // An abandoned frame keeps whatever updates it applied before the
        // stream went bad; later frames retransmit the rest.
        let _ = parse_frame(&stream[pos..pos + frame_size], configstrings);
        pos += frame_size;
    }
}

/// Marker for a frame given up on mid-parse
struct FrameAbandoned;

impl From<BitStreamExhausted> for FrameAbandoned {
    fn from(_: BitStreamExhausted) -> Self {
        Self
    }
}

/// Parse one frame body, applying its configstring updates
fn parse_frame(
    frame: &[u8],
    configstrings: &mut BTreeMap<u16, String>,
) -> Result<usize, FrameAbandoned> {
    let mut reader = BitReader::new(frame);

    // Server time
    reader.read_long()?;

    // Entity presence bitmask; contents irrelevant to skipping
    reader.read_data(MAX_GENTITIES as usize / 8)?;

    // Entity deltas until the sentinel entity number
    loop {
        let entity_num = reader.read_bits(GENTITYNUM_BITS)?;
        if entity_num == MAX_GENTITIES - 1 {
            break;
        }
        skip_entity_delta(&mut reader)?;
    }

    // Player deltas for each client flagged present
    let player_mask = reader.read_data(MAX_CLIENTS / 8)?;
    for client in 0..MAX_CLIENTS {
        if player_mask[client >> 3] & (1 << (client & 7)) == 0 {
            continue;
        }
        reader.read_byte()?;
        skip_player_delta(&mut reader)?;
    }

    // Configstring updates
    let count = reader.read_short()?;
    if count > CS_MAX {
        return Ok(0);
    }

    let mut applied = 0usize;
    for _ in 0..count {
        let index = reader.read_short()?;
        let length = reader.read_short()? as usize;
        if length == 0 || length >= 8192 {
            // Out-of-range length: the rest of this frame's updates cannot
            // be trusted
            break;
        }
        let value = reader.read_data(length)?;
        configstrings.insert(index, String::from_utf8_lossy(&value).into_owned());
        applied += 1;
    }

    Ok(applied)
}

/// Consume one entity state delta
///
/// Entity fields carry the zero-value optimization: after the presence bit,
/// one bit distinguishes an implicit zero from an explicit value, and float
/// fields spend a further bit choosing the 13-bit integral encoding over
/// the full 32 bits.
fn skip_entity_delta(reader: &mut BitReader<'_>) -> Result<(), FrameAbandoned> {
    if reader.read_bits(1)? == 1 {
        return Ok(()); // entity removed
    }
    if reader.read_bits(1)? == 0 {
        return Ok(()); // no change
    }

    let field_count = reader.read_byte()? as usize;
    if field_count > ENTITY_FIELD_COUNT {
        return Err(FrameAbandoned);
    }

    for &width in &ENTITY_FIELD_BITS[..field_count] {
        if reader.read_bits(1)? == 0 {
            continue; // field unchanged
        }
        if width == 0 {
            // Float
            if reader.read_bits(1)? == 0 {
                continue; // 0.0
            }
            if reader.read_bits(1)? == 0 {
                reader.read_bits(FLOAT_INT_BITS)?;
            } else {
                reader.read_bits(32)?;
            }
        } else if reader.read_bits(1)? != 0 {
            reader.read_bits(width as u32)?;
        }
    }

    Ok(())
}

/// Consume one player state delta
///
/// Player fields have no zero-value gate: a present field always consumes
/// its declared width. Four optional trailing arrays are each gated by a
/// presence bit plus a slot bitmask.
fn skip_player_delta(reader: &mut BitReader<'_>) -> Result<(), FrameAbandoned> {
    let field_count = reader.read_byte()? as usize;
    if field_count > PLAYER_FIELD_COUNT {
        return Err(FrameAbandoned);
    }

    for &width in &PLAYER_FIELD_BITS[..field_count] {
        if reader.read_bits(1)? == 0 {
            continue;
        }
        let bits = width.unsigned_abs();
        if bits == 0 {
            if reader.read_bits(1)? == 0 {
                reader.read_bits(FLOAT_INT_BITS)?;
            } else {
                reader.read_bits(32)?;
            }
        } else {
            reader.read_bits(bits)?;
        }
    }

    if reader.read_bits(1)? == 0 {
        return Ok(()); // no array sections
    }

    // stats, persistant and ammo hold shorts; powerup timers hold longs
    for slots in [MAX_STATS, MAX_PERSISTANT, MAX_WEAPONS] {
        skip_slot_array(reader, slots, 16)?;
    }
    skip_slot_array(reader, MAX_POWERUPS, 32)?;

    Ok(())
}

/// Consume one presence-gated, bitmask-selected slot array
fn skip_slot_array(
    reader: &mut BitReader<'_>,
    slots: usize,
    value_bits: u32,
) -> Result<(), FrameAbandoned> {
    if reader.read_bits(1)? == 0 {
        return Ok(());
    }
    let mask = reader.read_bits(slots as u32)?;
    for slot in 0..slots {
        if mask & (1 << slot) != 0 {
            reader.read_bits(value_bits)?;
        }
    }
    Ok(())
}

/// Distill the final configstring table into asset references
fn build_info(configstrings: &BTreeMap<u16, String>) -> DemoInfo {
    let mut info = DemoInfo::default();

    if let Some(server_info) = configstrings.get(&CS_SERVERINFO) {
        let kvs = parse_info_string(server_info);
        info.map_name = kvs.get("mapname").cloned().unwrap_or_default();
        info.fs_game = kvs.get("fs_game").cloned().unwrap_or_default();
        if let Some(game_type) = kvs.get("g_gametype").and_then(|v| v.parse().ok()) {
            info.game_type = game_type;
        }
    }

    if info.fs_game.is_empty() {
        if let Some(system_info) = configstrings.get(&CS_SYSTEMINFO) {
            if let Some(fs_game) = parse_info_string(system_info).get("fs_game") {
                if !fs_game.is_empty() {
                    info.fs_game = fs_game.clone();
                }
            }
        }
    }

    for index in CS_MODELS..CS_MODELS + MAX_MODELS {
        if let Some(value) = configstrings.get(&index) {
            if !value.is_empty() && !value.starts_with('*') && !info.models.contains(value) {
                info.models.push(value.clone());
            }
        }
    }

    for index in CS_SOUNDS..CS_SOUNDS + MAX_SOUNDS {
        if let Some(value) = configstrings.get(&index) {
            if !value.is_empty() && !info.sounds.contains(value) {
                info.sounds.push(value.clone());
            }
        }
    }

    let mut seen_pairs = Vec::new();
    for index in CS_PLAYERS..CS_PLAYERS + MAX_CLIENTS as u16 {
        let Some(value) = configstrings.get(&index) else {
            continue;
        };
        let kvs = parse_info_string(value);
        let Some(model) = kvs.get("model").filter(|m| !m.is_empty()) else {
            continue;
        };
        let head_model = kvs.get("hmodel").cloned().unwrap_or_default();
        let pair = (model.clone(), head_model.clone());
        if seen_pairs.contains(&pair) {
            continue;
        }
        seen_pairs.push(pair);
        info.player_infos.push(PlayerInfo {
            model: model.clone(),
            head_model,
        });
    }

    info
}

/// Parse a backslash-delimited info string (`\key\value\key\value...`)
fn parse_info_string(s: &str) -> BTreeMap<String, String> {
    let mut result = BTreeMap::new();
    let mut parts = s.strip_prefix('\\').unwrap_or(s).split('\\');
    while let (Some(key), Some(value)) = (parts.next(), parts.next()) {
        result.insert(key.to_string(), value.to_string());
    }
    result
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_demo_input() {
        assert!(matches!(parse(b"IBSP"), Err(DemoError::InvalidMagic)));
        assert!(matches!(parse(b"TVD1too short"), Err(DemoError::InvalidMagic)));
        assert!(matches!(parse(&[]), Err(DemoError::InvalidMagic)));
    }

    #[test]
    fn info_string_parsing() {
        let kvs = parse_info_string("\\mapname\\q3dm1\\g_gametype\\4");
        assert_eq!(kvs.get("mapname").unwrap(), "q3dm1");
        assert_eq!(kvs.get("g_gametype").unwrap(), "4");

        // Odd trailing key without value is dropped
        let kvs = parse_info_string("\\a\\1\\dangling");
        assert_eq!(kvs.len(), 1);
    }

    #[test]
    fn header_only_demo() {
        let mut data = Vec::new();
        data.extend_from_slice(DEMO_MAGIC);
        data.extend_from_slice(&68u32.to_le_bytes()); // protocol
        data.extend_from_slice(&40u32.to_le_bytes()); // sv_fps
        data.extend_from_slice(&64u32.to_le_bytes()); // maxclients
        data.extend_from_slice(b"q3dm17\0");
        data.extend_from_slice(b"2026-08-01 12:00:00\0");
        // CS 0
        let server_info = b"\\mapname\\q3dm17\\g_gametype\\1\\fs_game\\osp";
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&(server_info.len() as u16).to_le_bytes());
        data.extend_from_slice(server_info);
        // CS 290 (sound)
        let sound = b"sound/weapons/rocket/rocklf1a.wav";
        data.extend_from_slice(&290u16.to_le_bytes());
        data.extend_from_slice(&(sound.len() as u16).to_le_bytes());
        data.extend_from_slice(sound);
        // Empty value: dropped, not stored
        data.extend_from_slice(&300u16.to_le_bytes());
        data.extend_from_slice(&0u16.to_le_bytes());
        data.extend_from_slice(&CS_END_MARKER.to_le_bytes());

        let info = parse(&data).unwrap();

        assert_eq!(info.map_name, "q3dm17");
        assert_eq!(info.fs_game, "osp");
        assert_eq!(info.game_type, 1);
        assert_eq!(info.sounds, vec!["sound/weapons/rocket/rocklf1a.wav"]);
        assert!(info.models.is_empty());
    }

    #[test]
    fn player_infos_deduplicate_by_model_pair() {
        let mut configstrings = BTreeMap::new();
        configstrings.insert(CS_PLAYERS, "\\name\\a\\model\\sarge\\hmodel\\sarge".to_string());
        configstrings.insert(
            CS_PLAYERS + 1,
            "\\name\\b\\model\\sarge\\hmodel\\sarge".to_string(),
        );
        configstrings.insert(CS_PLAYERS + 2, "\\name\\c\\model\\keel/rust".to_string());
        configstrings.insert(CS_PLAYERS + 3, "\\name\\d".to_string()); // no model

        let info = build_info(&configstrings);

        assert_eq!(
            info.player_infos,
            vec![
                PlayerInfo {
                    model: "sarge".to_string(),
                    head_model: "sarge".to_string(),
                },
                PlayerInfo {
                    model: "keel/rust".to_string(),
                    head_model: String::new(),
                },
            ]
        );
    }

    #[test]
    fn internal_model_references_are_excluded() {
        let mut configstrings = BTreeMap::new();
        configstrings.insert(CS_MODELS, "models/mapobjects/pipe.md3".to_string());
        configstrings.insert(CS_MODELS + 1, "*2".to_string());

        let info = build_info(&configstrings);
        assert_eq!(info.models, vec!["models/mapobjects/pipe.md3"]);
    }

    #[test]
    fn entity_delta_skip_consumes_exact_widths() {
        // Two fields changed: field 0 (32-bit int) explicit value, field 1
        // (float) with integral encoding
        let mut writer = BitWriter::new();
        writer.write_bits(0, 1); // not removed
        writer.write_bits(1, 1); // has delta
        writer.write_byte(2); // field count
        writer.write_bits(1, 1); // field 0 present
        writer.write_bits(1, 1); // non-zero
        writer.write_bits(12345, 32);
        writer.write_bits(1, 1); // field 1 present
        writer.write_bits(1, 1); // non-zero
        writer.write_bits(0, 1); // integral float
        writer.write_bits(100, FLOAT_INT_BITS);
        writer.write_bits(0b101, 3); // sentinel tail to verify position

        let bytes = writer.into_bytes();
        let mut reader = BitReader::new(&bytes);
        skip_entity_delta(&mut reader).map_err(|_| ()).unwrap();

        assert_eq!(reader.read_bits(3).unwrap(), 0b101);
    }

    #[test]
    fn player_delta_skip_consumes_arrays() {
        let mut writer = BitWriter::new();
        writer.write_byte(1); // field count: just commandTime (32-bit)
        writer.write_bits(1, 1); // present
        writer.write_bits(9999, 32);
        writer.write_bits(1, 1); // arrays follow
        writer.write_bits(1, 1); // stats present
        writer.write_bits(0b11, MAX_STATS as u32); // slots 0 and 1
        writer.write_bits(7, 16);
        writer.write_bits(8, 16);
        writer.write_bits(0, 1); // no persistant
        writer.write_bits(0, 1); // no ammo
        writer.write_bits(1, 1); // powerups present
        writer.write_bits(1 << 4, MAX_POWERUPS as u32);
        writer.write_bits(123_456, 32);
        writer.write_bits(0b110, 3); // sentinel tail

        let bytes = writer.into_bytes();
        let mut reader = BitReader::new(&bytes);
        skip_player_delta(&mut reader).map_err(|_| ()).unwrap();

        assert_eq!(reader.read_bits(3).unwrap(), 0b110);
    }

    #[test]
    fn oversized_field_count_abandons_frame() {
        let mut writer = BitWriter::new();
        writer.write_bits(0, 1);
        writer.write_bits(1, 1);
        writer.write_byte(200); // beyond the field table

        let bytes = writer.into_bytes();
        let mut reader = BitReader::new(&bytes);
        assert!(skip_entity_delta(&mut reader).is_err());
    }

    #[test]
    fn bad_update_length_keeps_prior_updates() {
        let mut writer = BitWriter::new();
        writer.write_bits(0, 32); // server time
        writer.write_data(&[0u8; MAX_GENTITIES as usize / 8]);
        writer.write_bits(MAX_GENTITIES - 1, GENTITYNUM_BITS);
        writer.write_data(&[0u8; MAX_CLIENTS / 8]);
        writer.write_short(2);
        writer.write_short(CS_MODELS);
        let value = b"models/a.md3";
        writer.write_short(value.len() as u16);
        writer.write_data(value);
        writer.write_short(CS_MODELS + 1);
        writer.write_short(0); // invalid length: remainder abandoned

        let frame = writer.into_bytes();
        let mut configstrings = BTreeMap::new();
        let applied = parse_frame(&frame, &mut configstrings).map_err(|_| ()).unwrap();

        assert_eq!(applied, 1);
        assert_eq!(configstrings.get(&CS_MODELS).unwrap(), "models/a.md3");
    }
}
