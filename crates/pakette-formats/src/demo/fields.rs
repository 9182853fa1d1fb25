//! Snapshot-delta protocol field tables
//!
//! These tables are the protocol contract: one entry per network field of
//! the entity and player state structures, in transmission order, giving the
//! number of bits a present field occupies. A width of `0` marks a
//! floating-point field (encoded as 13-bit integral or full 32-bit, selected
//! in-stream); a negative width (player fields only) marks a signed integer
//! whose magnitude is the bit count. The sign never affects how many bits
//! are consumed.
//!
//! Changing any entry desynchronizes every frame decoded after the changed
//! field, so the values are pinned by an exhaustive test below.

/// Number of networked entity state fields
pub const ENTITY_FIELD_COUNT: usize = 51;

/// Number of networked player state fields
pub const PLAYER_FIELD_COUNT: usize = 48;

/// Bit widths per entity state field, in transmission order
pub const ENTITY_FIELD_BITS: [i32; ENTITY_FIELD_COUNT] = [
    32, 0, 0, 0, 0, 0, 0, 0, 0, // pos.trTime, pos.trBase[0..2], pos.trDelta[0..2], apos.trBase[1], apos.trBase[0]
    10, 0, 8, 8, 8, 8, // event, angles2[1], eType, torsoAnim, eventParm, legsAnim
    10, 8, 19, 10, 8, 8, 0, // groundEntityNum, pos.trType, eFlags, otherEntityNum, weapon, clientNum, angles[1]
    32, 8, 0, 0, 0, 24, 16, // pos.trDuration, apos.trType, origin[0..2], solid, powerups
    8, 10, 8, 8, // modelindex, otherEntityNum2, loopSound, generic1
    0, 0, 0, 8, 0, // origin2[2], origin2[0], origin2[1], modelindex2, angles[0]
    32, 32, 32, // time, apos.trTime, apos.trDuration
    0, 0, 0, 0, // apos.trBase[2], apos.trDelta[0..2]
    32, 0, 0, 0, 32, 16, // time2, angles[2], angles2[0], angles2[2], constantLight, frame
];

/// Bit widths per player state field, in transmission order
pub const PLAYER_FIELD_BITS: [i32; PLAYER_FIELD_COUNT] = [
    32, 0, 0, 8, 0, 0, 0, 0, // commandTime, origin[0..1], bobCycle, velocity[0..1], viewangles[1..0]
    -16, 0, 0, 8, -16, 16, // weaponTime, origin[2], velocity[2], legsTimer, pm_time, eventSequence
    8, 4, 8, 8, 8, 16, // torsoAnim, movementDir, events[0], legsAnim, events[1], pm_flags
    10, 4, 16, 10, 16, 16, 16, // groundEntityNum, weaponstate, eFlags, externalEvent, gravity, speed, delta_angles[1]
    8, -8, 8, 8, 8, 8, 8, // externalEventParm, viewheight, damageEvent, damageYaw, damagePitch, damageCount, generic1
    8, 16, 16, 12, 8, 8, // pm_type, delta_angles[0], delta_angles[2], torsoTimer, eventParms[0], eventParms[1]
    8, 5, 0, 0, 0, 0, 10, 16, // clientNum, weapon, viewangles[2], grapplePoint[0..2], jumppad_ent, loopSound
];

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    // Width pinning: every entry checked against the protocol's published
    // field list, one assertion per index so a regression names the field.

    #[rustfmt::skip]
    const EXPECTED_ENTITY: [i32; ENTITY_FIELD_COUNT] = [
        32, 0, 0, 0, 0, 0, 0, 0, 0,
        10, 0, 8, 8, 8, 8,
        10, 8, 19, 10, 8, 8, 0,
        32, 8, 0, 0, 0, 24, 16,
        8, 10, 8, 8,
        0, 0, 0, 8, 0,
        32, 32, 32,
        0, 0, 0, 0,
        32, 0, 0, 0, 32, 16,
    ];

    #[rustfmt::skip]
    const EXPECTED_PLAYER: [i32; PLAYER_FIELD_COUNT] = [
        32, 0, 0, 8, 0, 0, 0, 0,
        -16, 0, 0, 8, -16, 16,
        8, 4, 8, 8, 8, 16,
        10, 4, 16, 10, 16, 16, 16,
        8, -8, 8, 8, 8, 8, 8,
        8, 16, 16, 12, 8, 8,
        8, 5, 0, 0, 0, 0, 10, 16,
    ];

    #[test]
    fn entity_field_widths_match_protocol() {
        for (i, (actual, expected)) in ENTITY_FIELD_BITS
            .iter()
            .zip(EXPECTED_ENTITY.iter())
            .enumerate()
        {
            assert_eq!(actual, expected, "entity field {i} width drifted");
        }
    }

    #[test]
    fn player_field_widths_match_protocol() {
        for (i, (actual, expected)) in PLAYER_FIELD_BITS
            .iter()
            .zip(EXPECTED_PLAYER.iter())
            .enumerate()
        {
            assert_eq!(actual, expected, "player field {i} width drifted");
        }
    }

    #[test]
    fn entity_fields_are_unsigned_or_float() {
        // Only player fields use signed widths
        assert!(ENTITY_FIELD_BITS.iter().all(|&w| w >= 0));
    }

    #[test]
    fn signed_player_fields_are_where_expected() {
        let signed: Vec<usize> = PLAYER_FIELD_BITS
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w < 0)
            .map(|(i, _)| i)
            .collect();
        // weaponTime, pm_time, viewheight
        assert_eq!(signed, vec![8, 12, 28]);
    }
}
