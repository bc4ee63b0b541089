//! XP-to-level resolution.
//!
//! Levels partition the non-negative XP line into contiguous, non-overlapping
//! bands ordered by level number, with the top tier unbounded. Seed data is
//! expected to respect that invariant; resolution is written to stay sane even
//! when it does not.

use thiserror::Error;

/// One level's XP range, as loaded from the level table.
///
/// `max_xp` of `None` marks the unbounded top tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XpBand {
    /// Level number, unique and monotonically increasing across the table.
    pub number: i32,
    /// Inclusive lower bound.
    pub min_xp: i64,
    /// Inclusive upper bound, `None` = +infinity.
    pub max_xp: Option<i64>,
}

impl XpBand {
    /// Whether `total_xp` falls inside this band.
    pub fn contains(&self, total_xp: i64) -> bool {
        total_xp >= self.min_xp && self.max_xp.is_none_or(|max| total_xp <= max)
    }
}

/// The level table cannot place the given XP total.
///
/// This is a seeding bug, not a runtime condition: an empty table, or a total
/// below the lowest `min_xp`. Callers must treat it as fatal configuration
/// breakage rather than retrying.
#[derive(Debug, Error)]
#[error("no level covers total XP {total_xp} ({band_count} bands configured)")]
pub struct LevelTableError {
    /// The XP total that could not be placed.
    pub total_xp: i64,
    /// How many bands the table held at resolution time.
    pub band_count: usize,
}

/// Resolve the level band containing `total_xp`.
///
/// Exactly one band matches on a well-formed table. If bad seed data ever
/// makes ranges overlap, the band with the highest level number wins.
pub fn resolve(bands: &[XpBand], total_xp: i64) -> Result<&XpBand, LevelTableError> {
    bands
        .iter()
        .filter(|band| band.contains(total_xp))
        .max_by_key(|band| band.number)
        .ok_or(LevelTableError {
            total_xp,
            band_count: bands.len(),
        })
}
