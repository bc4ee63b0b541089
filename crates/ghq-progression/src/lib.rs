//! Progression library for Guild HQ
//!
//! This crate provides the core gamification logic for the learning
//! subsystem: XP-based level resolution, daily-activity streaks, achievement
//! criteria evaluation, and module completion rollups.
//!
//! Everything in here is pure computation over plain data. Loading state from
//! the database and persisting the results is the job of the service layer;
//! keeping the rules side-effect free is what makes them easy to test.

pub mod criteria;
pub mod level;
pub mod rollup;
pub mod streak;

pub use criteria::{Criterion, ProgressFacts};
pub use level::{LevelTableError, XpBand, resolve};
pub use streak::next_streak;
