//! Achievement unlock criteria.
//!
//! Criteria are stored in the catalog as a `(kind, value)` pair and parsed
//! once on read into a closed enum, so the set of supported kinds is checked
//! by the compiler instead of being string-dispatched at every evaluation.

use std::fmt;

/// Live progress state an achievement criterion is tested against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressFacts {
    /// Cumulative XP, achievement rewards included.
    pub total_xp: i64,
    /// Current level number.
    pub level_number: i32,
    /// Consecutive active days.
    pub streak: i32,
    /// Modules this user has fully completed.
    pub modules_completed: i64,
    /// Question attempts answered correctly, all time.
    pub questions_correct: i64,
}

/// A single unlock condition: a threshold over one progress dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    /// Cumulative XP reaches the threshold.
    TotalXp(i64),
    /// Level number reaches the threshold.
    LevelReached(i32),
    /// Streak reaches the threshold, in days.
    StreakDays(i32),
    /// Completed-module count reaches the threshold.
    ModulesCompleted(i64),
    /// Correct-answer count reaches the threshold.
    QuestionsCorrect(i64),
}

impl Criterion {
    /// Parse a stored `(kind, value)` pair.
    ///
    /// Returns `None` for kinds this build does not know. Unknown kinds must
    /// never unlock anything, so callers treat `None` as "never satisfied"
    /// rather than an error; a newer catalog row then degrades gracefully on
    /// an older service.
    pub fn from_parts(kind: &str, value: i64) -> Option<Self> {
        match kind {
            "TOTAL_XP" => Some(Self::TotalXp(value)),
            "LEVEL_REACHED" => Some(Self::LevelReached(value as i32)),
            "STREAK_DAYS" => Some(Self::StreakDays(value as i32)),
            "MODULES_COMPLETED" => Some(Self::ModulesCompleted(value)),
            "QUESTIONS_CORRECT" => Some(Self::QuestionsCorrect(value)),
            _ => None,
        }
    }

    /// The storage tag for this criterion.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::TotalXp(_) => "TOTAL_XP",
            Self::LevelReached(_) => "LEVEL_REACHED",
            Self::StreakDays(_) => "STREAK_DAYS",
            Self::ModulesCompleted(_) => "MODULES_COMPLETED",
            Self::QuestionsCorrect(_) => "QUESTIONS_CORRECT",
        }
    }

    /// Whether the condition holds for the given progress state.
    pub fn is_satisfied(&self, facts: &ProgressFacts) -> bool {
        match *self {
            Self::TotalXp(threshold) => facts.total_xp >= threshold,
            Self::LevelReached(threshold) => facts.level_number >= threshold,
            Self::StreakDays(threshold) => facts.streak >= threshold,
            Self::ModulesCompleted(threshold) => facts.modules_completed >= threshold,
            Self::QuestionsCorrect(threshold) => facts.questions_correct >= threshold,
        }
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::TotalXp(v) => write!(f, "reach {v} XP"),
            Self::LevelReached(v) => write!(f, "reach level {v}"),
            Self::StreakDays(v) => write!(f, "keep a {v}-day streak"),
            Self::ModulesCompleted(v) => write!(f, "complete {v} modules"),
            Self::QuestionsCorrect(v) => write!(f, "answer {v} questions correctly"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts() -> ProgressFacts {
        ProgressFacts {
            total_xp: 1050,
            level_number: 3,
            streak: 7,
            modules_completed: 4,
            questions_correct: 52,
        }
    }

    #[test]
    fn test_parse_known_kinds() {
        assert_eq!(
            Criterion::from_parts("TOTAL_XP", 1000),
            Some(Criterion::TotalXp(1000))
        );
        assert_eq!(
            Criterion::from_parts("LEVEL_REACHED", 3),
            Some(Criterion::LevelReached(3))
        );
        assert_eq!(
            Criterion::from_parts("STREAK_DAYS", 7),
            Some(Criterion::StreakDays(7))
        );
        assert_eq!(
            Criterion::from_parts("MODULES_COMPLETED", 5),
            Some(Criterion::ModulesCompleted(5))
        );
        assert_eq!(
            Criterion::from_parts("QUESTIONS_CORRECT", 50),
            Some(Criterion::QuestionsCorrect(50))
        );
    }

    #[test]
    fn test_parse_unknown_kind_is_none() {
        assert_eq!(Criterion::from_parts("PERFECT_WEEK", 1), None);
        assert_eq!(Criterion::from_parts("", 0), None);
        // Tags are case-sensitive on purpose; the seed data is uppercase.
        assert_eq!(Criterion::from_parts("total_xp", 1000), None);
    }

    #[test]
    fn test_kind_round_trips() {
        for criterion in [
            Criterion::TotalXp(1),
            Criterion::LevelReached(1),
            Criterion::StreakDays(1),
            Criterion::ModulesCompleted(1),
            Criterion::QuestionsCorrect(1),
        ] {
            assert_eq!(Criterion::from_parts(criterion.kind(), 1), Some(criterion));
        }
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let f = facts();
        assert!(Criterion::TotalXp(1050).is_satisfied(&f));
        assert!(!Criterion::TotalXp(1051).is_satisfied(&f));
        assert!(Criterion::LevelReached(3).is_satisfied(&f));
        assert!(!Criterion::LevelReached(4).is_satisfied(&f));
        assert!(Criterion::StreakDays(7).is_satisfied(&f));
        assert!(!Criterion::StreakDays(8).is_satisfied(&f));
        assert!(Criterion::ModulesCompleted(4).is_satisfied(&f));
        assert!(!Criterion::ModulesCompleted(5).is_satisfied(&f));
        assert!(Criterion::QuestionsCorrect(50).is_satisfied(&f));
        assert!(!Criterion::QuestionsCorrect(53).is_satisfied(&f));
    }
}
