//! Module completion rollup math.

/// Completion state derived from a module's lesson counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleRollup {
    /// Whole-percent completion, 0..=100.
    pub progress: i32,
    /// True only when every lesson of a non-empty module is completed.
    pub is_completed: bool,
}

/// Roll lesson completion counts up into module progress.
///
/// A module with zero lessons is a defined edge case: 0% and not completed,
/// never a division error.
pub fn module_rollup(total_lessons: i64, completed_lessons: i64) -> ModuleRollup {
    if total_lessons <= 0 {
        return ModuleRollup {
            progress: 0,
            is_completed: false,
        };
    }

    let completed = completed_lessons.clamp(0, total_lessons);
    ModuleRollup {
        progress: (completed * 100 / total_lessons) as i32,
        is_completed: completed == total_lessons,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_module() {
        let rollup = module_rollup(0, 0);
        assert_eq!(rollup.progress, 0);
        assert!(!rollup.is_completed);
    }

    #[test]
    fn test_partial_completion() {
        assert_eq!(module_rollup(4, 1).progress, 25);
        assert_eq!(module_rollup(4, 3).progress, 75);
        assert!(!module_rollup(4, 3).is_completed);
        // Integer percent truncates.
        assert_eq!(module_rollup(3, 1).progress, 33);
    }

    #[test]
    fn test_full_completion() {
        let rollup = module_rollup(5, 5);
        assert_eq!(rollup.progress, 100);
        assert!(rollup.is_completed);
    }

    #[test]
    fn test_counts_are_clamped() {
        // A stale completed count above the lesson count (lesson deleted
        // after completion) must not overshoot 100%.
        let rollup = module_rollup(3, 4);
        assert_eq!(rollup.progress, 100);
        assert!(rollup.is_completed);
    }
}
