use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Level model - one tier of the XP ladder
///
/// Levels are seeded once and effectively immutable at runtime. Their ranges
/// partition the non-negative XP line: contiguous, non-overlapping, ordered by
/// `number`, with the top tier's `max_xp` left NULL (unbounded).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Level {
    /// Unique level identifier
    pub id: Uuid,
    /// Level number, unique and monotonically increasing
    pub number: i32,
    /// Display name (max 100 chars)
    pub name: String,
    /// Inclusive lower XP bound
    pub min_xp: i64,
    /// Inclusive upper XP bound, NULL for the unbounded top tier
    pub max_xp: Option<i64>,
    /// Display color (hex string, display only)
    pub color: Option<String>,
    /// Display icon name (display only)
    pub icon: Option<String>,
}

/// Achievement model - a one-time-unlockable bonus with a criteria predicate
///
/// `criteria_kind` + `criteria_value` are parsed into a typed criterion at the
/// application boundary; this row keeps them in storage form.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Achievement {
    /// Unique achievement identifier
    pub id: Uuid,
    /// Unique display name
    pub name: String,
    /// Description shown once visible
    pub description: String,
    /// XP granted on unlock (>= 0)
    pub xp_reward: i32,
    /// Criteria tag, e.g. TOTAL_XP or STREAK_DAYS
    pub criteria_kind: String,
    /// Criteria threshold
    pub criteria_value: i64,
    /// Hidden from listings until unlocked
    pub is_secret: bool,
}

/// Per-user progression state - one row per user, created lazily on the first
/// XP award and mutated only by the progression engine
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProgress {
    /// User ID (primary key, 1:1 with users)
    pub user_id: Uuid,
    /// Cumulative XP, monotonically non-decreasing
    pub total_xp: i64,
    /// Current level, always consistent with `total_xp`
    pub level_id: Uuid,
    /// Consecutive active days
    pub streak: i32,
    /// Most recent XP-earning activity, NULL before the first award
    pub last_active_at: Option<DateTime<Utc>>,
    /// When this row was created
    pub created_at: DateTime<Utc>,
    /// When this row was last updated
    pub updated_at: DateTime<Utc>,
}

/// Achievement unlock record - immutable once created, at most one per
/// (user, achievement) pair
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserAchievement {
    /// User ID (composite key with achievement_id)
    pub user_id: Uuid,
    /// Achievement ID
    pub achievement_id: Uuid,
    /// When the unlock happened
    pub unlocked_at: DateTime<Utc>,
}

/// Learning module - top of the content hierarchy, contains lessons
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LearningModule {
    /// Unique module identifier
    pub id: Uuid,
    /// Module title (max 255 chars)
    pub title: String,
    /// Module description (TEXT for longer content)
    pub description: Option<String>,
    /// Ordering within the curriculum
    pub position: i32,
    /// Unpublished modules are hidden from members
    pub is_published: bool,
}

/// Lesson model - belongs to a module, worth a fixed XP reward on completion
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lesson {
    /// Unique lesson identifier
    pub id: Uuid,
    /// Module ID this lesson belongs to (indexed)
    pub module_id: Uuid,
    /// Lesson title (max 255 chars)
    pub title: String,
    /// XP granted on first completion (> 0)
    pub xp_reward: i32,
    /// Ordering within the module
    pub position: i32,
}

/// Question model - belongs to a lesson
///
/// `options` is free-form JSON owned by the content editor (choice lists,
/// matching pairs); the engine never interprets it. Correctness is judged
/// against `correct_answer` alone.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Question {
    /// Unique question identifier
    pub id: Uuid,
    /// Lesson ID this question belongs to (indexed)
    pub lesson_id: Uuid,
    /// Question prompt
    pub prompt: String,
    /// Question type tag, e.g. MULTIPLE_CHOICE, FILL_BLANK, MATCHING
    pub question_type: String,
    /// Type-specific presentation payload
    pub options: Option<serde_json::Value>,
    /// Reference answer for correctness checks
    pub correct_answer: String,
    /// Shown after an attempt
    pub explanation: Option<String>,
    /// XP granted for a correct answer (> 0)
    pub points: i32,
}

/// Per-user lesson completion record
///
/// `xp_earned` is fixed the first time `is_completed` flips to true; repeat
/// completions never touch it again.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserLessonProgress {
    /// User ID (composite key with lesson_id)
    pub user_id: Uuid,
    /// Lesson ID
    pub lesson_id: Uuid,
    /// Whether the lesson has been completed
    pub is_completed: bool,
    /// XP counted for this lesson, captured at first completion
    pub xp_earned: i32,
    /// First completion time, NULL until completed
    pub completed_at: Option<DateTime<Utc>>,
}

/// Per-user module rollup - derived aggregate recomputed from lesson progress,
/// not an independent source of truth
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserModuleProgress {
    /// User ID (composite key with module_id)
    pub user_id: Uuid,
    /// Module ID
    pub module_id: Uuid,
    /// Whole-percent completion, 0..=100
    pub progress: i32,
    /// True once every lesson in the module is completed
    pub is_completed: bool,
    /// Sum of `xp_earned` over the user's completed lessons in this module
    pub xp_earned: i64,
}

/// Optimized insert struct for question attempts
///
/// The attempt log is append-only and high-volume; rows are never updated or
/// deleted and double as the QUESTIONS_CORRECT criteria source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAttemptInsert {
    pub user_id: Uuid,
    pub question_id: Uuid,
    pub answer: String,
    pub is_correct: bool,
    pub points: i32,
    pub time_spent_seconds: Option<i32>,
}

/// Achievement catalog row joined with the caller's unlock state
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AchievementWithUnlock {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub xp_reward: i32,
    pub is_secret: bool,
    /// NULL while still locked
    pub unlocked_at: Option<DateTime<Utc>>,
}

/// Module listing row joined with the caller's rollup
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ModuleWithProgress {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub position: i32,
    pub total_lessons: i64,
    /// 0 when the user has no rollup row yet
    pub progress: i32,
    pub is_completed: bool,
    pub xp_earned: i64,
}

/// Lesson completion counts for one (user, module) pair, the rollup input
#[derive(Debug, Clone, Copy, sqlx::FromRow)]
pub struct ModuleLessonCounts {
    /// Lessons in the module
    pub total_lessons: i64,
    /// Of those, completed by this user
    pub completed_lessons: i64,
    /// Summed `xp_earned` over the completed ones
    pub xp_earned: i64,
}
