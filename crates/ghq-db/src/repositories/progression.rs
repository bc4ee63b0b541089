use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{Achievement, AchievementWithUnlock, Level, UserProgress};

/// Load the full level table, lowest number first.
pub async fn get_levels<'e, E>(executor: E) -> Result<Vec<Level>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, number, name, min_xp, max_xp, color, icon
            FROM levels
            ORDER BY number
        "#,
    )
    .fetch_all(executor)
    .await
}

/// Read a user's progress row without locking it.
pub async fn get_user_progress<'e, E>(
    executor: E,
    user_id: Uuid,
) -> Result<Option<UserProgress>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT user_id, total_xp, level_id, streak, last_active_at, created_at, updated_at
            FROM user_progress
            WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Read a user's progress row and take a row-level lock on it.
///
/// Must run inside a transaction; the lock serializes concurrent XP awards
/// for the same user until commit.
pub async fn lock_user_progress<'e, E>(
    executor: E,
    user_id: Uuid,
) -> Result<Option<UserProgress>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT user_id, total_xp, level_id, streak, last_active_at, created_at, updated_at
            FROM user_progress
            WHERE user_id = $1
            FOR UPDATE
        "#,
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
}

/// Create the first-activity bootstrap row if the user has none yet.
///
/// Racing bootstraps are harmless: the loser's insert is a no-op and the
/// caller re-reads with [`lock_user_progress`].
pub async fn insert_user_progress_if_absent<'e, E>(
    executor: E,
    user_id: Uuid,
    level_id: Uuid,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO user_progress (user_id, total_xp, level_id, streak, last_active_at)
            VALUES ($1, 0, $2, 0, NULL)
            ON CONFLICT (user_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(level_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Persist the post-award progress state in one atomic update.
pub async fn update_user_progress<'e, E>(
    executor: E,
    user_id: Uuid,
    total_xp: i64,
    level_id: Uuid,
    streak: i32,
    last_active_at: DateTime<Utc>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            UPDATE user_progress
            SET total_xp = $2,
                level_id = $3,
                streak = $4,
                last_active_at = $5,
                updated_at = NOW()
            WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(total_xp)
    .bind(level_id)
    .bind(streak)
    .bind(last_active_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Fold achievement rewards into the total and re-point the level.
///
/// Streak and `last_active_at` are deliberately untouched: rewards are a pure
/// XP top-up, not a new activity.
pub async fn update_user_progress_xp<'e, E>(
    executor: E,
    user_id: Uuid,
    total_xp: i64,
    level_id: Uuid,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            UPDATE user_progress
            SET total_xp = $2,
                level_id = $3,
                updated_at = NOW()
            WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(total_xp)
    .bind(level_id)
    .execute(executor)
    .await?;
    Ok(())
}

/// Load the achievement catalog in stable evaluation order.
pub async fn get_achievement_catalog<'e, E>(executor: E) -> Result<Vec<Achievement>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, name, description, xp_reward, criteria_kind, criteria_value, is_secret
            FROM achievements
            ORDER BY name
        "#,
    )
    .fetch_all(executor)
    .await
}

/// IDs of the achievements a user has already unlocked.
pub async fn get_unlocked_achievement_ids<'e, E>(
    executor: E,
    user_id: Uuid,
) -> Result<Vec<Uuid>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT achievement_id
            FROM user_achievements
            WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

/// Record an unlock. Returns false when the pair already existed, which a
/// concurrent evaluation may have inserted first; the caller must then skip
/// the reward.
pub async fn insert_user_achievement<'e, E>(
    executor: E,
    user_id: Uuid,
    achievement_id: Uuid,
    unlocked_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO user_achievements (user_id, achievement_id, unlocked_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, achievement_id) DO NOTHING
        "#,
    )
    .bind(user_id)
    .bind(achievement_id)
    .bind(unlocked_at)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Count of modules the user has fully completed (MODULES_COMPLETED facts).
pub async fn count_completed_modules<'e, E>(executor: E, user_id: Uuid) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT COUNT(*)
            FROM user_module_progress
            WHERE user_id = $1 AND is_completed = TRUE
        "#,
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
}

/// Count of correct question attempts (QUESTIONS_CORRECT facts).
pub async fn count_correct_attempts<'e, E>(executor: E, user_id: Uuid) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_scalar(
        // language=PostgreSQL
        r#"
            SELECT COUNT(*)
            FROM question_attempts
            WHERE user_id = $1 AND is_correct = TRUE
        "#,
    )
    .bind(user_id)
    .fetch_one(executor)
    .await
}

/// Catalog joined with the caller's unlock state, for listings.
///
/// Secret achievements stay out of the result until unlocked.
pub async fn get_achievements_for_user<'e, E>(
    executor: E,
    user_id: Uuid,
) -> Result<Vec<AchievementWithUnlock>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT a.id, a.name, a.description, a.xp_reward, a.is_secret, ua.unlocked_at
            FROM achievements a
            LEFT JOIN user_achievements ua
                ON ua.achievement_id = a.id AND ua.user_id = $1
            WHERE a.is_secret = FALSE OR ua.unlocked_at IS NOT NULL
            ORDER BY a.name
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}
