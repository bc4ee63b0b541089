use chrono::{DateTime, Utc};
use sqlx::{Executor, Postgres};
use uuid::Uuid;

use crate::models::{
    Lesson, ModuleLessonCounts, ModuleWithProgress, Question, QuestionAttemptInsert,
    UserLessonProgress,
};

pub async fn get_lesson<'e, E>(executor: E, lesson_id: Uuid) -> Result<Option<Lesson>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, module_id, title, xp_reward, position
            FROM lessons
            WHERE id = $1
        "#,
    )
    .bind(lesson_id)
    .fetch_optional(executor)
    .await
}

pub async fn get_question<'e, E>(
    executor: E,
    question_id: Uuid,
) -> Result<Option<Question>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT id, lesson_id, prompt, question_type, options, correct_answer, explanation, points
            FROM questions
            WHERE id = $1
        "#,
    )
    .bind(question_id)
    .fetch_optional(executor)
    .await
}

pub async fn get_lesson_progress<'e, E>(
    executor: E,
    user_id: Uuid,
    lesson_id: Uuid,
) -> Result<Option<UserLessonProgress>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT user_id, lesson_id, is_completed, xp_earned, completed_at
            FROM user_lesson_progress
            WHERE user_id = $1 AND lesson_id = $2
        "#,
    )
    .bind(user_id)
    .bind(lesson_id)
    .fetch_optional(executor)
    .await
}

/// Transition a lesson to completed, fixing `xp_earned` at that moment.
///
/// Returns true only for the call that performed the false-to-true
/// transition. Repeat calls (and concurrent duplicates) see zero rows
/// affected and must not re-award XP.
pub async fn mark_lesson_completed<'e, E>(
    executor: E,
    user_id: Uuid,
    lesson_id: Uuid,
    xp_earned: i32,
    completed_at: DateTime<Utc>,
) -> Result<bool, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO user_lesson_progress (user_id, lesson_id, is_completed, xp_earned, completed_at)
            VALUES ($1, $2, TRUE, $3, $4)
            ON CONFLICT (user_id, lesson_id)
            DO UPDATE SET
                is_completed = TRUE,
                xp_earned = EXCLUDED.xp_earned,
                completed_at = EXCLUDED.completed_at,
                updated_at = NOW()
            WHERE user_lesson_progress.is_completed = FALSE
        "#,
    )
    .bind(user_id)
    .bind(lesson_id)
    .bind(xp_earned)
    .bind(completed_at)
    .execute(executor)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Lesson counts feeding the module rollup.
pub async fn module_lesson_counts<'e, E>(
    executor: E,
    user_id: Uuid,
    module_id: Uuid,
) -> Result<ModuleLessonCounts, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                COUNT(l.id) AS total_lessons,
                COUNT(l.id) FILTER (WHERE ulp.is_completed) AS completed_lessons,
                COALESCE(SUM(ulp.xp_earned) FILTER (WHERE ulp.is_completed), 0)::bigint AS xp_earned
            FROM lessons l
            LEFT JOIN user_lesson_progress ulp
                ON ulp.lesson_id = l.id AND ulp.user_id = $1
            WHERE l.module_id = $2
        "#,
    )
    .bind(user_id)
    .bind(module_id)
    .fetch_one(executor)
    .await
}

pub async fn upsert_module_progress<'e, E>(
    executor: E,
    user_id: Uuid,
    module_id: Uuid,
    progress: i32,
    is_completed: bool,
    xp_earned: i64,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO user_module_progress (user_id, module_id, progress, is_completed, xp_earned)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (user_id, module_id)
            DO UPDATE SET
                progress = $3,
                is_completed = $4,
                xp_earned = $5,
                updated_at = NOW()
        "#,
    )
    .bind(user_id)
    .bind(module_id)
    .bind(progress)
    .bind(is_completed)
    .bind(xp_earned)
    .execute(executor)
    .await?;
    Ok(())
}

/// Published modules with the caller's rollup, curriculum order.
pub async fn list_modules_with_progress<'e, E>(
    executor: E,
    user_id: Uuid,
) -> Result<Vec<ModuleWithProgress>, sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as(
        // language=PostgreSQL
        r#"
            SELECT
                m.id,
                m.title,
                m.description,
                m.position,
                (SELECT COUNT(*) FROM lessons l WHERE l.module_id = m.id) AS total_lessons,
                COALESCE(ump.progress, 0) AS progress,
                COALESCE(ump.is_completed, FALSE) AS is_completed,
                COALESCE(ump.xp_earned, 0)::bigint AS xp_earned
            FROM learning_modules m
            LEFT JOIN user_module_progress ump
                ON ump.module_id = m.id AND ump.user_id = $1
            WHERE m.is_published = TRUE
            ORDER BY m.position, m.title
        "#,
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}

/// Append one attempt to the log. Attempts are recorded for wrong answers
/// too; only `points` differs.
pub async fn insert_question_attempt<'e, E>(
    executor: E,
    attempt: &QuestionAttemptInsert,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query(
        // language=PostgreSQL
        r#"
            INSERT INTO question_attempts (user_id, question_id, answer, is_correct, points, time_spent_seconds)
            VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(attempt.user_id)
    .bind(attempt.question_id)
    .bind(&attempt.answer)
    .bind(attempt.is_correct)
    .bind(attempt.points)
    .bind(attempt.time_spent_seconds)
    .execute(executor)
    .await?;
    Ok(())
}
