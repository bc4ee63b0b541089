//! The progression engine.
//!
//! Every XP-earning event funnels through [`award_xp`]: streak bookkeeping,
//! level transitions, and achievement unlocks all happen here, inside one
//! transaction per request. The rules themselves live in `ghq-progression`;
//! this module wires them to storage.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use ghq_db::{
    models::{Level, QuestionAttemptInsert, UserProgress},
    repositories::{content, progression},
};
use ghq_progression::{
    criteria::{Criterion, ProgressFacts},
    level::{self, XpBand},
    rollup::module_rollup,
    streak::next_streak,
};

use crate::{error::ApiError, learning::answers};

/// Bound on transaction retries after a deadlock/serialization failure.
const MAX_WRITE_ATTEMPTS: u32 = 3;

/// Level fields exposed to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelPayload {
    pub id: Uuid,
    pub number: i32,
    pub name: String,
    pub min_xp: i64,
    pub max_xp: Option<i64>,
}

impl From<&Level> for LevelPayload {
    fn from(level: &Level) -> Self {
        Self {
            id: level.id,
            number: level.number,
            name: level.name.clone(),
            min_xp: level.min_xp,
            max_xp: level.max_xp,
        }
    }
}

/// A user's progression state after an award (or at rest).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub total_xp: i64,
    pub level: LevelPayload,
    pub streak: i32,
    pub last_active_at: Option<DateTime<Utc>>,
}

/// Reported when an award moved the user to a higher level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelUp {
    pub previous: LevelPayload,
    pub new: LevelPayload,
}

/// An achievement unlocked by the current call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnlockedAchievement {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub xp_reward: i32,
}

/// Everything a single XP award produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwardOutcome {
    pub progress: ProgressSnapshot,
    pub level_up: Option<LevelUp>,
    pub achievements_unlocked: Vec<UnlockedAchievement>,
}

/// Result of a lesson-completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionResult {
    /// XP granted by this call; 0 on repeat completions.
    pub xp_earned: i32,
    pub already_completed: bool,
    pub progress: Option<ProgressSnapshot>,
    pub level_up: Option<LevelUp>,
    pub achievements_unlocked: Vec<UnlockedAchievement>,
}

/// Result of an answer submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub correct: bool,
    /// Points granted; 0 for a wrong answer.
    pub points: i32,
    pub explanation: Option<String>,
    pub progress: Option<ProgressSnapshot>,
    pub level_up: Option<LevelUp>,
    pub achievements_unlocked: Vec<UnlockedAchievement>,
}

/// Award XP to a user for an activity that just happened.
///
/// Serialized per user via a row lock; on deadlock/serialization failure the
/// transaction is retried a bounded number of times before surfacing a
/// conflict the caller may re-submit.
pub async fn award_xp(
    pool: &PgPool,
    user_id: Uuid,
    amount: i64,
) -> Result<AwardOutcome, ApiError> {
    run_serialized(pool, user_id, async move |tx| {
        award_xp_in_tx(tx, user_id, amount, Utc::now()).await
    })
    .await
}

/// Mark a lesson completed and award its XP, exactly once per (user, lesson).
pub async fn complete_lesson(
    pool: &PgPool,
    user_id: Uuid,
    lesson_id: Uuid,
) -> Result<CompletionResult, ApiError> {
    run_serialized(pool, user_id, async |tx| {
        complete_lesson_in_tx(tx, user_id, lesson_id, Utc::now()).await
    })
    .await
}

/// Judge an answer, log the attempt, and award points when correct.
pub async fn submit_answer(
    pool: &PgPool,
    user_id: Uuid,
    question_id: Uuid,
    answer: String,
    time_spent_seconds: Option<i32>,
) -> Result<AnswerResult, ApiError> {
    run_serialized(pool, user_id, async |tx| {
        submit_answer_in_tx(
            tx,
            user_id,
            question_id,
            &answer,
            time_spent_seconds,
            Utc::now(),
        )
        .await
    })
    .await
}

/// A user's current progression state, without mutating anything.
///
/// Users who never earned XP get a synthetic at-rest snapshot on the lowest
/// level rather than a 404.
pub async fn progress_snapshot(pool: &PgPool, user_id: Uuid) -> Result<ProgressSnapshot, ApiError> {
    let levels = progression::get_levels(pool).await?;
    match progression::get_user_progress(pool, user_id).await? {
        Some(row) => snapshot_from_row(&levels, &row),
        None => {
            let lowest = levels
                .first()
                .ok_or_else(|| ApiError::LevelTable("level table is empty".to_string()))?;
            Ok(ProgressSnapshot {
                total_xp: 0,
                level: lowest.into(),
                streak: 0,
                last_active_at: None,
            })
        }
    }
}

/// Run `body` in a transaction, retrying on deadlock/serialization failures.
async fn run_serialized<T, F>(pool: &PgPool, user_id: Uuid, mut body: F) -> Result<T, ApiError>
where
    F: AsyncFnMut(&mut Transaction<'static, Postgres>) -> Result<T, ApiError>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let mut tx = pool.begin().await?;
        match body(&mut tx).await {
            Ok(value) => {
                tx.commit().await?;
                return Ok(value);
            }
            Err(err) if is_retryable(&err) => {
                let _ = tx.rollback().await;
                if attempt >= MAX_WRITE_ATTEMPTS {
                    return Err(ApiError::Conflict(
                        "Progress update conflicted with a concurrent request, please retry"
                            .to_string(),
                    ));
                }
                tracing::warn!(%user_id, attempt, "retrying progress update after conflict");
            }
            Err(err) => return Err(err),
        }
    }
}

fn is_retryable(err: &ApiError) -> bool {
    match err {
        ApiError::Database(sqlx::Error::Database(db_err)) => {
            // serialization_failure / deadlock_detected
            matches!(db_err.code().as_deref(), Some("40001") | Some("40P01"))
        }
        _ => false,
    }
}

fn bands_of(levels: &[Level]) -> Vec<XpBand> {
    levels
        .iter()
        .map(|l| XpBand {
            number: l.number,
            min_xp: l.min_xp,
            max_xp: l.max_xp,
        })
        .collect()
}

fn resolve_level<'a>(
    levels: &'a [Level],
    bands: &[XpBand],
    total_xp: i64,
) -> Result<&'a Level, ApiError> {
    let band =
        level::resolve(bands, total_xp).map_err(|err| ApiError::LevelTable(err.to_string()))?;
    levels
        .iter()
        .find(|l| l.number == band.number)
        .ok_or_else(|| ApiError::LevelTable(format!("level {} missing from the table", band.number)))
}

fn snapshot_from_row(levels: &[Level], row: &UserProgress) -> Result<ProgressSnapshot, ApiError> {
    let level = levels.iter().find(|l| l.id == row.level_id).ok_or_else(|| {
        ApiError::LevelTable(format!(
            "user {} points at level {} which is missing from the table",
            row.user_id, row.level_id
        ))
    })?;
    Ok(ProgressSnapshot {
        total_xp: row.total_xp,
        level: level.into(),
        streak: row.streak,
        last_active_at: row.last_active_at,
    })
}

async fn award_xp_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    amount: i64,
    now: DateTime<Utc>,
) -> Result<AwardOutcome, ApiError> {
    // Reject before any write; a zero award must not trigger achievement
    // re-checks for free.
    if amount <= 0 {
        return Err(ApiError::Validation(
            "XP amount must be positive".to_string(),
        ));
    }

    let levels = progression::get_levels(&mut **tx).await?;
    let bands = bands_of(&levels);

    // Lock the progress row; bootstrap it on first activity. A racing
    // bootstrap is resolved by the ON CONFLICT no-op plus the re-read.
    let current = match progression::lock_user_progress(&mut **tx, user_id).await? {
        Some(row) => row,
        None => {
            let lowest = levels
                .first()
                .ok_or_else(|| ApiError::LevelTable("level table is empty".to_string()))?;
            progression::insert_user_progress_if_absent(&mut **tx, user_id, lowest.id).await?;
            progression::lock_user_progress(&mut **tx, user_id)
                .await?
                .ok_or_else(|| sqlx::Error::RowNotFound)?
        }
    };

    let previous_level = resolve_level(&levels, &bands, current.total_xp)?;
    let new_total = current.total_xp + amount;
    let new_level = resolve_level(&levels, &bands, new_total)?;
    let streak = next_streak(current.streak, current.last_active_at, now);

    progression::update_user_progress(&mut **tx, user_id, new_total, new_level.id, streak, now)
        .await?;

    // Achievement pass against the fresh state. Rewards fold straight into
    // the total (no recursive award: no second streak or activity credit),
    // and the level is re-resolved afterwards so level_id always matches
    // total_xp.
    let (final_total, final_level, unlocked) =
        evaluate_achievements(tx, user_id, &levels, &bands, new_total, new_level, streak, now)
            .await?;

    if final_total != new_total {
        progression::update_user_progress_xp(&mut **tx, user_id, final_total, final_level.id)
            .await?;
    }

    counter!("xp_awards_total").increment(1);

    let level_up = (final_level.number > previous_level.number).then(|| {
        counter!("level_ups_total").increment(1);
        LevelUp {
            previous: previous_level.into(),
            new: final_level.into(),
        }
    });

    Ok(AwardOutcome {
        progress: ProgressSnapshot {
            total_xp: final_total,
            level: final_level.into(),
            streak,
            last_active_at: Some(now),
        },
        level_up,
        achievements_unlocked: unlocked,
    })
}

/// Evaluate every still-locked achievement against the given state.
///
/// Returns the total and level after folding in unlock rewards, plus the
/// unlocks themselves. Evaluation order is the stable catalog order, and one
/// unlock never suppresses another in the same pass: the facts are updated as
/// rewards accumulate, so a reward pushing the total over the next threshold
/// unlocks that one too.
#[allow(clippy::too_many_arguments)]
async fn evaluate_achievements<'a>(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    levels: &'a [Level],
    bands: &[XpBand],
    total_xp: i64,
    current_level: &'a Level,
    streak: i32,
    now: DateTime<Utc>,
) -> Result<(i64, &'a Level, Vec<UnlockedAchievement>), ApiError> {
    let catalog = progression::get_achievement_catalog(&mut **tx).await?;
    let already_unlocked: HashSet<Uuid> = progression::get_unlocked_achievement_ids(&mut **tx, user_id)
        .await?
        .into_iter()
        .collect();

    // Counts cannot change mid-pass (rewards only move XP), so read them once.
    let modules_completed = progression::count_completed_modules(&mut **tx, user_id).await?;
    let questions_correct = progression::count_correct_attempts(&mut **tx, user_id).await?;

    let mut total = total_xp;
    let mut level_now = current_level;
    let mut unlocked = Vec::new();

    for achievement in &catalog {
        if already_unlocked.contains(&achievement.id) {
            continue;
        }

        let Some(criterion) =
            Criterion::from_parts(&achievement.criteria_kind, achievement.criteria_value)
        else {
            // Unknown kinds never unlock; a newer catalog row degrades
            // gracefully on an older service.
            tracing::warn!(
                achievement = %achievement.name,
                kind = %achievement.criteria_kind,
                "unknown achievement criteria kind, skipping"
            );
            continue;
        };

        let facts = ProgressFacts {
            total_xp: total,
            level_number: level_now.number,
            streak,
            modules_completed,
            questions_correct,
        };
        if !criterion.is_satisfied(&facts) {
            continue;
        }

        // A concurrent evaluation may have unlocked this first; the loser of
        // the insert race skips the reward too.
        if !progression::insert_user_achievement(&mut **tx, user_id, achievement.id, now).await? {
            continue;
        }

        if achievement.xp_reward > 0 {
            total += i64::from(achievement.xp_reward);
            level_now = resolve_level(levels, bands, total)?;
        }

        counter!("achievements_unlocked_total").increment(1);
        tracing::info!(%user_id, achievement = %achievement.name, "achievement unlocked");

        unlocked.push(UnlockedAchievement {
            id: achievement.id,
            name: achievement.name.clone(),
            description: achievement.description.clone(),
            xp_reward: achievement.xp_reward,
        });
    }

    Ok((total, level_now, unlocked))
}

async fn complete_lesson_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    lesson_id: Uuid,
    now: DateTime<Utc>,
) -> Result<CompletionResult, ApiError> {
    let lesson = content::get_lesson(&mut **tx, lesson_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Lesson not found".to_string()))?;

    // Only the call that flips is_completed false->true awards XP; xp_earned
    // is fixed at that moment and repeat calls short-circuit.
    let first_completion =
        content::mark_lesson_completed(&mut **tx, user_id, lesson_id, lesson.xp_reward, now)
            .await?;

    if !first_completion {
        let levels = progression::get_levels(&mut **tx).await?;
        let progress = match progression::get_user_progress(&mut **tx, user_id).await? {
            Some(row) => Some(snapshot_from_row(&levels, &row)?),
            None => None,
        };
        return Ok(CompletionResult {
            xp_earned: 0,
            already_completed: true,
            progress,
            level_up: None,
            achievements_unlocked: Vec::new(),
        });
    }

    let outcome = award_xp_in_tx(tx, user_id, i64::from(lesson.xp_reward), now).await?;
    recompute_module_progress_in_tx(tx, user_id, lesson.module_id).await?;

    Ok(CompletionResult {
        xp_earned: lesson.xp_reward,
        already_completed: false,
        progress: Some(outcome.progress),
        level_up: outcome.level_up,
        achievements_unlocked: outcome.achievements_unlocked,
    })
}

async fn submit_answer_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    question_id: Uuid,
    answer: &str,
    time_spent_seconds: Option<i32>,
    now: DateTime<Utc>,
) -> Result<AnswerResult, ApiError> {
    let question = content::get_question(&mut **tx, question_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Question not found".to_string()))?;

    let correct = answers::is_correct_answer(answer, &question.correct_answer);
    let points = if correct { question.points } else { 0 };

    // Every attempt lands in the log, wrong ones included.
    content::insert_question_attempt(
        &mut **tx,
        &QuestionAttemptInsert {
            user_id,
            question_id,
            answer: answer.to_string(),
            is_correct: correct,
            points,
            time_spent_seconds,
        },
    )
    .await?;

    let outcome = if correct {
        Some(award_xp_in_tx(tx, user_id, i64::from(question.points), now).await?)
    } else {
        None
    };

    let (progress, level_up, achievements_unlocked) = match outcome {
        Some(award) => (
            Some(award.progress),
            award.level_up,
            award.achievements_unlocked,
        ),
        None => (None, None, Vec::new()),
    };

    Ok(AnswerResult {
        correct,
        points,
        explanation: question.explanation,
        progress,
        level_up,
        achievements_unlocked,
    })
}

/// Rebuild a module's rollup row from its lessons' completion state.
async fn recompute_module_progress_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    module_id: Uuid,
) -> Result<(), ApiError> {
    let counts = content::module_lesson_counts(&mut **tx, user_id, module_id).await?;
    let rollup = module_rollup(counts.total_lessons, counts.completed_lessons);
    content::upsert_module_progress(
        &mut **tx,
        user_id,
        module_id,
        rollup.progress,
        rollup.is_completed,
        counts.xp_earned,
    )
    .await?;
    Ok(())
}
