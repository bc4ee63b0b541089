//! Learning & progression flow tests.
//!
//! These run against the seeded level table (1: 0-99, 2: 100-299, 3: 300-699,
//! 4: 700-1499, 5: 1500+) and achievement catalog from the migrations, so the
//! expected totals below include the seeded rewards (e.g. "First Steps"
//! grants +10 XP the first time a user crosses 10 XP).

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use serde_json::json;

use ghq_api::{error::ApiError, learning::service};

use crate::common::{self, TestClient, db, jwt, test_data};

#[tokio::test]
#[ignore = "requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn award_bootstraps_progress_and_reports_reward_level_up() {
    let state = common::build_state().await.expect("state");
    let user_id = db::create_test_user(
        &state.pool,
        &test_data::unique_email("award"),
        &test_data::unique_username("award"),
    )
    .await
    .expect("user");

    // 90 XP base, then the "First Steps" reward (+10) pushes the total to
    // 100, which crosses the level 1 -> 2 boundary.
    let outcome = service::award_xp(&state.pool, user_id, 90).await.expect("award");

    assert_eq!(outcome.progress.total_xp, 100);
    assert_eq!(outcome.progress.level.number, 2);
    assert_eq!(outcome.progress.streak, 1);
    assert!(outcome.progress.last_active_at.is_some());

    let level_up = outcome.level_up.expect("level up");
    assert_eq!(level_up.previous.number, 1);
    assert_eq!(level_up.new.number, 2);

    let names: Vec<&str> = outcome
        .achievements_unlocked
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(names, ["First Steps"]);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn one_award_can_unlock_several_achievements() {
    let state = common::build_state().await.expect("state");
    let user_id = db::create_test_user(
        &state.pool,
        &test_data::unique_email("multi"),
        &test_data::unique_username("multi"),
    )
    .await
    .expect("user");

    // First award: 90 + 10 (First Steps) = 100, level 2.
    service::award_xp(&state.pool, user_id, 90).await.expect("first award");

    // Second award: 100 + 905 = 1005, level 4. The pass then unlocks
    // "Full Member" (level >= 3, +50 -> 1055) and, with the running total,
    // "Knowledge Seeker" (>= 1000 XP, +100 -> 1155) in the same call.
    let outcome = service::award_xp(&state.pool, user_id, 905).await.expect("second award");

    assert_eq!(outcome.progress.total_xp, 1155);
    assert_eq!(outcome.progress.level.number, 4);

    let level_up = outcome.level_up.expect("level up");
    assert_eq!(level_up.previous.number, 2);
    assert_eq!(level_up.new.number, 4);

    let names: Vec<&str> = outcome
        .achievements_unlocked
        .iter()
        .map(|a| a.name.as_str())
        .collect();
    assert_eq!(names, ["Full Member", "Knowledge Seeker"]);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn achievements_unlock_at_most_once() {
    let state = common::build_state().await.expect("state");
    let user_id = db::create_test_user(
        &state.pool,
        &test_data::unique_email("once"),
        &test_data::unique_username("once"),
    )
    .await
    .expect("user");

    service::award_xp(&state.pool, user_id, 50).await.expect("first award");
    let outcome = service::award_xp(&state.pool, user_id, 50).await.expect("second award");

    // Still above the "First Steps" threshold, but no second unlock and no
    // second reward.
    assert!(outcome.achievements_unlocked.is_empty());
    let count = db::unlock_count(&state.pool, user_id, "First Steps")
        .await
        .expect("count");
    assert_eq!(count, 1);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn award_rejects_non_positive_amounts() {
    let state = common::build_state().await.expect("state");
    let user_id = db::create_test_user(
        &state.pool,
        &test_data::unique_email("reject"),
        &test_data::unique_username("reject"),
    )
    .await
    .expect("user");

    for amount in [0, -5] {
        match service::award_xp(&state.pool, user_id, amount).await {
            Err(ApiError::Validation(_)) => {}
            other => panic!("expected validation error for {amount}, got {other:?}"),
        }
    }

    // Rejected before any write: no progress row was bootstrapped.
    let snapshot = service::progress_snapshot(&state.pool, user_id)
        .await
        .expect("snapshot");
    assert_eq!(snapshot.total_xp, 0);
    assert!(snapshot.last_active_at.is_none());
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn streak_follows_calendar_days() {
    let state = common::build_state().await.expect("state");
    let user_id = db::create_test_user(
        &state.pool,
        &test_data::unique_email("streak"),
        &test_data::unique_username("streak"),
    )
    .await
    .expect("user");

    let outcome = service::award_xp(&state.pool, user_id, 20).await.expect("award");
    assert_eq!(outcome.progress.streak, 1);

    // Pretend the last activity was yesterday with a 3-day streak.
    db::set_progress_activity(&state.pool, user_id, Utc::now() - Duration::days(1), 3)
        .await
        .expect("rewind");
    let outcome = service::award_xp(&state.pool, user_id, 5).await.expect("award");
    assert_eq!(outcome.progress.streak, 4);

    // A second award the same day leaves the streak alone.
    let outcome = service::award_xp(&state.pool, user_id, 5).await.expect("award");
    assert_eq!(outcome.progress.streak, 4);

    // A multi-day gap resets to 1, not 0: the comeback day counts.
    db::set_progress_activity(&state.pool, user_id, Utc::now() - Duration::days(3), 4)
        .await
        .expect("rewind");
    let outcome = service::award_xp(&state.pool, user_id, 5).await.expect("award");
    assert_eq!(outcome.progress.streak, 1);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn lesson_completion_awards_once_and_rolls_up_the_module() {
    let state = common::build_state().await.expect("state");
    let client = TestClient::new(ghq_api::router::router().with_state(state.clone()));

    let user_id = db::create_test_user(
        &state.pool,
        &test_data::unique_email("lesson"),
        &test_data::unique_username("lesson"),
    )
    .await
    .expect("user");
    let token = jwt::create_test_token(user_id, "member@example.com", &state.jwt_secret);

    let module_id = db::create_module(&state.pool, &test_data::unique_username("module"))
        .await
        .expect("module");
    let lesson_id = db::create_lesson(&state.pool, module_id, "Intro", 25)
        .await
        .expect("lesson");

    let response = client
        .post_with_auth(&format!("/learning/lessons/{lesson_id}/complete"), &token)
        .await;
    response.assert_status(StatusCode::OK);
    let result: service::CompletionResult = response.json();

    assert_eq!(result.xp_earned, 25);
    assert!(!result.already_completed);
    // 25 base + 10 from "First Steps".
    assert_eq!(result.progress.as_ref().expect("progress").total_xp, 35);

    // One lesson in the module, so completing it completes the module.
    let rollup = db::module_progress(&state.pool, user_id, module_id)
        .await
        .expect("rollup")
        .expect("rollup row");
    assert_eq!(rollup, (100, true));

    // Repeat completion is idempotent: no XP, no unlocks, stored xp_earned
    // untouched.
    let response = client
        .post_with_auth(&format!("/learning/lessons/{lesson_id}/complete"), &token)
        .await;
    response.assert_status(StatusCode::OK);
    let result: service::CompletionResult = response.json();

    assert_eq!(result.xp_earned, 0);
    assert!(result.already_completed);
    assert!(result.achievements_unlocked.is_empty());
    assert_eq!(result.progress.as_ref().expect("progress").total_xp, 35);

    let stored = db::lesson_progress(&state.pool, user_id, lesson_id)
        .await
        .expect("stored")
        .expect("stored row");
    assert_eq!(stored, (true, 25));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn module_rollup_tracks_partial_completion() {
    let state = common::build_state().await.expect("state");
    let client = TestClient::new(ghq_api::router::router().with_state(state.clone()));

    let user_id = db::create_test_user(
        &state.pool,
        &test_data::unique_email("rollup"),
        &test_data::unique_username("rollup"),
    )
    .await
    .expect("user");
    let token = jwt::create_test_token(user_id, "member@example.com", &state.jwt_secret);

    let module_id = db::create_module(&state.pool, &test_data::unique_username("module"))
        .await
        .expect("module");
    let first = db::create_lesson(&state.pool, module_id, "One", 5)
        .await
        .expect("lesson");
    let second = db::create_lesson(&state.pool, module_id, "Two", 5)
        .await
        .expect("lesson");

    client
        .post_with_auth(&format!("/learning/lessons/{first}/complete"), &token)
        .await
        .assert_status(StatusCode::OK);
    let rollup = db::module_progress(&state.pool, user_id, module_id)
        .await
        .expect("rollup")
        .expect("rollup row");
    assert_eq!(rollup, (50, false));

    client
        .post_with_auth(&format!("/learning/lessons/{second}/complete"), &token)
        .await
        .assert_status(StatusCode::OK);
    let rollup = db::module_progress(&state.pool, user_id, module_id)
        .await
        .expect("rollup")
        .expect("rollup row");
    assert_eq!(rollup, (100, true));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn empty_module_lists_as_zero_progress() {
    let state = common::build_state().await.expect("state");
    let client = TestClient::new(ghq_api::router::router().with_state(state.clone()));

    let user_id = db::create_test_user(
        &state.pool,
        &test_data::unique_email("empty"),
        &test_data::unique_username("empty"),
    )
    .await
    .expect("user");
    let token = jwt::create_test_token(user_id, "member@example.com", &state.jwt_secret);

    let module_id = db::create_module(&state.pool, &test_data::unique_username("empty-module"))
        .await
        .expect("module");

    let response = client.get_with_auth("/learning/modules", &token).await;
    response.assert_status(StatusCode::OK);
    let modules: Vec<ghq_db::models::ModuleWithProgress> = response.json();

    let module = modules
        .iter()
        .find(|m| m.id == module_id)
        .expect("module listed");
    assert_eq!(module.total_lessons, 0);
    assert_eq!(module.progress, 0);
    assert!(!module.is_completed);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn answers_are_judged_trimmed_and_case_insensitive() {
    let state = common::build_state().await.expect("state");
    let client = TestClient::new(ghq_api::router::router().with_state(state.clone()));

    let user_id = db::create_test_user(
        &state.pool,
        &test_data::unique_email("answer"),
        &test_data::unique_username("answer"),
    )
    .await
    .expect("user");
    let token = jwt::create_test_token(user_id, "member@example.com", &state.jwt_secret);

    let module_id = db::create_module(&state.pool, &test_data::unique_username("module"))
        .await
        .expect("module");
    let lesson_id = db::create_lesson(&state.pool, module_id, "Verbs", 5)
        .await
        .expect("lesson");
    let question_id = db::create_question(&state.pool, lesson_id, "goes", 10)
        .await
        .expect("question");

    for submitted in ["Goes", " goes ", "GOES"] {
        let response = client
            .post_json_with_auth(
                &format!("/learning/questions/{question_id}/answer"),
                &json!({ "answer": submitted, "time_spent_seconds": 12 }),
                &token,
            )
            .await;
        response.assert_status(StatusCode::OK);
        let result: service::AnswerResult = response.json();
        assert!(result.correct, "{submitted:?} should be judged correct");
        assert_eq!(result.points, 10);
        assert!(result.progress.is_some());
    }

    // A wrong answer logs an attempt with zero points and awards nothing.
    let response = client
        .post_json_with_auth(
            &format!("/learning/questions/{question_id}/answer"),
            &json!({ "answer": "go" }),
            &token,
        )
        .await;
    response.assert_status(StatusCode::OK);
    let result: service::AnswerResult = response.json();
    assert!(!result.correct);
    assert_eq!(result.points, 0);
    assert!(result.progress.is_none());
    assert_eq!(result.explanation.as_deref(), Some("Third person singular."));

    let (total, correct) = db::attempt_counts(&state.pool, user_id).await.expect("counts");
    assert_eq!((total, correct), (4, 3));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn fresh_user_progress_defaults_to_the_lowest_level() {
    let state = common::build_state().await.expect("state");
    let client = TestClient::new(ghq_api::router::router().with_state(state.clone()));

    let user_id = db::create_test_user(
        &state.pool,
        &test_data::unique_email("fresh"),
        &test_data::unique_username("fresh"),
    )
    .await
    .expect("user");
    let token = jwt::create_test_token(user_id, "member@example.com", &state.jwt_secret);

    let response = client.get_with_auth("/learning/progress", &token).await;
    response.assert_status(StatusCode::OK);
    let snapshot: service::ProgressSnapshot = response.json();

    assert_eq!(snapshot.total_xp, 0);
    assert_eq!(snapshot.level.number, 1);
    assert_eq!(snapshot.streak, 0);
    assert!(snapshot.last_active_at.is_none());
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn secret_achievements_stay_hidden_until_unlocked() {
    let state = common::build_state().await.expect("state");
    let client = TestClient::new(ghq_api::router::router().with_state(state.clone()));

    let user_id = db::create_test_user(
        &state.pool,
        &test_data::unique_email("secret"),
        &test_data::unique_username("secret"),
    )
    .await
    .expect("user");
    let token = jwt::create_test_token(user_id, "member@example.com", &state.jwt_secret);

    let response = client.get_with_auth("/learning/achievements", &token).await;
    response.assert_status(StatusCode::OK);
    let achievements: Vec<ghq_db::models::AchievementWithUnlock> = response.json();

    assert!(achievements.iter().any(|a| a.name == "First Steps"));
    assert!(
        !achievements.iter().any(|a| a.name == "Night Owl"),
        "locked secret achievements must not be listed"
    );
    assert!(achievements.iter().all(|a| a.unlocked_at.is_none()));
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn learning_routes_require_authentication() {
    let state = common::build_state().await.expect("state");
    let client = TestClient::new(ghq_api::router::router().with_state(state));

    let response = client.get("/learning/progress").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "requires a PostgreSQL test database (TEST_DATABASE_URL)"]
async fn completing_an_unknown_lesson_is_not_found() {
    let state = common::build_state().await.expect("state");
    let client = TestClient::new(ghq_api::router::router().with_state(state.clone()));

    let user_id = db::create_test_user(
        &state.pool,
        &test_data::unique_email("missing"),
        &test_data::unique_username("missing"),
    )
    .await
    .expect("user");
    let token = jwt::create_test_token(user_id, "member@example.com", &state.jwt_secret);

    let response = client
        .post_with_auth(
            &format!("/learning/lessons/{}/complete", uuid::Uuid::new_v4()),
            &token,
        )
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}
