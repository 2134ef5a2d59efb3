mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::NaiveDate;
use common::{MockRepo, STUDENT_ID, module, populated_repo, session_cookie_for, state_with, test_state};
use dojo_portal::{
    config::{AppConfig, Phase3Policy},
    create_router,
    derivations::{compute_access, weekly_plan},
    models::{PlanEntry, PlanSettings, TaskStatus, TaskType, WeeklyPlan},
};
use serde_json::Value;
use tower::util::ServiceExt;
use uuid::Uuid;

const COURSE_ID: Uuid = Uuid::from_u128(0xc0de);

fn five_modules() -> MockRepo {
    MockRepo {
        modules: (1..=5).map(|n| module(n, &format!("Chapitre {n}"))).collect(),
        ..populated_repo()
    }
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn entry(n: u128, date: NaiveDate, status: TaskStatus) -> PlanEntry {
    PlanEntry {
        id: Uuid::from_u128(n),
        date,
        task_type: TaskType::Learn,
        status,
        module_id: Some(Uuid::from_u128(1)),
        module_title: Some("Chapitre 1".to_string()),
        module_number: Some(1),
        blocks: 2,
    }
}

async fn call(state: dojo_portal::AppState, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .uri(uri)
        .header(header::COOKIE, session_cookie_for(STUDENT_ID, &state.config))
        .body(Body::empty())
        .unwrap();

    let response = create_router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// --- Phase-3 access ---

#[tokio::test]
async fn test_relaxed_policy_grants_access_without_progress() {
    // Partial progress must not change the relaxed answer.
    let repo = MockRepo {
        learned: vec![Uuid::from_u128(2)],
        ..five_modules()
    };

    let result = compute_access(&repo, Phase3Policy::Relaxed, STUDENT_ID, COURSE_ID).await;

    assert!(result.success);
    let access = result.data.unwrap();
    assert!(access.can_access);
    assert_eq!(access.learned_modules, 5);
    assert_eq!(access.total_modules, 5);
    assert!(access.unlearned_modules.is_empty());
    assert!(access.message.is_none());
}

#[tokio::test]
async fn test_relaxed_policy_on_empty_course() {
    let result = compute_access(&populated_repo(), Phase3Policy::Relaxed, STUDENT_ID, COURSE_ID).await;

    let access = result.data.unwrap();
    assert!(access.can_access);
    assert_eq!(access.total_modules, 0);
}

#[tokio::test]
async fn test_strict_policy_lists_unlearned_modules_in_order() {
    let repo = MockRepo {
        learned: vec![Uuid::from_u128(1), Uuid::from_u128(3)],
        ..five_modules()
    };

    let result = compute_access(&repo, Phase3Policy::Strict, STUDENT_ID, COURSE_ID).await;

    let access = result.data.unwrap();
    assert!(!access.can_access);
    assert_eq!(access.learned_modules, 2);
    assert_eq!(access.total_modules, 5);
    let orders: Vec<i32> = access.unlearned_modules.iter().map(|m| m.order).collect();
    assert_eq!(orders, vec![2, 4, 5]);
    assert!(access.message.is_some());
}

#[tokio::test]
async fn test_strict_policy_opens_once_everything_is_learned() {
    let repo = MockRepo {
        learned: (1..=5).map(Uuid::from_u128).collect(),
        ..five_modules()
    };

    let result = compute_access(&repo, Phase3Policy::Strict, STUDENT_ID, COURSE_ID).await;

    assert!(result.data.unwrap().can_access);
}

#[tokio::test]
async fn test_access_store_failure_is_a_failed_result() {
    let repo = MockRepo {
        progress_down: true,
        ..five_modules()
    };

    let result = compute_access(&repo, Phase3Policy::Relaxed, STUDENT_ID, COURSE_ID).await;

    assert!(!result.success);
    assert!(result.data.is_none());
    assert!(result.error.is_some());
}

#[tokio::test]
async fn test_phase3_endpoint() {
    let (status, body) = call(
        test_state(five_modules()),
        &format!("/api/courses/{COURSE_ID}/phase3-access"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["canAccess"], true);
    assert_eq!(body["data"]["learnedModules"], 5);
    assert_eq!(body["data"]["unlearnedModules"], Value::Array(vec![]));
}

#[tokio::test]
async fn test_phase3_endpoint_uses_configured_policy() {
    let config = AppConfig {
        phase3_policy: Phase3Policy::Strict,
        ..AppConfig::default()
    };

    let (status, body) = call(
        state_with(five_modules(), config),
        &format!("/api/courses/{COURSE_ID}/phase3-access"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["canAccess"], false);
    assert_eq!(body["data"]["unlearnedModules"].as_array().unwrap().len(), 5);
}

#[tokio::test]
async fn test_phase3_endpoint_failure_is_a_server_error() {
    let repo = MockRepo {
        progress_down: true,
        ..five_modules()
    };

    let (status, body) = call(test_state(repo), &format!("/api/courses/{COURSE_ID}/phase3-access")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["error"].is_string());
}

// --- Weekly plan ---

#[tokio::test]
async fn test_plan_without_exam_date_is_unavailable() {
    let repo = MockRepo {
        settings: Some(PlanSettings {
            week1_start_date: Some(day(2026, 10, 14)),
            exam_date: None,
        }),
        ..populated_repo()
    };

    let result = weekly_plan(&repo, STUDENT_ID, COURSE_ID).await;

    assert!(result.success);
    assert!(matches!(result.data, Some(WeeklyPlan::Unavailable { .. })));
}

#[tokio::test]
async fn test_plan_without_start_date_is_unavailable() {
    let repo = MockRepo {
        settings: Some(PlanSettings {
            week1_start_date: None,
            exam_date: Some(day(2026, 12, 18)),
        }),
        ..populated_repo()
    };

    let result = weekly_plan(&repo, STUDENT_ID, COURSE_ID).await;

    assert!(result.success);
    match result.data {
        Some(WeeklyPlan::Unavailable { reason }) => assert_eq!(reason, "Plan d'étude non généré"),
        other => panic!("expected an unavailable plan, got {other:?}"),
    }
}

#[tokio::test]
async fn test_plan_without_settings_row_is_unavailable() {
    let result = weekly_plan(&populated_repo(), STUDENT_ID, COURSE_ID).await;

    assert!(result.success);
    assert!(matches!(result.data, Some(WeeklyPlan::Unavailable { .. })));
}

#[tokio::test]
async fn test_plan_store_failure_is_a_failed_result() {
    let repo = MockRepo {
        progress_down: true,
        ..populated_repo()
    };

    let result = weekly_plan(&repo, STUDENT_ID, COURSE_ID).await;

    assert!(!result.success);
}

#[tokio::test]
async fn test_weekly_plan_endpoint() {
    // 2026-10-14 is a Wednesday; the exam on Friday 2026-10-30 closes week 3.
    let repo = MockRepo {
        settings: Some(PlanSettings {
            week1_start_date: Some(day(2026, 10, 14)),
            exam_date: Some(day(2026, 10, 30)),
        }),
        entries: vec![
            entry(10, day(2026, 10, 14), TaskStatus::Completed),
            entry(11, day(2026, 10, 15), TaskStatus::Pending),
            entry(12, day(2026, 10, 20), TaskStatus::Completed),
        ],
        ..populated_repo()
    };

    let (status, body) = call(test_state(repo), &format!("/api/courses/{COURSE_ID}/weekly-plan")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "available");

    let weeks = body["data"]["weeks"].as_array().unwrap();
    assert_eq!(weeks.len(), 3);
    assert_eq!(weeks[0]["weekStartDate"], "2026-10-14");
    assert_eq!(weeks[0]["weekEndDate"], "2026-10-18");
    assert_eq!(weeks[0]["estimatedBlocks"], 4);
    assert_eq!(weeks[0]["tasks"][0]["type"], "LEARN");
    assert_eq!(weeks[0]["tasks"][0]["itemCount"], 2);
    assert_eq!(weeks[0]["tasks"][0]["status"], "IN_PROGRESS");
    assert_eq!(weeks[1]["completedTasks"], 1);
    assert_eq!(weeks[2]["weekEndDate"], "2026-10-30");
    assert_eq!(weeks[2]["totalTasks"], 0);
}

#[tokio::test]
async fn test_weekly_plan_endpoint_unavailable_is_ok() {
    let (status, body) = call(
        test_state(populated_repo()),
        &format!("/api/courses/{COURSE_ID}/weekly-plan"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "unavailable");
    assert!(body["data"]["reason"].is_string());
}
