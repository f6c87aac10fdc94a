// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Integration tests for the jobs and maintenance routes.
//!
//! Tests cover:
//! - Job creation with schedule validation
//! - Schedule edit and cancellation flows
//! - Manual sweep triggering, including the rate-guarded no-op path

use axum::{
	body::Body,
	http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tempfile::tempdir;
use tower::ServiceExt;

use tempo_jobs_core::{JobStatus, SweepOutcome};
use tempo_server::{create_router, AppState};
use tempo_server_jobs::{
	JobsRepository, SqliteJobsRepository, StuckJobSweeper, SweeperConfig,
};

/// Creates a test app with an isolated database. The sweeper is constructed
/// but its timer is never started; sweeps only run through the route.
async fn setup_test_app() -> (axum::Router, AppState, tempfile::TempDir) {
	let dir = tempdir().unwrap();
	let db_path = dir.path().join("test_api.db");
	let db_url = format!("sqlite:{}?mode=rwc", db_path.display());
	let pool = tempo_server::db::create_pool(&db_url).await.unwrap();
	tempo_server::db::run_migrations(&pool).await.unwrap();

	let jobs_repo = Arc::new(SqliteJobsRepository::new(pool));
	let sweeper = Arc::new(StuckJobSweeper::new(
		Arc::clone(&jobs_repo) as Arc<dyn JobsRepository>,
		SweeperConfig {
			stuck_threshold_minutes: 10,
			sweep_interval_secs: 300,
			min_sweep_interval_secs: 120,
			initial_delay_secs: 3600,
			max_retries: 3,
		},
	));
	let state = AppState {
		jobs_repo,
		sweeper,
	};
	(create_router(state.clone()), state, dir)
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header("content-type", "application/json")
		.body(Body::from(body.to_string()))
		.unwrap()
}

async fn response_json(response: axum::response::Response) -> serde_json::Value {
	let body = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.unwrap();
	serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn create_daily_job_computes_next_run() {
	let (app, _state, _dir) = setup_test_app().await;

	let response = app
		.oneshot(post_json(
			"/api/jobs",
			serde_json::json!({
				"owner": "0xabc",
				"name": "daily digest",
				"schedule_type": "daily",
				"schedule_time": "2024-01-01T09:00:00Z",
				"timezone": "UTC"
			}),
		))
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::CREATED);
	let job = response_json(response).await;
	assert_eq!(job["status"], "pending");
	assert_eq!(job["is_active"], true);
	assert!(job["next_run_time"].is_string());
	assert_eq!(job["schedule"]["type"], "daily");
}

#[tokio::test]
async fn created_job_is_fetchable_by_id() {
	let (app, _state, _dir) = setup_test_app().await;

	let response = app
		.clone()
		.oneshot(post_json(
			"/api/jobs",
			serde_json::json!({
				"owner": "0xabc",
				"name": "weekly digest",
				"schedule_type": "weekly",
				"schedule_time": "2024-01-01T09:00:00Z",
				"weekly_days": "monday,wednesday"
			}),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::CREATED);
	let created = response_json(response).await;
	let id = created["id"].as_str().unwrap().to_string();

	let response = app
		.oneshot(
			Request::builder()
				.uri(format!("/api/jobs/{}", id))
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let job = response_json(response).await;
	assert_eq!(job["name"], "weekly digest");
}

#[tokio::test]
async fn weekly_without_days_is_rejected_with_specific_message() {
	let (app, _state, _dir) = setup_test_app().await;

	let response = app
		.oneshot(post_json(
			"/api/jobs",
			serde_json::json!({
				"owner": "0xabc",
				"name": "broken",
				"schedule_type": "weekly",
				"schedule_time": "2024-01-01T09:00:00Z",
				"weekly_days": ""
			}),
		))
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	let body = response_json(response).await;
	assert_eq!(body["error"], "invalid_schedule");
	assert!(body["message"].as_str().unwrap().contains("weekday"));
}

#[tokio::test]
async fn custom_with_zero_interval_is_rejected() {
	let (app, _state, _dir) = setup_test_app().await;

	let response = app
		.oneshot(post_json(
			"/api/jobs",
			serde_json::json!({
				"owner": "0xabc",
				"name": "broken",
				"schedule_type": "custom",
				"schedule_time": "2024-01-01T09:00:00Z",
				"interval_days": 0
			}),
		))
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	let body = response_json(response).await;
	assert_eq!(body["error"], "invalid_schedule");
}

#[tokio::test]
async fn unknown_schedule_type_is_rejected() {
	let (app, _state, _dir) = setup_test_app().await;

	let response = app
		.oneshot(post_json(
			"/api/jobs",
			serde_json::json!({
				"owner": "0xabc",
				"name": "broken",
				"schedule_type": "hourly",
				"schedule_time": "2024-01-01T09:00:00Z"
			}),
		))
		.await
		.unwrap();

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
	let body = response_json(response).await;
	assert!(body["message"].as_str().unwrap().contains("hourly"));
}

#[tokio::test]
async fn get_unknown_job_is_404() {
	let (app, _state, _dir) = setup_test_app().await;

	let response = app
		.oneshot(
			Request::builder()
				.uri("/api/jobs/00000000-0000-4000-8000-000000000000")
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cancel_twice_is_a_conflict() {
	let (app, _state, _dir) = setup_test_app().await;

	let response = app
		.clone()
		.oneshot(post_json(
			"/api/jobs",
			serde_json::json!({
				"owner": "0xabc",
				"name": "cancellable",
				"schedule_type": "daily",
				"schedule_time": "2024-01-01T09:00:00Z"
			}),
		))
		.await
		.unwrap();
	let created = response_json(response).await;
	let id = created["id"].as_str().unwrap().to_string();

	let response = app
		.clone()
		.oneshot(post_json(
			&format!("/api/jobs/{}/cancel", id),
			serde_json::json!({}),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);

	let response = app
		.oneshot(post_json(
			&format!("/api/jobs/{}/cancel", id),
			serde_json::json!({}),
		))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn schedule_edit_revalidates_and_reschedules() {
	let (app, state, _dir) = setup_test_app().await;

	let response = app
		.clone()
		.oneshot(post_json(
			"/api/jobs",
			serde_json::json!({
				"owner": "0xabc",
				"name": "editable",
				"schedule_type": "daily",
				"schedule_time": "2024-01-01T09:00:00Z"
			}),
		))
		.await
		.unwrap();
	let created = response_json(response).await;
	let id = created["id"].as_str().unwrap().to_string();

	// Invalid edit: rejected before it reaches the store.
	let response = app
		.clone()
		.oneshot(
			Request::builder()
				.method("PUT")
				.uri(format!("/api/jobs/{}/schedule", id))
				.header("content-type", "application/json")
				.body(Body::from(
					serde_json::json!({
						"schedule_type": "custom",
						"schedule_time": "2024-01-01T09:00:00Z",
						"interval_days": 0
					})
					.to_string(),
				))
				.unwrap(),
		)
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	// Valid edit: schedule replaced, next run recomputed.
	let response = app
		.oneshot(
			Request::builder()
				.method("PUT")
				.uri(format!("/api/jobs/{}/schedule", id))
				.header("content-type", "application/json")
				.body(Body::from(
					serde_json::json!({
						"schedule_type": "custom",
						"schedule_time": "2024-01-01T09:00:00Z",
						"interval_days": 3
					})
					.to_string(),
				))
				.unwrap(),
		)
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let job = response_json(response).await;
	assert_eq!(job["schedule"]["type"], "custom");
	assert_eq!(job["schedule"]["interval_days"], 3);

	let stored = state
		.jobs_repo
		.get_job(job["id"].as_str().unwrap().parse().unwrap())
		.await
		.unwrap()
		.unwrap();
	assert_eq!(stored.run_count, 0);
	assert!(stored.next_run_time.is_some());
}

#[tokio::test]
async fn sweep_route_rescues_and_then_rate_guards() {
	let (app, state, _dir) = setup_test_app().await;
	let now = Utc::now();

	// A job abandoned in `running` for half an hour.
	let mut job = {
		use tempo_jobs_core::{Job, JobId, Schedule};
		let anchor = now - Duration::hours(1);
		Job {
			id: JobId::new(),
			owner: "0xabc".to_string(),
			name: "stuck".to_string(),
			description: None,
			status: JobStatus::Running,
			schedule: Some(Schedule::Daily { anchor }),
			timezone: "UTC".to_string(),
			next_run_time: Some(anchor),
			max_runs: None,
			run_count: 1,
			retry_count: 0,
			last_run_at: None,
			last_error: None,
			is_active: true,
			created_at: now - Duration::hours(2),
			updated_at: now - Duration::minutes(30),
		}
	};
	state.jobs_repo.create_job(&job).await.unwrap();

	let response = app
		.clone()
		.oneshot(post_json("/api/maintenance/sweep", serde_json::json!({})))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let body = response_json(response).await;
	assert_eq!(body["skipped"], false);
	assert_eq!(body["report"]["processed"], 1);
	assert_eq!(body["report"]["rescued"], 1);
	assert_eq!(body["report"]["failed"], 0);
	assert_eq!(body["report"]["stuck_jobs"][0]["owner"], "0xabc");

	job = state.jobs_repo.get_job(job.id).await.unwrap().unwrap();
	assert_eq!(job.status, JobStatus::Pending);
	assert_eq!(job.retry_count, 1);

	// Triggering again inside the minimum interval is a no-op.
	let response = app
		.clone()
		.oneshot(post_json("/api/maintenance/sweep", serde_json::json!({})))
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let body = response_json(response).await;
	assert_eq!(body["skipped"], true);
	assert!(body.get("report").is_none());

	// The completed sweep shows up in the audit listing.
	let response = app
		.oneshot(
			Request::builder()
				.uri("/api/maintenance/sweeps")
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let body = response_json(response).await;
	let sweeps = body["sweeps"].as_array().unwrap();
	assert_eq!(sweeps.len(), 1);
	assert_eq!(sweeps[0]["outcome"], SweepOutcome::Completed.to_string());
}

#[tokio::test]
async fn health_reports_sweeper_state() {
	let (app, _state, _dir) = setup_test_app().await;

	let response = app
		.oneshot(
			Request::builder()
				.uri("/api/health")
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap();
	assert_eq!(response.status(), StatusCode::OK);
	let body = response_json(response).await;
	assert_eq!(body["status"], "ok");
	assert!(body["last_sweep_attempt_at"].is_null());
}
