// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Job management HTTP handlers.
//!
//! Schedule validation happens here, at the request boundary: a malformed
//! schedule never reaches the store and comes back as an immediate 400
//! with the specific problem.

use axum::{
	extract::{Path, Query, State},
	http::StatusCode,
	Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use tempo_jobs_core::{Job, JobId, JobStatus, Schedule};
use tempo_server_jobs::{compute_next_run_time, JobsRepository};

use crate::api::AppState;
use crate::routes::{error_response, map_jobs_error, ErrorResponse};

#[derive(Debug, Deserialize)]
pub struct CreateJobRequest {
	pub owner: String,
	pub name: String,
	#[serde(default)]
	pub description: Option<String>,
	pub schedule_type: String,
	pub schedule_time: DateTime<Utc>,
	#[serde(default)]
	pub interval_days: Option<i64>,
	/// Comma-separated weekday tokens, e.g. "monday,wednesday".
	#[serde(default)]
	pub weekly_days: Option<String>,
	#[serde(default)]
	pub timezone: Option<String>,
	#[serde(default)]
	pub max_runs: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateScheduleRequest {
	pub schedule_type: String,
	pub schedule_time: DateTime<Utc>,
	#[serde(default)]
	pub interval_days: Option<i64>,
	#[serde(default)]
	pub weekly_days: Option<String>,
	#[serde(default)]
	pub timezone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListJobsResponse {
	pub jobs: Vec<Job>,
}

#[derive(Debug, Serialize)]
pub struct JobSuccessResponse {
	pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
	pub owner: String,
}

fn parse_job_id(raw: &str) -> Result<JobId, (StatusCode, Json<ErrorResponse>)> {
	raw.parse().map_err(|_| {
		error_response(
			StatusCode::BAD_REQUEST,
			"invalid_id",
			format!("not a job id: {}", raw),
		)
	})
}

fn build_schedule(
	schedule_type: &str,
	schedule_time: DateTime<Utc>,
	interval_days: Option<i64>,
	weekly_days: Option<&str>,
	timezone: &str,
	now: DateTime<Utc>,
) -> Result<(Schedule, DateTime<Utc>), (StatusCode, Json<ErrorResponse>)> {
	let schedule = Schedule::from_parts(schedule_type, schedule_time, interval_days, weekly_days)
		.map_err(|e| error_response(StatusCode::BAD_REQUEST, "invalid_schedule", e.to_string()))?;
	let next_run_time = compute_next_run_time(&schedule, timezone, now)
		.map_err(|e| error_response(StatusCode::BAD_REQUEST, "invalid_schedule", e.to_string()))?;
	Ok((schedule, next_run_time))
}

#[instrument(skip(state, req), fields(owner = %req.owner, schedule_type = %req.schedule_type))]
pub async fn create_job(
	State(state): State<AppState>,
	Json(req): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<Job>), (StatusCode, Json<ErrorResponse>)> {
	let now = Utc::now();
	let timezone = req.timezone.unwrap_or_else(|| "UTC".to_string());

	let (schedule, next_run_time) = build_schedule(
		&req.schedule_type,
		req.schedule_time,
		req.interval_days,
		req.weekly_days.as_deref(),
		&timezone,
		now,
	)?;

	let job = Job {
		id: JobId::new(),
		owner: req.owner,
		name: req.name,
		description: req.description,
		status: JobStatus::Pending,
		schedule: Some(schedule),
		timezone,
		next_run_time: Some(next_run_time),
		max_runs: req.max_runs,
		run_count: 0,
		retry_count: 0,
		last_run_at: None,
		last_error: None,
		is_active: true,
		created_at: now,
		updated_at: now,
	};

	state
		.jobs_repo
		.create_job(&job)
		.await
		.map_err(map_jobs_error)?;

	info!(job_id = %job.id, next_run_time = %next_run_time, "Created scheduled job");
	Ok((StatusCode::CREATED, Json(job)))
}

#[instrument(skip(state))]
pub async fn get_job(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<Job>, (StatusCode, Json<ErrorResponse>)> {
	let id = parse_job_id(&id)?;
	let job = state
		.jobs_repo
		.get_job(id)
		.await
		.map_err(map_jobs_error)?
		.ok_or_else(|| error_response(StatusCode::NOT_FOUND, "not_found", "job not found"))?;
	Ok(Json(job))
}

#[instrument(skip(state), fields(owner = %query.owner))]
pub async fn list_jobs(
	State(state): State<AppState>,
	Query(query): Query<ListJobsQuery>,
) -> Result<Json<ListJobsResponse>, (StatusCode, Json<ErrorResponse>)> {
	let jobs = state
		.jobs_repo
		.list_jobs_for_owner(&query.owner)
		.await
		.map_err(map_jobs_error)?;
	Ok(Json(ListJobsResponse { jobs }))
}

#[instrument(skip(state, req))]
pub async fn update_schedule(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(req): Json<UpdateScheduleRequest>,
) -> Result<Json<Job>, (StatusCode, Json<ErrorResponse>)> {
	let id = parse_job_id(&id)?;
	let now = Utc::now();
	let timezone = req.timezone.unwrap_or_else(|| "UTC".to_string());

	let (schedule, next_run_time) = build_schedule(
		&req.schedule_type,
		req.schedule_time,
		req.interval_days,
		req.weekly_days.as_deref(),
		&timezone,
		now,
	)?;

	state
		.jobs_repo
		.update_schedule(id, &schedule, &timezone, next_run_time, now)
		.await
		.map_err(map_jobs_error)?;

	let job = state
		.jobs_repo
		.get_job(id)
		.await
		.map_err(map_jobs_error)?
		.ok_or_else(|| error_response(StatusCode::NOT_FOUND, "not_found", "job not found"))?;

	info!(job_id = %id, next_run_time = %next_run_time, "Updated job schedule");
	Ok(Json(job))
}

#[instrument(skip(state))]
pub async fn cancel_job(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<JobSuccessResponse>, (StatusCode, Json<ErrorResponse>)> {
	let id = parse_job_id(&id)?;
	state
		.jobs_repo
		.cancel_job(id, Utc::now())
		.await
		.map_err(map_jobs_error)?;

	info!(job_id = %id, "Cancelled job");
	Ok(Json(JobSuccessResponse {
		message: "job cancelled".to_string(),
	}))
}

#[instrument(skip(state))]
pub async fn delete_job(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<JobSuccessResponse>, (StatusCode, Json<ErrorResponse>)> {
	let id = parse_job_id(&id)?;
	let deleted = state
		.jobs_repo
		.delete_job(id)
		.await
		.map_err(map_jobs_error)?;

	if !deleted {
		return Err(error_response(
			StatusCode::NOT_FOUND,
			"not_found",
			"job not found",
		));
	}

	info!(job_id = %id, "Deleted job");
	Ok(Json(JobSuccessResponse {
		message: "job deleted".to_string(),
	}))
}
