// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Table definitions for the job store.
//!
//! Shared by server startup migrations and test setup so the DDL has a
//! single source of truth.

use sqlx::SqlitePool;

use crate::error::Result;

pub async fn create_jobs_table(pool: &SqlitePool) -> Result<()> {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS jobs (
			id TEXT PRIMARY KEY,
			owner TEXT NOT NULL,
			name TEXT NOT NULL,
			description TEXT,
			status TEXT NOT NULL,
			schedule_type TEXT,
			schedule_time TEXT,
			interval_days INTEGER,
			weekly_days TEXT,
			timezone TEXT NOT NULL DEFAULT 'UTC',
			next_run_time TEXT,
			max_runs INTEGER,
			run_count INTEGER NOT NULL DEFAULT 0,
			retry_count INTEGER NOT NULL DEFAULT 0,
			last_run_at TEXT,
			last_error TEXT,
			is_active INTEGER NOT NULL DEFAULT 1,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await?;

	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_jobs_owner ON jobs(owner)",
	)
	.execute(pool)
	.await?;

	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_jobs_status_updated_at ON jobs(status, updated_at)",
	)
	.execute(pool)
	.await?;

	sqlx::query(
		"CREATE INDEX IF NOT EXISTS idx_jobs_next_run_time ON jobs(next_run_time) WHERE next_run_time IS NOT NULL",
	)
	.execute(pool)
	.await?;

	Ok(())
}

pub async fn create_sweep_runs_table(pool: &SqlitePool) -> Result<()> {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS sweep_runs (
			id TEXT PRIMARY KEY,
			started_at TEXT NOT NULL,
			finished_at TEXT NOT NULL,
			processed INTEGER NOT NULL DEFAULT 0,
			rescued INTEGER NOT NULL DEFAULT 0,
			failed INTEGER NOT NULL DEFAULT 0,
			error_count INTEGER NOT NULL DEFAULT 0,
			outcome TEXT NOT NULL,
			error_message TEXT
		)
		"#,
	)
	.execute(pool)
	.await?;

	Ok(())
}

/// Create every table the job store needs. Idempotent.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
	create_jobs_table(pool).await?;
	create_sweep_runs_table(pool).await?;
	Ok(())
}
