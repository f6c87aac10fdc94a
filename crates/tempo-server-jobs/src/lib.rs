// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Scheduling engine for the Tempo server.
//!
//! This crate provides next-run-time calculation for recurring job
//! schedules, the SQLite-backed job store, run lifecycle transitions, and
//! the stuck-job sweeper that rescues or fails jobs abandoned in the
//! `running` state.

pub mod error;
pub mod lifecycle;
pub mod repository;
pub mod schedule;
pub mod schema;
pub mod sweeper;

pub use error::{JobsServerError, Result};
pub use lifecycle::{finish_run, RunOutcome};
pub use repository::{JobsRepository, SqliteJobsRepository};
pub use schedule::compute_next_run_time;
pub use sweeper::{StuckJobSweeper, SweeperConfig};
