// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for the Tempo job scheduling system.
//!
//! This crate holds the pure domain model shared by the scheduling engine
//! and the HTTP server: the job record and its identifiers, the schedule
//! and status enums, sweep report types, and the validation error taxonomy.
//! No I/O lives here.

pub mod error;
pub mod job;
pub mod sweep;

pub use error::{JobsError, Result};
pub use job::{join_weekly_days, parse_weekly_days, Job, JobId, JobStatus, Schedule, WeekDay};
pub use sweep::{StuckJobInfo, SweepError, SweepOutcome, SweepReport, SweepRun, SweepRunId};
