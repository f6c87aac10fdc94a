// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Stuck-job sweeper configuration section.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SweeperConfigLayer {
	pub enabled: Option<bool>,
	pub stuck_threshold_minutes: Option<u32>,
	pub sweep_interval_secs: Option<u64>,
	pub min_sweep_interval_secs: Option<u64>,
	pub initial_delay_secs: Option<u64>,
	pub max_retries: Option<u32>,
}

impl SweeperConfigLayer {
	pub fn merge(&mut self, other: Self) {
		if other.enabled.is_some() {
			self.enabled = other.enabled;
		}
		if other.stuck_threshold_minutes.is_some() {
			self.stuck_threshold_minutes = other.stuck_threshold_minutes;
		}
		if other.sweep_interval_secs.is_some() {
			self.sweep_interval_secs = other.sweep_interval_secs;
		}
		if other.min_sweep_interval_secs.is_some() {
			self.min_sweep_interval_secs = other.min_sweep_interval_secs;
		}
		if other.initial_delay_secs.is_some() {
			self.initial_delay_secs = other.initial_delay_secs;
		}
		if other.max_retries.is_some() {
			self.max_retries = other.max_retries;
		}
	}

	pub fn finalize(self) -> SweeperConfig {
		SweeperConfig {
			enabled: self.enabled.unwrap_or(true),
			stuck_threshold_minutes: self.stuck_threshold_minutes.unwrap_or(10),
			sweep_interval_secs: self.sweep_interval_secs.unwrap_or(300), // 5 minutes
			min_sweep_interval_secs: self.min_sweep_interval_secs.unwrap_or(120), // 2 minutes
			initial_delay_secs: self.initial_delay_secs.unwrap_or(30),
			max_retries: self.max_retries.unwrap_or(3),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SweeperConfig {
	pub enabled: bool,
	pub stuck_threshold_minutes: u32,
	pub sweep_interval_secs: u64,
	pub min_sweep_interval_secs: u64,
	pub initial_delay_secs: u64,
	pub max_retries: u32,
}

impl Default for SweeperConfig {
	fn default() -> Self {
		Self {
			enabled: true,
			stuck_threshold_minutes: 10,
			sweep_interval_secs: 300, // 5 minutes
			min_sweep_interval_secs: 120, // 2 minutes
			initial_delay_secs: 30,
			max_retries: 3,
		}
	}
}
