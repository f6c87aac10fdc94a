// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Partially-resolved configuration, one layer per source.

use serde::{Deserialize, Serialize};

use crate::sections::{
	DatabaseConfigLayer, HttpConfigLayer, LoggingConfigLayer, SweeperConfigLayer,
};

/// One configuration layer, as loaded from a single source. Every field is
/// optional; merging later layers over earlier ones resolves precedence.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ServerConfigLayer {
	pub http: Option<HttpConfigLayer>,
	pub database: Option<DatabaseConfigLayer>,
	pub logging: Option<LoggingConfigLayer>,
	pub sweeper: Option<SweeperConfigLayer>,
}

impl ServerConfigLayer {
	/// Merge another layer over this one; the other layer's values win.
	pub fn merge(&mut self, other: Self) {
		merge_section(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_section(&mut self.sweeper, other.sweeper, SweeperConfigLayer::merge);
	}
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	match (base.as_mut(), other) {
		(Some(base), Some(other)) => merge(base, other),
		(None, Some(other)) => *base = Some(other),
		(_, None) => {}
	}
}
