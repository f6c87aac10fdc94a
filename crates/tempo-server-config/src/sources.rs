// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: defaults, TOML files, and environment variables.

use std::path::PathBuf;

use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	DatabaseConfigLayer, HttpConfigLayer, LoggingConfigLayer, SweeperConfigLayer,
};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/tempo/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source (`TEMPO_SERVER_*`).
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");

		let http = HttpConfigLayer {
			host: env_string("TEMPO_SERVER_HOST"),
			port: env_parsed("TEMPO_SERVER_PORT")?,
		};

		let database = DatabaseConfigLayer {
			url: env_string("TEMPO_SERVER_DATABASE_URL"),
		};

		let logging = LoggingConfigLayer {
			level: env_string("TEMPO_SERVER_LOG_LEVEL"),
		};

		let sweeper = SweeperConfigLayer {
			enabled: env_parsed("TEMPO_SERVER_SWEEPER_ENABLED")?,
			stuck_threshold_minutes: env_parsed("TEMPO_SERVER_STUCK_THRESHOLD_MINUTES")?,
			sweep_interval_secs: env_parsed("TEMPO_SERVER_SWEEP_INTERVAL_SECS")?,
			min_sweep_interval_secs: env_parsed("TEMPO_SERVER_MIN_SWEEP_INTERVAL_SECS")?,
			initial_delay_secs: env_parsed("TEMPO_SERVER_SWEEPER_INITIAL_DELAY_SECS")?,
			max_retries: env_parsed("TEMPO_SERVER_SWEEPER_MAX_RETRIES")?,
		};

		Ok(ServerConfigLayer {
			http: Some(http),
			database: Some(database),
			logging: Some(logging),
			sweeper: Some(sweeper),
		})
	}
}

fn env_string(key: &str) -> Option<String> {
	std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError>
where
	T::Err: std::fmt::Display,
{
	match env_string(key) {
		None => Ok(None),
		Some(raw) => raw
			.parse()
			.map(Some)
			.map_err(|e: T::Err| ConfigError::InvalidValue {
				key: key.to_string(),
				message: e.to_string(),
			}),
	}
}
