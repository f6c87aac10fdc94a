// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Tempo job scheduling server binary.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tempo_server::{create_router, AppState};
use tempo_server_jobs::{SqliteJobsRepository, StuckJobSweeper, SweeperConfig};
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Tempo server - HTTP server for job scheduling and stuck-job recovery.
#[derive(Parser, Debug)]
#[command(name = "tempo-server", about = "Tempo job scheduling server", version)]
struct Args {
	/// Path to a TOML config file (defaults to /etc/tempo/server.toml)
	#[arg(long, env = "TEMPO_SERVER_CONFIG")]
	config: Option<std::path::PathBuf>,

	/// Subcommands for tempo-server (e.g., `version`)
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	// Parse CLI arguments
	let args = Args::parse();

	// Handle subcommands that should not start the server
	if let Some(Command::Version) = args.command {
		println!("tempo-server {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	// Load configuration
	let config = match &args.config {
		Some(path) => tempo_server_config::load_config_with_file(path)?,
		None => tempo_server_config::load_config()?,
	};

	// Setup tracing
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level)),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		"starting tempo-server"
	);

	// Create database pool and run migrations
	let pool = tempo_server::db::create_pool(&config.database.url).await?;
	tempo_server::db::run_migrations(&pool).await?;

	let jobs_repo = Arc::new(SqliteJobsRepository::new(pool.clone()));

	// Construct the sweeper; the timer only starts when bootstrap says so.
	let sweeper = Arc::new(StuckJobSweeper::new(
		Arc::clone(&jobs_repo) as Arc<dyn tempo_server_jobs::JobsRepository>,
		SweeperConfig {
			stuck_threshold_minutes: config.sweeper.stuck_threshold_minutes,
			sweep_interval_secs: config.sweeper.sweep_interval_secs,
			min_sweep_interval_secs: config.sweeper.min_sweep_interval_secs,
			initial_delay_secs: config.sweeper.initial_delay_secs,
			max_retries: config.sweeper.max_retries,
		},
	));

	if config.sweeper.enabled {
		Arc::clone(&sweeper).start().await;
	} else {
		tracing::warn!("Stuck job sweeper disabled by configuration");
	}

	let state = AppState {
		jobs_repo,
		sweeper: Arc::clone(&sweeper),
	};

	let app = create_router(state)
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	// Start server
	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	// Run server with graceful shutdown
	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
			tracing::info!("Shutting down stuck job sweeper...");
			sweeper.stop().await;
		}
	}

	tracing::info!("Server shutdown complete");
	Ok(())
}
