// Copyright 2025 Anapaya Systems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Prefix delegator entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use prefix_delegator::{
    cli::{Commands, Opts},
    config::Config,
    engine::ReconciliationEngine,
    observability, service, shutdown,
};
use rand::{RngCore, SeedableRng, rng};
use rand_chacha::ChaCha8Rng;
use sqlx::mysql::MySqlPoolOptions;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let opts = Opts::parse();
    let _guards = observability::setup_tracing(opts.logging.log_dir.as_ref(), opts.logging.stderr);

    match opts.command {
        Commands::Run { config } => run(config).await,
        Commands::CheckConfig { config } => check_config(config),
    }
}

async fn run(path: PathBuf) -> anyhow::Result<()> {
    let config = load_config(&path)?;

    let pool = MySqlPoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect(&config.database.url)
        .await
        .context("failed to connect to the delegation store")?;

    let rng = ChaCha8Rng::seed_from_u64(rng().next_u64());
    let engine = ReconciliationEngine::new(
        pool,
        config.blocks.clone(),
        config.revocation_period_days,
        rng,
    );

    let cancel = shutdown::shutdown_token();
    service::run_service(engine, config.interval(), cancel).await;
    Ok(())
}

fn check_config(path: PathBuf) -> anyhow::Result<()> {
    let config = load_config(&path)?;
    println!(
        "configuration ok: {} block(s), revocation period {} days, interval {}s",
        config.blocks.len(),
        config.revocation_period_days,
        config.interval_secs,
    );
    Ok(())
}

fn load_config(path: &PathBuf) -> anyhow::Result<Config> {
    Config::from_file(path).with_context(|| format!("loading config from {}", path.display()))
}
