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
//! Prefix delegator CLI options.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// IPv6 prefix delegation reconciler
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Opts {
    /// Top-level subcommand
    #[command(subcommand)]
    pub command: Commands,

    /// Logging options
    #[command(flatten)]
    pub logging: LoggingOptions,
}

/// Logging options.
#[derive(Debug, Args)]
pub struct LoggingOptions {
    /// Log service output to stderr.
    #[arg(long, global = true, default_value = "true")]
    pub stderr: bool,

    /// Directory for the service log.
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the reconciliation service.
    Run {
        /// Path to the TOML configuration file.
        #[arg(long, short)]
        config: PathBuf,
    },
    /// Validate the configuration file and exit.
    CheckConfig {
        /// Path to the TOML configuration file.
        #[arg(long, short)]
        config: PathBuf,
    },
}
