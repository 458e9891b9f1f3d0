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
//! Graceful shutdown signaling.

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Returns a token that is cancelled when the process receives `SIGINT` or
/// `SIGTERM`.
pub fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let handler_token = token.clone();
    tokio::spawn(async move {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigint = signal(SignalKind::interrupt()).expect("failed to register SIGINT handler");
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to register SIGTERM handler");
        tokio::select! {
            _ = sigint.recv() => {
                debug!("Received SIGINT, cancelling token");
                handler_token.cancel();
            },
            _ = sigterm.recv() => {
                debug!("Received SIGTERM, cancelling token");
                handler_token.cancel();
            },
            _ = handler_token.cancelled() => {
                debug!("Cancellation token cancelled, exiting shutdown handler");
            },
        }
    });
    token
}
