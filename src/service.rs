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
//! The outer run-forever loop.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::engine::ReconciliationEngine;

/// Runs reconciliation passes until cancelled.
///
/// A pass that fails is logged and retried after the normal interval; the
/// loop never terminates on store errors. Cancellation lands between
/// passes, a pass that already started runs to completion.
pub async fn run_service(
    mut engine: ReconciliationEngine,
    interval: Duration,
    cancel: CancellationToken,
) {
    info!(
        interval_secs = interval.as_secs(),
        "starting prefix delegation service"
    );

    loop {
        match engine.run().await {
            Ok(summary) => info!(
                revoked = summary.revoked,
                assigned = summary.assigned,
                unfulfilled = summary.unfulfilled,
                "reconciliation pass complete"
            ),
            Err(e) => error!(error = %e, "reconciliation pass failed"),
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                info!("stop requested, exiting service loop");
                return;
            }
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
