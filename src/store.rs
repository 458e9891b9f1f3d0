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
//! Query surface over the shared delegation state.
//!
//! The schema is shared with the RADIUS plane and is preserved
//! field-for-field: `radcheck` (credentials, read-only), `radreply`
//! (reply attributes) and `delegated_prefixes` (delegation records with
//! `assigned_date` and nullable `revoked_date`).

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::MySqlConnection;
use thiserror::Error;

/// Persistence errors. Any failure aborts the surrounding pass.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Query execution or connectivity failure.
    #[error("store query failed: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// Read/write contract over persisted delegation state.
///
/// Every call is one logical unit of work inside the pass transaction; no
/// allocation logic lives here.
#[async_trait]
pub trait AllocationStore: Send {
    /// True if `prefix` is a configured reply attribute value OR appears in
    /// any delegation record, active or historical. The union guards
    /// against drift between the two tables.
    async fn is_prefix_assigned(&mut self, prefix: &str) -> Result<bool, StoreError>;

    /// True iff the most recent revocation of `prefix` is younger than
    /// `revocation_period_days`.
    async fn is_recently_revoked(
        &mut self,
        prefix: &str,
        today: NaiveDate,
        revocation_period_days: u32,
    ) -> Result<bool, StoreError>;

    /// Creates an active delegation record and the matching
    /// `Delegated-IPv6-Prefix` reply attribute. Both writes share the pass
    /// transaction; neither is observable without the other.
    async fn insert_delegated_prefix(
        &mut self,
        subscriber: &str,
        prefix: &str,
        assigned: NaiveDate,
    ) -> Result<(), StoreError>;

    /// Sets `revoked_date` on the subscriber's active delegation record.
    /// A subscriber without an active record is a logged no-op.
    ///
    /// The reply attribute is deliberately left in place; revocation is
    /// tracked only through `revoked_date`.
    async fn mark_revoked(&mut self, subscriber: &str, revoked: NaiveDate)
    -> Result<(), StoreError>;

    /// Subscribers present in the credential table with no delegation
    /// record of any status. A subscriber whose only record is revoked is
    /// NOT returned; this mirrors the query the RADIUS plane has always
    /// run and changing it is a product decision.
    async fn subscribers_without_prefix(&mut self) -> Result<Vec<String>, StoreError>;

    /// Subscribers holding an active delegation record but absent from the
    /// credential table.
    async fn subscribers_removed(&mut self) -> Result<Vec<String>, StoreError>;
}

/// MySQL-backed [AllocationStore] over a single connection.
///
/// Borrow the connection out of an open transaction to scope all writes to
/// one pass.
pub struct SqlAllocationStore<'c> {
    conn: &'c mut MySqlConnection,
}

impl<'c> SqlAllocationStore<'c> {
    /// Creates a store over the given connection.
    pub fn new(conn: &'c mut MySqlConnection) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl AllocationStore for SqlAllocationStore<'_> {
    async fn is_prefix_assigned(&mut self, prefix: &str) -> Result<bool, StoreError> {
        let in_reply = sqlx::query("SELECT 1 FROM radreply WHERE value = ? LIMIT 1")
            .bind(prefix)
            .fetch_optional(&mut *self.conn)
            .await?;
        if in_reply.is_some() {
            return Ok(true);
        }

        let in_delegations =
            sqlx::query("SELECT 1 FROM delegated_prefixes WHERE delegated_prefix = ? LIMIT 1")
                .bind(prefix)
                .fetch_optional(&mut *self.conn)
                .await?;
        Ok(in_delegations.is_some())
    }

    async fn is_recently_revoked(
        &mut self,
        prefix: &str,
        today: NaiveDate,
        revocation_period_days: u32,
    ) -> Result<bool, StoreError> {
        let revoked: Option<NaiveDate> = sqlx::query_scalar(
            "SELECT revoked_date FROM delegated_prefixes \
             WHERE delegated_prefix = ? AND revoked_date IS NOT NULL \
             ORDER BY revoked_date DESC LIMIT 1",
        )
        .bind(prefix)
        .fetch_optional(&mut *self.conn)
        .await?;

        Ok(match revoked {
            Some(date) => (today - date).num_days() < i64::from(revocation_period_days),
            None => false,
        })
    }

    async fn insert_delegated_prefix(
        &mut self,
        subscriber: &str,
        prefix: &str,
        assigned: NaiveDate,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO delegated_prefixes (username, delegated_prefix, assigned_date) \
             VALUES (?, ?, ?)",
        )
        .bind(subscriber)
        .bind(prefix)
        .bind(assigned)
        .execute(&mut *self.conn)
        .await?;

        sqlx::query(
            "INSERT INTO radreply (username, attribute, op, value) \
             VALUES (?, 'Delegated-IPv6-Prefix', '=', ?)",
        )
        .bind(subscriber)
        .bind(prefix)
        .execute(&mut *self.conn)
        .await?;

        Ok(())
    }

    async fn mark_revoked(
        &mut self,
        subscriber: &str,
        revoked: NaiveDate,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE delegated_prefixes SET revoked_date = ? \
             WHERE username = ? AND revoked_date IS NULL",
        )
        .bind(revoked)
        .bind(subscriber)
        .execute(&mut *self.conn)
        .await?;

        if result.rows_affected() == 0 {
            tracing::warn!(subscriber = %subscriber, "no active delegation record to revoke");
        }
        Ok(())
    }

    async fn subscribers_without_prefix(&mut self) -> Result<Vec<String>, StoreError> {
        let subscribers = sqlx::query_scalar(
            "SELECT DISTINCT username FROM radcheck \
             WHERE attribute = 'Cleartext-Password' \
             AND username NOT IN (SELECT username FROM delegated_prefixes)",
        )
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(subscribers)
    }

    async fn subscribers_removed(&mut self) -> Result<Vec<String>, StoreError> {
        let subscribers = sqlx::query_scalar(
            "SELECT username FROM delegated_prefixes \
             WHERE username NOT IN (SELECT username FROM radcheck) \
             AND revoked_date IS NULL",
        )
        .fetch_all(&mut *self.conn)
        .await?;
        Ok(subscribers)
    }
}
