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
//! Random-order prefix selection.

use chrono::NaiveDate;
use ipnet::Ipv6Net;
use rand::seq::SliceRandom as _;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::{
    config::ParentBlock,
    store::{AllocationStore, StoreError},
    subnet::{self, PrefixLengthError},
};

/// Prefix allocation errors. Block exhaustion is not one of them; it is
/// reported as `Ok(None)`.
#[derive(Debug, Error)]
pub enum AllocationError {
    /// The block's delegation length is invalid. Config validation catches
    /// this before any pass runs.
    #[error(transparent)]
    InvalidLength(#[from] PrefixLengthError),
    /// Availability lookup against the store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Picks unused sub-prefixes out of a parent block.
///
/// Candidates are probed in a uniformly random order rather than first-fit,
/// so free blocks are spread over the parent and the allocation order is
/// not observable from the outside. Worst case is a full scan of the block;
/// blocks are sized so a nearly-full scan stays rare.
#[derive(Debug, Clone)]
pub struct PrefixAllocator {
    /// RNG for the probe order. Seed it in tests for a deterministic scan.
    rng: ChaCha8Rng,
}

impl PrefixAllocator {
    /// Creates an allocator with the given RNG.
    pub fn new(rng: ChaCha8Rng) -> Self {
        Self { rng }
    }

    /// Selects one sub-prefix of `block` that is neither assigned nor
    /// inside its revocation grace period.
    ///
    /// Returns `Ok(None)` when the block is exhausted for this cycle.
    pub async fn allocate<S: AllocationStore>(
        &mut self,
        block: &ParentBlock,
        store: &mut S,
        today: NaiveDate,
        revocation_period_days: u32,
    ) -> Result<Option<Ipv6Net>, AllocationError> {
        let mut candidates = subnet::sub_prefixes(block.parent_prefix, block.delegation_length)?;
        candidates.shuffle(&mut self.rng);

        for candidate in candidates {
            let key = subnet::canonical(candidate);
            if store.is_prefix_assigned(&key).await? {
                continue;
            }
            if store
                .is_recently_revoked(&key, today, revocation_period_days)
                .await?
            {
                continue;
            }
            // Guards against address-parsing edge cases upstream.
            if !subnet::is_subnet_of(candidate, block.parent_prefix) {
                continue;
            }
            return Ok(Some(candidate));
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rand::SeedableRng;

    use super::*;
    use crate::store::testing::{DelegationRow, MemoryStore};

    fn block(parent: &str, delegation_length: u8) -> ParentBlock {
        ParentBlock {
            parent_prefix: Ipv6Net::from_str(parent).unwrap(),
            delegation_length,
        }
    }

    fn allocator() -> PrefixAllocator {
        PrefixAllocator::new(ChaCha8Rng::seed_from_u64(42))
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn should_allocate_sub_prefix_of_parent() {
        let block = block("fd00::/48", 56);
        let mut store = MemoryStore::default();

        let prefix = allocator()
            .allocate(&block, &mut store, today(), 30)
            .await
            .expect("Should succeed")
            .expect("Should find a prefix");

        assert_eq!(prefix.prefix_len(), 56);
        assert!(subnet::is_subnet_of(prefix, block.parent_prefix));
    }

    #[test_log::test(tokio::test)]
    async fn should_be_deterministic_for_a_fixed_seed() {
        let block = block("fd00::/48", 56);

        let mut first = Vec::new();
        let mut second = Vec::new();
        for out in [&mut first, &mut second] {
            let mut alloc = allocator();
            let mut store = MemoryStore::default();
            for i in 0..8 {
                let prefix = alloc
                    .allocate(&block, &mut store, today(), 30)
                    .await
                    .expect("Should succeed")
                    .expect("Should find a prefix");
                store
                    .insert_delegated_prefix(&format!("sub-{i}"), &subnet::canonical(prefix), today())
                    .await
                    .expect("Should succeed");
                out.push(prefix);
            }
        }

        assert_eq!(first, second, "Expected identical scan order per seed");
    }

    #[test_log::test(tokio::test)]
    async fn should_skip_assigned_prefixes() {
        // Two /64 halves; one is taken via a reply attribute only, which
        // still counts as assigned.
        let block = block("fd00::/63", 64);
        let mut store = MemoryStore::default();
        store
            .reply_values
            .push(("alice".to_string(), "fd00::/64".to_string()));

        for _ in 0..10 {
            let prefix = allocator()
                .allocate(&block, &mut store, today(), 30)
                .await
                .expect("Should succeed")
                .expect("Should find a prefix");
            assert_eq!(subnet::canonical(prefix), "fd00:0:0:1::/64");
        }
    }

    #[test_log::test(tokio::test)]
    async fn should_not_reuse_prefix_within_revocation_period() {
        let block = block("fd00::/63", 64);
        let mut store = MemoryStore::default();
        // Revoked yesterday; 30 day grace period.
        store.delegations.push(DelegationRow {
            subscriber: "bob".to_string(),
            prefix: "fd00::/64".to_string(),
            assigned: today() - chrono::Days::new(100),
            revoked: Some(today() - chrono::Days::new(1)),
        });

        let prefix = allocator()
            .allocate(&block, &mut store, today(), 30)
            .await
            .expect("Should succeed")
            .expect("Should find a prefix");
        assert_eq!(subnet::canonical(prefix), "fd00:0:0:1::/64");
    }

    #[test_log::test(tokio::test)]
    async fn should_expire_cooldown_after_revocation_period() {
        let mut store = MemoryStore::default();
        // Exactly the period old, so the strict less-than no longer holds.
        store.delegations.push(DelegationRow {
            subscriber: "bob".to_string(),
            prefix: "fd00::/64".to_string(),
            assigned: today() - chrono::Days::new(100),
            revoked: Some(today() - chrono::Days::new(30)),
        });

        let result = store
            .is_recently_revoked("fd00::/64", today(), 30)
            .await
            .expect("Should succeed");
        assert!(!result, "Expected cooldown to have lapsed after 30 days");
    }

    #[test_log::test(tokio::test)]
    async fn should_return_none_when_block_is_exhausted() {
        let block = block("fd00::/63", 64);
        let mut store = MemoryStore::default();
        for (i, prefix) in ["fd00::/64", "fd00:0:0:1::/64"].iter().enumerate() {
            store
                .insert_delegated_prefix(&format!("sub-{i}"), prefix, today())
                .await
                .expect("Should succeed");
        }

        let result = allocator()
            .allocate(&block, &mut store, today(), 30)
            .await
            .expect("Exhaustion is not an error");
        assert_eq!(result, None);
    }

    #[test_log::test(tokio::test)]
    async fn should_treat_cooldown_only_block_as_exhausted() {
        // A prefix that is out of the assignment tables but cooling down
        // must not be handed out, even if it is the only one left.
        let block = block("fd00::/63", 64);
        let mut store = MemoryStore::default();
        store
            .insert_delegated_prefix("carol", "fd00::/64", today())
            .await
            .expect("Should succeed");
        store.delegations.push(DelegationRow {
            subscriber: "bob".to_string(),
            prefix: "fd00:0:0:1::/64".to_string(),
            assigned: today() - chrono::Days::new(10),
            revoked: Some(today() - chrono::Days::new(1)),
        });

        let result = allocator()
            .allocate(&block, &mut store, today(), 30)
            .await
            .expect("Exhaustion is not an error");
        assert_eq!(result, None);
    }
}
