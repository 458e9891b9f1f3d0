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
//! # Prefix Delegator
//!
//! Reconcile IPv6 prefix delegations for RADIUS subscribers.
//!
//! The [engine::ReconciliationEngine] periodically revokes the delegations
//! of subscribers that disappeared from the credential table and assigns a
//! fresh, non-recently-revoked sub-prefix to every subscriber lacking one.
//!
//! Which sub-prefix to hand out next is decided by
//! [allocator::PrefixAllocator] over the availability recorded in an
//! [store::AllocationStore].

pub mod allocator;
pub mod cli;
pub mod config;
pub mod engine;
pub mod observability;
pub mod service;
pub mod shutdown;
pub mod store;
pub mod subnet;
