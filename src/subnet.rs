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
//! IPv6 prefix arithmetic for delegation blocks.

use ipnet::Ipv6Net;
use thiserror::Error;

/// Delegation length validation errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrefixLengthError {
    /// Delegation length does not subdivide the parent.
    #[error("delegation length /{delegation} is not longer than parent {parent}")]
    NotLonger {
        /// The parent block.
        parent: Ipv6Net,
        /// The configured delegation length.
        delegation: u8,
    },
    /// Delegation length out of range for IPv6.
    #[error("delegation length /{0} exceeds the IPv6 maximum of /128")]
    TooLong(u8),
}

/// Checks that `delegation_length` carves at least one sub-prefix out of
/// `parent`.
pub fn check_delegation_length(
    parent: Ipv6Net,
    delegation_length: u8,
) -> Result<(), PrefixLengthError> {
    if delegation_length > 128 {
        return Err(PrefixLengthError::TooLong(delegation_length));
    }
    if delegation_length <= parent.prefix_len() {
        return Err(PrefixLengthError::NotLonger {
            parent,
            delegation: delegation_length,
        });
    }
    Ok(())
}

/// Enumerates every sub-prefix of `parent` with length `delegation_length`.
///
/// Pure function of its inputs; the returned set is finite, duplicate-free
/// and covers the parent exactly.
pub fn sub_prefixes(
    parent: Ipv6Net,
    delegation_length: u8,
) -> Result<Vec<Ipv6Net>, PrefixLengthError> {
    check_delegation_length(parent, delegation_length)?;
    let subnets = parent
        .trunc()
        .subnets(delegation_length)
        .expect("length checked above");
    Ok(subnets.collect())
}

/// Returns true iff `candidate`'s address range is fully contained in
/// `parent`'s range.
pub fn is_subnet_of(candidate: Ipv6Net, parent: Ipv6Net) -> bool {
    parent.trunc().contains(&candidate.trunc())
}

/// Canonical textual CIDR form of a prefix.
///
/// Host bits are truncated and the address is compressed per RFC 5952. This
/// is the storage and comparison key; prefixes must never be compared or
/// persisted in any other form.
pub fn canonical(prefix: Ipv6Net) -> String {
    prefix.trunc().to_string()
}
