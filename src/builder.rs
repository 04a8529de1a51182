//! Assembling an [`Atlas`] from raw allocation records
//!
//! The builder accumulates records per family (programmatically or from
//! source files), then normalizes each family independently and produces
//! the final query structure. A family with no records yields an empty
//! table, so v4-only and v6-only datasets are fine; a build with no
//! records at all is refused.

use crate::atlas::Atlas;
use crate::error::{AtlasError, Result};
use crate::normalize::{normalize, OverlapPolicy, RawRecord};
use crate::snapshot;
use crate::source::{self, SourceFormat};
use crate::table::LookupTable;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::Path;

/// Builder for an [`Atlas`]
#[derive(Debug, Clone, Default)]
pub struct DatasetBuilder {
    policy: OverlapPolicy,
    v4: Vec<RawRecord<Ipv4Addr>>,
    v6: Vec<RawRecord<Ipv6Addr>>,
}

impl DatasetBuilder {
    /// A builder with the default overlap policy (first-wins)
    pub fn new() -> Self {
        DatasetBuilder::default()
    }

    /// A builder with an explicit overlap policy
    pub fn with_policy(policy: OverlapPolicy) -> Self {
        DatasetBuilder {
            policy,
            ..DatasetBuilder::default()
        }
    }

    /// The overlap policy this builder will normalize with
    pub fn policy(&self) -> OverlapPolicy {
        self.policy
    }

    /// Add a single IPv4 record
    pub fn add_v4_record(&mut self, record: RawRecord<Ipv4Addr>) -> &mut Self {
        self.v4.push(record);
        self
    }

    /// Add a single IPv6 record
    pub fn add_v6_record(&mut self, record: RawRecord<Ipv6Addr>) -> &mut Self {
        self.v6.push(record);
        self
    }

    /// Read an IPv4 source file, returning how many records it contributed
    pub fn add_v4_source<P: AsRef<Path>>(&mut self, path: P, format: SourceFormat) -> Result<usize> {
        let records = source::read_v4_records(path, format)?;
        let count = records.len();
        self.v4.extend(records);
        Ok(count)
    }

    /// Read an IPv6 source file, returning how many records it contributed
    pub fn add_v6_source<P: AsRef<Path>>(&mut self, path: P, format: SourceFormat) -> Result<usize> {
        let records = source::read_v6_records(path, format)?;
        let count = records.len();
        self.v6.extend(records);
        Ok(count)
    }

    /// Number of raw IPv4 records accumulated so far
    pub fn v4_record_count(&self) -> usize {
        self.v4.len()
    }

    /// Number of raw IPv6 records accumulated so far
    pub fn v6_record_count(&self) -> usize {
        self.v6.len()
    }

    /// Normalize both families and produce the atlas
    ///
    /// # Errors
    ///
    /// `EmptyInput` if no records were added to either family;
    /// `OverlappingRecords` under the reject policy.
    pub fn build(self) -> Result<Atlas> {
        if self.v4.is_empty() && self.v6.is_empty() {
            return Err(AtlasError::EmptyInput);
        }

        let v4 = build_table(self.v4, self.policy)?;
        let v6 = build_table(self.v6, self.policy)?;
        Ok(Atlas::new(v4, v6))
    }

    /// Build the atlas and write it to a snapshot file in one step
    pub fn build_snapshot<P: AsRef<Path>>(self, path: P) -> Result<Atlas> {
        let atlas = self.build()?;
        snapshot::save(&atlas, path)?;
        Ok(atlas)
    }
}

fn build_table<A: crate::addr::Address>(
    records: Vec<RawRecord<A>>,
    policy: OverlapPolicy,
) -> Result<LookupTable<A>> {
    if records.is_empty() {
        return Ok(LookupTable::empty());
    }
    LookupTable::from_sorted_ranges(normalize(records, policy)?)
}
