//! ipatlas - IP-to-Country Resolution
//!
//! ipatlas maps IP addresses to the countries that own them. It has two
//! halves: a query engine that resolves addresses against an immutable
//! dataset of sorted country ranges, and a generator that builds that
//! dataset from raw allocation records (CSV or JSON, optionally gzipped).
//!
//! # Quick Start
//!
//! ```rust
//! use ipatlas::{DatasetBuilder, RawRecord};
//!
//! // Build a dataset from raw allocation records
//! let mut builder = DatasetBuilder::new();
//! builder.add_v4_record(RawRecord::new(
//!     "10.0.0.0".parse()?,
//!     "10.0.0.255".parse()?,
//!     "US".parse()?,
//! )?);
//! let atlas = builder.build()?;
//!
//! // Resolve addresses against it
//! assert_eq!(atlas.resolve_str("10.0.0.42")?.unwrap().to_string(), "US");
//!
//! // Addresses in unallocated space resolve to None, not an error
//! assert_eq!(atlas.resolve_str("192.0.2.1")?, None);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Datasets
//!
//! A built [`Atlas`] can be written to a versioned, checksummed snapshot
//! file and later memory-mapped back:
//!
//! ```rust,no_run
//! use ipatlas::snapshot;
//!
//! let atlas = snapshot::load("country.atlas")?;
//! let country = atlas.resolve_str("8.8.8.8")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Overlapping records in the raw data are resolved at build time by a
//! configurable [`OverlapPolicy`]; the stored dataset is always sorted and
//! strictly non-overlapping, so every query is one binary search.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod addr;
pub mod atlas;
pub mod builder;
pub mod country;
pub mod error;
pub mod normalize;
pub mod snapshot;
pub mod source;
pub mod table;

pub use crate::addr::{parse_ip, Address, IpFamily};
pub use crate::atlas::Atlas;
pub use crate::builder::DatasetBuilder;
pub use crate::country::CountryCode;
pub use crate::error::{AtlasError, Result};
pub use crate::normalize::{normalize, OverlapPolicy, RawRecord};
pub use crate::source::SourceFormat;
pub use crate::table::{LookupTable, Range};

/// Library version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
