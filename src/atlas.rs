//! The query façade: one lookup table per address family
//!
//! An [`Atlas`] owns an IPv4 table and an IPv6 table and dispatches each
//! query to the table matching the address's family. It is stateless
//! beyond the two tables and immutable after construction: share it behind
//! an `Arc` for lock-free concurrent queries, and hot-swap datasets by
//! publishing a new `Arc<Atlas>` so in-flight queries always observe one
//! internally consistent table.

use crate::addr::{parse_ip, IpFamily};
use crate::country::CountryCode;
use crate::error::{AtlasError, Result};
use crate::table::LookupTable;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// IP-to-country resolver over both address families
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Atlas {
    v4: LookupTable<Ipv4Addr>,
    v6: LookupTable<Ipv6Addr>,
}

impl Atlas {
    /// Create an atlas from per-family tables
    pub fn new(v4: LookupTable<Ipv4Addr>, v6: LookupTable<Ipv6Addr>) -> Self {
        Atlas { v4, v6 }
    }

    /// An atlas with no ranges; every query resolves to `None`
    pub fn empty() -> Self {
        Atlas {
            v4: LookupTable::empty(),
            v6: LookupTable::empty(),
        }
    }

    /// Resolve a typed address to its owning country
    ///
    /// `None` means the address falls in unallocated space (NotFound); it
    /// is a normal query outcome, not an error.
    pub fn resolve(&self, addr: IpAddr) -> Option<CountryCode> {
        match addr {
            IpAddr::V4(v4) => self.v4.resolve(v4),
            IpAddr::V6(v6) => self.v6.resolve(v6),
        }
    }

    /// Parse and resolve a textual address
    ///
    /// # Errors
    ///
    /// `InvalidAddress` if the text does not parse as either family.
    pub fn resolve_str(&self, text: &str) -> Result<Option<CountryCode>> {
        Ok(self.resolve(parse_ip(text)?))
    }

    /// Resolve an address the caller asserts belongs to `family`
    ///
    /// Used when the caller has pinned the family out of band (the CLI's
    /// `-4`/`-6` flags). An address of the other family is a caller
    /// contract violation.
    ///
    /// # Errors
    ///
    /// `FamilyMismatch` if the address's actual family differs.
    pub fn resolve_in_family(&self, addr: IpAddr, family: IpFamily) -> Result<Option<CountryCode>> {
        let actual = IpFamily::of(addr);
        if actual != family {
            return Err(AtlasError::FamilyMismatch {
                expected: family,
                actual,
            });
        }
        Ok(self.resolve(addr))
    }

    /// The IPv4 table
    pub fn v4(&self) -> &LookupTable<Ipv4Addr> {
        &self.v4
    }

    /// The IPv6 table
    pub fn v6(&self) -> &LookupTable<Ipv6Addr> {
        &self.v6
    }

    /// Total range count across both families
    pub fn len(&self) -> usize {
        self.v4.len() + self.v6.len()
    }

    /// Whether neither family holds any ranges
    pub fn is_empty(&self) -> bool {
        self.v4.is_empty() && self.v6.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Range;

    fn cc(s: &str) -> CountryCode {
        s.parse().unwrap()
    }

    fn sample_atlas() -> Atlas {
        let v4 = LookupTable::from_sorted_ranges(vec![Range::new(
            "10.0.0.0".parse().unwrap(),
            "10.0.0.255".parse().unwrap(),
            cc("US"),
        )
        .unwrap()])
        .unwrap();
        let v6 = LookupTable::from_sorted_ranges(vec![Range::new(
            "2001:db8::".parse().unwrap(),
            "2001:db8::ffff".parse().unwrap(),
            cc("SE"),
        )
        .unwrap()])
        .unwrap();
        Atlas::new(v4, v6)
    }

    #[test]
    fn test_resolve_dispatches_on_family() {
        let atlas = sample_atlas();
        assert_eq!(atlas.resolve("10.0.0.42".parse().unwrap()), Some(cc("US")));
        assert_eq!(atlas.resolve("2001:db8::1".parse().unwrap()), Some(cc("SE")));
        assert_eq!(atlas.resolve("192.0.2.1".parse().unwrap()), None);
        assert_eq!(atlas.resolve("2001:db9::".parse().unwrap()), None);
    }

    #[test]
    fn test_resolve_str() {
        let atlas = sample_atlas();
        assert_eq!(atlas.resolve_str("10.0.0.1").unwrap(), Some(cc("US")));
        assert_eq!(atlas.resolve_str("8.8.8.8").unwrap(), None);
        assert!(matches!(
            atlas.resolve_str("10.0.0"),
            Err(AtlasError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_family_mismatch() {
        let atlas = sample_atlas();
        let v6_addr: IpAddr = "2001:db8::1".parse().unwrap();
        let result = atlas.resolve_in_family(v6_addr, IpFamily::V4);
        assert_eq!(
            result,
            Err(AtlasError::FamilyMismatch {
                expected: IpFamily::V4,
                actual: IpFamily::V6
            })
        );

        let ok = atlas.resolve_in_family(v6_addr, IpFamily::V6).unwrap();
        assert_eq!(ok, Some(cc("SE")));
    }

    #[test]
    fn test_empty_atlas() {
        let atlas = Atlas::empty();
        assert!(atlas.is_empty());
        assert_eq!(atlas.resolve_str("1.1.1.1").unwrap(), None);
    }

    #[test]
    fn test_atlas_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Atlas>();
    }
}
