//! Address model: IPv4 and IPv6 as ordered fixed-width integers
//!
//! The two address families live in separate namespaces and are never
//! comparable with each other. That is enforced at the type level: the
//! [`Address`] trait is sealed over exactly `std::net::Ipv4Addr` and
//! `std::net::Ipv6Addr`, and everything downstream (ranges, tables) is
//! generic over one family at a time. Cross-family dispatch happens in one
//! place, by matching exhaustively on [`IpFamily`] or `std::net::IpAddr`.

use crate::error::{AtlasError, Result};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// The two supported address families
///
/// A closed set on purpose: every family-sensitive operation matches
/// exhaustively over this enum, so growing a third family is a
/// compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    /// IPv4 (32-bit address space)
    V4,
    /// IPv6 (128-bit address space)
    V6,
}

impl IpFamily {
    /// The family a given address belongs to
    pub fn of(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => IpFamily::V4,
            IpAddr::V6(_) => IpFamily::V6,
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => write!(f, "IPv4"),
            IpFamily::V6 => write!(f, "IPv6"),
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for std::net::Ipv4Addr {}
    impl Sealed for std::net::Ipv6Addr {}
}

/// An address usable as a range endpoint within one family
///
/// Ordering is the total order over the address's integer value. The trait
/// is sealed; only `Ipv4Addr` and `Ipv6Addr` implement it.
pub trait Address:
    sealed::Sealed + Copy + Ord + Eq + std::hash::Hash + fmt::Debug + fmt::Display + Send + Sync
{
    /// Family tag for this address type
    const FAMILY: IpFamily;

    /// On-disk width of one address in bytes
    const OCTETS: usize;

    /// Smallest address in the family (`0.0.0.0` / `::`)
    const MIN: Self;

    /// Largest address in the family
    const MAX: Self;

    /// The next address up, or `None` at the family maximum
    fn checked_succ(self) -> Option<Self>;

    /// The next address down, or `None` at the family minimum
    fn checked_pred(self) -> Option<Self>;

    /// Distance from `origin` to `self` as an unsigned count
    ///
    /// Plain subtraction of the integer values; callers must pass
    /// `origin <= self`. `a.offset_from(a) == 0`.
    fn offset_from(self, origin: Self) -> u128;

    /// Append the address in network byte order
    fn write_octets(self, out: &mut Vec<u8>);

    /// Parse an address from exactly [`Self::OCTETS`] network-order bytes
    fn from_octets(bytes: &[u8]) -> Option<Self>;
}

impl Address for Ipv4Addr {
    const FAMILY: IpFamily = IpFamily::V4;
    const OCTETS: usize = 4;
    const MIN: Self = Ipv4Addr::new(0, 0, 0, 0);
    const MAX: Self = Ipv4Addr::new(255, 255, 255, 255);

    fn checked_succ(self) -> Option<Self> {
        u32::from(self).checked_add(1).map(Ipv4Addr::from)
    }

    fn checked_pred(self) -> Option<Self> {
        u32::from(self).checked_sub(1).map(Ipv4Addr::from)
    }

    fn offset_from(self, origin: Self) -> u128 {
        u128::from(u32::from(self)) - u128::from(u32::from(origin))
    }

    fn write_octets(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.octets());
    }

    fn from_octets(bytes: &[u8]) -> Option<Self> {
        let octets: [u8; 4] = bytes.try_into().ok()?;
        Some(Ipv4Addr::from(octets))
    }
}

impl Address for Ipv6Addr {
    const FAMILY: IpFamily = IpFamily::V6;
    const OCTETS: usize = 16;
    const MIN: Self = Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 0);
    const MAX: Self = Ipv6Addr::new(
        0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff, 0xffff,
    );

    fn checked_succ(self) -> Option<Self> {
        u128::from(self).checked_add(1).map(Ipv6Addr::from)
    }

    fn checked_pred(self) -> Option<Self> {
        u128::from(self).checked_sub(1).map(Ipv6Addr::from)
    }

    fn offset_from(self, origin: Self) -> u128 {
        u128::from(self) - u128::from(origin)
    }

    fn write_octets(self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.octets());
    }

    fn from_octets(bytes: &[u8]) -> Option<Self> {
        let octets: [u8; 16] = bytes.try_into().ok()?;
        Some(Ipv6Addr::from(octets))
    }
}

/// Parse a textual address of either family
///
/// Delegates to the standard library parser; failures surface as
/// [`AtlasError::InvalidAddress`].
pub fn parse_ip(text: &str) -> Result<IpAddr> {
    text.parse::<IpAddr>()
        .map_err(|e| AtlasError::InvalidAddress(format!("{}: {}", text, e)))
}
