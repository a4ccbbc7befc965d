//! Deny-list address matching.
//!
//! # Responsibilities
//! - Parse configured entries into literal addresses and CIDR ranges
//! - Answer membership queries for candidate client addresses
//!
//! # Design Decisions
//! - Built once through [`AddressSetBuilder`], immutable afterwards
//! - Any malformed entry fails the whole build (fail closed at startup)
//! - Literals compare by value, so `2001:db8::0001` equals `2001:db8::1`
//! - IPv4-mapped IPv6 addresses are matched as their IPv4 form

use std::collections::HashSet;
use std::net::IpAddr;

use ipnet::{IpNet, Ipv4Net};
use thiserror::Error;

/// Errors raised while building an [`AddressSet`] or querying it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    /// The deny list had no entries.
    #[error("deny list cannot be empty")]
    EmptyInput,

    /// A configured entry is neither an address nor a CIDR range.
    #[error("invalid IP/CIDR format: {0}")]
    InvalidAddressFormat(String),

    /// A candidate address was empty.
    #[error("empty IP")]
    EmptyAddress,

    /// A candidate address did not parse.
    #[error("invalid IP: {0}")]
    InvalidAddress(String),
}

/// An immutable set of denied addresses and ranges.
#[derive(Debug, Clone)]
pub struct AddressSet {
    literals: HashSet<IpAddr>,
    ranges: Vec<IpNet>,
}

impl AddressSet {
    /// Build a set from configuration entries.
    ///
    /// Each entry is either a single address (`192.168.1.100`, `[::1]`) or a
    /// CIDR range (`10.0.0.0/8`).
    pub fn new<I, S>(entries: I) -> Result<Self, AddressError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = AddressSetBuilder::new();
        for entry in entries {
            builder.push(entry.as_ref())?;
        }
        builder.build()
    }

    /// Start an empty builder.
    pub fn builder() -> AddressSetBuilder {
        AddressSetBuilder::new()
    }

    /// Check whether a textual address is denied.
    pub fn contains(&self, addr: &str) -> Result<bool, AddressError> {
        if addr.is_empty() {
            return Err(AddressError::EmptyAddress);
        }

        let ip: IpAddr = addr
            .parse()
            .map_err(|_| AddressError::InvalidAddress(addr.to_string()))?;

        Ok(self.contains_ip(ip))
    }

    /// Check whether an already parsed address is denied.
    pub fn contains_ip(&self, ip: IpAddr) -> bool {
        let ip = ip.to_canonical();

        if self.literals.contains(&ip) {
            return true;
        }

        self.ranges.iter().any(|net| net.contains(&ip))
    }

    /// Number of distinct literal addresses.
    pub fn literal_count(&self) -> usize {
        self.literals.len()
    }

    /// Number of CIDR ranges.
    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }
}

/// Accumulates entries for an [`AddressSet`].
#[derive(Debug, Default)]
pub struct AddressSetBuilder {
    literals: HashSet<IpAddr>,
    ranges: Vec<IpNet>,
}

impl AddressSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and add one entry.
    ///
    /// Ranges are tried first, then single addresses.
    pub fn push(&mut self, entry: &str) -> Result<&mut Self, AddressError> {
        let cleaned = entry.trim().trim_matches(|c| c == '[' || c == ']');

        if let Ok(net) = cleaned.parse::<IpNet>() {
            self.ranges.push(canonical_net(net.trunc()));
            return Ok(self);
        }

        match cleaned.parse::<IpAddr>() {
            Ok(ip) => {
                self.literals.insert(ip.to_canonical());
                Ok(self)
            }
            Err(_) => Err(AddressError::InvalidAddressFormat(cleaned.to_string())),
        }
    }

    /// Freeze the accumulated entries.
    pub fn build(self) -> Result<AddressSet, AddressError> {
        if self.literals.is_empty() && self.ranges.is_empty() {
            return Err(AddressError::EmptyInput);
        }

        Ok(AddressSet {
            literals: self.literals,
            ranges: self.ranges,
        })
    }
}

/// Rewrite a range inside `::ffff:0:0/96` as the IPv4 range it covers.
///
/// Candidates are canonicalized to IPv4 before matching, so a mapped-form
/// range would otherwise never match.
fn canonical_net(net: IpNet) -> IpNet {
    if let IpNet::V6(v6) = net {
        if v6.prefix_len() >= 96 {
            if let Some(v4) = v6.network().to_ipv4_mapped() {
                if let Ok(v4net) = Ipv4Net::new(v4, v6.prefix_len() - 96) {
                    return IpNet::V4(v4net);
                }
            }
        }
    }
    net
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(entries: &[&str]) -> AddressSet {
        AddressSet::new(entries).unwrap()
    }

    #[test]
    fn test_empty_input_rejected() {
        let entries: [&str; 0] = [];
        assert_eq!(AddressSet::new(entries).unwrap_err(), AddressError::EmptyInput);
        assert_eq!(AddressSet::builder().build().unwrap_err(), AddressError::EmptyInput);
    }

    #[test]
    fn test_invalid_entry_rejected() {
        let err = AddressSet::new(["not-an-ip"]).unwrap_err();
        assert_eq!(err, AddressError::InvalidAddressFormat("not-an-ip".into()));
        assert_eq!(err.to_string(), "invalid IP/CIDR format: not-an-ip");
    }

    #[test]
    fn test_one_bad_entry_fails_whole_set() {
        let err = AddressSet::new(["10.0.0.0/8", "192.168.1.100", "10.0.0.0/33"]).unwrap_err();
        assert!(matches!(err, AddressError::InvalidAddressFormat(_)));
    }

    #[test]
    fn test_range_match() {
        let s = set(&["10.0.0.0/8"]);
        assert!(s.contains("10.1.2.3").unwrap());
        assert!(s.contains("10.255.255.255").unwrap());
        assert!(!s.contains("11.0.0.0").unwrap());
        assert!(!s.contains("9.255.255.255").unwrap());
    }

    #[test]
    fn test_range_with_host_bits() {
        let s = set(&["10.0.0.5/8"]);
        assert!(s.contains("10.200.0.1").unwrap());
    }

    #[test]
    fn test_literal_match() {
        let s = set(&["192.168.1.100"]);
        assert!(s.contains("192.168.1.100").unwrap());
        assert!(!s.contains("192.168.1.101").unwrap());
    }

    #[test]
    fn test_empty_and_invalid_candidates() {
        let s = set(&["192.168.1.100"]);
        assert_eq!(s.contains("").unwrap_err(), AddressError::EmptyAddress);
        assert_eq!(
            s.contains("not-an-ip").unwrap_err(),
            AddressError::InvalidAddress("not-an-ip".into())
        );
    }

    #[test]
    fn test_ipv6_literal_compares_by_value() {
        let s = set(&["2001:db8::0001"]);
        assert!(s.contains("2001:db8::1").unwrap());
        assert!(s.contains("2001:0db8:0000:0000:0000:0000:0000:0001").unwrap());
        assert!(!s.contains("2001:db8::2").unwrap());
    }

    #[test]
    fn test_bracketed_entries() {
        let s = set(&["[2001:db8::1]", "[::1]"]);
        assert!(s.contains("2001:db8::1").unwrap());
        assert!(s.contains("::1").unwrap());
        assert_eq!(s.literal_count(), 2);
    }

    #[test]
    fn test_ipv6_range() {
        let s = set(&["2001:db8::/32"]);
        assert!(s.contains("2001:db8:ffff::1").unwrap());
        assert!(!s.contains("2001:db9::1").unwrap());
    }

    #[test]
    fn test_families_never_cross_match() {
        let s = set(&["0.0.0.0/0"]);
        assert!(s.contains("8.8.8.8").unwrap());
        assert!(!s.contains("2001:db8::1").unwrap());

        let s = set(&["::/0"]);
        assert!(s.contains("2001:db8::1").unwrap());
        assert!(!s.contains("8.8.8.8").unwrap());
    }

    #[test]
    fn test_ipv4_mapped_candidates() {
        let s = set(&["192.168.1.100", "10.0.0.0/8"]);
        assert!(s.contains("::ffff:192.168.1.100").unwrap());
        assert!(s.contains("::ffff:10.9.8.7").unwrap());
        assert!(!s.contains("::ffff:11.0.0.1").unwrap());
    }

    #[test]
    fn test_ipv4_mapped_range_entry() {
        let s = set(&["::ffff:10.0.0.0/104"]);
        assert!(s.contains("10.1.2.3").unwrap());
        assert!(s.contains("::ffff:10.1.2.3").unwrap());
        assert!(s.contains("::ffff:10.0.0.0").unwrap());
        assert!(!s.contains("11.0.0.1").unwrap());
        assert!(!s.contains("::ffff:11.0.0.1").unwrap());

        let s = set(&["::ffff:192.168.1.100/128"]);
        assert!(s.contains("192.168.1.100").unwrap());
        assert!(!s.contains("192.168.1.101").unwrap());
    }

    #[test]
    fn test_plain_ipv6_range_not_rewritten() {
        let s = set(&["2001:db8::/96"]);
        assert!(s.contains("2001:db8::a00:1").unwrap());
        assert!(!s.contains("10.0.0.1").unwrap());
    }

    #[test]
    fn test_literals_deduplicated() {
        let s = set(&["192.168.1.100", "192.168.1.100", "::ffff:192.168.1.100"]);
        assert_eq!(s.literal_count(), 1);
        assert_eq!(s.range_count(), 0);
    }

    #[test]
    fn test_every_entry_matches_an_address_from_it() {
        let entries = ["203.0.113.7", "198.51.100.0/24", "2001:db8:1::/48", "fe80::1"];
        let samples = ["203.0.113.7", "198.51.100.42", "2001:db8:1:2::3", "fe80::1"];
        let s = set(&entries);
        for sample in samples {
            assert!(s.contains(sample).unwrap(), "{sample} should be denied");
        }
    }

    #[test]
    fn test_contains_is_idempotent() {
        let s = set(&["10.0.0.0/8"]);
        for _ in 0..5 {
            assert!(s.contains("10.1.2.3").unwrap());
            assert!(!s.contains("11.1.2.3").unwrap());
        }
    }

    #[test]
    fn test_builder_chaining() {
        let mut builder = AddressSet::builder();
        builder.push("10.0.0.0/8").unwrap().push("192.168.1.1").unwrap();
        let s = builder.build().unwrap();
        assert_eq!(s.range_count(), 1);
        assert_eq!(s.literal_count(), 1);
    }
}
