//! Scan targets and target-specification expansion
//!
//! One input line holds a bare domain, a bare address, or an
//! `<address>/<prefix>` block. Blocks expand to every address they contain,
//! network and broadcast included, in ascending order.

use ipnetwork::IpNetwork;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// One host to scan. At least one of `ip`/`domain` is always present and
/// `ip` is always a single, fully-resolved address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanTarget {
    pub ip: Option<IpAddr>,
    pub domain: Option<String>,
}

impl ScanTarget {
    pub fn from_ip(ip: IpAddr) -> Self {
        Self {
            ip: Some(ip),
            domain: None,
        }
    }

    pub fn from_domain(domain: impl Into<String>) -> Self {
        Self {
            ip: None,
            domain: Some(domain.into()),
        }
    }

    /// Address as a string, empty when the target only has a domain
    pub fn ip_string(&self) -> String {
        self.ip.map(|ip| ip.to_string()).unwrap_or_default()
    }

    /// Domain as a string, empty when the target only has an address
    pub fn domain_string(&self) -> String {
        self.domain.clone().unwrap_or_default()
    }

    /// Host identifier for log messages
    pub fn label(&self) -> String {
        match (&self.ip, &self.domain) {
            (Some(ip), _) => ip.to_string(),
            (None, Some(domain)) => domain.clone(),
            (None, None) => String::new(),
        }
    }
}

/// Targets produced by expanding one input line
#[derive(Debug)]
pub enum TargetExpansion {
    Single(Option<ScanTarget>),
    Range(RangeHosts),
}

impl Iterator for TargetExpansion {
    type Item = ScanTarget;

    fn next(&mut self) -> Option<ScanTarget> {
        match self {
            TargetExpansion::Single(target) => target.take(),
            TargetExpansion::Range(hosts) => hosts.next(),
        }
    }
}

/// Ascending enumeration of every address in a block. Each yielded target
/// carries its own address value; nothing is aliased between emissions.
#[derive(Debug)]
pub struct RangeHosts {
    network: IpNetwork,
    next: Option<IpAddr>,
}

impl RangeHosts {
    fn new(network: IpNetwork) -> Self {
        // network() applies the mask, so enumeration starts at the base
        Self {
            network,
            next: Some(network.network()),
        }
    }
}

impl Iterator for RangeHosts {
    type Item = ScanTarget;

    fn next(&mut self) -> Option<ScanTarget> {
        let current = self.next.take()?;
        self.next = increment_ip(current).filter(|ip| self.network.contains(*ip));
        Some(ScanTarget::from_ip(current))
    }
}

/// Parse one trimmed input line into its scan targets.
///
/// Fails with [`crate::ScanError::InvalidTarget`] on malformed input; the
/// caller skips the line and continues.
pub fn expand_target(line: &str) -> crate::Result<TargetExpansion> {
    if line.contains('/') {
        let network: IpNetwork = line
            .parse()
            .map_err(|e| crate::ScanError::InvalidTarget(format!("{}: {}", line, e)))?;
        return Ok(TargetExpansion::Range(RangeHosts::new(network)));
    }

    if let Ok(ip) = line.parse::<IpAddr>() {
        return Ok(TargetExpansion::Single(Some(ScanTarget::from_ip(ip))));
    }

    if is_valid_domain(line) {
        return Ok(TargetExpansion::Single(Some(ScanTarget::from_domain(line))));
    }

    Err(crate::ScanError::InvalidTarget(format!(
        "not an address, block or domain: {:?}",
        line
    )))
}

/// Next address in ascending order, with carry propagating across every
/// byte. None once the whole address space wraps.
fn increment_ip(ip: IpAddr) -> Option<IpAddr> {
    match ip {
        IpAddr::V4(v4) => {
            let mut octets = v4.octets();
            increment_bytes(&mut octets).then(|| IpAddr::V4(Ipv4Addr::from(octets)))
        }
        IpAddr::V6(v6) => {
            let mut octets = v6.octets();
            increment_bytes(&mut octets).then(|| IpAddr::V6(Ipv6Addr::from(octets)))
        }
    }
}

fn increment_bytes(bytes: &mut [u8]) -> bool {
    for byte in bytes.iter_mut().rev() {
        let (next, wrapped) = byte.overflowing_add(1);
        *byte = next;
        if !wrapped {
            return true;
        }
    }
    false
}

fn is_valid_domain(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        && s.chars().any(|c| c.is_ascii_alphabetic())
}
