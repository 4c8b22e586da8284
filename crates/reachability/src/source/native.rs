//! Native path source backed by OS interface notifications.

use netdev::interface::InterfaceType as LinkType;
use reachability_core::logging::targets;

use super::{PathCallback, PathSource};
use crate::error::{ReachabilityError, Result};
use crate::state::{InterfaceTag, PathStatus};

/// Watches interface changes with `netwatcher` and reports path status.
///
/// Every notification (including the initial one the watcher delivers right
/// after registration) triggers a fresh interface snapshot via
/// [`snapshot_status`]. The path is satisfied when at least one non-loopback
/// interface is up and has an address assigned.
#[derive(Default)]
pub struct NativePathSource {
    handle: Option<netwatcher::WatchHandle>,
}

impl NativePathSource {
    /// Create an idle source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the watcher is registered.
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl PathSource for NativePathSource {
    fn name(&self) -> &'static str {
        "native"
    }

    fn start(&mut self, callback: PathCallback) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }

        let handle = netwatcher::watch_interfaces(move |update| {
            tracing::trace!(
                target: targets::SOURCE,
                added = update.diff.added.len(),
                removed = update.diff.removed.len(),
                "interface update"
            );
            callback(snapshot_status());
        })
        .map_err(|e| ReachabilityError::Watcher(e.to_string()))?;

        tracing::debug!(target: targets::SOURCE, "native watcher started");
        self.handle = Some(handle);
        Ok(())
    }

    fn stop(&mut self) {
        // Dropping the handle unregisters the watcher.
        if self.handle.take().is_some() {
            tracing::debug!(target: targets::SOURCE, "native watcher stopped");
        }
    }
}

impl Drop for NativePathSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One interface as seen by a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ObservedInterface {
    tag: InterfaceTag,
    is_up: bool,
    has_addresses: bool,
}

/// Take a snapshot of the host's interfaces and derive a path status.
pub fn snapshot_status() -> PathStatus {
    let observed = netdev::get_interfaces().into_iter().map(|iface| {
        let tag = if iface.is_loopback() {
            InterfaceTag::Loopback
        } else if iface.is_tun() {
            InterfaceTag::Other
        } else {
            tag_for(iface.if_type, &iface.name)
        };
        ObservedInterface {
            tag,
            is_up: iface.is_up(),
            has_addresses: !iface.ipv4.is_empty() || !iface.ipv6.is_empty(),
        }
    });
    status_from(observed)
}

fn status_from(interfaces: impl IntoIterator<Item = ObservedInterface>) -> PathStatus {
    let mut status = PathStatus::unsatisfied();
    for iface in interfaces {
        if !iface.is_up || !iface.has_addresses {
            continue;
        }
        if iface.tag != InterfaceTag::Loopback {
            status.satisfied = true;
        }
        if !status.interfaces.contains(&iface.tag) {
            status.interfaces.push(iface.tag);
        }
    }
    status
}

/// Map a link type to a tag.
///
/// Several platforms report WiFi adapters as plain Ethernet, so the
/// conventional interface name prefixes break the tie.
fn tag_for(link_type: LinkType, name: &str) -> InterfaceTag {
    match link_type {
        LinkType::Wireless80211 => InterfaceTag::Wifi,
        LinkType::Wwanpp | LinkType::Wwanpp2 => InterfaceTag::Cellular,
        LinkType::Loopback => InterfaceTag::Loopback,
        LinkType::Tunnel => InterfaceTag::Other,
        _ => tag_from_name(name),
    }
}

fn tag_from_name(name: &str) -> InterfaceTag {
    let name = name.to_ascii_lowercase();
    if name.starts_with("wl") || name.starts_with("wi-fi") || name.starts_with("wifi") {
        InterfaceTag::Wifi
    } else if name.starts_with("wwan") || name.starts_with("rmnet") || name.starts_with("pdp_ip") {
        InterfaceTag::Cellular
    } else if name.starts_with("en") || name.starts_with("eth") || name.starts_with("ethernet") {
        InterfaceTag::WiredEthernet
    } else if name.starts_with("lo") {
        InterfaceTag::Loopback
    } else {
        InterfaceTag::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iface(tag: InterfaceTag, is_up: bool, has_addresses: bool) -> ObservedInterface {
        ObservedInterface {
            tag,
            is_up,
            has_addresses,
        }
    }

    #[test]
    fn test_loopback_alone_is_unsatisfied() {
        let status = status_from([iface(InterfaceTag::Loopback, true, true)]);
        assert!(!status.satisfied);
        assert_eq!(status.interfaces, vec![InterfaceTag::Loopback]);
    }

    #[test]
    fn test_down_or_unaddressed_interfaces_are_ignored() {
        let status = status_from([
            iface(InterfaceTag::Loopback, true, true),
            iface(InterfaceTag::Wifi, false, true),
            iface(InterfaceTag::WiredEthernet, true, false),
        ]);
        assert!(!status.satisfied);
        assert_eq!(status.interfaces, vec![InterfaceTag::Loopback]);
    }

    #[test]
    fn test_addressed_interface_satisfies() {
        let status = status_from([
            iface(InterfaceTag::Loopback, true, true),
            iface(InterfaceTag::WiredEthernet, true, true),
            iface(InterfaceTag::WiredEthernet, true, true),
        ]);
        assert!(status.satisfied);
        assert_eq!(
            status.interfaces,
            vec![InterfaceTag::Loopback, InterfaceTag::WiredEthernet]
        );
    }

    #[test]
    fn test_tag_from_name() {
        assert_eq!(tag_from_name("wlan0"), InterfaceTag::Wifi);
        assert_eq!(tag_from_name("wlp3s0"), InterfaceTag::Wifi);
        assert_eq!(tag_from_name("Wi-Fi"), InterfaceTag::Wifi);
        assert_eq!(tag_from_name("wwan0"), InterfaceTag::Cellular);
        assert_eq!(tag_from_name("pdp_ip0"), InterfaceTag::Cellular);
        assert_eq!(tag_from_name("eth0"), InterfaceTag::WiredEthernet);
        assert_eq!(tag_from_name("enp0s31f6"), InterfaceTag::WiredEthernet);
        assert_eq!(tag_from_name("lo"), InterfaceTag::Loopback);
        assert_eq!(tag_from_name("docker0"), InterfaceTag::Other);
    }

    #[test]
    fn test_snapshot_does_not_panic() {
        let _ = snapshot_status();
    }
}
