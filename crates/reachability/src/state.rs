//! Connection state and raw path events.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kind of interface carrying the current connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InterfaceType {
    /// Wireless (WiFi) interface.
    Wifi,
    /// Cellular (WWAN) interface.
    Cellular,
    /// Wired Ethernet interface.
    WiredEthernet,
    /// Loopback interface (localhost).
    Loopback,
    /// Tunnel, bridge, or an unrecognised link type.
    Other,
}

impl fmt::Display for InterfaceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceType::Wifi => write!(f, "WiFi"),
            InterfaceType::Cellular => write!(f, "Cellular"),
            InterfaceType::WiredEthernet => write!(f, "Ethernet"),
            InterfaceType::Loopback => write!(f, "Loopback"),
            InterfaceType::Other => write!(f, "Other"),
        }
    }
}

/// Interface tag attached to a raw path event.
///
/// Tags describe every interface the path source saw; [`classify`] reduces
/// them to the single [`InterfaceType`] stored in the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceTag {
    /// Wireless (WiFi) interface.
    Wifi,
    /// Cellular (WWAN) interface.
    Cellular,
    /// Wired Ethernet interface.
    WiredEthernet,
    /// Loopback interface.
    Loopback,
    /// Any other interface.
    Other,
}

impl From<InterfaceTag> for InterfaceType {
    fn from(tag: InterfaceTag) -> Self {
        match tag {
            InterfaceTag::Wifi => InterfaceType::Wifi,
            InterfaceTag::Cellular => InterfaceType::Cellular,
            InterfaceTag::WiredEthernet => InterfaceType::WiredEthernet,
            InterfaceTag::Loopback => InterfaceType::Loopback,
            InterfaceTag::Other => InterfaceType::Other,
        }
    }
}

impl From<InterfaceType> for InterfaceTag {
    fn from(kind: InterfaceType) -> Self {
        match kind {
            InterfaceType::Wifi => InterfaceTag::Wifi,
            InterfaceType::Cellular => InterfaceTag::Cellular,
            InterfaceType::WiredEthernet => InterfaceTag::WiredEthernet,
            InterfaceType::Loopback => InterfaceTag::Loopback,
            InterfaceType::Other => InterfaceTag::Other,
        }
    }
}

/// A raw report from a path source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathStatus {
    /// Whether the path is usable for outbound traffic.
    pub satisfied: bool,
    /// Tags of the interfaces the source observed.
    pub interfaces: Vec<InterfaceTag>,
}

impl PathStatus {
    /// A satisfied path over the given interfaces.
    pub fn satisfied(interfaces: impl IntoIterator<Item = InterfaceTag>) -> Self {
        Self {
            satisfied: true,
            interfaces: interfaces.into_iter().collect(),
        }
    }

    /// An unsatisfied path.
    pub fn unsatisfied() -> Self {
        Self::default()
    }
}

/// Order in which tags win when several interfaces are present.
const CLASSIFY_PRIORITY: [InterfaceTag; 5] = [
    InterfaceTag::Wifi,
    InterfaceTag::Cellular,
    InterfaceTag::WiredEthernet,
    InterfaceTag::Other,
    InterfaceTag::Loopback,
];

/// Reduce a raw event to a single interface classification.
///
/// Unsatisfied paths classify as `None`. A satisfied path without tags is
/// classified as [`InterfaceType::Other`].
pub fn classify(status: &PathStatus) -> Option<InterfaceType> {
    if !status.satisfied {
        return None;
    }
    let kind = CLASSIFY_PRIORITY
        .into_iter()
        .find(|tag| status.interfaces.contains(tag))
        .map(InterfaceType::from)
        .unwrap_or(InterfaceType::Other);
    Some(kind)
}

/// An immutable snapshot of reachability.
///
/// The interface type is present exactly when the state is connected; the
/// constructors make any other combination unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConnectionState {
    interface_type: Option<InterfaceType>,
}

impl ConnectionState {
    /// The disconnected state.
    pub const fn offline() -> Self {
        Self {
            interface_type: None,
        }
    }

    /// A connected state over `interface_type`.
    pub const fn online(interface_type: InterfaceType) -> Self {
        Self {
            interface_type: Some(interface_type),
        }
    }

    /// Derive the state a raw event describes.
    pub fn from_status(status: &PathStatus) -> Self {
        Self {
            interface_type: classify(status),
        }
    }

    /// A raw event that classifies back to this state.
    pub fn to_status(&self) -> PathStatus {
        match self.interface_type {
            Some(kind) => PathStatus::satisfied([InterfaceTag::from(kind)]),
            None => PathStatus::unsatisfied(),
        }
    }

    /// Whether outbound connectivity is available.
    pub const fn is_connected(&self) -> bool {
        self.interface_type.is_some()
    }

    /// The interface carrying the connection, `None` when offline.
    pub const fn interface_type(&self) -> Option<InterfaceType> {
        self.interface_type
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.interface_type {
            Some(kind) => write!(f, "online ({kind})"),
            None => write!(f, "offline"),
        }
    }
}
