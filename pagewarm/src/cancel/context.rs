//! Triggers and the per-evaluation context handed to cancellation handlers.

use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

/// Why the cancellation chain is being evaluated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CancellationTrigger {
    RapidNavigation,
    PageChange,
    NetworkOffline,
    NetworkSlow,
    ComponentUnmount,
    ErrorThreshold,
}

impl fmt::Display for CancellationTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RapidNavigation => "rapid-navigation",
            Self::PageChange => "page-change",
            Self::NetworkOffline => "network-offline",
            Self::NetworkSlow => "network-slow",
            Self::ComponentUnmount => "component-unmount",
            Self::ErrorThreshold => "error-threshold",
        };
        f.write_str(name)
    }
}

/// Connection quality as reported by the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConnectionSpeed {
    Fast,
    Medium,
    Slow,
    #[default]
    Unknown,
}

/// Snapshot of the host's network state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkStatus {
    pub is_online: bool,
    pub connection_speed: ConnectionSpeed,
    pub data_saver: bool,
}

impl Default for NetworkStatus {
    fn default() -> Self {
        Self::online(ConnectionSpeed::Unknown)
    }
}

impl NetworkStatus {
    /// Online with the given speed and data saver off.
    pub fn online(connection_speed: ConnectionSpeed) -> Self {
        Self {
            is_online: true,
            connection_speed,
            data_saver: false,
        }
    }

    pub fn offline() -> Self {
        Self {
            is_online: false,
            connection_speed: ConnectionSpeed::Unknown,
            data_saver: false,
        }
    }

    pub fn with_data_saver(mut self, data_saver: bool) -> Self {
        self.data_saver = data_saver;
        self
    }

    pub fn is_slow(&self) -> bool {
        self.connection_speed == ConnectionSpeed::Slow
    }

    /// True when speculative traffic should not be sent at all.
    pub fn blocks_prefetch(&self) -> bool {
        !self.is_online || self.data_saver
    }
}

/// Everything a handler needs to decide and act on one trigger.
///
/// Built fresh for each evaluation and dropped afterwards.
#[derive(Clone, Debug)]
pub struct CancellationContext {
    pub trigger: CancellationTrigger,
    pub current_page: u32,
    pub previous_page: Option<u32>,
    pub network: NetworkStatus,
    pub timestamp: Instant,
    pub metadata: HashMap<String, String>,
}

impl CancellationContext {
    /// Creates a context stamped with the current instant.
    pub fn new(trigger: CancellationTrigger, current_page: u32) -> Self {
        Self {
            trigger,
            current_page,
            previous_page: None,
            network: NetworkStatus::default(),
            timestamp: Instant::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_previous_page(mut self, previous_page: Option<u32>) -> Self {
        self.previous_page = previous_page;
        self
    }

    pub fn with_network(mut self, network: NetworkStatus) -> Self {
        self.network = network;
        self
    }

    pub fn with_timestamp(mut self, timestamp: Instant) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
