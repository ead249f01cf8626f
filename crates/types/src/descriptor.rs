//! Local endpoint description and default reporting entries.

use crate::{ClusterId, Endpoint};
use serde::{Deserialize, Serialize};

/// Home Automation profile.
pub const HA_PROFILE_ID: u16 = 0x0104;

/// Simple descriptor of the endpoint that commissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimpleDescriptor {
    pub endpoint: Endpoint,
    pub profile_id: u16,
    pub device_id: u16,
    pub device_version: u8,
    /// Server clusters.
    pub in_clusters: Vec<ClusterId>,
    /// Client clusters.
    pub out_clusters: Vec<ClusterId>,
}

impl SimpleDescriptor {
    /// Create a descriptor on the Home Automation profile.
    pub fn new(endpoint: Endpoint, device_id: u16) -> Self {
        Self {
            endpoint,
            profile_id: HA_PROFILE_ID,
            device_id,
            device_version: 0,
            in_clusters: Vec::new(),
            out_clusters: Vec::new(),
        }
    }

    pub fn with_in_clusters(mut self, clusters: impl IntoIterator<Item = ClusterId>) -> Self {
        self.in_clusters = clusters.into_iter().collect();
        self
    }

    pub fn with_out_clusters(mut self, clusters: impl IntoIterator<Item = ClusterId>) -> Self {
        self.out_clusters = clusters.into_iter().collect();
        self
    }

    /// Whether the endpoint implements the cluster on either side.
    pub fn has_cluster(&self, cluster: ClusterId) -> bool {
        self.in_clusters.contains(&cluster) || self.out_clusters.contains(&cluster)
    }
}

/// One default attribute-reporting entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingConfig {
    pub endpoint: Endpoint,
    pub profile_id: u16,
    pub cluster: ClusterId,
    pub attribute_id: u16,
    /// Seconds.
    pub min_interval: u16,
    /// Seconds.
    pub max_interval: u16,
    /// Raw reportable-change value in the attribute's encoding.
    pub reportable_change: Vec<u8>,
}

impl ReportingConfig {
    /// Entries are unique per endpoint, cluster and attribute.
    pub fn key(&self) -> (Endpoint, ClusterId, u16) {
        (self.endpoint, self.cluster, self.attribute_id)
    }
}
