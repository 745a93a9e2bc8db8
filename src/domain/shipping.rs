//! Shipping zones as seen by the location catalog.
//!
//! Only the zone → method-instance layout matters here; rates are computed
//! elsewhere.

use serde::{Deserialize, Serialize};

/// Identifier of the catch-all zone covering addresses no other zone matches.
pub const DEFAULT_ZONE_ID: u64 = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingMethodInstance {
    pub instance_id: u64,
    pub method_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingZone {
    pub id: u64,
    pub name: String,
    pub methods: Vec<ShippingMethodInstance>,
}

impl ShippingZone {
    pub fn is_default(&self) -> bool {
        self.id == DEFAULT_ZONE_ID
    }
}

/// A location's resolved link to a configured shipping method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingLink {
    pub zone_id: u64,
    pub zone_name: String,
    pub instance_id: u64,
    pub method_id: String,
    pub method_title: String,
}

impl ShippingLink {
    pub fn new(zone: &ShippingZone, method: &ShippingMethodInstance) -> Self {
        Self {
            zone_id: zone.id,
            zone_name: zone.name.clone(),
            instance_id: method.instance_id,
            method_id: method.method_id.clone(),
            method_title: method.title.clone(),
        }
    }
}
