//! Delivery staff and live location types

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DisplayFromStr, PickFirst};
use utoipa::ToSchema;

use super::status::normalize_status;

/// Person assigned to carry a book to or from the customer
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryPerson {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Availability feed of a delivery manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Availability {
    Online,
    Busy,
    Offline,
}

impl From<String> for Availability {
    fn from(s: String) -> Self {
        match normalize_status(&s).as_str() {
            "online" | "available" => Availability::Online,
            "busy" => Availability::Busy,
            _ => Availability::Offline,
        }
    }
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryManager {
    #[serde_as(as = "PickFirst<(_, DisplayFromStr)>")]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(alias = "status")]
    pub availability: Availability,
}

impl DeliveryManager {
    /// Only online managers can take a new assignment
    pub fn is_available(&self) -> bool {
        self.availability == Availability::Online
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DeliveryLocation {
    pub latitude: f64,
    pub longitude: f64,
}

/// Raw `delivery-location` payload from the upstream
#[derive(Debug, Clone, Deserialize)]
pub struct LocationEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<LocationData>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationData {
    #[serde(default)]
    pub location: Option<DeliveryLocation>,
}

impl LocationEnvelope {
    pub fn into_location(self) -> Option<DeliveryLocation> {
        if !self.success {
            return None;
        }
        self.data.and_then(|d| d.location)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manager_availability_from_feed() {
        let managers: Vec<DeliveryManager> = serde_json::from_value(serde_json::json!([
            {"id": 1, "name": "Sam", "status": "Online"},
            {"id": "2", "name": "Kim", "availability": "busy"},
            {"id": 3, "name": "Lee", "availability": "on leave"}
        ]))
        .unwrap();
        assert!(managers[0].is_available());
        assert_eq!(managers[1].id, 2);
        assert!(!managers[1].is_available());
        assert_eq!(managers[2].availability, Availability::Offline);
    }

    #[test]
    fn test_location_envelope() {
        let env: LocationEnvelope = serde_json::from_value(serde_json::json!({
            "success": true,
            "data": {"location": {"latitude": 33.5, "longitude": 36.3}}
        }))
        .unwrap();
        assert_eq!(
            env.into_location(),
            Some(DeliveryLocation { latitude: 33.5, longitude: 36.3 })
        );

        let empty: LocationEnvelope =
            serde_json::from_value(serde_json::json!({"success": true, "data": {}})).unwrap();
        assert!(empty.into_location().is_none());

        let failed: LocationEnvelope =
            serde_json::from_value(serde_json::json!({"success": false})).unwrap();
        assert!(failed.into_location().is_none());
    }
}
