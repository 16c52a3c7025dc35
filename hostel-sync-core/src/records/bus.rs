use chrono::{DateTime, Utc};

use crate::canonical::{group, text, text_list, text_or, CanonicalGroups, FieldGroups};
use crate::decode::{self, Decode};
use crate::document::{CollectionPath, DocPath, Fields, PathError};

pub const DEFAULT_BUS_STATUS: &str = "On Schedule";

/// Timings and driver details for one bus route (`bus_routes/{route}`).
#[derive(Debug, Clone, PartialEq)]
pub struct BusSchedule {
    pub id: String,
    pub route_name: String,
    pub status: String,
    pub departure_times: Vec<String>,
    pub pickup_point: String,
    pub driver_name: String,
    pub driver_phone: String,
    pub last_updated: Option<DateTime<Utc>>,
}

impl BusSchedule {
    pub fn collection() -> CollectionPath {
        CollectionPath::known("bus_routes")
    }

    pub fn path(route_id: &str) -> Result<DocPath, PathError> {
        Self::collection().doc(route_id)
    }
}

impl Default for BusSchedule {
    fn default() -> Self {
        Self {
            id: String::new(),
            route_name: String::new(),
            status: DEFAULT_BUS_STATUS.to_string(),
            departure_times: Vec::new(),
            pickup_point: String::new(),
            driver_name: String::new(),
            driver_phone: String::new(),
            last_updated: None,
        }
    }
}

impl Decode for BusSchedule {
    fn decode(id: &str, fields: &Fields) -> Self {
        Self {
            id: id.to_string(),
            route_name: decode::string_or(fields, "routeName", id),
            status: decode::string_or(fields, "status", DEFAULT_BUS_STATUS),
            departure_times: decode::string_list(fields, "departureTimes"),
            pickup_point: decode::string(fields, "pickupPoint"),
            driver_name: decode::string(fields, "driverName"),
            driver_phone: decode::string(fields, "driverPhone"),
            last_updated: decode::timestamp(fields, "lastUpdated"),
        }
    }
}

impl FieldGroups for BusSchedule {
    fn canonical_groups(&self) -> CanonicalGroups {
        CanonicalGroups::from([
            ("routeName", group([("routeName", text(&self.route_name))])),
            (
                "status",
                group([("status", text_or(&self.status, DEFAULT_BUS_STATUS))]),
            ),
            (
                "departureTimes",
                group([("departureTimes", text_list(&self.departure_times))]),
            ),
            ("pickupPoint", group([("pickupPoint", text(&self.pickup_point))])),
            (
                "driver",
                group([
                    ("driverName", text(&self.driver_name)),
                    ("driverPhone", text(&self.driver_phone)),
                ]),
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_applies_defaults() {
        let fields = json!({"departureTimes": ["07:30", "08:15"]})
            .as_object()
            .cloned()
            .unwrap();
        let bus = BusSchedule::decode("route-a", &fields);

        assert_eq!(bus.route_name, "route-a");
        assert_eq!(bus.status, DEFAULT_BUS_STATUS);
        assert_eq!(bus.departure_times.len(), 2);
        assert!(bus.last_updated.is_none());
    }

    #[test]
    fn test_driver_fields_share_a_group() {
        let groups = BusSchedule::default().canonical_groups();
        let driver = &groups["driver"];
        assert!(driver.contains_key("driverName"));
        assert!(driver.contains_key("driverPhone"));
    }

    #[test]
    fn test_path() {
        assert_eq!(BusSchedule::path("r1").unwrap().as_str(), "bus_routes/r1");
        assert!(BusSchedule::path("../x").is_err());
    }
}
