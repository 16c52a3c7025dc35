use chrono::{DateTime, Utc};

use crate::canonical::{group, text, text_list, text_or, CanonicalGroups, FieldGroups};
use crate::decode::{self, Decode};
use crate::document::{DocPath, Fields};

pub const DEFAULT_LAUNDRY_STATUS: &str = "On Schedule";

/// Laundry pickup settings (`settings/laundry`).
#[derive(Debug, Clone, PartialEq)]
pub struct LaundrySettings {
    pub status: String,
    pub pickup_day: String,
    pub dropoff_day: String,
    pub timings: String,
    pub instructions: Vec<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl LaundrySettings {
    pub fn path() -> DocPath {
        DocPath::known("settings/laundry")
    }
}

impl Default for LaundrySettings {
    fn default() -> Self {
        Self {
            status: DEFAULT_LAUNDRY_STATUS.to_string(),
            pickup_day: String::new(),
            dropoff_day: String::new(),
            timings: String::new(),
            instructions: Vec::new(),
            last_updated: None,
        }
    }
}

impl Decode for LaundrySettings {
    fn decode(_id: &str, fields: &Fields) -> Self {
        Self {
            status: decode::string_or(fields, "status", DEFAULT_LAUNDRY_STATUS),
            pickup_day: decode::string(fields, "pickupDay"),
            dropoff_day: decode::string(fields, "dropoffDay"),
            timings: decode::string(fields, "timings"),
            instructions: decode::string_list(fields, "instructions"),
            last_updated: decode::timestamp(fields, "lastUpdated"),
        }
    }
}

impl FieldGroups for LaundrySettings {
    fn canonical_groups(&self) -> CanonicalGroups {
        CanonicalGroups::from([
            (
                "status",
                group([("status", text_or(&self.status, DEFAULT_LAUNDRY_STATUS))]),
            ),
            ("pickupDay", group([("pickupDay", text(&self.pickup_day))])),
            ("dropoffDay", group([("dropoffDay", text(&self.dropoff_day))])),
            ("timings", group([("timings", text(&self.timings))])),
            (
                "instructions",
                group([("instructions", text_list(&self.instructions))]),
            ),
        ])
    }
}
