use crate::decode::{self, Decode};
use crate::document::{CollectionPath, DocPath, Fields, PathError, WritePayload};

pub const DEFAULT_CONTACT_ICON: &str = "call";

/// An emergency contact (`emergency_contacts/{id}`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmergencyContact {
    pub id: String,
    pub title: String,
    pub name: String,
    pub phone: String,
    pub icon: String,
}

impl EmergencyContact {
    pub fn new(title: impl Into<String>, name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            name: name.into(),
            phone: phone.into(),
            icon: DEFAULT_CONTACT_ICON.to_string(),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn collection() -> CollectionPath {
        CollectionPath::known("emergency_contacts")
    }

    pub fn path(id: &str) -> Result<DocPath, PathError> {
        Self::collection().doc(id)
    }

    /// Trimmed fields for a new document. The id is assigned by the store.
    pub fn to_payload(&self) -> WritePayload {
        let icon = self.icon.trim();
        WritePayload::new()
            .value("title", self.title.trim())
            .value("name", self.name.trim())
            .value("phone", self.phone.trim())
            .value(
                "icon",
                if icon.is_empty() { DEFAULT_CONTACT_ICON } else { icon },
            )
    }
}

impl Decode for EmergencyContact {
    fn decode(id: &str, fields: &Fields) -> Self {
        Self {
            id: id.to_string(),
            title: decode::string(fields, "title"),
            name: decode::string(fields, "name"),
            phone: decode::string(fields, "phone"),
            icon: decode::string_or(fields, "icon", DEFAULT_CONTACT_ICON),
        }
    }
}
