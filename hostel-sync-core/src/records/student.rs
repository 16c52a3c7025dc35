use serde::{Deserialize, Serialize};

/// A row of the relational student roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub room: String,
    #[serde(default)]
    pub phone: String,
}
