//! Typed domain records.
//!
//! Each record knows where it lives in the store and how to decode itself
//! from raw fields. Editable records also expose their canonical field
//! groups for the dirty-diff writer.

mod bus;
mod chat;
mod contact;
mod laundry;
mod meal_slot;
mod mess;
mod request;
mod student;

pub use bus::{BusSchedule, DEFAULT_BUS_STATUS};
pub use chat::{ChatMessage, Conversation};
pub use contact::{EmergencyContact, DEFAULT_CONTACT_ICON};
pub use laundry::{LaundrySettings, DEFAULT_LAUNDRY_STATUS};
pub use meal_slot::MealSlot;
pub use mess::{parse_weekday, weekday_key, MessMenu};
pub use request::{RequestStatus, ServiceRequest};
pub use student::Student;
