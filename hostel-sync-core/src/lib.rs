//! Hostel Sync Core Library
//!
//! Live settings synchronization for hostel records: typed feeds over a
//! document store, local drafts, and dirty-diff writes.

pub mod cache;
pub mod canonical;
pub mod chat;
pub mod decode;
pub mod document;
pub mod draft;
pub mod feed;
pub mod feeds;
pub mod records;
pub mod services;
pub mod store;
pub mod writer;

pub use cache::TtlCache;
pub use canonical::{CanonicalGroups, FieldGroups};
pub use chat::{group_by_day, ChatItem};
pub use decode::Decode;
pub use document::{
    CollectionPath, Direction, DocPath, Document, FieldWrite, Fields, ListenTarget, PathError,
    Query, Snapshot, WritePayload,
};
pub use draft::DraftState;
pub use feed::{Feed, Fetch, LiveFeed, PollingFeed, Subscription, UpdateFn};
pub use feeds::{
    subscribe_bus_route, subscribe_bus_routes, subscribe_conversations,
    subscribe_emergency_contacts, subscribe_laundry_settings, subscribe_mess_menu,
    subscribe_messages, subscribe_service_requests,
};
pub use records::{
    BusSchedule, ChatMessage, Conversation, EmergencyContact, LaundrySettings, MealSlot,
    MessMenu, RequestStatus, ServiceRequest, Student,
};
pub use services::{
    ChatService, ContactService, NewServiceRequest, Sender, ServiceError, ServiceRequestService,
    StudentDirectory,
};
pub use store::{
    ChangeEvent, ChangeHub, ClientFrame, DocumentStore, MemoryStore, RemoteStore, ServerFrame,
    SnapshotStream, StoreError,
};
pub use writer::{DirtyDiffWriter, SaveError, SaveOutcome};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
