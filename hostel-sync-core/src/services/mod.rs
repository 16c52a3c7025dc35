//! Feature services built on the document store.
//!
//! Services hold no state of their own besides the store handle. Business
//! rules that the store cannot enforce (status transitions, required
//! fields) are checked here before anything is written.

mod chat;
mod contacts;
mod requests;
mod students;

use thiserror::Error;

use crate::document::PathError;
use crate::records::RequestStatus;
use crate::store::StoreError;

pub use chat::{ChatService, Sender};
pub use contacts::ContactService;
pub use requests::{NewServiceRequest, ServiceRequestService};
pub use students::{StudentDirectory, STUDENT_CACHE_TTL};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Cannot move request from {from} to {to}")]
    InvalidTransition {
        from: RequestStatus,
        to: RequestStatus,
    },
}
