//! Hostel sync server library.
//!
//! Shared by the `hostel-server` and `hostel-admin` binaries.

pub mod server;
