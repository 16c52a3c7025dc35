//! Frames exchanged on the `/listen` WebSocket.
//!
//! Frames are CBOR-encoded and sent as binary messages. One socket can carry
//! any number of listeners, each identified by a client-chosen id.

use serde::{Deserialize, Serialize};

use crate::document::{ListenTarget, Snapshot};

/// Frames sent by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Attach a listener
    Listen { id: u64, target: ListenTarget },
    /// Detach a listener
    Unlisten { id: u64 },
}

/// Frames sent by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerFrame {
    /// Full current value for a listener
    Snapshot { id: u64, snapshot: Snapshot },
    /// Listener-level failure; the listener stays attached
    Error { id: u64, message: String },
}

impl ClientFrame {
    pub fn encode(&self) -> Result<Vec<u8>, ciborium::ser::Error<std::io::Error>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)?;
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> Result<Self, ciborium::de::Error<std::io::Error>> {
        ciborium::from_reader(data)
    }
}

impl ServerFrame {
    pub fn encode(&self) -> Result<Vec<u8>, ciborium::ser::Error<std::io::Error>> {
        let mut buf = Vec::new();
        ciborium::into_writer(self, &mut buf)?;
        Ok(buf)
    }

    pub fn decode(data: &[u8]) -> Result<Self, ciborium::de::Error<std::io::Error>> {
        ciborium::from_reader(data)
    }
}
