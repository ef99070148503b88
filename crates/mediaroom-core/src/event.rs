//! Events delivered by the media SDK.

use crate::state::{MediaHandle, ParticipantId};

/// Named events the SDK's event emitter delivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SdkEvent {
    /// Generic SDK error. Observational only.
    Error {
        /// Error description reported by the SDK.
        reason: String,
    },

    /// Generic SDK exception (device, bitrate, frame-rate warnings).
    Exception {
        /// SDK exception code.
        code: i32,
        /// Exception description.
        message: String,
    },

    /// Periodic network quality report.
    NetworkQuality {
        /// Uplink quality score as reported by the SDK.
        uplink: u8,
        /// Downlink quality score as reported by the SDK.
        downlink: u8,
    },

    /// A remote participant left the room.
    PeerLeave {
        /// Participant that left.
        participant: ParticipantId,
    },

    /// Subscription to a remote stream is established.
    StreamSubscribed {
        /// Subscribed remote stream.
        stream: MediaHandle,
    },

    /// A remote stream became available.
    StreamAdded {
        /// Newly available remote stream.
        stream: MediaHandle,
    },

    /// A remote stream was removed.
    StreamRemoved {
        /// Removed remote stream.
        stream: MediaHandle,
    },

    /// The local stream was published.
    StreamPublished {
        /// Published local stream.
        stream: MediaHandle,
    },

    /// Connection state of the underlying SDK client changed.
    ConnectionStateChanged {
        /// Previous SDK connection state.
        previous: String,
        /// Current SDK connection state.
        current: String,
    },
}

impl SdkEvent {
    /// Event name as emitted by the SDK.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Error { .. } => "error",
            Self::Exception { .. } => "exception",
            Self::NetworkQuality { .. } => "network-quality",
            Self::PeerLeave { .. } => "peer-leave",
            Self::StreamSubscribed { .. } => "stream-subscribed",
            Self::StreamAdded { .. } => "stream-added",
            Self::StreamRemoved { .. } => "stream-removed",
            Self::StreamPublished { .. } => "stream-published",
            Self::ConnectionStateChanged { .. } => "connection-state-changed",
        }
    }
}
