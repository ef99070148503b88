//! Declarative transition and reaction tables.
//!
//! Lifecycle operations and SDK events are resolved against the current
//! [`Phase`] through two pure lookups:
//!
//! - [`Phase::transition`] decides whether an [`Operation`] advances the
//!   session, leaves it where it is, or is rejected as out of order.
//! - [`Phase::react`] decides what an [`SdkEvent`] does. Outside a room every
//!   event is ignored, which scopes event handling to the join/leave window
//!   without attaching or detaching handlers.

use std::fmt;

use crate::{
    event::SdkEvent,
    state::{MediaHandle, ParticipantId, Phase},
};

/// Lifecycle operation that may change the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// SDK handshake.
    Initialize,
    /// Enter a room.
    Join,
    /// Leave the room.
    Leave,
    /// Publish the local capture.
    Publish,
    /// Stop publishing the local capture.
    Unpublish,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Initialize => "initialize",
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Publish => "publish",
            Self::Unpublish => "unpublish",
        };
        f.write_str(name)
    }
}

/// Outcome of applying an [`Operation`] in a [`Phase`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Perform the operation and move to the given phase on success.
    Advance(Phase),
    /// Already in the target phase (or nothing to undo).
    Stay,
    /// Out-of-order call.
    Reject,
}

/// What the client does with an SDK event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    /// Drop the event.
    Ignore,
    /// Log the event without touching state.
    Log,
    /// Ask the SDK to subscribe to a remote stream.
    Subscribe(MediaHandle),
    /// Store a subscribed remote stream.
    AddRemote(ParticipantId, MediaHandle),
    /// Stop and drop a remote stream.
    RemoveRemote(ParticipantId),
    /// Record the published local stream.
    SetLocal(MediaHandle),
}

impl Phase {
    /// Transition table for lifecycle operations.
    pub fn transition(self, operation: Operation) -> Transition {
        use Operation::{Initialize, Join, Leave, Publish, Unpublish};
        use Phase::{Idle, Initialized, Joined, Publishing};

        match (self, operation) {
            (Idle, Initialize) => Transition::Advance(Initialized),
            (Initialized | Joined | Publishing, Initialize) => Transition::Stay,

            (Initialized, Join) => Transition::Advance(Joined),
            (Joined | Publishing, Join) => Transition::Stay,
            (Idle, Join) => Transition::Reject,

            (Joined | Publishing, Leave) => Transition::Advance(Initialized),
            (Idle | Initialized, Leave) => Transition::Stay,

            (Joined, Publish) => Transition::Advance(Publishing),
            (Publishing, Publish) => Transition::Stay,
            (Idle | Initialized, Publish) => Transition::Reject,

            (Publishing, Unpublish) => Transition::Advance(Joined),
            (Idle | Initialized | Joined, Unpublish) => Transition::Stay,
        }
    }

    /// Reaction table for SDK events.
    pub fn react(self, event: &SdkEvent) -> Reaction {
        if !self.in_room() {
            return Reaction::Ignore;
        }

        match event {
            SdkEvent::Error { .. }
            | SdkEvent::Exception { .. }
            | SdkEvent::NetworkQuality { .. }
            | SdkEvent::ConnectionStateChanged { .. } => Reaction::Log,
            SdkEvent::PeerLeave { participant } => Reaction::RemoveRemote(*participant),
            SdkEvent::StreamAdded { stream } => Reaction::Subscribe(*stream),
            SdkEvent::StreamSubscribed { stream } => Reaction::AddRemote(stream.owner(), *stream),
            SdkEvent::StreamRemoved { stream } => Reaction::RemoveRemote(stream.owner()),
            SdkEvent::StreamPublished { stream } => Reaction::SetLocal(*stream),
        }
    }
}
