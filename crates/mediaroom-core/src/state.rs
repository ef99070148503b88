//! Observable session state.
//!
//! [`SessionState`] is the single snapshot the UI layer renders from. It is a
//! value type: every lifecycle transition derives a new snapshot from the
//! previous one and the old value is dropped once no subscriber holds it.
//! Snapshots are shared as `Arc<SessionState>` and never mutated in place.

use std::{collections::BTreeMap, fmt};

/// Integer identifier of a participant within a room.
pub type ParticipantId = u64;

/// Opaque handle to an audio/video stream owned by the SDK.
///
/// `owner` is the stream id reported by the SDK: the remote participant for
/// inbound streams, the local participant for the local capture. `token`
/// distinguishes successive handles for the same owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaHandle {
    owner: ParticipantId,
    token: u64,
}

impl MediaHandle {
    /// Create a handle for the stream owned by `owner`.
    pub fn new(owner: ParticipantId, token: u64) -> Self {
        Self { owner, token }
    }

    /// Participant the stream belongs to.
    pub fn owner(&self) -> ParticipantId {
        self.owner
    }

    /// SDK-assigned token distinguishing handles of the same owner.
    pub fn token(&self) -> u64 {
        self.token
    }
}

impl fmt::Display for MediaHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream:{}#{}", self.owner, self.token)
    }
}

/// Complete session snapshot.
///
/// # Invariants
///
/// - `publishing` implies `joined`, and `joined` implies `initialized`.
/// - `remote_tracks` holds exactly one entry per remote participant with an
///   active inbound subscription.
/// - `local_track` is set only while the local capture is open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// SDK handshake completed.
    pub initialized: bool,
    /// Room membership active.
    pub joined: bool,
    /// Local media currently published.
    pub publishing: bool,
    /// Local capture handle, once the SDK confirmed the publish.
    pub local_track: Option<MediaHandle>,
    /// Subscribed remote streams keyed by participant.
    pub remote_tracks: BTreeMap<ParticipantId, MediaHandle>,
}

impl SessionState {
    /// Snapshot with `initialized` replaced.
    #[must_use]
    pub fn with_initialized(&self, initialized: bool) -> Self {
        Self { initialized, ..self.clone() }
    }

    /// Snapshot with `joined` replaced.
    #[must_use]
    pub fn with_joined(&self, joined: bool) -> Self {
        Self { joined, ..self.clone() }
    }

    /// Snapshot with `publishing` replaced.
    #[must_use]
    pub fn with_publishing(&self, publishing: bool) -> Self {
        Self { publishing, ..self.clone() }
    }

    /// Snapshot with `local_track` replaced.
    #[must_use]
    pub fn with_local_track(&self, local_track: Option<MediaHandle>) -> Self {
        Self { local_track, ..self.clone() }
    }

    /// Snapshot with `handle` stored for `participant`, replacing any previous
    /// entry.
    #[must_use]
    pub fn with_remote_track(&self, participant: ParticipantId, handle: MediaHandle) -> Self {
        let mut remote_tracks = self.remote_tracks.clone();
        remote_tracks.insert(participant, handle);
        Self { remote_tracks, ..self.clone() }
    }

    /// Snapshot without an entry for `participant`.
    #[must_use]
    pub fn without_remote_track(&self, participant: ParticipantId) -> Self {
        let mut remote_tracks = self.remote_tracks.clone();
        remote_tracks.remove(&participant);
        Self { remote_tracks, ..self.clone() }
    }

    /// Snapshot with no remote tracks.
    #[must_use]
    pub fn without_remote_tracks(&self) -> Self {
        Self { remote_tracks: BTreeMap::new(), ..self.clone() }
    }

    /// Lifecycle phase derived from the boolean flags.
    pub fn phase(&self) -> Phase {
        Phase::of(self)
    }

    /// Check the `publishing ⇒ joined ⇒ initialized` chain.
    pub fn is_consistent(&self) -> bool {
        (!self.publishing || self.joined) && (!self.joined || self.initialized)
    }
}

/// Session lifecycle phase.
///
/// ```text
/// ┌──────┐ initialize ┌─────────────┐ join ┌────────┐ publish ┌────────────┐
/// │ Idle │───────────>│ Initialized │─────>│ Joined │────────>│ Publishing │
/// └──────┘            └─────────────┘      └────────┘         └────────────┘
///                          ^  ^   leave        │  ^  unpublish      │
///                          │  └────────────────┘  └─────────────────┤
///                          └────────────────────── leave ───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// SDK not initialized.
    Idle,
    /// Handshake done, not in a room.
    Initialized,
    /// In a room, not publishing.
    Joined,
    /// In a room with local media published.
    Publishing,
}

impl Phase {
    /// Derive the phase of a snapshot. The highest set flag wins.
    pub fn of(state: &SessionState) -> Self {
        if state.publishing {
            Self::Publishing
        } else if state.joined {
            Self::Joined
        } else if state.initialized {
            Self::Initialized
        } else {
            Self::Idle
        }
    }

    /// Whether room membership is active.
    pub fn in_room(self) -> bool {
        matches!(self, Self::Joined | Self::Publishing)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Initialized => "initialized",
            Self::Joined => "joined",
            Self::Publishing => "publishing",
        };
        f.write_str(name)
    }
}
