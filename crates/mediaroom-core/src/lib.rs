//! Mediaroom core
//!
//! Session lifecycle adapter for third-party real-time media SDKs. Sequences
//! the SDK's asynchronous lifecycle calls, translates its events into a
//! single immutable state snapshot, and republishes each snapshot to
//! subscribers.
//!
//! # Components
//!
//! - [`SessionClient`]: lifecycle operations over a [`MediaSdk`]
//! - [`SessionState`]: the immutable snapshot and its derived [`Phase`]
//! - [`StateBroadcaster`]: current snapshot plus fan-out to [`Subscription`]s
//! - [`Phase::transition`] / [`Phase::react`]: declarative transition tables
//! - [`SessionConfig`]: application identifier and lifecycle knobs
//!
//! Media transport, codecs and signaling are entirely the SDK's business.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod broadcast;
mod client;
mod config;
mod error;
mod event;
mod sdk;
mod state;
mod transition;

pub use broadcast::{SnapshotSource, StateBroadcaster, Subscription};
pub use client::SessionClient;
pub use config::{
    APP_ID_VAR, CHANNEL_KEY_VAR, DEFAULT_PUBLISH_SETTLE, PublishCompletion, SessionConfig,
    UnpublishPolicy,
};
pub use error::{ConfigError, SdkError, SessionError};
pub use event::SdkEvent;
pub use sdk::{
    CaptureConstraints, ClientMode, ClientOptions, JoinRequest, MediaSdk, SubscribeOptions,
    VideoCodec,
};
pub use state::{MediaHandle, ParticipantId, Phase, SessionState};
pub use transition::{Operation, Reaction, Transition};
