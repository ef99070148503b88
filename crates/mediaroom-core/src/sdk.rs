//! Media SDK abstraction.
//!
//! The [`MediaSdk`] trait is the seam between the session state machine and
//! the third-party SDK that does the real work: signaling, transport, codec
//! negotiation and device capture all live behind it. The session layer only
//! sequences these calls and folds their results into snapshots.
//!
//! # Implementations
//!
//! - **Production**: a binding to the vendor SDK
//! - **Simulation**: `mediaroom_harness::SimSdk`, an in-memory fake with
//!   scriptable failures and injectable events

use std::{fmt, future::Future};

use crate::{
    error::SdkError,
    event::SdkEvent,
    state::{MediaHandle, ParticipantId},
};

/// SDK client mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClientMode {
    /// Communication mode, every participant may publish.
    #[default]
    Rtc,
    /// Live broadcast mode.
    Live,
}

impl fmt::Display for ClientMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rtc => "rtc",
            Self::Live => "live",
        })
    }
}

/// Preferred video codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VideoCodec {
    /// H.264.
    #[default]
    H264,
    /// VP8.
    Vp8,
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::H264 => "h264",
            Self::Vp8 => "vp8",
        })
    }
}

/// Options for creating the SDK client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClientOptions {
    /// Client mode.
    pub mode: ClientMode,
    /// Video codec.
    pub codec: VideoCodec,
}

/// Room join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    /// Channel key (token). `None` for unauthenticated channels.
    pub channel_key: Option<String>,
    /// Room (channel) name.
    pub room: String,
    /// Local participant ID.
    pub participant: ParticipantId,
}

/// Local capture constraints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConstraints {
    /// Stream ID, usually the local participant ID.
    pub stream_id: ParticipantId,
    /// Capture audio.
    pub audio: bool,
    /// Capture video.
    pub video: bool,
    /// Camera device. Empty selects the default device.
    pub camera_id: String,
    /// Microphone device. Empty selects the default device.
    pub microphone_id: String,
    /// Mirror the local preview.
    pub mirror: bool,
}

impl CaptureConstraints {
    /// Audio and video on default devices, unmirrored.
    pub fn audio_video(stream_id: ParticipantId) -> Self {
        Self {
            stream_id,
            audio: true,
            video: true,
            camera_id: String::new(),
            microphone_id: String::new(),
            mirror: false,
        }
    }
}

/// Which media kinds to receive from a remote stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Receive audio.
    pub audio: bool,
    /// Receive video.
    pub video: bool,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self { audio: true, video: true }
    }
}

/// Real-time media SDK used by [`crate::SessionClient`].
///
/// Callback-style SDK operations are exposed as futures resolving once the
/// SDK reports success or failure.
pub trait MediaSdk: Send {
    /// Create the underlying SDK client.
    fn create_client(&mut self, options: ClientOptions) -> Result<(), SdkError>;

    /// Perform the handshake with the SDK service.
    fn init(&mut self, app_id: &str) -> impl Future<Output = Result<(), SdkError>> + Send;

    /// Join a room.
    fn join(&mut self, request: JoinRequest) -> impl Future<Output = Result<(), SdkError>> + Send;

    /// Leave the current room.
    fn leave(&mut self) -> impl Future<Output = Result<(), SdkError>> + Send;

    /// Create and initialize a local capture.
    fn create_capture(
        &mut self,
        constraints: CaptureConstraints,
    ) -> impl Future<Output = Result<MediaHandle, SdkError>> + Send;

    /// Publish a local capture to the room.
    ///
    /// Completion of the publish is signalled separately by
    /// [`SdkEvent::StreamPublished`].
    fn publish(
        &mut self,
        stream: &MediaHandle,
    ) -> impl Future<Output = Result<(), SdkError>> + Send;

    /// Request a subscription to a remote stream.
    ///
    /// Completion is signalled by [`SdkEvent::StreamSubscribed`].
    fn subscribe(
        &mut self,
        stream: &MediaHandle,
        options: SubscribeOptions,
    ) -> impl Future<Output = Result<(), SdkError>> + Send;

    /// Whether the stream is currently playing.
    fn is_playing(&self, stream: &MediaHandle) -> bool;

    /// Stop playback of a stream.
    fn stop_playback(&mut self, stream: &MediaHandle);

    /// Close a local capture and release its devices.
    fn close_capture(&mut self, stream: &MediaHandle);

    /// Next event from the SDK's event emitter.
    ///
    /// Returns `None` once the SDK will deliver no more events. Implementations
    /// MUST be cancel-safe: dropping the future before it resolves must not
    /// lose an event.
    fn next_event(&mut self) -> impl Future<Output = Option<SdkEvent>> + Send;
}
