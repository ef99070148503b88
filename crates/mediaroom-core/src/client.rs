//! Session client.
//!
//! [`SessionClient`] sequences the SDK lifecycle (initialize, join, publish,
//! unpublish, leave) and folds every result into a new [`SessionState`]
//! snapshot committed through its [`StateBroadcaster`].
//!
//! # Commit contract
//!
//! Each mutating operation computes the next snapshot from the current one
//! plus the single changed field, stores it, then broadcasts it. Snapshots
//! are never edited in place.
//!
//! # Event handling
//!
//! SDK events queue inside the SDK until the owner calls
//! [`SessionClient::process_next_event`] (or until [`SessionClient::publish`]
//! drains them while waiting for its completion event). Explicit calls and
//! SDK callbacks therefore never interleave, and every transition reads the
//! latest snapshot.

use std::sync::Arc;

use tokio::time::Instant;

use crate::{
    broadcast::{SnapshotSource, StateBroadcaster, Subscription},
    config::{PublishCompletion, SessionConfig, UnpublishPolicy},
    error::SessionError,
    event::SdkEvent,
    sdk::{CaptureConstraints, ClientOptions, JoinRequest, MediaSdk, SubscribeOptions},
    state::{MediaHandle, ParticipantId, Phase, SessionState},
    transition::{Operation, Reaction, Transition},
};

/// Lifecycle adapter over a [`MediaSdk`].
pub struct SessionClient<S: MediaSdk> {
    sdk: S,
    config: SessionConfig,
    broadcaster: StateBroadcaster,
    /// Local capture created but not yet closed.
    capture: Option<MediaHandle>,
}

impl<S: MediaSdk> SessionClient<S> {
    /// Create a client in the idle phase.
    pub fn new(sdk: S, config: SessionConfig) -> Self {
        Self { sdk, config, broadcaster: StateBroadcaster::new(), capture: None }
    }

    /// Current snapshot.
    pub fn state(&self) -> Arc<SessionState> {
        self.broadcaster.current()
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        self.state().phase()
    }

    /// Handle to the snapshot broadcaster.
    pub fn broadcaster(&self) -> &StateBroadcaster {
        &self.broadcaster
    }

    /// Local capture awaiting or in publish. `None` if none is open.
    pub fn capture(&self) -> Option<MediaHandle> {
        self.capture
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Wrapped SDK.
    pub fn sdk(&self) -> &S {
        &self.sdk
    }

    /// Wrapped SDK, mutably.
    pub fn sdk_mut(&mut self) -> &mut S {
        &mut self.sdk
    }

    /// Create the SDK client and perform the handshake.
    ///
    /// No-op once initialized.
    pub async fn initialize(&mut self) -> Result<(), SessionError> {
        if self.check(Operation::Initialize)? == Transition::Stay {
            return Ok(());
        }

        let options = ClientOptions { mode: self.config.mode, codec: self.config.codec };
        self.sdk.create_client(options).map_err(SessionError::Handshake)?;
        self.sdk.init(&self.config.app_id).await.map_err(SessionError::Handshake)?;

        tracing::info!(mode = %options.mode, codec = %options.codec, "SDK initialized");
        self.commit(|s| s.with_initialized(true));
        Ok(())
    }

    /// Join `room` as `participant`.
    ///
    /// Rejected before [`Self::initialize`]; no-op while already in a room.
    pub async fn join(
        &mut self,
        participant: ParticipantId,
        room: &str,
    ) -> Result<(), SessionError> {
        if self.check(Operation::Join)? == Transition::Stay {
            return Ok(());
        }

        let request = JoinRequest {
            channel_key: self.config.channel_key.clone(),
            room: room.to_string(),
            participant,
        };
        self.sdk.join(request).await.map_err(SessionError::Join)?;

        tracing::info!(participant, room, "joined room");
        self.commit(|s| s.with_joined(true));
        Ok(())
    }

    /// Leave the room, dropping every remote subscription.
    ///
    /// No-op when not in a room.
    pub async fn leave(&mut self) -> Result<(), SessionError> {
        if self.check(Operation::Leave)? == Transition::Stay {
            return Ok(());
        }

        self.sdk.leave().await.map_err(SessionError::Leave)?;

        let remote: Vec<MediaHandle> = self.state().remote_tracks.values().copied().collect();
        self.stop_playing(&remote);

        tracing::info!(dropped_remote = remote.len(), "left room");
        self.commit(|s| s.with_joined(false).with_publishing(false).without_remote_tracks());
        Ok(())
    }

    /// Create and initialize the local audio/video capture.
    ///
    /// The handle is held until [`Self::publish`]; it reaches the snapshot
    /// only once the SDK reports it published.
    pub async fn create_local_capture(
        &mut self,
        participant: ParticipantId,
    ) -> Result<MediaHandle, SessionError> {
        let constraints = CaptureConstraints::audio_video(participant);
        let handle = self.sdk.create_capture(constraints).await.map_err(SessionError::Capture)?;

        if let Some(previous) = self.capture.replace(handle) {
            tracing::debug!(%previous, "replacing open capture");
            self.sdk.close_capture(&previous);
        }

        tracing::debug!(%handle, "local capture ready");
        Ok(handle)
    }

    /// Publish the local capture.
    ///
    /// No-op without a capture. Rejected before [`Self::join`].
    pub async fn publish(&mut self) -> Result<(), SessionError> {
        let Some(capture) = self.capture else {
            tracing::debug!("publish without local capture");
            return Ok(());
        };
        if self.check(Operation::Publish)? == Transition::Stay {
            return Ok(());
        }

        self.sdk.publish(&capture).await.map_err(SessionError::Publish)?;
        self.await_publish_settled().await;

        tracing::info!(%capture, "publishing");
        self.commit(|s| s.with_publishing(true));
        Ok(())
    }

    /// Close the local capture and stop publishing.
    ///
    /// With [`UnpublishPolicy::LocalAndRemote`] every remote track is stopped
    /// as well.
    pub async fn unpublish(&mut self) -> Result<(), SessionError> {
        let transition = self.check(Operation::Unpublish)?;

        let published = self.state().local_track;
        let capture = self.capture.take();
        if let Some(capture) = capture {
            self.sdk.close_capture(&capture);
        }
        if let Some(local) = published.filter(|local| Some(*local) != capture) {
            self.sdk.close_capture(&local);
        }

        if transition != Transition::Stay || published.is_some() {
            self.commit(|s| s.with_local_track(None).with_publishing(false));
        }

        if self.config.unpublish_policy == UnpublishPolicy::LocalAndRemote {
            self.stop_all_remote_tracks();
        }
        Ok(())
    }

    /// Initialize, join, create the local capture and publish it.
    pub async fn start_session(
        &mut self,
        participant: ParticipantId,
        room: &str,
    ) -> Result<(), SessionError> {
        self.initialize().await?;
        self.join(participant, room).await?;
        self.create_local_capture(participant).await?;
        self.publish().await
    }

    /// Unpublish and leave.
    pub async fn stop_session(&mut self) -> Result<(), SessionError> {
        self.unpublish().await?;
        self.leave().await
    }

    /// Store a remote stream, replacing any previous one for `participant`.
    pub fn add_remote_track(&mut self, participant: ParticipantId, handle: MediaHandle) {
        tracing::debug!(participant, %handle, "remote track added");
        self.commit(|s| s.with_remote_track(participant, handle));
    }

    /// Stop and drop the remote stream of `participant`, if any.
    pub fn remove_remote_track(&mut self, participant: ParticipantId) {
        let Some(handle) = self.state().remote_tracks.get(&participant).copied() else {
            return;
        };
        self.stop_playing(&[handle]);

        tracing::debug!(participant, %handle, "remote track removed");
        self.commit(|s| s.without_remote_track(participant));
    }

    /// Stop and drop every remote stream.
    pub fn stop_all_remote_tracks(&mut self) {
        let remote: Vec<MediaHandle> = self.state().remote_tracks.values().copied().collect();
        if remote.is_empty() {
            return;
        }
        self.stop_playing(&remote);

        tracing::debug!(count = remote.len(), "all remote tracks stopped");
        self.commit(SessionState::without_remote_tracks);
    }

    /// Record the published local stream.
    pub fn set_local_track(&mut self, handle: MediaHandle) {
        self.commit(|s| s.with_local_track(Some(handle)));
    }

    /// Close and clear the local stream in the snapshot.
    pub fn remove_local_track(&mut self) {
        let Some(local) = self.state().local_track else {
            return;
        };
        self.sdk.close_capture(&local);
        if self.capture == Some(local) {
            self.capture = None;
        }
        self.commit(|s| s.with_local_track(None));
    }

    /// Wait for and apply the next SDK event.
    ///
    /// Returns `false` once the SDK event stream has ended.
    pub async fn process_next_event(&mut self) -> bool {
        match self.sdk.next_event().await {
            Some(event) => {
                self.handle_event(event).await;
                true
            },
            None => false,
        }
    }

    /// Apply an SDK event according to the current phase.
    pub async fn handle_event(&mut self, event: SdkEvent) {
        let phase = self.phase();
        match phase.react(&event) {
            Reaction::Ignore => {
                tracing::trace!(event = event.name(), %phase, "event ignored outside room");
            },
            Reaction::Log => log_event(&event),
            Reaction::Subscribe(stream) => {
                tracing::debug!(%stream, "remote stream available");
                if let Err(e) = self.sdk.subscribe(&stream, SubscribeOptions::default()).await {
                    tracing::warn!(%stream, error = %e, "subscribe failed");
                }
            },
            Reaction::AddRemote(participant, stream) => self.add_remote_track(participant, stream),
            Reaction::RemoveRemote(participant) => self.remove_remote_track(participant),
            Reaction::SetLocal(stream) => {
                tracing::debug!(%stream, "local stream published");
                self.set_local_track(stream);
            },
        }
    }

    /// Drain SDK events until the stream-published event or the settle bound.
    ///
    /// Only the wait for the next event is bounded. An event already taken
    /// from the SDK is always handled to completion, even past the deadline.
    async fn await_publish_settled(&mut self) {
        let settle = self.config.publish_settle;
        if self.config.publish_completion == PublishCompletion::Delay {
            tokio::time::sleep(settle).await;
            return;
        }

        let deadline = Instant::now() + settle;
        loop {
            match tokio::time::timeout_at(deadline, self.sdk.next_event()).await {
                Ok(Some(event)) => {
                    let done = matches!(event, SdkEvent::StreamPublished { .. });
                    self.handle_event(event).await;
                    if done {
                        return;
                    }
                },
                Ok(None) => {
                    tracing::warn!("SDK event stream ended before publish settled");
                    return;
                },
                Err(_) => {
                    tracing::warn!(?settle, "no stream-published event, settling");
                    return;
                },
            }
        }
    }

    fn check(&self, operation: Operation) -> Result<Transition, SessionError> {
        let phase = self.phase();
        match phase.transition(operation) {
            Transition::Reject => {
                tracing::warn!(%operation, %phase, "rejected out-of-order call");
                Err(SessionError::InvalidTransition { phase, operation })
            },
            transition => Ok(transition),
        }
    }

    fn stop_playing(&mut self, streams: &[MediaHandle]) {
        for stream in streams {
            if self.sdk.is_playing(stream) {
                self.sdk.stop_playback(stream);
            }
        }
    }

    fn commit<F>(&self, update: F) -> Arc<SessionState>
    where
        F: FnOnce(&SessionState) -> SessionState,
    {
        let next = update(&self.broadcaster.current());
        debug_assert!(next.is_consistent(), "inconsistent snapshot: {next:?}");
        tracing::debug!(
            phase = %next.phase(),
            local = next.local_track.is_some(),
            remote = next.remote_tracks.len(),
            "snapshot committed"
        );
        self.broadcaster.commit(next)
    }
}

impl<S: MediaSdk> SnapshotSource for SessionClient<S> {
    fn subscribe(&self) -> Subscription {
        self.broadcaster.subscribe()
    }
}

fn log_event(event: &SdkEvent) {
    match event {
        SdkEvent::Error { reason } => tracing::warn!(%reason, "SDK error"),
        SdkEvent::Exception { code, message } => {
            tracing::warn!(code, %message, "SDK exception");
        },
        SdkEvent::NetworkQuality { uplink, downlink } => {
            tracing::debug!(uplink, downlink, "network quality");
        },
        SdkEvent::ConnectionStateChanged { previous, current } => {
            tracing::debug!(%previous, %current, "connection state changed");
        },
        other => tracing::debug!(event = other.name(), "SDK event"),
    }
}
