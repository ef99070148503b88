//! In-memory media SDK.
//!
//! `SimSdk` implements [`MediaSdk`] without any network or devices. It keeps
//! a log of every call, can fail calls on demand, and emits the follow-up
//! events a real SDK would (stream-published after publish, stream-subscribed
//! after subscribe). Calls can also be slowed down on demand to model SDK
//! latency. A cloneable [`SimSdkHandle`] stays with the test while the
//! SDK itself moves into the [`mediaroom_core::SessionClient`].

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use mediaroom_core::{
    CaptureConstraints, ClientOptions, JoinRequest, MediaHandle, MediaSdk, ParticipantId,
    SdkError, SdkEvent, SubscribeOptions,
};
use tokio::sync::mpsc;

/// SDK operation kinds that can be scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SdkCall {
    /// `create_client`.
    CreateClient,
    /// `init`.
    Init,
    /// `join`.
    Join,
    /// `leave`.
    Leave,
    /// `create_capture`.
    CreateCapture,
    /// `publish`.
    Publish,
    /// `subscribe`.
    Subscribe,
}

/// Recorded SDK call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallRecord {
    /// Client created.
    CreateClient(ClientOptions),
    /// Handshake with the given app identifier.
    Init(String),
    /// Room join.
    Join(JoinRequest),
    /// Room leave.
    Leave,
    /// Capture created with the given constraints.
    CreateCapture(CaptureConstraints),
    /// Capture published.
    Publish(MediaHandle),
    /// Remote stream subscription requested.
    Subscribe(MediaHandle, SubscribeOptions),
    /// Playback stopped.
    StopPlayback(MediaHandle),
    /// Capture closed.
    CloseCapture(MediaHandle),
}

struct Shared {
    calls: Vec<CallRecord>,
    failures: HashMap<SdkCall, VecDeque<SdkError>>,
    delays: HashMap<SdkCall, VecDeque<Duration>>,
    playing: HashSet<MediaHandle>,
    next_token: u64,
    emit_published: bool,
    emit_subscribed: bool,
    events_tx: Option<mpsc::UnboundedSender<SdkEvent>>,
}

impl Shared {
    fn record(&mut self, call: CallRecord) {
        self.calls.push(call);
    }

    fn take_failure(&mut self, call: SdkCall) -> Result<(), SdkError> {
        match self.failures.get_mut(&call).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn take_delay(&mut self, call: SdkCall) -> Option<Duration> {
        self.delays.get_mut(&call).and_then(VecDeque::pop_front)
    }

    fn emit(&self, event: SdkEvent) {
        if let Some(tx) = &self.events_tx {
            let _ = tx.send(event);
        }
    }

    fn next_token(&mut self) -> u64 {
        self.next_token += 1;
        self.next_token
    }
}

/// In-memory [`MediaSdk`].
pub struct SimSdk {
    shared: Arc<Mutex<Shared>>,
    events_rx: mpsc::UnboundedReceiver<SdkEvent>,
}

impl Default for SimSdk {
    fn default() -> Self {
        Self::new()
    }
}

impl SimSdk {
    /// Create an SDK that auto-emits publish and subscribe completions.
    pub fn new() -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let shared = Shared {
            calls: Vec::new(),
            failures: HashMap::new(),
            delays: HashMap::new(),
            playing: HashSet::new(),
            next_token: 0,
            emit_published: true,
            emit_subscribed: true,
            events_tx: Some(events_tx),
        };
        Self { shared: Arc::new(Mutex::new(shared)), events_rx }
    }

    /// Control handle for this SDK.
    pub fn handle(&self) -> SimSdkHandle {
        SimSdkHandle { shared: Arc::clone(&self.shared) }
    }

    /// Whether events are queued for [`MediaSdk::next_event`].
    pub fn has_pending_events(&self) -> bool {
        !self.events_rx.is_empty()
    }
}

impl MediaSdk for SimSdk {
    fn create_client(&mut self, options: ClientOptions) -> Result<(), SdkError> {
        let mut shared = lock(&self.shared);
        shared.record(CallRecord::CreateClient(options));
        shared.take_failure(SdkCall::CreateClient)
    }

    async fn init(&mut self, app_id: &str) -> Result<(), SdkError> {
        pause(&self.shared, SdkCall::Init).await;
        let mut shared = lock(&self.shared);
        shared.record(CallRecord::Init(app_id.to_string()));
        shared.take_failure(SdkCall::Init)
    }

    async fn join(&mut self, request: JoinRequest) -> Result<(), SdkError> {
        pause(&self.shared, SdkCall::Join).await;
        let mut shared = lock(&self.shared);
        shared.record(CallRecord::Join(request));
        shared.take_failure(SdkCall::Join)
    }

    async fn leave(&mut self) -> Result<(), SdkError> {
        pause(&self.shared, SdkCall::Leave).await;
        let mut shared = lock(&self.shared);
        shared.record(CallRecord::Leave);
        shared.take_failure(SdkCall::Leave)
    }

    async fn create_capture(
        &mut self,
        constraints: CaptureConstraints,
    ) -> Result<MediaHandle, SdkError> {
        pause(&self.shared, SdkCall::CreateCapture).await;
        let mut shared = lock(&self.shared);
        let stream_id = constraints.stream_id;
        shared.record(CallRecord::CreateCapture(constraints));
        shared.take_failure(SdkCall::CreateCapture)?;

        let handle = MediaHandle::new(stream_id, shared.next_token());
        shared.playing.insert(handle);
        Ok(handle)
    }

    async fn publish(&mut self, stream: &MediaHandle) -> Result<(), SdkError> {
        pause(&self.shared, SdkCall::Publish).await;
        let mut shared = lock(&self.shared);
        shared.record(CallRecord::Publish(*stream));
        shared.take_failure(SdkCall::Publish)?;

        if shared.emit_published {
            shared.emit(SdkEvent::StreamPublished { stream: *stream });
        }
        Ok(())
    }

    async fn subscribe(
        &mut self,
        stream: &MediaHandle,
        options: SubscribeOptions,
    ) -> Result<(), SdkError> {
        pause(&self.shared, SdkCall::Subscribe).await;
        let mut shared = lock(&self.shared);
        shared.record(CallRecord::Subscribe(*stream, options));
        shared.take_failure(SdkCall::Subscribe)?;

        shared.playing.insert(*stream);
        if shared.emit_subscribed {
            shared.emit(SdkEvent::StreamSubscribed { stream: *stream });
        }
        Ok(())
    }

    fn is_playing(&self, stream: &MediaHandle) -> bool {
        lock(&self.shared).playing.contains(stream)
    }

    fn stop_playback(&mut self, stream: &MediaHandle) {
        let mut shared = lock(&self.shared);
        shared.record(CallRecord::StopPlayback(*stream));
        shared.playing.remove(stream);
    }

    fn close_capture(&mut self, stream: &MediaHandle) {
        let mut shared = lock(&self.shared);
        shared.record(CallRecord::CloseCapture(*stream));
        shared.playing.remove(stream);
    }

    async fn next_event(&mut self) -> Option<SdkEvent> {
        self.events_rx.recv().await
    }
}

/// Cloneable control handle for a [`SimSdk`].
#[derive(Clone)]
pub struct SimSdkHandle {
    shared: Arc<Mutex<Shared>>,
}

impl SimSdkHandle {
    /// Queue an SDK event.
    pub fn emit(&self, event: SdkEvent) {
        lock(&self.shared).emit(event);
    }

    /// Announce a remote participant's stream. Returns its handle.
    pub fn peer_joins(&self, participant: ParticipantId) -> MediaHandle {
        let mut shared = lock(&self.shared);
        let stream = MediaHandle::new(participant, shared.next_token());
        shared.emit(SdkEvent::StreamAdded { stream });
        stream
    }

    /// Announce that a remote participant left.
    pub fn peer_leaves(&self, participant: ParticipantId) {
        self.emit(SdkEvent::PeerLeave { participant });
    }

    /// Fail the next call of `call` with `reason`.
    pub fn fail_next(&self, call: SdkCall, reason: &str) {
        lock(&self.shared).failures.entry(call).or_default().push_back(SdkError::new(reason));
    }

    /// Delay the next call of `call` by `delay` before it takes effect.
    pub fn delay_next(&self, call: SdkCall, delay: Duration) {
        lock(&self.shared).delays.entry(call).or_default().push_back(delay);
    }

    /// Toggle the automatic stream-published event after publish.
    pub fn set_emit_published(&self, enabled: bool) {
        lock(&self.shared).emit_published = enabled;
    }

    /// Toggle the automatic stream-subscribed event after subscribe.
    pub fn set_emit_subscribed(&self, enabled: bool) {
        lock(&self.shared).emit_subscribed = enabled;
    }

    /// End the SDK event stream once queued events are consumed.
    pub fn close_events(&self) {
        lock(&self.shared).events_tx = None;
    }

    /// Every recorded call, in order.
    pub fn calls(&self) -> Vec<CallRecord> {
        lock(&self.shared).calls.clone()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count_calls<F>(&self, predicate: F) -> usize
    where
        F: Fn(&CallRecord) -> bool,
    {
        lock(&self.shared).calls.iter().filter(|c| predicate(c)).count()
    }

    /// Whether `stream` is playing.
    pub fn is_playing(&self, stream: &MediaHandle) -> bool {
        lock(&self.shared).playing.contains(stream)
    }
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sleep for the scripted delay of `call`, if any. The lock is released first.
async fn pause(shared: &Mutex<Shared>, call: SdkCall) {
    let delay = lock(shared).take_delay(call);
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}
