//! Lifecycle scenarios for `SessionClient` against the in-memory SDK.
//!
//! # Oracle Pattern
//!
//! Tests end with oracle checks on:
//! - the snapshot sequence a subscriber observed
//! - the SDK calls the client made

use std::time::Duration;

use mediaroom_core::{
    MediaHandle, Operation, Phase, PublishCompletion, SdkEvent, SessionClient, SessionConfig,
    SessionError, SessionState, SnapshotSource, UnpublishPolicy,
};
use mediaroom_harness::{CallRecord, SdkCall, SimSdk, SimSdkHandle, pump_pending};

fn client_with(config: SessionConfig) -> (SessionClient<SimSdk>, SimSdkHandle) {
    let sdk = SimSdk::new();
    let handle = sdk.handle();
    (SessionClient::new(sdk, config), handle)
}

fn client() -> (SessionClient<SimSdk>, SimSdkHandle) {
    client_with(SessionConfig::new("test-app"))
}

/// Initialized and joined as participant 1 in "room-A".
async fn joined_client() -> (SessionClient<SimSdk>, SimSdkHandle) {
    let (mut client, handle) = client();
    client.initialize().await.expect("initialize");
    client.join(1, "room-A").await.expect("join");
    (client, handle)
}

/// Joined with a subscribed remote stream for each of `peers`.
async fn client_with_peers(peers: &[u64]) -> (SessionClient<SimSdk>, SimSdkHandle) {
    let (mut client, handle) = joined_client().await;
    for &peer in peers {
        handle.peer_joins(peer);
    }
    pump_pending(&mut client).await;
    (client, handle)
}

#[tokio::test]
async fn initialize_produces_initialized_snapshot() {
    let (mut client, handle) = client();
    client.initialize().await.expect("initialize");

    let expected = SessionState { initialized: true, ..SessionState::default() };
    assert_eq!(*client.state(), expected);
    assert_eq!(handle.calls()[1], CallRecord::Init("test-app".into()));
}

#[tokio::test]
async fn join_adds_joined_and_nothing_else() {
    let (mut client, _handle) = client();
    client.initialize().await.expect("initialize");
    let before = client.state();

    client.join(7, "room-A").await.expect("join");

    assert_eq!(*client.state(), before.with_joined(true));
}

#[tokio::test]
async fn join_passes_room_participant_and_channel_key() {
    let (mut client, handle) = client_with(SessionConfig::new("app").with_channel_key("token"));
    client.initialize().await.expect("initialize");
    client.join(7, "room-A").await.expect("join");

    let joins: Vec<_> = handle
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            CallRecord::Join(request) => Some(request),
            _ => None,
        })
        .collect();
    assert_eq!(joins.len(), 1);
    assert_eq!(joins[0].room, "room-A");
    assert_eq!(joins[0].participant, 7);
    assert_eq!(joins[0].channel_key.as_deref(), Some("token"));
}

#[tokio::test]
async fn join_before_initialize_is_rejected_without_sdk_call() {
    let (mut client, handle) = client();

    let err = client.join(7, "room-A").await.unwrap_err();

    assert_eq!(err, SessionError::InvalidTransition {
        phase: Phase::Idle,
        operation: Operation::Join
    });
    assert!(handle.calls().is_empty());
}

#[tokio::test]
async fn sdk_failures_propagate_per_operation() {
    let (mut client, handle) = client();

    handle.fail_next(SdkCall::Init, "invalid vendor key");
    let err = client.initialize().await.unwrap_err();
    assert!(matches!(err, SessionError::Handshake(_)));
    assert_eq!(err.sdk_error().map(|e| e.reason.as_str()), Some("invalid vendor key"));

    client.initialize().await.expect("retry by caller succeeds");

    handle.fail_next(SdkCall::Join, "room full");
    assert!(matches!(client.join(1, "room-A").await, Err(SessionError::Join(_))));
    assert!(!client.state().joined);

    client.join(1, "room-A").await.expect("join");

    handle.fail_next(SdkCall::CreateCapture, "camera busy");
    assert!(matches!(client.create_local_capture(1).await, Err(SessionError::Capture(_))));
    assert!(client.capture().is_none());

    client.create_local_capture(1).await.expect("capture");
    handle.fail_next(SdkCall::Publish, "publish rejected");
    assert!(matches!(client.publish().await, Err(SessionError::Publish(_))));
    assert!(!client.state().publishing);

    handle.fail_next(SdkCall::Leave, "not connected");
    assert!(matches!(client.leave().await, Err(SessionError::Leave(_))));
    assert!(client.state().joined);
}

#[tokio::test]
async fn leave_when_not_joined_is_a_no_op() {
    let (mut client, handle) = client();
    client.leave().await.expect("leave while idle");

    client.initialize().await.expect("initialize");
    client.leave().await.expect("leave while initialized");

    assert!(!client.state().joined);
    assert_eq!(handle.count_calls(|c| matches!(c, CallRecord::Leave)), 0);
}

#[tokio::test]
async fn leave_twice_is_idempotent() {
    let (mut client, handle) = joined_client().await;

    client.leave().await.expect("first leave");
    client.leave().await.expect("second leave");

    assert!(!client.state().joined);
    assert_eq!(client.phase(), Phase::Initialized);
    assert_eq!(handle.count_calls(|c| matches!(c, CallRecord::Leave)), 1);
}

#[tokio::test]
async fn peer_leave_removes_remote_track() {
    let (mut client, handle) = client_with_peers(&[7]).await;
    let stream = client.state().remote_tracks[&7];
    assert!(handle.is_playing(&stream));

    handle.peer_leaves(7);
    pump_pending(&mut client).await;

    assert!(client.state().remote_tracks.is_empty());
    assert!(!handle.is_playing(&stream));
}

#[tokio::test]
async fn stream_removed_removes_remote_track() {
    let (mut client, handle) = client_with_peers(&[7, 8]).await;
    let stream = client.state().remote_tracks[&8];

    handle.emit(SdkEvent::StreamRemoved { stream });
    pump_pending(&mut client).await;

    let remaining: Vec<_> = client.state().remote_tracks.keys().copied().collect();
    assert_eq!(remaining, vec![7]);
}

#[tokio::test]
async fn stream_added_requests_audio_video_subscription() {
    let (mut client, handle) = joined_client().await;
    handle.set_emit_subscribed(false);

    let stream = handle.peer_joins(4);
    pump_pending(&mut client).await;

    assert!(handle.calls().iter().any(|c| matches!(
        c,
        CallRecord::Subscribe(s, opts) if *s == stream && opts.audio && opts.video
    )));
    assert!(client.state().remote_tracks.is_empty(), "stored only once subscribed");
}

#[tokio::test]
async fn subscribe_failure_is_logged_not_stored() {
    let (mut client, handle) = joined_client().await;
    handle.fail_next(SdkCall::Subscribe, "stream gone");

    handle.peer_joins(4);
    pump_pending(&mut client).await;

    assert!(client.state().remote_tracks.is_empty());
    assert!(client.state().joined);
}

#[tokio::test]
async fn error_and_exception_events_do_not_change_state() {
    let (mut client, handle) = joined_client().await;
    let mut sub = client.subscribe();
    let _ = sub.drain();
    let before = client.state();

    handle.emit(SdkEvent::Error { reason: "socket error".into() });
    handle.emit(SdkEvent::Exception { code: 2001, message: "audio input level too low".into() });
    handle.emit(SdkEvent::NetworkQuality { uplink: 1, downlink: 2 });
    pump_pending(&mut client).await;

    assert_eq!(client.state(), before);
    assert!(sub.drain().is_empty(), "no snapshot emitted");
}

#[tokio::test]
async fn events_before_join_are_ignored() {
    let (mut client, handle) = client();
    client.initialize().await.expect("initialize");

    let stream = handle.peer_joins(4);
    handle.emit(SdkEvent::StreamSubscribed { stream });
    pump_pending(&mut client).await;

    assert!(client.state().remote_tracks.is_empty());
    assert_eq!(handle.count_calls(|c| matches!(c, CallRecord::Subscribe(..))), 0);
}

#[tokio::test]
async fn publish_without_capture_resolves_without_change() {
    let (mut client, handle) = joined_client().await;
    let before = client.state();

    client.publish().await.expect("publish");

    assert_eq!(client.state(), before);
    assert!(!client.state().publishing);
    assert_eq!(handle.count_calls(|c| matches!(c, CallRecord::Publish(_))), 0);
}

#[tokio::test]
async fn publish_before_join_is_rejected() {
    let (mut client, _handle) = client();
    client.initialize().await.expect("initialize");
    client.create_local_capture(1).await.expect("capture");

    let err = client.publish().await.unwrap_err();
    assert_eq!(err, SessionError::InvalidTransition {
        phase: Phase::Initialized,
        operation: Operation::Publish
    });
}

#[tokio::test]
async fn start_session_publishes_local_capture() {
    let (mut client, handle) = client();
    let mut sub = client.subscribe();

    client.start_session(3, "room-A").await.expect("start");

    let state = client.state();
    let capture = client.capture().expect("capture open");
    assert!(state.initialized && state.joined && state.publishing);
    assert_eq!(state.local_track, Some(capture));
    assert_eq!(capture.owner(), 3);
    assert!(handle.calls().contains(&CallRecord::Publish(capture)));

    let phases: Vec<_> = sub.drain().iter().map(|s| s.phase()).collect();
    assert_eq!(phases.first(), Some(&Phase::Idle));
    assert_eq!(phases.last(), Some(&Phase::Publishing));
}

#[tokio::test(start_paused = true)]
async fn publish_falls_back_to_settle_delay_without_event() {
    let settle = Duration::from_millis(300);
    let (mut client, handle) = client_with(SessionConfig::new("app").with_publish_settle(settle));
    handle.set_emit_published(false);

    client.initialize().await.expect("initialize");
    client.join(1, "room-A").await.expect("join");
    client.create_local_capture(1).await.expect("capture");

    let start = tokio::time::Instant::now();
    client.publish().await.expect("publish");

    assert!(start.elapsed() >= settle);
    assert!(client.state().publishing);
    assert!(client.state().local_track.is_none(), "no published event, no local track");
}

#[tokio::test(start_paused = true)]
async fn slow_subscribe_during_publish_still_subscribes() {
    let settle = Duration::from_millis(300);
    let (mut client, handle) = client_with(SessionConfig::new("app").with_publish_settle(settle));
    handle.delay_next(SdkCall::Subscribe, Duration::from_secs(1));

    client.initialize().await.expect("initialize");
    client.join(1, "room-A").await.expect("join");
    let stream = handle.peer_joins(9);
    client.create_local_capture(1).await.expect("capture");

    client.publish().await.expect("publish");
    pump_pending(&mut client).await;

    assert_eq!(handle.count_calls(|c| matches!(c, CallRecord::Subscribe(..))), 1);
    assert_eq!(client.state().remote_tracks.get(&9), Some(&stream));
    assert!(client.state().publishing);
}

#[tokio::test(start_paused = true)]
async fn events_after_settle_fallback_are_still_applied() {
    let settle = Duration::from_millis(300);
    let (mut client, handle) = client_with(SessionConfig::new("app").with_publish_settle(settle));
    handle.set_emit_published(false);

    client.initialize().await.expect("initialize");
    client.join(1, "room-A").await.expect("join");
    client.create_local_capture(1).await.expect("capture");
    client.publish().await.expect("publish");

    let stream = handle.peer_joins(4);
    pump_pending(&mut client).await;

    assert_eq!(client.state().remote_tracks.get(&4), Some(&stream));
}

#[tokio::test(start_paused = true)]
async fn delay_completion_waits_full_settle() {
    let settle = Duration::from_millis(300);
    let config = SessionConfig::new("app")
        .with_publish_settle(settle)
        .with_publish_completion(PublishCompletion::Delay);
    let (mut client, _handle) = client_with(config);

    client.initialize().await.expect("initialize");
    client.join(1, "room-A").await.expect("join");
    client.create_local_capture(1).await.expect("capture");

    let start = tokio::time::Instant::now();
    client.publish().await.expect("publish");
    assert!(start.elapsed() >= settle);
    assert!(client.state().publishing);

    // Published event is still queued and lands on the next pump.
    pump_pending(&mut client).await;
    assert_eq!(client.state().local_track, client.capture());
}

#[tokio::test]
async fn unpublish_keeps_remote_tracks_by_default() {
    let (mut client, handle) = client_with_peers(&[7, 8]).await;
    client.create_local_capture(1).await.expect("capture");
    client.publish().await.expect("publish");
    let capture = client.capture().expect("capture");

    client.unpublish().await.expect("unpublish");

    let state = client.state();
    assert!(!state.publishing && state.joined);
    assert!(state.local_track.is_none());
    assert_eq!(state.remote_tracks.len(), 2);
    assert_eq!(handle.count_calls(|c| *c == CallRecord::CloseCapture(capture)), 1);
}

#[tokio::test]
async fn unpublish_can_also_stop_remote_tracks() {
    let config = SessionConfig::new("app").with_unpublish_policy(UnpublishPolicy::LocalAndRemote);
    let (mut client, handle) = client_with(config);
    client.initialize().await.expect("initialize");
    client.join(1, "room-A").await.expect("join");
    let remote = handle.peer_joins(7);
    pump_pending(&mut client).await;
    client.create_local_capture(1).await.expect("capture");
    client.publish().await.expect("publish");

    client.unpublish().await.expect("unpublish");

    let state = client.state();
    assert!(state.local_track.is_none());
    assert!(state.remote_tracks.is_empty());
    assert!(!handle.is_playing(&remote));
}

#[tokio::test]
async fn stop_session_leaves_and_clears_everything_remote() {
    let (mut client, handle) = client_with_peers(&[7]).await;
    client.create_local_capture(1).await.expect("capture");
    client.publish().await.expect("publish");

    client.stop_session().await.expect("stop");

    let state = client.state();
    assert_eq!(state.phase(), Phase::Initialized);
    assert!(state.local_track.is_none());
    assert!(state.remote_tracks.is_empty());
    assert!(client.capture().is_none());

    // Late events from the SDK no longer touch state.
    handle.peer_joins(9);
    pump_pending(&mut client).await;
    assert!(client.state().remote_tracks.is_empty());
}

#[tokio::test]
async fn remote_track_overwrite_and_remove() {
    let (mut client, handle) = joined_client().await;
    let h1 = MediaHandle::new(7, 100);
    let h2 = MediaHandle::new(7, 101);

    client.add_remote_track(7, h1);
    client.add_remote_track(7, h2);
    assert_eq!(client.state().remote_tracks.len(), 1);
    assert_eq!(client.state().remote_tracks.get(&7), Some(&h2));

    client.remove_remote_track(7);
    assert!(!client.state().remote_tracks.contains_key(&7));
    // Not playing in the SDK, so no stop call.
    assert_eq!(handle.count_calls(|c| matches!(c, CallRecord::StopPlayback(_))), 0);
}

#[tokio::test]
async fn stop_all_remote_tracks_leaves_local_track() {
    let (mut client, handle) = client_with_peers(&[7, 8]).await;
    client.create_local_capture(1).await.expect("capture");
    client.publish().await.expect("publish");
    let local = client.state().local_track;

    client.stop_all_remote_tracks();

    assert!(client.state().remote_tracks.is_empty());
    assert_eq!(client.state().local_track, local);
    assert_eq!(handle.count_calls(|c| matches!(c, CallRecord::StopPlayback(_))), 2);
}

#[tokio::test]
async fn remove_local_track_closes_capture() {
    let (mut client, handle) = joined_client().await;
    client.create_local_capture(1).await.expect("capture");
    client.publish().await.expect("publish");
    let local = client.state().local_track.expect("local track");

    client.remove_local_track();

    assert!(client.state().local_track.is_none());
    assert!(client.capture().is_none());
    assert!(handle.calls().contains(&CallRecord::CloseCapture(local)));
}

#[tokio::test]
async fn ended_event_stream_stops_processing() {
    let (mut client, handle) = joined_client().await;
    handle.close_events();

    assert!(!client.process_next_event().await);
}
