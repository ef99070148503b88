//! Simulation harness for mediaroom.
//!
//! [`SimSdk`] stands in for the vendor media SDK so the exact
//! [`SessionClient`] code used in production can be driven deterministically
//! in tests and in the `mediaroom-sim` binary.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod sim_sdk;

use mediaroom_core::{ParticipantId, SessionClient};
pub use sim_sdk::{CallRecord, SdkCall, SimSdk, SimSdkHandle};

/// Apply every event currently queued in the SDK, including events emitted
/// while applying them. Returns the number of events applied.
pub async fn pump_pending(client: &mut SessionClient<SimSdk>) -> usize {
    let mut applied = 0;
    while client.sdk().has_pending_events() {
        if !client.process_next_event().await {
            break;
        }
        applied += 1;
    }
    applied
}

/// IDs for `count` simulated peers numbered after `uid`.
///
/// Stops at the last ID that fits in a [`ParticipantId`].
pub fn peer_ids(uid: ParticipantId, count: u64) -> Vec<ParticipantId> {
    (1..=count).map_while(|n| uid.checked_add(n)).collect()
}
