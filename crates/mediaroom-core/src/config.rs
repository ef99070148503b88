//! Session configuration.
//!
//! The application identifier is the only required value and is read once
//! from the process environment at startup. Everything else has defaults
//! matching the SDK's usual web setup (rtc mode, h264).

use std::time::Duration;

use crate::{
    error::ConfigError,
    sdk::{ClientMode, VideoCodec},
};

/// Environment variable holding the SDK application identifier.
pub const APP_ID_VAR: &str = "MEDIAROOM_APP_ID";

/// Environment variable holding an optional channel key (join token).
pub const CHANNEL_KEY_VAR: &str = "MEDIAROOM_CHANNEL_KEY";

/// Time allowed for a publish to settle before it is considered done.
pub const DEFAULT_PUBLISH_SETTLE: Duration = Duration::from_millis(300);

/// How `publish` decides the local stream is live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishCompletion {
    /// Wait for the SDK's stream-published event, falling back to the settle
    /// delay if it never arrives.
    #[default]
    Event,
    /// Wait the settle delay unconditionally.
    Delay,
}

/// What `unpublish` tears down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnpublishPolicy {
    /// Only the local capture.
    #[default]
    LocalOnly,
    /// The local capture and every remote track.
    LocalAndRemote,
}

/// Session configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// SDK application identifier used for the handshake.
    pub app_id: String,
    /// Channel key passed on join. `None` for unauthenticated channels.
    pub channel_key: Option<String>,
    /// SDK client mode.
    pub mode: ClientMode,
    /// Preferred video codec.
    pub codec: VideoCodec,
    /// Upper bound on publish completion.
    pub publish_settle: Duration,
    /// Publish completion strategy.
    pub publish_completion: PublishCompletion,
    /// Unpublish scope.
    pub unpublish_policy: UnpublishPolicy,
}

impl SessionConfig {
    /// Configuration with defaults for everything but the app identifier.
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            channel_key: None,
            mode: ClientMode::default(),
            codec: VideoCodec::default(),
            publish_settle: DEFAULT_PUBLISH_SETTLE,
            publish_completion: PublishCompletion::default(),
            unpublish_policy: UnpublishPolicy::default(),
        }
    }

    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using `lookup` to resolve environment variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let app_id = lookup(APP_ID_VAR).ok_or(ConfigError::MissingAppId { var: APP_ID_VAR })?;
        let app_id = app_id.trim();
        if app_id.is_empty() {
            return Err(ConfigError::BlankAppId { var: APP_ID_VAR });
        }

        let mut config = Self::new(app_id);
        config.channel_key = lookup(CHANNEL_KEY_VAR).filter(|key| !key.trim().is_empty());
        Ok(config)
    }

    /// Set the channel key.
    #[must_use]
    pub fn with_channel_key(mut self, key: impl Into<String>) -> Self {
        self.channel_key = Some(key.into());
        self
    }

    /// Set the publish settle bound.
    #[must_use]
    pub fn with_publish_settle(mut self, settle: Duration) -> Self {
        self.publish_settle = settle;
        self
    }

    /// Set the publish completion strategy.
    #[must_use]
    pub fn with_publish_completion(mut self, completion: PublishCompletion) -> Self {
        self.publish_completion = completion;
        self
    }

    /// Set the unpublish scope.
    #[must_use]
    pub fn with_unpublish_policy(mut self, policy: UnpublishPolicy) -> Self {
        self.unpublish_policy = policy;
        self
    }
}
