use std::env;

use chrono::Duration;

use crate::authz::ExistencePolicy;

/// Environment variable overriding the token lifetime, in whole seconds.
pub const MAX_TOKEN_AGE_ENV: &str = "WARDEN_TOKEN_MAX_AGE_SECONDS";

/// Environment variable selecting the existence policy, `reveal` or `mask`.
pub const EXISTENCE_POLICY_ENV: &str = "WARDEN_EXISTENCE_POLICY";

/// Runtime knobs for the dispatcher.
///
/// Everything here has a working default; `from_env` only overrides what the
/// environment actually sets, and never fails. Unusable values are logged
/// and ignored rather than turned into a boot error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WardenConfig {
    /// Maximum accepted token age in seconds.
    ///
    /// Values that are not positive, or too large for a `chrono::Duration`,
    /// fall back to the default when the lifetime is built.
    pub max_token_age_seconds: i64,
    /// How denials for missing resources are phrased.
    pub existence_policy: ExistencePolicy,
}

impl Default for WardenConfig {
    fn default() -> Self {
        Self {
            max_token_age_seconds: warden_token::DEFAULT_MAX_TOKEN_AGE_SECONDS,
            existence_policy: ExistencePolicy::default(),
        }
    }
}

impl WardenConfig {
    /// Overrides the token lifetime. Out-of-range values are not rejected
    /// here; they fall back to the default at use.
    pub fn with_max_token_age_seconds(mut self, seconds: i64) -> Self {
        self.max_token_age_seconds = seconds;
        self
    }

    pub fn with_existence_policy(mut self, policy: ExistencePolicy) -> Self {
        self.existence_policy = policy;
        self
    }

    /// Builds a config from the environment, starting from defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = env::var(MAX_TOKEN_AGE_ENV) {
            match raw.trim().parse::<i64>() {
                Ok(seconds) if seconds > 0 && Duration::try_seconds(seconds).is_some() => {
                    config.max_token_age_seconds = seconds;
                }
                Ok(seconds) => {
                    tracing::warn!(seconds, "ignoring out-of-range WARDEN_TOKEN_MAX_AGE_SECONDS");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring unparsable WARDEN_TOKEN_MAX_AGE_SECONDS");
                }
            }
        }

        if let Ok(raw) = env::var(EXISTENCE_POLICY_ENV) {
            match raw.trim().parse::<ExistencePolicy>() {
                Ok(policy) => config.existence_policy = policy,
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring unknown WARDEN_EXISTENCE_POLICY");
                }
            }
        }

        config
    }

    /// Token lifetime as a `Duration`. Out-of-range values fall back to the
    /// default instead of aborting.
    pub(crate) fn max_token_age(&self) -> Duration {
        match Duration::try_seconds(self.max_token_age_seconds) {
            Some(age) if self.max_token_age_seconds > 0 => age,
            _ => {
                tracing::warn!(
                    seconds = self.max_token_age_seconds,
                    "token lifetime out of range, using default"
                );
                Duration::seconds(warden_token::DEFAULT_MAX_TOKEN_AGE_SECONDS)
            }
        }
    }
}
