//! Relay configuration.
//!
//! Everything tunable lives here; operations read their limits from the
//! config instead of hard-coding them. `from_env` overlays `CAREPASS_*`
//! environment variables onto the defaults, so a bare process comes up
//! with working development settings.

use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// How bundle redemption treats a successful read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RedemptionPolicy {
    /// Codes stay readable until they expire.
    #[default]
    MultiRead,
    /// The first successful redemption consumes the code.
    SingleUse,
}

impl FromStr for RedemptionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multi_read" => Ok(RedemptionPolicy::MultiRead),
            "single_use" => Ok(RedemptionPolicy::SingleUse),
            other => Err(format!("unknown redemption policy: {other}")),
        }
    }
}

/// Configuration for the relay.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Secret the token signing key is derived from.
    pub signing_secret: String,
    /// Access key a patient device presents when requesting a token.
    pub patient_access_key: String,
    /// Access key a clinician device presents when requesting a token.
    pub clinician_access_key: String,
    /// Record bundle lifetime in milliseconds.
    pub bundle_ttl_millis: i64,
    /// Grant duration applied when the caller does not pick one.
    pub default_grant_minutes: u32,
    /// Upper bound on requested grant durations.
    pub max_grant_minutes: u32,
    /// Bearer token lifetime in milliseconds.
    pub token_lifetime_millis: i64,
    /// Cadence of the background sweeper.
    pub sweep_interval: Duration,
    /// Bundle redemption behavior.
    pub redemption_policy: RedemptionPolicy,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            signing_secret: "carepass-dev-secret".to_string(),
            patient_access_key: "patient-dev-key".to_string(),
            clinician_access_key: "clinician-dev-key".to_string(),
            bundle_ttl_millis: 2 * 60 * 60 * 1000,
            default_grant_minutes: 30,
            max_grant_minutes: 24 * 60,
            token_lifetime_millis: carepass_auth::DEFAULT_TOKEN_LIFETIME_MILLIS,
            sweep_interval: Duration::from_secs(60),
            redemption_policy: RedemptionPolicy::default(),
        }
    }
}

impl RelayConfig {
    /// Build a config from `CAREPASS_*` environment variables, falling
    /// back to the defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            signing_secret: env_string("CAREPASS_SIGNING_SECRET", defaults.signing_secret),
            patient_access_key: env_string("CAREPASS_PATIENT_KEY", defaults.patient_access_key),
            clinician_access_key: env_string(
                "CAREPASS_CLINICIAN_KEY",
                defaults.clinician_access_key,
            ),
            bundle_ttl_millis: env_parse("CAREPASS_BUNDLE_TTL_SECS", 2 * 60 * 60i64) * 1000,
            default_grant_minutes: env_parse(
                "CAREPASS_GRANT_MINUTES",
                defaults.default_grant_minutes,
            ),
            max_grant_minutes: env_parse("CAREPASS_MAX_GRANT_MINUTES", defaults.max_grant_minutes),
            token_lifetime_millis: env_parse("CAREPASS_TOKEN_LIFETIME_SECS", 12 * 60 * 60i64)
                * 1000,
            sweep_interval: Duration::from_secs(env_parse("CAREPASS_SWEEP_INTERVAL_SECS", 60u64)),
            redemption_policy: env_parse(
                "CAREPASS_REDEMPTION_POLICY",
                defaults.redemption_policy,
            ),
        }
    }
}

fn env_string(key: &str, default: String) -> String {
    env::var(key).unwrap_or(default)
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match env::var(key) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(key, value = %raw, %err, "unparseable setting, using default");
                default
            }
        },
        Err(_) => default,
    }
}
