use anyhow::{anyhow, Context};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// What happens to a pending synthetic reply when its conversation is left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplyPolicy {
    /// Abort the pending reply on switch, clear, delete or teardown.
    #[default]
    CancelOnLeave,
    /// Let it fire anyway. It lands in the stored log and only shows up in
    /// the visible list if the view is unchanged since the send.
    Detached,
}

impl FromStr for ReplyPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cancel" | "cancel-on-leave" => Ok(Self::CancelOnLeave),
            "detached" => Ok(Self::Detached),
            other => Err(anyhow!("unknown reply policy {other:?}, expected `cancel` or `detached`")),
        }
    }
}

/// Runtime configuration for the client.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Location of the durable store. `None` keeps everything in memory.
    pub data_dir: Option<PathBuf>,
    pub reply_delay: Duration,
    pub login_delay: Duration,
    /// Minimum time the session reports loading while restoring.
    pub restore_delay: Duration,
    pub reply_policy: ReplyPolicy,
    pub demo_email: String,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|key| env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let millis = |key: &str, fallback: Duration| {
            var(key)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };

        let reply_policy = match var("PARLEY_REPLY_POLICY") {
            Some(raw) => raw.parse::<ReplyPolicy>().context("invalid PARLEY_REPLY_POLICY")?,
            None => defaults.reply_policy,
        };

        Ok(Self {
            data_dir: var("PARLEY_DATA_DIR").map(PathBuf::from),
            reply_delay: millis("PARLEY_REPLY_DELAY_MS", defaults.reply_delay),
            login_delay: millis("PARLEY_LOGIN_DELAY_MS", defaults.login_delay),
            restore_delay: millis("PARLEY_RESTORE_DELAY_MS", defaults.restore_delay),
            reply_policy,
            demo_email: var("PARLEY_DEMO_EMAIL").unwrap_or(defaults.demo_email),
        })
    }

    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    pub fn with_reply_policy(mut self, policy: ReplyPolicy) -> Self {
        self.reply_policy = policy;
        self
    }

    pub fn with_reply_delay(mut self, delay: Duration) -> Self {
        self.reply_delay = delay;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            reply_delay: Duration::from_millis(2000),
            login_delay: Duration::from_millis(1000),
            restore_delay: Duration::from_millis(500),
            reply_policy: ReplyPolicy::CancelOnLeave,
            demo_email: "demo@example.com".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_gives_defaults() {
        let config = AppConfig::from_vars(vars(&[])).unwrap();
        assert!(config.data_dir.is_none());
        assert_eq!(config.reply_delay, Duration::from_millis(2000));
        assert_eq!(config.login_delay, Duration::from_millis(1000));
        assert_eq!(config.restore_delay, Duration::from_millis(500));
        assert_eq!(config.reply_policy, ReplyPolicy::CancelOnLeave);
    }

    #[test]
    fn overrides_and_bad_numbers() {
        let config = AppConfig::from_vars(vars(&[
            ("PARLEY_DATA_DIR", "/tmp/parley"),
            ("PARLEY_REPLY_DELAY_MS", "250"),
            ("PARLEY_LOGIN_DELAY_MS", "soon"),
            ("PARLEY_REPLY_POLICY", "Detached"),
        ]))
        .unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/parley")));
        assert_eq!(config.reply_delay, Duration::from_millis(250));
        assert_eq!(config.login_delay, Duration::from_millis(1000));
        assert_eq!(config.reply_policy, ReplyPolicy::Detached);
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(AppConfig::from_vars(vars(&[("PARLEY_REPLY_POLICY", "sometimes")])).is_err());
    }
}
