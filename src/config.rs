//! Configuration types.

use std::time::Duration;

use crate::error::ConfigError;

/// Dialog configuration.
#[derive(Debug, Clone)]
pub struct DialogConfig {
    /// Pause before each bot reply, emulating typing.
    pub typing_delay: Duration,
    /// Longer pause used for follow-ups such as document verification and
    /// the formal sanction letter.
    pub follow_up_delay: Duration,
    /// Largest amount an existing customer can request. Above it the flow
    /// stops.
    pub existing_customer_ceiling: u64,
    /// Largest amount a new customer is pre-approved for. Above it the user
    /// is offered the capped amount.
    pub new_customer_ceiling: u64,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            typing_delay: Duration::from_millis(600),
            follow_up_delay: Duration::from_millis(1500),
            existing_customer_ceiling: 1_000_000,
            new_customer_ceiling: 500_000,
        }
    }
}

impl DialogConfig {
    /// Build from `LOAN_ASSIST_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let typing_delay = read_u64(&lookup, "LOAN_ASSIST_TYPING_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.typing_delay);
        let follow_up_delay = read_u64(&lookup, "LOAN_ASSIST_FOLLOW_UP_DELAY_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.follow_up_delay);
        let existing_customer_ceiling = read_u64(&lookup, "LOAN_ASSIST_EXISTING_CEILING")?
            .unwrap_or(defaults.existing_customer_ceiling);
        let new_customer_ceiling = read_u64(&lookup, "LOAN_ASSIST_NEW_CUSTOMER_CEILING")?
            .unwrap_or(defaults.new_customer_ceiling);

        for (key, value) in [
            ("LOAN_ASSIST_EXISTING_CEILING", existing_customer_ceiling),
            ("LOAN_ASSIST_NEW_CUSTOMER_CEILING", new_customer_ceiling),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    message: "ceiling must be positive".to_string(),
                });
            }
        }

        Ok(Self {
            typing_delay,
            follow_up_delay,
            existing_customer_ceiling,
            new_customer_ceiling,
        })
    }
}

fn read_u64<F>(lookup: &F, key: &str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("{raw:?}: {e}"),
            }),
    }
}
