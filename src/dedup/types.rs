use std::time::Duration;

use derive_builder::Builder;

use crate::error::Error;

pub const TTL_ENV: &str = "LEVELGUARD_CACHE_TTL_SECS";
pub const SWEEP_ENV: &str = "LEVELGUARD_CACHE_SWEEP_SECS";

/// Longest accepted window (and sweep period): 10 years.
pub const MAX_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Configuration of an [`ExpiringRequestCache`](super::ExpiringRequestCache).
///
/// `ttl` has no default: a cache without an explicit window is a configuration
/// error. It is read once at construction and must not exceed [`MAX_TTL`].
#[derive(Builder, Debug, Clone, PartialEq, Eq)]
#[builder(pattern = "owned")]
pub struct CacheConfig {
    pub ttl: Duration,
    /// Period of the background purge. `None` keeps expiry purely lazy.
    #[builder(default, setter(strip_option))]
    pub sweep_interval: Option<Duration>,
}

impl CacheConfig {
    pub fn with_ttl_secs(secs: u64) -> Result<Self, Error> {
        let config = Self {
            ttl: Duration::from_secs(secs),
            sweep_interval: None,
        };
        config.validate()?;
        Ok(config)
    }

    /// Read the window from [`TTL_ENV`] and the optional sweep period from
    /// [`SWEEP_ENV`] via `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ttl = lookup(TTL_ENV)
            .ok_or_else(|| Error::InvalidConfig(format!("{TTL_ENV} is not set")))?;
        let ttl = parse_secs(TTL_ENV, &ttl)?;
        let sweep_interval = lookup(SWEEP_ENV)
            .map(|raw| parse_secs(SWEEP_ENV, &raw))
            .transpose()?;
        let config = Self {
            ttl,
            sweep_interval,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn validate(&self) -> Result<(), Error> {
        // Whole seconds only; the window is configured in seconds.
        if self.ttl < Duration::from_secs(1) {
            return Err(Error::InvalidConfig("ttl must be at least 1 second".into()));
        }
        if self.ttl > MAX_TTL {
            return Err(Error::InvalidConfig(format!(
                "ttl of {}s exceeds the {}s maximum",
                self.ttl.as_secs(),
                MAX_TTL.as_secs()
            )));
        }
        if self.ttl.subsec_nanos() != 0 {
            return Err(Error::InvalidConfig(
                "ttl must be a whole number of seconds".into(),
            ));
        }
        if let Some(interval) = self.sweep_interval {
            if interval.is_zero() {
                return Err(Error::InvalidConfig(
                    "sweep_interval must be greater than zero".into(),
                ));
            }
            if interval > MAX_TTL {
                return Err(Error::InvalidConfig(format!(
                    "sweep_interval exceeds the {}s maximum",
                    MAX_TTL.as_secs()
                )));
            }
        }
        Ok(())
    }
}

impl CacheConfigBuilder {
    pub fn build_validated(self) -> Result<CacheConfig, Error> {
        let config = self
            .build()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration, Error> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|e| Error::InvalidConfig(format!("{key}={raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn builder_requires_ttl() {
        let err = CacheConfigBuilder::default()
            .build_validated()
            .expect_err("ttl is mandatory");
        assert!(matches!(err, Error::InvalidConfig(_)));
    }

    #[test]
    fn builder_accepts_sweep_interval() {
        let config = CacheConfigBuilder::default()
            .ttl(Duration::from_secs(30))
            .sweep_interval(Duration::from_secs(5))
            .build_validated()
            .expect("valid config");
        assert_eq!(config.sweep_interval, Some(Duration::from_secs(5)));
    }

    #[test]
    fn rejects_sub_second_and_fractional_windows() {
        assert!(CacheConfig::with_ttl_secs(0).is_err());
        let fractional = CacheConfig {
            ttl: Duration::from_millis(1_500),
            sweep_interval: None,
        };
        assert!(fractional.validate().is_err());
        let zero_sweep = CacheConfig {
            ttl: Duration::from_secs(2),
            sweep_interval: Some(Duration::ZERO),
        };
        assert!(zero_sweep.validate().is_err());
    }

    #[test]
    fn reads_window_from_lookup() {
        let config = CacheConfig::from_lookup(lookup_from(&[(TTL_ENV, " 45 "), (SWEEP_ENV, "10")]))
            .expect("valid env");
        assert_eq!(config.ttl, Duration::from_secs(45));
        assert_eq!(config.sweep_interval, Some(Duration::from_secs(10)));
    }

    #[test]
    fn missing_or_garbled_ttl_is_an_error() {
        let missing = CacheConfig::from_lookup(lookup_from(&[])).expect_err("missing ttl");
        assert!(matches!(missing, Error::InvalidConfig(ref msg) if msg.contains(TTL_ENV)));

        let garbled =
            CacheConfig::from_lookup(lookup_from(&[(TTL_ENV, "soon")])).expect_err("garbled");
        assert!(matches!(garbled, Error::InvalidConfig(_)));
    }

    #[test]
    fn oversized_windows_are_rejected() {
        let err = CacheConfig::from_lookup(lookup_from(&[(TTL_ENV, "40000000000")]))
            .expect_err("ttl above the cap");
        assert!(matches!(err, Error::InvalidConfig(ref msg) if msg.contains("maximum")));

        assert!(CacheConfig::with_ttl_secs(MAX_TTL.as_secs()).is_ok());
        assert!(CacheConfig::with_ttl_secs(MAX_TTL.as_secs() + 1).is_err());

        let long_sweep = CacheConfig {
            ttl: Duration::from_secs(2),
            sweep_interval: Some(MAX_TTL + Duration::from_secs(1)),
        };
        assert!(long_sweep.validate().is_err());
    }
}
