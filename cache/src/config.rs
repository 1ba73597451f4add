use std::time::Duration;

use serde::{
    Deserialize,
    Serialize,
};

fn default_resync_period() -> Duration {
    Duration::from_secs(30)
}

fn default_critical_sync_timeout() -> Duration {
    Duration::from_secs(120)
}

fn default_per_kind_sync_timeout() -> Duration {
    Duration::from_secs(45)
}

fn default_auth_probe_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_stats_channel_capacity() -> usize {
    1000
}

fn default_max_contexts() -> usize {
    10
}

fn default_qps() -> f32 {
    50.0
}

fn default_burst() -> u32 {
    100
}

/// Every tunable knob for the cache/informer layer, loaded via `serde_yaml::from_reader` over
/// a config file and falling back to `Default` wherever a field is absent.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    #[serde(with = "humantime_serde_duration")]
    pub resync_period: Duration,
    #[serde(with = "humantime_serde_duration")]
    pub critical_sync_timeout: Duration,
    #[serde(with = "humantime_serde_duration")]
    pub per_kind_sync_timeout: Duration,
    #[serde(with = "humantime_serde_duration")]
    pub auth_probe_timeout: Duration,
    pub stats_channel_capacity: usize,
    pub max_contexts: usize,
    pub qps: f32,
    pub burst: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            resync_period: default_resync_period(),
            critical_sync_timeout: default_critical_sync_timeout(),
            per_kind_sync_timeout: default_per_kind_sync_timeout(),
            auth_probe_timeout: default_auth_probe_timeout(),
            stats_channel_capacity: default_stats_channel_capacity(),
            max_contexts: default_max_contexts(),
            qps: default_qps(),
            burst: default_burst(),
        }
    }
}

impl CacheConfig {
    pub fn load(reader: impl std::io::Read) -> anyhow::Result<CacheConfig> {
        Ok(serde_yaml::from_reader(reader)?)
    }
}

/// `Duration` has no serde impl in the std/serde combination this workspace pins to, so we
/// round-trip timeout fields through seconds instead.
mod humantime_serde_duration {
    use std::time::Duration;

    use serde::{
        Deserialize,
        Deserializer,
        Serialize,
        Serializer,
    };

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        d.as_secs_f64().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use rstest::*;

    use super::*;

    #[rstest]
    fn test_defaults_match_spec_table() {
        let cfg = CacheConfig::default();
        assert_eq!(cfg.resync_period, Duration::from_secs(30));
        assert_eq!(cfg.critical_sync_timeout, Duration::from_secs(120));
        assert_eq!(cfg.stats_channel_capacity, 1000);
        assert_eq!(cfg.max_contexts, 10);
    }

    #[rstest]
    fn test_load_overrides_partial_config() {
        let yaml = "max_contexts: 3\nauth_probe_timeout: 2.5\n";
        let cfg = CacheConfig::load(yaml.as_bytes()).unwrap();
        assert_eq!(cfg.max_contexts, 3);
        assert_eq!(cfg.auth_probe_timeout, Duration::from_secs_f64(2.5));
        // everything else keeps its default
        assert_eq!(cfg.resync_period, Duration::from_secs(30));
    }
}
