use std::str::FromStr;
use std::time::Duration;

use pulse_queue::QueueConfig;

use crate::{
    error::{PipelineError, PipelineResult},
    priority::DEFAULT_ALERT_KEYWORDS,
};

/// Pipeline settings; queue settings are read from `PULSE_QUEUE_*`
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub queue: QueueConfig,
    /// Simulated channel name
    pub sim_channel: String,
    /// Messages the simulator produces; `None` runs until interrupted
    pub sim_messages: Option<usize>,
    pub sim_interval: Duration,
    pub sim_seed: u64,
    /// Force a disconnect every N simulated messages
    pub sim_disconnect_every: Option<usize>,
    pub alert_keywords: Vec<String>,
    /// Texts shorter than this many characters are low priority
    pub low_max_len: usize,
    pub store_capacity: usize,
    pub toxicity_threshold: f32,
    pub report_interval: Duration,
    /// How long shutdown waits for the queue to drain
    pub drain_timeout: Duration,
    pub reconnect_max_attempts: u32,
    pub log_json: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue: QueueConfig::default(),
            sim_channel: "worlds".to_string(),
            sim_messages: Some(200),
            sim_interval: Duration::from_millis(5),
            sim_seed: 42,
            sim_disconnect_every: None,
            alert_keywords: DEFAULT_ALERT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            low_max_len: 4,
            store_capacity: 500,
            toxicity_threshold: 0.5,
            report_interval: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(10),
            reconnect_max_attempts: 5,
            log_json: false,
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> PipelineResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> PipelineResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let sim_messages = match parse::<usize>(&get, "PULSE_SIM_MESSAGES")? {
            Some(0) => None,
            Some(n) => Some(n),
            None => defaults.sim_messages,
        };

        let alert_keywords = match get("PULSE_ALERT_KEYWORDS") {
            Some(raw) => raw.split(',').map(|k| k.trim().to_string()).filter(|k| !k.is_empty()).collect(),
            None => defaults.alert_keywords,
        };

        let toxicity_threshold = parse::<f32>(&get, "PULSE_TOXICITY_THRESHOLD")?.unwrap_or(defaults.toxicity_threshold);
        if !(0.0..=1.0).contains(&toxicity_threshold) {
            return Err(PipelineError::InvalidConfig(format!(
                "PULSE_TOXICITY_THRESHOLD must be between 0 and 1, got {}",
                toxicity_threshold
            )));
        }

        Ok(Self {
            queue: QueueConfig::from_lookup(&lookup)?,
            sim_channel: get("PULSE_SIM_CHANNEL").unwrap_or(defaults.sim_channel),
            sim_messages,
            sim_interval: parse::<u64>(&get, "PULSE_SIM_INTERVAL_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.sim_interval),
            sim_seed: parse(&get, "PULSE_SIM_SEED")?.unwrap_or(defaults.sim_seed),
            sim_disconnect_every: parse::<usize>(&get, "PULSE_SIM_DISCONNECT_EVERY")?.filter(|n| *n > 0),
            alert_keywords,
            low_max_len: parse(&get, "PULSE_LOW_MAX_LEN")?.unwrap_or(defaults.low_max_len),
            store_capacity: parse(&get, "PULSE_STORE_CAPACITY")?.unwrap_or(defaults.store_capacity),
            toxicity_threshold,
            report_interval: parse::<u64>(&get, "PULSE_REPORT_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.report_interval),
            drain_timeout: parse::<u64>(&get, "PULSE_DRAIN_TIMEOUT_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.drain_timeout),
            reconnect_max_attempts: parse(&get, "PULSE_RECONNECT_MAX_ATTEMPTS")?
                .unwrap_or(defaults.reconnect_max_attempts),
            log_json: parse(&get, "PULSE_LOG_JSON")?.unwrap_or(defaults.log_json),
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, name: &str) -> PipelineResult<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| PipelineError::InvalidConfig(format!("{name}={raw:?}: {e}")))
        })
        .transpose()
}
