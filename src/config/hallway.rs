//! Hallway simulation configuration.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{HallwayError, SpawnPlan};
use crate::util::DurationRange;

/// Prefix of every environment variable read by [`HallwayConfig::from_env`].
pub const ENV_PREFIX: &str = "HALLWAY_";

/// Simulation parameters.
///
/// Missing JSON fields take the defaults of the classic demo: three seats,
/// ten students, one TA helping for two seconds at a time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HallwayConfig {
    /// Chairs in the hallway.
    pub seats: usize,
    /// Students to spawn.
    pub clients: usize,
    /// Lower bound of a student's patience.
    pub patience_min_ms: u64,
    /// Upper bound of a student's patience.
    pub patience_max_ms: u64,
    /// Lower bound of a work period.
    pub think_min_ms: u64,
    /// Upper bound of a work period.
    pub think_max_ms: u64,
    /// Time the TA spends on each student.
    pub service_ms: u64,
    /// Pause between two spawned students.
    pub spawn_stagger_ms: u64,
    /// Stop after this much wall-clock time.
    pub run_time_secs: Option<u64>,
    /// Stop once this many students have been served.
    ///
    /// When neither this nor `run_time_secs` is set, the target is `clients`.
    pub served_target: Option<u64>,
    /// Services after which a student leaves for good.
    pub help_quota: Option<u32>,
    /// How often the supervisor checks the stop condition.
    pub poll_interval_ms: u64,
}

impl Default for HallwayConfig {
    fn default() -> Self {
        Self {
            seats: 3,
            clients: 10,
            patience_min_ms: 1000,
            patience_max_ms: 3000,
            think_min_ms: 2000,
            think_max_ms: 5000,
            service_ms: 2000,
            spawn_stagger_ms: 500,
            run_time_secs: None,
            served_target: None,
            help_quota: None,
            poll_interval_ms: 1000,
        }
    }
}

impl HallwayConfig {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.seats == 0 {
            return Err("seats must be greater than 0".into());
        }
        if self.clients == 0 {
            return Err("clients must be greater than 0".into());
        }
        if self.patience_min_ms > self.patience_max_ms {
            return Err(format!(
                "patience_min_ms ({}) exceeds patience_max_ms ({})",
                self.patience_min_ms, self.patience_max_ms
            ));
        }
        if self.think_min_ms > self.think_max_ms {
            return Err(format!(
                "think_min_ms ({}) exceeds think_max_ms ({})",
                self.think_min_ms, self.think_max_ms
            ));
        }
        if self.service_ms == 0 {
            return Err("service_ms must be greater than 0".into());
        }
        if self.poll_interval_ms == 0 {
            return Err("poll_interval_ms must be greater than 0".into());
        }
        if self.run_time_secs == Some(0) {
            return Err("run_time_secs must be greater than 0 when set".into());
        }
        if self.served_target == Some(0) {
            return Err("served_target must be greater than 0 when set".into());
        }
        if self.help_quota == Some(0) {
            return Err("help_quota must be greater than 0 when set".into());
        }
        if let (Some(quota), Some(target), None) =
            (self.help_quota, self.stop_target(), self.run_time_secs)
        {
            let reachable = u64::from(quota).saturating_mul(self.client_count());
            if target > reachable {
                return Err(format!(
                    "served_target ({target}) is unreachable with help_quota {quota} and {} clients",
                    self.clients
                ));
            }
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// [`HallwayError::InvalidConfig`] on malformed JSON or invalid values.
    pub fn from_json_str(input: &str) -> Result<Self, HallwayError> {
        let cfg: Self = serde_json::from_str(input)
            .map_err(|e| HallwayError::InvalidConfig(format!("parse error: {e}")))?;
        cfg.validate().map_err(HallwayError::InvalidConfig)?;
        Ok(cfg)
    }

    /// Load `.env` if present, then read `HALLWAY_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// [`HallwayError::InvalidConfig`] if a variable does not parse or the result is invalid.
    pub fn from_env() -> Result<Self, HallwayError> {
        // A missing .env file is the normal case.
        let _ = dotenvy::dotenv();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Build a configuration from defaults plus overrides looked up by full variable name.
    ///
    /// # Errors
    ///
    /// [`HallwayError::InvalidConfig`] if a value does not parse or the result is invalid.
    pub fn from_vars<F>(lookup: F) -> Result<Self, HallwayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        let vars = EnvVars { lookup };
        vars.set("SEATS", &mut cfg.seats)?;
        vars.set("CLIENTS", &mut cfg.clients)?;
        vars.set("PATIENCE_MIN_MS", &mut cfg.patience_min_ms)?;
        vars.set("PATIENCE_MAX_MS", &mut cfg.patience_max_ms)?;
        vars.set("THINK_MIN_MS", &mut cfg.think_min_ms)?;
        vars.set("THINK_MAX_MS", &mut cfg.think_max_ms)?;
        vars.set("SERVICE_MS", &mut cfg.service_ms)?;
        vars.set("SPAWN_STAGGER_MS", &mut cfg.spawn_stagger_ms)?;
        vars.set("POLL_INTERVAL_MS", &mut cfg.poll_interval_ms)?;
        vars.set_opt("RUN_TIME_SECS", &mut cfg.run_time_secs)?;
        vars.set_opt("SERVED_TARGET", &mut cfg.served_target)?;
        vars.set_opt("HELP_QUOTA", &mut cfg.help_quota)?;
        cfg.validate().map_err(HallwayError::InvalidConfig)?;
        Ok(cfg)
    }

    /// Set the number of seats.
    #[must_use]
    pub const fn with_seats(mut self, seats: usize) -> Self {
        self.seats = seats;
        self
    }

    /// Set the number of clients.
    #[must_use]
    pub const fn with_clients(mut self, clients: usize) -> Self {
        self.clients = clients;
        self
    }

    /// Set the patience bounds in milliseconds.
    #[must_use]
    pub const fn with_patience_ms(mut self, min: u64, max: u64) -> Self {
        self.patience_min_ms = min;
        self.patience_max_ms = max;
        self
    }

    /// Set the think-time bounds in milliseconds.
    #[must_use]
    pub const fn with_think_ms(mut self, min: u64, max: u64) -> Self {
        self.think_min_ms = min;
        self.think_max_ms = max;
        self
    }

    /// Set the service duration in milliseconds.
    #[must_use]
    pub const fn with_service_ms(mut self, ms: u64) -> Self {
        self.service_ms = ms;
        self
    }

    /// Set the stagger between spawned clients in milliseconds.
    #[must_use]
    pub const fn with_spawn_stagger_ms(mut self, ms: u64) -> Self {
        self.spawn_stagger_ms = ms;
        self
    }

    /// Stop after `secs` seconds.
    #[must_use]
    pub const fn with_run_time_secs(mut self, secs: Option<u64>) -> Self {
        self.run_time_secs = secs;
        self
    }

    /// Stop once `target` clients have been served.
    #[must_use]
    pub const fn with_served_target(mut self, target: Option<u64>) -> Self {
        self.served_target = target;
        self
    }

    /// Let each client leave after `quota` services.
    #[must_use]
    pub const fn with_help_quota(mut self, quota: Option<u32>) -> Self {
        self.help_quota = quota;
        self
    }

    /// Set the supervisor poll interval in milliseconds.
    #[must_use]
    pub const fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Patience range.
    #[must_use]
    pub const fn patience_range(&self) -> DurationRange {
        DurationRange::from_millis(self.patience_min_ms, self.patience_max_ms)
    }

    /// Think-time range.
    #[must_use]
    pub const fn think_range(&self) -> DurationRange {
        DurationRange::from_millis(self.think_min_ms, self.think_max_ms)
    }

    /// Service duration.
    #[must_use]
    pub const fn service(&self) -> Duration {
        Duration::from_millis(self.service_ms)
    }

    /// Stagger between spawned clients.
    #[must_use]
    pub const fn stagger(&self) -> Duration {
        Duration::from_millis(self.spawn_stagger_ms)
    }

    /// Supervisor poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Wall-clock limit, if any.
    #[must_use]
    pub fn run_time(&self) -> Option<Duration> {
        self.run_time_secs.map(Duration::from_secs)
    }

    /// Served count that ends the run, if any.
    #[must_use]
    pub fn stop_target(&self) -> Option<u64> {
        match (self.served_target, self.run_time_secs) {
            (Some(target), _) => Some(target),
            (None, None) => Some(self.client_count()),
            (None, Some(_)) => None,
        }
    }

    fn client_count(&self) -> u64 {
        u64::try_from(self.clients).unwrap_or(u64::MAX)
    }

    /// Spawner parameters derived from this configuration.
    #[must_use]
    pub const fn spawn_plan(&self) -> SpawnPlan {
        SpawnPlan {
            clients: self.clients,
            patience: self.patience_range(),
            think: self.think_range(),
            stagger: self.stagger(),
            help_quota: self.help_quota,
        }
    }
}

struct EnvVars<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> EnvVars<F> {
    fn get<T: FromStr>(&self, name: &str) -> Result<Option<T>, HallwayError>
    where
        T::Err: std::fmt::Display,
    {
        let key = format!("{ENV_PREFIX}{name}");
        let Some(raw) = (self.lookup)(&key) else {
            return Ok(None);
        };
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        raw.parse()
            .map(Some)
            .map_err(|e| HallwayError::InvalidConfig(format!("{key}={raw}: {e}")))
    }

    fn set<T: FromStr>(&self, name: &str, slot: &mut T) -> Result<(), HallwayError>
    where
        T::Err: std::fmt::Display,
    {
        if let Some(value) = self.get(name)? {
            *slot = value;
        }
        Ok(())
    }

    fn set_opt<T: FromStr>(&self, name: &str, slot: &mut Option<T>) -> Result<(), HallwayError>
    where
        T::Err: std::fmt::Display,
    {
        if let Some(value) = self.get(name)? {
            *slot = Some(value);
        }
        Ok(())
    }
}
