// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Liveness monitoring for sensors.
//!
//! Battery powered sensors fail silently: they simply stop reporting. The
//! [`SensorMonitor`] remembers when each watched sensor last reported and
//! raises a [`StaleSensor`] alert once a sensor has been silent for longer
//! than the configured limit. A sensor is reported once per silence; it is
//! reported again only after it has reported and then gone silent again.
//!
//! The monitor is fed from the event stream and is independent of the
//! bridge's callback registrations.
//!
//! # Examples
//!
//! ```
//! use chrono::{TimeDelta, Utc};
//! use tellstick_bridge::monitor::{SensorMonitor, SensorMonitorConfig};
//!
//! let monitor = SensorMonitor::new(SensorMonitorConfig::default().with_sensors([135]));
//! let now = Utc::now();
//! monitor.alive_at(135, now - TimeDelta::hours(2));
//!
//! let stale = monitor.check_dead(now);
//! assert_eq!(stale.len(), 1);
//! assert_eq!(stale[0].id, 135);
//!
//! // Not reported twice for the same silence.
//! assert!(monitor.check_dead(now).is_empty());
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::ValueError;
use crate::event::Event;
use crate::types::DeviceId;

/// Default time between liveness checks.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Default silence after which a sensor is reported.
pub const DEFAULT_MAX_SILENCE: Duration = Duration::from_secs(60 * 60);

const ALERT_CHANNEL_CAPACITY: usize = 64;

/// Configuration of a [`SensorMonitor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorMonitorConfig {
    #[serde(deserialize_with = "deserialize_check_interval")]
    check_interval: Duration,
    max_silence: Duration,
    sensors: HashSet<DeviceId>,
}

impl Default for SensorMonitorConfig {
    fn default() -> Self {
        Self {
            check_interval: DEFAULT_CHECK_INTERVAL,
            max_silence: DEFAULT_MAX_SILENCE,
            sensors: HashSet::new(),
        }
    }
}

fn deserialize_check_interval<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let interval = Duration::deserialize(deserializer)?;
    if interval.is_zero() {
        return Err(serde::de::Error::custom(ValueError::ZeroInterval));
    }
    Ok(interval)
}

impl SensorMonitorConfig {
    /// Sets the time between checks of the background task.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::ZeroInterval`] for a zero interval.
    pub fn with_check_interval(mut self, interval: Duration) -> Result<Self, ValueError> {
        if interval.is_zero() {
            return Err(ValueError::ZeroInterval);
        }
        self.check_interval = interval;
        Ok(self)
    }

    /// Sets the silence after which a sensor is reported.
    #[must_use]
    pub fn with_max_silence(mut self, max_silence: Duration) -> Self {
        self.max_silence = max_silence;
        self
    }

    /// Adds sensors to the watch list.
    ///
    /// Only watched sensors are ever reported.
    #[must_use]
    pub fn with_sensors(mut self, ids: impl IntoIterator<Item = DeviceId>) -> Self {
        self.sensors.extend(ids);
        self
    }

    /// Returns the check interval.
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        self.check_interval
    }

    /// Returns the maximum silence.
    #[must_use]
    pub fn max_silence(&self) -> Duration {
        self.max_silence
    }

    /// Returns `true` if `id` is watched.
    #[must_use]
    pub fn is_watched(&self, id: DeviceId) -> bool {
        self.sensors.contains(&id)
    }
}

/// Alert for a sensor that stopped reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaleSensor {
    /// Sensor id.
    pub id: DeviceId,
    /// When the sensor last reported.
    pub last_seen: DateTime<Utc>,
    /// How long the sensor has been silent at check time.
    pub silence: Duration,
}

#[derive(Debug, Clone, Copy)]
struct Seen {
    at: DateTime<Utc>,
    reported: bool,
}

/// Tracks when watched sensors last reported.
#[derive(Debug)]
pub struct SensorMonitor {
    config: SensorMonitorConfig,
    seen: Mutex<HashMap<DeviceId, Seen>>,
    alerts: broadcast::Sender<StaleSensor>,
}

impl SensorMonitor {
    /// Creates a monitor.
    #[must_use]
    pub fn new(config: SensorMonitorConfig) -> Self {
        let (alerts, _) = broadcast::channel(ALERT_CHANNEL_CAPACITY);
        Self {
            config,
            seen: Mutex::new(HashMap::new()),
            alerts,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &SensorMonitorConfig {
        &self.config
    }

    /// Subscribes to stale sensor alerts.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StaleSensor> {
        self.alerts.subscribe()
    }

    /// Records that sensor `id` reported now.
    pub fn alive(&self, id: DeviceId) {
        self.alive_at(id, Utc::now());
    }

    /// Records that sensor `id` reported at `at`.
    ///
    /// Sensors that are not watched are ignored.
    pub fn alive_at(&self, id: DeviceId, at: DateTime<Utc>) {
        if !self.config.is_watched(id) {
            return;
        }
        self.seen.lock().insert(id, Seen { at, reported: false });
    }

    /// Records a sensor event. Other events are ignored.
    pub fn observe(&self, event: &Event) {
        if let Event::Sensor { device_id, .. } = event {
            self.alive(*device_id);
        }
    }

    /// Returns when watched sensor `id` last reported.
    #[must_use]
    pub fn last_seen(&self, id: DeviceId) -> Option<DateTime<Utc>> {
        self.seen.lock().get(&id).map(|seen| seen.at)
    }

    /// Reports watched sensors that have been silent for longer than the
    /// configured limit as of `now`.
    ///
    /// Each returned alert is also logged and published to subscribers.
    pub fn check_dead(&self, now: DateTime<Utc>) -> Vec<StaleSensor> {
        let max_silence = TimeDelta::from_std(self.config.max_silence).unwrap_or(TimeDelta::MAX);

        let mut stale = Vec::new();
        {
            let mut seen = self.seen.lock();
            for (&id, entry) in seen.iter_mut() {
                if entry.reported || !self.config.is_watched(id) {
                    continue;
                }
                let silence = now - entry.at;
                if silence > max_silence {
                    entry.reported = true;
                    stale.push(StaleSensor {
                        id,
                        last_seen: entry.at,
                        silence: silence.to_std().unwrap_or_default(),
                    });
                }
            }
        }
        stale.sort_by_key(|s| s.id);

        for sensor in &stale {
            tracing::warn!(
                sensor_id = sensor.id,
                last_seen = %sensor.last_seen,
                silence_secs = sensor.silence.as_secs(),
                "Sensor has stopped reporting"
            );
            // No subscribers is fine
            let _ = self.alerts.send(sensor.clone());
        }
        stale
    }

    /// Spawns a task checking for stale sensors every check interval.
    ///
    /// The first check runs one interval after spawning. Must be called
    /// within a tokio runtime.
    #[must_use]
    pub fn spawn(self: &Arc<Self>) -> SensorMonitorHandle {
        let monitor = Arc::clone(self);
        let period = self.config.check_interval;
        let task = tokio::spawn(async move {
            tracing::debug!(interval_secs = period.as_secs(), "Sensor monitor started");
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                ticker.tick().await;
                monitor.check_dead(Utc::now());
            }
        });
        SensorMonitorHandle { task }
    }
}

/// Handle to a spawned monitor task. Dropping it stops the task.
#[derive(Debug)]
pub struct SensorMonitorHandle {
    task: JoinHandle<()>,
}

impl SensorMonitorHandle {
    /// Stops the monitor task.
    pub fn shutdown(self) {
        self.task.abort();
    }

    /// Returns `true` once the task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for SensorMonitorHandle {
    fn drop(&mut self) {
        self.task.abort();
        tracing::debug!("Sensor monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SensorDataType;

    fn monitor(ids: &[DeviceId]) -> SensorMonitor {
        SensorMonitor::new(SensorMonitorConfig::default().with_sensors(ids.iter().copied()))
    }

    #[test]
    fn silent_sensor_is_reported() {
        let monitor = monitor(&[10]);
        let now = Utc::now();
        monitor.alive_at(10, now - TimeDelta::minutes(61));

        let stale = monitor.check_dead(now);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, 10);
        assert_eq!(stale[0].silence, Duration::from_secs(61 * 60));
    }

    #[test]
    fn recent_sensor_is_not_reported() {
        let monitor = monitor(&[10]);
        let now = Utc::now();
        monitor.alive_at(10, now - TimeDelta::minutes(30));
        assert!(monitor.check_dead(now).is_empty());
    }

    #[test]
    fn reported_once_until_alive_again() {
        let monitor = monitor(&[10]);
        let now = Utc::now();
        monitor.alive_at(10, now - TimeDelta::hours(2));

        assert_eq!(monitor.check_dead(now).len(), 1);
        assert!(monitor.check_dead(now).is_empty());

        monitor.alive_at(10, now);
        let later = now + TimeDelta::hours(2);
        assert_eq!(monitor.check_dead(later).len(), 1);
    }

    #[test]
    fn only_watched_sensors_are_reported() {
        let monitor = monitor(&[]);
        let now = Utc::now();
        monitor.alive_at(10, now - TimeDelta::hours(2));
        assert!(monitor.check_dead(now).is_empty());
    }

    #[test]
    fn observe_records_sensor_events_only() {
        let monitor = monitor(&[135]);
        monitor.observe(&Event::Device {
            device_id: 135,
            method: crate::types::Method::TurnOn.into(),
            data: String::new(),
        });
        assert!(monitor.last_seen(135).is_none());

        monitor.observe(&Event::Sensor {
            protocol: "fineoffset".to_string(),
            model: "temperature".to_string(),
            device_id: 135,
            data_type: SensorDataType::Temperature,
            value: "21.5".to_string(),
            timestamp: 0,
        });
        assert!(monitor.last_seen(135).is_some());
    }

    #[test]
    fn unwatched_sensors_are_not_tracked() {
        let monitor = monitor(&[10]);
        for id in 100..200 {
            monitor.alive(id);
        }
        monitor.alive(10);

        assert!(monitor.last_seen(150).is_none());
        assert!(monitor.last_seen(10).is_some());
        assert_eq!(monitor.seen.lock().len(), 1);
    }

    #[test]
    fn zero_check_interval_is_rejected() {
        assert_eq!(
            SensorMonitorConfig::default().with_check_interval(Duration::ZERO),
            Err(ValueError::ZeroInterval)
        );
    }

    #[test]
    fn deserialized_zero_check_interval_is_rejected() {
        let err = serde_json::from_str::<SensorMonitorConfig>(
            r#"{"check_interval":{"secs":0,"nanos":0}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains(&ValueError::ZeroInterval.to_string()));
    }

    #[test]
    fn deserialize_fills_defaults() {
        let config: SensorMonitorConfig =
            serde_json::from_str(r#"{"check_interval":{"secs":60,"nanos":0},"sensors":[135]}"#)
                .unwrap();
        assert_eq!(config.check_interval(), Duration::from_secs(60));
        assert_eq!(config.max_silence(), DEFAULT_MAX_SILENCE);
        assert!(config.is_watched(135));

        let config: SensorMonitorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.check_interval(), DEFAULT_CHECK_INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_from_deserialized_config_keeps_running() {
        let config: SensorMonitorConfig =
            serde_json::from_str(r#"{"check_interval":{"secs":1,"nanos":0},"sensors":[3]}"#)
                .unwrap();
        let handle = Arc::new(SensorMonitor::new(config)).spawn();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(!handle.is_finished());
        handle.shutdown();
    }

    #[tokio::test]
    async fn alerts_are_published() {
        let monitor = monitor(&[7]);
        let mut alerts = monitor.subscribe();
        let now = Utc::now();
        monitor.alive_at(7, now - TimeDelta::hours(3));

        monitor.check_dead(now);
        assert_eq!(alerts.recv().await.unwrap().id, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_task_checks_every_interval() {
        let monitor = Arc::new(monitor(&[3]));
        let mut alerts = monitor.subscribe();
        monitor.alive_at(3, Utc::now() - TimeDelta::hours(2));

        let handle = monitor.spawn();
        tokio::time::advance(DEFAULT_CHECK_INTERVAL).await;

        let alert = alerts.recv().await.unwrap();
        assert_eq!(alert.id, 3);
        assert!(!handle.is_finished());
        handle.shutdown();
    }
}
