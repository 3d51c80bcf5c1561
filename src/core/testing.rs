//! Scripted collaborators for the control loop tests.

use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::{
    core::{
        meter::{MeterData, MeterDataProvider},
        notification::{Notification, NotificationSink},
        policy::{Policy, PolicyResult},
        station::{ChargingStation, ChargingStationData},
    },
    prelude::*,
    quantity::{current::Amperes, energy::KilowattHours, power::Watts, voltage::Volts},
};

pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 12, 5, 0).unwrap()
}

pub fn meter() -> MeterData {
    MeterData::builder()
        .total_active_power(Watts(1000.0))
        .currents([Amperes(1.5); 3])
        .voltages([Volts(230.0); 3])
        .total_import(KilowattHours(1000.0))
        .build()
}

pub fn idle_station() -> ChargingStationData {
    ChargingStationData::builder().real_power_sum(Watts::ZERO).currents([Amperes::ZERO; 3]).build()
}

/// Replays the scripted readings, repeating the last one forever. `None` is a failure.
struct Script<T>(Mutex<VecDeque<Option<T>>>);

impl<T: Copy> Script<T> {
    fn new(readings: impl IntoIterator<Item = Option<T>>) -> Self {
        Self(Mutex::new(readings.into_iter().collect()))
    }

    fn next(&self) -> Option<T> {
        let mut readings = self.0.lock().unwrap();
        if readings.len() > 1 { readings.pop_front().flatten() } else { readings.front().copied().flatten() }
    }
}

pub struct FakeMeter {
    script: Script<MeterData>,
    pub n_calls: AtomicUsize,
}

impl FakeMeter {
    pub fn new(readings: impl IntoIterator<Item = Option<MeterData>>) -> Self {
        Self { script: Script::new(readings), n_calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.n_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MeterDataProvider for FakeMeter {
    async fn get_meter_data(&self) -> Result<MeterData> {
        self.n_calls.fetch_add(1, Ordering::SeqCst);
        self.script.next().context("meter is unreachable")
    }
}

pub struct FakeStation {
    script: Script<ChargingStationData>,
    fail_to_set: bool,
    pub current_limits: Mutex<Vec<Amperes>>,
}

impl FakeStation {
    pub fn new(readings: impl IntoIterator<Item = Option<ChargingStationData>>) -> Self {
        Self { script: Script::new(readings), fail_to_set: false, current_limits: Mutex::default() }
    }

    pub fn failing_to_set(mut self) -> Self {
        self.fail_to_set = true;
        self
    }

    pub fn current_limits(&self) -> Vec<Amperes> {
        self.current_limits.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChargingStation for FakeStation {
    async fn get_charging_station_data(&self) -> Result<ChargingStationData> {
        self.script.next().context("charging station is unreachable")
    }

    async fn set_current_limit(&self, current_limit: Amperes) -> Result {
        ensure!(!self.fail_to_set, "charging station rejected the setpoint");
        self.current_limits.lock().unwrap().push(current_limit);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub notifications: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(&self, notification: &Notification) -> Result {
        self.notifications.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct FailingSink;

#[async_trait]
impl NotificationSink for FailingSink {
    async fn notify(&self, _notification: &Notification) -> Result {
        bail!("sink is down")
    }
}

/// Always proposes the same result, or fails when there is none.
pub struct FixedPolicy(pub Option<PolicyResult>);

impl FixedPolicy {
    pub fn boxed(current_limit: Amperes, message: &str) -> Box<dyn Policy> {
        Box::new(Self(Some(PolicyResult::new(current_limit, message))))
    }

    pub fn failing() -> Box<dyn Policy> {
        Box::new(Self(None))
    }
}

#[async_trait]
impl Policy for FixedPolicy {
    async fn evaluate(
        &mut self,
        _now: DateTime<Utc>,
        _charging_station: &ChargingStationData,
        _meter: &MeterData,
    ) -> Result<PolicyResult> {
        self.0.clone().context("policy failed")
    }
}
