mod error;

use std::{sync::Arc, time::Duration};

use bon::Builder;
use chrono::{DateTime, Utc};
use tokio::{join, select, sync::watch, time::sleep};

pub use self::error::Error as AcquisitionError;
use crate::{
    core::{
        meter::{MeterData, MeterDataProvider},
        notification::{Notification, NotificationSink},
        policy::{Policy, PolicyResult, arbitrate},
        station::{ChargingStation, ChargingStationData},
        store::Store,
    },
    fmt::FormattedPercentage,
    prelude::*,
    quantity::current::Amperes,
};

/// Relative setpoint change above which an iteration is logged at the info level.
const SIGNIFICANT_CHANGE: f64 = 0.1;

#[must_use]
#[derive(Builder)]
pub struct ControlLoop {
    store: Arc<dyn Store>,
    meter: Arc<dyn MeterDataProvider>,
    charging_station: Arc<dyn ChargingStation>,

    /// Evaluated in order, the earliest one wins a tie.
    policies: Vec<Box<dyn Policy>>,

    #[builder(default)]
    sinks: Vec<Arc<dyn NotificationSink>>,

    /// Sleep between the iterations.
    #[builder(default = Duration::from_secs(5))]
    delay: Duration,

    /// Compute, log and notify, but never send the limit to the station.
    #[builder(default)]
    shadow_mode: bool,

    /// Total number of attempts to obtain consistent readings.
    #[builder(default = 10)]
    max_attempts: usize,

    #[builder(default = Duration::from_millis(200))]
    retry_delay: Duration,
}

impl ControlLoop {
    /// Run until `shutdown` turns `true` or its sender is gone.
    ///
    /// Only unanticipated failures, such as a store or a policy error, end the loop with an error.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result {
        info!(
            delay = ?self.delay,
            shadow_mode = self.shadow_mode,
            n_policies = self.policies.len(),
            "starting the control loop…",
        );
        let mut previous = Amperes::ZERO;
        while !*shutdown.borrow() {
            previous = match self.iterate(Utc::now(), previous).await {
                Ok(current_limit) => current_limit,
                Err(error) => {
                    error!("critical failure, exiting the control loop: {error:#}");
                    return Err(error);
                }
            };
            select! {
                () = sleep(self.delay) => {}
                _ = shutdown.wait_for(|should_stop| *should_stop) => break,
            }
        }
        info!("exiting the control loop");
        Ok(())
    }

    /// Run one iteration and return the binding limit.
    #[instrument(skip_all, fields(previous = ?previous))]
    pub async fn iterate(&mut self, now: DateTime<Utc>, previous: Amperes) -> Result<Amperes> {
        let parameters = self
            .store
            .get_charging_parameters()
            .await
            .context("failed to read the charging parameters")?;
        let price = self.store.get_price(now).await.context("failed to read the current price")?;

        let (charging_station, meter, PolicyResult { current_limit, message }) =
            match self.acquire().await {
                Ok((charging_station, meter)) => {
                    let result = self.evaluate(now, &charging_station, &meter).await?;
                    (Some(charging_station), Some(meter), result)
                }
                Err(error) => {
                    let error = Error::from(error);
                    error!("failed to acquire the readings, holding the previous limit: {error:#}");
                    (None, None, PolicyResult::new(previous, format!("error occurred: {error:#}")))
                }
            };

        if self.shadow_mode {
            warn!(?current_limit, "shadow mode, not sending the current limit");
        } else if let Err(error) = self.charging_station.set_current_limit(current_limit).await {
            error!(?current_limit, "failed to send the current limit: {error:#}");
        }

        let notification = Notification::builder()
            .timestamp(now)
            .parameters(parameters)
            .maybe_price(price.map(|price| price.value()))
            .maybe_charging_station(charging_station)
            .maybe_meter(meter)
            .current_limit(current_limit)
            .message(message)
            .build();
        let relative_change = current_limit.relative_change_from(previous);
        if relative_change > SIGNIFICANT_CHANGE {
            info!(change = %FormattedPercentage(relative_change), "{notification}");
        } else {
            debug!(change = %FormattedPercentage(relative_change), "{notification}");
        }
        for sink in &self.sinks {
            if let Err(error) = sink.notify(&notification).await {
                warn!("failed to notify: {error:#}");
            }
        }

        Ok(current_limit)
    }

    /// Fetch both readings until the meter catches up with the charging station.
    #[instrument(skip_all)]
    async fn acquire(&self) -> Result<(ChargingStationData, MeterData), AcquisitionError> {
        for attempt in 1..=self.max_attempts {
            if attempt != 1 {
                sleep(self.retry_delay).await;
            }
            let (meter, charging_station) =
                join!(self.meter.get_meter_data(), self.charging_station.get_charging_station_data());
            let meter = meter.map_err(AcquisitionError::Meter)?;
            let charging_station = charging_station.map_err(AcquisitionError::ChargingStation)?;

            let voltage_sum = meter.voltage_sum();
            if voltage_sum.0.is_nan() || voltage_sum.0 <= 0.0 {
                return Err(AcquisitionError::Meter(anyhow!(
                    "meter reports a non-positive voltage sum: {voltage_sum}"
                )));
            }
            if meter.total_active_power >= charging_station.real_power_sum {
                return Ok((charging_station, meter));
            }
            warn!(
                attempt,
                total_active_power = ?meter.total_active_power,
                real_power_sum = ?charging_station.real_power_sum,
                "meter is behind the charging station, retrying…",
            );
        }
        Err(AcquisitionError::InconsistentData { attempts: self.max_attempts })
    }

    async fn evaluate(
        &mut self,
        now: DateTime<Utc>,
        charging_station: &ChargingStationData,
        meter: &MeterData,
    ) -> Result<PolicyResult> {
        let mut results = Vec::with_capacity(self.policies.len());
        for policy in &mut self.policies {
            results.push(policy.evaluate(now, charging_station, meter).await?);
        }
        arbitrate(results).context("no policies are registered")
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;
    use crate::{
        core::testing::{
            self,
            FailingSink,
            FakeMeter,
            FakeStation,
            FixedPolicy,
            RecordingSink,
        },
        db::memory::MemoryStore,
        quantity::{power::Watts, voltage::Volts},
    };

    struct Harness {
        meter: Arc<FakeMeter>,
        charging_station: Arc<FakeStation>,
        sink: Arc<RecordingSink>,
    }

    impl Harness {
        fn new(meter: FakeMeter, charging_station: FakeStation) -> Self {
            Self {
                meter: Arc::new(meter),
                charging_station: Arc::new(charging_station),
                sink: Arc::new(RecordingSink::default()),
            }
        }

        fn healthy() -> Self {
            Self::new(
                FakeMeter::new([Some(testing::meter())]),
                FakeStation::new([Some(testing::idle_station())]),
            )
        }

        fn control_loop(&self, policies: Vec<Box<dyn Policy>>, shadow_mode: bool) -> ControlLoop {
            let sink: Arc<dyn NotificationSink> = self.sink.clone();
            ControlLoop::builder()
                .store(Arc::new(MemoryStore::default()))
                .meter(self.meter.clone())
                .charging_station(self.charging_station.clone())
                .policies(policies)
                .sinks(vec![sink])
                .shadow_mode(shadow_mode)
                .retry_delay(Duration::ZERO)
                .build()
        }

        fn messages(&self) -> Vec<String> {
            self.sink.notifications().into_iter().map(|notification| notification.message).collect()
        }
    }

    fn charging_meter() -> MeterData {
        MeterData { total_active_power: Watts(500.0), ..testing::meter() }
    }

    fn charging_station() -> ChargingStationData {
        ChargingStationData { real_power_sum: Watts(2000.0), ..testing::idle_station() }
    }

    #[tokio::test]
    async fn minimum_wins() -> Result {
        let harness = Harness::healthy();
        let mut control_loop = harness.control_loop(
            vec![
                FixedPolicy::boxed(Amperes::INFINITY, "unconstrained"),
                FixedPolicy::boxed(Amperes(6.0), "first"),
                FixedPolicy::boxed(Amperes(6.0), "second"),
            ],
            false,
        );
        let current_limit = control_loop.iterate(testing::now(), Amperes(10.0)).await?;
        assert_eq!(current_limit, Amperes(6.0));
        assert_eq!(harness.charging_station.current_limits(), [Amperes(6.0)]);
        assert_eq!(harness.messages(), ["first"]);
        Ok(())
    }

    #[tokio::test]
    async fn consistent_on_last_attempt() -> Result {
        let meter_readings = std::iter::repeat_n(Some(charging_meter()), 9)
            .chain([Some(MeterData { total_active_power: Watts(2500.0), ..charging_meter() })]);
        let harness = Harness::new(
            FakeMeter::new(meter_readings),
            FakeStation::new([Some(charging_station())]),
        );
        let mut control_loop =
            harness.control_loop(vec![FixedPolicy::boxed(Amperes(8.0), "fixed")], false);
        let current_limit = control_loop.iterate(testing::now(), Amperes(4.0)).await?;
        assert_eq!(current_limit, Amperes(8.0));
        assert_eq!(harness.meter.calls(), 10);
        let notification = &harness.sink.notifications()[0];
        assert_abs_diff_eq!(notification.meter.map_or(0.0, |meter| meter.total_active_power.0), 2500.0);
        Ok(())
    }

    #[tokio::test]
    async fn inconsistent_data_holds_previous_limit() -> Result {
        let harness = Harness::new(
            FakeMeter::new([Some(charging_meter())]),
            FakeStation::new([Some(charging_station())]),
        );
        let mut control_loop =
            harness.control_loop(vec![FixedPolicy::boxed(Amperes(8.0), "fixed")], false);
        let current_limit = control_loop.iterate(testing::now(), Amperes(4.0)).await?;
        assert_eq!(current_limit, Amperes(4.0));
        assert_eq!(harness.meter.calls(), 10);
        assert_eq!(harness.charging_station.current_limits(), [Amperes(4.0)]);
        let notification = &harness.sink.notifications()[0];
        assert!(notification.message.starts_with("error occurred: "));
        assert!(notification.meter.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn meter_failure_holds_previous_limit() -> Result {
        let harness =
            Harness::new(FakeMeter::new([None]), FakeStation::new([Some(testing::idle_station())]));
        let mut control_loop =
            harness.control_loop(vec![FixedPolicy::boxed(Amperes(8.0), "fixed")], false);
        assert_eq!(control_loop.iterate(testing::now(), Amperes::ZERO).await?, Amperes::ZERO);
        assert_eq!(harness.meter.calls(), 1);
        assert_eq!(
            harness.messages(),
            ["error occurred: failed to read the meter: meter is unreachable"],
        );
        Ok(())
    }

    #[tokio::test]
    async fn station_failure_holds_previous_limit() -> Result {
        let harness = Harness::new(FakeMeter::new([Some(testing::meter())]), FakeStation::new([None]));
        let mut control_loop =
            harness.control_loop(vec![FixedPolicy::boxed(Amperes(8.0), "fixed")], false);
        assert_eq!(control_loop.iterate(testing::now(), Amperes(7.0)).await?, Amperes(7.0));
        Ok(())
    }

    #[tokio::test]
    async fn zero_voltage_is_meter_error() -> Result {
        let meter = MeterData { voltages: [Volts::ZERO; 3], ..testing::meter() };
        let harness = Harness::new(
            FakeMeter::new([Some(meter)]),
            FakeStation::new([Some(testing::idle_station())]),
        );
        let mut control_loop =
            harness.control_loop(vec![FixedPolicy::boxed(Amperes(8.0), "fixed")], false);
        assert_eq!(control_loop.iterate(testing::now(), Amperes(3.0)).await?, Amperes(3.0));
        assert!(harness.messages()[0].contains("voltage"));
        Ok(())
    }

    #[tokio::test]
    async fn shadow_mode_notifies_without_sending() -> Result {
        let harness = Harness::healthy();
        let mut control_loop =
            harness.control_loop(vec![FixedPolicy::boxed(Amperes(8.0), "fixed")], true);
        assert_eq!(control_loop.iterate(testing::now(), Amperes::ZERO).await?, Amperes(8.0));
        assert!(harness.charging_station.current_limits().is_empty());
        assert_eq!(harness.messages(), ["fixed"]);
        Ok(())
    }

    #[tokio::test]
    async fn actuation_failure_is_swallowed() -> Result {
        let harness = Harness::new(
            FakeMeter::new([Some(testing::meter())]),
            FakeStation::new([Some(testing::idle_station())]).failing_to_set(),
        );
        let mut control_loop =
            harness.control_loop(vec![FixedPolicy::boxed(Amperes(8.0), "fixed")], false);
        assert_eq!(control_loop.iterate(testing::now(), Amperes::ZERO).await?, Amperes(8.0));
        assert_eq!(harness.messages(), ["fixed"]);
        Ok(())
    }

    #[tokio::test]
    async fn sink_failure_is_swallowed() -> Result {
        let harness = Harness::healthy();
        let sinks: Vec<Arc<dyn NotificationSink>> = vec![Arc::new(FailingSink), harness.sink.clone()];
        let mut control_loop = ControlLoop::builder()
            .store(Arc::new(MemoryStore::default()))
            .meter(harness.meter.clone())
            .charging_station(harness.charging_station.clone())
            .policies(vec![FixedPolicy::boxed(Amperes(8.0), "fixed")])
            .sinks(sinks)
            .build();
        assert_eq!(control_loop.iterate(testing::now(), Amperes::ZERO).await?, Amperes(8.0));
        assert_eq!(harness.messages(), ["fixed"]);
        Ok(())
    }

    #[tokio::test]
    async fn policy_error_is_fatal() {
        let harness = Harness::healthy();
        let mut control_loop = harness.control_loop(vec![FixedPolicy::failing()], false);
        assert!(control_loop.iterate(testing::now(), Amperes::ZERO).await.is_err());
        assert!(harness.charging_station.current_limits().is_empty());
    }

    #[tokio::test]
    async fn no_policies_is_fatal() {
        let harness = Harness::healthy();
        let mut control_loop = harness.control_loop(Vec::new(), false);
        assert!(control_loop.iterate(testing::now(), Amperes::ZERO).await.is_err());
    }

    #[tokio::test]
    async fn run_stops_before_first_iteration() -> Result {
        let harness = Harness::healthy();
        let (_sender, shutdown) = watch::channel(true);
        harness.control_loop(vec![FixedPolicy::boxed(Amperes(8.0), "fixed")], false).run(shutdown).await?;
        assert_eq!(harness.meter.calls(), 0);
        Ok(())
    }

    #[tokio::test]
    async fn run_is_cancelled_during_sleep() -> Result {
        let harness = Harness::healthy();
        let (sender, shutdown) = watch::channel(false);
        let control_loop = ControlLoop::builder()
            .store(Arc::new(MemoryStore::default()))
            .meter(harness.meter.clone())
            .charging_station(harness.charging_station.clone())
            .policies(vec![FixedPolicy::boxed(Amperes(8.0), "fixed")])
            .delay(Duration::from_secs(3600))
            .build();
        let stopper = tokio::spawn(async move {
            sleep(Duration::from_millis(50)).await;
            sender.send(true)
        });
        control_loop.run(shutdown).await?;
        stopper.await??;
        assert_eq!(harness.charging_station.current_limits(), [Amperes(8.0)]);
        Ok(())
    }

    #[tokio::test]
    async fn run_fails_on_policy_error() {
        let harness = Harness::healthy();
        let (_sender, shutdown) = watch::channel(false);
        let control_loop = harness.control_loop(vec![FixedPolicy::failing()], false);
        assert!(control_loop.run(shutdown).await.is_err());
    }
}
