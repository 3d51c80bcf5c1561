use std::{num::NonZeroUsize, sync::Arc};

use clap::{Parser, ValueEnum};
use reqwest::Url;
use tokio::{select, sync::watch};
use tokio_modbus::SlaveId;

use crate::{
    api::{alfen, homewizard, webhook},
    cli::db::DbArgs,
    core::{
        control::ControlLoop,
        notification::{LogSink, NotificationSink},
        policy::{
            CapacityTariffPolicy,
            Policy,
            PricePolicy,
            QuarterHourCapacityTariffPolicy,
            WireCapacityPolicy,
        },
        store::Store,
    },
    prelude::*,
    quantity::current::Amperes,
};

#[derive(Parser)]
pub struct SteerArgs {
    #[clap(long, env = "LOOP_DELAY", default_value = "5s")]
    loop_delay: humantime::Duration,

    /// Maximum safe current of a single phase of the household wiring.
    #[clap(long = "max-safe-current-amperes", env = "MAX_SAFE_CURRENT_AMPERES", default_value = "16")]
    max_safe_current: Amperes,

    /// Compute and log the limits without sending them to the charging station.
    #[clap(long, env = "SHADOW_MODE")]
    shadow_mode: bool,

    /// Attempts to obtain the meter readings consistent with the charging station.
    #[clap(long, env = "CONSISTENCY_MAX_ATTEMPTS", default_value = "10")]
    consistency_max_attempts: NonZeroUsize,

    #[clap(long, env = "CONSISTENCY_RETRY_DELAY", default_value = "200ms")]
    consistency_retry_delay: humantime::Duration,

    #[clap(long, env = "CAPACITY_TARIFF", value_enum, default_value = "quarter-hour")]
    capacity_tariff: CapacityTariff,

    /// HomeWizard P1 meter data URL, for example: `http://192.168.1.10/api/v1/data`.
    #[clap(long, env = "METER_URL")]
    meter_url: Url,

    #[clap(flatten)]
    charging_station: ChargingStationArgs,

    /// Optional URL to post every iteration's notification to.
    #[clap(long, env = "NOTIFICATION_URL")]
    notification_url: Option<Url>,

    #[clap(flatten)]
    db: DbArgs,
}

#[derive(Parser)]
struct ChargingStationArgs {
    #[clap(long = "charging-station-host", env = "CHARGING_STATION_HOST")]
    host: String,

    #[clap(long = "charging-station-port", env = "CHARGING_STATION_PORT", default_value = "502")]
    port: u16,

    #[clap(long = "charging-station-slave-id", env = "CHARGING_STATION_SLAVE_ID", default_value = "1")]
    slave_id: SlaveId,
}

/// How the maximum total power is enforced.
#[derive(Copy, Clone, ValueEnum)]
enum CapacityTariff {
    /// Instantaneous meter power.
    Instantaneous,

    /// Average meter power over each quarter hour.
    QuarterHour,
}

impl SteerArgs {
    pub async fn run(self) -> Result {
        let store: Arc<dyn Store> = Arc::new(self.db.open()?);

        let mut sinks: Vec<Arc<dyn NotificationSink>> = vec![Arc::new(LogSink)];
        if let Some(url) = self.notification_url {
            sinks.push(Arc::new(webhook::Sink::new(url)?));
        }

        let mut policies: Vec<Box<dyn Policy>> = vec![
            Box::new(PricePolicy::new(store.clone())),
            Box::new(WireCapacityPolicy::new(self.max_safe_current)),
        ];
        match self.capacity_tariff {
            CapacityTariff::Instantaneous => {
                policies.push(Box::new(CapacityTariffPolicy::new(store.clone())));
            }
            CapacityTariff::QuarterHour => {
                policies.push(Box::new(QuarterHourCapacityTariffPolicy::new(store.clone())));
            }
        }

        let (shutdown_sender, shutdown) = watch::channel(false);
        tokio::spawn(async move {
            match shutdown_signal().await {
                Ok(()) => {
                    info!("shutting down…");
                    let _ = shutdown_sender.send(true);
                }
                Err(error) => {
                    // The loop stops once the sender is dropped.
                    error!("failed to install the signal handlers: {error:#}");
                    std::future::pending::<()>().await;
                }
            }
        });

        ControlLoop::builder()
            .store(store)
            .meter(Arc::new(homewizard::Client::new(self.meter_url)?))
            .charging_station(Arc::new(alfen::Client::new(
                self.charging_station.host,
                self.charging_station.port,
                self.charging_station.slave_id,
            )))
            .policies(policies)
            .sinks(sinks)
            .delay(self.loop_delay.into())
            .shadow_mode(self.shadow_mode)
            .max_attempts(self.consistency_max_attempts.get())
            .retry_delay(self.consistency_retry_delay.into())
            .build()
            .run(shutdown)
            .await
    }
}

/// Wait for Ctrl+C or, on Unix, `SIGTERM`.
async fn shutdown_signal() -> Result {
    #[cfg(unix)]
    {
        let mut terminate =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    Ok(())
}
