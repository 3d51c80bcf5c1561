use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::{net::TcpStream, sync::Mutex, time::timeout};
use tokio_modbus::{
    Slave,
    SlaveId,
    client::{Reader, Writer, tcp::attach_slave},
};

use crate::{
    core::station::{ChargingStation, ChargingStationData},
    prelude::*,
    quantity::{current::Amperes, power::Watts},
};

/// Alfen Eve charging station, socket 1, over Modbus TCP.
///
/// The station must be configured for active load balancing with the «Energy Management System» as
/// the data source, otherwise it does not accept connections.
pub struct Client {
    host: String,
    port: u16,
    slave: Slave,

    /// Dropped after any failure, so that the next call reconnects.
    context: Mutex<Option<tokio_modbus::client::Context>>,
}

impl Client {
    const CURRENTS_ADDRESS: u16 = 320;
    const REAL_POWER_SUM_ADDRESS: u16 = 344;
    const ACTUAL_MAX_CURRENT_ADDRESS: u16 = 1206;
    const MAX_CURRENT_SETPOINT_ADDRESS: u16 = 1210;

    const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
    const CALL_TIMEOUT: Duration = Duration::from_secs(10);
    const SLOW_CALL: Duration = Duration::from_millis(500);

    /// Connects lazily on the first call.
    pub fn new(host: String, port: u16, slave_id: SlaveId) -> Self {
        Self { host, port, slave: Slave(slave_id), context: Mutex::new(None) }
    }

    #[instrument(skip_all, fields(host = %self.host, port = self.port))]
    async fn connect(&self) -> Result<tokio_modbus::client::Context> {
        info!("connecting…");
        let address = (self.host.as_str(), self.port);
        let tcp_stream = timeout(Self::CONNECT_TIMEOUT, TcpStream::connect(address))
            .await
            .context("timed out while connecting to the charging station")?
            .context("failed to connect to the charging station")?;
        tcp_stream.set_nodelay(true)?;
        info!("connected");
        Ok(attach_slave(tcp_stream, self.slave))
    }

    async fn read_data(context: &mut tokio_modbus::client::Context) -> Result<ChargingStationData> {
        let n_words = Self::REAL_POWER_SUM_ADDRESS - Self::CURRENTS_ADDRESS + 2;
        let words = timeout(
            Self::CALL_TIMEOUT,
            context.read_holding_registers(Self::CURRENTS_ADDRESS, n_words),
        )
        .await
        .context("timed out reading the measurements")???;
        ensure!(
            words.len() == usize::from(n_words),
            "read {} words while expected {n_words}",
            words.len(),
        );
        let power_offset = usize::from(Self::REAL_POWER_SUM_ADDRESS - Self::CURRENTS_ADDRESS);

        let words_limit = timeout(
            Self::CALL_TIMEOUT,
            context.read_holding_registers(Self::ACTUAL_MAX_CURRENT_ADDRESS, 2),
        )
        .await
        .context("timed out reading the actual max current")???;

        Ok(ChargingStationData::builder()
            .currents([
                Amperes(decode_f32(&words[0..2])?.into()),
                Amperes(decode_f32(&words[2..4])?.into()),
                Amperes(decode_f32(&words[4..6])?.into()),
            ])
            .real_power_sum(Watts(decode_f32(&words[power_offset..power_offset + 2])?.into()))
            .current_limit(Amperes(decode_f32(&words_limit)?.into()))
            .build())
    }

    async fn write_current_limit(
        context: &mut tokio_modbus::client::Context,
        current_limit: Amperes,
    ) -> Result {
        #[expect(clippy::cast_possible_truncation)]
        let words = encode_f32(current_limit.0 as f32);
        timeout(
            Self::CALL_TIMEOUT,
            context.write_multiple_registers(Self::MAX_CURRENT_SETPOINT_ADDRESS, &words),
        )
        .await
        .context("timed out writing the current limit")???;
        Ok(())
    }

    fn log_duration(started_at: Instant, operation: &str) {
        let elapsed = started_at.elapsed();
        if elapsed >= Self::SLOW_CALL {
            warn!(?elapsed, operation, "slow modbus call");
        } else {
            debug!(?elapsed, operation, "done");
        }
    }
}

#[async_trait]
impl ChargingStation for Client {
    #[instrument(skip_all, fields(host = %self.host))]
    async fn get_charging_station_data(&self) -> Result<ChargingStationData> {
        let mut slot = self.context.lock().await;
        let mut context = match slot.take() {
            Some(context) => context,
            None => self.connect().await?,
        };
        let started_at = Instant::now();
        let result = Self::read_data(&mut context).await;
        Self::log_duration(started_at, "read");
        match result {
            Ok(data) => {
                *slot = Some(context);
                debug!(
                    power = ?data.real_power_sum,
                    currents = ?data.currents,
                    limit = ?data.current_limit,
                );
                Ok(data)
            }
            Err(error) => {
                warn!("dropping the connection after a failed read");
                Err(error.context(format!(
                    "failed to read from the charging station at `{}`",
                    self.host,
                )))
            }
        }
    }

    #[instrument(skip_all, fields(host = %self.host, current_limit = ?current_limit))]
    async fn set_current_limit(&self, current_limit: Amperes) -> Result {
        let mut slot = self.context.lock().await;
        let mut context = match slot.take() {
            Some(context) => context,
            None => self.connect().await?,
        };
        let started_at = Instant::now();
        let result = Self::write_current_limit(&mut context, current_limit).await;
        Self::log_duration(started_at, "write");
        if result.is_ok() {
            *slot = Some(context);
        } else {
            warn!("dropping the connection after a failed write");
        }
        result.with_context(|| {
            format!("failed to send the current limit to the charging station at `{}`", self.host)
        })
    }
}

/// Big-endian word pair.
fn decode_f32(words: &[u16]) -> Result<f32> {
    let [high, low] = words else { bail!("expected two words, got {}", words.len()) };
    Ok(f32::from_bits((u32::from(*high) << 16) | u32::from(*low)))
}

#[expect(clippy::cast_possible_truncation)]
fn encode_f32(value: f32) -> [u16; 2] {
    let bits = value.to_bits();
    [(bits >> 16) as u16, bits as u16]
}
