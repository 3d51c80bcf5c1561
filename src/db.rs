pub mod charging_parameters;
#[cfg(test)]
pub mod memory;
pub mod prices;

use std::{
    path::Path,
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use crate::{
    core::{parameters::ChargingControlParameters, price::ElectricityPrice, store::Store},
    db::{charging_parameters::ChargingParameters, prices::Prices},
    ops::Interval,
    prelude::*,
};

/// SQLite-backed store.
///
/// All timestamps are stored as Unix seconds.
pub struct Db(Mutex<Connection>);

impl Db {
    // language=sqlite
    const SCHEMA: &str = r"
        CREATE TABLE IF NOT EXISTS charging_parameters (
            id                          INTEGER PRIMARY KEY AUTOINCREMENT,
            timestamp                   INTEGER NOT NULL,
            max_total_power_watts       REAL NOT NULL,
            max_price_eurocent_per_mwh  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS prices (
            start_timestamp INTEGER NOT NULL,
            end_timestamp   INTEGER NOT NULL,
            price           INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_prices_start ON prices(start_timestamp);
    ";

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        info!("opening the database…");
        let connection = Connection::open(path.as_ref())
            .with_context(|| format!("failed to open `{}`", path.as_ref().display()))?;
        Self::initialize(connection)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(connection: Connection) -> Result<Self> {
        connection.execute_batch(Self::SCHEMA).context("failed to initialize the schema")?;
        Ok(Self(Mutex::new(connection)))
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>> {
        self.0.lock().map_err(|_| anyhow!("the database connection is poisoned"))
    }
}

#[async_trait]
impl Store for Db {
    async fn get_charging_parameters(&self) -> Result<ChargingControlParameters> {
        ChargingParameters(&*self.connection()?).get_latest()
    }

    async fn save_charging_parameters(&self, parameters: &ChargingControlParameters) -> Result {
        ChargingParameters(&*self.connection()?).insert(Utc::now(), parameters)
    }

    async fn get_price(&self, at: DateTime<Utc>) -> Result<Option<ElectricityPrice>> {
        Prices(&*self.connection()?).get_at(at)
    }

    async fn get_prices(&self, interval: Interval) -> Result<Vec<ElectricityPrice>> {
        Prices(&*self.connection()?).find(interval)
    }

    async fn save_prices(&self, prices: &[ElectricityPrice]) -> Result {
        let mut connection = self.connection()?;
        let transaction = connection.transaction()?;
        Prices(&transaction).insert_all(prices)?;
        transaction.commit()?;
        Ok(())
    }
}

/// Convert the stored Unix seconds back.
fn from_timestamp(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0).with_context(|| format!("invalid timestamp: {secs}"))
}
