use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};

use crate::{
    core::parameters::ChargingControlParameters,
    prelude::*,
    quantity::{power::Watts, price::EurocentsPerMegawattHour},
};

pub struct ChargingParameters<'c>(pub &'c Connection);

impl ChargingParameters<'_> {
    /// Only the newest row is in use, older ones are kept as history.
    #[instrument(skip_all)]
    pub fn get_latest(&self) -> Result<ChargingControlParameters> {
        // language=sqlite
        const SQL: &str = r"
            SELECT max_total_power_watts, max_price_eurocent_per_mwh
            FROM charging_parameters
            ORDER BY id DESC
            LIMIT 1
        ";

        let parameters = self
            .0
            .prepare_cached(SQL)?
            .query_row([], |row| {
                Ok(ChargingControlParameters {
                    max_total_power: Watts(row.get(0)?),
                    max_price: EurocentsPerMegawattHour(row.get(1)?),
                })
            })
            .optional()
            .context("failed to query the charging parameters")?
            .unwrap_or_default();
        debug!(%parameters);
        Ok(parameters)
    }

    #[instrument(skip_all, fields(%parameters))]
    pub fn insert(&self, timestamp: DateTime<Utc>, parameters: &ChargingControlParameters) -> Result {
        // language=sqlite
        const SQL: &str = r"
            INSERT INTO charging_parameters (
                timestamp,
                max_total_power_watts,
                max_price_eurocent_per_mwh
            ) VALUES (?1, ?2, ?3)
        ";

        info!("saving the charging parameters…");
        self.0.prepare_cached(SQL)?.execute(params![
            timestamp.timestamp(),
            parameters.max_total_power.0,
            parameters.max_price.0,
        ])?;
        Ok(())
    }
}
