use chrono::{DateTime, Utc};
use rusqlite::{Connection, Params, params};

use crate::{
    core::price::ElectricityPrice,
    db::from_timestamp,
    ops::Interval,
    prelude::*,
    quantity::price::EurocentsPerMegawattHour,
};

pub struct Prices<'c>(pub &'c Connection);

impl Prices<'_> {
    /// Price covering the instant, an integrity error when there are several.
    #[instrument(skip_all, fields(at = %at))]
    pub fn get_at(&self, at: DateTime<Utc>) -> Result<Option<ElectricityPrice>> {
        // language=sqlite
        const SQL: &str = r"
            SELECT start_timestamp, end_timestamp, price
            FROM prices
            WHERE start_timestamp <= ?1 AND ?1 < end_timestamp
        ";

        let mut prices = self.query(SQL, params![at.timestamp()])?;
        ensure!(prices.len() <= 1, "integrity error: {} prices cover {at}", prices.len());
        Ok(prices.pop())
    }

    /// Prices overlapping the interval, ordered by start.
    #[instrument(skip_all, fields(interval = ?interval))]
    pub fn find(&self, interval: Interval) -> Result<Vec<ElectricityPrice>> {
        // language=sqlite
        const SQL: &str = r"
            SELECT start_timestamp, end_timestamp, price
            FROM prices
            WHERE start_timestamp < ?2 AND ?1 < end_timestamp
            ORDER BY start_timestamp
        ";

        let prices =
            self.query(SQL, params![interval.start.timestamp(), interval.end.timestamp()])?;
        debug!(n_prices = prices.len(), "found");
        Ok(prices)
    }

    /// Insert the prices one by one, failing on the first overlap.
    ///
    /// Expected to run inside a transaction.
    #[instrument(skip_all, fields(n_prices = prices.len()))]
    pub fn insert_all(&self, prices: &[ElectricityPrice]) -> Result {
        // language=sqlite
        const SQL: &str = "INSERT INTO prices (start_timestamp, end_timestamp, price) VALUES (?1, ?2, ?3)";

        info!("saving the prices…");
        for price in prices {
            let interval = price.interval();
            let overlapping = self.find(interval)?;
            if let Some(existing) = overlapping.first() {
                bail!(
                    "price interval `{interval:?}` overlaps the existing `{:?}`",
                    existing.interval(),
                );
            }
            self.0.prepare_cached(SQL)?.execute(params![
                interval.start.timestamp(),
                interval.end.timestamp(),
                price.value().0,
            ])?;
        }
        Ok(())
    }

    fn query(&self, sql: &str, params: impl Params) -> Result<Vec<ElectricityPrice>> {
        let mut statement = self.0.prepare_cached(sql)?;
        let rows = statement.query_map(params, |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?, row.get::<_, i64>(2)?))
        })?;
        rows.map(|row| {
            let (start, end, value) = row?;
            ElectricityPrice::try_new(
                Interval { start: from_timestamp(start)?, end: from_timestamp(end)? },
                EurocentsPerMegawattHour(value),
            )
        })
        .collect()
    }
}
