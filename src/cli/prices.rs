use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use clap::{Parser, Subcommand};

use crate::{
    cli::db::DbArgs,
    core::{price::ElectricityPrice, store::Store},
    ops::Interval,
    prelude::*,
    quantity::price::EurocentsPerMegawattHour,
    tables::build_prices_table,
};

#[derive(Parser)]
pub struct PricesArgs {
    #[clap(flatten)]
    db: DbArgs,

    #[command(subcommand)]
    command: PricesCommand,
}

#[derive(Subcommand)]
enum PricesCommand {
    /// List the prices overlapping the period.
    List {
        /// Start of the period, the current hour by default.
        #[clap(long)]
        since: Option<DateTime<Utc>>,

        #[clap(long, default_value = "1day")]
        period: humantime::Duration,
    },

    /// Add a single price point.
    Add {
        /// Inclusive, for example `2025-06-01T12:00:00Z`.
        #[clap(long)]
        start: DateTime<Utc>,

        /// Exclusive.
        #[clap(long)]
        end: DateTime<Utc>,

        #[clap(long = "eurocent-per-mwh", allow_negative_numbers = true)]
        price: EurocentsPerMegawattHour,
    },
}

impl PricesArgs {
    pub async fn run(self) -> Result {
        let db = self.db.open()?;
        match self.command {
            PricesCommand::List { since, period } => {
                let start = match since {
                    Some(since) => since,
                    None => Utc::now().duration_trunc(TimeDelta::hours(1))?,
                };
                let interval =
                    Interval::from_std(start..(start + TimeDelta::from_std(period.into())?));
                let prices = db.get_prices(interval).await?;
                info!(?interval, n_prices = prices.len(), "fetched the prices");
                println!("{}", build_prices_table(&prices));
            }
            PricesCommand::Add { start, end, price } => {
                let price = ElectricityPrice::try_new(Interval::from_std(start..end), price)?;
                db.save_prices(&[price]).await?;
                info!(?start, ?end, value = %price.value(), "saved");
            }
        }
        Ok(())
    }
}
