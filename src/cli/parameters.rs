use clap::{Parser, Subcommand};

use crate::{
    cli::db::DbArgs,
    core::{parameters::ChargingControlParameters, store::Store},
    prelude::*,
    quantity::{power::Watts, price::EurocentsPerMegawattHour},
    tables::build_parameters_table,
};

#[derive(Parser)]
pub struct ParametersArgs {
    #[clap(flatten)]
    db: DbArgs,

    #[command(subcommand)]
    command: ParametersCommand,
}

#[derive(Subcommand)]
enum ParametersCommand {
    /// Show the parameters in effect.
    Show,

    /// Save new parameters, they take effect in the next control loop iteration.
    Set {
        /// Maximum total meter power.
        #[clap(long = "max-total-power-watts", env = "MAX_TOTAL_POWER_WATTS")]
        max_total_power: Watts,

        /// Maximum acceptable day-ahead price.
        #[clap(long = "max-price-eurocent-per-mwh", env = "MAX_PRICE_EUROCENT_PER_MWH")]
        max_price: EurocentsPerMegawattHour,
    },
}

impl ParametersArgs {
    pub async fn run(self) -> Result {
        let db = self.db.open()?;
        match self.command {
            ParametersCommand::Show => {}
            ParametersCommand::Set { max_total_power, max_price } => {
                let parameters = ChargingControlParameters::builder()
                    .max_total_power(max_total_power)
                    .max_price(max_price)
                    .build();
                db.save_charging_parameters(&parameters).await?;
            }
        }
        println!("{}", build_parameters_table(&db.get_charging_parameters().await?));
        Ok(())
    }
}
