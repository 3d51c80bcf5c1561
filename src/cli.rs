mod db;
mod parameters;
mod prices;
mod steer;

use clap::{Parser, Subcommand};

pub use self::{parameters::ParametersArgs, prices::PricesArgs, steer::SteerArgs};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: run the control loop until interrupted.
    #[clap(name = "steer")]
    Steer(Box<SteerArgs>),

    /// Show or change the charging parameters.
    #[clap(name = "parameters")]
    Parameters(ParametersArgs),

    /// List or add day-ahead prices.
    #[clap(name = "prices")]
    Prices(PricesArgs),
}
