#[macro_use]
pub mod macros;

pub mod current;
pub mod energy;
pub mod power;
pub mod price;
pub mod voltage;
