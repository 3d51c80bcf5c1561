pub mod control;
pub mod meter;
pub mod notification;
pub mod parameters;
pub mod policy;
pub mod price;
pub mod station;
pub mod store;
#[cfg(test)]
pub mod testing;
