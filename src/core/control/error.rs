/// Failure to acquire a usable pair of readings.
///
/// The control loop recovers from all of these by holding the previous limit.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read the meter")]
    Meter(#[source] anyhow::Error),

    #[error("failed to read the charging station")]
    ChargingStation(#[source] anyhow::Error),

    #[error("meter power is still below the charging station power after {attempts} attempts")]
    InconsistentData { attempts: usize },
}
