//! Raw count to lux conversion.
//!
//! The VEML6030 resolution per count depends on both the gain and the
//! integration time and is not a closed-form function of the two, so it is
//! taken from the resolution table of the Vishay application note
//! "Designing the VEML6030 Into an Application" (document 84367, table 1).

use log::debug;

use crate::veml6030::{Error, Gain, IntegrationTime};

/// lux/count, rows by integration time rank, columns by gain rank.
const RESOLUTION: [[f64; 4]; 6] = [
    [0.0036, 0.0072, 0.0288, 0.0576],
    [0.0072, 0.0144, 0.0576, 0.1152],
    [0.0144, 0.0288, 0.1152, 0.2304],
    [0.0288, 0.0576, 0.2304, 0.4608],
    [0.0576, 0.1152, 0.4608, 0.9216],
    [0.1152, 0.2304, 0.9216, 1.8432],
];

fn gain_column(gain: Gain) -> usize {
    match gain {
        Gain::Two => 0,
        Gain::One => 1,
        Gain::OneEighth => 2,
        Gain::OneQuarter => 3,
    }
}

fn integration_time_row(it: IntegrationTime) -> usize {
    match it {
        IntegrationTime::_800ms => 0,
        IntegrationTime::_400ms => 1,
        IntegrationTime::_200ms => 2,
        IntegrationTime::_100ms => 3,
        IntegrationTime::_50ms => 4,
        IntegrationTime::_25ms => 5,
    }
}

/// Lux per count for a gain / integration time pair.
pub fn resolution(gain: Gain, it: IntegrationTime) -> f64 {
    let (row, column) = (integration_time_row(it), gain_column(gain));
    debug!("Looking up resolution in row {row}, column {column}");
    RESOLUTION[row][column]
}

/// Lux per count for raw ALS_CONF gain and integration time bit patterns.
///
/// # Errors
/// `InvalidArgument` if either pattern has no entry in the table.
pub fn resolution_from_bits(gain: u16, integration_time: u16) -> Result<f64, Error> {
    match (
        Gain::from_bits(gain),
        IntegrationTime::from_bits(integration_time),
    ) {
        (Some(g), Some(it)) => Ok(resolution(g, it)),
        _ => Err(Error::InvalidArgument {
            gain,
            integration_time,
        }),
    }
}

pub fn to_lux(raw: u16, gain: Gain, it: IntegrationTime) -> f64 {
    f64::from(raw) * resolution(gain, it)
}
