// Decoding of upstream telemetry messages
use crate::application::fleet_service::Sample;
use crate::domain::vehicle::VehicleState;
use serde::{Deserialize, Deserializer};

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),
    #[error("malformed gps field {0:?}, expected \"<lat>|<lon>\"")]
    Gps(String),
    #[error("time {0} is not a whole number of milliseconds")]
    Time(f64),
}

/// One message as produced by the broadcaster.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SocketDataPoint {
    vehicle_name: String,
    #[serde(deserialize_with = "numeric")]
    time: f64,
    #[serde(deserialize_with = "numeric")]
    energy: f64,
    #[serde(deserialize_with = "numeric")]
    odo: f64,
    #[serde(deserialize_with = "numeric")]
    speed: f64,
    #[serde(deserialize_with = "numeric")]
    soc: f64,
    gps: String,
}

/// Numbers arrive either as JSON numbers or as strings holding a number.
fn numeric<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("not a number: {:?}", text))),
    }
}

fn parse_gps(gps: &str) -> Result<(f64, f64), DecodeError> {
    let invalid = || DecodeError::Gps(gps.to_string());
    let (lat, lon) = gps.split_once('|').ok_or_else(invalid)?;
    let latitude = lat.trim().parse().map_err(|_| invalid())?;
    let longitude = lon.trim().parse().map_err(|_| invalid())?;
    Ok((latitude, longitude))
}

/// Epoch milliseconds. Fractions are rejected rather than truncated, so two
/// distinct readings can never collapse onto the same timestamp.
fn parse_time(time: f64) -> Result<i64, DecodeError> {
    if !time.is_finite() {
        return Ok(0);
    }
    if time.fract() != 0.0 {
        return Err(DecodeError::Time(time));
    }
    Ok(time as i64)
}

/// Decode one message into a sample ready for the reconciler.
///
/// A non-finite `time` decodes to 0, which the reconciler drops as corrupt.
/// A fractional `time` is rejected.
pub fn decode_sample(line: &str) -> Result<Sample, DecodeError> {
    let point: SocketDataPoint = serde_json::from_str(line)?;
    let time = parse_time(point.time)?;
    let (latitude, longitude) = parse_gps(&point.gps)?;

    Ok(Sample {
        vehicle_name: point.vehicle_name,
        state: VehicleState {
            time,
            energy: point.energy,
            odometer: point.odo,
            speed: point.speed,
            state_of_charge: point.soc,
            latitude,
            longitude,
        },
    })
}
