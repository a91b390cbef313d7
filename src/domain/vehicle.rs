// Vehicle domain model
use serde::Serialize;

/// Number of distinct colors handed out to vehicles before the palette wraps.
pub const COLOR_PALETTE_SIZE: u8 = 10;

/// Latest known reading for one vehicle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleState {
    /// Epoch milliseconds of the reading. Zero means "no reading yet".
    pub time: i64,
    pub energy: f64,
    pub odometer: f64,
    pub speed: f64,
    pub state_of_charge: f64,
    pub latitude: f64,
    pub longitude: f64,
}

impl VehicleState {
    /// Overwrite every field with the incoming reading.
    ///
    /// The destructuring makes adding a telemetry field a compile error here
    /// until it is copied too.
    pub fn apply(&mut self, incoming: &VehicleState) {
        let VehicleState {
            time,
            energy,
            odometer,
            speed,
            state_of_charge,
            latitude,
            longitude,
        } = *incoming;

        self.time = time;
        self.energy = energy;
        self.odometer = odometer;
        self.speed = speed;
        self.state_of_charge = state_of_charge;
        self.latitude = latitude;
        self.longitude = longitude;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub name: String,
    pub color_index: u8,
    pub state: VehicleState,
}

impl Vehicle {
    pub fn new(name: String, color_index: u8) -> Self {
        Self {
            name,
            color_index,
            state: VehicleState::default(),
        }
    }
}

/// Averaged result of one closed time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPoint {
    pub timestamp: i64,
    pub speed: f64,
    pub state_of_charge: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub vehicle_name: String,
    pub color_index: u8,
    #[serde(flatten)]
    pub point: HistoryPoint,
}

impl HistoryEvent {
    pub fn new(vehicle: &Vehicle, point: HistoryPoint) -> Self {
        Self {
            vehicle_name: vehicle.name.clone(),
            color_index: vehicle.color_index,
            point,
        }
    }
}
