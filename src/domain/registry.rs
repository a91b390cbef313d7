// Registry of known vehicles, kept sorted by name
use super::vehicle::{COLOR_PALETTE_SIZE, Vehicle};

/// Ordered collection of every vehicle seen so far plus the selection pointer.
///
/// Vehicles are never removed. Names are compared by byte order (`str::cmp`),
/// not locale collation, so `"Bus 9"` sorts before `"bus 2"`.
#[derive(Debug, Default)]
pub struct VehicleRegistry {
    vehicles: Vec<Vehicle>,
    selected: Option<String>,
    next_color_index: u8,
}

impl VehicleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index of the vehicle named `name`, creating it first if
    /// needed. The flag is `true` when the vehicle was just created.
    pub fn get_or_create(&mut self, name: &str) -> (usize, bool) {
        match self.position(name) {
            Ok(index) => (index, false),
            Err(index) => {
                let color_index = self.next_color_index;
                self.next_color_index = (self.next_color_index + 1) % COLOR_PALETTE_SIZE;
                self.vehicles
                    .insert(index, Vehicle::new(name.to_string(), color_index));
                (index, true)
            }
        }
    }

    /// Points the selection at `name`, or clears it when `name` is unknown.
    pub fn select(&mut self, name: &str) {
        self.selected = self.position(name).ok().map(|_| name.to_string());
    }

    pub fn selected(&self) -> Option<&Vehicle> {
        let name = self.selected.as_deref()?;
        self.get(name)
    }

    pub fn get(&self, name: &str) -> Option<&Vehicle> {
        self.position(name).ok().map(|index| &self.vehicles[index])
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub(crate) fn vehicle_mut(&mut self, index: usize) -> &mut Vehicle {
        &mut self.vehicles[index]
    }

    pub(crate) fn vehicles_mut(&mut self) -> impl Iterator<Item = &mut Vehicle> {
        self.vehicles.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    fn position(&self, name: &str) -> Result<usize, usize> {
        self.vehicles
            .binary_search_by(|vehicle| vehicle.name.as_str().cmp(name))
    }
}
