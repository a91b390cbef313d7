// Stream reconciler - Applies raw samples to per-vehicle state
use crate::domain::aggregation::{AggregationBuffer, DEFAULT_BUCKET_WIDTH_MS};
use crate::domain::notification::{NotificationBus, SubscriptionId};
use crate::domain::registry::VehicleRegistry;
use crate::domain::vehicle::{HistoryEvent, Vehicle, VehicleState};
use std::collections::HashMap;

/// What happened to a sample handed to [`StreamReconciler::process`].
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    /// Stored; the vehicle's bucket is still open.
    Accepted,
    /// Stored, and it closed the previous bucket of this vehicle.
    Flushed(HistoryEvent),
    /// A producer restart was detected; every vehicle was reset and the
    /// sample became the new baseline.
    AcceptedAfterReset,
    /// Missing timestamp.
    Corrupt,
    /// Same timestamp as the current state.
    Duplicate,
    /// Older than the current state and no reset was expected.
    Stale,
}

impl SampleOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(
            self,
            SampleOutcome::Accepted | SampleOutcome::Flushed(_) | SampleOutcome::AcceptedAfterReset
        )
    }
}

/// Reconciles an unreliable sample stream into monotonic per-vehicle state.
///
/// Owns the registry, one aggregation buffer per vehicle and the bus its
/// listeners hang off. Not thread-safe by itself; a single owner drives it.
#[derive(Debug)]
pub struct StreamReconciler {
    registry: VehicleRegistry,
    buffers: HashMap<String, AggregationBuffer>,
    bus: NotificationBus,
    bucket_width_ms: u64,
    armed_for_reset: bool,
    track_selected: bool,
}

impl StreamReconciler {
    pub fn new(bucket_width_ms: u64) -> Self {
        Self {
            registry: VehicleRegistry::new(),
            buffers: HashMap::new(),
            bus: NotificationBus::new(),
            bucket_width_ms,
            armed_for_reset: false,
            track_selected: false,
        }
    }

    /// Apply one sample. Never fails; unusable samples are dropped and
    /// classified in the returned outcome.
    pub fn process(&mut self, vehicle_name: &str, incoming: &VehicleState) -> SampleOutcome {
        if incoming.time == 0 {
            tracing::debug!("Dropping sample without timestamp for {}", vehicle_name);
            return SampleOutcome::Corrupt;
        }

        let (index, created) = self.registry.get_or_create(vehicle_name);
        if created {
            tracing::info!("New vehicle {} registered", vehicle_name);
            self.buffers.insert(
                vehicle_name.to_string(),
                AggregationBuffer::new(self.bucket_width_ms),
            );
        }
        if self.registry.selected().is_none() {
            self.registry.select(vehicle_name);
        }

        let current_time = self.registry.vehicles()[index].state.time;
        let mut after_reset = false;

        if incoming.time < current_time {
            if !self.armed_for_reset {
                tracing::debug!(
                    "Dropping stale sample for {}: {} < {}",
                    vehicle_name,
                    incoming.time,
                    current_time
                );
                return SampleOutcome::Stale;
            }
            self.reset_all();
            after_reset = true;
        } else if incoming.time == current_time {
            tracing::debug!("Dropping duplicate sample for {} at {}", vehicle_name, incoming.time);
            return SampleOutcome::Duplicate;
        }

        let vehicle = self.registry.vehicle_mut(index);
        vehicle.state.apply(incoming);

        let flushed = self
            .buffers
            .entry(vehicle_name.to_string())
            .or_insert_with(|| AggregationBuffer::new(self.bucket_width_ms))
            .add(incoming.time, incoming.speed, incoming.state_of_charge);

        match flushed {
            Some(point) => {
                let event = HistoryEvent::new(vehicle, point);
                tracing::debug!(
                    "History point for {} at {}: speed={:.2} soc={:.2}",
                    event.vehicle_name,
                    point.timestamp,
                    point.speed,
                    point.state_of_charge
                );
                self.bus.publish_history(&event);
                if after_reset {
                    SampleOutcome::AcceptedAfterReset
                } else {
                    SampleOutcome::Flushed(event)
                }
            }
            None if after_reset => SampleOutcome::AcceptedAfterReset,
            None => SampleOutcome::Accepted,
        }
    }

    /// Expect the next backward jump in time to be a producer restart.
    ///
    /// Stays armed until such a sample arrives.
    pub fn be_ready_to_reset(&mut self) {
        if !self.armed_for_reset {
            tracing::info!("Armed for stream reset");
        }
        self.armed_for_reset = true;
    }

    pub fn is_armed(&self) -> bool {
        self.armed_for_reset
    }

    pub fn select_vehicle(&mut self, name: &str) {
        self.registry.select(name);
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        self.registry.vehicles()
    }

    pub fn selected(&self) -> Option<&Vehicle> {
        self.registry.selected()
    }

    pub fn track_selected(&self) -> bool {
        self.track_selected
    }

    pub fn set_track_selected(&mut self, enabled: bool) {
        self.track_selected = enabled;
    }

    /// Flips tracking of the selected vehicle. Does nothing without a selection.
    pub fn toggle_track_selected(&mut self) -> bool {
        if self.selected().is_some() {
            self.track_selected = !self.track_selected;
        }
        self.track_selected
    }

    pub fn add_history_listener<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&HistoryEvent) + Send + 'static,
    {
        self.bus.subscribe_history(listener)
    }

    pub fn add_reset_listener<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut() + Send + 'static,
    {
        self.bus.subscribe_reset(listener)
    }

    pub fn remove_listener(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    fn reset_all(&mut self) {
        tracing::info!(
            "Producer restart detected, resetting {} vehicles",
            self.registry.len()
        );
        for vehicle in self.registry.vehicles_mut() {
            vehicle.state.time = 0;
            self.buffers.insert(
                vehicle.name.clone(),
                AggregationBuffer::new(self.bucket_width_ms),
            );
        }
        self.bus.publish_reset();
        self.armed_for_reset = false;
    }
}

impl Default for StreamReconciler {
    fn default() -> Self {
        Self::new(DEFAULT_BUCKET_WIDTH_MS)
    }
}
