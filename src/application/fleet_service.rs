// Fleet service - Single task owning the reconciler, driven over channels
use crate::application::reconciler::StreamReconciler;
use crate::domain::vehicle::{HistoryEvent, Vehicle, VehicleState};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, oneshot};

/// One decoded upstream sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub vehicle_name: String,
    pub state: VehicleState,
}

/// Notification forwarded to async subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum FleetEvent {
    History(HistoryEvent),
    Reset,
}

/// Owned copy of the read-only state surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetSnapshot {
    pub vehicles: Vec<Vehicle>,
    pub selected: Option<Vehicle>,
    pub track_selected: bool,
}

impl FleetSnapshot {
    fn capture(reconciler: &StreamReconciler) -> Self {
        Self {
            vehicles: reconciler.vehicles().to_vec(),
            selected: reconciler.selected().cloned(),
            track_selected: reconciler.track_selected(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("fleet service has shut down")]
pub struct FleetClosed;

enum Command {
    Sample(Sample),
    ReadyToReset,
    Select(String, oneshot::Sender<Option<Vehicle>>),
    SetTracking(bool),
    ToggleTracking(oneshot::Sender<bool>),
    Snapshot(oneshot::Sender<FleetSnapshot>),
}

/// Cloneable front door to the fleet task.
///
/// Every call is queued and applied in arrival order by the one task that
/// owns the reconciler, so samples are never processed concurrently.
#[derive(Clone)]
pub struct FleetHandle {
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<FleetEvent>,
}

impl FleetHandle {
    pub async fn process(&self, sample: Sample) -> Result<(), FleetClosed> {
        self.send(Command::Sample(sample)).await
    }

    pub async fn be_ready_to_reset(&self) -> Result<(), FleetClosed> {
        self.send(Command::ReadyToReset).await
    }

    /// Selects `name` and returns the new selection, `None` if unknown.
    pub async fn select_vehicle(&self, name: &str) -> Result<Option<Vehicle>, FleetClosed> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Select(name.to_string(), tx)).await?;
        rx.await.map_err(|_| FleetClosed)
    }

    pub async fn set_track_selected(&self, enabled: bool) -> Result<(), FleetClosed> {
        self.send(Command::SetTracking(enabled)).await
    }

    pub async fn toggle_track_selected(&self) -> Result<bool, FleetClosed> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::ToggleTracking(tx)).await?;
        rx.await.map_err(|_| FleetClosed)
    }

    pub async fn snapshot(&self) -> Result<FleetSnapshot, FleetClosed> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| FleetClosed)
    }

    /// Follow history and reset notifications from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<FleetEvent> {
        self.events.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.receiver_count()
    }

    async fn send(&self, command: Command) -> Result<(), FleetClosed> {
        self.commands.send(command).await.map_err(|_| FleetClosed)
    }
}

pub struct FleetService;

impl FleetService {
    /// Spawns the owning task. It exits once every handle has been dropped.
    pub fn spawn(bucket_width_ms: u64, command_buffer: usize, event_buffer: usize) -> FleetHandle {
        let (commands, rx) = mpsc::channel(command_buffer.max(1));
        let (events, _) = broadcast::channel(event_buffer.max(1));

        let mut reconciler = StreamReconciler::new(bucket_width_ms);
        {
            let events = events.clone();
            reconciler.add_history_listener(move |event| {
                // No subscribers is fine
                let _ = events.send(FleetEvent::History(event.clone()));
            });
        }
        {
            let events = events.clone();
            reconciler.add_reset_listener(move || {
                let _ = events.send(FleetEvent::Reset);
            });
        }

        tokio::spawn(run(reconciler, rx));

        FleetHandle { commands, events }
    }
}

async fn run(mut reconciler: StreamReconciler, mut rx: mpsc::Receiver<Command>) {
    let (mut accepted, mut dropped) = (0u64, 0u64);
    while let Some(command) = rx.recv().await {
        match command {
            Command::Sample(sample) => {
                if reconciler.process(&sample.vehicle_name, &sample.state).is_accepted() {
                    accepted += 1;
                } else {
                    dropped += 1;
                }
            }
            Command::ReadyToReset => reconciler.be_ready_to_reset(),
            Command::Select(name, reply) => {
                reconciler.select_vehicle(&name);
                let _ = reply.send(reconciler.selected().cloned());
            }
            Command::SetTracking(enabled) => reconciler.set_track_selected(enabled),
            Command::ToggleTracking(reply) => {
                let _ = reply.send(reconciler.toggle_track_selected());
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(FleetSnapshot::capture(&reconciler));
            }
        }
    }
    tracing::info!(
        "Fleet service stopped after {} accepted and {} dropped samples",
        accepted,
        dropped
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vehicle::HistoryPoint;

    const T0: i64 = 1_700_000_000_000;

    fn sample(name: &str, time: i64, speed: f64, soc: f64) -> Sample {
        Sample {
            vehicle_name: name.to_string(),
            state: VehicleState {
                time,
                speed,
                state_of_charge: soc,
                ..VehicleState::default()
            },
        }
    }

    #[tokio::test]
    async fn test_snapshot_reflects_processed_samples() {
        let fleet = FleetService::spawn(5_000, 16, 16);
        fleet.process(sample("Bus 2", T0, 20.0, 80.0)).await.unwrap();
        fleet.process(sample("Bus 1", T0 + 100, 25.0, 81.0)).await.unwrap();

        let snapshot = fleet.snapshot().await.unwrap();

        let names: Vec<&str> = snapshot.vehicles.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Bus 1", "Bus 2"]);
        assert_eq!(snapshot.selected.map(|v| v.name), Some("Bus 2".to_string()));
        assert!(!snapshot.track_selected);
    }

    #[tokio::test]
    async fn test_history_and_reset_are_broadcast() {
        let fleet = FleetService::spawn(5_000, 16, 16);
        let mut events = fleet.subscribe();

        fleet.process(sample("Bus 1", T0, 20.0, 70.0)).await.unwrap();
        fleet.process(sample("Bus 1", T0 + 100, 30.0, 60.0)).await.unwrap();
        fleet.process(sample("Bus 1", T0 + 6_000, 40.0, 58.0)).await.unwrap();
        fleet.be_ready_to_reset().await.unwrap();
        fleet.process(sample("Bus 1", 1_000, 10.0, 90.0)).await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            FleetEvent::History(HistoryEvent {
                vehicle_name: "Bus 1".to_string(),
                color_index: 0,
                point: HistoryPoint {
                    timestamp: T0 + 100,
                    speed: 25.0,
                    state_of_charge: 65.0
                }
            })
        );
        assert_eq!(events.recv().await.unwrap(), FleetEvent::Reset);

        let snapshot = fleet.snapshot().await.unwrap();
        assert_eq!(snapshot.vehicles[0].state.time, 1_000);
    }

    #[tokio::test]
    async fn test_selection_and_tracking() {
        let fleet = FleetService::spawn(5_000, 16, 16);
        fleet.process(sample("Bus 1", T0, 0.0, 0.0)).await.unwrap();
        fleet.process(sample("Bus 2", T0, 0.0, 0.0)).await.unwrap();

        let selected = fleet.select_vehicle("Bus 2").await.unwrap();
        assert_eq!(selected.map(|v| v.color_index), Some(1));
        assert!(fleet.toggle_track_selected().await.unwrap());

        assert_eq!(fleet.select_vehicle("Ghost").await.unwrap(), None);
        fleet.set_track_selected(false).await.unwrap();

        let snapshot = fleet.snapshot().await.unwrap();
        assert!(snapshot.selected.is_none());
        assert!(!snapshot.track_selected);
    }
}
