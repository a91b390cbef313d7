// HTTP request handlers
use crate::application::fleet_service::{FleetClosed, FleetEvent, FleetSnapshot};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Json, Response, Sse,
    },
    routing::{get, post, put},
    Router,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tower_http::trace::TraceLayer;

#[derive(Debug, Deserialize, Serialize)]
pub struct Tracking {
    pub enabled: bool,
}

impl IntoResponse for FleetClosed {
    fn into_response(self) -> Response {
        (StatusCode::SERVICE_UNAVAILABLE, self.to_string()).into_response()
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/vehicles", get(list_vehicles))
        .route("/vehicles/selected", get(selected_vehicle))
        .route("/vehicles/selected/:name", put(select_vehicle))
        .route("/tracking", put(set_tracking))
        .route("/tracking/toggle", post(toggle_tracking))
        .route("/events", get(stream_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// All vehicles ordered by name, plus selection and tracking flag
pub async fn list_vehicles(
    State(state): State<Arc<AppState>>,
) -> Result<Json<FleetSnapshot>, FleetClosed> {
    Ok(Json(state.fleet.snapshot().await?))
}

pub async fn selected_vehicle(State(state): State<Arc<AppState>>) -> Result<Response, FleetClosed> {
    let snapshot = state.fleet.snapshot().await?;
    Ok(match snapshot.selected {
        Some(vehicle) => Json(vehicle).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    })
}

/// Select a vehicle by name. Unknown names clear the selection.
pub async fn select_vehicle(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, FleetClosed> {
    Ok(match state.fleet.select_vehicle(&name).await? {
        Some(vehicle) => Json(vehicle).into_response(),
        None => {
            tracing::debug!("Selection cleared, unknown vehicle {}", name);
            StatusCode::NOT_FOUND.into_response()
        }
    })
}

pub async fn set_tracking(
    State(state): State<Arc<AppState>>,
    Json(tracking): Json<Tracking>,
) -> Result<Json<Tracking>, FleetClosed> {
    state.fleet.set_track_selected(tracking.enabled).await?;
    Ok(Json(tracking))
}

pub async fn toggle_tracking(State(state): State<Arc<AppState>>) -> Result<Json<Tracking>, FleetClosed> {
    let enabled = state.fleet.toggle_track_selected().await?;
    Ok(Json(Tracking { enabled }))
}

/// Server-sent `history` and `reset` events, live only
pub async fn stream_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = BroadcastStream::new(state.fleet.subscribe()).filter_map(|message| async move {
        match message {
            Ok(event) => to_sse(&event).map(Ok),
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!("Event subscriber lagged, {} events dropped", skipped);
                None
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn to_sse(event: &FleetEvent) -> Option<Event> {
    match event {
        FleetEvent::History(history) => match Event::default().event("history").json_data(history) {
            Ok(event) => Some(event),
            Err(e) => {
                tracing::error!("Failed to serialize history event: {}", e);
                None
            }
        },
        FleetEvent::Reset => Some(Event::default().event("reset").data("")),
    }
}
