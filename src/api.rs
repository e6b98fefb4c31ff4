//! JSON HTTP API over a loaded [`GtfsStore`].
//!
//! Handlers only read the shared store. Failures while answering a request
//! become a 500 with a JSON body and never take the process down.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::projector::{project, project_one};
use crate::query;
use crate::store::GtfsStore;

pub type SharedStore = Arc<GtfsStore>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{context}")]
    Fault {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{entity} {id:?} not found")]
    NotFound { entity: &'static str, id: String },
}

impl ApiError {
    fn fault(context: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| ApiError::Fault { context, source }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Fault { source, .. } => {
                error!(error = %self, cause = %source, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": self.to_string(), "message": source.to_string() })),
                )
                    .into_response()
            }
            ApiError::NotFound { .. } => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response(),
        }
    }
}

pub fn create_router(store: SharedStore) -> Router {
    Router::new()
        .route("/api/routes", get(list_routes))
        .route("/api/routes/{route_id}", get(get_route))
        .route("/api/routes/{route_id}/stops", get(route_stops))
        .route("/api/routes/{route_id}/trips", get(route_trips))
        .route("/api/stops", get(list_stops))
        .route("/api/stops/{stop_id}", get(get_stop))
        .route("/health", get(health))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::new().allow_origin(AnyOrigin))
        .with_state(store)
}

/// Serves `store` on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    store: SharedStore,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "GTFS API listening");
    }
    axum::serve(listener, create_router(store))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn list_routes(State(store): State<SharedStore>) -> Result<Json<Vec<Value>>, ApiError> {
    let routes =
        project(query::list_routes(&store)).map_err(ApiError::fault("Failed to fetch routes"))?;
    Ok(Json(routes))
}

async fn list_stops(State(store): State<SharedStore>) -> Result<Json<Vec<Value>>, ApiError> {
    let stops =
        project(query::list_stops(&store)).map_err(ApiError::fault("Failed to fetch stops"))?;
    Ok(Json(stops))
}

async fn route_stops(
    State(store): State<SharedStore>,
    Path(route_id): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let stops = project(query::stops_for_route(&store, &route_id))
        .map_err(ApiError::fault("Failed to fetch stops for route"))?;
    Ok(Json(stops))
}

async fn route_trips(
    State(store): State<SharedStore>,
    Path(route_id): Path<String>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let trips = project(query::trips_for_route(&store, &route_id))
        .map_err(ApiError::fault("Failed to fetch trips for route"))?;
    Ok(Json(trips))
}

async fn get_route(
    State(store): State<SharedStore>,
    Path(route_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let route = query::route(&store, &route_id).ok_or_else(|| ApiError::NotFound {
        entity: "route",
        id: route_id.clone(),
    })?;
    Ok(Json(project_one(route).map_err(ApiError::fault("Failed to fetch route"))?))
}

async fn get_stop(
    State(store): State<SharedStore>,
    Path(stop_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let stop = query::stop(&store, &stop_id).ok_or_else(|| ApiError::NotFound {
        entity: "stop",
        id: stop_id.clone(),
    })?;
    Ok(Json(project_one(stop).map_err(ApiError::fault("Failed to fetch stop"))?))
}

async fn health(State(store): State<SharedStore>) -> Json<Value> {
    Json(json!({ "status": "ok", "counts": store.counts() }))
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else if let Some(text) = panic.downcast_ref::<&str>() {
        text.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!(panic = %detail, "Request handler panicked");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": "Internal server error" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_maps_to_500() {
        let source = serde_json::from_str::<Value>("{").unwrap_err();
        let response = ApiError::Fault {
            context: "Failed to fetch routes",
            source,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_not_found_maps_to_404() {
        let response = ApiError::NotFound {
            entity: "stop",
            id: "S9".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_panic_response_is_500() {
        let response = panic_response(Box::new("boom"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
