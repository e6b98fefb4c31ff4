//! Read-only queries over a loaded [`GtfsStore`].
//!
//! Every function borrows the store for the duration of the call and returns
//! references into it. References that do not resolve (a trip pointing at a
//! missing route, a stop time pointing at a missing stop) are skipped.

use std::collections::HashSet;
use tracing::trace;

use crate::model::{Route, Stop, Trip};
use crate::store::GtfsStore;

/// All routes, in collection order.
pub fn list_routes(store: &GtfsStore) -> Vec<&Route> {
    store.routes().values().collect()
}

/// All stops, in collection order.
pub fn list_stops(store: &GtfsStore) -> Vec<&Stop> {
    store.stops().values().collect()
}

pub fn route<'a>(store: &'a GtfsStore, route_id: &str) -> Option<&'a Route> {
    store.routes().get(route_id)
}

pub fn stop<'a>(store: &'a GtfsStore, stop_id: &str) -> Option<&'a Stop> {
    store.stops().get(stop_id)
}

/// Trips running on `route_id`. Unknown routes yield an empty list.
pub fn trips_for_route<'a>(store: &'a GtfsStore, route_id: &str) -> Vec<&'a Trip> {
    store.trips_for_route(route_id).collect()
}

/// Distinct stops served by any trip of `route_id`.
///
/// Walks route → trips → stop times → stops and keeps each `stop_id` once,
/// in order of first encounter. Callers should not rely on that order.
/// Unknown routes yield an empty list.
pub fn stops_for_route<'a>(store: &'a GtfsStore, route_id: &str) -> Vec<&'a Stop> {
    let mut seen = HashSet::new();
    let mut stops = Vec::new();

    for trip in store.trips_for_route(route_id) {
        for stop_time in store.stop_times_for_trip(&trip.trip_id) {
            let Some(stop) = store.stops().get(&stop_time.stop_id) else {
                trace!(
                    trip_id = %trip.trip_id,
                    stop_id = %stop_time.stop_id,
                    "Skipping stop time with unknown stop"
                );
                continue;
            };
            if seen.insert(stop.stop_id.as_str()) {
                stops.push(stop);
            }
        }
    }

    stops
}
