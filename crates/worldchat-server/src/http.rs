//! Read-only HTTP endpoints.
//!
//! The listener that upgrades `/ws` also serves room occupancy for landing
//! pages and monitoring: `/rooms` lists rooms with member counts, `/stats`
//! aggregates them, `/status` returns both in one response.

use actix_web::web;
use serde::Serialize;
use worldchat_core::SystemEnv;
use worldchat_proto::RoomId;

use crate::{AppState, ServerDriver};

#[derive(Debug, Serialize)]
pub(crate) struct RoomSummary {
    room_id: RoomId,
    member_count: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct RoomsResponse {
    rooms: Vec<RoomSummary>,
    capacity: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatsResponse {
    total_rooms: usize,
    total_users: usize,
    capacity: u32,
}

#[derive(Debug, Serialize)]
pub(crate) struct StatusResponse {
    #[serde(flatten)]
    stats: StatsResponse,
    rooms: Vec<RoomSummary>,
}

pub(crate) async fn rooms(state: web::Data<AppState>) -> web::Json<RoomsResponse> {
    let driver = state.driver.lock().await;
    web::Json(RoomsResponse { rooms: summaries(&driver), capacity: driver.stats().capacity })
}

pub(crate) async fn stats(state: web::Data<AppState>) -> web::Json<StatsResponse> {
    let driver = state.driver.lock().await;
    web::Json(stats_response(&driver))
}

pub(crate) async fn status(state: web::Data<AppState>) -> web::Json<StatusResponse> {
    let driver = state.driver.lock().await;
    web::Json(StatusResponse { stats: stats_response(&driver), rooms: summaries(&driver) })
}

fn summaries(driver: &ServerDriver<SystemEnv>) -> Vec<RoomSummary> {
    driver
        .rooms()
        .into_iter()
        .map(|(room_id, member_count)| RoomSummary { room_id, member_count })
        .collect()
}

fn stats_response(driver: &ServerDriver<SystemEnv>) -> StatsResponse {
    let stats = driver.stats();
    StatsResponse {
        total_rooms: stats.total_rooms,
        total_users: stats.total_users,
        capacity: stats.capacity,
    }
}
