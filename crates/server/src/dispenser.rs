//! Dispenser API endpoints

use api_types::{
    dispenser::{DispenserCreated, DispenserNew, StatusChange},
    spending::{SpendingResponse, UsageView},
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{ServerError, server::ServerState};

fn map_usage(interval: &engine::UsageInterval) -> UsageView {
    UsageView {
        opened_at: interval.opened_at,
        closed_at: interval.closed_at,
        flow_volume: interval.flow_volume,
        total_spent: interval.total_spent,
    }
}

pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<DispenserNew>,
) -> Result<(StatusCode, Json<DispenserCreated>), ServerError> {
    let dispenser = state
        .engine
        .create_dispenser(payload.flow_volume, Utc::now())
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(DispenserCreated {
            id: dispenser.id,
            flow_volume: dispenser.flow_volume,
        }),
    ))
}

pub async fn change_status(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusChange>,
) -> Result<(StatusCode, Json<bool>), ServerError> {
    // One writer per dispenser across validate-and-apply.
    let _guard = state.engine.lock_dispenser(id).await;

    let transition = state
        .engine
        .validate_transition(id, &payload.status, &payload.updated_at)
        .await?;
    let changed = state.engine.change_status(transition).await?;

    Ok((StatusCode::ACCEPTED, Json(changed)))
}

pub async fn spending(
    State(state): State<ServerState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SpendingResponse>, ServerError> {
    let ledger = state.engine.spending_info(id, Utc::now()).await?;

    Ok(Json(SpendingResponse {
        amount: ledger.total_amount,
        usages: ledger.intervals.iter().map(map_usage).collect(),
    }))
}
