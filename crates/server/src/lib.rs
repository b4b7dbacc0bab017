use axum::{Json, http::StatusCode, response::IntoResponse};
use engine::EngineError;

use serde::Serialize;
pub use server::{ServerState, run, run_with_listener, spawn_with_listener};

mod dispenser;
mod server;

pub mod types {
    pub mod dispenser {
        pub use api_types::dispenser::{DispenserCreated, DispenserNew, StatusChange};
    }

    pub mod spending {
        pub use api_types::spending::{SpendingResponse, UsageView};
    }
}

pub enum ServerError {
    Engine(EngineError),
    Generic(String),
}

//TODO: Find a better solution
#[derive(Serialize)]
struct Error {
    error: String,
}

fn status_for_engine_error(err: &EngineError) -> StatusCode {
    match err {
        EngineError::DispenserNotFound(_) => StatusCode::NOT_FOUND,
        EngineError::IllegalTransition(_) => StatusCode::CONFLICT,
        EngineError::InvalidStatusValue(_)
        | EngineError::InvalidTimestampFormat(_)
        | EngineError::InvalidClosingTimestamp(_)
        | EngineError::InvalidFlowVolume(_) => StatusCode::BAD_REQUEST,
        EngineError::Corrupt(_) | EngineError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn message_for_engine_error(err: EngineError) -> String {
    match err {
        EngineError::Database(db_err) => {
            tracing::error!("database error: {db_err}");
            "internal server error".to_string()
        }
        EngineError::Corrupt(detail) => {
            tracing::error!("corrupt state: {detail}");
            "internal server error".to_string()
        }
        other => other.to_string(),
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ServerError::Engine(err) => {
                (status_for_engine_error(&err), message_for_engine_error(err))
            }
            ServerError::Generic(err) => (StatusCode::BAD_REQUEST, err),
        };

        (status, Json(Error { error })).into_response()
    }
}

impl From<EngineError> for ServerError {
    fn from(value: EngineError) -> Self {
        Self::Engine(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let res =
            ServerError::from(EngineError::DispenserNotFound("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn illegal_transition_maps_to_409() {
        let res =
            ServerError::from(EngineError::IllegalTransition("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn format_errors_map_to_400() {
        for err in [
            EngineError::InvalidStatusValue("x".to_string()),
            EngineError::InvalidTimestampFormat("x".to_string()),
            EngineError::InvalidClosingTimestamp("x".to_string()),
            EngineError::InvalidFlowVolume("x".to_string()),
        ] {
            let res = ServerError::from(err).into_response();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn corrupt_state_maps_to_500() {
        let res = ServerError::from(EngineError::Corrupt("x".to_string())).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn generic_maps_to_400() {
        let res = ServerError::Generic("bad".to_string()).into_response();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
