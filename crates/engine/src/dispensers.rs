//! The module contains the representation of a dispenser.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::EngineError;

/// The open/closed position of a dispenser tap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispenserStatus {
    Open,
    Closed,
}

impl DispenserStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl TryFrom<&str> for DispenserStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            other => Err(EngineError::InvalidStatusValue(format!(
                "status must be 'open' or 'closed', got \"{other}\""
            ))),
        }
    }
}

/// A meterable dispensing device.
///
/// A dispenser pours fluid at a fixed rate (`flow_volume`, liters per
/// second) while its tap is open. `last_updated_at` records the instant of
/// the most recent status change and becomes the `opened_at` of a new usage
/// interval on every closed-to-open transition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dispenser {
    pub id: Uuid,
    pub flow_volume: f64,
    pub status: DispenserStatus,
    pub last_updated_at: DateTime<Utc>,
}

impl Dispenser {
    /// Registers a dispenser. New dispensers always start closed.
    pub fn new(flow_volume: f64, registered_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            flow_volume,
            status: DispenserStatus::Closed,
            last_updated_at: registered_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "dispensers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub flow_volume: f64,
    pub status: String,
    pub last_updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_one = "super::ledgers::Entity")]
    Ledgers,
}

impl Related<super::ledgers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ledgers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Dispenser> for ActiveModel {
    fn from(dispenser: &Dispenser) -> Self {
        Self {
            id: ActiveValue::Set(dispenser.id.to_string()),
            flow_volume: ActiveValue::Set(dispenser.flow_volume),
            status: ActiveValue::Set(dispenser.status.as_str().to_string()),
            last_updated_at: ActiveValue::Set(dispenser.last_updated_at),
        }
    }
}

impl TryFrom<Model> for Dispenser {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        let id = Uuid::parse_str(&model.id)
            .map_err(|_| EngineError::Corrupt(format!("invalid dispenser id: {}", model.id)))?;
        let status = DispenserStatus::try_from(model.status.as_str())
            .map_err(|_| EngineError::Corrupt(format!("invalid dispenser status: {}", model.status)))?;

        Ok(Self {
            id,
            flow_volume: model.flow_volume,
            status,
            last_updated_at: model.last_updated_at,
        })
    }
}
