//! Usage intervals.
//!
//! A [`UsageInterval`] is one contiguous open-to-closed usage period of a
//! dispenser (or an in-progress one while `closed_at` is absent). The flow
//! rate is snapshotted at open time so a later change to the dispenser does
//! not rewrite history. `total_spent` stays 0 until the interval is
//! finalized or projected by the billing engine.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UsageInterval {
    pub opened_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub flow_volume: f64,
    pub total_spent: f64,
}

impl UsageInterval {
    /// Creates an open interval with no cost attributed yet.
    pub fn open(flow_volume: f64, opened_at: DateTime<Utc>) -> Self {
        Self {
            opened_at,
            closed_at: None,
            flow_volume,
            total_spent: 0.0,
        }
    }

    /// Returns `true` while the interval has not been closed.
    pub fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "usage_intervals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub dispenser_id: String,
    pub opened_at: DateTimeUtc,
    pub closed_at: Option<DateTimeUtc>,
    pub flow_volume: f64,
    pub total_spent: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ledgers::Entity",
        from = "Column::DispenserId",
        to = "super::ledgers::Column::DispenserId",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Ledgers,
}

impl Related<super::ledgers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ledgers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl UsageInterval {
    /// Builds an insertable row for this interval.
    ///
    /// The row id is left unset; insertion order is the chronological order
    /// the ledger relies on.
    pub(crate) fn to_active_model(&self, dispenser_id: Uuid) -> ActiveModel {
        ActiveModel {
            id: ActiveValue::NotSet,
            dispenser_id: ActiveValue::Set(dispenser_id.to_string()),
            opened_at: ActiveValue::Set(self.opened_at),
            closed_at: ActiveValue::Set(self.closed_at),
            flow_volume: ActiveValue::Set(self.flow_volume),
            total_spent: ActiveValue::Set(self.total_spent),
        }
    }
}

impl From<Model> for UsageInterval {
    fn from(model: Model) -> Self {
        Self {
            opened_at: model.opened_at,
            closed_at: model.closed_at,
            flow_volume: model.flow_volume,
            total_spent: model.total_spent,
        }
    }
}
