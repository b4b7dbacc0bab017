//! Usage ledgers.
//!
//! A [`UsageLedger`] is the ordered usage history of one dispenser: its
//! intervals in chronological order plus the running monetary total. A
//! ledger comes into existence on the first transition to open; before that
//! the engine treats "no ledger" as a ledger with zero intervals, so the
//! append path is the same for the first and every later open.
//!
//! Invariant: at most one interval is open (absent `closed_at`) at any time.
//! The transition rules in [`crate::transition`] are what preserve it.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, intervals::UsageInterval};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UsageLedger {
    pub dispenser_id: Uuid,
    pub total_amount: f64,
    pub intervals: Vec<UsageInterval>,
}

impl UsageLedger {
    /// Creates an empty ledger for a dispenser.
    pub fn new(dispenser_id: Uuid) -> Self {
        Self {
            dispenser_id,
            total_amount: 0.0,
            intervals: Vec::new(),
        }
    }

    /// Returns the currently open interval, if any.
    ///
    /// When more than one interval is open the ledger is outside its
    /// invariant; the first in insertion order is returned and callers must
    /// not rely on which one that is.
    pub fn open_interval(&self) -> Option<&UsageInterval> {
        self.intervals.iter().find(|interval| interval.is_open())
    }

    pub(crate) fn open_interval_mut(&mut self) -> Option<&mut UsageInterval> {
        self.intervals.iter_mut().find(|interval| interval.is_open())
    }

    /// Number of intervals without a `closed_at`. Always 0 or 1 when the
    /// invariant holds.
    pub fn open_interval_count(&self) -> usize {
        self.intervals.iter().filter(|interval| interval.is_open()).count()
    }

    /// Appends a fresh open interval snapshotting the given flow rate.
    pub fn append_open_interval(&mut self, flow_volume: f64, opened_at: DateTime<Utc>) {
        self.intervals.push(UsageInterval::open(flow_volume, opened_at));
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "ledgers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub dispenser_id: String,
    pub total_amount: f64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::intervals::Entity")]
    Intervals,
    #[sea_orm(
        belongs_to = "super::dispensers::Entity",
        from = "Column::DispenserId",
        to = "super::dispensers::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Dispensers,
}

impl Related<super::intervals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Intervals.def()
    }
}

impl Related<super::dispensers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dispensers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<&UsageLedger> for ActiveModel {
    fn from(ledger: &UsageLedger) -> Self {
        Self {
            dispenser_id: ActiveValue::Set(ledger.dispenser_id.to_string()),
            total_amount: ActiveValue::Set(ledger.total_amount),
        }
    }
}

impl UsageLedger {
    /// Rebuilds a ledger from its row and interval rows (insertion order).
    pub(crate) fn try_from_models(
        model: Model,
        interval_models: Vec<super::intervals::Model>,
    ) -> Result<Self, EngineError> {
        let dispenser_id = Uuid::parse_str(&model.dispenser_id).map_err(|_| {
            EngineError::Corrupt(format!("invalid ledger dispenser id: {}", model.dispenser_id))
        })?;

        Ok(Self {
            dispenser_id,
            total_amount: model.total_amount,
            intervals: interval_models.into_iter().map(UsageInterval::from).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn empty_ledger_has_no_open_interval() {
        let ledger = UsageLedger::new(Uuid::new_v4());
        assert!(ledger.open_interval().is_none());
        assert_eq!(ledger.open_interval_count(), 0);
    }

    #[test]
    fn append_opens_exactly_one_interval() {
        let mut ledger = UsageLedger::new(Uuid::new_v4());
        ledger.append_open_interval(0.5, at(0));
        assert_eq!(ledger.open_interval_count(), 1);
        let interval = ledger.open_interval().unwrap();
        assert_eq!(interval.flow_volume, 0.5);
        assert!(interval.is_open());
        assert_eq!(interval.total_spent, 0.0);
    }

    #[test]
    fn open_interval_skips_closed_ones() {
        let mut ledger = UsageLedger::new(Uuid::new_v4());
        ledger.append_open_interval(0.5, at(0));
        if let Some(interval) = ledger.open_interval_mut() {
            interval.closed_at = Some(at(10));
        }
        ledger.append_open_interval(0.7, at(20));

        let open = ledger.open_interval().unwrap();
        assert_eq!(open.opened_at, at(20));
        assert_eq!(ledger.open_interval_count(), 1);
    }
}
