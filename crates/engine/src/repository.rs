//! Persistence for dispensers and their ledgers.
//!
//! The engine talks to storage only through this module. Lookups return
//! `Option`, writes return `bool` (`false` when the row was not written for
//! a recoverable reason, such as updating a missing record); unexpected
//! database errors propagate as [`EngineError::Database`].

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    ResultEngine, dispensers, dispensers::Dispenser, intervals, ledgers, ledgers::UsageLedger,
};

#[derive(Clone, Debug)]
pub struct Repository {
    database: DatabaseConnection,
}

impl Repository {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }

    /// Loads a dispenser by id.
    pub async fn get_dispenser(&self, id: Uuid) -> ResultEngine<Option<Dispenser>> {
        let model = dispensers::Entity::find_by_id(id.to_string())
            .one(&self.database)
            .await?;

        model.map(Dispenser::try_from).transpose()
    }

    /// Inserts a newly registered dispenser.
    pub async fn create_dispenser(&self, dispenser: &Dispenser) -> ResultEngine<bool> {
        dispensers::ActiveModel::from(dispenser)
            .insert(&self.database)
            .await?;
        Ok(true)
    }

    /// Persists a status change on an existing dispenser.
    pub async fn save_dispenser(&self, dispenser: &Dispenser) -> ResultEngine<bool> {
        match dispensers::ActiveModel::from(dispenser)
            .update(&self.database)
            .await
        {
            Ok(_) => Ok(true),
            Err(DbErr::RecordNotUpdated) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Loads a dispenser's ledger with its intervals in insertion order.
    pub async fn get_ledger(&self, dispenser_id: Uuid) -> ResultEngine<Option<UsageLedger>> {
        let Some(model) = ledgers::Entity::find_by_id(dispenser_id.to_string())
            .one(&self.database)
            .await?
        else {
            return Ok(None);
        };

        let interval_models = intervals::Entity::find()
            .filter(intervals::Column::DispenserId.eq(dispenser_id.to_string()))
            .order_by_asc(intervals::Column::Id)
            .all(&self.database)
            .await?;

        UsageLedger::try_from_models(model, interval_models).map(Some)
    }

    /// Inserts a ledger created on a dispenser's first open.
    pub async fn create_ledger(&self, ledger: &UsageLedger) -> ResultEngine<bool> {
        let txn = self.database.begin().await?;

        ledgers::ActiveModel::from(ledger).insert(&txn).await?;
        for interval in &ledger.intervals {
            interval.to_active_model(ledger.dispenser_id).insert(&txn).await?;
        }

        txn.commit().await?;
        Ok(true)
    }

    /// Rewrites an existing ledger (total and interval rows).
    ///
    /// Interval sets stay small (one row per open/close cycle), so rewriting
    /// them wholesale keeps the write contract simple.
    pub async fn update_ledger(&self, ledger: &UsageLedger) -> ResultEngine<bool> {
        let txn = self.database.begin().await?;

        if let Err(err) = ledgers::ActiveModel::from(ledger).update(&txn).await {
            txn.rollback().await?;
            return match err {
                DbErr::RecordNotUpdated => Ok(false),
                err => Err(err.into()),
            };
        }

        intervals::Entity::delete_many()
            .filter(intervals::Column::DispenserId.eq(ledger.dispenser_id.to_string()))
            .exec(&txn)
            .await?;
        for interval in &ledger.intervals {
            interval.to_active_model(ledger.dispenser_id).insert(&txn).await?;
        }

        txn.commit().await?;
        Ok(true)
    }
}
