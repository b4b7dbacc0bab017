//! Dispenser lifecycle and usage billing.
//!
//! The engine owns the end-to-end status change workflow: a request is
//! validated by [`transition::validate`] (the one place legality is
//! derived), the resulting [`Transition`] is applied by
//! [`Engine::change_status`], and the billing engine finalizes or opens the
//! matching ledger interval. Spending queries project the cost of a
//! still-open interval against "now" without persisting anything.
//!
//! Writes for one dispenser must be serialized: callers hold the guard from
//! [`Engine::lock_dispenser`] across validate-and-apply. Operations on
//! different dispensers are independent. Reads skip the lock and may see an
//! in-flight ledger.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

pub use billing::Pricing;
pub use dispensers::{Dispenser, DispenserStatus};
pub use error::EngineError;
pub use intervals::UsageInterval;
pub use ledgers::UsageLedger;
pub use repository::Repository;
pub use transition::Transition;

mod billing;
mod dispensers;
mod error;
mod intervals;
mod ledgers;
mod repository;
mod transition;

type ResultEngine<T> = Result<T, EngineError>;

#[derive(Debug)]
pub struct Engine {
    repository: Repository,
    pricing: Pricing,
    locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Acquires the single-writer lock for one dispenser.
    ///
    /// The caller of a status change holds this guard across
    /// [`Engine::validate_transition`] and [`Engine::change_status`] so the
    /// load-mutate-persist sequence cannot interleave with another writer
    /// for the same dispenser.
    pub async fn lock_dispenser(&self, dispenser_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(dispenser_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Registers a new dispenser with the given flow rate (liters/second).
    ///
    /// New dispensers start closed with no ledger.
    pub async fn create_dispenser(
        &self,
        flow_volume: f64,
        registered_at: DateTime<Utc>,
    ) -> ResultEngine<Dispenser> {
        if !flow_volume.is_finite() || flow_volume <= 0.0 {
            return Err(EngineError::InvalidFlowVolume(format!(
                "flow_volume must be a positive number, got {flow_volume}"
            )));
        }

        let dispenser = Dispenser::new(flow_volume, registered_at);
        self.repository.create_dispenser(&dispenser).await?;
        Ok(dispenser)
    }

    /// Returns a dispenser by id.
    pub async fn dispenser(&self, dispenser_id: Uuid) -> ResultEngine<Dispenser> {
        self.repository
            .get_dispenser(dispenser_id)
            .await?
            .ok_or_else(|| EngineError::DispenserNotFound(dispenser_id.to_string()))
    }

    /// Validates a requested status change (see [`transition::validate`]
    /// for the rules and their order).
    pub async fn validate_transition(
        &self,
        dispenser_id: Uuid,
        requested_status: &str,
        requested_timestamp: &str,
    ) -> ResultEngine<Transition> {
        transition::validate(
            &self.repository,
            dispenser_id,
            requested_status,
            requested_timestamp,
        )
        .await
    }

    /// Applies an accepted status change.
    ///
    /// When the requested status already equals the current one this is a
    /// successful no-op returning `false` with no mutation. Otherwise the
    /// dispenser is updated and persisted, the ledger bookkeeping runs keyed
    /// on the new status, and the result of the dispenser write is returned;
    /// a ledger write that reports `false` is logged, not surfaced.
    pub async fn change_status(&self, transition: Transition) -> ResultEngine<bool> {
        let Transition {
            mut dispenser,
            ledger,
            status,
            at,
        } = transition;

        if dispenser.status == status {
            return Ok(false);
        }

        dispenser.status = status;
        dispenser.last_updated_at = at;
        let changed = self.repository.save_dispenser(&dispenser).await?;

        let saved = self.bookkeep_ledger(&dispenser, ledger).await?;
        if !saved {
            tracing::error!(
                dispenser_id = %dispenser.id,
                "ledger write was not persisted after a successful status change"
            );
        }

        Ok(changed)
    }

    /// Ledger bookkeeping keyed on the dispenser's *new* status.
    ///
    /// "No ledger yet" is treated as a ledger with zero intervals, so the
    /// first open and every later open share the append path.
    async fn bookkeep_ledger(
        &self,
        dispenser: &Dispenser,
        ledger: Option<UsageLedger>,
    ) -> ResultEngine<bool> {
        match dispenser.status {
            DispenserStatus::Open => {
                let (mut ledger, existed) = match ledger {
                    Some(ledger) => (ledger, true),
                    None => (UsageLedger::new(dispenser.id), false),
                };
                ledger.append_open_interval(dispenser.flow_volume, dispenser.last_updated_at);

                if existed {
                    self.repository.update_ledger(&ledger).await
                } else {
                    self.repository.create_ledger(&ledger).await
                }
            }
            DispenserStatus::Closed => {
                let Some(mut ledger) = ledger else {
                    return Err(EngineError::Corrupt(format!(
                        "dispenser {} closed without a ledger",
                        dispenser.id
                    )));
                };
                billing::finalize_interval(&mut ledger, self.pricing, dispenser.last_updated_at);
                self.repository.update_ledger(&ledger).await
            }
        }
    }

    /// Returns the spending view for a dispenser at the given instant.
    ///
    /// An unknown dispenser is an error; a known dispenser without a ledger
    /// answers with an empty one. A still-open interval is projected against
    /// `now` and the projected ledger is never written back.
    pub async fn spending_info(
        &self,
        dispenser_id: Uuid,
        now: DateTime<Utc>,
    ) -> ResultEngine<UsageLedger> {
        let dispenser = self.dispenser(dispenser_id).await?;

        let Some(mut ledger) = self.repository.get_ledger(dispenser_id).await? else {
            return Ok(UsageLedger::new(dispenser.id));
        };

        if ledger.open_interval().is_some() {
            billing::project_open_interval(&mut ledger, self.pricing, now);
        }

        Ok(ledger)
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    pricing: Option<Pricing>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the default pricing (12.25 per liter).
    pub fn pricing(mut self, pricing: Pricing) -> EngineBuilder {
        self.pricing = Some(pricing);
        self
    }

    /// Construct `Engine`
    pub fn build(self) -> Engine {
        Engine {
            repository: Repository::new(self.database),
            pricing: self.pricing.unwrap_or_default(),
            locks: Mutex::new(HashMap::new()),
        }
    }
}
