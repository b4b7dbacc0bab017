//! Status transition validation.
//!
//! [`validate`] is the single place where the legality of a requested status
//! change is derived. It evaluates the rules in a fixed order, first failure
//! wins:
//!
//! 1. the status string is `open` or `closed` (case-insensitive);
//! 2. the timestamp parses as an RFC 3339 date-time;
//! 3. the dispenser exists;
//! 4. opening requires zero open intervals, closing exactly one;
//! 5. closing only: the timestamp is strictly later than the open
//!    interval's `opened_at`.
//!
//! Rule 5 is reached only after rule 2 passed, so a malformed timestamp is
//! reported as such instead of silently failing the comparison. The
//! resulting [`Transition`] carries the loaded state; the orchestrator acts
//! on it without re-deriving legality.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    ResultEngine,
    dispensers::{Dispenser, DispenserStatus},
    error::EngineError,
    ledgers::UsageLedger,
    repository::Repository,
};

/// An accepted status change, ready to be applied.
#[derive(Clone, Debug)]
pub struct Transition {
    pub dispenser: Dispenser,
    pub ledger: Option<UsageLedger>,
    pub status: DispenserStatus,
    pub at: DateTime<Utc>,
}

/// Canonicalizes the requested status string (rule 1).
pub(crate) fn parse_status(status: &str) -> ResultEngine<DispenserStatus> {
    DispenserStatus::try_from(status.trim().to_ascii_lowercase().as_str())
        .map_err(|_| EngineError::InvalidStatusValue(format!(
            "status must be 'open' or 'closed', got \"{status}\""
        )))
}

/// Parses the requested timestamp (rule 2).
pub(crate) fn parse_timestamp(timestamp: &str) -> ResultEngine<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(timestamp.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| EngineError::InvalidTimestampFormat(format!(
            "\"{timestamp}\" is not a valid ISO-8601 date-time"
        )))
}

/// Validates a requested status change against the dispenser's current
/// usage ledger.
pub async fn validate(
    repository: &Repository,
    dispenser_id: Uuid,
    requested_status: &str,
    requested_timestamp: &str,
) -> ResultEngine<Transition> {
    let status = parse_status(requested_status)?;
    let at = parse_timestamp(requested_timestamp)?;

    let dispenser = repository
        .get_dispenser(dispenser_id)
        .await?
        .ok_or_else(|| EngineError::DispenserNotFound(dispenser_id.to_string()))?;

    let ledger = repository.get_ledger(dispenser_id).await?;
    let open = ledger.as_ref().and_then(UsageLedger::open_interval);

    match status {
        DispenserStatus::Open => {
            if open.is_some() {
                return Err(EngineError::IllegalTransition(
                    "dispenser already has an open usage interval".to_string(),
                ));
            }
        }
        DispenserStatus::Closed => {
            let Some(interval) = open else {
                return Err(EngineError::IllegalTransition(
                    "dispenser has no open usage interval".to_string(),
                ));
            };
            if at <= interval.opened_at {
                return Err(EngineError::InvalidClosingTimestamp(format!(
                    "closing timestamp {at} is not after opening timestamp {}",
                    interval.opened_at
                )));
            }
        }
    }

    Ok(Transition {
        dispenser,
        ledger,
        status,
        at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_case_insensitive() {
        assert_eq!(parse_status("open").unwrap(), DispenserStatus::Open);
        assert_eq!(parse_status("Open").unwrap(), DispenserStatus::Open);
        assert_eq!(parse_status(" CLOSED ").unwrap(), DispenserStatus::Closed);
    }

    #[test]
    fn status_rejects_garbage_and_empty() {
        assert!(matches!(
            parse_status("ajar"),
            Err(EngineError::InvalidStatusValue(_))
        ));
        assert!(matches!(
            parse_status("   "),
            Err(EngineError::InvalidStatusValue(_))
        ));
    }

    #[test]
    fn timestamp_accepts_rfc3339() {
        let parsed = parse_timestamp("2024-05-01T10:00:00Z").unwrap();
        assert_eq!(parsed.to_rfc3339(), "2024-05-01T10:00:00+00:00");

        // Offsets normalize to the same instant.
        let offset = parse_timestamp("2024-05-01T12:00:00+02:00").unwrap();
        assert_eq!(offset, parsed);
    }

    #[test]
    fn timestamp_rejects_garbage_and_empty() {
        assert!(matches!(
            parse_timestamp("not-a-date"),
            Err(EngineError::InvalidTimestampFormat(_))
        ));
        assert!(matches!(
            parse_timestamp(""),
            Err(EngineError::InvalidTimestampFormat(_))
        ));
        assert!(matches!(
            parse_timestamp("2024-05-01"),
            Err(EngineError::InvalidTimestampFormat(_))
        ));
    }
}
