//! SQLSTATE classification
//!
//! Raw driver errors never leave this crate: they are folded into the
//! nearest `AppError` here.

use spacebook_core::AppError;
use tracing::{error, warn};

/// serialization_failure, deadlock_detected, lock_not_available, query_canceled
const TRANSIENT_CODES: [&str; 4] = ["40001", "40P01", "55P03", "57014"];

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

pub(crate) fn is_transient(err: &sqlx::Error) -> bool {
    sqlstate(err)
        .map(|code| TRANSIENT_CODES.contains(&code.as_str()))
        .unwrap_or(false)
}

/// Name of the violated foreign key constraint, if `err` is one
pub(crate) fn foreign_key_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => db.constraint(),
        _ => None,
    }
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Fallback mapping once call-site specific codes have been handled
pub(crate) fn storage_error(context: &str, err: sqlx::Error) -> AppError {
    if is_transient(&err) {
        warn!("Transient database failure ({}): {}", context, err);
        return AppError::Transient(format!("{}: {}", context, err));
    }

    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
            error!("Database pool unavailable ({}): {}", context, err);
            AppError::Pool(format!("{}: {}", context, err))
        }
        other => {
            error!("Database error ({}): {}", context, other);
            AppError::Database(format!("{}: {}", context, other))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_transient() {
        assert!(!is_transient(&sqlx::Error::RowNotFound));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        assert!(foreign_key_constraint(&sqlx::Error::RowNotFound).is_none());
    }

    #[test]
    fn test_pool_timeout_maps_to_pool_error() {
        let err = storage_error("acquire", sqlx::Error::PoolTimedOut);
        assert!(matches!(err, AppError::Pool(_)));
    }

    #[test]
    fn test_other_errors_map_to_database_error() {
        let err = storage_error("find reservation", sqlx::Error::RowNotFound);
        assert_eq!(err.error_code(), "database_error");
    }
}
