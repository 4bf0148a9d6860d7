//! Mapping from `sqlx` errors to repository errors.

use rentcar_core::repository::{conflicts, RepositoryError};

/// Unique constraint name to the conflict message it reports.
const UNIQUE_CONSTRAINTS: &[(&str, &str)] = &[
    ("users_email_key", conflicts::EMAIL_TAKEN),
    ("users_phone_number_key", conflicts::PHONE_TAKEN),
    ("car_categories_brand_type_key", conflicts::CATEGORY_EXISTS),
    ("cars_slug_key", conflicts::SLUG_TAKEN),
    ("cars_plate_number_key", conflicts::PLATE_TAKEN),
    ("cars_registration_number_key", conflicts::REGISTRATION_TAKEN),
    ("drivers_phone_number_key", conflicts::DRIVER_PHONE_TAKEN),
    ("drivers_license_number_key", conflicts::LICENSE_TAKEN),
    ("car_maintenances_record_key", conflicts::MAINTENANCE_EXISTS),
    ("transactions_invoice_key", conflicts::INVOICE_TAKEN),
];

/// Map an error from an insert or update.
///
/// Unique violations become [`RepositoryError::Conflict`] with the message
/// for the violated constraint; a foreign key violation means a referenced
/// row is missing.
pub(crate) fn write_error(error: sqlx::Error) -> RepositoryError {
    if let sqlx::Error::Database(db) = &error {
        if db.is_unique_violation() {
            let message = db
                .constraint()
                .and_then(|name| {
                    UNIQUE_CONSTRAINTS
                        .iter()
                        .find(|(constraint, _)| *constraint == name)
                        .map(|(_, message)| *message)
                })
                .unwrap_or("Duplicate value");
            return RepositoryError::Conflict(message.to_string());
        }
        if db.is_foreign_key_violation() {
            return RepositoryError::NotFound;
        }
    }
    query_error(error)
}

/// Map an error from a delete; a foreign key violation means the row is
/// still referenced.
pub(crate) fn delete_error(error: sqlx::Error, in_use: &str) -> RepositoryError {
    if let sqlx::Error::Database(db) = &error {
        if db.is_foreign_key_violation() {
            return RepositoryError::Conflict(in_use.to_string());
        }
    }
    query_error(error)
}

/// Map any other error.
pub(crate) fn query_error(error: sqlx::Error) -> RepositoryError {
    match error {
        sqlx::Error::RowNotFound => RepositoryError::NotFound,
        other => {
            tracing::error!(error = %other, "Database query failed");
            RepositoryError::Database(other.to_string())
        },
    }
}

/// A stored enum column held an unknown value.
pub(crate) fn corrupt(column: &str, value: &str) -> RepositoryError {
    RepositoryError::Database(format!("unexpected {column} value {value:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert_eq!(query_error(sqlx::Error::RowNotFound), RepositoryError::NotFound);
        assert_eq!(write_error(sqlx::Error::RowNotFound), RepositoryError::NotFound);
    }

    #[test]
    fn other_errors_are_database_errors() {
        let err = delete_error(sqlx::Error::PoolTimedOut, conflicts::CAR_IN_USE);
        assert!(matches!(err, RepositoryError::Database(_)));
    }

    #[test]
    fn every_conflict_message_is_distinct() {
        let mut messages: Vec<&str> = UNIQUE_CONSTRAINTS.iter().map(|(_, m)| *m).collect();
        messages.sort_unstable();
        messages.dedup();
        assert_eq!(messages.len(), UNIQUE_CONSTRAINTS.len());
    }
}
