pub mod events;
pub mod games;
pub mod members;
pub mod payments;
pub mod stats;

pub use events::{PersonalEventRepository, PersonalEventStore};
pub use games::{GameRepository, GameStore};
pub use members::{MemberRepository, MemberStore};
pub use payments::{PaymentRepository, PaymentStore};

/// Constraint violations a store reports for bad input. Every other store
/// failure stays an opaque `anyhow::Error`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    MissingReference(String),
}

/// Turns unique and foreign key violations into a [`StoreError`].
pub fn constraint_violation(e: sqlx::Error) -> anyhow::Error {
    if let sqlx::Error::Database(db_error) = &e {
        if db_error.is_unique_violation() {
            return StoreError::Conflict(db_error.message().to_string()).into();
        }
        if db_error.is_foreign_key_violation() {
            return StoreError::MissingReference(db_error.message().to_string()).into();
        }
    }

    e.into()
}
