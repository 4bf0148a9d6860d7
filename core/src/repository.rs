//! Persistence seams.
//!
//! Every table the back-end touches sits behind an object-safe async trait
//! so the HTTP layer holds `Arc<dyn …Repository>` and tests can swap the
//! `PostgreSQL` implementation for an in-memory one.

use crate::pagination::{Page, PageRequest};
use crate::types::{
    BrandTypes, Car, CarCategory, CarId, CarStatus, CarView, CategoryId, Driver, DriverId,
    DriverStatus, MaintenanceId, MaintenanceView, NewCar, NewCategory, NewDriver, NewMaintenance,
    NewTransaction, NewUser, PaymentStatus, RentalStatus, Transaction, TransactionId,
    TransactionView, User, UserId, CarMaintenance,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors returned by repositories.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// No row matched.
    #[error("record not found")]
    NotFound,

    /// A uniqueness, reference or state guard rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backend failed.
    #[error("database error: {0}")]
    Database(String),
}

/// Result alias for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Messages carried by [`RepositoryError::Conflict`].
///
/// Every backend reports the same text so handlers and clients can rely
/// on it.
pub mod conflicts {
    /// Duplicate user email.
    pub const EMAIL_TAKEN: &str = "Email already registered";
    /// Duplicate user phone number.
    pub const PHONE_TAKEN: &str = "Phone number already registered";
    /// Duplicate (brand, type) category.
    pub const CATEGORY_EXISTS: &str = "Car category already exists";
    /// Category still referenced by cars.
    pub const CATEGORY_IN_USE: &str = "Car category is still used by cars";
    /// Duplicate car slug.
    pub const SLUG_TAKEN: &str = "Car slug already exists";
    /// Duplicate plate number.
    pub const PLATE_TAKEN: &str = "Plate number already registered";
    /// Duplicate registration number.
    pub const REGISTRATION_TAKEN: &str = "Registration number already registered";
    /// Car referenced by transactions.
    pub const CAR_IN_USE: &str = "Car has transactions";
    /// Duplicate driver phone number.
    pub const DRIVER_PHONE_TAKEN: &str = "Driver phone number already registered";
    /// Duplicate driving licence number.
    pub const LICENSE_TAKEN: &str = "License number already registered";
    /// Driver referenced by transactions.
    pub const DRIVER_IN_USE: &str = "Driver has transactions";
    /// Duplicate (car, date, description) maintenance record.
    pub const MAINTENANCE_EXISTS: &str = "Maintenance record already exists";
    /// Duplicate invoice number.
    pub const INVOICE_TAKEN: &str = "Invoice number already exists";
    /// Car status no longer matches the expected one.
    pub const CAR_STATUS_CHANGED: &str = "Car status changed, please retry";
    /// Driver status no longer matches the expected one.
    pub const DRIVER_STATUS_CHANGED: &str = "Driver status changed, please retry";
    /// Transaction statuses no longer match the expected ones.
    pub const TRANSACTION_STATUS_CHANGED: &str = "Transaction status changed, please retry";
}

/// Filters for listing cars.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CarFilter {
    /// Exact brand match
    pub car_brand: Option<String>,
    /// Exact body type match
    pub car_type: Option<String>,
    /// Exact status match
    pub status: Option<CarStatus>,
}

/// Filters for listing transactions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Only this customer's rentals
    pub user_id: Option<UserId>,
    /// Exact rental status match
    pub rental_status: Option<RentalStatus>,
    /// Exact payment status match
    pub payment_status: Option<PaymentStatus>,
}

/// A status change guarded by the value the caller last saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition<Id, Status> {
    /// Row to update
    pub id: Id,
    /// Status the row must still have
    pub from: Status,
    /// Status to write
    pub to: Status,
}

/// How the transaction row itself is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionWrite {
    /// Create a new rental.
    Insert(NewTransaction),
    /// Overwrite an existing rental if its statuses are unchanged.
    Update {
        /// New row contents
        record: Transaction,
        /// Rental status the stored row must have
        expected_rental: RentalStatus,
        /// Payment status the stored row must have
        expected_payment: PaymentStatus,
    },
}

/// Everything one rental lifecycle step writes, applied atomically.
///
/// If any guard fails nothing is written and the commit returns
/// [`RepositoryError::Conflict`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RentalChange {
    /// The transaction row
    pub transaction: TransactionWrite,
    /// Car status change
    pub car: Option<StatusTransition<CarId, CarStatus>>,
    /// Driver status change
    pub driver: Option<StatusTransition<DriverId, DriverStatus>>,
}

/// Accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. Conflict on duplicate email or phone.
    async fn create(&self, user: NewUser) -> Result<User>;

    /// Look up by id.
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;

    /// Look up by email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Overwrite profile fields and password hash.
    async fn update(&self, user: &User) -> Result<User>;

    /// Page through users, newest first.
    async fn list(&self, page: PageRequest) -> Result<Page<User>>;
}

/// Car categories.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Insert. Conflict on duplicate (brand, type).
    async fn create(&self, category: NewCategory) -> Result<CarCategory>;

    /// Look up by id.
    async fn find(&self, id: CategoryId) -> Result<Option<CarCategory>>;

    /// Look up by (brand, type).
    async fn find_by_brand_type(&self, brand: &str, car_type: &str) -> Result<Option<CarCategory>>;

    /// Overwrite brand and type.
    async fn update(&self, category: &CarCategory) -> Result<CarCategory>;

    /// Delete. Conflict while cars still reference it.
    async fn delete(&self, id: CategoryId) -> Result<()>;

    /// Page through categories.
    async fn list(&self, page: PageRequest) -> Result<Page<CarCategory>>;

    /// Every brand with its body types.
    async fn brands(&self) -> Result<Vec<BrandTypes>>;
}

/// Fleet.
#[async_trait]
pub trait CarRepository: Send + Sync {
    /// Insert. Conflict on duplicate slug, plate or registration number.
    async fn create(&self, car: NewCar) -> Result<CarView>;

    /// Look up by id.
    async fn find(&self, id: CarId) -> Result<Option<CarView>>;

    /// Look up by slug.
    async fn find_by_slug(&self, slug: &str) -> Result<Option<CarView>>;

    /// Look up by exact name.
    async fn find_by_name(&self, name: &str) -> Result<Option<CarView>>;

    /// Page through cars matching `filter`, newest first.
    async fn list(&self, filter: &CarFilter, page: PageRequest) -> Result<Page<CarView>>;

    /// Overwrite every editable field.
    async fn update(&self, car: &Car) -> Result<CarView>;

    /// Delete. Conflict while transactions reference it.
    async fn delete(&self, id: CarId) -> Result<()>;
}

/// Drivers.
#[async_trait]
pub trait DriverRepository: Send + Sync {
    /// Insert. Conflict on duplicate phone or licence number.
    async fn create(&self, driver: NewDriver) -> Result<Driver>;

    /// Look up by id.
    async fn find(&self, id: DriverId) -> Result<Option<Driver>>;

    /// Look up by exact name.
    async fn find_by_name(&self, name: &str) -> Result<Option<Driver>>;

    /// Page through drivers.
    async fn list(&self, page: PageRequest) -> Result<Page<Driver>>;

    /// Every driver with status `Available`.
    async fn list_available(&self) -> Result<Vec<Driver>>;

    /// Overwrite every editable field.
    async fn update(&self, driver: &Driver) -> Result<Driver>;

    /// Delete. Conflict while transactions reference it.
    async fn delete(&self, id: DriverId) -> Result<()>;
}

/// Maintenance records.
#[async_trait]
pub trait MaintenanceRepository: Send + Sync {
    /// Insert. Conflict on duplicate (car, date, description).
    async fn create(&self, record: NewMaintenance) -> Result<MaintenanceView>;

    /// Look up by id.
    async fn find(&self, id: MaintenanceId) -> Result<Option<MaintenanceView>>;

    /// Page through records, newest service date first.
    async fn list(&self, page: PageRequest) -> Result<Page<MaintenanceView>>;

    /// Overwrite every editable field.
    async fn update(&self, record: &CarMaintenance) -> Result<MaintenanceView>;

    /// Delete.
    async fn delete(&self, id: MaintenanceId) -> Result<()>;
}

/// Rental transactions.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Apply one lifecycle step atomically.
    async fn commit(&self, change: RentalChange) -> Result<Transaction>;

    /// Look up by id with listing details.
    async fn find(&self, id: TransactionId) -> Result<Option<TransactionView>>;

    /// Page through transactions matching `filter`, newest first.
    async fn list(&self, filter: &TransactionFilter, page: PageRequest) -> Result<Page<TransactionView>>;

    /// Every transaction created in `[from, to)`, oldest first.
    async fn in_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<TransactionView>>;
}

/// Liveness of the backing store.
#[async_trait]
pub trait DatabaseHealth: Send + Sync {
    /// Round-trip to the database.
    async fn ping(&self) -> Result<()>;
}
