//! Rental lifecycle.
//!
//! A rental moves through booking, payment proof, payment verification and
//! either cancellation or return. Each step is a command reduced against the
//! records the handler loaded; accepted commands emit an event, update the
//! local state and describe one atomic write to the transaction repository.
//!
//! ```text
//! Book ──▶ Pending/Pending ──UploadPaymentProof──▶ Pending/Pending + proof
//!                │                                        │
//!              Cancel                              VerifyPayment
//!                ▼                                  ▼            ▼
//!         Canceled/Pending              In Progress/Success  Canceled/Failed
//!                                                   │
//!                                               ReturnCar
//!                                                   ▼
//!                                           Returned/Success
//! ```
//!
//! The repository write is guarded by the statuses the command saw, so two
//! requests racing for the same car cannot both succeed.

use chrono::NaiveDate;
use rentcar_core::effect::Effect;
use rentcar_core::environment::Clock;
use rentcar_core::money::Money;
use rentcar_core::pricing::{self, PricingError};
use rentcar_core::reducer::Reducer;
use rentcar_core::repository::{
    RentalChange, RepositoryError, StatusTransition, TransactionRepository, TransactionWrite,
};
use rentcar_core::types::{
    Car, CarId, CarStatus, Driver, DriverId, DriverStatus, NewTransaction, PaymentStatus, RentalStatus, Role,
    Transaction, UserId,
};
use rentcar_core::{smallvec, SmallVec};
use rentcar_web::AppError;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// Types
// ============================================================================

/// Who issued a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// Authenticated account
    pub user_id: UserId,
    /// Its role
    pub role: Role,
}

impl Actor {
    const fn owns(self, transaction: &Transaction) -> bool {
        transaction.user_id.get() == self.user_id.get()
    }

    const fn can_manage(self, transaction: &Transaction) -> bool {
        self.role.is_admin() || self.owns(transaction)
    }
}

/// Why a command was refused or could not be stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RentalError {
    /// The car to book was not loaded.
    #[error("Car not found!")]
    CarNotFound,

    /// The car is booked, rented or out of service.
    #[error("Car is not available!")]
    CarUnavailable,

    /// The requested driver is booked or off duty.
    #[error("Driver is not available!")]
    DriverUnavailable,

    /// End date not after start date.
    #[error(transparent)]
    InvalidPeriod(#[from] PricingError),

    /// No transaction was loaded for a lifecycle command.
    #[error("Transaction not found!")]
    TransactionNotFound,

    /// The actor may not touch this transaction.
    #[error("You are not allowed to change this transaction")]
    Forbidden,

    /// The rental already left the pending state.
    #[error("Transaction is no longer pending")]
    NotPending,

    /// A proof was uploaded before.
    #[error("Payment proof has already been uploaded")]
    ProofAlreadyUploaded,

    /// Verification needs a proof.
    #[error("Payment proof has not been uploaded yet")]
    ProofMissing,

    /// Paid rentals run to return.
    #[error("Paid transactions can not be canceled")]
    AlreadyPaid,

    /// Only a running rental can be returned.
    #[error("Car is not currently rented")]
    NotInProgress,

    /// Return before the rental started.
    #[error("Return date must not be before the start date")]
    ReturnBeforeStart,

    /// The repository refused or failed the write.
    #[error(transparent)]
    Persist(RepositoryError),
}

impl From<RentalError> for AppError {
    fn from(err: RentalError) -> Self {
        match err {
            RentalError::CarNotFound
            | RentalError::CarUnavailable
            | RentalError::DriverUnavailable
            | RentalError::TransactionNotFound => Self::not_found(err.to_string()),
            RentalError::Forbidden => Self::forbidden(err.to_string()),
            RentalError::Persist(repo) => repo.into(),
            RentalError::InvalidPeriod(_)
            | RentalError::NotPending
            | RentalError::ProofAlreadyUploaded
            | RentalError::ProofMissing
            | RentalError::AlreadyPaid
            | RentalError::NotInProgress
            | RentalError::ReturnBeforeStart => Self::bad_request(err.to_string()),
        }
    }
}

/// Records one command operates on.
#[derive(Debug, Clone, Default)]
pub struct RentalState {
    /// The rental; `None` until a booking is persisted
    pub transaction: Option<Transaction>,
    /// The rented car
    pub car: Option<Car>,
    /// The hired driver
    pub driver: Option<Driver>,
    /// Last refusal or storage failure
    pub last_error: Option<RentalError>,
}

impl RentalState {
    /// State for a new booking.
    #[must_use]
    pub const fn for_booking(car: Car, driver: Option<Driver>) -> Self {
        Self {
            transaction: None,
            car: Some(car),
            driver,
            last_error: None,
        }
    }

    /// State for a command on an existing rental.
    #[must_use]
    pub const fn for_transaction(transaction: Transaction, car: Option<Car>, driver: Option<Driver>) -> Self {
        Self {
            transaction: Some(transaction),
            car,
            driver,
            last_error: None,
        }
    }
}

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Commands and the events they produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RentalAction {
    // Commands
    /// Reserve the loaded car (and driver) for a period.
    Book {
        /// Booking customer
        actor: Actor,
        /// First rental day
        start_date: NaiveDate,
        /// Agreed return day
        end_date: NaiveDate,
        /// Invoice number for the new transaction
        invoice: String,
    },

    /// Attach the customer's proof of payment.
    UploadPaymentProof {
        /// Uploading customer
        actor: Actor,
        /// Stored image URL
        proof_url: String,
    },

    /// Accept or reject the uploaded proof.
    VerifyPayment {
        /// Reviewing admin
        actor: Actor,
        /// Whether the payment was received
        approved: bool,
    },

    /// Call off a pending rental.
    Cancel {
        /// Owner or admin
        actor: Actor,
    },

    /// Take the car back.
    ReturnCar {
        /// Owner or admin
        actor: Actor,
        /// Day the car came back
        return_date: NaiveDate,
    },

    // Events
    /// A booking was accepted.
    RentalBooked {
        /// Row to insert
        booking: NewTransaction,
    },

    /// Proof recorded.
    PaymentProofUploaded {
        /// Stored image URL
        proof_url: String,
    },

    /// Payment reviewed.
    PaymentVerified {
        /// Outcome
        approved: bool,
    },

    /// Rental called off.
    RentalCanceled,

    /// Car returned.
    CarReturned {
        /// Day the car came back
        return_date: NaiveDate,
        /// Charge for the days past the end date
        late_fee: Option<Money>,
    },

    /// The change was written.
    Persisted {
        /// The stored transaction
        transaction: Transaction,
    },

    /// The write failed; nothing was stored.
    PersistFailed {
        /// Storage error
        error: RentalError,
    },

    /// The command was refused.
    ValidationFailed {
        /// Reason
        error: RentalError,
    },
}

impl RentalAction {
    /// Whether this action ends a command: the handler waits for one.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Persisted { .. } | Self::PersistFailed { .. } | Self::ValidationFailed { .. }
        )
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies of the rental reducer.
#[derive(Clone)]
pub struct RentalEnvironment {
    /// Where rental changes are committed
    pub transactions: Arc<dyn TransactionRepository>,
    /// Time source
    pub clock: Arc<dyn Clock>,
}

impl RentalEnvironment {
    /// Creates a new `RentalEnvironment`
    #[must_use]
    pub fn new(transactions: Arc<dyn TransactionRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { transactions, clock }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for the rental lifecycle.
#[derive(Clone, Debug)]
pub struct RentalReducer;

impl RentalReducer {
    /// Creates a new `RentalReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Applies an event to state
    fn apply_event(state: &mut RentalState, action: &RentalAction, env: &RentalEnvironment) {
        match action {
            RentalAction::RentalBooked { .. } => {
                if let Some(car) = state.car.as_mut() {
                    car.status = CarStatus::Booked;
                }
                if let Some(driver) = state.driver.as_mut() {
                    driver.status = DriverStatus::Booked;
                }
                state.last_error = None;
            },

            RentalAction::PaymentProofUploaded { proof_url } => {
                if let Some(t) = state.transaction.as_mut() {
                    t.payment_proof = Some(proof_url.clone());
                    t.updated_at = env.clock.now();
                }
                state.last_error = None;
            },

            RentalAction::PaymentVerified { approved: true } => {
                if let Some(t) = state.transaction.as_mut() {
                    t.payment_status = PaymentStatus::Success;
                    t.rental_status = RentalStatus::InProgress;
                    t.updated_at = env.clock.now();
                }
                if let Some(car) = state.car.as_mut() {
                    car.status = CarStatus::Rented;
                }
                state.last_error = None;
            },

            RentalAction::PaymentVerified { approved: false } => {
                if let Some(t) = state.transaction.as_mut() {
                    t.payment_status = PaymentStatus::Failed;
                    t.rental_status = RentalStatus::Canceled;
                    t.updated_at = env.clock.now();
                }
                Self::release(state);
            },

            RentalAction::RentalCanceled => {
                if let Some(t) = state.transaction.as_mut() {
                    t.rental_status = RentalStatus::Canceled;
                    t.updated_at = env.clock.now();
                }
                Self::release(state);
            },

            RentalAction::CarReturned { return_date, late_fee } => {
                if let Some(t) = state.transaction.as_mut() {
                    t.rental_status = RentalStatus::Returned;
                    t.return_date = Some(*return_date);
                    t.late_fee = *late_fee;
                    t.updated_at = env.clock.now();
                }
                Self::release(state);
            },

            RentalAction::Persisted { transaction } => {
                state.transaction = Some(transaction.clone());
                state.last_error = None;
            },

            RentalAction::PersistFailed { error } | RentalAction::ValidationFailed { error } => {
                state.last_error = Some(error.clone());
            },

            // Commands don't modify state
            RentalAction::Book { .. }
            | RentalAction::UploadPaymentProof { .. }
            | RentalAction::VerifyPayment { .. }
            | RentalAction::Cancel { .. }
            | RentalAction::ReturnCar { .. } => {},
        }
    }

    /// Car and driver go back to the pool.
    fn release(state: &mut RentalState) {
        if let Some(car) = state.car.as_mut() {
            car.status = CarStatus::Available;
        }
        if let Some(driver) = state.driver.as_mut() {
            driver.status = DriverStatus::Available;
        }
        state.last_error = None;
    }

    /// Refuse a command: record the error and report it to the waiting handler.
    fn reject(
        state: &mut RentalState,
        env: &RentalEnvironment,
        error: RentalError,
    ) -> SmallVec<[Effect<RentalAction>; 4]> {
        tracing::info!(%error, "Rental command rejected");
        let failed = RentalAction::ValidationFailed { error };
        Self::apply_event(state, &failed, env);
        smallvec![Effect::send(failed)]
    }

    /// Car and driver transitions from their loaded statuses.
    fn transitions(
        state: &RentalState,
        car_to: Option<CarStatus>,
        driver_to: Option<DriverStatus>,
    ) -> (
        Option<StatusTransition<CarId, CarStatus>>,
        Option<StatusTransition<DriverId, DriverStatus>>,
    ) {
        let car = car_to.and_then(|to| {
            state.car.as_ref().map(|c| StatusTransition {
                id: c.id,
                from: c.status,
                to,
            })
        });
        let driver = driver_to.and_then(|to| {
            state.driver.as_ref().map(|d| StatusTransition {
                id: d.id,
                from: d.status,
                to,
            })
        });
        (car, driver)
    }

    /// Write the change; report `Persisted` or `PersistFailed`.
    fn persist(env: &RentalEnvironment, change: RentalChange, step: &'static str) -> Effect<RentalAction> {
        let transactions = Arc::clone(&env.transactions);
        Effect::Future(Box::pin(async move {
            match transactions.commit(change).await {
                Ok(transaction) => {
                    tracing::info!(
                        transaction_id = %transaction.id,
                        invoice = %transaction.invoice,
                        step,
                        "Rental change stored"
                    );
                    match step {
                        "book" => metrics::counter!("rental.bookings.created").increment(1),
                        "return" => {
                            let late = if transaction.late_fee.is_some() { "true" } else { "false" };
                            metrics::counter!("rental.returns.total", "late" => late).increment(1);
                        },
                        _ => {},
                    }
                    Some(RentalAction::Persisted { transaction })
                },
                Err(error) => {
                    metrics::counter!("rental.persist.failed", "step" => step).increment(1);
                    match &error {
                        RepositoryError::Database(_) => {
                            tracing::error!(%error, step, "Failed to store rental change");
                        },
                        RepositoryError::Conflict(_) | RepositoryError::NotFound => {
                            tracing::warn!(%error, step, "Rental change refused by repository");
                        },
                    }
                    Some(RentalAction::PersistFailed {
                        error: RentalError::Persist(error),
                    })
                },
            }
        }))
    }

    /// The loaded transaction as an update guarded by its current statuses.
    fn update(before: &Transaction, after: &RentalState) -> Option<TransactionWrite> {
        after.transaction.as_ref().map(|record| TransactionWrite::Update {
            record: record.clone(),
            expected_rental: before.rental_status,
            expected_payment: before.payment_status,
        })
    }
}

impl Default for RentalReducer {
    fn default() -> Self {
        Self::new()
    }
}

impl Reducer for RentalReducer {
    type State = RentalState;
    type Action = RentalAction;
    type Environment = RentalEnvironment;

    #[allow(clippy::too_many_lines)] // One arm per lifecycle command
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Book ==========
            RentalAction::Book {
                actor,
                start_date,
                end_date,
                invoice,
            } => {
                let Some(car) = state.car.as_ref() else {
                    return Self::reject(state, env, RentalError::CarNotFound);
                };
                if car.status != CarStatus::Available {
                    return Self::reject(state, env, RentalError::CarUnavailable);
                }
                if state
                    .driver
                    .as_ref()
                    .is_some_and(|d| d.status != DriverStatus::Available)
                {
                    return Self::reject(state, env, RentalError::DriverUnavailable);
                }
                let days = match pricing::rent_duration(start_date, end_date) {
                    Ok(days) => days,
                    Err(e) => return Self::reject(state, env, e.into()),
                };

                let booking = NewTransaction {
                    user_id: actor.user_id,
                    car_id: car.id,
                    driver_id: state.driver.as_ref().map(|d| d.id),
                    invoice,
                    start_date,
                    end_date,
                    total_cost: pricing::total_cost(car.price, days, state.driver.is_some()),
                };
                let (car_t, driver_t) =
                    Self::transitions(state, Some(CarStatus::Booked), Some(DriverStatus::Booked));

                let booked = RentalAction::RentalBooked { booking: booking.clone() };
                Self::apply_event(state, &booked, env);

                tracing::info!(
                    user_id = %actor.user_id,
                    car_id = %booking.car_id,
                    invoice = %booking.invoice,
                    days,
                    "Booking accepted"
                );
                smallvec![Self::persist(
                    env,
                    RentalChange {
                        transaction: TransactionWrite::Insert(booking),
                        car: car_t,
                        driver: driver_t,
                    },
                    "book",
                )]
            },

            // ========== Upload Payment Proof ==========
            RentalAction::UploadPaymentProof { actor, proof_url } => {
                let Some(before) = state.transaction.clone() else {
                    return Self::reject(state, env, RentalError::TransactionNotFound);
                };
                if !actor.owns(&before) {
                    return Self::reject(state, env, RentalError::Forbidden);
                }
                if before.rental_status != RentalStatus::Pending || before.payment_status != PaymentStatus::Pending {
                    return Self::reject(state, env, RentalError::NotPending);
                }
                if before.payment_proof.is_some() {
                    return Self::reject(state, env, RentalError::ProofAlreadyUploaded);
                }

                Self::apply_event(state, &RentalAction::PaymentProofUploaded { proof_url }, env);
                let Some(write) = Self::update(&before, state) else {
                    return SmallVec::new();
                };
                smallvec![Self::persist(
                    env,
                    RentalChange {
                        transaction: write,
                        car: None,
                        driver: None,
                    },
                    "payment_proof",
                )]
            },

            // ========== Verify Payment ==========
            RentalAction::VerifyPayment { actor, approved } => {
                let Some(before) = state.transaction.clone() else {
                    return Self::reject(state, env, RentalError::TransactionNotFound);
                };
                if !actor.role.is_admin() {
                    return Self::reject(state, env, RentalError::Forbidden);
                }
                if before.rental_status != RentalStatus::Pending || before.payment_status != PaymentStatus::Pending {
                    return Self::reject(state, env, RentalError::NotPending);
                }
                if before.payment_proof.is_none() {
                    return Self::reject(state, env, RentalError::ProofMissing);
                }

                let (car_t, driver_t) = if approved {
                    Self::transitions(state, Some(CarStatus::Rented), None)
                } else {
                    Self::transitions(state, Some(CarStatus::Available), Some(DriverStatus::Available))
                };
                Self::apply_event(state, &RentalAction::PaymentVerified { approved }, env);

                tracing::info!(transaction_id = %before.id, approved, "Payment reviewed");
                let Some(write) = Self::update(&before, state) else {
                    return SmallVec::new();
                };
                smallvec![Self::persist(
                    env,
                    RentalChange {
                        transaction: write,
                        car: car_t,
                        driver: driver_t,
                    },
                    "verify_payment",
                )]
            },

            // ========== Cancel ==========
            RentalAction::Cancel { actor } => {
                let Some(before) = state.transaction.clone() else {
                    return Self::reject(state, env, RentalError::TransactionNotFound);
                };
                if !actor.can_manage(&before) {
                    return Self::reject(state, env, RentalError::Forbidden);
                }
                if before.payment_status == PaymentStatus::Success {
                    return Self::reject(state, env, RentalError::AlreadyPaid);
                }
                if before.rental_status != RentalStatus::Pending {
                    return Self::reject(state, env, RentalError::NotPending);
                }

                let (car_t, driver_t) =
                    Self::transitions(state, Some(CarStatus::Available), Some(DriverStatus::Available));
                Self::apply_event(state, &RentalAction::RentalCanceled, env);

                tracing::info!(transaction_id = %before.id, user_id = %actor.user_id, "Rental canceled");
                let Some(write) = Self::update(&before, state) else {
                    return SmallVec::new();
                };
                smallvec![Self::persist(
                    env,
                    RentalChange {
                        transaction: write,
                        car: car_t,
                        driver: driver_t,
                    },
                    "cancel",
                )]
            },

            // ========== Return Car ==========
            RentalAction::ReturnCar { actor, return_date } => {
                let Some(before) = state.transaction.clone() else {
                    return Self::reject(state, env, RentalError::TransactionNotFound);
                };
                if !actor.can_manage(&before) {
                    return Self::reject(state, env, RentalError::Forbidden);
                }
                if before.rental_status != RentalStatus::InProgress {
                    return Self::reject(state, env, RentalError::NotInProgress);
                }
                if return_date < before.start_date {
                    return Self::reject(state, env, RentalError::ReturnBeforeStart);
                }

                let price = state.car.as_ref().map_or(Money::ZERO, |c| c.price);
                let late_fee = pricing::late_fee(price, before.end_date, return_date, before.driver_id.is_some());
                let (car_t, driver_t) =
                    Self::transitions(state, Some(CarStatus::Available), Some(DriverStatus::Available));
                Self::apply_event(state, &RentalAction::CarReturned { return_date, late_fee }, env);

                tracing::info!(
                    transaction_id = %before.id,
                    %return_date,
                    late_fee = %late_fee.unwrap_or(Money::ZERO),
                    "Car returned"
                );
                let Some(write) = Self::update(&before, state) else {
                    return SmallVec::new();
                };
                smallvec![Self::persist(
                    env,
                    RentalChange {
                        transaction: write,
                        car: car_t,
                        driver: driver_t,
                    },
                    "return",
                )]
            },

            // ========== Events (fed back from effects) ==========
            event => {
                Self::apply_event(state, &event, env);
                SmallVec::new()
            },
        }
    }
}
