//! Domain types for the rental business.
//!
//! Identifiers are database-assigned integers wrapped in newtypes so that a
//! `CarId` can never be passed where a `DriverId` is expected. Status and
//! option enums serialise as the exact strings the API exposes.

use crate::money::Money;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// Identifiers
// ============================================================================

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Wrap a raw identifier.
            #[must_use]
            pub const fn new(id: i64) -> Self {
                Self(id)
            }

            /// The raw identifier.
            #[must_use]
            pub const fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// User identifier
    UserId
);
id_type!(
    /// Car category identifier
    CategoryId
);
id_type!(
    /// Car identifier
    CarId
);
id_type!(
    /// Driver identifier
    DriverId
);
id_type!(
    /// Maintenance record identifier
    MaintenanceId
);
id_type!(
    /// Rental transaction identifier
    TransactionId
);

// ============================================================================
// Enumerations
// ============================================================================

/// A string did not name any variant of the target enum.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unallowed value {value}")]
pub struct UnknownVariant {
    /// The rejected input
    pub value: String,
}

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Wire and database representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(UnknownVariant { value: other.to_string() }),
                }
            }
        }
    };
}

string_enum!(
    /// Availability of a car in the fleet.
    CarStatus {
        /// Can be booked
        Available => "Available",
        /// Withdrawn by an admin
        Unavailable => "Unavailable",
        /// Currently out with a customer
        Rented => "Rented",
        /// Reserved by a pending transaction
        Booked => "Booked",
    }
);

string_enum!(
    /// Gearbox type.
    Transmission {
        /// Manual
        Manual => "MT",
        /// Automatic
        Automatic => "AT",
        /// Continuously variable
        Cvt => "CVT",
    }
);

string_enum!(
    /// Fuel type.
    Fuel {
        /// Petrol engine
        Petrol => "Petrol",
        /// Diesel engine
        Diesel => "Diesel",
    }
);

string_enum!(
    /// Availability of a driver.
    DriverStatus {
        /// Can be assigned
        Available => "Available",
        /// Off duty
        Unavailable => "Unavailable",
        /// Assigned to an active transaction
        Booked => "Booked",
    }
);

string_enum!(
    /// Driver gender.
    Gender {
        /// Male
        Male => "Male",
        /// Female
        Female => "Female",
    }
);

string_enum!(
    /// Where a rental is in its lifecycle.
    RentalStatus {
        /// Booked, waiting for payment verification
        Pending => "Pending",
        /// Payment verified, car handed over
        InProgress => "In Progress",
        /// Car brought back
        Returned => "Returned",
        /// Cancelled or payment rejected
        Canceled => "Canceled",
    }
);

string_enum!(
    /// Payment verification state.
    PaymentStatus {
        /// Awaiting proof or verification
        Pending => "Pending",
        /// Verified by an admin
        Success => "Success",
        /// Rejected by an admin
        Failed => "Failed",
    }
);

/// Account role. Stored as the numeric `role_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Back-office administrator
    Admin,
    /// Customer renting cars
    Customer,
}

impl Role {
    /// Numeric role id.
    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Self::Admin => 1,
            Self::Customer => 2,
        }
    }

    /// Role for a numeric id.
    #[must_use]
    pub const fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(Self::Admin),
            2 => Some(Self::Customer),
            _ => None,
        }
    }

    /// Whether this role may use the back-office endpoints.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

// ============================================================================
// Users
// ============================================================================

/// A registered account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Identifier
    pub id: UserId,
    /// Role
    pub role: Role,
    /// Display name
    pub name: String,
    /// Login email (unique)
    pub email: String,
    /// Encoded password hash
    pub password_hash: String,
    /// Postal address
    pub address: String,
    /// Phone number (unique)
    pub phone_number: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    /// Role
    pub role: Role,
    /// Display name
    pub name: String,
    /// Login email
    pub email: String,
    /// Encoded password hash
    pub password_hash: String,
    /// Postal address
    pub address: String,
    /// Phone number
    pub phone_number: String,
}

/// Public representation of a user. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    /// Identifier
    pub id: UserId,
    /// Numeric role id
    pub role_id: i64,
    /// Display name
    pub name: String,
    /// Email
    pub email: String,
    /// Postal address
    pub address: String,
    /// Phone number
    pub phone_number: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role_id: user.role.id(),
            name: user.name.clone(),
            email: user.email.clone(),
            address: user.address.clone(),
            phone_number: user.phone_number.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

// ============================================================================
// Categories
// ============================================================================

/// A (brand, body type) pair cars are filed under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarCategory {
    /// Identifier
    pub id: CategoryId,
    /// Brand, e.g. "Toyota"
    pub car_brand: String,
    /// Body type, e.g. "SUV"
    #[serde(rename = "type")]
    pub car_type: String,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    /// Brand
    pub car_brand: String,
    /// Body type
    pub car_type: String,
}

/// A brand with the body types filed under it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrandTypes {
    /// Brand
    pub car_brand: String,
    /// Body types, sorted
    pub types: Vec<String>,
}

// ============================================================================
// Cars
// ============================================================================

/// A car in the fleet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Car {
    /// Identifier
    pub id: CarId,
    /// Category
    pub category_id: CategoryId,
    /// URL slug (unique)
    pub slug: String,
    /// Model name
    pub name: String,
    /// Gearbox
    pub transmission: Transmission,
    /// Fuel
    pub fuel: Fuel,
    /// Paint colour
    pub color: String,
    /// Licence plate (unique)
    pub plate_number: String,
    /// Seats
    pub capacity: i32,
    /// Registration number (unique)
    pub registration_number: i64,
    /// Daily rental price
    pub price: Money,
    /// Image URL
    pub image: String,
    /// Availability
    pub status: CarStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new car.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCar {
    /// Category
    pub category_id: CategoryId,
    /// URL slug
    pub slug: String,
    /// Model name
    pub name: String,
    /// Gearbox
    pub transmission: Transmission,
    /// Fuel
    pub fuel: Fuel,
    /// Paint colour
    pub color: String,
    /// Licence plate
    pub plate_number: String,
    /// Seats
    pub capacity: i32,
    /// Registration number
    pub registration_number: i64,
    /// Daily rental price
    pub price: Money,
    /// Image URL
    pub image: String,
    /// Availability
    pub status: CarStatus,
}

/// A car joined with its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarView {
    /// The car
    #[serde(flatten)]
    pub car: Car,
    /// Category brand
    pub car_brand: String,
    /// Category body type
    #[serde(rename = "type")]
    pub car_type: String,
}

// ============================================================================
// Drivers
// ============================================================================

/// A driver customers can hire with a car.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Driver {
    /// Identifier
    pub id: DriverId,
    /// Full name
    pub name: String,
    /// Gender
    pub gender: Gender,
    /// Date of birth
    pub dob: NaiveDate,
    /// Postal address
    pub address: String,
    /// Phone number (unique)
    pub phone_number: String,
    /// Driving licence number (unique)
    pub license_number: String,
    /// Availability
    pub status: DriverStatus,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDriver {
    /// Full name
    pub name: String,
    /// Gender
    pub gender: Gender,
    /// Date of birth
    pub dob: NaiveDate,
    /// Postal address
    pub address: String,
    /// Phone number
    pub phone_number: String,
    /// Driving licence number
    pub license_number: String,
    /// Availability
    pub status: DriverStatus,
}

// ============================================================================
// Maintenance
// ============================================================================

/// A maintenance record for a car.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarMaintenance {
    /// Identifier
    pub id: MaintenanceId,
    /// Serviced car
    pub car_id: CarId,
    /// Service date
    pub maintenance_date: NaiveDate,
    /// What was done
    pub description: String,
    /// Cost
    pub cost: Money,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

/// Fields for a new maintenance record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMaintenance {
    /// Serviced car
    pub car_id: CarId,
    /// Service date
    pub maintenance_date: NaiveDate,
    /// What was done
    pub description: String,
    /// Cost
    pub cost: Money,
}

/// A maintenance record with the car's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MaintenanceView {
    /// The record
    #[serde(flatten)]
    pub maintenance: CarMaintenance,
    /// Name of the serviced car
    pub car_name: String,
}

// ============================================================================
// Transactions
// ============================================================================

/// A rental.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transaction {
    /// Identifier
    pub id: TransactionId,
    /// Renting customer
    pub user_id: UserId,
    /// Rented car
    pub car_id: CarId,
    /// Hired driver, if any
    pub driver_id: Option<DriverId>,
    /// Invoice number (unique)
    pub invoice: String,
    /// First rental day
    pub start_date: NaiveDate,
    /// Agreed return day
    pub end_date: NaiveDate,
    /// Actual return day
    pub return_date: Option<NaiveDate>,
    /// Lifecycle state
    pub rental_status: RentalStatus,
    /// Payment state
    pub payment_status: PaymentStatus,
    /// Uploaded payment proof URL
    pub payment_proof: Option<String>,
    /// Charge for late return
    pub late_fee: Option<Money>,
    /// Rental total, excluding late fees
    pub total_cost: Money,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last update time
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Whole days between start and agreed end.
    #[must_use]
    pub fn rent_duration(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }
}

/// Fields for a new rental.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    /// Renting customer
    pub user_id: UserId,
    /// Rented car
    pub car_id: CarId,
    /// Hired driver
    pub driver_id: Option<DriverId>,
    /// Invoice number
    pub invoice: String,
    /// First rental day
    pub start_date: NaiveDate,
    /// Agreed return day
    pub end_date: NaiveDate,
    /// Rental total
    pub total_cost: Money,
}

/// Car details embedded in transaction listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CarData {
    /// Brand
    pub car_brand: String,
    /// Model name
    pub car_name: String,
    /// Daily price
    pub car_price: Money,
    /// Body type
    pub car_type: String,
    /// Image URL
    pub car_image: String,
    /// Slug
    pub car_slug: String,
}

/// Driver details embedded in transaction listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriverData {
    /// Driver name
    pub driver_name: String,
    /// Driver phone number
    pub driver_phone_number: String,
}

/// A transaction with the details listings show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionView {
    /// The transaction
    #[serde(flatten)]
    pub transaction: Transaction,
    /// Renting customer's name
    pub customer_name: String,
    /// Days rented
    pub rent_duration: i64,
    /// Car details
    pub car_data: CarData,
    /// Driver details
    pub driver_data: Option<DriverData>,
}
