//! In-memory repositories
//!
//! [`InMemoryDatabase`] implements every repository trait over plain maps
//! guarded by one lock, so each call (including a rental commit) is atomic.
//! Uniqueness rules and conflict messages mirror the `PostgreSQL` schema.

#![allow(clippy::unwrap_used)] // Lock poisoning is a test failure anyway
#![allow(clippy::missing_panics_doc)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rentcar_core::environment::{Clock, SystemClock};
use rentcar_core::pagination::{Page, PageRequest};
use rentcar_core::repository::{
    conflicts, CarFilter, CarRepository, CategoryRepository, DatabaseHealth, DriverRepository,
    MaintenanceRepository, RentalChange, RepositoryError, Result, TransactionFilter,
    TransactionRepository, TransactionWrite, UserRepository,
};
use rentcar_core::types::{
    BrandTypes, Car, CarCategory, CarData, CarId, CarMaintenance, CarView, CategoryId, Driver,
    DriverData, DriverId, MaintenanceId, MaintenanceView, NewCar, NewCategory, NewDriver,
    NewMaintenance, NewUser, Transaction, TransactionId, TransactionView, User, UserId,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, RwLock};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    categories: BTreeMap<CategoryId, CarCategory>,
    cars: BTreeMap<CarId, Car>,
    drivers: BTreeMap<DriverId, Driver>,
    maintenances: BTreeMap<MaintenanceId, CarMaintenance>,
    transactions: BTreeMap<TransactionId, Transaction>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn car_view(&self, car: &Car) -> Result<CarView> {
        let category = self
            .categories
            .get(&car.category_id)
            .ok_or_else(|| RepositoryError::Database("car without category".to_string()))?;
        Ok(CarView {
            car: car.clone(),
            car_brand: category.car_brand.clone(),
            car_type: category.car_type.clone(),
        })
    }

    fn maintenance_view(&self, record: &CarMaintenance) -> Result<MaintenanceView> {
        let car = self
            .cars
            .get(&record.car_id)
            .ok_or_else(|| RepositoryError::Database("maintenance without car".to_string()))?;
        Ok(MaintenanceView {
            maintenance: record.clone(),
            car_name: car.name.clone(),
        })
    }

    fn transaction_view(&self, tx: &Transaction) -> Result<TransactionView> {
        let missing = |what: &str| RepositoryError::Database(format!("transaction without {what}"));
        let user = self.users.get(&tx.user_id).ok_or_else(|| missing("user"))?;
        let car = self.cars.get(&tx.car_id).ok_or_else(|| missing("car"))?;
        let view = self.car_view(car)?;
        let driver_data = match tx.driver_id {
            Some(id) => {
                let driver = self.drivers.get(&id).ok_or_else(|| missing("driver"))?;
                Some(DriverData {
                    driver_name: driver.name.clone(),
                    driver_phone_number: driver.phone_number.clone(),
                })
            },
            None => None,
        };

        Ok(TransactionView {
            customer_name: user.name.clone(),
            rent_duration: tx.rent_duration(),
            car_data: CarData {
                car_brand: view.car_brand,
                car_name: car.name.clone(),
                car_price: car.price,
                car_type: view.car_type,
                car_image: car.image.clone(),
                car_slug: car.slug.clone(),
            },
            driver_data,
            transaction: tx.clone(),
        })
    }

    fn check_user_unique(&self, email: &str, phone: &str, except: Option<UserId>) -> Result<()> {
        for user in self.users.values().filter(|u| Some(u.id) != except) {
            if user.email == email {
                return Err(RepositoryError::Conflict(conflicts::EMAIL_TAKEN.to_string()));
            }
            if user.phone_number == phone {
                return Err(RepositoryError::Conflict(conflicts::PHONE_TAKEN.to_string()));
            }
        }
        Ok(())
    }

    fn check_category_unique(&self, brand: &str, car_type: &str, except: Option<CategoryId>) -> Result<()> {
        if self
            .categories
            .values()
            .any(|c| Some(c.id) != except && c.car_brand == brand && c.car_type == car_type)
        {
            return Err(RepositoryError::Conflict(conflicts::CATEGORY_EXISTS.to_string()));
        }
        Ok(())
    }

    fn check_car_unique(&self, slug: &str, plate: &str, registration: i64, except: Option<CarId>) -> Result<()> {
        for car in self.cars.values().filter(|c| Some(c.id) != except) {
            if car.slug == slug {
                return Err(RepositoryError::Conflict(conflicts::SLUG_TAKEN.to_string()));
            }
            if car.plate_number == plate {
                return Err(RepositoryError::Conflict(conflicts::PLATE_TAKEN.to_string()));
            }
            if car.registration_number == registration {
                return Err(RepositoryError::Conflict(conflicts::REGISTRATION_TAKEN.to_string()));
            }
        }
        Ok(())
    }

    fn check_category_exists(&self, id: CategoryId) -> Result<()> {
        if self.categories.contains_key(&id) {
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn check_driver_unique(&self, phone: &str, license: &str, except: Option<DriverId>) -> Result<()> {
        for driver in self.drivers.values().filter(|d| Some(d.id) != except) {
            if driver.phone_number == phone {
                return Err(RepositoryError::Conflict(conflicts::DRIVER_PHONE_TAKEN.to_string()));
            }
            if driver.license_number == license {
                return Err(RepositoryError::Conflict(conflicts::LICENSE_TAKEN.to_string()));
            }
        }
        Ok(())
    }

    fn check_maintenance_unique(&self, record: &NewMaintenance, except: Option<MaintenanceId>) -> Result<()> {
        if self.maintenances.values().any(|m| {
            Some(m.id) != except
                && m.car_id == record.car_id
                && m.maintenance_date == record.maintenance_date
                && m.description == record.description
        }) {
            return Err(RepositoryError::Conflict(conflicts::MAINTENANCE_EXISTS.to_string()));
        }
        Ok(())
    }
}

/// Every repository trait over in-process tables.
///
/// Cloning shares the tables.
#[derive(Clone)]
pub struct InMemoryDatabase {
    tables: Arc<RwLock<Tables>>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for InMemoryDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tables = self.tables.read().unwrap();
        f.debug_struct("InMemoryDatabase")
            .field("users", &tables.users.len())
            .field("cars", &tables.cars.len())
            .field("transactions", &tables.transactions.len())
            .finish_non_exhaustive()
    }
}

impl Default for InMemoryDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryDatabase {
    /// Empty database stamped with the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }

    /// Empty database stamped with `clock`.
    #[must_use]
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self {
            tables: Arc::new(RwLock::new(Tables::default())),
            clock: Arc::new(clock),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Number of stored transactions.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.tables.read().unwrap().transactions.len()
    }

    /// Current row for a car.
    #[must_use]
    pub fn car(&self, id: CarId) -> Option<Car> {
        self.tables.read().unwrap().cars.get(&id).cloned()
    }

    /// Current row for a driver.
    #[must_use]
    pub fn driver(&self, id: DriverId) -> Option<Driver> {
        self.tables.read().unwrap().drivers.get(&id).cloned()
    }

    /// Current row for a transaction.
    #[must_use]
    pub fn transaction(&self, id: TransactionId) -> Option<Transaction> {
        self.tables.read().unwrap().transactions.get(&id).cloned()
    }
}

fn newest_first<T, K: Ord>(items: &mut [T], key: impl Fn(&T) -> K) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl UserRepository for InMemoryDatabase {
    async fn create(&self, user: NewUser) -> Result<User> {
        let now = self.now();
        let mut tables = self.tables.write().unwrap();
        tables.check_user_unique(&user.email, &user.phone_number, None)?;

        let id = UserId::new(tables.next_id());
        let user = User {
            id,
            role: user.role,
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            address: user.address,
            phone_number: user.phone_number,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.read().unwrap().users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().unwrap();
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn update(&self, user: &User) -> Result<User> {
        let now = self.now();
        let mut tables = self.tables.write().unwrap();
        if !tables.users.contains_key(&user.id) {
            return Err(RepositoryError::NotFound);
        }
        tables.check_user_unique(&user.email, &user.phone_number, Some(user.id))?;

        let mut updated = user.clone();
        updated.updated_at = now;
        tables.users.insert(user.id, updated.clone());
        Ok(updated)
    }

    async fn list(&self, page: PageRequest) -> Result<Page<User>> {
        let mut users: Vec<User> = self.tables.read().unwrap().users.values().cloned().collect();
        newest_first(&mut users, |u| (u.created_at, u.id));
        Ok(page.slice(&users))
    }
}

#[async_trait]
impl CategoryRepository for InMemoryDatabase {
    async fn create(&self, category: NewCategory) -> Result<CarCategory> {
        let now = self.now();
        let mut tables = self.tables.write().unwrap();
        tables.check_category_unique(&category.car_brand, &category.car_type, None)?;

        let id = CategoryId::new(tables.next_id());
        let category = CarCategory {
            id,
            car_brand: category.car_brand,
            car_type: category.car_type,
            created_at: now,
            updated_at: now,
        };
        tables.categories.insert(id, category.clone());
        Ok(category)
    }

    async fn find(&self, id: CategoryId) -> Result<Option<CarCategory>> {
        Ok(self.tables.read().unwrap().categories.get(&id).cloned())
    }

    async fn find_by_brand_type(&self, brand: &str, car_type: &str) -> Result<Option<CarCategory>> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .categories
            .values()
            .find(|c| c.car_brand == brand && c.car_type == car_type)
            .cloned())
    }

    async fn update(&self, category: &CarCategory) -> Result<CarCategory> {
        let now = self.now();
        let mut tables = self.tables.write().unwrap();
        if !tables.categories.contains_key(&category.id) {
            return Err(RepositoryError::NotFound);
        }
        tables.check_category_unique(&category.car_brand, &category.car_type, Some(category.id))?;

        let mut updated = category.clone();
        updated.updated_at = now;
        tables.categories.insert(category.id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: CategoryId) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        if !tables.categories.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if tables.cars.values().any(|c| c.category_id == id) {
            return Err(RepositoryError::Conflict(conflicts::CATEGORY_IN_USE.to_string()));
        }
        tables.categories.remove(&id);
        Ok(())
    }

    async fn list(&self, page: PageRequest) -> Result<Page<CarCategory>> {
        let categories: Vec<CarCategory> =
            self.tables.read().unwrap().categories.values().cloned().collect();
        Ok(page.slice(&categories))
    }

    async fn brands(&self) -> Result<Vec<BrandTypes>> {
        let tables = self.tables.read().unwrap();
        let mut grouped: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for category in tables.categories.values() {
            grouped
                .entry(category.car_brand.as_str())
                .or_default()
                .insert(category.car_type.as_str());
        }
        Ok(grouped
            .into_iter()
            .map(|(brand, types)| BrandTypes {
                car_brand: brand.to_string(),
                types: types.into_iter().map(str::to_string).collect(),
            })
            .collect())
    }
}

#[async_trait]
impl CarRepository for InMemoryDatabase {
    async fn create(&self, car: NewCar) -> Result<CarView> {
        let now = self.now();
        let mut tables = self.tables.write().unwrap();
        tables.check_category_exists(car.category_id)?;
        tables.check_car_unique(&car.slug, &car.plate_number, car.registration_number, None)?;

        let id = CarId::new(tables.next_id());
        let car = Car {
            id,
            category_id: car.category_id,
            slug: car.slug,
            name: car.name,
            transmission: car.transmission,
            fuel: car.fuel,
            color: car.color,
            plate_number: car.plate_number,
            capacity: car.capacity,
            registration_number: car.registration_number,
            price: car.price,
            image: car.image,
            status: car.status,
            created_at: now,
            updated_at: now,
        };
        tables.cars.insert(id, car.clone());
        tables.car_view(&car)
    }

    async fn find(&self, id: CarId) -> Result<Option<CarView>> {
        let tables = self.tables.read().unwrap();
        tables.cars.get(&id).map(|c| tables.car_view(c)).transpose()
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<CarView>> {
        let tables = self.tables.read().unwrap();
        tables
            .cars
            .values()
            .find(|c| c.slug == slug)
            .map(|c| tables.car_view(c))
            .transpose()
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<CarView>> {
        let tables = self.tables.read().unwrap();
        tables
            .cars
            .values()
            .find(|c| c.name == name)
            .map(|c| tables.car_view(c))
            .transpose()
    }

    async fn list(&self, filter: &CarFilter, page: PageRequest) -> Result<Page<CarView>> {
        let tables = self.tables.read().unwrap();
        let mut cars = tables
            .cars
            .values()
            .map(|c| tables.car_view(c))
            .collect::<Result<Vec<_>>>()?;
        cars.retain(|v| {
            filter.car_brand.as_ref().is_none_or(|b| &v.car_brand == b)
                && filter.car_type.as_ref().is_none_or(|t| &v.car_type == t)
                && filter.status.is_none_or(|s| v.car.status == s)
        });
        newest_first(&mut cars, |v| (v.car.created_at, v.car.id));
        Ok(page.slice(&cars))
    }

    async fn update(&self, car: &Car) -> Result<CarView> {
        let now = self.now();
        let mut tables = self.tables.write().unwrap();
        if !tables.cars.contains_key(&car.id) {
            return Err(RepositoryError::NotFound);
        }
        tables.check_category_exists(car.category_id)?;
        tables.check_car_unique(&car.slug, &car.plate_number, car.registration_number, Some(car.id))?;

        let mut updated = car.clone();
        updated.updated_at = now;
        tables.cars.insert(car.id, updated.clone());
        tables.car_view(&updated)
    }

    async fn delete(&self, id: CarId) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        if !tables.cars.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if tables.transactions.values().any(|t| t.car_id == id) {
            return Err(RepositoryError::Conflict(conflicts::CAR_IN_USE.to_string()));
        }
        tables.maintenances.retain(|_, m| m.car_id != id);
        tables.cars.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl DriverRepository for InMemoryDatabase {
    async fn create(&self, driver: NewDriver) -> Result<Driver> {
        let now = self.now();
        let mut tables = self.tables.write().unwrap();
        tables.check_driver_unique(&driver.phone_number, &driver.license_number, None)?;

        let id = DriverId::new(tables.next_id());
        let driver = Driver {
            id,
            name: driver.name,
            gender: driver.gender,
            dob: driver.dob,
            address: driver.address,
            phone_number: driver.phone_number,
            license_number: driver.license_number,
            status: driver.status,
            created_at: now,
            updated_at: now,
        };
        tables.drivers.insert(id, driver.clone());
        Ok(driver)
    }

    async fn find(&self, id: DriverId) -> Result<Option<Driver>> {
        Ok(self.tables.read().unwrap().drivers.get(&id).cloned())
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Driver>> {
        let tables = self.tables.read().unwrap();
        Ok(tables.drivers.values().find(|d| d.name == name).cloned())
    }

    async fn list(&self, page: PageRequest) -> Result<Page<Driver>> {
        let drivers: Vec<Driver> = self.tables.read().unwrap().drivers.values().cloned().collect();
        Ok(page.slice(&drivers))
    }

    async fn list_available(&self) -> Result<Vec<Driver>> {
        let tables = self.tables.read().unwrap();
        Ok(tables
            .drivers
            .values()
            .filter(|d| d.status == rentcar_core::types::DriverStatus::Available)
            .cloned()
            .collect())
    }

    async fn update(&self, driver: &Driver) -> Result<Driver> {
        let now = self.now();
        let mut tables = self.tables.write().unwrap();
        if !tables.drivers.contains_key(&driver.id) {
            return Err(RepositoryError::NotFound);
        }
        tables.check_driver_unique(&driver.phone_number, &driver.license_number, Some(driver.id))?;

        let mut updated = driver.clone();
        updated.updated_at = now;
        tables.drivers.insert(driver.id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: DriverId) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        if !tables.drivers.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if tables.transactions.values().any(|t| t.driver_id == Some(id)) {
            return Err(RepositoryError::Conflict(conflicts::DRIVER_IN_USE.to_string()));
        }
        tables.drivers.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl MaintenanceRepository for InMemoryDatabase {
    async fn create(&self, record: NewMaintenance) -> Result<MaintenanceView> {
        let now = self.now();
        let mut tables = self.tables.write().unwrap();
        if !tables.cars.contains_key(&record.car_id) {
            return Err(RepositoryError::NotFound);
        }
        tables.check_maintenance_unique(&record, None)?;

        let id = MaintenanceId::new(tables.next_id());
        let record = CarMaintenance {
            id,
            car_id: record.car_id,
            maintenance_date: record.maintenance_date,
            description: record.description,
            cost: record.cost,
            created_at: now,
            updated_at: now,
        };
        tables.maintenances.insert(id, record.clone());
        tables.maintenance_view(&record)
    }

    async fn find(&self, id: MaintenanceId) -> Result<Option<MaintenanceView>> {
        let tables = self.tables.read().unwrap();
        tables
            .maintenances
            .get(&id)
            .map(|m| tables.maintenance_view(m))
            .transpose()
    }

    async fn list(&self, page: PageRequest) -> Result<Page<MaintenanceView>> {
        let tables = self.tables.read().unwrap();
        let mut records = tables
            .maintenances
            .values()
            .map(|m| tables.maintenance_view(m))
            .collect::<Result<Vec<_>>>()?;
        newest_first(&mut records, |v| (v.maintenance.maintenance_date, v.maintenance.id));
        Ok(page.slice(&records))
    }

    async fn update(&self, record: &CarMaintenance) -> Result<MaintenanceView> {
        let now = self.now();
        let mut tables = self.tables.write().unwrap();
        if !tables.maintenances.contains_key(&record.id) {
            return Err(RepositoryError::NotFound);
        }
        if !tables.cars.contains_key(&record.car_id) {
            return Err(RepositoryError::NotFound);
        }
        let key = NewMaintenance {
            car_id: record.car_id,
            maintenance_date: record.maintenance_date,
            description: record.description.clone(),
            cost: record.cost,
        };
        tables.check_maintenance_unique(&key, Some(record.id))?;

        let mut updated = record.clone();
        updated.updated_at = now;
        tables.maintenances.insert(record.id, updated.clone());
        tables.maintenance_view(&updated)
    }

    async fn delete(&self, id: MaintenanceId) -> Result<()> {
        let mut tables = self.tables.write().unwrap();
        tables
            .maintenances
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl TransactionRepository for InMemoryDatabase {
    async fn commit(&self, change: RentalChange) -> Result<Transaction> {
        let now = self.now();
        let mut tables = self.tables.write().unwrap();

        // Check every guard before touching anything.
        if let Some(t) = &change.car {
            match tables.cars.get(&t.id) {
                Some(car) if car.status == t.from => {},
                Some(_) => {
                    return Err(RepositoryError::Conflict(conflicts::CAR_STATUS_CHANGED.to_string()));
                },
                None => return Err(RepositoryError::NotFound),
            }
        }
        if let Some(t) = &change.driver {
            match tables.drivers.get(&t.id) {
                Some(driver) if driver.status == t.from => {},
                Some(_) => {
                    return Err(RepositoryError::Conflict(conflicts::DRIVER_STATUS_CHANGED.to_string()));
                },
                None => return Err(RepositoryError::NotFound),
            }
        }
        match &change.transaction {
            TransactionWrite::Insert(new) => {
                if tables.transactions.values().any(|t| t.invoice == new.invoice) {
                    return Err(RepositoryError::Conflict(conflicts::INVOICE_TAKEN.to_string()));
                }
                if !tables.users.contains_key(&new.user_id) || !tables.cars.contains_key(&new.car_id) {
                    return Err(RepositoryError::NotFound);
                }
            },
            TransactionWrite::Update {
                record,
                expected_rental,
                expected_payment,
            } => match tables.transactions.get(&record.id) {
                Some(current)
                    if current.rental_status == *expected_rental
                        && current.payment_status == *expected_payment => {},
                Some(_) => {
                    return Err(RepositoryError::Conflict(
                        conflicts::TRANSACTION_STATUS_CHANGED.to_string(),
                    ));
                },
                None => return Err(RepositoryError::NotFound),
            },
        }

        if let Some(t) = change.car {
            if let Some(car) = tables.cars.get_mut(&t.id) {
                car.status = t.to;
                car.updated_at = now;
            }
        }
        if let Some(t) = change.driver {
            if let Some(driver) = tables.drivers.get_mut(&t.id) {
                driver.status = t.to;
                driver.updated_at = now;
            }
        }

        let stored = match change.transaction {
            TransactionWrite::Insert(new) => Transaction {
                id: TransactionId::new(tables.next_id()),
                user_id: new.user_id,
                car_id: new.car_id,
                driver_id: new.driver_id,
                invoice: new.invoice,
                start_date: new.start_date,
                end_date: new.end_date,
                return_date: None,
                rental_status: rentcar_core::types::RentalStatus::Pending,
                payment_status: rentcar_core::types::PaymentStatus::Pending,
                payment_proof: None,
                late_fee: None,
                total_cost: new.total_cost,
                created_at: now,
                updated_at: now,
            },
            TransactionWrite::Update { mut record, .. } => {
                record.updated_at = now;
                record
            },
        };
        tables.transactions.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find(&self, id: TransactionId) -> Result<Option<TransactionView>> {
        let tables = self.tables.read().unwrap();
        tables
            .transactions
            .get(&id)
            .map(|t| tables.transaction_view(t))
            .transpose()
    }

    async fn list(&self, filter: &TransactionFilter, page: PageRequest) -> Result<Page<TransactionView>> {
        let tables = self.tables.read().unwrap();
        let mut views = tables
            .transactions
            .values()
            .filter(|t| {
                filter.user_id.is_none_or(|u| t.user_id == u)
                    && filter.rental_status.is_none_or(|s| t.rental_status == s)
                    && filter.payment_status.is_none_or(|s| t.payment_status == s)
            })
            .map(|t| tables.transaction_view(t))
            .collect::<Result<Vec<_>>>()?;
        newest_first(&mut views, |v| (v.transaction.created_at, v.transaction.id));
        Ok(page.slice(&views))
    }

    async fn in_range(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Vec<TransactionView>> {
        let tables = self.tables.read().unwrap();
        let mut views = tables
            .transactions
            .values()
            .filter(|t| t.created_at >= from && t.created_at < to)
            .map(|t| tables.transaction_view(t))
            .collect::<Result<Vec<_>>>()?;
        views.sort_by_key(|v| (v.transaction.created_at, v.transaction.id));
        Ok(views)
    }
}

#[async_trait]
impl DatabaseHealth for InMemoryDatabase {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
