//! # RentCar Server
//!
//! HTTP back-end of a car rental business: the public catalogue, fleet
//! administration and the rental lifecycle from booking to return.
//!
//! ## Layout
//!
//! - [`config`]: environment configuration
//! - [`server`]: shared state, router and health endpoints
//! - [`auth`]: accounts, tokens and the `AuthUser`/`RequireAdmin` extractors
//! - [`api`]: resource handlers
//! - [`rental`]: the rental lifecycle reducer
//! - [`images`]: uploaded image storage
//! - [`report`]: CSV transaction reports

#![forbid(unsafe_code)]
#![warn(missing_docs, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod api;
pub mod auth;
pub mod config;
pub mod images;
pub mod rental;
pub mod report;
pub mod server;

pub use config::Config;
pub use server::{build_router, AppState, Repositories};
