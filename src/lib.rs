//! Dispatch tracking for fuel tanker trips ("viajes"): trip lifecycle,
//! filtered and paged listings, and fleet statistics behind bearer-token
//! authentication.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
