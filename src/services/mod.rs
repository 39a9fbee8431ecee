pub mod query;
pub mod seed;
pub mod store;
pub mod trips;
pub mod validation;
