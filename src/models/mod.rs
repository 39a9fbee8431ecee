pub mod session;
pub mod stats;
pub mod trip;
pub mod user;
