//! Persistence for the service: reconciliation writes, dashboard reads and
//! the CRUD surfaces

pub mod dashboard;
pub mod dictionary;
pub mod employees;
pub mod snapshots;
pub mod users;
pub mod work;
