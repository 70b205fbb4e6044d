//! HTTP API handlers for edash-api

pub mod dashboard;
pub mod dictionary;
pub mod employees;
pub mod health;
pub mod identity;
pub mod upload;

pub use dashboard::dashboard_routes;
pub use dictionary::dictionary_routes;
pub use employees::employee_routes;
pub use health::health_routes;
pub use identity::identity_middleware;
pub use upload::upload_routes;
