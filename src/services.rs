pub mod auth;
pub mod availability;
pub mod catalog_service;
pub mod policy;
pub mod pricing;
pub mod reservation_service;
