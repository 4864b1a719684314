pub mod aggregate;
pub mod engine;
pub mod error;
pub mod gateway;
pub mod models;
pub mod store;
