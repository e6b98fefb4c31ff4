pub mod api;
pub mod bootstrap;
pub mod config;
pub mod loader;
pub mod model;
pub mod projector;
pub mod query;
pub mod store;
