pub mod beacon;
pub mod config;
pub mod dimension;
pub mod error;
pub mod stats;
pub mod store;
