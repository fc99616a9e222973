pub mod event;
pub mod health;
pub mod sites;
pub mod stats;
