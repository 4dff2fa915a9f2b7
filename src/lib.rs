//! Finance Agent: asynchronous task execution with polling.

pub mod api;
pub mod config;
pub mod error;
pub mod price;
pub mod worker;
