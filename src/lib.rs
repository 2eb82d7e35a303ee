pub mod core;
pub mod gateway;
pub mod handlers;
pub mod metrics;
pub mod models;
pub mod monitor;
pub mod notifier;
pub mod providers;
pub mod search;
pub mod stores;
pub mod utils;
pub mod validation;
pub mod wal;

#[cfg(test)]
mod test_support;
