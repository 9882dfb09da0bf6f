//! Adapters - concrete implementations of the storage ports

pub mod api;
#[cfg(test)]
pub mod api_mock;
pub mod duckdb;
pub mod memory;
