//! Adapters - concrete storage implementations

pub mod duckdb;
