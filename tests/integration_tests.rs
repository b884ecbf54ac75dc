//! Integration tests for Parley.
//!
//! Session tests run entirely over the in-memory mocks. Live-database
//! tests require a running MySQL database; set DATABASE_URL to run them.
//!
//! Run with: `cargo test --test integration_tests`

mod integration;
