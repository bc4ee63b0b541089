//! Integration test entry point.
//!
//! All test modules are compiled into a single binary to share the `common`
//! helpers and keep link time down. The tests need a running PostgreSQL
//! instance (see `TEST_DATABASE_URL` in `common`), so they are `#[ignore]`d
//! by default; run them with `cargo test -- --ignored` against a provisioned
//! test database.

mod common;
mod learning_tests;
