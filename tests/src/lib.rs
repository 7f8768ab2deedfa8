//! Integration tests exercising lease lifecycle and cycle-boundary
//! scenarios against a live Postgres instance, reached through
//! `#[sqlx::test]` so every test runs against its own ephemeral database.
//! Requires `DATABASE_URL` to point at a reachable Postgres server; unit
//! suites for pure logic (schema, signature, aggregator math, rate limit
//! windows) live alongside their modules instead.

pub mod support;

mod admission_flow;
mod aggregation_flow;
mod cycle_boundary;
mod lease_lifecycle;
