//! End-to-end test harness for hubmesh.
//!
//! Spins up several cluster lifetime managers over one shared in-memory
//! backplane, attaching collector-backed connections so tests can assert
//! on the exact frames each physical connection received.

pub mod framework;
