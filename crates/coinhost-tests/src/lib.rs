//! Integration test suite for coinhost.
//!
//! Exercises the supervisor and the transfer pipeline together against
//! in-memory fakes of the wallet engine and node processes.

pub mod helpers;
