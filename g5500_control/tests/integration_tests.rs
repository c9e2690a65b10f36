//! Integration tests for the rotator motion core.
//!
//! These exercise the controller, surface and shared state together
//! against the simulation driver, driving `Controller::tick` directly so
//! every scenario is deterministic.

mod integration;
