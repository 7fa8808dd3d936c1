// ABOUTME: Helper module re-exports for integration tests
// ABOUTME: Houses the axum request/response test utilities

pub mod axum_test;
