//! HTTP surface.
//!
//! # Data Flow
//! ```text
//! GET /health
//!     → server.rs health_handler
//!     → HealthReporter (read-only)
//!
//! /admin/*
//!     → admin auth middleware (bearer key)
//!     → admin handlers (state, unlock, tick)
//! ```

pub mod server;

pub use server::{build_router, AppState, HttpServer};
