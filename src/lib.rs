// ABOUTME: Main library entry point for the Parley chat backend
// ABOUTME: Direct and group messaging with denormalized conversation projections
//
// SPDX-License-Identifier: MIT OR Apache-2.0

#![deny(unsafe_code)]

//! # Parley Chat Server
//!
//! A multi-tenant chat backend with direct and group messaging. Every send
//! maintains denormalized conversation summary rows (last message preview,
//! timestamp, unread counter) in the same transaction as the message insert,
//! so a conversation list is always a single indexed read.
//!
//! ## Features
//!
//! - **Direct messages**: per-ordered-pair conversation projections with
//!   unread counters maintained on the receiver's side only
//! - **Group messages**: per-member projection fan-out; the sender's own
//!   unread count is never incremented
//! - **Image messages**: single and multi-image sends via an external blob
//!   store, uploaded before any database write
//! - **Replies**: messages can reference earlier messages; threads carry the
//!   reply context even after the original is deleted
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parley_server::config::ServerConfig;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("configured: {}", config.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **routes**: axum handlers grouped by resource area
//! - **database**: manager types owning the SQL for each area
//! - **storage**: blob store client for image uploads
//! - **models**: shared record types crossing the database/API boundary

pub mod config;
pub mod database;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod models;
pub mod routes;
pub mod server;
pub mod storage;
