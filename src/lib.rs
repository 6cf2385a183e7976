//! TestHub webhook server library.
//!
//! Authenticates CI webhook deliveries, correlates them to dispatched test
//! runs, and reconciles run status and step results into the run store.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod migration;
pub mod models;
pub mod services;
