//! Core types, config, errors, and the call-state store for Ringback.

pub mod call_state;
pub mod config;
pub mod error;
