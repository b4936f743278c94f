//! Request-shaping policy for the listings chat assistant.
//!
//! The crate classifies free-text questions into cost tiers, narrows the
//! listing catalog to the properties a question refers to, and wires both into
//! a token-metered chat service exposed over axum.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
