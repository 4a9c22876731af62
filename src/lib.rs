//! # jobmarket
//!
//! In-process engine for a job marketplace: job postings and their
//! lifecycle, competing proposals with atomic acceptance, discovery
//! queries and per-participant stats.
//!
//! Collaborators (UI, messaging, analytics) call [`engine::Engine`] and
//! subscribe to its [`event`] stream.

pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod model;
pub mod query;
pub mod stats;
pub mod storage;
pub mod telemetry;

pub use engine::{Engine, EngineConfig};
pub use error::{Error, ErrorKind, Result};
