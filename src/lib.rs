//! Client-side core for an AI-assisted image studio: image validation,
//! compression, and upload; prompt tag parsing against a shared catalog;
//! and queue-backed image generation with typed progress reporting.

pub mod config;
pub mod error;
pub mod generation;
pub mod models;
pub mod prompt;
pub mod services;
pub mod session;
pub mod settings;
pub mod storage;
pub mod store;

pub use error::{AppError, Result};
