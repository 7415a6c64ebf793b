//! Core domain: models, trigger classification, confirmation gate, document assembly.

pub mod classifier;
pub mod config;
pub mod confirmation;
pub mod document;
pub mod models;
pub mod ports;
