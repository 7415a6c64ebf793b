//! Inbound surface: payload normalization and event handling.

pub mod handler;
pub mod normalize;
pub mod parsing;

pub use handler::{ActionPayload, App, EventOutcome};
pub use normalize::EventNormalizer;
