//! All Slack-specific functionality

pub mod client;
pub mod response_builder;

pub use client::{SlackClient, WorkspaceInfo};
