//! Generation pipeline: run registry, coordinator, summarizer, and publishing.

pub mod coordinator;
pub mod deliver;
pub mod registry;
pub mod summarize;

pub use coordinator::{GenerationCoordinator, RunHandle, RunOutcome};
pub use registry::{RunGuard, RunRegistry};

use crate::core::models::Published;
use crate::errors::RunError;

/// Posted in the thread as soon as a run is accepted.
pub const PROCESSING_MESSAGE: &str = "🔄 Creating a canvas from this thread. This may take a moment…";

/// Posted when a trigger arrives for a thread that already has a run in flight.
pub const ALREADY_IN_FLIGHT_MESSAGE: &str =
    "A canvas is already being created for this thread. I'll post here when it's ready.";

#[must_use]
pub fn success_message(requested_by: &str, published: &Published) -> String {
    match published {
        Published::Canvas(doc) => match &doc.url {
            Some(url) => format!("<@{requested_by}> ✅ Created a canvas from this thread!\n\n{url}"),
            None => format!(
                "<@{requested_by}> ✅ Created a canvas from this thread!\n\nCanvas ID: `{}`. Search for it in Slack to open it.",
                doc.canvas_id
            ),
        },
        Published::File(file) => {
            let link = file
                .permalink
                .as_deref()
                .map(|p| format!("\n\n{p}"))
                .unwrap_or_default();
            format!(
                "<@{requested_by}> ✅ Canvases aren't available here, so I uploaded the summary as a Markdown file instead.{link}"
            )
        }
    }
}

#[must_use]
pub fn failure_message(requested_by: &str, error: &RunError) -> String {
    format!("<@{requested_by}> ❌ {}", error.user_message())
}
