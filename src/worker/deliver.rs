use std::sync::Arc;

use tracing::{info, warn};

use crate::core::document::Document;
use crate::core::models::{Published, ThreadRef};
use crate::core::ports::{FallbackPublisher, PrimaryPublisher};
use crate::errors::PublishError;

/// Publishes an assembled document, preferring a canvas over a file upload.
///
/// The file fallback is taken only when the primary publisher reports
/// [`PublishError::FeatureUnavailable`]. Permission and transport failures propagate
/// unchanged.
#[derive(Clone)]
pub struct DocumentAssembler {
    primary: Arc<dyn PrimaryPublisher>,
    fallback: Arc<dyn FallbackPublisher>,
}

impl DocumentAssembler {
    #[must_use]
    pub fn new(primary: Arc<dyn PrimaryPublisher>, fallback: Arc<dyn FallbackPublisher>) -> Self {
        Self { primary, fallback }
    }

    /// # Errors
    ///
    /// Returns the primary publisher's error unless it is `FeatureUnavailable`, or the
    /// fallback upload's error when the fallback path was taken.
    pub async fn publish(
        &self,
        document: &Document,
        thread: &ThreadRef,
        requested_by: &str,
    ) -> Result<Published, PublishError> {
        match self.primary.publish(document, thread, requested_by).await {
            Ok(doc) => {
                info!(thread = %thread, canvas_id = %doc.canvas_id, "Canvas published");
                Ok(Published::Canvas(doc))
            }
            Err(PublishError::FeatureUnavailable(reason)) => {
                warn!(
                    thread = %thread,
                    reason = %reason,
                    "Canvas unavailable, falling back to file upload"
                );
                let file = self
                    .fallback
                    .upload_file(
                        &document.render_file(),
                        &document.file_name(),
                        &document.title,
                        thread,
                    )
                    .await?;
                info!(thread = %thread, file_id = %file.file_id, "Fallback file uploaded");
                Ok(Published::File(file))
            }
            Err(other) => Err(other),
        }
    }
}
