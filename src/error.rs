//! Error taxonomy for the overlay tick.
//!
//! Every variant except `SinkCreation` is contained within a single tick:
//! the loop logs it and carries on. `SinkCreation` only occurs at startup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OverlayError {
    /// A pose needed this tick was not valid.
    #[error("tracking unavailable: {0}")]
    TrackingUnavailable(String),

    /// A panel is anchored to a device that is not tracked this tick.
    #[error("panel '{0}' has no valid world transform")]
    PanelUnresolvable(String),

    /// The drawing collaborator failed to produce pixels for a panel.
    #[error("rasterization failed for panel '{panel}': {reason}")]
    RasterizationFailed { panel: String, reason: String },

    /// The texture/transform sink rejected an update.
    #[error("sink rejected update for panel '{panel}': {reason}")]
    SinkUnavailable { panel: String, reason: String },

    /// The sink could not be created at all. Fatal.
    #[error("texture sink could not be created: {0}")]
    SinkCreation(String),
}

impl OverlayError {
    pub fn raster(panel: &str, reason: impl Into<String>) -> Self {
        Self::RasterizationFailed {
            panel: panel.to_string(),
            reason: reason.into(),
        }
    }

    pub fn sink(panel: &str, reason: impl Into<String>) -> Self {
        Self::SinkUnavailable {
            panel: panel.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error must surface to the caller instead of being
    /// absorbed by the tick.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SinkCreation(_))
    }
}

pub type Result<T> = std::result::Result<T, OverlayError>;
