//! External collaborators of a render pass.
//!
//! The renderer never talks to the design tool directly. Font loading,
//! raster export, button confirmation and user notices all go through the
//! [`Host`] trait. Calls are blocking and made strictly in document order.

mod local;

pub use local::{CtaPolicy, LocalHost};

use std::collections::HashSet;
use std::path::PathBuf;

use thiserror::Error;

use crate::design::{DesignNode, FontName};

/// Raster format requested from the exporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Png,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportSettings {
    pub format: ExportFormat,
    /// Resolution multiplier relative to the node's size.
    pub scale: f64,
}

impl ExportSettings {
    /// PNG oversampled for high-density displays.
    pub const RETINA_PNG: Self = Self {
        format: ExportFormat::Png,
        scale: 2.0,
    };
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("'{node}' has no image source to export")]
    NoSource { node: String },

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("Failed to encode export: {0}")]
    Encode(#[source] image::ImageError),

    #[error("Image export is not available")]
    Unsupported,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FontError {
    #[error("Font family '{family}' is not installed")]
    NotInstalled { family: String },
}

/// A container that looks like a call-to-action button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CtaCandidate {
    pub id: String,
    pub name: String,
    pub label: String,
}

/// The design tool side of a render pass.
pub trait Host {
    /// Make `font` ready before text styles are read.
    fn load_font(&mut self, font: &FontName) -> Result<(), FontError> {
        let _ = font;
        Ok(())
    }

    /// Rasterize `node` and return the encoded bytes.
    fn export_image(
        &mut self,
        node: &DesignNode,
        settings: ExportSettings,
    ) -> Result<Vec<u8>, ExportError>;

    /// Ask the user which candidates really are buttons; returns their ids.
    fn confirm_cta(&mut self, candidates: &[CtaCandidate]) -> HashSet<String>;

    /// Show a notice to the user.
    fn notify(&mut self, message: &str) {
        tracing::info!("{message}");
    }
}

/// A host without export or confirmation support.
///
/// Suitable for placeholder renders: exports fail and no candidate is ever
/// confirmed as a button.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl Host for NullHost {
    fn export_image(
        &mut self,
        _node: &DesignNode,
        _settings: ExportSettings,
    ) -> Result<Vec<u8>, ExportError> {
        Err(ExportError::Unsupported)
    }

    fn confirm_cta(&mut self, _candidates: &[CtaCandidate]) -> HashSet<String> {
        HashSet::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::Geometry;

    #[test]
    fn test_null_host_refuses_exports() {
        let mut host = NullHost;
        let node = DesignNode::rectangle("r", Geometry::default());
        let err = host.export_image(&node, ExportSettings::RETINA_PNG).unwrap_err();
        assert!(matches!(err, ExportError::Unsupported));
    }

    #[test]
    fn test_null_host_confirms_nothing_and_loads_fonts() {
        let mut host = NullHost;
        let candidate = CtaCandidate {
            id: "1".into(),
            name: "Button".into(),
            label: "Go".into(),
        };
        assert!(host.confirm_cta(&[candidate]).is_empty());
        assert!(host.load_font(&FontName::new("Inter", "Bold")).is_ok());
    }

    #[test]
    fn test_retina_settings_double_resolution() {
        assert_eq!(ExportSettings::RETINA_PNG.scale, 2.0);
        assert_eq!(ExportSettings::RETINA_PNG.format, ExportFormat::Png);
    }
}
