//! Filesystem-backed host used by the command line tool.

use std::collections::HashSet;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use image::imageops::FilterType;

use super::{CtaCandidate, ExportError, ExportFormat, ExportSettings, FontError, Host};
use crate::design::{DesignNode, FontName};

/// Which button candidates the CLI confirms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CtaPolicy {
    #[default]
    None,
    All,
    Ids(HashSet<String>),
}

/// Resolves image fills against the design file's directory and checks fonts
/// against the system font database.
pub struct LocalHost {
    base_path: PathBuf,
    cta_policy: CtaPolicy,
    fonts: Option<fontdb::Database>,
}

impl LocalHost {
    /// Create a host resolving relative image references against `base_path`.
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            base_path,
            cta_policy: CtaPolicy::None,
            fonts: None,
        }
    }

    #[must_use]
    pub fn with_cta_policy(mut self, policy: CtaPolicy) -> Self {
        self.cta_policy = policy;
        self
    }

    /// Use a prepared font database instead of scanning system fonts.
    #[must_use]
    pub fn with_font_database(mut self, fonts: fontdb::Database) -> Self {
        self.fonts = Some(fonts);
        self
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn resolve_path(&self, image_ref: &str) -> PathBuf {
        let path = Path::new(image_ref);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        }
    }

    fn font_database(&mut self) -> &fontdb::Database {
        self.fonts.get_or_insert_with(|| {
            let mut db = fontdb::Database::new();
            db.load_system_fonts();
            tracing::debug!(faces = db.len(), "loaded system font database");
            db
        })
    }
}

impl Host for LocalHost {
    fn load_font(&mut self, font: &FontName) -> Result<(), FontError> {
        let families = [fontdb::Family::Name(&font.family)];
        let query = fontdb::Query {
            families: &families,
            ..fontdb::Query::default()
        };
        self.font_database()
            .query(&query)
            .map(|_| ())
            .ok_or_else(|| FontError::NotInstalled {
                family: font.family.clone(),
            })
    }

    fn export_image(
        &mut self,
        node: &DesignNode,
        settings: ExportSettings,
    ) -> Result<Vec<u8>, ExportError> {
        let image_ref = node.image_ref().ok_or_else(|| ExportError::NoSource {
            node: node.name.clone(),
        })?;
        let path = self.resolve_path(image_ref);
        let source = image::open(&path).map_err(|source| ExportError::Decode {
            path: path.clone(),
            source,
        })?;

        let width = (node.geometry.width * settings.scale).round().max(1.0) as u32;
        let height = (node.geometry.height * settings.scale).round().max(1.0) as u32;
        let resized = source.resize_exact(width, height, FilterType::Lanczos3);

        let format = match settings.format {
            ExportFormat::Png => ImageFormat::Png,
        };
        let mut bytes = Vec::new();
        resized
            .write_to(&mut Cursor::new(&mut bytes), format)
            .map_err(ExportError::Encode)?;
        Ok(bytes)
    }

    fn confirm_cta(&mut self, candidates: &[CtaCandidate]) -> HashSet<String> {
        let confirmed: HashSet<String> = match &self.cta_policy {
            CtaPolicy::None => HashSet::new(),
            CtaPolicy::All => candidates.iter().map(|c| c.id.clone()).collect(),
            CtaPolicy::Ids(ids) => candidates
                .iter()
                .filter(|c| ids.contains(&c.id))
                .map(|c| c.id.clone())
                .collect(),
        };
        for candidate in candidates.iter().filter(|c| !confirmed.contains(&c.id)) {
            tracing::info!(
                id = %candidate.id,
                label = %candidate.label,
                "button candidate not confirmed; pass --confirm-cta {} to render it as a button",
                candidate.id
            );
        }
        confirmed
    }

    fn notify(&mut self, message: &str) {
        tracing::warn!("{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{Geometry, Paint};
    use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
    use tempfile::tempdir;

    fn candidate(id: &str) -> CtaCandidate {
        CtaCandidate {
            id: id.to_string(),
            name: format!("Button {id}"),
            label: "Go".to_string(),
        }
    }

    #[test]
    fn test_resolve_path_relative_and_absolute() {
        let host = LocalHost::new(PathBuf::from("/designs"));
        assert_eq!(host.resolve_path("img/a.png"), PathBuf::from("/designs/img/a.png"));
        assert_eq!(host.resolve_path("/abs/b.png"), PathBuf::from("/abs/b.png"));
    }

    #[test]
    fn test_export_resizes_to_retina_png() {
        let dir = tempdir().unwrap();
        let source = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([200, 10, 10, 255])));
        source.save(dir.path().join("hero.png")).unwrap();

        let mut host = LocalHost::new(dir.path().to_path_buf());
        let node = DesignNode::rectangle("hero", Geometry::new(0.0, 0.0, 30.0, 10.0))
            .with_fills(vec![Paint::image("hero.png")]);
        let bytes = host.export_image(&node, ExportSettings::RETINA_PNG).unwrap();

        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), (60, 20));
    }

    #[test]
    fn test_export_without_image_ref_fails() {
        let mut host = LocalHost::new(PathBuf::from("."));
        let node = DesignNode::rectangle("icon", Geometry::new(0.0, 0.0, 8.0, 8.0));
        let err = host.export_image(&node, ExportSettings::RETINA_PNG).unwrap_err();
        assert!(matches!(err, ExportError::NoSource { .. }));
        assert!(err.to_string().contains("icon"));
    }

    #[test]
    fn test_export_missing_file_fails_with_path() {
        let dir = tempdir().unwrap();
        let mut host = LocalHost::new(dir.path().to_path_buf());
        let node = DesignNode::rectangle("gone", Geometry::new(0.0, 0.0, 8.0, 8.0))
            .with_fills(vec![Paint::image("missing.png")]);
        let err = host.export_image(&node, ExportSettings::RETINA_PNG).unwrap_err();
        assert!(err.to_string().contains("missing.png"));
    }

    #[test]
    fn test_cta_policy_filters_candidates() {
        let candidates = [candidate("a"), candidate("b")];

        let mut none = LocalHost::new(PathBuf::from("."));
        assert!(none.confirm_cta(&candidates).is_empty());

        let mut all = LocalHost::new(PathBuf::from(".")).with_cta_policy(CtaPolicy::All);
        assert_eq!(all.confirm_cta(&candidates).len(), 2);

        let ids = HashSet::from(["b".to_string(), "zzz".to_string()]);
        let mut some = LocalHost::new(PathBuf::from(".")).with_cta_policy(CtaPolicy::Ids(ids));
        assert_eq!(some.confirm_cta(&candidates), HashSet::from(["b".to_string()]));
    }

    #[test]
    fn test_missing_font_family_is_reported() {
        let mut host =
            LocalHost::new(PathBuf::from(".")).with_font_database(fontdb::Database::new());
        let err = host
            .load_font(&FontName::new("No Such Family", "Regular"))
            .unwrap_err();
        assert_eq!(
            err,
            FontError::NotInstalled {
                family: "No Such Family".to_string()
            }
        );
    }
}
