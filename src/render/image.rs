//! Image-like nodes: placeholders, inline data URIs or downloaded assets.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::warn;

use super::layout::{px, style_attr};
use super::style::StyleBuilder;
use super::text::{FALLBACK_FONTS, escape_attr, escape_html};
use super::{ImageAsset, ImageExportMode, RenderContext, RenderPass};
use crate::design::{DesignNode, NodeHandle};
use crate::host::{ExportError, ExportSettings, Host};

const PLACEHOLDER_SERVICE: &str = "https://placehold.co";

/// Stable placeholder URL for a `width`×`height` box.
pub fn placeholder_url(width: f64, height: f64) -> String {
    format!(
        "{PLACEHOLDER_SERVICE}/{}x{}",
        px(width).max(1),
        px(height).max(1)
    )
}

fn data_uri(bytes: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(bytes))
}

fn img_tag(node: &DesignNode, src: &str, width: f64) -> String {
    let width = px(width).max(1);
    let height = px(node.geometry.height).max(1);
    let mut style = StyleBuilder::new();
    style
        .push("display", "block")
        .push("width", format!("{width}px"))
        .push("height", format!("{height}px"))
        .push("outline", "none")
        .push("text-decoration", "none");
    format!(
        "<img src=\"{src}\" alt=\"{alt}\" width=\"{width}\" height=\"{height}\"{style}>",
        src = escape_attr(src),
        alt = escape_attr(&node.name),
        style = style_attr(&style.build()),
    )
}

fn error_fragment(node: &DesignNode, err: &ExportError) -> String {
    format!(
        "<span style=\"color:#cc0000;font-family:{FALLBACK_FONTS};font-size:12px;\">Could not export image &quot;{}&quot;: {}</span>",
        escape_html(&node.name),
        escape_html(&err.to_string())
    )
}

impl<H: Host + ?Sized> RenderPass<'_, H> {
    /// Emit an `<img>` no wider than the available width.
    ///
    /// Export failures become an inline error message naming the node.
    pub(crate) fn render_image(&mut self, handle: NodeHandle, ctx: RenderContext) -> String {
        let tree = self.tree;
        let node = &tree[handle];
        let width = node.geometry.width.min(ctx.available_width).max(0.0);

        let src = match ctx.mode {
            ImageExportMode::Placeholder => Ok(placeholder_url(width, node.geometry.height)),
            ImageExportMode::Base64 => self
                .host
                .export_image(node, ExportSettings::RETINA_PNG)
                .map(|bytes| data_uri(&bytes)),
            ImageExportMode::Download => self
                .host
                .export_image(node, ExportSettings::RETINA_PNG)
                .map(|bytes| self.store_asset(bytes)),
        };

        match src {
            Ok(src) => {
                crate::perf::log_event("render.image", || {
                    format!("id={} src_len={}", node.id, src.len())
                });
                img_tag(node, &src, width)
            }
            Err(err) => {
                warn!(id = %node.id, name = %node.name, "image export failed: {err}");
                error_fragment(node, &err)
            }
        }
    }

    /// Record a downloaded asset and return its relative path.
    fn store_asset(&mut self, data: Vec<u8>) -> String {
        self.image_count += 1;
        let name = format!("image-{}.png", self.image_count);
        let path = if self.options.asset_dir.is_empty() {
            name.clone()
        } else {
            format!("{}/{name}", self.options.asset_dir.trim_end_matches('/'))
        };
        self.assets.push(ImageAsset { name, data });
        path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{Geometry, Paint};

    #[test]
    fn test_placeholder_url_encodes_size() {
        assert_eq!(placeholder_url(120.4, 80.6), "https://placehold.co/120x81");
        assert_eq!(placeholder_url(0.0, 0.0), "https://placehold.co/1x1");
    }

    #[test]
    fn test_data_uri_prefix() {
        assert_eq!(data_uri(b"png"), "data:image/png;base64,cG5n");
    }

    #[test]
    fn test_img_tag_escapes_alt() {
        let node = DesignNode::rectangle("hero", Geometry::new(0.0, 0.0, 300.0, 100.0))
            .with_name("Hero \"main\"")
            .with_fills(vec![Paint::image("hero.png")]);
        let tag = img_tag(&node, "images/image-1.png", 280.0);
        assert!(tag.contains("alt=\"Hero &quot;main&quot;\""), "{tag}");
        assert!(tag.contains("width=\"280\" height=\"100\""), "{tag}");
        assert!(tag.contains("display:block"), "{tag}");
    }

    #[test]
    fn test_error_fragment_names_node() {
        let node = DesignNode::rectangle("icon", Geometry::default()).with_name("Logo <svg>");
        let html = error_fragment(&node, &ExportError::Unsupported);
        assert!(html.contains("Logo &lt;svg&gt;"), "{html}");
        assert!(html.contains("Image export is not available"), "{html}");
    }
}
