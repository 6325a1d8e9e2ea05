//! Effective colour resolution.
//!
//! Email clients cannot composite translucent layers, so every fill is
//! flattened to one opaque colour against the background already resolved
//! for its parent. The resolved parent colour travels down the recursion in
//! [`RenderContext`](super::RenderContext); only border colours walk the tree
//! upward, because strokes have no inherited context.

use crate::design::{DesignTree, NodeHandle, Paint, PaintKind, Rgb};

/// Fills at or above this opacity are treated as fully opaque.
pub const OPAQUE_THRESHOLD: f64 = 0.99;

/// A node's effective colour.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedColor {
    pub rgb: Rgb,
    /// `None` when the node has no colour of its own and shows the context.
    pub hex: Option<String>,
}

impl ResolvedColor {
    const fn inherited(background: Rgb) -> Self {
        Self {
            rgb: background,
            hex: None,
        }
    }
}

pub fn first_visible(paints: &[Paint]) -> Option<&Paint> {
    paints.iter().find(|paint| paint.visible)
}

/// Flat colour and effective alpha of a paint, if it has one.
///
/// Gradients approximate to their first stop.
fn flat_color(paint: &Paint) -> Option<(Rgb, f64)> {
    match &paint.kind {
        PaintKind::Solid(color) => Some((*color, paint.opacity)),
        PaintKind::Gradient(stops) => stops
            .first()
            .map(|stop| (stop.color, stop.alpha * paint.opacity)),
        PaintKind::Image { .. } => None,
    }
}

/// Resolve the first visible paint against `background`.
pub fn resolve_paints(paints: &[Paint], background: Rgb) -> ResolvedColor {
    let Some((color, alpha)) = first_visible(paints).and_then(flat_color) else {
        return ResolvedColor::inherited(background);
    };
    let rgb = if alpha >= OPAQUE_THRESHOLD {
        color
    } else {
        composite(color, background, alpha)
    };
    ResolvedColor {
        rgb,
        hex: Some(to_hex(rgb)),
    }
}

/// Alpha-blend `fg` over `bg`.
pub fn composite(fg: Rgb, bg: Rgb, alpha: f64) -> Rgb {
    let alpha = alpha.clamp(0.0, 1.0);
    let mix = |f: f64, b: f64| f.mul_add(alpha, b * (1.0 - alpha));
    Rgb::new(mix(fg.r, bg.r), mix(fg.g, bg.g), mix(fg.b, bg.b))
}

/// Lower-case `#rrggbb`.
pub fn to_hex(rgb: Rgb) -> String {
    format!(
        "#{:02x}{:02x}{:02x}",
        channel_byte(rgb.r),
        channel_byte(rgb.g),
        channel_byte(rgb.b)
    )
}

// Exact halves round down, so a 50% blend of 0 and 1 lands on 0x7f.
fn channel_byte(channel: f64) -> u8 {
    let scaled = channel.clamp(0.0, 1.0) * 255.0;
    (scaled - 0.5).ceil().clamp(0.0, 255.0) as u8
}

/// Colour of the nearest ancestor with a fully opaque visible fill.
///
/// Defaults to white when no ancestor paints one.
pub fn ancestor_background(tree: &DesignTree, handle: NodeHandle) -> Rgb {
    tree.ancestors(handle)
        .find_map(|ancestor| {
            first_visible(&tree[ancestor].fills)
                .and_then(flat_color)
                .filter(|(_, alpha)| *alpha >= OPAQUE_THRESHOLD)
                .map(|(color, _)| color)
        })
        .unwrap_or(Rgb::WHITE)
}

/// Hex colour of the node's first visible stroke, composited against its
/// ancestors.
pub fn stroke_hex(tree: &DesignTree, handle: NodeHandle) -> Option<String> {
    let node = &tree[handle];
    first_visible(&node.strokes)?;
    resolve_paints(&node.strokes, ancestor_background(tree, handle)).hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{DesignNode, Geometry, GradientStop};

    const RED: Rgb = Rgb::new(1.0, 0.0, 0.0);
    const BLUE: Rgb = Rgb::new(0.0, 0.0, 1.0);

    #[test]
    fn test_no_fill_inherits_background() {
        let resolved = resolve_paints(&[], BLUE);
        assert_eq!(resolved.rgb, BLUE);
        assert_eq!(resolved.hex, None);
    }

    #[test]
    fn test_hidden_fill_is_skipped() {
        let fills = vec![Paint::solid(RED).hidden(), Paint::solid(BLUE)];
        assert_eq!(resolve_paints(&fills, Rgb::WHITE).hex.as_deref(), Some("#0000ff"));
    }

    #[test]
    fn test_near_opaque_fill_ignores_background() {
        let fills = vec![Paint::solid(Rgb::new(0.2, 0.4, 0.6)).with_opacity(0.995)];
        let resolved = resolve_paints(&fills, BLUE);
        assert_eq!(resolved.rgb, Rgb::new(0.2, 0.4, 0.6));
    }

    #[test]
    fn test_half_red_over_blue_blends_to_purple() {
        let fills = vec![Paint::solid(RED).with_opacity(0.5)];
        let resolved = resolve_paints(&fills, BLUE);
        assert_eq!(resolved.rgb, Rgb::new(0.5, 0.0, 0.5));
        assert_eq!(resolved.hex.as_deref(), Some("#7f007f"));
    }

    #[test]
    fn test_gradient_uses_first_stop_alpha() {
        let fills = vec![Paint::gradient(vec![
            GradientStop {
                color: RED,
                alpha: 0.5,
                position: 0.0,
            },
            GradientStop {
                color: Rgb::BLACK,
                alpha: 1.0,
                position: 1.0,
            },
        ])];
        let resolved = resolve_paints(&fills, BLUE);
        assert_eq!(resolved.hex.as_deref(), Some("#7f007f"));
    }

    #[test]
    fn test_empty_gradient_inherits() {
        let resolved = resolve_paints(&[Paint::gradient(Vec::new())], BLUE);
        assert_eq!(resolved.hex, None);
    }

    #[test]
    fn test_image_fill_has_no_flat_color() {
        let resolved = resolve_paints(&[Paint::image("photo.png")], RED);
        assert_eq!(resolved.rgb, RED);
        assert_eq!(resolved.hex, None);
    }

    #[test]
    fn test_hex_is_lowercase_and_padded() {
        assert_eq!(to_hex(Rgb::new(0.0, 10.0 / 255.0, 1.0)), "#000aff");
        assert_eq!(to_hex(Rgb::new(0.0, 0.0, 0.0)), "#000000");
    }

    #[test]
    fn test_ancestor_background_finds_first_opaque_parent() {
        let mut tree = DesignTree::new();
        let page = tree.add_root(
            DesignNode::frame("page", Geometry::default()).with_fills(vec![Paint::solid(BLUE)]),
        );
        let card = tree.add_child(
            page,
            DesignNode::frame("card", Geometry::default())
                .with_fills(vec![Paint::solid(RED).with_opacity(0.3)]),
        );
        let leaf = tree.add_child(card, DesignNode::rectangle("leaf", Geometry::default()));
        assert_eq!(ancestor_background(&tree, leaf), BLUE);
        assert_eq!(ancestor_background(&tree, page), Rgb::WHITE);
    }

    #[test]
    fn test_stroke_hex_composites_against_ancestors() {
        let mut tree = DesignTree::new();
        let page = tree.add_root(
            DesignNode::frame("page", Geometry::default()).with_fills(vec![Paint::solid(BLUE)]),
        );
        let boxed = tree.add_child(
            page,
            DesignNode::rectangle("box", Geometry::default())
                .with_strokes(vec![Paint::solid(RED).with_opacity(0.5)], 2.0),
        );
        let bare = tree.add_child(page, DesignNode::rectangle("bare", Geometry::default()));
        assert_eq!(stroke_hex(&tree, boxed).as_deref(), Some("#7f007f"));
        assert_eq!(stroke_hex(&tree, bare), None);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn rgb() -> impl Strategy<Value = Rgb> {
            (0.0..=1.0f64, 0.0..=1.0f64, 0.0..=1.0f64).prop_map(|(r, g, b)| Rgb::new(r, g, b))
        }

        proptest! {
            #[test]
            fn opaque_fill_ignores_any_background(fill in rgb(), bg in rgb(), opacity in 0.99..=1.0f64) {
                let resolved = resolve_paints(&[Paint::solid(fill).with_opacity(opacity)], bg);
                prop_assert_eq!(resolved.rgb, fill);
            }

            #[test]
            fn composite_stays_between_endpoints(fg in rgb(), bg in rgb(), alpha in 0.0..=1.0f64) {
                let out = composite(fg, bg, alpha);
                for (o, f, b) in [(out.r, fg.r, bg.r), (out.g, fg.g, bg.g), (out.b, fg.b, bg.b)] {
                    prop_assert!(o >= f.min(b) - 1e-9 && o <= f.max(b) + 1e-9);
                }
            }
        }
    }
}
