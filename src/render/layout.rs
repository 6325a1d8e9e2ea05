//! Auto-layout emulation with nested tables.
//!
//! Padding becomes spacer cells and filler rows instead of CSS padding, and
//! spacing between children becomes fixed or flexible spacer cells.

use tracing::debug;

use super::classify::{self, BulletParts, CtaParts};
use super::color::{self, ResolvedColor};
use super::style::StyleBuilder;
use super::text::{self, escape_attr};
use super::{RenderContext, RenderPass, TABLE_RESET};
use crate::design::{
    CounterAlign, DesignNode, DesignTree, LayoutContext, LayoutMode, NodeData, NodeHandle,
    Padding, PrimaryAlign, ShapeKind,
};
use crate::host::Host;

/// Vertical gaps at or below this are rounding noise.
pub const GAP_TOLERANCE: f64 = 2.0;

/// Children at least this share of the available width render fluid.
pub const FLUID_RATIO: f64 = 0.9;

/// Round to whole pixels for HTML attributes.
pub(crate) fn px(value: f64) -> i64 {
    value.round() as i64
}

/// Wraps `style` in a ` style="..."` attribute, or nothing when empty.
pub(crate) fn style_attr(style: &str) -> String {
    if style.is_empty() {
        String::new()
    } else {
        format!(" style=\"{style}\"")
    }
}

fn filler_row(height: f64, columns: usize) -> String {
    let height = px(height).max(1);
    let colspan = if columns > 1 {
        format!(" colspan=\"{columns}\"")
    } else {
        String::new()
    };
    format!(
        "<tr><td height=\"{height}\"{colspan} style=\"height:{height}px;font-size:0;line-height:0;\">&nbsp;</td></tr>"
    )
}

fn spacer_cell(width: f64) -> String {
    let width = px(width).max(1);
    format!(
        "<td width=\"{width}\" style=\"width:{width}px;font-size:0;line-height:0;\">&nbsp;</td>"
    )
}

fn flex_spacer() -> &'static str {
    "<td width=\"100%\" style=\"font-size:0;line-height:0;\">&nbsp;</td>"
}

const fn horizontal_align(align: CounterAlign) -> Option<&'static str> {
    match align {
        CounterAlign::Center => Some("center"),
        CounterAlign::End => Some("right"),
        CounterAlign::Start | CounterAlign::Baseline => None,
    }
}

const fn vertical_align(align: CounterAlign) -> &'static str {
    match align {
        CounterAlign::Start => "top",
        CounterAlign::Center => "middle",
        CounterAlign::End => "bottom",
        CounterAlign::Baseline => "baseline",
    }
}

/// How a vertical stack lays out its rows.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StackFrame {
    pub padding: Padding,
    pub align: CounterAlign,
    /// Sort children by their vertical position first.
    pub sort: bool,
}

impl Default for StackFrame {
    fn default() -> Self {
        Self {
            padding: Padding::default(),
            align: CounterAlign::Start,
            sort: true,
        }
    }
}

/// Rows of one table whose content cells are flanked by padding spacers.
struct PaddedRows {
    padding: Padding,
    align: Option<&'static str>,
    rows: String,
    has_content: bool,
}

impl PaddedRows {
    fn new(padding: Padding, align: CounterAlign) -> Self {
        let mut rows = Self {
            padding,
            align: horizontal_align(align),
            rows: String::new(),
            has_content: false,
        };
        if padding.top > 0.0 {
            rows.filler(padding.top);
        }
        rows
    }

    fn columns(&self) -> usize {
        1 + usize::from(self.padding.left > 0.0) + usize::from(self.padding.right > 0.0)
    }

    fn filler(&mut self, height: f64) {
        let row = filler_row(height, self.columns());
        self.rows.push_str(&row);
    }

    fn content(&mut self, markup: &str) {
        self.rows.push_str("<tr>");
        if self.padding.left > 0.0 {
            self.rows.push_str(&spacer_cell(self.padding.left));
        }
        match self.align {
            Some(align) => self.rows.push_str(&format!("<td align=\"{align}\">{markup}</td>")),
            None => self.rows.push_str(&format!("<td>{markup}</td>")),
        }
        if self.padding.right > 0.0 {
            self.rows.push_str(&spacer_cell(self.padding.right));
        }
        self.rows.push_str("</tr>");
        self.has_content = true;
    }

    fn finish(mut self) -> String {
        if !self.has_content {
            return String::new();
        }
        if self.padding.bottom > 0.0 {
            self.filler(self.padding.bottom);
        }
        format!(
            "<table role=\"presentation\" width=\"100%\" {TABLE_RESET}>{}</table>",
            self.rows
        )
    }
}

/// `{weight}px solid {hex}` for a node with a visible stroke.
fn border_declaration(tree: &DesignTree, handle: NodeHandle) -> Option<String> {
    let node = &tree[handle];
    if node.stroke_weight <= 0.0 {
        return None;
    }
    color::stroke_hex(tree, handle).map(|hex| {
        format!("{}px solid {hex}", super::style::number(node.stroke_weight))
    })
}

/// Space between a free-form button frame and its background plate.
fn plate_inset(frame: &DesignNode, plate: &DesignNode) -> Padding {
    let outer = frame.geometry;
    let inner = plate.geometry;
    Padding {
        top: (inner.y - outer.y).max(0.0),
        right: (outer.right() - inner.right()).max(0.0),
        bottom: (outer.bottom() - inner.bottom()).max(0.0),
        left: (inner.x - outer.x).max(0.0),
    }
}

fn radius_declaration(node: &DesignNode) -> Option<String> {
    if node.shape_kind() == Some(ShapeKind::Ellipse) {
        return Some("50%".to_string());
    }
    node.corner_radius()
        .filter(|radius| *radius > 0.0)
        .map(|radius| format!("{}px", super::style::number(radius)))
}

/// A free-form container whose children sit side by side: every pair
/// overlaps vertically and none overlap horizontally.
pub(crate) fn is_inferred_row(tree: &DesignTree, children: &[NodeHandle]) -> bool {
    if children.len() < 2 {
        return false;
    }
    let geometries: Vec<_> = children.iter().map(|c| tree[*c].geometry).collect();
    let overlapping = geometries.iter().enumerate().all(|(i, a)| {
        geometries[i + 1..]
            .iter()
            .all(|b| a.y < b.bottom() && b.y < a.bottom())
    });
    if !overlapping {
        return false;
    }
    let mut by_x = geometries;
    by_x.sort_by(|a, b| a.x.total_cmp(&b.x));
    by_x.windows(2).all(|pair| pair[0].right() <= pair[1].x)
}

/// Flat colour cell for a rectangle or ellipse.
pub(crate) fn render_shape(tree: &DesignTree, handle: NodeHandle, ctx: RenderContext) -> String {
    let node = &tree[handle];
    let own = color::resolve_paints(&node.fills, ctx.background);
    let width = node.geometry.width.min(ctx.available_width).max(0.0);
    let height = px(node.geometry.height).max(1);

    let mut style = StyleBuilder::new();
    style
        .push("height", format!("{height}px"))
        .push("font-size", 0)
        .push("line-height", 0)
        .push_opt("background-color", own.hex.as_deref())
        .push_opt("border", border_declaration(tree, handle))
        .push_opt("border-radius", radius_declaration(node));
    let bgcolor = own
        .hex
        .as_deref()
        .map(|hex| format!(" bgcolor=\"{hex}\""))
        .unwrap_or_default();

    format!(
        "<table role=\"presentation\" width=\"{width}\" {TABLE_RESET}><tr><td height=\"{height}\"{bgcolor}{style}>&nbsp;</td></tr></table>",
        width = px(width),
        style = style_attr(&style.build()),
    )
}

impl<H: Host + ?Sized> RenderPass<'_, H> {
    pub(crate) fn render_container(&mut self, handle: NodeHandle, ctx: RenderContext) -> String {
        let tree = self.tree;
        let node = &tree[handle];
        let NodeData::Container(data) = &node.data else {
            return String::new();
        };
        let own = color::resolve_paints(&node.fills, ctx.background);
        let width = node.geometry.width.min(ctx.available_width).max(0.0);
        let inner_ctx = ctx.child(own.rgb, width);
        let children = tree.visible_children(handle);
        let layout = data.layout;

        let inner = match layout.mode {
            LayoutMode::Horizontal => self.horizontal_row(&children, &layout, true, inner_ctx),
            LayoutMode::None if is_inferred_row(tree, &children) => {
                debug!(id = %node.id, "treating free-form container as a row");
                self.horizontal_row(&children, &layout, false, inner_ctx)
            }
            LayoutMode::None | LayoutMode::Vertical => {
                let frame = StackFrame {
                    padding: layout.padding,
                    align: layout.counter_align,
                    sort: layout.mode == LayoutMode::None,
                };
                self.vertical_stack(&children, frame, inner_ctx)
            }
        };
        self.wrap_container(handle, &own, inner, ctx)
    }

    /// Wrap a container's inner markup in a table carrying its own colour,
    /// border and width. Transparent non-root containers without padding
    /// are flattened.
    fn wrap_container(
        &self,
        handle: NodeHandle,
        own: &ResolvedColor,
        inner: String,
        ctx: RenderContext,
    ) -> String {
        let tree = self.tree;
        let node = &tree[handle];
        let border = border_declaration(tree, handle);
        let padded = match &node.data {
            NodeData::Container(data) => !data.layout.padding.is_zero(),
            _ => false,
        };
        if own.hex.is_none() && border.is_none() && !padded && !ctx.is_root {
            return inner;
        }
        if inner.is_empty() && own.hex.is_none() && border.is_none() {
            return inner;
        }

        let declared = node.geometry.width.min(ctx.available_width).max(0.0);
        let (width_attr, width_style) = if ctx.is_root {
            let page = px(self.options.page_width);
            (page.to_string(), Some(format!("{page}px")))
        } else if declared >= FLUID_RATIO * ctx.available_width {
            ("100%".to_string(), None)
        } else {
            (px(declared).to_string(), Some(format!("{}px", px(declared))))
        };

        let mut style = StyleBuilder::new();
        style
            .push_opt("width", width_style)
            .push_opt("background-color", own.hex.as_deref())
            .push_opt("border", border)
            .push_opt("border-radius", radius_declaration(node));
        let align = if ctx.is_root { " align=\"center\"" } else { "" };
        let bgcolor = own
            .hex
            .as_deref()
            .map(|hex| format!(" bgcolor=\"{hex}\""))
            .unwrap_or_default();

        format!(
            "<table role=\"presentation\" width=\"{width_attr}\"{align}{bgcolor} {TABLE_RESET}{style}><tr><td>{inner}</td></tr></table>",
            style = style_attr(&style.build()),
        )
    }

    /// One row per child, with filler rows for gaps above the tolerance.
    pub(crate) fn vertical_stack(
        &mut self,
        children: &[NodeHandle],
        frame: StackFrame,
        ctx: RenderContext,
    ) -> String {
        let tree = self.tree;
        let mut ordered = children.to_vec();
        if frame.sort {
            ordered.sort_by(|a, b| tree[*a].geometry.y.total_cmp(&tree[*b].geometry.y));
        }
        let content_width = (ctx.available_width - frame.padding.horizontal()).max(0.0);
        let child_ctx = ctx.child(ctx.background, content_width);

        let mut rows = PaddedRows::new(frame.padding, frame.align);
        let mut previous_bottom: Option<f64> = None;
        for child in ordered {
            let geometry = tree[child].geometry;
            if let Some(bottom) = previous_bottom {
                let gap = geometry.y - bottom;
                if gap > GAP_TOLERANCE {
                    rows.filler(gap);
                }
            }
            previous_bottom = Some(previous_bottom.map_or(geometry.bottom(), |b| b.max(geometry.bottom())));

            let markup = self.render_node(child, child_ctx);
            if !markup.is_empty() {
                rows.content(&markup);
            }
        }
        rows.finish()
    }

    /// One cell per child, separated by fixed or flexible spacer cells.
    ///
    /// Native rows keep their child order and declared spacing; inferred
    /// rows are sorted left to right and use the measured gaps.
    pub(crate) fn horizontal_row(
        &mut self,
        children: &[NodeHandle],
        layout: &LayoutContext,
        native: bool,
        ctx: RenderContext,
    ) -> String {
        let tree = self.tree;
        let mut ordered = children.to_vec();
        if !native {
            ordered.sort_by(|a, b| tree[*a].geometry.x.total_cmp(&tree[*b].geometry.x));
        }
        if ordered.is_empty() {
            return String::new();
        }

        let spacings: Vec<f64> = ordered
            .windows(2)
            .map(|pair| {
                if native {
                    layout.item_spacing.max(0.0)
                } else {
                    (tree[pair[1]].geometry.x - tree[pair[0]].geometry.right()).max(0.0)
                }
            })
            .collect();
        let total: f64 = ordered.iter().map(|c| tree[*c].geometry.width).sum::<f64>()
            + spacings.iter().sum::<f64>();
        let content_width = (ctx.available_width - layout.padding.horizontal()).max(0.0);
        let space_between = layout.primary_align == PrimaryAlign::SpaceBetween && ordered.len() > 1;
        let slack = content_width - total > GAP_TOLERANCE;
        let valign = if native {
            vertical_align(layout.counter_align)
        } else {
            "top"
        };

        let mut cells = String::new();
        if slack && matches!(layout.primary_align, PrimaryAlign::Center | PrimaryAlign::End) {
            cells.push_str(flex_spacer());
        }
        let mut previous: Option<NodeHandle> = None;
        for child in ordered.iter().copied() {
            let node = &tree[child];
            let budget = node.geometry.width.min(content_width).max(0.0);
            let markup = self.render_node(child, ctx.child(ctx.background, budget));
            if markup.is_empty() {
                continue;
            }
            if let Some(previous) = previous {
                let spacing = if native {
                    layout.item_spacing.max(0.0)
                } else {
                    (node.geometry.x - tree[previous].geometry.right()).max(0.0)
                };
                if space_between {
                    cells.push_str(flex_spacer());
                } else if spacing > 0.0 {
                    cells.push_str(&spacer_cell(spacing));
                }
            }
            let width = self.column_width(child, budget, total, ordered.len());
            cells.push_str(&format!("<td valign=\"{valign}\"{width}>{markup}</td>"));
            previous = Some(child);
        }
        if previous.is_none() {
            return String::new();
        }
        if slack
            && !space_between
            && matches!(layout.primary_align, PrimaryAlign::Start | PrimaryAlign::Center)
        {
            cells.push_str(flex_spacer());
        }

        let row = format!(
            "<table role=\"presentation\" width=\"100%\" {TABLE_RESET}><tr>{cells}</tr></table>"
        );
        let mut rows = PaddedRows::new(layout.padding, CounterAlign::Start);
        rows.content(&row);
        rows.finish()
    }

    /// Width attribute for a row cell: pixels for rasters and shapes, a
    /// share of the row for containers, nothing for text.
    fn column_width(&self, child: NodeHandle, budget: f64, total: f64, count: usize) -> String {
        let tree = self.tree;
        if classify::is_image_like(tree, child) {
            return format!(" width=\"{}\"", px(budget));
        }
        match &tree[child].data {
            NodeData::Container(_) if count > 1 && total > 0.0 => {
                let share = (tree[child].geometry.width / total * 100.0).round();
                format!(" width=\"{share}%\"")
            }
            NodeData::Shape(_) => format!(" width=\"{}\"", px(budget)),
            _ => String::new(),
        }
    }

    /// Two-column list item: the glyph cell keeps its own width.
    pub(crate) fn render_bullet(
        &mut self,
        handle: NodeHandle,
        parts: BulletParts,
        ctx: RenderContext,
    ) -> String {
        let tree = self.tree;
        let node = &tree[handle];
        let NodeData::Container(data) = &node.data else {
            return String::new();
        };
        let own = color::resolve_paints(&node.fills, ctx.background);
        let glyph = &tree[parts.glyph];
        let body = &tree[parts.text];
        let (Some(glyph_block), Some(body_block)) = (
            text::render_block(glyph, own.rgb, true),
            text::render_block(body, own.rgb, true),
        ) else {
            return String::new();
        };

        let spacing = if data.layout.item_spacing > 0.0 {
            data.layout.item_spacing
        } else {
            (body.geometry.x - glyph.geometry.right()).max(0.0)
        };
        let valign = vertical_align(data.layout.counter_align);
        let glyph_attrs = format!(
            " width=\"{}\" valign=\"{valign}\"",
            px(glyph.geometry.width).max(1)
        );
        let mut cells = glyph_block.cell(&glyph_attrs);
        if spacing > 0.0 {
            cells.push_str(&spacer_cell(spacing));
        }
        cells.push_str(&body_block.cell(&format!(" valign=\"{valign}\"")));

        let row = format!(
            "<table role=\"presentation\" width=\"100%\" {TABLE_RESET}><tr>{cells}</tr></table>"
        );
        let mut rows = PaddedRows::new(data.layout.padding, CounterAlign::Start);
        rows.content(&row);
        self.wrap_container(handle, &own, rows.finish(), ctx)
    }

    /// A confirmed button: one anchor inside a single coloured cell, wrapped
    /// in the container's own table like any other container.
    pub(crate) fn render_cta(
        &mut self,
        handle: NodeHandle,
        parts: CtaParts,
        ctx: RenderContext,
    ) -> String {
        let tree = self.tree;
        let node = &tree[handle];
        let NodeData::Container(data) = &node.data else {
            return String::new();
        };
        let plate = &tree[parts.background];
        let label = &tree[parts.label];
        let container = color::resolve_paints(&node.fills, ctx.background);
        let fill = color::resolve_paints(&plate.fills, container.rgb);
        let Some(block) = text::render_block(label, fill.rgb, false) else {
            return String::new();
        };
        let href = label
            .text_data()
            .and_then(|data| data.runs.iter().find_map(|run| run.hyperlink.as_deref()))
            .unwrap_or("#");

        let pad_y = ((plate.geometry.height - label.geometry.height) / 2.0).max(0.0);
        let pad_x = ((plate.geometry.width - label.geometry.width) / 2.0).max(0.0);

        let mut cell_style = StyleBuilder::new();
        cell_style
            .push_opt("background-color", fill.hex.as_deref())
            .push_opt("border", border_declaration(tree, parts.background))
            .push_opt("border-radius", radius_declaration(plate));
        let mut link_style = StyleBuilder::new();
        link_style
            .push("display", "inline-block")
            .push("padding", format!("{}px {}px", px(pad_y), px(pad_x)))
            .extend_raw(&block.style)
            .push("text-decoration", "none");
        let bgcolor = fill
            .hex
            .as_deref()
            .map(|hex| format!(" bgcolor=\"{hex}\""))
            .unwrap_or_default();
        let align = match label.text_data().map(|data| data.align.as_css()) {
            Some("right") => "right",
            Some("left") => "left",
            _ => "center",
        };

        let button = format!(
            "<table role=\"presentation\" align=\"{align}\" {TABLE_RESET}><tr><td align=\"center\"{bgcolor}{cell_style}><a href=\"{href}\" target=\"_blank\"{link_style}>{content}</a></td></tr></table>",
            cell_style = style_attr(&cell_style.build()),
            href = escape_attr(href),
            link_style = style_attr(&link_style.build()),
            content = block.content,
        );
        let padding = if data.layout.mode == LayoutMode::None && data.layout.padding.is_zero() {
            plate_inset(node, plate)
        } else {
            data.layout.padding
        };
        let mut rows = PaddedRows::new(padding, CounterAlign::Start);
        rows.content(&button);
        self.wrap_container(handle, &container, rows.finish(), ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::Geometry;

    fn boxes(specs: &[(f64, f64, f64, f64)]) -> (DesignTree, Vec<NodeHandle>) {
        let mut tree = DesignTree::new();
        let root = tree.add_root(DesignNode::frame("root", Geometry::new(0.0, 0.0, 600.0, 600.0)));
        let children = specs
            .iter()
            .enumerate()
            .map(|(i, (x, y, w, h))| {
                tree.add_child(
                    root,
                    DesignNode::rectangle(format!("r{i}"), Geometry::new(*x, *y, *w, *h)),
                )
            })
            .collect();
        (tree, children)
    }

    #[test]
    fn test_side_by_side_children_form_an_inferred_row() {
        let (tree, children) = boxes(&[(200.0, 10.0, 100.0, 40.0), (0.0, 0.0, 150.0, 60.0)]);
        assert!(is_inferred_row(&tree, &children));
    }

    #[test]
    fn test_stacked_children_are_not_a_row() {
        let (tree, children) = boxes(&[(0.0, 0.0, 100.0, 40.0), (0.0, 50.0, 100.0, 40.0)]);
        assert!(!is_inferred_row(&tree, &children));
    }

    #[test]
    fn test_horizontally_overlapping_children_are_not_a_row() {
        let (tree, children) = boxes(&[(0.0, 0.0, 120.0, 40.0), (100.0, 0.0, 100.0, 40.0)]);
        assert!(!is_inferred_row(&tree, &children));
    }

    #[test]
    fn test_single_child_is_not_a_row() {
        let (tree, children) = boxes(&[(0.0, 0.0, 120.0, 40.0)]);
        assert!(!is_inferred_row(&tree, &children));
    }

    #[test]
    fn test_filler_row_spans_padding_columns() {
        let row = filler_row(3.0, 3);
        assert!(row.contains("height=\"3\""));
        assert!(row.contains("colspan=\"3\""));
        assert!(row.contains("height:3px"));
    }

    #[test]
    fn test_padded_rows_emit_spacers_and_fillers() {
        let mut rows = PaddedRows::new(
            Padding {
                top: 10.0,
                right: 0.0,
                bottom: 5.0,
                left: 20.0,
            },
            CounterAlign::Center,
        );
        rows.content("X");
        let table = rows.finish();
        assert!(table.contains("height=\"10\""), "{table}");
        assert!(table.contains("height=\"5\""), "{table}");
        assert!(table.contains("width=\"20\""), "{table}");
        assert!(table.contains("<td align=\"center\">X</td>"), "{table}");
        assert!(table.contains("colspan=\"2\""), "{table}");
    }

    #[test]
    fn test_padded_rows_without_content_are_empty() {
        let rows = PaddedRows::new(Padding::uniform(8.0), CounterAlign::Start);
        assert_eq!(rows.finish(), "");
    }

    #[test]
    fn test_shape_cell_has_height_and_zero_line_height() {
        let mut tree = DesignTree::new();
        let handle = tree.add_root(
            DesignNode::rectangle("r", Geometry::new(0.0, 0.0, 80.0, 4.0))
                .with_fills(vec![crate::design::Paint::solid(crate::design::Rgb::BLACK)]),
        );
        let ctx = RenderContext::root(
            crate::design::Rgb::WHITE,
            600.0,
            super::super::ImageExportMode::Placeholder,
        );
        let html = render_shape(&tree, handle, ctx);
        assert!(html.contains("height=\"4\""), "{html}");
        assert!(html.contains("font-size:0;line-height:0"), "{html}");
        assert!(html.contains("bgcolor=\"#000000\""), "{html}");
        assert!(html.contains("width=\"80\""), "{html}");
    }

    #[test]
    fn test_plate_inset_measures_each_side() {
        let frame = DesignNode::frame("f", Geometry::new(100.0, 50.0, 200.0, 60.0));
        let plate = DesignNode::rectangle("p", Geometry::new(110.0, 60.0, 180.0, 40.0));
        let inset = plate_inset(&frame, &plate);
        assert_eq!(
            (inset.top, inset.right, inset.bottom, inset.left),
            (10.0, 10.0, 10.0, 10.0)
        );
    }

    #[test]
    fn test_ellipse_radius_is_half() {
        let node = DesignNode::shape("e", ShapeKind::Ellipse, Geometry::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(radius_declaration(&node).as_deref(), Some("50%"));
    }
}
