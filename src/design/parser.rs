//! Design tree loading from the JSON export format.
//!
//! The export mirrors the host tool's node properties: each node carries a
//! `type`, geometry, paints, and kind-specific fields, with children nested
//! inline. The loader validates paints and text segments and flattens the
//! nested nodes into a [`DesignTree`] arena.

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::types::{
    ContainerData, ContainerKind, CounterAlign, DesignNode, DesignTree, FontName, Geometry,
    GradientStop, LayoutContext, LayoutMode, LineHeight, NodeData, NodeHandle, Padding, Paint,
    PaintKind, PrimaryAlign, Rgb, ShapeData, ShapeKind, TextAlign, TextData, TextDecoration,
    TextRun,
};

/// Errors raised while loading a design export.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read design file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Invalid design JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Opacity {value} on node '{id}' is outside 0..=1")]
    OpacityOutOfRange { id: String, value: f64 },

    #[error("Text segment {start}..{end} on node '{id}' exceeds {len} characters")]
    SegmentOutOfBounds {
        id: String,
        start: usize,
        end: usize,
        len: usize,
    },

    #[error("Node '{id}' has a negative size")]
    NegativeSize { id: String },
}

const DEFAULT_FONT_SIZE: f64 = 16.0;
const DEFAULT_FONT_FAMILY: &str = "Inter";

fn default_true() -> bool {
    true
}

fn default_one() -> f64 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawDocument {
    Selection { selection: Vec<RawNode> },
    Many(Vec<RawNode>),
    One(Box<RawNode>),
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct RawColor {
    r: f64,
    g: f64,
    b: f64,
    #[serde(default = "default_one")]
    a: f64,
}

impl RawColor {
    const fn rgb(self) -> Rgb {
        Rgb::new(self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct RawStop {
    color: RawColor,
    #[serde(default)]
    position: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
enum RawPaintKind {
    Solid {
        color: RawColor,
    },
    #[serde(
        alias = "GRADIENT_RADIAL",
        alias = "GRADIENT_ANGULAR",
        alias = "GRADIENT_DIAMOND"
    )]
    GradientLinear {
        #[serde(rename = "gradientStops", default)]
        gradient_stops: Vec<RawStop>,
    },
    Image {
        #[serde(rename = "imageRef", default)]
        image_ref: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
struct RawPaint {
    #[serde(flatten)]
    kind: RawPaintKind,
    #[serde(default = "default_one")]
    opacity: f64,
    #[serde(default = "default_true")]
    visible: bool,
}

#[derive(Debug, Clone, Deserialize)]
struct RawFontName {
    family: String,
    #[serde(default)]
    style: String,
}

/// `"MIXED"` marks a range that spans several fonts.
#[derive(Debug, Clone, Copy, Deserialize)]
enum RawMixed {
    #[serde(rename = "MIXED")]
    Mixed,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawFont {
    Named(RawFontName),
    Mixed(RawMixed),
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum RawLineHeightUnit {
    Pixels,
    Percent,
    Auto,
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct RawLineHeight {
    unit: RawLineHeightUnit,
    #[serde(default)]
    value: f64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSegment {
    start: usize,
    end: usize,
    font_name: Option<RawFont>,
    font_size: Option<f64>,
    fills: Option<Vec<RawPaint>>,
    line_height: Option<RawLineHeight>,
    text_decoration: Option<String>,
    hyperlink: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNode {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    x: f64,
    #[serde(default)]
    y: f64,
    #[serde(default)]
    width: f64,
    #[serde(default)]
    height: f64,
    #[serde(default = "default_true")]
    visible: bool,
    #[serde(default)]
    fills: Vec<RawPaint>,
    #[serde(default)]
    strokes: Vec<RawPaint>,
    stroke_weight: Option<f64>,
    corner_radius: Option<f64>,

    // Auto-layout
    layout_mode: Option<String>,
    #[serde(default)]
    padding_top: f64,
    #[serde(default)]
    padding_right: f64,
    #[serde(default)]
    padding_bottom: f64,
    #[serde(default)]
    padding_left: f64,
    #[serde(default)]
    item_spacing: f64,
    primary_axis_align_items: Option<String>,
    counter_axis_align_items: Option<String>,

    // Text
    characters: Option<String>,
    font_name: Option<RawFont>,
    font_size: Option<f64>,
    line_height: Option<RawLineHeight>,
    text_decoration: Option<String>,
    text_align_horizontal: Option<String>,
    hyperlink: Option<String>,
    #[serde(default)]
    segments: Vec<RawSegment>,

    #[serde(default)]
    children: Vec<RawNode>,
}

/// Parse a design export from a JSON string.
///
/// Accepts a single node, an array of top-level nodes, or an object with a
/// `selection` array.
pub fn parse(json: &str) -> Result<DesignTree, LoadError> {
    let document: RawDocument = serde_json::from_str(json)?;
    let roots = match document {
        RawDocument::Selection { selection } => selection,
        RawDocument::Many(nodes) => nodes,
        RawDocument::One(node) => vec![*node],
    };

    let mut tree = DesignTree::new();
    for raw in roots {
        insert_node(&mut tree, None, raw)?;
    }
    Ok(tree)
}

/// Read and parse a design export file.
pub fn load(path: &Path) -> Result<DesignTree, LoadError> {
    let json = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&json)
}

impl DesignTree {
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        parse(json)
    }
}

fn insert_node(
    tree: &mut DesignTree,
    parent: Option<NodeHandle>,
    mut raw: RawNode,
) -> Result<NodeHandle, LoadError> {
    let children = std::mem::take(&mut raw.children);
    let node = convert_node(raw)?;
    let handle = match parent {
        Some(parent) => tree.add_child(parent, node),
        None => tree.add_root(node),
    };
    for child in children {
        insert_node(tree, Some(handle), child)?;
    }
    Ok(handle)
}

fn convert_node(mut raw: RawNode) -> Result<DesignNode, LoadError> {
    if raw.width < 0.0 || raw.height < 0.0 {
        return Err(LoadError::NegativeSize { id: raw.id });
    }
    let fills = convert_paints(&raw.id, std::mem::take(&mut raw.fills))?;
    let strokes = convert_paints(&raw.id, std::mem::take(&mut raw.strokes))?;
    let data = match raw.kind.as_str() {
        "FRAME" | "SECTION" => container_data(ContainerKind::Frame, &raw),
        "GROUP" => container_data(ContainerKind::Group, &raw),
        "COMPONENT" | "COMPONENT_SET" => container_data(ContainerKind::Component, &raw),
        "INSTANCE" => container_data(ContainerKind::Instance, &raw),
        "RECTANGLE" => shape_data(ShapeKind::Rectangle, &raw),
        "ELLIPSE" => shape_data(ShapeKind::Ellipse, &raw),
        "VECTOR" | "STAR" | "POLYGON" | "BOOLEAN_OPERATION" => shape_data(ShapeKind::Vector, &raw),
        "LINE" => shape_data(ShapeKind::Line, &raw),
        "TEXT" => NodeData::Text(text_data(&raw, &fills)?),
        other => NodeData::Unsupported(other.to_string()),
    };

    Ok(DesignNode {
        name: raw.name.unwrap_or_else(|| raw.id.clone()),
        id: raw.id,
        geometry: Geometry::new(raw.x, raw.y, raw.width, raw.height),
        visible: raw.visible,
        fills,
        strokes,
        stroke_weight: raw.stroke_weight.unwrap_or(1.0),
        parent: None,
        data,
    })
}

fn container_data(kind: ContainerKind, raw: &RawNode) -> NodeData {
    let mode = match raw.layout_mode.as_deref() {
        Some("VERTICAL") => LayoutMode::Vertical,
        Some("HORIZONTAL") => LayoutMode::Horizontal,
        _ => LayoutMode::None,
    };
    let primary_align = match raw.primary_axis_align_items.as_deref() {
        Some("CENTER") => PrimaryAlign::Center,
        Some("MAX") => PrimaryAlign::End,
        Some("SPACE_BETWEEN") => PrimaryAlign::SpaceBetween,
        _ => PrimaryAlign::Start,
    };
    let counter_align = match raw.counter_axis_align_items.as_deref() {
        Some("CENTER") => CounterAlign::Center,
        Some("MAX") => CounterAlign::End,
        Some("BASELINE") => CounterAlign::Baseline,
        _ => CounterAlign::Start,
    };
    NodeData::Container(ContainerData {
        kind,
        layout: LayoutContext {
            mode,
            padding: Padding {
                top: raw.padding_top,
                right: raw.padding_right,
                bottom: raw.padding_bottom,
                left: raw.padding_left,
            },
            item_spacing: raw.item_spacing,
            primary_align,
            counter_align,
        },
        corner_radius: raw.corner_radius,
        children: Vec::new(),
    })
}

const fn shape_data(kind: ShapeKind, raw: &RawNode) -> NodeData {
    NodeData::Shape(ShapeData {
        kind,
        corner_radius: raw.corner_radius,
    })
}

fn convert_paints(id: &str, paints: Vec<RawPaint>) -> Result<Vec<Paint>, LoadError> {
    paints
        .into_iter()
        .map(|paint| {
            check_opacity(id, paint.opacity)?;
            let opacity = match paint.kind_alpha() {
                Some(alpha) => paint.opacity * alpha,
                None => paint.opacity,
            };
            let kind = match paint.kind {
                RawPaintKind::Solid { color } => {
                    check_opacity(id, color.a)?;
                    PaintKind::Solid(color.rgb())
                }
                RawPaintKind::GradientLinear { gradient_stops } => {
                    let mut stops = Vec::with_capacity(gradient_stops.len());
                    for stop in gradient_stops {
                        check_opacity(id, stop.color.a)?;
                        stops.push(GradientStop {
                            color: stop.color.rgb(),
                            alpha: stop.color.a,
                            position: stop.position,
                        });
                    }
                    PaintKind::Gradient(stops)
                }
                RawPaintKind::Image { image_ref } => PaintKind::Image { image_ref },
            };
            Ok(Paint {
                kind,
                opacity,
                visible: paint.visible,
            })
        })
        .collect()
}

impl RawPaint {
    // Solid colours may carry their own alpha; fold it into the paint opacity.
    const fn kind_alpha(&self) -> Option<f64> {
        match &self.kind {
            RawPaintKind::Solid { color } => Some(color.a),
            _ => None,
        }
    }
}

fn check_opacity(id: &str, value: f64) -> Result<(), LoadError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(LoadError::OpacityOutOfRange {
            id: id.to_string(),
            value,
        })
    }
}

fn text_data(raw: &RawNode, node_fills: &[Paint]) -> Result<TextData, LoadError> {
    let characters = raw.characters.clone().unwrap_or_default();
    let align = match raw.text_align_horizontal.as_deref() {
        Some("CENTER") => TextAlign::Center,
        Some("RIGHT") => TextAlign::Right,
        Some("JUSTIFIED") => TextAlign::Justified,
        _ => TextAlign::Left,
    };

    let base = RunStyle {
        font: raw.font_name.as_ref().map_or_else(
            || Some(FontName::new(DEFAULT_FONT_FAMILY, "Regular")),
            font_name,
        ),
        font_size: raw.font_size.unwrap_or(DEFAULT_FONT_SIZE),
        fills: node_fills.to_vec(),
        line_height: raw.line_height.map_or(LineHeight::Auto, line_height),
        decoration: decoration(raw.text_decoration.as_deref()),
        hyperlink: raw.hyperlink.clone(),
    };

    let runs = if raw.segments.is_empty() {
        if characters.is_empty() {
            Vec::new()
        } else {
            vec![base.into_run(characters.clone())]
        }
    } else {
        let chars: Vec<char> = characters.chars().collect();
        let mut runs = Vec::with_capacity(raw.segments.len());
        for segment in &raw.segments {
            if segment.start > segment.end || segment.end > chars.len() {
                return Err(LoadError::SegmentOutOfBounds {
                    id: raw.id.clone(),
                    start: segment.start,
                    end: segment.end,
                    len: chars.len(),
                });
            }
            let text: String = chars[segment.start..segment.end].iter().collect();
            let fills = match &segment.fills {
                Some(fills) => convert_paints(&raw.id, fills.clone())?,
                None => base.fills.clone(),
            };
            let style = RunStyle {
                font: segment
                    .font_name
                    .as_ref()
                    .map_or_else(|| base.font.clone(), font_name),
                font_size: segment.font_size.unwrap_or(base.font_size),
                fills,
                line_height: segment.line_height.map_or(base.line_height, line_height),
                decoration: segment
                    .text_decoration
                    .as_deref()
                    .map_or(base.decoration, |d| decoration(Some(d))),
                hyperlink: segment.hyperlink.clone().or_else(|| base.hyperlink.clone()),
            };
            runs.push(style.into_run(text));
        }
        runs
    };

    Ok(TextData {
        characters,
        runs,
        align,
    })
}

struct RunStyle {
    font: Option<FontName>,
    font_size: f64,
    fills: Vec<Paint>,
    line_height: LineHeight,
    decoration: TextDecoration,
    hyperlink: Option<String>,
}

impl RunStyle {
    fn into_run(self, characters: String) -> TextRun {
        TextRun {
            characters,
            font: self.font,
            font_size: self.font_size,
            fills: self.fills,
            line_height: self.line_height,
            decoration: self.decoration,
            hyperlink: self.hyperlink,
        }
    }
}

fn font_name(raw: &RawFont) -> Option<FontName> {
    match raw {
        RawFont::Named(name) => Some(FontName::new(name.family.clone(), name.style.clone())),
        RawFont::Mixed(RawMixed::Mixed) => None,
    }
}

const fn line_height(raw: RawLineHeight) -> LineHeight {
    match raw.unit {
        RawLineHeightUnit::Pixels => LineHeight::Pixels(raw.value),
        RawLineHeightUnit::Percent => LineHeight::Percent(raw.value),
        RawLineHeightUnit::Auto => LineHeight::Auto,
    }
}

fn decoration(raw: Option<&str>) -> TextDecoration {
    match raw {
        Some("UNDERLINE") => TextDecoration::Underline,
        Some("STRIKETHROUGH") => TextDecoration::Strikethrough,
        _ => TextDecoration::None,
    }
}
