//! Core design tree types.

use std::ops::Index;

/// Non-owning handle to a node stored in a [`DesignTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(usize);

impl NodeHandle {
    /// Position of the node inside the tree arena.
    pub const fn index(self) -> usize {
        self.0
    }
}

/// An RGB colour with channels in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Self { r, g, b }
    }
}

/// Position and size in the coordinate space shared with siblings.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Geometry {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub color: Rgb,
    /// The stop's own alpha, applied on top of the paint opacity.
    pub alpha: f64,
    pub position: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaintKind {
    Solid(Rgb),
    Gradient(Vec<GradientStop>),
    Image { image_ref: Option<String> },
}

/// A fill or stroke entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Paint {
    pub kind: PaintKind,
    pub opacity: f64,
    pub visible: bool,
}

impl Paint {
    pub const fn solid(color: Rgb) -> Self {
        Self {
            kind: PaintKind::Solid(color),
            opacity: 1.0,
            visible: true,
        }
    }

    pub fn image(image_ref: impl Into<String>) -> Self {
        Self {
            kind: PaintKind::Image {
                image_ref: Some(image_ref.into()),
            },
            opacity: 1.0,
            visible: true,
        }
    }

    pub fn gradient(stops: Vec<GradientStop>) -> Self {
        Self {
            kind: PaintKind::Gradient(stops),
            opacity: 1.0,
            visible: true,
        }
    }

    #[must_use]
    pub const fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub const fn is_image(&self) -> bool {
        matches!(self.kind, PaintKind::Image { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LayoutMode {
    #[default]
    None,
    Vertical,
    Horizontal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PrimaryAlign {
    #[default]
    Start,
    Center,
    End,
    SpaceBetween,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CounterAlign {
    #[default]
    Start,
    Center,
    End,
    Baseline,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Padding {
    pub const fn uniform(value: f64) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn is_zero(&self) -> bool {
        self.top <= 0.0 && self.right <= 0.0 && self.bottom <= 0.0 && self.left <= 0.0
    }
}

/// Auto-layout rules of a container.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LayoutContext {
    pub mode: LayoutMode,
    pub padding: Padding,
    pub item_spacing: f64,
    pub primary_align: PrimaryAlign,
    pub counter_align: CounterAlign,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Frame,
    Group,
    Component,
    Instance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Vector,
    Line,
}

/// Font identity of a text run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontName {
    pub family: String,
    pub style: String,
}

impl FontName {
    pub fn new(family: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            style: style.into(),
        }
    }

    pub fn is_bold(&self) -> bool {
        self.style.to_ascii_lowercase().contains("bold")
    }

    pub fn is_italic(&self) -> bool {
        self.style.to_ascii_lowercase().contains("italic")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum LineHeight {
    #[default]
    Auto,
    Pixels(f64),
    Percent(f64),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextDecoration {
    #[default]
    None,
    Underline,
    Strikethrough,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
    Justified,
}

impl TextAlign {
    pub const fn as_css(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Center => "center",
            Self::Right => "right",
            Self::Justified => "justify",
        }
    }
}

/// A style-homogeneous range of text, as segmented by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub characters: String,
    /// `None` when the range mixes several fonts.
    pub font: Option<FontName>,
    pub font_size: f64,
    pub fills: Vec<Paint>,
    pub line_height: LineHeight,
    pub decoration: TextDecoration,
    pub hyperlink: Option<String>,
}

impl TextRun {
    pub fn new(characters: impl Into<String>, font: FontName, font_size: f64) -> Self {
        Self {
            characters: characters.into(),
            font: Some(font),
            font_size,
            fills: vec![Paint::solid(Rgb::BLACK)],
            line_height: LineHeight::Auto,
            decoration: TextDecoration::None,
            hyperlink: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextData {
    pub characters: String,
    pub runs: Vec<TextRun>,
    pub align: TextAlign,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContainerData {
    pub kind: ContainerKind,
    pub layout: LayoutContext,
    pub corner_radius: Option<f64>,
    pub children: Vec<NodeHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeData {
    pub kind: ShapeKind,
    pub corner_radius: Option<f64>,
}

/// Kind-specific payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Container(ContainerData),
    Shape(ShapeData),
    Text(TextData),
    /// A node type the renderer has no strategy for; the host's type name.
    Unsupported(String),
}

/// A node of the visual tree.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignNode {
    /// Host identity, used for CTA confirmation and selection.
    pub id: String,
    pub name: String,
    pub geometry: Geometry,
    pub visible: bool,
    pub fills: Vec<Paint>,
    pub strokes: Vec<Paint>,
    pub stroke_weight: f64,
    pub parent: Option<NodeHandle>,
    pub data: NodeData,
}

impl DesignNode {
    fn with_data(id: impl Into<String>, geometry: Geometry, data: NodeData) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            geometry,
            visible: true,
            fills: Vec::new(),
            strokes: Vec::new(),
            stroke_weight: 1.0,
            parent: None,
            data,
        }
    }

    pub fn container(id: impl Into<String>, kind: ContainerKind, geometry: Geometry) -> Self {
        Self::with_data(
            id,
            geometry,
            NodeData::Container(ContainerData {
                kind,
                layout: LayoutContext::default(),
                corner_radius: None,
                children: Vec::new(),
            }),
        )
    }

    pub fn frame(id: impl Into<String>, geometry: Geometry) -> Self {
        Self::container(id, ContainerKind::Frame, geometry)
    }

    pub fn shape(id: impl Into<String>, kind: ShapeKind, geometry: Geometry) -> Self {
        Self::with_data(
            id,
            geometry,
            NodeData::Shape(ShapeData {
                kind,
                corner_radius: None,
            }),
        )
    }

    pub fn rectangle(id: impl Into<String>, geometry: Geometry) -> Self {
        Self::shape(id, ShapeKind::Rectangle, geometry)
    }

    /// A text node with a single run in the default body font.
    pub fn text(id: impl Into<String>, geometry: Geometry, characters: &str) -> Self {
        let run = TextRun::new(characters, FontName::new("Inter", "Regular"), 16.0);
        Self::text_runs(id, geometry, vec![run])
    }

    pub fn text_runs(id: impl Into<String>, geometry: Geometry, runs: Vec<TextRun>) -> Self {
        let characters = runs.iter().map(|run| run.characters.as_str()).collect();
        Self::with_data(
            id,
            geometry,
            NodeData::Text(TextData {
                characters,
                runs,
                align: TextAlign::Left,
            }),
        )
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    #[must_use]
    pub fn with_fills(mut self, fills: Vec<Paint>) -> Self {
        self.fills = fills;
        self
    }

    #[must_use]
    pub fn with_strokes(mut self, strokes: Vec<Paint>, weight: f64) -> Self {
        self.strokes = strokes;
        self.stroke_weight = weight;
        self
    }

    #[must_use]
    pub const fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Set the auto-layout rules. No effect on non-containers.
    #[must_use]
    pub fn with_layout(mut self, layout: LayoutContext) -> Self {
        if let NodeData::Container(data) = &mut self.data {
            data.layout = layout;
        }
        self
    }

    #[must_use]
    pub fn with_corner_radius(mut self, radius: f64) -> Self {
        match &mut self.data {
            NodeData::Container(data) => data.corner_radius = Some(radius),
            NodeData::Shape(data) => data.corner_radius = Some(radius),
            NodeData::Text(_) | NodeData::Unsupported(_) => {}
        }
        self
    }

    /// Set the horizontal alignment. No effect on non-text nodes.
    #[must_use]
    pub fn with_text_align(mut self, align: TextAlign) -> Self {
        if let NodeData::Text(data) = &mut self.data {
            data.align = align;
        }
        self
    }

    pub fn children(&self) -> &[NodeHandle] {
        match &self.data {
            NodeData::Container(data) => &data.children,
            _ => &[],
        }
    }

    pub const fn is_text(&self) -> bool {
        matches!(self.data, NodeData::Text(_))
    }

    pub const fn text_data(&self) -> Option<&TextData> {
        match &self.data {
            NodeData::Text(data) => Some(data),
            _ => None,
        }
    }

    pub const fn shape_kind(&self) -> Option<ShapeKind> {
        match &self.data {
            NodeData::Shape(data) => Some(data.kind),
            _ => None,
        }
    }

    pub const fn corner_radius(&self) -> Option<f64> {
        match &self.data {
            NodeData::Container(data) => data.corner_radius,
            NodeData::Shape(data) => data.corner_radius,
            NodeData::Text(_) | NodeData::Unsupported(_) => None,
        }
    }

    /// First visible image reference among the fills.
    pub fn image_ref(&self) -> Option<&str> {
        self.fills
            .iter()
            .filter(|paint| paint.visible)
            .find_map(|paint| match &paint.kind {
                PaintKind::Image { image_ref } => image_ref.as_deref(),
                _ => None,
            })
    }
}

/// Arena owning every node of a design export.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesignTree {
    nodes: Vec<DesignNode>,
    roots: Vec<NodeHandle>,
}

impl DesignTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a top-level node.
    pub fn add_root(&mut self, mut node: DesignNode) -> NodeHandle {
        node.parent = None;
        let handle = self.push(node);
        self.roots.push(handle);
        handle
    }

    /// Append `node` as the last child of `parent`.
    ///
    /// Non-container parents cannot own children; the node is then stored
    /// detached so the handle stays valid but never renders.
    pub fn add_child(&mut self, parent: NodeHandle, mut node: DesignNode) -> NodeHandle {
        node.parent = Some(parent);
        let handle = self.push(node);
        if let Some(NodeData::Container(data)) = self.nodes.get_mut(parent.0).map(|p| &mut p.data)
        {
            data.children.push(handle);
        }
        handle
    }

    fn push(&mut self, node: DesignNode) -> NodeHandle {
        self.nodes.push(node);
        NodeHandle(self.nodes.len() - 1)
    }

    pub fn get(&self, handle: NodeHandle) -> Option<&DesignNode> {
        self.nodes.get(handle.0)
    }

    pub fn roots(&self) -> &[NodeHandle] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.get(handle).and_then(|node| node.parent)
    }

    /// Ancestors from the direct parent outward to the root.
    pub fn ancestors(&self, handle: NodeHandle) -> impl Iterator<Item = NodeHandle> + '_ {
        std::iter::successors(self.parent(handle), |h| self.parent(*h))
    }

    /// Children that take part in rendering, in declaration order.
    pub fn visible_children(&self, handle: NodeHandle) -> Vec<NodeHandle> {
        self.get(handle)
            .map(|node| {
                node.children()
                    .iter()
                    .copied()
                    .filter(|child| self[*child].visible)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn find_by_id(&self, id: &str) -> Option<NodeHandle> {
        self.nodes
            .iter()
            .position(|node| node.id == id)
            .map(NodeHandle)
    }
}

impl Index<NodeHandle> for DesignTree {
    type Output = DesignNode;

    fn index(&self, handle: NodeHandle) -> &Self::Output {
        &self.nodes[handle.0]
    }
}
