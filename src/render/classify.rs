//! Rendering strategy selection.
//!
//! Classification returns the typed child handles a strategy depends on, so
//! the bullet and button paths never index children by position.

use std::collections::HashSet;

use crate::design::{DesignTree, LayoutMode, NodeData, NodeHandle, ShapeKind};
use crate::host::CtaCandidate;

/// Glyphs recognised as list bullets, with their HTML entities.
const BULLET_ENTITIES: &[(char, &str)] = &[('•', "&bull;"), ('*', "&#42;"), ('-', "&#45;")];

/// Named entity for a recognised bullet glyph.
pub fn bullet_entity(glyph: char) -> Option<&'static str> {
    BULLET_ENTITIES
        .iter()
        .find(|(candidate, _)| *candidate == glyph)
        .map(|(_, entity)| *entity)
}

/// The bullet glyph if `text` trims to exactly one recognised character.
pub fn single_bullet(text: &str) -> Option<char> {
    let mut chars = text.trim().chars();
    let first = chars.next()?;
    (chars.next().is_none() && bullet_entity(first).is_some()).then_some(first)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulletParts {
    pub glyph: NodeHandle,
    pub text: NodeHandle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CtaParts {
    pub label: NodeHandle,
    pub background: NodeHandle,
}

/// How a visible node is turned into markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    ImageLike,
    Bullet(BulletParts),
    CallToAction(CtaParts),
    Container,
    Shape,
    Text,
    Unsupported,
}

/// Pick the rendering strategy; first match wins.
pub fn classify(tree: &DesignTree, handle: NodeHandle, confirmed: &HashSet<String>) -> Strategy {
    let node = &tree[handle];
    match &node.data {
        NodeData::Container(_) => {
            if is_image_like(tree, handle) {
                Strategy::ImageLike
            } else if let Some(parts) = bullet_parts(tree, handle) {
                Strategy::Bullet(parts)
            } else if let Some(parts) = cta_parts(tree, handle)
                .filter(|_| confirmed.contains(&node.id))
            {
                Strategy::CallToAction(parts)
            } else {
                Strategy::Container
            }
        }
        NodeData::Shape(_) if is_image_like(tree, handle) => Strategy::ImageLike,
        NodeData::Shape(_) => Strategy::Shape,
        NodeData::Text(_) => Strategy::Text,
        NodeData::Unsupported(_) => Strategy::Unsupported,
    }
}

/// Nodes that can only be reproduced as a raster image.
///
/// Covers image-filled rectangles and ellipses, standalone vectors and
/// lines, and containers whose visible subtree is made only of shapes.
pub fn is_image_like(tree: &DesignTree, handle: NodeHandle) -> bool {
    let node = &tree[handle];
    match &node.data {
        NodeData::Shape(shape) => match shape.kind {
            ShapeKind::Rectangle | ShapeKind::Ellipse => {
                node.fills.iter().any(|paint| paint.visible && paint.is_image())
            }
            ShapeKind::Vector | ShapeKind::Line => true,
        },
        NodeData::Container(_) => shape_leaf_count(tree, handle).is_some_and(|count| count > 0),
        NodeData::Text(_) | NodeData::Unsupported(_) => false,
    }
}

/// Number of shape leaves under a container, or `None` if the subtree holds
/// text, unsupported nodes, or empty containers.
fn shape_leaf_count(tree: &DesignTree, handle: NodeHandle) -> Option<usize> {
    let children = tree.visible_children(handle);
    if children.is_empty() {
        return None;
    }
    let mut count = 0;
    for child in children {
        count += match &tree[child].data {
            NodeData::Shape(_) => 1,
            NodeData::Container(_) => shape_leaf_count(tree, child)?,
            NodeData::Text(_) | NodeData::Unsupported(_) => return None,
        };
    }
    Some(count)
}

/// A horizontal row of exactly two text children whose first is a single
/// bullet glyph.
pub fn bullet_parts(tree: &DesignTree, handle: NodeHandle) -> Option<BulletParts> {
    let NodeData::Container(data) = &tree[handle].data else {
        return None;
    };
    if data.layout.mode != LayoutMode::Horizontal {
        return None;
    }
    let children = tree.visible_children(handle);
    let [glyph, text] = children[..] else {
        return None;
    };
    let glyph_text = tree[glyph].text_data()?;
    tree[text].text_data()?;
    single_bullet(&glyph_text.characters)?;
    Some(BulletParts { glyph, text })
}

/// A container of exactly one text and one rectangle or ellipse, in either
/// order. Structural match only; confirmation is checked by [`classify`].
pub fn cta_parts(tree: &DesignTree, handle: NodeHandle) -> Option<CtaParts> {
    if !matches!(tree[handle].data, NodeData::Container(_)) {
        return None;
    }
    let children = tree.visible_children(handle);
    let [first, second] = children[..] else {
        return None;
    };
    let is_plate = |h: NodeHandle| {
        matches!(
            tree[h].shape_kind(),
            Some(ShapeKind::Rectangle | ShapeKind::Ellipse)
        )
    };
    if tree[first].is_text() && is_plate(second) {
        Some(CtaParts {
            label: first,
            background: second,
        })
    } else if tree[second].is_text() && is_plate(first) {
        Some(CtaParts {
            label: second,
            background: first,
        })
    } else {
        None
    }
}

/// Every button-shaped container in the visible selection, in document order.
pub fn collect_cta_candidates(tree: &DesignTree, roots: &[NodeHandle]) -> Vec<CtaCandidate> {
    let mut candidates = Vec::new();
    let mut stack: Vec<NodeHandle> = roots.iter().rev().copied().collect();
    while let Some(handle) = stack.pop() {
        let node = &tree[handle];
        if !node.visible {
            continue;
        }
        if let Some(parts) = cta_parts(tree, handle) {
            candidates.push(CtaCandidate {
                id: node.id.clone(),
                name: node.name.clone(),
                label: tree[parts.label]
                    .text_data()
                    .map(|text| text.characters.clone())
                    .unwrap_or_default(),
            });
        }
        stack.extend(node.children().iter().rev().copied());
    }
    candidates
}
