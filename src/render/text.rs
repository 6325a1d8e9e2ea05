//! Styled text runs.

use tracing::debug;

use super::classify::{bullet_entity, single_bullet};
use super::color;
use super::layout::style_attr;
use super::style::{self, StyleBuilder};
use super::{RenderContext, TABLE_RESET};
use crate::design::{DesignNode, LineHeight, Rgb, TextAlign, TextDecoration, TextRun};

/// Web-safe families appended after every design font.
pub const FALLBACK_FONTS: &str = "Arial, Helvetica, sans-serif";

/// Rendered text of one node, ready to be placed in a table cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub align: TextAlign,
    /// Run style hoisted onto the cell when the node has a single run.
    pub style: String,
    pub content: String,
}

impl TextBlock {
    /// A `<td>` carrying the alignment both as attribute and as style.
    pub fn cell(&self, attrs: &str) -> String {
        let align = self.align.as_css();
        let mut style = StyleBuilder::new();
        style.push("text-align", align).extend_raw(&self.style);
        format!(
            "<td{attrs} align=\"{align}\"{style}>{content}</td>",
            style = style_attr(&style.build()),
            content = self.content,
        )
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

struct StyledRun {
    style: String,
    href: Option<String>,
    html: String,
}

/// Render the runs of a text node against `background`.
///
/// Runs without a single font identity are dropped. Adjacent runs that end
/// up with the same style and link are merged, so a node whose runs all
/// match is emitted as a single run. Returns `None` for non-text nodes.
pub fn render_block(node: &DesignNode, background: Rgb, with_links: bool) -> Option<TextBlock> {
    let data = node.text_data()?;
    let mut runs: Vec<StyledRun> = Vec::new();
    for run in &data.runs {
        if run.font.is_none() {
            debug!(id = %node.id, "skipping text run with mixed fonts");
            continue;
        }
        let styled = StyledRun {
            style: run_style(run, background),
            href: run.hyperlink.clone().filter(|_| with_links),
            html: run_html(&run.characters),
        };
        match runs.last_mut() {
            Some(last) if last.style == styled.style && last.href == styled.href => {
                last.html.push_str(&styled.html);
            }
            _ => runs.push(styled),
        }
    }

    let (style, content) = match runs.as_slice() {
        [] => (String::new(), String::new()),
        [single] => (
            single.style.clone(),
            linked(single.href.as_deref(), &single.style, &single.html),
        ),
        _ => {
            let content = runs
                .iter()
                .map(|run| match run.href.as_deref() {
                    Some(href) => linked(Some(href), &run.style, &run.html),
                    None => format!("<span{}>{}</span>", style_attr(&run.style), run.html),
                })
                .collect();
            (String::new(), content)
        }
    };
    Some(TextBlock {
        align: data.align,
        style,
        content,
    })
}

/// A text node as a single-cell table.
pub fn render_text(node: &DesignNode, ctx: RenderContext) -> String {
    match render_block(node, ctx.background, true) {
        Some(block) if !block.is_empty() => format!(
            "<table role=\"presentation\" width=\"100%\" {TABLE_RESET}><tr>{}</tr></table>",
            block.cell("")
        ),
        _ => String::new(),
    }
}

fn run_style(run: &TextRun, background: Rgb) -> String {
    let mut style = StyleBuilder::new();
    if let Some(font) = &run.font {
        style
            .push("font-family", format!("'{}', {FALLBACK_FONTS}", font.family))
            .push("font-size", format!("{}px", style::number(run.font_size)))
            .push("font-weight", if font.is_bold() { 700 } else { 400 });
        if font.is_italic() {
            style.push("font-style", "italic");
        }
    }
    style.push_opt(
        "color",
        color::resolve_paints(&run.fills, background).hex,
    );
    match run.line_height {
        LineHeight::Pixels(value) => {
            style.push("line-height", format!("{}px", value.round()));
        }
        LineHeight::Percent(value) => {
            style.push("line-height", format!("{}%", value.round()));
        }
        LineHeight::Auto => {}
    }
    match run.decoration {
        TextDecoration::Underline => {
            style.push("text-decoration", "underline");
        }
        TextDecoration::Strikethrough => {
            style.push("text-decoration", "line-through");
        }
        TextDecoration::None => {}
    }
    style.build()
}

fn run_html(characters: &str) -> String {
    match single_bullet(characters).and_then(bullet_entity) {
        Some(entity) => entity.to_string(),
        None => escape_html(characters),
    }
}

fn linked(href: Option<&str>, style: &str, html: &str) -> String {
    match href {
        Some(href) => format!(
            "<a href=\"{}\" target=\"_blank\"{}>{html}</a>",
            escape_attr(href),
            style_attr(style)
        ),
        None => html.to_string(),
    }
}

/// Escape markup characters and turn line breaks into `<br>`.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
                out.push_str("<br>");
            }
            '\n' | '\u{2028}' => out.push_str("<br>"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape a value for a double-quoted attribute.
pub fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{FontName, Geometry, Paint};

    fn inter(style: &str) -> FontName {
        FontName::new("Inter", style)
    }

    fn node(runs: Vec<TextRun>) -> DesignNode {
        DesignNode::text_runs("t", Geometry::new(0.0, 0.0, 200.0, 20.0), runs)
    }

    #[test]
    fn test_single_run_styles_the_cell() {
        let block = render_block(
            &DesignNode::text("t", Geometry::default(), "Hello"),
            Rgb::WHITE,
            true,
        )
        .unwrap();
        assert_eq!(block.content, "Hello");
        assert!(block.style.contains("font-size:16px"), "{}", block.style);
        assert!(block.style.contains("color:#000000"), "{}", block.style);
        let cell = block.cell("");
        assert!(cell.starts_with("<td align=\"left\" style=\"text-align:left;"), "{cell}");
    }

    #[test]
    fn test_multiple_runs_become_spans() {
        let runs = vec![
            TextRun::new("Bold ", inter("Bold"), 14.0),
            TextRun::new("plain", inter("Regular"), 14.0),
        ];
        let block = render_block(&node(runs), Rgb::WHITE, true).unwrap();
        assert!(block.style.is_empty());
        assert_eq!(block.content.matches("<span").count(), 2, "{}", block.content);
        assert!(block.content.contains("font-weight:700"));
        assert!(block.content.contains("font-weight:400"));
    }

    #[test]
    fn test_identical_adjacent_runs_merge() {
        let runs = vec![
            TextRun::new("one ", inter("Regular"), 14.0),
            TextRun::new("two", inter("Regular"), 14.0),
        ];
        let block = render_block(&node(runs), Rgb::WHITE, true).unwrap();
        assert_eq!(block.content, "one two");
        assert!(!block.style.is_empty());
    }

    #[test]
    fn test_mixed_font_run_is_skipped() {
        let mut mixed = TextRun::new("???", inter("Regular"), 14.0);
        mixed.font = None;
        let runs = vec![mixed, TextRun::new("kept", inter("Italic"), 14.0)];
        let block = render_block(&node(runs), Rgb::WHITE, true).unwrap();
        assert_eq!(block.content, "kept");
        assert!(block.style.contains("font-style:italic"));
    }

    #[test]
    fn test_line_height_and_decoration() {
        let mut px_run = TextRun::new("a", inter("Regular"), 14.0);
        px_run.line_height = LineHeight::Pixels(20.4);
        px_run.decoration = TextDecoration::Underline;
        let mut pct_run = TextRun::new("b", inter("Regular"), 14.0);
        pct_run.line_height = LineHeight::Percent(149.6);
        pct_run.decoration = TextDecoration::Strikethrough;
        let block = render_block(&node(vec![px_run, pct_run]), Rgb::WHITE, true).unwrap();
        assert!(block.content.contains("line-height:20px;text-decoration:underline"));
        assert!(block.content.contains("line-height:150%;text-decoration:line-through"));
    }

    #[test]
    fn test_translucent_text_composites_on_background() {
        let mut run = TextRun::new("x", inter("Regular"), 12.0);
        run.fills = vec![Paint::solid(Rgb::new(1.0, 0.0, 0.0)).with_opacity(0.5)];
        let block = render_block(&node(vec![run]), Rgb::new(0.0, 0.0, 1.0), true).unwrap();
        assert!(block.style.contains("color:#7f007f"), "{}", block.style);
    }

    #[test]
    fn test_font_fallbacks_are_deduplicated() {
        let run = TextRun::new("x", FontName::new("Arial", "Regular"), 12.0);
        let block = render_block(&node(vec![run]), Rgb::WHITE, true).unwrap();
        assert!(
            block.style.contains("font-family:'Arial', Helvetica, sans-serif"),
            "{}",
            block.style
        );
    }

    #[test]
    fn test_bullet_run_maps_to_entity() {
        let block = render_block(
            &DesignNode::text("g", Geometry::default(), " • "),
            Rgb::WHITE,
            true,
        )
        .unwrap();
        assert_eq!(block.content, "&bull;");
    }

    #[test]
    fn test_escaping_and_line_breaks() {
        assert_eq!(
            escape_html("a < b && c > d\nnext\r\nlast\u{2028}end"),
            "a &lt; b &amp;&amp; c &gt; d<br>next<br>last<br>end"
        );
        assert_eq!(escape_attr("say \"hi\" & <go>"), "say &quot;hi&quot; &amp; &lt;go&gt;");
    }

    #[test]
    fn test_hyperlink_wraps_run() {
        let mut run = TextRun::new("Read more", inter("Regular"), 14.0);
        run.hyperlink = Some("https://example.com/?a=1&b=2".to_string());
        let block = render_block(&node(vec![run.clone()]), Rgb::WHITE, true).unwrap();
        assert!(
            block
                .content
                .starts_with("<a href=\"https://example.com/?a=1&amp;b=2\" target=\"_blank\""),
            "{}",
            block.content
        );

        let plain = render_block(&node(vec![run]), Rgb::WHITE, false).unwrap();
        assert_eq!(plain.content, "Read more");
    }

    #[test]
    fn test_empty_text_renders_nothing() {
        let node = DesignNode::text("t", Geometry::default(), "");
        let ctx = RenderContext::root(Rgb::WHITE, 600.0, super::super::ImageExportMode::Placeholder);
        assert_eq!(render_text(&node, ctx), "");
    }

    #[test]
    fn test_alignment_is_attribute_and_style() {
        let node = DesignNode::text("t", Geometry::default(), "Hi").with_text_align(TextAlign::Center);
        let ctx = RenderContext::root(Rgb::WHITE, 600.0, super::super::ImageExportMode::Placeholder);
        let html = render_text(&node, ctx);
        assert!(html.contains("align=\"center\""), "{html}");
        assert!(html.contains("text-align:center"), "{html}");
    }
}
