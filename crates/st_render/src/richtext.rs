//! Rich-text fragments to HTML.

use st_core::types::{FragmentKind, RichTextFragment, Span, SpanKind};
use tera::escape_html;

/// Converts an ordered run of rich-text fragments into an HTML string.
/// Implementations must be pure and deterministic.
pub trait RichTextRenderer: Send + Sync {
    fn as_html(&self, fragments: &[RichTextFragment]) -> String;
}

/// Mirrors the Prismic HTML serializer for the node types the blog uses.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrismicHtmlRenderer;

impl PrismicHtmlRenderer {
    pub fn new() -> Self {
        Self
    }
}

fn list_tag(kind: FragmentKind) -> Option<&'static str> {
    match kind {
        FragmentKind::ListItem => Some("ul"),
        FragmentKind::OrderedListItem => Some("ol"),
        _ => None,
    }
}

impl RichTextRenderer for PrismicHtmlRenderer {
    fn as_html(&self, fragments: &[RichTextFragment]) -> String {
        let mut out = String::new();
        let mut open_list: Option<&'static str> = None;

        for fragment in fragments {
            let list = list_tag(fragment.kind);
            if open_list != list {
                if let Some(tag) = open_list {
                    out.push_str(&format!("</{tag}>"));
                }
                if let Some(tag) = list {
                    out.push_str(&format!("<{tag}>"));
                }
                open_list = list;
            }
            render_fragment(fragment, &mut out);
        }

        if let Some(tag) = open_list {
            out.push_str(&format!("</{tag}>"));
        }
        out
    }
}

fn render_fragment(fragment: &RichTextFragment, out: &mut String) {
    let wrap = |tag: &str, out: &mut String| {
        out.push_str(&format!("<{tag}>"));
        out.push_str(&render_spans(&fragment.text, &fragment.spans));
        out.push_str(&format!("</{tag}>"));
    };

    match fragment.kind {
        FragmentKind::Paragraph => wrap("p", out),
        FragmentKind::Heading1 => wrap("h1", out),
        FragmentKind::Heading2 => wrap("h2", out),
        FragmentKind::Heading3 => wrap("h3", out),
        FragmentKind::Heading4 => wrap("h4", out),
        FragmentKind::Heading5 => wrap("h5", out),
        FragmentKind::Heading6 => wrap("h6", out),
        FragmentKind::Preformatted => wrap("pre", out),
        FragmentKind::ListItem | FragmentKind::OrderedListItem => wrap("li", out),
        FragmentKind::Image => {
            if let Some(url) = &fragment.url {
                out.push_str(&format!(
                    "<p class=\"block-img\"><img src=\"{}\" alt=\"{}\" /></p>",
                    escape_html(url),
                    escape_html(fragment.alt.as_deref().unwrap_or_default())
                ));
            }
        }
        FragmentKind::Embed => {
            if let Some(oembed) = &fragment.oembed {
                let embed_url = oembed.get("embed_url").and_then(|v| v.as_str()).unwrap_or_default();
                let embed_type = oembed.get("type").and_then(|v| v.as_str()).unwrap_or_default();
                let html = oembed.get("html").and_then(|v| v.as_str()).unwrap_or_default();
                out.push_str(&format!(
                    "<div data-oembed=\"{}\" data-oembed-type=\"{}\">{}</div>",
                    escape_html(embed_url),
                    escape_html(embed_type),
                    html
                ));
            }
        }
        FragmentKind::Unknown => {}
    }
}

fn open_tag(span: &Span) -> String {
    match span.kind {
        SpanKind::Strong => "<strong>".to_string(),
        SpanKind::Em => "<em>".to_string(),
        SpanKind::Hyperlink => {
            let data = span.data.as_ref();
            let url = data.and_then(|d| d.url.as_deref()).unwrap_or_default();
            match data.and_then(|d| d.target.as_deref()) {
                Some(target) => format!(
                    "<a href=\"{}\" target=\"{}\" rel=\"noopener noreferrer\">",
                    escape_html(url),
                    escape_html(target)
                ),
                None => format!("<a href=\"{}\">", escape_html(url)),
            }
        }
        SpanKind::Label => {
            let label = span
                .data
                .as_ref()
                .and_then(|d| d.label.as_deref())
                .unwrap_or_default();
            format!("<span class=\"{}\">", escape_html(label))
        }
        SpanKind::Unknown => String::new(),
    }
}

fn close_tag(kind: SpanKind) -> &'static str {
    match kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink => "</a>",
        SpanKind::Label => "</span>",
        SpanKind::Unknown => "",
    }
}

fn escape_text(text: &str) -> String {
    escape_html(text).replace('\n', "<br />")
}

/// Applies spans by cutting the text at every span boundary and wrapping each
/// segment in the spans that cover it. Offsets count characters.
fn render_spans(text: &str, spans: &[Span]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let spans: Vec<&Span> = spans
        .iter()
        .filter(|s| s.start < s.end && s.start < len && s.kind != SpanKind::Unknown)
        .collect();

    if spans.is_empty() {
        return escape_text(text);
    }

    let mut cuts: Vec<usize> = vec![0, len];
    for span in &spans {
        cuts.push(span.start);
        cuts.push(span.end.min(len));
    }
    cuts.sort_unstable();
    cuts.dedup();

    let mut out = String::new();
    for window in cuts.windows(2) {
        let (from, to) = (window[0], window[1]);
        let segment: String = chars[from..to].iter().collect();
        let covering: Vec<&&Span> = spans
            .iter()
            .filter(|s| s.start <= from && s.end.min(len) >= to)
            .collect();

        for span in &covering {
            out.push_str(&open_tag(span));
        }
        out.push_str(&escape_text(&segment));
        for span in covering.iter().rev() {
            out.push_str(close_tag(span.kind));
        }
    }
    out
}
