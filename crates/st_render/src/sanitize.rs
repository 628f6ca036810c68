//! Allow-list HTML sanitizer applied to rich-text output before it is
//! injected into a page.

use std::collections::{HashMap, HashSet};

use scraper::{ElementRef, Html, Node};
use tera::escape_html;

const VOID_TAGS: &[&str] = &["br", "hr", "img"];

const URL_ATTRIBUTES: &[&str] = &["href", "src"];

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto"];

#[derive(Debug, Clone)]
pub struct Sanitizer {
    tags: HashSet<&'static str>,
    attributes: HashMap<&'static str, HashSet<&'static str>>,
    generic_attributes: HashSet<&'static str>,
    /// Removed together with everything inside them.
    stripped: HashSet<&'static str>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        let tags = [
            "p", "br", "hr", "strong", "b", "em", "i", "u", "s", "a", "span", "div", "h1", "h2",
            "h3", "h4", "h5", "h6", "pre", "code", "blockquote", "ul", "ol", "li", "img",
            "figure", "figcaption",
        ]
        .into_iter()
        .collect();

        let attributes = HashMap::from([
            ("a", HashSet::from(["href", "target", "rel", "title"])),
            ("img", HashSet::from(["src", "alt", "title", "width", "height"])),
            ("div", HashSet::from(["data-oembed", "data-oembed-type"])),
        ]);

        let stripped = [
            "script", "style", "iframe", "object", "embed", "noscript", "template", "svg", "math",
            "form", "input", "button", "textarea", "select", "head", "title", "link", "meta",
            "frame", "frameset",
        ]
        .into_iter()
        .collect();

        Self {
            tags,
            attributes,
            generic_attributes: HashSet::from(["class"]),
            stripped,
        }
    }
}

/// Accepts relative references and the allowed schemes. Whitespace and
/// control characters are ignored when looking for a scheme, the way
/// browsers do.
fn is_safe_url(value: &str) -> bool {
    let compact: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();

    let scheme_end = compact.find(':');
    let path_start = compact.find(|c: char| matches!(c, '/' | '?' | '#'));
    match (scheme_end, path_start) {
        (None, _) => true,
        (Some(colon), Some(path)) if path < colon => true,
        (Some(colon), _) => ALLOWED_SCHEMES.contains(&&compact[..colon]),
    }
}

impl Sanitizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn attribute_allowed(&self, tag: &str, name: &str, value: &str) -> bool {
        let listed = self.generic_attributes.contains(name)
            || self
                .attributes
                .get(tag)
                .is_some_and(|names| names.contains(name));
        listed && (!URL_ATTRIBUTES.contains(&name) || is_safe_url(value))
    }

    pub fn clean(&self, html: &str) -> String {
        let fragment = Html::parse_fragment(html);
        let mut out = String::with_capacity(html.len());
        self.write_children(fragment.root_element(), &mut out);
        out
    }

    fn write_children(&self, element: ElementRef<'_>, out: &mut String) {
        for child in element.children() {
            match child.value() {
                Node::Text(text) => out.push_str(&escape_html(text)),
                Node::Element(_) => {
                    if let Some(child) = ElementRef::wrap(child) {
                        self.write_element(child, out);
                    }
                }
                _ => {}
            }
        }
    }

    fn write_element(&self, element: ElementRef<'_>, out: &mut String) {
        let tag = element.value().name();

        if self.stripped.contains(tag) {
            return;
        }
        if !self.tags.contains(tag) {
            self.write_children(element, out);
            return;
        }

        out.push('<');
        out.push_str(tag);
        for (name, value) in element.value().attrs() {
            if self.attribute_allowed(tag, name, value) {
                out.push_str(&format!(" {}=\"{}\"", name, escape_html(value)));
            }
        }

        if VOID_TAGS.contains(&tag) {
            out.push_str(" />");
            return;
        }
        out.push('>');
        self.write_children(element, out);
        out.push_str(&format!("</{tag}>"));
    }
}
