//! HTML for embedding the widget in a web page.
//!
//! The markup is built as an element tree from the view model, then
//! serialised. Text and attribute values are escaped on output; bubble bodies
//! are inserted as already-rendered HTML from [`Bubble::html`].

use std::fmt::Write as _;

use crate::markdown::escape_html;
use crate::view::{Bubble, WidgetView, INPUT_PLACEHOLDER};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    /// Pre-rendered, trusted HTML.
    Raw(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: &'static str,
    pub attrs: Vec<(&'static str, String)>,
    pub children: Vec<Node>,
}

const VOID_TAGS: &[&str] = &["input", "link", "br", "meta"];

impl Element {
    pub fn new(tag: &'static str) -> Self {
        Self {
            tag,
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    /// Boolean attribute, present only when `on`.
    pub fn flag(self, name: &'static str, on: bool) -> Self {
        if on {
            self.attr(name, "")
        } else {
            self
        }
    }

    pub fn class(self, class: impl Into<String>) -> Self {
        self.attr("class", class)
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children.into_iter().map(Node::Element));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn raw(mut self, html: impl Into<String>) -> Self {
        self.children.push(Node::Raw(html.into()));
        self
    }

    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Depth-first search by `id` attribute.
    pub fn find_by_id(&self, id: &str) -> Option<&Element> {
        if self.attr_value("id") == Some(id) {
            return Some(self);
        }
        self.children.iter().find_map(|child| match child {
            Node::Element(el) => el.find_by_id(id),
            _ => None,
        })
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        let _ = write!(out, "<{}", self.tag);
        for (name, value) in &self.attrs {
            if value.is_empty() {
                let _ = write!(out, " {}", name);
            } else {
                let _ = write!(out, " {}=\"{}\"", name, escape_attr(value));
            }
        }
        out.push('>');

        if VOID_TAGS.contains(&self.tag) {
            return;
        }

        for child in &self.children {
            match child {
                Node::Element(el) => el.write_html(out),
                Node::Text(text) => out.push_str(&escape_html(text)),
                Node::Raw(html) => out.push_str(html),
            }
        }
        let _ = write!(out, "</{}>", self.tag);
    }
}

fn escape_attr(value: &str) -> String {
    escape_html(value).replace('"', "&quot;")
}

/// Link element for the widget stylesheet.
pub fn stylesheet_link(href: &str) -> Element {
    Element::new("link").attr("rel", "stylesheet").attr("href", href)
}

/// Inline stylesheet, used when the stylesheet was fetched ahead of time.
pub fn inline_style(css: &str) -> Element {
    Element::new("style").raw(css.to_string())
}

fn bubble(b: &Bubble) -> Element {
    let mut body = Element::new("div").class("bubble");
    if b.placeholder {
        body = body.child(Element::new("span").class("thinking").raw(b.html()));
    } else {
        body = body.raw(b.html());
    }
    Element::new("div")
        .class(format!("message {}", b.author.class()))
        .child(body)
}

/// The whole widget: launcher button plus chat panel.
///
/// The launcher and close buttons carry `data-action="toggle"` for the host
/// page to bind to the widget's toggle instead of a global function.
pub fn widget(view: &WidgetView) -> Element {
    let input = &view.input;

    let mut input_el = Element::new("input")
        .attr("type", "text")
        .id("user-input")
        .attr("placeholder", INPUT_PLACEHOLDER)
        .attr("autocomplete", "off")
        .attr("maxlength", input.max_chars().to_string())
        .flag("disabled", !input.enabled);
    if !input.value().is_empty() {
        input_el = input_el.attr("value", input.value());
    }

    let toggler = Element::new("button")
        .class("chat-toggler")
        .attr("type", "button")
        .attr("data-action", "toggle")
        .attr("aria-label", "Abrir chat")
        .text(if view.open { "×" } else { "💬" });

    let header = Element::new("div")
        .class("chat-header")
        .child(
            Element::new("div")
                .class("header-info")
                .child(Element::new("h3").text(view.title.clone()))
                .child(Element::new("p").id("chat-status").text(view.status.clone())),
        )
        .child(
            Element::new("button")
                .class("close-btn")
                .attr("type", "button")
                .attr("data-action", "toggle")
                .text("×"),
        );

    let body = Element::new("div")
        .class("chat-body")
        .id("chat-box")
        .children(view.bubbles.iter().map(bubble));

    let footer = Element::new("div")
        .class("chat-footer")
        .child(
            Element::new("div")
                .class("input-wrapper")
                .child(input_el)
                .child(
                    Element::new("span")
                        .class("char-counter")
                        .id("char-counter")
                        .text(input.counter()),
                ),
        )
        .child(
            Element::new("button")
                .id("send-btn")
                .attr("type", "button")
                .attr("aria-label", "Enviar")
                .flag("disabled", !view.send_enabled)
                .text("➤"),
        );

    let panel = Element::new("div")
        .class("chat-widget")
        .id("chat-widget")
        .child(header)
        .child(body)
        .child(footer);

    let root_class = if view.open {
        "girasol-root show-chat"
    } else {
        "girasol-root"
    };

    Element::new("div")
        .class(root_class)
        .child(toggler)
        .child(panel)
}

/// Stylesheet element followed by the widget, ready to paste into a page.
pub fn embed(style: Element, view: &WidgetView) -> String {
    let mut out = style.to_html();
    out.push('\n');
    out.push_str(&widget(view).to_html());
    out.push('\n');
    out
}
