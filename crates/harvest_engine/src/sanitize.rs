//! HTML cleaning and the shared noise predicates.
//!
//! The walker, the block builder, and the standalone [`clean_html`] entry
//! point all agree on what counts as noise: scripting and chrome tags, plus
//! anything whose class or id looks like advertising or tracking.

use std::sync::LazyLock;

use ego_tree::NodeRef;
use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Tags whose subtrees never contain harvestable content.
pub(crate) const REJECTED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "iframe", "nav", "header", "footer", "aside",
];

/// Tags that flow inside a text run rather than forming their own block.
pub(crate) const INLINE_TAGS: &[&str] = &[
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "data", "dfn", "em", "i", "kbd", "mark",
    "q", "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var", "wbr",
];

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Text shorter than this that matches [`NAV_KEYWORDS`] is chrome.
const NAV_TEXT_MAX_CHARS: usize = 50;

/// Trimmed text shorter than this is never content.
const MIN_MEANINGFUL_CHARS: usize = 3;

/// Minimum share of alphanumeric characters for text to count as content.
const MIN_ALNUM_RATIO: f64 = 0.3;

/// Matches class/id values of advertising and tracking containers.
static AD_TRACKING_CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(^ads?$|[-_]ads?[-_]|\badvert(isement)?\b|\bsponsor(ed)?\b|\bpromo\b|\bbanner\b|track(er|ing)|analytics|doubleclick|taboola|outbrain|cookie[-_]?(banner|consent|notice))",
    )
    .expect("AD_TRACKING_CLASS regex")
});

/// Matches navigational keywords that mark short text runs as chrome.
static NAV_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(menu|navigation|login|log\s?in|sign\s?in|sign\s?up|register|search|homepage|zur startseite|skip to|cookies?|impressum|datenschutz)\b",
    )
    .expect("NAV_KEYWORDS regex")
});

/// True when the element itself marks its subtree as noise.
pub(crate) fn is_noise_element(element: ElementRef) -> bool {
    let value = element.value();
    if REJECTED_TAGS.contains(&value.name()) {
        return true;
    }
    for attr in ["class", "id"] {
        if let Some(v) = value.attr(attr) {
            if AD_TRACKING_CLASS.is_match(v) {
                return true;
            }
        }
    }
    false
}

/// Whether a text run is worth keeping as content.
///
/// A run must be at least [`MIN_MEANINGFUL_CHARS`] long and at least
/// [`MIN_ALNUM_RATIO`] alphanumeric, so decorative runs like `***` never
/// count. Short runs that read like navigation chrome ("Menu", "Login",
/// "Zur Startseite") are rejected as well; longer text passes even when it
/// mentions such words, since body prose legitimately may.
pub fn has_meaningful_content(text: &str) -> bool {
    let trimmed = text.trim();
    let total = trimmed.chars().count();
    if total < MIN_MEANINGFUL_CHARS {
        return false;
    }
    let alnum = trimmed.chars().filter(|c| c.is_alphanumeric()).count();
    if (alnum as f64) / (total as f64) < MIN_ALNUM_RATIO {
        return false;
    }
    !(total < NAV_TEXT_MAX_CHARS && NAV_KEYWORDS.is_match(trimmed))
}

/// Cleans an HTML document down to its content markup.
///
/// Drops rejected subtrees (scripts, chrome, ad containers) and comments,
/// collapses whitespace, and returns the markup of the body.
pub fn clean_html(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut writer = CleanWriter::new();

    let body = Selector::parse("body")
        .ok()
        .and_then(|sel| document.select(&sel).next());
    match body {
        Some(body) => {
            for child in body.children() {
                render_clean(child, &mut writer);
            }
        }
        None => {
            for child in document.root_element().children() {
                render_clean(child, &mut writer);
            }
        }
    }
    writer.finish()
}

/// Cleaned markup of a single element, including the element itself.
pub(crate) fn clean_element_html(element: ElementRef) -> String {
    let mut writer = CleanWriter::new();
    render_clean(*element, &mut writer);
    writer.finish()
}

fn render_clean(node: NodeRef<'_, Node>, writer: &mut CleanWriter) {
    match node.value() {
        Node::Text(text) => writer.append_text(text),
        Node::Comment(_) | Node::Doctype(_) | Node::ProcessingInstruction(_) => {}
        Node::Element(_) => {
            if let Some(element) = ElementRef::wrap(node) {
                if is_noise_element(element) {
                    return;
                }
                let tag = element.value().name();
                writer.open_tag(element);
                if !VOID_TAGS.contains(&tag) {
                    for child in node.children() {
                        render_clean(child, writer);
                    }
                    writer.close_tag(tag);
                }
            }
        }
        _ => {
            for child in node.children() {
                render_clean(child, writer);
            }
        }
    }
}

/// All text under an element, skipping noise subtrees, whitespace collapsed.
pub fn extract_text(element: ElementRef) -> String {
    let mut raw = String::new();
    push_text(element, &mut raw);
    collapse_whitespace(&raw)
}

fn push_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(value) => {
                let Some(el) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_noise_element(el) {
                    continue;
                }
                let inline = INLINE_TAGS.contains(&value.name());
                if !inline {
                    out.push(' ');
                }
                push_text(el, out);
                if !inline {
                    out.push(' ');
                }
            }
            _ => {}
        }
    }
}

/// Collapses all whitespace runs to single spaces and trims.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

/// Deterministic markdown rendering of HTML markup.
///
/// Headings, paragraphs, lists, emphasis, and links map to their markdown
/// forms; rejected subtrees are dropped; everything else contributes its
/// text. The same markup always yields the same markdown.
pub fn html_to_markdown(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut writer = MarkdownWriter::new();
    for child in document.root_element().children() {
        render_markdown(child, &mut writer);
    }
    writer.finish()
}

fn render_markdown(node: NodeRef<'_, Node>, writer: &mut MarkdownWriter) {
    match node.value() {
        Node::Text(text) => writer.append_text(text),
        Node::Element(_) => {
            if let Some(element) = ElementRef::wrap(node) {
                render_markdown_element(element, writer);
            }
        }
        _ => {
            for child in node.children() {
                render_markdown(child, writer);
            }
        }
    }
}

fn render_markdown_element(element: ElementRef, writer: &mut MarkdownWriter) {
    if is_noise_element(element) {
        return;
    }
    let tag = element.value().name();
    match tag {
        "a" => {
            let href = element
                .value()
                .attr("href")
                .map(str::trim)
                .filter(|href| is_markdown_link_target(href));
            match href {
                Some(href) => {
                    writer.append_raw("[");
                    render_markdown_children(element, writer);
                    writer.append_raw("](");
                    writer.append_raw(href);
                    writer.append_raw(")");
                }
                None => render_markdown_children(element, writer),
            }
        }
        "strong" | "b" => {
            writer.append_raw("**");
            render_markdown_children(element, writer);
            writer.append_raw("**");
        }
        "em" | "i" => {
            writer.append_raw("*");
            render_markdown_children(element, writer);
            writer.append_raw("*");
        }
        "img" => {
            if let Some(alt) = element.value().attr("alt") {
                writer.append_text(alt);
            }
        }
        "br" => writer.ensure_newline(),
        "hr" => {
            writer.ensure_newline();
            writer.append_raw("---");
            writer.ensure_newline();
        }
        "li" => {
            writer.ensure_newline();
            let bullet = writer.next_bullet();
            writer.append_raw(&bullet);
            render_markdown_children(element, writer);
            writer.ensure_newline();
        }
        "ul" | "ol" => {
            writer.ensure_newline();
            writer.push_list(tag == "ol");
            render_markdown_children(element, writer);
            writer.pop_list();
            writer.ensure_newline();
        }
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = tag.as_bytes()[1] - b'0';
            writer.ensure_newline();
            for _ in 0..level {
                writer.append_raw("#");
            }
            writer.append_raw(" ");
            render_markdown_children(element, writer);
            writer.ensure_newline();
        }
        "p" | "div" | "section" | "article" | "figure" | "figcaption" | "table" | "tr"
        | "td" | "th" | "blockquote" | "address" => {
            writer.ensure_newline();
            render_markdown_children(element, writer);
            writer.ensure_newline();
        }
        _ => render_markdown_children(element, writer),
    }
}

fn render_markdown_children(element: ElementRef, writer: &mut MarkdownWriter) {
    for child in element.children() {
        render_markdown(child, writer);
    }
}

fn is_markdown_link_target(href: &str) -> bool {
    if href.is_empty() || href.starts_with('#') {
        return false;
    }
    !href.to_ascii_lowercase().starts_with("javascript:")
}

struct CleanWriter {
    out: String,
    last_was_space: bool,
}

impl CleanWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            last_was_space: false,
        }
    }

    fn append_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                if !self.last_was_space && !self.out.is_empty() {
                    self.out.push(' ');
                    self.last_was_space = true;
                }
            } else {
                match ch {
                    '&' => self.out.push_str("&amp;"),
                    '<' => self.out.push_str("&lt;"),
                    '>' => self.out.push_str("&gt;"),
                    _ => self.out.push(ch),
                }
                self.last_was_space = false;
            }
        }
    }

    fn open_tag(&mut self, element: ElementRef) {
        self.out.push('<');
        self.out.push_str(element.value().name());
        for (name, value) in element.value().attrs() {
            self.out.push(' ');
            self.out.push_str(name);
            self.out.push_str("=\"");
            self.out.push_str(&escape_attr(value));
            self.out.push('"');
        }
        self.out.push('>');
        self.last_was_space = false;
    }

    fn close_tag(&mut self, tag: &str) {
        // Trailing space inside an element is never significant.
        if self.out.ends_with(' ') {
            self.out.pop();
        }
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push('>');
        self.last_was_space = false;
    }

    fn finish(self) -> String {
        self.out.trim().to_string()
    }
}

pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

struct MarkdownWriter {
    out: String,
    last_char: Option<char>,
    // Item counter per open list; `None` marks an unordered list.
    list_stack: Vec<Option<usize>>,
}

impl MarkdownWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            last_char: None,
            list_stack: Vec::new(),
        }
    }

    fn push_list(&mut self, ordered: bool) {
        self.list_stack.push(if ordered { Some(0) } else { None });
    }

    fn pop_list(&mut self) {
        self.list_stack.pop();
    }

    /// Bullet for the next item of the innermost open list.
    ///
    /// Ordinals for an ordered list, `- ` for an unordered one and for a
    /// stray `li` outside any list.
    fn next_bullet(&mut self) -> String {
        match self.list_stack.last_mut() {
            Some(Some(n)) => {
                *n += 1;
                format!("{n}. ")
            }
            _ => "- ".to_string(),
        }
    }

    fn append_text(&mut self, text: &str) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                if self.last_char == Some(' ') || self.last_char == Some('\n') {
                    continue;
                }
                self.push_char(' ');
            } else {
                self.push_char(ch);
            }
        }
    }

    fn append_raw(&mut self, text: &str) {
        for ch in text.chars() {
            self.push_char(ch);
        }
    }

    fn ensure_newline(&mut self) {
        if self.last_char == Some('\n') || self.out.is_empty() {
            return;
        }
        self.push_char('\n');
    }

    fn push_char(&mut self, ch: char) {
        self.out.push(ch);
        self.last_char = Some(ch);
    }

    fn finish(self) -> String {
        self.out.trim().to_string()
    }
}
