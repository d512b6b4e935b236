//! Turning accepted elements into typed content blocks.
//!
//! Every block carries three renderings of the same captured data. For
//! structured blocks (headings, lists, tables) all three are regenerated
//! from the typed payload; paragraphs render from the sanitized element so
//! inline formatting survives in the markdown when enabled.

use scraper::ElementRef;

use harvest_core::{BlockPayload, ContentBlock, SourceReference, Verbatim};

use crate::sanitize::{clean_element_html, escape_html, extract_text, html_to_markdown};
use crate::walk::{element_path, ContentNode, NodeKind};

#[derive(Debug, Clone)]
pub struct BlockBuilder {
    preserve_formatting: bool,
}

impl BlockBuilder {
    pub fn new(preserve_formatting: bool) -> Self {
        Self {
            preserve_formatting,
        }
    }

    /// Builds the single block for one accepted element.
    pub fn build(&self, node: ContentNode<'_>, id: &str, page_url: &str) -> ContentBlock {
        let source_ref =
            SourceReference::webpage(page_url).with_selector(element_path(node.element));
        match node.kind {
            NodeKind::Heading(level) => self.heading(node.element, level, id, source_ref),
            NodeKind::Paragraph => self.paragraph(node.element, id, source_ref),
            NodeKind::List { ordered } => self.list(node.element, ordered, id, source_ref),
            NodeKind::Table => self.table(node.element, id, source_ref),
        }
    }

    fn heading(
        &self,
        element: ElementRef,
        level: u8,
        id: &str,
        source_ref: SourceReference,
    ) -> ContentBlock {
        let text = extract_text(element);
        ContentBlock {
            id: id.to_string(),
            verbatim: Verbatim,
            html_content: format!("<h{level}>{}</h{level}>", escape_html(&text)),
            markdown_content: format!("{} {text}", "#".repeat(level as usize)),
            plain_text: text.clone(),
            payload: BlockPayload::Heading { level, text },
            source_ref,
        }
    }

    fn paragraph(
        &self,
        element: ElementRef,
        id: &str,
        source_ref: SourceReference,
    ) -> ContentBlock {
        let plain = extract_text(element);
        let markdown = if self.preserve_formatting {
            html_to_markdown(&element.html())
        } else {
            plain.clone()
        };
        ContentBlock {
            id: id.to_string(),
            payload: BlockPayload::Paragraph,
            verbatim: Verbatim,
            html_content: clean_element_html(element),
            markdown_content: markdown,
            plain_text: plain,
            source_ref,
        }
    }

    fn list(
        &self,
        element: ElementRef,
        ordered: bool,
        id: &str,
        source_ref: SourceReference,
    ) -> ContentBlock {
        let items: Vec<String> = child_elements(element, "li")
            .into_iter()
            .map(|li| extract_text(li))
            .filter(|text| !text.is_empty())
            .collect();

        let tag = if ordered { "ol" } else { "ul" };
        let mut html = format!("<{tag}>");
        for item in &items {
            html.push_str("<li>");
            html.push_str(&escape_html(item));
            html.push_str("</li>");
        }
        html.push_str(&format!("</{tag}>"));

        let markdown = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                if ordered {
                    format!("{}. {item}", i + 1)
                } else {
                    format!("- {item}")
                }
            })
            .collect::<Vec<_>>()
            .join("\n");
        let plain = items.join("\n");

        ContentBlock {
            id: id.to_string(),
            payload: BlockPayload::List { ordered, items },
            verbatim: Verbatim,
            html_content: html,
            markdown_content: markdown,
            plain_text: plain,
            source_ref,
        }
    }

    fn table(&self, element: ElementRef, id: &str, source_ref: SourceReference) -> ContentBlock {
        let caption = child_elements(element, "caption")
            .into_iter()
            .next()
            .map(|c| extract_text(c))
            .filter(|text| !text.is_empty());

        let mut columns: Vec<String> = Vec::new();
        let mut rows: Vec<Vec<String>> = Vec::new();
        for (index, row) in table_rows(element).into_iter().enumerate() {
            let cells = row_cells(row);
            let texts: Vec<String> = cells.iter().map(|cell| extract_text(*cell)).collect();
            let in_thead = row
                .parent()
                .and_then(ElementRef::wrap)
                .map(|p| p.value().name() == "thead")
                .unwrap_or(false);
            let all_header_cells =
                !cells.is_empty() && cells.iter().all(|cell| cell.value().name() == "th");

            if columns.is_empty() && rows.is_empty() && (in_thead || (index == 0 && all_header_cells))
            {
                columns = texts;
            } else if texts.iter().any(|text| !text.is_empty()) {
                // Rows of nothing but empty cells carry no content.
                rows.push(texts);
            }
        }
        if columns.is_empty() {
            let width = rows.iter().map(Vec::len).max().unwrap_or(0);
            columns = (1..=width).map(|i| format!("Column {i}")).collect();
        }

        let payload = BlockPayload::Table {
            columns: columns.clone(),
            rows: rows.clone(),
            caption: caption.clone(),
        };
        let padded = payload.padded_rows().unwrap_or_default();

        ContentBlock {
            id: id.to_string(),
            verbatim: Verbatim,
            html_content: table_html(&columns, &rows, caption.as_deref()),
            markdown_content: table_markdown(&columns, &padded, caption.as_deref()),
            plain_text: table_plain(&columns, &padded, caption.as_deref()),
            payload,
            source_ref,
        }
    }
}

/// Direct element children with the given tag name.
fn child_elements<'a>(element: ElementRef<'a>, tag: &str) -> Vec<ElementRef<'a>> {
    element
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|child| child.value().name() == tag)
        .collect()
}

/// The table's rows in document order, looking through thead/tbody/tfoot.
fn table_rows(table: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let mut rows = Vec::new();
    for child in table.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => rows.extend(child_elements(child, "tr")),
            _ => {}
        }
    }
    rows
}

fn row_cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|cell| matches!(cell.value().name(), "td" | "th"))
        .collect()
}

fn table_html(columns: &[String], rows: &[Vec<String>], caption: Option<&str>) -> String {
    let mut html = String::from("<table>");
    if let Some(caption) = caption {
        html.push_str("<caption>");
        html.push_str(&escape_html(caption));
        html.push_str("</caption>");
    }
    html.push_str("<thead><tr>");
    for column in columns {
        html.push_str("<th>");
        html.push_str(&escape_html(column));
        html.push_str("</th>");
    }
    html.push_str("</tr></thead><tbody>");
    for row in rows {
        html.push_str("<tr>");
        for cell in row {
            html.push_str("<td>");
            html.push_str(&escape_html(cell));
            html.push_str("</td>");
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
    html
}

fn table_markdown(columns: &[String], padded_rows: &[Vec<String>], caption: Option<&str>) -> String {
    if columns.is_empty() {
        return caption.unwrap_or_default().to_string();
    }
    let mut lines = Vec::new();
    if let Some(caption) = caption {
        lines.push(caption.to_string());
    }
    lines.push(format!("| {} |", join_cells(columns)));
    lines.push(format!(
        "| {} |",
        columns.iter().map(|_| "---").collect::<Vec<_>>().join(" | ")
    ));
    for row in padded_rows {
        lines.push(format!("| {} |", join_cells(row)));
    }
    lines.join("\n")
}

fn table_plain(columns: &[String], padded_rows: &[Vec<String>], caption: Option<&str>) -> String {
    let mut lines = Vec::new();
    if let Some(caption) = caption {
        lines.push(caption.to_string());
    }
    if !columns.is_empty() {
        lines.push(columns.join(" | "));
    }
    for row in padded_rows {
        lines.push(row.join(" | "));
    }
    lines.join("\n")
}

/// Joins cells for a markdown table row, escaping pipes inside cells.
fn join_cells(cells: &[String]) -> String {
    cells
        .iter()
        .map(|cell| cell.replace('|', "\\|"))
        .collect::<Vec<_>>()
        .join(" | ")
}
