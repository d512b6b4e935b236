use pretty_assertions::assert_eq;
use scraper::Html;

use harvest_core::BlockPayload;
use harvest_engine::{
    clean_html, collect_content_nodes, extract_text, has_meaningful_content, html_to_markdown,
    select_primary_container, BlockBuilder, NodeKind, WalkOptions,
};

fn kinds_of(html: &str, options: WalkOptions) -> Vec<NodeKind> {
    let document = Html::parse_document(html);
    let container = select_primary_container(&document);
    collect_content_nodes(container, options)
        .into_iter()
        .map(|node| node.kind)
        .collect()
}

#[test]
fn clean_html_strips_scripts_chrome_and_ads() {
    let html = r#"<html><body>
        <nav>Menu</nav>
        <script>var x = 1;</script>
        <!-- tracking pixel -->
        <div class="ad-banner">Buy now</div>
        <p>Der Rat tagt <strong>heute</strong>.</p>
        <footer>Impressum</footer>
    </body></html>"#;
    assert_eq!(clean_html(html), "<p>Der Rat tagt <strong>heute</strong>.</p>");
}

#[test]
fn extract_text_collapses_whitespace_and_skips_noise() {
    let document = Html::parse_document(
        "<html><body><p>Ein   Text\n mit <span>Abständen</span><script>x()</script></p></body></html>",
    );
    let container = select_primary_container(&document);
    let nodes = collect_content_nodes(container, WalkOptions::default());
    assert_eq!(nodes.len(), 1);
    assert_eq!(extract_text(nodes[0].element), "Ein Text mit Abständen");
}

#[test]
fn meaningful_content_rejects_short_chrome_text() {
    assert!(!has_meaningful_content(""));
    assert!(!has_meaningful_content("   "));
    assert!(!has_meaningful_content("ab"));
    assert!(!has_meaningful_content("Menu"));
    assert!(!has_meaningful_content("Zur Startseite"));
    assert!(has_meaningful_content("Der Rat beschloss die Vorlage."));
    assert!(has_meaningful_content(
        "Nach dem Login in das Ratsinformationssystem stehen alle Sitzungsunterlagen bereit."
    ));
}

#[test]
fn meaningful_content_rejects_symbol_runs() {
    assert!(!has_meaningful_content("***!!!***"));
    assert!(!has_meaningful_content("- - - - -"));
    assert!(!has_meaningful_content(">>> | <<<"));
    // A single letter among fourteen symbols is below the ratio cutoff.
    assert!(!has_meaningful_content("* a * * * * * *"));
    assert!(has_meaningful_content("TOP 1: Begrüßung"));
}

#[test]
fn markdown_maps_headings_emphasis_and_links() {
    let html = "<h2>Termine</h2><p>Alle <strong>wichtigen</strong> Termine als \
                <a href=\"/kalender.pdf\">PDF</a>.</p>";
    assert_eq!(
        html_to_markdown(html),
        "## Termine\nAlle **wichtigen** Termine als [PDF](/kalender.pdf)."
    );
}

#[test]
fn markdown_numbers_ordered_lists() {
    assert_eq!(
        html_to_markdown("<ol><li>Eröffnung</li><li>Haushalt</li></ol>"),
        "1. Eröffnung\n2. Haushalt"
    );
    assert_eq!(
        html_to_markdown("<ul><li>Anlage A</li><li>Anlage B</li></ul>"),
        "- Anlage A\n- Anlage B"
    );
    // Each list keeps its own counter, so a nested ordered list restarts.
    assert_eq!(
        html_to_markdown(
            "<ol><li>Verfahren<ol><li>Lesung</li><li>Beschluss</li></ol></li><li>Anhang</li></ol>"
        ),
        "1. Verfahren\n1. Lesung\n2. Beschluss\n2. Anhang"
    );
}

#[test]
fn markdown_keeps_text_of_non_link_anchors() {
    let html = "<p><a href=\"#top\">Nach oben</a> und <a href=\"javascript:void(0)\">Klick</a></p>";
    assert_eq!(html_to_markdown(html), "Nach oben und Klick");
}

#[test]
fn container_selection_prefers_main_over_fallbacks() {
    let with_main = Html::parse_document(
        "<html><body><div id=\"content\"><p>Fallback</p></div><main><p>Haupt</p></main></body></html>",
    );
    assert_eq!(select_primary_container(&with_main).value().name(), "main");

    let with_article = Html::parse_document(
        "<html><body><article><p>Artikel</p></article></body></html>",
    );
    assert_eq!(
        select_primary_container(&with_article).value().name(),
        "article"
    );

    let with_id = Html::parse_document(
        "<html><body><div id=\"content\"><p>Inhalt</p></div></body></html>",
    );
    assert_eq!(select_primary_container(&with_id).value().name(), "div");

    let bare = Html::parse_document("<html><body><p>Nur Text</p></body></html>");
    assert_eq!(select_primary_container(&bare).value().name(), "body");
}

#[test]
fn walker_emits_content_in_document_order() {
    let html = r#"<html><body><main>
        <h1>Sitzung des Rates</h1>
        <nav><ul><li>Home</li></ul></nav>
        <p>Eröffnung der Sitzung durch die Vorsitzende.</p>
        <div class="sponsored"><p>Anzeige</p></div>
        <section>
            <h2>Tagesordnung</h2>
            <ol><li>Begrüßung</li><li>Haushalt</li></ol>
        </section>
        <table><tr><td>Zelle</td></tr></table>
    </main></body></html>"#;

    assert_eq!(
        kinds_of(html, WalkOptions::default()),
        vec![
            NodeKind::Heading(1),
            NodeKind::Paragraph,
            NodeKind::Heading(2),
            NodeKind::List { ordered: true },
            NodeKind::Table,
        ]
    );
}

#[test]
fn walker_skips_tables_when_disabled() {
    let html = "<html><body><main><p>Text</p><table><tr><td>Zelle</td></tr></table></main></body></html>";
    assert_eq!(
        kinds_of(html, WalkOptions { include_tables: false }),
        vec![NodeKind::Paragraph]
    );
}

#[test]
fn walker_consumes_accepted_subtrees_whole() {
    let html = "<html><body><main><ul><li><p>Eins</p></li><li>Zwei <em>kursiv</em></li></ul></main></body></html>";
    assert_eq!(
        kinds_of(html, WalkOptions::default()),
        vec![NodeKind::List { ordered: false }]
    );
}

#[test]
fn walker_treats_inline_only_divs_as_paragraphs() {
    let meaningful =
        "<html><body><main><div>Die Fraktion stimmte dem Antrag mehrheitlich zu.</div></main></body></html>";
    assert_eq!(
        kinds_of(meaningful, WalkOptions::default()),
        vec![NodeKind::Paragraph]
    );

    let chrome = "<html><body><main><div>Login</div></main></body></html>";
    assert_eq!(kinds_of(chrome, WalkOptions::default()), vec![]);

    let structured = "<html><body><main><div><p>Haushaltsrede</p></div></main></body></html>";
    assert_eq!(
        kinds_of(structured, WalkOptions::default()),
        vec![NodeKind::Paragraph]
    );
}

#[test]
fn heading_block_carries_level_text_and_provenance() {
    let document = Html::parse_document(
        "<html><body><main><h2>Beschlüsse des <em>Rates</em></h2></main></body></html>",
    );
    let container = select_primary_container(&document);
    let nodes = collect_content_nodes(container, WalkOptions::default());
    let block = BlockBuilder::new(true).build(nodes[0], "block-1", "https://example.com/rat");

    assert_eq!(
        block.payload,
        BlockPayload::Heading {
            level: 2,
            text: "Beschlüsse des Rates".to_string()
        }
    );
    assert_eq!(block.html_content, "<h2>Beschlüsse des Rates</h2>");
    assert_eq!(block.markdown_content, "## Beschlüsse des Rates");
    assert_eq!(block.plain_text, "Beschlüsse des Rates");
    assert_eq!(block.source_ref.url(), Some("https://example.com/rat"));
    assert_eq!(block.source_ref.selector.as_deref(), Some("body > main > h2"));
}

#[test]
fn paragraph_block_preserves_inline_formatting_in_markdown() {
    let document = Html::parse_document(
        "<html><body><main><p>Die <strong>Vorlage</strong> wurde <a href=\"/v/12\">angenommen</a>.</p></main></body></html>",
    );
    let container = select_primary_container(&document);
    let nodes = collect_content_nodes(container, WalkOptions::default());

    let formatted = BlockBuilder::new(true).build(nodes[0], "block-1", "https://example.com/");
    assert_eq!(formatted.payload, BlockPayload::Paragraph);
    assert_eq!(formatted.plain_text, "Die Vorlage wurde angenommen.");
    assert_eq!(
        formatted.markdown_content,
        "Die **Vorlage** wurde [angenommen](/v/12)."
    );
    assert_eq!(
        formatted.html_content,
        "<p>Die <strong>Vorlage</strong> wurde <a href=\"/v/12\">angenommen</a>.</p>"
    );

    let plain = BlockBuilder::new(false).build(nodes[0], "block-1", "https://example.com/");
    assert_eq!(plain.markdown_content, plain.plain_text);
}

#[test]
fn list_block_drops_empty_items_and_numbers_ordered_lists() {
    let document = Html::parse_document(
        "<html><body><main><ol><li>Erster Punkt</li><li></li><li>Zweiter <strong>Punkt</strong></li></ol></main></body></html>",
    );
    let container = select_primary_container(&document);
    let nodes = collect_content_nodes(container, WalkOptions::default());
    let block = BlockBuilder::new(true).build(nodes[0], "block-1", "https://example.com/");

    assert_eq!(
        block.payload,
        BlockPayload::List {
            ordered: true,
            items: vec!["Erster Punkt".to_string(), "Zweiter Punkt".to_string()],
        }
    );
    assert_eq!(block.markdown_content, "1. Erster Punkt\n2. Zweiter Punkt");
    assert_eq!(block.plain_text, "Erster Punkt\nZweiter Punkt");
    assert_eq!(
        block.html_content,
        "<ol><li>Erster Punkt</li><li>Zweiter Punkt</li></ol>"
    );
}

#[test]
fn table_block_keeps_ragged_rows_and_pads_renderings() {
    let document = Html::parse_document(
        r#"<html><body><main><table>
            <caption>Abstimmungsergebnis</caption>
            <thead><tr><th>Fraktion</th><th>Stimmen</th></tr></thead>
            <tbody>
                <tr><td>SPD</td><td>12</td></tr>
                <tr><td>Grüne</td></tr>
                <tr><td></td><td></td></tr>
            </tbody>
        </table></main></body></html>"#,
    );
    let container = select_primary_container(&document);
    let nodes = collect_content_nodes(container, WalkOptions::default());
    let block = BlockBuilder::new(true).build(nodes[0], "block-1", "https://example.com/");

    assert_eq!(
        block.payload,
        BlockPayload::Table {
            columns: vec!["Fraktion".to_string(), "Stimmen".to_string()],
            rows: vec![
                vec!["SPD".to_string(), "12".to_string()],
                vec!["Grüne".to_string()],
            ],
            caption: Some("Abstimmungsergebnis".to_string()),
        }
    );
    assert_eq!(
        block.markdown_content,
        "Abstimmungsergebnis\n| Fraktion | Stimmen |\n| --- | --- |\n| SPD | 12 |\n| Grüne |  |"
    );
    assert_eq!(
        block.plain_text,
        "Abstimmungsergebnis\nFraktion | Stimmen\nSPD | 12\nGrüne | "
    );
    assert_eq!(
        block.html_content,
        "<table><caption>Abstimmungsergebnis</caption><thead><tr><th>Fraktion</th><th>Stimmen</th>\
         </tr></thead><tbody><tr><td>SPD</td><td>12</td></tr><tr><td>Grüne</td></tr></tbody></table>"
    );
}

#[test]
fn table_block_synthesizes_columns_without_header() {
    let document = Html::parse_document(
        "<html><body><main><table><tr><td>Montag</td><td>10:00</td></tr><tr><td>Dienstag</td><td>14:00</td></tr></table></main></body></html>",
    );
    let container = select_primary_container(&document);
    let nodes = collect_content_nodes(container, WalkOptions::default());
    let block = BlockBuilder::new(true).build(nodes[0], "block-1", "https://example.com/");

    let BlockPayload::Table { columns, rows, caption } = block.payload else {
        panic!("expected table payload");
    };
    assert_eq!(columns, vec!["Column 1".to_string(), "Column 2".to_string()]);
    assert_eq!(rows.len(), 2);
    assert_eq!(caption, None);
}

#[test]
fn table_block_accepts_first_row_header_cells() {
    let document = Html::parse_document(
        "<html><body><main><table><tr><th>Name</th><th>Amt</th></tr><tr><td>Weber</td><td>Kämmerei</td></tr></table></main></body></html>",
    );
    let container = select_primary_container(&document);
    let nodes = collect_content_nodes(container, WalkOptions::default());
    let block = BlockBuilder::new(true).build(nodes[0], "block-1", "https://example.com/");

    let BlockPayload::Table { columns, rows, .. } = block.payload else {
        panic!("expected table payload");
    };
    assert_eq!(columns, vec!["Name".to_string(), "Amt".to_string()]);
    assert_eq!(rows, vec![vec!["Weber".to_string(), "Kämmerei".to_string()]]);
}

#[test]
fn sibling_blocks_get_positional_selectors() {
    let document = Html::parse_document(
        "<html><body><main><p>Erster Absatz der Niederschrift.</p><p>Zweiter Absatz der Niederschrift.</p></main></body></html>",
    );
    let container = select_primary_container(&document);
    let nodes = collect_content_nodes(container, WalkOptions::default());
    let builder = BlockBuilder::new(true);

    let first = builder.build(nodes[0], "block-1", "https://example.com/");
    let second = builder.build(nodes[1], "block-2", "https://example.com/");
    assert_eq!(first.source_ref.selector.as_deref(), Some("body > main > p"));
    assert_eq!(
        second.source_ref.selector.as_deref(),
        Some("body > main > p:nth-of-type(2)")
    );
}
