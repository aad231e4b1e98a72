//! Keyword and vendor-table extraction from rendered HTML.
//!
//! Both entry points are pure functions of their inputs: they never mutate
//! anything, and malformed markup yields empty output rather than an error.

use log::debug;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::LazyLock;

static TR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").expect("BUG: hardcoded selector 'tr' is valid"));

static TD_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td").expect("BUG: hardcoded selector 'td' is valid"));

/// One vendor/shipping tuple parsed from a marketplace table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub vendor_name: String,
    pub ship_from: String,
    pub ship_to: String,
}

/// Compile the configured table selector.
///
/// Done once per run; an invalid selector is a configuration error, not a
/// per-page one.
pub fn compile_table_selector(selector: &str) -> anyhow::Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| anyhow::anyhow!("invalid table selector '{selector}': {e}"))
}

/// Case-insensitive substring scan of `content` for each keyword.
///
/// Returns the subset of `keywords` that occur, lowercased. Zero matches is
/// a valid outcome, not an error.
#[must_use]
pub fn match_keywords(content: &str, keywords: &[String]) -> BTreeSet<String> {
    let haystack = content.to_lowercase();
    keywords
        .iter()
        .map(|kw| kw.to_lowercase())
        .filter(|kw| !kw.is_empty() && haystack.contains(kw.as_str()))
        .collect()
}

/// Parse vendor rows from every table matching `table_selector`.
///
/// The first row of each table is assumed to be a header and skipped. Each
/// remaining row with at least 3 cells yields a [`TableRow`] from its first
/// three cells, whitespace-trimmed; shorter rows are silently skipped. Rows
/// are emitted in source order.
#[must_use]
pub fn parse_tables(html: &str, table_selector: &Selector) -> Vec<TableRow> {
    let document = Html::parse_document(html);
    let mut rows = Vec::new();

    for table in document.select(table_selector) {
        for row in table.select(&TR_SELECTOR).skip(1) {
            let cells: Vec<String> = row
                .select(&TD_SELECTOR)
                .take(3)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect();

            if let [vendor_name, ship_from, ship_to] = cells.as_slice() {
                rows.push(TableRow {
                    vendor_name: vendor_name.clone(),
                    ship_from: ship_from.clone(),
                    ship_to: ship_to.clone(),
                });
            }
        }
    }

    debug!("Parsed {} vendor rows", rows.len());
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vtable_selector() -> Selector {
        compile_table_selector("table.vtable").expect("selector compiles")
    }

    #[test]
    fn keywords_match_case_insensitively() {
        let keywords = vec!["fentanyl".to_string(), "cocaine".to_string()];
        let matched = match_keywords("... Fentanyl for sale ...", &keywords);
        assert_eq!(matched.len(), 1);
        assert!(matched.contains("fentanyl"));
    }

    #[test]
    fn no_keywords_match_clean_content() {
        let keywords = vec!["fentanyl".to_string()];
        assert!(match_keywords("<html><body>nothing here</body></html>", &keywords).is_empty());
    }

    #[test]
    fn table_rows_parsed_trimmed_in_order() {
        let html = r#"
            <table class="vtable">
                <tr><th>Vendor</th><th>From</th><th>To</th></tr>
                <tr><td> AcmeVendor </td><td>NL</td><td> Worldwide </td></tr>
                <tr><td>OtherVendor</td><td>DE</td><td>EU</td></tr>
            </table>
        "#;
        let rows = parse_tables(html, &vtable_selector());
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            TableRow {
                vendor_name: "AcmeVendor".to_string(),
                ship_from: "NL".to_string(),
                ship_to: "Worldwide".to_string(),
            }
        );
        assert_eq!(rows[1].vendor_name, "OtherVendor");
    }

    #[test]
    fn short_rows_skipped_silently() {
        let html = r#"
            <table class="vtable">
                <tr><th>Vendor</th><th>From</th><th>To</th></tr>
                <tr><td>FullRow</td><td>NL</td><td>EU</td></tr>
                <tr><td>ShortRow</td><td>NL</td></tr>
            </table>
        "#;
        let rows = parse_tables(html, &vtable_selector());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].vendor_name, "FullRow");
    }

    #[test]
    fn extra_cells_ignored_beyond_first_three() {
        let html = r#"
            <table class="vtable">
                <tr><th>h</th></tr>
                <tr><td>V</td><td>A</td><td>B</td><td>ignored</td></tr>
            </table>
        "#;
        let rows = parse_tables(html, &vtable_selector());
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ship_to, "B");
    }

    #[test]
    fn non_matching_selector_yields_empty() {
        let html = "<table><tr><td>a</td><td>b</td><td>c</td></tr></table>";
        assert!(parse_tables(html, &vtable_selector()).is_empty());
    }

    #[test]
    fn malformed_markup_does_not_panic() {
        let html = "<table class=vtable><tr><td>unclosed";
        let _ = parse_tables(html, &vtable_selector());
    }
}
