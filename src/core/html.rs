//! HTML table extraction
//!
//! baseball-reference ships some of its tables inside HTML comments and
//! unhides them client-side, so comment markers are removed before parsing.

use scraper::{ElementRef, Html, Selector};

use crate::{DataError, Result};

/// One `<table>` as header names plus body rows of trimmed cell text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HtmlTable {
    pub id: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl HtmlTable {
    /// Index of the first header equal to `name`.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell text of `row` under header `name`.
    pub fn cell<'a>(&self, row: &'a [String], name: &str) -> Option<&'a str> {
        let idx = self.column(name)?;
        row.get(idx).map(String::as_str)
    }

    /// Like [`cell`](Self::cell), but a missing column is an error.
    pub fn require<'a>(&self, row: &'a [String], name: &str, source: &str) -> Result<&'a str> {
        match self.column(name) {
            Some(idx) => Ok(row.get(idx).map(String::as_str).unwrap_or("")),
            None => Err(DataError::missing_field(source, name)),
        }
    }
}

/// Compile a CSS selector, mapping parse failures to [`DataError::Html`].
pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| DataError::html(format!("bad selector '{}': {}", css, e)))
}

/// Drop `<!--` / `-->` markers so commented-out tables become visible.
pub fn uncomment(html: &str) -> String {
    html.replace("<!--", "").replace("-->", "")
}

/// Concatenated, whitespace-normalised text of an element.
pub fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every table matching `css`, in document order.
///
/// Headers come from the last `thead` row (grouped headers sit above it).
/// Body rows are `tbody tr` then `tfoot tr` (where newer pages keep their
/// totals), with both `th` and `td` cells so row labels such as the `Rk`
/// column are kept. Repeated header rows inside the body are left in place
/// for the caller to filter.
pub fn parse_tables(html: &str, css: &str) -> Result<Vec<HtmlTable>> {
    let document = Html::parse_document(&uncomment(html));
    let table_sel = selector(css)?;
    let head_row_sel = selector("thead tr")?;
    let body_row_sel = selector("tbody tr, tfoot tr")?;
    let cell_sel = selector("th, td")?;

    let tables = document
        .select(&table_sel)
        .map(|table| {
            let headers = table
                .select(&head_row_sel)
                .last()
                .map(|row| row.select(&cell_sel).map(|c| element_text(&c)).collect())
                .unwrap_or_default();

            let rows = table
                .select(&body_row_sel)
                .map(|row| row.select(&cell_sel).map(|c| element_text(&c)).collect())
                .collect();

            HtmlTable {
                id: table.value().attr("id").map(str::to_string),
                headers,
                rows,
            }
        })
        .collect();

    Ok(tables)
}

/// The first table matching `css`, or an error naming the source.
pub fn first_table(html: &str, css: &str, source: &str) -> Result<HtmlTable> {
    parse_tables(html, css)?
        .into_iter()
        .next()
        .ok_or_else(|| DataError::html(format!("{}: no table matches '{}'", source, css)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><body>
        <table id="team_batting">
          <thead>
            <tr><th colspan="3">Season</th></tr>
            <tr><th>Rk</th><th>Player</th><th>HR</th></tr>
          </thead>
          <tbody>
            <tr><th>1</th><td>Shohei  Ohtani*</td><td>54</td></tr>
            <tr class="thead"><th>Rk</th><td>Player</td><td>HR</td></tr>
            <tr><th>2</th><td>Mookie Betts</td><td>19</td></tr>
          </tbody>
        </table>
        <div class="placeholder"></div>
        <!--
        <table id="team_pitching">
          <thead><tr><th>Name</th><th>W</th></tr></thead>
          <tbody><tr><td>Team Totals</td><td>98</td></tr></tbody>
        </table>
        -->
        </body></html>
    "#;

    #[test]
    fn test_parse_tables_reads_last_header_row_and_body() {
        let tables = parse_tables(PAGE, "table#team_batting").unwrap();
        assert_eq!(tables.len(), 1);

        let table = &tables[0];
        assert_eq!(table.id.as_deref(), Some("team_batting"));
        assert_eq!(table.headers, vec!["Rk", "Player", "HR"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0], vec!["1", "Shohei Ohtani*", "54"]);
    }

    #[test]
    fn test_commented_tables_are_visible() {
        let table = first_table(PAGE, "table#team_pitching", "pitching").unwrap();
        assert_eq!(table.cell(&table.rows[0], "W"), Some("98"));
    }

    #[test]
    fn test_missing_table_is_an_error() {
        let result = first_table(PAGE, "table#nope", "standings");
        assert!(matches!(result, Err(DataError::Html { .. })));
    }

    #[test]
    fn test_require_reports_missing_column() {
        let table = first_table(PAGE, "table#team_batting", "batting").unwrap();
        let err = table.require(&table.rows[0], "OPS+", "batting").unwrap_err();
        assert!(err.to_string().contains("OPS+"));
        assert_eq!(table.require(&table.rows[0], "HR", "batting").unwrap(), "54");
    }

    #[test]
    fn test_bad_selector() {
        assert!(selector("table[[").is_err());
    }
}
