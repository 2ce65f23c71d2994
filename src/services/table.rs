// src/services/table.rs

//! Tolerant HTML table extraction.
//!
//! Locates the primary data table of a page, reads its header row for
//! column order and turns each body row into a [`Record`]:
//!
//! - numeric-looking cells become integers or floats, empty cells null
//! - short rows are right-padded with null, long rows truncated
//! - a `/players/` link inside a row is kept in [`PLAYER_LINK_COLUMN`]
//!
//! Stats sites ship some tables inside HTML comments; those are found too.

use std::collections::HashMap;

use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{AppError, Result};
use crate::models::{FieldValue, Record};

/// Auxiliary column holding a row's player link.
pub const PLAYER_LINK_COLUMN: &str = "player_link";

/// Normalized table content.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Record>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.headers.iter().any(|h| h == name)
    }
}

/// Parse a page and extract its primary table.
pub fn extract_table_str(html: &str, table_id: Option<&str>) -> Result<Table> {
    extract_table(&Html::parse_document(html), table_id)
}

/// Extract the table with `table_id`, falling back to the first table.
///
/// Fails only when the document contains no table at all.
pub fn extract_table(document: &Html, table_id: Option<&str>) -> Result<Table> {
    if let Some(id) = table_id {
        let selector = parse_selector(&format!("table#{id}"))?;
        if let Some(table) = document.select(&selector).next() {
            return read_table(table);
        }
        if let Some(table) = find_in_comments(document, id, &selector)? {
            log::debug!("Table '{}' found inside a comment", id);
            return Ok(table);
        }
        log::debug!("No table with id '{}', falling back to first table", id);
    }

    let any = parse_selector("table")?;
    match document.select(&any).next() {
        Some(table) => read_table(table),
        None => Err(AppError::parse("table", "document contains no table")),
    }
}

fn find_in_comments(document: &Html, id: &str, selector: &Selector) -> Result<Option<Table>> {
    let marker = format!("id=\"{id}\"");
    for node in document.tree.nodes() {
        let Node::Comment(comment) = node.value() else {
            continue;
        };
        let text: &str = comment;
        if !text.contains(&marker) {
            continue;
        }
        let fragment = Html::parse_fragment(text);
        if let Some(table) = fragment.select(selector).next() {
            return read_table(table).map(Some);
        }
    }
    Ok(None)
}

fn read_table(table: ElementRef<'_>) -> Result<Table> {
    let head_rows = parse_selector("thead tr")?;
    let body_rows = parse_selector("tbody tr")?;

    let body: Vec<ElementRef<'_>> = table.select(&body_rows).collect();
    let (header_row, header_in_body) = match table.select(&head_rows).last() {
        Some(row) => (Some(row), false),
        None => (body.first().copied(), true),
    };

    let Some(header_row) = header_row else {
        return Ok(Table::default());
    };
    let headers = make_headers(cells(header_row).iter().map(|c| cell_text(*c)).collect());
    if headers.is_empty() {
        return Ok(Table::default());
    }

    let mut rows = Vec::new();
    let mut links = Vec::new();
    for (i, row) in body.iter().enumerate() {
        if (header_in_body && i == 0) || has_class(*row, "thead") {
            continue;
        }
        let row_cells = cells(*row);
        if row_cells.is_empty() {
            continue;
        }
        if row_cells.len() != headers.len() {
            log::trace!(
                "Row {} has {} cells for {} columns",
                i,
                row_cells.len(),
                headers.len()
            );
        }

        let mut record = Record::new();
        for (idx, header) in headers.iter().enumerate() {
            let value = row_cells
                .get(idx)
                .map(|c| FieldValue::from_cell_text(&cell_text(*c)))
                .unwrap_or(FieldValue::Null);
            record.set(header.as_str(), value);
        }
        links.push(row_cells.iter().find_map(|c| player_link(*c)));
        rows.push(record);
    }

    if links.iter().any(Option::is_some) {
        for (record, link) in rows.iter_mut().zip(links) {
            record.set(PLAYER_LINK_COLUMN, link);
        }
    }

    Ok(Table { headers, rows })
}

/// `th`/`td` children of a row.
fn cells(row: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|e| matches!(e.value().name(), "td" | "th"))
        .collect()
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

fn player_link(cell: ElementRef<'_>) -> Option<String> {
    cell.descendants()
        .filter_map(ElementRef::wrap)
        .filter(|e| e.value().name() == "a")
        .filter_map(|a| a.value().attr("href"))
        .find(|href| href.contains("/players/"))
        .map(str::to_string)
}

/// Blank headers become `col_{i}`; repeats get a numeric suffix.
fn make_headers(raw: Vec<String>) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    raw.into_iter()
        .enumerate()
        .map(|(i, h)| {
            let base = if h.is_empty() { format!("col_{i}") } else { h };
            let count = seen.entry(base.clone()).or_insert(0);
            *count += 1;
            if *count == 1 {
                base
            } else {
                format!("{base}_{count}")
            }
        })
        .collect()
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))
}
