//! HTML table extraction for the upstream statistics pages.
//!
//! The data lives in a single `table.tb_base.tb_dados` element. Header
//! and footer come from `thead`/`tfoot`; body rows are grouped by the
//! site's `tb_item`/`tb_subitem` cell classes (an item row followed by
//! its indented sub-item rows). Rows matching neither class collect into
//! a single default group, and tables without an explicit `tbody` fall
//! back to "every row not claimed by thead/tfoot".

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

use crate::record::{BodyGroup, TableRecord};

static TABLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("table.tb_base.tb_dados").expect("valid selector"));
static THEAD: Lazy<Selector> = Lazy::new(|| Selector::parse("thead").expect("valid selector"));
static TBODY: Lazy<Selector> = Lazy::new(|| Selector::parse("tbody").expect("valid selector"));
static TFOOT: Lazy<Selector> = Lazy::new(|| Selector::parse("tfoot").expect("valid selector"));
static TR: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td, th").expect("valid selector"));
static TD: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("valid selector"));

/// Extract the data table from a page.
///
/// Returns `None` when the page carries no recognizable data table, which
/// the fetch layer reports as a parse failure.
pub(crate) fn parse_page(html: &str) -> Option<TableRecord> {
    let document = Html::parse_document(html);
    let table = document.select(&TABLE).next()?;

    let thead = table.select(&THEAD).next();
    let tfoot = table.select(&TFOOT).next();

    let header = thead.map(section_rows).unwrap_or_default();
    let footer = tfoot.map(section_rows).unwrap_or_default();

    let body = match table.select(&TBODY).next() {
        Some(tbody) => grouped_body_rows(tbody),
        // No tbody: take every row the header and footer did not claim.
        None => orphan_body_rows(table, thead, tfoot),
    };

    Some(TableRecord {
        header,
        body,
        footer,
    })
}

/// Rows of a thead/tfoot section as plain cell lists.
fn section_rows(section: ElementRef) -> Vec<Vec<String>> {
    section
        .select(&TR)
        .map(row_cells)
        .filter(|cells| !cells.is_empty())
        .collect()
}

/// Body rows grouped by the `tb_item`/`tb_subitem` cell classes.
fn grouped_body_rows(tbody: ElementRef) -> Vec<BodyGroup> {
    let rows: Vec<ElementRef> = tbody
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "tr")
        .collect();

    let mut groups: Vec<BodyGroup> = Vec::new();
    let mut default_group: Option<usize> = None;
    let mut i = 0;

    while i < rows.len() {
        let cells = row_cells(rows[i]);
        if cells.is_empty() {
            i += 1;
            continue;
        }

        if first_td_has_class(rows[i], "tb_item") {
            let mut group = BodyGroup {
                item_data: cells,
                sub_items: Vec::new(),
            };
            i += 1;
            // Collect the sub-item rows indented under this item.
            while i < rows.len() && first_td_has_class(rows[i], "tb_subitem") {
                let sub_cells = row_cells(rows[i]);
                if !sub_cells.is_empty() {
                    group.sub_items.push(sub_cells);
                }
                i += 1;
            }
            groups.push(group);
        } else {
            let idx = match default_group {
                Some(idx) => idx,
                None => {
                    groups.push(BodyGroup::default());
                    let idx = groups.len() - 1;
                    default_group = Some(idx);
                    idx
                }
            };
            groups[idx].sub_items.push(cells);
            i += 1;
        }
    }

    groups
}

/// Fallback for tables without an explicit tbody: every `tr` not inside
/// thead or tfoot becomes its own ungrouped row.
fn orphan_body_rows(
    table: ElementRef,
    thead: Option<ElementRef>,
    tfoot: Option<ElementRef>,
) -> Vec<BodyGroup> {
    let mut claimed = HashSet::new();
    for section in [thead, tfoot].into_iter().flatten() {
        for row in section.select(&TR) {
            claimed.insert(row.id());
        }
    }

    table
        .select(&TR)
        .filter(|row| !claimed.contains(&row.id()))
        .map(row_cells)
        .filter(|cells| !cells.is_empty())
        .map(|cells| BodyGroup {
            item_data: cells,
            sub_items: Vec::new(),
        })
        .collect()
}

/// Trimmed, whitespace-normalized text of every cell in a row.
fn row_cells(row: ElementRef) -> Vec<String> {
    row.select(&CELL)
        .map(|cell| {
            cell.text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|text| !text.is_empty())
        .collect()
}

/// Whether the first `td` of a row carries the given class.
fn first_td_has_class(row: ElementRef, class: &str) -> bool {
    row.select(&TD)
        .next()
        .map(|td| td.value().classes().any(|c| c == class))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUPED_PAGE: &str = r#"
        <html><body>
        <table class="tb_base tb_dados">
          <thead><tr><th>Produto</th><th>Quantidade (L.)</th></tr></thead>
          <tbody>
            <tr><td class="tb_item">VINHO DE MESA</td><td class="tb_item">169.762.429</td></tr>
            <tr><td class="tb_subitem">Tinto</td><td class="tb_subitem">139.320.884</td></tr>
            <tr><td class="tb_subitem">Branco</td><td class="tb_subitem">27.910.299</td></tr>
            <tr><td class="tb_item">SUCO DE UVA</td><td class="tb_item">14.810.921</td></tr>
          </tbody>
          <tfoot><tr><td>Total</td><td>457.792.870</td></tr></tfoot>
        </table>
        </body></html>"#;

    #[test]
    fn test_parses_header_body_footer() {
        let record = parse_page(GROUPED_PAGE).unwrap();
        assert_eq!(
            record.header,
            vec![vec!["Produto".to_string(), "Quantidade (L.)".to_string()]]
        );
        assert_eq!(record.footer, vec![vec!["Total", "457.792.870"]]);
        assert_eq!(record.body.len(), 2);
    }

    #[test]
    fn test_groups_subitems_under_items() {
        let record = parse_page(GROUPED_PAGE).unwrap();
        let wine = &record.body[0];
        assert_eq!(wine.item_data[0], "VINHO DE MESA");
        assert_eq!(wine.sub_items.len(), 2);
        assert_eq!(wine.sub_items[1][0], "Branco");
        // The second item starts a fresh group with no sub-items.
        assert_eq!(record.body[1].item_data[0], "SUCO DE UVA");
        assert!(record.body[1].sub_items.is_empty());
    }

    #[test]
    fn test_ungrouped_rows_collect_into_default_group() {
        let html = r#"
            <table class="tb_base tb_dados"><tbody>
              <tr><td>Rio Grande do Sul</td><td>90%</td></tr>
              <tr><td>Santa Catarina</td><td>5%</td></tr>
            </tbody></table>"#;
        let record = parse_page(html).unwrap();
        assert_eq!(record.body.len(), 1);
        assert!(record.body[0].item_data.is_empty());
        assert_eq!(record.body[0].sub_items.len(), 2);
        assert_eq!(record.body[0].sub_items[0][0], "Rio Grande do Sul");
    }

    #[test]
    fn test_table_without_tbody_uses_orphan_rows() {
        let html = r#"
            <table class="tb_base tb_dados">
              <thead><tr><th>Produto</th></tr></thead>
              <tr><td>VINHO</td></tr>
              <tr><td>SUCO</td></tr>
            </table>"#;
        let record = parse_page(html).unwrap();
        assert_eq!(record.header.len(), 1);
        // html5ever moves stray rows into an implicit tbody, so either
        // path must yield the two data rows without duplicating the head.
        let rows: Vec<_> = record
            .body
            .iter()
            .flat_map(|g| {
                if g.item_data.is_empty() {
                    g.sub_items.clone()
                } else {
                    vec![g.item_data.clone()]
                }
            })
            .collect();
        assert_eq!(rows, vec![vec!["VINHO".to_string()], vec!["SUCO".to_string()]]);
    }

    #[test]
    fn test_missing_table_is_none() {
        assert!(parse_page("<html><body><p>manutenção</p></body></html>").is_none());
        assert!(parse_page("").is_none());
    }

    #[test]
    fn test_whitespace_normalized_in_cells() {
        let html = "<table class=\"tb_base tb_dados\"><tbody><tr><td class=\"tb_item\">  VINHO\n   FINO  </td></tr></tbody></table>";
        let record = parse_page(html).unwrap();
        assert_eq!(record.body[0].item_data[0], "VINHO FINO");
    }
}
