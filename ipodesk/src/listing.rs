//! The listing pipeline: search, filter, sort, paginate, each stage gated by
//! the table's settings. Also CSV export of the filtered/sorted set.

use std::cmp::Ordering;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::schema::{Column, TableSettings};
use crate::value::{CellValue, RowValues};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn flip(self) -> Self {
        match self {
            Direction::Asc => Direction::Desc,
            Direction::Desc => Direction::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortState {
    pub key: String,
    pub direction: Direction,
}

impl SortState {
    /// Header click: a new column sorts ascending, the same column flips.
    pub fn toggle(current: Option<SortState>, column: &str) -> SortState {
        match current {
            Some(s) if s.key == column => SortState {
                key: s.key,
                direction: s.direction.flip(),
            },
            _ => SortState {
                key: column.to_string(),
                direction: Direction::Asc,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingQuery {
    pub search: Option<String>,
    /// Column name to expected value. Empty values are inactive.
    pub filters: IndexMap<String, String>,
    pub sort: Option<SortState>,
    /// 1-based.
    pub page: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage<T> {
    pub rows: Vec<T>,
    /// Rows after search/filter, before pagination.
    pub total: usize,
    pub page: usize,
    pub total_pages: usize,
}

/// Anything the pipeline can look into.
pub trait Listable {
    fn values(&self) -> &RowValues;
}

impl Listable for RowValues {
    fn values(&self) -> &RowValues {
        self
    }
}

fn matches_search<T: Listable>(row: &T, needle: &str) -> bool {
    row.values()
        .values()
        .any(|v| v.display_text().to_lowercase().contains(needle))
}

fn matches_filters<T: Listable>(row: &T, filters: &IndexMap<String, String>) -> bool {
    filters.iter().filter(|(_, want)| !want.is_empty()).all(|(key, want)| {
        let got = row.values().get(key).map(CellValue::display_text).unwrap_or_default();
        got.to_lowercase() == want.to_lowercase()
    })
}

fn compare_by<T: Listable>(a: &T, b: &T, key: &str) -> Ordering {
    let null = CellValue::Null;
    let x = a.values().get(key).unwrap_or(&null);
    let y = b.values().get(key).unwrap_or(&null);
    x.compare(y)
}

/// Search → filter → sort; returns the full processed set.
pub fn process<T: Listable>(settings: &TableSettings, rows: Vec<T>, query: &ListingQuery) -> Vec<T> {
    let mut rows = rows;

    if settings.searchable {
        if let Some(needle) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = needle.to_lowercase();
            rows.retain(|r| matches_search(r, &needle));
        }
    }

    if settings.filterable && !query.filters.is_empty() {
        rows.retain(|r| matches_filters(r, &query.filters));
    }

    if settings.sortable {
        if let Some(sort) = &query.sort {
            // descending is the exact reverse of ascending, ties included
            rows.sort_by(|a, b| compare_by(a, b, &sort.key));
            if sort.direction == Direction::Desc {
                rows.reverse();
            }
        }
    }

    rows
}

pub fn total_pages(total: usize, per_page: usize) -> usize {
    total.div_ceil(per_page.max(1)).max(1)
}

/// Clamps `page` into `[1, total_pages]`.
pub fn clamp_page(page: usize, total: usize, per_page: usize) -> usize {
    page.clamp(1, total_pages(total, per_page))
}

/// Runs the whole pipeline and slices out one page.
pub fn apply<T: Listable>(settings: &TableSettings, rows: Vec<T>, query: &ListingQuery) -> ListingPage<T> {
    let processed = process(settings, rows, query);
    let total = processed.len();

    if !settings.pagination {
        return ListingPage {
            rows: processed,
            total,
            page: 1,
            total_pages: 1,
        };
    }

    let per_page = settings.items_per_page.max(1) as usize;
    let page = clamp_page(query.page, total, per_page);
    let start = (page - 1) * per_page;
    let rows = processed.into_iter().skip(start).take(per_page).collect();

    ListingPage {
        rows,
        total,
        page,
        total_pages: total_pages(total, per_page),
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Header row of column names, then one quoted line per row.
pub fn export_csv<T: Listable>(columns: &[Column], rows: &[T]) -> String {
    let mut out = columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>().join(",");
    for row in rows {
        out.push('\n');
        let line = columns
            .iter()
            .map(|c| quote(&row.values().get(&c.name).map(CellValue::display_text).unwrap_or_default()))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
    }
    out
}

/// `{tableName}_export.csv`, with characters that would break a quoted
/// `Content-Disposition` filename replaced by `_`.
pub fn export_filename(table_name: &str) -> String {
    let safe: String = table_name
        .chars()
        .map(|c| match c {
            '"' | '\\' | '/' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    format!("{safe}_export.csv")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnType;

    fn row(company: &str, price: f64) -> RowValues {
        let mut r = RowValues::new();
        r.insert("Company".into(), CellValue::text(company));
        r.insert("Price".into(), CellValue::Number(price));
        r
    }

    fn rows() -> Vec<RowValues> {
        vec![row("A", 10.0), row("B", 5.0), row("C", 20.0)]
    }

    fn names(rows: &[RowValues]) -> Vec<String> {
        rows.iter().map(|r| r["Company"].display_text()).collect()
    }

    fn settings(per_page: u32) -> TableSettings {
        TableSettings {
            items_per_page: per_page,
            ..TableSettings::default()
        }
    }

    fn sorted(key: &str, direction: Direction) -> ListingQuery {
        ListingQuery {
            sort: Some(SortState {
                key: key.into(),
                direction,
            }),
            page: 1,
            ..Default::default()
        }
    }

    #[test]
    fn ipo_list_sort_and_paginate() {
        let s = settings(2);
        let mut q = sorted("Price", Direction::Asc);

        let page1 = apply(&s, rows(), &q);
        assert_eq!(names(&page1.rows), vec!["B", "A"]);
        assert_eq!(page1.total_pages, 2);

        q.page = 2;
        let page2 = apply(&s, rows(), &q);
        assert_eq!(names(&page2.rows), vec!["C"]);
    }

    #[test]
    fn desc_is_reverse_of_asc() {
        let s = settings(10);
        let asc = process(&s, rows(), &sorted("Price", Direction::Asc));
        let mut desc = process(&s, rows(), &sorted("Price", Direction::Desc));
        desc.reverse();
        assert_eq!(asc, desc);
    }

    #[test]
    fn desc_reverses_ties_too() {
        let s = settings(10);
        let data = vec![row("A", 10.0), row("B", 5.0), row("D", 10.0)];
        let asc = process(&s, data.clone(), &sorted("Price", Direction::Asc));
        let desc = process(&s, data, &sorted("Price", Direction::Desc));
        assert_eq!(names(&asc), vec!["B", "A", "D"]);
        assert_eq!(names(&desc), vec!["D", "A", "B"]);
    }

    #[test]
    fn text_columns_sort_ignoring_case() {
        let data = vec![row("banana", 1.0), row("Cherry", 2.0), row("apple", 3.0)];
        let out = process(&settings(10), data, &sorted("Company", Direction::Asc));
        assert_eq!(names(&out), vec!["apple", "banana", "Cherry"]);
    }

    #[test]
    fn toggle_flips_same_column() {
        let first = SortState::toggle(None, "Price");
        assert_eq!(first.direction, Direction::Asc);
        let second = SortState::toggle(Some(first), "Price");
        assert_eq!(second.direction, Direction::Desc);
        let other = SortState::toggle(Some(second), "Company");
        assert_eq!(other, SortState { key: "Company".into(), direction: Direction::Asc });
    }

    #[test]
    fn pages_concatenate_to_the_whole_set() {
        let data: Vec<RowValues> = (0..11).map(|i| row(&format!("R{i}"), i as f64)).collect();
        let s = settings(3);
        let expected = process(&s, data.clone(), &sorted("Price", Direction::Desc));

        let mut seen = Vec::new();
        let pages = total_pages(expected.len(), 3);
        for page in 1..=pages {
            let mut q = sorted("Price", Direction::Desc);
            q.page = page;
            seen.extend(apply(&s, data.clone(), &q).rows);
        }
        assert_eq!(seen, expected);
    }

    #[test]
    fn page_is_clamped() {
        let s = settings(2);
        let mut q = sorted("Price", Direction::Asc);
        q.page = 99;
        let page = apply(&s, rows(), &q);
        assert_eq!(page.page, 2);
        assert_eq!(names(&page.rows), vec!["C"]);

        q.page = 0;
        assert_eq!(apply(&s, rows(), &q).page, 1);
        assert_eq!(apply(&s, Vec::<RowValues>::new(), &q).total_pages, 1);
    }

    #[test]
    fn search_is_case_insensitive_across_values() {
        let s = settings(10);
        let q = ListingQuery {
            search: Some("c".into()),
            page: 1,
            ..Default::default()
        };
        assert_eq!(names(&process(&s, rows(), &q)), vec!["C"]);

        let q = ListingQuery {
            search: Some("20".into()),
            page: 1,
            ..Default::default()
        };
        assert_eq!(names(&process(&s, rows(), &q)), vec!["C"]);
    }

    #[test]
    fn filters_match_exactly_ignoring_case() {
        let s = settings(10);
        let mut q = ListingQuery::default();
        q.filters.insert("Company".into(), "b".into());
        q.filters.insert("Price".into(), String::new());
        assert_eq!(names(&process(&s, rows(), &q)), vec!["B"]);
    }

    #[test]
    fn disabled_stages_are_no_ops() {
        let s = TableSettings {
            sortable: false,
            filterable: false,
            searchable: false,
            pagination: false,
            items_per_page: 1,
            exportable: false,
        };
        let mut q = sorted("Price", Direction::Asc);
        q.search = Some("zzz".into());
        q.filters.insert("Company".into(), "A".into());
        q.page = 3;

        let page = apply(&s, rows(), &q);
        assert_eq!(names(&page.rows), vec!["A", "B", "C"]);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn sort_is_stable_and_mixed_values_fall_back_to_text() {
        let mut data = rows();
        data.push(row("D", 10.0));
        let out = process(&settings(10), data, &sorted("Price", Direction::Asc));
        assert_eq!(names(&out), vec!["B", "A", "D", "C"]);
    }

    #[test]
    fn csv_export_quotes_values() {
        let columns = vec![
            Column::new("Company", ColumnType::Text),
            Column::new("Price", ColumnType::Number),
            Column::new("Notes", ColumnType::Text),
        ];
        let mut r = row("Acme \"A\"", 10.0);
        r.insert("Extra".into(), CellValue::text("ignored"));
        let csv = export_csv(&columns, &[r, row("B", 2.5)]);
        assert_eq!(
            csv,
            "Company,Price,Notes\n\"Acme \"\"A\"\"\",\"10\",\"\"\n\"B\",\"2.5\",\"\""
        );
        assert_eq!(export_filename("ipo_list"), "ipo_list_export.csv");
    }

    #[test]
    fn export_filename_strips_header_breaking_chars() {
        assert_eq!(export_filename("ipo \"2025\"/q1"), "ipo _2025__q1_export.csv");
        assert_eq!(export_filename("a\r\nb"), "a__b_export.csv");
    }
}
