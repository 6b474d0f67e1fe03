//! Company Detail Aggregate: the per-company profile attached to a row.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::validation::{self, Validate, ValidationReport};
use crate::value::{CellValue, RowValues};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicInfo {
    pub description: String,
    pub industry: String,
    pub founded: String,
    pub headquarters: String,
    pub ceo: String,
    pub employees: String,
    pub website: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Logo {
    pub url: String,
    pub alt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Image {
    pub url: String,
    pub caption: String,
}

/// Ad-hoc table inside a profile; independent of Schema Definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NestedTable {
    pub title: String,
    pub data: Vec<RowValues>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Link {
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSection {
    pub title: String,
    pub body: String,
    pub order: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ReviewKind {
    Table,
    List,
    #[default]
    Content,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Review {
    pub title: String,
    pub content: String,
    pub rating: u8,
    pub author: String,
    pub date: String,
    #[serde(rename = "type")]
    pub kind: ReviewKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_items: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table_data: Option<Vec<RowValues>>,
}

impl Default for Review {
    fn default() -> Self {
        Self {
            title: String::new(),
            content: String::new(),
            rating: 5,
            author: String::new(),
            date: String::new(),
            kind: ReviewKind::Content,
            list_items: None,
            table_data: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsItem {
    pub title: String,
    pub url: String,
    pub date: String,
    pub time: String,
    pub description: String,
    pub content: String,
    pub source: String,
    pub order: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyDetails {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub company_id: Uuid,
    pub table_id: Uuid,
    #[serde(default)]
    pub company_name: String,
    #[serde(default)]
    pub basic_info: BasicInfo,
    #[serde(default)]
    pub logo: Logo,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub tables: Vec<NestedTable>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default)]
    pub content: Vec<ContentSection>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub news: Vec<NewsItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl CompanyDetails {
    /// Empty profile for a company that has none yet.
    pub fn empty(company_id: Uuid, table_id: Uuid, company_name: impl Into<String>) -> Self {
        Self {
            id: None,
            company_id,
            table_id,
            company_name: company_name.into(),
            basic_info: BasicInfo::default(),
            logo: Logo::default(),
            images: Vec::new(),
            tables: Vec::new(),
            links: Vec::new(),
            content: Vec::new(),
            reviews: Vec::new(),
            news: Vec::new(),
            created_at: None,
            updated_at: None,
        }
    }

    /// Content sections in display order.
    pub fn sorted_content(&self) -> Vec<&ContentSection> {
        let mut sections: Vec<_> = self.content.iter().collect();
        sections.sort_by_key(|s| s.order);
        sections
    }

    pub fn sorted_news(&self) -> Vec<&NewsItem> {
        let mut items: Vec<_> = self.news.iter().collect();
        items.sort_by_key(|n| n.order);
        items
    }

    /// Equality ignoring server-assigned timestamps.
    pub fn same_content(&self, other: &CompanyDetails) -> bool {
        let strip = |d: &CompanyDetails| CompanyDetails {
            created_at: None,
            updated_at: None,
            ..d.clone()
        };
        strip(self) == strip(other)
    }
}

impl Validate for CompanyDetails {
    fn validate(&self) -> Result<(), ValidationReport> {
        let mut report = ValidationReport::empty();
        let rating = validation::range(1u8, 5u8);
        for (i, review) in self.reviews.iter().enumerate() {
            report.check(format!("reviews[{i}].rating"), rating(&review.rating));
        }
        for (i, image) in self.images.iter().enumerate() {
            report.check(format!("images[{i}].url"), validation::non_empty(&image.url));
        }
        for (i, link) in self.links.iter().enumerate() {
            report.check(format!("links[{i}].url"), validation::non_empty(&link.url));
        }
        report.into_result()
    }
}

/// Items carrying an explicit display position.
pub trait Ordered {
    fn order(&self) -> Option<i64> {
        None
    }
    fn set_order(&mut self, _order: i64) {}
}

impl Ordered for ContentSection {
    fn order(&self) -> Option<i64> {
        Some(self.order)
    }
    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

impl Ordered for NewsItem {
    fn order(&self) -> Option<i64> {
        Some(self.order)
    }
    fn set_order(&mut self, order: i64) {
        self.order = order;
    }
}

impl Ordered for Image {}
impl Ordered for Link {}
impl Ordered for Review {}
impl Ordered for NestedTable {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Move {
    Up,
    Down,
}

/// Swaps `items[index]` with its neighbour, together with their `order`
/// values. Returns false (and changes nothing) at the ends.
pub fn move_item<T: Ordered>(items: &mut [T], index: usize, dir: Move) -> bool {
    let target = match dir {
        Move::Up if index > 0 => index - 1,
        Move::Down if index + 1 < items.len() => index + 1,
        _ => return false,
    };
    if index >= items.len() {
        return false;
    }
    if let (Some(a), Some(b)) = (items[index].order(), items[target].order()) {
        items[index].set_order(b);
        items[target].set_order(a);
    }
    items.swap(index, target);
    true
}

pub fn remove_item<T>(items: &mut Vec<T>, index: usize) -> Option<T> {
    (index < items.len()).then(|| items.remove(index))
}

/// Next position after the current maximum, 0 for an empty list.
pub fn next_order<T: Ordered>(items: &[T]) -> i64 {
    items.iter().filter_map(Ordered::order).max().map_or(0, |m| m + 1)
}

pub fn add_content(details: &mut CompanyDetails, title: impl Into<String>, body: impl Into<String>) {
    let order = next_order(&details.content);
    details.content.push(ContentSection {
        title: title.into(),
        body: body.into(),
        order,
    });
}

pub fn add_news(details: &mut CompanyDetails, item: NewsItem) {
    let order = next_order(&details.news);
    details.news.push(NewsItem { order, ..item });
}

impl NestedTable {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            data: vec![RowValues::new()],
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        self.data
            .first()
            .map(|r| r.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// New row with the first row's keys, all empty.
    pub fn add_row(&mut self) {
        let row = self
            .column_names()
            .into_iter()
            .map(|k| (k, CellValue::text("")))
            .collect();
        self.data.push(row);
    }

    pub fn add_column(&mut self, name: &str) {
        for row in &mut self.data {
            row.entry(name.to_string()).or_insert_with(|| CellValue::text(""));
        }
    }

    pub fn remove_column(&mut self, name: &str) {
        for row in &mut self.data {
            row.shift_remove(name);
        }
    }

    pub fn remove_row(&mut self, index: usize) -> Option<RowValues> {
        remove_item(&mut self.data, index)
    }

    pub fn set_cell(&mut self, row: usize, column: &str, value: impl Into<CellValue>) -> bool {
        match self.data.get_mut(row) {
            Some(r) => {
                r.insert(column.to_string(), value.into());
                true
            }
            None => false,
        }
    }
}

impl Review {
    /// Switching kind seeds the matching sub-editor.
    pub fn set_kind(&mut self, kind: ReviewKind) {
        self.kind = kind;
        match kind {
            ReviewKind::List if self.list_items.is_none() => self.list_items = Some(Vec::new()),
            ReviewKind::Table if self.table_data.is_none() => self.table_data = Some(vec![RowValues::new()]),
            _ => {}
        }
    }
}
