//! Schema Definitions ("tables"): the admin-authored description of a
//! dataset's columns and display settings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::validation::{self, Validate, ValidationReport};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ColumnType {
    Text,
    Number,
    Date,
    Select,
    Boolean,
    Email,
    Url,
    Phone,
    Textarea,
    Richtext,
}

/// Optional per-column constraints. `min`/`max` bound numbers by value and
/// strings by character count; `pattern` is a regex for string values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnRules {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

impl ColumnRules {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none() && self.pattern.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ColumnRules>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnType) -> Self {
        Self {
            name: name.into(),
            kind,
            required: false,
            unique: None,
            default_value: None,
            placeholder: None,
            options: None,
            validation: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_unique(&self) -> bool {
        self.unique.unwrap_or(false)
    }

    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or(&[])
    }
}

impl Validate for Column {
    fn validate(&self) -> Result<(), ValidationReport> {
        let mut report = ValidationReport::empty();
        report.check("name", validation::min_chars("Column name", 2)(&self.name));
        if self.kind == ColumnType::Select {
            report.check(
                "options",
                validation::min_items::<String>("option", 1)(self.options()).map_err(|_| {
                    validation::ValidationError::new(
                        "options_required",
                        "Select columns must have at least one option",
                    )
                }),
            );
        }
        if let Some(rules) = &self.validation {
            if let (Some(min), Some(max)) = (rules.min, rules.max) {
                if min > max {
                    report.push(
                        "validation.max",
                        validation::ValidationError::new("value_range", "max must not be less than min"),
                    );
                }
            }
            if let Some(pattern) = &rules.pattern {
                if regex::Regex::new(pattern).is_err() {
                    report.push(
                        "validation.pattern",
                        validation::ValidationError::new("pattern", "Invalid regular expression"),
                    );
                }
            }
        }
        report.into_result()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSettings {
    pub sortable: bool,
    pub filterable: bool,
    pub searchable: bool,
    pub pagination: bool,
    pub items_per_page: u32,
    pub exportable: bool,
}

impl Default for TableSettings {
    fn default() -> Self {
        Self {
            sortable: true,
            filterable: true,
            searchable: true,
            pagination: true,
            items_per_page: 10,
            exportable: true,
        }
    }
}

/// What an admin submits when creating or updating a table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDraft {
    pub table_name: String,
    pub description: String,
    pub columns: Vec<Column>,
    pub settings: TableSettings,
}

impl Validate for TableDraft {
    fn validate(&self) -> Result<(), ValidationReport> {
        let mut report = ValidationReport::empty();
        report.check("tableName", validation::min_chars("Table name", 3)(&self.table_name));
        report.check("description", validation::min_chars("Description", 10)(&self.description));
        report.check("columns", validation::min_items::<Column>("column", 1)(&self.columns));
        for (i, column) in self.columns.iter().enumerate() {
            if let Err(nested) = column.validate() {
                report.extend_nested(&format!("columns[{i}]"), nested);
            }
        }
        report.check(
            "settings.itemsPerPage",
            validation::min(1)(&self.settings.items_per_page),
        );
        report.into_result()
    }
}

/// A persisted Schema Definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(flatten)]
    pub draft: TableDraft,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Table {
    pub fn new(draft: TableDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            draft,
            order: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn name(&self) -> &str {
        &self.draft.table_name
    }

    pub fn columns(&self) -> &[Column] {
        &self.draft.columns
    }

    pub fn settings(&self) -> &TableSettings {
        &self.draft.settings
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.draft.columns.iter().find(|c| c.name == name)
    }

    /// The first column holds the display name of a row ("company name").
    pub fn name_column(&self) -> Option<&Column> {
        self.draft.columns.first()
    }

    /// Replaces the definition in place; existing rows are not migrated.
    pub fn replace(&mut self, draft: TableDraft) {
        self.draft = draft;
        self.updated_at = Utc::now();
    }
}

/// Display order: explicitly ordered tables first by position, then the
/// rest newest first.
pub fn sort_for_display(tables: &mut [Table]) {
    tables.sort_by(|a, b| match (a.order, b.order) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => b.created_at.cmp(&a.created_at),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    fn draft() -> TableDraft {
        TableDraft {
            table_name: "ipo_list".into(),
            description: "Upcoming IPO listings".into(),
            columns: vec![
                Column::new("Company", ColumnType::Text).required(),
                Column::new("Price", ColumnType::Number).required(),
            ],
            settings: TableSettings::default(),
        }
    }

    #[test]
    fn column_type_names_round_trip() {
        for kind in ColumnType::iter() {
            let name: &'static str = kind.into();
            assert_eq!(ColumnType::from_str(name).ok(), Some(kind));
        }
        assert!(ColumnType::from_str("currency").is_err());
    }

    #[test]
    fn unknown_column_type_fails_to_deserialize() {
        let raw = r#"{"name":"Cap","type":"currency","required":false}"#;
        assert!(serde_json::from_str::<Column>(raw).is_err());
    }

    #[test]
    fn valid_draft_passes() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn structural_errors_are_reported_per_field() {
        let mut d = draft();
        d.table_name = "ab".into();
        d.description = "short".into();
        d.columns.push(Column::new("X", ColumnType::Select));
        d.settings.items_per_page = 0;

        let report = d.validate().unwrap_err();
        assert!(report.has_field("tableName"));
        assert!(report.has_field("description"));
        assert!(report.has_field("columns[2].name"));
        assert!(report.has_field("columns[2].options"));
        assert!(report.has_field("settings.itemsPerPage"));
    }

    #[test]
    fn empty_columns_rejected() {
        let mut d = draft();
        d.columns.clear();
        assert!(d.validate().unwrap_err().has_field("columns"));
    }

    #[test]
    fn bad_pattern_rejected() {
        let mut d = draft();
        d.columns[0].validation = Some(ColumnRules {
            pattern: Some("([a-z".into()),
            ..Default::default()
        });
        assert!(d.validate().unwrap_err().has_field("columns[0].validation.pattern"));
    }

    #[test]
    fn table_serializes_flat_with_camel_case() {
        let table = Table::new(draft());
        let json = serde_json::to_value(&table).expect("json");
        assert_eq!(json["tableName"], "ipo_list");
        assert_eq!(json["settings"]["itemsPerPage"], 10);
        assert_eq!(json["columns"][1]["type"], "number");
        assert!(json.get("_id").is_some());
        assert!(json.get("order").is_none());
    }

    #[test]
    fn display_order_prefers_explicit_positions() {
        let mut a = Table::new(draft());
        let mut b = Table::new(draft());
        let c = Table::new(draft());
        a.order = Some(1);
        b.order = Some(0);
        let mut tables = vec![c.clone(), a.clone(), b.clone()];
        sort_for_display(&mut tables);
        let ids: Vec<_> = tables.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![b.id, a.id, c.id]);
    }
}
