//! Dynamic form generation: which input control each column gets, what its
//! placeholder says, and the single update path both the row-entry form and
//! the table builder funnel edits through.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::contract::{ContractError, RowContract};
use crate::schema::{Column, ColumnRules, ColumnType, Table, TableDraft, TableSettings};
use crate::validation::{Validate, ValidationReport};
use crate::value::{CellValue, RowValues};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "control", rename_all = "camelCase")]
pub enum Control {
    Toggle,
    Picker { options: Vec<String> },
    MultiLine,
    /// Rendered by the external rich-text editor.
    RichText,
    DateTime,
    Numeric,
    Url,
    Email,
    Text,
}

pub fn control_for(column: &Column) -> Control {
    match column.kind {
        ColumnType::Boolean => Control::Toggle,
        ColumnType::Select => Control::Picker {
            options: column.options().to_vec(),
        },
        ColumnType::Textarea => Control::MultiLine,
        ColumnType::Richtext => Control::RichText,
        ColumnType::Date => Control::DateTime,
        ColumnType::Number => Control::Numeric,
        ColumnType::Url => Control::Url,
        ColumnType::Email => Control::Email,
        ColumnType::Text | ColumnType::Phone => Control::Text,
    }
}

/// Explicit placeholder wins; otherwise a type-specific example or
/// "Enter {name}".
pub fn placeholder_for(column: &Column) -> String {
    if let Some(p) = column.placeholder.as_deref().filter(|p| !p.is_empty()) {
        return p.to_string();
    }
    match column.kind {
        ColumnType::Url => "https://example.com".to_string(),
        ColumnType::Email => "email@example.com".to_string(),
        ColumnType::Select => format!("Select {}", column.name),
        _ => format!("Enter {}", column.name),
    }
}

/// Converts a column's textual default into a typed cell.
fn default_cell(column: &Column) -> Option<CellValue> {
    let raw = column.default_value.as_deref()?;
    let cell = match column.kind {
        ColumnType::Number => raw.trim().parse::<f64>().map(CellValue::Number).ok()?,
        ColumnType::Boolean => match raw {
            "true" => CellValue::Bool(true),
            "false" => CellValue::Bool(false),
            _ => return None,
        },
        _ => CellValue::text(raw),
    };
    Some(cell)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSpec {
    pub name: String,
    pub required: bool,
    #[serde(flatten)]
    pub control: Control,
    pub placeholder: String,
    pub value: CellValue,
    /// Messages rendered beneath the control.
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSpec {
    pub table_id: Uuid,
    pub table_name: String,
    pub fields: Vec<FieldSpec>,
    /// Errors not tied to a single field.
    pub errors: Vec<String>,
}

#[derive(Debug, Error)]
pub enum FormError {
    #[error(transparent)]
    Contract(#[from] ContractError),

    #[error("{0}")]
    Invalid(ValidationReport),
}

/// In-progress row for one table.
#[derive(Debug, Clone)]
pub struct RowForm<'t> {
    table: &'t Table,
    values: RowValues,
    report: ValidationReport,
}

impl<'t> RowForm<'t> {
    /// Empty draft prefilled with column defaults.
    pub fn new(table: &'t Table) -> Self {
        let values = table
            .columns()
            .iter()
            .filter_map(|c| default_cell(c).map(|v| (c.name.clone(), v)))
            .collect();
        Self {
            table,
            values,
            report: ValidationReport::empty(),
        }
    }

    /// Draft for editing an existing row.
    pub fn with_values(table: &'t Table, values: RowValues) -> Self {
        Self {
            table,
            values,
            report: ValidationReport::empty(),
        }
    }

    pub fn values(&self) -> &RowValues {
        &self.values
    }

    /// The one path every control's change handler goes through: replaces
    /// `name` only and clears that field's stale errors.
    pub fn set_field(&mut self, name: &str, value: impl Into<CellValue>) {
        self.values.insert(name.to_string(), value.into());
        self.report.issues.retain(|i| i.field != name);
    }

    /// Shows `report` on the form, e.g. one returned by the server.
    pub fn apply_report(&mut self, report: ValidationReport) {
        self.report = report;
    }

    pub fn reset(&mut self) {
        *self = RowForm::new(self.table);
    }

    /// Validates the draft. On failure the errors stay attached to the form
    /// so `spec()` shows them under their fields.
    pub fn submit(&mut self) -> Result<RowValues, FormError> {
        let contract = RowContract::build(self.table)?;
        match contract.validate(&self.values) {
            Ok(row) => {
                self.report = ValidationReport::empty();
                Ok(row)
            }
            Err(report) => {
                self.apply_report(report.clone());
                Err(FormError::Invalid(report))
            }
        }
    }

    pub fn spec(&self) -> FormSpec {
        let fields = self
            .table
            .columns()
            .iter()
            .map(|column| FieldSpec {
                name: column.name.clone(),
                required: column.required,
                control: control_for(column),
                placeholder: placeholder_for(column),
                value: self.values.get(&column.name).cloned().unwrap_or_default(),
                errors: self
                    .report
                    .errors_for(&column.name)
                    .map(|i| i.message.to_string())
                    .collect(),
            })
            .collect();

        let declared: Vec<&str> = self.table.columns().iter().map(|c| c.name.as_str()).collect();
        let errors = self
            .report
            .issues
            .iter()
            .filter(|i| !declared.contains(&i.field.as_str()))
            .map(|i| {
                if i.field.is_empty() {
                    i.message.to_string()
                } else {
                    format!("{}: {}", i.field, i.message)
                }
            })
            .collect();

        FormSpec {
            table_id: self.table.id,
            table_name: self.table.name().to_string(),
            fields,
            errors,
        }
    }
}

/// A single edit to one column of the table builder.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnPatch {
    Name(String),
    Kind(ColumnType),
    Required(bool),
    Unique(bool),
    DefaultValue(Option<String>),
    Placeholder(Option<String>),
    /// Comma-separated, as typed into the options box.
    OptionsText(String),
    Options(Vec<String>),
    Rules(Option<ColumnRules>),
}

/// Draft state behind the table-builder form.
#[derive(Debug, Clone, PartialEq)]
pub struct TableBuilder {
    draft: TableDraft,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    /// Starts with one required text column, as the builder UI does.
    pub fn new() -> Self {
        Self {
            draft: TableDraft {
                table_name: String::new(),
                description: String::new(),
                columns: vec![Column::new("", ColumnType::Text).required()],
                settings: TableSettings::default(),
            },
        }
    }

    pub fn edit(draft: TableDraft) -> Self {
        Self { draft }
    }

    pub fn draft(&self) -> &TableDraft {
        &self.draft
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.draft.table_name = name.into();
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.draft.description = description.into();
    }

    pub fn set_settings(&mut self, settings: TableSettings) {
        self.draft.settings = settings;
    }

    pub fn add_column(&mut self) -> usize {
        self.draft.columns.push(Column::new("", ColumnType::Text));
        self.draft.columns.len() - 1
    }

    /// Returns false when `index` is out of range.
    pub fn remove_column(&mut self, index: usize) -> bool {
        if index < self.draft.columns.len() {
            self.draft.columns.remove(index);
            true
        } else {
            false
        }
    }

    /// Applies one patch to one column, leaving every other field and
    /// column as it was. Returns false when `index` is out of range.
    pub fn update_column(&mut self, index: usize, patch: ColumnPatch) -> bool {
        let Some(column) = self.draft.columns.get_mut(index) else {
            return false;
        };
        match patch {
            ColumnPatch::Name(name) => column.name = name,
            ColumnPatch::Kind(kind) => column.kind = kind,
            ColumnPatch::Required(required) => column.required = required,
            ColumnPatch::Unique(unique) => column.unique = Some(unique),
            ColumnPatch::DefaultValue(value) => column.default_value = value,
            ColumnPatch::Placeholder(value) => column.placeholder = value,
            ColumnPatch::OptionsText(text) => {
                column.options = Some(
                    text.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect(),
                )
            }
            ColumnPatch::Options(options) => column.options = Some(options),
            ColumnPatch::Rules(rules) => column.validation = rules,
        }
        true
    }

    /// Sample cell text shown in the builder's preview table.
    pub fn preview(&self) -> Vec<(String, String)> {
        self.draft
            .columns
            .iter()
            .map(|c| {
                let sample = match c.placeholder.as_deref().filter(|p| !p.is_empty()) {
                    Some(p) => p.to_string(),
                    None => format!("Sample {} data", c.kind),
                };
                (c.name.clone(), sample)
            })
            .collect()
    }

    pub fn finish(&self) -> Result<TableDraft, ValidationReport> {
        self.draft.validate()?;
        Ok(self.draft.clone())
    }
}
