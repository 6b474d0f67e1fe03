//! Row validation contract: a small interpreter that turns a table's column
//! list into one rule per column and checks submitted rows against it.

use regex::Regex;
use thiserror::Error;

use crate::schema::{Column, ColumnType, Table};
use crate::validation::{self, ValidationError, ValidationReport};
use crate::value::{CellValue, RowValues};

/// What the rich-text editor emits when cleared.
pub const RICHTEXT_EMPTY: &str = "<p></p>";

/// A stored schema that cannot produce a contract. This is a configuration
/// error, not bad user input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContractError {
    #[error("Select field \"{0}\" must have options")]
    SelectWithoutOptions(String),

    #[error("Field \"{column}\" has an invalid pattern: {reason}")]
    InvalidPattern { column: String, reason: String },
}

#[derive(Debug, Clone)]
enum Kind {
    Number,
    Email,
    Url,
    Boolean,
    Select(Vec<String>),
    RichText,
    /// text, phone, textarea, date
    Text,
}

#[derive(Debug, Clone)]
struct FieldRule {
    name: String,
    required: bool,
    kind: Kind,
    min: Option<f64>,
    max: Option<f64>,
    pattern: Option<Regex>,
}

#[derive(Debug, Clone)]
pub struct RowContract {
    rules: Vec<FieldRule>,
}

impl RowContract {
    /// Builds the contract, failing on the first column that cannot be
    /// interpreted.
    pub fn build(table: &Table) -> Result<Self, ContractError> {
        Self::from_columns(table.columns())
    }

    pub fn from_columns(columns: &[Column]) -> Result<Self, ContractError> {
        let mut rules = Vec::with_capacity(columns.len());
        for column in columns {
            rules.push(FieldRule::from_column(column)?);
        }
        Ok(Self { rules })
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.name.as_str())
    }

    /// Validates `row` and returns it normalized: numbers coerced, booleans
    /// parsed, the rich-text empty sentinel replaced by "". Fields the
    /// schema does not declare pass through untouched.
    pub fn validate(&self, row: &RowValues) -> Result<RowValues, ValidationReport> {
        let mut report = ValidationReport::empty();
        let mut out = row.clone();

        for rule in &self.rules {
            let value = row.get(&rule.name).unwrap_or(&CellValue::Null);
            match rule.check(value) {
                Ok(Some(normalized)) => {
                    out.insert(rule.name.clone(), normalized);
                }
                Ok(None) => {}
                Err(e) => report.push(rule.name.clone(), e),
            }
        }

        if report.is_empty() {
            Ok(out)
        } else {
            Err(report)
        }
    }
}

fn required() -> ValidationError {
    ValidationError::new("required", "This field is required")
}

fn expected(kind: &'static str) -> ValidationError {
    ValidationError::new("invalid_type", format!("Expected {kind}"))
}

impl FieldRule {
    fn from_column(column: &Column) -> Result<Self, ContractError> {
        let kind = match column.kind {
            ColumnType::Number => Kind::Number,
            ColumnType::Email => Kind::Email,
            ColumnType::Url => Kind::Url,
            ColumnType::Boolean => Kind::Boolean,
            ColumnType::Select => {
                let options = column.options();
                if options.is_empty() {
                    return Err(ContractError::SelectWithoutOptions(column.name.clone()));
                }
                Kind::Select(options.to_vec())
            }
            ColumnType::Richtext => Kind::RichText,
            ColumnType::Text | ColumnType::Phone | ColumnType::Textarea | ColumnType::Date => Kind::Text,
        };

        let rules = column.validation.clone().unwrap_or_default();
        let pattern = match rules.pattern.as_deref() {
            Some(p) => Some(Regex::new(p).map_err(|e| ContractError::InvalidPattern {
                column: column.name.clone(),
                reason: e.to_string(),
            })?),
            None => None,
        };

        Ok(Self {
            name: column.name.clone(),
            required: column.required,
            kind,
            min: rules.min,
            max: rules.max,
            pattern,
        })
    }

    /// `Ok(Some(v))` replaces the stored value, `Ok(None)` leaves it as is.
    fn check(&self, value: &CellValue) -> Result<Option<CellValue>, ValidationError> {
        match &self.kind {
            Kind::Number => self.check_number(value),
            Kind::Boolean => self.check_bool(value),
            Kind::RichText => {
                match value {
                    CellValue::Text(s) if s.trim() == RICHTEXT_EMPTY => {
                        let cleared = CellValue::text("");
                        self.check_text(&cleared)?;
                        Ok(Some(cleared))
                    }
                    other => self.check_text(other).map(|_| None),
                }
            }
            _ => self.check_text(value).map(|_| None),
        }
    }

    fn check_number(&self, value: &CellValue) -> Result<Option<CellValue>, ValidationError> {
        let n = match value {
            v if v.is_blank() => {
                return if self.required { Err(required()) } else { Ok(Some(CellValue::Null)) };
            }
            CellValue::Number(n) => *n,
            CellValue::Text(s) => s.trim().parse::<f64>().map_err(|_| expected("number"))?,
            _ => return Err(expected("number")),
        };
        if !n.is_finite() {
            return Err(expected("number"));
        }
        if let Some(min) = self.min {
            validation::min(min)(&n)?;
        }
        if let Some(max) = self.max {
            validation::max(max)(&n)?;
        }
        Ok(Some(CellValue::Number(n)))
    }

    fn check_bool(&self, value: &CellValue) -> Result<Option<CellValue>, ValidationError> {
        match value {
            CellValue::Bool(_) => Ok(None),
            CellValue::Text(s) if s == "true" => Ok(Some(CellValue::Bool(true))),
            CellValue::Text(s) if s == "false" => Ok(Some(CellValue::Bool(false))),
            v if v.is_blank() && self.required => Err(required()),
            v if v.is_blank() => Ok(Some(CellValue::Null)),
            _ => Err(expected("boolean")),
        }
    }

    fn check_text(&self, value: &CellValue) -> Result<(), ValidationError> {
        let s = match value {
            CellValue::Null => return if self.required { Err(required()) } else { Ok(()) },
            CellValue::Text(s) => s.as_str(),
            _ => return Err(expected("string")),
        };
        if s.is_empty() {
            // absent-but-present: optional fields accept "", required do not
            return if self.required { Err(required()) } else { Ok(()) };
        }
        if self.required {
            validation::non_empty(s)?;
        }

        match &self.kind {
            Kind::Email => validation::email(s)?,
            Kind::Url => validation::url(s)?,
            Kind::Select(options) => validation::one_of(options)(s)?,
            _ => {}
        }

        let chars = s.chars().count() as f64;
        if let Some(min) = self.min {
            if chars < min {
                return Err(ValidationError::new(
                    "min_chars",
                    format!("Must be at least {min} characters"),
                ));
            }
        }
        if let Some(max) = self.max {
            if chars > max {
                return Err(ValidationError::new(
                    "max_chars",
                    format!("Must be at most {max} characters"),
                ));
            }
        }
        if let Some(re) = &self.pattern {
            validation::matches(re)(s)?;
        }
        Ok(())
    }
}
