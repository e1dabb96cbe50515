//! Table-driven field validation shared by every catalog resource.
//!
//! A [`Schema`] is a list of [`FieldSpec`]s. Validating a request body
//! against it yields either the accumulated [`FieldError`]s or a
//! [`Validated`] column/value list that can be applied to any sea-orm
//! active model.

use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, NaiveDate};
use sea_orm::{ActiveModelTrait, EntityTrait, Value};
use serde::Serialize;
use serde_json::Map;

use super::validation::{
    as_boolean, as_int, is_empty, is_not_empty_string, is_string, length_error,
};

/// Where an invalid value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    Body,
    Params,
    Query,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub msg: String,
    pub location: Location,
}

impl FieldError {
    pub fn body(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            msg: msg.into(),
            location: Location::Body,
        }
    }

    pub fn params(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            msg: msg.into(),
            location: Location::Params,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Non-empty text within the given character bounds.
    Text { min: usize, max: usize },
    /// Any string, including empty.
    FreeText,
    Integer { min: Option<i64>, max: Option<i64> },
    Boolean,
    /// Calendar date, stored as `YYYY-MM-DD`.
    Date,
    OneOf(&'static [&'static str]),
    Email { max: usize },
    /// Text kept exactly as sent. Credentials and usernames must match
    /// byte for byte at login, so they are never HTML-escaped.
    Verbatim { min: usize, max: usize },
}

impl FieldKind {
    fn null_value(self) -> Value {
        match self {
            Self::Integer { .. } => Value::Int(None),
            Self::Boolean => Value::Bool(None),
            _ => Value::String(None),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Column name, also the preferred request key.
    pub name: &'static str,
    /// Alternative request keys accepted for the same column.
    pub aliases: &'static [&'static str],
    pub kind: FieldKind,
    /// Must be present when creating.
    pub required: bool,
    /// Accepts `null` (or an empty multipart value) as `NULL`.
    pub nullable: bool,
}

impl FieldSpec {
    #[must_use]
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            aliases: &[],
            kind,
            required: false,
            nullable: false,
        }
    }

    #[must_use]
    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub const fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    fn lookup<'a>(&self, input: &'a Map<String, serde_json::Value>) -> Option<&'a serde_json::Value> {
        input
            .get(self.name)
            .or_else(|| self.aliases.iter().find_map(|alias| input.get(*alias)))
    }

    fn message(&self) -> String {
        let name = self.name;
        match self.kind {
            FieldKind::Text { min, max } if min == max => {
                format!("{name} must be a string of length {max}")
            }
            FieldKind::Text { min, max } => {
                format!("{name} is required, {}", length_error(Some(min), max))
            }
            FieldKind::Verbatim { min, max } => {
                format!("{name} is required, {}", length_error(Some(min), max))
            }
            FieldKind::FreeText => format!("{name} must be a string"),
            FieldKind::Integer {
                min: Some(min),
                max: Some(max),
            } => format!("{name} must be an integer between {min} and {max}"),
            FieldKind::Integer {
                min: Some(min),
                max: None,
            } => format!("{name} must be an integer, at least {min}"),
            FieldKind::Integer { .. } => format!("{name} must be an integer"),
            FieldKind::Boolean => format!("{name} must be a boolean"),
            FieldKind::Date => format!("{name} must be a date"),
            FieldKind::OneOf(options) => {
                let quoted: Vec<String> = options.iter().map(|o| format!("\"{o}\"")).collect();
                format!("{name} must be one of {}", quoted.join(", "))
            }
            FieldKind::Email { max } => {
                format!("{name} must be an email address, {}", length_error(None, max))
            }
        }
    }

    /// Converts a present, non-null value into a column value.
    fn convert(&self, value: &serde_json::Value) -> Option<Value> {
        match self.kind {
            FieldKind::Text { min, max } => {
                is_not_empty_string(value, Some(min), Some(max))
                    .then(|| value.as_str().map(sanitize))
                    .flatten()
                    .map(Value::from)
            }
            FieldKind::Verbatim { min, max } => {
                is_not_empty_string(value, Some(min), Some(max))
                    .then(|| value.as_str().map(ToString::to_string))
                    .flatten()
                    .map(Value::from)
            }
            FieldKind::FreeText => is_string(value)
                .then(|| value.as_str().map(sanitize))
                .flatten()
                .map(Value::from),
            FieldKind::Integer { min, max } => {
                let n = as_int(value)?;
                if min.is_some_and(|min| n < min) || max.is_some_and(|max| n > max) {
                    return None;
                }
                i32::try_from(n).ok().map(Value::from)
            }
            FieldKind::Boolean => as_boolean(value).map(Value::from),
            FieldKind::Date => value.as_str().and_then(parse_date).map(Value::from),
            FieldKind::OneOf(options) => value
                .as_str()
                .filter(|s| options.contains(s))
                .map(|s| Value::from(s.to_string())),
            FieldKind::Email { max } => value
                .as_str()
                .filter(|s| is_not_empty_string(value, Some(3), Some(max)) && looks_like_email(s))
                .map(|s| Value::from(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every field is checked; required fields must be present.
    Create,
    /// Only fields present in the request are checked.
    Patch,
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    pub fields: &'static [FieldSpec],
}

impl Schema {
    #[must_use]
    pub const fn new(fields: &'static [FieldSpec]) -> Self {
        Self { fields }
    }

    pub fn validate(
        &self,
        input: &Map<String, serde_json::Value>,
        mode: Mode,
    ) -> Result<Validated, Vec<FieldError>> {
        let mut errors = Vec::new();
        let mut values = Vec::new();

        for field in self.fields {
            match field.lookup(input) {
                None if mode == Mode::Create && field.required => {
                    errors.push(FieldError::body(field.name, field.message()));
                }
                None if mode == Mode::Create && field.nullable => {
                    values.push((field.name, field.kind.null_value()));
                }
                None => {}
                Some(value) if is_empty(value) && field.nullable => {
                    values.push((field.name, field.kind.null_value()));
                }
                Some(value) => match field.convert(value) {
                    Some(converted) => values.push((field.name, converted)),
                    None => errors.push(FieldError::body(field.name, field.message())),
                },
            }
        }

        if errors.is_empty() {
            Ok(Validated { values })
        } else {
            Err(errors)
        }
    }
}

/// Column/value pairs that passed validation, already sanitized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validated {
    values: Vec<(&'static str, Value)>,
}

impl Validated {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn columns(&self) -> Vec<&'static str> {
        self.values.iter().map(|(name, _)| *name).collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(column, _)| *column == name)
            .map(|(_, value)| value)
    }

    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            Value::String(Some(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        match self.get(name)? {
            Value::Int(Some(n)) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            Value::Bool(Some(b)) => Some(*b),
            _ => None,
        }
    }

    /// Adds a value that did not come from the request body.
    pub fn insert(&mut self, name: &'static str, value: impl Into<Value>) {
        self.values.retain(|(column, _)| *column != name);
        self.values.push((name, value.into()));
    }

    /// Removes a value so it is not written to its same-named column.
    pub fn take(&mut self, name: &str) -> Option<Value> {
        let index = self.values.iter().position(|(column, _)| *column == name)?;
        Some(self.values.remove(index).1)
    }

    /// Sets every validated column on the active model.
    pub fn apply_to<A>(&self, active: &mut A) -> anyhow::Result<()>
    where
        A: ActiveModelTrait,
    {
        for (name, value) in &self.values {
            let column = <<A::Entity as EntityTrait>::Column as FromStr>::from_str(name)
                .map_err(|_| anyhow!("Unknown column: {name}"))?;
            active.set(column, value.clone());
        }
        Ok(())
    }
}

/// Escapes markup so stored text cannot inject HTML.
#[must_use]
pub fn sanitize(s: &str) -> String {
    html_escape::encode_text(s).into_owned()
}

fn parse_date(s: &str) -> Option<String> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive()))
        .map(|date| date.format("%Y-%m-%d").to_string())
}

fn looks_like_email(s: &str) -> bool {
    match s.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && !domain.is_empty() && !s.chars().any(char::is_whitespace)
        }
        None => false,
    }
}
