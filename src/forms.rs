//! Submitted form values, per-field validation errors and the helpers the
//! entity forms share.

use std::{collections::BTreeMap, ops::RangeInclusive, sync::LazyLock};

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use uuid::Uuid;

pub const REQUIRED: &str = "This field is required.";
const NON_FIELD: &str = "__all__";

#[expect(clippy::unwrap_used)]
static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields
            .entry(field.into())
            .or_default()
            .push(message.into());
    }

    /// Error not tied to a single input, shown at the top of the form.
    pub fn add_non_field(&mut self, message: impl Into<String>) {
        self.add(NON_FIELD, message);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn first(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    #[must_use]
    pub fn non_field(&self) -> Option<&str> {
        self.first(NON_FIELD)
    }

    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

/// Raw `application/x-www-form-urlencoded` pairs, for forms with repeated
/// keys (checkbox groups) or keys built from record ids.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(transparent)]
pub struct FormFields(Vec<(String, String)>);

impl FormFields {
    #[must_use]
    pub fn get(&self, name: &str) -> &str {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map_or("", |(_, value)| value.as_str())
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|(key, _)| key == name)
    }

    pub fn all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// One `<option>` or checkbox of a choice field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl Choice {
    pub fn new(value: impl ToString, label: impl Into<String>, selected: bool) -> Self {
        Self {
            value: value.to_string(),
            label: label.into(),
            selected,
        }
    }
}

pub fn required(errors: &mut FormErrors, field: &str, value: &str, max_len: usize) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    } else if value.chars().count() > max_len {
        errors.add(
            field,
            format!("Ensure this value has at most {max_len} characters."),
        );
    }
    value.to_owned()
}

pub fn optional(errors: &mut FormErrors, field: &str, value: &str, max_len: usize) -> String {
    let value = value.trim();
    if value.chars().count() > max_len {
        errors.add(
            field,
            format!("Ensure this value has at most {max_len} characters."),
        );
    }
    value.to_owned()
}

/// Empty is allowed; anything else must look like an address.
pub fn email(errors: &mut FormErrors, field: &str, value: &str) -> String {
    let value = optional(errors, field, value, 100);
    if !value.is_empty() && !EMAIL.is_match(&value) {
        errors.add(field, "Enter a valid email address.");
    }
    value
}

pub fn integer(
    errors: &mut FormErrors,
    field: &str,
    value: &str,
    range: RangeInclusive<i64>,
) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }
    optional_integer(errors, field, value, range)
}

pub fn optional_integer(
    errors: &mut FormErrors,
    field: &str,
    value: &str,
    range: RangeInclusive<i64>,
) -> Option<i64> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<i64>() {
        Ok(n) if range.contains(&n) => Some(n),
        Ok(_) => {
            errors.add(
                field,
                format!(
                    "Ensure this value is between {} and {}.",
                    range.start(),
                    range.end()
                ),
            );
            None
        }
        Err(_) => {
            errors.add(field, "Enter a whole number.");
            None
        }
    }
}

pub fn date(errors: &mut FormErrors, field: &str, value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .inspect_err(|_| errors.add(field, "Enter a valid date."))
        .ok()
}

/// Empty select means "none".
pub fn optional_id(errors: &mut FormErrors, field: &str, value: &str) -> Option<Uuid> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Uuid::parse_str(value)
        .inspect_err(|_| errors.add(field, "Select a valid choice."))
        .ok()
}

/// Every value must parse; duplicates are dropped.
pub fn ids<'a>(
    errors: &mut FormErrors,
    field: &str,
    values: impl Iterator<Item = &'a str>,
) -> Vec<Uuid> {
    let mut out = Vec::new();
    for value in values {
        match Uuid::parse_str(value.trim()) {
            Ok(id) if !out.contains(&id) => out.push(id),
            Ok(_) => {}
            Err(_) => errors.add(field, "Select a valid choice."),
        }
    }
    out
}
