//! Request validation for the course and student resources.
//!
//! Each resource declares a static list of [`FieldRule`]s. A JSON body is
//! checked against every rule at once so that the caller gets all field
//! errors in one response, then converted into the typed inputs from
//! [`crate::models`]. Serialization of stored records is the plain `Serialize`
//! derive on the model types.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{CoursePatch, NewCourse, NewStudent, StudentPatch};

pub const MISSING: &str = "Missing data for required field.";
pub const NULL: &str = "Field may not be null.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const UNKNOWN_FIELD: &str = "Unknown field.";
pub const INVALID_EMAIL: &str = "Not a valid email address.";
pub const INVALID_INPUT: &str = "Invalid input type.";

/// Key used for errors that belong to the body as a whole.
pub const SCHEMA_KEY: &str = "_schema";

/// Field name to the list of messages for that field.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("No JSON data provided")]
    Empty,

    #[error("Validation failed")]
    Invalid(FieldErrors),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Email,
}

/// Validation rule for a single string field.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub name: &'static str,
    pub required: bool,
    pub nullable: bool,
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    pub format: Option<Format>,
}

impl FieldRule {
    pub const fn string(name: &'static str) -> Self {
        Self {
            name,
            required: false,
            nullable: false,
            min_len: None,
            max_len: None,
            format: None,
        }
    }

    pub const fn required(self) -> Self {
        Self { required: true, ..self }
    }

    pub const fn nullable(self) -> Self {
        Self { nullable: true, ..self }
    }

    pub const fn length(self, min: usize, max: usize) -> Self {
        Self {
            min_len: Some(min),
            max_len: Some(max),
            ..self
        }
    }

    pub const fn max_length(self, max: usize) -> Self {
        Self {
            max_len: Some(max),
            ..self
        }
    }

    pub const fn email(self) -> Self {
        Self {
            format: Some(Format::Email),
            ..self
        }
    }

    fn check(&self, value: &str, errors: &mut FieldErrors) {
        let len = value.chars().count();
        let length_error = match (self.min_len, self.max_len) {
            (Some(min), Some(max)) if len < min || len > max => {
                Some(format!("Length must be between {} and {}.", min, max))
            }
            (None, Some(max)) if len > max => Some(format!("Longer than maximum length {}.", max)),
            (Some(min), None) if len < min => Some(format!("Shorter than minimum length {}.", min)),
            _ => None,
        };
        if let Some(message) = length_error {
            errors.add(self.name, message);
        }

        if self.format == Some(Format::Email) && !is_valid_email(value) {
            errors.add(self.name, INVALID_EMAIL);
        }
    }
}

pub const COURSE_FIELDS: &[FieldRule] = &[
    FieldRule::string("name").required().length(1, 100),
    FieldRule::string("description").nullable().max_length(500),
];

pub const STUDENT_FIELDS: &[FieldRule] = &[
    FieldRule::string("name").required().length(1, 100),
    FieldRule::string("email").required().max_length(120).email(),
];

/// Values that passed validation. A present key maps to `None` when the
/// body held an explicit `null`.
#[derive(Debug, Default)]
pub struct Validated {
    values: BTreeMap<&'static str, Option<String>>,
}

impl Validated {
    /// Removes a supplied field. The outer `Option` tells whether the field
    /// was present at all.
    pub fn take(&mut self, name: &str) -> Option<Option<String>> {
        self.values.remove(name)
    }

    /// Removes a field that full validation guarantees to be a non-null string.
    fn take_required(&mut self, name: &str) -> String {
        self.take(name).flatten().unwrap_or_default()
    }
}

/// Checks `body` against `rules`. With `partial`, required fields may be
/// omitted but anything supplied must still be valid.
pub fn validate(body: &Value, rules: &[FieldRule], partial: bool) -> Result<Validated, SchemaError> {
    let object = as_object(body)?;
    let mut errors = FieldErrors::new();
    let mut validated = Validated::default();

    for key in object.keys() {
        if !rules.iter().any(|rule| rule.name == key.as_str()) {
            errors.add(key, UNKNOWN_FIELD);
        }
    }

    for rule in rules {
        match object.get(rule.name) {
            None => {
                if rule.required && !partial {
                    errors.add(rule.name, MISSING);
                }
            }
            Some(Value::Null) => {
                if rule.nullable {
                    validated.values.insert(rule.name, None);
                } else {
                    errors.add(rule.name, NULL);
                }
            }
            Some(Value::String(value)) => {
                let before = errors.get(rule.name).map_or(0, <[String]>::len);
                rule.check(value, &mut errors);
                if errors.get(rule.name).map_or(0, <[String]>::len) == before {
                    validated.values.insert(rule.name, Some(value.clone()));
                }
            }
            Some(_) => errors.add(rule.name, NOT_A_STRING),
        }
    }

    if errors.is_empty() {
        Ok(validated)
    } else {
        Err(SchemaError::Invalid(errors))
    }
}

fn as_object(body: &Value) -> Result<&Map<String, Value>, SchemaError> {
    match body {
        Value::Null => Err(SchemaError::Empty),
        Value::Object(object) if object.is_empty() => Err(SchemaError::Empty),
        Value::Object(object) => Ok(object),
        _ => {
            let mut errors = FieldErrors::new();
            errors.add(SCHEMA_KEY, INVALID_INPUT);
            Err(SchemaError::Invalid(errors))
        }
    }
}

pub struct CourseSchema;

impl CourseSchema {
    pub fn load(body: &Value) -> Result<NewCourse, SchemaError> {
        let mut fields = validate(body, COURSE_FIELDS, false)?;
        Ok(NewCourse {
            name: fields.take_required("name"),
            description: fields.take("description").flatten(),
        })
    }

    pub fn load_partial(body: &Value) -> Result<CoursePatch, SchemaError> {
        let mut fields = validate(body, COURSE_FIELDS, true)?;
        Ok(CoursePatch {
            name: fields.take("name").flatten(),
            description: fields.take("description"),
        })
    }
}

pub struct StudentSchema;

impl StudentSchema {
    pub fn load(body: &Value) -> Result<NewStudent, SchemaError> {
        let mut fields = validate(body, STUDENT_FIELDS, false)?;
        Ok(NewStudent {
            name: fields.take_required("name"),
            email: fields.take_required("email"),
        })
    }

    pub fn load_partial(body: &Value) -> Result<StudentPatch, SchemaError> {
        let mut fields = validate(body, STUDENT_FIELDS, true)?;
        Ok(StudentPatch {
            name: fields.take("name").flatten(),
            email: fields.take("email").flatten(),
        })
    }
}

const LOCAL_PART_SPECIALS: &str = "!#$%&'*+/=?^_`{|}~-";

/// Syntax check for `local@domain.tld` addresses.
pub fn is_valid_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    is_valid_local_part(local) && is_valid_domain(domain)
}

fn is_valid_local_part(local: &str) -> bool {
    if local.is_empty() || local.len() > 64 {
        return false;
    }
    local.split('.').all(|atom| {
        !atom.is_empty()
            && atom
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || LOCAL_PART_SPECIALS.contains(c))
    })
}

fn is_valid_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || domain.len() > 253 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });

    let tld = labels[labels.len() - 1];
    labels_ok && tld.len() >= 2 && !tld.chars().all(|c| c.is_ascii_digit())
}
