//! Declarative form schemas.
//!
//! Each form is a static [`Schema`]: a list of fields (name, label, kind,
//! required flag) plus cross-field checks. One routine, [`Schema::validate`],
//! evaluates any schema against submitted values, and [`FormModel`] maps
//! between submitted values and the typed record through serde, so the field
//! names in a schema are the serialized names of the record.

pub mod confirmation;
pub mod proposal;
pub mod registration;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

pub const FIELD_REQUIRED: &str = "This field is required.";
pub const NOT_A_VALID_CHOICE: &str = "Not a valid choice";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Rendered as an email input; validated like text.
    Email,
    TextArea,
    Boolean,
    /// Value must be one of the choices; an empty submission takes the first.
    Select(&'static [&'static str]),
}

impl FieldKind {
    const fn widget(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Email => "email",
            Self::TextArea => "textarea",
            Self::Boolean => "checkbox",
            Self::Select(_) => "select",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl Field {
    #[must_use]
    pub const fn new(name: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            label,
            kind,
            required: false,
        }
    }

    #[must_use]
    pub const fn required(self) -> Self {
        Self {
            required: true,
            ..self
        }
    }
}

/// Returns the offending field and message when the check fails.
pub type CrossCheck = fn(&FormValues) -> Option<(&'static str, &'static str)>;

#[derive(Debug)]
pub struct Schema {
    pub fields: &'static [Field],
    pub checks: &'static [CrossCheck],
}

/// Raw submitted values, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct FormValues(HashMap<String, String>);

impl FormValues {
    /// The submitted value, or `""` when the field is absent.
    #[must_use]
    pub fn get(&self, name: &str) -> &str {
        self.0.get(name).map_or("", String::as_str)
    }

    /// Checkbox semantics: present and neither empty nor `false`.
    #[must_use]
    pub fn checked(&self, name: &str) -> bool {
        matches!(self.0.get(name), Some(value) if !value.is_empty() && value != "false")
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_string(), value.into());
    }

    pub fn set_checked(&mut self, name: &str, checked: bool) {
        if checked {
            self.set(name, "y");
        } else {
            self.0.remove(name);
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Per-field messages; at most one per field, first failure wins.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FormErrors(Vec<(&'static str, String)>);

impl FormErrors {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, message)| message.as_str())
    }

    fn add(&mut self, name: &'static str, message: impl Into<String>) {
        if self.get(name).is_none() {
            self.0.push((name, message.into()));
        }
    }
}

impl Schema {
    /// Validate `values` in place; empty selects are set to their first choice.
    pub fn validate(&self, values: &mut FormValues) -> FormErrors {
        let mut errors = FormErrors::default();

        for field in self.fields {
            let value = values.get(field.name).trim().to_string();
            match field.kind {
                FieldKind::Boolean => {}
                FieldKind::Select(choices) => {
                    if value.is_empty() {
                        match choices.first() {
                            Some(first) => values.set(field.name, *first),
                            None => errors.add(field.name, NOT_A_VALID_CHOICE),
                        }
                    } else if !choices.iter().any(|choice| *choice == value) {
                        errors.add(field.name, NOT_A_VALID_CHOICE);
                    }
                }
                FieldKind::Text | FieldKind::Email | FieldKind::TextArea => {
                    if field.required && value.is_empty() {
                        errors.add(field.name, FIELD_REQUIRED);
                    }
                }
            }
        }

        for check in self.checks {
            if let Some((name, message)) = check(values) {
                errors.add(name, message);
            }
        }

        errors
    }

    /// Template view of every field with its current value and error.
    #[must_use]
    pub fn view<'a>(&self, values: &'a FormValues, errors: &'a FormErrors) -> Vec<FieldView<'a>> {
        self.fields
            .iter()
            .map(|field| {
                let value = values.get(field.name);
                let options = match field.kind {
                    FieldKind::Select(choices) => choices
                        .iter()
                        .enumerate()
                        .map(|(index, choice)| OptionView {
                            value: choice,
                            selected: if value.is_empty() {
                                index == 0
                            } else {
                                *choice == value
                            },
                        })
                        .collect(),
                    _ => Vec::new(),
                };
                FieldView {
                    name: field.name,
                    label: field.label,
                    widget: field.kind.widget(),
                    required: field.required,
                    value,
                    checked: values.checked(field.name),
                    options,
                    error: errors.get(field.name),
                }
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct OptionView {
    pub value: &'static str,
    pub selected: bool,
}

#[derive(Debug, Serialize)]
pub struct FieldView<'a> {
    pub name: &'static str,
    pub label: &'static str,
    pub widget: &'static str,
    pub required: bool,
    pub value: &'a str,
    pub checked: bool,
    pub options: Vec<OptionView>,
    pub error: Option<&'a str>,
}

/// Maps a typed record to and from form values using its schema.
pub trait FormModel: Serialize + DeserializeOwned {
    fn schema() -> &'static Schema;

    /// Build the record from (already validated) values.
    ///
    /// # Errors
    /// Returns an error if the values do not deserialize into the record.
    fn from_values(values: &FormValues) -> Result<Self, serde_json::Error> {
        let document: Map<String, Value> = Self::schema()
            .fields
            .iter()
            .map(|field| {
                let value = match field.kind {
                    FieldKind::Boolean => Value::Bool(values.checked(field.name)),
                    _ => Value::String(values.get(field.name).to_string()),
                };
                (field.name.to_string(), value)
            })
            .collect();
        serde_json::from_value(Value::Object(document))
    }

    /// Values that pre-fill an edit form.
    fn to_values(&self) -> FormValues {
        let mut values = FormValues::default();
        if let Ok(Value::Object(document)) = serde_json::to_value(self) {
            for field in Self::schema().fields {
                match document.get(field.name) {
                    Some(Value::String(value)) => values.set(field.name, value.as_str()),
                    Some(Value::Bool(checked)) => values.set_checked(field.name, *checked),
                    _ => {}
                }
            }
        }
        values
    }
}
