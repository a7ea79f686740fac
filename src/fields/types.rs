use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The kind of a custom field, as named by the server.
///
/// Unrecognized kinds are kept verbatim in `Unknown` so that templates using
/// server-side types this client has not special-cased still render (as free
/// text) and round-trip unchanged through the template editor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Text,
    Number,
    Boolean,
    Date,
    Time,
    DateTime,
    Select,
    Space,
    User,
    Unknown(String),
}

impl FieldKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::Select => "select",
            Self::Space => "space",
            Self::User => "user",
            Self::Unknown(raw) => raw,
        }
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Self::Boolean)
    }
}

impl From<&str> for FieldKind {
    fn from(s: &str) -> Self {
        match s {
            "text" => Self::Text,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "date" => Self::Date,
            "time" => Self::Time,
            "datetime" => Self::DateTime,
            "select" => Self::Select,
            "space" => Self::Space,
            "user" => Self::User,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl FromStr for FieldKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(s.into())
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(FieldKind::from(raw.as_str()))
    }
}

/// One named, typed slot in a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub field_type: FieldKind,
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<String>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: FieldKind) -> Self {
        Self {
            name: name.into(),
            field_type,
            options: Vec::new(),
        }
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }
}

/// Which server collection a template comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemplateKind {
    ActivityType,
    SpaceTemplate,
}

const ACTIVITY_EDITOR_KINDS: &[FieldKind] = &[
    FieldKind::Text,
    FieldKind::Number,
    FieldKind::Select,
    FieldKind::DateTime,
    FieldKind::Date,
    FieldKind::Time,
    FieldKind::Boolean,
    FieldKind::Space,
];

const SPACE_EDITOR_KINDS: &[FieldKind] = &[
    FieldKind::Text,
    FieldKind::Number,
    FieldKind::Select,
    FieldKind::User,
];

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ActivityType => "activity_type",
            Self::SpaceTemplate => "space_template",
        }
    }

    /// Collection path on the REST API.
    pub fn collection_path(&self) -> &'static str {
        match self {
            Self::ActivityType => "/activities/types",
            Self::SpaceTemplate => "/logistics/space_templates",
        }
    }

    /// Field types the template editor offers for this kind of template.
    pub fn editor_kinds(&self) -> &'static [FieldKind] {
        match self {
            Self::ActivityType => ACTIVITY_EDITOR_KINDS,
            Self::SpaceTemplate => SPACE_EDITOR_KINDS,
        }
    }

    /// Name of the free-text descriptor the server stores on the template.
    pub fn description_key(&self) -> &'static str {
        match self {
            Self::ActivityType => "metadata",
            Self::SpaceTemplate => "description",
        }
    }
}

impl FromStr for TemplateKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "activity" | "activity_type" | "activity-types" => Ok(Self::ActivityType),
            "space" | "space_template" | "space-templates" => Ok(Self::SpaceTemplate),
            _ => Err(format!("Invalid template kind: {}", s)),
        }
    }
}

/// A server-defined schema attached to a category of record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    pub name: String,
    /// `metadata` on activity types, `description` on space templates.
    #[serde(default, alias = "metadata", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub fields: Vec<FieldDefinition>,
}

impl Template {
    pub fn field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Value carried by a submitted custom field.
///
/// Stored values written by other clients may be numbers; those are read
/// back as their textual form, which is what the inputs display.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Text(String),
    #[default]
    Null,
}

impl<'de> Deserialize<'de> for FieldValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::String(s) => Self::Text(s),
            other => Self::Text(other.to_string()),
        })
    }
}

impl FieldValue {
    /// Empty submissions are "not provided" rather than "cleared".
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            Self::Bool(_) => false,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// A submitted name/value pair, attached to a created or edited record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFieldValue {
    pub name: String,
    #[serde(default)]
    pub value: FieldValue,
}

impl CustomFieldValue {
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// One selectable record from a foreign collection (a space, a user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignOption {
    pub id: i64,
    pub label: String,
}

/// A foreign option list as fetched for one form instance.
///
/// A failed fetch is kept as its own state so the selector can show a
/// placeholder while the rest of the form keeps working.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OptionList {
    #[default]
    Empty,
    Loaded(Vec<ForeignOption>),
    Failed,
}

impl OptionList {
    pub fn options(&self) -> &[ForeignOption] {
        match self {
            Self::Loaded(options) => options,
            Self::Empty | Self::Failed => &[],
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
