use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::fields::{CustomFieldValue, ForeignOption};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Building {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Space {
    pub id: i64,
    pub building_id: i64,
    pub name: String,
    #[serde(default, rename = "type")]
    pub space_type: Option<String>,
    #[serde(default)]
    pub capacity: Option<i64>,
    #[serde(default)]
    pub space_template_id: Option<i64>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub custom_fields: Vec<CustomFieldValue>,
}

impl Space {
    /// Selector entry: `name (type)`.
    pub fn to_option(&self) -> ForeignOption {
        ForeignOption {
            id: self.id,
            label: format!("{} ({})", self.name, self.space_type.as_deref().unwrap_or("")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

impl User {
    pub fn to_option(&self) -> ForeignOption {
        let name = format!("{} {}", self.first_name, self.last_name);
        let name = name.trim();
        let label = match (name.is_empty(), self.email.is_empty()) {
            (true, _) => self.email.clone(),
            (false, true) => name.to_string(),
            (false, false) => format!("{} <{}>", name, self.email),
        };
        ForeignOption { id: self.id, label }
    }
}

/// Create body for `POST /activities/`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityDraft {
    pub title: String,
    pub category_id: i64,
    pub organizer_user_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_type_id: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_fields: Vec<CustomFieldValue>,
}

/// Create/update body for the spaces collection.
///
/// The server replaces a space's stored custom fields whenever the key is
/// present, so `Some(vec![])` clears them and `None` leaves them alone.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpaceDraft {
    pub building_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub space_type: String,
    pub capacity: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub space_template_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_fields: Option<Vec<CustomFieldValue>>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<CustomFieldValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<CustomFieldValue>>::deserialize(deserializer)?.unwrap_or_default())
}
