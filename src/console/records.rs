//! Core (non-template) fields of the activity and space forms.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::client::{ActivityDraft, SpaceDraft};
use crate::errors::FormError;
use crate::fields::{CustomFieldValue, FieldKind, Submission, Template};

/// Custom field carrying the booked space when no template provides one.
pub const SPACE_FIELD: &str = "space";

/// Posted key of the template selector.
pub const TEMPLATE_KEY: &str = "template_id";

/// Activity fields outside the template.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityCore {
    pub title: String,
    pub category_id: i64,
    pub organizer_user_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub space_id: i64,
}

impl ActivityCore {
    pub fn from_submission(sub: &Submission) -> Result<Self, FormError> {
        let space_id = required_id(sub, "space_id", "Space")?;
        Ok(Self {
            title: required(sub, "title", "Title")?.to_string(),
            category_id: required_id(sub, "category_id", "Category")?,
            organizer_user_id: required_id(sub, "organizer_user_id", "Organizer")?,
            start_time: parse_datetime("Start", required(sub, "start_time", "Start")?)?,
            end_time: parse_datetime("End", required(sub, "end_time", "End")?)?,
            space_id,
        })
    }

    /// Create body, with the space fallbacks applied to `custom_fields`.
    pub fn into_draft(
        self,
        template: Option<&Template>,
        custom_fields: Vec<CustomFieldValue>,
    ) -> ActivityDraft {
        let custom_fields = with_space_fallback(custom_fields, template, self.space_id);
        ActivityDraft {
            title: self.title,
            category_id: self.category_id,
            organizer_user_id: self.organizer_user_id,
            start_time: self.start_time,
            end_time: self.end_time,
            activity_type_id: template.map(|t| t.id),
            custom_fields,
        }
    }
}

/// Fill `space` fields the user left empty with the form's space, and attach
/// the space as a plain custom field when nothing else carries it.
///
/// With a template the result follows the template's definition order.
pub fn with_space_fallback(
    fields: Vec<CustomFieldValue>,
    template: Option<&Template>,
    space_id: i64,
) -> Vec<CustomFieldValue> {
    let space = space_id.to_string();
    match template {
        Some(template) => {
            let mut rest = fields;
            let mut ordered = Vec::with_capacity(rest.len() + 1);
            for def in &template.fields {
                match rest.iter().position(|f| f.name == def.name) {
                    Some(i) => ordered.push(rest.remove(i)),
                    None if def.field_type == FieldKind::Space => {
                        ordered.push(CustomFieldValue::new(def.name.clone(), space.as_str()))
                    }
                    None => {}
                }
            }
            ordered.extend(rest);
            ordered
        }
        None if fields.is_empty() => vec![CustomFieldValue::new(SPACE_FIELD, space)],
        None => fields,
    }
}

/// Space fields outside the template.
#[derive(Debug, Clone, PartialEq)]
pub struct SpaceCore {
    pub building_id: i64,
    pub name: String,
    pub space_type: String,
    pub capacity: Option<i64>,
}

impl SpaceCore {
    pub fn from_submission(sub: &Submission) -> Result<Self, FormError> {
        let capacity = match sub.non_empty("capacity") {
            Some(raw) => Some(parse_id("Capacity", raw)?),
            None => None,
        };
        Ok(Self {
            building_id: required_id(sub, "building_id", "Building")?,
            name: required(sub, "name", "Name")?.to_string(),
            space_type: sub.get("type").unwrap_or_default().trim().to_string(),
            capacity,
        })
    }

    /// Create body: `custom_fields` only when some were produced.
    pub fn into_draft(
        self,
        template: Option<&Template>,
        custom_fields: Vec<CustomFieldValue>,
    ) -> SpaceDraft {
        let custom_fields = Some(custom_fields).filter(|f| !f.is_empty());
        self.draft(template, custom_fields)
    }

    /// Update body: with a template selected `custom_fields` is always sent,
    /// so clearing every field clears the stored values too.
    pub fn into_update(
        self,
        template: Option<&Template>,
        custom_fields: Vec<CustomFieldValue>,
    ) -> SpaceDraft {
        let custom_fields = match template {
            Some(_) => Some(custom_fields),
            None => Some(custom_fields).filter(|f| !f.is_empty()),
        };
        self.draft(template, custom_fields)
    }

    fn draft(
        self,
        template: Option<&Template>,
        custom_fields: Option<Vec<CustomFieldValue>>,
    ) -> SpaceDraft {
        SpaceDraft {
            building_id: self.building_id,
            name: self.name,
            space_type: self.space_type,
            capacity: self.capacity,
            space_template_id: template.map(|t| t.id),
            custom_fields,
        }
    }
}

/// Selected template id, if the selector holds one.
pub fn selected_template(sub: &Submission) -> Result<Option<i64>, FormError> {
    sub.non_empty(TEMPLATE_KEY)
        .map(|raw| parse_id("Template", raw))
        .transpose()
}

/// Parse a `datetime-local` value (or a full RFC 3339 timestamp).
///
/// Values without an offset are taken as UTC.
pub fn parse_datetime(field: &str, raw: &str) -> Result<DateTime<Utc>, FormError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| FormError::InvalidValue {
            field: field.to_string(),
            message: format!("'{}' is not a date and time", raw),
        })
}

fn required<'a>(sub: &'a Submission, key: &str, field: &str) -> Result<&'a str, FormError> {
    sub.non_empty(key).ok_or_else(|| FormError::MissingRequired {
        field: field.to_string(),
    })
}

fn required_id(sub: &Submission, key: &str, field: &str) -> Result<i64, FormError> {
    parse_id(field, required(sub, key, field)?)
}

fn parse_id(field: &str, raw: &str) -> Result<i64, FormError> {
    raw.trim().parse().map_err(|_| FormError::InvalidValue {
        field: field.to_string(),
        message: format!("'{}' is not a whole number", raw),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::FieldDefinition;

    fn submission(pairs: &[(&str, &str)]) -> Submission {
        Submission::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    fn activity_pairs() -> Vec<(&'static str, &'static str)> {
        vec![
            ("title", "Standup"),
            ("category_id", "1"),
            ("organizer_user_id", "2"),
            ("start_time", "2026-03-01T09:00"),
            ("end_time", "2026-03-01T09:15"),
            ("space_id", "4"),
        ]
    }

    #[test]
    fn test_missing_space_blocks_with_message() {
        let mut pairs = activity_pairs();
        pairs.retain(|(k, _)| *k != "space_id");
        let err = ActivityCore::from_submission(&submission(&pairs)).unwrap_err();
        assert_eq!(err.to_string(), "Space is required");
    }

    #[test]
    fn test_activity_core_parses_local_datetimes() {
        let core = ActivityCore::from_submission(&submission(&activity_pairs())).unwrap();
        assert_eq!(core.start_time.to_rfc3339(), "2026-03-01T09:00:00+00:00");
        assert_eq!(core.space_id, 4);
    }

    #[test]
    fn test_no_template_sends_space_custom_field() {
        let core = ActivityCore::from_submission(&submission(&activity_pairs())).unwrap();
        let draft = core.into_draft(None, vec![]);
        assert_eq!(draft.custom_fields, vec![CustomFieldValue::new("space", "4")]);
        assert_eq!(draft.activity_type_id, None);
    }

    #[test]
    fn test_empty_space_field_falls_back_to_form_space() {
        let template = Template {
            id: 9,
            name: "Booking".into(),
            description: None,
            fields: vec![
                FieldDefinition::new("Room", FieldKind::Space),
                FieldDefinition::new("Notes", FieldKind::Text),
            ],
        };
        let filled = with_space_fallback(vec![], Some(&template), 4);
        assert_eq!(filled, vec![CustomFieldValue::new("Room", "4")]);

        let chosen = with_space_fallback(
            vec![CustomFieldValue::new("Room", "7")],
            Some(&template),
            4,
        );
        assert_eq!(chosen, vec![CustomFieldValue::new("Room", "7")]);
    }

    #[test]
    fn test_space_fallback_keeps_definition_order() {
        let template = Template {
            id: 1,
            name: "Booking".into(),
            description: None,
            fields: vec![
                FieldDefinition::new("Room", FieldKind::Space),
                FieldDefinition::new("Catering", FieldKind::Boolean),
                FieldDefinition::new("Overflow", FieldKind::Space),
            ],
        };
        let filled = with_space_fallback(
            vec![
                CustomFieldValue::new("Catering", true),
                CustomFieldValue::new("Overflow", "7"),
            ],
            Some(&template),
            4,
        );
        assert_eq!(
            filled,
            vec![
                CustomFieldValue::new("Room", "4"),
                CustomFieldValue::new("Catering", true),
                CustomFieldValue::new("Overflow", "7"),
            ]
        );
    }

    #[test]
    fn test_template_without_space_field_adds_nothing() {
        let template = Template {
            id: 9,
            name: "Plain".into(),
            description: None,
            fields: vec![],
        };
        assert!(with_space_fallback(vec![], Some(&template), 4).is_empty());
    }

    #[test]
    fn test_bad_number_is_invalid_value() {
        let mut pairs = activity_pairs();
        pairs[1] = ("category_id", "one");
        let err = ActivityCore::from_submission(&submission(&pairs)).unwrap_err();
        assert!(matches!(err, FormError::InvalidValue { .. }));
    }

    #[test]
    fn test_parse_datetime_formats() {
        assert!(parse_datetime("Start", "2026-03-01T09:00:30").is_ok());
        assert_eq!(
            parse_datetime("Start", "2026-03-01T10:00:00+01:00")
                .unwrap()
                .to_rfc3339(),
            "2026-03-01T09:00:00+00:00"
        );
        assert!(parse_datetime("Start", "tomorrow").is_err());
    }

    #[test]
    fn test_space_core_requires_name() {
        let err = SpaceCore::from_submission(&submission(&[("building_id", "1"), ("name", " ")]))
            .unwrap_err();
        assert_eq!(err.to_string(), "Name is required");

        let core = SpaceCore::from_submission(&submission(&[
            ("building_id", "1"),
            ("name", "Hall"),
            ("type", "auditorium"),
            ("capacity", ""),
        ]))
        .unwrap();
        assert_eq!(core.capacity, None);
        let draft = core.into_draft(None, vec![]);
        assert_eq!(draft.space_template_id, None);
        assert_eq!(draft.custom_fields, None);
    }

    #[test]
    fn test_space_update_with_template_always_sends_custom_fields() {
        let template = Template {
            id: 2,
            name: "Hall".into(),
            description: None,
            fields: vec![FieldDefinition::new("Notes", FieldKind::Text)],
        };
        let core = || {
            SpaceCore::from_submission(&submission(&[("building_id", "1"), ("name", "Hall")]))
                .unwrap()
        };
        assert_eq!(
            core().into_update(Some(&template), vec![]).custom_fields,
            Some(vec![])
        );
        assert_eq!(core().into_update(None, vec![]).custom_fields, None);
        assert_eq!(core().into_draft(Some(&template), vec![]).custom_fields, None);
    }

    #[test]
    fn test_selected_template() {
        assert_eq!(selected_template(&submission(&[("template_id", "")])).unwrap(), None);
        assert_eq!(
            selected_template(&submission(&[("template_id", "3")])).unwrap(),
            Some(3)
        );
        assert!(selected_template(&submission(&[("template_id", "x")])).is_err());
    }
}
