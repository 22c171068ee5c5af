use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Users,
    Classes,
    ClassEnrollments,
    Projects,
    Submissions,
    Grades,
    JournalEntries,
    Reports,
    Schemes,
    AiSettings,
}

impl Entity {
    pub fn table_name(&self) -> &'static str {
        match self {
            Entity::Users => "users",
            Entity::Classes => "classes",
            Entity::ClassEnrollments => "class_enrollments",
            Entity::Projects => "projects",
            Entity::Submissions => "submissions",
            Entity::Grades => "grades",
            Entity::JournalEntries => "journal_entries",
            Entity::Reports => "reports",
            Entity::Schemes => "schemes",
            Entity::AiSettings => "ai_settings",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

impl FromStr for Entity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let entity = match s {
            "users" | "profiles" => Entity::Users,
            "classes" => Entity::Classes,
            "class_enrollments" => Entity::ClassEnrollments,
            "projects" => Entity::Projects,
            "submissions" => Entity::Submissions,
            "grades" => Entity::Grades,
            "journal_entries" => Entity::JournalEntries,
            "reports" => Entity::Reports,
            "schemes" => Entity::Schemes,
            "ai_settings" => Entity::AiSettings,
            other => return Err(format!("unknown entity: {}", other)),
        };
        Ok(entity)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Field equality; also used for parent foreign keys such as `class_id`.
    Eq(String, String),
    /// Case-insensitive substring over every string field of the record.
    Search(String),
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Eq(field.into(), value.into())
    }

    pub fn matches(&self, data: &Value) -> bool {
        match self {
            Filter::Eq(field, expected) => match data.get(field) {
                Some(Value::String(s)) => s == expected,
                Some(Value::Number(n)) => n.to_string() == *expected,
                Some(Value::Bool(b)) => b.to_string() == *expected,
                _ => false,
            },
            Filter::Search(needle) => {
                let needle = needle.to_lowercase();
                data.as_object().map_or(false, |obj| {
                    obj.values().any(|v| {
                        v.as_str()
                            .map_or(false, |s| s.to_lowercase().contains(&needle))
                    })
                })
            }
        }
    }
}

/// A stored row: server-assigned id and timestamps around a JSON document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub id: String,
    pub entity: Entity,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(|v| v.as_str())
    }

    /// The document with `id` and timestamps folded in, as returned to clients.
    pub fn to_json(&self) -> Value {
        let mut doc = match &self.data {
            Value::Object(map) => map.clone(),
            other => {
                let mut map = serde_json::Map::new();
                map.insert("value".to_string(), other.clone());
                map
            }
        };
        doc.insert("id".to_string(), Value::String(self.id.clone()));
        doc.insert("created_at".to_string(), Value::String(self.created_at.to_rfc3339()));
        doc.insert("updated_at".to_string(), Value::String(self.updated_at.to_rfc3339()));
        Value::Object(doc)
    }
}

#[derive(Debug, FromRow)]
pub struct RecordRow {
    pub id: String,
    pub entity: String,
    pub data: Json<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RecordRow {
    pub fn into_record(self) -> Result<Record, String> {
        Ok(Record {
            id: self.id,
            entity: self.entity.parse()?,
            data: self.data.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn eq_filter_compares_strings_and_numbers() {
        let data = json!({ "role": "pupil", "year": 4, "active": true });
        assert!(Filter::eq("role", "pupil").matches(&data));
        assert!(!Filter::eq("role", "teacher").matches(&data));
        assert!(Filter::eq("year", "4").matches(&data));
        assert!(Filter::eq("active", "true").matches(&data));
        assert!(!Filter::eq("missing", "x").matches(&data));
    }

    #[test]
    fn search_filter_is_case_insensitive() {
        let data = json!({ "name": "Ada Lovelace", "email": "ada@school.org" });
        assert!(Filter::Search("LOVE".into()).matches(&data));
        assert!(!Filter::Search("babbage".into()).matches(&data));
    }

    #[test]
    fn entity_names_round_trip() {
        for entity in [Entity::Users, Entity::JournalEntries, Entity::AiSettings] {
            assert_eq!(entity.table_name().parse::<Entity>().unwrap(), entity);
        }
        assert!("secrets".parse::<Entity>().is_err());
    }
}
