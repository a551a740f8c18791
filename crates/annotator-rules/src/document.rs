//! Raw rule configuration document, as written on disk.
//!
//! The document shares its layout with variable-introspection configuration
//! files, so keys this crate does not use are ignored.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use annotator_model::AttributeValue;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RuleDocument {
    #[serde(default)]
    pub identification: Option<String>,
    #[serde(default)]
    pub version: Option<i64>,
    /// Attribute paths probed, in order, for the collection short name.
    #[serde(default)]
    pub collection_short_name_path: Vec<String>,
    /// Short-name regex to mission label; declaration order is priority order.
    #[serde(default)]
    pub mission: MissionTable,
    #[serde(default)]
    pub metadata_overrides: Vec<OverrideRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OverrideRecord {
    pub applicability: ApplicabilityRecord,
    #[serde(default)]
    pub attributes: Vec<AttributeRecord>,
    #[serde(rename = "_Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApplicabilityRecord {
    pub mission: String,
    pub short_name_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_pattern: Option<String>,
}

/// One attribute edit; a `null` (or missing) value deletes the attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AttributeRecord {
    pub name: String,
    #[serde(default)]
    pub value: Option<AttributeValue>,
}

/// Ordered regex-to-mission table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MissionTable(pub Vec<(String, String)>);

impl MissionTable {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .map(|(pattern, mission)| (pattern.as_str(), mission.as_str()))
    }
}

impl Serialize for MissionTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (pattern, mission) in &self.0 {
            map.serialize_entry(pattern, mission)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MissionTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = MissionTable;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("a map of short name patterns to mission names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some(entry) = access.next_entry::<String, String>()? {
                    entries.push(entry);
                }
                Ok(MissionTable(entries))
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mission_table_keeps_declaration_order() {
        let table: MissionTable =
            serde_json::from_str(r#"{"SPL3.*": "SMAP", "ATL.*": "ICESat2", "A.*": "Other"}"#)
                .expect("parse table");
        let patterns: Vec<&str> = table.iter().map(|(pattern, _)| pattern).collect();
        assert_eq!(patterns, vec!["SPL3.*", "ATL.*", "A.*"]);
    }

    #[test]
    fn null_and_missing_values_are_deletions() {
        let records: Vec<AttributeRecord> = serde_json::from_str(
            r#"[{"Name": "delete", "Value": null}, {"Name": "also_delete"}, {"Name": "keep", "Value": 1}]"#,
        )
        .expect("parse records");
        assert!(records[0].value.is_none());
        assert!(records[1].value.is_none());
        assert_eq!(records[2].value, Some(AttributeValue::Integer(1)));
    }
}
