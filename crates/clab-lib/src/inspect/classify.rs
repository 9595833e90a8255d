//! Shape classification of inspect tool output
//!
//! Different tool versions print either a flat array of containers (possibly
//! wrapped in `{"containers": [...]}`) or an object keyed by lab name, and
//! each container is either a flat "simple" record or a "detailed" runtime
//! record carrying a `Labels` map. The two axes are independent and are
//! decided once here.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Record layout of individual containers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSchema {
    Simple,
    Detailed,
}

impl RecordSchema {
    fn detect<'a>(mut records: impl Iterator<Item = &'a Value>) -> Self {
        if records.any(|record| record.get("Labels").map_or(false, Value::is_object)) {
            RecordSchema::Detailed
        } else {
            RecordSchema::Simple
        }
    }
}

/// Container record already in the tool's canonical flat shape
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SimpleContainer {
    pub lab_name: Option<String>,
    #[serde(rename = "labPath")]
    pub lab_path: Option<String>,
    #[serde(rename = "absLabPath")]
    pub abs_lab_path: Option<String>,
    pub name: String,
    #[serde(alias = "node_name")]
    pub name_short: Option<String>,
    pub container_id: String,
    pub image: String,
    pub kind: String,
    pub state: String,
    pub status: String,
    pub ipv4_address: Option<String>,
    pub ipv6_address: Option<String>,
    pub owner: Option<String>,
    pub node_type: Option<String>,
    pub node_group: Option<String>,
}

/// Runtime network settings of a detailed record
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetworkSettings {
    #[serde(rename = "IPv4addr")]
    pub ipv4_addr: Option<String>,
    #[serde(rename = "IPv4pLen")]
    pub ipv4_prefix_len: Option<u32>,
    #[serde(rename = "IPv6addr")]
    pub ipv6_addr: Option<String>,
    #[serde(rename = "IPv6pLen")]
    pub ipv6_prefix_len: Option<u32>,
}

/// Container record in the runtime's own detailed shape
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "PascalCase")]
pub struct DetailedContainer {
    pub names: Vec<String>,
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "ShortID")]
    pub short_id: String,
    pub image: String,
    pub state: String,
    pub status: String,
    pub labels: BTreeMap<String, String>,
    pub network_settings: NetworkSettings,
}

/// Classified inspect output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawInspection {
    /// Array of simple records, no lab grouping
    FlatSimple(Vec<SimpleContainer>),
    /// Array of detailed records, no lab grouping
    FlatDetailed(Vec<DetailedContainer>),
    /// Simple records grouped by lab name
    GroupedSimple(BTreeMap<String, Vec<SimpleContainer>>),
    /// Detailed records grouped by lab name
    GroupedDetailed(BTreeMap<String, Vec<DetailedContainer>>),
}

impl RawInspection {
    pub fn schema(&self) -> RecordSchema {
        match self {
            RawInspection::FlatSimple(_) | RawInspection::GroupedSimple(_) => RecordSchema::Simple,
            RawInspection::FlatDetailed(_) | RawInspection::GroupedDetailed(_) => {
                RecordSchema::Detailed
            }
        }
    }

    pub fn is_grouped(&self) -> bool {
        matches!(
            self,
            RawInspection::GroupedSimple(_) | RawInspection::GroupedDetailed(_)
        )
    }

    /// Total number of container records across all groups
    pub fn container_count(&self) -> usize {
        match self {
            RawInspection::FlatSimple(items) => items.len(),
            RawInspection::FlatDetailed(items) => items.len(),
            RawInspection::GroupedSimple(groups) => groups.values().map(Vec::len).sum(),
            RawInspection::GroupedDetailed(groups) => groups.values().map(Vec::len).sum(),
        }
    }
}

/// Decide the shape of parsed inspect output
///
/// Returns a human-readable reason when the document fits no known shape.
pub fn classify(value: Value) -> Result<RawInspection, String> {
    match value {
        Value::Array(items) => classify_flat(items),
        Value::Object(map) => {
            // Also matches a grouped document whose only lab is `containers`
            if map.len() == 1 {
                if let Some(Value::Array(items)) = map.get("containers") {
                    return classify_flat(items.clone());
                }
            }
            classify_grouped(map)
        }
        other => Err(format!(
            "expected a JSON array or object at top level, got {}",
            json_kind(&other)
        )),
    }
}

fn classify_flat(items: Vec<Value>) -> Result<RawInspection, String> {
    match RecordSchema::detect(items.iter()) {
        RecordSchema::Detailed => Ok(RawInspection::FlatDetailed(decode_records(items)?)),
        RecordSchema::Simple => Ok(RawInspection::FlatSimple(decode_records(items)?)),
    }
}

fn classify_grouped(map: Map<String, Value>) -> Result<RawInspection, String> {
    let mut groups: BTreeMap<String, Vec<Value>> = BTreeMap::new();
    for (lab, value) in map {
        match value {
            Value::Array(items) => {
                groups.insert(lab, items);
            }
            other => {
                return Err(format!(
                    "lab `{}` should map to an array of containers, got {}",
                    lab,
                    json_kind(&other)
                ))
            }
        }
    }

    let schema = RecordSchema::detect(groups.values().flatten());
    match schema {
        RecordSchema::Detailed => Ok(RawInspection::GroupedDetailed(decode_groups(groups)?)),
        RecordSchema::Simple => Ok(RawInspection::GroupedSimple(decode_groups(groups)?)),
    }
}

fn decode_groups<T: DeserializeOwned>(
    groups: BTreeMap<String, Vec<Value>>,
) -> Result<BTreeMap<String, Vec<T>>, String> {
    groups
        .into_iter()
        .map(|(lab, items)| Ok((lab, decode_records(items)?)))
        .collect()
}

fn decode_records<T: DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>, String> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item)
                .map_err(|e| format!("container record {} is invalid: {}", index, e))
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn simple(name: &str) -> Value {
        json!({
            "lab_name": "demo",
            "labPath": "demo.clab.yml",
            "absLabPath": "/labs/demo.clab.yml",
            "name": name,
            "container_id": "0123456789ab",
            "image": "alpine:latest",
            "kind": "linux",
            "state": "running",
            "status": "Up 5 minutes",
            "ipv4_address": "172.20.20.2/24",
            "ipv6_address": "N/A",
            "owner": "alice"
        })
    }

    fn detailed(name: &str) -> Value {
        json!({
            "Names": [name],
            "ID": "0123456789abcdef",
            "ShortID": "0123456789ab",
            "Image": "ghcr.io/nokia/srlinux",
            "State": "running",
            "Status": "Up 5 minutes",
            "Labels": {
                "clab-node-kind": "nokia_srlinux",
                "clab-node-name": "srl1",
                "clab-owner": "alice",
                "clab-topo-file": "/labs/demo.clab.yml",
                "containerlab": "demo"
            },
            "NetworkSettings": {"IPv4addr": "172.20.20.2", "IPv4pLen": 24}
        })
    }

    #[test]
    fn test_flat_simple() {
        let raw = classify(json!([simple("clab-demo-a")])).unwrap();
        assert!(matches!(raw, RawInspection::FlatSimple(ref items) if items.len() == 1));
        assert_eq!(raw.schema(), RecordSchema::Simple);
        assert!(!raw.is_grouped());
    }

    #[test]
    fn test_flat_detailed() {
        let raw = classify(json!([detailed("clab-demo-srl1")])).unwrap();
        match raw {
            RawInspection::FlatDetailed(items) => {
                assert_eq!(items[0].names, vec!["clab-demo-srl1".to_string()]);
                assert_eq!(items[0].network_settings.ipv4_prefix_len, Some(24));
                assert_eq!(items[0].labels["clab-node-name"], "srl1");
            }
            other => panic!("unexpected classification {:?}", other),
        }
    }

    #[test]
    fn test_wrapped_flat_array() {
        let raw = classify(json!({"containers": [simple("clab-demo-a"), simple("clab-demo-b")]}))
            .unwrap();
        assert!(matches!(raw, RawInspection::FlatSimple(_)));
        assert_eq!(raw.container_count(), 2);
    }

    #[test]
    fn test_grouped_simple_and_detailed() {
        let raw = classify(json!({
            "demo": [simple("clab-demo-a")],
            "other": [simple("clab-other-b"), simple("clab-other-c")]
        }))
        .unwrap();
        assert!(matches!(raw, RawInspection::GroupedSimple(_)));
        assert_eq!(raw.container_count(), 3);

        let raw = classify(json!({"demo": [detailed("clab-demo-srl1")]})).unwrap();
        assert!(matches!(raw, RawInspection::GroupedDetailed(_)));
        assert!(raw.is_grouped());
    }

    #[test]
    fn test_empty_documents() {
        assert_eq!(
            classify(json!([])).unwrap(),
            RawInspection::FlatSimple(Vec::new())
        );
        assert_eq!(
            classify(json!({})).unwrap(),
            RawInspection::GroupedSimple(BTreeMap::new())
        );
    }

    #[test]
    fn test_rejects_unknown_shapes() {
        assert!(classify(json!("containers")).is_err());
        assert!(classify(json!({"demo": {"name": "x"}})).is_err());
        assert!(classify(json!([{"name": 42}])).is_err());
    }
}
