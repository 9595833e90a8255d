//! Conversion of classified inspect output into canonical container rows

use super::classify::{DetailedContainer, NetworkSettings, RawInspection, SimpleContainer};
use crate::models::{CanonicalContainer, LabPath, ADDRESS_NOT_AVAILABLE};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

const LABEL_LAB_NAME: &str = "containerlab";
const LABEL_NODE_KIND: &str = "clab-node-kind";
const LABEL_NODE_NAME: &str = "clab-node-name";
const LABEL_NODE_LONG_NAME: &str = "clab-node-longname";
const LABEL_NODE_TYPE: &str = "clab-node-type";
const LABEL_NODE_GROUP: &str = "clab-node-group";
const LABEL_OWNER: &str = "clab-owner";
const LABEL_TOPO_FILE: &str = "clab-topo-file";

static LAB_NAME_PATTERN: OnceLock<Regex> = OnceLock::new();

/// Lab name embedded in a `clab-<lab>-<node>` container name
///
/// Only the first hyphen-delimited segment after `clab-` is taken, so a lab
/// called `my-lab` is reported as `my`. This mirrors the naming heuristic of
/// the tool itself.
pub fn lab_name_from_container(container_name: &str) -> Option<String> {
    let pattern = LAB_NAME_PATTERN
        .get_or_init(|| Regex::new(r"^clab-([^-]+)-.+$").expect("lab name pattern is valid"));
    pattern
        .captures(container_name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Node-local name: `clab-<lab>-<node>` becomes `<node>`
pub fn short_name(container_name: &str, lab_name: &str) -> String {
    if !lab_name.is_empty() {
        let prefix = format!("clab-{}-", lab_name);
        if let Some(rest) = container_name.strip_prefix(&prefix) {
            if !rest.is_empty() {
                return rest.to_string();
            }
        }
    }
    container_name.to_string()
}

/// Flatten any classified inspect output into canonical rows
///
/// Grouping by lab is left to the caller, which keys labs by normalized
/// topology path rather than by the tool's group names.
pub fn normalize(raw: &RawInspection, workspace_root: Option<&Path>) -> Vec<CanonicalContainer> {
    match raw {
        RawInspection::FlatSimple(items) => items
            .iter()
            .map(|item| from_simple(item, None, workspace_root))
            .collect(),
        RawInspection::GroupedSimple(groups) => groups
            .iter()
            .flat_map(|(lab, items)| {
                items
                    .iter()
                    .map(move |item| from_simple(item, Some(lab), workspace_root))
            })
            .collect(),
        RawInspection::FlatDetailed(items) => items
            .iter()
            .map(|item| from_detailed(item, None, workspace_root))
            .collect(),
        RawInspection::GroupedDetailed(groups) => groups
            .iter()
            .flat_map(|(lab, items)| {
                items
                    .iter()
                    .map(move |item| from_detailed(item, Some(lab), workspace_root))
            })
            .collect(),
    }
}

fn from_simple(
    item: &SimpleContainer,
    group: Option<&String>,
    workspace_root: Option<&Path>,
) -> CanonicalContainer {
    let lab_name = group
        .cloned()
        .or_else(|| non_empty(item.lab_name.as_deref()))
        .or_else(|| lab_name_from_container(&item.name))
        .unwrap_or_default();

    let raw_path = non_empty(item.abs_lab_path.as_deref())
        .or_else(|| non_empty(item.lab_path.as_deref()))
        .unwrap_or_default();

    CanonicalContainer {
        lab_path: LabPath::resolve(&raw_path, workspace_root),
        name: item.name.clone(),
        name_short: non_empty(item.name_short.as_deref()),
        container_id: item.container_id.clone(),
        image: item.image.clone(),
        kind: item.kind.clone(),
        state: item.state.clone(),
        status: item.status.clone(),
        ipv4_address: non_empty(item.ipv4_address.as_deref())
            .unwrap_or_else(|| ADDRESS_NOT_AVAILABLE.to_string()),
        ipv6_address: non_empty(item.ipv6_address.as_deref())
            .unwrap_or_else(|| ADDRESS_NOT_AVAILABLE.to_string()),
        owner: item.owner.clone().unwrap_or_default(),
        node_type: non_empty(item.node_type.as_deref()),
        node_group: non_empty(item.node_group.as_deref()),
        lab_name,
    }
}

fn from_detailed(
    item: &DetailedContainer,
    group: Option<&String>,
    workspace_root: Option<&Path>,
) -> CanonicalContainer {
    let label = |key: &str| non_empty(item.labels.get(key).map(String::as_str));

    let name = item
        .names
        .first()
        .map(|n| n.trim_start_matches('/').to_string())
        .filter(|n| !n.is_empty())
        .or_else(|| label(LABEL_NODE_LONG_NAME))
        .unwrap_or_default();

    let lab_name = group
        .cloned()
        .or_else(|| label(LABEL_LAB_NAME))
        .or_else(|| lab_name_from_container(&name))
        .unwrap_or_default();

    let container_id = if item.short_id.is_empty() {
        item.id.clone()
    } else {
        item.short_id.clone()
    };

    let (ipv4_address, ipv6_address) = addresses(&item.network_settings);

    CanonicalContainer {
        lab_path: LabPath::resolve(&label(LABEL_TOPO_FILE).unwrap_or_default(), workspace_root),
        name_short: label(LABEL_NODE_NAME),
        container_id,
        image: item.image.clone(),
        kind: label(LABEL_NODE_KIND).unwrap_or_default(),
        state: item.state.clone(),
        status: item.status.clone(),
        ipv4_address,
        ipv6_address,
        owner: label(LABEL_OWNER).unwrap_or_default(),
        node_type: label(LABEL_NODE_TYPE),
        node_group: label(LABEL_NODE_GROUP),
        name,
        lab_name,
    }
}

fn addresses(settings: &NetworkSettings) -> (String, String) {
    (
        format_address(settings.ipv4_addr.as_deref(), settings.ipv4_prefix_len),
        format_address(settings.ipv6_addr.as_deref(), settings.ipv6_prefix_len),
    )
}

/// `<addr>/<len>`, or the `N/A` sentinel when either part is missing
fn format_address(addr: Option<&str>, prefix_len: Option<u32>) -> String {
    match (non_empty(addr), prefix_len) {
        (Some(addr), Some(len)) => format!("{}/{}", addr, len),
        _ => ADDRESS_NOT_AVAILABLE.to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
