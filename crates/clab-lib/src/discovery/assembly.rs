//! Lab, container and interface record assembly
//!
//! Pure helpers used by the discovery engine to turn canonical container
//! rows and raw interface listings into the records shown in the tree.

use crate::inspect::{short_name, RawInterface};
use crate::models::{
    strip_prefix_len, title_case, CanonicalContainer, ContainerRecord, InterfaceRecord, LabPath,
    LabRecord, LabStatus,
};
use std::collections::{BTreeMap, HashSet};

const LOOPBACK: &str = "lo";
const UNKNOWN_STATE: &str = "unknown";

/// Group containers by the key their lab is identified with
///
/// The key is the normalized topology path. Rows that carry no path fall
/// back to their lab name, then to their own container name, so the key is
/// never empty.
pub fn group_by_lab_path(
    containers: &[CanonicalContainer],
) -> BTreeMap<String, Vec<&CanonicalContainer>> {
    let mut groups: BTreeMap<String, Vec<&CanonicalContainer>> = BTreeMap::new();
    for container in containers {
        let key = [&container.lab_path.absolute, &container.lab_name]
            .into_iter()
            .find(|k| !k.is_empty())
            .unwrap_or(&container.name)
            .clone();
        groups.entry(key).or_default().push(container);
    }
    groups
}

/// Tooltip listing the known fields of a container in a fixed order
pub fn container_tooltip(container: &CanonicalContainer) -> String {
    let mut lines = vec![
        format!("Container: {}", container.name),
        format!("ID: {}", container.container_id),
        format!("State: {}", container.state),
        format!("Kind: {}", container.kind),
        format!("Image: {}", container.image),
    ];

    if let Some(node_type) = &container.node_type {
        lines.push(format!("Type: {}", node_type));
    }
    if let Some(group) = container
        .node_group
        .as_deref()
        .filter(|g| !g.trim().is_empty())
    {
        lines.push(format!("Group: {}", group));
    }

    let ipv4 = strip_prefix_len(&container.ipv4_address);
    if !ipv4.is_empty() {
        lines.push(format!("IPv4: {}", ipv4));
    }
    let ipv6 = strip_prefix_len(&container.ipv6_address);
    if !ipv6.is_empty() {
        lines.push(format!("IPv6: {}", ipv6));
    }

    lines.join("\n")
}

/// Build a container record, attaching its interfaces sorted by name
pub fn build_container(
    container: &CanonicalContainer,
    mut interfaces: Vec<InterfaceRecord>,
) -> ContainerRecord {
    interfaces.sort_by(|a, b| a.name.cmp(&b.name));

    let name_short = container
        .name_short
        .clone()
        .unwrap_or_else(|| short_name(&container.name, &container.lab_name));

    ContainerRecord {
        name: container.name.clone(),
        label: name_short.clone(),
        name_short,
        container_id: container.container_id.clone(),
        state: container.state.clone(),
        status: container.status.clone(),
        kind: container.kind.clone(),
        image: container.image.clone(),
        ipv4_address: container.ipv4_address.clone(),
        ipv6_address: container.ipv6_address.clone(),
        node_type: container.node_type.clone(),
        node_group: container.node_group.clone(),
        interfaces,
        description: title_case(&container.state),
        tooltip: container_tooltip(container),
    }
}

/// Build interface records from a raw listing
///
/// Loopback and interfaces in `unknown` state are dropped; the rest are
/// sorted by name.
pub fn build_interfaces(
    container_name: &str,
    container_id: &str,
    raw: Vec<RawInterface>,
) -> Vec<InterfaceRecord> {
    let mut interfaces: Vec<InterfaceRecord> = raw
        .into_iter()
        .filter(|i| i.state != UNKNOWN_STATE && i.name != LOOPBACK)
        .map(|i| build_interface(container_name, container_id, i))
        .collect();
    interfaces.sort_by(|a, b| a.name.cmp(&b.name));
    interfaces
}

fn build_interface(container_name: &str, container_id: &str, raw: RawInterface) -> InterfaceRecord {
    let state = raw.state.to_uppercase();
    let alias = raw.alias.filter(|a| !a.trim().is_empty());

    let (label, description) = match &alias {
        Some(alias) => (alias.clone(), format!("{} ({})", state, raw.name)),
        None => (raw.name.clone(), state),
    };

    let mut tooltip = vec![format!("Name: {}", raw.name)];
    if let Some(alias) = &alias {
        tooltip.push(format!("Alias: {}", alias));
    }
    tooltip.push(format!("State: {}", raw.state));
    tooltip.push(format!("Type: {}", raw.if_type));
    tooltip.push(format!("MAC: {}", raw.mac));
    tooltip.push(format!("MTU: {}", raw.mtu));
    tooltip.push(format!("ifIndex: {}", raw.ifindex));

    InterfaceRecord {
        parent_container_name: container_name.to_string(),
        parent_container_id: container_id.to_string(),
        name: raw.name,
        alias,
        if_type: raw.if_type,
        mac: raw.mac,
        mtu: raw.mtu,
        if_index: raw.ifindex,
        state: raw.state,
        label,
        description,
        tooltip: tooltip.join("\n"),
    }
}

/// Build the record of a deployed lab from its members and built containers
pub fn build_deployed_lab(
    key: &str,
    members: &[&CanonicalContainer],
    mut containers: Vec<ContainerRecord>,
) -> LabRecord {
    containers.sort_by(|a, b| a.name.cmp(&b.name));

    let first = members.first();
    let name = first
        .map(|c| c.lab_name.clone())
        .filter(|n| !n.is_empty());
    let owner = first.map(|c| c.owner.clone()).filter(|o| !o.is_empty());

    let lab_path = match first {
        Some(c) if !c.lab_path.absolute.is_empty() => c.lab_path.clone(),
        _ => LabPath {
            absolute: key.to_string(),
            relative: key.to_string(),
        },
    };

    let display_name = name.clone().unwrap_or_else(|| key.to_string());
    let label = match &owner {
        Some(owner) => format!("{} ({})", display_name, owner),
        None => display_name,
    };

    LabRecord {
        label,
        lab_path,
        name,
        owner,
        status: LabStatus::from_containers(&containers),
        containers,
        deployed: true,
    }
}

/// Order labs: deployed first, then by absolute path
pub fn sort_labs(labs: &mut [LabRecord]) {
    labs.sort_by(|a, b| {
        b.deployed
            .cmp(&a.deployed)
            .then_with(|| a.lab_path.absolute.cmp(&b.lab_path.absolute))
    });
}

/// Merge deployed labs with topology files found on disk
///
/// A deployed lab always wins over a file with the same path. The result is
/// sorted, and holds a single placeholder record when nothing was found.
pub fn merge_labs(deployed: BTreeMap<String, LabRecord>, local: &[LabPath]) -> Vec<LabRecord> {
    let mut seen: HashSet<String> = deployed
        .values()
        .map(|lab| lab.lab_path.absolute.clone())
        .collect();

    let mut labs: Vec<LabRecord> = deployed.into_values().collect();
    for path in local {
        if path.absolute.is_empty() || !seen.insert(path.absolute.clone()) {
            continue;
        }
        labs.push(LabRecord::undeployed(path.clone()));
    }

    if labs.is_empty() {
        return vec![LabRecord::placeholder()];
    }

    sort_labs(&mut labs);
    labs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ADDRESS_NOT_AVAILABLE;

    fn row(lab: &str, name: &str, state: &str) -> CanonicalContainer {
        CanonicalContainer {
            lab_name: lab.to_string(),
            lab_path: LabPath {
                absolute: format!("/labs/{}.clab.yml", lab),
                relative: format!("{}.clab.yml", lab),
            },
            name: name.to_string(),
            name_short: None,
            container_id: format!("id-{}", name),
            image: "alpine".to_string(),
            kind: "linux".to_string(),
            state: state.to_string(),
            status: String::new(),
            ipv4_address: "172.20.20.5/24".to_string(),
            ipv6_address: ADDRESS_NOT_AVAILABLE.to_string(),
            owner: "alice".to_string(),
            node_type: None,
            node_group: None,
        }
    }

    fn raw_interface(name: &str, state: &str, alias: Option<&str>) -> RawInterface {
        RawInterface {
            name: name.to_string(),
            if_type: "veth".to_string(),
            state: state.to_string(),
            alias: alias.map(str::to_string),
            mac: "aa:c1:ab:00:00:02".to_string(),
            mtu: 9500,
            ifindex: 4,
        }
    }

    #[test]
    fn test_interface_filtering_and_alias_display() {
        let interfaces = build_interfaces(
            "clab-demo-srl1",
            "abc",
            vec![
                raw_interface("lo", "up", None),
                raw_interface("eth1", "unknown", None),
                raw_interface("eth2", "up", Some("ge-0/0/0")),
            ],
        );

        assert_eq!(interfaces.len(), 1);
        let eth2 = &interfaces[0];
        assert_eq!(eth2.name, "eth2");
        assert_eq!(eth2.label, "ge-0/0/0");
        assert!(eth2.description.contains("UP"));
        assert!(eth2.description.contains("eth2"));
        assert!(eth2.tooltip.contains("Alias: ge-0/0/0"));
    }

    #[test]
    fn test_interface_without_alias() {
        let interfaces = build_interfaces(
            "clab-demo-srl1",
            "abc",
            vec![raw_interface("e1-2", "down", None), raw_interface("e1-1", "up", Some(""))],
        );

        assert_eq!(interfaces[0].name, "e1-1");
        assert_eq!(interfaces[0].label, "e1-1");
        assert_eq!(interfaces[0].description, "UP");
        assert_eq!(interfaces[0].alias, None);
        assert_eq!(interfaces[1].description, "DOWN");
    }

    #[test]
    fn test_container_tooltip_order() {
        let mut c = row("demo", "clab-demo-a", "running");
        c.node_type = Some("ixrd3".to_string());
        c.node_group = Some("  ".to_string());

        let tooltip = container_tooltip(&c);
        let lines: Vec<&str> = tooltip.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Container: clab-demo-a",
                "ID: id-clab-demo-a",
                "State: running",
                "Kind: linux",
                "Image: alpine",
                "Type: ixrd3",
                "IPv4: 172.20.20.5",
            ]
        );
    }

    #[test]
    fn test_build_container_derives_short_name() {
        let c = row("demo", "clab-demo-leaf1", "exited");
        let record = build_container(&c, Vec::new());
        assert_eq!(record.name_short, "leaf1");
        assert_eq!(record.label, "leaf1");
        assert_eq!(record.description, "Exited");

        let mut explicit = row("demo", "clab-demo-leaf1", "running");
        explicit.name_short = Some("leaf-one".to_string());
        assert_eq!(build_container(&explicit, Vec::new()).name_short, "leaf-one");
    }

    #[test]
    fn test_group_by_lab_path() {
        let rows = vec![
            row("b", "clab-b-1", "running"),
            row("a", "clab-a-1", "running"),
            row("b", "clab-b-2", "exited"),
        ];
        let groups = group_by_lab_path(&rows);
        let keys: Vec<&String> = groups.keys().collect();
        assert_eq!(keys, vec!["/labs/a.clab.yml", "/labs/b.clab.yml"]);
        assert_eq!(groups["/labs/b.clab.yml"].len(), 2);
    }

    #[test]
    fn test_pathless_rows_never_share_an_empty_key() {
        let mut named = row("core", "clab-core-r1", "running");
        named.lab_path = LabPath::default();
        let mut bare = row("", "router1", "running");
        bare.lab_path = LabPath::default();

        let rows = vec![named, bare];
        let groups = group_by_lab_path(&rows);
        let keys: Vec<&String> = groups.keys().collect();
        assert_eq!(keys, vec!["core", "router1"]);

        let members = groups["router1"].clone();
        let containers = vec![build_container(members[0], Vec::new())];
        let lab = build_deployed_lab("router1", &members, containers);
        assert_eq!(lab.lab_path.absolute, "router1");
        assert_eq!(lab.label, "router1 (alice)");
        assert!(!lab.is_placeholder());
    }

    #[test]
    fn test_deployed_lab_label_and_status() {
        let rows = vec![row("demo", "clab-demo-b", "exited"), row("demo", "clab-demo-a", "running")];
        let members: Vec<&CanonicalContainer> = rows.iter().collect();
        let containers = rows.iter().map(|c| build_container(c, Vec::new())).collect();

        let lab = build_deployed_lab("/labs/demo.clab.yml", &members, containers);
        assert_eq!(lab.label, "demo (alice)");
        assert_eq!(lab.status, LabStatus::Partial);
        assert!(lab.deployed);
        assert_eq!(lab.containers[0].name, "clab-demo-a");
    }

    #[test]
    fn test_merge_prefers_deployed() {
        let rows = vec![row("demo", "clab-demo-a", "running")];
        let members: Vec<&CanonicalContainer> = rows.iter().collect();
        let containers = vec![build_container(&rows[0], Vec::new())];
        let mut deployed = BTreeMap::new();
        deployed.insert(
            "/labs/demo.clab.yml".to_string(),
            build_deployed_lab("/labs/demo.clab.yml", &members, containers),
        );

        let local = vec![
            LabPath {
                absolute: "/labs/demo.clab.yml".to_string(),
                relative: "demo.clab.yml".to_string(),
            },
            LabPath {
                absolute: "/labs/a-first.clab.yml".to_string(),
                relative: "a-first.clab.yml".to_string(),
            },
        ];

        let labs = merge_labs(deployed, &local);
        assert_eq!(labs.len(), 2);
        assert!(labs[0].deployed);
        assert_eq!(labs[0].containers.len(), 1);
        assert_eq!(labs[1].lab_path.absolute, "/labs/a-first.clab.yml");
        assert!(!labs[1].deployed);
    }

    #[test]
    fn test_sort_is_stable_and_deployed_first() {
        let mut labs = vec![
            LabRecord::undeployed(LabPath {
                absolute: "/a.clab.yml".to_string(),
                relative: String::new(),
            }),
            LabRecord {
                deployed: true,
                ..LabRecord::undeployed(LabPath {
                    absolute: "/z.clab.yml".to_string(),
                    relative: String::new(),
                })
            },
            LabRecord::undeployed(LabPath {
                absolute: "/m.clab.yml".to_string(),
                relative: String::new(),
            }),
        ];

        sort_labs(&mut labs);
        let once: Vec<String> = labs.iter().map(|l| l.lab_path.absolute.clone()).collect();
        sort_labs(&mut labs);
        let twice: Vec<String> = labs.iter().map(|l| l.lab_path.absolute.clone()).collect();

        assert_eq!(once, vec!["/z.clab.yml", "/a.clab.yml", "/m.clab.yml"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_empty_yields_placeholder() {
        let labs = merge_labs(BTreeMap::new(), &[]);
        assert_eq!(labs.len(), 1);
        assert_eq!(labs[0].lab_path.absolute, "");
    }
}
