//! Core data models for lab discovery

use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// Sentinel the inspect tool uses for a missing address
pub const ADDRESS_NOT_AVAILABLE: &str = "N/A";

/// Label shown when neither the workspace nor the runtime reports any lab
pub const NO_LABS_LABEL: &str = "No labs found";

/// Location of a topology file
///
/// `absolute` is the deduplication key; `relative` is only for display.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabPath {
    pub absolute: String,
    pub relative: String,
}

impl PartialEq for LabPath {
    fn eq(&self, other: &Self) -> bool {
        self.absolute == other.absolute
    }
}

impl Eq for LabPath {}

impl Hash for LabPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.absolute.hash(state);
    }
}

/// Aggregate state of a lab, drives the lab icon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabStatus {
    /// Every container is running
    Running,
    /// No container is running
    Stopped,
    /// Some containers are running, some are not
    Partial,
    /// Topology file exists but nothing is deployed
    Undeployed,
}

impl LabStatus {
    /// Compute the composite status of a deployed lab
    pub fn from_containers(containers: &[ContainerRecord]) -> Self {
        let running = containers.iter().filter(|c| c.is_running()).count();

        if containers.is_empty() {
            LabStatus::Undeployed
        } else if running == containers.len() {
            LabStatus::Running
        } else if running == 0 {
            LabStatus::Stopped
        } else {
            LabStatus::Partial
        }
    }
}

/// One topology, deployed or not
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabRecord {
    pub label: String,
    pub lab_path: LabPath,
    pub name: Option<String>,
    pub owner: Option<String>,
    pub containers: Vec<ContainerRecord>,
    pub deployed: bool,
    pub status: LabStatus,
}

impl LabRecord {
    /// Record for a topology file found on disk with nothing deployed
    pub fn undeployed(lab_path: LabPath) -> Self {
        let label = std::path::Path::new(&lab_path.absolute)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| lab_path.absolute.clone());

        Self {
            label,
            lab_path,
            name: None,
            owner: None,
            containers: Vec::new(),
            deployed: false,
            status: LabStatus::Undeployed,
        }
    }

    /// Synthetic entry returned when there is nothing to show
    pub fn placeholder() -> Self {
        Self {
            label: NO_LABS_LABEL.to_string(),
            lab_path: LabPath::default(),
            name: None,
            owner: None,
            containers: Vec::new(),
            deployed: false,
            status: LabStatus::Undeployed,
        }
    }

    /// True for the record produced by [`LabRecord::placeholder`]
    pub fn is_placeholder(&self) -> bool {
        !self.deployed && self.lab_path.absolute.is_empty()
    }
}

/// A container belonging to a deployed lab
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerRecord {
    /// Full name, typically `clab-<lab>-<node>`
    pub name: String,
    pub name_short: String,
    pub container_id: String,
    pub state: String,
    pub status: String,
    pub kind: String,
    pub image: String,
    pub ipv4_address: String,
    pub ipv6_address: String,
    pub node_type: Option<String>,
    pub node_group: Option<String>,
    pub interfaces: Vec<InterfaceRecord>,
    pub label: String,
    pub description: String,
    pub tooltip: String,
}

impl ContainerRecord {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }

    /// IPv4 address without prefix length
    pub fn ipv4(&self) -> String {
        strip_prefix_len(&self.ipv4_address)
    }

    /// IPv6 address without prefix length
    pub fn ipv6(&self) -> String {
        strip_prefix_len(&self.ipv6_address)
    }
}

/// Strip the `/len` part of a CIDR string, mapping the `N/A` sentinel to empty
pub fn strip_prefix_len(address: &str) -> String {
    if address.is_empty() || address == ADDRESS_NOT_AVAILABLE {
        return String::new();
    }
    address
        .split_once('/')
        .map(|(addr, _)| addr)
        .unwrap_or(address)
        .to_string()
}

/// A network interface of a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceRecord {
    pub parent_container_name: String,
    pub parent_container_id: String,
    pub name: String,
    pub alias: Option<String>,
    #[serde(rename = "type")]
    pub if_type: String,
    pub mac: String,
    pub mtu: u32,
    pub if_index: u32,
    pub state: String,
    pub label: String,
    pub description: String,
    pub tooltip: String,
}

impl InterfaceRecord {
    pub fn is_up(&self) -> bool {
        self.state == "up"
    }
}

/// Container row in the canonical shape produced by the format normalizer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalContainer {
    pub lab_name: String,
    pub lab_path: LabPath,
    pub name: String,
    pub name_short: Option<String>,
    pub container_id: String,
    pub image: String,
    pub kind: String,
    pub state: String,
    pub status: String,
    pub ipv4_address: String,
    pub ipv6_address: String,
    pub owner: String,
    pub node_type: Option<String>,
    pub node_group: Option<String>,
}

/// Upper-case the first character: `running` -> `Running`
pub fn title_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container(name: &str, state: &str) -> ContainerRecord {
        ContainerRecord {
            name: name.to_string(),
            name_short: name.to_string(),
            container_id: "id".to_string(),
            state: state.to_string(),
            status: String::new(),
            kind: "linux".to_string(),
            image: "alpine".to_string(),
            ipv4_address: ADDRESS_NOT_AVAILABLE.to_string(),
            ipv6_address: ADDRESS_NOT_AVAILABLE.to_string(),
            node_type: None,
            node_group: None,
            interfaces: Vec::new(),
            label: name.to_string(),
            description: title_case(state),
            tooltip: String::new(),
        }
    }

    #[test]
    fn test_lab_status_from_containers() {
        let all_up = vec![container("a", "running"), container("b", "running")];
        assert_eq!(LabStatus::from_containers(&all_up), LabStatus::Running);

        let all_down = vec![container("a", "exited"), container("b", "created")];
        assert_eq!(LabStatus::from_containers(&all_down), LabStatus::Stopped);

        let mixed = vec![container("a", "running"), container("b", "exited")];
        assert_eq!(LabStatus::from_containers(&mixed), LabStatus::Partial);

        assert_eq!(LabStatus::from_containers(&[]), LabStatus::Undeployed);
    }

    #[test]
    fn test_address_accessors() {
        let mut c = container("a", "running");
        c.ipv4_address = "172.20.20.2/24".to_string();
        c.ipv6_address = ADDRESS_NOT_AVAILABLE.to_string();

        assert_eq!(c.ipv4(), "172.20.20.2");
        assert_eq!(c.ipv6(), "");
        assert_eq!(strip_prefix_len("3fff:172:20:20::2/64"), "3fff:172:20:20::2");
        assert_eq!(strip_prefix_len("10.0.0.1"), "10.0.0.1");
    }

    #[test]
    fn test_lab_path_equality_uses_absolute_only() {
        let a = LabPath {
            absolute: "/labs/demo.clab.yml".to_string(),
            relative: "demo.clab.yml".to_string(),
        };
        let b = LabPath {
            absolute: "/labs/demo.clab.yml".to_string(),
            relative: "./labs/demo.clab.yml".to_string(),
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_placeholder_has_empty_path() {
        let placeholder = LabRecord::placeholder();
        assert!(placeholder.is_placeholder());
        assert_eq!(placeholder.lab_path.absolute, "");
        assert_eq!(placeholder.label, NO_LABS_LABEL);
    }

    #[test]
    fn test_deployed_lab_is_never_placeholder() {
        let mut lab = LabRecord::placeholder();
        lab.deployed = true;
        assert!(!lab.is_placeholder());
    }

    #[test]
    fn test_undeployed_label_is_file_name() {
        let lab = LabRecord::undeployed(LabPath {
            absolute: "/home/user/labs/srl.clab.yml".to_string(),
            relative: "labs/srl.clab.yml".to_string(),
        });
        assert_eq!(lab.label, "srl.clab.yml");
        assert!(!lab.deployed);
        assert_eq!(lab.status, LabStatus::Undeployed);
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("running"), "Running");
        assert_eq!(title_case("exited"), "Exited");
        assert_eq!(title_case(""), "");
    }
}
