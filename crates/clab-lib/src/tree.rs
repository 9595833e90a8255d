//! Tree presentation of discovered labs
//!
//! Maps reconciled lab records to display nodes (labels, icons, tooltips and
//! context values) for whatever UI renders the lab tree.

use crate::models::{ContainerRecord, InterfaceRecord, LabRecord, LabStatus};
use serde::{Deserialize, Serialize};

/// Stable identity of a node in the lab tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeId {
    Placeholder,
    Lab {
        lab_path: String,
    },
    Container {
        lab_path: String,
        container: String,
    },
    Interface {
        lab_path: String,
        container: String,
        interface: String,
    },
}

/// Notification that the displayed tree should be redrawn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", content = "node", rename_all = "lowercase")]
pub enum TreeChange {
    /// Everything may have changed
    Full,
    /// Only the subtree rooted at this node
    Node(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeIcon {
    LabRunning,
    LabStopped,
    LabPartial,
    LabUndeployed,
    ContainerRunning,
    ContainerStopped,
    InterfaceUp,
    InterfaceDown,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collapsible {
    None,
    Collapsed,
    Expanded,
}

/// Context values let the UI attach actions to node kinds
pub mod context {
    pub const LAB_DEPLOYED: &str = "containerlabLabDeployed";
    pub const LAB_UNDEPLOYED: &str = "containerlabLabUndeployed";
    pub const CONTAINER: &str = "containerlabContainer";
    pub const INTERFACE_UP: &str = "containerlabInterfaceUp";
    pub const INTERFACE_DOWN: &str = "containerlabInterfaceDown";
    pub const PLACEHOLDER: &str = "containerlabPlaceholder";
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: NodeId,
    pub label: String,
    pub description: Option<String>,
    pub tooltip: Option<String>,
    pub icon: TreeIcon,
    pub context_value: String,
    pub collapsible: Collapsible,
    pub children: Vec<TreeNode>,
}

/// Build the display tree for a list of discovered labs
pub fn build_tree(labs: &[LabRecord]) -> Vec<TreeNode> {
    labs.iter().map(lab_node).collect()
}

pub fn lab_node(lab: &LabRecord) -> TreeNode {
    if lab.is_placeholder() {
        return TreeNode {
            id: NodeId::Placeholder,
            label: lab.label.clone(),
            description: None,
            tooltip: None,
            icon: TreeIcon::Info,
            context_value: context::PLACEHOLDER.to_string(),
            collapsible: Collapsible::None,
            children: Vec::new(),
        };
    }

    let icon = match lab.status {
        LabStatus::Running => TreeIcon::LabRunning,
        LabStatus::Stopped => TreeIcon::LabStopped,
        LabStatus::Partial => TreeIcon::LabPartial,
        LabStatus::Undeployed => TreeIcon::LabUndeployed,
    };

    let children: Vec<TreeNode> = lab
        .containers
        .iter()
        .map(|c| container_node(&lab.lab_path.absolute, c))
        .collect();

    let tooltip = if lab.deployed {
        format!(
            "Lab: {}\nOwner: {}\nTopology: {}",
            lab.name.as_deref().unwrap_or(&lab.label),
            lab.owner.as_deref().unwrap_or("unknown"),
            lab.lab_path.relative
        )
    } else {
        format!("Undeployed topology: {}", lab.lab_path.relative)
    };

    TreeNode {
        id: NodeId::Lab {
            lab_path: lab.lab_path.absolute.clone(),
        },
        label: lab.label.clone(),
        description: Some(lab.lab_path.relative.clone()),
        tooltip: Some(tooltip),
        icon,
        context_value: if lab.deployed {
            context::LAB_DEPLOYED
        } else {
            context::LAB_UNDEPLOYED
        }
        .to_string(),
        collapsible: if children.is_empty() {
            Collapsible::None
        } else {
            Collapsible::Collapsed
        },
        children,
    }
}

pub fn container_node(lab_path: &str, container: &ContainerRecord) -> TreeNode {
    let children: Vec<TreeNode> = container
        .interfaces
        .iter()
        .map(|i| interface_node(lab_path, i))
        .collect();

    TreeNode {
        id: NodeId::Container {
            lab_path: lab_path.to_string(),
            container: container.name.clone(),
        },
        label: container.label.clone(),
        description: Some(container.description.clone()),
        tooltip: Some(container.tooltip.clone()),
        icon: if container.is_running() {
            TreeIcon::ContainerRunning
        } else {
            TreeIcon::ContainerStopped
        },
        context_value: context::CONTAINER.to_string(),
        collapsible: if children.is_empty() {
            Collapsible::None
        } else {
            Collapsible::Collapsed
        },
        children,
    }
}

pub fn interface_node(lab_path: &str, interface: &InterfaceRecord) -> TreeNode {
    let (icon, context_value) = if interface.is_up() {
        (TreeIcon::InterfaceUp, context::INTERFACE_UP)
    } else {
        (TreeIcon::InterfaceDown, context::INTERFACE_DOWN)
    };

    TreeNode {
        id: NodeId::Interface {
            lab_path: lab_path.to_string(),
            container: interface.parent_container_name.clone(),
            interface: interface.name.clone(),
        },
        label: interface.label.clone(),
        description: Some(interface.description.clone()),
        tooltip: Some(interface.tooltip.clone()),
        icon,
        context_value: context_value.to_string(),
        collapsible: Collapsible::None,
        children: Vec::new(),
    }
}
