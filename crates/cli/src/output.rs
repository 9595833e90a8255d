//! Output formatting utilities

use anyhow::Result;
use clab_lib::models::LabStatus;
use clab_lib::tree::TreeNode;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// Parse a format name from the config file
    pub fn from_name(name: &str) -> Option<Self> {
        <Self as ValueEnum>::from_str(name, true).ok()
    }
}

/// Print a value as pretty JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print rows as a rounded table
pub fn print_table<T: Tabled>(rows: Vec<T>) {
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Color a container or interface state
pub fn color_state(state: &str) -> String {
    match state.to_lowercase().as_str() {
        "running" | "up" => state.green().to_string(),
        "exited" | "dead" | "down" => state.red().to_string(),
        "paused" | "restarting" | "created" => state.yellow().to_string(),
        _ => state.to_string(),
    }
}

/// Color the aggregate status of a lab
pub fn color_lab_status(status: LabStatus) -> String {
    match status {
        LabStatus::Running => "running".green().to_string(),
        LabStatus::Partial => "partial".yellow().to_string(),
        LabStatus::Stopped => "stopped".red().to_string(),
        LabStatus::Undeployed => "undeployed".dimmed().to_string(),
    }
}

/// `-` for empty cells
pub fn or_dash(value: &str) -> String {
    if value.is_empty() {
        "-".to_string()
    } else {
        value.to_string()
    }
}

/// Render display nodes as an indented tree
pub fn render_tree(nodes: &[TreeNode]) -> String {
    let mut out = String::new();
    for (index, node) in nodes.iter().enumerate() {
        render_node(&mut out, node, "", index + 1 == nodes.len(), true);
    }
    out
}

fn render_node(out: &mut String, node: &TreeNode, prefix: &str, last: bool, root: bool) {
    let branch = match (root, last) {
        (true, _) => "",
        (false, true) => "└── ",
        (false, false) => "├── ",
    };

    let label = if root {
        node.label.bold().to_string()
    } else {
        node.label.clone()
    };

    match node.description.as_deref().filter(|d| !d.is_empty()) {
        Some(description) => {
            let _ = writeln!(out, "{}{}{}  {}", prefix, branch, label, description.dimmed());
        }
        None => {
            let _ = writeln!(out, "{}{}{}", prefix, branch, label);
        }
    }

    let child_prefix = match (root, last) {
        (true, _) => prefix.to_string(),
        (false, true) => format!("{}    ", prefix),
        (false, false) => format!("{}│   ", prefix),
    };
    for (index, child) in node.children.iter().enumerate() {
        render_node(
            out,
            child,
            &child_prefix,
            index + 1 == node.children.len(),
            false,
        );
    }
}
