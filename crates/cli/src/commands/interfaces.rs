//! Container and interface commands

use anyhow::{anyhow, Result};
use clab_lib::models::{ContainerRecord, LabRecord};
use clab_lib::paths::normalize_lab_path;
use clab_lib::LabDiscovery;
use colored::Colorize;
use tabled::Tabled;

use crate::output::{color_state, or_dash, print_json, print_table, print_warning, OutputFormat};

/// Row for containers table
#[derive(Tabled)]
struct ContainerRow {
    #[tabled(rename = "Node")]
    name: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Image")]
    image: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "IPv4")]
    ipv4: String,
    #[tabled(rename = "IPv6")]
    ipv6: String,
}

/// Row for interfaces table
#[derive(Tabled)]
struct InterfaceRow {
    #[tabled(rename = "Interface")]
    name: String,
    #[tabled(rename = "Alias")]
    alias: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Type")]
    if_type: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "MTU")]
    mtu: u32,
}

/// Find a deployed lab by topology path or by lab name
fn find_lab<'a>(
    labs: &'a [LabRecord],
    lab: &str,
    discovery: &LabDiscovery,
) -> Result<&'a LabRecord> {
    let key = normalize_lab_path(lab, discovery.workspace_root());
    labs.iter()
        .filter(|l| l.deployed)
        .find(|l| l.lab_path.absolute == key || l.name.as_deref() == Some(lab))
        .ok_or_else(|| anyhow!("No deployed lab matches `{}`", lab))
}

/// Find a container by full or short name
fn find_container<'a>(lab: &'a LabRecord, container: &str) -> Result<&'a ContainerRecord> {
    lab.containers
        .iter()
        .find(|c| c.name == container || c.name_short == container)
        .ok_or_else(|| anyhow!("Lab `{}` has no container `{}`", lab.label, container))
}

/// List the containers of one deployed lab
pub async fn list_containers(
    discovery: &LabDiscovery,
    lab: &str,
    format: OutputFormat,
) -> Result<()> {
    let labs = discovery.discover_labs().await;
    let lab = find_lab(&labs, lab, discovery)?;

    match format {
        OutputFormat::Json => print_json(&lab.containers)?,
        OutputFormat::Table => {
            println!("{}", lab.label.bold());
            let rows = lab
                .containers
                .iter()
                .map(|c| ContainerRow {
                    name: c.name_short.clone(),
                    kind: c.kind.clone(),
                    image: c.image.clone(),
                    state: color_state(&c.state),
                    ipv4: or_dash(&c.ipv4()),
                    ipv6: or_dash(&c.ipv6()),
                })
                .collect();
            print_table(rows);
        }
    }

    Ok(())
}

/// List the interfaces of one container
pub async fn list_interfaces(
    discovery: &LabDiscovery,
    lab: &str,
    container: &str,
    format: OutputFormat,
) -> Result<()> {
    let labs = discovery.discover_labs().await;
    let lab = find_lab(&labs, lab, discovery)?;
    let container = find_container(lab, container)?;

    let interfaces = discovery
        .get_interfaces(
            &lab.lab_path.absolute,
            &container.name,
            &container.container_id,
            &container.state,
        )
        .await;

    match format {
        OutputFormat::Json => print_json(&interfaces)?,
        OutputFormat::Table => {
            println!(
                "{} {}",
                container.name.bold(),
                color_state(&container.state)
            );
            if interfaces.is_empty() {
                print_warning("No interfaces reported");
                return Ok(());
            }
            let rows = interfaces
                .iter()
                .map(|i| InterfaceRow {
                    name: i.name.clone(),
                    alias: or_dash(i.alias.as_deref().unwrap_or_default()),
                    state: color_state(&i.state),
                    if_type: i.if_type.clone(),
                    mac: i.mac.clone(),
                    mtu: i.mtu,
                })
                .collect();
            print_table(rows);
        }
    }

    Ok(())
}
