//! Lab listing commands

use anyhow::{Context, Result};
use clab_lib::models::LabRecord;
use clab_lib::LabDiscovery;
use colored::Colorize;
use tabled::Tabled;

use crate::output::{color_lab_status, print_json, print_table, print_warning, OutputFormat};

/// Row for labs table
#[derive(Tabled)]
struct LabRow {
    #[tabled(rename = "Lab")]
    label: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Containers")]
    containers: String,
    #[tabled(rename = "Topology")]
    topology: String,
}

impl From<&LabRecord> for LabRow {
    fn from(lab: &LabRecord) -> Self {
        let running = lab.containers.iter().filter(|c| c.is_running()).count();
        Self {
            label: lab.label.clone(),
            status: color_lab_status(lab.status),
            containers: if lab.deployed {
                format!("{}/{}", running, lab.containers.len())
            } else {
                "-".to_string()
            },
            topology: lab.lab_path.relative.clone(),
        }
    }
}

/// List every lab in the workspace, deployed labs first
pub async fn list_labs(discovery: &LabDiscovery, format: OutputFormat) -> Result<()> {
    let labs = discovery.discover_labs().await;

    match format {
        OutputFormat::Json => print_json(&labs)?,
        OutputFormat::Table => {
            if labs.iter().all(LabRecord::is_placeholder) {
                print_warning(clab_lib::models::NO_LABS_LABEL);
                return Ok(());
            }

            let deployed = labs.iter().filter(|l| l.deployed).count();
            print_table(labs.iter().map(LabRow::from).collect());
            println!(
                "\n{} deployed, {} undeployed",
                deployed.to_string().green(),
                labs.len() - deployed
            );
        }
    }

    Ok(())
}

/// List deployed labs only; fails when the inspect tool fails
pub async fn list_deployed_labs(discovery: &LabDiscovery, format: OutputFormat) -> Result<()> {
    let labs: Vec<LabRecord> = discovery
        .discover_inspect_labs()
        .await
        .context("Failed to list deployed labs")?
        .unwrap_or_default()
        .into_values()
        .collect();

    match format {
        OutputFormat::Json => print_json(&labs)?,
        OutputFormat::Table => {
            if labs.is_empty() {
                print_warning("No deployed labs");
                return Ok(());
            }
            print_table(labs.iter().map(LabRow::from).collect());
        }
    }

    Ok(())
}
