//! Sensor listings for the `sensors` and `print-sensors` commands

use anyhow::Result;
use hwmon_core::{
    list_all_sensors, list_configured_sensors, visit_nodes, HardwareProvider, HardwareTree, SensorListing,
    SensorRegistry,
};
use hwmon_monitor::{SysinfoProvider, SETTLE_INTERVAL};
use std::fmt::Write;
use tracing::info;

/// Which sensors a listing shows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    All,
    Configured,
}

/// Take a settled reading of the live hardware tree
pub async fn read_tree() -> Result<HardwareTree> {
    let mut provider = SysinfoProvider::open()?;
    provider.refresh()?;
    tokio::time::sleep(SETTLE_INTERVAL).await;
    let tree = provider.refresh()?;
    provider.close();
    Ok(tree)
}

pub fn select(tree: &HardwareTree, registry: &SensorRegistry, listing: Listing) -> Vec<SensorListing> {
    match listing {
        Listing::All => list_all_sensors(tree.roots()),
        Listing::Configured => list_configured_sensors(tree.roots(), registry),
    }
}

/// Plain text rendering, one header per hardware node.
///
/// `Listing::All` shows every node, including nodes without sensors;
/// `Listing::Configured` only shows nodes that hold a listed sensor.
pub fn format_text(tree: &HardwareTree, listings: &[SensorListing], listing: Listing) -> String {
    let mut out = String::new();

    visit_nodes(tree.roots(), |node| {
        let mut rows = listings.iter().filter(|entry| entry.hardware_id == node.id).peekable();
        if listing == Listing::Configured && rows.peek().is_none() {
            return;
        }

        let _ = writeln!(out, "{} ({})", node.name, node.id);
        for entry in rows {
            let value = entry
                .value
                .map(|v| format!("{:.1}", v))
                .unwrap_or_else(|| "n/a".to_string());
            let _ = writeln!(
                out,
                "  {:<32} {:<36} {}",
                entry.sensor_name,
                entry.sensor_id.as_str(),
                value
            );
        }
    });

    out
}

pub async fn print(registry: &SensorRegistry, listing: Listing, json: bool) -> Result<()> {
    let tree = read_tree().await?;
    let listings = select(&tree, registry, listing);
    info!(sensors = listings.len(), "Sensor listing ready");

    if json {
        println!("{}", serde_json::to_string_pretty(&listings)?);
    } else if tree.is_empty() || (listing == Listing::Configured && listings.is_empty()) {
        println!("No sensors found");
    } else {
        print!("{}", format_text(&tree, &listings, listing));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwmon_core::{HardwareNode, Role, SensorKind};

    fn tree() -> HardwareTree {
        let mut cpu = HardwareNode::new("/cpu/0", "Test CPU");
        cpu.push_sensor(SensorKind::Load, 0, "CPU Total", Some(12.5));
        cpu.push_sensor(SensorKind::Temperature, 0, "CPU Package", None);
        let mut ram = HardwareNode::new("/ram", "Generic Memory");
        ram.push_sensor(SensorKind::Load, 0, "Memory", Some(40.0));
        let board = HardwareNode::new("/board", "Mainboard");
        HardwareTree::new(vec![cpu, ram, board])
    }

    #[test]
    fn test_select_configured() {
        let registry = SensorRegistry::new().with_sensor(Role::MemLoad, "/ram/load/0");
        let tree = tree();

        assert_eq!(select(&tree, &registry, Listing::All).len(), 3);
        let configured = select(&tree, &registry, Listing::Configured);
        assert_eq!(configured.len(), 1);
        assert_eq!(configured[0].sensor_id.as_str(), "/ram/load/0");
    }

    #[test]
    fn test_format_text_groups_by_hardware() {
        let tree = tree();
        let listings = list_all_sensors(tree.roots());
        let text = format_text(&tree, &listings, Listing::All);
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "Test CPU (/cpu/0)");
        assert!(lines[1].contains("/cpu/0/load/0") && lines[1].ends_with("12.5"));
        assert!(lines[2].ends_with("n/a"));
        assert_eq!(lines[3], "Generic Memory (/ram)");
        // Hardware without sensors is still listed
        assert_eq!(lines[5], "Mainboard (/board)");
    }

    #[test]
    fn test_format_text_configured_skips_unlisted_hardware() {
        let tree = tree();
        let registry = SensorRegistry::new().with_sensor(Role::MemLoad, "/ram/load/0");
        let listings = select(&tree, &registry, Listing::Configured);
        let text = format_text(&tree, &listings, Listing::Configured);

        assert_eq!(text.lines().count(), 2);
        assert!(text.starts_with("Generic Memory (/ram)\n"));
        assert!(!text.contains("Mainboard"));
    }
}
