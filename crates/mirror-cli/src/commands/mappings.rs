//! The mappings command

use colored::Colorize;
use mirror_core::{MirrorDefinition, MirrorManager};

use super::Workspace;
use crate::error::Result;

pub fn run_mappings(workspace: &Workspace, json: bool) -> Result<()> {
    let mirrors = workspace.registry().registered_mirrors();

    if json {
        let definitions: Vec<&MirrorDefinition> = mirrors.values().collect();
        println!("{}", serde_json::to_string_pretty(&definitions)?);
        return Ok(());
    }

    if !workspace.registry().is_enabled() {
        println!("{}", "Mirroring is disabled".yellow());
        return Ok(());
    }
    if mirrors.is_empty() {
        println!("{}", "No active mirrors".dimmed());
        return Ok(());
    }
    for (root, definition) in &mirrors {
        let overlay = if definition.overlayable() { " (overlayable)" } else { "" };
        println!(
            "{} -> {}{}",
            root.to_string().cyan(),
            definition.source_root(),
            overlay
        );
    }
    Ok(())
}
