//! The resolve command

use colored::Colorize;

use super::Workspace;
use crate::error::Result;

pub fn run_resolve(workspace: &Workspace, path: &str) -> Result<()> {
    let handle = workspace.resolve(path)?;

    println!("{}", handle.path().to_string().bold());
    match handle.mirror_root() {
        Some(root) => {
            println!("  {:<12} {}", "served from:", handle.source_path().to_string().green());
            println!("  {:<12} {}", "mirror:", root);
        }
        None => println!("  {:<12} {}", "served from:", "store".dimmed()),
    }
    println!("  {:<12} {}", "type:", handle.resource_type());
    Ok(())
}
