//! The ls command

use colored::Colorize;
use mirror_core::ResourceHandle;

use super::Workspace;
use crate::error::Result;

pub fn run_list(workspace: &Workspace, path: &str, recursive: bool) -> Result<()> {
    let parent = workspace.resolve(path)?;

    let mut pending = vec![parent];
    let mut listed = 0;
    while let Some(handle) = pending.pop() {
        let mut children = workspace.table().list_children(&handle)?;
        children.sort_by(|a, b| a.path().cmp(b.path()));
        for child in children.iter() {
            print_entry(child);
            listed += 1;
        }
        if !recursive {
            break;
        }
        // Reverse so the stack pops children in path order.
        pending.extend(children.into_iter().rev());
    }

    if listed == 0 {
        println!("{}", "(no children)".dimmed());
    }
    Ok(())
}

fn print_entry(handle: &ResourceHandle) {
    if handle.is_mirrored() {
        println!(
            "{}  {}  {} {}",
            handle.path(),
            handle.resource_type().dimmed(),
            "<-".dimmed(),
            handle.source_path().to_string().green()
        );
    } else {
        println!("{}  {}", handle.path(), handle.resource_type().dimmed());
    }
}
