use crate::output::{print_json, print_table};
use opsgate_core::governance::Governor;
use std::path::Path;

pub fn run(home: &Path, limit: Option<usize>, json: bool) -> anyhow::Result<()> {
    let events = Governor::open(home).audit(limit)?;
    if json {
        return print_json(&events);
    }
    if events.is_empty() {
        println!("No audit events.");
        return Ok(());
    }
    let rows = events
        .iter()
        .map(|e| {
            vec![
                e.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                e.event.to_string(),
                e.request_id.clone(),
                e.tool.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string()),
                e.status.to_string(),
                e.actor.clone(),
                e.detail.clone().unwrap_or_default(),
            ]
        })
        .collect();
    print_table(
        &["TIME", "EVENT", "REQUEST", "TOOL", "STATUS", "ACTOR", "DETAIL"],
        rows,
    );
    Ok(())
}
