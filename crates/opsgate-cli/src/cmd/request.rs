use crate::cmd::{request_text, ModelArgs};
use crate::output::{print_fields, print_json, print_table};
use opsgate_core::governance::Governor;
use opsgate_core::ledger::{RequestRecord, RequestStatus};
use std::path::Path;

// ---------------------------------------------------------------------------
// request
// ---------------------------------------------------------------------------

pub fn submit(home: &Path, words: &[String], auto: bool, model: ModelArgs, json: bool) -> anyhow::Result<()> {
    let text = request_text(words)?;
    let governor = Governor::open(home);
    let record = governor.submit(&text, &model.into(), auto)?;

    if json {
        return print_json(&record);
    }
    print_record(&record);
    match record.status {
        RequestStatus::Pending => {
            eprintln!("Request {} awaits approval: opsgate approve {}", record.id, record.id)
        }
        RequestStatus::Failed => eprintln!("Request {} failed", record.id),
        RequestStatus::Executed => {}
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// list / show
// ---------------------------------------------------------------------------

pub fn list(home: &Path, json: bool) -> anyhow::Result<()> {
    let records = Governor::open(home).list()?;
    if json {
        return print_json(&records);
    }
    if records.is_empty() {
        println!("No requests.");
        return Ok(());
    }
    let rows = records
        .iter()
        .map(|r| {
            vec![
                r.id.clone(),
                r.status.to_string(),
                r.tool_name().unwrap_or("-").to_string(),
                r.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "STATUS", "TOOL", "CREATED"], rows);
    Ok(())
}

pub fn show(home: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let record = Governor::open(home).show(id)?;
    if json {
        return print_json(&record);
    }
    print_record(&record);
    Ok(())
}

// ---------------------------------------------------------------------------
// approve
// ---------------------------------------------------------------------------

pub fn approve(home: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let record = Governor::open(home).approve(id)?;
    if json {
        print_json(&record)?;
    } else {
        print_record(&record);
    }
    if record.status == RequestStatus::Failed {
        anyhow::bail!(
            "request {} failed: {}",
            record.id,
            record.error.as_deref().unwrap_or("unknown")
        );
    }
    Ok(())
}

fn print_record(record: &RequestRecord) {
    let ts = |t: Option<chrono::DateTime<chrono::Utc>>| {
        t.map(|t| t.to_rfc3339()).unwrap_or_else(|| "-".to_string())
    };
    let mut fields = vec![
        ("id", record.id.clone()),
        ("status", record.status.to_string()),
        ("tool", record.tool_name().unwrap_or("-").to_string()),
        ("request", record.request_text.clone()),
        ("created_by", record.created_by.clone()),
        ("created_at", record.created_at.to_rfc3339()),
        ("approved_at", ts(record.approved_at)),
        ("executed_at", ts(record.executed_at)),
    ];
    if let Some(result) = &record.result {
        fields.push(("result", result.clone()));
    }
    if let Some(error) = &record.error {
        fields.push(("error", error.clone()));
    }
    print_fields(&fields);
    if let Some(call) = &record.tool_call {
        if let Ok(pretty) = serde_json::to_string_pretty(&call.to_value()) {
            println!("{pretty}");
        }
    }
}
