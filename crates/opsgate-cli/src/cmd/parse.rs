use crate::cmd::{request_text, ModelArgs};
use crate::output::print_json;
use opsgate_core::governance::Governor;
use std::path::Path;

pub fn run(home: &Path, words: &[String], raw: bool, model: ModelArgs, json: bool) -> anyhow::Result<()> {
    let text = request_text(words)?;
    let governor = Governor::open(home);
    let outcome = governor.parse(&text, &model.into())?;

    if json {
        print_json(&outcome)?;
    } else if raw {
        println!("{}", outcome.raw_model_output);
    } else if let Some(call) = &outcome.tool_call {
        print_json(&call.to_value())?;
    }

    match &outcome.rejection {
        Some(rejection) => anyhow::bail!("model output rejected: {rejection}"),
        None => Ok(()),
    }
}
