use crate::contract::{ToolContract, ToolName};

/// Fixed instruction that precedes the tool list.
pub const PREAMBLE: &str = "You are opsgate, an infrastructure command translator. \
Respond ONLY with valid JSON matching this schema exactly (no extra keys): \
{\"tool\":\"<tool>\",\"args\":{...},\"safety\":{\"requires_confirmation\":true|false,\"reason\":\"\"}}. \
Set requires_confirmation to true for anything that changes production or is uncertain.";

/// Render one contract line, e.g.
/// `deploy: args {branch, environment, canary_percent?, dry_run?} (environment must match pipeline name)`.
pub fn render_contract(contract: &ToolContract) -> String {
    let args: Vec<String> = contract
        .required
        .iter()
        .map(|s| s.name.to_string())
        .chain(contract.optional.iter().map(|s| format!("{}?", s.name)))
        .collect();
    let mut line = format!("{}: args {{{}}}", contract.tool, args.join(", "));
    if let Some(hint) = contract.hint {
        line.push_str(&format!(" ({hint})"));
    }
    line
}

/// Build the full instruction prompt. Pure: the same request always yields
/// the same prompt, and the request text comes last, verbatim.
pub fn build_prompt(request: &str) -> String {
    let tools: Vec<String> = ToolName::all()
        .iter()
        .map(|t| render_contract(t.contract()))
        .collect();
    format!(
        "{PREAMBLE} Allowed tools: {}. Request: {request}",
        tools.join("; ")
    )
}
