//! Per-tool adapters that turn an approved [`ToolCall`] into an operation
//! on live state.
//!
//! Every handler resolves its target through [`resolve_project`] first.
//! Failures never escape as errors: each one becomes an
//! [`ActionOutcome::Failed`] carrying a stable reason string.

mod runner;

#[cfg(test)]
pub(crate) use runner::stub;
pub use runner::{CommandRunner, ProcessExit, SystemRunner};

use crate::contract::{
    Action, AutomationArgs, DeployArgs, RollbackArgs, ScaleArgs, ToolCall, ToolName,
};
use crate::paths;
use crate::pipeline::{Pipeline, PipelineStore};
use crate::resolver::resolve_project;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const COMPOSE_FILE: &str = "docker-compose.yml";
const PAUSE_REASON: &str = "ai_request";

// ---------------------------------------------------------------------------
// ActionOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "message", rename_all = "snake_case")]
pub enum ActionOutcome {
    Succeeded(String),
    Failed(String),
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Succeeded(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ActionOutcome::Succeeded(m) | ActionOutcome::Failed(m) => m,
        }
    }

    pub fn into_result(self) -> Result<String, String> {
        match self {
            ActionOutcome::Succeeded(m) => Ok(m),
            ActionOutcome::Failed(m) => Err(m),
        }
    }
}

impl From<Result<String, String>> for ActionOutcome {
    fn from(result: Result<String, String>) -> Self {
        match result {
            Ok(m) => ActionOutcome::Succeeded(m),
            Err(m) => ActionOutcome::Failed(m),
        }
    }
}

// ---------------------------------------------------------------------------
// ActionExecutor
// ---------------------------------------------------------------------------

pub struct ActionExecutor {
    pipelines: PipelineStore,
    scripts_dir: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

/// Handler result: success message or failure reason.
type Step<T> = Result<T, String>;

impl ActionExecutor {
    pub fn new(pipelines: PipelineStore, scripts_dir: PathBuf, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            pipelines,
            scripts_dir,
            runner,
        }
    }

    /// Executor over the pipelines and scripts of an opsgate home.
    pub fn for_home(home: &Path, runner: Arc<dyn CommandRunner>) -> Self {
        Self::new(PipelineStore::open(home), paths::scripts_dir(home), runner)
    }

    /// Run one approved call. Gating is the caller's job.
    pub fn execute(&self, call: &ToolCall) -> ActionOutcome {
        let tool = call.tool();
        let outcome: ActionOutcome = match call.action() {
            Action::Deploy(args) => self.deploy(args),
            Action::Rollback(args) => self.rollback(args),
            Action::Scale(args) => self.scale(args),
            Action::PauseAutomation(args) => self.pause(args),
            Action::ResumeAutomation(args) => self.resume(args),
            Action::Explain(_) => Ok("explain_only".to_string()),
        }
        .into();

        match &outcome {
            ActionOutcome::Succeeded(m) => tracing::info!(%tool, result = %m, "action succeeded"),
            ActionOutcome::Failed(m) => tracing::warn!(%tool, reason = %m, "action failed"),
        }
        outcome
    }

    // ─── handlers ──────────────────────────────────────────────────────

    fn deploy(&self, args: &DeployArgs) -> Step<String> {
        let tool = ToolName::Deploy;
        let project = self.resolve(tool, &args.environment)?;
        if args.dry_run == Some(true) {
            return Ok("deploy_dry_run".to_string());
        }

        let pipeline = self.pipeline(tool, &project)?;
        if let Some(configured) = pipeline.branch.as_deref() {
            if !args.branch.is_empty() && args.branch != configured {
                tracing::warn!(%project, requested = %args.branch, configured, "branch mismatch");
                return Err("branch_mismatch".to_string());
            }
        }

        let script = self.script(tool, paths::DEPLOY_SCRIPT)?;
        self.run_checked(tool, &script, &[project.clone()], None)?;
        Ok(format!("deploy_started:{project}"))
    }

    fn rollback(&self, args: &RollbackArgs) -> Step<String> {
        let tool = ToolName::Rollback;
        let project = self.resolve(tool, &args.service)?;
        let target = args
            .target_version
            .clone()
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "previous".to_string());

        let script = self.script(tool, paths::ROLLBACK_SCRIPT)?;
        let argv = [project.clone(), target, "--yes".to_string()];
        self.run_checked(tool, &script, &argv, None)?;
        Ok(format!("rollback_started:{project}"))
    }

    fn scale(&self, args: &ScaleArgs) -> Step<String> {
        let tool = ToolName::Scale;
        let project = self.resolve(tool, &args.service)?;
        if args.dry_run == Some(true) {
            return Ok("scale_dry_run".to_string());
        }

        let pipeline = self.pipeline(tool, &project)?;
        let manifest =
            resolve_compose_path(&pipeline).ok_or_else(|| "scale_compose_file_not_found".to_string())?;
        let service = pipeline
            .docker_service
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| Some(args.service.clone()).filter(|s| !s.is_empty()))
            .unwrap_or_else(|| project.clone());
        let cwd = compose_workdir(&pipeline, &manifest);

        let compose_args = vec![
            "-f".to_string(),
            manifest.display().to_string(),
            "up".to_string(),
            "-d".to_string(),
            "--scale".to_string(),
            format!("{service}={}", args.replicas),
        ];
        let exit = self.run_compose(&compose_args, &cwd)?;
        if !exit.success() {
            return Err(format!("{tool}_failed:{}", exit.reason()));
        }

        let replicas = args.replicas;
        let region = args.region.clone().filter(|r| !r.is_empty());
        self.pipelines
            .update(&project, |p| {
                p.desired_replicas = Some(replicas);
                p.desired_replicas_updated_at = Some(Utc::now());
                if region.is_some() {
                    p.desired_replicas_region = region;
                }
            })
            .map_err(|e| format!("{tool}_failed:{e}"))?;
        tracing::info!(%project, %service, replicas, "compose scale applied");
        Ok(format!("scale_applied:{project}"))
    }

    fn pause(&self, args: &AutomationArgs) -> Step<String> {
        let tool = ToolName::PauseAutomation;
        let project = self.resolve(tool, automation_target(args))?;
        self.pipelines
            .update(&project, |p| {
                p.enabled = false;
                p.paused_at = Some(Utc::now());
                p.paused_reason = Some(PAUSE_REASON.to_string());
            })
            .map_err(|e| format!("{tool}_failed:{e}"))?;
        Ok(format!("automation_paused:{project}"))
    }

    fn resume(&self, args: &AutomationArgs) -> Step<String> {
        let tool = ToolName::ResumeAutomation;
        let project = self.resolve(tool, automation_target(args))?;
        self.pipelines
            .update(&project, |p| {
                p.enabled = true;
                p.paused_at = None;
                p.paused_reason = None;
            })
            .map_err(|e| format!("{tool}_failed:{e}"))?;
        Ok(format!("automation_resumed:{project}"))
    }

    // ─── helpers ───────────────────────────────────────────────────────

    fn resolve(&self, tool: ToolName, identifier: &str) -> Step<String> {
        let names = self
            .pipelines
            .names()
            .map_err(|e| format!("{tool}_failed:{e}"))?;
        resolve_project(names.iter().map(String::as_str), Some(identifier))
            .map_err(|e| format!("{tool}_project_resolution_failed:{e}"))
    }

    fn pipeline(&self, tool: ToolName, name: &str) -> Step<Pipeline> {
        self.pipelines
            .get(name)
            .map_err(|e| format!("{tool}_failed:{e}"))
    }

    fn script(&self, tool: ToolName, file: &str) -> Step<PathBuf> {
        let path = self.scripts_dir.join(file);
        if path.is_file() {
            Ok(path)
        } else {
            Err(format!("{tool}_script_not_found"))
        }
    }

    fn run_checked(&self, tool: ToolName, program: &Path, args: &[String], cwd: Option<&Path>) -> Step<()> {
        let exit = self
            .runner
            .run(program, args, cwd)
            .map_err(|e| format!("{tool}_failed:{e}"))?;
        if exit.success() {
            Ok(())
        } else {
            Err(format!("{tool}_failed:{}", exit.reason()))
        }
    }

    /// `docker compose ..`, or `docker-compose ..` when `docker` is absent.
    fn run_compose(&self, args: &[String], cwd: &Path) -> Step<ProcessExit> {
        let tool = ToolName::Scale;
        if let Some(docker) = self.runner.which("docker") {
            let mut argv = Vec::with_capacity(args.len() + 1);
            argv.push("compose".to_string());
            argv.extend_from_slice(args);
            return self
                .runner
                .run(&docker, &argv, Some(cwd))
                .map_err(|e| format!("{tool}_failed:{e}"));
        }
        if let Some(compose) = self.runner.which("docker-compose") {
            return self
                .runner
                .run(&compose, args, Some(cwd))
                .map_err(|e| format!("{tool}_failed:{e}"));
        }
        Err("docker_compose_not_found".to_string())
    }
}

fn automation_target(args: &AutomationArgs) -> &str {
    if args.service.trim().is_empty() {
        &args.environment
    } else {
        &args.service
    }
}

/// First existing manifest among: the explicit override, the deploy path,
/// the deployment working copy. Relative paths are taken from
/// `deployment_dir`.
pub fn resolve_compose_path(pipeline: &Pipeline) -> Option<PathBuf> {
    let deployment_dir = PathBuf::from(pipeline.deployment_dir.as_deref().unwrap_or(""));
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(file) = pipeline.docker_compose_file.as_deref().filter(|f| !f.is_empty()) {
        candidates.push(PathBuf::from(file));
    }
    if let Some(dir) = pipeline.deploy_path.as_deref().filter(|d| !d.is_empty()) {
        candidates.push(Path::new(dir).join(COMPOSE_FILE));
    }
    if pipeline.deployment_dir.as_deref().is_some_and(|d| !d.is_empty()) {
        candidates.push(deployment_dir.join("repo").join(COMPOSE_FILE));
    }

    candidates
        .into_iter()
        .map(|c| if c.is_absolute() { c } else { deployment_dir.join(c) })
        .find(|c| c.is_file())
        .map(|c| std::fs::canonicalize(&c).unwrap_or(c))
}

fn compose_workdir(pipeline: &Pipeline, manifest: &Path) -> PathBuf {
    match pipeline.docker_compose_dir.as_deref().filter(|d| !d.is_empty()) {
        Some(dir) => {
            let dir = PathBuf::from(dir);
            if dir.is_absolute() {
                dir
            } else {
                PathBuf::from(pipeline.deployment_dir.as_deref().unwrap_or("")).join(dir)
            }
        }
        None => manifest
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    }
}
