use std::path::{Path, PathBuf};
use std::process::Command;

/// How an external process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessExit {
    Success,
    Code(i32),
    /// Terminated by a signal; no exit code exists.
    Signal,
}

impl ProcessExit {
    pub fn success(self) -> bool {
        self == ProcessExit::Success
    }

    /// Suffix for `<tool>_failed:<..>` reasons.
    pub fn reason(self) -> String {
        match self {
            ProcessExit::Success => "0".to_string(),
            ProcessExit::Code(code) => code.to_string(),
            ProcessExit::Signal => "signal".to_string(),
        }
    }
}

impl From<std::process::ExitStatus> for ProcessExit {
    fn from(status: std::process::ExitStatus) -> Self {
        match status.code() {
            Some(0) => ProcessExit::Success,
            Some(code) => ProcessExit::Code(code),
            None => ProcessExit::Signal,
        }
    }
}

/// Seam between the executor and the operating system.
pub trait CommandRunner: Send + Sync {
    /// Run `program args..` to completion, stdio inherited. No timeout.
    fn run(&self, program: &Path, args: &[String], cwd: Option<&Path>) -> std::io::Result<ProcessExit>;

    /// Locate a binary on `PATH`.
    fn which(&self, binary: &str) -> Option<PathBuf>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &Path, args: &[String], cwd: Option<&Path>) -> std::io::Result<ProcessExit> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        tracing::info!(program = %program.display(), ?args, "running external command");
        Ok(cmd.status()?.into())
    }

    fn which(&self, binary: &str) -> Option<PathBuf> {
        which::which(binary).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_strings() {
        assert_eq!(ProcessExit::Code(3).reason(), "3");
        assert_eq!(ProcessExit::Signal.reason(), "signal");
        assert!(ProcessExit::Success.success());
        assert!(!ProcessExit::Code(1).success());
    }

    #[cfg(unix)]
    #[test]
    fn system_runner_reports_exit_codes() {
        let runner = SystemRunner;
        let sh = runner.which("sh").expect("sh on PATH");
        let ok = runner.run(&sh, &["-c".into(), "exit 0".into()], None).unwrap();
        assert_eq!(ok, ProcessExit::Success);
        let failed = runner.run(&sh, &["-c".into(), "exit 7".into()], None).unwrap();
        assert_eq!(failed, ProcessExit::Code(7));
    }

    #[test]
    fn missing_binary_is_none() {
        assert!(SystemRunner.which("definitely-not-a-real-binary-xyz").is_none());
    }
}

/// Test double: records every invocation and answers `which` from a fixed
/// list of binaries.
#[cfg(test)]
pub(crate) mod stub {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone, PartialEq)]
    pub(crate) struct Invocation {
        pub program: PathBuf,
        pub args: Vec<String>,
        pub cwd: Option<PathBuf>,
    }

    pub(crate) struct RecordingRunner {
        binaries: Vec<String>,
        exit: ProcessExit,
        calls: Mutex<Vec<Invocation>>,
    }

    impl RecordingRunner {
        pub(crate) fn new(binaries: &[&str], exit: ProcessExit) -> Self {
            Self {
                binaries: binaries.iter().map(|b| b.to_string()).collect(),
                exit,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn calls(&self) -> Vec<Invocation> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CommandRunner for RecordingRunner {
        fn run(&self, program: &Path, args: &[String], cwd: Option<&Path>) -> std::io::Result<ProcessExit> {
            self.calls.lock().unwrap().push(Invocation {
                program: program.to_path_buf(),
                args: args.to_vec(),
                cwd: cwd.map(Path::to_path_buf),
            });
            Ok(self.exit)
        }

        fn which(&self, binary: &str) -> Option<PathBuf> {
            self.binaries
                .iter()
                .any(|b| b == binary)
                .then(|| PathBuf::from("/usr/bin").join(binary))
        }
    }
}
