//! External tool invocation
//!
//! Commands are built as a program plus argument list and never pass
//! through a shell. The `CommandRunner` trait is the seam between the
//! render pipeline and real processes.

use std::env;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Result, TapecutError};

/// A program and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Format conversion from `input` to `output`, format chosen by extension
    pub fn transcode(program: &str, input: &Path, output: &Path) -> Self {
        ToolCommand::new(program).args([
            "-loglevel".to_string(),
            "error".to_string(),
            "-i".to_string(),
            input.to_string_lossy().into_owned(),
            output.to_string_lossy().into_owned(),
        ])
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn arguments(&self) -> &[String] {
        &self.args
    }
}

/// Space-joined command line; arguments containing whitespace or quotes are
/// double-quoted
impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(word: &str) -> String {
    if !word.is_empty() && !word.chars().any(|c| c.is_whitespace() || c == '"') {
        return word.to_string();
    }
    format!("\"{}\"", word.replace('"', "\\\""))
}

/// Cooperative cancellation flag shared between a caller and a render
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs external tools on behalf of the renderer
pub trait CommandRunner: Send + Sync {
    /// Whether `program` can be invoked
    fn resolve(&self, program: &str) -> bool;

    /// Run `command` to completion.
    ///
    /// # Errors
    /// * `CommandFailed` - If the command exits non-zero
    /// * `Cancelled` - If `cancel` fires while the command is running
    fn run(&self, command: &ToolCommand, cancel: &CancelToken) -> Result<()>;
}

/// Runs commands as child processes of this one
#[derive(Debug, Clone)]
pub struct SystemRunner {
    poll_interval: Duration,
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(20),
        }
    }
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// How often a running child is checked for exit or cancellation
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}

impl CommandRunner for SystemRunner {
    fn resolve(&self, program: &str) -> bool {
        find_program(program).is_some()
    }

    fn run(&self, command: &ToolCommand, cancel: &CancelToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(TapecutError::Cancelled {
                command: Some(command.to_string()),
            });
        }

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => TapecutError::MissingDependency {
                    program: command.program.clone(),
                },
                _ => TapecutError::Io(e),
            })?;

        let stderr = child.stderr.take();
        let stderr_drain = thread::spawn(move || -> std::io::Result<Vec<u8>> {
            let mut bytes = Vec::new();
            if let Some(mut stderr) = stderr {
                stderr.read_to_end(&mut bytes)?;
            }
            Ok(bytes)
        });

        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if cancel.is_cancelled() {
                warn!(command = %command, "cancelling running command");
                let _ = child.kill();
                let _ = child.wait();
                let _ = stderr_drain.join();
                return Err(TapecutError::Cancelled {
                    command: Some(command.to_string()),
                });
            }
            thread::sleep(self.poll_interval);
        };

        match stderr_drain.join() {
            Ok(Ok(bytes)) if !bytes.is_empty() => {
                debug!(stderr = %String::from_utf8_lossy(&bytes).trim(), "tool stderr");
            }
            Ok(Err(e)) => warn!(error = %e, "failed to read tool stderr"),
            Err(_) => warn!("tool stderr drain thread panicked"),
            _ => {}
        }

        if !status.success() {
            return Err(TapecutError::CommandFailed {
                command: command.to_string(),
                status: status.code(),
            });
        }

        Ok(())
    }
}

/// Locate `program` the way `which` does: paths are checked directly, bare
/// names are searched for in `PATH`
pub fn find_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let search = env::var_os("PATH")?;
    env::split_paths(&search)
        .flat_map(|dir| executable_names(program).map(move |name| dir.join(name)))
        .find(|path| path.is_file())
}

#[cfg(windows)]
fn executable_names(program: &str) -> impl Iterator<Item = String> {
    [program.to_string(), format!("{}.exe", program)].into_iter()
}

#[cfg(not(windows))]
fn executable_names(program: &str) -> impl Iterator<Item = String> {
    std::iter::once(program.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_display_plain() {
        let cmd = ToolCommand::new("ecasound").args(["-a:0", "-y:1.5"]);
        assert_eq!(cmd.to_string(), "ecasound -a:0 -y:1.5");
    }

    #[test]
    fn test_display_quotes_whitespace() {
        let cmd = ToolCommand::transcode(
            "ffmpeg",
            Path::new("/music/my song.mp3"),
            Path::new("/tmp/out.wav"),
        );
        assert_eq!(
            cmd.to_string(),
            "ffmpeg -loglevel error -i \"/music/my song.mp3\" /tmp/out.wav"
        );
    }

    #[test]
    fn test_display_quotes_empty_argument() {
        let cmd = ToolCommand::new("tool").arg("");
        assert_eq!(cmd.to_string(), "tool \"\"");
    }

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!token.is_cancelled());
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_find_program_missing() {
        assert!(find_program("tapecut-definitely-not-a-program").is_none());
        assert!(find_program("/nonexistent/bin/tool").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_find_program_on_path() {
        assert!(find_program("sh").is_some());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_success_and_failure() {
        let runner = SystemRunner::new();
        let cancel = CancelToken::new();

        runner.run(&ToolCommand::new("true"), &cancel).unwrap();

        let failing = ToolCommand::new("sh").args(["-c", "echo oops >&2; exit 3"]);
        match runner.run(&failing, &cancel).unwrap_err() {
            TapecutError::CommandFailed { command, status } => {
                assert_eq!(command, failing.to_string());
                assert_eq!(status, Some(3));
            }
            other => panic!("Expected CommandFailed error, got: {:?}", other),
        }
    }

    #[test]
    fn test_run_unknown_program() {
        let err = SystemRunner::new()
            .run(
                &ToolCommand::new("tapecut-definitely-not-a-program"),
                &CancelToken::new(),
            )
            .unwrap_err();
        assert!(matches!(err, TapecutError::MissingDependency { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_kills_running_command() {
        let runner = SystemRunner::new().with_poll_interval(Duration::from_millis(5));
        let cancel = CancelToken::new();

        let trigger = cancel.clone();
        let canceller = thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            trigger.cancel();
        });

        let started = Instant::now();
        let err = runner
            .run(&ToolCommand::new("sleep").arg("10"), &cancel)
            .unwrap_err();
        canceller.join().unwrap();

        assert!(matches!(err, TapecutError::Cancelled { command: Some(_) }));
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_pre_cancelled_never_spawns() {
        let cancel = CancelToken::new();
        cancel.cancel();

        let err = SystemRunner::new()
            .run(&ToolCommand::new("tapecut-definitely-not-a-program"), &cancel)
            .unwrap_err();
        assert!(matches!(err, TapecutError::Cancelled { .. }));
    }
}
