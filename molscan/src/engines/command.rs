use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{MolscanError, Result};
use crate::models::Image;

use super::RecognitionWorker;

/// Argument placeholder replaced by the blob path.
pub const PATH_PLACEHOLDER: &str = "{path}";

enum CommandBackend {
    Ready { program: PathBuf },
    Unavailable { reason: String },
}

/// Engine backed by an external executable (molvec, osra, imago, ...).
///
/// The executable receives the blob path in its arguments and must print the
/// recognized structure on stdout and exit with status 0.
pub struct CommandWorker {
    name: String,
    backend: CommandBackend,
    args: Vec<String>,
}

impl CommandWorker {
    pub fn new(name: impl Into<String>, program: &str, args: Vec<String>) -> Self {
        let name = name.into();
        let backend = match resolve_program(program) {
            Some(path) => {
                info!(engine = %name, program = %path.display(), "Command engine initialized");
                CommandBackend::Ready { program: path }
            }
            None => {
                let reason = format!("Engine executable not found: {program}");
                warn!(engine = %name, "{}", reason);
                CommandBackend::Unavailable { reason }
            }
        };

        Self {
            name,
            backend,
            args,
        }
    }

    fn command_args(&self, blob: &Path) -> Vec<String> {
        let path = blob.to_string_lossy();
        let mut substituted = false;
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                if arg.contains(PATH_PLACEHOLDER) {
                    substituted = true;
                    arg.replace(PATH_PLACEHOLDER, &path)
                } else {
                    arg.clone()
                }
            })
            .collect();
        if !substituted {
            args.push(path.into_owned());
        }
        args
    }
}

#[async_trait]
impl RecognitionWorker for CommandWorker {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        !matches!(self.backend, CommandBackend::Unavailable { .. })
    }

    async fn recognize_blob(&self, _image: &Image, blob: &Path) -> Result<String> {
        let program = match &self.backend {
            CommandBackend::Ready { program } => program,
            CommandBackend::Unavailable { reason } => {
                return Err(MolscanError::Engine(reason.clone()));
            }
        };

        let args = self.command_args(blob);
        debug!(engine = %self.name, program = %program.display(), ?args, "Running engine");

        let output = Command::new(program)
            .args(&args)
            .stdin(std::process::Stdio::null())
            .output()
            .await
            .map_err(|e| MolscanError::Engine(format!("Failed to start {}: {e}", self.name)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(MolscanError::Engine(format!(
                "{} exited with {}: {}",
                self.name,
                output.status,
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(MolscanError::Engine(format!(
                "{} produced no output",
                self.name
            )));
        }
        Ok(stdout)
    }
}

/// Locate an executable: explicit paths are checked directly, bare names are
/// searched on `PATH`.
fn resolve_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(OsStr::new(program)))
        .find(|path| path.is_file())
}
