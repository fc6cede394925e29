//! Rendering the processed deck to PDF with marp-cli.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

use tracing::{debug, info};

pub const MARP_INSTALL_URL: &str = "https://github.com/marp-team/marp-cli#install";

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("`{binary}` was not found on PATH; install marp-cli first ({MARP_INSTALL_URL})")]
    MarpNotInstalled { binary: String },

    #[error("cannot start '{}': {source}", binary.display())]
    Spawn {
        binary: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("marp exited with {status} while exporting '{}'", output.display())]
    Failed { status: ExitStatus, output: PathBuf },
}

/// A located marp binary and the flags every export uses.
#[derive(Debug, Clone)]
pub struct Exporter {
    binary: PathBuf,
    html: bool,
}

impl Exporter {
    /// Resolve `binary` on PATH. Done before any processing so a missing
    /// renderer is reported up front.
    pub fn locate(binary: &str, html: bool) -> Result<Self, ExportError> {
        let binary = which::which(binary).map_err(|_| ExportError::MarpNotInstalled {
            binary: binary.to_string(),
        })?;
        debug!(binary = %binary.display(), "found marp");
        Ok(Exporter { binary, html })
    }

    pub fn args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            input.into(),
            "-o".into(),
            output.into(),
            "--pdf".into(),
            "--pdf-outlines".into(),
            "--pdf-outlines.pages=false".into(),
            "--allow-local-files".into(),
        ];
        if self.html {
            args.push("--html".into());
        }
        args
    }

    /// Render `input` to `output`; the child's exit status decides success.
    pub fn export(&self, input: &Path, output: &Path) -> Result<(), ExportError> {
        let status = Command::new(&self.binary)
            .args(self.args(input, output))
            .status()
            .map_err(|source| ExportError::Spawn {
                binary: self.binary.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ExportError::Failed {
                status,
                output: output.to_path_buf(),
            });
        }
        info!(output = %output.display(), "exported presentation");
        Ok(())
    }
}
