//! Applying a boot configuration document with the external bootconfig tool.

use std::path::{Path, PathBuf};

use etch_common::{EtchError, EtchResult, FileMode};
use tempfile::TempPath;
use tokio::process::Command;

use crate::filesystem::write_file;

/// Runs `<tool> -a <input> <output>`.
#[derive(Debug, Clone)]
pub struct BootConfigTool {
    tool: PathBuf,
    input: PathBuf,
}

impl BootConfigTool {
    /// `tool` is the bootconfig binary; `input` is where the document is
    /// staged before the tool reads it.
    pub fn new(tool: impl Into<PathBuf>, input: impl Into<PathBuf>) -> Self {
        Self {
            tool: tool.into(),
            input: input.into(),
        }
    }

    /// Apply `document` to `output`.
    ///
    /// The staged input is written with `mode` and removed again whether or
    /// not the tool succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`EtchError::BootConfig`] with the tool's combined output if
    /// it cannot be started or exits unsuccessfully.
    pub async fn apply(&self, document: &str, output: &Path, mode: FileMode) -> EtchResult<()> {
        let staged = TempPath::try_from_path(&self.input)
            .map_err(|e| EtchError::filesystem("stage bootconfig input", &self.input, e))?;
        write_file(&staged, document.as_bytes(), mode)?;

        tracing::debug!(
            tool = %self.tool.display(),
            input = %staged.display(),
            output = %output.display(),
            "Running bootconfig"
        );

        let result = Command::new(&self.tool)
            .arg("-a")
            .arg(&*staged)
            .arg(output)
            .output()
            .await
            .map_err(|e| EtchError::BootConfig {
                tool: self.tool.clone(),
                message: e.to_string(),
                output: String::new(),
            })?;

        if !result.status.success() {
            let mut combined = String::from_utf8_lossy(&result.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&result.stderr));
            return Err(EtchError::BootConfig {
                tool: self.tool.clone(),
                message: result.status.to_string(),
                output: combined.trim_end().to_string(),
            });
        }

        tracing::info!(output = %output.display(), "Applied boot configuration");
        Ok(())
    }
}
