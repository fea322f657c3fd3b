//! Prompt templates and app spec files.
//!
//! Prompts live in `{dir}/{name}.md`; spec files are `{dir}/*.txt`. The
//! chosen spec is always copied into the project as `app_spec.txt` so the
//! prompts can refer to it by a fixed name.

use anyhow::{Context, Result};
use lra_core::AppError;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::PromptsConfig;

pub const INITIALIZER_PROMPT: &str = "initializer_prompt";
pub const CODING_PROMPT: &str = "coding_prompt";
/// Name the spec gets inside the project directory.
pub const PROJECT_SPEC_FILE: &str = "app_spec.txt";

#[derive(Debug, Clone)]
pub struct PromptLibrary {
    dir: PathBuf,
    default_spec: String,
}

impl PromptLibrary {
    pub fn new(dir: impl Into<PathBuf>, default_spec: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            default_spec: default_spec.into(),
        }
    }

    pub fn from_config(config: &PromptsConfig) -> Self {
        Self::new(&config.dir, &config.default_spec)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn default_spec(&self) -> &str {
        &self.default_spec
    }

    /// Read `{dir}/{name}.md`.
    pub fn load(&self, name: &str) -> Result<String> {
        let path = self.dir.join(format!("{name}.md"));
        if !path.is_file() {
            return Err(AppError::PromptNotFound(path.display().to_string()).into());
        }
        std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read prompt: {}", path.display()))
    }

    pub fn initializer_prompt(&self) -> Result<String> {
        self.load(INITIALIZER_PROMPT)
    }

    pub fn coding_prompt(&self) -> Result<String> {
        self.load(CODING_PROMPT)
    }

    /// Sorted `*.txt` file names in the prompts directory.
    pub fn available_specs(&self) -> Result<Vec<String>> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read prompts dir: {}", self.dir.display()))?;

        let mut specs: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "txt"))
            .filter_map(|path| path.file_name()?.to_str().map(String::from))
            .collect();
        specs.sort();
        Ok(specs)
    }

    /// Fail with `SpecNotFound` unless `spec_file` is one of the available specs.
    pub fn ensure_spec_available(&self, spec_file: &str) -> Result<()> {
        if self.available_specs()?.iter().any(|s| s == spec_file) {
            Ok(())
        } else {
            Err(AppError::SpecNotFound(spec_file.to_string()).into())
        }
    }

    /// Copy the spec into `{project_dir}/app_spec.txt`.
    ///
    /// A custom spec always overwrites; the default spec is only copied when
    /// the project has none yet. Returns the copied source name, if any.
    pub fn copy_spec_to_project(
        &self,
        project_dir: &Path,
        spec_file: Option<&str>,
    ) -> Result<Option<String>> {
        let source_name = spec_file.unwrap_or(&self.default_spec);
        let source = self.dir.join(source_name);
        if spec_file.is_some() && !source.is_file() {
            return Err(AppError::SpecNotFound(source.display().to_string()).into());
        }

        let dest = project_dir.join(PROJECT_SPEC_FILE);
        if dest.exists() && spec_file.is_none() {
            return Ok(None);
        }

        std::fs::copy(&source, &dest).with_context(|| {
            format!(
                "Failed to copy spec {} -> {}",
                source.display(),
                dest.display()
            )
        })?;
        info!(source = %source.display(), dest = %dest.display(), "Copied app spec into project");
        Ok(Some(source_name.to_string()))
    }
}
