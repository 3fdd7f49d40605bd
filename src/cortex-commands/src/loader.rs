//! Command loader for reading commands from filesystem.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{debug, warn};

use crate::command::{Command, CommandError};

/// Project-local command directory, relative to the working directory.
pub const PROJECT_COMMAND_DIR: &str = ".cortex/command";

/// Errors that can occur when loading commands.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Loader for custom commands from filesystem.
#[derive(Debug, Clone)]
pub struct CommandLoader {
    /// Search directories in order of priority.
    search_dirs: Vec<PathBuf>,
}

impl Default for CommandLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandLoader {
    /// Loader over the project-local then the global command directory.
    pub fn new() -> Self {
        Self {
            search_dirs: default_search_dirs(),
        }
    }

    /// Loader over exactly `dirs`, highest priority first.
    pub fn with_dirs(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            search_dirs: dirs.into_iter().collect(),
        }
    }

    /// Get the search directories.
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Load all commands from all search directories.
    ///
    /// Commands from earlier directories take precedence over later ones.
    pub async fn load_all(&self) -> Result<Vec<Command>, LoaderError> {
        let mut commands = Vec::new();
        let mut seen_names = HashSet::new();

        for dir in &self.search_dirs {
            match self.load_from_directory(dir).await {
                Ok(dir_commands) => {
                    for cmd in dir_commands {
                        if seen_names.insert(cmd.name.clone()) {
                            commands.push(cmd);
                        } else {
                            debug!(
                                "Skipping duplicate command '{}' from {:?}",
                                cmd.name, cmd.source_path
                            );
                        }
                    }
                }
                Err(LoaderError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!("Command directory {:?} does not exist, skipping", dir);
                }
                Err(e) => {
                    warn!("Error loading commands from {:?}: {}", dir, e);
                }
            }
        }

        Ok(commands)
    }

    /// Load commands from a specific directory, sorted by name.
    pub async fn load_from_directory(&self, dir: &Path) -> Result<Vec<Command>, LoaderError> {
        let mut commands = Vec::new();
        let mut entries = fs::read_dir(dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "md") {
                match self.load_from_file(&path).await {
                    Ok(cmd) => {
                        debug!("Loaded command '{}' from {:?}", cmd.name, path);
                        commands.push(cmd);
                    }
                    Err(e) => {
                        warn!("Failed to load command from {:?}: {}", path, e);
                    }
                }
            }
        }

        commands.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(commands)
    }

    /// Load a single command from a file.
    pub async fn load_from_file(&self, path: &Path) -> Result<Command, LoaderError> {
        let name = command_name(path)?;
        let content = fs::read_to_string(path).await?;
        Ok(Command::parse(name, &content, path.to_path_buf())?)
    }
}

fn command_name(path: &Path) -> Result<String, LoaderError> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| LoaderError::InvalidPath(format!("Invalid filename: {:?}", path)))
}

/// Project-local directory first, then `<config dir>/Cortex/command`.
pub fn default_search_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![PathBuf::from(PROJECT_COMMAND_DIR)];
    if let Some(config_dir) = dirs::config_dir() {
        dirs.push(config_dir.join("Cortex").join("command"));
    }
    dirs
}

/// Synchronous version of the loader for contexts where async is not available.
pub mod sync {
    use std::fs;
    use std::path::Path;

    use super::{LoaderError, command_name};
    use crate::command::Command;

    /// Load all commands from a directory. A missing directory yields none.
    pub fn load_from_directory(dir: &Path) -> Result<Vec<Command>, LoaderError> {
        let mut commands = Vec::new();

        if !dir.exists() {
            return Ok(commands);
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "md") {
                match load_from_file(&path) {
                    Ok(cmd) => commands.push(cmd),
                    Err(e) => {
                        tracing::warn!("Failed to load command from {:?}: {}", path, e);
                    }
                }
            }
        }

        commands.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(commands)
    }

    pub fn load_from_file(path: &Path) -> Result<Command, LoaderError> {
        let name = command_name(path)?;
        let content = fs::read_to_string(path)?;
        Ok(Command::parse(name, &content, path.to_path_buf())?)
    }
}
