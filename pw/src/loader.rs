//! Template Loader
//!
//! Finds template files on an ordered search path. For each directory the bare
//! name is tried first, then the name with the configured extension; the
//! first existing file wins.

use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::config::Config;
use crate::error::PromptError;

/// Locates and reads template files
#[derive(Debug, Clone)]
pub struct PromptLoader {
    /// Directories searched in order
    search_paths: Vec<PathBuf>,
    /// Extension tried after the bare name (without the dot)
    extension: String,
}

impl PromptLoader {
    /// Create a loader over the given directories
    pub fn new<I, P>(search_paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let search_paths: Vec<PathBuf> = search_paths
            .into_iter()
            .map(|p| p.as_ref().to_path_buf())
            .collect();
        debug!(?search_paths, "PromptLoader::new: called");
        Self {
            search_paths,
            extension: crate::DEFAULT_EXTENSION.to_string(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.search_paths).with_extension(&config.extension)
    }

    /// A loader with no search path; every include is unknown
    pub fn empty() -> Self {
        Self::new(Vec::<PathBuf>::new())
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    fn candidates(&self, name: &str) -> Vec<PathBuf> {
        let mut names = vec![name.to_string()];
        if !self.extension.is_empty() {
            names.push(format!("{}.{}", name, self.extension));
        }
        self.search_paths
            .iter()
            .flat_map(|dir| names.iter().map(move |n| dir.join(n)))
            .collect()
    }

    /// Path of the first file matching `name`, if any
    ///
    /// Names are relative to a search directory: absolute paths and `..` or
    /// `.` components never match.
    pub fn find(&self, name: &str) -> Option<PathBuf> {
        debug!(%name, "PromptLoader::find: called");
        if name.is_empty() || name.contains('\n') {
            return None;
        }
        if !Path::new(name).components().all(|c| matches!(c, Component::Normal(_))) {
            debug!(%name, "PromptLoader::find: rejected path outside search directories");
            return None;
        }
        let found = self.candidates(name).into_iter().find(|path| path.is_file());
        debug!(?found, "PromptLoader::find: done");
        found
    }

    pub fn exists(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// Read the raw (unresolved) content of a named template
    pub fn load(&self, name: &str) -> Result<String, PromptError> {
        let path = self.find(name).ok_or_else(|| PromptError::FileNotFound {
            name: name.to_string(),
            searched: self.search_paths.clone(),
        })?;
        debug!(?path, "PromptLoader::load: reading template");
        std::fs::read_to_string(&path).map_err(|source| PromptError::Io { path, source })
    }
}
