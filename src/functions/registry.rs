//! # Function Registry
//!
//! Discovers every `function.json` below a root directory and loads the
//! function next to it. The registry is built once and never changes
//! afterwards; runners share it through `Arc`s.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use super::errors::{FunctionError, FunctionResult};
use super::function::FunctionDefinition;
use super::manifest::{read_manifest, MANIFEST_FILE};
use super::module::ModuleLoader;

/// Registry of discovered functions, in discovery order
#[derive(Debug, Default, Clone)]
pub struct FunctionRegistry {
    functions: Vec<Arc<FunctionDefinition>>,
}

impl FunctionRegistry {
    /// Build a registry from already loaded functions
    pub fn from_functions(functions: Vec<Arc<FunctionDefinition>>) -> Self {
        Self { functions }
    }

    /// Load every function under `root`
    ///
    /// Fails on the first malformed manifest or unloadable entry point.
    pub fn discover(root: &Path, loader: &dyn ModuleLoader) -> FunctionResult<Self> {
        let dirs = find_function_dirs(root)?;

        let mut functions = Vec::with_capacity(dirs.len());
        for dir in dirs {
            functions.push(Arc::new(load_function(&dir, loader)?));
        }

        tracing::debug!(
            event = "FUNCTIONS_DISCOVERED",
            root = %root.display(),
            count = functions.len(),
            "Discovered functions"
        );

        Ok(Self { functions })
    }

    /// Get function by name
    pub fn get(&self, name: &str) -> FunctionResult<Arc<FunctionDefinition>> {
        self.functions
            .iter()
            .find(|f| f.name == name)
            .cloned()
            .ok_or_else(|| FunctionError::NotFound(name.to_string()))
    }

    /// All functions, disabled ones included
    pub fn iter(&self) -> impl Iterator<Item = &Arc<FunctionDefinition>> {
        self.functions.iter()
    }

    /// Functions not marked `disabled`
    pub fn enabled(&self) -> impl Iterator<Item = &Arc<FunctionDefinition>> {
        self.functions.iter().filter(|f| !f.is_disabled())
    }

    /// Get function count
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Resolve the functions root
///
/// Relative roots are anchored at `anchor` (the host's install directory),
/// not at the working directory.
pub fn resolve_root(root: &Path, anchor: &Path) -> PathBuf {
    if root.is_absolute() {
        root.to_path_buf()
    } else {
        anchor.join(root)
    }
}

/// Directory holding the running executable
pub fn install_dir() -> FunctionResult<PathBuf> {
    let exe = std::env::current_exe()?;
    exe.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| FunctionError::Internal("executable has no parent directory".into()))
}

fn find_function_dirs(root: &Path) -> FunctionResult<Vec<PathBuf>> {
    let mut found = Vec::new();

    // Symlinks are not followed, so a link back into the tree cannot loop
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            FunctionError::Io(format!("{}: {}", path.display(), e))
        })?;
        if entry.file_type().is_file() && entry.file_name() == MANIFEST_FILE {
            if let Some(dir) = entry.path().parent() {
                found.push(dir.to_path_buf());
            }
        }
    }
    Ok(found)
}

fn is_hidden(name: &OsStr) -> bool {
    name.to_str().is_some_and(|n| n.starts_with('.'))
}

fn load_function(dir: &Path, loader: &dyn ModuleLoader) -> FunctionResult<FunctionDefinition> {
    let configuration = read_manifest(&dir.join(MANIFEST_FILE))?;
    let name = dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| FunctionError::Internal(format!("unnamed function directory {}", dir.display())))?
        .to_string();
    let module = loader.load(&name, dir)?;

    Ok(FunctionDefinition::new(name, dir, module, configuration))
}
