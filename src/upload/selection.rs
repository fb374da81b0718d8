use super::error::SelectionError;
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Extensions the server knows how to parse. Only used when walking a
/// directory; explicitly chosen files are always taken.
const ACTIVITY_EXTENSIONS: [&str; 3] = ["fit", "gpx", "tcx"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, size: u64) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            size,
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, SelectionError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| SelectionError::NoFileName(path.to_path_buf()))?;

        let size = std::fs::metadata(path)
            .map_err(|source| SelectionError::Metadata {
                path: path.to_path_buf(),
                source,
            })?
            .len();

        Ok(Self::new(name, path, size))
    }
}

/// Snapshot of the files chosen for one submission. Once built it is never
/// refreshed from the picker, so the picker can be reused mid-upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSelection {
    files: Vec<SelectedFile>,
}

impl FileSelection {
    pub fn new(files: Vec<SelectedFile>) -> Self {
        Self { files }
    }

    /// Builds a selection from user-supplied paths, keeping their order.
    /// Directories are expanded to the activity files they contain.
    pub fn from_paths<I, P>(paths: I) -> Result<Self, SelectionError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut files = Vec::new();
        for path in paths {
            let path = path.as_ref();
            if path.is_dir() {
                Self::collect_dir(path, &mut files);
            } else {
                files.push(SelectedFile::from_path(path)?);
            }
        }
        debug!("selected {} files", files.len());
        Ok(Self::new(files))
    }

    /// A directory is best effort: entries that cannot be walked or
    /// inspected are logged and left out.
    fn collect_dir(dir: &Path, files: &mut Vec<SelectedFile>) {
        let walker = WalkBuilder::new(dir)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            match entry {
                Ok(entry) => {
                    let path = entry.path();
                    if path.is_file() && is_activity_file(path) {
                        push_walked(files, path);
                    }
                }
                Err(e) => warn!("error walking {}: {}", dir.display(), e),
            }
        }
    }

    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }
}

fn push_walked(files: &mut Vec<SelectedFile>, path: &Path) {
    match SelectedFile::from_path(path) {
        Ok(file) => files.push(file),
        Err(e) => warn!("skipping {}", e),
    }
}

fn is_activity_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_lowercase();
            ACTIVITY_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
