use std::fmt;
use zipsum_common::{NormalizedPath, ROOT_FOLDER};

/// Why an internal path has no folder/file decomposition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathIssue {
    Empty,
    /// Ends in `/` but was not stored as a directory entry
    MissingFileName,
}

impl fmt::Display for PathIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathIssue::Empty => f.write_str("entry path is empty"),
            PathIssue::MissingFileName => f.write_str("entry path has no file name"),
        }
    }
}

/// Split a raw `/`-separated archive path into its folder under `uploads/` and its base name.
///
/// `"Cfg/app.ini"` becomes (`"uploads/Cfg/"`, `"app.ini"`), `"readme.txt"` becomes
/// (`"uploads/"`, `"readme.txt"`). Segments are kept verbatim.
pub fn normalize(raw: &str) -> Result<NormalizedPath, PathIssue> {
    if raw.is_empty() {
        return Err(PathIssue::Empty);
    }

    let (folder_path, file) = match raw.rsplit_once('/') {
        Some((folder_path, file)) => (folder_path, file),
        None => ("", raw),
    };

    if file.is_empty() {
        return Err(PathIssue::MissingFileName);
    }

    let folder = if folder_path.is_empty() {
        ROOT_FOLDER.to_string()
    } else {
        format!("{}{}/", ROOT_FOLDER, folder_path)
    };

    Ok(NormalizedPath {
        folder,
        file: file.to_string(),
    })
}
