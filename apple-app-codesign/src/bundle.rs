// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Filesystem handling for application bundles.

use {
    crate::error::AppCodesignError,
    glob::{MatchOptions, Pattern},
    log::{debug, warn},
    std::path::{Path, PathBuf},
};

/// Extension of temporary files `codesign` leaves behind when interrupted.
pub const CODESIGN_TEMP_EXTENSION: &str = "cstemp";

/// Glob options mirroring shell expansion: `*` does not match dotfiles.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

fn escaped(path: &Path) -> String {
    Pattern::escape(&path.to_string_lossy())
}

/// Glob pattern matching everything in the bundle's `Contents/Frameworks` directory.
pub fn frameworks_pattern(app_path: &Path) -> String {
    format!("{}/Contents/Frameworks/*", escaped(app_path))
}

/// Glob pattern matching everything in the bundle's `Contents/MacOS` directory.
pub fn executables_pattern(app_path: &Path) -> String {
    format!("{}/Contents/MacOS/*", escaped(app_path))
}

/// Glob pattern matching the bundle directory itself.
pub fn bundle_pattern(app_path: &Path) -> String {
    escaped(app_path)
}

/// Ensure the application bundle exists.
pub fn ensure_app_exists(app_path: &Path) -> Result<(), AppCodesignError> {
    debug!("checking app path {} exists...", app_path.display());

    if app_path.exists() {
        debug!("app path exists");
        Ok(())
    } else {
        debug!("app path {} does not exist!", app_path.display());
        Err(AppCodesignError::AppNotFound(app_path.to_path_buf()))
    }
}

/// Remove `*.cstemp` entries from the root of the bundle.
///
/// Removal is best effort. Problems are logged and otherwise ignored.
///
/// Returns the number of entries removed.
pub fn cleanup_temp_files(app_path: &Path) -> usize {
    let pattern = format!("{}/*.{}", escaped(app_path), CODESIGN_TEMP_EXTENSION);
    debug!("removing stale temporary files matching {}", pattern);

    let paths = match glob::glob_with(&pattern, MATCH_OPTIONS) {
        Ok(paths) => paths,
        Err(e) => {
            warn!("unable to search for temporary files: {}", e);
            return 0;
        }
    };

    let mut removed = 0;

    for entry in paths {
        let path = match entry {
            Ok(path) => path,
            Err(e) => {
                warn!("unable to read {}: {}", e.path().display(), e.error());
                continue;
            }
        };

        let res = if path.is_dir() {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };

        match res {
            Ok(()) => {
                debug!("removed {}", path.display());
                removed += 1;
            }
            Err(e) => {
                warn!("unable to remove {}: {}", path.display(), e);
            }
        }
    }

    removed
}

/// Resolve a glob pattern to the paths it matches.
///
/// `app_path` is only used to give errors context.
///
/// Results are sorted. Matching nothing is an error.
pub fn find_files(pattern: &str, app_path: &Path) -> Result<Vec<PathBuf>, AppCodesignError> {
    let paths = glob::glob_with(pattern, MATCH_OPTIONS)
        .map_err(|e| AppCodesignError::BadPattern(pattern.to_string(), e))?;

    let mut files = paths
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("skipping {}: {}", e.path().display(), e.error());
                None
            }
        })
        .collect::<Vec<_>>();

    if files.is_empty() {
        return Err(AppCodesignError::NoFilesFound {
            pattern: pattern.to_string(),
            app_path: app_path.to_path_buf(),
        });
    }

    files.sort();

    Ok(files)
}
