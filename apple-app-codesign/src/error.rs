// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {std::path::PathBuf, thiserror::Error};

/// Unified error type for signing application bundles.
#[derive(Debug, Error)]
pub enum AppCodesignError {
    #[error("bad argument")]
    CliBadArgument,

    #[error("{0}")]
    CliGeneralError(String),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("{} does not exist.", .0.display())]
    AppNotFound(PathBuf),

    #[error("No files found for {pattern} in {}", .app_path.display())]
    NoFilesFound { pattern: String, app_path: PathBuf },

    #[error("bad glob pattern {0}: {1}")]
    BadPattern(String, glob::PatternError),

    #[error("codesign failed {0}. See output above for more details.")]
    CodesignFailed(String),

    #[error("signature verification failed for {}", .0.display())]
    VerificationFailed(PathBuf),

    #[error("unable to run {program}: {source}")]
    ToolLaunch {
        program: String,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error parsing configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("unable to construct thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
