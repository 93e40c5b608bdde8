// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Configuration for signing an application bundle.

use {
    crate::error::AppCodesignError,
    serde::Deserialize,
    std::path::{Path, PathBuf},
};

/// Default program used to sign and verify.
pub const DEFAULT_CODESIGN_PROGRAM: &str = "codesign";

/// Default program used to list signing certificates.
pub const DEFAULT_CERTTOOL_PROGRAM: &str = "certtool";

/// Describes what to sign and how.
///
/// The application path and signing identity are always required. Everything
/// else has a reasonable default.
///
/// Instances can be deserialized from YAML:
///
/// ```yaml
/// app_path: dist/MyApp.app
/// identity: "Developer ID Application: Example Corp (ABCDE12345)"
/// jobs: 4
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CodesignConfig {
    /// Path to the `.app` bundle to sign.
    pub app_path: PathBuf,

    /// Name of the signing identity passed to `codesign -s`.
    ///
    /// This is also the string searched for when checking identity availability.
    pub identity: String,

    /// Maximum number of concurrent `codesign` processes.
    ///
    /// `None` lets the thread pool pick based on the number of CPUs.
    #[serde(default)]
    pub jobs: Option<usize>,

    /// Program to invoke for signing and verification.
    #[serde(default = "default_codesign_path")]
    pub codesign_path: PathBuf,

    /// Program to invoke for listing certificates.
    #[serde(default = "default_certtool_path")]
    pub certtool_path: PathBuf,
}

fn default_codesign_path() -> PathBuf {
    PathBuf::from(DEFAULT_CODESIGN_PROGRAM)
}

fn default_certtool_path() -> PathBuf {
    PathBuf::from(DEFAULT_CERTTOOL_PROGRAM)
}

impl CodesignConfig {
    /// Construct a new instance with default settings.
    pub fn new(app_path: impl AsRef<Path>, identity: impl ToString) -> Self {
        Self {
            app_path: app_path.as_ref().to_path_buf(),
            identity: identity.to_string(),
            jobs: None,
            codesign_path: default_codesign_path(),
            certtool_path: default_certtool_path(),
        }
    }

    /// Parse an instance from YAML data.
    pub fn from_yaml_str(data: &str) -> Result<Self, AppCodesignError> {
        let config = serde_yaml::from_str::<Self>(data)?;
        config.validate()?;

        Ok(config)
    }

    /// Load an instance from a YAML file.
    ///
    /// A relative `app_path` is resolved against the directory holding the file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, AppCodesignError> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&data)?;

        if config.app_path.is_relative() {
            if let Some(parent) = path.parent() {
                config.app_path = parent.join(&config.app_path);
            }
        }

        Ok(config)
    }

    /// Set the maximum number of concurrent signing processes.
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = Some(jobs);
        self
    }

    /// Set the program used for signing and verification.
    pub fn codesign_path(mut self, path: impl AsRef<Path>) -> Self {
        self.codesign_path = path.as_ref().to_path_buf();
        self
    }

    /// Set the program used for listing certificates.
    pub fn certtool_path(mut self, path: impl AsRef<Path>) -> Self {
        self.certtool_path = path.as_ref().to_path_buf();
        self
    }

    /// Resolve a configuration from an optional base and explicit overrides.
    ///
    /// Values in `overrides` take precedence over values in `base`. The
    /// application path and identity must come from one of the two. The
    /// result is validated.
    pub fn resolve(
        base: Option<Self>,
        overrides: ConfigOverrides,
    ) -> Result<Self, AppCodesignError> {
        let app_path = overrides
            .app_path
            .or_else(|| base.as_ref().map(|c| c.app_path.clone()))
            .ok_or_else(|| {
                AppCodesignError::ConfigInvalid("no application path specified".into())
            })?;

        let identity = overrides
            .identity
            .or_else(|| base.as_ref().map(|c| c.identity.clone()))
            .ok_or_else(|| {
                AppCodesignError::ConfigInvalid("no signing identity specified".into())
            })?;

        let mut config = match base {
            Some(c) => Self {
                app_path,
                identity,
                ..c
            },
            None => Self::new(app_path, identity),
        };

        if let Some(jobs) = overrides.jobs {
            config.jobs = Some(jobs);
        }
        if let Some(path) = overrides.codesign_path {
            config.codesign_path = path;
        }
        if let Some(path) = overrides.certtool_path {
            config.certtool_path = path;
        }

        config.validate()?;

        Ok(config)
    }

    /// Ensure settings are usable.
    pub fn validate(&self) -> Result<(), AppCodesignError> {
        validate_identity(&self.identity)?;

        if self.jobs == Some(0) {
            return Err(AppCodesignError::ConfigInvalid(
                "jobs must be at least 1".into(),
            ));
        }

        Ok(())
    }
}

/// Explicit settings that take precedence over a loaded [CodesignConfig].
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConfigOverrides {
    pub app_path: Option<PathBuf>,
    pub identity: Option<String>,
    pub jobs: Option<usize>,
    pub codesign_path: Option<PathBuf>,
    pub certtool_path: Option<PathBuf>,
}

/// Ensure a signing identity name is usable.
///
/// An empty name would match any certificate listing.
pub fn validate_identity(identity: &str) -> Result<(), AppCodesignError> {
    if identity.is_empty() {
        Err(AppCodesignError::ConfigInvalid(
            "signing identity must not be empty".into(),
        ))
    } else {
        Ok(())
    }
}

/// Parse a user supplied job count.
pub fn parse_jobs(value: &str) -> Result<usize, AppCodesignError> {
    match value.parse::<usize>() {
        Ok(jobs) if jobs > 0 => Ok(jobs),
        _ => Err(AppCodesignError::ConfigInvalid(format!(
            "jobs must be a positive integer; got {}",
            value
        ))),
    }
}
