// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Sign macOS application bundles using the system `codesign` tool.

This crate does not implement any code signing itself. Instead, it drives
Apple's `codesign` and `certtool` programs over the contents of an
application bundle.

[AppSigner] runs the complete signing pipeline:

1. Ensure the bundle exists.
2. Remove `*.cstemp` files left behind by interrupted `codesign` runs.
3. Sign everything in `Contents/Frameworks/`.
4. Sign everything in `Contents/MacOS/`.
5. Sign the bundle itself.
6. Verify the bundle's signature.

Paths within a single stage are signed concurrently. Stages run one after
another and the first error aborts the pipeline.

External processes are launched through the [ToolRunner] trait.
[DuctRunner] runs real processes.
*/

pub mod bundle;
pub mod config;
pub mod error;
pub mod identity;
pub mod signing;
#[cfg(test)]
mod testutil;
pub mod tool;
pub mod warning;

pub use {
    config::CodesignConfig,
    error::AppCodesignError,
    identity::is_identity_available,
    tool::{DuctRunner, ToolOutput, ToolRunner},
    warning::print_gatekeeper_warning,
};

use {
    crate::{
        bundle::{
            bundle_pattern, cleanup_temp_files, ensure_app_exists, executables_pattern,
            frameworks_pattern,
        },
        signing::{codesign_pattern, codesign_verify},
    },
    log::warn,
    std::{fmt::Formatter, path::PathBuf},
};

/// A stage of the signing pipeline.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SigningStage {
    CheckExists,
    Cleanup,
    SignFrameworks,
    SignExecutables,
    SignBundle,
    Verify,
}

impl SigningStage {
    /// All stages, in execution order.
    pub fn all() -> &'static [SigningStage] {
        &[
            Self::CheckExists,
            Self::Cleanup,
            Self::SignFrameworks,
            Self::SignExecutables,
            Self::SignBundle,
            Self::Verify,
        ]
    }
}

impl std::fmt::Display for SigningStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::CheckExists => "checking application exists",
            Self::Cleanup => "removing temporary files",
            Self::SignFrameworks => "signing frameworks",
            Self::SignExecutables => "signing executables",
            Self::SignBundle => "signing bundle",
            Self::Verify => "verifying signature",
        })
    }
}

/// The result of [AppSigner::sign_if_identity_available].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SignOutcome {
    /// The pipeline ran. Holds every path signed.
    Signed(Vec<PathBuf>),

    /// The signing identity is not available so nothing was signed.
    IdentityUnavailable,
}

/// Signs an application bundle.
pub struct AppSigner<R: ToolRunner> {
    config: CodesignConfig,
    runner: R,
}

impl AppSigner<DuctRunner> {
    /// Construct an instance that runs real processes.
    pub fn with_system_tools(config: CodesignConfig) -> Self {
        Self::new(config, DuctRunner)
    }
}

impl<R: ToolRunner> AppSigner<R> {
    /// Construct an instance from a configuration and a process runner.
    pub fn new(config: CodesignConfig, runner: R) -> Self {
        Self { config, runner }
    }

    /// The configuration in use.
    pub fn config(&self) -> &CodesignConfig {
        &self.config
    }

    /// The process runner in use.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Run a single pipeline stage.
    ///
    /// Returns the paths signed by the stage, which is empty for stages that
    /// don't sign.
    pub fn run_stage(&self, stage: SigningStage) -> Result<Vec<PathBuf>, AppCodesignError> {
        let app_path = &self.config.app_path;

        match stage {
            SigningStage::CheckExists => {
                ensure_app_exists(app_path)?;
                Ok(vec![])
            }
            SigningStage::Cleanup => {
                cleanup_temp_files(app_path);
                Ok(vec![])
            }
            SigningStage::SignFrameworks => self.sign_pattern(&frameworks_pattern(app_path)),
            SigningStage::SignExecutables => self.sign_pattern(&executables_pattern(app_path)),
            SigningStage::SignBundle => self.sign_pattern(&bundle_pattern(app_path)),
            SigningStage::Verify => {
                self.verify()?;
                Ok(vec![])
            }
        }
    }

    /// Run the full signing pipeline.
    ///
    /// Returns every path that was signed, in stage order.
    pub fn sign(&self) -> Result<Vec<PathBuf>, AppCodesignError> {
        let mut signed = vec![];

        for stage in SigningStage::all() {
            warn!("{}", stage);
            signed.extend(self.run_stage(*stage)?);
        }

        warn!(
            "signed {} paths in {}",
            signed.len(),
            self.config.app_path.display()
        );

        Ok(signed)
    }

    /// Run the full signing pipeline if the signing identity is available.
    ///
    /// Nothing is touched when the identity can't be found.
    pub fn sign_if_identity_available(&self) -> Result<SignOutcome, AppCodesignError> {
        if self.is_identity_available() {
            Ok(SignOutcome::Signed(self.sign()?))
        } else {
            warn!(
                "signing identity `{}` is not available; skipping signing",
                self.config.identity
            );
            Ok(SignOutcome::IdentityUnavailable)
        }
    }

    /// Sign every path matched by a glob pattern.
    pub fn sign_pattern(&self, pattern: &str) -> Result<Vec<PathBuf>, AppCodesignError> {
        codesign_pattern(&self.runner, &self.config, pattern)
    }

    /// Verify the signature of the application bundle.
    pub fn verify(&self) -> Result<(), AppCodesignError> {
        codesign_verify(&self.runner, &self.config, &self.config.app_path)
    }

    /// Whether the configured signing identity is available.
    pub fn is_identity_available(&self) -> bool {
        is_identity_available(
            &self.runner,
            &self.config.certtool_path,
            &self.config.identity,
        )
    }
}
