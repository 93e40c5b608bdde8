// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Invoking `codesign` to sign and verify paths. */

use {
    crate::{
        bundle::find_files, config::CodesignConfig, error::AppCodesignError, tool::ToolRunner,
    },
    log::{debug, error, warn},
    rayon::prelude::*,
    std::{
        ffi::OsString,
        path::{Path, PathBuf},
        sync::atomic::{AtomicBool, Ordering},
    },
};

/// Arguments to `codesign` to sign a single path.
///
/// The path is passed through unaltered, even if it isn't valid UTF-8.
pub fn codesign_sign_args(identity: &str, path: &Path) -> Vec<OsString> {
    vec![
        "-s".into(),
        identity.into(),
        "-vvv".into(),
        "--deep".into(),
        "--force".into(),
        path.as_os_str().to_os_string(),
    ]
}

/// Arguments to `codesign` to verify a path.
pub fn codesign_verify_args(path: &Path) -> Vec<OsString> {
    vec![
        "--verify".into(),
        "-vvv".into(),
        path.as_os_str().to_os_string(),
    ]
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|x| x.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Sign a single path.
pub fn codesign_path(
    runner: &dyn ToolRunner,
    config: &CodesignConfig,
    path: &Path,
) -> Result<(), AppCodesignError> {
    let name = base_name(path);
    debug!("signing {}...", name);

    let output = runner.run(
        &config.codesign_path,
        &codesign_sign_args(&config.identity, path),
    )?;

    if output.success() {
        Ok(())
    } else {
        error!("codesign exited with {:?} signing {}", output.code, name);
        Err(AppCodesignError::CodesignFailed(name))
    }
}

/// Sign many paths concurrently.
///
/// At most `config.jobs` processes run at once. After the first failure no new
/// signing operations are started and the first error is returned.
pub fn codesign_paths(
    runner: &dyn ToolRunner,
    config: &CodesignConfig,
    paths: &[PathBuf],
) -> Result<Vec<PathBuf>, AppCodesignError> {
    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(jobs) = config.jobs {
        builder = builder.num_threads(jobs);
    }
    let pool = builder.build()?;

    let poisoned = AtomicBool::new(false);

    let results = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                if poisoned.load(Ordering::SeqCst) {
                    return None;
                }

                let res = codesign_path(runner, config, path);
                if res.is_err() {
                    poisoned.store(true, Ordering::SeqCst);
                }

                Some(res)
            })
            .collect::<Vec<_>>()
    });

    // Errors are reported in input order for deterministic messages.
    for res in results.into_iter().flatten() {
        res?;
    }

    debug!("{} files signed successfully!", paths.len());

    Ok(paths.to_vec())
}

/// Sign everything matched by a glob pattern.
///
/// Matching nothing is an error.
pub fn codesign_pattern(
    runner: &dyn ToolRunner,
    config: &CodesignConfig,
    pattern: &str,
) -> Result<Vec<PathBuf>, AppCodesignError> {
    let files = find_files(pattern, &config.app_path)?;
    warn!("signing {} paths matching {}", files.len(), pattern);

    codesign_paths(runner, config, &files)
}

/// Verify the signature of a path.
pub fn codesign_verify(
    runner: &dyn ToolRunner,
    config: &CodesignConfig,
    path: &Path,
) -> Result<(), AppCodesignError> {
    warn!("verifying signature on {}...", path.display());

    let output = runner.run(&config.codesign_path, &codesign_verify_args(path))?;

    if output.success() {
        debug!("signature on {} verified", path.display());
        Ok(())
    } else {
        Err(AppCodesignError::VerificationFailed(path.to_path_buf()))
    }
}
