// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Signing identity discovery.

use {
    crate::tool::ToolRunner,
    log::{debug, warn},
    std::{ffi::OsString, path::Path},
};

/// Arguments to `certtool` to list certificates in the user's keychain.
pub const CERTTOOL_LIST_ARGS: &[&str] = &["y"];

/// Whether a signing identity with the given name is available.
///
/// This runs `certtool y` and looks for `common_name` in its output.
///
/// Failure to run `certtool` is treated as the identity not being available.
/// An empty name is never available.
pub fn is_identity_available(
    runner: &dyn ToolRunner,
    certtool_path: &Path,
    common_name: &str,
) -> bool {
    if common_name.is_empty() {
        debug!("empty signing identity is never available");
        return false;
    }

    let args = CERTTOOL_LIST_ARGS
        .iter()
        .map(OsString::from)
        .collect::<Vec<_>>();

    let output = match runner.run(certtool_path, &args) {
        Ok(output) if output.success() => output,
        Ok(output) => {
            debug!(
                "failed to list certificates: certtool exited with {:?}",
                output.code
            );
            return false;
        }
        Err(e) => {
            debug!("failed to list certificates: {}", e);
            return false;
        }
    };

    if output.output.contains(common_name) {
        warn!("signing identity `{}` is available", common_name);
        true
    } else {
        debug!("signing identity `{}` not detected", common_name);
        false
    }
}
