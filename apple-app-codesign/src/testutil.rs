// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{
        error::AppCodesignError,
        tool::{ToolOutput, ToolRunner},
    },
    anyhow::Result,
    std::{
        ffi::OsString,
        path::{Path, PathBuf},
        sync::Mutex,
    },
};

pub fn temp_dir() -> Result<(tempfile::TempDir, PathBuf)> {
    let td = tempfile::Builder::new()
        .prefix("apple-app-codesign-")
        .tempdir()?;
    let path = td.path().to_path_buf();

    Ok((td, path))
}

/// Create a skeleton `MyApp.app` under `parent`.
///
/// Framework entries ending in `.framework` become directories. Everything
/// else becomes a file.
pub fn create_app_bundle(
    parent: &Path,
    frameworks: &[&str],
    executables: &[&str],
) -> Result<PathBuf> {
    let app = parent.join("MyApp.app");
    let contents = app.join("Contents");
    let frameworks_dir = contents.join("Frameworks");
    let macos_dir = contents.join("MacOS");

    std::fs::create_dir_all(&frameworks_dir)?;
    std::fs::create_dir_all(&macos_dir)?;
    std::fs::write(contents.join("Info.plist"), b"")?;

    for name in frameworks {
        let path = frameworks_dir.join(name);
        if name.ends_with(".framework") {
            std::fs::create_dir(&path)?;
        } else {
            std::fs::write(&path, b"")?;
        }
    }

    for name in executables {
        std::fs::write(macos_dir.join(name), b"")?;
    }

    Ok(app)
}

/// Convert string arguments to the form passed to a [ToolRunner].
pub fn os_args(args: &[&str]) -> Vec<OsString> {
    args.iter().map(OsString::from).collect()
}

type Responder = dyn Fn(&Path, &[OsString]) -> Result<ToolOutput, AppCodesignError> + Send + Sync;

/// A [ToolRunner] that records invocations and answers them with a closure.
pub struct RecordingRunner {
    invocations: Mutex<Vec<(PathBuf, Vec<OsString>)>>,
    responder: Box<Responder>,
}

impl RecordingRunner {
    pub fn new(
        responder: impl Fn(&Path, &[OsString]) -> Result<ToolOutput, AppCodesignError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            invocations: Mutex::new(vec![]),
            responder: Box::new(responder),
        }
    }

    /// A runner where every invocation succeeds with no output.
    pub fn succeeding() -> Self {
        Self::new(|_, _| Ok(ToolOutput::success_with_output("")))
    }

    pub fn invocations(&self) -> Vec<(PathBuf, Vec<OsString>)> {
        self.invocations.lock().unwrap().clone()
    }

    /// The final argument of every invocation, in invocation order.
    pub fn targets(&self) -> Vec<OsString> {
        self.invocations()
            .into_iter()
            .filter_map(|(_, args)| args.last().cloned())
            .collect()
    }
}

impl ToolRunner for RecordingRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> Result<ToolOutput, AppCodesignError> {
        self.invocations
            .lock()
            .unwrap()
            .push((program.to_path_buf(), args.to_vec()));

        (self.responder)(program, args)
    }
}
