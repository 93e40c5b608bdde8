// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Running external tools.

All process invocation goes through the [ToolRunner] trait so callers can
substitute how programs are executed.
*/

use {
    crate::error::AppCodesignError,
    log::{debug, info},
    std::{
        io::{BufRead, BufReader},
        ffi::OsString,
        path::Path,
    },
};

/// The result of running an external program to completion.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ToolOutput {
    /// Process exit code. `None` if terminated by a signal.
    pub code: Option<i32>,

    /// Combined stdout and stderr.
    pub output: String,
}

impl ToolOutput {
    /// Construct an instance describing a successful run.
    pub fn success_with_output(output: impl ToString) -> Self {
        Self {
            code: Some(0),
            output: output.to_string(),
        }
    }

    /// Construct an instance describing a run that exited with the given code.
    pub fn failure(code: i32, output: impl ToString) -> Self {
        Self {
            code: Some(code),
            output: output.to_string(),
        }
    }

    /// Whether the process exited with code 0.
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Something that can run external programs.
///
/// Implementations must be shareable across threads, as signing invokes the
/// runner concurrently.
pub trait ToolRunner: Send + Sync {
    /// Run a program with arguments and wait for it to exit.
    ///
    /// A non-zero exit is not an error: it is reported through [ToolOutput].
    /// `Err` is reserved for failures to launch or communicate with the process.
    fn run(&self, program: &Path, args: &[OsString]) -> Result<ToolOutput, AppCodesignError>;
}

/// A [ToolRunner] that spawns real processes via `duct`.
///
/// Process output is forwarded to the `info` log level as it is produced.
#[derive(Clone, Copy, Debug, Default)]
pub struct DuctRunner;

impl ToolRunner for DuctRunner {
    fn run(&self, program: &Path, args: &[OsString]) -> Result<ToolOutput, AppCodesignError> {
        let label = program
            .file_name()
            .map(|x| x.to_string_lossy().to_string())
            .unwrap_or_else(|| program.display().to_string());

        debug!(
            "running {} {}",
            program.display(),
            args.iter()
                .map(|x| x.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );

        // Bare program names are resolved via PATH. duct only does that for
        // string-like values.
        let command = duct::cmd(program.as_os_str(), args)
            .stderr_to_stdout()
            .unchecked()
            .reader()
            .map_err(|source| AppCodesignError::ToolLaunch {
                program: program.display().to_string(),
                source,
            })?;

        let mut output = String::new();
        {
            let reader = BufReader::new(&command);
            for line in reader.split(b'\n') {
                let line = line?;
                let line = String::from_utf8_lossy(&line);
                let line = line.trim_end_matches('\r');

                info!("{}> {}", label, line);
                output.push_str(line);
                output.push('\n');
            }
        }

        let status = command
            .try_wait()?
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("unable to wait on {}", label),
                )
            })?
            .status;

        debug!("{} exited with {}", label, status);

        Ok(ToolOutput {
            code: status.code(),
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_success() {
        assert!(ToolOutput::success_with_output("").success());
        assert!(!ToolOutput::failure(1, "").success());
        assert!(!ToolOutput::default().success());
    }

    #[test]
    fn duct_missing_program() {
        let res = DuctRunner.run(Path::new("/nonexistent/apple-app-codesign-tool"), &[]);

        assert!(matches!(res, Err(AppCodesignError::ToolLaunch { .. })));
    }

    #[cfg(unix)]
    #[test]
    fn duct_captures_output_and_code() -> anyhow::Result<()> {
        let res = DuctRunner.run(
            Path::new("sh"),
            &[
                OsString::from("-c"),
                OsString::from("echo hello; echo oops >&2; exit 3"),
            ],
        )?;

        assert_eq!(res.code, Some(3));
        assert!(res.output.contains("hello\n"));
        assert!(res.output.contains("oops\n"));

        Ok(())
    }
}
