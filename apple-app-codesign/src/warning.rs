// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! User facing warnings about running unsigned applications.

use console::{style, Term};

/// Apple support article describing Gatekeeper settings.
pub const GATEKEEPER_SUPPORT_URL: &str = "https://support.apple.com/en-us/HT202491";

const WARNING_HEADLINE: &str = "User confusion ahead!";

/// The body of the Gatekeeper warning, one entry per line.
pub fn gatekeeper_warning_lines() -> Vec<String> {
    vec![
        "The default preferences for OSX Gatekeeper will not allow users to run unsigned applications.".to_string(),
        "However, we're going to continue building the app and an installer because you're most likely".to_string(),
        "a developer trying to test the app's installation process.".to_string(),
        "For more information on OSX Gatekeeper and how to change your system preferences to run unsigned applications,".to_string(),
        format!("please see {}", GATEKEEPER_SUPPORT_URL),
    ]
}

/// Write the Gatekeeper warning to a terminal.
pub fn write_gatekeeper_warning(term: &Term) -> std::io::Result<()> {
    term.write_line(&format!(
        "{}  {}",
        style("⚠").yellow().bold(),
        WARNING_HEADLINE
    ))?;

    for line in gatekeeper_warning_lines() {
        term.write_line(&format!("  {}", style(line).dim()))?;
    }

    Ok(())
}

/// Print a warning to stderr explaining that unsigned applications will be
/// blocked by Gatekeeper.
pub fn print_gatekeeper_warning() {
    // Nothing useful can be done if stderr is gone.
    let _ = write_gatekeeper_warning(&Term::stderr());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warning_mentions_support_article() {
        let lines = gatekeeper_warning_lines();

        assert_eq!(lines.len(), 5);
        assert!(lines[0].contains("Gatekeeper"));
        assert!(lines
            .last()
            .unwrap()
            .ends_with("https://support.apple.com/en-us/HT202491"));
    }
}
