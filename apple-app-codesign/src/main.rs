// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    apple_app_codesign::{
        config::{
            parse_jobs, validate_identity, ConfigOverrides, DEFAULT_CERTTOOL_PROGRAM,
            DEFAULT_CODESIGN_PROGRAM,
        },
        is_identity_available, print_gatekeeper_warning, AppCodesignError, AppSigner,
        CodesignConfig, DuctRunner, SignOutcome,
    },
    clap::{Arg, ArgMatches, Command},
    log::LevelFilter,
    std::path::{Path, PathBuf},
};

const SIGN_ABOUT: &str = "\
Sign a macOS application bundle.

This runs Apple's `codesign` tool over the bundle. Every entry in
`Contents/Frameworks/` is signed, followed by every entry in
`Contents/MacOS/`, followed by the bundle itself. The signature on the
bundle is then verified.

Entries within a directory are signed concurrently. Use --jobs to limit
how many `codesign` processes run at once.

Settings can be read from a YAML file via --config. Values given on the
command line take precedence over values from the file.
";

const CHECK_IDENTITY_ABOUT: &str = "\
Check whether a signing identity is available.

This runs `certtool y` and looks for the identity name in its output. The
process exits 0 if the identity is found and 1 otherwise. Failure to run
`certtool` is reported as the identity not being available.
";

fn config_from_args(args: &ArgMatches) -> Result<CodesignConfig, AppCodesignError> {
    let base = if let Some(path) = args.value_of("config") {
        Some(CodesignConfig::from_yaml_file(path)?)
    } else {
        None
    };

    let overrides = ConfigOverrides {
        app_path: args.value_of("app_path").map(PathBuf::from),
        identity: args.value_of("identity").map(|x| x.to_string()),
        jobs: args.value_of("jobs").map(parse_jobs).transpose()?,
        codesign_path: args.value_of("codesign_path").map(PathBuf::from),
        certtool_path: args.value_of("certtool_path").map(PathBuf::from),
    };

    CodesignConfig::resolve(base, overrides)
}

fn command_check_identity(args: &ArgMatches) -> Result<(), AppCodesignError> {
    let identity = args
        .value_of("identity")
        .ok_or(AppCodesignError::CliBadArgument)?;
    let certtool = args
        .value_of("certtool_path")
        .ok_or(AppCodesignError::CliBadArgument)?;
    validate_identity(identity)?;

    if is_identity_available(&DuctRunner, Path::new(certtool), identity) {
        println!("signing identity `{}` is available", identity);
        Ok(())
    } else {
        println!("signing identity `{}` is not available", identity);
        std::process::exit(1);
    }
}

fn command_print_gatekeeper_warning(_args: &ArgMatches) -> Result<(), AppCodesignError> {
    print_gatekeeper_warning();

    Ok(())
}

fn command_sign(args: &ArgMatches) -> Result<(), AppCodesignError> {
    let config = config_from_args(args)?;
    let signer = AppSigner::with_system_tools(config);

    let signed = if args.is_present("warn_if_unavailable") {
        match signer.sign_if_identity_available()? {
            SignOutcome::Signed(paths) => paths,
            SignOutcome::IdentityUnavailable => {
                print_gatekeeper_warning();
                return Ok(());
            }
        }
    } else {
        signer.sign()?
    };

    println!(
        "signed {} paths in {}",
        signed.len(),
        signer.config().app_path.display()
    );

    Ok(())
}

fn command_verify(args: &ArgMatches) -> Result<(), AppCodesignError> {
    let path = args
        .value_of("app_path")
        .ok_or(AppCodesignError::CliBadArgument)?;
    let codesign = args
        .value_of("codesign_path")
        .ok_or(AppCodesignError::CliBadArgument)?;

    // Verification doesn't need an identity.
    let config = CodesignConfig::new(path, "").codesign_path(codesign);
    AppSigner::with_system_tools(config).verify()?;

    println!("{} has a valid signature", path);

    Ok(())
}

fn build_app() -> Command<'static> {
    let app = Command::new("Application Bundle Code Signing Tool")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Gregory Szorc <gregory.szorc@gmail.com>")
        .about("Sign macOS application bundles using Apple's codesign tool")
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .multiple_occurrences(true)
                .help("Increase logging verbosity. Can be specified multiple times."),
        );

    let app = app.subcommand(
        Command::new("check-identity")
            .about("Check whether a signing identity is available")
            .long_about(CHECK_IDENTITY_ABOUT)
            .arg(
                Arg::new("certtool_path")
                    .long("certtool-path")
                    .takes_value(true)
                    .default_value(DEFAULT_CERTTOOL_PROGRAM)
                    .help("Program to run to list certificates"),
            )
            .arg(
                Arg::new("identity")
                    .required(true)
                    .help("Name of the signing identity to look for"),
            ),
    );

    let app = app.subcommand(
        Command::new("print-gatekeeper-warning")
            .about("Print a warning about Gatekeeper and unsigned applications"),
    );

    let app = app.subcommand(
        Command::new("sign")
            .about("Sign an application bundle")
            .long_about(SIGN_ABOUT)
            .arg(
                Arg::new("config")
                    .long("config")
                    .short('c')
                    .takes_value(true)
                    .help("Path to a YAML file with signing settings"),
            )
            .arg(
                Arg::new("identity")
                    .long("identity")
                    .short('s')
                    .takes_value(true)
                    .help("Name of the signing identity to sign with"),
            )
            .arg(
                Arg::new("jobs")
                    .long("jobs")
                    .short('j')
                    .takes_value(true)
                    .help("Maximum number of concurrent codesign processes"),
            )
            .arg(
                Arg::new("codesign_path")
                    .long("codesign-path")
                    .takes_value(true)
                    .help("Program to run to sign and verify"),
            )
            .arg(
                Arg::new("certtool_path")
                    .long("certtool-path")
                    .takes_value(true)
                    .help("Program to run to list certificates"),
            )
            .arg(
                Arg::new("warn_if_unavailable")
                    .long("warn-if-unavailable")
                    .help("Print a warning and skip signing if the identity is not available"),
            )
            .arg(Arg::new("app_path").help("Path to the .app bundle to sign")),
    );

    let app = app.subcommand(
        Command::new("verify")
            .about("Verify the signature of an application bundle")
            .arg(
                Arg::new("codesign_path")
                    .long("codesign-path")
                    .takes_value(true)
                    .default_value(DEFAULT_CODESIGN_PROGRAM)
                    .help("Program to run to verify"),
            )
            .arg(
                Arg::new("app_path")
                    .required(true)
                    .help("Path to the .app bundle to verify"),
            ),
    );

    app
}

fn main_impl() -> Result<(), AppCodesignError> {
    let matches = build_app().get_matches();

    let log_level = match matches.occurrences_of("verbose") {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(log_level.as_str()),
    );

    // Disable log context except at higher log levels.
    if log_level <= LevelFilter::Info {
        builder
            .format_timestamp(None)
            .format_level(false)
            .format_target(false);
    }

    builder.init();

    match matches.subcommand() {
        Some(("check-identity", args)) => command_check_identity(args),
        Some(("print-gatekeeper-warning", args)) => command_print_gatekeeper_warning(args),
        Some(("sign", args)) => command_sign(args),
        Some(("verify", args)) => command_verify(args),
        _ => Err(AppCodesignError::CliGeneralError("unknown command".into())),
    }
}

fn main() {
    let exit_code = match main_impl() {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("Error: {}", err);
            1
        }
    };

    std::process::exit(exit_code)
}

#[cfg(test)]
mod tests {
    use {super::*, anyhow::Result};

    fn sign_config(argv: &[&str]) -> Result<CodesignConfig, AppCodesignError> {
        let matches = build_app()
            .try_get_matches_from(argv)
            .expect("arguments should parse");
        let (name, args) = matches.subcommand().expect("subcommand should be present");
        assert_eq!(name, "sign");

        config_from_args(args)
    }

    #[test]
    fn sign_arguments() -> Result<()> {
        let config = sign_config(&[
            "app-codesign",
            "sign",
            "--identity",
            "Example",
            "--jobs",
            "3",
            "--codesign-path",
            "/opt/codesign",
            "MyApp.app",
        ])?;

        assert_eq!(
            config,
            CodesignConfig::new("MyApp.app", "Example")
                .jobs(3)
                .codesign_path("/opt/codesign")
        );

        Ok(())
    }

    #[test]
    fn sign_arguments_override_config_file() -> Result<()> {
        let td = tempfile::Builder::new()
            .prefix("apple-app-codesign-")
            .tempdir()?;
        let config_path = td.path().join("codesign.yaml");
        std::fs::write(
            &config_path,
            "app_path: File.app\n\
             identity: File Identity\n\
             jobs: 8\n\
             certtool_path: /file/certtool\n",
        )?;
        let config_arg = config_path.display().to_string();

        let config = sign_config(&[
            "app-codesign",
            "sign",
            "--config",
            &config_arg,
            "--identity",
            "Arg Identity",
            "--jobs",
            "2",
        ])?;

        assert_eq!(
            config,
            CodesignConfig::new(td.path().join("File.app"), "Arg Identity")
                .jobs(2)
                .certtool_path("/file/certtool")
        );

        let config = sign_config(&["app-codesign", "sign", "-c", &config_arg, "Other.app"])?;
        assert_eq!(config.app_path, PathBuf::from("Other.app"));
        assert_eq!(config.identity, "File Identity");
        assert_eq!(config.jobs, Some(8));

        Ok(())
    }

    #[test]
    fn sign_rejects_bad_jobs() {
        for jobs in ["0", "1.5", "lots"] {
            let res = sign_config(&[
                "app-codesign",
                "sign",
                "--identity",
                "Example",
                "--jobs",
                jobs,
                "MyApp.app",
            ]);
            assert!(matches!(res, Err(AppCodesignError::ConfigInvalid(_))));
        }
    }

    #[test]
    fn sign_rejects_empty_identity() {
        let res = sign_config(&[
            "app-codesign",
            "sign",
            "--identity",
            "",
            "--warn-if-unavailable",
            "MyApp.app",
        ]);
        assert!(matches!(res, Err(AppCodesignError::ConfigInvalid(_))));

        let res = sign_config(&["app-codesign", "sign", "MyApp.app"]);
        assert!(matches!(res, Err(AppCodesignError::ConfigInvalid(_))));
    }

    #[test]
    fn check_identity_rejects_empty_name() {
        let matches = build_app()
            .try_get_matches_from([
                "app-codesign",
                "check-identity",
                "--certtool-path",
                "/bin/echo",
                "",
            ])
            .expect("arguments should parse");
        let (_, args) = matches.subcommand().expect("subcommand should be present");

        assert!(matches!(
            command_check_identity(args),
            Err(AppCodesignError::ConfigInvalid(_))
        ));
    }
}
