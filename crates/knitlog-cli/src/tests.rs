use super::*;

fn config(vars: &[(&str, &str)]) -> knitlog_core::AppConfig {
    let vars: std::collections::HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    knitlog_core::build_app_config(|key| {
        vars.get(key).cloned().ok_or(std::env::VarError::NotPresent)
    })
    .expect("expected valid config")
}

fn import_command(args: &[&str]) -> ImportCommands {
    let argv = ["knitlog-cli", "import"].into_iter().chain(args.iter().copied());
    match Cli::try_parse_from(argv).expect("expected valid cli args").command {
        Some(Commands::Import { command }) => command,
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn no_command_is_none() {
    let cli = Cli::try_parse_from(["knitlog-cli"]).expect("expected valid cli args");
    assert!(cli.command.is_none());
}

#[test]
fn parses_import_pattern_with_defaults() {
    let cli = Cli::try_parse_from(["knitlog-cli", "import", "pattern", "https://p.test/hat"])
        .expect("expected valid cli args");

    match cli.command {
        Some(Commands::Import {
            command: ImportCommands::Pattern(args),
        }) => {
            assert_eq!(args.url, "https://p.test/hat");
            assert!(!args.ai);
            assert!(args.trace_dir.is_none());
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parses_import_yarn_with_ai_and_trace_dir() {
    let cli = Cli::try_parse_from([
        "knitlog-cli",
        "import",
        "yarn",
        "https://y.test/merino",
        "--ai",
        "--trace-dir",
        "/tmp/traces",
    ])
    .expect("expected valid cli args");

    match cli.command {
        Some(Commands::Import {
            command: ImportCommands::Yarn(args),
        }) => {
            assert!(args.ai);
            assert_eq!(
                args.trace_dir.as_deref(),
                Some(std::path::Path::new("/tmp/traces"))
            );
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn import_requires_a_url() {
    assert!(Cli::try_parse_from(["knitlog-cli", "import", "pattern"]).is_err());
}

#[test]
fn parses_token_command() {
    let cli = Cli::try_parse_from(["knitlog-cli", "token", "yarn:", "socks yarn:fabel"])
        .expect("expected valid cli args");
    assert!(matches!(
        cli.command,
        Some(Commands::Token { ref prefix, ref input })
            if prefix == "yarn:" && input == "socks yarn:fabel"
    ));
}

#[test]
fn images_requires_at_least_one_value() {
    assert!(Cli::try_parse_from(["knitlog-cli", "images"]).is_err());
}

#[test]
fn single_image_argument_is_split_like_a_form_field() {
    let input = image_input(vec!["https://a.test/1.jpg, /media/2.jpg".to_owned()]);
    assert_eq!(
        knitlog_import::parse_import_image_urls(Some(&input)),
        vec!["https://a.test/1.jpg", "/media/2.jpg"]
    );
}

#[test]
fn several_image_arguments_are_a_list() {
    let input = image_input(vec!["https://a.test/1.jpg".to_owned(), "ftp://x".to_owned()]);
    assert_eq!(
        knitlog_import::parse_import_image_urls(Some(&input)),
        vec!["https://a.test/1.jpg"]
    );
}

#[test]
fn ai_enabled_in_config_runs_without_the_flag() {
    let cfg = config(&[("KNITLOG_AI_ENABLED", "true"), ("OPENAI_API_KEY", "sk-test")]);
    let (_, request) = import::prepare_import(&cfg, import_command(&["yarn", "https://y.test/merino"]));
    assert!(request.use_ai);
    assert_eq!(request.kind, knitlog_core::ImportKind::Yarn);
}

#[test]
fn ai_stays_off_without_flag_or_key() {
    let cfg = config(&[("KNITLOG_AI_ENABLED", "true")]);
    let (_, request) = import::prepare_import(&cfg, import_command(&["yarn", "https://y.test/merino"]));
    assert!(!request.use_ai);

    let cfg = config(&[("OPENAI_API_KEY", "sk-test")]);
    let (_, request) = import::prepare_import(&cfg, import_command(&["pattern", "https://p.test/hat"]));
    assert!(!request.use_ai);
}

#[test]
fn ai_flag_switches_ai_on_and_trace_dir_overrides_config() {
    let cfg = config(&[("OPENAI_API_KEY", "sk-test")]);
    let (effective, request) = import::prepare_import(
        &cfg,
        import_command(&["pattern", "https://p.test/hat", "--ai", "--trace-dir", "/tmp/t"]),
    );
    assert!(request.use_ai);
    assert!(effective.ai_available());
    assert_eq!(effective.trace_dir, std::path::PathBuf::from("/tmp/t"));
    assert_eq!(request.url, "https://p.test/hat");
}
