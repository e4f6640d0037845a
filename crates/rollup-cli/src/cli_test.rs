use super::*;
use clap::CommandFactory;

#[test]
fn verify_cli_args() {
    // Validates the entire command tree: short flag conflicts,
    // duplicate args, and other clap definition errors.
    Cli::command().debug_assert();
}

#[test]
fn test_parse_aggregate_with_repeated_estimates() {
    let cli = Cli::try_parse_from([
        "rollup",
        "aggregate",
        "records.json",
        "-e",
        "est-1",
        "--estimate",
        "est-2",
        "--output",
        "json",
        "--commit",
    ])
    .unwrap();

    match cli.command {
        Commands::Aggregate(args) => {
            assert_eq!(args.snapshot, PathBuf::from("records.json"));
            assert_eq!(args.estimates, vec!["est-1", "est-2"]);
            assert_eq!(args.output, OutputFormat::Json);
            assert!(args.commit);
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "rollup",
        "preview",
        "records.json",
        "--root",
        "li-wall",
        "--verbose",
        "--config",
        "rollup.yml",
    ])
    .unwrap();

    assert!(cli.global.verbose);
    assert_eq!(cli.global.config, Some(PathBuf::from("rollup.yml")));
}

#[test]
fn test_preview_requires_root() {
    assert!(Cli::try_parse_from(["rollup", "preview", "records.json"]).is_err());
}
