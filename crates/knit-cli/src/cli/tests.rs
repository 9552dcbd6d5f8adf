#[cfg(test)]
mod tests {
    use crate::cli::validation::{parse_env_pair, parse_global};
    use crate::cli::{Cli, Command, FormatArg, SourcemapArg};
    use clap::{CommandFactory, Parser};
    use std::path::PathBuf;

    fn build_args(args: &[&str]) -> crate::cli::BuildArgs {
        let cli = Cli::try_parse_from(std::iter::once("knit").chain(args.iter().copied()))
            .unwrap();
        match cli.into_command() {
            Command::Build(args) => args,
            other => panic!("expected build, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_global_valid_identifiers() {
        assert_eq!(parse_global("MyLibrary"), Ok("MyLibrary".to_string()));
        assert_eq!(parse_global("_private"), Ok("_private".to_string()));
        assert_eq!(parse_global("$jquery"), Ok("$jquery".to_string()));
        assert_eq!(parse_global("My_Lib$123"), Ok("My_Lib$123".to_string()));
    }

    #[test]
    fn test_parse_global_invalid() {
        assert!(parse_global("123lib").is_err());
        assert!(parse_global("-lib").is_err());
        assert!(parse_global("my-lib").is_err());
        assert!(parse_global("my.lib").is_err());
        assert_eq!(parse_global("").unwrap_err(), "Global name cannot be empty");
    }

    #[test]
    fn test_parse_env_pair() {
        assert_eq!(
            parse_env_pair("API_URL=https://x.dev/?a=b"),
            Ok(("API_URL".to_string(), "https://x.dev/?a=b".to_string()))
        );
        assert_eq!(parse_env_pair("EMPTY="), Ok(("EMPTY".to_string(), String::new())));
        assert!(parse_env_pair("=value").is_err());
        assert!(parse_env_pair("NOVALUE").is_err());
    }

    #[test]
    fn test_bare_invocation_builds() {
        let args = build_args(&["src/index.ts", "src/cli.ts"]);
        assert_eq!(args.files, vec!["src/index.ts", "src/cli.ts"]);
    }

    #[test]
    fn test_build_subcommand() {
        let args = build_args(&["build", "-f", "esm,cjs", "-d", "lib", "--dts"]);
        assert_eq!(args.format, vec![FormatArg::Esm, FormatArg::Cjs]);
        assert_eq!(args.out_dir.as_deref(), Some("lib"));
        assert!(args.dts);
    }

    #[test]
    fn test_format_aliases() {
        let args = build_args(&["--format", "module", "--format", "commonjs"]);
        assert_eq!(args.format, vec![FormatArg::Esm, FormatArg::Cjs]);
    }

    #[test]
    fn test_sourcemap_modes() {
        assert_eq!(build_args(&["--sourcemap"]).sourcemap, Some(SourcemapArg::File));
        assert_eq!(
            build_args(&["--sourcemap", "inline"]).sourcemap,
            Some(SourcemapArg::Inline)
        );
        assert_eq!(build_args(&[]).sourcemap, None);
    }

    #[test]
    fn test_watch_flag() {
        assert_eq!(build_args(&["--watch"]).watch, Some(vec![]));
        assert_eq!(
            build_args(&["-w", "src"]).watch,
            Some(vec!["src".to_string()])
        );
        assert_eq!(build_args(&[]).watch, None);
    }

    #[test]
    fn test_workspace_flag() {
        assert_eq!(build_args(&["-W"]).workspace, Some(String::new()));
        assert_eq!(
            build_args(&["--workspace", "packages/*"]).workspace,
            Some("packages/*".to_string())
        );
        assert_eq!(
            build_args(&["-W", "-F", "core", "-F", "/^util/"]).filter,
            vec!["core", "/^util/"]
        );
    }

    #[test]
    fn test_env_flag() {
        let args = build_args(&["--env", "A=1", "--env", "B=two"]);
        assert_eq!(
            args.env,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "two".to_string())
            ]
        );
    }

    #[test]
    fn test_config_conflicts_with_no_config() {
        assert!(Cli::try_parse_from(["knit", "-c", "knit.config.ts", "--no-config"]).is_err());
        let args = build_args(&["--config", "configs/knit.config.ts"]);
        assert_eq!(args.config, Some(PathBuf::from("configs/knit.config.ts")));
    }

    #[test]
    fn test_invalid_global_name_is_rejected() {
        assert!(Cli::try_parse_from(["knit", "--global-name", "my-lib"]).is_err());
    }

    #[test]
    fn test_migrate_subcommand() {
        let cli = Cli::try_parse_from(["knit", "migrate", "--dry-run", "--cwd", "app"]).unwrap();
        match cli.into_command() {
            Command::Migrate(args) => {
                assert!(args.dry_run);
                assert!(!args.yes);
                assert_eq!(args.cwd, Some(PathBuf::from("app")));
            }
            other => panic!("expected migrate, got {other:?}"),
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["knit", "migrate", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert!(Cli::try_parse_from(["knit", "-v", "-q"]).is_err());
    }
}
