mod commands;
mod context;
mod examples;
mod output;
mod theme;
mod utils;

use anyhow::Result;
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Style};
use clap::{ColorChoice, Command, CommandFactory, FromArgMatches, Parser, Subcommand};
use colored::{Color as ThemeColor, Colorize, control::ShouldColorize};
use schemaplan::{BaselineError, PlanError};
use std::fmt::Write;
use std::path::PathBuf;

use commands::{
    baseline::{BaselineCommands, handle_baseline_commands},
    hash::{HashArgs, handle_hash},
    plan::{PlanArgs, handle_plan},
    snapshot::{SnapshotArgs, handle_snapshot},
};
use context::ProjectContext;
use examples::{ExampleGroup, command_examples};
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{ICONS, THEME};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("SCHEMAPLAN_CONFIG", "Path to a config file (overrides .schemaplan/config.toml discovery)"),
    ("RUST_LOG", "Log filter for planner diagnostics (e.g. schemaplan=debug)"),
    ("NO_COLOR", "Disable colored output when set"),
];

/// Exit code when the plan is blocked by policy or the command failed.
const EXIT_BLOCKED: i32 = 1;
/// Exit code for malformed or unsupported input.
const EXIT_MALFORMED: i32 = 2;

#[derive(Parser)]
#[command(name = "schemaplan")]
#[command(version)]
#[command(
    about = "Schema migration safety planner",
    long_about = r#"Schema migration safety planner that provides:

• Deterministic, content-addressed schema snapshots
• Ordered structural diffs between two schema versions
• Risk classification for every step (NONE .. DESTRUCTIVE)
• Automatic view shims and backfills next to risky steps

Commands:
  plan      Compute a risk-annotated migration plan
  hash      Print the canonical hash of a schema
  snapshot  Freeze a schema into a snapshot document
  baseline  Track the last applied schema hash
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Output format
    #[arg(long, value_enum, default_value = "json", global = true)]
    output: OutputFormat,

    /// Suppress messages (payloads are still printed)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Enable verbose output
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Config file to use instead of discovering .schemaplan/config.toml
    #[arg(long, env = "SCHEMAPLAN_CONFIG", global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn parse_with_styles() -> Self {
        let matches = build_cli_command().get_matches();
        Cli::from_arg_matches(&matches).unwrap_or_else(|err| err.exit())
    }
}

fn build_cli_command() -> Command {
    let use_color = ShouldColorize::from_env().should_colorize();
    let mut command = Cli::command()
        .styles(help_styles())
        .color(if use_color { ColorChoice::Auto } else { ColorChoice::Never })
        .after_long_help(render_environment());

    for example in command_examples() {
        let help_text = render_examples(example.groups, use_color);
        command = command.mut_subcommand(example.name, |sub| sub.after_long_help(help_text));
    }
    command
}

fn render_examples(groups: &[ExampleGroup], use_color: bool) -> String {
    let mut buffer = String::new();
    let _ = writeln!(buffer, "{}", stylize("Examples:", THEME.highlight, true, use_color));

    for (index, group) in groups.iter().enumerate() {
        let _ = writeln!(buffer, "  {}", stylize(group.title, THEME.primary, true, use_color));
        for command in group.commands {
            let arrow = stylize(ICONS.arrow, THEME.secondary, false, use_color);
            let command = stylize(command, THEME.secondary, false, use_color);
            let _ = writeln!(buffer, "    {arrow} {command}");
        }
        if index + 1 < groups.len() {
            buffer.push('\n');
        }
    }
    buffer
}

fn render_environment() -> String {
    let mut buffer = String::from("Environment Variables:\n");
    for (key, description) in ENVIRONMENT_VARIABLES {
        let _ = writeln!(buffer, "  {key:<18} {description}");
    }
    buffer
}

fn stylize(text: &str, color: ThemeColor, bold: bool, use_color: bool) -> String {
    match (use_color, bold) {
        (false, _) => text.to_string(),
        (true, false) => text.color(color).to_string(),
        (true, true) => text.color(color).bold().to_string(),
    }
}

fn help_styles() -> Styles {
    Styles::styled()
        .usage(Style::new().fg_color(Some(AnsiColor::BrightBlue.into())).bold())
        .header(Style::new().fg_color(Some(AnsiColor::Cyan.into())).bold())
        .literal(Style::new().fg_color(Some(AnsiColor::Magenta.into())))
        .placeholder(Style::new().fg_color(Some(AnsiColor::BrightBlack.into())))
        .error(Style::new().fg_color(Some(AnsiColor::Red.into())).bold())
}

#[derive(Subcommand)]
enum Commands {
    /// Compute a risk-annotated migration plan between two schemas
    Plan(PlanArgs),

    /// Print the canonical snapshot hash of a schema
    Hash(HashArgs),

    /// Freeze a schema into a snapshot document
    Snapshot(SnapshotArgs),

    /// Inspect or advance the last-applied schema baseline
    #[command(subcommand)]
    Baseline(BaselineCommands),
}

fn main() {
    let cli = Cli::parse_with_styles();
    init_logging(cli.verbose);

    if cli.no_color {
        colored::control::set_override(false);
    }

    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output.clone(),
        quiet: cli.quiet,
        verbose: cli.verbose,
        no_color: cli.no_color,
    });

    if let Err(err) = execute(cli, &output) {
        output.error(&format!("{err:#}"));
        std::process::exit(exit_code(&err));
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "schemaplan=debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn execute(cli: Cli, output: &OutputManager) -> Result<()> {
    let ctx = ProjectContext::load(cli.config.as_deref())?;
    if let Some(path) = &ctx.config_path {
        output.verbose(&format!("config: {}", path.display()));
    }

    match cli.command {
        Commands::Plan(args) => handle_plan(args, &ctx, output)?,
        Commands::Hash(args) => handle_hash(args, output)?,
        Commands::Snapshot(args) => handle_snapshot(args, output)?,
        Commands::Baseline(baseline_cmd) => handle_baseline_commands(baseline_cmd, &ctx, output)?,
    }

    Ok(())
}

/// Map a failure to the process exit code scripts rely on.
fn exit_code(err: &anyhow::Error) -> i32 {
    if let Some(plan_err) = err.downcast_ref::<PlanError>() {
        return if plan_err.is_input_error() {
            EXIT_MALFORMED
        } else {
            EXIT_BLOCKED
        };
    }
    if err.downcast_ref::<toml::de::Error>().is_some() {
        return EXIT_MALFORMED;
    }
    if let Some(BaselineError::Json(_)) = err.downcast_ref::<BaselineError>() {
        return EXIT_MALFORMED;
    }
    EXIT_BLOCKED
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_malformed_input_exits_two() {
        let err = anyhow::Error::new(PlanError::malformed("User", "duplicate model name"))
            .context("Failed to load schema ref: a.json");
        assert_eq!(exit_code(&err), EXIT_MALFORMED);

        let err = anyhow::Error::new(PlanError::unsupported("User.age", "type change"));
        assert_eq!(exit_code(&err), EXIT_MALFORMED);
    }

    #[test]
    fn test_strict_block_exits_one() {
        let err = anyhow::Error::new(PlanError::DestructiveWithoutOverride {
            targets: vec!["User.ssn".to_string()],
        });
        assert_eq!(exit_code(&err), EXIT_BLOCKED);
    }

    #[test]
    fn test_baseline_conflict_exits_one() {
        let result: Result<()> = Err(BaselineError::Conflict {
            expected: None,
            actual: Some("sha256:a".to_string()),
        })
        .context("Failed to update baseline");
        assert_eq!(exit_code(&result.unwrap_err()), EXIT_BLOCKED);
    }

    #[test]
    fn test_output_write_failure_exits_one() {
        let err = anyhow::Error::new(PlanError::Write {
            path: "/readonly/v1.json".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        })
        .context("Failed to write snapshot: /readonly/v1.json");
        assert_eq!(exit_code(&err), EXIT_BLOCKED);

        let err = anyhow::Error::new(PlanError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        )));
        assert_eq!(exit_code(&err), EXIT_MALFORMED);
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_every_subcommand_has_examples() {
        let command = build_cli_command();
        for example in command_examples() {
            let sub = command.find_subcommand(example.name).unwrap();
            assert!(sub.get_after_long_help().is_some(), "{}", example.name);
        }
        assert!(command.get_after_long_help().is_some());
    }

    #[test]
    fn test_plan_command_parses() {
        let cli = Cli::try_parse_from([
            "schemaplan",
            "plan",
            "--from",
            "a.json",
            "--to",
            "b.json",
            "--strict",
            "--known-empty",
            "User.legacy",
            "--mitigations",
            "before",
        ])
        .unwrap();
        match cli.command {
            Commands::Plan(args) => {
                assert!(args.strict);
                assert_eq!(args.known_empty, vec!["User.legacy".to_string()]);
                assert_eq!(args.mitigations, Some(schemaplan::MitigationPlacement::Before));
            }
            _ => panic!("expected plan command"),
        }
    }
}
