//! Datapol CLI
//!
//! Compiles Datalog policies, optionally checking them and reporting their
//! stratification.

mod config;
mod output;

use std::path::PathBuf;
use std::process;

use anyhow::{Context, bail};
use clap::{Arg, ArgAction, ArgMatches, Command};
use datapol_analysis::{Checker, stratification};
use datapol_parser::Compiler;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::output::{Format, render_formulas, render_strata};

fn main() {
    init_tracing();
    let matches = cli().get_matches();

    let result = Options::from_matches(&matches).and_then(|options| run(&options));
    match result {
        Ok(report) => {
            print!("{}", report.stdout);
            for error in &report.errors {
                eprintln!("{error}");
            }
            process::exit(report.code);
        }
        Err(e) => {
            eprintln!("{e:#}");
            process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cli() -> Command {
    Command::new("datapol")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Datalog policy compiler")
        .arg(
            Arg::new("command")
                .short('c')
                .long("command")
                .value_name("STRING")
                .help("Compile a policy given as a string")
                .num_args(1),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("TOML config (default: datapol.toml if present)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("no-modules")
                .long("no-modules")
                .help("Do not split service prefixes off tablenames")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("check")
                .long("check")
                .help("Run semantic checks on every formula")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("strata")
                .long("strata")
                .help("Print the stratification of the compiled rules")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("tree")
                .long("tree")
                .help("Print the raw parse tree of the last policy source")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_name("FORMAT")
                .help("Output format for compiled formulas")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .help("Policy files to compile")
                .num_args(1..)
                .action(ArgAction::Append),
        )
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Formulas,
    Strata,
    Tree,
}

#[derive(Debug, Clone)]
struct Options {
    command: Option<String>,
    files: Vec<PathBuf>,
    config: Option<PathBuf>,
    no_modules: bool,
    check: bool,
    mode: Mode,
    format: Format,
}

impl Options {
    fn from_matches(matches: &ArgMatches) -> anyhow::Result<Self> {
        let command = matches.get_one::<String>("command").cloned();
        let files: Vec<PathBuf> = matches
            .get_many::<String>("file")
            .map(|files| files.map(PathBuf::from).collect())
            .unwrap_or_default();
        if command.is_none() && files.is_empty() {
            bail!("No policy given: use -c STRING or FILE");
        }

        let format_name = matches
            .get_one::<String>("format")
            .map_or("text", String::as_str);
        let Some(format) = Format::from_name(format_name) else {
            bail!("Unknown output format: {format_name}");
        };

        let mode = if matches.get_flag("tree") {
            Mode::Tree
        } else if matches.get_flag("strata") {
            Mode::Strata
        } else {
            Mode::Formulas
        };

        Ok(Self {
            command,
            files,
            config: matches.get_one::<PathBuf>("config").cloned(),
            no_modules: matches.get_flag("no-modules"),
            check: matches.get_flag("check"),
            mode,
            format,
        })
    }
}

/// What to print and how to exit
#[derive(Debug, Default)]
struct Report {
    stdout: String,
    errors: Vec<String>,
    code: i32,
}

impl Report {
    fn failure(errors: Vec<String>) -> Self {
        Self {
            stdout: String::new(),
            errors,
            code: 1,
        }
    }
}

fn run(options: &Options) -> anyhow::Result<Report> {
    let config = Config::load(options.config.as_deref()).context("failed to load configuration")?;
    let theories = config.theories();
    let use_modules = config.compiler.use_modules && !options.no_modules;

    let mut compiler = Compiler::new();
    if let Some(command) = &options.command {
        compiler.read_source(command, "<command>", &theories, use_modules)?;
    }
    for file in &options.files {
        compiler.read_file(file, &theories, use_modules)?;
    }
    info!(formulas = compiler.theory.len(), "compiled policy");

    if options.check {
        let checker = Checker::new(Some(&theories), None)
            .with_permitted_modals(config.compiler.permitted_modals.clone());
        let errors: Vec<String> = compiler
            .theory
            .iter()
            .flat_map(|formula| checker.formula_errors(formula))
            .map(|error| error.to_string())
            .collect();
        if !errors.is_empty() {
            return Ok(Report::failure(errors));
        }
    }

    let stdout = match options.mode {
        Mode::Tree => compiler.print_parse_result(),
        Mode::Strata => match stratification(&compiler.theory) {
            Some(strata) => render_strata(&strata, options.format)?,
            None => {
                return Ok(Report::failure(vec![
                    "Policy is not stratified".to_string(),
                ]));
            }
        },
        Mode::Formulas => render_formulas(&compiler.theory, options.format)?,
    };

    Ok(Report {
        stdout,
        ..Report::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::Path;
    use tempfile::{NamedTempFile, TempDir};

    fn options(command: &str) -> Options {
        Options {
            command: Some(command.to_string()),
            files: Vec::new(),
            config: None,
            no_modules: false,
            check: false,
            mode: Mode::Formulas,
            format: Format::Text,
        }
    }

    fn compile_file(path: &Path) -> anyhow::Result<Report> {
        run(&Options {
            command: None,
            files: vec![path.to_path_buf()],
            ..options("")
        })
    }

    fn parse_args(args: &[&str]) -> anyhow::Result<Options> {
        let matches = cli().try_get_matches_from(args)?;
        Options::from_matches(&matches)
    }

    #[test]
    fn test_run_command() {
        let report = run(&options("p(1) q(x) :- p(x)")).unwrap();
        assert_eq!(report.code, 0);
        assert_eq!(report.stdout, "p(1)\nq(x) :- p(x)\n");
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_run_syntax_error() {
        let result = run(&options("p(x :- q(x)"));
        assert!(result.is_err());
    }

    #[test]
    fn test_run_check_failure() {
        let mut opts = options("p(x) :- q(y)");
        opts.check = true;
        let report = run(&opts).unwrap();
        assert_eq!(report.code, 1);
        assert!(report.stdout.is_empty());
        assert_eq!(report.errors.len(), 1);
    }

    #[test]
    fn test_run_check_success() {
        let mut opts = options("p(x) :- q(x), not r(x)");
        opts.check = true;
        let report = run(&opts).unwrap();
        assert_eq!(report.code, 0);
        assert_eq!(report.stdout, "p(x) :- q(x), not r(x)\n");
    }

    #[test]
    fn test_run_strata() {
        let mut opts = options("p(x) :- q(x), not r(x)  r(x) :- s(x)");
        opts.mode = Mode::Strata;
        let report = run(&opts).unwrap();
        assert_eq!(report.code, 0);
        assert!(report.stdout.contains("p: "));
        assert!(report.stdout.contains("r: "));
    }

    #[test]
    fn test_run_strata_unstratified() {
        let mut opts = options("p(x) :- q(x), not p(x)");
        opts.mode = Mode::Strata;
        let report = run(&opts).unwrap();
        assert_eq!(report.code, 1);
        assert_eq!(report.errors, vec!["Policy is not stratified".to_string()]);
    }

    #[test]
    fn test_run_tree() {
        let mut opts = options("p(1)");
        opts.mode = Mode::Tree;
        let report = run(&opts).unwrap();
        assert_eq!(report.code, 0);
        assert!(!report.stdout.is_empty());
    }

    #[test]
    fn test_run_tree_shows_last_source() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "beta(2)\n").unwrap();
        let mut opts = options("alpha(1)");
        opts.files = vec![file.path().to_path_buf()];
        opts.mode = Mode::Tree;

        let report = run(&opts).unwrap();
        let labels: Vec<&str> = report.stdout.lines().collect();
        assert!(labels.contains(&"beta"));
        assert!(!labels.contains(&"alpha"));
    }

    #[test]
    fn test_run_with_config() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("datapol.toml");
        fs::write(
            &config,
            "[theories.nova.tables]\nservers = [\"id\", \"name\"]\n",
        )
        .unwrap();

        let mut opts = options("p(x) :- nova:servers(name=x)");
        opts.config = Some(config);
        let report = run(&opts).unwrap();
        assert_eq!(report.code, 0);
        assert!(report.stdout.starts_with("p(x) :- nova:servers("));
    }

    #[test]
    fn test_run_file() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "p(1)\np(2)\n").unwrap();
        let report = compile_file(file.path()).unwrap();
        assert_eq!(report.stdout, "p(1)\np(2)\n");
    }

    #[test]
    fn test_run_missing_file() {
        assert!(compile_file(Path::new("nonexistent_policy.dl")).is_err());
    }

    #[test]
    fn test_parse_args() {
        let opts = parse_args(&["datapol", "--check", "--format", "json", "a.dl", "b.dl"]).unwrap();
        assert!(opts.check);
        assert_eq!(opts.format, Format::Json);
        assert_eq!(opts.files, vec![PathBuf::from("a.dl"), PathBuf::from("b.dl")]);
        assert_eq!(opts.mode, Mode::Formulas);

        let opts = parse_args(&["datapol", "-c", "p(1)", "--tree", "--strata"]).unwrap();
        assert_eq!(opts.mode, Mode::Tree);
    }

    #[test]
    fn test_parse_args_requires_input() {
        assert!(parse_args(&["datapol", "--check"]).is_err());
        assert!(parse_args(&["datapol", "-c", "p(1)", "--format", "yaml"]).is_err());
    }
}
