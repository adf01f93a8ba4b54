use std::io::IsTerminal;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use attrguard::format_diagnostics;
use attrguard::format_json;
use attrguard::format_load_error;
use attrguard::format_policy_errors;
use attrguard::init_tracing;
use attrguard::load_instance;
use attrguard::render::InstanceReport;
use attrguard::Format;
use attrguard::LogLevel;
use attrguard::Policy;
use attrguard::PolicyError;
use attrguard_validate::parse_expression;
use attrguard_validate::Context;
use attrguard_validate::Diagnostics;
use attrguard_validate::Resolver;
use clap::Parser;
use clap::Subcommand;

#[derive(Debug, Parser)]
#[command(name = "attrguard", version, about = "Cross-attribute checks for configuration instances")]
struct Cli {
    /// Override the log level from the policy
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate instances against a policy
    Check {
        policy: PathBuf,
        #[arg(required = true)]
        instances: Vec<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
        /// Disable colored output
        #[arg(long)]
        no_color: bool,
    },
    /// Print the locations a path expression resolves to
    Paths {
        policy: PathBuf,
        instance: PathBuf,
        expression: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let policy_path = match &cli.command {
        Command::Check { policy, .. } | Command::Paths { policy, .. } => policy,
    };
    let mut policy = match Policy::from_file(policy_path) {
        Ok(policy) => policy,
        Err(err) => {
            eprint!("{}", format_load_error(&err));
            return ExitCode::from(2);
        }
    };

    if let Some(level) = cli.log_level {
        policy.logging.level = level;
    }
    init_tracing(&policy.logging);
    tracing::debug!("Loaded policy from: {}", policy_path.display());

    match run(cli.command, &policy) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::from(2)
        }
    }
}

fn run(command: Command, policy: &Policy) -> anyhow::Result<ExitCode> {
    match command {
        Command::Check {
            instances,
            format,
            no_color,
            ..
        } => check(policy, &instances, format, !no_color && std::io::stdout().is_terminal()),
        Command::Paths {
            instance,
            expression,
            ..
        } => paths(policy, &instance, &expression),
    }
}

fn check(policy: &Policy, instances: &[PathBuf], format: Format, color: bool) -> anyhow::Result<ExitCode> {
    let mut results: Vec<(String, Diagnostics)> = Vec::with_capacity(instances.len());
    for path in instances {
        let tree = load_instance(&policy.schema, path)?;
        let diagnostics = policy.suite.validate(&Context::new(), &tree);
        tracing::info!(
            "{}: {} diagnostic(s)",
            path.display(),
            diagnostics.len()
        );
        results.push((path.display().to_string(), diagnostics));
    }

    match format {
        Format::Text => {
            for (instance, diagnostics) in &results {
                print!("{}", format_diagnostics(diagnostics, instance, color));
            }
        }
        Format::Json => {
            let reports: Vec<InstanceReport<'_>> = results
                .iter()
                .map(|(instance, diagnostics)| InstanceReport {
                    instance,
                    diagnostics,
                })
                .collect();
            println!("{}", format_json(&reports).context("failed to serialize diagnostics")?);
        }
    }

    let failed = results.iter().any(|(_, diagnostics)| diagnostics.has_errors());
    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn paths(policy: &Policy, instance: &Path, text: &str) -> anyhow::Result<ExitCode> {
    let expression = match parse_expression(text) {
        Ok(expression) => expression,
        Err(errors) => {
            let errors: Vec<PolicyError> = errors
                .into_iter()
                .map(|err| PolicyError {
                    field_path: "expression".to_string(),
                    message: err.message,
                    span: Some(err.span),
                })
                .collect();
            eprint!("{}", format_policy_errors(&errors, text, "<expression>"));
            return Ok(ExitCode::from(2));
        }
    };

    let tree = load_instance(&policy.schema, instance)?;
    let resolution = Resolver::new(&tree)
        .resolve(&expression, None)
        .with_context(|| format!("failed to resolve {}", text))?;

    for location in &resolution.locations {
        if location.is_root() {
            println!("<root>");
        } else {
            println!("{}", location);
        }
    }
    for prefix in &resolution.indeterminate {
        println!("unknown: {}", prefix);
    }
    Ok(ExitCode::SUCCESS)
}
