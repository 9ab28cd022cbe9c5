mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;

use constitution_chain::{
    CancellationToken, ChainValues, ClaudeCompleter, CommandCompleter, Completer,
    CompleterConfig, LlmChain, PromptTemplate,
};
use constitution_core::{CritiqueRevisionLoop, LoopResult};
use constitution_critic::ConstitutionalPrinciple;
use constitution_logging::{init_tracing, truncate, LogFormat, Logger};

use config::ProjectConfig;

const EXIT_FAILURE: i32 = 2;
const EXIT_INTERRUPTED: i32 = 130;

#[derive(Parser, Debug)]
#[command(
    name = "constitution",
    about = "Critique and revise model output against a list of principles",
    version,
    author
)]
struct Cli {
    /// Text bound to the `input` template variable
    #[arg(short, long, conflicts_with = "input_file")]
    input: Option<String>,

    /// Read the `input` variable from a file, verbatim like --input
    #[arg(long)]
    input_file: Option<PathBuf>,

    /// Extra template variable, as key=value (repeatable)
    #[arg(long = "var", value_name = "KEY=VALUE")]
    vars: Vec<String>,

    /// Primary prompt template (default: "{{input}}")
    #[arg(short, long)]
    template: Option<String>,

    /// Principle to apply, by name (repeatable, applied in order)
    #[arg(short, long = "principle", value_name = "NAME")]
    principles: Vec<String>,

    /// Backend used for primary, critique and revision calls
    #[arg(short, long, value_enum)]
    agent: Option<AgentChoice>,

    /// Binary for the `command` backend; the prompt is passed as its last argument
    #[arg(long)]
    command: Option<String>,

    /// Fixed argument for the `command` backend (repeatable)
    #[arg(long = "command-arg", value_name = "ARG", allow_hyphen_values = true)]
    command_args: Vec<String>,

    /// Model to use (if the backend supports it)
    #[arg(short, long)]
    model: Option<String>,

    /// Per-call timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Report the initial output and every critique/revision pair
    #[arg(long)]
    intermediate_steps: bool,

    /// Working directory (default: current directory)
    #[arg(short = 'd', long)]
    working_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Tracing filter (overridden by RUST_LOG)
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// Also append JSON log events to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Output final result as JSON
    #[arg(long)]
    json_output: bool,

    /// Dry run: show what would happen without executing
    #[arg(long)]
    dry_run: bool,

    /// List available principles and exit
    #[arg(long)]
    list_principles: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AgentChoice {
    Claude,
    Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

const DEFAULT_TEMPLATE: &str = "{{input}}";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> Result<i32> {
    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let config = ProjectConfig::load(&working_dir)?.unwrap_or_default();

    if cli.list_principles {
        print_principles(&config);
        return Ok(0);
    }

    let log_format: LogFormat = cli.log_format.into();
    init_tracing(&cli.log_level, log_format);
    let logger = match cli.log_file {
        Some(ref path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    };

    // CLI flags win over constitution.toml
    let template_text = cli
        .template
        .clone()
        .or_else(|| config.template.clone())
        .unwrap_or_else(|| DEFAULT_TEMPLATE.to_string());
    let template = PromptTemplate::from_template(template_text.as_str())
        .context("Invalid primary prompt template")?;
    let inputs = collect_inputs(&cli, &working_dir, &template)?;
    let principles = config.resolve_principles(&cli.principles)?;
    let prompts = config.load_prompts(&working_dir)?;
    let intermediate_steps = cli.intermediate_steps || config.intermediate_steps.unwrap_or(false);
    let timeout = Duration::from_secs(
        cli.timeout_secs
            .or(config.timeout_secs)
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
    );
    let agent = resolve_agent(&cli, &config)?;

    let mut completer_config = CompleterConfig::new(working_dir.clone()).with_timeout(timeout);
    if let Some(model) = cli.model.clone().or_else(|| config.model.clone()) {
        completer_config = completer_config.with_model(model);
    }

    let completer: Arc<dyn Completer> = match agent {
        AgentChoice::Claude => Arc::new(ClaudeCompleter::new(completer_config)),
        AgentChoice::Command => {
            let binary = cli
                .command
                .clone()
                .or_else(|| config.command.clone())
                .context("The command backend needs --command or `command` in constitution.toml")?;
            let args = if cli.command_args.is_empty() {
                config.command_args.clone()
            } else {
                cli.command_args.clone()
            };
            Arc::new(CommandCompleter::new(
                PathBuf::from(binary),
                args,
                completer_config,
            ))
        }
    };

    if cli.dry_run {
        println!("=== Dry Run ===");
        println!("Working dir: {}", working_dir.display());
        println!("Backend: {}", completer.name());
        println!("Template: {}", truncate(&template_text, 100));
        match template.format(&inputs) {
            Ok(prompt) => println!("Prompt: {}", truncate(&prompt, 100)),
            Err(e) => println!("Prompt: <{}>", e),
        }
        if principles.is_empty() {
            println!("Principles: none (primary output is returned unchanged)");
        } else {
            let names: Vec<&str> = principles.iter().map(|p| p.name.as_str()).collect();
            println!("Principles: {}", names.join(", "));
        }
        println!("Timeout: {}s per call", timeout.as_secs());
        println!("Intermediate steps: {}", intermediate_steps);
        return Ok(0);
    }

    if !completer.is_available().await {
        anyhow::bail!(
            "Backend '{}' is not available. Make sure it's installed and in PATH.",
            completer.name()
        );
    }

    let primary = LlmChain::new(completer.clone(), template);
    let runner = CritiqueRevisionLoop::from_llm(completer, primary, principles, &prompts)
        .context("Failed to build critique/revision chains")?
        .with_return_intermediate_steps(intermediate_steps)
        .with_logger(Arc::new(logger));

    // Handle Ctrl+C by cancelling in-flight model calls
    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Cancelling...");
        handler_token.cancel();
    })
    .context("Failed to set Ctrl+C handler")?;

    match runner.run(&cancel, inputs).await {
        Ok(result) => {
            if cli.json_output {
                let json = serde_json::to_string_pretty(&result)?;
                println!("{}", json);
            } else {
                print_result(&result);
            }
            Ok(0)
        }
        Err(e) if e.is_cancelled() => {
            eprintln!("{}", "=== INTERRUPTED ===".yellow().bold());
            Ok(EXIT_INTERRUPTED)
        }
        Err(e) => Err(e.into()),
    }
}

fn resolve_agent(cli: &Cli, config: &ProjectConfig) -> Result<AgentChoice> {
    if let Some(agent) = cli.agent {
        return Ok(agent);
    }
    match config.agent.as_deref() {
        Some(name) => AgentChoice::from_str(name, true)
            .map_err(|_| anyhow::anyhow!("Unknown agent '{}' in constitution.toml", name)),
        None => Ok(AgentChoice::Claude),
    }
}

/// Build the primary chain's input values from `--input`/`--input-file`
/// and `--var` pairs.
fn collect_inputs(cli: &Cli, working_dir: &Path, template: &PromptTemplate) -> Result<ChainValues> {
    let mut inputs = ChainValues::new();

    if let Some(ref input) = cli.input {
        inputs.insert("input".to_string(), input.clone().into());
    } else if let Some(ref path) = cli.input_file {
        let full_path = if path.is_absolute() {
            path.clone()
        } else {
            working_dir.join(path)
        };
        let content = std::fs::read_to_string(&full_path)
            .with_context(|| format!("Failed to read input file {}", full_path.display()))?;
        inputs.insert("input".to_string(), content.into());
    }

    for pair in &cli.vars {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("Invalid --var '{}', expected KEY=VALUE", pair))?;
        inputs.insert(key.trim().to_string(), value.to_string().into());
    }

    let missing: Vec<&str> = template
        .input_variables()
        .iter()
        .filter(|name| !inputs.contains_key(name.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        anyhow::bail!(
            "No value for template variable(s): {}. Use --input, --input-file or --var",
            missing.join(", ")
        );
    }

    Ok(inputs)
}

fn print_principles(config: &ProjectConfig) {
    println!("{}", "Built-in principles:".bold());
    for principle in ConstitutionalPrinciple::all() {
        println!("  {}", principle.name.cyan());
        println!("    {}", truncate(&principle.critique_request, 96).dimmed());
    }

    if !config.custom_principles.is_empty() {
        println!();
        println!("{}", "From constitution.toml:".bold());
        for principle in &config.custom_principles {
            println!("  {}", principle.name.cyan());
            println!("    {}", truncate(&principle.critique_request, 96).dimmed());
        }
    }
}

fn print_result(result: &LoopResult) {
    if let Some(ref initial) = result.initial_output {
        eprintln!("{}", "=== INITIAL OUTPUT ===".bold());
        eprintln!("{}", initial);
    }

    if let Some(ref trace) = result.critiques_and_revisions {
        for (i, pair) in trace.iter().enumerate() {
            eprintln!();
            eprintln!("{}", format!("=== CRITIQUE {} ===", i + 1).bold());
            eprintln!("{}", pair.critique);
            if pair.was_revised() {
                eprintln!("{}", format!("=== REVISION {} ===", i + 1).green().bold());
                eprintln!("{}", pair.revision);
            } else {
                eprintln!("{}", "(no revision)".dimmed());
            }
        }
        eprintln!();
        eprintln!(
            "Critiques: {}, revisions: {}",
            trace.len(),
            result.revision_count()
        );
        eprintln!();
    }

    println!("{}", result.output);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn default_template() -> PromptTemplate {
        PromptTemplate::from_template(DEFAULT_TEMPLATE).unwrap()
    }

    #[test]
    fn test_input_file_and_flag_are_both_verbatim() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("question.txt"), "  What is 2+2?\n").unwrap();

        let cli = Cli::try_parse_from(["constitution", "--input-file", "question.txt"]).unwrap();
        let from_file = collect_inputs(&cli, dir.path(), &default_template()).unwrap();
        assert_eq!(from_file["input"], "  What is 2+2?\n");

        let cli = Cli::try_parse_from(["constitution", "--input", "  What is 2+2?\n"]).unwrap();
        let from_flag = collect_inputs(&cli, dir.path(), &default_template()).unwrap();
        assert_eq!(from_flag["input"], from_file["input"]);
    }

    #[test]
    fn test_vars_fill_template_variables() {
        let template = PromptTemplate::from_template("{{topic}} in {{style}}").unwrap();
        let cli = Cli::try_parse_from([
            "constitution",
            "--var",
            "topic=tides",
            "--var",
            "style=a=b form",
        ])
        .unwrap();
        let inputs = collect_inputs(&cli, Path::new("."), &template).unwrap();
        assert_eq!(inputs["topic"], "tides");
        assert_eq!(inputs["style"], "a=b form");
    }

    #[test]
    fn test_missing_template_variable_is_reported() {
        let cli = Cli::try_parse_from(["constitution"]).unwrap();
        let err = collect_inputs(&cli, Path::new("."), &default_template()).unwrap_err();
        assert!(err.to_string().contains("input"));
    }
}
