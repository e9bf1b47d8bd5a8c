use std::path::{Path, PathBuf};

use argot_config::{ConfigFile, TreeFile};
use argot_core::{CommandTree, Context, Vars, parse};
use clap::{Args, Parser, Subcommand};
use serde_json::{Map, Value as Json, json};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "argot")]
#[command(about = "Check, parse, and complete argument lists against declared command trees")]
#[command(version)]
struct Cli {
    /// Log filter used when RUST_LOG is not set (e.g. debug, argot_core=trace).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a tree file and print its command paths.
    Check(CheckArgs),
    /// Parse an argument list against a tree and print the result as JSON.
    Parse(ParseArgs),
    /// Print completion candidates for the last argument.
    Complete(CompleteArgs),
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// Tree declaration file (YAML or JSON).
    #[arg(long)]
    tree: PathBuf,
}

#[derive(Debug, Args)]
struct ParseArgs {
    /// Tree declaration file (YAML or JSON).
    #[arg(long)]
    tree: PathBuf,
    /// Config file supplying values for flags not given on the command line.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Arguments to parse, after `--`.
    #[arg(last = true)]
    args: Vec<String>,
}

#[derive(Debug, Args)]
struct CompleteArgs {
    /// Tree declaration file (YAML or JSON).
    #[arg(long)]
    tree: PathBuf,
    /// Words typed so far, after `--`; the last one is being completed.
    #[arg(last = true)]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let result = match cli.command {
        Command::Check(args) => run_check(args),
        Command::Parse(args) => run_parse(args),
        Command::Complete(args) => run_complete(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_logging(level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();
}

fn load_tree(path: &Path) -> Result<CommandTree, String> {
    let file = TreeFile::load(path)
        .map_err(|err| format!("Failed to load '{}': {err}", path.display()))?;
    file.build()
        .map_err(|err| format!("Invalid tree '{}': {err}", path.display()))
}

fn run_check(args: CheckArgs) -> Result<(), String> {
    let tree = load_tree(&args.tree)?;
    for cmd in tree.iter() {
        let command = cmd.command();
        let mut line = cmd.tree().join(" ");
        if command.hidden {
            line.push_str(" (hidden)");
        }
        let flags: Vec<String> = command.flags.iter().map(|flag| flag.spec_string()).collect();
        if !flags.is_empty() {
            line.push_str(&format!(" [{}]", flags.join(", ")));
        }
        println!("{line}");
    }
    println!("Validated {} command(s).", tree.len());
    Ok(())
}

fn run_parse(args: ParseArgs) -> Result<(), String> {
    let tree = load_tree(&args.tree)?;
    let config = match &args.config {
        Some(path) => Some(
            ConfigFile::load(path)
                .map_err(|err| format!("Failed to load '{}': {err}", path.display()))?,
        ),
        None => None,
    };

    let ctx = Context::new();
    let mut vars = Vars::new();
    let (cmd, rest) = match parse(&ctx, &tree, args.args.as_slice(), &mut vars) {
        Ok(resolved) => resolved,
        Err(err) if err.is_exit() => return Ok(()),
        Err(err) => return Err(err.to_string()),
    };
    if let Some(config) = &config {
        let applied = config
            .apply(&ctx, cmd, &mut vars)
            .map_err(|err| err.to_string())?;
        debug!(applied, "config values applied");
    }
    if cmd.has_children() && cmd.command().exec.is_none() {
        if let Some(first) = rest.first() {
            return Err(cmd.suggest(first).to_string());
        }
    }
    cmd.validate(&rest).map_err(|err| err.to_string())?;

    let vars: Map<String, Json> = vars
        .iter()
        .map(|(name, var)| {
            let entry = json!({
                "type": var.value.ty(),
                "value": var.value.render(),
                "explicit": var.explicit,
            });
            (name.to_string(), entry)
        })
        .collect();
    let output = json!({
        "command": cmd.tree().join(" "),
        "args": rest,
        "vars": vars,
    });
    let raw = serde_json::to_string_pretty(&output)
        .map_err(|err| format!("Failed to serialize parse result: {err}"))?;
    println!("{raw}");
    Ok(())
}

fn run_complete(args: CompleteArgs) -> Result<(), String> {
    let tree = load_tree(&args.tree)?;
    let mut words = args.args;
    if words.is_empty() {
        words.push(String::new());
    }
    let (comps, directive) = tree.root().comps(words.as_slice()).map_err(|err| err.to_string())?;
    for comp in &comps {
        if comp.usage.is_empty() {
            println!("{}", comp.name);
        } else {
            println!("{}\t{}", comp.name, comp.usage);
        }
    }
    println!("{directive}");
    Ok(())
}
