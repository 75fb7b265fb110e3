use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tokenlint::config::CONFIG_FILE_NAME;
use tokenlint::rules::registry::{self, RuleSet};
use tokenlint::{Category, Config, Engine, Severity};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tokenlint")]
#[command(about = "Rule-based static analysis for C and C++ token streams")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to analyze (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    path: PathBuf,

    #[command(flatten)]
    check: CheckArgs,

    /// Enable debug logging and show full finding explanations
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Args, Clone)]
struct CheckArgs {
    /// Output format (defaults to the config file's `output.format`)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Minimum severity to report
    #[arg(long, default_value = "style")]
    min_severity: Severity,

    /// Fail if any diagnostic meets this severity
    #[arg(long)]
    fail_on: Option<Severity>,

    /// Specific rules to run (comma-separated)
    #[arg(long, value_delimiter = ',')]
    rules: Option<Vec<String>>,

    /// Rule categories to run, replacing the config file's `enable` list
    #[arg(long, value_delimiter = ',')]
    enable: Option<Vec<Category>>,

    /// Show timing information
    #[arg(long)]
    timing: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run analysis (default)
    Check {
        /// Path to analyze
        #[arg(default_value = ".")]
        path: PathBuf,

        #[command(flatten)]
        args: CheckArgs,
    },
    /// Initialize tokenlint.toml config
    Init,
    /// List available rules
    Rules,
    /// Explain a specific rule in detail
    Explain {
        /// Rule ID to explain (e.g., "float-equality")
        rule_id: String,
    },
}

#[derive(Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    #[default]
    Console,
    Json,
    Sarif,
}

fn main() -> ExitCode {
    if let Err(e) = run() {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so json/sarif output on stdout stays parseable
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Check { path, args }) => run_check(&path, &args, cli.verbose),
        None => run_check(&cli.path, &cli.check, cli.verbose),
        Some(Commands::Init) => run_init(&cli.path),
        Some(Commands::Rules) => run_list_rules(),
        Some(Commands::Explain { rule_id }) => run_explain(&rule_id),
    }
}

/// Rule set restricted to the ids given on the command line.
fn select_rules(ids: Option<&[String]>) -> Result<RuleSet> {
    let Some(ids) = ids else {
        return Ok(RuleSet::builtin());
    };

    let mut selected = RuleSet::new();
    for id in ids.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let Some(rule) = registry::get_rule(id) else {
            bail!("Unknown rule: {} (see `tokenlint rules`)", id);
        };
        // Repeated ids are harmless
        let _ = selected.try_add_rule(rule);
    }
    Ok(selected)
}

fn apply_color_setting(config: &Config) {
    match config.output.color.as_str() {
        "always" => colored::control::set_override(true),
        "never" => colored::control::set_override(false),
        _ => {}
    }
}

fn run_check(path: &Path, args: &CheckArgs, verbose: bool) -> Result<()> {
    let mut config = Config::load_or_default(path)?;
    if let Some(enable) = &args.enable {
        config.enable = enable.clone();
    }
    apply_color_setting(&config);

    let format = match args.format {
        Some(format) => format,
        None => OutputFormat::from_str(&config.output.format, true)
            .map_err(|e| anyhow::anyhow!("invalid output.format in config: {}", e))?,
    };

    let rules = select_rules(args.rules.as_deref())?;
    let engine = Engine::with_rules(&config, &rules);

    let start = Instant::now();
    let diagnostics = engine.analyze(path)?;
    let analysis_time = start.elapsed();

    let diagnostics: Vec<_> = diagnostics
        .into_iter()
        .filter(|d| d.severity >= args.min_severity)
        .collect();

    match format {
        OutputFormat::Console => tokenlint::reporter::console::report(&diagnostics, verbose),
        OutputFormat::Json => tokenlint::reporter::json::report(&diagnostics)?,
        OutputFormat::Sarif => tokenlint::reporter::sarif::report(&diagnostics)?,
    }

    if args.timing {
        use colored::Colorize;
        eprintln!();
        eprintln!("{}", "Timing:".bold());
        eprintln!("  Analysis time: {:?}", analysis_time);
        eprintln!("  Diagnostics:   {}", diagnostics.len());
    }

    if let Some(fail_severity) = args.fail_on {
        let failing = diagnostics
            .iter()
            .filter(|d| d.severity >= fail_severity)
            .count();
        if failing > 0 {
            bail!(
                "Found {} diagnostic(s) at or above {} severity",
                failing,
                fail_severity
            );
        }
    }

    Ok(())
}

fn run_init(path: &Path) -> Result<()> {
    let config_path = path.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        bail!("{} already exists", CONFIG_FILE_NAME);
    }
    std::fs::write(&config_path, Config::default_toml())?;
    println!("Created {}", config_path.display());
    Ok(())
}

fn run_list_rules() -> Result<()> {
    println!("Available rules:\n");
    for rule in registry::all_rules() {
        println!(
            "  {:<28} {:<12} [{}] {}",
            rule.id(),
            rule.category(),
            rule.default_severity(),
            rule.description()
        );
    }
    println!("\nRules in the `internal` category only run when enabled in {CONFIG_FILE_NAME}.");
    println!("Use `tokenlint explain <rule-id>` for detailed information.");
    Ok(())
}

fn run_explain(rule_id: &str) -> Result<()> {
    use colored::Colorize;

    let Some(rule) = registry::get_rule(rule_id) else {
        eprintln!("{} Unknown rule: {}", "error:".red().bold(), rule_id);
        eprintln!("\nAvailable rules:");
        for r in registry::all_rules() {
            eprintln!("  {}", r.id());
        }
        bail!("Unknown rule: {}", rule_id);
    };

    println!("{}", rule.name().bold().underline());
    println!("Rule ID: {}", rule.id().cyan());
    println!("Category: {}", rule.category());
    println!("Severity: {}", rule.default_severity());
    println!();
    println!("{}", rule.description());
    println!();

    if let Some(explanation) = explanation(rule.id()) {
        print_explanation(&explanation);
    }

    Ok(())
}

struct Explanation {
    why: &'static [&'static str],
    bad: &'static [&'static str],
    good: &'static [&'static str],
}

fn print_explanation(explanation: &Explanation) {
    use colored::Colorize;

    println!("{}", "Why it matters:".yellow().bold());
    for line in explanation.why {
        println!("  {}", line);
    }
    println!();
    println!("{}", "Bad:".red().bold());
    for line in explanation.bad {
        println!("  {}", line);
    }
    println!();
    println!("{}", "Good:".green().bold());
    for line in explanation.good {
        println!("  {}", line);
    }
}

fn explanation(rule_id: &str) -> Option<Explanation> {
    let explanation = match rule_id {
        "float-equality" => Explanation {
            why: &[
                "Floating-point results carry rounding error that depends on how they were",
                "computed, so two values that should be equal rarely compare equal exactly.",
            ],
            bad: &["float ratio = a / b;", "if (ratio == 0.1) { ... }"],
            good: &["if (std::fabs(ratio - 0.1) < 1e-6f) { ... }"],
        },
        "time-t-arithmetic" => Explanation {
            why: &[
                "The encoding of time_t is unspecified. It is not guaranteed to count seconds,",
                "so adding or subtracting raw values gives meaningless results (CERT MSC05-CPP).",
            ],
            bad: &["time_t start = time(NULL);", "time_t elapsed = time(NULL) - start;"],
            good: &["double elapsed = difftime(time(NULL), start);"],
        },
        "signed-bitwise-operand" => Explanation {
            why: &[
                "Shifts and bitwise operations on negative signed values are implementation",
                "defined or undefined. Operands that are not known to be unsigned are reported",
                "(CERT INT13-CPP).",
            ],
            bad: &["int flags = read_flags();", "int masked = flags & 0x0f;"],
            good: &["unsigned int flags = read_flags();", "unsigned int mask = 0x0fu;", "unsigned int masked = flags & mask;"],
        },
        "signed-char-argument" => Explanation {
            why: &[
                "The <ctype.h> functions require an argument representable as unsigned char",
                "or EOF. Passing a negative char is undefined behaviour (CERT STR37-C).",
            ],
            bad: &["char c = buf[i];", "if (isspace(c)) { ... }"],
            good: &["unsigned char c = buf[i];", "if (isspace(c)) { ... }"],
        },
        "return-errno" => Explanation {
            why: &[
                "A function returning errno through an int does not say whether the value is",
                "an error status or a result. errno_t makes the contract explicit (CERT DCL09-CPP).",
            ],
            bad: &["int open_config() {", "    ...", "    return errno;", "}"],
            good: &["errno_t open_config() {", "    ...", "    return errno;", "}"],
        },
        "float-loop-counter" => Explanation {
            why: &[
                "Accumulated rounding makes the number of iterations depend on the platform's",
                "floating-point implementation (CERT FLP30-CPP).",
            ],
            bad: &["for (float x = 0.1f; x <= 1.0f; x += 0.1f) { ... }"],
            good: &["for (int i = 1; i <= 10; ++i) {", "    float x = i / 10.0f;", "}"],
        },
        "modify-std-namespace" => Explanation {
            why: &[
                "Adding declarations or definitions to namespace std is undefined behaviour,",
                "apart from a few permitted template specializations (CERT MSC34-CPP).",
            ],
            bad: &["namespace std {", "    int helper(int x);", "}"],
            good: &["namespace mylib {", "    int helper(int x);", "}"],
        },
        "complex-object-copying" => Explanation {
            why: &[
                "Passing a standard container by value copies every element on each call,",
                "allocating memory proportional to the container's size.",
            ],
            bad: &["void draw(std::vector<Point> points) { ... }"],
            good: &["void draw(const std::vector<Point>& points) { ... }"],
        },
        "simple-pattern" => Explanation {
            why: &[
                "Token::Match() interprets wildcards and alternations. A purely literal",
                "pattern gives the same answer through the cheaper Token::simpleMatch().",
            ],
            bad: &["if (Token::Match(tok, \"return ;\"))"],
            good: &["if (Token::simpleMatch(tok, \"return ;\"))"],
        },
        "complex-pattern" => Explanation {
            why: &[
                "Token::simpleMatch() compares text literally, so wildcards, alternations and",
                "character classes in its pattern never match what was intended.",
            ],
            bad: &["if (Token::simpleMatch(tok, \"%var% = %num%\"))"],
            good: &["if (Token::Match(tok, \"%var% = %num%\"))"],
        },
        "missing-percent-character" => Explanation {
            why: &[
                "A wildcard without its closing '%' is treated as literal text and never",
                "matches the token kind it was meant to.",
            ],
            bad: &["if (Token::Match(tok, \"%var ( %num% )\"))"],
            good: &["if (Token::Match(tok, \"%var% ( %num% )\"))"],
        },
        "unknown-pattern" => Explanation {
            why: &[
                "Only a fixed set of wildcards is understood. A misspelled name is matched",
                "literally and the pattern silently never matches.",
            ],
            bad: &["if (Token::Match(tok, \"%variable% =\"))"],
            good: &["if (Token::Match(tok, \"%var% =\"))"],
        },
        "redundant-next-previous" => Explanation {
            why: &[
                "Chained navigation such as next()->previous() walks back to a token that",
                "is already at hand, or can be reached with a single tokAt() call.",
            ],
            bad: &[
                "const Token *end = tok->next()->previous();",
                "const Token *name = tok->tokAt(2)->next();",
            ],
            good: &["const Token *end = tok;", "const Token *name = tok->tokAt(3);"],
        },
        _ => return None,
    };
    Some(explanation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_rule_has_an_explanation() {
        for rule in registry::all_rules() {
            assert!(explanation(rule.id()).is_some(), "{} has no explanation", rule.id());
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
