use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use dirrisk::config::Config;
use dirrisk::error::DirRiskError;
use dirrisk::facts::FactKind;
use dirrisk::output::OutputFormat;
use dirrisk::rules::builtin::Catalogs;
use dirrisk::rules::RuleMetadata;
use dirrisk::{AnalyzeOptions, Analyzer};

#[derive(Parser)]
#[command(
    name = "dirrisk",
    about = "Risk scoring for directory services and cloud tenants",
    version,
    author
)]
struct Cli {
    /// Log filter (e.g. "info", "dirrisk=debug")
    #[arg(long, global = true, env = "DIRRISK_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score fact snapshots against the rule catalogs
    Scan {
        /// Snapshot file or directory of snapshots
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Config file path
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Output format (console, json)
        #[arg(long, short = 'f', default_value = "console")]
        format: String,

        /// Fail when a global score is above this value (0-100)
        #[arg(long)]
        fail_above: Option<u32>,

        /// Write output to file instead of stdout
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },

    /// List all available rules
    ListRules {
        /// Only list rules for one fact kind (healthcheck, tenant, graph)
        #[arg(long, short = 'k')]
        kind: Option<String>,

        /// Output format (table, json)
        #[arg(long, short = 'f', default_value = "table")]
        format: String,
    },

    /// Show the full description of one rule
    Explain {
        /// Rule identifier, e.g. ADConnectVersion1
        rule_id: String,
    },

    /// Generate a starter .dirrisk.toml config file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&cli.log)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Scan {
            path,
            config,
            format,
            fail_above,
            output,
        } => cmd_scan(path, config, format, fail_above, output),
        Commands::ListRules { kind, format } => cmd_list_rules(kind, format),
        Commands::Explain { rule_id } => cmd_explain(rule_id),
        Commands::Init { force } => cmd_init(force),
    };

    match result {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(e.exit_code());
        }
    }
}

fn cmd_scan(
    path: PathBuf,
    config: Option<PathBuf>,
    format_str: String,
    fail_above: Option<u32>,
    output_path: Option<PathBuf>,
) -> Result<i32, DirRiskError> {
    let format = OutputFormat::from_str_lenient(&format_str).unwrap_or_else(|| {
        eprintln!("Warning: unknown format '{}', using console", format_str);
        OutputFormat::Console
    });

    let options = AnalyzeOptions {
        config_path: config,
        fail_above_override: fail_above,
    };

    let analyzer = Analyzer::from_options(&path, &options)?;
    let report = analyzer.analyze(&path)?;
    let rendered = analyzer.render(&report, format)?;

    match output_path {
        Some(out) => std::fs::write(&out, &rendered)?,
        None => print!("{}", rendered),
    }

    // Exit code: 0 = pass, 1 = a target scored above the threshold
    Ok(if report.pass() { 0 } else { 1 })
}

fn cmd_list_rules(kind: Option<String>, format_str: String) -> Result<i32, DirRiskError> {
    let kinds = match kind {
        Some(k) => vec![FactKind::from_str_lenient(&k)
            .ok_or_else(|| DirRiskError::Config(format!("unknown fact kind '{k}'")))?],
        None => vec![
            FactKind::Healthcheck,
            FactKind::Tenant,
            FactKind::CompromiseGraph,
        ],
    };

    let catalogs = Catalogs::build(&Config::default().rules)?;
    let rules: Vec<(FactKind, &RuleMetadata)> = kinds
        .iter()
        .flat_map(|&kind| catalogs.rules_for(kind).into_iter().map(move |m| (kind, m)))
        .collect();

    match format_str.as_str() {
        "json" => {
            let metadata: Vec<&RuleMetadata> = rules.iter().map(|(_, m)| *m).collect();
            let json = serde_json::to_string_pretty(&metadata)?;
            println!("{}", json);
        }
        _ => {
            println!(
                "{:<28} {:<17} {:<20} {:<10} {:>6} {:>3}  TITLE",
                "ID", "KIND", "CATEGORY", "MODE", "WEIGHT", "LVL"
            );
            println!("{}", "-".repeat(110));
            for (kind, rule) in &rules {
                println!(
                    "{:<28} {:<17} {:<20} {:<10} {:>6} {:>3}  {}",
                    rule.id(),
                    kind.to_string(),
                    rule.category().to_string(),
                    rule.mode().to_string(),
                    rule.weight(),
                    rule.maturity().to_string(),
                    rule.display().title,
                );
            }
        }
    }

    Ok(0)
}

fn cmd_explain(rule_id: String) -> Result<i32, DirRiskError> {
    let catalogs = Catalogs::build(&Config::default().rules)?;
    let rule = catalogs.resolve(&rule_id)?;
    let display = rule.display();

    println!("{} - {}", rule.id(), display.title);
    println!();
    println!("  Category:       {}", rule.category());
    println!("  Classification: {}", rule.classification());
    println!("  Computation:    {} (weight {})", rule.mode(), rule.weight());
    println!("  Maturity level: {}", rule.maturity());
    if let Some(version) = rule.introduced_in() {
        println!("  Introduced in:  {}", version);
    }

    for (label, text) in [
        ("Description", &display.description),
        ("Technical explanation", &display.technical_explanation),
        ("Solution", &display.solution),
        ("Documentation", &display.documentation),
    ] {
        if !text.is_empty() {
            println!();
            println!("  {}:", label);
            println!("    {}", text);
        }
    }

    if !rule.references().is_empty() {
        println!();
        println!("  References:");
        for reference in rule.references() {
            match reference.url() {
                Some(url) => println!("    - {} <{}>", reference, url),
                None => println!("    - {}", reference),
            }
        }
    }

    Ok(0)
}

fn cmd_init(force: bool) -> Result<i32, DirRiskError> {
    let path = PathBuf::from(".dirrisk.toml");

    if path.exists() && !force {
        eprintln!(".dirrisk.toml already exists. Use --force to overwrite.");
        return Ok(1);
    }

    std::fs::write(&path, Config::starter_toml())?;
    println!("Created .dirrisk.toml");

    Ok(0)
}
