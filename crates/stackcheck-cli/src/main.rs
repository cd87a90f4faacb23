//! Stackcheck - configuration verification orchestrator CLI
//!
//! The `stackcheck` command probes a running deployment with a directory
//! of independent check scripts and aggregates their verdicts.
//!
//! ## Commands
//!
//! - `run`: execute all discovered probes and print the aggregated report
//! - `list`: show the probe registry and toolkit state without running
//! - `new`: scaffold a probe script from a GIVEN/WHEN/THEN description
//! - `templates`: list the built-in scaffolding templates

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use is_terminal::IsTerminal;
use stackcheck_domain::Category;
use stackcheck_engine::{
    discover, EnvConfig, JsonRenderer, Orchestrator, Probe, ProbeFilter, Renderer, RunOptions,
    ScaffoldRequest, Template, TextRenderer, ToolkitRef,
};
use std::path::{Path, PathBuf};
use tracing::{warn, Level};

#[derive(Parser)]
#[command(name = "stackcheck")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Configuration verification orchestrator for containerized stacks", long_about = None)]
struct Cli {
    /// Enable verbose output (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit JSON: report on stdout, log lines on stderr
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all discovered probes and print the aggregated report
    Run {
        /// Directory containing the probe scripts
        #[arg(short, long, default_value = "tests/checks")]
        checks: PathBuf,

        /// Workspace root where .env* files are read from
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,

        /// Only run probes of this category (filename prefix)
        #[arg(long)]
        category: Option<String>,

        /// Only run probes for this service (second filename segment)
        #[arg(long)]
        service: Option<String>,

        /// Probes in flight at once
        #[arg(short, long, default_value = "6")]
        jobs: usize,

        /// Per-probe timeout in seconds
        #[arg(short, long, default_value = "30")]
        timeout: u64,

        /// Override PUBLISH_DOMAIN for this run
        #[arg(long)]
        domain: Option<String>,

        /// Override the CHECK_TOOLS toolkit directory
        #[arg(long)]
        tools: Option<PathBuf>,

        /// Show each result's reproduction command
        #[arg(long)]
        commands: bool,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Use ASCII icons instead of unicode
        #[arg(long)]
        ascii: bool,
    },

    /// Show the probe registry and toolkit state without running anything
    List {
        /// Directory containing the probe scripts
        #[arg(short, long, default_value = "tests/checks")]
        checks: PathBuf,

        /// Workspace root where .env* files are read from
        #[arg(short, long, default_value = ".")]
        workspace: PathBuf,
    },

    /// Scaffold a new probe script from a GIVEN/WHEN/THEN description
    New {
        /// Category prefix (security, storage, communication, ...)
        category: String,

        /// Service the probe targets (redis, qdrant, caddy, ...)
        service: String,

        /// Short test name, completes the filename
        test: String,

        /// Template to generate from (see `stackcheck templates`)
        #[arg(long, default_value = "generic")]
        template: String,

        /// GIVEN clause of the description
        #[arg(long, default_value = "a running deployment")]
        given: String,

        /// WHEN clause of the description
        #[arg(long, default_value = "the probe runs")]
        when: String,

        /// THEN clause of the description
        #[arg(long, default_value = "the expected state is reported")]
        then: String,

        /// Directory to write the probe into
        #[arg(short, long, default_value = "tests/checks")]
        checks: PathBuf,

        /// Print the generated script instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// List the built-in scaffolding templates
    Templates,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose > 0 {
        Level::DEBUG
    } else {
        Level::INFO
    };
    stackcheck_engine::init_tracing(cli.json, level);

    let code = match cli.command {
        Commands::Run {
            checks,
            workspace,
            category,
            service,
            jobs,
            timeout,
            domain,
            tools,
            commands,
            no_color,
            ascii,
        } => {
            cmd_run(RunArgs {
                checks,
                workspace,
                category,
                service,
                jobs,
                timeout,
                domain,
                tools,
                commands,
                no_color,
                ascii,
                json: cli.json,
                verbose: cli.verbose,
            })
            .await?
        }
        Commands::List { checks, workspace } => cmd_list(&checks, &workspace)?,
        Commands::New {
            category,
            service,
            test,
            template,
            given,
            when,
            then,
            checks,
            dry_run,
        } => cmd_new(
            &category, &service, &test, &template, &given, &when, &then, &checks, dry_run,
        )?,
        Commands::Templates => cmd_templates(),
    };

    // process::exit skips destructors; flush before leaving.
    use std::io::Write as _;
    let _ = std::io::stdout().flush();
    std::process::exit(code);
}

struct RunArgs {
    checks: PathBuf,
    workspace: PathBuf,
    category: Option<String>,
    service: Option<String>,
    jobs: usize,
    timeout: u64,
    domain: Option<String>,
    tools: Option<PathBuf>,
    commands: bool,
    no_color: bool,
    ascii: bool,
    json: bool,
    verbose: u8,
}

/// Run the probe suite; the returned code is the process exit code.
async fn cmd_run(args: RunArgs) -> Result<i32> {
    let mut config = EnvConfig::load(&args.workspace);
    if let Some(domain) = args.domain {
        config = config.with_publish_domain(domain);
    }
    if let Some(tools) = args.tools {
        config = config.with_check_tools(tools);
    }

    // Probes sourcing helpers from a missing toolkit all fail confusingly,
    // so flag it up front.
    let toolkit = ToolkitRef::new(config.check_tools.clone());
    if let Err(e) = toolkit.ensure_exists() {
        warn!(error = %e, "shared toolkit not found; probes sourcing it will report BROKEN");
    }

    let options = RunOptions {
        pool_size: args.jobs,
        timeout_secs: args.timeout,
        filter: ProbeFilter {
            category: args.category,
            service: args.service,
        },
    };

    let orchestrator = Orchestrator::new(config, options);
    let canceller = orchestrator.canceller();

    let report = tokio::select! {
        result = orchestrator.run(&args.checks) => {
            result.context("verification run failed")?
        }
        _ = tokio::signal::ctrl_c() => {
            canceller.kill_inflight();
            eprintln!("interrupted, in-flight probes terminated");
            return Ok(130);
        }
    };

    let rendered = if args.json {
        JsonRenderer.render(&report)
    } else {
        TextRenderer {
            color: !args.no_color && std::io::stdout().is_terminal(),
            unicode: !args.ascii,
            verbose: args.verbose,
            show_commands: args.commands,
        }
        .render(&report)
    };
    print!("{rendered}");

    Ok(report.exit_code())
}

/// Show the probe registry without running anything.
fn cmd_list(checks: &Path, workspace: &Path) -> Result<i32> {
    let registry = discover(checks).context("probe discovery failed")?;

    println!("Probes in {} ({}):", checks.display(), registry.probes.len());
    for probe in &registry.probes {
        println!(
            "  {:<40} category: {:<14} service: {}",
            probe.name(),
            probe.category(),
            probe.service().unwrap_or("-"),
        );
    }

    if !registry.not_executable.is_empty() {
        println!();
        println!("Not executable ({}):", registry.not_executable.len());
        for probe in &registry.not_executable {
            println!("  {}", probe.path().display());
        }
    }

    if !registry.unrecognized.is_empty() {
        println!();
        println!("Not matching {{category}}-{{service}}-{{test}}.{{ext}} ({}):", registry.unrecognized.len());
        for path in &registry.unrecognized {
            println!("  {}", path.display());
        }
    }

    let config = EnvConfig::load(workspace);
    let toolkit = ToolkitRef::new(config.check_tools.clone());
    println!();
    println!("Toolkit: {}", toolkit.dir().display());
    match toolkit.ensure_exists() {
        Ok(()) => {
            println!("  helpers: {}", toolkit.helpers().len());
            for missing in toolkit.missing_helpers() {
                println!("  missing: {missing}");
            }
        }
        Err(e) => println!("  {e}"),
    }

    Ok(0)
}

/// Generate a probe script from a template.
#[allow(clippy::too_many_arguments)]
fn cmd_new(
    category: &str,
    service: &str,
    test: &str,
    template: &str,
    given: &str,
    when: &str,
    then: &str,
    checks: &Path,
    dry_run: bool,
) -> Result<i32> {
    let template = Template::from_name(template)
        .with_context(|| format!("unknown template: {template} (see `stackcheck templates`)"))?;
    let category = Category::parse(category)
        .with_context(|| format!("invalid category: {category}"))?;

    let request = ScaffoldRequest {
        template,
        category,
        service: service.to_string(),
        test: test.to_string(),
        given: given.to_string(),
        when: when.to_string(),
        then: then.to_string(),
    };

    if dry_run {
        print!("{}", request.render());
        return Ok(0);
    }

    let path = request
        .write(checks)
        .with_context(|| format!("failed writing probe into {}", checks.display()))?;
    println!("Created {}", path.display());

    Ok(0)
}

/// List built-in templates.
fn cmd_templates() -> i32 {
    println!("Available templates:");
    for template in Template::all() {
        println!("  {:<12} {}", template.name(), template.description());
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_new_writes_discoverable_probe() {
        let dir = tempfile::tempdir().unwrap();

        let code = cmd_new(
            "security",
            "qdrant",
            "apikey",
            "http",
            "a qdrant container",
            "the API is queried without a key",
            "the request is rejected",
            dir.path(),
            false,
        )
        .expect("cmd_new failed");
        assert_eq!(code, 0);

        let registry = discover(dir.path()).expect("discover failed");
        assert_eq!(registry.probes.len(), 1);
        assert_eq!(registry.probes[0].name(), "security-qdrant-apikey");
    }

    #[test]
    fn test_cmd_new_rejects_unknown_template() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_new(
            "security", "redis", "auth", "nope", "g", "w", "t", dir.path(), true,
        )
        .expect_err("expected failure");
        assert!(err.to_string().contains("unknown template"));
    }

    #[test]
    fn test_cmd_new_rejects_invalid_category() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_new(
            "Security", "redis", "auth", "generic", "g", "w", "t", dir.path(), true,
        )
        .expect_err("expected failure");
        assert!(err.to_string().contains("invalid category"));
    }

    #[test]
    fn test_cmd_list_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = cmd_list(&dir.path().join("missing"), dir.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_cmd_list_reports_registry() {
        let dir = tempfile::tempdir().unwrap();
        cmd_new(
            "storage", "redis", "keys", "redis-cli", "g", "w", "t", dir.path(), false,
        )
        .expect("cmd_new failed");

        let code = cmd_list(dir.path(), dir.path()).expect("cmd_list failed");
        assert_eq!(code, 0);
    }
}
