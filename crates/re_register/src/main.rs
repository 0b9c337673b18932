use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::{Datelike, Local};
use clap::{Args, CommandFactory, Parser, Subcommand};
use re_register_core::config::{RegisterConfig, load_config};
use re_register_core::publish::{PublishOptions, SaveOptions, publish_pages, render_pages};
use re_register_core::registers::Registers;
use re_register_core::runtime::{
    PathOverrides, ResolutionContext, ResolvedPaths, inspect_runtime, resolve_paths,
};
use re_register_core::scanner::{ScanOptions, ScanReport, scan_pages};
use re_register_core::sort_key::make_sort_key;
use re_register_core::wiki::{MediaWikiClient, MediaWikiClientConfig};
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "re_register",
    version,
    about = "Maintain the RE registers: scan article pages, update volume registers, publish register pages"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    project_root: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved runtime diagnostics")]
    diagnostics: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    project_root: Option<PathBuf>,
    data_dir: Option<PathBuf>,
    config: Option<PathBuf>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            project_root: cli.project_root.clone(),
            data_dir: cli.data_dir.clone(),
            config: cli.config.clone(),
            diagnostics: cli.diagnostics,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(name = "sort-key", about = "Print the normalized sort key of a lemma")]
    SortKey(SortKeyArgs),
    #[command(about = "Show resolved paths and the state of the register data")]
    Status,
    #[command(about = "Read RE pages from the wiki and update the volume registers")]
    Scan(ScanArgs),
    #[command(about = "Print one rendered register page")]
    Render(RenderArgs),
    #[command(about = "Render every register page and save the changed ones")]
    Publish(PublishArgs),
}

#[derive(Debug, Args)]
struct SortKeyArgs {
    raw: String,
}

#[derive(Debug, Args)]
struct ScanArgs {
    #[arg(value_name = "TITLE", help = "Page titles to scan, e.g. RE:Aal")]
    titles: Vec<String>,
    #[arg(short = 'c', long, value_name = "NAME", help = "Scan every page of a category")]
    category: Vec<String>,
    #[arg(long, value_name = "SECONDS", help = "Stop scanning after this many seconds")]
    budget: Option<u64>,
    #[arg(long, help = "Do not write the updated registers")]
    dry_run: bool,
    #[arg(long, help = "Print the scan report as JSON")]
    json: bool,
}

#[derive(Debug, Args)]
struct RenderArgs {
    #[arg(long, help = "Year used for public-domain colouring (default: current year)")]
    year: Option<i32>,
    #[command(subcommand)]
    command: RenderSubcommand,
}

#[derive(Debug, Subcommand)]
enum RenderSubcommand {
    Volume { name: String },
    Alphabetic { start: String },
    Author { key: String },
    #[command(name = "public-domain")]
    PublicDomain,
    Short { issue: String },
}

#[derive(Debug, Args)]
struct PublishArgs {
    #[arg(long, help = "Show diffs instead of saving")]
    dry_run: bool,
    #[arg(long, help = "Year used for public-domain pages (default: current year)")]
    year: Option<i32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::SortKey(SortKeyArgs { raw })) => {
            println!("{}", make_sort_key(&raw));
            Ok(())
        }
        Some(Commands::Status) => run_status(&runtime),
        Some(Commands::Scan(args)) => run_scan(&runtime, args),
        Some(Commands::Render(args)) => run_render(&runtime, args),
        Some(Commands::Publish(args)) => run_publish(&runtime, args),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn run_status(runtime: &RuntimeOptions) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let status = inspect_runtime(&paths)?;

    println!("runtime status");
    println!("project_root: {}", normalize_path(&paths.project_root));
    println!("data_dir: {}", normalize_path(&paths.data_dir));
    println!("data_dir_exists: {}", format_flag(status.data_dir_exists));
    println!("config_exists: {}", format_flag(status.config_exists));
    println!("authors_exists: {}", format_flag(status.authors_exists));
    println!(
        "authors_mapping_exists: {}",
        format_flag(status.authors_mapping_exists)
    );
    println!("register_files: {}", status.register_files);
    if status.authors_exists && status.authors_mapping_exists {
        let registers = Registers::load(&paths.data_dir)?;
        println!("registers.volumes: {}", registers.volume_registers().len());
        println!("registers.lemmas: {}", registers.lemma_count());
        println!("registers.authors: {}", registers.authors().len());
    }
    print_warnings(&status.warnings);
    print_diagnostics(runtime, &paths);

    Ok(())
}

fn run_scan(runtime: &RuntimeOptions, args: ScanArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let config = load_config(&paths.config_path)?;
    let mut registers = Registers::load(&paths.data_dir)?;
    let mut client = wiki_client(&config)?;

    let mut titles = args.titles;
    for category in &args.category {
        titles.extend(client.category_members(category)?);
    }
    if titles.is_empty() {
        bail!("scan needs at least one page title or --category");
    }

    let options = ScanOptions {
        budget: args
            .budget
            .map(Duration::from_secs)
            .or_else(|| config.scan_budget()),
    };
    let report = scan_pages(&mut registers, &mut client, &titles, &options)?;

    if args.dry_run {
        info!("dry run, registers not written");
    } else {
        registers.persist()?;
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_scan_report(&report, titles.len(), args.dry_run);
    }
    print_diagnostics(runtime, &paths);

    Ok(())
}

fn print_scan_report(report: &ScanReport, requested: usize, dry_run: bool) {
    println!("scan");
    println!("pages.requested: {requested}");
    println!("pages.scanned: {}", report.pages_scanned);
    println!("pages.missing: {}", report.missing_pages.len());
    println!("updates: {}", report.updates.len());
    println!("failures: {}", report.failures.len());
    for failure in &report.failures {
        println!(
            "failure: {} ({}): {}",
            failure.lemma, failure.volume, failure.reason
        );
    }
    println!("stopped_early: {}", format_flag(report.stopped_early));
    println!("persisted: {}", format_flag(!dry_run));
}

fn run_render(runtime: &RuntimeOptions, args: RenderArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let registers = Registers::load(&paths.data_dir)?;
    let year = args.year.unwrap_or_else(current_year);

    let text = match args.command {
        RenderSubcommand::Volume { name } => registers
            .volume_register(&name)
            .with_context(|| format!("no register for volume {name}"))?
            .get_register_str(registers.authors(), year),
        RenderSubcommand::Alphabetic { start } => registers
            .alphabetic_registers()
            .into_iter()
            .find(|register| register.start() == start.to_lowercase())
            .with_context(|| format!("no alphabetic register starts at {start}"))?
            .get_register_str(year),
        RenderSubcommand::Author { key } => registers
            .author_register(&key)
            .with_context(|| format!("unknown author {key}"))?
            .get_register_str(year),
        RenderSubcommand::PublicDomain => registers.public_domain_register(year).get_register_str(),
        RenderSubcommand::Short { issue } => registers
            .short_registers()
            .into_iter()
            .find(|register| register.main_issue() == issue)
            .with_context(|| format!("no register for main issue {issue}"))?
            .get_register_str(),
    };
    println!("{text}");
    Ok(())
}

fn run_publish(runtime: &RuntimeOptions, args: PublishArgs) -> Result<()> {
    let paths = resolve_runtime_paths(runtime)?;
    let config = load_config(&paths.config_path)?;
    let registers = Registers::load(&paths.data_dir)?;
    let mut client = wiki_client(&config)?;

    if !args.dry_run {
        let Some(credentials) = config.credentials() else {
            bail!("publishing needs WIKI_BOT_USER and WIKI_BOT_PASS (or use --dry-run)");
        };
        client.login(&credentials.username, &credentials.password)?;
    }

    let pages = render_pages(
        &registers,
        &PublishOptions {
            page_prefix: config.page_prefix().to_string(),
            current_year: args.year.unwrap_or_else(current_year),
        },
    );
    let report = publish_pages(
        &pages,
        &mut client,
        &SaveOptions {
            edit_summary: config.edit_summary().to_string(),
            dry_run: args.dry_run,
        },
    )?;

    println!("publish");
    println!("pages: {}", pages.len());
    println!("saved: {}", report.saved.len());
    println!("unchanged: {}", report.unchanged.len());
    println!("dry_run: {}", format_flag(args.dry_run));
    for diff in &report.diffs {
        println!("\n{}", diff.diff);
    }
    println!("requests: {}", client.request_count());
    print_diagnostics(runtime, &paths);

    Ok(())
}

fn wiki_client(config: &RegisterConfig) -> Result<MediaWikiClient> {
    MediaWikiClient::new(MediaWikiClientConfig::from_config(config)?)
}

fn current_year() -> i32 {
    Local::now().year()
}

fn print_warnings(warnings: &[String]) {
    if !warnings.is_empty() {
        println!("warnings:");
        for warning in warnings {
            println!("  - {warning}");
        }
    }
}

fn print_diagnostics(runtime: &RuntimeOptions, paths: &ResolvedPaths) {
    if runtime.diagnostics {
        println!("\n[diagnostics]\n{}", paths.diagnostics());
    }
}

fn resolve_runtime_paths(runtime: &RuntimeOptions) -> Result<ResolvedPaths> {
    dotenvy::dotenv().ok();

    let context = ResolutionContext::from_process()?;
    let overrides = PathOverrides {
        project_root: runtime.project_root.clone(),
        data_dir: runtime.data_dir.clone(),
        config: runtime.config.clone(),
    };

    let initial = resolve_paths(&context, &overrides)?;
    let project_env = initial.project_root.join(".env");
    if project_env.exists() {
        let _ = dotenvy::from_path_override(&project_env);
    }

    resolve_paths(&context, &overrides)
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

fn format_flag(value: bool) -> &'static str {
    if value { "yes" } else { "no" }
}
