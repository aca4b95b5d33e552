use std::io;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use serde::Serialize;

use crate::core::{Finding, LoadedReport, ReportSummary};
use crate::engine::{Engine, EngineOptions};
use crate::query::{QueryState, SortField, ValidationFilter};
use crate::ui::UiConfig;

#[derive(Debug, Parser)]
#[command(
    name = "scanview",
    version,
    about = "Browse secret-scan access-map reports (JSON/JSONL): filter, sort and export findings locally"
)]
pub struct Cli {
    #[arg(long, global = true)]
    pub json: bool,
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
    #[arg(long, global = true)]
    pub verbose: bool,
    #[arg(long, global = true)]
    pub quiet: bool,
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Findings(FindingsArgs),
    Access(AccessArgs),
    Export(ExportArgs),
    Ui(UiArgs),
    Completion(CompletionArgs),
    Config(ConfigArgs),
}

#[derive(Debug, Args)]
pub struct FindingsArgs {
    pub report: PathBuf,
    #[arg(long)]
    pub filter: Option<String>,
    #[arg(long)]
    pub validation: Option<ValidationFilter>,
    #[arg(long)]
    pub sort: Option<SortField>,
    #[arg(long)]
    pub desc: bool,
    #[arg(long)]
    pub page: Option<usize>,
    #[arg(long)]
    pub page_size: Option<usize>,
}

#[derive(Debug, Args)]
pub struct AccessArgs {
    pub report: PathBuf,
    #[arg(long)]
    pub search: Option<String>,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(subcommand)]
    pub command: ExportCommand,
}

#[derive(Debug, Subcommand)]
pub enum ExportCommand {
    Csv(ExportCsvArgs),
    Json(ExportJsonArgs),
    Access(ExportAccessArgs),
}

#[derive(Debug, Args)]
pub struct ExportCsvArgs {
    pub report: PathBuf,
    #[arg(long)]
    pub out: Option<PathBuf>,
    #[arg(long)]
    pub filter: Option<String>,
    #[arg(long)]
    pub validation: Option<ValidationFilter>,
    #[arg(long)]
    pub sort: Option<SortField>,
    #[arg(long)]
    pub desc: bool,
}

#[derive(Debug, Args)]
pub struct ExportJsonArgs {
    pub report: PathBuf,
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct ExportAccessArgs {
    pub report: PathBuf,
    #[arg(long)]
    pub out: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct UiArgs {
    pub report: PathBuf,
}

#[derive(Debug, Args)]
pub struct CompletionArgs {
    pub shell: String,
}

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[arg(long)]
    pub show: bool,
}

#[derive(Debug, Serialize)]
struct FindingsOutput<'a> {
    schema_version: &'a str,
    tool_version: &'a str,
    source: &'a str,
    loaded_at: &'a str,
    summary: &'a ReportSummary,
    query: &'a QueryState,
    filtered_count: usize,
    total_pages: usize,
    current_page: usize,
    findings: Vec<&'a Finding>,
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let stdin_is_tty = io::stdin().is_terminal();
    let stdout_is_tty = io::stdout().is_terminal();
    let stderr_is_tty = io::stderr().is_terminal();

    let home_dir = crate::config::effective_home_dir()?;

    let env_config_path = std::env::var_os("SCANVIEW_CONFIG").map(std::path::PathBuf::from);
    let cfg = crate::config::load(
        cli.config.as_deref().or(env_config_path.as_deref()),
        &home_dir,
    )
    .map_err(crate::exit::invalid_args_err)?;

    let color = stdout_is_tty && cfg.ui.color && !cli.no_color;

    let ui_cfg = UiConfig {
        color,
        stdin_is_tty,
        stdout_is_tty,
        stderr_is_tty,
        max_table_rows: cfg.ui.max_table_rows,
        quiet: cli.quiet,
        verbose: cli.verbose,
    };

    let is_ui_mode = matches!(&cli.command, Commands::Ui(_));
    let engine = Engine::new(EngineOptions {
        show_progress: ui_cfg.stderr_is_tty && !cli.quiet && !cli.json && !is_ui_mode,
    });

    match cli.command {
        Commands::Findings(args) => {
            let loaded = load_report(&engine, &args.report)?;
            let mut state = QueryState::new(
                args.page_size.unwrap_or(cfg.query.page_size),
                args.sort.unwrap_or(cfg.query.sort_field),
            );
            if let Some(filter) = args.filter.as_deref() {
                state.set_text_filter(filter);
            }
            if let Some(validation) = args.validation {
                state.set_validation_filter(validation);
            }
            if args.desc {
                state.set_sort(state.sort_field);
            }
            if let Some(page) = args.page {
                state.set_page(page);
            }

            let view = crate::query::evaluate(&loaded.report.findings, &mut state);
            if cli.json {
                let output = FindingsOutput {
                    schema_version: &loaded.report.schema_version,
                    tool_version: &loaded.report.tool_version,
                    source: &loaded.report.source,
                    loaded_at: &loaded.report.loaded_at,
                    summary: &loaded.report.summary,
                    query: &state,
                    filtered_count: view.filtered_count(),
                    total_pages: view.total_pages,
                    current_page: view.current_page,
                    findings: view.page_rows().to_vec(),
                };
                write_json(&output)?;
            } else {
                crate::ui::print_findings(&loaded.report, &view, &state, &ui_cfg);
            }
        }
        Commands::Access(args) => {
            let loaded = load_report(&engine, &args.report)?;
            let search = args.search.unwrap_or_default();
            let tree = crate::tree::build(&loaded.report.access_map, &search);
            if cli.json {
                match &tree {
                    Some(tree) => write_json(tree)?,
                    None => write_json(&serde_json::json!({ "providers": [] }))?,
                }
            } else {
                crate::ui::print_access_tree(tree.as_ref(), &search, &ui_cfg);
            }
        }
        Commands::Export(args) => match args.command {
            ExportCommand::Csv(args) => {
                let loaded = load_report(&engine, &args.report)?;
                let mut state = QueryState::new(
                    cfg.query.page_size,
                    args.sort.unwrap_or(cfg.query.sort_field),
                );
                if let Some(filter) = args.filter.as_deref() {
                    state.set_text_filter(filter);
                }
                if let Some(validation) = args.validation {
                    state.set_validation_filter(validation);
                }
                if args.desc {
                    state.set_sort(state.sort_field);
                }

                let view = crate::query::evaluate(&loaded.report.findings, &mut state);
                let csv = crate::export::findings_csv(&view.rows);
                let out = resolve_out(args.out, crate::export::CSV_EXPORT_NAME);
                write_output(out.as_deref(), &csv, &ui_cfg)?;
            }
            ExportCommand::Json(args) => {
                let loaded = load_report(&engine, &args.report)?;
                let out = resolve_out(args.out, crate::export::JSON_EXPORT_NAME);
                write_output(out.as_deref(), &loaded.raw, &ui_cfg)?;
            }
            ExportCommand::Access(args) => {
                let loaded = load_report(&engine, &args.report)?;
                let mut json = crate::export::access_rows_json(&loaded.report.access_map)?;
                json.push('\n');
                write_output(args.out.as_deref(), &json, &ui_cfg)?;
            }
        },
        Commands::Ui(args) => {
            if cli.json {
                return Err(crate::exit::invalid_args(
                    "ui cannot be combined with --json",
                ));
            }
            if !(ui_cfg.stdin_is_tty && ui_cfg.stdout_is_tty) {
                return Err(crate::exit::invalid_args(
                    "ui requires a TTY (stdin + stdout)",
                ));
            }
            let loaded = load_report(&engine, &args.report)?;
            crate::tui::run(loaded, ui_cfg.color, cfg.query.page_size, cfg.query.sort_field)?;
        }
        Commands::Completion(args) => {
            let shell = parse_shell(&args.shell)?;
            let mut cmd = Cli::command();
            let mut out = std::io::stdout().lock();
            clap_complete::generate(shell, &mut cmd, "scanview", &mut out);
        }
        Commands::Config(args) => {
            if args.show {
                if cli.json {
                    let stdout = std::io::stdout();
                    serde_json::to_writer_pretty(stdout.lock(), &cfg)?;
                } else {
                    println!("{}", toml::to_string_pretty(&cfg)?);
                }
            } else if !ui_cfg.quiet {
                eprintln!("config: use `scanview config --show`");
            }
        }
    }

    Ok(())
}

fn load_report(engine: &Engine, path: &Path) -> Result<LoadedReport> {
    let (source, raw) = read_payload(path)?;
    Ok(engine.load(&source, raw))
}

fn read_payload(path: &Path) -> Result<(String, String)> {
    use std::io::Read;

    if path.as_os_str() == "-" {
        let mut raw = String::new();
        io::stdin()
            .lock()
            .read_to_string(&mut raw)
            .context("Failed to read report from stdin")
            .map_err(crate::exit::load_failed_err)?;
        return Ok(("<stdin>".to_string(), raw));
    }

    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if ext != "json" && ext != "jsonl" {
        return Err(crate::exit::invalid_args(format!(
            "Report must be a JSON or JSONL file (got extension: {ext})"
        )));
    }

    let expanded = expand_tilde(path)?;
    if !expanded.exists() {
        return Err(crate::exit::invalid_args(format!(
            "Report not found: {}",
            expanded.display()
        )));
    }

    let raw = std::fs::read_to_string(&expanded)
        .with_context(|| format!("Failed to read report at {}", expanded.display()))
        .map_err(crate::exit::load_failed_err)?;
    Ok((expanded.display().to_string(), raw))
}

fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();
    if path_str == "~" || path_str.starts_with("~/") {
        let home = std::env::var("HOME")
            .context("Could not resolve home directory for tilde-expanded path")?;
        let trimmed = path_str.trim_start_matches("~/");
        return Ok(PathBuf::from(home).join(trimmed));
    }

    Ok(path.to_path_buf())
}

fn resolve_out(out: Option<PathBuf>, default_name: &str) -> Option<PathBuf> {
    out.map(|path| {
        if path.is_dir() {
            path.join(default_name)
        } else {
            path
        }
    })
}

fn write_output(out: Option<&Path>, content: &str, ui_cfg: &UiConfig) -> Result<()> {
    use std::io::Write;

    match out {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))
                .map_err(crate::exit::write_failed_err)?;
            if !ui_cfg.quiet {
                eprintln!("Wrote {}", path.display());
            }
            Ok(())
        }
        None => {
            let mut stdout = io::stdout().lock();
            match stdout.write_all(content.as_bytes()) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                Err(err) => Err(err.into()),
            }
        }
    }
}

fn write_json<T: Serialize>(value: &T) -> Result<()> {
    use std::io::Write;

    let buf = serde_json::to_vec_pretty(value)?;

    let mut stdout = io::stdout().lock();
    match stdout.write_all(&buf) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => return Ok(()),
        Err(err) => return Err(err.into()),
    }
    match stdout.write_all(b"\n") {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn parse_shell(s: &str) -> Result<clap_complete::Shell> {
    use clap_complete::Shell;

    match s.to_ascii_lowercase().as_str() {
        "bash" => Ok(Shell::Bash),
        "zsh" => Ok(Shell::Zsh),
        "fish" => Ok(Shell::Fish),
        "powershell" => Ok(Shell::PowerShell),
        "elvish" => Ok(Shell::Elvish),
        other => Err(crate::exit::invalid_args(format!(
            "Unsupported shell: {other} (expected bash|zsh|fish|powershell|elvish)"
        ))),
    }
}
