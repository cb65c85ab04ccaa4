//! Headless command-line front end for the viewer.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use paperview_cache::PageCache;
use paperview_engine::{LopdfBackend, OpenSource, RenderEngine};
use paperview_scheduler::RenderQueue;
use paperview_viewer::{
    DocumentSource, DocumentViewer, ProtectionPolicy, ViewMode, ViewerAction, ViewerConfig,
    ViewerEvents, ViewerPhase, Watermark,
};
use serde::Serialize;
use simplelog::{ColorChoice, Config as LogConfig, TermLogger, TerminalMode};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Parser)]
#[command(name = "paperview-cli")]
#[command(about = "PaperView CLI")]
pub struct Cli {
    /// Log scheduling and cache activity to stderr.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print machine-readable document metadata.
    Info {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Run a headless viewer session and report what rendered.
    View {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Comma-separated visible pages, e.g. "12,13".
        #[arg(long)]
        pages: Option<String>,
        #[arg(long, value_enum, default_value_t = ModeArg::ContinuousScroll)]
        mode: ModeArg,
        /// Overlay watermark text on every rendered page.
        #[arg(long)]
        watermark: Option<String>,
    },
    /// Render one page to a PNG file.
    ExportPage {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 1.0)]
        scale: f32,
        #[arg(long)]
        output: Option<PathBuf>,
        /// Treat the document as protected; export actions are refused.
        #[arg(long)]
        protected: bool,
    },
    /// Print CLI version.
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum ModeArg {
    SinglePage,
    ContinuousScroll,
}

impl From<ModeArg> for ViewMode {
    fn from(value: ModeArg) -> Self {
        match value {
            ModeArg::SinglePage => ViewMode::SinglePage,
            ModeArg::ContinuousScroll => ViewMode::ContinuousScroll,
        }
    }
}

#[derive(Debug, Serialize)]
struct InfoOutput {
    path: String,
    page_count: u32,
    first_page_size_pt: Option<PageSizeOutput>,
}

#[derive(Debug, Serialize)]
struct PageSizeOutput {
    width: f32,
    height: f32,
}

#[derive(Debug, Serialize)]
struct ViewOutput {
    path: String,
    phase: String,
    page_count: u32,
    current_page: u32,
    rendered_pages: Vec<u32>,
    renders_completed: u64,
    renders_cancelled: u64,
    cache_resident: usize,
    cache_evictions: u64,
    errors: Vec<String>,
}

pub fn run<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = Cli::parse_from(args);

    let level = if cli.verbose { LevelFilter::Debug } else { LevelFilter::Warn };
    // A second init (tests calling run twice in-process) is not fatal.
    let _ = TermLogger::init(level, LogConfig::default(), TerminalMode::Stderr, ColorChoice::Auto);

    match cli.command {
        Commands::Info { file } => run_info(&file),
        Commands::View { file, pages, mode, watermark } => {
            run_view(&file, pages.as_deref(), mode.into(), watermark)
        }
        Commands::ExportPage { file, page, scale, output, protected } => {
            run_export_page(&file, page, scale, output.as_deref(), protected)
        }
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn run_info(file: &Path) -> Result<()> {
    ensure_document_exists(file)?;

    let mut engine = LopdfBackend::new();
    let handle = engine.open(OpenSource::from(file)).context("failed to open document")?;

    let page_count = engine.page_count(handle)?;
    let first_page_size_pt = if page_count > 0 {
        let size = engine.page_size(handle, 1)?;
        Some(PageSizeOutput { width: size.width_pt, height: size.height_pt })
    } else {
        None
    };

    let payload = InfoOutput { path: file.display().to_string(), page_count, first_page_size_pt };
    println!("{}", serde_json::to_string_pretty(&payload)?);

    engine.close(handle)?;
    Ok(())
}

fn run_view(
    file: &Path,
    pages: Option<&str>,
    mode: ViewMode,
    watermark: Option<String>,
) -> Result<()> {
    ensure_document_exists(file)?;

    let mut config = ViewerConfig::new(DocumentSource::path(file)).with_view_mode(mode);
    if let Some(text) = watermark {
        config = config.with_watermark(Watermark::new(text));
    }

    let errors: Arc<Mutex<Vec<String>>> = Arc::default();
    let sink = Arc::clone(&errors);
    let events = ViewerEvents::new()
        .on_error(move |err| sink.lock().unwrap().push(err.reason_code().to_string()));

    let queue = Arc::new(RenderQueue::new());
    let cache = Arc::new(PageCache::new(16));
    let mut viewer = DocumentViewer::new(
        LopdfBackend::new(),
        Arc::clone(&queue),
        Arc::clone(&cache),
        config,
        events,
    );

    viewer.mount();
    viewer.settle();

    if let Some(list) = pages {
        let visible = parse_pages(list)?;
        viewer.set_visible_pages(&visible);
        viewer.settle();
    }

    let queue_stats = queue.stats();
    let cache_stats = cache.stats();
    let payload = ViewOutput {
        path: file.display().to_string(),
        phase: phase_name(viewer.phase()).to_string(),
        page_count: viewer.page_count(),
        current_page: viewer.current_page(),
        rendered_pages: viewer.rendered_pages(),
        renders_completed: queue_stats.jobs_completed,
        renders_cancelled: queue_stats.jobs_cancelled,
        cache_resident: cache_stats.resident_pages,
        cache_evictions: cache_stats.evictions,
        errors: errors.lock().unwrap().clone(),
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);

    if viewer.phase() == ViewerPhase::Error {
        anyhow::bail!("viewer session ended in an error state");
    }
    Ok(())
}

fn run_export_page(
    file: &Path,
    page: u32,
    scale: f32,
    output: Option<&Path>,
    protected: bool,
) -> Result<()> {
    ensure_document_exists(file)?;

    if page == 0 {
        anyhow::bail!("--page is 1-based and must be >= 1");
    }

    let protection =
        if protected { ProtectionPolicy::enabled() } else { ProtectionPolicy::disabled() };
    if protection.blocks(ViewerAction::Save) {
        anyhow::bail!("saving pages of a protected document is not permitted");
    }

    let mut engine = LopdfBackend::new();
    let handle = engine.open(OpenSource::from(file)).context("failed to open document")?;
    let surface = engine
        .render_page(
            handle,
            paperview_engine::RenderParams { page_number: page, scale },
        )
        .context("failed to render page")?;

    let output = output.map(ToOwned::to_owned).unwrap_or_else(|| default_export_output(file, page));
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    surface
        .save(&output)
        .with_context(|| format!("failed to write image to {}", output.display()))?;

    println!("{}", output.display());

    engine.close(handle)?;
    Ok(())
}

fn parse_pages(list: &str) -> Result<Vec<u32>> {
    list.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u32>().with_context(|| format!("invalid page number: {part}")))
        .collect()
}

fn phase_name(phase: ViewerPhase) -> &'static str {
    match phase {
        ViewerPhase::Idle => "idle",
        ViewerPhase::Loading => "loading",
        ViewerPhase::Rendering => "rendering",
        ViewerPhase::Ready => "ready",
        ViewerPhase::Error => "error",
        ViewerPhase::Destroyed => "destroyed",
    }
}

fn ensure_document_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("file does not exist: {}", path.display());
    }
    if !path.is_file() {
        anyhow::bail!("path is not a file: {}", path.display());
    }
    Ok(())
}

fn default_export_output(file: &Path, page: u32) -> PathBuf {
    let stem = file.file_stem().and_then(|name| name.to_str()).unwrap_or("page");
    file.with_file_name(format!("{stem}-page-{page}.png"))
}
