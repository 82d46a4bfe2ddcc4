//! CLI binary for expapyrus.
//!
//! A thin shim over the library crate: merges CLI flags with the persisted
//! settings file, builds one `Extractor` and runs it over every document.

use anyhow::{Context, Result};
use clap::Parser;
use expapyrus::pipeline::write;
use expapyrus::{
    EngineConfig, ExtractionConfig, ExtractionProgressCallback, Extractor, FormatMode,
    LanguageSet, ProgressCallback, Settings, Tesseract,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one progress bar per document plus a log line
/// per page. The bar is created in `on_extraction_start`, so a single
/// callback serves every document of the run.
struct CliProgressCallback {
    bar: Mutex<Option<ProgressBar>>,
    page_started: Mutex<Option<Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            bar: Mutex::new(None),
            page_started: Mutex::new(None),
            errors: AtomicUsize::new(0),
        })
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        if let Some(bar) = self.bar.lock().unwrap().as_ref() {
            f(bar);
        }
    }

    fn page_elapsed(&self) -> f64 {
        self.page_started
            .lock()
            .unwrap()
            .take()
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        let bar = ProgressBar::new(total_pages as u64);
        bar.set_style(style);
        bar.set_prefix("Recognising");
        bar.enable_steady_tick(Duration::from_millis(80));
        bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting OCR of {total_pages} pages…"))
        ));
        self.errors.store(0, Ordering::SeqCst);
        *self.bar.lock().unwrap() = Some(bar);
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        *self.page_started.lock().unwrap() = Some(Instant::now());
        self.with_bar(|bar| bar.set_message(format!("page {page_num}")));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        let elapsed = self.page_elapsed();
        self.with_bar(|bar| {
            bar.println(format!(
                "  {} Página {:>3}/{:<3}  {:<8}  {}",
                green("✓"),
                page_num,
                total,
                dim(&format!("{text_len:>5} chars")),
                dim(&format!("{elapsed:.1}s")),
            ));
            bar.inc(1);
        });
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let elapsed = self.page_elapsed();
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg: String = if error.chars().count() > 80 {
            let mut short: String = error.chars().take(79).collect();
            short.push('\u{2026}');
            short
        } else {
            error.to_string()
        };

        self.with_bar(|bar| {
            bar.println(format!(
                "  {} Página {:>3}/{:<3}  {}  {}",
                red("✗"),
                page_num,
                total,
                red(&msg),
                dim(&format!("{elapsed:.1}s")),
            ));
            bar.inc(1);
        });
    }

    fn on_extraction_complete(&self, total_pages: usize, success_count: usize) {
        if let Some(bar) = self.bar.lock().unwrap().take() {
            bar.finish_and_clear();
        }
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} pages recognised",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages recognised  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Extract text next to the source: scan_extracted_text.txt
  expapyrus scan.pdf

  # Spanish and Catalan only, 400 DPI, into another directory
  expapyrus -l spa+cat --dpi 400 -o ~/ocr scan.pdf

  # Several documents, timestamped output names
  expapyrus --timestamp *.pdf

  # Print to stdout instead of saving
  expapyrus --no-save scan.pdf

  # Keep paragraph breaks in the recognised text
  expapyrus --keep-paragraphs letter.pdf

  # JSON with per-page outcomes and timings
  expapyrus --json --no-save scan.pdf > scan.json

  # Remember the current options as defaults
  expapyrus -l eng --dpi 200 --save-settings

  # Undo saved defaults: save beside the source, plain names
  expapyrus --save --beside-source --no-timestamp --save-settings

OUTPUT FORMAT:
  Página 1

  <text of page 1>

  Página 2

  <text of page 2>

  Illegible handwriting (runs of dots or underscores) becomes
  [VOID DUE TO UNREADABLE HANDWRITTEN TEXT]; a page the OCR engine
  cannot process becomes [ERROR DE PROCESAMIENTO].

ENVIRONMENT VARIABLES:
  EXPAPYRUS_DPI        Default rendering DPI
  EXPAPYRUS_LANG       Default languages (e.g. eng+spa)
  TESSERACT_CMD        Path to the tesseract executable
  TESSDATA_DIR         Directory containing *.traineddata files
  PDFTOPPM_CMD         Path to the pdftoppm executable
  EXPAPYRUS_OUTPUT_DIR Directory for output files
  RUST_LOG             Log filter (overrides -v / -q)

SETUP:
  Debian/Ubuntu:  apt install tesseract-ocr tesseract-ocr-spa tesseract-ocr-cat poppler-utils
  macOS:          brew install tesseract tesseract-lang poppler
"#;

/// Extract text from scanned and handwritten PDFs with Tesseract OCR.
#[derive(Parser, Debug)]
#[command(
    name = "expapyrus",
    version,
    about = "Extract text from scanned and handwritten PDFs with Tesseract OCR",
    long_about = "Rasterise each page of a PDF, recognise it with Tesseract and save the cleaned \
text next to the source as <name>_extracted_text.txt, one \"Página N\" block per page.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF documents to process, one after another.
    #[arg(required_unless_present_any = ["list_langs", "recent", "save_settings"])]
    inputs: Vec<PathBuf>,

    /// Rendering DPI.
    #[arg(long, env = "EXPAPYRUS_DPI",
          value_parser = clap::value_parser!(u32).range(1..))]
    dpi: Option<u32>,

    /// OCR languages joined with '+', e.g. eng+spa+cat.
    #[arg(short, long = "lang", env = "EXPAPYRUS_LANG")]
    languages: Option<LanguageSet>,

    /// Path to the tesseract executable.
    #[arg(long, env = "TESSERACT_CMD")]
    tesseract: Option<PathBuf>,

    /// Directory containing the *.traineddata language files.
    #[arg(long, env = "TESSDATA_DIR")]
    tessdata_dir: Option<PathBuf>,

    /// Path to the pdftoppm executable.
    #[arg(long, env = "PDFTOPPM_CMD")]
    pdftoppm: Option<PathBuf>,

    /// Rasterise with pdfium instead of pdftoppm.
    #[cfg(feature = "pdfium")]
    #[arg(long)]
    pdfium: bool,

    /// Directory containing the pdfium shared library (default: system search path).
    #[cfg(feature = "pdfium")]
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Write output files here instead of beside each document.
    #[arg(short, long, env = "EXPAPYRUS_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Write output beside each document, ignoring any saved output directory.
    #[arg(long)]
    beside_source: bool,

    /// Add a _YYYYmmdd_HHMMSS timestamp to output file names.
    #[arg(long, overrides_with = "no_timestamp")]
    timestamp: bool,

    /// Use plain output file names, even if timestamps are the saved default.
    #[arg(long, overrides_with = "timestamp")]
    no_timestamp: bool,

    /// Save the text to a file, even if printing is the saved default.
    #[arg(long, overrides_with = "no_save")]
    save: bool,

    /// Print the text to stdout instead of saving it.
    #[arg(long, overrides_with = "save")]
    no_save: bool,

    /// Keep paragraph breaks instead of joining all lines.
    #[arg(long)]
    keep_paragraphs: bool,

    /// Output structured JSON (ExtractionOutput) on stdout.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "EXPAPYRUS_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,

    /// Settings file to read (and write with --save-settings).
    #[arg(long, value_name = "FILE")]
    settings: Option<PathBuf>,

    /// Persist the effective options as the new defaults.
    #[arg(long)]
    save_settings: bool,

    /// List the installed OCR languages and exit.
    #[arg(long)]
    list_langs: bool,

    /// Show recently processed documents and exit.
    #[arg(long)]
    recent: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Settings ─────────────────────────────────────────────────────────
    let settings_path = cli.settings.clone().or_else(Settings::default_path);
    let (mut settings, mut settings_writable) = match settings_path.as_deref() {
        Some(path) => load_settings(path),
        None => (Settings::default(), false),
    };

    if cli.recent {
        for path in &settings.recent_files {
            println!("{}", path.display());
        }
        return Ok(());
    }

    let engines = engine_config(&cli, &settings);

    if cli.list_langs {
        let tesseract = Tesseract::locate(&engines).context("Cannot locate Tesseract")?;
        for lang in tesseract
            .available_languages()
            .context("Cannot list installed languages")?
        {
            println!("{lang}");
        }
        return Ok(());
    }

    let options = resolve_options(&cli, &settings);
    let auto_save = options.auto_save;
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&options, progress_cb)?;

    if cli.save_settings {
        options.apply_to(&mut settings, &engines);
        save_settings(&settings, settings_path.as_deref(), cli.quiet)?;
        settings_writable = true;
        if cli.inputs.is_empty() {
            return Ok(());
        }
    }

    let extractor = build_extractor(&cli, config, &engines)?;

    // ── Run extraction ───────────────────────────────────────────────────
    let mut failed: Vec<PathBuf> = Vec::new();
    for document in &cli.inputs {
        match process_document(&cli, &extractor, document, auto_save, show_progress).await {
            Ok(()) => settings.add_recent(&absolute(document)),
            Err(e) => {
                eprintln!("{} {}: {:#}", red("✘"), document.display(), e);
                failed.push(document.clone());
            }
        }
    }

    if let Some(path) = settings_path.as_deref().filter(|_| settings_writable) {
        if let Err(e) = settings.save(path) {
            tracing::warn!("{}", e);
        }
    }

    if !failed.is_empty() {
        anyhow::bail!(
            "{} of {} documents failed",
            failed.len(),
            cli.inputs.len()
        );
    }
    Ok(())
}

/// Extract one document and either save or print the result.
async fn process_document(
    cli: &Cli,
    extractor: &Extractor,
    document: &Path,
    auto_save: bool,
    show_progress: bool,
) -> Result<()> {
    if auto_save && !cli.json {
        let (path, stats) = extractor
            .extract_to_file(document)
            .await
            .context("Extraction failed")?;
        if !cli.quiet {
            eprintln!(
                "{}  {}/{} pages  {}ms  →  {}",
                if stats.failed_pages == 0 {
                    green("✔")
                } else {
                    cyan("⚠")
                },
                stats.recognized_pages,
                stats.total_pages,
                stats.total_duration_ms,
                bold(&path.display().to_string()),
            );
        }
        return Ok(());
    }

    let output = extractor
        .extract(document)
        .await
        .context("Extraction failed")?;

    if auto_save {
        let path = write::output_path(
            document,
            &extractor.config().output,
            chrono::Local::now().naive_local(),
        );
        write::write_output(&path, &output.text).context("Failed to save output")?;
        if !cli.quiet {
            eprintln!("{} saved {}", green("✔"), bold(&path.display().to_string()));
        }
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.text.as_bytes())
            .context("Failed to write to stdout")?;
        if !output.text.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet && !show_progress && !cli.json {
        eprintln!(
            "Recognised {}/{} pages in {}ms",
            output.stats.recognized_pages, output.stats.total_pages, output.stats.total_duration_ms
        );
        if output.stats.failed_pages > 0 {
            eprintln!("  {} pages failed", output.stats.failed_pages);
        }
    }
    Ok(())
}

/// Flags win over the settings file, which wins over built-in defaults.
fn engine_config(cli: &Cli, settings: &Settings) -> EngineConfig {
    let base = settings.engine_config();
    EngineConfig {
        tesseract_cmd: cli.tesseract.clone().unwrap_or(base.tesseract_cmd),
        tessdata_dir: cli.tessdata_dir.clone().or(base.tessdata_dir),
        pdftoppm_cmd: cli.pdftoppm.clone().unwrap_or(base.pdftoppm_cmd),
    }
}

/// Options after merging flags over the settings file.
#[derive(Debug, Clone, PartialEq)]
struct RunOptions {
    dpi: u32,
    languages: LanguageSet,
    auto_save: bool,
    timestamped: bool,
    output_dir: Option<PathBuf>,
    format_mode: FormatMode,
}

impl RunOptions {
    /// Store these options (and the engine locations) as the new defaults.
    fn apply_to(&self, settings: &mut Settings, engines: &EngineConfig) {
        settings.default_dpi = self.dpi;
        settings.default_languages = self.languages.clone();
        settings.auto_save = self.auto_save;
        settings.timestamped_output = self.timestamped;
        settings.output_directory = self.output_dir.clone();
        settings.tesseract_cmd = Some(engines.tesseract_cmd.clone());
        settings.tessdata_dir = engines.tessdata_dir.clone();
        settings.pdftoppm_cmd = Some(engines.pdftoppm_cmd.clone());
    }
}

/// `Some(true)` for the positive flag, `Some(false)` for its negation,
/// `None` when neither was given.
fn flag_pair(on: bool, off: bool) -> Option<bool> {
    match (on, off) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    }
}

/// Flags win over the settings file. `--beside-source` clears any output
/// directory, including one from `-o`.
fn resolve_options(cli: &Cli, settings: &Settings) -> RunOptions {
    let output_dir = if cli.beside_source {
        None
    } else {
        cli.output_dir
            .clone()
            .or_else(|| settings.output_directory.clone())
    };
    RunOptions {
        dpi: cli.dpi.unwrap_or(settings.default_dpi),
        languages: cli
            .languages
            .clone()
            .unwrap_or_else(|| settings.default_languages.clone()),
        auto_save: flag_pair(cli.save, cli.no_save).unwrap_or(settings.auto_save),
        timestamped: flag_pair(cli.timestamp, cli.no_timestamp)
            .unwrap_or(settings.timestamped_output),
        output_dir,
        format_mode: if cli.keep_paragraphs {
            FormatMode::PreserveParagraphs
        } else {
            FormatMode::Collapse
        },
    }
}

/// Map the merged options to `ExtractionConfig`.
fn build_config(
    options: &RunOptions,
    progress: Option<ProgressCallback>,
) -> Result<ExtractionConfig> {
    let mut builder = ExtractionConfig::builder()
        .dpi(options.dpi)
        .languages(options.languages.clone())
        .timestamped_output(options.timestamped)
        .format_mode(options.format_mode);

    if let Some(dir) = options.output_dir.clone() {
        builder = builder.output_dir(dir);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Load the settings file. A file that exists but cannot be parsed is
/// reported and left untouched: the returned flag is `false` so the run does
/// not write defaults over it.
fn load_settings(path: &Path) -> (Settings, bool) {
    match Settings::try_load(path) {
        Ok(settings) => (settings, true),
        Err(e) => {
            eprintln!(
                "{} {}; using defaults and leaving the file unchanged",
                red("✘"),
                e
            );
            (Settings::default(), false)
        }
    }
}

#[cfg(not(feature = "pdfium"))]
fn build_extractor(_cli: &Cli, config: ExtractionConfig, engines: &EngineConfig) -> Result<Extractor> {
    Extractor::new(config, engines).context("OCR engine not ready")
}

#[cfg(feature = "pdfium")]
fn build_extractor(cli: &Cli, config: ExtractionConfig, engines: &EngineConfig) -> Result<Extractor> {
    use expapyrus::pipeline::render::PdfiumRasterizer;

    if !cli.pdfium {
        return Extractor::new(config, engines).context("OCR engine not ready");
    }
    let rasterizer =
        PdfiumRasterizer::new(cli.pdfium_lib.clone()).context("pdfium not available")?;
    let recognizer = Tesseract::new(engines, &config.languages).context("OCR engine not ready")?;
    Ok(Extractor::with_engines(
        config,
        Arc::new(rasterizer),
        Arc::new(recognizer),
    ))
}

fn save_settings(settings: &Settings, path: Option<&Path>, quiet: bool) -> Result<()> {
    let path = path.context("No settings location available; pass --settings <FILE>")?;
    settings.save(path).context("Failed to save settings")?;
    if !quiet {
        eprintln!("{} settings saved to {}", green("✔"), path.display());
    }
    Ok(())
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["expapyrus"];
        argv.extend_from_slice(args);
        argv.push("scan.pdf");
        Cli::try_parse_from(argv).unwrap()
    }

    fn saved() -> Settings {
        Settings {
            auto_save: false,
            timestamped_output: true,
            output_directory: Some(PathBuf::from("/srv/ocr")),
            default_dpi: 200,
            ..Settings::default()
        }
    }

    #[test]
    fn settings_used_when_no_flags() {
        let opts = resolve_options(&parse(&[]), &saved());
        assert!(!opts.auto_save);
        assert!(opts.timestamped);
        assert_eq!(opts.output_dir, Some(PathBuf::from("/srv/ocr")));
        assert_eq!(opts.dpi, 200);
    }

    #[test]
    fn saved_defaults_can_be_switched_off() {
        let opts = resolve_options(
            &parse(&["--save", "--no-timestamp", "--beside-source"]),
            &saved(),
        );
        assert!(opts.auto_save);
        assert!(!opts.timestamped);
        assert_eq!(opts.output_dir, None);
    }

    #[test]
    fn last_of_paired_flags_wins() {
        let opts = resolve_options(&parse(&["--no-save", "--save"]), &Settings::default());
        assert!(opts.auto_save);
        let opts = resolve_options(&parse(&["--save", "--no-save"]), &Settings::default());
        assert!(!opts.auto_save);
        let opts = resolve_options(
            &parse(&["--timestamp", "--no-timestamp"]),
            &Settings::default(),
        );
        assert!(!opts.timestamped);
    }

    #[test]
    fn save_settings_round_trip_clears_options() {
        let engines = EngineConfig::default();
        let mut settings = Settings::default();

        resolve_options(&parse(&["--no-save", "--timestamp", "-o", "/tmp/out"]), &settings)
            .apply_to(&mut settings, &engines);
        assert!(!settings.auto_save);
        assert!(settings.timestamped_output);
        assert_eq!(settings.output_directory, Some(PathBuf::from("/tmp/out")));

        resolve_options(
            &parse(&["--save", "--no-timestamp", "--beside-source"]),
            &settings,
        )
        .apply_to(&mut settings, &engines);
        assert!(settings.auto_save);
        assert!(!settings.timestamped_output);
        assert_eq!(settings.output_directory, None);
    }

    #[test]
    fn corrupt_settings_file_is_not_writable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();

        let (settings, writable) = load_settings(&path);
        assert_eq!(settings, Settings::default());
        assert!(!writable);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{ not json");

        let (_, writable) = load_settings(&dir.path().join("missing.json"));
        assert!(writable);
    }
}
