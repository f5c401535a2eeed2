//! The `squash compress` command: read files, run the pipeline, write outputs.

use std::collections::HashSet;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, ValueEnum};
use squash_core::{
    compression_plan, BatchSummary, CompressionPlan, Compressor, Config, DiscoveredFile,
    FileDiscovery, FileRecord, OutputFile, ReportFormat, ReportWriter, SourceFile, TargetFormat,
};

/// Arguments for the `compress` command.
#[derive(Args, Debug)]
pub struct CompressArgs {
    /// Image files or directories to compress
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// Output directory [default: `[output] dir` from config]
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Longest edge of compressed images, in pixels
    #[arg(long)]
    pub max_side: Option<u32>,

    /// Lossy encode quality in (0, 1]
    #[arg(short, long)]
    pub quality: Option<f32>,

    /// Output image format
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Number of concurrent workers
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Print a per-file report to stdout (format defaults to `[output] report_format`)
    #[arg(long, value_enum)]
    pub report: Option<Option<ReportArg>>,
}

/// Output image formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum FormatArg {
    /// Lossy WebP (default)
    Webp,
    /// Baseline JPEG
    Jpeg,
}

impl From<FormatArg> for TargetFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Webp => TargetFormat::Webp,
            FormatArg::Jpeg => TargetFormat::Jpeg,
        }
    }
}

/// Report formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ReportArg {
    /// Single JSON array
    Json,
    /// One JSON object per line
    Jsonl,
}

impl From<ReportArg> for ReportFormat {
    fn from(arg: ReportArg) -> Self {
        match arg {
            ReportArg::Json => ReportFormat::Json,
            ReportArg::Jsonl => ReportFormat::JsonLines,
        }
    }
}

impl CompressArgs {
    /// Fold command-line overrides into the loaded config.
    fn apply(&self, config: &mut Config) {
        if let Some(max_side) = self.max_side {
            config.compression.max_side = max_side;
        }
        if let Some(quality) = self.quality {
            config.compression.quality = quality;
        }
        if let Some(format) = self.format {
            config.compression.format = format.into();
        }
        if let Some(parallel) = self.parallel {
            config.processing.parallel_workers = parallel;
        }
    }

    /// Report format requested on the command line, if any.
    fn report_format(&self, config: &Config) -> Option<ReportFormat> {
        match self.report? {
            Some(arg) => Some(arg.into()),
            None => ReportFormat::parse(&config.output.report_format),
        }
    }
}

/// Execute the compress command.
pub async fn execute(mut config: Config, args: CompressArgs) -> anyhow::Result<()> {
    args.apply(&mut config);
    config.validate()?;

    let options = config.compression.options();
    let output_dir = args.output.clone().unwrap_or_else(|| config.output_dir());

    let (discovered, rejected) = discover_inputs(&args.inputs);
    if discovered.is_empty() {
        anyhow::bail!("No supported images found in the given inputs");
    }
    let input_bytes = FileDiscovery::total_size(&discovered);
    tracing::info!(
        "Found {} image(s) ({:.1} MB)",
        discovered.len(),
        input_bytes as f64 / 1_000_000.0
    );

    let files = load_files(&discovered).await?;
    let bypassed = files
        .iter()
        .filter(|f| compression_plan(f) == CompressionPlan::Bypass)
        .count();
    let mut summary = BatchSummary::new(input_bytes, files.len(), bypassed, rejected);

    let compressor = Compressor::new(&config);
    let progress = create_progress_bar(files.len() as u64);
    let start = Instant::now();

    let result = compressor
        .compress_many_with_progress(files, &options, |output| {
            progress.inc(1);
            progress.set_message(output.name.clone());
        })
        .await;
    progress.finish_and_clear();
    let outputs = result?;

    std::fs::create_dir_all(&output_dir)?;
    let records = write_outputs(&output_dir, &outputs)?;
    summary.finish(&records, start.elapsed());
    tracing::info!("Output written to {:?}", output_dir);

    if let Some(format) = args.report_format(&config) {
        let stdout = std::io::stdout();
        let mut writer = ReportWriter::new(BufWriter::new(stdout.lock()), format);
        writer.write_all(&records)?;
        writer.flush()?;
    }

    print_summary(&summary);
    Ok(())
}

/// Expand inputs into allowed image files. Returns the files and the number
/// of explicitly named inputs that were skipped.
fn discover_inputs(inputs: &[PathBuf]) -> (Vec<DiscoveredFile>, usize) {
    let discovery = FileDiscovery::new();
    let mut files = Vec::new();
    let mut rejected = 0;

    for input in inputs {
        if !input.exists() {
            tracing::warn!("Input not found: {:?}", input);
            rejected += 1;
            continue;
        }
        if input.is_file() && !FileDiscovery::is_supported(input) {
            tracing::warn!("Skipping unsupported file: {:?}", input);
            rejected += 1;
            continue;
        }
        files.extend(discovery.discover(input));
    }

    (files, rejected)
}

/// Read discovered files into memory. The type is left empty so the
/// pipeline classifies by extension.
async fn load_files(discovered: &[DiscoveredFile]) -> anyhow::Result<Vec<SourceFile>> {
    let mut files = Vec::with_capacity(discovered.len());
    for file in discovered {
        let bytes = tokio::fs::read(&file.path).await?;
        files.push(SourceFile::new(file_name(&file.path), "", bytes));
    }
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Write each output into `dir`. A name already written in this run gets a
/// numeric suffix (`a.webp`, `a-1.webp`, ...) so no output is lost.
fn write_outputs(dir: &Path, outputs: &[OutputFile]) -> anyhow::Result<Vec<FileRecord>> {
    let mut written: HashSet<String> = HashSet::with_capacity(outputs.len());
    let mut records = Vec::with_capacity(outputs.len());

    for output in outputs {
        let name = unique_name(&output.name, &written);
        if name != output.name {
            tracing::warn!("{} already written in this batch, saving as {}", output.name, name);
        }
        let path = dir.join(&name);
        std::fs::write(&path, &output.bytes[..])?;
        tracing::debug!("Wrote {:?} ({} bytes)", path, output.len());

        let mut record = FileRecord::from(output);
        record.name = name.clone();
        records.push(record);
        written.insert(name);
    }

    Ok(records)
}

/// First of `name`, `stem-1.ext`, `stem-2.ext`, ... not in `taken`.
fn unique_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    (1..)
        .map(|n| match ext {
            Some(ext) => format!("{stem}-{n}.{ext}"),
            None => format!("{stem}-{n}"),
        })
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

/// Create a progress bar for batch compression.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
        )
        .map(|s| s.progress_chars("##-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after compression.
fn print_summary(summary: &BatchSummary) {
    let compressed = summary.files - summary.bypassed;
    let saved = summary.input_bytes.saturating_sub(summary.output_bytes);

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Compressed:   {:>8}", compressed);
    if summary.bypassed > 0 {
        eprintln!("    Passed:       {:>8}", summary.bypassed);
    }
    if summary.rejected > 0 {
        eprintln!("    Rejected:     {:>8}", summary.rejected);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Input:        {:>7.1} MB", summary.input_bytes as f64 / 1_000_000.0);
    eprintln!("    Output:       {:>7.1} MB", summary.output_bytes as f64 / 1_000_000.0);
    eprintln!("    Saved:        {:>7.1} MB", saved as f64 / 1_000_000.0);
    eprintln!("    Ratio:        {:>7.1}%", summary.ratio() * 100.0);
    eprintln!("    Duration:     {:>7.1}s", summary.elapsed_ms as f64 / 1000.0);
    eprintln!("  ====================================");
}
