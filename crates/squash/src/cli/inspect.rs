//! The `squash inspect` command: classify files without decoding them.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::Args;
use serde::Serialize;
use squash_core::{classify, compression_plan, is_allowed, CompressionPlan, FileDiscovery, SourceFile};

/// Arguments for the `inspect` command.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Image files or directories to inspect
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,
}

/// One line of `inspect` output.
#[derive(Debug, Serialize)]
pub struct InspectRecord {
    pub path: PathBuf,
    pub media_type: String,
    pub allowed: bool,
    /// `None` when the file would be rejected
    pub plan: Option<CompressionPlan>,
    pub size: u64,
}

impl InspectRecord {
    fn new(path: &Path, size: u64) -> Self {
        // Classification only looks at the name, so no bytes are read.
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = SourceFile::new(name, "", Vec::<u8>::new());
        let allowed = is_allowed(&file);

        Self {
            path: path.to_path_buf(),
            media_type: classify(&file).to_string(),
            allowed,
            plan: allowed.then(|| compression_plan(&file)),
            size,
        }
    }
}

/// Execute the inspect command.
pub async fn execute(args: InspectArgs) -> anyhow::Result<()> {
    let records = collect(&args.inputs);
    tracing::debug!("Inspected {} file(s)", records.len());

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for record in &records {
        serde_json::to_writer(&mut out, record)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Named files are always reported, even when not allowed; directories
/// contribute only allowed files.
fn collect(inputs: &[PathBuf]) -> Vec<InspectRecord> {
    let discovery = FileDiscovery::new();
    let mut records = Vec::new();

    for input in inputs {
        if input.is_file() {
            let size = std::fs::metadata(input).map(|m| m.len()).unwrap_or(0);
            records.push(InspectRecord::new(input, size));
        } else if input.is_dir() {
            records.extend(
                discovery
                    .discover(input)
                    .iter()
                    .map(|f| InspectRecord::new(&f.path, f.size)),
            );
        } else {
            tracing::warn!("Input not found: {:?}", input);
        }
    }

    records
}
