use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use cimgrid_cgmes::{convert, CgmesModel};
use cimgrid_core::{ConversionReport, Severity};
use tracing::info;

use cimgrid_cli::config::load_config;

pub struct ConvertArgs<'a> {
    pub input: &'a Path,
    pub output: Option<&'a Path>,
    pub config: Option<&'a Path>,
    pub diagnostics: Option<&'a Path>,
    pub strict: bool,
    pub verbose: bool,
}

pub fn handle(args: &ConvertArgs) -> Result<()> {
    if !args.input.exists() {
        bail!("Input '{}' does not exist", args.input.display());
    }
    let config = load_config(args.config)?;
    let model = CgmesModel::from_path(args.input)
        .with_context(|| format!("reading CGMES document {}", args.input.display()))?;
    info!("Converting {}", args.input.display());
    let (network, report) = convert(&model, &config)
        .with_context(|| format!("converting {}", args.input.display()))?;

    if args.verbose {
        print_issues(&report);
    }
    if let Some(path) = args.diagnostics {
        write_json(path, &report)?;
        info!("Conversion report written to {}", path.display());
    }

    // Strict mode: nothing is written when equipment was rejected
    if args.strict && report.diagnostics.has_invalid() {
        let messages: Vec<String> = report
            .diagnostics
            .with_severity(Severity::Invalid)
            .map(|issue| issue.to_string())
            .collect();
        bail!(
            "Strict mode: {} invalid equipment:\n  - {}",
            messages.len(),
            messages.join("\n  - ")
        );
    }

    match args.output {
        Some(path) => {
            write_json(path, &network)?;
            println!("Converted {} -> {}", args.input.display(), path.display());
            println!("{}", report.summary());
        }
        None => {
            let stdout = io::stdout();
            let mut out = stdout.lock();
            serde_json::to_writer_pretty(&mut out, &network)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn print_issues(report: &ConversionReport) {
    let diag = &report.diagnostics;
    if !diag.has_issues() {
        eprintln!("Conversion completed with no issues");
        return;
    }
    eprintln!("\nConversion issues ({}):", diag.summary());
    for issue in &diag.issues {
        eprintln!("   {}", issue);
    }
    eprintln!();
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("writing {}", path.display()))?;
    writer.flush()?;
    Ok(())
}
