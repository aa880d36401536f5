use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use crate::cli::{execute, OutputFormat, Prepared, RunArgs};
use crate::engine::coverage::DepthTable;
use crate::engine::frequency::FrequencyRecord;
use crate::engine::run::{RunOutput, RunStats};
use crate::utils::validation::check_output_path;

#[derive(Args)]
pub struct FrequenciesArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Write the mutation table (CSV) to this file
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write per-position read depth (CSV) to this file
    #[arg(long)]
    pub coverage_output: Option<PathBuf>,

    /// Overwrite existing output files
    #[arg(long)]
    pub force: bool,

    /// Keep results accumulated before a read error instead of failing
    #[arg(long)]
    pub allow_truncated: bool,
}

/// Summary of one run, printed before the mutation table
#[derive(Debug, Serialize)]
struct RunSummary {
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference: Option<ReferenceSummary>,
    genome_length: usize,
    paired: bool,
    records_filtered: u64,
    #[serde(flatten)]
    stats: RunStats,
    distinct_mutations: usize,
    reported_mutations: usize,
    covered_positions: usize,
}

#[derive(Debug, Serialize)]
struct ReferenceSummary {
    name: String,
    md5: String,
}

/// Execute frequencies subcommand
///
/// # Errors
///
/// Returns an error if an output file exists without `--force`, the inputs
/// cannot be read, or the outputs cannot be written.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: FrequenciesArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    // Check outputs before spending time on the reads
    for path in [&args.output, &args.coverage_output].into_iter().flatten() {
        check_output_path(path, args.force)?;
    }

    let prepared = args.run.prepare()?;
    if verbose {
        eprintln!(
            "Genome length {}, alphabet {}, min quality {}, {}",
            prepared.config.extract.genome_length,
            prepared.config.extract.alphabet,
            prepared.config.extract.min_quality,
            if prepared.config.paired { "paired-end" } else { "single-end" },
        );
    }

    let (output, filtered) = execute(&args.run, &prepared, args.allow_truncated, |_| {})?;
    let records: Vec<FrequencyRecord> = output.frequencies().collect();
    let summary = summarize(&args.run, &prepared, &output, filtered, records.len());

    if let Some(path) = &args.output {
        write_mutation_csv(path, &records)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    if let Some(path) = &args.coverage_output {
        write_coverage_csv(path, &output.depth)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    match format {
        OutputFormat::Text => print_text_results(&summary, &records, verbose),
        OutputFormat::Json => print_json_results(&summary, &records)?,
        OutputFormat::Tsv | OutputFormat::Csv => {
            let delimiter = format.delimiter().unwrap_or(b'\t');
            write_mutation_table(io::stdout().lock(), &records, delimiter)?;
        }
    }

    Ok(())
}

fn summarize(
    args: &RunArgs,
    prepared: &Prepared,
    output: &RunOutput,
    filtered: u64,
    reported: usize,
) -> RunSummary {
    RunSummary {
        input: args.input.display().to_string(),
        reference: prepared.reference.as_ref().map(|r| ReferenceSummary {
            name: r.name.clone(),
            md5: r.md5.clone(),
        }),
        genome_length: prepared.config.extract.genome_length,
        paired: prepared.config.paired,
        records_filtered: filtered,
        stats: output.stats.clone(),
        distinct_mutations: output.distinct_mutations(),
        reported_mutations: reported,
        covered_positions: output.depth.covered_positions(),
    }
}

/// Mutation table columns shared by file and stdout output
const MUTATION_COLUMNS: [&str; 5] = ["position", "label", "mutation", "frequency", "coverage"];

/// One mutation table row; labels are written untouched and quoted as needed
#[derive(Serialize)]
struct MutationRow<'a> {
    position: usize,
    label: &'a str,
    mutation: &'a str,
    frequency: f64,
    coverage: u32,
}

impl<'a> From<&'a FrequencyRecord> for MutationRow<'a> {
    fn from(record: &'a FrequencyRecord) -> Self {
        Self {
            position: record.position,
            label: record.label.as_deref().unwrap_or(""),
            mutation: &record.mutation,
            frequency: record.frequency,
            coverage: record.coverage,
        }
    }
}

/// Write the header and one row per record. The header is written even when
/// there are no records.
fn write_mutation_table<W: Write>(
    out: W,
    records: &[FrequencyRecord],
    delimiter: u8,
) -> csv::Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_writer(out);
    writer.write_record(MUTATION_COLUMNS)?;
    for record in records {
        writer.serialize(MutationRow::from(record))?;
    }
    writer.flush()?;
    Ok(())
}

fn write_mutation_csv(path: &Path, records: &[FrequencyRecord]) -> csv::Result<()> {
    let file = std::fs::File::create(path)?;
    write_mutation_table(io::BufWriter::new(file), records, b',')
}

fn write_coverage_csv(path: &Path, depth: &DepthTable) -> csv::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["position", "coverage"])?;
    for (pos, d) in depth.as_slice().iter().enumerate() {
        writer.serialize((pos + 1, d))?;
    }
    writer.flush()?;
    Ok(())
}

fn print_text_results(summary: &RunSummary, records: &[FrequencyRecord], verbose: bool) {
    println!("Input: {}", summary.input);
    if let Some(reference) = &summary.reference {
        println!("Reference: {} (md5 {})", reference.name, reference.md5);
    }
    println!(
        "Genome length: {} ({} covered)",
        summary.genome_length, summary.covered_positions
    );

    let stats = &summary.stats;
    println!(
        "Records: {} read, {} filtered, {} without mate",
        stats.records, summary.records_filtered, stats.unpaired
    );
    println!(
        "Fragments: {} processed, {} skipped (CIGAR), {} skipped (shape)",
        stats.fragments, stats.skipped_records, stats.skipped_pairs
    );
    if stats.masked_diffs > 0 {
        println!("Masked diffs: {}", stats.masked_diffs);
    }
    println!(
        "Mutations: {} reported of {} observed",
        summary.reported_mutations, summary.distinct_mutations
    );

    if records.is_empty() {
        println!("\nNo mutations found.");
        return;
    }

    println!();
    println!(
        "{:>8}  {:<24} {:<20} {:>10} {:>8}",
        "Position", "Mutation", "Label", "Frequency", "Depth"
    );
    for record in records {
        println!(
            "{:>8}  {:<24} {:<20} {:>10.4} {:>8}",
            record.position,
            record.mutation,
            record.label.as_deref().unwrap_or("-"),
            record.frequency,
            record.coverage,
        );
    }

    if verbose {
        let low_depth = records.iter().filter(|r| r.coverage < 10).count();
        if low_depth > 0 {
            eprintln!("{low_depth} mutation(s) sit at positions with depth below 10");
        }
    }
}

fn print_json_results(summary: &RunSummary, records: &[FrequencyRecord]) -> anyhow::Result<()> {
    let output = serde_json::json!({
        "summary": summary,
        "mutations": records,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
