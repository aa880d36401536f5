use std::io::{self, Write};

use clap::Args;
use serde::Serialize;

use crate::cli::{execute, OutputFormat, RunArgs};
use crate::core::types::DiffEvent;
use crate::engine::locator::MutationLocator;
use crate::engine::run::FragmentDiffs;

#[derive(Args)]
pub struct DiffsArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Also print fragments that retained no diffs
    #[arg(long)]
    pub all: bool,
}

/// Execute diffs subcommand
///
/// Every fragment is printed as soon as it is merged. JSON output is one
/// object per line.
///
/// # Errors
///
/// Returns an error if the inputs cannot be read or the stream fails.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: DiffsArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let prepared = args.run.prepare()?;
    let locator = prepared.locator();

    let mut table = format.delimiter().map(|delimiter| {
        csv::WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .from_writer(io::stdout())
    });
    if let Some(writer) = table.as_mut() {
        writer.write_record(DIFF_COLUMNS)?;
    }

    let mut write_error: Option<anyhow::Error> = None;
    let (output, filtered) = execute(&args.run, &prepared, false, |fragment| {
        if write_error.is_some() || (fragment.diffs.is_empty() && !args.all) {
            return;
        }
        let result: anyhow::Result<()> = match (format, table.as_mut()) {
            (OutputFormat::Text, _) => {
                print_text_fragment(fragment, locator.as_ref());
                Ok(())
            }
            (OutputFormat::Json, _) => print_json_fragment(fragment, locator.as_ref()),
            (OutputFormat::Tsv | OutputFormat::Csv, Some(writer)) => {
                write_fragment_rows(writer, fragment, locator.as_ref()).map_err(Into::into)
            }
            (OutputFormat::Tsv | OutputFormat::Csv, None) => Ok(()),
        };
        if let Err(e) = result {
            write_error = Some(e);
        }
    })?;

    if let Some(e) = write_error {
        return Err(e);
    }
    if let Some(mut writer) = table {
        writer.flush()?;
    }

    if verbose {
        eprintln!(
            "{} fragments from {} records ({} filtered, {} without mate)",
            output.stats.fragments, output.stats.records, filtered, output.stats.unpaired
        );
    }

    Ok(())
}

/// Columns of the per-diff table
const DIFF_COLUMNS: [&str; 5] = ["qname", "position", "type", "mutation", "label"];

#[derive(Serialize)]
struct DiffRow<'a> {
    qname: &'a str,
    position: usize,
    #[serde(rename = "type")]
    kind: &'static str,
    mutation: String,
    label: String,
}

fn type_name(diff: &DiffEvent) -> &'static str {
    match diff {
        DiffEvent::Substitution { .. } => "substitution",
        DiffEvent::Insertion { .. } => "insertion",
        DiffEvent::Deletion { .. } => "deletion",
    }
}

fn print_text_fragment(fragment: &FragmentDiffs, locator: &dyn MutationLocator) {
    let coverage: Vec<String> = fragment.coverage.iter().map(ToString::to_string).collect();
    let diffs: Vec<String> = fragment
        .diffs
        .iter()
        .map(|d| match locator.locate(d) {
            Some(label) => format!("{d} ({label})"),
            None => d.to_string(),
        })
        .collect();

    println!(
        "{}\tcoverage {}\t{}",
        fragment.qname,
        coverage.join(" "),
        if diffs.is_empty() { "-".to_string() } else { diffs.join(", ") }
    );
}

fn print_json_fragment(
    fragment: &FragmentDiffs,
    locator: &dyn MutationLocator,
) -> anyhow::Result<()> {
    let labels: Vec<Option<String>> = fragment.diffs.iter().map(|d| locator.locate(d)).collect();
    let json = serde_json::json!({
        "qname": fragment.qname,
        "diffs": fragment.diffs,
        "labels": labels,
        "coverage": fragment.coverage,
    });
    println!("{}", serde_json::to_string(&json)?);
    Ok(())
}

/// One row per diff, 1-indexed
fn write_fragment_rows<W: Write>(
    writer: &mut csv::Writer<W>,
    fragment: &FragmentDiffs,
    locator: &dyn MutationLocator,
) -> csv::Result<()> {
    for diff in &fragment.diffs {
        writer.serialize(DiffRow {
            qname: &fragment.qname,
            position: diff.pos() + 1,
            kind: type_name(diff),
            mutation: diff.key(),
            label: locator.locate(diff).unwrap_or_default(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Interval;

    #[test]
    fn test_fragment_rows_quote_labels() {
        let fragment = FragmentDiffs {
            qname: "frag1".to_string(),
            diffs: vec![
                DiffEvent::Substitution { pos: 23_402, nt: 'G' },
                DiffEvent::Deletion {
                    pos: 11_287,
                    length: 9,
                },
            ],
            coverage: vec![Interval::new(0, 29_903)],
        };
        let locator = |diff: &DiffEvent| match diff {
            DiffEvent::Substitution { .. } => Some("aa:S:D614G,aa:orf1b:P314L".to_string()),
            _ => None,
        };

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        write_fragment_rows(&mut writer, &fragment, &locator).unwrap();
        let text = String::from_utf8(writer.into_inner().unwrap()).unwrap();

        assert_eq!(
            text,
            "frag1,23403,substitution,~23403G,\"aa:S:D614G,aa:orf1b:P314L\"\n\
             frag1,11288,deletion,-11288.9,\n"
        );
    }
}
