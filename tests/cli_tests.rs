//! Command-line tests running the compiled binary on small fixtures

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const REFERENCE: &str = ">ref test reference\nACGTCACGTA\nCGTACGTACG\n";

// p1 carries C5T in both mates, p2 matches the reference, u1 is unmapped
const SAM: &str = "@HD\tVN:1.6\tSO:unsorted
@SQ\tSN:ref\tLN:20
p1\t99\tref\t1\t60\t4=1X15=\t=\t1\t20\tACGTTACGTACGTACGTACG\tIIIIIIIIIIIIIIIIIIII
p2\t99\tref\t1\t60\t20=\t=\t1\t20\tACGTCACGTACGTACGTACG\tIIIIIIIIIIIIIIIIIIII
u1\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\tIIII
p1\t147\tref\t1\t60\t4=1X15=\t=\t1\t-20\tACGTTACGTACGTACGTACG\tIIIIIIIIIIIIIIIIIIII
p2\t147\tref\t1\t60\t20=\t=\t1\t-20\tACGTCACGTACGTACGTACG\tIIIIIIIIIIIIIIIIIIII
";

struct Fixture {
    dir: TempDir,
    reference: PathBuf,
    sam: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let reference = dir.path().join("ref.fa");
        let sam = dir.path().join("reads.sam");
        std::fs::write(&reference, REFERENCE).unwrap();
        std::fs::write(&sam, SAM).unwrap();
        Self {
            dir,
            reference,
            sam,
        }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

fn cmd() -> Command {
    Command::cargo_bin("ww-mutfreq").unwrap()
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_frequencies_csv_to_stdout() {
    let fx = Fixture::new();

    cmd()
        .args(["frequencies", arg(&fx.sam), "--reference", arg(&fx.reference)])
        .args(["--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "position,label,mutation,frequency,coverage\n",
        ))
        .stdout(predicate::str::contains("5,C5T,~5T,0.5,2"));
}

#[test]
fn test_frequencies_text_summary() {
    let fx = Fixture::new();

    cmd()
        .args(["frequencies", arg(&fx.sam), "-r", arg(&fx.reference)])
        .assert()
        .success()
        .stdout(predicate::str::contains("Reference: ref"))
        .stdout(predicate::str::contains("1 filtered"))
        .stdout(predicate::str::contains("~5T"))
        .stdout(predicate::str::contains("C5T"));
}

#[test]
fn test_frequencies_json() {
    let fx = Fixture::new();

    let output = cmd()
        .args(["frequencies", arg(&fx.sam), "--reference", arg(&fx.reference)])
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["fragments"], 2);
    assert_eq!(json["summary"]["records_filtered"], 1);
    assert_eq!(json["summary"]["genome_length"], 20);
    assert_eq!(json["mutations"][0]["mutation"], "~5T");
    assert_eq!(json["mutations"][0]["label"], "C5T");
    assert_eq!(json["mutations"][0]["coverage"], 2);
}

#[test]
fn test_frequencies_writes_output_files() {
    let fx = Fixture::new();
    let mutations = fx.path("mutations.csv");
    let coverage = fx.path("coverage.csv");

    cmd()
        .args(["frequencies", arg(&fx.sam), "--reference", arg(&fx.reference)])
        .args(["--output", arg(&mutations), "--coverage-output", arg(&coverage)])
        .assert()
        .success();

    let table = std::fs::read_to_string(&mutations).unwrap();
    assert_eq!(
        table,
        "position,label,mutation,frequency,coverage\n5,C5T,~5T,0.5,2\n"
    );

    let depth = std::fs::read_to_string(&coverage).unwrap();
    assert!(depth.starts_with("position,coverage\n1,2\n"));
    assert_eq!(depth.lines().count(), 21);
}

#[test]
fn test_existing_output_requires_force() {
    let fx = Fixture::new();
    let mutations = fx.path("mutations.csv");
    std::fs::write(&mutations, "old").unwrap();

    cmd()
        .args(["frequencies", arg(&fx.sam), "--genome-length", "20"])
        .args(["--output", arg(&mutations)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
    assert_eq!(std::fs::read_to_string(&mutations).unwrap(), "old");

    cmd()
        .args(["frequencies", arg(&fx.sam), "--genome-length", "20"])
        .args(["--output", arg(&mutations), "--force"])
        .assert()
        .success();
    assert!(std::fs::read_to_string(&mutations)
        .unwrap()
        .contains("~5T"));
}

#[test]
fn test_genome_length_must_match_reference() {
    let fx = Fixture::new();

    cmd()
        .args(["frequencies", arg(&fx.sam), "--reference", arg(&fx.reference)])
        .args(["--genome-length", "30"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not match reference"));
}

#[test]
fn test_diffs_tsv() {
    let fx = Fixture::new();

    cmd()
        .args(["diffs", arg(&fx.sam), "--reference", arg(&fx.reference)])
        .args(["--format", "tsv"])
        .assert()
        .success()
        .stdout(predicate::str::contains("qname\tposition\ttype\tmutation\tlabel"))
        .stdout(predicate::str::contains("p1\t5\tsubstitution\t~5T\tC5T"))
        .stdout(predicate::str::contains("p2").not());
}

#[test]
fn test_diffs_from_stdin() {
    cmd()
        .args(["diffs", "-", "--genome-length", "20", "--all"])
        .write_stdin(SAM)
        .assert()
        .success()
        .stdout(predicate::str::contains("p1\tcoverage [0, 20)\t~5T"))
        .stdout(predicate::str::contains("p2\tcoverage [0, 20)\t-"));
}

#[test]
fn test_missing_input_fails() {
    let fx = Fixture::new();

    cmd()
        .args(["frequencies", arg(&fx.path("missing.sam"))])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to open"));
}

#[test]
fn test_invalid_alphabet_fails() {
    let fx = Fixture::new();

    cmd()
        .args(["frequencies", arg(&fx.sam), "--alphabet", "ACGTN"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ambiguous"));
}

#[test]
fn test_unmapped_mates_filtered_and_bad_cigar_warned() {
    let fx = Fixture::new();
    // p3: mapped mate with an unmapped mate placed at the same position
    // p4: spliced alignment the engine cannot walk
    let extra = "p3\t73\tref\t1\t60\t20=\t=\t1\t0\tACGTCACGTACGTACGTACG\tIIIIIIIIIIIIIIIIIIII
p3\t133\tref\t1\t0\t*\t=\t1\t0\tACGTCACGTACGTACGTACG\tIIIIIIIIIIIIIIIIIIII
p4\t99\tref\t1\t60\t2=2N2=\t=\t1\t6\tACGT\tIIII
p4\t147\tref\t1\t60\t4=\t=\t1\t-6\tACGT\tIIII
";
    let sam = fx.path("extra.sam");
    std::fs::write(&sam, format!("{SAM}{extra}")).unwrap();

    let output = cmd()
        .args(["frequencies", arg(&sam), "--reference", arg(&fx.reference)])
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["records_filtered"], 2);
    assert_eq!(json["summary"]["skipped_records"], 1);

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Skipping fragment"));
    assert!(stderr.contains("p4"));
}
