/// End-to-end paired-end alignment through the built binary.
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn generate_genome_seq(seed: u32, length: usize) -> String {
    let bases = ['A', 'C', 'G', 'T'];
    let mut state = seed;
    let mut seq = String::with_capacity(length);
    for _ in 0..length {
        state = state.wrapping_mul(1103515245).wrapping_add(12345);
        seq.push(bases[((state >> 16) & 3) as usize]);
    }
    seq
}

fn reverse_complement(seq: &str) -> String {
    seq.chars()
        .rev()
        .map(|c| match c {
            'A' => 'T',
            'C' => 'G',
            'G' => 'C',
            'T' => 'A',
            other => other,
        })
        .collect()
}

fn build_index(dir: &TempDir, genome_seq: &str) -> PathBuf {
    let fasta_path = dir.path().join("genome.fa");
    let mut file = fs::File::create(&fasta_path).unwrap();
    writeln!(file, ">chr1").unwrap();
    writeln!(file, "{genome_seq}").unwrap();

    let index_dir = dir.path().join("index");
    Command::cargo_bin("ruSNAP")
        .unwrap()
        .arg("--runMode")
        .arg("buildIndex")
        .arg("--genomeFastaFiles")
        .arg(&fasta_path)
        .arg("--indexDir")
        .arg(&index_dir)
        .arg("--seedLen")
        .arg("16")
        .assert()
        .success();
    index_dir
}

fn write_fastq(path: &Path, reads: &[(String, String)]) {
    let mut file = fs::File::create(path).unwrap();
    for (name, seq) in reads {
        writeln!(file, "@{name}").unwrap();
        writeln!(file, "{seq}").unwrap();
        writeln!(file, "+").unwrap();
        writeln!(file, "{}", "I".repeat(seq.len())).unwrap();
    }
}

fn sam_records(path: &Path) -> Vec<Vec<String>> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .filter(|l| !l.starts_with('@'))
        .map(|l| l.split('\t').map(str::to_string).collect())
        .collect()
}

#[test]
fn exact_pairs_align_with_mate_fields() {
    let tmpdir = TempDir::new().unwrap();
    let genome_seq = generate_genome_seq(2024, 3000);
    let index_dir = build_index(&tmpdir, &genome_seq);

    // 20 pairs with a 310-base outer span: mate 1 forward at p, mate 2 the
    // reverse complement of the segment starting at p + 250.
    let mut reads0 = Vec::new();
    let mut reads1 = Vec::new();
    for i in 0..20 {
        let pos = 50 + i * 100;
        reads0.push((
            format!("pair{i}_{pos}"),
            genome_seq[pos..pos + 60].to_string(),
        ));
        reads1.push((
            format!("pair{i}_{pos}"),
            reverse_complement(&genome_seq[pos + 250..pos + 310]),
        ));
    }
    let fastq0 = tmpdir.path().join("r1.fq");
    let fastq1 = tmpdir.path().join("r2.fq");
    write_fastq(&fastq0, &reads0);
    write_fastq(&fastq1, &reads1);

    let sam_path = tmpdir.path().join("out.sam");
    Command::cargo_bin("ruSNAP")
        .unwrap()
        .arg("--runMode")
        .arg("paired")
        .arg("--indexDir")
        .arg(&index_dir)
        .arg("--readFilesIn")
        .arg(&fastq0)
        .arg(&fastq1)
        .arg("--minSpacing")
        .arg("100")
        .arg("--maxSpacing")
        .arg("500")
        .arg("-o")
        .arg(&sam_path)
        .assert()
        .success()
        .stderr(predicate::str::contains("Alignment complete!"))
        .stderr(predicate::str::contains("Number of input reads: 40"));

    let records = sam_records(&sam_path);
    assert_eq!(records.len(), 40);

    for fields in &records {
        let name = &fields[0];
        let pos: usize = name.split('_').nth(1).unwrap().parse().unwrap();
        let flags: u16 = fields[1].parse().unwrap();
        assert_eq!(flags & 0x1, 0x1, "paired flag for {name}");
        assert_eq!(flags & 0x4, 0, "mapped for {name}");
        assert_eq!(fields[2], "chr1");
        assert_eq!(fields[6], "=", "RNEXT for {name}");

        if flags & 0x40 != 0 {
            // First segment: forward at pos, mate reverse at pos + 250.
            assert_eq!(flags & 0x10, 0, "first end is forward for {name}");
            assert_eq!(flags & 0x20, 0x20, "mate is RC for {name}");
            assert_eq!(fields[3], (pos + 1).to_string());
            assert_eq!(fields[7], (pos + 251).to_string());
            assert_eq!(fields[8], "310");
        } else {
            assert_eq!(flags & 0x80, 0x80, "second segment bit for {name}");
            assert_eq!(flags & 0x10, 0x10, "second end is RC for {name}");
            assert_eq!(fields[3], (pos + 251).to_string());
            assert_eq!(fields[7], (pos + 1).to_string());
            assert_eq!(fields[8], "-310");
        }
        // Both ends aligned exactly.
        assert_eq!(fields[5], "60=");
    }
}

#[test]
fn pair_beyond_max_spacing_is_unmapped() {
    let tmpdir = TempDir::new().unwrap();
    let genome_seq = generate_genome_seq(406, 3000);
    let index_dir = build_index(&tmpdir, &genome_seq);

    let fastq0 = tmpdir.path().join("r1.fq");
    let fastq1 = tmpdir.path().join("r2.fq");
    write_fastq(
        &fastq0,
        &[("far_pair".to_string(), genome_seq[100..160].to_string())],
    );
    write_fastq(
        &fastq1,
        &[(
            "far_pair".to_string(),
            reverse_complement(&genome_seq[1500..1560]),
        )],
    );

    let sam_path = tmpdir.path().join("out.sam");
    Command::cargo_bin("ruSNAP")
        .unwrap()
        .arg("--runMode")
        .arg("paired")
        .arg("--indexDir")
        .arg(&index_dir)
        .arg("--readFilesIn")
        .arg(&fastq0)
        .arg(&fastq1)
        .arg("--minSpacing")
        .arg("100")
        .arg("--maxSpacing")
        .arg("500")
        .arg("-o")
        .arg(&sam_path)
        .assert()
        .success();

    let records = sam_records(&sam_path);
    assert_eq!(records.len(), 2);
    for fields in &records {
        let flags: u16 = fields[1].parse().unwrap();
        assert_eq!(flags & 0x4, 0x4, "unmapped for {}", fields[0]);
        assert_eq!(fields[4], "0", "MAPQ 0 for {}", fields[0]);
    }
}

#[test]
fn short_end_pair_falls_back_to_single_alignment() {
    let tmpdir = TempDir::new().unwrap();
    let genome_seq = generate_genome_seq(88, 3000);
    let index_dir = build_index(&tmpdir, &genome_seq);

    // Mate 1 is only 40 bases, under the intersection threshold.
    let fastq0 = tmpdir.path().join("r1.fq");
    let fastq1 = tmpdir.path().join("r2.fq");
    write_fastq(
        &fastq0,
        &[("short_pair".to_string(), genome_seq[100..140].to_string())],
    );
    write_fastq(
        &fastq1,
        &[(
            "short_pair".to_string(),
            reverse_complement(&genome_seq[350..410]),
        )],
    );

    let sam_path = tmpdir.path().join("out.sam");
    Command::cargo_bin("ruSNAP")
        .unwrap()
        .arg("--runMode")
        .arg("paired")
        .arg("--indexDir")
        .arg(&index_dir)
        .arg("--readFilesIn")
        .arg(&fastq0)
        .arg(&fastq1)
        .arg("-o")
        .arg(&sam_path)
        .assert()
        .success();

    let records = sam_records(&sam_path);
    assert_eq!(records.len(), 2);
    // Both ends still map to their true locations independently.
    for fields in &records {
        let flags: u16 = fields[1].parse().unwrap();
        assert_eq!(flags & 0x4, 0, "mapped for {}", fields[0]);
        if flags & 0x40 != 0 {
            assert_eq!(fields[3], "101");
        } else {
            assert_eq!(fields[3], "351");
        }
    }
}

#[test]
fn unequal_paired_files_fail() {
    let tmpdir = TempDir::new().unwrap();
    let genome_seq = generate_genome_seq(3, 2000);
    let index_dir = build_index(&tmpdir, &genome_seq);

    let fastq0 = tmpdir.path().join("r1.fq");
    let fastq1 = tmpdir.path().join("r2.fq");
    write_fastq(
        &fastq0,
        &[
            ("a".to_string(), genome_seq[100..160].to_string()),
            ("b".to_string(), genome_seq[300..360].to_string()),
        ],
    );
    write_fastq(
        &fastq1,
        &[(
            "a".to_string(),
            reverse_complement(&genome_seq[350..410]),
        )],
    );

    Command::cargo_bin("ruSNAP")
        .unwrap()
        .arg("--runMode")
        .arg("paired")
        .arg("--indexDir")
        .arg(&index_dir)
        .arg("--readFilesIn")
        .arg(&fastq0)
        .arg(&fastq1)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unequal"));
}
