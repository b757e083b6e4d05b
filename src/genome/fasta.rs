use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::error::Error;

/// A named reference sequence parsed from FASTA.
#[derive(Debug, Clone)]
pub struct FastaRecord {
    pub name: String,
    pub bases: Vec<u8>,
}

/// Parse FASTA files into encoded reference sequences.
///
/// - Base encoding: A=0, C=1, G=2, T=3, N/other=4
/// - Case-insensitive; control characters are skipped
/// - The record name is everything after '>' up to the first whitespace
pub fn parse_fasta_files<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<FastaRecord>, Error> {
    let mut records: Vec<FastaRecord> = Vec::new();

    for path in paths {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::io(e, path))?;
        let reader = BufReader::new(file);

        let mut in_record = false;
        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result.map_err(|e| Error::io(e, path))?;
            if line.is_empty() {
                continue;
            }

            if let Some(header) = line.strip_prefix('>') {
                let name = header.split_whitespace().next().ok_or_else(|| {
                    Error::Fasta(format!(
                        "empty sequence name at {}:{}",
                        path.display(),
                        line_num + 1
                    ))
                })?;
                records.push(FastaRecord {
                    name: name.to_string(),
                    bases: Vec::new(),
                });
                in_record = true;
            } else {
                if !in_record {
                    return Err(Error::Fasta(format!(
                        "sequence data before first header at {}:{}",
                        path.display(),
                        line_num + 1
                    )));
                }
                let current = records.last_mut().expect("in_record implies a record");
                current.bases.extend(
                    line.bytes()
                        .filter(|&b| b >= 32)
                        .map(encode_fasta_base),
                );
            }
        }
    }

    if records.is_empty() {
        return Err(Error::Fasta("no sequences found in FASTA files".to_string()));
    }
    if let Some(empty) = records.iter().find(|r| r.bases.is_empty()) {
        return Err(Error::Fasta(format!(
            "sequence '{}' has zero length",
            empty.name
        )));
    }

    Ok(records)
}

fn encode_fasta_base(byte: u8) -> u8 {
    match byte.to_ascii_uppercase() {
        b'A' => 0,
        b'C' => 1,
        b'G' => 2,
        b'T' => 3,
        _ => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parse_single_sequence() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, ">chr1").unwrap();
        writeln!(file, "ACGT").unwrap();
        writeln!(file, "NNNN").unwrap();

        let records = parse_fasta_files(&[file.path()]).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "chr1");
        assert_eq!(records[0].bases, vec![0, 1, 2, 3, 4, 4, 4, 4]);
    }

    #[test]
    fn parse_multiple_sequences() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, ">chr1 assembled from sample X").unwrap();
        writeln!(file, "ACG").unwrap();
        writeln!(file, ">chr2").unwrap();
        writeln!(file, "TGA").unwrap();

        let records = parse_fasta_files(&[file.path()]).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "chr1");
        assert_eq!(records[0].bases, vec![0, 1, 2]);
        assert_eq!(records[1].name, "chr2");
        assert_eq!(records[1].bases, vec![3, 2, 0]);
    }

    #[test]
    fn case_insensitive() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, ">t").unwrap();
        writeln!(file, "AaCcGgTt").unwrap();

        let records = parse_fasta_files(&[file.path()]).unwrap();
        assert_eq!(records[0].bases, vec![0, 0, 1, 1, 2, 2, 3, 3]);
    }

    #[test]
    fn multiple_files_concatenate() {
        let mut file1 = NamedTempFile::new().unwrap();
        writeln!(file1, ">chr1").unwrap();
        writeln!(file1, "AC").unwrap();

        let mut file2 = NamedTempFile::new().unwrap();
        writeln!(file2, ">chr2").unwrap();
        writeln!(file2, "GT").unwrap();

        let records = parse_fasta_files(&[file1.path(), file2.path()]).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "chr1");
        assert_eq!(records[1].name, "chr2");
    }

    #[test]
    fn empty_file_error() {
        let file = NamedTempFile::new().unwrap();
        let result = parse_fasta_files(&[file.path()]);
        assert!(result.unwrap_err().to_string().contains("no sequences"));
    }

    #[test]
    fn sequence_before_header_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "ACGT").unwrap();

        let result = parse_fasta_files(&[file.path()]);
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("sequence data before first header")
        );
    }

    #[test]
    fn zero_length_sequence_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, ">empty").unwrap();
        writeln!(file, ">chr1").unwrap();
        writeln!(file, "ACGT").unwrap();

        let result = parse_fasta_files(&[file.path()]);
        assert!(result.unwrap_err().to_string().contains("zero length"));
    }
}
