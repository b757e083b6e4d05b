/// FASTQ reading with base encoding, decompression and read batching.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::GzDecoder;
use noodles::fastq;

use crate::error::Error;
use crate::params::ClippingPolicy;
use crate::reads::Read;

/// Convert a FASTQ base character to the internal encoding
/// (0=A, 1=C, 2=G, 3=T, 4=N or any ambiguity code).
pub fn encode_base(base: u8) -> u8 {
    match base.to_ascii_uppercase() {
        b'A' => 0,
        b'C' => 1,
        b'G' => 2,
        b'T' => 3,
        _ => 4,
    }
}

/// Decode an internal base back to its ASCII character.
pub fn decode_base(encoded: u8) -> u8 {
    match encoded {
        0 => b'A',
        1 => b'C',
        2 => b'G',
        3 => b'T',
        _ => b'N',
    }
}

/// FASTQ reader that handles gzip decompression and base encoding.
pub struct FastqReader {
    inner: fastq::Reader<Box<dyn BufRead + Send>>,
    clipping: ClippingPolicy,
}

impl FastqReader {
    /// Open a FASTQ file, plain or gzip compressed (detected by extension).
    pub fn open(path: &Path, clipping: ClippingPolicy) -> Result<Self, Error> {
        let path_str = path.to_string_lossy();
        let is_gzipped = path_str.ends_with(".gz") || path_str.ends_with(".gzip");

        let file = File::open(path).map_err(|e| Error::io(e, path))?;
        let reader: Box<dyn BufRead + Send> = if is_gzipped {
            Box::new(BufReader::new(GzDecoder::new(file)))
        } else {
            Box::new(BufReader::new(file))
        };

        Ok(Self {
            inner: fastq::Reader::new(reader),
            clipping,
        })
    }

    /// Get the next read, with bases encoded, qualities converted from
    /// phred+33 and the clipping policy applied.
    pub fn next_read(&mut self) -> Result<Option<Read>, Error> {
        match self.inner.records().next() {
            Some(Ok(record)) => {
                let name = String::from_utf8_lossy(record.name()).to_string();
                let bases: Vec<u8> = record.sequence().iter().map(|&b| encode_base(b)).collect();
                let quals: Vec<u8> = record
                    .quality_scores()
                    .iter()
                    .map(|&q| q.saturating_sub(b'!').min(63))
                    .collect();
                let mut read = Read::new(name, bases, quals)?;
                read.apply_clipping(self.clipping);
                Ok(Some(read))
            }
            Some(Err(e)) => Err(Error::from(e)),
            None => Ok(None),
        }
    }

    /// Read up to `batch_size` reads (fewer at end of file).
    pub fn read_batch(&mut self, batch_size: usize) -> Result<Vec<Read>, Error> {
        let mut batch = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            match self.next_read()? {
                Some(read) => batch.push(read),
                None => break,
            }
        }
        Ok(batch)
    }
}

/// Two FASTQ files read in lockstep for paired-end input.
pub struct PairedFastqReader {
    first: FastqReader,
    second: FastqReader,
}

impl PairedFastqReader {
    pub fn open(path0: &Path, path1: &Path, clipping: ClippingPolicy) -> Result<Self, Error> {
        Ok(Self {
            first: FastqReader::open(path0, clipping)?,
            second: FastqReader::open(path1, clipping)?,
        })
    }

    pub fn next_pair(&mut self) -> Result<Option<(Read, Read)>, Error> {
        match (self.first.next_read()?, self.second.next_read()?) {
            (Some(r0), Some(r1)) => Ok(Some((r0, r1))),
            (None, None) => Ok(None),
            _ => Err(Error::Read(
                "paired FASTQ files have unequal numbers of reads".to_string(),
            )),
        }
    }

    pub fn read_pair_batch(&mut self, batch_size: usize) -> Result<Vec<(Read, Read)>, Error> {
        let mut batch = Vec::with_capacity(batch_size);
        for _ in 0..batch_size {
            match self.next_pair()? {
                Some(pair) => batch.push(pair),
                None => break,
            }
        }
        Ok(batch)
    }
}
