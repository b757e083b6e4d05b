pub mod fasta;

use std::path::Path;

use crate::error::Error;

use fasta::parse_fasta_files;

/// A named contiguous region of the reference, conventionally a chromosome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Piece {
    pub name: String,
    /// Absolute offset of the piece's first base in the genome array.
    pub beginning_offset: u32,
}

/// The reference genome: one contiguous encoded base array plus an ordered
/// piece list. Locations are absolute `u32` offsets into the array;
/// per-piece coordinates are derived by subtracting the piece's beginning
/// offset. Immutable after construction and shared read-only between
/// aligner threads.
#[derive(Debug)]
pub struct Genome {
    bases: Vec<u8>,
    pieces: Vec<Piece>,
}

impl Genome {
    /// Assemble a genome by concatenating named sequences.
    pub fn from_pieces(sequences: Vec<(String, Vec<u8>)>) -> Result<Self, Error> {
        let mut bases = Vec::new();
        let mut pieces = Vec::with_capacity(sequences.len());

        for (name, seq) in sequences {
            if seq.is_empty() {
                return Err(Error::Fasta(format!("piece '{name}' has zero length")));
            }
            let beginning_offset = u32::try_from(bases.len()).map_err(|_| {
                Error::Index("genome exceeds the 32-bit location space".to_string())
            })?;
            pieces.push(Piece {
                name,
                beginning_offset,
            });
            bases.extend_from_slice(&seq);
        }

        if u32::try_from(bases.len()).is_err() {
            return Err(Error::Index(
                "genome exceeds the 32-bit location space".to_string(),
            ));
        }

        Ok(Self { bases, pieces })
    }

    /// Reassemble a genome from already-validated parts (index deserialization).
    pub(crate) fn from_parts(bases: Vec<u8>, pieces: Vec<Piece>) -> Self {
        Self { bases, pieces }
    }

    /// Build a genome from FASTA files.
    pub fn from_fasta<P: AsRef<Path>>(paths: &[P]) -> Result<Self, Error> {
        let records = parse_fasta_files(paths)?;
        Self::from_pieces(records.into_iter().map(|r| (r.name, r.bases)).collect())
    }

    pub fn count_of_bases(&self) -> u32 {
        self.bases.len() as u32
    }

    pub fn bases(&self) -> &[u8] {
        &self.bases
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// A reference substring of `len` bases starting at `location`, or None
    /// if it would cross the end of the genome array.
    pub fn substring(&self, location: u32, len: usize) -> Option<&[u8]> {
        let start = location as usize;
        let end = start.checked_add(len)?;
        self.bases.get(start..end)
    }

    /// Index of the piece containing `location`.
    pub fn piece_index_at_location(&self, location: u32) -> Option<usize> {
        if location >= self.count_of_bases() {
            return None;
        }
        // partition_point finds the first piece beginning beyond the location.
        let idx = self
            .pieces
            .partition_point(|p| p.beginning_offset <= location);
        Some(idx - 1)
    }

    /// The piece containing `location`.
    pub fn piece_at_location(&self, location: u32) -> Option<&Piece> {
        self.piece_index_at_location(location)
            .map(|i| &self.pieces[i])
    }

    /// One past the last location of piece `index`.
    pub fn piece_end(&self, index: usize) -> u32 {
        self.pieces
            .get(index + 1)
            .map(|p| p.beginning_offset)
            .unwrap_or_else(|| self.count_of_bases())
    }

    /// Translate an absolute location to (piece index, offset within piece).
    pub fn location_to_piece_coords(&self, location: u32) -> Option<(usize, u32)> {
        let idx = self.piece_index_at_location(location)?;
        Some((idx, location - self.pieces[idx].beginning_offset))
    }
}
