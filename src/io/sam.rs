/// SAM output with noodles.
use std::fs::File;
use std::io::BufWriter;
use std::num::NonZeroUsize;
use std::path::Path;

use noodles::sam;
use noodles::sam::alignment::io::Write;
use noodles::sam::alignment::record::MappingQuality;
use noodles::sam::alignment::record_buf::{QualityScores, RecordBuf, Sequence};
use noodles::sam::header::record::value::{map::Program, Map};

use crate::align::lv::{canonicalize_cigar, CigarOp, CigarOpKind};
use crate::align::Hit;
use crate::error::Error;
use crate::genome::Genome;
use crate::io::fastq::decode_base;
use crate::reads::{complement, Direction, Read};

/// Everything the writer needs to fill the mate fields of a paired record.
#[derive(Debug, Clone, Copy)]
pub struct MateInfo {
    pub hit: Option<Hit>,
    pub read_len: usize,
    /// True when the record's read is the first segment of the pair.
    pub first_in_pair: bool,
}

/// SAM file writer: header from the genome's pieces, then records.
pub struct SamWriter {
    writer: sam::io::Writer<BufWriter<File>>,
    header: sam::Header,
}

impl SamWriter {
    pub fn create(output_path: &Path, genome: &Genome) -> Result<Self, Error> {
        let file = File::create(output_path).map_err(|e| Error::io(e, output_path))?;
        let header = build_sam_header(genome)?;
        let mut writer = sam::io::Writer::new(BufWriter::new(file));
        writer.write_header(&header)?;
        Ok(Self { writer, header })
    }

    pub fn write_record(&mut self, record: &RecordBuf) -> Result<(), Error> {
        self.writer.write_alignment_record(&self.header, record)?;
        Ok(())
    }

    pub fn finish(self) -> Result<(), Error> {
        use std::io::Write as _;
        let mut inner = self.writer.into_inner();
        inner.flush()?;
        Ok(())
    }
}

/// Build the @HD/@SQ/@PG header from the genome's pieces.
pub fn build_sam_header(genome: &Genome) -> Result<sam::Header, Error> {
    let mut builder = sam::Header::builder().set_header(Default::default());

    for (i, piece) in genome.pieces().iter().enumerate() {
        let length = (genome.piece_end(i) - piece.beginning_offset) as usize;
        let length = NonZeroUsize::new(length)
            .ok_or_else(|| Error::Index(format!("piece {} has zero length", piece.name)))?;
        builder = builder.add_reference_sequence(
            piece.name.as_str(),
            Map::<sam::header::record::value::map::ReferenceSequence>::new(length),
        );
    }

    builder = builder.add_program("ruSNAP", Map::<Program>::default());
    Ok(builder.build())
}

/// Build the SAM record for one read.
///
/// `cigar_ops` cover the clipped read in its aligned orientation (no
/// clips); soft clips for the trimmed ends are added here, swapped for
/// reverse-complement alignments since the output sequence is always in
/// forward-reference orientation.
pub fn build_record(
    read: &Read,
    hit: Option<Hit>,
    mapq: u8,
    cigar_ops: &[CigarOp],
    use_m: bool,
    genome: &Genome,
    mate: Option<&MateInfo>,
) -> Result<RecordBuf, Error> {
    let mut record = RecordBuf::default();
    record.name_mut().replace(read.name().into());

    let mut flags = sam::alignment::record::Flags::empty();
    let mut this_piece_and_pos: Option<(usize, u32)> = None;

    match hit {
        Some(hit) => {
            let (piece_idx, offset) = genome
                .location_to_piece_coords(hit.location)
                .ok_or_else(|| {
                    Error::Alignment(format!("location {} outside the genome", hit.location))
                })?;
            this_piece_and_pos = Some((piece_idx, offset));

            if hit.direction == Direction::Rc {
                flags |= sam::alignment::record::Flags::REVERSE_COMPLEMENTED;
            }

            *record.reference_sequence_id_mut() = Some(piece_idx);
            let pos = offset as usize + 1;
            *record.alignment_start_mut() = Some(pos.try_into().map_err(|e| {
                Error::Alignment(format!("invalid alignment position {pos}: {e}"))
            })?);
            *record.mapping_quality_mut() = MappingQuality::new(mapq);
            *record.cigar_mut() = build_cigar(read, hit.direction, cigar_ops, use_m)?;
        }
        None => {
            flags |= sam::alignment::record::Flags::UNMAPPED;
            *record.mapping_quality_mut() = MappingQuality::new(0);
        }
    }

    // Sequence and qualities, in forward-reference orientation.
    let (seq_bytes, qual_bytes) = match hit.map(|h| h.direction) {
        Some(Direction::Rc) => (
            read.unclipped_bases()
                .iter()
                .rev()
                .map(|&b| decode_base(complement(b)))
                .collect::<Vec<u8>>(),
            read.unclipped_quals().iter().rev().copied().collect(),
        ),
        _ => (
            read.unclipped_bases()
                .iter()
                .map(|&b| decode_base(b))
                .collect::<Vec<u8>>(),
            read.unclipped_quals().to_vec(),
        ),
    };
    *record.sequence_mut() = Sequence::from(seq_bytes);
    *record.quality_scores_mut() = QualityScores::from(qual_bytes);

    if let Some(mate) = mate {
        flags |= sam::alignment::record::Flags::SEGMENTED;
        flags |= if mate.first_in_pair {
            sam::alignment::record::Flags::FIRST_SEGMENT
        } else {
            sam::alignment::record::Flags::LAST_SEGMENT
        };
        match mate.hit {
            Some(mate_hit) => {
                let (mate_piece, mate_offset) = genome
                    .location_to_piece_coords(mate_hit.location)
                    .ok_or_else(|| {
                        Error::Alignment(format!(
                            "mate location {} outside the genome",
                            mate_hit.location
                        ))
                    })?;
                if mate_hit.direction == Direction::Rc {
                    flags |= sam::alignment::record::Flags::MATE_REVERSE_COMPLEMENTED;
                }
                *record.mate_reference_sequence_id_mut() = Some(mate_piece);
                let mate_pos = mate_offset as usize + 1;
                *record.mate_alignment_start_mut() = Some(mate_pos.try_into().map_err(|e| {
                    Error::Alignment(format!("invalid mate position {mate_pos}: {e}"))
                })?);

                if let Some((this_piece, this_offset)) = this_piece_and_pos {
                    if this_piece == mate_piece {
                        *record.template_length_mut() =
                            template_length(this_offset, read.len(), mate_offset, mate.read_len);
                    }
                }
            }
            None => {
                flags |= sam::alignment::record::Flags::MATE_UNMAPPED;
            }
        }
    }

    *record.flags_mut() = flags;
    Ok(record)
}

/// Signed template length: outermost distance between the pair's ends,
/// positive for the leftmost read.
fn template_length(this_offset: u32, this_len: usize, mate_offset: u32, mate_len: usize) -> i32 {
    if this_offset <= mate_offset {
        (mate_offset as i64 + mate_len as i64 - this_offset as i64) as i32
    } else {
        -((this_offset as i64 + this_len as i64 - mate_offset as i64) as i32)
    }
}

/// Convert scorer ops to a noodles CIGAR, adding soft clips for the
/// logically trimmed ends.
fn build_cigar(
    read: &Read,
    direction: Direction,
    cigar_ops: &[CigarOp],
    use_m: bool,
) -> Result<sam::alignment::record_buf::Cigar, Error> {
    use sam::alignment::record::cigar::op::Kind;

    let (front_clip, back_clip) = match direction {
        Direction::Forward => (read.clip_front(), read.clip_back()),
        // The output sequence is reverse complemented, so the trimmed ends
        // swap sides.
        Direction::Rc => (read.clip_back(), read.clip_front()),
    };

    let mut ops: Vec<CigarOp> = Vec::with_capacity(cigar_ops.len() + 2);
    if front_clip > 0 {
        ops.push(CigarOp::new(CigarOpKind::SoftClip, front_clip as u32));
    }
    for op in cigar_ops {
        let kind = if use_m && matches!(op.kind, CigarOpKind::Equal | CigarOpKind::Diff) {
            CigarOpKind::Match
        } else {
            op.kind
        };
        ops.push(CigarOp::new(kind, op.len));
    }
    if back_clip > 0 {
        ops.push(CigarOp::new(CigarOpKind::SoftClip, back_clip as u32));
    }
    canonicalize_cigar(&mut ops);

    let mut cigar = sam::alignment::record_buf::Cigar::default();
    for op in &ops {
        let kind = match op.kind {
            CigarOpKind::Match => Kind::Match,
            CigarOpKind::Ins => Kind::Insertion,
            CigarOpKind::Del => Kind::Deletion,
            CigarOpKind::Skip => Kind::Skip,
            CigarOpKind::SoftClip => Kind::SoftClip,
            CigarOpKind::HardClip => Kind::HardClip,
            CigarOpKind::Padding => Kind::Pad,
            CigarOpKind::Equal => Kind::SequenceMatch,
            CigarOpKind::Diff => Kind::SequenceMismatch,
        };
        cigar
            .as_mut()
            .push(sam::alignment::record::cigar::Op::new(kind, op.len as usize));
    }
    Ok(cigar)
}
