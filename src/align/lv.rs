use crate::error::Error;

/// Hard ceiling on the score limit the scorer is sized for. Indels longer
/// than this cannot be expressed (candidate-merge bitvectors overflow past 32).
pub const MAX_K: u32 = 31;

/// Probability of a single-base substitution used for seed regions scored
/// without qualities.
pub const SNP_PROB: f64 = 0.001;
/// Probability contribution of opening a gap.
pub const GAP_OPEN_PROB: f64 = 0.001;
/// Probability contribution of each gap base after the first.
pub const GAP_EXTEND_PROB: f64 = 0.5;

// ---------------------------------------------------------------------------
// CIGAR
// ---------------------------------------------------------------------------

/// CIGAR operation kinds, in BAM opcode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CigarOpKind {
    Match = 0,
    Ins = 1,
    Del = 2,
    Skip = 3,
    SoftClip = 4,
    HardClip = 5,
    Padding = 6,
    Equal = 7,
    Diff = 8,
}

impl CigarOpKind {
    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn to_char(self) -> char {
        match self {
            Self::Match => 'M',
            Self::Ins => 'I',
            Self::Del => 'D',
            Self::Skip => 'N',
            Self::SoftClip => 'S',
            Self::HardClip => 'H',
            Self::Padding => 'P',
            Self::Equal => '=',
            Self::Diff => 'X',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub kind: CigarOpKind,
    pub len: u32,
}

impl CigarOp {
    pub fn new(kind: CigarOpKind, len: u32) -> Self {
        Self { kind, len }
    }
}

/// Merge adjacent ops of the same kind, dropping zero-length ops.
pub fn canonicalize_cigar(ops: &mut Vec<CigarOp>) {
    let mut out: Vec<CigarOp> = Vec::with_capacity(ops.len());
    for op in ops.drain(..) {
        if op.len == 0 {
            continue;
        }
        match out.last_mut() {
            Some(last) if last.kind == op.kind => last.len += op.len,
            _ => out.push(op),
        }
    }
    *ops = out;
}

/// Render ops as SAM text. With `use_m`, sequence (mis)match ops collapse to
/// M. `capacity` is the caller's op budget (2x the read length by contract);
/// overflowing it is the cigarBufTooSmall condition.
pub fn format_cigar_sam(ops: &[CigarOp], use_m: bool, capacity: usize) -> Result<String, Error> {
    let mut mapped: Vec<CigarOp> = ops
        .iter()
        .map(|op| {
            if use_m && matches!(op.kind, CigarOpKind::Equal | CigarOpKind::Diff) {
                CigarOp::new(CigarOpKind::Match, op.len)
            } else {
                *op
            }
        })
        .collect();
    canonicalize_cigar(&mut mapped);
    if mapped.len() > capacity {
        return Err(Error::CigarBufferTooSmall {
            needed: mapped.len(),
            capacity,
        });
    }
    let mut out = String::new();
    for op in &mapped {
        out.push_str(&op.len.to_string());
        out.push(op.kind.to_char());
    }
    Ok(out)
}

/// Render ops in the BAM packed form: one u32 per op, `length << 4 | opcode`.
pub fn format_cigar_bam(ops: &[CigarOp], capacity: usize) -> Result<Vec<u32>, Error> {
    let mut mapped = ops.to_vec();
    canonicalize_cigar(&mut mapped);
    if mapped.len() > capacity {
        return Err(Error::CigarBufferTooSmall {
            needed: mapped.len(),
            capacity,
        });
    }
    Ok(mapped
        .iter()
        .map(|op| (op.len << 4) | op.kind.code())
        .collect())
}

// ---------------------------------------------------------------------------
// Scorer
// ---------------------------------------------------------------------------

/// Outcome of a bounded edit-distance computation that stayed within the
/// score limit. `net_offset` is the reference drift: the alignment consumed
/// `read_len + net_offset` reference bases.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreResult {
    pub distance: u32,
    pub match_probability: f64,
    pub net_offset: i32,
}

const MOVE_NONE: u8 = 0;
const MOVE_SUB: u8 = 1;
const MOVE_INS: u8 = 2;
const MOVE_DEL: u8 = 3;

/// Bounded Landau-Vishkin edit distance in O(K * readLen) time.
///
/// Counts substitutions, single-base insertions and single-base deletions as
/// one edit each; reports None ("exceeded") as a normal outcome when the
/// distance is above the limit. The read must be consumed entirely; the
/// reference window may be longer, and trailing reference is ignored.
///
/// Holds its DP scratch so a per-thread instance allocates once and is
/// reused across reads.
pub struct LandauVishkin {
    // Row-major (e, d) tables: furthest read index per state, the pre-slide
    // index for traceback, and the move that produced the state.
    l: Vec<i32>,
    pre: Vec<i32>,
    mv: Vec<u8>,
    phred_err: [f64; 64],
}

const COLS: usize = 2 * MAX_K as usize + 3;

#[inline]
fn cell(e: u32, d: i32) -> usize {
    e as usize * COLS + (d + MAX_K as i32 + 1) as usize
}

impl Default for LandauVishkin {
    fn default() -> Self {
        Self::new()
    }
}

impl LandauVishkin {
    pub fn new() -> Self {
        let cells = (MAX_K as usize + 1) * COLS;
        let mut phred_err = [0.0f64; 64];
        for (q, p) in phred_err.iter_mut().enumerate() {
            *p = 10f64.powf(-(q as f64) / 10.0);
        }
        Self {
            l: vec![-1; cells],
            pre: vec![-1; cells],
            mv: vec![MOVE_NONE; cells],
            phred_err,
        }
    }

    /// Forward scoring: align the read 5'->3' against the reference window.
    pub fn compute(
        &mut self,
        reference: &[u8],
        read: &[u8],
        qual: &[u8],
        k: u32,
    ) -> Option<ScoreResult> {
        self.compute_inner(reference, read, qual, k, false, None)
    }

    /// Forward scoring that also emits the canonical edit script covering
    /// exactly the read's bases (=, X, I, D; no clips).
    pub fn compute_with_cigar(
        &mut self,
        reference: &[u8],
        read: &[u8],
        qual: &[u8],
        k: u32,
        ops: &mut Vec<CigarOp>,
    ) -> Option<ScoreResult> {
        self.compute_inner(reference, read, qual, k, false, Some(ops))
    }

    /// Backward scoring: align the read so that its end coincides with the
    /// end of the reference window (used to extend leftward from a seed
    /// anchor). The returned `net_offset` tells how many extra (positive) or
    /// fewer (negative) reference bases the head consumed, which the caller
    /// applies to the reported genome location.
    pub fn compute_backward(
        &mut self,
        reference: &[u8],
        read: &[u8],
        qual: &[u8],
        k: u32,
    ) -> Option<ScoreResult> {
        self.compute_inner(reference, read, qual, k, true, None)
    }

    fn compute_inner(
        &mut self,
        reference: &[u8],
        read: &[u8],
        qual: &[u8],
        k: u32,
        backward: bool,
        ops: Option<&mut Vec<CigarOp>>,
    ) -> Option<ScoreResult> {
        debug_assert_eq!(read.len(), qual.len());
        let k = k.min(MAX_K);
        let read_len = read.len() as i32;
        let ref_len = reference.len() as i32;

        if read_len == 0 {
            if let Some(ops) = ops {
                ops.clear();
            }
            return Some(ScoreResult {
                distance: 0,
                match_probability: 1.0,
                net_offset: 0,
            });
        }

        // Index accessors; backward mode reads both strings from their ends.
        let rbase = |i: i32| {
            if backward {
                read[(read_len - 1 - i) as usize]
            } else {
                read[i as usize]
            }
        };
        let fbase = |j: i32| {
            if backward {
                reference[(ref_len - 1 - j) as usize]
            } else {
                reference[j as usize]
            }
        };
        let rqual = |i: i32| {
            if backward {
                qual[(read_len - 1 - i) as usize]
            } else {
                qual[i as usize]
            }
        };

        let slide = |mut i: i32, d: i32| {
            while i < read_len && i + d < ref_len && i + d >= 0 && rbase(i) == fbase(i + d) {
                i += 1;
            }
            i
        };

        // e = 0, d = 0: longest common prefix.
        let i0 = slide(0, 0);
        self.l[cell(0, 0)] = i0;
        self.pre[cell(0, 0)] = 0;
        self.mv[cell(0, 0)] = MOVE_NONE;
        if i0 == read_len {
            return Some(self.finish(read_len, 0, 0, rqual, ops));
        }

        for e in 1..=k {
            let mut best_d: Option<i32> = None;
            for d in -(e as i32)..=(e as i32) {
                let prev = |dd: i32| -> i32 {
                    if dd.unsigned_abs() <= e - 1 {
                        self.l[cell(e - 1, dd)]
                    } else {
                        -1
                    }
                };

                let mut i = -1;
                let mut mv = MOVE_NONE;
                // Substitution: both strings advance one.
                let sub = prev(d);
                if sub >= 0 && sub < read_len && sub + 1 + d <= ref_len {
                    i = sub + 1;
                    mv = MOVE_SUB;
                }
                // Insertion in the read: the read advances alone.
                let ins = prev(d + 1);
                if ins >= 0 && ins < read_len && ins + 1 > i {
                    i = ins + 1;
                    mv = MOVE_INS;
                }
                // Deletion from the read: the reference advances alone.
                let del = prev(d - 1);
                if del >= 0 && del + d <= ref_len && del >= i {
                    i = del;
                    mv = MOVE_DEL;
                }

                if i < 0 || i + d < 0 || i + d > ref_len {
                    self.l[cell(e, d)] = -1;
                    continue;
                }

                let slid = slide(i, d);
                self.l[cell(e, d)] = slid;
                self.pre[cell(e, d)] = i;
                self.mv[cell(e, d)] = mv;

                if slid == read_len {
                    // Prefer the fewest net indels among this row's successes.
                    match best_d {
                        Some(b) if d.abs() >= b.abs() => {}
                        _ => best_d = Some(d),
                    }
                }
            }

            if let Some(d) = best_d {
                return Some(self.finish(read_len, e, d, rqual, ops));
            }
        }

        None
    }

    /// Trace the winning path back, accumulating the match probability and
    /// (optionally) the edit script.
    fn finish(
        &self,
        read_len: i32,
        final_e: u32,
        final_d: i32,
        rqual: impl Fn(i32) -> u8,
        ops: Option<&mut Vec<CigarOp>>,
    ) -> ScoreResult {
        let mut probability = 1.0f64;
        // Collected from alignment end to start, reversed at the end.
        let mut rev_ops: Vec<CigarOp> = Vec::new();

        let mut e = final_e;
        let mut d = final_d;
        let mut i = read_len;
        loop {
            let pre = self.pre[cell(e, d)];
            let matched = i - pre;
            for m in 0..matched {
                probability *= 1.0 - self.phred_err[(rqual(pre + m) & 63) as usize];
            }
            rev_ops.push(CigarOp::new(CigarOpKind::Equal, matched as u32));

            match self.mv[cell(e, d)] {
                MOVE_NONE => break,
                MOVE_SUB => {
                    probability *= self.phred_err[(rqual(pre - 1) & 63) as usize];
                    rev_ops.push(CigarOp::new(CigarOpKind::Diff, 1));
                    i = pre - 1;
                    e -= 1;
                }
                MOVE_INS => {
                    rev_ops.push(CigarOp::new(CigarOpKind::Ins, 1));
                    i = pre - 1;
                    d += 1;
                    e -= 1;
                }
                MOVE_DEL => {
                    rev_ops.push(CigarOp::new(CigarOpKind::Del, 1));
                    i = pre;
                    d -= 1;
                    e -= 1;
                }
                _ => unreachable!("corrupt traceback"),
            }
        }

        rev_ops.reverse();
        canonicalize_cigar(&mut rev_ops);

        // Gap runs contribute open * extend^(len-1).
        for op in &rev_ops {
            if matches!(op.kind, CigarOpKind::Ins | CigarOpKind::Del) {
                probability *= GAP_OPEN_PROB * GAP_EXTEND_PROB.powi(op.len as i32 - 1);
            }
        }

        if let Some(ops) = ops {
            ops.clear();
            ops.extend_from_slice(&rev_ops);
        }

        ScoreResult {
            distance: final_e,
            match_probability: probability,
            net_offset: final_d,
        }
    }
}
