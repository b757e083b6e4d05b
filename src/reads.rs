use crate::error::Error;
use crate::params::ClippingPolicy;

/// Upper bound on read length the aligners are sized for.
pub const MAX_READ_SIZE: usize = 400;

/// Phred quality at or below which end bases are considered clippable
/// (Illumina's read-segment quality control indicator).
const CLIP_QUALITY: u8 = 2;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Orientation of an alignment: the read as sequenced, or its reverse
/// complement. The aligners treat the two symmetrically and index per-direction
/// arrays by `Direction as usize`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward = 0,
    Rc = 1,
}

pub const NUM_DIRECTIONS: usize = 2;
pub const DIRECTIONS: [Direction; NUM_DIRECTIONS] = [Direction::Forward, Direction::Rc];

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Self::Forward => Self::Rc,
            Self::Rc => Self::Forward,
        }
    }
}

/// Complement of an encoded base; N maps to itself.
pub fn complement(base: u8) -> u8 {
    if base < 4 { 3 - base } else { base }
}

// ---------------------------------------------------------------------------
// Read
// ---------------------------------------------------------------------------

/// A single sequenced fragment.
///
/// Bases are encoded 0=A, 1=C, 2=G, 3=T, 4=N; qualities are raw phred values
/// (0-63). Clipping is logical: the full data is retained for output and the
/// aligners see the `bases()`/`quals()` window.
#[derive(Debug, Clone)]
pub struct Read {
    name: String,
    bases: Vec<u8>,
    quals: Vec<u8>,
    clip_front: usize,
    clip_back: usize,
}

impl Read {
    pub fn new(name: impl Into<String>, bases: Vec<u8>, quals: Vec<u8>) -> Result<Self, Error> {
        let name = name.into();
        if bases.len() != quals.len() {
            return Err(Error::Read(format!(
                "read '{}' has {} bases but {} quality values",
                name,
                bases.len(),
                quals.len()
            )));
        }
        Ok(Self {
            name,
            bases,
            quals,
            clip_front: 0,
            clip_back: 0,
        })
    }

    /// Trim low-quality runs from the ends selected by the clipping policy.
    pub fn apply_clipping(&mut self, policy: ClippingPolicy) {
        let (front, back) = match policy {
            ClippingPolicy::None => (false, false),
            ClippingPolicy::Front => (true, false),
            ClippingPolicy::Back => (false, true),
            ClippingPolicy::FrontAndBack => (true, true),
        };

        self.clip_front = 0;
        self.clip_back = 0;
        if back {
            self.clip_back = self
                .quals
                .iter()
                .rev()
                .take_while(|&&q| q <= CLIP_QUALITY)
                .count();
        }
        if front {
            self.clip_front = self.quals[..self.quals.len() - self.clip_back]
                .iter()
                .take_while(|&&q| q <= CLIP_QUALITY)
                .count();
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clipped length seen by the aligners.
    pub fn len(&self) -> usize {
        self.bases.len() - self.clip_front - self.clip_back
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The clipped base window.
    pub fn bases(&self) -> &[u8] {
        &self.bases[self.clip_front..self.bases.len() - self.clip_back]
    }

    /// The clipped quality window.
    pub fn quals(&self) -> &[u8] {
        &self.quals[self.clip_front..self.quals.len() - self.clip_back]
    }

    pub fn unclipped_bases(&self) -> &[u8] {
        &self.bases
    }

    pub fn unclipped_quals(&self) -> &[u8] {
        &self.quals
    }

    pub fn clip_front(&self) -> usize {
        self.clip_front
    }

    pub fn clip_back(&self) -> usize {
        self.clip_back
    }

    /// Number of N bases in the clipped window.
    pub fn count_of_ns(&self) -> usize {
        self.bases().iter().filter(|&&b| b == 4).count()
    }

    /// The reverse complement of this read's clipped window: bases reversed
    /// and complemented, qualities reversed. The result carries no clipping.
    pub fn reverse_complement(&self) -> Read {
        let bases: Vec<u8> = self.bases().iter().rev().map(|&b| complement(b)).collect();
        let quals: Vec<u8> = self.quals().iter().rev().copied().collect();
        Read {
            name: self.name.clone(),
            bases,
            quals,
            clip_front: 0,
            clip_back: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(bases: &[u8], quals: &[u8]) -> Read {
        Read::new("r", bases.to_vec(), quals.to_vec()).unwrap()
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let err = Read::new("bad", vec![0, 1, 2], vec![30, 30]).unwrap_err();
        assert!(err.to_string().contains("bad"));
    }

    #[test]
    fn clipping_back_only() {
        let mut r = read(&[0, 1, 2, 3, 0], &[30, 30, 30, 2, 2]);
        r.apply_clipping(ClippingPolicy::Back);
        assert_eq!(r.len(), 3);
        assert_eq!(r.bases(), &[0, 1, 2]);
        assert_eq!(r.unclipped_bases().len(), 5);
    }

    #[test]
    fn clipping_front_and_back() {
        let mut r = read(&[0, 1, 2, 3, 0], &[1, 30, 30, 30, 0]);
        r.apply_clipping(ClippingPolicy::FrontAndBack);
        assert_eq!(r.bases(), &[1, 2, 3]);
        assert_eq!(r.clip_front(), 1);
        assert_eq!(r.clip_back(), 1);
    }

    #[test]
    fn clipping_none_leaves_everything() {
        let mut r = read(&[0, 1], &[0, 0]);
        r.apply_clipping(ClippingPolicy::None);
        assert_eq!(r.len(), 2);
    }

    #[test]
    fn clipping_all_low_quality() {
        let mut r = read(&[0, 1, 2], &[2, 2, 2]);
        r.apply_clipping(ClippingPolicy::Back);
        assert_eq!(r.len(), 0);
        assert!(r.is_empty());
    }

    #[test]
    fn reverse_complement() {
        // AACC -> GGTT
        let r = read(&[0, 0, 1, 1], &[10, 20, 30, 40]);
        let rc = r.reverse_complement();
        assert_eq!(rc.bases(), &[2, 2, 3, 3]);
        assert_eq!(rc.quals(), &[40, 30, 20, 10]);
    }

    #[test]
    fn reverse_complement_preserves_n() {
        let r = read(&[0, 4, 1], &[30, 30, 30]);
        let rc = r.reverse_complement();
        assert_eq!(rc.bases(), &[2, 4, 3]);
    }

    #[test]
    fn count_ns_in_clipped_window() {
        let mut r = read(&[4, 0, 4, 1, 4], &[30, 30, 30, 30, 2]);
        r.apply_clipping(ClippingPolicy::Back);
        assert_eq!(r.count_of_ns(), 2);
    }

    #[test]
    fn direction_opposite() {
        assert_eq!(Direction::Forward.opposite(), Direction::Rc);
        assert_eq!(Direction::Rc.opposite(), Direction::Forward);
    }

    #[test]
    fn complement_table() {
        assert_eq!(complement(0), 3);
        assert_eq!(complement(1), 2);
        assert_eq!(complement(2), 1);
        assert_eq!(complement(3), 0);
        assert_eq!(complement(4), 4);
    }
}
