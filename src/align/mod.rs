pub mod base;
pub mod candidates;
pub mod hit_set;
pub mod lv;
pub mod paired;

// Re-export commonly used types
pub use base::{AlignmentResult, BaseAligner, Hit, SingleAlignment, MAX_MULTI_HITS_TO_GET};
pub use lv::{CigarOp, CigarOpKind, LandauVishkin, ScoreResult, MAX_K};
pub use paired::{IntersectingPairedEndAligner, PairedAlignment, PairedEndResult};
