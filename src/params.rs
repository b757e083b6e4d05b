use std::path::PathBuf;

use clap::Parser;

// ---------------------------------------------------------------------------
// Run mode enum
// ---------------------------------------------------------------------------

/// SNAP's sub-program selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Single,
    Paired,
    BuildIndex,
}

impl std::str::FromStr for RunMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single" => Ok(Self::Single),
            "paired" => Ok(Self::Paired),
            "buildIndex" => Ok(Self::BuildIndex),
            _ => Err(format!(
                "unknown runMode '{s}'; expected 'single', 'paired' or 'buildIndex'"
            )),
        }
    }
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Paired => write!(f, "paired"),
            Self::BuildIndex => write!(f, "buildIndex"),
        }
    }
}

// ---------------------------------------------------------------------------
// Read clipping policy
// ---------------------------------------------------------------------------

/// Which low-quality read ends to logically trim before alignment.
/// SNAP's `-Cxx` option; the default clips the back (3') end only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClippingPolicy {
    None,
    Front,
    Back,
    FrontAndBack,
}

impl Default for ClippingPolicy {
    fn default() -> Self {
        Self::Back
    }
}

impl std::str::FromStr for ClippingPolicy {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "front" => Ok(Self::Front),
            "back" => Ok(Self::Back),
            "both" => Ok(Self::FrontAndBack),
            _ => Err(format!(
                "unknown clipping value '{s}'; expected 'none', 'front', 'back' or 'both'"
            )),
        }
    }
}

// ---------------------------------------------------------------------------
// Output filter
// ---------------------------------------------------------------------------

/// SNAP's `-F` output filter: which alignment results reach the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFilter {
    /// `a`: any aligned read (single or multiple hits).
    Aligned,
    /// `s`: single-hit reads only.
    SingleHitOnly,
    /// `u`: unaligned reads only.
    Unaligned,
}

impl std::str::FromStr for OutputFilter {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" => Ok(Self::Aligned),
            "s" => Ok(Self::SingleHitOnly),
            "u" => Ok(Self::Unaligned),
            _ => Err(format!("unknown filter '{s}'; expected 'a', 's' or 'u'")),
        }
    }
}

// ---------------------------------------------------------------------------
// Parameter ranges (sweeps)
// ---------------------------------------------------------------------------

/// An inclusive parameter range with a step, for parameter sweeps.
///
/// Parsed from either a single value (`"14"`) or `start:end:step`
/// (`"10:20:2"`). A single value is a range of one setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: u32,
    pub end: u32,
    pub step: u32,
}

impl Range {
    pub fn single(value: u32) -> Self {
        Self {
            start: value,
            end: value,
            step: 1,
        }
    }

    /// Number of settings in the range.
    pub fn size(&self) -> usize {
        ((self.end - self.start) / self.step + 1) as usize
    }

    /// All settings, in sweep order.
    pub fn values(&self) -> impl Iterator<Item = u32> {
        (self.start..=self.end).step_by(self.step as usize)
    }
}

impl std::str::FromStr for Range {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let parse = |t: &str| {
            t.parse::<u32>()
                .map_err(|_| format!("invalid range component '{t}' in '{s}'"))
        };
        match parts.as_slice() {
            [v] => Ok(Self::single(parse(v)?)),
            [a, b, c] => {
                let (start, end, step) = (parse(a)?, parse(b)?, parse(c)?);
                if step == 0 {
                    return Err(format!("range step must be nonzero in '{s}'"));
                }
                if start > end {
                    return Err(format!("range start exceeds end in '{s}'"));
                }
                Ok(Self { start, end, step })
            }
            _ => Err(format!(
                "invalid range '{s}'; expected a value or start:end:step"
            )),
        }
    }
}

impl std::fmt::Display for Range {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}:{}", self.start, self.end, self.step)
        }
    }
}

/// One concrete setting of the sweepable aligner parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamSetting {
    pub conf_diff: u32,
    pub max_hits: u32,
    pub max_dist: u32,
    pub num_seeds: u32,
    pub adaptive_conf_diff: u32,
}

// ---------------------------------------------------------------------------
// Parameters struct
// ---------------------------------------------------------------------------

/// ruSNAP command-line parameters, matching SNAP's option vocabulary.
///
/// The five sweepable parameters accept ranges (`start:end:step`); every
/// setting in the cross product runs a full alignment pass. Defaults for
/// those five depend on the run mode (paired alignment tolerates one more
/// edit and far more popular seeds), so they are resolved through accessor
/// methods rather than clap defaults.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ruSNAP",
    about = "Short-read DNA aligner (Rust reimplementation of SNAP)",
    version
)]
pub struct Parameters {
    // ── Run ─────────────────────────────────────────────────────────────
    /// Run mode: single, paired or buildIndex
    #[arg(long = "runMode", default_value = "single")]
    pub run_mode: RunMode,

    /// Number of worker threads
    #[arg(short = 't', long = "runThreadN", default_value_t = 1)]
    pub run_thread_n: usize,

    // ── Index ───────────────────────────────────────────────────────────
    /// Path to the genome index directory
    #[arg(long = "indexDir", default_value = "./IndexDir")]
    pub index_dir: PathBuf,

    /// FASTA file(s) with reference sequences (for buildIndex)
    #[arg(long = "genomeFastaFiles", num_args = 1..)]
    pub genome_fasta_files: Vec<PathBuf>,

    /// Seed length for buildIndex (4-31)
    #[arg(long = "seedLen", default_value_t = 20)]
    pub seed_len: u32,

    // ── Reads ───────────────────────────────────────────────────────────
    /// Input FASTQ file(s); two files for paired-end
    #[arg(long = "readFilesIn", num_args = 1..=2)]
    pub read_files_in: Vec<PathBuf>,

    /// Clipping of low-quality read ends: none, front, back or both
    #[arg(long = "clipping", default_value = "back")]
    pub clipping: ClippingPolicy,

    /// Randomly score only 1/selectivity of the reads (deterministic)
    #[arg(short = 'S', long = "selectivity", default_value_t = 1)]
    pub selectivity: u32,

    // ── Alignment (sweepable) ───────────────────────────────────────────
    /// Maximum edit distance per read or pair (range allowed)
    #[arg(short = 'd', long = "maxDist")]
    pub max_dist: Option<Range>,

    /// Number of seeds to use per read (range allowed)
    #[arg(short = 'n', long = "numSeeds")]
    pub num_seeds: Option<Range>,

    /// Maximum hits to consider per seed before it counts as popular (range allowed)
    #[arg(long = "maxHits")]
    pub max_hits: Option<Range>,

    /// Confidence threshold: margin to declare a unique hit (range allowed)
    #[arg(short = 'c', long = "confDiff")]
    pub conf_diff: Option<Range>,

    /// Popular-seed count that raises confDiff by one (range allowed)
    #[arg(short = 'a', long = "adaptiveConfDiff")]
    pub adaptive_conf_diff: Option<Range>,

    // ── Paired-end ──────────────────────────────────────────────────────
    /// Minimum spacing to allow between paired ends
    #[arg(long = "minSpacing", default_value_t = 100)]
    pub min_spacing: u32,

    /// Maximum spacing to allow between paired ends
    #[arg(long = "maxSpacing", default_value_t = 1000)]
    pub max_spacing: u32,

    /// How far beyond the best pair score to keep searching
    #[arg(long = "extraSearchDepth", default_value_t = 2)]
    pub extra_search_depth: u32,

    // ── Behavior flags ──────────────────────────────────────────────────
    /// Explore the first maxHits hits even for overly popular seeds
    #[arg(short = 'x', long = "explorePopularSeeds")]
    pub explore_popular_seeds: bool,

    /// Stop on the first hit within the edit-distance limit (filtering mode)
    #[arg(short = 'f', long = "stopOnFirstHit")]
    pub stop_on_first_hit: bool,

    /// Use M in CIGAR strings rather than = and X
    #[arg(short = 'M', long = "useM")]
    pub use_m: bool,

    /// Output filter: a=aligned only, s=single hit only, u=unaligned only
    #[arg(short = 'F', long = "filter")]
    pub filter: Option<OutputFilter>,

    // ── Output ──────────────────────────────────────────────────────────
    /// Output alignments to this file in SAM format
    #[arg(short = 'o', long = "outputFile")]
    pub output_file: Option<PathBuf>,
}

impl Parameters {
    /// Mode-resolved default for `--maxDist`.
    pub fn max_dist(&self) -> Range {
        self.max_dist.unwrap_or_else(|| {
            Range::single(if self.run_mode == RunMode::Paired { 15 } else { 14 })
        })
    }

    /// Mode-resolved default for `--numSeeds`.
    pub fn num_seeds(&self) -> Range {
        self.num_seeds.unwrap_or(Range::single(25))
    }

    /// Mode-resolved default for `--maxHits`.
    pub fn max_hits(&self) -> Range {
        self.max_hits.unwrap_or_else(|| {
            Range::single(if self.run_mode == RunMode::Paired { 2000 } else { 300 })
        })
    }

    /// Mode-resolved default for `--confDiff`.
    pub fn conf_diff(&self) -> Range {
        self.conf_diff.unwrap_or_else(|| {
            Range::single(if self.run_mode == RunMode::Paired { 1 } else { 2 })
        })
    }

    /// Mode-resolved default for `--adaptiveConfDiff`.
    pub fn adaptive_conf_diff(&self) -> Range {
        self.adaptive_conf_diff.unwrap_or_else(|| {
            Range::single(if self.run_mode == RunMode::Paired { 7 } else { 4 })
        })
    }

    /// True if any sweepable parameter was given as a real range.
    pub fn is_sweep(&self) -> bool {
        self.sweep_settings().len() > 1
    }

    /// The cross product of all sweepable parameter ranges, in SNAP's
    /// iteration order: confDiff varies slowest, adaptiveConfDiff fastest.
    pub fn sweep_settings(&self) -> Vec<ParamSetting> {
        let mut settings = Vec::new();
        for conf_diff in self.conf_diff().values() {
            for max_hits in self.max_hits().values() {
                for max_dist in self.max_dist().values() {
                    for num_seeds in self.num_seeds().values() {
                        for adaptive_conf_diff in self.adaptive_conf_diff().values() {
                            settings.push(ParamSetting {
                                conf_diff,
                                max_hits,
                                max_dist,
                                num_seeds,
                                adaptive_conf_diff,
                            });
                        }
                    }
                }
            }
        }
        settings
    }

    /// Validate parameter combinations that clap alone cannot enforce.
    pub fn validate(&self) -> Result<(), crate::error::Error> {
        use crate::error::Error;

        match self.run_mode {
            RunMode::BuildIndex => {
                if self.genome_fasta_files.is_empty() {
                    return Err(Error::Parameter(
                        "--genomeFastaFiles is required when --runMode buildIndex".into(),
                    ));
                }
                if !(4..=31).contains(&self.seed_len) {
                    return Err(Error::Parameter(format!(
                        "--seedLen must be in 4..=31, got {}",
                        self.seed_len
                    )));
                }
            }
            RunMode::Single => {
                if self.read_files_in.len() != 1 {
                    return Err(Error::Parameter(
                        "--readFilesIn requires exactly one file when --runMode single".into(),
                    ));
                }
            }
            RunMode::Paired => {
                if self.read_files_in.len() != 2 {
                    return Err(Error::Parameter(
                        "--readFilesIn requires exactly two files when --runMode paired".into(),
                    ));
                }
                if self.min_spacing > self.max_spacing {
                    return Err(Error::Parameter(format!(
                        "--minSpacing ({}) exceeds --maxSpacing ({})",
                        self.min_spacing, self.max_spacing
                    )));
                }
            }
        }

        if self.run_thread_n == 0 {
            return Err(Error::Parameter("--runThreadN must be >= 1".into()));
        }
        if self.selectivity == 0 {
            return Err(Error::Parameter("--selectivity must be >= 1".into()));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
