use crate::align::base::{AlignmentResult, BaseAligner, Hit};
use crate::align::hit_set::{HashTableHitSet, HitLocationRingBuffer};
use crate::align::lv::{LandauVishkin, SNP_PROB};
use crate::genome::Genome;
use crate::index::{GenomeIndex, Seed};
use crate::mapq::compute_mapq;
use crate::reads::{Direction, Read, DIRECTIONS, NUM_DIRECTIONS};

pub const NUM_READS_PER_PAIR: usize = 2;
/// A "set pair" is read0 FORWARD + read1 RC, or read0 RC + read1 FORWARD; a
/// mate pair on the reference must lie in one of the two.
const NUM_SET_PAIRS: usize = 2;

/// Headroom above maxK while Phase 2 has not yet found any pair.
const EXTRA_SCORE_LIMIT: u32 = 5;
/// Once the scored pair probability mass reaches this, MAPQ is pinned at
/// zero and scoring more candidates cannot change the outcome.
const PROBABILITY_SATURATION: f64 = 4.9;
/// Ends shorter than this fall back to independent single-end alignment.
const MIN_PAIRED_READ_LEN: usize = 50;

const MAX_MERGE_DISTANCE: u32 = 31;

/// Per-end slice of a paired alignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairedEndResult {
    pub status: AlignmentResult,
    /// None exactly when status is NotFound.
    pub hit: Option<Hit>,
    pub mapq: u8,
}

impl PairedEndResult {
    fn not_found() -> Self {
        Self {
            status: AlignmentResult::NotFound,
            hit: None,
            mapq: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairedAlignment {
    pub ends: [PairedEndResult; NUM_READS_PER_PAIR],
}

/// Suppresses near-identical pair candidates (both ends within
/// MAX_MERGE_DISTANCE of an earlier pair) so indel-shifted duplicates of one
/// pairing do not double-count probability mass.
struct MergeAnchor {
    location_for_fewer: u32,
    location_for_more: u32,
    match_probability: f64,
    pair_score: u32,
    valid: bool,
}

enum MergeOutcome {
    /// Unrelated to the anchor; the anchor moves here.
    NotMerged,
    /// Same cluster but better; the old probability should be backed out.
    MergedBetter { old_probability: f64 },
    /// Same cluster and no better; contributes nothing.
    MergedWorse,
}

impl MergeAnchor {
    fn new() -> Self {
        Self {
            location_for_fewer: 0,
            location_for_more: 0,
            match_probability: 0.0,
            pair_score: 0,
            valid: false,
        }
    }

    fn is_within(a: u32, b: u32) -> bool {
        a.abs_diff(b) <= MAX_MERGE_DISTANCE
    }

    fn check_merge(
        &mut self,
        new_fewer: u32,
        new_more: u32,
        new_probability: f64,
        new_pair_score: u32,
    ) -> MergeOutcome {
        if !self.valid
            || !Self::is_within(self.location_for_fewer, new_fewer)
            || !Self::is_within(self.location_for_more, new_more)
        {
            self.location_for_fewer = new_fewer;
            self.location_for_more = new_more;
            self.match_probability = new_probability;
            self.pair_score = new_pair_score;
            self.valid = true;
            return MergeOutcome::NotMerged;
        }

        if new_pair_score < self.pair_score
            || (new_pair_score == self.pair_score && new_probability > self.match_probability)
        {
            let old_probability = self.match_probability;
            self.location_for_fewer = new_fewer;
            self.location_for_more = new_more;
            self.match_probability = new_probability;
            self.pair_score = new_pair_score;
            MergeOutcome::MergedBetter { old_probability }
        } else {
            MergeOutcome::MergedWorse
        }
    }
}

/// A paired-end aligner based on set intersections to narrow down candidate
/// location pairs. Phase 1 records seed lookups for both ends in both
/// orientations; Phase 2 walks the two set pairs down the genome in
/// alternation, scoring pairings whose spacing falls inside the configured
/// window. Not thread safe.
pub struct IntersectingPairedEndAligner<'a> {
    index: &'a GenomeIndex,
    seed_len: u32,
    max_k: u32,
    max_seeds: u32,
    min_spacing: u32,
    max_spacing: u32,
    max_big_hits: u32,
    extra_search_depth: u32,

    lv: LandauVishkin,
    base_aligner: BaseAligner<'a>,
    seed_used: Vec<bool>,
    hit_locations: [HitLocationRingBuffer; NUM_SET_PAIRS],
    mate_hit_locations: [HitLocationRingBuffer; NUM_SET_PAIRS],

    n_lv_calls: u64,
    n_small_hits: u64,
}

impl<'a> IntersectingPairedEndAligner<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        index: &'a GenomeIndex,
        max_k: u32,
        max_seeds: u32,
        min_spacing: u32,
        max_spacing: u32,
        max_big_hits: u32,
        extra_search_depth: u32,
    ) -> Self {
        let max_k = max_k.min(crate::align::lv::MAX_K);
        let small_ring = || HitLocationRingBuffer::new(MAX_MERGE_DISTANCE as usize * 2 + 2);
        let mate_ring = || HitLocationRingBuffer::new(2 * (max_spacing as usize + 1) + 2);
        Self {
            index,
            seed_len: index.seed_len(),
            max_k,
            max_seeds,
            min_spacing,
            max_spacing,
            max_big_hits,
            extra_search_depth,
            lv: LandauVishkin::new(),
            base_aligner: BaseAligner::new(index, 1, max_big_hits, max_k / 2, max_seeds, 4),
            seed_used: vec![false; crate::reads::MAX_READ_SIZE],
            hit_locations: [small_ring(), small_ring()],
            mate_hit_locations: [mate_ring(), mate_ring()],
            n_lv_calls: 0,
            n_small_hits: 0,
        }
    }

    pub fn n_lv_calls(&self) -> u64 {
        self.n_lv_calls
    }

    pub fn n_small_hits(&self) -> u64 {
        self.n_small_hits
    }

    pub fn base_aligner(&self) -> &BaseAligner<'a> {
        &self.base_aligner
    }

    /// Align a read pair.
    pub fn align(&mut self, read0: &Read, read1: &Read) -> PairedAlignment {
        // The intersection algorithm needs enough seeds for reliable hit
        // lists; short or N-heavy reads go through the single-end aligner.
        if read0.len() < MIN_PAIRED_READ_LEN || read1.len() < MIN_PAIRED_READ_LEN {
            return self.align_with_base_aligner(read0, read1, 70);
        }
        let count_of_ns = read0.count_of_ns() + read1.count_of_ns();
        if count_of_ns as u32 > self.max_k {
            return self.align_with_base_aligner(read0, read1, 70);
        }

        let rc0 = read0.reverse_complement();
        let rc1 = read1.reverse_complement();
        let reads: [[&Read; NUM_DIRECTIONS]; NUM_READS_PER_PAIR] =
            [[read0, &rc0], [read1, &rc1]];

        // Phase 1: record the seed lookups for each end in both directions.
        let index: &'a GenomeIndex = self.index;
        let mut hit_sets: [[HashTableHitSet<'a>; NUM_DIRECTIONS]; NUM_READS_PER_PAIR] =
            std::array::from_fn(|_| {
                std::array::from_fn(|_| HashTableHitSet::new(self.max_seeds as usize))
            });
        let mut popular_seeds_skipped = [0u32; NUM_READS_PER_PAIR];

        for which_read in 0..NUM_READS_PER_PAIR {
            let read = reads[which_read][Direction::Forward as usize];
            let read_len = read.len();
            let seed_len = self.seed_len as usize;
            if read_len < seed_len {
                return self.align_with_base_aligner(read0, read1, 70);
            }
            let n_possible = read_len - seed_len + 1;
            self.seed_used[..n_possible].fill(false);

            let mut next_seed_to_test = 0usize;
            let mut wrap_count = 0u32;
            let mut n_lookups = 0u32;

            while (n_lookups as usize) < n_possible && n_lookups < self.max_seeds {
                if next_seed_to_test >= n_possible {
                    wrap_count += 1;
                    if wrap_count >= self.seed_len {
                        break;
                    }
                    next_seed_to_test =
                        crate::align::base::wrapped_seed_offset(self.seed_len, wrap_count)
                            as usize;
                }
                while next_seed_to_test < n_possible && self.seed_used[next_seed_to_test] {
                    next_seed_to_test += 1;
                }
                if next_seed_to_test >= n_possible {
                    continue;
                }
                self.seed_used[next_seed_to_test] = true;
                let offset = next_seed_to_test;
                next_seed_to_test += seed_len;

                let Some(seed) = Seed::from_bases(&read.bases()[offset..offset + seed_len])
                else {
                    next_seed_to_test = offset + 1;
                    continue;
                };

                let hits = index.lookup_seed(seed);
                n_lookups += 1;

                for direction in DIRECTIONS {
                    let (list, seed_offset) = match direction {
                        Direction::Forward => (hits.forward, offset),
                        Direction::Rc => (hits.rc, read_len - seed_len - offset),
                    };
                    if list.len() < self.max_big_hits as usize {
                        hit_sets[which_read][direction as usize]
                            .record_lookup(seed_offset as u32, list);
                    } else {
                        popular_seeds_skipped[which_read] += 1;
                    }
                }
            }
        }

        let total_hits = |which: usize| {
            hit_sets[which][0].total_hits() + hit_sets[which][1].total_hits()
        };
        let read_with_more_hits = if total_hits(0) > total_hits(1) { 0 } else { 1 };
        let read_with_fewer_hits = 1 - read_with_more_hits;

        // Phase 2: intersect the sets to find pairs. We look for hits on the
        // fewer-hits read that have mate hits in the spacing window, scoring
        // as we go, and alternate between the two set pairs to push the
        // score limit down quickly.
        let [[hs0f, hs0r], [hs1f, hs1r]] = &mut hit_sets;
        let mut set_pair: [[&mut HashTableHitSet<'a>; NUM_READS_PER_PAIR]; NUM_SET_PAIRS] =
            [[hs0f, hs1r], [hs0r, hs1f]];
        let set_pair_direction: [[Direction; NUM_READS_PER_PAIR]; NUM_SET_PAIRS] = [
            [Direction::Forward, Direction::Rc],
            [Direction::Rc, Direction::Forward],
        ];

        struct IntersectionState {
            last_seed_offset_for_fewer: u32,
            last_location_for_fewer: u32,
            last_location_for_more: Option<u32>,
        }
        let mut state: [IntersectionState; NUM_SET_PAIRS] = std::array::from_fn(|_| {
            IntersectionState {
                last_seed_offset_for_fewer: 0,
                last_location_for_fewer: 0,
                last_location_for_more: None,
            }
        });

        let mut set_pair_done = [false; NUM_SET_PAIRS];
        for pair in 0..NUM_SET_PAIRS {
            self.hit_locations[pair].clear();
            self.mate_hit_locations[pair].clear();
            match set_pair[pair][read_with_fewer_hits].get_first_hit() {
                Some((location, seed_offset)) => {
                    state[pair].last_location_for_fewer = location;
                    state[pair].last_seed_offset_for_fewer = seed_offset;
                }
                None => set_pair_done[pair] = true,
            }
        }

        let mut which_pair = if set_pair_done[0] { 1 } else { 0 };

        let mut best_pair_score = u32::MAX;
        let mut probability_of_best_pair = 0.0f64;
        let mut probability_of_all_pairs = 0.0f64;
        let mut best_locations = [0u32; NUM_READS_PER_PAIR];
        let mut best_directions = [Direction::Forward; NUM_READS_PER_PAIR];
        let mut best_scores = [0u32; NUM_READS_PER_PAIR];
        let mut score_limit = self.max_k + EXTRA_SCORE_LIMIT;
        let mut merge_anchor = MergeAnchor::new();
        let mut gave_up_early = false;

        'phase2: while !(set_pair_done[0] && set_pair_done[1]) {
            if set_pair_done[which_pair] {
                which_pair = 1 - which_pair;
                continue;
            }
            let small_location = state[which_pair].last_location_for_fewer;
            self.n_small_hits += 1;

            // Make sure the mate-side cursor and ring window cover
            // [small - maxSpacing, small + maxSpacing].
            let advance_fewer_and_flip = |state: &mut [IntersectionState; NUM_SET_PAIRS],
                                          set_pair: &mut [[&mut HashTableHitSet<'a>;
                                              NUM_READS_PER_PAIR];
                                              NUM_SET_PAIRS],
                                          set_pair_done: &mut [bool; NUM_SET_PAIRS],
                                          which_pair: usize|
             -> usize {
                match set_pair[which_pair][read_with_fewer_hits].get_next_lower_hit() {
                    Some((location, seed_offset)) => {
                        state[which_pair].last_location_for_fewer = location;
                        state[which_pair].last_seed_offset_for_fewer = seed_offset;
                    }
                    None => set_pair_done[which_pair] = true,
                }
                if !set_pair_done[1 - which_pair] {
                    1 - which_pair
                } else {
                    which_pair
                }
            };

            let window_top = small_location.saturating_add(self.max_spacing);
            if state[which_pair]
                .last_location_for_more
                .map_or(true, |loc| loc > window_top)
            {
                // The mate cursor is too high in the genome to pair with this
                // hit; everything remembered is out of range too.
                self.mate_hit_locations[which_pair].clear();
                match set_pair[which_pair][read_with_more_hits]
                    .get_next_hit_less_than_or_equal(window_top)
                {
                    Some((location, seed_offset)) => {
                        state[which_pair].last_location_for_more = Some(location);
                        self.mate_hit_locations[which_pair].insert_head(location, seed_offset);
                    }
                    None => {
                        // Nothing left for the mate at all.
                        set_pair_done[which_pair] = true;
                        which_pair = 1 - which_pair;
                        continue;
                    }
                }
            } else {
                self.mate_hit_locations[which_pair].trim_above_location(window_top);
            }

            let min_location_to_check = small_location.saturating_sub(self.max_spacing);

            let no_mate_possible = match self.mate_hit_locations[which_pair].tail_entry() {
                None => true,
                Some(tail) => tail.genome_location < min_location_to_check,
            };
            if no_mate_possible {
                // Skip the fewer-hits side forward to the first location that
                // could pair with the mate hits we do have.
                let more_location = self.mate_hit_locations[which_pair]
                    .tail_entry()
                    .map(|t| t.genome_location)
                    .or(state[which_pair].last_location_for_more);
                let Some(more_location) = more_location else {
                    set_pair_done[which_pair] = true;
                    which_pair = 1 - which_pair;
                    continue;
                };
                match set_pair[which_pair][read_with_fewer_hits]
                    .get_next_hit_less_than_or_equal(
                        more_location.saturating_add(self.max_spacing),
                    ) {
                    Some((location, seed_offset)) => {
                        state[which_pair].last_location_for_fewer = location;
                        state[which_pair].last_seed_offset_for_fewer = seed_offset;
                        if !set_pair_done[1 - which_pair] {
                            which_pair = 1 - which_pair;
                        }
                    }
                    None => {
                        set_pair_done[which_pair] = true;
                        which_pair = 1 - which_pair;
                    }
                }
                continue;
            }

            // Suppress small-side hits within the merge window of one we
            // already scored; their pairings would double-count.
            self.hit_locations[which_pair]
                .trim_above_location(small_location.saturating_add(MAX_MERGE_DISTANCE));
            let near_duplicate = self.hit_locations[which_pair]
                .indices()
                .any(|i| {
                    self.hit_locations[which_pair]
                        .get(i)
                        .genome_location
                        .abs_diff(small_location)
                        <= MAX_MERGE_DISTANCE
                });
            if near_duplicate {
                which_pair =
                    advance_fewer_and_flip(&mut state, &mut set_pair, &mut set_pair_done, which_pair);
                continue;
            }

            // Score the fewer-hits end here.
            let fewer_direction = set_pair_direction[which_pair][read_with_fewer_hits];
            self.n_lv_calls += 1;
            let scored = score_location(
                &mut self.lv,
                index.genome(),
                self.seed_len,
                self.max_k,
                reads[read_with_fewer_hits][fewer_direction as usize],
                small_location,
                state[which_pair].last_seed_offset_for_fewer,
                score_limit,
            );
            let Some((fewer_score, fewer_probability, fewer_offset)) = scored else {
                // Too far off to be useful; skip to the next lower location.
                which_pair =
                    advance_fewer_and_flip(&mut state, &mut set_pair, &mut set_pair_done, which_pair);
                continue;
            };
            self.hit_locations[which_pair].insert_head_scored(
                small_location,
                state[which_pair].last_seed_offset_for_fewer,
                Some(fewer_score),
                score_limit,
                fewer_probability,
            );

            // Pull mate hits down into the window.
            while state[which_pair]
                .last_location_for_more
                .is_some_and(|loc| loc >= min_location_to_check)
            {
                match set_pair[which_pair][read_with_more_hits].get_next_lower_hit() {
                    Some((location, seed_offset)) => {
                        state[which_pair].last_location_for_more = Some(location);
                        self.mate_hit_locations[which_pair].insert_head(location, seed_offset);
                    }
                    None => break,
                }
            }

            // Score every remembered mate hit whose spacing works.
            let more_direction = set_pair_direction[which_pair][read_with_more_hits];
            let mate_indices: Vec<usize> = self.mate_hit_locations[which_pair].indices().collect();
            for idx in mate_indices {
                let (mate_location, mate_seed_offset, mate_scored, mate_score, mate_limit) = {
                    let entry = self.mate_hit_locations[which_pair].get(idx);
                    (
                        entry.genome_location,
                        entry.seed_offset,
                        entry.is_scored,
                        entry.score,
                        entry.score_limit,
                    )
                };
                if mate_location < min_location_to_check {
                    break;
                }
                let delta = mate_location.abs_diff(small_location);
                if delta < self.min_spacing || delta > self.max_spacing {
                    continue;
                }

                let mate_budget = score_limit.saturating_sub(fewer_score);
                if !mate_scored || (mate_score.is_none() && mate_limit < mate_budget) {
                    self.n_lv_calls += 1;
                    let scored = score_location(
                        &mut self.lv,
                        index.genome(),
                        self.seed_len,
                        self.max_k,
                        reads[read_with_more_hits][more_direction as usize],
                        mate_location,
                        mate_seed_offset,
                        mate_budget,
                    );
                    let entry = self.mate_hit_locations[which_pair].get_mut(idx);
                    entry.is_scored = true;
                    entry.score_limit = mate_budget;
                    match scored {
                        Some((score, probability, offset)) => {
                            entry.score = Some(score);
                            entry.match_probability = probability;
                            entry.genome_location_offset = offset;
                        }
                        None => entry.score = None,
                    }
                }

                let entry = *self.mate_hit_locations[which_pair].get(idx);
                let Some(mate_score) = entry.score else {
                    continue;
                };

                let pair_score = fewer_score + mate_score;
                let pair_probability = fewer_probability * entry.match_probability;
                let fewer_final =
                    (small_location as i64 + fewer_offset as i64) as u32;
                let more_final =
                    (entry.genome_location as i64 + entry.genome_location_offset as i64) as u32;

                let outcome =
                    merge_anchor.check_merge(fewer_final, more_final, pair_probability, pair_score);
                match outcome {
                    MergeOutcome::MergedWorse => continue,
                    MergeOutcome::MergedBetter { old_probability } => {
                        probability_of_all_pairs += pair_probability - old_probability;
                    }
                    MergeOutcome::NotMerged => {
                        probability_of_all_pairs += pair_probability;
                    }
                }

                if pair_score <= self.max_k
                    && (pair_score < best_pair_score
                        || (pair_score == best_pair_score
                            && pair_probability > probability_of_best_pair))
                {
                    best_pair_score = pair_score;
                    probability_of_best_pair = pair_probability;
                    best_locations[read_with_fewer_hits] = fewer_final;
                    best_locations[read_with_more_hits] = more_final;
                    best_scores[read_with_fewer_hits] = fewer_score;
                    best_scores[read_with_more_hits] = mate_score;
                    best_directions[read_with_fewer_hits] = fewer_direction;
                    best_directions[read_with_more_hits] = more_direction;
                    score_limit = best_pair_score + self.extra_search_depth;
                }

                if probability_of_all_pairs >= PROBABILITY_SATURATION {
                    // Nothing will rescue us from a zero MAPQ.
                    gave_up_early = true;
                    break 'phase2;
                }
            }

            which_pair =
                advance_fewer_and_flip(&mut state, &mut set_pair, &mut set_pair_done, which_pair);
        }

        if best_pair_score > self.max_k {
            return PairedAlignment {
                ends: [PairedEndResult::not_found(), PairedEndResult::not_found()],
            };
        }

        let mut ends = [PairedEndResult::not_found(), PairedEndResult::not_found()];
        for which_read in 0..NUM_READS_PER_PAIR {
            let mut mapq = compute_mapq(
                probability_of_all_pairs,
                probability_of_best_pair,
                best_scores[which_read],
                popular_seeds_skipped[which_read],
                false,
                None,
            );
            if gave_up_early {
                mapq = (mapq / 5).min(3);
            }
            ends[which_read] = PairedEndResult {
                status: if mapq > 10 {
                    AlignmentResult::SingleHit
                } else {
                    AlignmentResult::MultipleHits
                },
                hit: Some(Hit {
                    location: best_locations[which_read],
                    direction: best_directions[which_read],
                    score: best_scores[which_read],
                }),
                mapq,
            };
        }
        PairedAlignment { ends }
    }

    /// Short-read / N-heavy fallback: align the two ends independently and
    /// cap their MAPQ.
    fn align_with_base_aligner(
        &mut self,
        read0: &Read,
        read1: &Read,
        max_mapq: u8,
    ) -> PairedAlignment {
        let mut ends = [PairedEndResult::not_found(), PairedEndResult::not_found()];
        for (which, read) in [read0, read1].into_iter().enumerate() {
            let single = self.base_aligner.align_read(read);
            ends[which] = PairedEndResult {
                status: single.result,
                hit: single.hit,
                mapq: single.mapq.min(max_mapq),
            };
        }
        PairedAlignment { ends }
    }
}

/// Score one end at a candidate location around its seed anchor: forward
/// from the seed's tail, then leftward from the seed's start, so indels on
/// either side of the seed are absorbed without exploring every start
/// shift. The window is truncated at piece boundaries. Returns
/// (score, matchProbability, genomeLocationOffset); None means the limit
/// was exceeded or the window fell off the reference.
#[allow(clippy::too_many_arguments)]
fn score_location(
    lv: &mut LandauVishkin,
    genome: &Genome,
    seed_len: u32,
    max_k: u32,
    read: &Read,
    genome_location: u32,
    seed_offset: u32,
    score_limit: u32,
) -> Option<(u32, f64, i32)> {
    let read_len = read.len();
    let seed_len = seed_len as usize;
    let seed_offset = seed_offset as usize;

    let piece_idx = genome.piece_index_at_location(genome_location)?;
    let piece_begin = genome.pieces()[piece_idx].beginning_offset;
    let piece_end = genome.piece_end(piece_idx);

    // Leave slack on both sides for indels near the seed.
    let left_slack = (genome_location - piece_begin).min(max_k) as usize;
    let window_start = genome_location - left_slack as u32;
    let wanted = left_slack + read_len + max_k as usize;
    let available = ((piece_end - window_start) as usize).min(wanted);
    let window = genome.substring(window_start, available)?;

    let seed_pos = left_slack + seed_offset;
    if seed_pos + seed_len > available {
        return None;
    }
    debug_assert_eq!(
        &window[seed_pos..seed_pos + seed_len],
        &read.bases()[seed_offset..seed_offset + seed_len],
        "seed must match the reference at its hit location"
    );

    // Tail: seed end to read end, forward.
    let tail_start = seed_offset + seed_len;
    let tail = lv.compute(
        &window[seed_pos + seed_len..],
        &read.bases()[tail_start..],
        &read.quals()[tail_start..],
        score_limit,
    )?;

    // Head: read start to seed start, leftward.
    let head_budget = score_limit - tail.distance;
    let head = lv.compute_backward(
        &window[..seed_pos],
        &read.bases()[..seed_offset],
        &read.quals()[..seed_offset],
        head_budget,
    )?;

    let score = tail.distance + head.distance;
    // Probabilities of the two flanks multiply; the seed itself matched
    // exactly, so it contributes the no-SNP factor per base.
    let probability = tail.match_probability
        * head.match_probability
        * (1.0 - SNP_PROB).powi(seed_len as i32);

    // The head may have consumed more or fewer reference bases than read
    // bases; that shifts where the alignment really starts.
    Some((score, probability, -head.net_offset))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn random_bases(seed: u32, length: usize) -> Vec<u8> {
        let mut state = seed;
        (0..length)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                ((state >> 16) & 3) as u8
            })
            .collect()
    }

    fn make_index(bases: Vec<u8>, seed_len: u32) -> GenomeIndex {
        let genome =
            crate::genome::Genome::from_pieces(vec![("chr1".to_string(), bases)]).unwrap();
        GenomeIndex::build(genome, seed_len).unwrap()
    }

    fn make_read(bases: &[u8]) -> Read {
        Read::new("r", bases.to_vec(), vec![30; bases.len()]).unwrap()
    }

    fn rc(bases: &[u8]) -> Vec<u8> {
        bases.iter().rev().map(|&b| 3 - b).collect()
    }

    fn aligner(index: &GenomeIndex, min_spacing: u32, max_spacing: u32) -> IntersectingPairedEndAligner<'_> {
        IntersectingPairedEndAligner::new(index, 8, 8, min_spacing, max_spacing, 2000, 2)
    }

    #[test]
    fn exact_pair_is_found() {
        let genome = random_bases(2024, 500);
        let read0 = make_read(&genome[100..150]);
        let read1 = make_read(&rc(&genome[350..400]));
        let index = make_index(genome, 8);
        let mut aligner = aligner(&index, 200, 400);

        let result = aligner.align(&read0, &read1);
        let hit0 = result.ends[0].hit.unwrap();
        let hit1 = result.ends[1].hit.unwrap();
        assert_eq!(hit0.location, 100);
        assert_eq!(hit0.direction, Direction::Forward);
        assert_eq!(hit0.score, 0);
        assert_eq!(hit1.location, 350);
        assert_eq!(hit1.direction, Direction::Rc);
        assert_eq!(hit1.score, 0);
        assert_eq!(result.ends[0].status, AlignmentResult::SingleHit);
        assert_eq!(result.ends[1].status, AlignmentResult::SingleHit);
        assert!(result.ends[0].mapq > 10);
    }

    #[test]
    fn pair_with_substitutions() {
        let genome = random_bases(9, 600);
        let mut b0 = genome[120..180].to_vec();
        b0[30] = (b0[30] + 1) % 4;
        let mut b1 = genome[400..460].to_vec();
        b1[10] = (b1[10] + 2) % 4;
        let read0 = make_read(&b0);
        let read1 = make_read(&rc(&b1));
        let index = make_index(genome, 8);
        let mut aligner = aligner(&index, 150, 500);

        let result = aligner.align(&read0, &read1);
        let hit0 = result.ends[0].hit.unwrap();
        let hit1 = result.ends[1].hit.unwrap();
        assert_eq!(hit0.location, 120);
        assert_eq!(hit1.location, 400);
        assert_eq!(hit0.score, 1);
        assert_eq!(hit1.score, 1);
    }

    #[test]
    fn spacing_exactly_max_succeeds() {
        let genome = random_bases(77, 800);
        let read0 = make_read(&genome[100..150]);
        let read1 = make_read(&rc(&genome[500..550]));
        let index = make_index(genome, 8);
        // Spacing between starts is exactly 400.
        let mut aligner = aligner(&index, 200, 400);

        let result = aligner.align(&read0, &read1);
        assert_eq!(result.ends[0].hit.unwrap().location, 100);
        assert_eq!(result.ends[1].hit.unwrap().location, 500);
    }

    #[test]
    fn spacing_beyond_max_is_not_found() {
        let genome = random_bases(77, 800);
        let read0 = make_read(&genome[100..150]);
        let read1 = make_read(&rc(&genome[501..551]));
        let index = make_index(genome, 8);
        // Spacing between starts is 401, one beyond the window.
        let mut aligner = aligner(&index, 200, 400);

        let result = aligner.align(&read0, &read1);
        assert_eq!(result.ends[0].status, AlignmentResult::NotFound);
        assert_eq!(result.ends[1].status, AlignmentResult::NotFound);
        assert!(result.ends[0].hit.is_none());
        assert_eq!(result.ends[0].mapq, 0);
    }

    #[test]
    fn spacing_below_min_is_not_found() {
        let genome = random_bases(55, 800);
        let read0 = make_read(&genome[100..150]);
        let read1 = make_read(&rc(&genome[180..230]));
        let index = make_index(genome, 8);
        let mut aligner = aligner(&index, 200, 400);

        let result = aligner.align(&read0, &read1);
        assert_eq!(result.ends[0].status, AlignmentResult::NotFound);
    }

    #[test]
    fn short_read_falls_back_to_single_end() {
        let genome = random_bases(33, 500);
        let read0 = make_read(&genome[100..140]); // 40 bases, under the limit
        let read1 = make_read(&rc(&genome[350..400]));
        let index = make_index(genome, 8);
        let mut aligner = aligner(&index, 200, 400);

        let result = aligner.align(&read0, &read1);
        // Both ends are scored independently.
        assert_eq!(result.ends[0].hit.unwrap().location, 100);
        assert_eq!(result.ends[0].hit.unwrap().direction, Direction::Forward);
        assert_eq!(result.ends[1].hit.unwrap().location, 350);
        assert_eq!(result.ends[1].hit.unwrap().direction, Direction::Rc);
        assert!(result.ends[0].mapq <= 70);
    }

    #[test]
    fn n_heavy_pair_falls_back() {
        let genome = random_bases(44, 500);
        let mut b0 = genome[100..160].to_vec();
        for b in b0.iter_mut().take(12) {
            *b = 4;
        }
        let read0 = make_read(&b0);
        let read1 = make_read(&rc(&genome[350..410]));
        let index = make_index(genome, 8);
        let mut aligner = aligner(&index, 200, 400);

        let result = aligner.align(&read0, &read1);
        // The N-laden end cannot be aligned; its mate still is.
        assert_eq!(result.ends[0].status, AlignmentResult::NotFound);
        assert_eq!(result.ends[1].hit.unwrap().location, 350);
    }

    #[test]
    fn opposite_orientation_pair() {
        // read0 RC + read1 FORWARD: the second set pair.
        let genome = random_bases(88, 500);
        let read0 = make_read(&rc(&genome[350..400]));
        let read1 = make_read(&genome[100..150]);
        let index = make_index(genome, 8);
        let mut aligner = aligner(&index, 200, 400);

        let result = aligner.align(&read0, &read1);
        let hit0 = result.ends[0].hit.unwrap();
        let hit1 = result.ends[1].hit.unwrap();
        assert_eq!(hit0.location, 350);
        assert_eq!(hit0.direction, Direction::Rc);
        assert_eq!(hit1.location, 100);
        assert_eq!(hit1.direction, Direction::Forward);
    }

    #[test]
    fn pair_with_deletion_reports_shifted_location() {
        // read1 spans a 1-base deletion relative to the reference.
        let genome = random_bases(123, 600);
        let read0 = make_read(&genome[100..150]);
        let mut b1 = genome[400..430].to_vec();
        b1.extend_from_slice(&genome[431..461]); // skip one base
        let read1 = make_read(&rc(&b1));
        let index = make_index(genome, 8);
        let mut aligner = aligner(&index, 150, 500);

        let result = aligner.align(&read0, &read1);
        let hit1 = result.ends[1].hit.unwrap();
        assert_eq!(result.ends[0].hit.unwrap().location, 100);
        assert_eq!(hit1.location, 400);
        assert_eq!(hit1.score, 1);
    }

    #[test]
    fn aligning_twice_is_idempotent() {
        let genome = random_bases(2024, 500);
        let read0 = make_read(&genome[100..150]);
        let read1 = make_read(&rc(&genome[350..400]));
        let index = make_index(genome, 8);
        let mut aligner = aligner(&index, 200, 400);

        let first = aligner.align(&read0, &read1);
        let second = aligner.align(&read0, &read1);
        assert_eq!(first, second);
    }
}
