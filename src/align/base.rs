use log::warn;

use crate::align::candidates::{CandidateTable, VoteOutcome, UNUSED_SCORE_VALUE};
use crate::align::lv::LandauVishkin;
use crate::index::{GenomeIndex, Seed};
use crate::mapq::compute_mapq;
use crate::reads::{Direction, Read, DIRECTIONS, NUM_DIRECTIONS};

/// Upper bound on extra hit locations returned in multi-hit mode.
pub const MAX_MULTI_HITS_TO_GET: usize = 512;

/// Classification of a single-read alignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentResult {
    NotFound,
    SingleHit,
    MultipleHits,
    /// No other candidate with any seed vote existed at all.
    CertainHit,
}

impl AlignmentResult {
    pub fn is_one_location(self) -> bool {
        matches!(self, Self::SingleHit | Self::CertainHit)
    }
}

/// A located alignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub location: u32,
    pub direction: Direction,
    pub score: u32,
}

/// Result of aligning one read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SingleAlignment {
    pub result: AlignmentResult,
    /// The winning location; None exactly when result is NotFound.
    pub hit: Option<Hit>,
    /// The runner-up at a distinct location, when one was scored.
    pub second_best: Option<Hit>,
    pub mapq: u8,
    pub best_hit_probability: f64,
    pub all_hits_probability: f64,
}

impl SingleAlignment {
    fn not_found() -> Self {
        Self {
            result: AlignmentResult::NotFound,
            hit: None,
            second_best: None,
            mapq: 0,
            best_hit_probability: 0.0,
            all_hits_probability: 0.0,
        }
    }
}

/// The seed-and-extend single-read aligner.
///
/// Owns all per-alignment scratch (candidate table, scorer grid, seed-used
/// map), so one instance per worker thread allocates once and processes
/// reads with no steady-state allocation. Not thread safe; never share an
/// instance.
pub struct BaseAligner<'a> {
    index: &'a GenomeIndex,
    seed_len: u32,
    conf_diff: u32,
    max_hits_to_consider: u32,
    max_k: u32,
    max_seeds_to_use: u32,
    adaptive_conf_diff_threshold: u32,
    explore_popular_seeds: bool,
    stop_on_first_hit: bool,

    lv: LandauVishkin,
    candidates: CandidateTable,
    seed_used: Vec<bool>,
    slot_scratch: Vec<(u32, u32)>,

    // Cumulative counters, merged into AlignerStats at thread exit.
    n_hash_table_lookups: u64,
    n_locations_scored: u64,
    n_indels_merged: u64,
    n_reads_ignored_because_of_too_many_ns: u64,

    // Per-alignment state (single threaded, so members beat long argument
    // lists the same way they do in the original).
    popular_seeds_skipped: u32,
    n_seeds_applied: [u32; NUM_DIRECTIONS],
    most_seeds_containing_any_particular_base: [u32; NUM_DIRECTIONS],
    lowest_possible_score_of_any_unseen_location: [u32; NUM_DIRECTIONS],
}

impl<'a> BaseAligner<'a> {
    pub fn new(
        index: &'a GenomeIndex,
        conf_diff: u32,
        max_hits_to_consider: u32,
        max_k: u32,
        max_seeds_to_use: u32,
        adaptive_conf_diff_threshold: u32,
    ) -> Self {
        let seed_len = index.seed_len();
        let pool_size = (max_hits_to_consider.saturating_mul(max_seeds_to_use).saturating_mul(2))
            .clamp(64, 1 << 20);
        let max_weight = max_seeds_to_use.max(1) * 2;
        Self {
            index,
            seed_len,
            conf_diff,
            max_hits_to_consider,
            max_k: max_k.min(crate::align::lv::MAX_K),
            max_seeds_to_use,
            adaptive_conf_diff_threshold,
            explore_popular_seeds: false,
            stop_on_first_hit: false,
            lv: LandauVishkin::new(),
            candidates: CandidateTable::new(pool_size, max_weight),
            seed_used: vec![false; crate::reads::MAX_READ_SIZE],
            slot_scratch: Vec::with_capacity(64),
            n_hash_table_lookups: 0,
            n_locations_scored: 0,
            n_indels_merged: 0,
            n_reads_ignored_because_of_too_many_ns: 0,
            popular_seeds_skipped: 0,
            n_seeds_applied: [0; NUM_DIRECTIONS],
            most_seeds_containing_any_particular_base: [1; NUM_DIRECTIONS],
            lowest_possible_score_of_any_unseen_location: [0; NUM_DIRECTIONS],
        }
    }

    pub fn set_explore_popular_seeds(&mut self, value: bool) {
        self.explore_popular_seeds = value;
    }

    pub fn set_stop_on_first_hit(&mut self, value: bool) {
        self.stop_on_first_hit = value;
    }

    pub fn max_k(&self) -> u32 {
        self.max_k
    }

    pub fn n_hash_table_lookups(&self) -> u64 {
        self.n_hash_table_lookups
    }

    pub fn n_locations_scored(&self) -> u64 {
        self.n_locations_scored
    }

    pub fn n_indels_merged(&self) -> u64 {
        self.n_indels_merged
    }

    pub fn n_reads_ignored_because_of_too_many_ns(&self) -> u64 {
        self.n_reads_ignored_because_of_too_many_ns
    }

    pub fn popular_seeds_skipped_last_read(&self) -> u32 {
        self.popular_seeds_skipped
    }

    pub fn checked_all_seeds(&self) -> bool {
        self.popular_seeds_skipped == 0
    }

    /// Align one read.
    pub fn align_read(&mut self, read: &Read) -> SingleAlignment {
        self.align_read_inner(read, None)
    }

    /// Align one read, also collecting up to `max_hits_to_get` scored
    /// locations within confDiff of the best (capped at 512).
    pub fn align_read_multi(
        &mut self,
        read: &Read,
        max_hits_to_get: usize,
        multi_hits: &mut Vec<Hit>,
    ) -> SingleAlignment {
        multi_hits.clear();
        let alignment = self.align_read_inner(read, Some(&mut *multi_hits));
        if let Some(best) = alignment.hit {
            let cutoff = best.score + self.conf_diff;
            multi_hits.retain(|h| h.score < cutoff);
            multi_hits.sort_by_key(|h| h.score);
            multi_hits.truncate(max_hits_to_get.min(MAX_MULTI_HITS_TO_GET));
        } else {
            multi_hits.clear();
        }
        alignment
    }

    fn align_read_inner(
        &mut self,
        read: &Read,
        mut multi_hits: Option<&mut Vec<Hit>>,
    ) -> SingleAlignment {
        let read_len = read.len();
        if read_len < self.seed_len as usize || read_len > crate::reads::MAX_READ_SIZE {
            return SingleAlignment::not_found();
        }
        if read.count_of_ns() as u32 > self.max_k {
            self.n_reads_ignored_because_of_too_many_ns += 1;
            return SingleAlignment::not_found();
        }

        let rc_read = read.reverse_complement();
        let reads: [&Read; NUM_DIRECTIONS] = [read, &rc_read];

        self.candidates.begin();
        self.popular_seeds_skipped = 0;
        self.n_seeds_applied = [0; NUM_DIRECTIONS];
        self.most_seeds_containing_any_particular_base = [1; NUM_DIRECTIONS];
        self.lowest_possible_score_of_any_unseen_location = [0; NUM_DIRECTIONS];

        self.apply_seeds(read, read_len);

        let conf_diff = self.conf_diff_for_this_read();
        self.score_candidates(&reads, conf_diff, &mut multi_hits)
    }

    /// Phase 1 of an alignment: pick seeds across the read, look each up in
    /// both orientations, and feed the hits into the candidate table.
    fn apply_seeds(&mut self, read: &Read, read_len: usize) {
        let seed_len = self.seed_len as usize;
        let n_possible = read_len - seed_len + 1;
        self.seed_used[..n_possible].fill(false);

        let mut next_seed_to_test = 0usize;
        let mut wrap_count = 0u32;
        let mut n_lookups = 0u32;

        while (n_lookups as usize) < n_possible && n_lookups < self.max_seeds_to_use {
            if next_seed_to_test >= n_possible {
                wrap_count += 1;
                if wrap_count >= self.seed_len {
                    // Not enough usable seeds in this read to reach the target.
                    break;
                }
                next_seed_to_test = wrapped_seed_offset(self.seed_len, wrap_count) as usize;
            }

            while next_seed_to_test < n_possible && self.seed_used[next_seed_to_test] {
                next_seed_to_test += 1;
            }
            if next_seed_to_test >= n_possible {
                // Used seeds pushed us past the end; wrap around.
                continue;
            }

            self.seed_used[next_seed_to_test] = true;
            let offset = next_seed_to_test;
            next_seed_to_test += seed_len;

            let Some(seed) = Seed::from_bases(&read.bases()[offset..offset + seed_len]) else {
                // The window contains an N; try the next position.
                next_seed_to_test = offset + 1;
                continue;
            };

            let hits = self.index.lookup_seed(seed);
            self.n_hash_table_lookups += 1;
            n_lookups += 1;

            let popular = hits.total() > self.max_hits_to_consider as usize;
            if popular {
                self.popular_seeds_skipped += 1;
                if !self.explore_popular_seeds {
                    continue;
                }
            }

            let hit_cap = self.max_hits_to_consider as usize;
            for direction in DIRECTIONS {
                let (list, seed_offset) = match direction {
                    Direction::Forward => (hits.forward, offset),
                    Direction::Rc => (hits.rc, read_len - seed_len - offset),
                };
                let list = &list[..list.len().min(hit_cap)];

                let dir = direction as usize;
                if !popular {
                    self.n_seeds_applied[dir] += 1;
                    self.most_seeds_containing_any_particular_base[dir] =
                        (wrap_count + 1).min(self.seed_len);
                    self.lowest_possible_score_of_any_unseen_location[dir] = self.n_seeds_applied
                        [dir]
                        / self.most_seeds_containing_any_particular_base[dir];
                }

                for &hit in list {
                    let Some(location) = hit.checked_sub(seed_offset as u32) else {
                        continue;
                    };
                    match self.candidates.find_or_add(
                        location,
                        direction,
                        seed_offset as u32,
                        self.lowest_possible_score_of_any_unseen_location[dir],
                    ) {
                        Some((idx, outcome)) => {
                            if outcome == VoteOutcome::IndelMerged {
                                self.n_indels_merged += 1;
                            }
                            self.candidates.increment_weight(idx);
                        }
                        None => {
                            warn!("candidate pool exhausted; dropping a candidate");
                            return;
                        }
                    }
                }
            }
        }
    }

    /// More popular seeds than the adaptive threshold means degraded seed
    /// coverage; demand one more point of separation before calling a
    /// unique hit.
    fn conf_diff_for_this_read(&self) -> u32 {
        if self.popular_seeds_skipped > self.adaptive_conf_diff_threshold {
            self.conf_diff + 1
        } else {
            self.conf_diff
        }
    }

    /// Phase 2: score elements in descending weight order under a
    /// dynamically tightened limit, tracking best and second-best distinct
    /// locations and the total probability mass.
    fn score_candidates(
        &mut self,
        reads: &[&Read; NUM_DIRECTIONS],
        conf_diff: u32,
        multi_hits: &mut Option<&mut Vec<Hit>>,
    ) -> SingleAlignment {
        let mut best_score = UNUSED_SCORE_VALUE;
        let mut best_location = 0u32;
        let mut best_direction = Direction::Forward;
        let mut best_probability = 0.0f64;
        let mut second_best_score = UNUSED_SCORE_VALUE;
        let mut second_best_location = 0u32;
        let mut second_best_direction: Option<Direction> = None;
        let mut probability_of_all_candidates = 0.0f64;

        while let Some(idx) = self.candidates.pop_highest_weight() {
            let score_limit = if best_score == UNUSED_SCORE_VALUE {
                self.max_k
            } else {
                self.max_k.min(best_score + conf_diff)
            };

            let element = self.candidates.element(idx);
            if element.lowest_possible_score > score_limit {
                continue;
            }
            let direction = element.direction;
            self.slot_scratch.clear();
            self.slot_scratch.extend(element.slot_locations());

            // Score every occupied slot; the element's result is its best
            // slot, so indel-shifted duplicates of one alignment contribute
            // a single probability term.
            let mut element_best = UNUSED_SCORE_VALUE;
            let mut element_best_location = 0u32;
            let mut element_probability = 0.0f64;
            for i in 0..self.slot_scratch.len() {
                let (location, _seed_offset) = self.slot_scratch[i];
                if let Some((distance, probability)) =
                    self.score_location(location, reads[direction as usize], score_limit)
                {
                    self.n_locations_scored += 1;
                    if distance < element_best
                        || (distance == element_best && probability > element_probability)
                    {
                        element_best = distance;
                        element_best_location = location;
                        element_probability = probability;
                    }
                }
            }

            {
                let element = self.candidates.element_mut(idx);
                element.scored = true;
                element.best_score = element_best;
                element.best_score_location = element_best_location;
                element.match_probability = element_probability;
                debug_assert!(
                    element_best == UNUSED_SCORE_VALUE
                        || element_best >= element.lowest_possible_score
                );
            }

            if element_best == UNUSED_SCORE_VALUE {
                continue; // every slot exceeded the limit
            }

            probability_of_all_candidates += element_probability;

            if let Some(hits) = multi_hits.as_deref_mut() {
                if element_best <= self.max_k && hits.len() < MAX_MULTI_HITS_TO_GET {
                    hits.push(Hit {
                        location: element_best_location,
                        direction,
                        score: element_best,
                    });
                }
            }

            if element_best < best_score
                || (element_best == best_score && element_probability > best_probability)
            {
                if best_score != UNUSED_SCORE_VALUE {
                    second_best_score = best_score;
                    second_best_location = best_location;
                    second_best_direction = Some(best_direction);
                }
                best_score = element_best;
                best_location = element_best_location;
                best_direction = direction;
                best_probability = element_probability;
            } else if element_best < second_best_score {
                second_best_score = element_best;
                second_best_location = element_best_location;
                second_best_direction = Some(direction);
            }

            if self.stop_on_first_hit && best_score <= self.max_k {
                break;
            }
            if probability_of_all_candidates >= 4.9 && best_score <= self.max_k {
                // MAPQ is pinned at zero no matter what else we'd score.
                break;
            }
        }

        if best_score > self.max_k {
            return SingleAlignment::not_found();
        }

        let hit = Some(Hit {
            location: best_location,
            direction: best_direction,
            score: best_score,
        });
        let second_best = second_best_direction.map(|direction| Hit {
            location: second_best_location,
            direction,
            score: second_best_score,
        });

        // Only one cluster ever received a vote and no seed was skipped:
        // there is no alternative location at all.
        if self.candidates.n_used() == 1 && self.popular_seeds_skipped == 0 {
            return SingleAlignment {
                result: AlignmentResult::CertainHit,
                hit,
                second_best: None,
                mapq: 70,
                best_hit_probability: best_probability,
                all_hits_probability: probability_of_all_candidates,
            };
        }

        let mapq = compute_mapq(
            probability_of_all_candidates,
            best_probability,
            best_score,
            self.popular_seeds_skipped,
            false,
            None,
        );

        let result = if second_best_score != UNUSED_SCORE_VALUE
            && second_best_score < best_score + conf_diff
        {
            AlignmentResult::MultipleHits
        } else {
            AlignmentResult::SingleHit
        };

        SingleAlignment {
            result,
            hit,
            second_best,
            mapq,
            best_hit_probability: best_probability,
            all_hits_probability: probability_of_all_candidates,
        }
    }

    /// Score the read against the reference window starting at `location`,
    /// truncated at the piece end. None means the score limit was exceeded
    /// or the window fell off the reference.
    fn score_location(
        &mut self,
        location: u32,
        read: &Read,
        score_limit: u32,
    ) -> Option<(u32, f64)> {
        let genome = self.index.genome();
        let read_len = read.len();

        let piece_idx = genome.piece_index_at_location(location)?;
        let piece_end = genome.piece_end(piece_idx);
        let wanted = read_len + score_limit as usize;
        let available = ((piece_end - location) as usize).min(wanted);
        // Even with the limit's worth of insertions the read consumes at
        // least read_len - score_limit reference bases.
        if available + (score_limit as usize) < read_len {
            return None;
        }
        let window = genome.substring(location, available)?;

        let result = self
            .lv
            .compute(window, read.bases(), read.quals(), score_limit)?;
        Some((result.distance, result.match_probability))
    }
}

/// Offsets for the wrapped seed-selection passes: once the stride-L walk
/// runs out, pass w starts at L/2, then L/4, 3L/4, L/8, 3L/8, ...
pub fn wrapped_seed_offset(seed_len: u32, wrap_count: u32) -> u32 {
    debug_assert!(wrap_count >= 1);
    let level = 32 - wrap_count.leading_zeros(); // floor(log2) + 1
    let first_in_level = 1u32 << (level - 1);
    let numerator = 2 * (wrap_count - first_in_level) + 1;
    seed_len * numerator / (1u32 << level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genome::Genome;

    /// Deterministic pseudo-random base string; an LCG keeps k-mers unique
    /// enough that seeds have tiny hit lists.
    fn random_bases(seed: u32, length: usize, alphabet: &[u8]) -> Vec<u8> {
        let mut state = seed;
        (0..length)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                alphabet[((state >> 16) as usize) % alphabet.len()]
            })
            .collect()
    }

    fn make_index(bases: Vec<u8>, seed_len: u32) -> GenomeIndex {
        let genome = Genome::from_pieces(vec![("chr1".to_string(), bases)]).unwrap();
        GenomeIndex::build(genome, seed_len).unwrap()
    }

    fn make_read(bases: &[u8]) -> Read {
        Read::new("r", bases.to_vec(), vec![30; bases.len()]).unwrap()
    }

    #[test]
    fn exact_read_is_certain_hit() {
        let genome = random_bases(12345, 200, &[0, 1, 2, 3]);
        let read = make_read(&genome[50..80]);
        let index = make_index(genome, 8);
        let mut aligner = BaseAligner::new(&index, 2, 300, 2, 8, 4);

        let alignment = aligner.align_read(&read);
        assert!(alignment.result.is_one_location());
        let hit = alignment.hit.unwrap();
        assert_eq!(hit.location, 50);
        assert_eq!(hit.direction, Direction::Forward);
        assert_eq!(hit.score, 0);
        assert_eq!(alignment.mapq, 70);
    }

    #[test]
    fn one_substitution_is_found() {
        let genome = random_bases(99, 200, &[0, 1, 2, 3]);
        let mut bases = genome[60..90].to_vec();
        bases[15] = (bases[15] + 1) % 4;
        let read = make_read(&bases);
        let index = make_index(genome, 8);
        let mut aligner = BaseAligner::new(&index, 2, 300, 2, 8, 4);

        let alignment = aligner.align_read(&read);
        assert!(alignment.result.is_one_location());
        let hit = alignment.hit.unwrap();
        assert_eq!(hit.location, 60);
        assert_eq!(hit.score, 1);
        assert!(alignment.mapq >= 30);
    }

    #[test]
    fn reverse_complement_read_aligns_rc() {
        let genome = random_bases(7, 200, &[0, 1, 2, 3]);
        let read = make_read(&genome[30..70]);
        let rc = read.reverse_complement();
        let index = make_index(genome, 8);
        let mut aligner = BaseAligner::new(&index, 2, 300, 2, 8, 4);

        let fwd = aligner.align_read(&read);
        let rev = aligner.align_read(&rc);
        assert_eq!(fwd.hit.unwrap().location, 30);
        assert_eq!(fwd.hit.unwrap().direction, Direction::Forward);
        assert_eq!(rev.hit.unwrap().location, 30);
        assert_eq!(rev.hit.unwrap().direction, Direction::Rc);
        assert_eq!(fwd.hit.unwrap().score, rev.hit.unwrap().score);
        assert_eq!(fwd.mapq, rev.mapq);
    }

    #[test]
    fn duplicated_region_is_multiple_hits() {
        let copy = random_bases(555, 100, &[0, 1, 2, 3]);
        let mut genome = copy.clone();
        genome.extend_from_slice(&copy);
        let read = make_read(&copy[10..40]);
        let index = make_index(genome, 8);
        let mut aligner = BaseAligner::new(&index, 2, 300, 2, 8, 4);

        let alignment = aligner.align_read(&read);
        assert_eq!(alignment.result, AlignmentResult::MultipleHits);
        let hit = alignment.hit.unwrap();
        assert!(hit.location == 10 || hit.location == 110);
        assert_eq!(hit.score, 0);
        assert!(alignment.mapq <= 3);
        // The other copy is the runner-up.
        let second = alignment.second_best.unwrap();
        assert_eq!(second.score, 0);
        assert_ne!(second.location, hit.location);
    }

    #[test]
    fn unmatchable_read_is_not_found() {
        // The genome has no G at all, so a poly-G read cannot seed.
        let genome = random_bases(42, 200, &[0, 1, 3]);
        let read = make_read(&vec![2u8; 30]);
        let index = make_index(genome, 8);
        let mut aligner = BaseAligner::new(&index, 2, 300, 2, 8, 4);

        let alignment = aligner.align_read(&read);
        assert_eq!(alignment.result, AlignmentResult::NotFound);
        assert!(alignment.hit.is_none());
        assert_eq!(alignment.mapq, 0);
    }

    #[test]
    fn n_heavy_read_is_not_found() {
        let genome = random_bases(42, 200, &[0, 1, 2, 3]);
        let mut bases = genome[50..80].to_vec();
        for b in bases.iter_mut().take(10) {
            *b = 4;
        }
        let read = make_read(&bases);
        let index = make_index(genome, 8);
        let mut aligner = BaseAligner::new(&index, 2, 300, 2, 8, 4);

        let alignment = aligner.align_read(&read);
        assert_eq!(alignment.result, AlignmentResult::NotFound);
        assert_eq!(aligner.n_reads_ignored_because_of_too_many_ns(), 1);
    }

    #[test]
    fn all_n_read_is_not_found() {
        let genome = random_bases(42, 200, &[0, 1, 2, 3]);
        let read = make_read(&vec![4u8; 30]);
        let index = make_index(genome, 8);
        let mut aligner = BaseAligner::new(&index, 2, 300, 2, 8, 4);

        let alignment = aligner.align_read(&read);
        assert_eq!(alignment.result, AlignmentResult::NotFound);
        assert_eq!(alignment.mapq, 0);
    }

    #[test]
    fn aligning_twice_is_idempotent() {
        let genome = random_bases(31337, 300, &[0, 1, 2, 3]);
        let read = make_read(&genome[120..160]);
        let index = make_index(genome, 8);
        let mut aligner = BaseAligner::new(&index, 2, 300, 2, 8, 4);

        let first = aligner.align_read(&read);
        let second = aligner.align_read(&read);
        assert_eq!(first, second);
    }

    #[test]
    fn short_read_is_not_found() {
        let genome = random_bases(1, 200, &[0, 1, 2, 3]);
        let read = make_read(&genome[50..55]);
        let index = make_index(genome, 8);
        let mut aligner = BaseAligner::new(&index, 2, 300, 2, 8, 4);
        assert_eq!(aligner.align_read(&read).result, AlignmentResult::NotFound);
    }

    #[test]
    fn read_at_max_size_aligns() {
        let genome = random_bases(60601, 1200, &[0, 1, 2, 3]);
        let read = make_read(&genome[300..300 + crate::reads::MAX_READ_SIZE]);
        let index = make_index(genome, 8);
        let mut aligner = BaseAligner::new(&index, 2, 300, 2, 8, 4);

        let alignment = aligner.align_read(&read);
        assert!(alignment.result.is_one_location());
        assert_eq!(alignment.hit.unwrap().location, 300);
        assert_eq!(alignment.hit.unwrap().score, 0);
    }

    #[test]
    fn multi_hit_output_reports_both_copies() {
        let copy = random_bases(777, 100, &[0, 1, 2, 3]);
        let mut genome = copy.clone();
        genome.extend_from_slice(&copy);
        let read = make_read(&copy[20..50]);
        let index = make_index(genome, 8);
        let mut aligner = BaseAligner::new(&index, 2, 300, 2, 8, 4);

        let mut hits = Vec::new();
        let alignment = aligner.align_read_multi(&read, 16, &mut hits);
        assert_eq!(alignment.result, AlignmentResult::MultipleHits);
        let mut locations: Vec<u32> = hits.iter().map(|h| h.location).collect();
        locations.sort();
        assert_eq!(locations, vec![20, 120]);
    }

    #[test]
    fn wrapped_offsets_subdivide() {
        assert_eq!(wrapped_seed_offset(16, 1), 8);
        assert_eq!(wrapped_seed_offset(16, 2), 4);
        assert_eq!(wrapped_seed_offset(16, 3), 12);
        assert_eq!(wrapped_seed_offset(16, 4), 2);
        assert_eq!(wrapped_seed_offset(16, 5), 6);
        assert_eq!(wrapped_seed_offset(16, 6), 10);
        assert_eq!(wrapped_seed_offset(16, 7), 14);
        assert_eq!(wrapped_seed_offset(20, 1), 10);
        assert_eq!(wrapped_seed_offset(20, 2), 5);
        assert_eq!(wrapped_seed_offset(20, 3), 15);
    }
}
