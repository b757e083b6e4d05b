use crate::reads::{Direction, NUM_DIRECTIONS};

/// Maximum distance over which candidates that differ by indels are merged
/// into one hash-table element. Cannot exceed 31 or the slot bitmasks
/// overflow.
pub const MAX_MERGE_DIST: u32 = 31;

/// Candidate slots per element: an element anchored at its first location L
/// spans `[L - MAX_MERGE_DIST, L + MAX_MERGE_DIST]`, so locations exactly
/// MAX_MERGE_DIST apart still merge.
pub const SLOTS_PER_ELEMENT: u32 = 2 * MAX_MERGE_DIST + 1;

/// Sentinel for a slot that has not been scored.
pub const UNUSED_SCORE_VALUE: u32 = 0xffff;

const INVALID: u32 = u32::MAX;

/// One tentative alignment start location within an element.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub seed_offset: u32,
    pub score: u32,
    pub scored: bool,
}

impl Default for Candidate {
    fn default() -> Self {
        Self {
            seed_offset: 0,
            score: UNUSED_SCORE_VALUE,
            scored: false,
        }
    }
}

/// A cluster of nearby candidate locations at one direction, linked into a
/// hash bucket chain and a per-weight doubly-linked list.
#[derive(Debug, Clone)]
pub struct HashTableElement {
    weight_next: u32,
    weight_prev: u32,
    next: u32,
    block: u32,

    /// Bitmask of occupied candidate slots.
    pub candidates_used: u64,
    /// Lowest location the element can cover; slot `s` is location `base + s`.
    pub base_genome_location: u32,
    pub direction: Direction,
    /// Number of seed hits that voted for this cluster.
    pub weight: u32,
    /// Lower bound on any slot's score, from seeds that missed this cluster.
    pub lowest_possible_score: u32,
    pub best_score: u32,
    /// Location of the best-scoring slot (after scoring).
    pub best_score_location: u32,
    pub match_probability: f64,
    pub scored: bool,

    pub candidates: [Candidate; SLOTS_PER_ELEMENT as usize],
}

impl HashTableElement {
    fn fresh(block: u32, base: u32, direction: Direction, lowest_possible_score: u32) -> Self {
        Self {
            weight_next: INVALID,
            weight_prev: INVALID,
            next: INVALID,
            block,
            candidates_used: 0,
            base_genome_location: base,
            direction,
            weight: 0,
            lowest_possible_score,
            best_score: UNUSED_SCORE_VALUE,
            best_score_location: u32::MAX,
            match_probability: 0.0,
            scored: false,
            candidates: [Candidate::default(); SLOTS_PER_ELEMENT as usize],
        }
    }

    fn contains(&self, location: u32) -> bool {
        location >= self.base_genome_location
            && location - self.base_genome_location < SLOTS_PER_ELEMENT
    }

    /// Occupied slots as (location, seed offset) pairs, ascending.
    pub fn slot_locations(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let base = self.base_genome_location;
        (0..SLOTS_PER_ELEMENT).filter_map(move |slot| {
            if self.candidates_used & (1u64 << slot) != 0 {
                Some((base + slot, self.candidates[slot as usize].seed_offset))
            } else {
                None
            }
        })
    }
}

/// How a seed vote landed in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteOutcome {
    /// A new element was allocated for this location.
    NewElement,
    /// An existing element gained a new candidate slot.
    NewSlot,
    /// The slot was already occupied; the vote only added weight.
    IndelMerged,
}

struct Anchor {
    head: u32,
    epoch: u64,
}

/// The per-read candidate table.
///
/// A pre-sized pool of elements addressed by dense indices; hash buckets
/// carry an epoch stamp so `begin()` logically clears the whole table in
/// O(1) instead of touching every bucket. Elements are simultaneously
/// chained into their hash bucket and into a doubly-linked list for their
/// weight, so the scorer can pop the highest-weight cluster in O(1)
/// amortized.
pub struct CandidateTable {
    pool: Vec<HashTableElement>,
    pool_size: u32,
    n_used: u32,
    epoch: u64,
    buckets: [Vec<Anchor>; NUM_DIRECTIONS],
    bucket_mask: u32,
    weight_heads: Vec<u32>,
    highest_used_weight: u32,
}

/// SNAP's hash: more table entries and a cheap function beat a strong hash.
#[inline]
fn hash(key: u32) -> u32 {
    key.wrapping_mul(131)
}

impl CandidateTable {
    /// `pool_size` bounds the number of distinct elements per read
    /// (maxHitsToConsider x maxSeedsToUse x both directions); `max_weight`
    /// bounds the weight-list array (votes beyond it clamp).
    pub fn new(pool_size: u32, max_weight: u32) -> Self {
        let n_buckets = (pool_size * 2).next_power_of_two().max(64);
        let buckets = std::array::from_fn(|_| {
            (0..n_buckets)
                .map(|_| Anchor {
                    head: INVALID,
                    epoch: 0,
                })
                .collect()
        });
        Self {
            pool: Vec::with_capacity(pool_size as usize),
            pool_size,
            n_used: 0,
            epoch: 0,
            buckets,
            bucket_mask: n_buckets - 1,
            weight_heads: vec![INVALID; max_weight as usize + 1],
            highest_used_weight: 0,
        }
    }

    /// Start a new read: bump the epoch, which logically deletes all prior
    /// content without touching the pool.
    pub fn begin(&mut self) {
        self.epoch += 1;
        self.n_used = 0;
        self.weight_heads.fill(INVALID);
        self.highest_used_weight = 0;
    }

    pub fn n_used(&self) -> u32 {
        self.n_used
    }

    pub fn element(&self, idx: u32) -> &HashTableElement {
        &self.pool[idx as usize]
    }

    pub fn element_mut(&mut self, idx: u32) -> &mut HashTableElement {
        &mut self.pool[idx as usize]
    }

    fn bucket_of(&self, block: u32) -> usize {
        (hash(block) & self.bucket_mask) as usize
    }

    /// Find the element containing `location` at `direction`, if any.
    pub fn find_element(&self, location: u32, direction: Direction) -> Option<u32> {
        let block = location / MAX_MERGE_DIST;
        for probe_block in (block.saturating_sub(2)..=block).rev() {
            let anchor = &self.buckets[direction as usize][self.bucket_of(probe_block)];
            if anchor.epoch != self.epoch {
                continue;
            }
            let mut idx = anchor.head;
            while idx != INVALID {
                let elem = &self.pool[idx as usize];
                if elem.block == probe_block && elem.direction == direction && elem.contains(location)
                {
                    return Some(idx);
                }
                idx = elem.next;
            }
        }
        None
    }

    /// Record a seed vote for `location`, merging into an existing element
    /// within MAX_MERGE_DIST when possible. Returns None when the pool is
    /// exhausted. The caller follows up with `increment_weight`.
    pub fn find_or_add(
        &mut self,
        location: u32,
        direction: Direction,
        seed_offset: u32,
        lowest_possible_score: u32,
    ) -> Option<(u32, VoteOutcome)> {
        if let Some(idx) = self.find_element(location, direction) {
            let elem = &mut self.pool[idx as usize];
            let slot = location - elem.base_genome_location;
            let bit = 1u64 << slot;
            if elem.candidates_used & bit != 0 {
                return Some((idx, VoteOutcome::IndelMerged));
            }
            elem.candidates_used |= bit;
            elem.candidates[slot as usize] = Candidate {
                seed_offset,
                score: UNUSED_SCORE_VALUE,
                scored: false,
            };
            return Some((idx, VoteOutcome::NewSlot));
        }

        if self.n_used >= self.pool_size {
            return None;
        }

        let base = location.saturating_sub(MAX_MERGE_DIST);
        let block = base / MAX_MERGE_DIST;
        let mut elem = HashTableElement::fresh(block, base, direction, lowest_possible_score);
        let slot = location - base;
        elem.candidates_used = 1u64 << slot;
        elem.candidates[slot as usize] = Candidate {
            seed_offset,
            score: UNUSED_SCORE_VALUE,
            scored: false,
        };

        let idx = if (self.n_used as usize) < self.pool.len() {
            let idx = self.n_used;
            self.pool[idx as usize] = elem;
            idx
        } else {
            self.pool.push(elem);
            self.pool.len() as u32 - 1
        };
        self.n_used += 1;

        let bucket = self.bucket_of(block);
        let anchor = &mut self.buckets[direction as usize][bucket];
        if anchor.epoch != self.epoch {
            anchor.epoch = self.epoch;
            anchor.head = INVALID;
        }
        self.pool[idx as usize].next = anchor.head;
        self.buckets[direction as usize][bucket].head = idx;

        // Every fresh element starts on the weight-0 list.
        self.weight_list_insert(idx, 0);

        Some((idx, VoteOutcome::NewElement))
    }

    /// Move an element one weight bucket up (clamped at the top list).
    pub fn increment_weight(&mut self, idx: u32) {
        let old_weight = self.pool[idx as usize].weight;
        let new_weight = (old_weight + 1).min(self.weight_heads.len() as u32 - 1);
        if new_weight == old_weight {
            return;
        }
        self.weight_list_remove(idx, old_weight);
        self.pool[idx as usize].weight = new_weight;
        self.weight_list_insert(idx, new_weight);
        if new_weight > self.highest_used_weight {
            self.highest_used_weight = new_weight;
        }
    }

    /// Pop an element from the highest non-empty weight bucket (weight-0
    /// elements have received no votes and are not returned).
    pub fn pop_highest_weight(&mut self) -> Option<u32> {
        while self.highest_used_weight > 0 {
            let head = self.weight_heads[self.highest_used_weight as usize];
            if head != INVALID {
                self.weight_list_remove(head, self.highest_used_weight);
                return Some(head);
            }
            self.highest_used_weight -= 1;
        }
        None
    }

    fn weight_list_insert(&mut self, idx: u32, weight: u32) {
        let head = self.weight_heads[weight as usize];
        self.pool[idx as usize].weight_next = head;
        self.pool[idx as usize].weight_prev = INVALID;
        if head != INVALID {
            self.pool[head as usize].weight_prev = idx;
        }
        self.weight_heads[weight as usize] = idx;
    }

    fn weight_list_remove(&mut self, idx: u32, weight: u32) {
        let (prev, next) = {
            let elem = &self.pool[idx as usize];
            (elem.weight_prev, elem.weight_next)
        };
        if prev != INVALID {
            self.pool[prev as usize].weight_next = next;
        } else {
            self.weight_heads[weight as usize] = next;
        }
        if next != INVALID {
            self.pool[next as usize].weight_prev = prev;
        }
        self.pool[idx as usize].weight_next = INVALID;
        self.pool[idx as usize].weight_prev = INVALID;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> CandidateTable {
        let mut t = CandidateTable::new(1024, 25);
        t.begin();
        t
    }

    fn vote(t: &mut CandidateTable, location: u32, direction: Direction) -> (u32, VoteOutcome) {
        let (idx, outcome) = t.find_or_add(location, direction, 0, 0).unwrap();
        t.increment_weight(idx);
        (idx, outcome)
    }

    #[test]
    fn nearby_candidates_merge() {
        let mut t = table();
        let (a, oa) = vote(&mut t, 100, Direction::Forward);
        let (b, ob) = vote(&mut t, 120, Direction::Forward);
        assert_eq!(oa, VoteOutcome::NewElement);
        assert_eq!(ob, VoteOutcome::NewSlot);
        assert_eq!(a, b);
        // Two votes landed in one element; weight is their sum.
        assert_eq!(t.element(a).weight, 2);
        assert_eq!(
            t.element(a).slot_locations().map(|(l, _)| l).collect::<Vec<_>>(),
            vec![100, 120]
        );
    }

    #[test]
    fn merge_at_exact_distance() {
        let mut t = table();
        let (a, _) = vote(&mut t, 100, Direction::Forward);
        let (b, _) = vote(&mut t, 100 + MAX_MERGE_DIST, Direction::Forward);
        assert_eq!(a, b);
    }

    #[test]
    fn distant_candidates_stay_separate() {
        let mut t = table();
        let (a, _) = vote(&mut t, 100, Direction::Forward);
        let (b, ob) = vote(&mut t, 100 + SLOTS_PER_ELEMENT, Direction::Forward);
        assert_ne!(a, b);
        assert_eq!(ob, VoteOutcome::NewElement);
    }

    #[test]
    fn directions_never_merge() {
        let mut t = table();
        let (a, _) = vote(&mut t, 100, Direction::Forward);
        let (b, ob) = vote(&mut t, 100, Direction::Rc);
        assert_ne!(a, b);
        assert_eq!(ob, VoteOutcome::NewElement);
    }

    #[test]
    fn repeat_vote_is_indel_merged() {
        let mut t = table();
        let (a, _) = vote(&mut t, 100, Direction::Forward);
        let (b, ob) = vote(&mut t, 100, Direction::Forward);
        assert_eq!(a, b);
        assert_eq!(ob, VoteOutcome::IndelMerged);
        assert_eq!(t.element(a).weight, 2);
    }

    #[test]
    fn find_element_covers_span() {
        let mut t = table();
        let (a, _) = vote(&mut t, 100, Direction::Forward);
        // The element spans [69, 131].
        assert_eq!(t.find_element(69, Direction::Forward), Some(a));
        assert_eq!(t.find_element(131, Direction::Forward), Some(a));
        assert_eq!(t.find_element(132, Direction::Forward), None);
        assert_eq!(t.find_element(68, Direction::Forward), None);
        assert_eq!(t.find_element(100, Direction::Rc), None);
    }

    #[test]
    fn epoch_clears_table() {
        let mut t = table();
        vote(&mut t, 100, Direction::Forward);
        vote(&mut t, 5000, Direction::Rc);
        assert!(t.find_element(100, Direction::Forward).is_some());

        t.begin();
        assert_eq!(t.find_element(100, Direction::Forward), None);
        assert_eq!(t.find_element(5000, Direction::Rc), None);
        assert_eq!(t.n_used(), 0);
        assert!(t.pop_highest_weight().is_none());
    }

    #[test]
    fn pop_highest_weight_order() {
        let mut t = table();
        let (light, _) = vote(&mut t, 100, Direction::Forward);
        let (heavy, _) = vote(&mut t, 1000, Direction::Forward);
        vote(&mut t, 1010, Direction::Forward);
        vote(&mut t, 1020, Direction::Forward);
        assert_eq!(t.element(heavy).weight, 3);

        assert_eq!(t.pop_highest_weight(), Some(heavy));
        assert_eq!(t.pop_highest_weight(), Some(light));
        assert_eq!(t.pop_highest_weight(), None);
    }

    #[test]
    fn pop_skips_emptied_buckets() {
        let mut t = table();
        let (a, _) = vote(&mut t, 100, Direction::Forward);
        vote(&mut t, 110, Direction::Forward); // weight 2
        let (b, _) = vote(&mut t, 1000, Direction::Forward); // weight 1
        assert_eq!(t.pop_highest_weight(), Some(a));
        assert_eq!(t.pop_highest_weight(), Some(b));
        assert_eq!(t.pop_highest_weight(), None);
    }

    #[test]
    fn base_clamps_at_genome_start() {
        let mut t = table();
        let (a, _) = vote(&mut t, 5, Direction::Forward);
        assert_eq!(t.element(a).base_genome_location, 0);
        assert_eq!(t.find_element(0, Direction::Forward), Some(a));
    }

    #[test]
    fn weight_clamps_at_top_list() {
        let mut t = CandidateTable::new(16, 2);
        t.begin();
        let (idx, _) = t.find_or_add(100, Direction::Forward, 0, 0).unwrap();
        for _ in 0..5 {
            t.increment_weight(idx);
        }
        assert_eq!(t.element(idx).weight, 2);
        assert_eq!(t.pop_highest_weight(), Some(idx));
    }

    #[test]
    fn pool_exhaustion_returns_none() {
        let mut t = CandidateTable::new(2, 4);
        t.begin();
        assert!(t.find_or_add(0, Direction::Forward, 0, 0).is_some());
        assert!(t.find_or_add(1000, Direction::Forward, 0, 0).is_some());
        assert!(t.find_or_add(2000, Direction::Forward, 0, 0).is_none());
    }
}
