/// Seed-hit sets and the descending-walk primitives the paired-end
/// intersection is built from.

/// One recorded index lookup: a borrowed descending hit list plus the
/// cursor for the single monotone walk the set supports per init().
struct HitSetLookup<'a> {
    seed_offset: u32,
    hits: &'a [u32],
    current: usize,
}

impl HitSetLookup<'_> {
    /// Candidate location of the cursor's hit, or None when exhausted (or
    /// when every remaining hit is too close to the genome start to be a
    /// real alignment).
    fn current_location(&self) -> Option<u32> {
        self.hits
            .get(self.current)
            .and_then(|&h| h.checked_sub(self.seed_offset))
    }
}

/// A set of seed hits for one (read, direction), represented by the lookups
/// that came out of the index. Supports a single descending iteration over
/// candidate locations per `init()`.
pub struct HashTableHitSet<'a> {
    lookups: Vec<HitSetLookup<'a>>,
    most_recent_location_returned: u32,
}

impl<'a> HashTableHitSet<'a> {
    pub fn new(max_seeds: usize) -> Self {
        Self {
            lookups: Vec::with_capacity(max_seeds),
            most_recent_location_returned: 0,
        }
    }

    /// Reset to the empty state.
    pub fn init(&mut self) {
        self.lookups.clear();
        self.most_recent_location_returned = 0;
    }

    /// Record one index lookup. All recording must precede the walk.
    pub fn record_lookup(&mut self, seed_offset: u32, hits: &'a [u32]) {
        if hits.is_empty() {
            // Empty lists add nothing to the union.
            return;
        }
        debug_assert!(hits.windows(2).all(|w| w[0] > w[1]), "hits must descend");
        self.lookups.push(HitSetLookup {
            seed_offset,
            hits,
            current: 0,
        });
    }

    pub fn total_hits(&self) -> usize {
        self.lookups.iter().map(|l| l.hits.len()).sum()
    }

    /// The highest candidate location across all lookups.
    pub fn get_first_hit(&mut self) -> Option<(u32, u32)> {
        let mut best: Option<(u32, u32)> = None;
        for lookup in &self.lookups {
            if let Some(location) = lookup.hits[0].checked_sub(lookup.seed_offset) {
                if best.is_none() || location > best.unwrap().0 {
                    best = Some((location, lookup.seed_offset));
                }
            }
        }
        if let Some((location, _)) = best {
            self.most_recent_location_returned = location;
        }
        best
    }

    /// Advance every lookup's cursor down to its greatest candidate location
    /// at or below `max_location`, and return the global maximum.
    pub fn get_next_hit_less_than_or_equal(&mut self, max_location: u32) -> Option<(u32, u32)> {
        let mut best: Option<(u32, u32)> = None;
        for lookup in &mut self.lookups {
            // The raw hit we are looking for is max_location + seed_offset.
            let target = max_location.saturating_add(lookup.seed_offset);
            // Binary search the descending tail for the first hit <= target.
            let remaining = &lookup.hits[lookup.current..];
            let skip = remaining.partition_point(|&h| h > target);
            lookup.current += skip;

            match lookup.current_location() {
                Some(location) => {
                    if best.is_none() || location > best.unwrap().0 {
                        best = Some((location, lookup.seed_offset));
                    }
                }
                None => lookup.current = lookup.hits.len(),
            }
        }
        if let Some((location, _)) = best {
            self.most_recent_location_returned = location;
        }
        best
    }

    /// Take one step below the most recently returned location.
    pub fn get_next_lower_hit(&mut self) -> Option<(u32, u32)> {
        let mut best: Option<(u32, u32)> = None;
        for lookup in &mut self.lookups {
            // Push past any cursor sitting on the most recent result.
            if lookup.current_location() == Some(self.most_recent_location_returned) {
                lookup.current += 1;
            }
            match lookup.current_location() {
                Some(location) => {
                    if best.is_none() || location > best.unwrap().0 {
                        best = Some((location, lookup.seed_offset));
                    }
                }
                None => lookup.current = lookup.hits.len(),
            }
        }
        if let Some((location, _)) = best {
            self.most_recent_location_returned = location;
        }
        best
    }
}

// ---------------------------------------------------------------------------
// Hit-location ring buffer
// ---------------------------------------------------------------------------

/// A genome location discovered during intersection, with its scoring state.
/// `score` of None with `is_scored` set means it exceeded `score_limit`, so
/// it may be rescored if a later pairing allows a higher limit.
#[derive(Debug, Clone, Copy)]
pub struct HitLocation {
    pub genome_location: u32,
    pub genome_location_offset: i32,
    pub seed_offset: u32,
    pub is_scored: bool,
    pub score: Option<u32>,
    pub score_limit: u32,
    pub match_probability: f64,
}

impl HitLocation {
    fn unscored(genome_location: u32, seed_offset: u32) -> Self {
        Self {
            genome_location,
            genome_location_offset: 0,
            seed_offset,
            is_scored: false,
            score: None,
            score_limit: 0,
            match_probability: 0.0,
        }
    }
}

/// Fixed-size ring of hit locations held in strictly descending location
/// order; the head is the most recent (lowest) insertion and the tail the
/// oldest (highest).
pub struct HitLocationRingBuffer {
    buffer: Vec<HitLocation>,
    head: usize,
    tail: usize,
}

impl HitLocationRingBuffer {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer: vec![HitLocation::unscored(0, 0); buffer_size],
            head: 0,
            tail: 0,
        }
    }

    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    fn size(&self) -> usize {
        self.buffer.len()
    }

    pub fn insert_head(&mut self, genome_location: u32, seed_offset: u32) {
        assert!((self.head + 1) % self.size() != self.tail, "ring overflow");
        if let Some(prev) = self.head_entry() {
            assert!(
                genome_location < prev.genome_location,
                "insertions must strictly descend"
            );
        }
        self.buffer[self.head] = HitLocation::unscored(genome_location, seed_offset);
        self.head = (self.head + 1) % self.size();
    }

    pub fn insert_head_scored(
        &mut self,
        genome_location: u32,
        seed_offset: u32,
        score: Option<u32>,
        score_limit: u32,
        match_probability: f64,
    ) {
        self.insert_head(genome_location, seed_offset);
        let idx = (self.head + self.size() - 1) % self.size();
        let entry = &mut self.buffer[idx];
        entry.is_scored = true;
        entry.score = score;
        entry.score_limit = score_limit;
        entry.match_probability = match_probability;
    }

    /// Drop entries (from the tail) above the highest location to keep.
    pub fn trim_above_location(&mut self, highest_location_to_keep: u32) {
        while self.tail != self.head
            && self.buffer[self.tail].genome_location > highest_location_to_keep
        {
            self.tail = (self.tail + 1) % self.size();
        }
    }

    /// The oldest (highest-location) entry.
    pub fn tail_entry(&self) -> Option<&HitLocation> {
        if self.is_empty() {
            None
        } else {
            Some(&self.buffer[self.tail])
        }
    }

    /// The most recently inserted (lowest-location) entry.
    pub fn head_entry(&self) -> Option<&HitLocation> {
        if self.is_empty() {
            None
        } else {
            Some(&self.buffer[(self.head + self.size() - 1) % self.size()])
        }
    }

    /// Indices from tail to head, for iteration with mutation.
    pub fn indices(&self) -> impl Iterator<Item = usize> {
        let size = self.size();
        let mut idx = self.tail;
        let head = self.head;
        std::iter::from_fn(move || {
            if idx == head {
                None
            } else {
                let current = idx;
                idx = (idx + 1) % size;
                Some(current)
            }
        })
    }

    pub fn get(&self, idx: usize) -> &HitLocation {
        &self.buffer[idx]
    }

    pub fn get_mut(&mut self, idx: usize) -> &mut HitLocation {
        &mut self.buffer[idx]
    }
}
