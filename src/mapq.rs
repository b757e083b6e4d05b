/// MAPQ (mapping quality) calibration.
///
/// Converts the probability of the best candidate and the summed probability
/// of every scored candidate into an integer in [0, 70], with penalties for
/// degraded evidence (skipped popular seeds, the Hamming shortcut, large
/// scored clusters).

/// Probability that an alignment reported with `mapq` is correct.
pub fn mapq_to_probability(mapq: u8) -> f64 {
    1.0 - 10f64.powf(-(mapq as f64) / 10.0)
}

/// Compute the mapping quality for an alignment.
///
/// # Arguments
/// * `probability_of_all_candidates` - summed match probability of every scored candidate
/// * `probability_of_best_candidate` - match probability of the winner
/// * `score` - the winner's edit distance
/// * `popular_seeds_skipped` - seeds ignored for exceeding the hit threshold
/// * `used_hamming` - whether the Hamming shortcut scored this read
/// * `biggest_cluster_scored` - size of the largest near-identical cluster
///   scored, when cluster similarity information is attached
pub fn compute_mapq(
    probability_of_all_candidates: f64,
    probability_of_best_candidate: f64,
    score: u32,
    popular_seeds_skipped: u32,
    used_hamming: bool,
    biggest_cluster_scored: Option<u32>,
) -> u8 {
    // Floating point precision can leave the total a hair below the best.
    let probability_of_all_candidates =
        probability_of_all_candidates.max(probability_of_best_candidate);
    debug_assert!(probability_of_best_candidate >= 0.0);

    // MAPQ 70 is reserved for no evidence of a mismatch at all.
    if probability_of_all_candidates == probability_of_best_candidate
        && popular_seeds_skipped == 0
        && score < 5
        && !used_hamming
    {
        return 70;
    }

    if probability_of_all_candidates <= 0.0 {
        return 0;
    }

    let correctness_probability = probability_of_best_candidate / probability_of_all_candidates;
    let mut base_mapq: i32 = if correctness_probability >= 1.0 {
        69
    } else {
        69.min((-10.0 * (1.0 - correctness_probability).log10()) as i32)
    };

    // The Hamming shortcut can occasionally miss alignments; cap its
    // confidence.
    if used_hamming {
        if base_mapq > 26 {
            base_mapq = 26;
        } else if base_mapq > 10 {
            base_mapq -= 1;
        }
    }

    if let Some(cluster) = biggest_cluster_scored {
        base_mapq = 0.max(base_mapq - ((cluster as f64).log10() * 3.0) as i32);
    }

    // Penalty for overly popular seeds the aligner never looked at.
    base_mapq = 0.max(base_mapq - 0.max(popular_seeds_skipped as i32 - 10) / 2);

    base_mapq.clamp(0, 70) as u8
}
