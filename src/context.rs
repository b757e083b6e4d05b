/// The aligner-context iteration driver: runs one alignment pass per
/// parameter setting, fanning read batches over worker threads.
///
/// Each worker owns its aligner instance and statistics; the only shared
/// state is the read-supplier channel, the writer channel, and the final
/// stats merge under a mutex at thread exit.
use std::sync::Mutex;
use std::thread;
use std::time::Instant;

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{info, warn};
use noodles::sam::alignment::record_buf::RecordBuf;

use crate::align::lv::CigarOp;
use crate::align::{AlignmentResult, BaseAligner, Hit, IntersectingPairedEndAligner, LandauVishkin};
use crate::error::Error;
use crate::genome::Genome;
use crate::index::GenomeIndex;
use crate::io::fastq::{FastqReader, PairedFastqReader};
use crate::io::sam::{build_record, MateInfo, SamWriter};
use crate::params::{OutputFilter, ParamSetting, Parameters, RunMode};
use crate::reads::{Direction, Read};
use crate::stats::AlignerStats;

/// Reads per supplier batch.
const BATCH_SIZE: usize = 1000;

/// Reads shorter than this are not worth seeding and are reported NotFound
/// without entering the aligner.
const MIN_USEFUL_READ_LEN: usize = 50;

/// Run the full alignment: load the index once, then one iteration per
/// parameter setting.
pub fn run_alignment(params: &Parameters) -> Result<(), Error> {
    let load_start = Instant::now();
    let index = GenomeIndex::load(&params.index_dir)?;
    info!(
        "Index load took {} ms ({} bases, seed length {})",
        load_start.elapsed().as_millis(),
        index.genome().count_of_bases(),
        index.seed_len()
    );

    let settings = params.sweep_settings();
    if settings.len() > 1 && params.output_file.is_some() {
        warn!("parameter ranges given; the SAM output will be overwritten each iteration");
    }

    info!("ConfDif\tMaxHits\tMaxDist\tMaxSeed\tConfAd\t%Used\t%Unique\t%Multi\t%!Found\tReads/s");
    for setting in &settings {
        let align_start = Instant::now();
        let stats = run_iteration(&index, params, setting)?;
        let align_time_ms = align_start.elapsed().as_millis() as u64;

        info!(
            "{}\t{}\t{}\t{}\t{}\t{:.2}%\t{:.2}%\t{:.2}%\t{:.2}%\t{:.0}",
            setting.conf_diff,
            setting.max_hits,
            setting.max_dist,
            setting.num_seeds,
            setting.adaptive_conf_diff,
            stats.percent_used(),
            stats.percent_single(),
            stats.percent_multi(),
            stats.percent_not_found(),
            1000.0 * stats.useful_reads as f64 / align_time_ms.max(1) as f64,
        );
        stats.print_summary(align_time_ms);
    }
    info!("Alignment complete!");
    Ok(())
}

fn run_iteration(
    index: &GenomeIndex,
    params: &Parameters,
    setting: &ParamSetting,
) -> Result<AlignerStats, Error> {
    info!(
        "Using {} thread{} for alignment",
        params.run_thread_n,
        if params.run_thread_n == 1 { "" } else { "s" }
    );
    match params.run_mode {
        RunMode::Single => run_single_iteration(index, params, setting),
        RunMode::Paired => run_paired_iteration(index, params, setting),
        RunMode::BuildIndex => unreachable!("buildIndex is dispatched before alignment"),
    }
}

/// Deterministic 1-in-N read sampling. The decision hashes the read name,
/// so a given input always scores the same reads no matter how batches land
/// on worker threads.
struct SelectivitySampler {
    selectivity: u32,
}

impl SelectivitySampler {
    fn new(selectivity: u32) -> Self {
        Self { selectivity }
    }

    fn keep(&self, read_name: &str) -> bool {
        if self.selectivity <= 1 {
            return true;
        }
        // FNV-1a.
        let mut hash = 0xcbf2_9ce4_8422_2325u64;
        for &b in read_name.as_bytes() {
            hash ^= b as u64;
            hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
        }
        hash % self.selectivity as u64 == 0
    }
}

fn passes_filter(filter: Option<OutputFilter>, result: AlignmentResult) -> bool {
    match filter {
        None => true,
        Some(OutputFilter::Aligned) => result != AlignmentResult::NotFound,
        Some(OutputFilter::SingleHitOnly) => result.is_one_location(),
        Some(OutputFilter::Unaligned) => result == AlignmentResult::NotFound,
    }
}

/// Recompute the winning alignment's edit script for output.
fn cigar_for_hit(
    lv: &mut LandauVishkin,
    genome: &Genome,
    read: &Read,
    hit: Hit,
    max_k: u32,
) -> Result<Vec<CigarOp>, Error> {
    let oriented;
    let read = match hit.direction {
        Direction::Forward => read,
        Direction::Rc => {
            oriented = read.reverse_complement();
            &oriented
        }
    };

    let piece_idx = genome.piece_index_at_location(hit.location).ok_or_else(|| {
        Error::Alignment(format!("hit location {} outside the genome", hit.location))
    })?;
    let piece_end = genome.piece_end(piece_idx);
    let wanted = read.len() + max_k as usize;
    let available = ((piece_end - hit.location) as usize).min(wanted);
    let window = genome
        .substring(hit.location, available)
        .ok_or_else(|| Error::Alignment("reference window out of bounds".to_string()))?;

    let mut ops = Vec::new();
    lv.compute_with_cigar(window, read.bases(), read.quals(), max_k, &mut ops)
        .ok_or_else(|| {
            Error::Alignment(format!(
                "winning location {} did not rescore within the limit",
                hit.location
            ))
        })?;
    Ok(ops)
}

fn run_single_iteration(
    index: &GenomeIndex,
    params: &Parameters,
    setting: &ParamSetting,
) -> Result<AlignerStats, Error> {
    let writer = params
        .output_file
        .as_deref()
        .map(|path| SamWriter::create(path, index.genome()))
        .transpose()?;

    let queue_depth = params.run_thread_n * 2;
    let (batch_tx, batch_rx) = bounded::<Vec<Read>>(queue_depth);
    let (record_tx, record_rx) = bounded::<Vec<RecordBuf>>(queue_depth);
    let record_tx = writer.is_some().then_some(record_tx);
    let shared_stats = Mutex::new(AlignerStats::new());

    let input = params.read_files_in[0].clone();
    let clipping = params.clipping;

    thread::scope(|scope| -> Result<(), Error> {
        let reader_handle = scope.spawn(move || -> Result<(), Error> {
            let mut reader = FastqReader::open(&input, clipping)?;
            loop {
                let batch = reader.read_batch(BATCH_SIZE)?;
                if batch.is_empty() {
                    break;
                }
                if batch_tx.send(batch).is_err() {
                    break; // workers are gone; an error is propagating
                }
            }
            Ok(())
        });

        let writer_handle = writer.map(|mut writer| {
            let record_rx = record_rx;
            scope.spawn(move || -> Result<(), Error> {
                for batch in record_rx.iter() {
                    for record in &batch {
                        writer.write_record(record)?;
                    }
                }
                writer.finish()
            })
        });

        let mut worker_handles = Vec::with_capacity(params.run_thread_n);
        for _ in 0..params.run_thread_n {
            let batch_rx = batch_rx.clone();
            let record_tx = record_tx.clone();
            let shared_stats = &shared_stats;
            worker_handles.push(scope.spawn(move || -> Result<(), Error> {
                single_worker(index, params, setting, batch_rx, record_tx, shared_stats)
            }));
        }
        drop(batch_rx);
        drop(record_tx);

        let mut first_error: Option<Error> = None;
        for handle in worker_handles {
            if let Err(e) = handle.join().expect("worker thread panicked") {
                first_error.get_or_insert(e);
            }
        }
        if let Some(handle) = writer_handle {
            if let Err(e) = handle.join().expect("writer thread panicked") {
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = reader_handle.join().expect("reader thread panicked") {
            first_error.get_or_insert(e);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    })?;

    Ok(shared_stats.into_inner().expect("stats mutex poisoned"))
}

fn single_worker(
    index: &GenomeIndex,
    params: &Parameters,
    setting: &ParamSetting,
    batch_rx: Receiver<Vec<Read>>,
    record_tx: Option<Sender<Vec<RecordBuf>>>,
    shared_stats: &Mutex<AlignerStats>,
) -> Result<(), Error> {
    let mut aligner = BaseAligner::new(
        index,
        setting.conf_diff,
        setting.max_hits,
        setting.max_dist,
        setting.num_seeds,
        setting.adaptive_conf_diff,
    );
    aligner.set_explore_popular_seeds(params.explore_popular_seeds);
    aligner.set_stop_on_first_hit(params.stop_on_first_hit);
    let mut cigar_lv = LandauVishkin::new();
    let sampler = SelectivitySampler::new(params.selectivity);
    let mut stats = AlignerStats::new();

    for batch in batch_rx.iter() {
        let mut records = Vec::new();
        for read in &batch {
            if !sampler.keep(read.name()) {
                continue;
            }
            stats.total_reads += 1;

            let alignment = if read.len() < MIN_USEFUL_READ_LEN
                || read.count_of_ns() as u32 > setting.max_dist
            {
                // Not worth seeding; report it unaligned and move on.
                None
            } else {
                stats.useful_reads += 1;
                let scorer_start = Instant::now();
                let alignment = aligner.align_read(read);
                stats.nanos_in_scorer += scorer_start.elapsed().as_nanos() as u64;
                stats.record_result(alignment.result, alignment.mapq);
                stats.popular_seeds_skipped += aligner.popular_seeds_skipped_last_read() as u64;
                Some(alignment)
            };

            if let Some(_record_tx) = &record_tx {
                let (result, hit, mapq) = match &alignment {
                    Some(a) => (a.result, a.hit, a.mapq),
                    None => (AlignmentResult::NotFound, None, 0),
                };
                if passes_filter(params.filter, result) {
                    let ops = match hit {
                        Some(hit) => {
                            cigar_for_hit(&mut cigar_lv, index.genome(), read, hit, setting.max_dist)?
                        }
                        None => Vec::new(),
                    };
                    records.push(build_record(
                        read,
                        hit,
                        mapq,
                        &ops,
                        params.use_m,
                        index.genome(),
                        None,
                    )?);
                }
            }
        }
        if let Some(record_tx) = &record_tx {
            if !records.is_empty() && record_tx.send(records).is_err() {
                break;
            }
        }
    }

    stats.lv_calls += aligner.n_locations_scored();
    stats.indels_merged += aligner.n_indels_merged();
    stats.too_many_ns += aligner.n_reads_ignored_because_of_too_many_ns();

    shared_stats
        .lock()
        .expect("stats mutex poisoned")
        .add(&stats);
    Ok(())
}

fn run_paired_iteration(
    index: &GenomeIndex,
    params: &Parameters,
    setting: &ParamSetting,
) -> Result<AlignerStats, Error> {
    let writer = params
        .output_file
        .as_deref()
        .map(|path| SamWriter::create(path, index.genome()))
        .transpose()?;

    let queue_depth = params.run_thread_n * 2;
    let (batch_tx, batch_rx) = bounded::<Vec<(Read, Read)>>(queue_depth);
    let (record_tx, record_rx) = bounded::<Vec<RecordBuf>>(queue_depth);
    let record_tx = writer.is_some().then_some(record_tx);
    let shared_stats = Mutex::new(AlignerStats::new());

    let input0 = params.read_files_in[0].clone();
    let input1 = params.read_files_in[1].clone();
    let clipping = params.clipping;

    thread::scope(|scope| -> Result<(), Error> {
        let reader_handle = scope.spawn(move || -> Result<(), Error> {
            let mut reader = PairedFastqReader::open(&input0, &input1, clipping)?;
            loop {
                let batch = reader.read_pair_batch(BATCH_SIZE)?;
                if batch.is_empty() {
                    break;
                }
                if batch_tx.send(batch).is_err() {
                    break;
                }
            }
            Ok(())
        });

        let writer_handle = writer.map(|mut writer| {
            let record_rx = record_rx;
            scope.spawn(move || -> Result<(), Error> {
                for batch in record_rx.iter() {
                    for record in &batch {
                        writer.write_record(record)?;
                    }
                }
                writer.finish()
            })
        });

        let mut worker_handles = Vec::with_capacity(params.run_thread_n);
        for _ in 0..params.run_thread_n {
            let batch_rx = batch_rx.clone();
            let record_tx = record_tx.clone();
            let shared_stats = &shared_stats;
            worker_handles.push(scope.spawn(move || -> Result<(), Error> {
                paired_worker(index, params, setting, batch_rx, record_tx, shared_stats)
            }));
        }
        drop(batch_rx);
        drop(record_tx);

        let mut first_error: Option<Error> = None;
        for handle in worker_handles {
            if let Err(e) = handle.join().expect("worker thread panicked") {
                first_error.get_or_insert(e);
            }
        }
        if let Some(handle) = writer_handle {
            if let Err(e) = handle.join().expect("writer thread panicked") {
                first_error.get_or_insert(e);
            }
        }
        if let Err(e) = reader_handle.join().expect("reader thread panicked") {
            first_error.get_or_insert(e);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    })?;

    Ok(shared_stats.into_inner().expect("stats mutex poisoned"))
}

fn paired_worker(
    index: &GenomeIndex,
    params: &Parameters,
    setting: &ParamSetting,
    batch_rx: Receiver<Vec<(Read, Read)>>,
    record_tx: Option<Sender<Vec<RecordBuf>>>,
    shared_stats: &Mutex<AlignerStats>,
) -> Result<(), Error> {
    let mut aligner = IntersectingPairedEndAligner::new(
        index,
        setting.max_dist,
        setting.num_seeds,
        params.min_spacing,
        params.max_spacing,
        setting.max_hits,
        params.extra_search_depth,
    );
    let mut cigar_lv = LandauVishkin::new();
    let sampler = SelectivitySampler::new(params.selectivity);
    let mut stats = AlignerStats::new();

    for batch in batch_rx.iter() {
        let mut records = Vec::new();
        for (read0, read1) in &batch {
            if !sampler.keep(read0.name()) {
                continue;
            }
            stats.total_reads += 2;
            stats.useful_reads += 2;

            let scorer_start = Instant::now();
            let result = aligner.align(read0, read1);
            stats.nanos_in_scorer += scorer_start.elapsed().as_nanos() as u64;

            for end in &result.ends {
                stats.record_result(end.status, end.mapq);
            }

            if record_tx.is_some() {
                let reads = [read0, read1];
                for which in 0..2 {
                    let end = &result.ends[which];
                    if !passes_filter(params.filter, end.status) {
                        continue;
                    }
                    let ops = match end.hit {
                        Some(hit) => cigar_for_hit(
                            &mut cigar_lv,
                            index.genome(),
                            reads[which],
                            hit,
                            setting.max_dist,
                        )?,
                        None => Vec::new(),
                    };
                    let mate = MateInfo {
                        hit: result.ends[1 - which].hit,
                        read_len: reads[1 - which].len(),
                        first_in_pair: which == 0,
                    };
                    records.push(build_record(
                        reads[which],
                        end.hit,
                        end.mapq,
                        &ops,
                        params.use_m,
                        index.genome(),
                        Some(&mate),
                    )?);
                }
            }
        }
        if let Some(record_tx) = &record_tx {
            if !records.is_empty() && record_tx.send(records).is_err() {
                break;
            }
        }
    }

    let base = aligner.base_aligner();
    stats.lv_calls += aligner.n_lv_calls() + base.n_locations_scored();
    stats.indels_merged += base.n_indels_merged();
    stats.too_many_ns += base.n_reads_ignored_because_of_too_many_ns();

    shared_stats
        .lock()
        .expect("stats mutex poisoned")
        .add(&stats);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampler_keeps_everything_at_selectivity_one() {
        let sampler = SelectivitySampler::new(1);
        assert!((0..100).all(|i| sampler.keep(&format!("read{i}"))));
    }

    #[test]
    fn sampler_is_deterministic_and_sparse() {
        let sampler = SelectivitySampler::new(4);
        let taken: Vec<bool> = (0..200)
            .map(|i| sampler.keep(&format!("read{i}")))
            .collect();
        let again: Vec<bool> = (0..200)
            .map(|i| sampler.keep(&format!("read{i}")))
            .collect();
        assert_eq!(taken, again);
        // Roughly one in four, not all or nothing.
        let count = taken.iter().filter(|&&k| k).count();
        assert!(count > 10 && count < 120, "kept {count} of 200");
    }

    #[test]
    fn filter_classification() {
        use AlignmentResult::*;
        assert!(passes_filter(None, NotFound));
        assert!(passes_filter(Some(OutputFilter::Aligned), SingleHit));
        assert!(passes_filter(Some(OutputFilter::Aligned), MultipleHits));
        assert!(!passes_filter(Some(OutputFilter::Aligned), NotFound));
        assert!(passes_filter(Some(OutputFilter::SingleHitOnly), CertainHit));
        assert!(!passes_filter(Some(OutputFilter::SingleHitOnly), MultipleHits));
        assert!(passes_filter(Some(OutputFilter::Unaligned), NotFound));
        assert!(!passes_filter(Some(OutputFilter::Unaligned), SingleHit));
    }
}
