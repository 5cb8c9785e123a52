use std::fmt;

use serde::Serialize;

use crate::timeq::Cycle;

/// Counters and the read-latency series for one simulation run.  All
/// fields are owned by the simulator while it runs; the caller receives
/// the finished value when the run ends.  Two runs over identical
/// (config, trace) inputs produce equal metrics, latency series included.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimMetrics {
    t1_hits: u64,
    t1_misses: u64,
    t2_hits: u64,
    t2_misses: u64,
    write_count: u64,
    bank_conflicts_t1: u64,
    bank_conflicts_t2: u64,
    prefetches_issued: u64,
    prefetches_useful: u64,
    prefetches_wasted: u64,
    evictions_t1: u64,
    evictions_t2: u64,
    t1_bank_hits: Vec<u64>,
    t1_bank_misses: Vec<u64>,
    read_latencies: Vec<Cycle>,
    total_cycles: Cycle,
}

impl SimMetrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub fn t1_hits(&self) -> u64 {
        self.t1_hits
    }

    pub fn t1_misses(&self) -> u64 {
        self.t1_misses
    }

    pub fn t2_hits(&self) -> u64 {
        self.t2_hits
    }

    pub fn t2_misses(&self) -> u64 {
        self.t2_misses
    }

    pub fn write_count(&self) -> u64 {
        self.write_count
    }

    pub fn bank_conflicts_t1(&self) -> u64 {
        self.bank_conflicts_t1
    }

    pub fn bank_conflicts_t2(&self) -> u64 {
        self.bank_conflicts_t2
    }

    pub fn prefetches_issued(&self) -> u64 {
        self.prefetches_issued
    }

    pub fn prefetches_useful(&self) -> u64 {
        self.prefetches_useful
    }

    pub fn prefetches_wasted(&self) -> u64 {
        self.prefetches_wasted
    }

    pub fn evictions_t1(&self) -> u64 {
        self.evictions_t1
    }

    pub fn evictions_t2(&self) -> u64 {
        self.evictions_t2
    }

    pub fn t1_bank_hits(&self) -> &[u64] {
        &self.t1_bank_hits
    }

    pub fn t1_bank_misses(&self) -> &[u64] {
        &self.t1_bank_misses
    }

    pub fn read_latencies(&self) -> &[Cycle] {
        &self.read_latencies
    }

    pub fn total_cycles(&self) -> Cycle {
        self.total_cycles
    }

    pub fn reads(&self) -> u64 {
        self.t1_hits.saturating_add(self.t1_misses)
    }

    pub fn t1_hit_rate(&self) -> f64 {
        ratio(self.t1_hits, self.reads())
    }

    pub fn prefetch_accuracy(&self) -> f64 {
        ratio(self.prefetches_useful, self.prefetches_issued)
    }

    pub fn prefetch_coverage(&self) -> f64 {
        ratio(
            self.prefetches_useful,
            self.t1_misses.saturating_add(self.prefetches_useful),
        )
    }

    pub fn t1_conflict_rate(&self) -> f64 {
        ratio(
            self.bank_conflicts_t1,
            self.reads().saturating_add(self.write_count),
        )
    }

    pub fn t2_conflict_rate(&self) -> f64 {
        ratio(
            self.bank_conflicts_t2,
            self.t2_hits.saturating_add(self.t2_misses),
        )
    }

    /// Latency percentile with linear interpolation over the sorted read
    /// sample.  `pct` is in [0, 100]; an empty series reports 0.
    pub fn latency_percentile(&self, pct: f64) -> f64 {
        percentile(&self.read_latencies, pct)
    }

    pub(crate) fn record_t1_hit(&mut self) {
        self.t1_hits = self.t1_hits.saturating_add(1);
    }

    pub(crate) fn record_t1_miss(&mut self) {
        self.t1_misses = self.t1_misses.saturating_add(1);
    }

    pub(crate) fn record_t2_hit(&mut self) {
        self.t2_hits = self.t2_hits.saturating_add(1);
    }

    pub(crate) fn record_t2_miss(&mut self) {
        self.t2_misses = self.t2_misses.saturating_add(1);
    }

    pub(crate) fn record_write(&mut self) {
        self.write_count = self.write_count.saturating_add(1);
    }

    pub(crate) fn record_conflict_t1(&mut self) {
        self.bank_conflicts_t1 = self.bank_conflicts_t1.saturating_add(1);
    }

    pub(crate) fn record_conflict_t2(&mut self) {
        self.bank_conflicts_t2 = self.bank_conflicts_t2.saturating_add(1);
    }

    pub(crate) fn record_prefetch_issue(&mut self) {
        self.prefetches_issued = self.prefetches_issued.saturating_add(1);
    }

    pub(crate) fn record_prefetch_useful(&mut self) {
        self.prefetches_useful = self.prefetches_useful.saturating_add(1);
    }

    pub(crate) fn record_prefetch_wasted(&mut self) {
        self.prefetches_wasted = self.prefetches_wasted.saturating_add(1);
    }

    pub(crate) fn record_read_latency(&mut self, latency: Cycle) {
        self.read_latencies.push(latency);
    }

    pub(crate) fn set_total_cycles(&mut self, cycle: Cycle) {
        self.total_cycles = cycle;
    }

    pub(crate) fn set_evictions(&mut self, t1: u64, t2: u64) {
        self.evictions_t1 = t1;
        self.evictions_t2 = t2;
    }

    pub(crate) fn set_t1_bank_counters(&mut self, hits: Vec<u64>, misses: Vec<u64>) {
        self.t1_bank_hits = hits;
        self.t1_bank_misses = misses;
    }
}

fn ratio(num: u64, denom: u64) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

fn percentile(samples: &[Cycle], pct: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_unstable();
    let pct = pct.clamp(0.0, 100.0);
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    let a = sorted[lo] as f64;
    let b = sorted[hi] as f64;
    a + (b - a) * frac
}

/// Derived summary of a run, ready for console or JSON emission.
#[derive(Debug, Clone, Serialize)]
pub struct SimReport {
    pub reads: u64,
    pub writes: u64,
    pub t1_hits: u64,
    pub t1_misses: u64,
    pub t1_hit_rate: f64,
    pub t2_hits: u64,
    pub t2_misses: u64,
    pub p50_latency: f64,
    pub p90_latency: f64,
    pub p99_latency: f64,
    pub p99_9_latency: f64,
    pub prefetches_issued: u64,
    pub prefetches_useful: u64,
    pub prefetches_wasted: u64,
    pub prefetch_accuracy: f64,
    pub prefetch_coverage: f64,
    pub bank_conflicts_t1: u64,
    pub bank_conflicts_t2: u64,
    pub t1_conflict_rate: f64,
    pub t2_conflict_rate: f64,
    pub evictions_t1: u64,
    pub evictions_t2: u64,
    pub total_cycles: Cycle,
}

impl SimReport {
    pub fn from_metrics(metrics: &SimMetrics) -> Self {
        Self {
            reads: metrics.reads(),
            writes: metrics.write_count(),
            t1_hits: metrics.t1_hits(),
            t1_misses: metrics.t1_misses(),
            t1_hit_rate: metrics.t1_hit_rate(),
            t2_hits: metrics.t2_hits(),
            t2_misses: metrics.t2_misses(),
            p50_latency: metrics.latency_percentile(50.0),
            p90_latency: metrics.latency_percentile(90.0),
            p99_latency: metrics.latency_percentile(99.0),
            p99_9_latency: metrics.latency_percentile(99.9),
            prefetches_issued: metrics.prefetches_issued(),
            prefetches_useful: metrics.prefetches_useful(),
            prefetches_wasted: metrics.prefetches_wasted(),
            prefetch_accuracy: metrics.prefetch_accuracy(),
            prefetch_coverage: metrics.prefetch_coverage(),
            bank_conflicts_t1: metrics.bank_conflicts_t1(),
            bank_conflicts_t2: metrics.bank_conflicts_t2(),
            t1_conflict_rate: metrics.t1_conflict_rate(),
            t2_conflict_rate: metrics.t2_conflict_rate(),
            evictions_t1: metrics.evictions_t1(),
            evictions_t2: metrics.evictions_t2(),
            total_cycles: metrics.total_cycles(),
        }
    }
}

impl fmt::Display for SimReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "t1 hit rate: {:.2}% ({} hits / {} reads)",
            self.t1_hit_rate * 100.0,
            self.t1_hits,
            self.reads
        )?;
        writeln!(
            f,
            "latency p50/p90/p99/p99.9: {:.1}/{:.1}/{:.1}/{:.1} cycles",
            self.p50_latency, self.p90_latency, self.p99_latency, self.p99_9_latency
        )?;
        writeln!(
            f,
            "prefetch: {} issued, {} useful, {} wasted (accuracy {:.2}%, coverage {:.2}%)",
            self.prefetches_issued,
            self.prefetches_useful,
            self.prefetches_wasted,
            self.prefetch_accuracy * 100.0,
            self.prefetch_coverage * 100.0
        )?;
        writeln!(
            f,
            "bank conflicts t1/t2: {}/{}, evictions t1/t2: {}/{}",
            self.bank_conflicts_t1, self.bank_conflicts_t2, self.evictions_t1, self.evictions_t2
        )?;
        writeln!(f, "writes: {}", self.writes)?;
        write!(f, "total cycles: {}", self.total_cycles)
    }
}

#[cfg(test)]
mod tests {
    use super::{percentile, SimMetrics, SimReport};

    #[test]
    fn percentile_interpolates_linearly() {
        let samples = vec![1, 2, 3, 4];
        assert_eq!(percentile(&samples, 0.0), 1.0);
        assert_eq!(percentile(&samples, 100.0), 4.0);
        assert_eq!(percentile(&samples, 50.0), 2.5);
        assert!((percentile(&samples, 90.0) - 3.7).abs() < 1e-9);
    }

    #[test]
    fn percentile_of_empty_series_is_zero() {
        assert_eq!(percentile(&[], 50.0), 0.0);
    }

    #[test]
    fn percentile_of_single_sample_is_the_sample() {
        assert_eq!(percentile(&[7], 0.0), 7.0);
        assert_eq!(percentile(&[7], 99.9), 7.0);
    }

    #[test]
    fn percentile_sorts_its_input() {
        let samples = vec![4, 1, 3, 2];
        assert_eq!(percentile(&samples, 50.0), 2.5);
    }

    #[test]
    fn rates_handle_zero_denominators() {
        let metrics = SimMetrics::new();
        assert_eq!(metrics.t1_hit_rate(), 0.0);
        assert_eq!(metrics.prefetch_accuracy(), 0.0);
        assert_eq!(metrics.prefetch_coverage(), 0.0);
    }

    #[test]
    fn derived_rates_follow_counters() {
        let mut metrics = SimMetrics::new();
        for _ in 0..3 {
            metrics.record_t1_hit();
        }
        metrics.record_t1_miss();
        metrics.record_prefetch_issue();
        metrics.record_prefetch_issue();
        metrics.record_prefetch_useful();
        assert_eq!(metrics.reads(), 4);
        assert_eq!(metrics.t1_hit_rate(), 0.75);
        assert_eq!(metrics.prefetch_accuracy(), 0.5);
        assert_eq!(metrics.prefetch_coverage(), 0.5);
    }

    #[test]
    fn report_mirrors_metrics() {
        let mut metrics = SimMetrics::new();
        metrics.record_t1_hit();
        metrics.record_read_latency(1);
        metrics.record_write();
        metrics.set_total_cycles(17);
        let report = SimReport::from_metrics(&metrics);
        assert_eq!(report.reads, 1);
        assert_eq!(report.writes, 1);
        assert_eq!(report.p50_latency, 1.0);
        assert_eq!(report.total_cycles, 17);
        let text = report.to_string();
        assert!(text.contains("total cycles: 17"));
    }
}
