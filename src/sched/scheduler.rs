/*
Trace-driven scheduler for the two-tier hierarchy.

Operations are processed strictly in trace order against a monotonically
non-decreasing cycle counter.  Hardware parallelism is modelled, not
executed: per-bank next-free cycles serialise accesses that would contend
in hardware, and the in-flight table assigns arrival cycles to fills that
would overlap.  A demand miss blocks until its fill arrives; prefetches
are arbitrated at the observing read's issue cycle, after the demand, in
ascending lookahead order, and never block the demand path.

A run is a pure function of (config, trace): identical inputs produce
identical metrics, the full latency series included.
*/

use std::collections::HashSet;

use log::trace;

use crate::config::SimConfig;
use crate::error::{ConfigError, SimError};
use crate::mem::addr::{self, LINE_KEY_BITS};
use crate::mem::{FillOrigin, InflightTable, RetiredFill, TierCache};
use crate::prefetch::{PrefetchPolicy, StreamPrefetcher};
use crate::stats::SimMetrics;
use crate::timeq::{BankPorts, Cycle};
use crate::trace::{MemOp, OpKind};

pub struct Simulator {
    config: SimConfig,
    t1: TierCache,
    t2: TierCache,
    inflight: InflightTable,
    t1_ports: BankPorts,
    t2_ports: BankPorts,
    prefetcher: Box<dyn PrefetchPolicy>,
    metrics: SimMetrics,
    cycle: Cycle,
    // Lines tier-2 has ever admitted.  A first reference is a compulsory
    // fill; a re-reference of a line tier-2 no longer holds is a capacity
    // failure.
    seen_lines: HashSet<u64>,
    // Prefetched lines resident in tier-1 that no demand has touched yet.
    idle_prefetched: HashSet<u64>,
}

impl Simulator {
    pub fn new(config: SimConfig) -> Result<Self, ConfigError> {
        let prefetcher = Box::new(StreamPrefetcher::new(
            config.prefetch_trigger,
            config.prefetch_lookahead,
        ));
        Self::with_policy(config, prefetcher)
    }

    /// Alternate prefetch strategies plug in here; `new` wires up the
    /// stream detector.
    pub fn with_policy(
        config: SimConfig,
        prefetcher: Box<dyn PrefetchPolicy>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let t1 = TierCache::new(config.num_t1_banks, config.t1_lines_per_bank() as usize);
        let t2 = TierCache::new(config.num_t2_banks, config.t2_lines_per_bank() as usize);
        let t1_ports = BankPorts::new(config.num_t1_banks);
        let t2_ports = BankPorts::new(config.num_t2_banks);
        Ok(Self {
            config,
            t1,
            t2,
            inflight: InflightTable::new(),
            t1_ports,
            t2_ports,
            prefetcher,
            metrics: SimMetrics::new(),
            cycle: 0,
            seen_lines: HashSet::new(),
            idle_prefetched: HashSet::new(),
        })
    }

    /// Runs the trace to completion and hands the metrics to the caller.
    pub fn run(mut self, ops: &[MemOp]) -> Result<SimMetrics, SimError> {
        for op in ops {
            self.step(*op)?;
            if let Some(budget) = self.config.max_cycles {
                if self.cycle > budget {
                    let cycle = self.cycle;
                    return Err(SimError::BudgetExceeded {
                        budget,
                        cycle,
                        metrics: Box::new(self.finish()),
                    });
                }
            }
        }
        self.drain()?;
        Ok(self.finish())
    }

    fn step(&mut self, op: MemOp) -> Result<(), SimError> {
        self.retire_due()?;

        let key = addr::line_of(op.addr, self.config.line_bytes);
        if !addr::key_in_range(key) {
            return Err(SimError::AddressOverflow {
                addr: op.addr,
                bits: LINE_KEY_BITS,
            });
        }
        let b1 = addr::t1_bank(key, self.config.num_t1_banks);
        let issue_cycle = self.cycle;

        match op.kind {
            OpKind::Read => {
                let latency = self.access(key, b1, issue_cycle, true)?;
                self.metrics.record_read_latency(latency);
                let candidates = self.prefetcher.observe(key);
                self.issue_prefetches(issue_cycle, &candidates);
            }
            OpKind::Write => {
                self.access(key, b1, issue_cycle, false)?;
                self.metrics.record_write();
            }
        }
        Ok(())
    }

    // Brings `key` into tier-1 and services the access, returning the
    // completion latency relative to `issue_cycle`.  Reads and
    // write-allocates share this path; only reads touch the hit/miss
    // counters.
    fn access(
        &mut self,
        key: u64,
        b1: usize,
        issue_cycle: Cycle,
        is_read: bool,
    ) -> Result<Cycle, SimError> {
        if self.t1.probe(b1, key) {
            if is_read {
                self.t1.record_hit(b1);
                self.metrics.record_t1_hit();
            }
            self.t1.touch(b1, key);
            self.note_demand_touch(key);
            let res = self.t1_ports.reserve(b1, self.cycle);
            if res.conflicted() {
                self.metrics.record_conflict_t1();
            }
            self.cycle += 1;
            return Ok(self.config.t1_latency + res.stall);
        }

        if is_read {
            self.t1.record_miss(b1);
            self.metrics.record_t1_miss();
        }

        let ready = if self.inflight.has(key) {
            if self.inflight.consume(key) == Some(FillOrigin::Prefetch) {
                self.metrics.record_prefetch_useful();
            }
            match self.inflight.ready_at(key) {
                Some(ready) => ready,
                None => return Err(SimError::InvariantViolation("in-flight entry vanished")),
            }
        } else {
            self.fetch_from_t2(key, issue_cycle, FillOrigin::Demand)?
        };

        self.wait_for_fill(key, b1, ready)?;
        Ok(ready.saturating_sub(issue_cycle) + self.config.t1_latency)
    }

    // Blocks until the fill for `key` has arrived, promotes it, and
    // services the tier-1 access that consumes it.
    fn wait_for_fill(&mut self, key: u64, b1: usize, ready: Cycle) -> Result<(), SimError> {
        self.cycle = self.cycle.max(ready);
        self.retire_due()?;
        if !self.t1.probe(b1, key) {
            return Err(SimError::InvariantViolation("fill did not land in tier-1"));
        }
        self.t1.touch(b1, key);
        self.note_demand_touch(key);
        self.t1_ports.reserve(b1, self.cycle);
        self.cycle += 1;
        Ok(())
    }

    // Charges the tier-2 bank and schedules the fill.  `at` is the cycle
    // the request entered arbitration, which for prefetches is the
    // observing read's issue cycle.
    fn fetch_from_t2(&mut self, key: u64, at: Cycle, origin: FillOrigin) -> Result<Cycle, SimError> {
        let b2 = addr::t2_bank(key, self.config.num_t1_banks, self.config.num_t2_banks);
        self.t2_lookup(key, b2)?;
        let res = self.t2_ports.reserve(b2, at);
        if res.conflicted() {
            self.metrics.record_conflict_t2();
        }
        let ready = res.start + self.config.t2_latency;
        self.inflight.insert(key, ready, origin);
        Ok(ready)
    }

    fn t2_lookup(&mut self, key: u64, b2: usize) -> Result<(), SimError> {
        if self.t2.probe(b2, key) {
            self.t2.record_hit(b2);
            self.metrics.record_t2_hit();
            self.t2.touch(b2, key);
            return Ok(());
        }
        if self.seen_lines.insert(key) {
            // Compulsory fill: the main store holds the working set by
            // construction.
            self.t2.record_hit(b2);
            self.metrics.record_t2_hit();
            if let Some(victim) = self.t2.admit(b2, key) {
                trace!("tier-2 capacity eviction of line {victim:#x}");
            }
            return Ok(());
        }
        self.t2.record_miss(b2);
        self.metrics.record_t2_miss();
        Err(SimError::Tier2Miss { line_key: key })
    }

    fn t2_can_serve(&self, key: u64, b2: usize) -> bool {
        self.t2.probe(b2, key) || !self.seen_lines.contains(&key)
    }

    // Walks the candidate window in order, skipping resident and
    // in-flight lines, and stops after `prefetch_issue_width` issues.
    // Speculative traffic is dropped rather than faulted: candidates
    // outside the key range or outside tier-2 are skipped.
    fn issue_prefetches(&mut self, at: Cycle, candidates: &[u64]) {
        let width = self.config.prefetch_issue_width;
        if width == 0 || candidates.is_empty() {
            return;
        }
        let mut issued = 0;
        for &key in candidates {
            if issued >= width {
                break;
            }
            if !addr::key_in_range(key) {
                continue;
            }
            let b1 = addr::t1_bank(key, self.config.num_t1_banks);
            if self.t1.probe(b1, key) || self.inflight.has(key) {
                continue;
            }
            let b2 = addr::t2_bank(key, self.config.num_t1_banks, self.config.num_t2_banks);
            if !self.t2_can_serve(key, b2) {
                continue;
            }
            if self.fetch_from_t2(key, at, FillOrigin::Prefetch).is_ok() {
                self.metrics.record_prefetch_issue();
                issued += 1;
            }
        }
        if issued > 0 {
            trace!("issued {issued} prefetches at cycle {at}");
        }
    }

    fn retire_due(&mut self) -> Result<(), SimError> {
        for fill in self.inflight.retire_due(self.cycle) {
            self.promote(fill)?;
        }
        Ok(())
    }

    // Moves a retired fill into tier-1.  The victim search must never
    // evict a line that is itself in flight; with residency and flight
    // mutually exclusive that cannot happen, and if it ever does the run
    // stops rather than silently corrupt the accounting.
    fn promote(&mut self, fill: RetiredFill) -> Result<(), SimError> {
        let b1 = addr::t1_bank(fill.key, self.config.num_t1_banks);
        let inflight = &self.inflight;
        let evicted = self
            .t1
            .admit_denying(b1, fill.key, |key| inflight.has(key))
            .map_err(|_| SimError::InvariantViolation("every eviction candidate is in flight"))?;
        if let Some(victim) = evicted {
            if self.idle_prefetched.remove(&victim) {
                self.metrics.record_prefetch_wasted();
            }
        }
        if fill.origin == FillOrigin::Prefetch && !fill.consumed {
            self.idle_prefetched.insert(fill.key);
        }
        Ok(())
    }

    fn note_demand_touch(&mut self, key: u64) {
        if self.idle_prefetched.remove(&key) {
            self.metrics.record_prefetch_useful();
        }
    }

    // Retires every remaining fill at its scheduled cycle.  No latency
    // samples are added; the counter just advances to the last arrival.
    fn drain(&mut self) -> Result<(), SimError> {
        while let Some(next) = self.inflight.next_ready() {
            self.cycle = self.cycle.max(next);
            self.retire_due()?;
        }
        Ok(())
    }

    fn finish(self) -> SimMetrics {
        let Simulator {
            t1,
            t2,
            mut metrics,
            cycle,
            ..
        } = self;
        metrics.set_total_cycles(cycle);
        metrics.set_evictions(t1.evictions(), t2.evictions());
        metrics.set_t1_bank_counters(t1.bank_hits().to_vec(), t1.bank_misses().to_vec());
        metrics
    }
}
