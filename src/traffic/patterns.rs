use std::collections::HashSet;

use serde::Serialize;

use crate::trace::MemOp;
use crate::traffic::config::TraceGenConfig;

#[derive(Debug, Clone)]
enum TraceKind {
    // Per-layer sequential sweep of the KV cache during token generation,
    // with a trailing write of the new token's state and an optional
    // permille rate of non-sequential noise jumps.
    Attention {
        context_length: u64,
        kv_bytes_per_token: u64,
        num_layers: u64,
        generation_length: u64,
        noise_permille: u64,
        seed: u64,
    },
    // Sequential write stream building the KV cache from scratch.
    Prefill {
        context_length: u64,
        kv_bytes_per_token: u64,
        num_layers: u64,
    },
    // Uniform reads over a small strided working set.
    HotSet {
        lines: u64,
        stride_lines: u64,
        accesses: u64,
        seed: u64,
    },
    // Uniform reads over a large span, no reuse locality.
    Scatter {
        span_lines: u64,
        accesses: u64,
        seed: u64,
    },
    // Fixed-stride read sweep.
    Strided { stride_lines: u64, count: u64 },
}

/// Compiles a trace spec and generates the operation stream.  Generation
/// is fully deterministic: randomness comes from a splitmix-style hash of
/// (seed, access index), never from an RNG.
#[derive(Debug, Clone)]
pub struct TraceGenerator {
    base_addr: u64,
    line_bytes: u64,
    kind: TraceKind,
}

impl TraceGenerator {
    pub fn new(config: &TraceGenConfig) -> Self {
        let kind = match config.kind.trim().to_ascii_lowercase().as_str() {
            "attention" => TraceKind::Attention {
                context_length: config.context_length,
                kv_bytes_per_token: config.kv_bytes_per_token.max(1),
                num_layers: config.num_layers.max(1),
                generation_length: config.generation_length.max(1),
                noise_permille: config.noise_permille.min(1000),
                seed: config.seed,
            },
            "prefill" => TraceKind::Prefill {
                context_length: config.context_length,
                kv_bytes_per_token: config.kv_bytes_per_token.max(1),
                num_layers: config.num_layers.max(1),
            },
            "hot_set" | "hotset" => TraceKind::HotSet {
                lines: config.lines.max(1),
                stride_lines: config.stride_lines.max(1),
                accesses: config.accesses,
                seed: config.seed,
            },
            "scatter" | "random" => TraceKind::Scatter {
                span_lines: config.span_lines.max(1),
                accesses: config.accesses,
                seed: config.seed,
            },
            "strided" | "sequential" => TraceKind::Strided {
                stride_lines: config.stride_lines.max(1),
                count: config.count,
            },
            other => panic!(
                "unsupported trace kind '{}' (expected attention|prefill|hot_set|scatter|strided)",
                other
            ),
        };
        Self {
            base_addr: config.base_addr,
            line_bytes: config.line_bytes.max(1),
            kind,
        }
    }

    pub fn generate(&self) -> Vec<MemOp> {
        match &self.kind {
            TraceKind::Attention {
                context_length,
                kv_bytes_per_token,
                num_layers,
                generation_length,
                noise_permille,
                seed,
            } => self.attention(
                *context_length,
                *kv_bytes_per_token,
                *num_layers,
                *generation_length,
                *noise_permille,
                *seed,
            ),
            TraceKind::Prefill {
                context_length,
                kv_bytes_per_token,
                num_layers,
            } => self.prefill(*context_length, *kv_bytes_per_token, *num_layers),
            TraceKind::HotSet {
                lines,
                stride_lines,
                accesses,
                seed,
            } => self.hot_set(*lines, *stride_lines, *accesses, *seed),
            TraceKind::Scatter {
                span_lines,
                accesses,
                seed,
            } => self.scatter(*span_lines, *accesses, *seed),
            TraceKind::Strided { stride_lines, count } => self.strided(*stride_lines, *count),
        }
    }

    fn align(&self, byte_addr: u64) -> u64 {
        byte_addr / self.line_bytes * self.line_bytes
    }

    fn attention(
        &self,
        context_length: u64,
        kv_bytes_per_token: u64,
        num_layers: u64,
        generation_length: u64,
        noise_permille: u64,
        seed: u64,
    ) -> Vec<MemOp> {
        let mut ops = Vec::new();
        let mut draw = 0u64;
        for gen_step in 0..generation_length {
            let seq_len = context_length + gen_step;
            for layer in 0..num_layers {
                let layer_offset = layer * seq_len * kv_bytes_per_token;
                for token in 0..seq_len {
                    let byte = self.base_addr + layer_offset + token * kv_bytes_per_token;
                    let mut line_addr = self.align(byte);
                    draw += 1;
                    if noise_permille > 0 && mix64(seed ^ draw) % 1000 < noise_permille {
                        // Occasional non-sequential access, a short jump
                        // forward within the cache region.
                        let jump = 1 + mix64(seed.wrapping_add(draw)) % 99;
                        line_addr = (line_addr + jump * self.line_bytes)
                            % (self.base_addr + (1 << 28));
                    }
                    ops.push(MemOp::read(line_addr));
                }
                let new_token = self.base_addr + layer_offset + (seq_len - 1) * kv_bytes_per_token;
                ops.push(MemOp::write(self.align(new_token)));
            }
        }
        ops
    }

    fn prefill(&self, context_length: u64, kv_bytes_per_token: u64, num_layers: u64) -> Vec<MemOp> {
        let mut ops = Vec::new();
        for layer in 0..num_layers {
            let layer_offset = layer * context_length * kv_bytes_per_token;
            for token in 0..context_length {
                let byte = self.base_addr + layer_offset + token * kv_bytes_per_token;
                ops.push(MemOp::write(self.align(byte)));
            }
        }
        ops
    }

    fn hot_set(&self, lines: u64, stride_lines: u64, accesses: u64, seed: u64) -> Vec<MemOp> {
        (0..accesses)
            .map(|idx| {
                let pick = mix64(seed ^ idx) % lines;
                MemOp::read(self.align(self.base_addr) + pick * stride_lines * self.line_bytes)
            })
            .collect()
    }

    fn scatter(&self, span_lines: u64, accesses: u64, seed: u64) -> Vec<MemOp> {
        (0..accesses)
            .map(|idx| {
                let pick = mix64(seed ^ idx.wrapping_mul(0x9e37_79b9_7f4a_7c15)) % span_lines;
                MemOp::read(self.align(self.base_addr) + pick * self.line_bytes)
            })
            .collect()
    }

    fn strided(&self, stride_lines: u64, count: u64) -> Vec<MemOp> {
        (0..count)
            .map(|idx| {
                MemOp::read(self.align(self.base_addr) + idx * stride_lines * self.line_bytes)
            })
            .collect()
    }
}

fn mix64(mut x: u64) -> u64 {
    x ^= x >> 30;
    x = x.wrapping_mul(0xbf58_476d_1ce4_e5b9);
    x ^= x >> 27;
    x = x.wrapping_mul(0x94d0_49bb_1331_11eb);
    x ^ (x >> 31)
}

/// Statistical fingerprint of a trace, for logging and sanity checks.
#[derive(Debug, Clone, Serialize)]
pub struct TraceSummary {
    pub total: u64,
    pub reads: u64,
    pub writes: u64,
    pub unique_lines: u64,
    /// Fraction of consecutive operations exactly one line apart.
    pub sequential_fraction: f64,
    pub working_set_bytes: u64,
}

pub fn summarize(ops: &[MemOp], line_bytes: u64) -> TraceSummary {
    let line_bytes = line_bytes.max(1);
    let mut unique = HashSet::new();
    let mut reads = 0u64;
    let mut sequential = 0u64;
    let mut prev_line = None;
    for op in ops {
        let line = op.addr / line_bytes;
        unique.insert(line);
        if !op.kind.is_write() {
            reads += 1;
        }
        if prev_line == Some(line.wrapping_sub(1)) {
            sequential += 1;
        }
        prev_line = Some(line);
    }
    let total = ops.len() as u64;
    TraceSummary {
        total,
        reads,
        writes: total - reads,
        unique_lines: unique.len() as u64,
        sequential_fraction: if total > 1 {
            sequential as f64 / (total - 1) as f64
        } else {
            0.0
        },
        working_set_bytes: unique.len() as u64 * line_bytes,
    }
}
