use serde::Deserialize;

use crate::config::Config;

/// Parameters for synthetic trace generation.  One flat spec covers all
/// pattern kinds; each kind reads the fields it cares about and ignores
/// the rest.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TraceGenConfig {
    /// attention | prefill | hot_set | scatter | strided
    pub kind: String,
    /// Base byte address of the generated region.
    pub base_addr: u64,
    /// Line size used for alignment; keep equal to the simulator's.
    pub line_bytes: u64,
    /// Access count for hot_set and scatter.
    pub accesses: u64,
    /// Working-set size in lines for hot_set.
    pub lines: u64,
    /// Line stride for hot_set and strided.
    pub stride_lines: u64,
    /// Address span in lines for scatter.
    pub span_lines: u64,
    /// Read count for strided.
    pub count: u64,
    /// Tokens of context for attention and prefill.
    pub context_length: u64,
    /// Bytes of K+V state per token.
    pub kv_bytes_per_token: u64,
    /// Transformer layers swept per generation step.
    pub num_layers: u64,
    /// New tokens generated by the attention pattern.
    pub generation_length: u64,
    /// Per-access chance, in permille, of a non-sequential noise jump in
    /// the attention pattern.
    pub noise_permille: u64,
    /// Seed for the deterministic hash stream.
    pub seed: u64,
}

impl Config for TraceGenConfig {}

impl Default for TraceGenConfig {
    fn default() -> Self {
        Self {
            kind: "attention".to_string(),
            base_addr: 0x1000_0000,
            line_bytes: 128,
            accesses: 10_000,
            lines: 64,
            stride_lines: 1,
            span_lines: 1 << 20,
            count: 8192,
            context_length: 2048,
            kv_bytes_per_token: 4096,
            num_layers: 32,
            generation_length: 1,
            noise_permille: 20,
            seed: 0,
        }
    }
}
