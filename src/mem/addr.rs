// Address-to-line normalisation and bank routing.  Pure functions; the
// low-order-bit mappings are part of the reproducibility contract.

/// Line keys are bounded to this width; anything above is an address
/// overflow for the modelled address space.
pub const LINE_KEY_BITS: u32 = 48;

pub(crate) fn line_of(addr: u64, line_bytes: u64) -> u64 {
    addr / line_bytes
}

pub(crate) fn key_in_range(line_key: u64) -> bool {
    line_key >> LINE_KEY_BITS == 0
}

pub(crate) fn t1_bank(line_key: u64, num_t1_banks: usize) -> usize {
    (line_key % num_t1_banks as u64) as usize
}

pub(crate) fn t2_bank(line_key: u64, num_t1_banks: usize, num_t2_banks: usize) -> usize {
    ((line_key / num_t1_banks as u64) % num_t2_banks as u64) as usize
}
