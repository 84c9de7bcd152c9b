//! Approximate "already emitted" set for page texts.
//!
//! A scalable Bloom filter: when the current filter reaches its capacity a
//! new, larger filter with a tighter error rate is stacked on top, so the
//! overall false-positive rate stays bounded however many pages go in.
//! False negatives never happen for inserted texts.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::config::DedupConfig;

/// Membership structure used to skip pages whose cleaned text was seen.
pub trait SeenSet: Send {
    fn contains(&self, text: &str) -> bool;
    fn add(&mut self, text: &str);
}

const GROWTH: usize = 2;
const TIGHTENING: f64 = 0.9;

struct BloomFilter {
    bits: Vec<u64>,
    num_bits: u64,
    num_hashes: u32,
    capacity: usize,
    count: usize,
}

impl BloomFilter {
    fn new(capacity: usize, error_rate: f64) -> Self {
        let capacity = capacity.max(1);
        let ln2 = std::f64::consts::LN_2;
        let num_bits = ((capacity as f64 * -error_rate.ln()) / (ln2 * ln2)).ceil().max(64.0) as u64;
        let num_hashes = ((num_bits as f64 / capacity as f64) * ln2).round().max(1.0) as u32;
        let words = num_bits.div_ceil(64) as usize;
        BloomFilter {
            bits: vec![0; words],
            num_bits,
            num_hashes,
            capacity,
            count: 0,
        }
    }

    fn positions(&self, hashes: (u64, u64)) -> impl Iterator<Item = u64> + '_ {
        let (h1, h2) = hashes;
        (0..self.num_hashes as u64)
            .map(move |i| h1.wrapping_add(i.wrapping_mul(h2)) % self.num_bits)
    }

    fn contains(&self, hashes: (u64, u64)) -> bool {
        self.positions(hashes)
            .all(|bit| self.bits[(bit / 64) as usize] & (1 << (bit % 64)) != 0)
    }

    fn insert(&mut self, hashes: (u64, u64)) {
        let positions: Vec<u64> = self.positions(hashes).collect();
        for bit in positions {
            self.bits[(bit / 64) as usize] |= 1 << (bit % 64);
        }
        self.count += 1;
    }

    fn is_full(&self) -> bool {
        self.count >= self.capacity
    }
}

fn hash_pair(text: &str) -> (u64, u64) {
    let mut first = DefaultHasher::new();
    text.hash(&mut first);
    let mut second = DefaultHasher::new();
    0x9e37_79b9_7f4a_7c15u64.hash(&mut second);
    text.hash(&mut second);
    // odd step so every index sequence cycles through distinct bits
    (first.finish(), second.finish() | 1)
}

pub struct ScalableBloomFilter {
    filters: Vec<BloomFilter>,
    initial_capacity: usize,
    error_rate: f64,
}

impl ScalableBloomFilter {
    pub fn new(initial_capacity: usize, error_rate: f64) -> Self {
        ScalableBloomFilter {
            filters: Vec::new(),
            initial_capacity: initial_capacity.max(1),
            error_rate,
        }
    }

    pub fn from_config(config: &DedupConfig) -> Self {
        Self::new(config.initial_capacity, config.error_rate)
    }

    /// Number of texts inserted.
    pub fn len(&self) -> usize {
        self.filters.iter().map(|f| f.count).sum()
    }

    fn grow(&mut self) {
        let (capacity, error_rate) = match self.filters.last() {
            None => (self.initial_capacity, self.error_rate * (1.0 - TIGHTENING)),
            Some(last) => {
                let depth = self.filters.len() as i32;
                (
                    last.capacity * GROWTH,
                    self.error_rate * (1.0 - TIGHTENING) * TIGHTENING.powi(depth),
                )
            }
        };
        self.filters.push(BloomFilter::new(capacity, error_rate));
    }
}

impl SeenSet for ScalableBloomFilter {
    fn contains(&self, text: &str) -> bool {
        let hashes = hash_pair(text);
        self.filters.iter().rev().any(|f| f.contains(hashes))
    }

    fn add(&mut self, text: &str) {
        let hashes = hash_pair(text);
        if self.filters.iter().any(|f| f.contains(hashes)) {
            return;
        }
        if self.filters.last().map_or(true, BloomFilter::is_full) {
            self.grow();
        }
        if let Some(filter) = self.filters.last_mut() {
            filter.insert(hashes);
        }
    }
}
