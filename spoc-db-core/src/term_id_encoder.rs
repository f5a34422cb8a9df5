//! Partition-scattering term identifier codec
//!
//! A single writer mints identifiers by incrementing a counter, so raw ids
//! arrive in strictly ascending order and every insert into an index keyed
//! by the id lands on the last partition. The encoder takes the low `N` bits
//! of the counter, reverses them, and moves them to the top of the word:
//!
//! ```text
//! encode(v) = (v >>> N) | reverse_bits(v & mask)
//! decode(u) = (u << N) | (reverse_bits(u) & mask)
//! ```
//!
//! Consecutive counters therefore differ in their most significant bits and
//! spread evenly across up to `2^N` partitions. The partition id and the
//! remaining counter bits are kept, shifted right by `N`.

use crate::error::{Error, Result};
use std::fmt;

/// Largest supported number of scatter bits
pub const MAX_BITS: u32 = 31;

/// Bit-reversal scatter codec for term identifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TermIdEncoder {
    bits: u32,
    mask: u64,
}

impl TermIdEncoder {
    /// Create an encoder that scatters the low `bits` bits. `bits` must be in
    /// `[0, 31]`; `0` makes the codec the identity.
    pub fn new(bits: u32) -> Result<Self> {
        if bits > MAX_BITS {
            return Err(Error::invalid_argument(format!(
                "scatter bits must be in [0, {}], got {}",
                MAX_BITS, bits
            )));
        }
        Ok(Self {
            bits,
            mask: (1u64 << bits) - 1,
        })
    }

    /// Number of scattered low bits
    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// Mask selecting the scattered low bits
    #[inline]
    pub fn mask(&self) -> u64 {
        self.mask
    }

    /// Scatter a raw counter value. `0` is the null identifier and is rejected.
    pub fn encode(&self, v: u64) -> Result<u64> {
        if v == 0 {
            return Err(Error::invalid_argument("cannot encode the null identifier"));
        }
        if self.bits == 0 {
            return Ok(v);
        }
        Ok((v >> self.bits) | (v & self.mask).reverse_bits())
    }

    /// Invert [`encode`](Self::encode).
    pub fn decode(&self, u: u64) -> u64 {
        if self.bits == 0 {
            return u;
        }
        (u << self.bits) | (u.reverse_bits() & self.mask)
    }
}

impl fmt::Display for TermIdEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TermIdEncoder{{bits={}, mask={:#x}}}", self.bits, self.mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::TermId;

    fn sample_values() -> Vec<u64> {
        let mut vals = vec![1, 2, 3, 7, 8, 255, 1023, 0xFFFF_FFFF, u64::MAX, u64::MAX - 1];
        for pid in [0u32, 1, 12, u32::MAX] {
            for ctr in [0u32, 1, 2, 3, 1000, 0x8000_0000, u32::MAX] {
                let v = TermId::combine(pid, ctr).as_u64();
                if v != 0 {
                    vals.push(v);
                }
            }
        }
        vals
    }

    #[test]
    fn test_round_trip_all_bit_counts() {
        for bits in 0..=MAX_BITS {
            let enc = TermIdEncoder::new(bits).unwrap();
            for v in sample_values() {
                let u = enc.encode(v).unwrap();
                assert_eq!(enc.decode(u), v, "bits={} v={:#x}", bits, v);
            }
        }
    }

    #[test]
    fn test_encode_zero_rejected() {
        for bits in [0, 1, 16, 31] {
            let enc = TermIdEncoder::new(bits).unwrap();
            assert!(matches!(enc.encode(0), Err(Error::InvalidArgument(_))));
        }
    }

    #[test]
    fn test_bits_out_of_range() {
        assert!(TermIdEncoder::new(31).is_ok());
        assert!(matches!(
            TermIdEncoder::new(32),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_zero_bits_is_identity() {
        let enc = TermIdEncoder::new(0).unwrap();
        assert_eq!(enc.mask(), 0);
        assert_eq!(enc.encode(12345).unwrap(), 12345);
    }

    #[test]
    fn test_consecutive_counters_scatter_high_bits() {
        let enc = TermIdEncoder::new(2).unwrap();
        // low two bits 01, 10, 11 reversed into the top two bits
        assert_eq!(enc.encode(1).unwrap(), 0b10 << 62);
        assert_eq!(enc.encode(2).unwrap(), 0b01 << 62);
        assert_eq!(enc.encode(3).unwrap(), 0b11 << 62);
        // counter 4 = 0b100: low bits zero, rest shifted down
        assert_eq!(enc.encode(4).unwrap(), 1);

        let enc = TermIdEncoder::new(8).unwrap();
        let tops: std::collections::HashSet<u64> =
            (1..=256u64).map(|v| enc.encode(v).unwrap() >> 56).collect();
        // 255 distinct non-zero low patterns plus 256 (low bits zero)
        assert_eq!(tops.len(), 256);
    }

    #[test]
    fn test_partition_id_is_preserved_shifted() {
        let enc = TermIdEncoder::new(4).unwrap();
        let v = TermId::combine(0x1234, 0x10).as_u64();
        let u = enc.encode(v).unwrap();
        // low nibble of the counter is zero, so nothing lands in the top bits
        assert_eq!(u, v >> 4);
    }
}
