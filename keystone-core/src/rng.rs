use rand::RngCore;
use rand_pcg::Pcg32;
use thiserror::Error;

/// Stream used when the caller does not pick one.
pub const DEFAULT_STREAM: u64 = 0x0A02_BDBF_7BB3_C0A7;

/// Returned when a range draw is asked for an empty or inverted range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("max_exclusive ({max_exclusive}) must be larger than min_inclusive ({min_inclusive})")]
pub struct RangeError {
    pub min_inclusive: i32,
    pub max_exclusive: i32,
}

/// Seeded PCG32 (XSH-RR 64/32) source. Every random decision of a run goes
/// through one of these so a seed fully reproduces the placement.
///
/// `Pcg32::new(seed, stream)` performs the canonical PCG initialisation:
/// zero state, odd increment `(stream << 1) | 1`, advance, add seed, advance.
#[derive(Debug, Clone)]
pub struct SeededRng {
    seed: u64,
    stream: u64,
    inner: Pcg32,
}

impl SeededRng {
    pub fn new(seed: u64) -> Self {
        Self::with_stream(seed, DEFAULT_STREAM)
    }

    pub fn with_stream(seed: u64, stream: u64) -> Self {
        Self {
            seed,
            stream,
            inner: Pcg32::new(seed, stream),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn stream(&self) -> u64 {
        self.stream
    }

    /// Switch to another stream of the same seed. Draws restart from the
    /// beginning of that stream's sequence; the current state is not carried
    /// over to the new increment.
    pub fn set_stream(&mut self, stream: u64) {
        self.stream = stream;
        self.inner = Pcg32::new(self.seed, stream);
    }

    pub fn next_uint(&mut self) -> u32 {
        self.inner.next_u32()
    }

    /// Uniform integer in `[min_inclusive, max_exclusive)`.
    ///
    /// Raw outputs below `2^32 mod range` are rejected so that the final
    /// modulo carries no bias, whatever the width of the range.
    pub fn next_in_range(
        &mut self,
        min_inclusive: i32,
        max_exclusive: i32,
    ) -> Result<i32, RangeError> {
        if max_exclusive <= min_inclusive {
            return Err(RangeError {
                min_inclusive,
                max_exclusive,
            });
        }

        let range = max_exclusive.wrapping_sub(min_inclusive) as u32;
        let threshold = range.wrapping_neg() % range;

        loop {
            let raw = self.next_uint();
            if raw >= threshold {
                return Ok((raw % range).wrapping_add(min_inclusive as u32) as i32);
            }
        }
    }

    /// Uniformly choose one element. An empty slice yields `None` and
    /// consumes no randomness.
    ///
    /// Indices are drawn with [`next_in_range`](Self::next_in_range), so at
    /// most `i32::MAX` candidates are supported. A longer slice is rejected
    /// without drawing, as a `RangeError` over `[0, i32::MAX)`.
    pub fn pick<'a, T>(&mut self, candidates: &'a [T]) -> Result<Option<&'a T>, RangeError> {
        if candidates.is_empty() {
            return Ok(None);
        }
        let len = i32::try_from(candidates.len()).map_err(|_| RangeError {
            min_inclusive: 0,
            max_exclusive: i32::MAX,
        })?;
        let index = self.next_in_range(0, len)?;
        Ok(candidates.get(index as usize))
    }
}
