//! Pure indicator math over close-price series and single candles.
//!
//! Every function reports insufficient or unusable input as `None` (or
//! `Error::MalformedData` for impossible prices) instead of NaN.

pub mod amplitude;
pub mod crossover;
pub mod ema;
pub mod sma;

pub use amplitude::amplitude_ratio;
pub use crossover::{ema_crossover, sma_vs_reference, Cross};
pub use ema::ema;
pub use sma::sma;

/// Value `offset` bars from the end of `series` (1 = newest).
pub fn at_offset<T: Copy>(series: &[T], offset: usize) -> Option<T> {
    if offset == 0 || offset > series.len() {
        return None;
    }
    Some(series[series.len() - offset])
}

#[cfg(test)]
mod tests {
    use super::at_offset;

    #[test]
    fn offset_counts_from_the_end() {
        let s = [1, 2, 3];
        assert_eq!(at_offset(&s, 1), Some(3));
        assert_eq!(at_offset(&s, 3), Some(1));
        assert_eq!(at_offset(&s, 4), None);
        assert_eq!(at_offset(&s, 0), None);
    }
}
