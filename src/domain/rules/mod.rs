// Domain rules - Timestamp rescaling and dimension readiness

use crate::domain::model::*;

/// Rounding applied by [`Rescaler::rescale_rnd`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rounding {
    /// Toward zero
    Zero,
    /// Away from zero
    Inf,
    /// Toward negative infinity
    Down,
    /// Toward positive infinity
    Up,
    /// To nearest, halfway cases away from zero
    NearInf,
}

/// Fixed-point timestamp conversion between time bases
pub struct Rescaler;

impl Rescaler {
    /// Compute `a * b / c` with the given rounding, saturating at `±i64::MAX`.
    ///
    /// `i64::MIN` is reserved as the "no timestamp" marker and is never produced.
    pub fn rescale_rnd(a: i64, b: i64, c: i64, rounding: Rounding) -> i64 {
        if c == 0 {
            return a;
        }
        let (b, c) = if c < 0 { (-(b as i128), -(c as i128)) } else { (b as i128, c as i128) };

        let product = a as i128 * b;
        let negative = product < 0;
        let magnitude = product.unsigned_abs();
        let divisor = c as u128;

        let quotient = magnitude / divisor;
        let remainder = magnitude % divisor;
        let round_up_magnitude = match rounding {
            Rounding::Zero => false,
            Rounding::Inf => remainder != 0,
            Rounding::Down => negative && remainder != 0,
            Rounding::Up => !negative && remainder != 0,
            Rounding::NearInf => remainder * 2 >= divisor,
        };
        let magnitude = quotient + u128::from(round_up_magnitude);

        let limit = i64::MAX as u128;
        let clamped = magnitude.min(limit) as i64;
        if negative {
            -clamped
        } else {
            clamped
        }
    }

    /// Convert `ticks` from `from` to `to` rounding to nearest.
    ///
    /// Absent timestamps stay absent and the `i64::MIN`/`i64::MAX` sentinels pass
    /// through unchanged; everything else saturates instead of wrapping.
    pub fn rescale_timestamp(ticks: Option<i64>, from: Timebase, to: Timebase) -> Option<i64> {
        let ticks = ticks?;
        if ticks == i64::MIN || ticks == i64::MAX {
            return Some(ticks);
        }
        Some(Self::rescale_q(ticks, from, to, Rounding::NearInf))
    }

    /// Proportional duration conversion
    pub fn rescale_duration(duration: i64, from: Timebase, to: Timebase) -> i64 {
        Self::rescale_q(duration, from, to, Rounding::NearInf)
    }

    fn rescale_q(ticks: i64, from: Timebase, to: Timebase, rounding: Rounding) -> i64 {
        if from == to {
            return ticks;
        }
        let b = from.num as i64 * to.den as i64;
        let c = to.num as i64 * from.den as i64;
        Self::rescale_rnd(ticks, b, c, rounding)
    }
}

/// Readiness of source metadata before the destination header is written
pub struct DimensionRules;

impl DimensionRules {
    /// Every video stream has non-zero width and height
    pub fn all_video_sized(streams: &[SourceStream]) -> bool {
        streams.iter().all(SourceStream::has_dimensions)
    }

    /// Indices of video streams still missing dimensions
    pub fn unsized_video(streams: &[SourceStream]) -> Vec<usize> {
        streams
            .iter()
            .filter(|stream| !stream.has_dimensions())
            .map(|stream| stream.index)
            .collect()
    }
}
