pub mod driver;
pub mod order;
pub mod quote;

use serde::Serializer;

/// Currency values stay unrounded internally; rounding happens once, here,
/// when a value crosses the API boundary.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn ser_round2<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(round2(*value))
}

#[cfg(test)]
mod tests {
    use super::round2;

    #[test]
    fn rounds_half_up_at_two_decimals() {
        assert_eq!(round2(20.3125), 20.31);
        assert_eq!(round2(7.125), 7.13);
        assert_eq!(round2(5.0), 5.0);
    }
}
