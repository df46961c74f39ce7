//! Index arithmetic over 32-bit element counts.
//!
//! A vector of `n` elements is committed to as if it were the left-most part
//! of an infinite balanced tree. All positional reasoning — proof depths,
//! frontier sizes, the combined-proof precondition — reduces to bit fiddling
//! on `n`.

/// The smallest power of two that is greater than or equal to `value`.
/// Maps both 0 and 1 to 1.
#[inline]
pub fn round_up_to_power_of_two(value: u32) -> u32 {
    value.max(1).next_power_of_two()
}

/// The least significant set bit of `value`, or 0 if `value` is 0.
#[inline]
pub fn lowest_set_bit(value: u32) -> u32 {
    value & value.wrapping_neg()
}

/// The smallest element index whose inclusion in a multi proof guarantees
/// that the replay touches the root of every perfect subtree on the append
/// frontier.
///
/// Any index at or above this one lies inside the deepest frontier subtree,
/// so the replay of its path visits the right edge of every level. A multi
/// proof that is meant to double as an append proof must cover at least one
/// index `>= minimum_combined_index(n)`.
#[inline]
pub fn minimum_combined_index(element_count: u32) -> u32 {
    element_count - lowest_set_bit(element_count)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_up_to_power_of_two_small_values() {
        assert_eq!(1, round_up_to_power_of_two(0));
        assert_eq!(1, round_up_to_power_of_two(1));
        assert_eq!(2, round_up_to_power_of_two(2));
        assert_eq!(4, round_up_to_power_of_two(3));
        assert_eq!(4, round_up_to_power_of_two(4));
        assert_eq!(8, round_up_to_power_of_two(5));
        assert_eq!(16, round_up_to_power_of_two(9));
        assert_eq!(128, round_up_to_power_of_two(100));
        assert_eq!(1 << 31, round_up_to_power_of_two((1 << 31) - 1));
        assert_eq!(1 << 31, round_up_to_power_of_two(1 << 31));
    }

    #[test]
    fn lowest_set_bit_test() {
        assert_eq!(0, lowest_set_bit(0));
        assert_eq!(1, lowest_set_bit(1));
        assert_eq!(2, lowest_set_bit(2));
        assert_eq!(1, lowest_set_bit(3));
        assert_eq!(4, lowest_set_bit(4));
        assert_eq!(4, lowest_set_bit(12));
        assert_eq!(16, lowest_set_bit(48));
        assert_eq!(1 << 31, lowest_set_bit(1 << 31));
    }

    #[test]
    fn minimum_combined_index_test() {
        assert_eq!(0, minimum_combined_index(0));
        assert_eq!(0, minimum_combined_index(1));
        assert_eq!(0, minimum_combined_index(2));
        assert_eq!(2, minimum_combined_index(3));
        assert_eq!(0, minimum_combined_index(4));
        assert_eq!(4, minimum_combined_index(5));
        assert_eq!(0, minimum_combined_index(8));
        assert_eq!(22, minimum_combined_index(23));
        assert_eq!(32, minimum_combined_index(48));
        assert_eq!(364, minimum_combined_index(365));
        assert_eq!(256, minimum_combined_index(384));
        assert_eq!(576, minimum_combined_index(580));
        assert_eq!(1536, minimum_combined_index(1792));
    }
}
