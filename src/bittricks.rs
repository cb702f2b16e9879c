// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
/*!
alignment arithmetic.

GPUs want uniform data at offsets that are a multiple of some hardware constant.
*/

/**
Rounds `size` up to the next multiple of `alignment`.

An alignment of 0 or 1 leaves the size unchanged.
*/
pub fn align_up(size: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return size;
    }
    size.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod tests {
    use super::align_up;

    #[test]
    fn rounds_to_alignment() {
        assert_eq!(align_up(64, 256), 256);
        assert_eq!(align_up(256, 256), 256);
        assert_eq!(align_up(257, 256), 512);
        assert_eq!(align_up(0, 256), 0);
        //not a power of two
        assert_eq!(align_up(10, 12), 12);
    }

    #[test]
    fn degenerate_alignment() {
        assert_eq!(align_up(13, 0), 13);
        assert_eq!(align_up(13, 1), 13);
    }
}
