/// Splits `items` into consecutive blocks of at most `block_size`, keeping
/// order. The last block holds the remainder.
pub fn split_blocks<T>(items: &[T], block_size: usize) -> Vec<&[T]> {
    items.chunks(block_size.max(1)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remainder_goes_to_last_block() {
        let items: Vec<u32> = (1..=205).collect();
        let blocks = split_blocks(&items, 200);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].len(), 200);
        assert_eq!(blocks[1], &[201, 202, 203, 204, 205]);
        assert_eq!(blocks.concat(), items);
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let items: Vec<u32> = (1..=9).collect();
        let blocks = split_blocks(&items, 3);
        assert_eq!(blocks.len(), 3);
        assert!(blocks.iter().all(|block| block.len() == 3));
    }

    #[test]
    fn block_count_is_ceiling() {
        for len in 0..40usize {
            for size in 1..9usize {
                let items: Vec<usize> = (0..len).collect();
                let blocks = split_blocks(&items, size);
                assert_eq!(blocks.len(), len.div_ceil(size));
                assert_eq!(blocks.concat(), items);
            }
        }
    }

    #[test]
    fn empty_input() {
        let items: Vec<u32> = Vec::new();
        assert!(split_blocks(&items, 200).is_empty());
    }
}
