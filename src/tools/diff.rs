//! Positional line comparison
//!
//! Lines are compared by index, not aligned. An insertion near the top of a
//! file marks every following line as modified; the review dialog relies on
//! exactly this numbering.

/// 1-based line numbers where `old` and `new` differ.
///
/// The shorter side is padded with empty lines.
pub fn modified_lines(old: &str, new: &str) -> Vec<usize> {
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();
    let max = old_lines.len().max(new_lines.len());

    (0..max)
        .filter(|&i| {
            let a = old_lines.get(i).copied().unwrap_or("");
            let b = new_lines.get(i).copied().unwrap_or("");
            a != b
        })
        .map(|i| i + 1)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_text_has_no_changes() {
        for text in ["", "one", "a\nb\nc", "trailing\n"] {
            assert!(modified_lines(text, text).is_empty());
        }
    }

    #[test]
    fn test_single_line_edit() {
        assert_eq!(modified_lines("a\nb\nc", "a\nB\nc"), vec![2]);
    }

    #[test]
    fn test_new_file_content() {
        assert_eq!(modified_lines("", "hi"), vec![1]);
        assert_eq!(modified_lines("", "a\nb"), vec![1, 2]);
    }

    #[test]
    fn test_insertion_shifts_following_lines() {
        assert_eq!(modified_lines("a\nb\nc", "a\nx\nb\nc"), vec![2, 3, 4]);
    }

    #[test]
    fn test_padding_treats_missing_lines_as_empty() {
        // A trailing blank line on one side compares equal to padding.
        assert!(modified_lines("a", "a\n").is_empty());
        assert_eq!(modified_lines("a\nb", "a"), vec![2]);
    }

    #[test]
    fn test_symmetry() {
        let a = "one\ntwo\nthree";
        let b = "one\n2\nthree\nfour";
        assert_eq!(modified_lines(a, b), modified_lines(b, a));
    }
}
