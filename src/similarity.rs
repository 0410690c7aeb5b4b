//! String similarity scores (0-100)
//!
//! All scores are based on the Indel alignment ratio: twice the length of the
//! longest common subsequence over the combined length, counted in chars.
//! Inputs are expected to be normalized already.

/// Exact-order similarity of two strings.
///
/// Symmetric. Returns 0 when either side is empty.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

/// Similarity after sorting each side's whitespace-separated tokens.
///
/// Neutralizes word-order differences ("moms workin" vs "workin moms").
pub fn token_sort_ratio(a: &str, b: &str) -> u8 {
    ratio(&sort_tokens(a), &sort_tokens(b))
}

/// Best ratio of the shorter string against windows of the longer one.
///
/// Windows are every same-length slice plus the shorter prefixes and
/// suffixes, so an alignment at either edge of the longer string still
/// scores fully. Equal-length inputs are tried in both directions.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.len() == b.len() {
        return best_window(&a, &b).max(best_window(&b, &a));
    }
    if a.len() < b.len() {
        best_window(&a, &b)
    } else {
        best_window(&b, &a)
    }
}

fn best_window(short: &[char], long: &[char]) -> u8 {
    if short.is_empty() || long.len() < short.len() {
        return 0;
    }
    let n = short.len();
    let prefixes = (1..n).map(|k| &long[..k]);
    let suffixes = (1..n).map(|k| &long[long.len() - k..]);

    prefixes
        .chain(long.windows(n))
        .chain(suffixes)
        .map(|window| ratio_chars(short, window))
        .max()
        .unwrap_or(0)
}

fn sort_tokens(s: &str) -> String {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

fn ratio_chars(a: &[char], b: &[char]) -> u8 {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let matched = 2 * lcs_len(a, b);
    percent(matched, a.len() + b.len())
}

/// Length of the longest common subsequence (two-row DP).
fn lcs_len(a: &[char], b: &[char]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];

    for ca in a {
        for (j, cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// `100 * num / den` rounded half to even, as integer.
fn percent(num: usize, den: usize) -> u8 {
    let scaled = num * 100;
    let mut q = scaled / den;
    let r = scaled % den;
    if 2 * r > den || (2 * r == den && q % 2 == 1) {
        q += 1;
    }
    q.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_identical() {
        assert_eq!(ratio("breaking bad", "breaking bad"), 100);
    }

    #[test]
    fn test_ratio_empty() {
        assert_eq!(ratio("", ""), 0);
        assert_eq!(ratio("abc", ""), 0);
        assert_eq!(ratio("", "abc"), 0);
    }

    #[test]
    fn test_ratio_known_values() {
        // lcs("kin", "workin moms") = 3 -> 6/14
        assert_eq!(ratio("kin", "workin moms"), 43);
        // lcs = 11 -> 22/31
        assert_eq!(ratio("castlevania", "castlevania nocturne"), 71);
        // lcs("kin", "wire") = 1 -> 2/7
        assert_eq!(ratio("kin", "wire"), 29);
    }

    #[test]
    fn test_ratio_symmetric() {
        assert_eq!(ratio("star trek", "star trek picard"), ratio("star trek picard", "star trek"));
    }

    #[test]
    fn test_ratio_counts_chars_not_bytes() {
        assert_eq!(ratio("pokémon", "pokemon"), 86);
    }

    #[test]
    fn test_token_sort_ratio() {
        assert_eq!(token_sort_ratio("moms workin", "workin moms"), 100);
        assert_eq!(ratio("moms workin", "workin moms"), 55);
    }

    #[test]
    fn test_partial_ratio() {
        assert_eq!(partial_ratio("castlevania", "castlevania nocturne"), 100);
        assert_eq!(partial_ratio("castlevania nocturne", "castlevania"), 100);
        assert_eq!(partial_ratio("", "anything"), 0);
        assert_eq!(partial_ratio("abc", "abc"), 100);
    }

    #[test]
    fn test_partial_ratio_edge_windows() {
        // Suffix "abc" of the longer side: 6/7
        assert_eq!(partial_ratio("abcx", "zzzzabc"), 86);
        // Prefix "abc": 6/7
        assert_eq!(partial_ratio("xabc", "abczzzz"), 86);
        // Same-length windows alone peak at "zabc"
        assert_eq!(ratio("abcx", "zabc"), 75);
    }

    #[test]
    fn test_partial_ratio_equal_lengths_both_directions() {
        assert_eq!(partial_ratio("abcd", "bcde"), partial_ratio("bcde", "abcd"));
        // Suffix "bcd" of either side against the other: 6/7
        assert_eq!(partial_ratio("abcd", "bcde"), 86);
    }

    #[test]
    fn test_percent_rounds_half_to_even() {
        assert_eq!(percent(1, 8), 12); // 12.5
        assert_eq!(percent(3, 8), 38); // 37.5
        assert_eq!(percent(2, 3), 67);
        assert_eq!(percent(5, 5), 100);
    }
}
