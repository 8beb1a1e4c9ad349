use crate::models::MatchMapping;
use std::collections::{HashMap, HashSet};
use tracing::debug;

pub const DEFAULT_THRESHOLD: f64 = 0.3;

/// Targets at least this long get their very frequent characters treated as
/// junk when seeding blocks.
const AUTOJUNK_MIN_LEN: usize = 200;

/// Brute-force best-match search between two key sequences.
///
/// Every source key is scored against every target key; the first strictly
/// greatest score wins, and only scores strictly above the threshold are
/// recorded.
pub struct SimilarityMatcher {
    threshold: f64,
}

impl SimilarityMatcher {
    pub fn new(threshold: f64) -> Self {
        SimilarityMatcher { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn match_items(&self, source: &[String], target: &[String]) -> MatchMapping {
        let indexed: Vec<TargetIndex> = target.iter().map(|t| TargetIndex::new(t)).collect();
        let mut mapping = MatchMapping::new();

        for (i, key) in source.iter().enumerate() {
            if let Some((j, score)) = self.best_in(key, &indexed) {
                debug!("Matched source row {} -> target row {} (score {:.3})", i, j, score);
                mapping.insert(i, j);
            }
        }

        mapping
    }

    /// Best target for a single key, if any scores above the threshold.
    pub fn best_match(&self, key: &str, target: &[String]) -> Option<(usize, f64)> {
        let indexed: Vec<TargetIndex> = target.iter().map(|t| TargetIndex::new(t)).collect();
        self.best_in(key, &indexed)
    }

    fn best_in(&self, key: &str, targets: &[TargetIndex]) -> Option<(usize, f64)> {
        let a: Vec<char> = key.chars().collect();
        let mut best: Option<(usize, f64)> = None;
        let mut best_score = 0.0;

        for (j, target) in targets.iter().enumerate() {
            let score = target.ratio(&a);
            if score > self.threshold && score > best_score {
                best_score = score;
                best = Some((j, score));
            }
        }

        best
    }
}

impl Default for SimilarityMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}

/// Similarity of two strings in `[0, 1]`: twice the matched characters over
/// the combined length. Two empty strings score 1.0.
pub fn similarity_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    TargetIndex::new(b).ratio(&a)
}

/// Target-side character positions, computed once and reused for every source.
struct TargetIndex {
    chars: Vec<char>,
    positions: HashMap<char, Vec<usize>>,
}

impl TargetIndex {
    fn new(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let mut positions: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, c) in chars.iter().enumerate() {
            positions.entry(*c).or_default().push(j);
        }

        if chars.len() >= AUTOJUNK_MIN_LEN {
            let limit = chars.len() / 100 + 1;
            let popular: HashSet<char> = positions
                .iter()
                .filter(|(_, idxs)| idxs.len() > limit)
                .map(|(c, _)| *c)
                .collect();
            positions.retain(|c, _| !popular.contains(c));
        }

        TargetIndex { chars, positions }
    }

    fn ratio(&self, a: &[char]) -> f64 {
        let total = a.len() + self.chars.len();
        if total == 0 {
            return 1.0;
        }
        2.0 * self.matched_len(a) as f64 / total as f64
    }

    /// Sum of the sizes of all matching blocks, found by recursively taking the
    /// longest block and searching either side of it.
    fn matched_len(&self, a: &[char]) -> usize {
        let mut matched = 0;
        let mut pending = vec![(0, a.len(), 0, self.chars.len())];

        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let (i, j, k) = self.longest_block(a, alo, ahi, blo, bhi);
            if k == 0 {
                continue;
            }
            matched += k;
            if alo < i && blo < j {
                pending.push((alo, i, blo, j));
            }
            if i + k < ahi && j + k < bhi {
                pending.push((i + k, ahi, j + k, bhi));
            }
        }

        matched
    }

    /// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`. Ties go to the
    /// block starting earliest in `a`, then earliest in `b`.
    fn longest_block(
        &self,
        a: &[char],
        alo: usize,
        ahi: usize,
        blo: usize,
        bhi: usize,
    ) -> (usize, usize, usize) {
        let b = &self.chars;
        let (mut best_i, mut best_j, mut best_k) = (alo, blo, 0);
        let mut run_lengths: HashMap<usize, usize> = HashMap::new();

        for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(js) = self.positions.get(c) {
                for &j in js {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let prev = if j > 0 {
                        run_lengths.get(&(j - 1)).copied().unwrap_or(0)
                    } else {
                        0
                    };
                    let k = prev + 1;
                    next.insert(j, k);
                    if k > best_k {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_k = k;
                    }
                }
            }
            run_lengths = next;
        }

        // Grow across characters dropped from the index as too frequent.
        while best_i > alo && best_j > blo && a[best_i - 1] == b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_k += 1;
        }
        while best_i + best_k < ahi && best_j + best_k < bhi && a[best_i + best_k] == b[best_j + best_k]
        {
            best_k += 1;
        }

        (best_i, best_j, best_k)
    }
}
