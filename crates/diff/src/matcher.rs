use std::collections::HashMap;
use std::hash::Hash;

/// Sequences at least this long have their popular elements left out of the
/// match index
const AUTOJUNK_MIN_LEN: usize = 200;

/// A run of `size` equal elements starting at `a[a_start]` and `b[b_start]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Match {
    pub a_start: usize,
    pub b_start: usize,
    pub size: usize,
}

/// Longest-common-block matcher over two sequences
///
/// Repeatedly takes the longest contiguous matching block, then matches what
/// lies to its left and to its right the same way. Among blocks of equal
/// length the one starting earliest in `a`, then earliest in `b`, wins.
///
/// When `b` has [`AUTOJUNK_MIN_LEN`] elements or more, any element occurring
/// more than `1 + len(b) / 100` times in `b` is popular: it never starts a
/// block, but a block may still grow over it at either end.
pub struct SequenceMatcher<'a, T> {
    a: &'a [T],
    b: &'a [T],
    /// Positions in `b` of every element that is not popular
    b2j: HashMap<T, Vec<usize>>,
}

impl<'a, T: Eq + Hash + Copy> SequenceMatcher<'a, T> {
    pub fn new(a: &'a [T], b: &'a [T]) -> Self {
        let mut b2j: HashMap<T, Vec<usize>> = HashMap::new();
        for (j, &item) in b.iter().enumerate() {
            b2j.entry(item).or_default().push(j);
        }
        if b.len() >= AUTOJUNK_MIN_LEN {
            let limit = b.len() / 100 + 1;
            b2j.retain(|_, positions| positions.len() <= limit);
        }
        Self { a, b, b2j }
    }

    /// Longest matching block within `a[alo..ahi]` and `b[blo..bhi]`
    pub fn find_longest_match(&self, alo: usize, ahi: usize, blo: usize, bhi: usize) -> Match {
        let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);
        // Length of the match ending at a[i - 1], b[j], keyed by j
        let mut j2len: HashMap<usize, usize> = HashMap::new();
        for i in alo..ahi {
            let mut next: HashMap<usize, usize> = HashMap::new();
            if let Some(positions) = self.b2j.get(&self.a[i]) {
                for &j in positions {
                    if j < blo {
                        continue;
                    }
                    if j >= bhi {
                        break;
                    }
                    let k = j
                        .checked_sub(1)
                        .and_then(|prev| j2len.get(&prev))
                        .map_or(1, |len| len + 1);
                    next.insert(j, k);
                    if k > best_size {
                        best_i = i + 1 - k;
                        best_j = j + 1 - k;
                        best_size = k;
                    }
                }
            }
            j2len = next;
        }

        // Grow over popular elements, which the index does not hold
        while best_i > alo && best_j > blo && self.a[best_i - 1] == self.b[best_j - 1] {
            best_i -= 1;
            best_j -= 1;
            best_size += 1;
        }
        while best_i + best_size < ahi
            && best_j + best_size < bhi
            && self.a[best_i + best_size] == self.b[best_j + best_size]
        {
            best_size += 1;
        }

        Match {
            a_start: best_i,
            b_start: best_j,
            size: best_size,
        }
    }

    /// All matching blocks, in increasing order of position
    pub fn matching_blocks(&self) -> Vec<Match> {
        let mut pending = vec![(0, self.a.len(), 0, self.b.len())];
        let mut blocks = Vec::new();
        while let Some((alo, ahi, blo, bhi)) = pending.pop() {
            let found = self.find_longest_match(alo, ahi, blo, bhi);
            if found.size == 0 {
                continue;
            }
            blocks.push(found);
            if alo < found.a_start && blo < found.b_start {
                pending.push((alo, found.a_start, blo, found.b_start));
            }
            if found.a_start + found.size < ahi && found.b_start + found.size < bhi {
                pending.push((found.a_start + found.size, ahi, found.b_start + found.size, bhi));
            }
        }
        blocks.sort();
        blocks
    }

    /// `2 * M / T`, with `M` the matched elements and `T` both lengths summed
    ///
    /// Two empty sequences score `1.0`.
    pub fn ratio(&self) -> f64 {
        let total = self.a.len() + self.b.len();
        if total == 0 {
            return 1.0;
        }
        let matches: usize = self.matching_blocks().iter().map(|block| block.size).sum();
        2.0 * matches as f64 / total as f64
    }
}
