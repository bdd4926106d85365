//! Bit-sets over mesh elements or facets
use crate::settings::Settings;

const WORD_BITS: usize = u64::BITS as usize;

/// Bit-set flagging membership of mesh entities (elements or facets)
///
/// The set has a fixed universe size ([`MarkerSet::len`]), chosen at
/// construction; [`MarkerSet::count`] returns the number of members.
#[derive(Clone, Debug, Hash, Eq, PartialEq)]
pub struct MarkerSet {
    len: usize,
    words: Vec<u64>,
}

impl MarkerSet {
    /// Builds an empty marker set over `len` entities
    pub fn new(len: usize) -> Self {
        Self {
            len,
            words: vec![0; len.div_ceil(WORD_BITS)],
        }
    }

    /// Builds a marker set containing every entity
    pub fn full(len: usize) -> Self {
        let mut out = Self::new(len);
        for w in &mut out.words {
            *w = u64::MAX;
        }
        out.clear_tail();
        out
    }

    /// Builds a marker set by evaluating a predicate on every entity
    ///
    /// Each worker fills whole 64-bit words, so writes never overlap.
    pub fn from_predicate<F>(
        len: usize,
        settings: &Settings,
        f: F,
    ) -> Self
    where
        F: Fn(usize) -> bool + Sync + Send,
    {
        let words = settings.map_indices(len.div_ceil(WORD_BITS), |w| {
            let start = w * WORD_BITS;
            let end = (start + WORD_BITS).min(len);
            (start..end)
                .filter(|i| f(*i))
                .fold(0u64, |acc, i| acc | (1 << (i - start)))
        });
        Self { len, words }
    }

    fn clear_tail(&mut self) {
        let extra = self.words.len() * WORD_BITS - self.len;
        if extra > 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= u64::MAX >> extra;
            }
        }
    }

    /// Returns the size of the universe (not the number of members)
    pub fn len(&self) -> usize {
        self.len
    }

    /// Checks whether the universe is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of members
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Checks whether no entity is marked
    pub fn none(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// Checks whether entity `i` is marked
    ///
    /// # Panics
    /// If `i` is out of range
    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.len, "index {i} out of range ({})", self.len);
        (self.words[i / WORD_BITS] >> (i % WORD_BITS)) & 1 == 1
    }

    /// Marks or unmarks entity `i`
    ///
    /// # Panics
    /// If `i` is out of range
    pub fn set(&mut self, i: usize, v: bool) {
        assert!(i < self.len, "index {i} out of range ({})", self.len);
        let bit = 1 << (i % WORD_BITS);
        if v {
            self.words[i / WORD_BITS] |= bit;
        } else {
            self.words[i / WORD_BITS] &= !bit;
        }
    }

    /// Iterates over the indices of marked entities, in increasing order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, &bits)| {
            let mut bits = bits;
            std::iter::from_fn(move || {
                if bits == 0 {
                    None
                } else {
                    let b = bits.trailing_zeros() as usize;
                    bits &= bits - 1;
                    Some(w * WORD_BITS + b)
                }
            })
        })
    }

    /// Checks whether every member of `self` is also a member of `other`
    pub fn is_subset(&self, other: &Self) -> bool {
        self.len == other.len
            && self.words.iter().zip(&other.words).all(|(a, b)| a & !b == 0)
    }

    fn zip_with<F: Fn(u64, u64) -> u64>(&self, other: &Self, f: F) -> Self {
        assert_eq!(self.len, other.len, "marker sets have different sizes");
        Self {
            len: self.len,
            words: self
                .words
                .iter()
                .zip(&other.words)
                .map(|(a, b)| f(*a, *b))
                .collect(),
        }
    }
}

impl std::ops::BitOr for &MarkerSet {
    type Output = MarkerSet;
    fn bitor(self, rhs: &MarkerSet) -> MarkerSet {
        self.zip_with(rhs, |a, b| a | b)
    }
}

impl std::ops::BitAnd for &MarkerSet {
    type Output = MarkerSet;
    fn bitand(self, rhs: &MarkerSet) -> MarkerSet {
        self.zip_with(rhs, |a, b| a & b)
    }
}

impl std::ops::Sub for &MarkerSet {
    type Output = MarkerSet;
    fn sub(self, rhs: &MarkerSet) -> MarkerSet {
        self.zip_with(rhs, |a, b| a & !b)
    }
}

impl std::ops::Not for &MarkerSet {
    type Output = MarkerSet;
    fn not(self) -> MarkerSet {
        let mut out = MarkerSet {
            len: self.len,
            words: self.words.iter().map(|w| !w).collect(),
        };
        out.clear_tail();
        out
    }
}

impl std::ops::BitOrAssign<&MarkerSet> for MarkerSet {
    fn bitor_assign(&mut self, rhs: &MarkerSet) {
        *self = &*self | rhs;
    }
}

impl std::fmt::Display for MarkerSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for i in 0..self.len {
            write!(f, "{}", if self.get(i) { '1' } else { '0' })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_and_get() {
        let mut m = MarkerSet::new(130);
        assert!(m.none());
        m.set(0, true);
        m.set(64, true);
        m.set(129, true);
        assert!(m.get(64) && m.get(129) && !m.get(1));
        assert_eq!(m.count(), 3);
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![0, 64, 129]);
        m.set(64, false);
        assert_eq!(m.count(), 2);
    }

    #[test]
    fn full_and_not() {
        let f = MarkerSet::full(70);
        assert_eq!(f.count(), 70);
        assert!((!&f).none());
        assert_eq!((!&MarkerSet::new(70)), f);
    }

    #[test]
    fn boolean_ops() {
        let mut a = MarkerSet::new(10);
        let mut b = MarkerSet::new(10);
        a.set(1, true);
        a.set(2, true);
        b.set(2, true);
        b.set(3, true);
        assert_eq!((&a | &b).iter().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!((&a & &b).iter().collect::<Vec<_>>(), vec![2]);
        assert_eq!((&a - &b).iter().collect::<Vec<_>>(), vec![1]);
        assert!((&a & &b).is_subset(&a));
        assert!(!a.is_subset(&b));
        assert_eq!(a.to_string(), "0110000000");
    }

    #[test]
    fn from_predicate() {
        for threads in [0, 3] {
            let settings = Settings::with_threads(threads).unwrap();
            let m = MarkerSet::from_predicate(200, &settings, |i| i % 7 == 0);
            assert_eq!(m.count(), 29);
            assert!(m.iter().all(|i| i % 7 == 0));
        }
    }
}
