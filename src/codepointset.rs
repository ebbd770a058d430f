use crate::util::SliceHelp;
use core::cmp::{self, Ordering};

pub type CodePoint = u32;

/// The maximum (inclusive) code point.
pub const CODE_POINT_MAX: CodePoint = 0x10FFFF;

/// The maximum (inclusive) UTF-16 code unit.
pub const CODE_UNIT_MAX: CodePoint = 0xFFFF;

/// An inclusive range of code points.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Interval {
    pub first: CodePoint,
    pub last: CodePoint,
}

impl Interval {
    pub const fn new(first: CodePoint, last: CodePoint) -> Interval {
        Interval { first, last }
    }

    #[inline(always)]
    pub fn compare(self, cp: u32) -> Ordering {
        if self.first > cp {
            Ordering::Greater
        } else if self.last < cp {
            Ordering::Less
        } else {
            Ordering::Equal
        }
    }

    /// Return whether self is strictly before rhs: there is at least one value
    /// between them. Overlapping or abutting intervals are not.
    fn is_strictly_before(self, rhs: Interval) -> bool {
        self.last.saturating_add(1) < rhs.first
    }

    /// Overlapping or abutting intervals compare equal.
    fn mergecmp(self, rhs: Interval) -> Ordering {
        if self.is_strictly_before(rhs) {
            Ordering::Less
        } else if rhs.is_strictly_before(self) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }

    pub fn contains(self, cp: CodePoint) -> bool {
        self.first <= cp && cp <= self.last
    }

    /// Return the code points as a half-open range.
    pub fn codepoints(self) -> core::ops::Range<u32> {
        self.first..(self.last + 1)
    }
}

/// A set of code points stored as disjoint, non-abutting, sorted intervals.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CodePointSet {
    ivs: Vec<Interval>,
}

impl CodePointSet {
    pub fn new() -> CodePointSet {
        CodePointSet { ivs: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.ivs.is_empty()
    }

    pub fn contains(&self, cp: u32) -> bool {
        self.ivs.binary_search_by(|iv| iv.compare(cp)).is_ok()
    }

    /// \return whether any member is ASCII.
    pub fn has_ascii(&self) -> bool {
        self.ivs.first().map_or(false, |iv| iv.first < 0x80)
    }

    /// \return the largest member, if any.
    pub fn max_cp(&self) -> Option<CodePoint> {
        self.ivs.last().map(|iv| iv.last)
    }

    /// \return whether any member is a surrogate.
    pub fn has_surrogates(&self) -> bool {
        self.ivs
            .iter()
            .any(|iv| iv.first <= 0xDFFF && iv.last >= 0xD800)
    }

    fn assert_is_well_formed(&self) {
        if cfg!(debug_assertions) {
            for iv in &self.ivs {
                debug_assert!(iv.first <= iv.last && iv.last <= CODE_POINT_MAX);
            }
            for w in self.ivs.windows(2) {
                debug_assert!(w[0].is_strictly_before(w[1]));
            }
        }
    }

    /// Add an interval of code points to the set.
    pub fn add(&mut self, new_iv: Interval) {
        debug_assert!(new_iv.first <= new_iv.last);
        // The run of intervals which overlap or abut new_iv.
        let mergeable = self.ivs.equal_range_by(|iv| iv.mergecmp(new_iv));
        if mergeable.is_empty() {
            self.ivs.insert(mergeable.start, new_iv);
        } else {
            let first = cmp::min(self.ivs[mergeable.start].first, new_iv.first);
            let last = cmp::max(self.ivs[mergeable.end - 1].last, new_iv.last);
            self.ivs[mergeable.start] = Interval { first, last };
            self.ivs.drain(mergeable.start + 1..mergeable.end);
        }
        self.assert_is_well_formed();
    }

    #[inline]
    pub fn add_one(&mut self, cp: CodePoint) {
        self.add(Interval::new(cp, cp))
    }

    pub fn add_set(&mut self, rhs: &CodePointSet) {
        for iv in rhs.intervals() {
            self.add(*iv)
        }
    }

    pub fn intervals(&self) -> &[Interval] {
        self.ivs.as_slice()
    }

    /// \return the complement of the receiver within `0..=max`.
    /// Members above \p max are dropped.
    pub fn inverted_within(&self, max: CodePoint) -> CodePointSet {
        let mut ivs = Vec::new();
        // The first code point not covered by the previous interval.
        let mut start: CodePoint = 0;
        for iv in &self.ivs {
            if iv.first > max {
                break;
            }
            if start < iv.first {
                ivs.push(Interval::new(start, iv.first - 1));
            }
            start = iv.last.saturating_add(1);
        }
        if start <= max {
            ivs.push(Interval::new(start, max));
        }
        let res = CodePointSet { ivs };
        res.assert_is_well_formed();
        res
    }

    /// \return the members of the receiver no larger than \p max.
    pub fn clamped(&self, max: CodePoint) -> CodePointSet {
        let mut ivs = Vec::with_capacity(self.ivs.len());
        for iv in &self.ivs {
            if iv.first > max {
                break;
            }
            ivs.push(Interval::new(iv.first, cmp::min(iv.last, max)));
        }
        CodePointSet { ivs }
    }
}

impl From<&[Interval]> for CodePointSet {
    fn from(ivs: &[Interval]) -> Self {
        let mut set = CodePointSet::new();
        for iv in ivs {
            set.add(*iv);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iv(first: u32, last: u32) -> Interval {
        Interval { first, last }
    }

    #[test]
    fn test_mergecmp() {
        let a = iv(0, 9);
        assert_eq!(a.mergecmp(iv(10, 19)), Ordering::Equal);
        assert_eq!(a.mergecmp(iv(9, 18)), Ordering::Equal);
        assert_eq!(a.mergecmp(iv(11, 19)), Ordering::Less);
        assert_eq!(iv(11, 19).mergecmp(a), Ordering::Greater);
        assert_eq!(iv(0, CODE_POINT_MAX).mergecmp(a), Ordering::Equal);
    }

    #[test]
    fn test_add_merges() {
        let mut set = CodePointSet::new();
        set.add(iv(10, 20));
        set.add(iv(30, 40));
        set.add(iv(50, 60));
        assert_eq!(set.intervals(), &[iv(10, 20), iv(30, 40), iv(50, 60)]);

        // Abutting on both sides merges all three.
        set.add(iv(21, 49));
        assert_eq!(set.intervals(), &[iv(10, 60)]);

        set.add_one(5);
        set.add_one(61);
        assert_eq!(set.intervals(), &[iv(5, 5), iv(10, 61)]);
        assert!(set.contains(5));
        assert!(!set.contains(6));
        assert!(set.contains(61));
        assert!(!set.contains(62));
    }

    #[test]
    fn test_add_set() {
        let mut a = CodePointSet::from(&[iv(0, 3), iv(10, 12)][..]);
        let b = CodePointSet::from(&[iv(4, 9), iv(100, 100)][..]);
        a.add_set(&b);
        assert_eq!(a.intervals(), &[iv(0, 12), iv(100, 100)]);
    }

    #[test]
    fn test_inverted_within() {
        let set = CodePointSet::from(&[iv(0x30, 0x39), iv(0x41, 0x5A)][..]);
        let inv = set.inverted_within(CODE_UNIT_MAX);
        assert_eq!(
            inv.intervals(),
            &[iv(0, 0x2F), iv(0x3A, 0x40), iv(0x5B, 0xFFFF)]
        );
        assert_eq!(inv.inverted_within(CODE_UNIT_MAX), set);

        let empty = CodePointSet::new();
        assert_eq!(
            empty.inverted_within(CODE_POINT_MAX).intervals(),
            &[iv(0, CODE_POINT_MAX)]
        );
        let full = CodePointSet::from(&[iv(0, CODE_POINT_MAX)][..]);
        assert!(full.inverted_within(CODE_POINT_MAX).is_empty());

        // Members beyond the code space are dropped.
        let astral = CodePointSet::from(&[iv(0x61, 0x61), iv(0x1F600, 0x1F600)][..]);
        assert_eq!(
            astral.inverted_within(CODE_UNIT_MAX).intervals(),
            &[iv(0, 0x60), iv(0x62, 0xFFFF)]
        );
    }

    #[test]
    fn test_properties() {
        let set = CodePointSet::from(&[iv(0xE9, 0xE9), iv(0xD800, 0xD801)][..]);
        assert!(!set.has_ascii());
        assert!(set.has_surrogates());
        assert_eq!(set.max_cp(), Some(0xD801));
        assert_eq!(set.clamped(0xFF).intervals(), &[iv(0xE9, 0xE9)]);
        assert!(CodePointSet::from(&[iv(0x7F, 0x100)][..]).has_ascii());
    }
}
