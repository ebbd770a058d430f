//! Case canonicalization for case-insensitive matching.
//!
//! Two canonicalizations exist, following ES Canonicalize: without the
//! unicode flag, characters are uppercased (but never from non-ASCII into
//! ASCII); with it, characters are simple case folded. Simple folding is
//! derived from the standard library's case mappings.

use crate::codepointset::CodePointSet;
use lazy_static::lazy_static;

/// Above this code point no character has a case mapping.
const LAST_CASED_CODE_POINT: u32 = 0x1E943;

#[inline]
fn single_char<I: Iterator<Item = char>>(mut iter: I) -> Option<char> {
    let c = iter.next()?;
    match iter.next() {
        None => Some(c),
        Some(_) => None,
    }
}

fn canonicalize_ucs2(c: u32) -> u32 {
    if c < 0x80 {
        return (c as u8).to_ascii_uppercase() as u32;
    }
    let ch = match char::from_u32(c) {
        Some(ch) => ch,
        None => return c,
    };
    match single_char(ch.to_uppercase()) {
        // Non-ASCII never canonicalizes into ASCII, and code units stay code units.
        Some(upper) if (upper as u32) >= 0x80 && (upper as u32) <= 0xFFFF => upper as u32,
        _ => c,
    }
}

fn canonicalize_unicode(c: u32) -> u32 {
    if c < 0x80 {
        return (c as u8).to_ascii_lowercase() as u32;
    }
    let ch = match char::from_u32(c) {
        Some(ch) => ch,
        None => return c,
    };
    let folded = single_char(ch.to_uppercase())
        .and_then(|u| single_char(u.to_lowercase()))
        // Only LONG S and KELVIN SIGN fold from outside ASCII into it.
        .filter(|&f| (f as u32) >= 0x80 || c == 0x017F || c == 0x212A);
    match folded.or_else(|| single_char(ch.to_lowercase())) {
        Some(f) => f as u32,
        None => c,
    }
}

/// \return the canonical case form of \p c.
#[inline]
pub fn canonicalize(c: u32, unicode: bool) -> u32 {
    if unicode {
        canonicalize_unicode(c)
    } else {
        canonicalize_ucs2(c)
    }
}

/// The non-singleton case equivalence classes under one canonicalization.
struct FoldTable {
    // Each class is sorted.
    classes: Vec<Box<[u32]>>,
    // (member, class index), sorted by member.
    index: Vec<(u32, u32)>,
}

impl FoldTable {
    fn build(unicode: bool) -> FoldTable {
        let mut pairs: Vec<(u32, u32)> = Vec::new();
        for cp in 0..=LAST_CASED_CODE_POINT {
            let canon = canonicalize(cp, unicode);
            if canon != cp {
                pairs.push((canon, cp));
            }
        }
        let mut canons: Vec<u32> = pairs.iter().map(|&(k, _)| k).collect();
        canons.sort_unstable();
        canons.dedup();
        for k in canons {
            if canonicalize(k, unicode) == k {
                pairs.push((k, k));
            }
        }
        pairs.sort_unstable();
        pairs.dedup();

        let mut classes: Vec<Box<[u32]>> = Vec::new();
        let mut index = Vec::new();
        let mut start = 0;
        while start < pairs.len() {
            let canon = pairs[start].0;
            let end = start + pairs[start..].iter().take_while(|p| p.0 == canon).count();
            let run = &pairs[start..end];
            if run.len() > 1 {
                let class_idx = classes.len() as u32;
                for &(_, member) in run {
                    index.push((member, class_idx));
                }
                classes.push(run.iter().map(|&(_, m)| m).collect());
            }
            start = end;
        }
        index.sort_unstable();
        log::debug!(
            "Built {} case fold table: {} classes",
            if unicode { "unicode" } else { "ucs2" },
            classes.len()
        );
        FoldTable { classes, index }
    }

    fn class_of(&self, c: u32) -> Option<&[u32]> {
        let idx = self.index.binary_search_by_key(&c, |&(m, _)| m).ok()?;
        Some(&self.classes[self.index[idx].1 as usize])
    }
}

lazy_static! {
    static ref UCS2_FOLDS: FoldTable = FoldTable::build(false);
    static ref UNICODE_FOLDS: FoldTable = FoldTable::build(true);
}

fn table(unicode: bool) -> &'static FoldTable {
    if unicode {
        &UNICODE_FOLDS
    } else {
        &UCS2_FOLDS
    }
}

/// \return whether some other character is case-equivalent to \p c.
pub fn has_case_variants(c: u32, unicode: bool) -> bool {
    table(unicode).class_of(c).is_some()
}

/// \return \p set extended with every case equivalent of its members.
pub fn close_over_case(set: &CodePointSet, unicode: bool) -> CodePointSet {
    let mut result = set.clone();
    for class in table(unicode).classes.iter() {
        if class.iter().any(|&m| set.contains(m)) {
            for &m in class.iter() {
                result.add_one(m);
            }
        }
    }
    result
}
