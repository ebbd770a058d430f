use core::cmp::Ordering;

// Reached only if the compiler emitted something the matcher cannot execute.
macro_rules! rs_unreachable {
    () => {
        unreachable!("Malformed regex bytecode")
    };
    ($msg:expr) => {
        unreachable!("Malformed regex bytecode: {}", $msg)
    };
}

// Helper function for matching u32s against chars.
// Convert a u32 to a char, except if the conversion fails, return the largest char.
// Be careful to not use the result of this conversion except to pattern match against literals.
pub fn to_char_sat(c: u32) -> char {
    char::from_u32(c).unwrap_or(core::char::MAX)
}

/// \return whether \p u is a UTF-16 lead (high) surrogate.
#[inline(always)]
pub fn is_lead_surrogate(u: u32) -> bool {
    (0xD800..=0xDBFF).contains(&u)
}

/// \return whether \p u is a UTF-16 trail (low) surrogate.
#[inline(always)]
pub fn is_trail_surrogate(u: u32) -> bool {
    (0xDC00..=0xDFFF).contains(&u)
}

/// \return whether \p cp is in the surrogate range.
#[inline(always)]
pub fn is_surrogate(cp: u32) -> bool {
    (0xD800..=0xDFFF).contains(&cp)
}

/// Combine a lead and trail surrogate into a code point.
#[inline(always)]
pub fn combine_surrogates(lead: u32, trail: u32) -> u32 {
    debug_assert!(is_lead_surrogate(lead) && is_trail_surrogate(trail));
    0x10000 + ((lead - 0xD800) << 10) + (trail - 0xDC00)
}

/// Encode \p text as UTF-16, also returning for each unit offset (plus the
/// end) the UTF-8 byte offset of the character containing it.
pub fn utf16_with_byte_offsets(text: &str) -> (Vec<u16>, Vec<usize>) {
    let mut units = Vec::with_capacity(text.len());
    let mut offsets = Vec::with_capacity(text.len() + 1);
    let mut buf = [0u16; 2];
    for (byte_idx, c) in text.char_indices() {
        for &u in c.encode_utf16(&mut buf).iter() {
            units.push(u);
            offsets.push(byte_idx);
        }
    }
    offsets.push(text.len());
    (units, offsets)
}

pub trait SliceHelp {
    type Item;

    /// Given that self is sorted according to f, returns the range of indexes
    /// where f indicates equal elements.
    fn equal_range_by<F>(&self, f: F) -> core::ops::Range<usize>
    where
        F: FnMut(&Self::Item) -> Ordering;
}

impl<T> SliceHelp for [T] {
    type Item = T;
    fn equal_range_by<F>(&self, mut f: F) -> core::ops::Range<usize>
    where
        F: FnMut(&Self::Item) -> Ordering,
    {
        let left = self.partition_point(|v| f(v) == Ordering::Less);
        let right = left + self[left..].partition_point(|v| f(v) != Ordering::Greater);
        left..right
    }
}
