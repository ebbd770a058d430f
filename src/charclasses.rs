use crate::codepointset::{CodePoint, CodePointSet, Interval, CODE_POINT_MAX, CODE_UNIT_MAX};

// Character classes like \d or \S.

/// Construct an interval from an inclusive range of char.
const fn r(first: char, last: char) -> Interval {
    Interval {
        first: first as u32,
        last: last as u32,
    }
}

/// Construct an interval from a single char.
const fn r1(c: char) -> Interval {
    Interval {
        first: c as u32,
        last: c as u32,
    }
}

// Note all of these are sorted.

/// ES9 21.2.2.6.1.
pub const WORD_CHARS: [Interval; 4] = [r('0', '9'), r('A', 'Z'), r1('_'), r('a', 'z')];

/// Word characters additionally admitted under /iu: LATIN SMALL LETTER LONG S
/// and KELVIN SIGN, which fold into the ASCII word characters.
pub const UNICODE_ICASE_EXTRA_WORD_CHARS: [Interval; 2] = [r1('\u{017F}'), r1('\u{212A}')];

/// ES9 21.2.2.12
pub const DIGITS: [Interval; 1] = [r('0', '9')];

/// WhiteSpace plus LineTerminator, ES13 12.2 and 12.3.
pub const WHITESPACE: [Interval; 10] = [
    // TAB, LF, VT, FF, CR
    r('\u{0009}', '\u{000D}'),
    r1('\u{0020}'),
    r1('\u{00A0}'),
    r1('\u{1680}'),
    r('\u{2000}', '\u{200A}'),
    // LS, PS
    r('\u{2028}', '\u{2029}'),
    r1('\u{202F}'),
    r1('\u{205F}'),
    r1('\u{3000}'),
    r1('\u{FEFF}'),
];

/// ES9 11.3
pub const LINE_TERMINATOR: [Interval; 3] = [r1('\n'), r1('\r'), r('\u{2028}', '\u{2029}')];

/// The class escapes `\d \D \s \S \w \W`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClassEscape {
    Digits,
    NotDigits,
    Spaces,
    NotSpaces,
    Words,
    NotWords,
}

impl ClassEscape {
    pub fn from_letter(c: char) -> Option<ClassEscape> {
        match c {
            'd' => Some(ClassEscape::Digits),
            'D' => Some(ClassEscape::NotDigits),
            's' => Some(ClassEscape::Spaces),
            'S' => Some(ClassEscape::NotSpaces),
            'w' => Some(ClassEscape::Words),
            'W' => Some(ClassEscape::NotWords),
            _ => None,
        }
    }

    /// \return the set of code points this escape matches. Negated escapes
    /// are complemented against the code space of the mode.
    pub fn code_points(self, unicode: bool, icase: bool) -> CodePointSet {
        let words = || {
            let mut set = CodePointSet::from(&WORD_CHARS[..]);
            if unicode && icase {
                set.add_set(&CodePointSet::from(&UNICODE_ICASE_EXTRA_WORD_CHARS[..]));
            }
            set
        };
        let max = code_space_max(unicode);
        match self {
            ClassEscape::Digits => CodePointSet::from(&DIGITS[..]),
            ClassEscape::NotDigits => CodePointSet::from(&DIGITS[..]).inverted_within(max),
            ClassEscape::Spaces => CodePointSet::from(&WHITESPACE[..]),
            ClassEscape::NotSpaces => CodePointSet::from(&WHITESPACE[..]).inverted_within(max),
            ClassEscape::Words => words(),
            ClassEscape::NotWords => words().inverted_within(max),
        }
    }
}

/// \return the largest element of the code space: a code point in unicode
/// mode, a UTF-16 code unit otherwise.
pub fn code_space_max(unicode: bool) -> CodePoint {
    if unicode {
        CODE_POINT_MAX
    } else {
        CODE_UNIT_MAX
    }
}

/// ES9 21.2.2.6.2 IsWordChar, with the /iu extension.
#[inline]
pub fn is_word_char(c: u32, unicode_icase: bool) -> bool {
    match c {
        0x30..=0x39 | 0x41..=0x5A | 0x5F | 0x61..=0x7A => true,
        0x017F | 0x212A => unicode_icase,
        _ => false,
    }
}

/// ES9 11.3
#[inline]
pub fn is_line_terminator(c: u32) -> bool {
    LINE_TERMINATOR.iter().any(|iv| iv.contains(c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negated_escapes_respect_code_space() {
        let not_digits = ClassEscape::NotDigits.code_points(false, false);
        assert_eq!(not_digits.max_cp(), Some(0xFFFF));
        assert!(!not_digits.contains('5' as u32));
        let not_digits = ClassEscape::NotDigits.code_points(true, false);
        assert_eq!(not_digits.max_cp(), Some(CODE_POINT_MAX));
    }

    #[test]
    fn word_chars() {
        assert!(is_word_char('_' as u32, false));
        assert!(!is_word_char('-' as u32, false));
        assert!(!is_word_char(0x212A, false));
        assert!(is_word_char(0x212A, true));
        assert!(ClassEscape::Words.code_points(true, true).contains(0x017F));
        assert!(!ClassEscape::Words.code_points(false, true).contains(0x017F));
        assert!(!is_line_terminator(0x2027));
        assert!(!is_line_terminator(0x0B));
        for iv in LINE_TERMINATOR.iter() {
            for c in iv.codepoints() {
                assert!(is_line_terminator(c));
                assert!(ClassEscape::Spaces.code_points(false, false).contains(c));
            }
        }
    }
}
