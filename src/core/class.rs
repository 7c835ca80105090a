//! Character classes and the fixed set of character predicates
//!
//! Code points are `u32`: in UTF-8 mode they are Unicode scalar values, in
//! byte mode they are the byte values 0..=255.

/// Backslash classes: `\d \w \s \h \v`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PerlClass {
    Digit,
    Word,
    Space,
    HSpace,
    VSpace,
}

/// `[:name:]` classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PosixClass {
    Alnum,
    Alpha,
    Ascii,
    Blank,
    Cntrl,
    Digit,
    Graph,
    Lower,
    Print,
    Punct,
    Space,
    Upper,
    Word,
    XDigit,
}

/// The property predicates understood by `\p{..}` and `\P{..}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Property {
    Any,
    Letter,
    Uppercase,
    Lowercase,
    Number,
    DecimalNumber,
    Separator,
    Control,
    Punctuation,
    AlphaNumeric,
    PerlSpace,
    PerlWord,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ClassItem {
    Range(u32, u32),
    Perl(PerlClass, bool),
    Posix(PosixClass, bool),
    Property(Property, bool),
}

/// A bracketed class or a single backslash class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ClassSet {
    pub negated: bool,
    pub caseless: bool,
    pub items: Vec<ClassItem>,
}

impl ClassSet {
    pub fn new(negated: bool, caseless: bool) -> Self {
        Self {
            negated,
            caseless,
            items: Vec::new(),
        }
    }

    pub fn single(item: ClassItem) -> Self {
        Self {
            negated: false,
            caseless: false,
            items: vec![item],
        }
    }

    pub fn matches(&self, c: u32, ucp: bool) -> bool {
        let mut hit = self.contains(c, ucp);
        if !hit && self.caseless {
            hit = case_variants(c)
                .into_iter()
                .skip(1)
                .any(|alt| self.contains(alt, ucp));
        }
        hit != self.negated
    }

    fn contains(&self, c: u32, ucp: bool) -> bool {
        self.items.iter().any(|item| match *item {
            ClassItem::Range(lo, hi) => lo <= c && c <= hi,
            ClassItem::Perl(class, neg) => perl_matches(class, c, ucp) != neg,
            ClassItem::Posix(class, neg) => posix_matches(class, c, ucp) != neg,
            ClassItem::Property(prop, neg) => property_matches(prop, c) != neg,
        })
    }

    /// Whether every member is below 0x80, so a first-byte table is exact.
    /// Caseless classes may reach non-ASCII folds such as U+212A.
    pub fn ascii_only(&self) -> bool {
        !self.negated
            && !self.caseless
            && self.items.iter().all(|item| match *item {
                ClassItem::Range(_, hi) => hi < 0x80,
                _ => false,
            })
    }
}

pub(crate) fn perl_matches(class: PerlClass, c: u32, ucp: bool) -> bool {
    match class {
        PerlClass::Digit => {
            is_ascii(c, |b| b.is_ascii_digit()) || (ucp && to_char(c).is_some_and(is_decimal))
        }
        PerlClass::Word => is_word(c, ucp),
        PerlClass::Space => {
            matches!(c, 0x09..=0x0d | 0x20) || (ucp && to_char(c).is_some_and(char::is_whitespace))
        }
        PerlClass::HSpace => matches!(
            c,
            0x09 | 0x20
                | 0xa0
                | 0x1680
                | 0x180e
                | 0x2000..=0x200a
                | 0x202f
                | 0x205f
                | 0x3000
        ),
        PerlClass::VSpace => matches!(c, 0x0a..=0x0d | 0x85 | 0x2028 | 0x2029),
    }
}

pub(crate) fn is_word(c: u32, ucp: bool) -> bool {
    if c == u32::from(b'_') || is_ascii(c, |b| b.is_ascii_alphanumeric()) {
        return true;
    }
    ucp && to_char(c).is_some_and(char::is_alphanumeric)
}

fn posix_matches(class: PosixClass, c: u32, ucp: bool) -> bool {
    if ucp {
        if let Some(ch) = to_char(c) {
            match class {
                PosixClass::Alpha => return ch.is_alphabetic(),
                PosixClass::Alnum => return ch.is_alphanumeric(),
                PosixClass::Lower => return ch.is_lowercase(),
                PosixClass::Upper => return ch.is_uppercase(),
                PosixClass::Digit => return is_decimal(ch),
                PosixClass::Space => return ch.is_whitespace(),
                PosixClass::Word => return is_word(c, true),
                _ => {}
            }
        }
    }
    match class {
        PosixClass::Alnum => is_ascii(c, |b| b.is_ascii_alphanumeric()),
        PosixClass::Alpha => is_ascii(c, |b| b.is_ascii_alphabetic()),
        PosixClass::Ascii => c < 0x80,
        PosixClass::Blank => c == 0x20 || c == 0x09,
        PosixClass::Cntrl => is_ascii(c, |b| b.is_ascii_control()),
        PosixClass::Digit => is_ascii(c, |b| b.is_ascii_digit()),
        PosixClass::Graph => is_ascii(c, |b| b.is_ascii_graphic()),
        PosixClass::Lower => is_ascii(c, |b| b.is_ascii_lowercase()),
        PosixClass::Print => is_ascii(c, |b| b.is_ascii_graphic() || b == b' '),
        PosixClass::Punct => is_ascii(c, |b| b.is_ascii_punctuation()),
        PosixClass::Space => matches!(c, 0x09..=0x0d | 0x20),
        PosixClass::Upper => is_ascii(c, |b| b.is_ascii_uppercase()),
        PosixClass::Word => is_word(c, false),
        PosixClass::XDigit => is_ascii(c, |b| b.is_ascii_hexdigit()),
    }
}

fn property_matches(prop: Property, c: u32) -> bool {
    let Some(ch) = to_char(c) else {
        return false;
    };
    match prop {
        Property::Any => true,
        Property::Letter => ch.is_alphabetic(),
        Property::Uppercase => ch.is_uppercase(),
        Property::Lowercase => ch.is_lowercase(),
        Property::Number => ch.is_numeric(),
        Property::DecimalNumber => is_decimal(ch),
        Property::Separator => ch.is_whitespace() && !ch.is_control(),
        Property::Control => ch.is_control(),
        Property::Punctuation => {
            ch.is_ascii_punctuation()
                || matches!(
                    c,
                    0xa1 | 0xa7
                        | 0xab
                        | 0xb6
                        | 0xb7
                        | 0xbb
                        | 0xbf
                        | 0x2010..=0x2027
                        | 0x2030..=0x205e
                        | 0x3001..=0x3003
                )
        }
        Property::AlphaNumeric => ch.is_alphanumeric(),
        Property::PerlSpace => ch.is_whitespace(),
        Property::PerlWord => is_word(c, true),
    }
}

/// Decimal digits (`Nd`) from the scripts with contiguous digit blocks.
fn is_decimal(ch: char) -> bool {
    matches!(
        ch as u32,
        0x30..=0x39
            | 0x0660..=0x0669
            | 0x06f0..=0x06f9
            | 0x07c0..=0x07c9
            | 0x0966..=0x096f
            | 0x09e6..=0x09ef
            | 0x0a66..=0x0a6f
            | 0x0ae6..=0x0aef
            | 0x0b66..=0x0b6f
            | 0x0be6..=0x0bef
            | 0x0c66..=0x0c6f
            | 0x0ce6..=0x0cef
            | 0x0d66..=0x0d6f
            | 0x0e50..=0x0e59
            | 0x0ed0..=0x0ed9
            | 0x0f20..=0x0f29
            | 0x1040..=0x1049
            | 0xff10..=0xff19
    )
}

fn is_ascii(c: u32, pred: impl Fn(u8) -> bool) -> bool {
    c < 0x80 && pred(c as u8)
}

fn to_char(c: u32) -> Option<char> {
    char::from_u32(c)
}

/// The simple lower and upper case partners of `c`, if they differ from it.
fn other_cases(c: u32) -> [Option<u32>; 2] {
    if c < 0x80 {
        let b = c as u8;
        let alt = if b.is_ascii_lowercase() {
            Some(u32::from(b.to_ascii_uppercase()))
        } else if b.is_ascii_uppercase() {
            Some(u32::from(b.to_ascii_lowercase()))
        } else {
            None
        };
        return [alt, None];
    }
    let Some(ch) = to_char(c) else {
        return [None, None];
    };
    let single = |it: &mut dyn Iterator<Item = char>| match (it.next(), it.next()) {
        (Some(alt), None) if alt != ch => Some(alt as u32),
        _ => None,
    };
    let lower = single(&mut ch.to_lowercase());
    let upper = single(&mut ch.to_uppercase());
    [lower, upper]
}

/// Case partners that simple upper/lower mapping does not reach, as
/// `(folded, other)` pairs.
const FOLD_EXTRAS: [(u32, u32); 17] = [
    (0x73, 0x17f),
    (0x6b, 0x212a),
    (0xe5, 0x212b),
    (0xdf, 0x1e9e),
    (0x3bc, 0xb5),
    (0x3b2, 0x3d0),
    (0x3b5, 0x3f5),
    (0x3b8, 0x3d1),
    (0x3b8, 0x3f4),
    (0x3b9, 0x345),
    (0x3b9, 0x1fbe),
    (0x3ba, 0x3f0),
    (0x3c0, 0x3d6),
    (0x3c1, 0x3f1),
    (0x3c3, 0x3c2),
    (0x3c6, 0x3d5),
    (0x3c9, 0x2126),
];

/// Every character that matches `c` caselessly, `c` first.
pub(crate) fn case_variants(c: u32) -> Vec<u32> {
    let mut variants = vec![c];
    let mut i = 0;
    while let Some(&cur) = variants.get(i) {
        let extras = FOLD_EXTRAS.iter().filter_map(|&(folded, other)| {
            if cur == folded {
                Some(other)
            } else if cur == other {
                Some(folded)
            } else {
                None
            }
        });
        for alt in other_cases(cur).into_iter().flatten().chain(extras) {
            if !variants.contains(&alt) {
                variants.push(alt);
            }
        }
        i += 1;
    }
    variants
}

/// Fold `c` for caseless comparison. ASCII-only in byte mode.
pub(crate) fn fold(c: u32, utf: bool) -> u32 {
    if c < 0x80 {
        return u32::from((c as u8).to_ascii_lowercase());
    }
    if !utf {
        return c;
    }
    if let Some(&(folded, _)) = FOLD_EXTRAS.iter().find(|&&(_, other)| other == c) {
        return folded;
    }
    match to_char(c) {
        Some(ch) => {
            let mut lower = ch.to_lowercase();
            match (lower.next(), lower.next()) {
                (Some(l), None) => l as u32,
                _ => c,
            }
        }
        None => c,
    }
}

pub(crate) fn posix_by_name(name: &[u8]) -> Option<PosixClass> {
    Some(match name {
        b"alnum" => PosixClass::Alnum,
        b"alpha" => PosixClass::Alpha,
        b"ascii" => PosixClass::Ascii,
        b"blank" => PosixClass::Blank,
        b"cntrl" => PosixClass::Cntrl,
        b"digit" => PosixClass::Digit,
        b"graph" => PosixClass::Graph,
        b"lower" => PosixClass::Lower,
        b"print" => PosixClass::Print,
        b"punct" => PosixClass::Punct,
        b"space" => PosixClass::Space,
        b"upper" => PosixClass::Upper,
        b"word" => PosixClass::Word,
        b"xdigit" => PosixClass::XDigit,
        _ => return None,
    })
}

pub(crate) fn property_by_name(name: &str) -> Option<Property> {
    Some(match name {
        "Any" => Property::Any,
        "L" | "L&" | "Letter" => Property::Letter,
        "Lu" => Property::Uppercase,
        "Ll" => Property::Lowercase,
        "N" => Property::Number,
        "Nd" => Property::DecimalNumber,
        "Z" | "Zs" => Property::Separator,
        "Cc" => Property::Control,
        "P" => Property::Punctuation,
        "Xan" => Property::AlphaNumeric,
        "Xsp" | "Xps" => Property::PerlSpace,
        "Xwd" => Property::PerlWord,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_and_negation() {
        let mut set = ClassSet::new(false, false);
        set.items.push(ClassItem::Range('a' as u32, 'f' as u32));
        assert!(set.matches('c' as u32, false));
        assert!(!set.matches('z' as u32, false));
        set.negated = true;
        assert!(set.matches('z' as u32, false));
    }

    #[test]
    fn test_caseless_class() {
        let mut set = ClassSet::new(false, true);
        set.items.push(ClassItem::Range('a' as u32, 'c' as u32));
        assert!(set.matches('B' as u32, false));
        let mut set = ClassSet::new(false, true);
        set.items.push(ClassItem::Range('é' as u32, 'é' as u32));
        assert!(set.matches('É' as u32, true));
    }

    #[test]
    fn test_word_ucp() {
        assert!(is_word('_' as u32, false));
        assert!(!is_word('é' as u32, false));
        assert!(is_word('é' as u32, true));
    }

    #[test]
    fn test_digit_ucp() {
        assert!(!perl_matches(PerlClass::Digit, 0x0663, false));
        assert!(perl_matches(PerlClass::Digit, 0x0663, true));
    }

    #[test]
    fn test_fold() {
        assert_eq!(fold('A' as u32, false), 'a' as u32);
        assert_eq!(fold(0xc9, false), 0xc9);
        assert_eq!(fold('É' as u32, true), 'é' as u32);
    }

    #[test]
    fn test_case_variants_close_over_special_folds() {
        let k = case_variants('k' as u32);
        assert_eq!(k.len(), 3);
        assert!(k.contains(&('K' as u32)) && k.contains(&0x212a));
        assert!(case_variants(0x212a).contains(&('k' as u32)));
        let sigma = case_variants(0x3c2);
        assert!(sigma.contains(&0x3c3) && sigma.contains(&0x3a3));
        assert_eq!(fold(0x212a, true), 'k' as u32);
        assert_eq!(fold(0x3c2, true), 0x3c3);
        assert_eq!(case_variants('1' as u32), vec!['1' as u32]);
    }

    #[test]
    fn test_caseless_class_is_symmetric() {
        let mut set = ClassSet::new(false, true);
        set.items.push(ClassItem::Range(0x212a, 0x212a));
        assert!(set.matches('k' as u32, false));
        let mut set = ClassSet::new(false, true);
        set.items.push(ClassItem::Range('k' as u32, 'k' as u32));
        assert!(set.matches(0x212a, false));
    }

    #[test]
    fn test_other_cases() {
        assert_eq!(other_cases('a' as u32), [Some('A' as u32), None]);
        assert_eq!(other_cases('1' as u32), [None, None]);
    }
}
