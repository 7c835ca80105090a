//! Subject decoding and newline conventions

use super::options::{Bsr, Newline};

/// Decode one code point at the start of `bytes`.
///
/// Malformed sequences decode as the single leading byte so that unchecked
/// subjects never stall or panic.
pub(crate) fn decode_utf8(bytes: &[u8]) -> Option<(u32, usize)> {
    let &lead = bytes.first()?;
    let (len, init) = match lead {
        0x00..=0x7f => return Some((u32::from(lead), 1)),
        0xc2..=0xdf => (2, u32::from(lead & 0x1f)),
        0xe0..=0xef => (3, u32::from(lead & 0x0f)),
        0xf0..=0xf4 => (4, u32::from(lead & 0x07)),
        _ => return Some((u32::from(lead), 1)),
    };
    if bytes.len() < len {
        return Some((u32::from(lead), 1));
    }
    let mut c = init;
    for &b in &bytes[1..len] {
        if b & 0xc0 != 0x80 {
            return Some((u32::from(lead), 1));
        }
        c = (c << 6) | u32::from(b & 0x3f);
    }
    Some((c, len))
}

/// Decode the code point that ends at `pos`.
pub(crate) fn decode_utf8_before(bytes: &[u8], pos: usize) -> Option<(u32, usize)> {
    if pos == 0 {
        return None;
    }
    let floor = pos.saturating_sub(4);
    let mut start = pos - 1;
    while start > floor && bytes[start] & 0xc0 == 0x80 {
        start -= 1;
    }
    match decode_utf8(&bytes[start..pos]) {
        Some((c, len)) if start + len == pos => Some((c, len)),
        _ => Some((u32::from(bytes[pos - 1]), 1)),
    }
}

pub(crate) fn is_char_boundary(bytes: &[u8], pos: usize) -> bool {
    pos == 0 || pos >= bytes.len() || bytes[pos] & 0xc0 != 0x80
}

pub(crate) fn encode_utf8(c: u32, out: &mut Vec<u8>) {
    match char::from_u32(c) {
        Some(ch) => {
            let mut buf = [0u8; 4];
            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        }
        None => out.push((c & 0xff) as u8),
    }
}

/// Newline and line-break recognition for one compiled pattern.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Lines {
    pub newline: Newline,
    pub bsr: Bsr,
    pub utf: bool,
}

impl Lines {
    /// Length of the newline sequence starting at `pos`, if any.
    pub fn newline_at(&self, s: &[u8], pos: usize) -> Option<usize> {
        let &b = s.get(pos)?;
        let crlf = b == b'\r' && s.get(pos + 1) == Some(&b'\n');
        match self.newline {
            Newline::Lf => (b == b'\n').then_some(1),
            Newline::Cr => (b == b'\r').then_some(1),
            Newline::CrLf => crlf.then_some(2),
            Newline::AnyCrLf => match b {
                b'\r' if crlf => Some(2),
                b'\r' | b'\n' => Some(1),
                _ => None,
            },
            Newline::Any => match b {
                b'\r' if crlf => Some(2),
                b'\n' | 0x0b | 0x0c | b'\r' => Some(1),
                _ => self.unicode_break_at(s, pos),
            },
        }
    }

    /// Whether a newline sequence ends exactly at `pos`.
    pub fn newline_before(&self, s: &[u8], pos: usize) -> bool {
        if pos == 0 {
            return false;
        }
        let prev = s[pos - 1];
        match self.newline {
            Newline::Lf => prev == b'\n',
            Newline::Cr => prev == b'\r',
            Newline::CrLf => pos >= 2 && prev == b'\n' && s[pos - 2] == b'\r',
            Newline::AnyCrLf | Newline::Any => {
                // A CR immediately followed by LF is only half of a newline.
                if prev == b'\r' && s.get(pos) == Some(&b'\n') {
                    return false;
                }
                match prev {
                    b'\n' | b'\r' => true,
                    0x0b | 0x0c => self.newline == Newline::Any,
                    _ if self.newline == Newline::Any => {
                        (1..=3).any(|len| pos >= len && self.unicode_break_at(s, pos - len) == Some(len))
                    }
                    _ => false,
                }
            }
        }
    }

    /// NEL, LS and PS. In byte mode only the single byte 0x85 qualifies.
    fn unicode_break_at(&self, s: &[u8], pos: usize) -> Option<usize> {
        if !self.utf {
            return (s.get(pos) == Some(&0x85)).then_some(1);
        }
        match decode_utf8(&s[pos..])? {
            (0x85, len) | (0x2028, len) | (0x2029, len) if len > 1 => Some(len),
            _ => None,
        }
    }

    /// Length of the `\R` match at `pos`. CRLF is taken whole.
    pub fn line_break_at(&self, s: &[u8], pos: usize) -> Option<usize> {
        let &b = s.get(pos)?;
        match b {
            b'\r' if s.get(pos + 1) == Some(&b'\n') => Some(2),
            b'\r' | b'\n' => Some(1),
            0x0b | 0x0c if self.bsr == Bsr::Unicode => Some(1),
            _ if self.bsr == Bsr::Unicode => self.unicode_break_at(s, pos),
            _ => None,
        }
    }
}
