//! # Character Sets and Collations
//!
//! String columns carry a [`Collation`], which fixes both the byte encoding
//! ([`Charset`]) and the ordering rules used by comparison and sort keys.
//!
//! ## Supported Collations
//!
//! | Collation | Charset | Pad | Order |
//! |-----------|---------|-----|-------|
//! | `binary` | binary | no pad | raw bytes |
//! | `latin1_bin` | latin1 | pad space | raw bytes |
//! | `utf8mb4_bin` | utf8mb4 | pad space | code points (= raw UTF-8 bytes) |
//! | `utf8mb4_nopad_bin` | utf8mb4 | no pad | code points |
//! | `utf8mb4_general_ci` | utf8mb4 | pad space | upper-case fold, 2-byte weights |
//!
//! ## Pad Space
//!
//! Under a pad-space collation the shorter operand is compared as if it were
//! extended with spaces, so `"abc"` and `"abc  "` are equal and `"abc"` sorts
//! after `"abc\x01"`. Sort keys reproduce this by padding the weight string
//! with the space weight up to a fixed key length.

use std::cmp::Ordering;

/// Byte encoding of a string value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    Binary,
    Latin1,
    Utf8mb4,
}

impl Charset {
    pub fn name(self) -> &'static str {
        match self {
            Charset::Binary => "binary",
            Charset::Latin1 => "latin1",
            Charset::Utf8mb4 => "utf8mb4",
        }
    }

    /// Largest number of bytes one character occupies.
    pub fn mbmaxlen(self) -> usize {
        match self {
            Charset::Binary | Charset::Latin1 => 1,
            Charset::Utf8mb4 => 4,
        }
    }

    /// Byte used to fill fixed-length values.
    pub fn pad_byte(self) -> u8 {
        match self {
            Charset::Binary => 0x00,
            Charset::Latin1 | Charset::Utf8mb4 => b' ',
        }
    }

    pub fn default_collation(self) -> Collation {
        match self {
            Charset::Binary => Collation::Binary,
            Charset::Latin1 => Collation::Latin1Bin,
            Charset::Utf8mb4 => Collation::Utf8mb4GeneralCi,
        }
    }

    /// Length of the longest well-formed prefix of `bytes`.
    pub fn well_formed_len(self, bytes: &[u8]) -> usize {
        match self {
            Charset::Binary | Charset::Latin1 => bytes.len(),
            Charset::Utf8mb4 => match std::str::from_utf8(bytes) {
                Ok(_) => bytes.len(),
                Err(e) => e.valid_up_to(),
            },
        }
    }

    pub fn char_count(self, bytes: &[u8]) -> usize {
        match self {
            Charset::Binary | Charset::Latin1 => bytes.len(),
            Charset::Utf8mb4 => bytes.iter().filter(|&&b| (b & 0xC0) != 0x80).count(),
        }
    }

    /// Byte length of the first `nchars` characters of `bytes`.
    pub fn char_prefix_len(self, bytes: &[u8], nchars: usize) -> usize {
        match self {
            Charset::Binary | Charset::Latin1 => bytes.len().min(nchars),
            Charset::Utf8mb4 => {
                let mut seen = 0;
                for (i, &b) in bytes.iter().enumerate() {
                    if (b & 0xC0) != 0x80 {
                        if seen == nchars {
                            return i;
                        }
                        seen += 1;
                    }
                }
                bytes.len()
            }
        }
    }
}

/// Result of [`convert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Conversion {
    /// Offset of the first ill-formed input byte; conversion stopped there.
    pub invalid_at: Option<usize>,
    /// Some characters had no mapping and became `?`.
    pub replaced: bool,
}

impl Conversion {
    pub fn is_clean(&self) -> bool {
        self.invalid_at.is_none() && !self.replaced
    }
}

/// Appends `src`, re-encoded from `from` into `to`, to `out`.
///
/// Binary input is taken to be in the destination encoding already.
pub fn convert(src: &[u8], from: Charset, to: Charset, out: &mut Vec<u8>) -> Conversion {
    let mut result = Conversion::default();
    match (from, to) {
        (_, Charset::Binary) | (Charset::Latin1, Charset::Latin1) | (Charset::Binary, Charset::Latin1) => {
            out.extend_from_slice(src);
        }
        (Charset::Latin1, Charset::Utf8mb4) => {
            let mut buf = [0u8; 4];
            for &b in src {
                out.extend_from_slice(char::from(b).encode_utf8(&mut buf).as_bytes());
            }
        }
        (Charset::Binary, Charset::Utf8mb4) | (Charset::Utf8mb4, Charset::Utf8mb4) => {
            let good = Charset::Utf8mb4.well_formed_len(src);
            out.extend_from_slice(&src[..good]);
            if good < src.len() {
                result.invalid_at = Some(good);
            }
        }
        (Charset::Utf8mb4, Charset::Latin1) => {
            let good = Charset::Utf8mb4.well_formed_len(src);
            for ch in String::from_utf8_lossy(&src[..good]).chars() {
                match u8::try_from(u32::from(ch)) {
                    Ok(b) => out.push(b),
                    Err(_) => {
                        out.push(b'?');
                        result.replaced = true;
                    }
                }
            }
            if good < src.len() {
                result.invalid_at = Some(good);
            }
        }
    }
    result
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Collation {
    #[default]
    Binary,
    Latin1Bin,
    Utf8mb4Bin,
    Utf8mb4NopadBin,
    Utf8mb4GeneralCi,
}

/// Weight of a space under `utf8mb4_general_ci`.
const SPACE_WEIGHT: u16 = 0x0020;

impl Collation {
    pub fn name(self) -> &'static str {
        match self {
            Collation::Binary => "binary",
            Collation::Latin1Bin => "latin1_bin",
            Collation::Utf8mb4Bin => "utf8mb4_bin",
            Collation::Utf8mb4NopadBin => "utf8mb4_nopad_bin",
            Collation::Utf8mb4GeneralCi => "utf8mb4_general_ci",
        }
    }

    pub fn from_name(name: &str) -> Option<Collation> {
        [
            Collation::Binary,
            Collation::Latin1Bin,
            Collation::Utf8mb4Bin,
            Collation::Utf8mb4NopadBin,
            Collation::Utf8mb4GeneralCi,
        ]
        .into_iter()
        .find(|c| c.name().eq_ignore_ascii_case(name))
    }

    pub fn charset(self) -> Charset {
        match self {
            Collation::Binary => Charset::Binary,
            Collation::Latin1Bin => Charset::Latin1,
            Collation::Utf8mb4Bin | Collation::Utf8mb4NopadBin | Collation::Utf8mb4GeneralCi => {
                Charset::Utf8mb4
            }
        }
    }

    pub fn pad_space(self) -> bool {
        matches!(
            self,
            Collation::Latin1Bin | Collation::Utf8mb4Bin | Collation::Utf8mb4GeneralCi
        )
    }

    /// Raw byte order equals collation order (modulo padding).
    pub fn is_byte_ordered(self) -> bool {
        !matches!(self, Collation::Utf8mb4GeneralCi)
    }

    pub fn compare(self, a: &[u8], b: &[u8]) -> Ordering {
        match self {
            Collation::Binary | Collation::Utf8mb4NopadBin => a.cmp(b),
            Collation::Latin1Bin | Collation::Utf8mb4Bin => compare_padded(
                a.iter().map(|&x| u16::from(x)),
                b.iter().map(|&x| u16::from(x)),
                u16::from(b' '),
            ),
            Collation::Utf8mb4GeneralCi => {
                compare_padded(general_ci_weights(a), general_ci_weights(b), SPACE_WEIGHT)
            }
        }
    }

    /// Bytes of sort key needed for a value of at most `max_bytes` bytes.
    pub fn weight_len(self, max_bytes: usize) -> usize {
        match self {
            Collation::Utf8mb4GeneralCi => max_bytes.div_ceil(self.charset().mbmaxlen()) * 2,
            _ => max_bytes,
        }
    }

    /// Appends exactly `key_len` bytes of weight string for `src` to `out`.
    ///
    /// Keys of equal length compare with `memcmp` the way [`Self::compare`]
    /// compares the values, provided neither value was cut short.
    pub fn make_weight_string(self, src: &[u8], out: &mut Vec<u8>, key_len: usize) {
        let start = out.len();
        match self {
            Collation::Utf8mb4GeneralCi => {
                for w in general_ci_weights(src) {
                    if out.len() - start + 2 > key_len {
                        break;
                    }
                    out.extend_from_slice(&w.to_be_bytes());
                }
                while out.len() - start + 2 <= key_len {
                    out.extend_from_slice(&SPACE_WEIGHT.to_be_bytes());
                }
            }
            _ => {
                let take = src.len().min(key_len);
                out.extend_from_slice(&src[..take]);
            }
        }
        let pad = if self.pad_space() && self != Collation::Utf8mb4GeneralCi {
            b' '
        } else {
            0x00
        };
        out.resize(start + key_len, pad);
    }

    /// Key that is equal for two values exactly when they compare equal.
    pub fn fold_key(self, src: &[u8]) -> Vec<u8> {
        let trimmed = if self.pad_space() {
            trim_trailing_spaces(src)
        } else {
            src
        };
        match self {
            Collation::Utf8mb4GeneralCi => general_ci_weights(trimmed)
                .flat_map(|w| w.to_be_bytes())
                .collect(),
            _ => trimmed.to_vec(),
        }
    }
}

pub fn trim_trailing_spaces(src: &[u8]) -> &[u8] {
    let end = src.iter().rposition(|&b| b != b' ').map_or(0, |p| p + 1);
    &src[..end]
}

fn compare_padded<A, B>(mut a: A, mut b: B, pad: u16) -> Ordering
where
    A: Iterator<Item = u16>,
    B: Iterator<Item = u16>,
{
    loop {
        match (a.next(), b.next()) {
            (Some(x), Some(y)) => match x.cmp(&y) {
                Ordering::Equal => continue,
                other => return other,
            },
            (None, None) => return Ordering::Equal,
            (Some(x), None) => {
                return std::iter::once(x)
                    .chain(a)
                    .map(|w| w.cmp(&pad))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal);
            }
            (None, Some(y)) => {
                return std::iter::once(y)
                    .chain(b)
                    .map(|w| pad.cmp(&w))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or(Ordering::Equal);
            }
        }
    }
}

fn general_ci_weights(src: &[u8]) -> impl Iterator<Item = u16> + '_ {
    src.utf8_chunks().flat_map(|chunk| {
        let invalid = chunk.invalid().iter().map(|_| 0xFFFDu16);
        chunk.valid().chars().map(fold_char).chain(invalid)
    })
}

fn fold_char(ch: char) -> u16 {
    let upper = ch.to_uppercase().next().unwrap_or(ch);
    u16::try_from(u32::from(upper)).unwrap_or(0xFFFD)
}
