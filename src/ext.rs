//! RTP header extension values with size limits.

use std::fmt;
use std::ops::Deref;
use std::str::{from_utf8, FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::budget::MID_RTP_EXTENSION_MAX_LENGTH;

// See RFC 8285 Section 4.2
// ID Range: 1..=14
// Length Range: 1..=16

/// Highest extension id usable in the one-byte form. 15 is reserved.
pub const MAX_ID_ONE_BYTE_FORM: u8 = 14;

/// Longest value the 4 bit length field of the one-byte form can express.
pub const MAX_ONE_BYTE_LEN: usize = 16;

const MID_LEN: usize = MID_RTP_EXTENSION_MAX_LENGTH as usize;

/// Kinds of header extension we enforce a value limit for.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExtensionKind {
    /// <urn:ietf:params:rtp-hdrext:sdes:mid>
    Mid,
}

impl ExtensionKind {
    /// Max number of bytes in a value of this kind.
    pub const fn max_value_len(&self) -> u8 {
        match self {
            ExtensionKind::Mid => MID_RTP_EXTENSION_MAX_LENGTH,
        }
    }

    /// The extmap URI.
    pub fn uri(&self) -> &'static str {
        match self {
            ExtensionKind::Mid => "urn:ietf:params:rtp-hdrext:sdes:mid",
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ExtensionKind::Mid => "mid",
        }
    }
}

impl fmt::Display for ExtensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors when setting or writing an extension value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExtensionError {
    /// The value is longer than allowed for the kind.
    #[error("{kind} value of {len} bytes exceeds limit of {max}")]
    ValueTooLong {
        /// Kind of extension.
        kind: ExtensionKind,
        /// Length of the rejected value.
        len: usize,
        /// The limit for the kind.
        max: u8,
    },

    /// Extension values can't be empty in the one-byte form.
    #[error("{0} value is empty")]
    Empty(ExtensionKind),

    /// Character not allowed in the value.
    #[error("invalid character {0:?} in mid")]
    InvalidChar(char),

    /// Id not usable in the one-byte form.
    #[error("extension id {0} not in 1..=14")]
    InvalidId(u8),

    /// Output buffer can't hold the element.
    #[error("buffer of {len} bytes too small, need {needed}")]
    BufferTooSmall {
        /// Length of buffer.
        len: usize,
        /// Bytes needed.
        needed: usize,
    },

    /// In place update with a value of a different length.
    #[error("element holds {found} bytes, new value is {expected}")]
    LengthMismatch {
        /// Length of the new value.
        expected: usize,
        /// Length of the value already in the element.
        found: usize,
    },
}

/// Media identifier as carried in the MID header extension.
///
/// Always 1 to [`MID_RTP_EXTENSION_MAX_LENGTH`] bytes of SDP token
/// characters (ASCII alphanumerics and ``!#$%&'*+-.^_`{|}~``).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Mid {
    buf: [u8; MID_LEN],
    len: u8,
}

impl Mid {
    /// Create a MID, rejecting values over the limit.
    pub fn new(v: &str) -> Result<Mid, ExtensionError> {
        check_chars(v)?;

        if v.len() > MID_LEN {
            return Err(ExtensionError::ValueTooLong {
                kind: ExtensionKind::Mid,
                len: v.len(),
                max: MID_RTP_EXTENSION_MAX_LENGTH,
            });
        }

        Ok(Mid::from_valid(v.as_bytes()))
    }

    /// Create a MID, cutting values over the limit.
    ///
    /// The returned bool is `true` if the value was truncated.
    pub fn truncated(v: &str) -> Result<(Mid, bool), ExtensionError> {
        let mut max = v.len().min(MID_LEN);
        while !v.is_char_boundary(max) {
            max -= 1;
        }

        // Whatever is cut off is never validated.
        let kept = &v[..max];
        check_chars(kept)?;

        let was_truncated = v.len() > max;

        if was_truncated {
            warn!("Truncating mid {:?} from {} to {} bytes", v, v.len(), max);
        }

        Ok((Mid::from_valid(kept.as_bytes()), was_truncated))
    }

    fn from_valid(bytes: &[u8]) -> Mid {
        let mut buf = [0; MID_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);

        Mid {
            buf,
            len: bytes.len() as u8,
        }
    }

    /// The value as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len as usize]
    }
}

// SDP token (RFC 4566 section 9), which is what a=mid carries (RFC 8843).
fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`{|}~".contains(c)
}

fn check_chars(v: &str) -> Result<(), ExtensionError> {
    if v.is_empty() {
        return Err(ExtensionError::Empty(ExtensionKind::Mid));
    }

    if let Some(c) = v.chars().find(|c| !is_token_char(*c)) {
        return Err(ExtensionError::InvalidChar(c));
    }

    Ok(())
}

impl Deref for Mid {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        // Only ever constructed from checked ASCII.
        from_utf8(self.as_bytes()).unwrap_or_default()
    }
}

impl fmt::Display for Mid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &str = self;
        write!(f, "{}", s)
    }
}

impl fmt::Debug for Mid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s: &str = self;
        write!(f, "Mid({})", s)
    }
}

impl FromStr for Mid {
    type Err = ExtensionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mid::new(s)
    }
}

impl<'a> TryFrom<&'a str> for Mid {
    type Error = ExtensionError;

    fn try_from(v: &'a str) -> Result<Self, Self::Error> {
        Mid::new(v)
    }
}

impl TryFrom<String> for Mid {
    type Error = ExtensionError;

    fn try_from(v: String) -> Result<Self, Self::Error> {
        Mid::new(&v)
    }
}

impl From<Mid> for String {
    fn from(v: Mid) -> Self {
        v.to_string()
    }
}

/// Write one extension element in the one-byte form.
///
/// ```text
///  0                   1
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  ID   |  len  |  data ...
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// `len` is the value length minus one. Returns the number of bytes written.
pub fn write_one_byte(
    buf: &mut [u8],
    id: u8,
    kind: ExtensionKind,
    value: &[u8],
) -> Result<usize, ExtensionError> {
    if id < 1 || id > MAX_ID_ONE_BYTE_FORM {
        return Err(ExtensionError::InvalidId(id));
    }

    if value.is_empty() {
        return Err(ExtensionError::Empty(kind));
    }

    let max = kind.max_value_len();
    if value.len() > max as usize {
        return Err(ExtensionError::ValueTooLong {
            kind,
            len: value.len(),
            max,
        });
    }

    let needed = 1 + value.len();
    if buf.len() < needed {
        return Err(ExtensionError::BufferTooSmall {
            len: buf.len(),
            needed,
        });
    }

    buf[0] = id << 4 | (value.len() as u8 - 1);
    buf[1..needed].copy_from_slice(value);

    Ok(needed)
}

/// Write a MID extension element in the one-byte form.
pub fn write_mid(buf: &mut [u8], id: u8, mid: &Mid) -> Result<usize, ExtensionError> {
    write_one_byte(buf, id, ExtensionKind::Mid, mid.as_bytes())
}

/// Overwrite the value of a MID element already in a packet.
///
/// `element` starts at the one-byte form header. Changing the length would
/// require rewriting the whole extension block, so it is refused.
pub fn update_mid(element: &mut [u8], mid: &Mid) -> Result<(), ExtensionError> {
    let Some(first) = element.first() else {
        return Err(ExtensionError::BufferTooSmall { len: 0, needed: 1 });
    };

    let id = first >> 4;
    if id < 1 || id > MAX_ID_ONE_BYTE_FORM {
        return Err(ExtensionError::InvalidId(id));
    }

    let found = (first & 0xf) as usize + 1;
    if element.len() < 1 + found {
        return Err(ExtensionError::BufferTooSmall {
            len: element.len(),
            needed: 1 + found,
        });
    }

    let value = mid.as_bytes();
    if value.len() != found {
        return Err(ExtensionError::LengthMismatch {
            expected: value.len(),
            found,
        });
    }

    element[1..1 + found].copy_from_slice(value);

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mid_limit() {
        assert_eq!(ExtensionKind::Mid.max_value_len(), 8);
        assert!(Mid::new("abcdefgh").is_ok());
        assert_eq!(
            Mid::new("abcdefghi"),
            Err(ExtensionError::ValueTooLong {
                kind: ExtensionKind::Mid,
                len: 9,
                max: 8
            })
        );
    }

    #[test]
    fn mid_truncated_reports() {
        let (mid, cut) = Mid::truncated("abcdefghi").unwrap();
        assert!(cut);
        assert_eq!(&*mid, "abcdefgh");

        let (mid, cut) = Mid::truncated("0").unwrap();
        assert!(!cut);
        assert_eq!(&*mid, "0");
    }

    #[test]
    fn mid_truncated_ignores_cut_tail() {
        let (mid, cut) = Mid::truncated("abcdefgh.x y").unwrap();
        assert!(cut);
        assert_eq!(&*mid, "abcdefgh");

        // Cut never splits a character.
        let (mid, cut) = Mid::truncated("abcdefgå").unwrap();
        assert!(cut);
        assert_eq!(&*mid, "abcdefg");

        assert_eq!(Mid::truncated("abc def"), Err(ExtensionError::InvalidChar(' ')));
    }

    #[test]
    fn mid_token_chars() {
        assert_eq!(&*Mid::new("a.b").unwrap(), "a.b");
        assert_eq!(&*Mid::new("~!#$%&'*").unwrap(), "~!#$%&'*");
        assert_eq!(Mid::new("a/b"), Err(ExtensionError::InvalidChar('/')));
        assert_eq!(Mid::new("a\"b"), Err(ExtensionError::InvalidChar('"')));
    }

    #[test]
    fn extension_uri() {
        assert_eq!(ExtensionKind::Mid.uri(), "urn:ietf:params:rtp-hdrext:sdes:mid");
        assert_eq!(ExtensionKind::Mid.to_string(), "mid");
    }

    #[test]
    fn mid_bad_input() {
        assert_eq!(Mid::new(""), Err(ExtensionError::Empty(ExtensionKind::Mid)));
        assert_eq!(Mid::new("a b"), Err(ExtensionError::InvalidChar(' ')));
        assert_eq!(Mid::truncated("åäö"), Err(ExtensionError::InvalidChar('å')));
    }

    #[test]
    fn mid_display_debug() {
        let mid: Mid = "audio-1".parse().unwrap();
        assert_eq!(mid.to_string(), "audio-1");
        assert_eq!(format!("{:?}", mid), "Mid(audio-1)");
        assert_eq!(mid.as_bytes(), b"audio-1");
    }

    #[test]
    fn write_element() {
        let mut buf = [0_u8; 16];
        let mid = Mid::new("v0").unwrap();
        let n = write_mid(&mut buf, 4, &mid).unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf[..3], &[0x41, b'v', b'0']);
    }

    #[test]
    fn write_element_refuses() {
        let mut buf = [0_u8; 16];
        assert_eq!(
            write_one_byte(&mut buf, 0, ExtensionKind::Mid, b"a"),
            Err(ExtensionError::InvalidId(0))
        );
        assert_eq!(
            write_one_byte(&mut buf, 15, ExtensionKind::Mid, b"a"),
            Err(ExtensionError::InvalidId(15))
        );
        assert!(matches!(
            write_one_byte(&mut buf, 1, ExtensionKind::Mid, b"123456789"),
            Err(ExtensionError::ValueTooLong { len: 9, .. })
        ));
        assert_eq!(
            write_one_byte(&mut buf[..2], 1, ExtensionKind::Mid, b"abc"),
            Err(ExtensionError::BufferTooSmall { len: 2, needed: 4 })
        );
        // nothing written on failure
        assert_eq!(buf, [0; 16]);
    }

    #[test]
    fn update_in_place() {
        let mut buf = [0_u8; 8];
        write_mid(&mut buf, 1, &Mid::new("ab").unwrap()).unwrap();

        update_mid(&mut buf, &Mid::new("xy").unwrap()).unwrap();
        assert_eq!(&buf[..3], &[0x11, b'x', b'y']);

        assert_eq!(
            update_mid(&mut buf, &Mid::new("xyz").unwrap()),
            Err(ExtensionError::LengthMismatch {
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            update_mid(&mut [], &Mid::new("x").unwrap()),
            Err(ExtensionError::BufferTooSmall { len: 0, needed: 1 })
        );
    }
}
