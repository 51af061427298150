use crate::{
    Result,
    constants::{UID_MAX_LEN, UID_VALID_LENGTHS},
    error::Error,
};
use std::fmt;
use subtle::ConstantTimeEq;

/// Contactless card identifier.
///
/// MIFARE UIDs come in three size classes (4, 7 or 10 bytes). The bytes live
/// in a fixed-capacity inline buffer with an explicit length so a `Uid` is
/// `Copy` and can travel inside an [`Event`](crate::Event) without any heap
/// allocation.
///
/// # Security
/// Equality is constant-time over the valid bytes only; trailing buffer
/// content is never compared.
#[derive(Clone, Copy)]
pub struct Uid {
    bytes: [u8; UID_MAX_LEN],
    len: u8,
}

impl Uid {
    /// Create a UID from raw bytes.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` unless the slice is 4, 7 or 10 bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use portunus_core::Uid;
    ///
    /// let uid = Uid::new(&[0x04, 0xA3, 0x2B, 0x11]).unwrap();
    /// assert_eq!(uid.to_string(), "04:A3:2B:11");
    ///
    /// assert!(Uid::new(&[0x01, 0x02]).is_err());
    /// ```
    pub fn new(bytes: &[u8]) -> Result<Self> {
        if !UID_VALID_LENGTHS.contains(&bytes.len()) {
            return Err(Error::InvalidArgument(format!(
                "UID must be 4, 7 or 10 bytes, got {}",
                bytes.len()
            )));
        }
        let mut buf = [0u8; UID_MAX_LEN];
        buf[..bytes.len()].copy_from_slice(bytes);
        Ok(Self {
            bytes: buf,
            len: bytes.len() as u8,
        })
    }

    /// The valid UID bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Number of valid bytes (4, 7 or 10).
    #[must_use]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Always false; a `Uid` cannot be constructed empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Renders each byte as two uppercase hex digits separated by colons.
impl fmt::Display for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, byte) in self.as_bytes().iter().enumerate() {
            if i > 0 {
                f.write_str(":")?;
            }
            write!(f, "{byte:02X}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Uid {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Uid({self})")
    }
}

impl std::str::FromStr for Uid {
    type Err = Error;

    /// Parse the colon-separated hex rendering, e.g. `04:A3:2B:11`.
    fn from_str(s: &str) -> Result<Self> {
        let mut buf = [0u8; UID_MAX_LEN];
        let mut len = 0;
        for part in s.trim().split(':') {
            if len == UID_MAX_LEN {
                return Err(Error::InvalidArgument(format!("UID too long: {s}")));
            }
            if part.len() != 2 {
                return Err(Error::InvalidArgument(format!("Invalid UID byte '{part}'")));
            }
            buf[len] = u8::from_str_radix(part, 16)
                .map_err(|_| Error::InvalidArgument(format!("Invalid UID byte '{part}'")))?;
            len += 1;
        }
        Uid::new(&buf[..len])
    }
}

impl PartialEq for Uid {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && bool::from(self.as_bytes().ct_eq(other.as_bytes()))
    }
}

impl Eq for Uid {}

impl std::hash::Hash for Uid {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_uid_display() {
        let uid = Uid::new(&[0x04, 0xA3, 0x2B, 0x00]).unwrap();
        assert_eq!(uid.to_string(), "04:A3:2B:00");
    }

    #[rstest]
    #[case(&[0x01; 4], true)]
    #[case(&[0x01; 7], true)]
    #[case(&[0x01; 10], true)]
    #[case(&[], false)]
    #[case(&[0x01; 3], false)]
    #[case(&[0x01; 5], false)]
    #[case(&[0x01; 11], false)]
    fn test_uid_lengths(#[case] bytes: &[u8], #[case] valid: bool) {
        assert_eq!(Uid::new(bytes).is_ok(), valid);
    }

    #[test]
    fn test_equality_ignores_buffer_tail() {
        let a = Uid::new(&[1, 2, 3, 4]).unwrap();
        let mut b = Uid::new(&[1, 2, 3, 4]).unwrap();
        b.bytes[8] = 0xFF;
        assert_eq!(a, b);

        let longer = Uid::new(&[1, 2, 3, 4, 0, 0, 0]).unwrap();
        assert_ne!(a, longer);
    }

    #[test]
    fn test_uid_from_str() {
        let uid: Uid = "04:a3:2b:11:22:33:44".parse().unwrap();
        assert_eq!(uid.as_bytes(), &[0x04, 0xA3, 0x2B, 0x11, 0x22, 0x33, 0x44]);

        assert!("04:A3".parse::<Uid>().is_err());
        assert!("04:A3:2B:ZZ".parse::<Uid>().is_err());
        assert!("4:A3:2B:11".parse::<Uid>().is_err());
        assert!("01:02:03:04:05:06:07:08:09:0A:0B".parse::<Uid>().is_err());
    }

    proptest! {
        #[test]
        fn prop_rendering_length_and_content(
            bytes in prop_oneof![
                prop::collection::vec(any::<u8>(), 4),
                prop::collection::vec(any::<u8>(), 7),
                prop::collection::vec(any::<u8>(), 10),
            ]
        ) {
            let uid = Uid::new(&bytes).unwrap();
            let text = uid.to_string();

            prop_assert_eq!(text.len(), 3 * bytes.len() - 1);
            for (part, byte) in text.split(':').zip(bytes.iter()) {
                prop_assert_eq!(part, format!("{byte:02X}"));
            }
            prop_assert_eq!(text.parse::<Uid>().unwrap(), uid);
        }
    }
}
