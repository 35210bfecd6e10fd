//! Values that can be written into a bitstream as byte strings.

use crate::error::{Error, Result};
use crate::tree::Tag;
use std::hash::Hash;

/// A terminal or tree label the coder can store.
///
/// `from_bytes(&x.to_bytes())` must give back `x`.
pub trait Label: Hash + Eq + Clone {
    fn to_bytes(&self) -> Vec<u8>;
    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}

impl Label for String {
    fn to_bytes(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        String::from_utf8(bytes.to_vec()).map_err(|_| Error::corrupt("label is not valid UTF-8"))
    }
}

impl Label for Vec<u8> {
    fn to_bytes(&self) -> Vec<u8> {
        self.clone()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(bytes.to_vec())
    }
}

impl Label for u8 {
    fn to_bytes(&self) -> Vec<u8> {
        vec![*self]
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes {
            [byte] => Ok(*byte),
            _ => Err(Error::corrupt(format!("expected 1 byte, got {}", bytes.len()))),
        }
    }
}

impl Label for u32 {
    fn to_bytes(&self) -> Vec<u8> {
        self.to_be_bytes().to_vec()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw: [u8; 4] = bytes
            .try_into()
            .map_err(|_| Error::corrupt(format!("expected 4 bytes, got {}", bytes.len())))?;
        Ok(u32::from_be_bytes(raw))
    }
}

impl Label for char {
    fn to_bytes(&self) -> Vec<u8> {
        u32::from(*self).to_bytes()
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let raw = u32::from_bytes(bytes)?;
        char::from_u32(raw).ok_or_else(|| Error::corrupt(format!("{raw:#x} is not a char")))
    }
}

const CLOSE: u8 = 0;
const OPEN: u8 = 1;

impl<L: Label> Label for Tag<L> {
    fn to_bytes(&self) -> Vec<u8> {
        match self {
            Tag::Open(label) => {
                let mut bytes = vec![OPEN];
                bytes.extend(label.to_bytes());
                bytes
            }
            Tag::Close => vec![CLOSE],
        }
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        match bytes.split_first() {
            Some((&OPEN, rest)) => Ok(Tag::Open(L::from_bytes(rest)?)),
            Some((&CLOSE, [])) => Ok(Tag::Close),
            _ => Err(Error::corrupt("malformed tag")),
        }
    }
}
