use core::fmt;

use zerocopy::{FromBytes, FromZeroes};

/// Fixed-width on-disk string field. The bytes are nul-padded, but a name
/// that fills the whole field has no terminator at all.
#[derive(Copy, Clone, FromZeroes, FromBytes)]
#[repr(transparent)]
pub struct CStringBytes<B>(B);

impl<const N: usize> CStringBytes<[u8; N]> {
    pub fn as_str(&self) -> &str {
        c_str_from_bytes(&self.0)
    }
}

impl<const N: usize> fmt::Debug for CStringBytes<[u8; N]> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CStringBytes").field(&self.as_str()).finish()
    }
}

fn nul_position(bytes: &[u8]) -> usize {
    bytes.iter().position(|&c| c == 0).unwrap_or(bytes.len())
}

/// Creates a string from a byte slice, stopping at the first nul byte if
/// there is one.
pub(crate) fn c_str_from_bytes(bytes: &[u8]) -> &str {
    core::str::from_utf8(&bytes[..nul_position(bytes)]).unwrap_or("<invalid UTF-8>")
}
