//! File content builders for scanner and sniffing tests.

/// A payload that opens with the Windows PE `MZ` magic.
#[must_use]
pub fn pe_stub(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len.max(2)];
    bytes[0] = 0x4D;
    bytes[1] = 0x5A;
    bytes
}

/// A payload that opens with the Matroska EBML magic.
#[must_use]
pub fn matroska_stub(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len.max(4)];
    bytes[..4].copy_from_slice(&[0x1A, 0x45, 0xDF, 0xA3]);
    bytes
}

/// A payload that opens with the JPEG SOI marker.
#[must_use]
pub fn jpeg_stub(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len.max(3)];
    bytes[..3].copy_from_slice(&[0xFF, 0xD8, 0xFF]);
    bytes
}
