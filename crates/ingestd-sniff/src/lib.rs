#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::cargo,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Magic-byte classification of file content.
//!
//! Reads a bounded prefix and identifies the true binary format independently
//! of the filename extension. [`DetectedType::Unknown`] means "no signature
//! matched", which callers must treat as *not proven safe* rather than proven
//! unsafe; the accept/reject policy lives with the scanner, not here.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of leading bytes inspected per file. Enough to disambiguate every
/// signature in the table, including `ftyp` brands at offset 8.
pub const HEADER_LEN: usize = 64;

/// Result type for header inspection.
pub type SniffResult<T> = Result<T, SniffError>;

/// Errors produced while reading a file prefix.
#[derive(Debug, Error)]
pub enum SniffError {
    /// IO failure while opening or reading the file.
    #[error("sniff io failure")]
    Io {
        /// Operation that triggered the failure.
        operation: &'static str,
        /// Path being inspected.
        path: PathBuf,
        /// Underlying IO error.
        source: io::Error,
    },
}

/// Binary format derived from a file's leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectedType {
    /// Windows PE executable (`MZ`).
    WindowsExecutable,
    /// ELF executable or shared object.
    ElfExecutable,
    /// Mach-O executable, any architecture or fat binary.
    MachOExecutable,
    /// Script starting with a `#!` interpreter line.
    ScriptShebang,
    /// JPEG image.
    Jpeg,
    /// PNG image.
    Png,
    /// GIF image.
    Gif,
    /// TIFF image, either byte order.
    Tiff,
    /// HEIF/HEIC/AVIF image container.
    Heif,
    /// MP4 or QuickTime container.
    Mp4,
    /// Matroska or WebM container.
    Matroska,
    /// AVI container.
    Avi,
    /// WebP image.
    Webp,
    /// ZIP archive (also matches office documents and JARs).
    Zip,
    /// RAR archive.
    Rar,
    /// 7z archive.
    SevenZip,
    /// GZIP stream.
    Gzip,
    /// PDF document.
    Pdf,
    /// No known signature matched.
    Unknown,
}

impl DetectedType {
    /// Machine-friendly discriminator used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WindowsExecutable => "windows_executable",
            Self::ElfExecutable => "elf_executable",
            Self::MachOExecutable => "macho_executable",
            Self::ScriptShebang => "script_shebang",
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
            Self::Heif => "heif",
            Self::Mp4 => "mp4",
            Self::Matroska => "matroska",
            Self::Avi => "avi",
            Self::Webp => "webp",
            Self::Zip => "zip",
            Self::Rar => "rar",
            Self::SevenZip => "7z",
            Self::Gzip => "gzip",
            Self::Pdf => "pdf",
            Self::Unknown => "unknown",
        }
    }

    /// Whether the format is executable code rather than passive data.
    #[must_use]
    pub const fn is_executable(self) -> bool {
        matches!(
            self,
            Self::WindowsExecutable
                | Self::ElfExecutable
                | Self::MachOExecutable
                | Self::ScriptShebang
        )
    }

    /// Whether the format is a video container.
    #[must_use]
    pub const fn is_video_container(self) -> bool {
        matches!(self, Self::Mp4 | Self::Matroska | Self::Avi)
    }

    /// Whether the format is a still image.
    #[must_use]
    pub const fn is_image(self) -> bool {
        matches!(
            self,
            Self::Jpeg | Self::Png | Self::Gif | Self::Tiff | Self::Heif | Self::Webp
        )
    }
}

/// Read the file's leading bytes and classify them.
///
/// # Errors
///
/// Returns an error when the file cannot be opened or read. A file shorter
/// than [`HEADER_LEN`] is classified from whatever bytes it has.
pub fn classify(path: &Path) -> SniffResult<DetectedType> {
    let mut file = File::open(path).map_err(|source| SniffError::Io {
        operation: "classify.open",
        path: path.to_path_buf(),
        source,
    })?;

    let mut header = [0_u8; HEADER_LEN];
    let mut filled = 0;
    // Loop because a single read may return fewer bytes than requested.
    loop {
        let read = file
            .read(&mut header[filled..])
            .map_err(|source| SniffError::Io {
                operation: "classify.read",
                path: path.to_path_buf(),
                source,
            })?;
        if read == 0 {
            break;
        }
        filled += read;
        if filled == HEADER_LEN {
            break;
        }
    }

    Ok(classify_bytes(&header[..filled]))
}

/// Classify an already-read prefix. Pure; suitable for table-driven tests.
#[must_use]
pub fn classify_bytes(header: &[u8]) -> DetectedType {
    if let Some(kind) = match_executable(header) {
        return kind;
    }
    if let Some(kind) = match_image(header) {
        return kind;
    }
    if let Some(kind) = match_container(header) {
        return kind;
    }
    if let Some(kind) = match_archive(header) {
        return kind;
    }
    DetectedType::Unknown
}

fn match_executable(header: &[u8]) -> Option<DetectedType> {
    const MACH_O: &[[u8; 4]] = &[
        [0xFE, 0xED, 0xFA, 0xCE],
        [0xFE, 0xED, 0xFA, 0xCF],
        [0xCE, 0xFA, 0xED, 0xFE],
        [0xCF, 0xFA, 0xED, 0xFE],
        [0xCA, 0xFE, 0xBA, 0xBE],
    ];

    if header.starts_with(b"MZ") {
        return Some(DetectedType::WindowsExecutable);
    }
    if header.starts_with(&[0x7F, b'E', b'L', b'F']) {
        return Some(DetectedType::ElfExecutable);
    }
    if header.len() >= 4 && MACH_O.iter().any(|magic| header.starts_with(magic)) {
        return Some(DetectedType::MachOExecutable);
    }
    if header.starts_with(b"#!") {
        return Some(DetectedType::ScriptShebang);
    }
    None
}

fn match_image(header: &[u8]) -> Option<DetectedType> {
    if header.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some(DetectedType::Jpeg);
    }
    if header.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some(DetectedType::Png);
    }
    if header.starts_with(b"GIF87a") || header.starts_with(b"GIF89a") {
        return Some(DetectedType::Gif);
    }
    if header.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || header.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
    {
        return Some(DetectedType::Tiff);
    }
    None
}

fn match_container(header: &[u8]) -> Option<DetectedType> {
    const HEIF_BRANDS: &[&[u8; 4]] = &[b"heic", b"heix", b"hevc", b"mif1", b"msf1", b"avif"];

    // ISO base media: size(4) + "ftyp" + major brand(4).
    if header.len() >= 12 && &header[4..8] == b"ftyp" {
        let brand: &[u8] = &header[8..12];
        if HEIF_BRANDS.iter().any(|candidate| *candidate == brand) {
            return Some(DetectedType::Heif);
        }
        return Some(DetectedType::Mp4);
    }
    if header.starts_with(&[0x1A, 0x45, 0xDF, 0xA3]) {
        return Some(DetectedType::Matroska);
    }
    if header.starts_with(b"RIFF") && header.len() >= 12 {
        return match &header[8..12] {
            b"AVI " => Some(DetectedType::Avi),
            b"WEBP" => Some(DetectedType::Webp),
            _ => None,
        };
    }
    None
}

fn match_archive(header: &[u8]) -> Option<DetectedType> {
    if header.starts_with(&[b'P', b'K', 0x03, 0x04]) || header.starts_with(&[b'P', b'K', 0x05, 0x06])
    {
        return Some(DetectedType::Zip);
    }
    if header.starts_with(b"Rar!\x1A\x07") {
        return Some(DetectedType::Rar);
    }
    if header.starts_with(&[b'7', b'z', 0xBC, 0xAF, 0x27, 0x1C]) {
        return Some(DetectedType::SevenZip);
    }
    if header.starts_with(&[0x1F, 0x8B]) {
        return Some(DetectedType::Gzip);
    }
    if header.starts_with(b"%PDF-") {
        return Some(DetectedType::Pdf);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn padded(prefix: &[u8]) -> Vec<u8> {
        let mut bytes = prefix.to_vec();
        bytes.resize(HEADER_LEN, 0);
        bytes
    }

    #[test]
    fn detects_executables() {
        assert_eq!(
            classify_bytes(&padded(b"MZ\x90\x00")),
            DetectedType::WindowsExecutable
        );
        assert_eq!(
            classify_bytes(&padded(&[0x7F, b'E', b'L', b'F', 0x02])),
            DetectedType::ElfExecutable
        );
        assert_eq!(
            classify_bytes(&padded(&[0xCF, 0xFA, 0xED, 0xFE])),
            DetectedType::MachOExecutable
        );
        assert_eq!(
            classify_bytes(&padded(b"#!/bin/sh\n")),
            DetectedType::ScriptShebang
        );
    }

    #[test]
    fn detects_images() {
        assert_eq!(
            classify_bytes(&padded(&[0xFF, 0xD8, 0xFF, 0xE0])),
            DetectedType::Jpeg
        );
        assert_eq!(
            classify_bytes(&padded(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A])),
            DetectedType::Png
        );
        assert_eq!(classify_bytes(&padded(b"GIF89a")), DetectedType::Gif);
    }

    #[test]
    fn detects_video_containers() {
        let mut mp4 = vec![0x00, 0x00, 0x00, 0x20];
        mp4.extend_from_slice(b"ftypisom");
        assert_eq!(classify_bytes(&padded(&mp4)), DetectedType::Mp4);
        assert!(DetectedType::Mp4.is_video_container());

        let mut heic = vec![0x00, 0x00, 0x00, 0x18];
        heic.extend_from_slice(b"ftypheic");
        assert_eq!(classify_bytes(&padded(&heic)), DetectedType::Heif);
        assert!(DetectedType::Heif.is_image());

        assert_eq!(
            classify_bytes(&padded(&[0x1A, 0x45, 0xDF, 0xA3])),
            DetectedType::Matroska
        );

        let mut avi = b"RIFF\x00\x00\x00\x00".to_vec();
        avi.extend_from_slice(b"AVI ");
        assert_eq!(classify_bytes(&padded(&avi)), DetectedType::Avi);
    }

    #[test]
    fn detects_archives() {
        assert_eq!(
            classify_bytes(&padded(&[b'P', b'K', 0x03, 0x04])),
            DetectedType::Zip
        );
        assert_eq!(classify_bytes(&padded(b"Rar!\x1A\x07\x00")), DetectedType::Rar);
        assert_eq!(classify_bytes(&padded(&[0x1F, 0x8B, 0x08])), DetectedType::Gzip);
        assert_eq!(classify_bytes(&padded(b"%PDF-1.7")), DetectedType::Pdf);
    }

    #[test]
    fn unmatched_prefix_is_unknown() {
        assert_eq!(classify_bytes(&padded(b"hello world")), DetectedType::Unknown);
        assert_eq!(classify_bytes(&[]), DetectedType::Unknown);
        assert!(!DetectedType::Unknown.is_executable());
    }

    #[test]
    fn classify_reads_short_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.bin");
        let mut file = File::create(&path).unwrap();
        file.write_all(b"MZ").unwrap();
        drop(file);

        assert_eq!(classify(&path).unwrap(), DetectedType::WindowsExecutable);
    }

    #[test]
    fn classify_surfaces_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.bin");
        let err = classify(&missing).unwrap_err();
        assert!(matches!(err, SniffError::Io { operation: "classify.open", .. }));
    }

    #[test]
    fn disguised_executable_scenario() {
        // 50 KB "movie.mkv" that actually starts with a PE header.
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movie.mkv");
        let mut payload = vec![0_u8; 50 * 1024];
        payload[0] = 0x4D;
        payload[1] = 0x5A;
        std::fs::write(&path, &payload).unwrap();

        let detected = classify(&path).unwrap();
        assert_eq!(detected, DetectedType::WindowsExecutable);
        assert!(detected.is_executable());
    }
}
