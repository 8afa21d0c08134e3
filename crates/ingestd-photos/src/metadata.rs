//! Classification and capture-time extraction.
//!
//! Capture time is derived from the strongest available source: embedded
//! metadata (EXIF `DateTimeOriginal` for photos, the container track
//! `CreateDate` for videos), then a digit pattern in the filename, then
//! (only when no unsorted directory is configured) the file's mtime.
//! Candidates older than `min_valid_year` are distrusted; epoch-reset
//! cameras stamp files with 1970.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use ingestd_config::OrganizerConfig;
use nom_exif::{EntryValue, MediaParser, MediaSource, TrackInfo, TrackInfoTag};
use ingestd_events::{FileReady, PipelineEvent, Stage};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{PhotosError, PhotosResult};

/// Media kind derived from the configured extension lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Still image.
    Photo,
    /// Video clip.
    Video,
}

impl MediaKind {
    /// Machine-friendly discriminator used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
        }
    }

    /// Filename prefix configured for this kind.
    #[must_use]
    pub fn prefix(self, config: &OrganizerConfig) -> &str {
        match self {
            Self::Photo => &config.photo_prefix,
            Self::Video => &config.video_prefix,
        }
    }
}

/// Where a capture time came from, strongest source first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatetimeSource {
    /// Embedded metadata: EXIF `DateTimeOriginal` or the container track
    /// `CreateDate`.
    Exif,
    /// `YYYYMMDD[_HHMMSS]` digit pattern in the filename.
    FilenamePattern,
    /// Filesystem modification time.
    Mtime,
}

impl DatetimeSource {
    /// Machine-friendly discriminator used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exif => "exif",
            Self::FilenamePattern => "filename",
            Self::Mtime => "mtime",
        }
    }
}

/// A trusted capture time and its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTime {
    /// The capture datetime.
    pub datetime: DateTime<FixedOffset>,
    /// Which source produced it.
    pub source: DatetimeSource,
}

/// A file that passed classification, headed for the organizer.
#[derive(Debug, Clone)]
pub struct ClassifiedFile {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Photo or video, per the configured extension lists.
    pub kind: MediaKind,
    /// Capture time, when a trustworthy one exists.
    pub capture: Option<CaptureTime>,
}

/// Classify inbound files and derive their capture time.
///
/// Files whose extension is in neither configured list produce a terminal
/// [`PipelineEvent::Failed`] and go no further; everything else is forwarded
/// with whatever capture time could be derived.
///
/// # Errors
///
/// Returns an error when a downstream channel closes while files are still
/// arriving.
pub async fn run(
    config: OrganizerConfig,
    mut rx: mpsc::Receiver<FileReady>,
    tx: mpsc::Sender<ClassifiedFile>,
    events_tx: mpsc::Sender<PipelineEvent>,
) -> PhotosResult<()> {
    while let Some(ready) = rx.recv().await {
        let Some(kind) = classify_kind(&ready.path, &config) else {
            events_tx
                .send(PipelineEvent::Failed {
                    path: ready.path,
                    stage: Stage::Metadata,
                    error: "extension is neither photo nor video".to_string(),
                })
                .await
                .map_err(|_| PhotosError::ChannelClosed)?;
            continue;
        };
        let capture = derive_capture_time(&ready.path, kind, &config).await;
        debug!(
            path = %ready.path.display(),
            kind = kind.as_str(),
            source = capture.map_or("none", |c| c.source.as_str()),
            "classified"
        );
        tx.send(ClassifiedFile {
            path: ready.path,
            kind,
            capture,
        })
        .await
        .map_err(|_| PhotosError::ChannelClosed)?;
    }
    Ok(())
}

fn classify_kind(path: &Path, config: &OrganizerConfig) -> Option<MediaKind> {
    let extension = path.extension().and_then(|ext| ext.to_str())?;
    if matches_any(extension, &config.photo_extensions) {
        Some(MediaKind::Photo)
    } else if matches_any(extension, &config.video_extensions) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

fn matches_any(extension: &str, list: &[String]) -> bool {
    list.iter().any(|item| item.eq_ignore_ascii_case(extension))
}

async fn derive_capture_time(
    path: &Path,
    kind: MediaKind,
    config: &OrganizerConfig,
) -> Option<CaptureTime> {
    let owned = path.to_path_buf();
    let embedded = tokio::task::spawn_blocking(move || match kind {
        MediaKind::Photo => exif_datetime(&owned),
        MediaKind::Video => video_datetime(&owned),
    })
    .await
    .ok()
    .flatten();
    if let Some(datetime) = embedded.filter(|dt| dt.year() >= config.min_valid_year) {
        return Some(CaptureTime {
            datetime,
            source: DatetimeSource::Exif,
        });
    }
    if let Some(datetime) = filename_datetime(path).filter(|dt| dt.year() >= config.min_valid_year)
    {
        return Some(CaptureTime {
            datetime,
            source: DatetimeSource::FilenamePattern,
        });
    }
    // Without an unsorted directory every file needs a bucket, so mtime is
    // accepted as the last resort.
    if config.unsorted_dir.is_none() {
        if let Some(datetime) = mtime_datetime(path).await {
            return Some(CaptureTime {
                datetime,
                source: DatetimeSource::Mtime,
            });
        }
    }
    None
}

fn exif_datetime(path: &Path) -> Option<DateTime<FixedOffset>> {
    let file = std::fs::File::open(path).ok()?;
    let mut reader = std::io::BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut reader).ok()?;
    let field = exif.get_field(exif::Tag::DateTimeOriginal, exif::In::PRIMARY)?;
    let exif::Value::Ascii(ref ascii) = field.value else {
        return None;
    };
    let parsed = exif::DateTime::from_ascii(ascii.first()?).ok()?;
    let naive = NaiveDate::from_ymd_opt(
        i32::from(parsed.year),
        u32::from(parsed.month),
        u32::from(parsed.day),
    )?
    .and_hms_opt(
        u32::from(parsed.hour),
        u32::from(parsed.minute),
        u32::from(parsed.second),
    )?;
    let offset = parsed.offset.map_or_else(
        || Utc.fix(),
        |minutes| FixedOffset::east_opt(i32::from(minutes) * 60).unwrap_or_else(|| Utc.fix()),
    );
    offset.from_local_datetime(&naive).single()
}

/// Container track `CreateDate`, as written into MP4/MOV files by phone
/// cameras. Unreadable or metadata-free containers yield `None`.
fn video_datetime(path: &Path) -> Option<DateTime<FixedOffset>> {
    let ms = MediaSource::file_path(path).ok()?;
    if !ms.has_track() {
        return None;
    }
    let mut parser = MediaParser::new();
    let info: TrackInfo = parser.parse(ms).ok()?;
    match info.get(TrackInfoTag::CreateDate) {
        Some(EntryValue::Time(datetime)) => Some(*datetime),
        _ => None,
    }
}

/// Parse `YYYYMMDD[_HHMMSS]` from the digits of the filename stem, as
/// stamped by phone cameras (`IMG_20260211_143022.jpg`).
fn filename_datetime(path: &Path) -> Option<DateTime<FixedOffset>> {
    let stem = path.file_stem()?.to_str()?;
    let digits: String = stem.chars().filter(char::is_ascii_digit).collect();
    if digits.len() >= 14 {
        let naive = NaiveDateTime::parse_from_str(&digits[..14], "%Y%m%d%H%M%S").ok()?;
        return Some(Utc.fix().from_utc_datetime(&naive));
    }
    if digits.len() >= 8 {
        let padded = format!("{}000000", &digits[..8]);
        let naive = NaiveDateTime::parse_from_str(&padded, "%Y%m%d%H%M%S").ok()?;
        return Some(Utc.fix().from_utc_datetime(&naive));
    }
    None
}

async fn mtime_datetime(path: &Path) -> Option<DateTime<FixedOffset>> {
    let meta = tokio::fs::metadata(path).await.ok()?;
    let modified = meta.modified().ok()?;
    Some(DateTime::<Utc>::from(modified).fixed_offset())
}
