//! Camera identity and start time encoded in a video filename.
//!
//! Recorders name their files `CAMERA<id>_<HH:MM:SS>.<DD.MM.YYYY>` followed by
//! an arbitrary suffix, e.g. `CAMERA1_08:07:19.06.04.2025.mp4`. The literal
//! pattern must match from the first character; nothing is extracted from a
//! partial match. A name that matches the pattern but encodes an impossible
//! date or time (month 13, hour 25) is rejected separately.

use std::path::Path;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use regex::Regex;

use crate::error::ScanError;

/// Camera and absolute start time resolved from a filename.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoIdentity {
    pub camera_id: i64,
    pub start: NaiveDateTime,
}

fn filename_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^CAMERA([0-9]+)_([0-9]{2}):([0-9]{2}):([0-9]{2})\.([0-9]{2})\.([0-9]{2})\.([0-9]{4})")
            .expect("filename pattern is a valid regex")
    })
}

/// Parse a bare filename (no directory components).
pub fn parse(filename: &str) -> Result<VideoIdentity, ScanError> {
    let caps = filename_pattern()
        .captures(filename)
        .ok_or_else(|| ScanError::Format(filename.to_string()))?;

    let parse_error = |reason: String| ScanError::Parse {
        filename: filename.to_string(),
        reason,
    };

    let camera_id: i64 = caps[1]
        .parse()
        .map_err(|_| parse_error(format!("camera id {} is out of range", &caps[1])))?;

    // All remaining groups are fixed-width ASCII digits, so these parses cannot fail.
    let field = |idx: usize| caps[idx].parse::<u32>().unwrap_or(u32::MAX);
    let (hour, minute, second) = (field(2), field(3), field(4));
    let (day, month) = (field(5), field(6));
    let year = field(7) as i32;

    let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        parse_error(format!("{:04}-{:02}-{:02} is not a calendar date", year, month, day))
    })?;
    let time = NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(|| {
        parse_error(format!("{:02}:{:02}:{:02} is not a time of day", hour, minute, second))
    })?;

    Ok(VideoIdentity {
        camera_id,
        start: NaiveDateTime::new(date, time),
    })
}

/// Parse the final component of a path.
pub fn parse_path(path: &Path) -> Result<VideoIdentity, ScanError> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| ScanError::Format(path.display().to_string()))?;
    parse(name)
}

/// Render a filename that `parse` maps back to the same camera and start time.
///
/// Sub-second precision is dropped; the grammar only carries whole seconds.
pub fn encode(camera_id: i64, start: NaiveDateTime, extension: &str) -> String {
    format!(
        "CAMERA{}_{:02}:{:02}:{:02}.{:02}.{:02}.{:04}.{}",
        camera_id,
        start.hour(),
        start.minute(),
        start.second(),
        start.day(),
        start.month(),
        start.year(),
        extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn parses_documented_example() {
        let id = parse("CAMERA1_08:07:19.06.04.2025.mp4").unwrap();
        assert_eq!(id.camera_id, 1);
        assert_eq!(id.start, ts(2025, 4, 6, 8, 7, 19));
    }

    #[test]
    fn accepts_any_suffix() {
        let id = parse("CAMERA42_23:59:59.31.12.1999_backup.MOV").unwrap();
        assert_eq!(id.camera_id, 42);
        assert_eq!(id.start, ts(1999, 12, 31, 23, 59, 59));

        let bare = parse("CAMERA3_00:00:00.01.01.2024").unwrap();
        assert_eq!(bare.camera_id, 3);
    }

    #[test]
    fn encode_then_parse_returns_same_values() {
        let cases = [
            (1, ts(2025, 4, 6, 8, 7, 19)),
            (7, ts(2025, 1, 1, 9, 0, 0)),
            (1234, ts(2024, 2, 29, 0, 0, 1)),
        ];
        for (camera_id, start) in cases {
            let name = encode(camera_id, start, "avi");
            let parsed = parse(&name).unwrap();
            assert_eq!(parsed.camera_id, camera_id, "{name}");
            assert_eq!(parsed.start, start, "{name}");
        }
    }

    #[test]
    fn rejects_non_matching_names() {
        for name in [
            "camera1_08:07:19.06.04.2025.mp4",
            "xCAMERA1_08:07:19.06.04.2025.mp4",
            "CAMERA_08:07:19.06.04.2025.mp4",
            "CAMERA1_8:07:19.06.04.2025.mp4",
            "CAMERA1_08:07:19.6.04.2025.mp4",
            "CAMERA1_08:07:19.06.04.25.mp4",
            "CAMERA1_08-07-19.06.04.2025.mp4",
            "CAMERA1_08:07:19.mp4",
            "CAMERA１_08:07:19.06.04.2025.mp4",
            "",
        ] {
            let err = parse(name).unwrap_err();
            assert!(matches!(err, ScanError::Format(_)), "{name}: {err}");
        }
    }

    #[test]
    fn rejects_impossible_calendar_values() {
        for name in [
            "CAMERA1_08:07:19.06.13.2025.mp4",
            "CAMERA1_08:07:19.30.02.2025.mp4",
            "CAMERA1_08:07:19.00.01.2025.mp4",
            "CAMERA1_25:00:00.06.04.2025.mp4",
            "CAMERA1_08:60:00.06.04.2025.mp4",
        ] {
            let err = parse(name).unwrap_err();
            assert!(matches!(err, ScanError::Parse { .. }), "{name}: {err}");
        }
    }

    #[test]
    fn rejects_camera_id_overflow() {
        let err = parse("CAMERA99999999999999999999_08:07:19.06.04.2025.mp4").unwrap_err();
        assert!(matches!(err, ScanError::Parse { .. }));
    }

    #[test]
    fn parse_path_uses_file_name_only() {
        let id = parse_path(Path::new("/srv/videos/CAMERA5_10:00:00.02.03.2025.mp4")).unwrap();
        assert_eq!(id.camera_id, 5);
        assert_eq!(id.start, ts(2025, 3, 2, 10, 0, 0));
    }
}
