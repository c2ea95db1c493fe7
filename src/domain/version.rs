use std::sync::LazyLock;

use regex::Regex;

use crate::clock::Clock;
use crate::error::ParseError;

/// Tag used when the repository has never been tagged.
pub const INITIAL_TAG: &str = "v1.0.0";

/// `<prefix><YYYYMMDD>.<minor>` with a greedy prefix.
static DATED_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)([0-9]{8})\.(.+)$").expect("dated tag pattern is valid"));

/// Computes the tag that follows `previous`.
///
/// The scheme is inferred from the shape of the tag:
/// - more than two dot-separated segments: semantic, the last segment is the
///   patch counter and is incremented (`v1.2.3` -> `v1.2.4`)
/// - anything else: dated, `<prefix><YYYYMMDD>.<minor>`. On the same day the
///   minor counter is incremented, otherwise it restarts at 1 with today's date.
///   A tag without an 8-digit date restarts as `<today>.1` and loses its prefix.
///
/// # Example
/// ```ignore
/// assert_eq!(next_version("v3.1.5", &clock)?, "v3.1.6");
/// assert_eq!(next_version("release_20180525.1", &clock)?, "release_20180526.1");
/// ```
pub fn next_version(previous: &str, clock: &dyn Clock) -> Result<String, ParseError> {
    if previous.is_empty() {
        return Ok(INITIAL_TAG.to_string());
    }

    let segments: Vec<&str> = previous.split('.').collect();
    if segments.len() > 2 {
        return next_semantic(previous, &segments);
    }

    next_dated(previous, &clock.today())
}

fn next_semantic(previous: &str, segments: &[&str]) -> Result<String, ParseError> {
    let (leading, last) = segments.split_at(segments.len() - 1);
    let patch = last[0]
        .parse::<u64>()
        .ok()
        .and_then(|patch| patch.checked_add(1))
        .ok_or_else(|| ParseError::InvalidPatch {
            tag: previous.to_string(),
            segment: last[0].to_string(),
        })?;

    Ok(format!("{}.{}", leading.join("."), patch))
}

fn next_dated(previous: &str, today: &str) -> Result<String, ParseError> {
    let Some(captures) = DATED_TAG.captures(previous) else {
        return Ok(format!("{}.1", today));
    };

    let prefix = &captures[1];
    if &captures[2] != today {
        return Ok(format!("{}{}.1", prefix, today));
    }

    let segment = &captures[3];
    let minor = segment
        .parse::<u64>()
        .ok()
        .and_then(|minor| minor.checked_add(1))
        .ok_or_else(|| ParseError::InvalidMinor {
            tag: previous.to_string(),
            segment: segment.to_string(),
        })?;

    Ok(format!("{}{}.{}", prefix, today, minor))
}
