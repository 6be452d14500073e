//! Episode identity resolution
//!
//! Assigns a season and episode designator to each remote item. Titles that
//! spell out their numbering ("... EPISODE 3 | Season 1") are parsed
//! literally; all other items are numbered by publish year and a running
//! counter that is threaded through consecutive calls.

use crate::catalog::normalize_title;
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

/// Matches `<title> | ... episode <n> | season <m>`, case-insensitively.
///
/// Group 1 is the display title, group 2 the episode, group 3 the season.
static EXPLICIT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(.*?)\s*\|\s*.*episode\s+(\d+)\s*\|\s*season\s+(\d+)")
        .expect("explicit numbering pattern is valid")
});

/// Errors that can occur while resolving a single item
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    /// The publish timestamp does not start with a four digit year
    #[error("Malformed publish timestamp: {0:?}")]
    MalformedPublishDate(String),

    /// The title announces explicit numbering but does not follow the pattern
    #[error("Title does not match the episode/season pattern: {0:?}")]
    PatternMismatch(String),
}

/// Running cursor over chronologically ordered items
///
/// Only used by the inferred numbering. The initial state has no current
/// season, so the first item of every season is episode one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolverState {
    pub current_season: Option<i32>,
    pub current_episode: u32,
}

/// How a numbering was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberingPolicy {
    /// Parsed out of the title text
    Explicit,
    /// Derived from the publish year and running counter
    Inferred,
    /// Explicit numbering was announced but could not be parsed
    Unresolved,
}

/// Season and episode assigned to one item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeAssignment {
    /// Display title, shortened when explicit numbering was parsed
    pub title: String,
    pub season: String,
    pub episode: String,
    pub policy: NumberingPolicy,
}

/// Result of parsing an explicitly numbered title
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitNumbering {
    pub title: String,
    pub season: String,
    pub episode: String,
}

/// Resolves the season and episode of a single item
///
/// This is a pure function of the item and the prior state: the returned
/// state must be passed to the call for the next item. Items have to be fed
/// in ascending publish order for the inferred episode counter to be right.
///
/// An explicitly numbered title that fails to parse keeps its original title
/// and gets empty designators. It never falls back to inferred numbering and
/// leaves the state untouched.
///
/// # Errors
///
/// Returns `ResolveError::MalformedPublishDate` if no year can be read from
/// `published_at`. The caller is expected to skip the item.
pub fn resolve(
    title: &str,
    published_at: &str,
    season_start_year: i32,
    state: ResolverState,
) -> Result<(EpisodeAssignment, ResolverState), ResolveError> {
    let year = publish_year(published_at)?;

    if announces_explicit_numbering(title) {
        let assignment = match parse_explicit(title) {
            Ok(parsed) => EpisodeAssignment {
                title: parsed.title,
                season: parsed.season,
                episode: parsed.episode,
                policy: NumberingPolicy::Explicit,
            },
            Err(e) => {
                tracing::warn!(title, error = %e, "Problem extracting episode info");
                EpisodeAssignment {
                    title: title.to_string(),
                    season: String::new(),
                    episode: String::new(),
                    policy: NumberingPolicy::Unresolved,
                }
            }
        };
        return Ok((assignment, state));
    }

    let season = year - season_start_year + 1;
    if season < 1 {
        tracing::warn!(
            title,
            year,
            season_start_year,
            "Item was published before the first season"
        );
    }

    let next_state = if state.current_season == Some(season) {
        ResolverState {
            current_season: Some(season),
            current_episode: state.current_episode + 1,
        }
    } else {
        ResolverState {
            current_season: Some(season),
            current_episode: 1,
        }
    };

    let assignment = EpisodeAssignment {
        title: title.to_string(),
        season: format!("{:02}", season),
        episode: format!("{:02}", next_state.current_episode),
        policy: NumberingPolicy::Inferred,
    };

    Ok((assignment, next_state))
}

/// Whether a title spells out its own season and episode
pub fn announces_explicit_numbering(title: &str) -> bool {
    let normalized = normalize_title(title);
    normalized.contains("episode") && normalized.contains("season")
}

/// Parses `<title> | ... EPISODE <n> | Season <m>`
///
/// Before matching, `&` is spelled out as `and` and a lone ` l ` used in
/// place of a bar is turned into `|`. The title is taken from that
/// rewritten text.
pub fn parse_explicit(title: &str) -> Result<ExplicitNumbering, ResolveError> {
    let rewritten = title.replace('&', "and").replace(" l ", "|");

    let captures = EXPLICIT_PATTERN
        .captures(&rewritten)
        .ok_or_else(|| ResolveError::PatternMismatch(title.to_string()))?;

    Ok(ExplicitNumbering {
        title: captures[1].trim().to_string(),
        episode: pad_two(&captures[2]),
        season: pad_two(&captures[3]),
    })
}

/// Extracts the year from the first four characters of a timestamp
pub fn publish_year(published_at: &str) -> Result<i32, ResolveError> {
    published_at
        .get(..4)
        .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| ResolveError::MalformedPublishDate(published_at.to_string()))
}

/// Prefixes a single digit with `0`; longer numbers stay as they are
fn pad_two(digits: &str) -> String {
    if digits.len() == 1 {
        format!("0{}", digits)
    } else {
        digits.to_string()
    }
}
