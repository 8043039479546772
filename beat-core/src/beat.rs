//! Beat catalog model and the feed filter applied to it.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::BeatError;

/// Beats within this many BPM of the requested tempo match a `bpm` filter.
pub const BPM_WINDOW: u32 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    Minor,
    Major,
}

impl Scale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scale::Minor => "minor",
            Scale::Major => "major",
        }
    }
}

impl FromStr for Scale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minor" => Ok(Scale::Minor),
            "major" => Ok(Scale::Major),
            _ => Err("must be one of minor or major".to_string()),
        }
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Musical key of a beat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatNote {
    pub name: String,
    pub scale: Scale,
}

/// A catalog entry. Media paths are object keys in the media bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beat {
    pub id: Uuid,
    pub beatmaker_id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub bpm: u32,
    #[serde(default)]
    pub genres: Vec<String>,
    #[serde(default)]
    pub moods: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub note: Option<BeatNote>,
    pub file_path: String,
    #[serde(default)]
    pub image_path: String,
    #[serde(default)]
    pub archive_path: String,
    #[serde(default)]
    pub is_file_downloaded: bool,
    #[serde(default)]
    pub is_image_downloaded: bool,
    #[serde(default)]
    pub is_archive_downloaded: bool,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Beat {
    pub fn id_string(&self) -> String {
        self.id.to_string()
    }
}

/// Conjunction of optional criteria. A list criterion matches when the beat
/// carries any of the listed values; an empty list places no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFilter {
    pub genres: Vec<String>,
    pub moods: Vec<String>,
    pub tags: Vec<String>,
    pub note: Option<BeatNote>,
    pub bpm: Option<u32>,
}

impl FeedFilter {
    pub fn is_empty(&self) -> bool {
        self.genres.is_empty()
            && self.moods.is_empty()
            && self.tags.is_empty()
            && self.note.is_none()
            && self.bpm.is_none()
    }

    /// Whether `beat` is eligible for the feed under this filter. Beats whose
    /// audio file has not been uploaded yet never match.
    pub fn matches(&self, beat: &Beat) -> bool {
        if !beat.is_file_downloaded {
            return false;
        }
        if !any_of(&self.genres, &beat.genres)
            || !any_of(&self.moods, &beat.moods)
            || !any_of(&self.tags, &beat.tags)
        {
            return false;
        }
        if let Some(note) = &self.note {
            match &beat.note {
                Some(n) if n.scale == note.scale && n.name.eq_ignore_ascii_case(&note.name) => {}
                _ => return false,
            }
        }
        if let Some(bpm) = self.bpm {
            if beat.bpm.abs_diff(bpm) > BPM_WINDOW {
                return false;
            }
        }
        true
    }

    /// Parse `genres`, `moods`, `tags` (comma separated), `note`
    /// (`<name>,<scale>`) and `bpm` from query parameters. All field problems
    /// are reported together in the error's `errors` object.
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, BeatError> {
        let mut errors = Map::new();
        let mut filter = FeedFilter {
            genres: split_list(query.get("genres")),
            moods: split_list(query.get("moods")),
            tags: split_list(query.get("tags")),
            ..Default::default()
        };

        if let Some(raw) = query.get("note").map(|s| s.trim()).filter(|s| !s.is_empty()) {
            let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
            match parts.as_slice() {
                [name, scale] if !name.is_empty() => match scale.parse::<Scale>() {
                    Ok(scale) => {
                        filter.note = Some(BeatNote {
                            name: name.to_string(),
                            scale,
                        })
                    }
                    Err(msg) => push_error(&mut errors, "scale", msg),
                },
                _ => push_error(&mut errors, "note", "must be in form note,scale".to_string()),
            }
        }

        if let Some(raw) = query.get("bpm").map(|s| s.trim()).filter(|s| !s.is_empty()) {
            match raw.parse::<i64>() {
                Ok(bpm) if bpm >= 1 && bpm <= u32::MAX as i64 => filter.bpm = Some(bpm as u32),
                Ok(_) => push_error(&mut errors, "bpm", "must be positive".to_string()),
                Err(_) => push_error(&mut errors, "bpm", "must be integer".to_string()),
            }
        }

        if errors.is_empty() {
            Ok(filter)
        } else {
            Err(BeatError::bad_request("Invalid feed filter")
                .with_reason("ValidationFailed")
                .with_errors(Value::Object(errors)))
        }
    }
}

fn any_of(wanted: &[String], have: &[String]) -> bool {
    wanted.is_empty() || wanted.iter().any(|w| have.iter().any(|h| h.eq_ignore_ascii_case(w)))
}

fn split_list(raw: Option<&String>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

fn push_error(errors: &mut Map<String, Value>, field: &str, msg: String) {
    let entry = errors
        .entry(field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(list) = entry {
        list.push(Value::String(msg));
    }
}
