//! Candidate, Media and the immutable CandidatePool.

use serde::{Deserialize, Serialize};

/// Externally supplied identifier for a candidate (unique within one tournament).
pub type CandidateId = String;

/// Where a candidate's media lives. Resolved once when the pool is ingested.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "url", rename_all = "snake_case")]
pub enum Media {
    Image(String),
    Video(String),
    /// Hosted player (YouTube, Vimeo, ...) rendered through an iframe.
    Embed(String),
}

const EMBED_HOSTS: &[&str] = &[
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    "tiktok.com",
    "twitch.tv",
    "streamable.com",
];

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v", "ogv"];

impl Media {
    /// Classify a raw media reference by host and file extension.
    /// Anything that is neither a known embed host nor a video file is treated as an image.
    pub fn classify(raw: impl Into<String>) -> Self {
        let url = raw.into().trim().to_string();
        let lower = url.to_ascii_lowercase();
        let without_scheme = lower
            .split_once("://")
            .map(|(_, rest)| rest)
            .unwrap_or(&lower);
        let host = without_scheme.split('/').next().unwrap_or("");
        if EMBED_HOSTS
            .iter()
            .any(|h| host == *h || host.ends_with(&format!(".{h}")))
        {
            return Media::Embed(url);
        }
        let path = without_scheme.split(['?', '#']).next().unwrap_or("");
        let is_video = path
            .rsplit_once('.')
            .map(|(_, ext)| VIDEO_EXTENSIONS.contains(&ext))
            .unwrap_or(false);
        if is_video {
            Media::Video(url)
        } else {
            Media::Image(url)
        }
    }

    pub fn url(&self) -> &str {
        match self {
            Media::Image(u) | Media::Video(u) | Media::Embed(u) => u,
        }
    }
}

/// One entry in a tournament: an image or clip participants choose between.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: CandidateId,
    pub name: String,
    pub media: Media,
}

impl Candidate {
    pub fn new(id: impl Into<CandidateId>, name: impl Into<String>, media: Media) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            media,
        }
    }
}

/// The immutable input list for one tournament run.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CandidatePool {
    candidates: Vec<Candidate>,
}

impl CandidatePool {
    pub fn new(candidates: Vec<Candidate>) -> Self {
        Self { candidates }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == id)
    }
}

impl From<Vec<Candidate>> for CandidatePool {
    fn from(candidates: Vec<Candidate>) -> Self {
        Self::new(candidates)
    }
}
