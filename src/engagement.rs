//! # Engagement
//! Engagement kinds, the static weights table, and the event record that flows
//! from post/comment controllers into the event store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TrendingError;

/// Kind of user action against a post. Wire names match the stream keys
/// (`views`, `likes`, `comments`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementKind {
    Views,
    Likes,
    Comments,
}

impl EngagementKind {
    pub const ALL: [EngagementKind; 3] = [
        EngagementKind::Views,
        EngagementKind::Likes,
        EngagementKind::Comments,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EngagementKind::Views => "views",
            EngagementKind::Likes => "likes",
            EngagementKind::Comments => "comments",
        }
    }
}

impl fmt::Display for EngagementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngagementKind {
    type Err = TrendingError;

    /// Accepts the plural wire names and their singular forms, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "views" | "view" => Ok(EngagementKind::Views),
            "likes" | "like" => Ok(EngagementKind::Likes),
            "comments" | "comment" => Ok(EngagementKind::Comments),
            _ => Err(TrendingError::UnknownEngagementKind(s.to_string())),
        }
    }
}

/// Per-kind score weights. Loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    #[serde(default = "default_views")]
    pub views: f64,
    #[serde(default = "default_likes")]
    pub likes: f64,
    #[serde(default = "default_comments")]
    pub comments: f64,
}

fn default_views() -> f64 {
    1.0
}

fn default_likes() -> f64 {
    3.0
}

fn default_comments() -> f64 {
    5.0
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            views: default_views(),
            likes: default_likes(),
            comments: default_comments(),
        }
    }
}

impl Weights {
    pub fn weight_for(&self, kind: EngagementKind) -> f64 {
        match kind {
            EngagementKind::Views => self.views,
            EngagementKind::Likes => self.likes,
            EngagementKind::Comments => self.comments,
        }
    }

    /// Every weight must be finite and strictly positive.
    pub fn validate(&self) -> anyhow::Result<()> {
        for kind in EngagementKind::ALL {
            let w = self.weight_for(kind);
            if !w.is_finite() || w <= 0.0 {
                anyhow::bail!("weight for `{kind}` must be a positive number, got {w}");
            }
        }
        Ok(())
    }
}

/// One timestamped engagement. `(actor_id, timestamp_ms)` identifies it within
/// its `(post_id, kind)` stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementEvent {
    pub post_id: String,
    pub kind: EngagementKind,
    pub actor_id: String,
    pub timestamp_ms: i64,
}

impl EngagementEvent {
    pub fn new(
        post_id: impl Into<String>,
        kind: EngagementKind,
        actor_id: impl Into<String>,
        timestamp_ms: i64,
    ) -> Self {
        Self {
            post_id: post_id.into(),
            kind,
            actor_id: actor_id.into(),
            timestamp_ms,
        }
    }

    pub fn at(
        post_id: impl Into<String>,
        kind: EngagementKind,
        actor_id: impl Into<String>,
        at: DateTime<Utc>,
    ) -> Self {
        Self::new(post_id, kind, actor_id, at.timestamp_millis())
    }
}

/// Short, stable fingerprint for ids that should not appear raw in logs.
pub(crate) fn anon_id(id: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(id.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
