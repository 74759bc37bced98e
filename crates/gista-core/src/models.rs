//! Gist and link records with their default-filling normalization.
//!
//! Field names follow the wire format shared with the CrewAI production
//! service, which mixes camelCase (`gistId`, `inProduction`) and snake_case
//! (`image_url`, `production_status`) keys. Rust fields are snake_case
//! throughout and renamed at the serde boundary.

use std::{fmt, str::FromStr};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ModelError, Result};

/// Publisher recorded on gists that do not name one.
pub const DEFAULT_PUBLISHER: &str = "theNewGista";

/// Status label given to freshly created gists.
pub const DEFAULT_PRODUCTION_STATUS: &str = "Reviewing Content";

/// Category recorded on links submitted without one.
pub const DEFAULT_LINK_CATEGORY: &str = "Uncategorized";

/// Lifecycle label for a gist's content-generation pipeline.
///
/// The production service owns the transitions; this side only names the
/// states it may request in batch updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductionStatus {
    /// Not yet submitted for production.
    Draft,
    /// Content is being reviewed.
    #[default]
    Review,
    /// Content has been published.
    Published,
}

impl ProductionStatus {
    /// All statuses accepted by the production service.
    pub const ALL: [Self; 3] = [Self::Draft, Self::Review, Self::Published];

    /// Returns the wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Review => "review",
            Self::Published => "published",
        }
    }

    /// Parses a status, mapping anything unrecognized to `Review`.
    ///
    /// Matching is exact: `"Draft"` and `" draft"` both coerce to `Review`.
    pub fn coerce(value: &str) -> Self {
        value.parse().unwrap_or(Self::Review)
    }
}

impl FromStr for ProductionStatus {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| ModelError::UnknownStatus { value: value.to_string() })
    }
}

impl fmt::Display for ProductionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Production state embedded in every gist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistStatus {
    /// Free-form label owned by the production service.
    #[serde(default = "default_production_status")]
    pub production_status: String,
    /// Whether the gist has been handed to production.
    #[serde(rename = "inProduction", default)]
    pub in_production: bool,
}

impl Default for GistStatus {
    fn default() -> Self {
        Self { production_status: default_production_status(), in_production: false }
    }
}

fn default_production_status() -> String {
    DEFAULT_PRODUCTION_STATUS.to_string()
}

/// One audio segment of a gist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Segment {
    /// Segment title.
    pub title: String,
    /// Location of the rendered audio.
    pub audio_url: String,
    /// Duration in seconds, kept as the string the client sent.
    pub duration: String,
    /// Position within the gist.
    #[serde(default)]
    pub index: u32,
}

/// Client-submitted gist before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GistDraft {
    /// Gist title.
    #[serde(default)]
    pub title: String,
    /// Cover image.
    #[serde(default)]
    pub image_url: String,
    /// URL of the source content.
    #[serde(default)]
    pub link: String,
    /// Category name.
    #[serde(default)]
    pub category: String,
    /// Identifier of the link this gist was generated from.
    #[serde(default)]
    pub link_id: String,
    /// Audio segments; must not be empty.
    #[serde(default)]
    pub segments: Vec<Segment>,
    /// Caller-chosen identifier, generated when absent.
    #[serde(rename = "gistId", default, skip_serializing_if = "Option::is_none")]
    pub gist_id: Option<String>,
    /// Whether playback has finished.
    #[serde(rename = "isFinished", default, skip_serializing_if = "Option::is_none")]
    pub is_finished: Option<bool>,
    /// Total playback duration in seconds.
    #[serde(rename = "playbackDuration", default, skip_serializing_if = "Option::is_none")]
    pub playback_duration: Option<u64>,
    /// Current playback position in seconds.
    #[serde(rename = "playbackTime", default, skip_serializing_if = "Option::is_none")]
    pub playback_time: Option<u64>,
    /// Publisher name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    /// Rating count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings: Option<u32>,
    /// Number of users who interacted with the gist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<u64>,
    /// Creation timestamp (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<String>,
}

impl GistDraft {
    /// Checks required fields in the order the backend reports them.
    ///
    /// # Errors
    ///
    /// Returns `ModelError::MissingField` for the first blank required field,
    /// or `ModelError::EmptySegments` when no segment is supplied.
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("title", &self.title),
            ("link", &self.link),
            ("image_url", &self.image_url),
            ("category", &self.category),
        ];

        if let Some((field, _)) = required.into_iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ModelError::missing(field));
        }

        if self.segments.is_empty() {
            return Err(ModelError::EmptySegments);
        }

        Ok(())
    }

    /// Validates the draft and fills every optional field with its default.
    ///
    /// Segments are re-indexed by position so the stored order is the only
    /// source of truth for `index`.
    ///
    /// # Errors
    ///
    /// Propagates validation failures from [`GistDraft::validate`].
    pub fn normalize(self, now: DateTime<Utc>) -> Result<Gist> {
        self.validate()?;

        let segments = self
            .segments
            .into_iter()
            .enumerate()
            .map(|(position, segment)| Segment {
                index: u32::try_from(position).unwrap_or(u32::MAX),
                ..segment
            })
            .collect();

        Ok(Gist {
            gist_id: self.gist_id.filter(|id| !id.is_empty()).unwrap_or_else(new_gist_id),
            title: self.title,
            image_url: self.image_url,
            link: self.link,
            category: self.category,
            link_id: self.link_id,
            segments,
            is_finished: self.is_finished.unwrap_or(false),
            is_played: false,
            is_published: true,
            playback_duration: self.playback_duration.unwrap_or(0),
            playback_time: self.playback_time.unwrap_or(0),
            publisher: self
                .publisher
                .filter(|publisher| !publisher.is_empty())
                .unwrap_or_else(|| DEFAULT_PUBLISHER.to_string()),
            ratings: self.ratings.unwrap_or(0),
            users: self.users.unwrap_or(0),
            date_created: self.date_created.unwrap_or_else(|| timestamp(now)),
            status: GistStatus::default(),
        })
    }
}

/// A fully populated gist record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gist {
    /// Unique identifier.
    #[serde(rename = "gistId")]
    pub gist_id: String,
    /// Gist title.
    pub title: String,
    /// Cover image.
    pub image_url: String,
    /// URL of the source content.
    pub link: String,
    /// Category name.
    pub category: String,
    /// Identifier of the originating link.
    #[serde(default)]
    pub link_id: String,
    /// Audio segments ordered by `index`.
    #[serde(default)]
    pub segments: Vec<Segment>,
    /// Whether playback has finished.
    #[serde(rename = "isFinished", default)]
    pub is_finished: bool,
    /// Whether the gist has been played.
    #[serde(default)]
    pub is_played: bool,
    /// Whether the gist is visible to listeners.
    #[serde(default = "default_true")]
    pub is_published: bool,
    /// Total playback duration in seconds.
    #[serde(rename = "playbackDuration", default)]
    pub playback_duration: u64,
    /// Current playback position in seconds.
    #[serde(rename = "playbackTime", default)]
    pub playback_time: u64,
    /// Publisher name.
    #[serde(default = "default_publisher")]
    pub publisher: String,
    /// Rating count.
    #[serde(default)]
    pub ratings: u32,
    /// Number of users who interacted with the gist.
    #[serde(default)]
    pub users: u64,
    /// Creation timestamp (RFC 3339).
    #[serde(default)]
    pub date_created: String,
    /// Production state.
    #[serde(default)]
    pub status: GistStatus,
}

fn default_true() -> bool {
    true
}

fn default_publisher() -> String {
    DEFAULT_PUBLISHER.to_string()
}

impl Gist {
    /// Builds the placeholder gist auto-created when a link is stored.
    ///
    /// The placeholder has no segments; the production service fills them
    /// in once it picks the gist up.
    pub fn placeholder_for(link: &StoredLink, now: DateTime<Utc>) -> Self {
        let source = &link.gist_created;

        Self {
            gist_id: source.gist_id.clone().unwrap_or_else(new_gist_id),
            title: source.link_title.clone(),
            image_url: source.image_url.clone().unwrap_or_default(),
            link: source.url.clone(),
            category: link.category.clone(),
            link_id: source.link_id.clone(),
            segments: Vec::new(),
            is_finished: false,
            is_played: false,
            is_published: true,
            playback_duration: 0,
            playback_time: 0,
            publisher: DEFAULT_PUBLISHER.to_string(),
            ratings: 0,
            users: 0,
            date_created: timestamp(now),
            status: GistStatus::default(),
        }
    }

    /// Applies a partial update; absent fields keep their current value.
    pub fn apply_update(&mut self, update: &GistUpdate) {
        if let Some(in_production) = update.in_production {
            self.status.in_production = in_production;
        }
        if let Some(production_status) = &update.production_status {
            self.status.production_status.clone_from(production_status);
        }
        if let Some(is_played) = update.is_played {
            self.is_played = is_played;
        }
        if let Some(ratings) = update.ratings {
            self.ratings = ratings;
        }
        if let Some(users) = update.users {
            self.users = users;
        }
    }
}

/// Partial gist update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistUpdate {
    /// New production flag.
    #[serde(rename = "inProduction", default, skip_serializing_if = "Option::is_none")]
    pub in_production: Option<bool>,
    /// New production label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub production_status: Option<String>,
    /// New played flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_played: Option<bool>,
    /// New rating count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ratings: Option<u32>,
    /// New user count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<u64>,
}

/// Kind of content behind a stored link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkType {
    /// PDF document.
    #[serde(rename = "PDF")]
    Pdf,
    /// Any other web page.
    #[serde(rename = "Web")]
    Web,
}

impl LinkType {
    /// Classifies a URL by its extension.
    pub fn for_url(url: &str) -> Self {
        if url.to_ascii_lowercase().ends_with(".pdf") {
            Self::Pdf
        } else {
            Self::Web
        }
    }
}

/// Link as submitted by a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkDraft {
    /// Target URL.
    pub url: String,
    /// Display title.
    #[serde(default)]
    pub title: Option<String>,
    /// Category name.
    #[serde(default)]
    pub category: Option<String>,
    /// Preview image.
    #[serde(default)]
    pub image_url: Option<String>,
}

/// Gist bookkeeping nested in every stored link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GistCreated {
    /// Whether a gist exists for this link.
    pub gist_created: bool,
    /// Identifier of that gist.
    pub gist_id: Option<String>,
    /// Preview image.
    pub image_url: Option<String>,
    /// Identifier of the link itself.
    pub link_id: String,
    /// Display title.
    pub link_title: String,
    /// Kind of content.
    pub link_type: LinkType,
    /// Target URL.
    pub url: String,
}

/// A link stored under a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredLink {
    /// Category name.
    pub category: String,
    /// When the link was stored (RFC 3339).
    pub date_added: String,
    /// Gist bookkeeping.
    pub gist_created: GistCreated,
}

impl StoredLink {
    /// Builds a stored link from a client draft.
    pub fn from_draft(draft: LinkDraft, now: DateTime<Utc>) -> Self {
        let link_type = LinkType::for_url(&draft.url);

        Self {
            category: draft
                .category
                .filter(|category| !category.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LINK_CATEGORY.to_string()),
            date_added: timestamp(now),
            gist_created: GistCreated {
                gist_created: false,
                gist_id: None,
                image_url: draft.image_url,
                link_id: format!("link_{}", now.timestamp_millis()),
                link_title: draft.title.unwrap_or_default(),
                link_type,
                url: draft.url,
            },
        }
    }

    /// Returns the link identifier.
    pub fn link_id(&self) -> &str {
        &self.gist_created.link_id
    }

    /// Records that a gist now exists for this link.
    ///
    /// Without an explicit gist id the link id is reused, keeping the two
    /// records joinable.
    pub fn mark_gist_created(&mut self, gist_id: Option<String>, image_url: Option<String>) {
        let block = &mut self.gist_created;
        block.gist_id = Some(gist_id.unwrap_or_else(|| block.link_id.clone()));
        block.gist_created = true;
        if image_url.is_some() {
            block.image_url = image_url;
        }
    }

    /// Creates the placeholder gist for this link and marks the link.
    pub fn auto_create_gist(&mut self, now: DateTime<Utc>) -> Gist {
        let gist = Gist::placeholder_for(self, now);
        self.mark_gist_created(Some(gist.gist_id.clone()), None);
        gist
    }
}

fn new_gist_id() -> String {
    Uuid::new_v4().to_string()
}

fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).single().unwrap_or_default()
    }

    fn segment(title: &str, index: u32) -> Segment {
        Segment {
            title: title.to_string(),
            audio_url: format!("https://cdn.example.com/{title}.mp3"),
            duration: "120".to_string(),
            index,
        }
    }

    fn draft() -> GistDraft {
        GistDraft {
            title: "Rust in Production".to_string(),
            image_url: "https://example.com/cover.jpg".to_string(),
            link: "https://example.com/article".to_string(),
            category: "Technology".to_string(),
            link_id: "link_1".to_string(),
            segments: vec![segment("intro", 7), segment("body", 3)],
            ..Default::default()
        }
    }

    #[test]
    fn production_status_coercion() {
        assert_eq!(ProductionStatus::coerce("draft"), ProductionStatus::Draft);
        assert_eq!(ProductionStatus::coerce("published"), ProductionStatus::Published);
        assert_eq!(ProductionStatus::coerce("bogus"), ProductionStatus::Review);
        assert_eq!(ProductionStatus::coerce("Draft"), ProductionStatus::Review);
        assert_eq!(ProductionStatus::coerce(""), ProductionStatus::Review);
    }

    #[test]
    fn production_status_serializes_lowercase() {
        let json = serde_json::to_string(&ProductionStatus::Published).unwrap();
        assert_eq!(json, "\"published\"");
    }

    #[test]
    fn normalize_fills_defaults() {
        let gist = draft().normalize(fixed_now()).unwrap();

        assert!(!gist.gist_id.is_empty());
        assert!(!gist.is_finished);
        assert!(!gist.is_played);
        assert!(gist.is_published);
        assert_eq!(gist.playback_duration, 0);
        assert_eq!(gist.playback_time, 0);
        assert_eq!(gist.publisher, DEFAULT_PUBLISHER);
        assert_eq!(gist.ratings, 0);
        assert_eq!(gist.users, 0);
        assert_eq!(gist.date_created, "2024-03-01T12:00:00.000Z");
        assert_eq!(gist.status, GistStatus::default());
    }

    #[test]
    fn normalize_keeps_supplied_values() {
        let gist = GistDraft {
            gist_id: Some("gist-42".to_string()),
            publisher: Some("Someone".to_string()),
            playback_duration: Some(300),
            ratings: Some(4),
            ..draft()
        }
        .normalize(fixed_now())
        .unwrap();

        assert_eq!(gist.gist_id, "gist-42");
        assert_eq!(gist.publisher, "Someone");
        assert_eq!(gist.playback_duration, 300);
        assert_eq!(gist.ratings, 4);
    }

    #[test]
    fn normalize_reindexes_segments() {
        let gist = draft().normalize(fixed_now()).unwrap();
        let indexes: Vec<u32> = gist.segments.iter().map(|s| s.index).collect();
        assert_eq!(indexes, vec![0, 1]);
        assert_eq!(gist.segments[0].title, "intro");
    }

    #[test]
    fn validate_reports_first_missing_field() {
        let missing_link = GistDraft { link: String::new(), image_url: String::new(), ..draft() };
        assert_eq!(missing_link.validate(), Err(ModelError::missing("link")));

        let blank_title = GistDraft { title: "  ".to_string(), ..draft() };
        assert_eq!(blank_title.validate(), Err(ModelError::missing("title")));
    }

    #[test]
    fn validate_rejects_empty_segments() {
        let no_segments = GistDraft { segments: Vec::new(), ..draft() };
        assert_eq!(no_segments.validate(), Err(ModelError::EmptySegments));
    }

    #[test]
    fn gist_wire_names() {
        let gist = draft().normalize(fixed_now()).unwrap();
        let value = serde_json::to_value(&gist).unwrap();

        assert!(value.get("gistId").is_some());
        assert!(value.get("isFinished").is_some());
        assert!(value.get("playbackDuration").is_some());
        assert_eq!(value["status"]["inProduction"], false);
        assert_eq!(value["status"]["production_status"], DEFAULT_PRODUCTION_STATUS);
        assert!(value["segments"][0].get("audioUrl").is_some());
    }

    #[test]
    fn apply_update_only_touches_present_fields() {
        let mut gist = draft().normalize(fixed_now()).unwrap();
        gist.apply_update(&GistUpdate {
            in_production: Some(true),
            ratings: Some(5),
            ..Default::default()
        });

        assert!(gist.status.in_production);
        assert_eq!(gist.status.production_status, DEFAULT_PRODUCTION_STATUS);
        assert_eq!(gist.ratings, 5);
        assert_eq!(gist.users, 0);
    }

    #[test]
    fn link_type_detection() {
        assert_eq!(LinkType::for_url("https://example.com/paper.pdf"), LinkType::Pdf);
        assert_eq!(LinkType::for_url("https://example.com/paper.PDF"), LinkType::Pdf);
        assert_eq!(LinkType::for_url("https://example.com/pdf-guide"), LinkType::Web);
    }

    #[test]
    fn stored_link_defaults() {
        let link = StoredLink::from_draft(
            LinkDraft { url: "https://example.com/a".to_string(), ..Default::default() },
            fixed_now(),
        );

        assert_eq!(link.category, DEFAULT_LINK_CATEGORY);
        assert_eq!(link.link_id(), format!("link_{}", fixed_now().timestamp_millis()));
        assert!(!link.gist_created.gist_created);
        assert_eq!(link.gist_created.gist_id, None);
        assert_eq!(link.gist_created.link_title, "");
        assert_eq!(link.gist_created.link_type, LinkType::Web);
    }

    #[test]
    fn mark_gist_created_falls_back_to_link_id() {
        let mut link = StoredLink::from_draft(
            LinkDraft {
                url: "https://example.com/a".to_string(),
                image_url: Some("https://example.com/a.jpg".to_string()),
                ..Default::default()
            },
            fixed_now(),
        );
        link.mark_gist_created(None, None);

        assert!(link.gist_created.gist_created);
        assert_eq!(link.gist_created.gist_id.as_deref(), Some(link.link_id()));
        assert_eq!(link.gist_created.image_url.as_deref(), Some("https://example.com/a.jpg"));
    }

    #[test]
    fn auto_created_gist_mirrors_link() {
        let mut link = StoredLink::from_draft(
            LinkDraft {
                url: "https://example.com/report.pdf".to_string(),
                title: Some("Quarterly report".to_string()),
                category: Some("Finance".to_string()),
                image_url: None,
            },
            fixed_now(),
        );
        let gist = link.auto_create_gist(fixed_now());

        assert_eq!(gist.title, "Quarterly report");
        assert_eq!(gist.link, "https://example.com/report.pdf");
        assert_eq!(gist.category, "Finance");
        assert_eq!(gist.link_id, link.link_id());
        assert!(gist.segments.is_empty());
        assert!(!gist.status.in_production);
        assert_eq!(link.gist_created.gist_id.as_deref(), Some(gist.gist_id.as_str()));
    }
}
