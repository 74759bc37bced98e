//! Core domain models for the Gista backend.
//!
//! Provides the gist and stored-link records exchanged with the CrewAI
//! production service, the lenient production-status vocabulary, the
//! default-filling normalization applied to client-submitted gists, and a
//! clock abstraction for deterministic testing of timing behavior.
//!
//! # Example
//!
//! A request handler storing a client-submitted gist normalizes the draft,
//! later applies partial updates to the stored record, and records new links
//! together with their placeholder gist:
//!
//! ```
//! use chrono::Utc;
//! use gista_core::{GistDraft, GistUpdate, LinkDraft, ModelError, Segment, StoredLink};
//!
//! # fn main() -> Result<(), ModelError> {
//! let draft = GistDraft {
//!     title: "Rust in production".to_string(),
//!     image_url: "https://example.com/cover.jpg".to_string(),
//!     link: "https://example.com/article".to_string(),
//!     category: "Technology".to_string(),
//!     segments: vec![Segment {
//!         title: "Intro".to_string(),
//!         audio_url: "https://example.com/intro.mp3".to_string(),
//!         duration: "60".to_string(),
//!         index: 4,
//!     }],
//!     ..Default::default()
//! };
//!
//! let mut gist = draft.normalize(Utc::now())?;
//! assert_eq!(gist.segments[0].index, 0);
//!
//! gist.apply_update(&GistUpdate { in_production: Some(true), ..Default::default() });
//! assert!(gist.status.in_production);
//!
//! let link_draft = LinkDraft { url: "https://example.com/paper.pdf".to_string(), ..Default::default() };
//! let mut link = StoredLink::from_draft(link_draft, Utc::now());
//! let placeholder = link.auto_create_gist(Utc::now());
//! assert_eq!(link.gist_created.gist_id.as_deref(), Some(placeholder.gist_id.as_str()));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod time;

pub use error::{ModelError, Result};
pub use models::{
    Gist, GistCreated, GistDraft, GistStatus, GistUpdate, LinkDraft, LinkType, ProductionStatus,
    Segment, StoredLink,
};
pub use time::{Clock, RealClock, TestClock};
