//! Outbound notification client for the CrewAI production service.
//!
//! When a gist is created or its production state changes, the backend tells
//! the CrewAI service so it can start or update audio production. This crate
//! implements that call path:
//!
//! 1. **Transport** - one HTTP attempt, 2xx decoded as JSON, everything else
//!    a categorized error
//! 2. **Retry** - fixed delay between a bounded number of attempts
//! 3. **Client** - endpoint construction, authentication headers and the
//!    strict or best-effort result shape for each operation
//!
//! # Example
//!
//! ```no_run
//! use gista_notify::{NotificationClient, NotifyConfig, NotifyError};
//!
//! # async fn example() -> std::result::Result<(), NotifyError> {
//! let config = NotifyConfig::load()?.to_client_config()?;
//! let client = NotificationClient::new(config)?;
//!
//! let result = client.notify_status_change("u1", "g1").await;
//! if let Some(link) = result.link() {
//!     println!("gist published at {link}");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod retry;
pub mod transport;

pub use client::{ClientConfig, NotificationClient, NotificationResult};
pub use config::{NotifyConfig, VarStatus};
pub use error::{NotifyError, Result, TransportError};
pub use retry::RetryPolicy;
pub use transport::{HttpTransport, Transport, TransportRequest};
