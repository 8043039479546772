//! beat-axum: HTTP transport for Beatflow.
//!
//! Mounts the beat routes under `/v1/beat`:
//!
//! | method | path                 | handler                                 |
//! |--------|----------------------|-----------------------------------------|
//! | GET    | `/{id}/stream`       | range-aware audio delivery (200 / 206)  |
//! | PUT    | `/?name&type&exp&hash` | signed upload                         |
//! | GET    | `/feed`              | next unseen beat for `x-user-id`        |
//! | POST   | `/upload-urls`       | mint object names and upload URLs       |
//! | GET    | `/{id}/archive`      | presigned archive download              |
//!
//! Handler errors render as the structured error JSON with the matching
//! status code.

pub mod app;
mod error;
pub mod params;
pub mod routes;
pub mod state;

pub use app::{beat_app, BeatApp, BEAT_PATH};
pub use error::BeatAxumError;
pub use params::{UserId, USER_ID_HEADER};
pub use routes::feed::FeedItem;
pub use state::BeatState;
