//! Request/response wrappers around the Gemini REST API: image editing,
//! grounded cultural search, and video generation. Each call is
//! independent; a failure here never affects the live session.

mod client;
mod images;
mod search;
mod video;

pub use client::{GeminiClient, REST_ENDPOINT};
pub use images::EditedImage;
pub use search::{SearchResult, SearchSource};
