//! Dual-channel page fetching.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`WebDriverProtocol`] | Entry point used by the crawler |
//! | [`ResponseAssembler`] | Runs both channels and merges the results |
//! | [`HeaderFetcher`] | Status code and headers over the shared pool |
//! | [`RenderedContentFetcher`] | Post-script `<body>` markup from a browser |
//! | [`Headers`] | Case-insensitive header metadata |
//! | [`PageMetadata`] | Stored page record read and written by a fetch |

// ============================================================================
// Submodules
// ============================================================================

/// Header and status channel.
pub mod headers;

/// Header metadata map.
pub mod metadata;

/// Page metadata.
pub mod page;

/// Protocol entry point.
pub mod protocol;

/// Rendering channel.
pub mod rendered;

/// Response assembly.
pub mod response;

// ============================================================================
// Re-exports
// ============================================================================

pub use headers::{HTTP_DATE_FORMAT, HeaderFetcher, http_date, if_modified_since};
pub use metadata::Headers;
pub use page::{PageField, PageMetadata, WebPage};
pub use protocol::WebDriverProtocol;
pub use rendered::RenderedContentFetcher;
pub use response::{FetchRequest, FetchResponse, ResponseAssembler};
