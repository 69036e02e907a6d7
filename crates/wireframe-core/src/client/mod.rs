//! HTTP client core: URL parsing and the Composed Awaitable that pairs a
//! request emit with a response parse over one connection.

pub mod composed;
pub mod url;

pub use composed::ComposedAwaitable;
pub use url::{parse as parse_url, Scheme, Url};
