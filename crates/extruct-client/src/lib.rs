pub mod extract;
pub mod fetcher;

pub use extract::HtmlExtractor;
pub use fetcher::{FetchConfig, ReqwestFetcher};
