//! Program page scraper for ExecAdvisor.
//!
//! Discovers program pages linked from an overview page, fetches them over
//! HTTP (with an optional headless browser fallback) and parses each into a
//! [`RawProgram`](execadvisor_shared::RawProgram).

mod engine;
mod fetcher;
mod parser;

pub use engine::{ScrapeResult, Scraper, discover_links, save_raw};
pub use fetcher::{BrowserFetcher, HttpFetcher, PageFetcher};
pub use parser::ProgramParser;
