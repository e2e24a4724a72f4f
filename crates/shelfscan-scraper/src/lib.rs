pub mod controller;
pub mod error;
pub mod extract;
pub mod normalize;
pub mod pace;
pub mod query;
mod retry;
pub mod selectors;
pub mod session;
pub mod stop;

pub use controller::{SearchOutcome, SearchScraper, StopReason};
pub use error::ScrapeError;
pub use extract::Extractor;
pub use normalize::ProcessReport;
pub use session::{HttpSession, PageSession, SessionConfig};
pub use stop::StopFlag;
