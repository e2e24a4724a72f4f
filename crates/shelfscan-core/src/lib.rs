pub mod records;
pub mod session;
pub mod settings;

pub use records::{NormalizedRecord, RawCapture};
pub use session::{PacingConfig, Region, ResultFilters, RetryPolicy, SearchSession, UnknownRegion};
pub use settings::{OutputFormat, Settings, SettingsError};
