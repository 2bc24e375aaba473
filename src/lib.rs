//! Hierarchical download of administrative boundary JSON (nation, province,
//! city, county) from a DataV-style map service into a directory tree.

pub mod area;
pub mod config;
pub mod constants;
pub mod downloader;
pub mod errors;
pub mod fetcher;
pub mod layout;
pub mod logging;
pub mod orchestrator;
pub mod persist;
pub mod planner;
pub mod progress;

pub use area::{AdminLevel, AreaHierarchy, AreaInfo};
pub use config::{CityLevel, FetchSettings, GranularityConfig, NamingMode, ProvinceLevel};
pub use downloader::{DownloadOutcome, Variant, VariantDownloader};
pub use errors::{AppError, AppResult, FetchError};
pub use fetcher::{Fetcher, RetryPolicy};
pub use layout::{Bucket, OutputLayout};
pub use orchestrator::{Orchestrator, RunState, RunSummary};
pub use persist::InFlightSlot;
pub use planner::{DownloadPlan, DownloadTask, ProvincePlan};
pub use progress::{ProgressEvent, ProgressSink, ProgressTracker};
