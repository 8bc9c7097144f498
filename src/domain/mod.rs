pub mod error;
pub mod search;
pub mod file_walker;
pub mod worker;
pub mod extension_lister;

pub use error::SearchError;
pub use search::{SearchOptions, SearchResult, SearchType, MatchPredicate, TextMatcher};
pub use file_walker::{ExclusionRules, FolderExclusions};
pub use worker::{CancelToken, SearchWorker, WorkerContext, WorkerEvent, WorkerHandle, WorkerOutcome};
pub use extension_lister::{ExtensionLister, ExtensionListing};
