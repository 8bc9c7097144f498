// 三层架构模块
pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

// 重新导出主要类型
pub use domain::{
    ExtensionLister, ExtensionListing, SearchError, SearchOptions, SearchResult, SearchType, SearchWorker,
    WorkerContext, WorkerEvent, WorkerHandle, WorkerOutcome,
};
pub use application::{Config, SearchRequest, SearchSession, SessionUpdate};
pub use infrastructure::{ErrorLogger, ErrorType, Logger, LoggerTrait};
pub use presentation::ResultsView;
