pub mod logging;
pub mod error_logging;
pub mod results_file;

pub use logging::{Logger, LoggerTrait};
pub use error_logging::{ErrorLogger, ErrorType};
pub use results_file::{load_results, save_results};
