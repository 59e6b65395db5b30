pub mod config;
pub mod evaluate;
pub mod generate;
pub mod runs;
pub mod search;
pub mod status;

pub use evaluate::run_evaluate;
pub use generate::run_generate;
pub use runs::list_runs;
pub use search::run_search;
pub use status::show_status;
