pub mod config;
pub mod deconstruct;
pub mod fingerprint;
pub mod listen;
pub mod recommend;
pub mod search;
pub mod status;
pub mod sync;

pub use config::show_config;
pub use deconstruct::run_deconstruct;
pub use fingerprint::run_fingerprint;
pub use listen::record_listen;
pub use recommend::run_recommend;
pub use search::run_search;
pub use status::show_status;
pub use sync::run_sync;
