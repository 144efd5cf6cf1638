//! Command implementations for the CLI.

mod analyze;
mod chat;
mod devices;
mod history;
mod protocols;
mod serve;
mod settings;
mod watch;

pub use analyze::{AnalyzeArgs, cmd_analyze};
pub use chat::cmd_chat;
pub use devices::cmd_devices;
pub use history::{HistoryArgs, cmd_history};
pub use protocols::cmd_protocols;
pub use serve::cmd_serve;
pub use settings::cmd_settings;
pub use watch::{WatchArgs, cmd_watch};
