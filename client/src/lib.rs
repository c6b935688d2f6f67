pub mod chat;
pub mod config;
pub mod preferences;
pub mod session;
pub mod state;
pub mod storage;

pub use chat::{ChatError, ChatSnapshot, ChatStore};
pub use config::{AppConfig, ReplyPolicy};
pub use session::{SessionState, SessionStore};
pub use state::AppState;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
