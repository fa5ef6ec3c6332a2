pub mod history;
pub mod recorder;
pub mod types;

pub use history::RollingHistory;
pub use recorder::SessionRecorder;
pub use types::{AnswerSource, Session, SessionManifest, Turn, VoiceSource};
