pub mod chat_session;
pub mod poller;
pub mod upload_queue;

pub use chat_session::ChatSession;
pub use poller::{cancel_pair, AnalysisPoller, CancelToken, Canceller, PollConfig, PollReport, TerminalStatus};
pub use upload_queue::{AddOutcome, UploadQueue};
