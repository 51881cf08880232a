pub mod analysis_client;
pub mod chat_client;

pub use analysis_client::{AnalysisApi, AnalysisClient};
pub use chat_client::{ChatAgent, ChatApi, ChatClient};
