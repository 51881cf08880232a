pub mod analysis;
pub mod collected;
pub mod record;
pub mod report;
pub mod upload;

pub use analysis::{CreateAnalysisResponse, FormalAnalysis, JobStatus, StatusResponse};
pub use collected::{ChatRequest, ChatResponse, CollectedData, Message, Sender};
pub use record::{AccidentExplanationRecord, RecordField, StateAuthorityAction, Toggle};
pub use report::{report_field_section, AccidentReportData, WorkArrangement};
pub use upload::{CandidateFile, FileStatus, UploadFile};
