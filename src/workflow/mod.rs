pub mod analysis_flow;
pub mod form_store;
pub mod record_edit;

pub use analysis_flow::{AnalysisFlow, AnalysisOutcome};
pub use form_store::{FormKind, FormSnapshot, FormStore, IngestReport, Submission};
pub use record_edit::RecordEdit;
