pub mod llm_service;
pub mod report_writer;
pub mod transcript_service;

pub use llm_service::LlmService;
pub use report_writer::ReportWriter;
pub use transcript_service::TranscriptService;
