pub mod question;
pub mod transcript;

pub use question::{QuestionRecord, ANSWER_COUNT, INCORRECT_ANSWER_COUNT};
pub use transcript::{extract_video_id, SubtitleCue, Transcript, TranscriptSource};
