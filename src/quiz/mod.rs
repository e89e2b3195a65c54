//! 测验核心
//!
//! - `parser` - 将 LLM 输出的文本解析为 [`QuestionRecord`](crate::models::QuestionRecord) 列表
//! - `session` - 单次答题的状态：选项打乱、记录选择、评分
//!
//! 本层不做任何 I/O，所有操作都是同步的。

pub mod parser;
pub mod session;

pub use parser::parse;
pub use session::{QuestionResult, QuizSession, ScoreReport};
