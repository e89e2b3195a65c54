//! # Video Quizzer
//!
//! 把视频的转录文本（字幕文件或 YouTube 字幕）变成一份选择题测验
//!
//! ## 架构设计
//!
//! ### ① 测验核心（Quiz）
//! - `quiz/parser` - 把 LLM 输出的"列表的列表"文本解析成题目，只接受固定语法，不执行任何内容
//! - `quiz/session` - 单次答题状态：选项只打乱一次、记录最后一次选择、评分
//!
//! ### ② 业务能力层（Services）
//! - `TranscriptService` - 获取转录文本（.srt / .txt / YouTube）
//! - `LlmService` - 转录文本纠错、生成测验
//! - `ReportWriter` - 追加答题结果到结果文件
//!
//! ### ③ 流程层（Workflow）
//! - `QuizFlow` - 获取文本 → 纠错 → 出题 → 解析 → 创建会话
//!
//! ### ④ 编排层（App）
//! - `App` - 管理一次运行
//! - `QuizRunner` - 终端答题界面
//!
//! ## 模块结构

pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod quiz;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::{App, QuizRunner};
pub use config::Config;
pub use error::{AppError, AppResult, QuizError};
pub use models::{QuestionRecord, Transcript, TranscriptSource};
pub use quiz::{parse, QuestionResult, QuizSession, ScoreReport};
pub use workflow::{PreparedQuiz, QuizFlow};
