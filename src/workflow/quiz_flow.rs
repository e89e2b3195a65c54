//! 测验准备流程 - 流程层
//!
//! 核心职责：定义"从一个视频到一份可作答测验"的完整流程
//!
//! 流程顺序：
//! 1. 获取转录文本（字幕文件 / 纯文本 / YouTube）
//! 2. LLM 纠正转录文本（可关闭）
//! 3. LLM 生成测验
//! 4. 解析测验文本 → 创建答题会话（只打乱一次选项）

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppResult, QuizResult};
use crate::models::transcript::{Transcript, TranscriptSource};
use crate::quiz::{self, QuizSession};
use crate::services::{LlmService, TranscriptService};
use crate::utils::logging::{log_quiz_ready, truncate_text};

/// 准备完成的测验
#[derive(Debug)]
pub struct PreparedQuiz {
    /// 原始转录文本
    pub transcript: Transcript,
    /// 纠正后的文本（未开启纠错时为 None）
    pub corrected: Option<String>,
    pub session: QuizSession,
}

/// 测验准备流程
///
/// - 编排完整的准备流程
/// - 只依赖业务能力（services）和测验核心（quiz）
/// - 任何一步失败都直接返回，不重试、不生成部分测验
pub struct QuizFlow {
    transcripts: TranscriptService,
    llm_service: LlmService,
    correct_transcript: bool,
    shuffle_seed: Option<u64>,
}

impl QuizFlow {
    pub fn new(config: &Config) -> AppResult<Self> {
        Ok(Self {
            transcripts: TranscriptService::new(config)?,
            llm_service: LlmService::new(config),
            correct_transcript: config.correct_transcript,
            shuffle_seed: config.shuffle_seed,
        })
    }

    pub async fn prepare(&self, source: &TranscriptSource) -> Result<PreparedQuiz> {
        // ========== 1. 获取转录文本 ==========
        info!("📼 正在获取转录文本: {}", source.display_name());
        let transcript = self
            .transcripts
            .load(source)
            .await
            .with_context(|| format!("无法获取转录文本: {}", source.display_name()))?;

        // ========== 2. 纠正转录文本 ==========
        let corrected = if self.correct_transcript {
            info!("✏️ 正在纠正转录文本...");
            let corrected = self
                .llm_service
                .correct_transcript(&transcript.text)
                .await
                .context("转录文本纠错失败")?;
            info!("✓ 纠正后文本: {}", truncate_text(&corrected, 80));
            Some(corrected)
        } else {
            None
        };

        // ========== 3. 生成测验 ==========
        info!("🧠 正在生成测验...");
        let quiz_source = corrected.as_deref().unwrap_or(&transcript.text);
        let raw = self
            .llm_service
            .generate_quiz(quiz_source)
            .await
            .context("测验生成失败")?;

        // ========== 4. 解析并创建会话 ==========
        let session = self.build_session(&raw).map_err(|e| {
            warn!("⚠️ 无法解析 LLM 输出: {}", truncate_text(&raw, 200));
            e
        })?;

        log_quiz_ready(session.len(), transcript.word_count());

        Ok(PreparedQuiz {
            transcript,
            corrected,
            session,
        })
    }

    /// 解析 LLM 原始输出并创建答题会话
    pub fn build_session(&self, raw: &str) -> QuizResult<QuizSession> {
        let questions = quiz::parse(raw)?;
        for question in &questions {
            debug!("题目: {}", question);
        }
        Ok(match self.shuffle_seed {
            Some(seed) => QuizSession::start_seeded(questions, seed),
            None => QuizSession::start(questions),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QuizError;

    fn flow(seed: Option<u64>) -> QuizFlow {
        QuizFlow::new(&Config {
            shuffle_seed: seed,
            ..Config::default()
        })
        .unwrap()
    }

    const RAW: &str = r#"[["2+2?", "4", "3", "5", "22"], ["Red planet?", "Mars", "Venus", "Earth", "Pluto"]]"#;

    #[test]
    fn build_session_parses_and_starts() {
        let session = flow(None).build_session(RAW).unwrap();
        assert_eq!(session.len(), 2);
        assert_eq!(session.answered_count(), 0);
    }

    #[test]
    fn seeded_flow_is_reproducible() {
        let a = flow(Some(3)).build_session(RAW).unwrap();
        let b = flow(Some(3)).build_session(RAW).unwrap();
        assert_eq!(a.options(0), b.options(0));
        assert_eq!(a.options(1), b.options(1));
    }

    #[test]
    fn malformed_output_produces_no_session() {
        let err = flow(None)
            .build_session(r#"[["2+2?", "4", "3", "5", "22"], ["Q", "A", "B"]]"#)
            .unwrap_err();
        assert!(matches!(err, QuizError::MalformedQuestion { index: 1, .. }));
    }

    #[tokio::test]
    async fn prepare_fails_fast_on_missing_transcript() {
        let result = flow(None)
            .prepare(&TranscriptSource::SrtFile("/no/such/file.srt".into()))
            .await;
        assert!(result.is_err());
    }
}
