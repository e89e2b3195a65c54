//! 答题结果写入服务 - 业务能力层
//!
//! 只负责"把一次答题结果追加到结果文件"，不关心流程
//!
//! 文件名以 `.jsonl` / `.json` 结尾时每次写入一行 JSON，否则写入可读文本

use serde_json::json;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::quiz::{QuizSession, ScoreReport};

/// 答题结果写入服务
pub struct ReportWriter {
    report_file_path: String,
}

impl ReportWriter {
    pub fn with_path(path: impl Into<String>) -> Self {
        Self {
            report_file_path: path.into(),
        }
    }

    pub fn path(&self) -> &str {
        &self.report_file_path
    }

    fn is_json(&self) -> bool {
        let lower = self.report_file_path.to_lowercase();
        lower.ends_with(".jsonl") || lower.ends_with(".json")
    }

    /// 追加一次答题结果
    ///
    /// # 参数
    /// - `source_name`: 转录来源名称
    /// - `session`: 答题会话（用于输出题干）
    /// - `report`: 评分结果
    pub async fn write(
        &self,
        source_name: &str,
        session: &QuizSession,
        report: &ScoreReport,
    ) -> AppResult<()> {
        debug!(
            "写入答题结果: {} | 得分 {}/{}",
            source_name,
            report.correct_count,
            report.total()
        );

        let entry = if self.is_json() {
            format_json_line(source_name, session, report)
        } else {
            format_report(source_name, session, report)
        };

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.report_file_path)
            .await
            .map_err(|e| AppError::file_write_failed(&self.report_file_path, e))?;

        file.write_all(entry.as_bytes())
            .await
            .map_err(|e| AppError::file_write_failed(&self.report_file_path, e))?;

        Ok(())
    }
}

impl Default for ReportWriter {
    fn default() -> Self {
        Self::with_path("quiz_results.txt")
    }
}

/// 格式化一次答题结果
pub fn format_report(source_name: &str, session: &QuizSession, report: &ScoreReport) -> String {
    let mut out = format!(
        "{}\n{} | {} | 得分 {}/{}\n",
        "=".repeat(60),
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        source_name,
        report.correct_count,
        report.total()
    );

    for (i, result) in report.per_question_results.iter().enumerate() {
        let mark = if result.is_correct { "✓" } else { "✗" };
        let question = session
            .question(i)
            .map(|q| q.question.as_str())
            .unwrap_or_default();
        out.push_str(&format!(
            "{} 第 {} 题: {} | 你的答案: {} | 正确答案: {}\n",
            mark,
            i + 1,
            question,
            result.chosen.as_deref().unwrap_or("未作答"),
            result.correct
        ));
    }

    out
}

/// 一次答题结果对应一行 JSON
pub fn format_json_line(source_name: &str, session: &QuizSession, report: &ScoreReport) -> String {
    let results: Vec<serde_json::Value> = report
        .per_question_results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            json!({
                "question": session.question(i).map(|q| q.question.as_str()),
                "is_correct": result.is_correct,
                "chosen": result.chosen,
                "correct": result.correct,
            })
        })
        .collect();

    let line = json!({
        "timestamp": chrono::Local::now().to_rfc3339(),
        "source": source_name,
        "correct_count": report.correct_count,
        "total": report.total(),
        "results": results,
    });

    format!("{}\n", line)
}
