//! 日志工具模块
//!
//! 提供日志初始化、格式化和输出的辅助函数

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::quiz::ScoreReport;

/// 初始化日志
///
/// 优先使用 `RUST_LOG`，否则按 `verbose` 选择 debug / info。
/// 日志输出到 stderr，避免干扰 stdout 上的答题界面。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(source: &str, model: &str) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - 视频测验模式");
    info!("📼 转录来源: {}", source);
    info!("🤖 使用模型: {}", model);
    info!("{}", "=".repeat(60));
}

/// 记录测验生成完成
///
/// # 参数
/// - `question_count`: 题目数量
/// - `word_count`: 转录文本词数
pub fn log_quiz_ready(question_count: usize, word_count: usize) {
    info!("✓ 转录文本共 {} 个词", word_count);
    info!("📋 已生成 {} 道题目\n", question_count);
}

/// 打印最终统计信息
///
/// # 参数
/// - `report`: 评分结果
/// - `log_file_path`: 结果记录文件路径
pub fn print_final_stats(report: &ScoreReport, log_file_path: &str) {
    info!("\n{}", "=".repeat(60));
    info!("📊 答题完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 正确: {}/{}", report.correct_count, report.total());
    info!("❌ 错误: {}", report.incorrect_count());
    info!("{}", "=".repeat(60));
    info!("\n结果已保存至: {}", log_file_path);
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
