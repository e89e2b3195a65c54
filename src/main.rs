use anyhow::{Context, Result};
use video_quizzer::utils::logging;
use video_quizzer::{App, Config, TranscriptSource};

const USAGE: &str = "用法: video-quizzer <字幕文件.srt | 文本文件.txt | YouTube 链接>";

#[tokio::main]
async fn main() -> Result<()> {
    // 读取 .env（可选）
    dotenv::dotenv().ok();

    // 加载配置
    let config = Config::load()?;

    // 初始化日志
    logging::init(config.verbose_logging);

    let arg = std::env::args().nth(1).context(USAGE)?;
    let source = TranscriptSource::from_arg(&arg).context(USAGE)?;

    // 初始化并运行应用
    App::initialize(config)?.run(&source).await?;

    Ok(())
}
