//! 编排层
//!
//! - `App` - 管理一次运行：加载配置、准备测验、答题、记录结果
//! - `QuizRunner` - 终端答题界面：渲染题目、收集选择、展示得分和错题回顾
//!
//! 界面只通过 `QuizSession::set_answer` 写入选择，只通过 `QuizSession::score` 展示结果。

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{error, info};

use crate::config::Config;
use crate::error::{AppError, LlmError, QuizError};
use crate::models::transcript::TranscriptSource;
use crate::quiz::{QuizSession, ScoreReport};
use crate::services::ReportWriter;
use crate::utils::logging::{log_startup, print_final_stats};
use crate::workflow::QuizFlow;

/// 应用主结构
pub struct App {
    config: Config,
    flow: QuizFlow,
    report_writer: ReportWriter,
}

impl App {
    /// 初始化应用
    pub fn initialize(config: Config) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            flow: QuizFlow::new(&config)?,
            report_writer: ReportWriter::with_path(&config.output_log_file),
            config,
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self, source: &TranscriptSource) -> Result<()> {
        log_startup(&source.display_name(), &self.config.llm_model_name);

        let prepared = match self.flow.prepare(source).await {
            Ok(prepared) => prepared,
            Err(e) => {
                error!("❌ {:#}", e);
                if e.downcast_ref::<QuizError>().is_some() {
                    println!("无法生成测验，请重试。");
                } else if let Some(AppError::Llm(LlmError::AuthenticationFailed { .. })) =
                    e.downcast_ref::<AppError>()
                {
                    println!("API Key 无效，请检查并更新 API Key。");
                }
                return Err(e);
            }
        };

        if let Some(corrected) = &prepared.corrected {
            println!("纠正后的转录文本：\n{}\n", corrected);
        }

        let mut session = prepared.session;
        let mut runner = QuizRunner::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());
        let report = runner.run(&mut session).await?;

        self.report_writer
            .write(&prepared.transcript.source_name, &session, &report)
            .await?;

        print_final_stats(&report, self.report_writer.path());
        info!("👋 程序结束");

        Ok(())
    }
}

/// 终端答题界面
pub struct QuizRunner<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> QuizRunner<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    /// 完整答题流程：逐题作答 → 修改答案 → 提交评分
    pub async fn run(&mut self, session: &mut QuizSession) -> Result<ScoreReport> {
        self.print("\n测验时间：检验一下你的理解！\n").await?;

        for index in 0..session.len() {
            if !self.ask_question(session, index).await? {
                break;
            }
        }

        self.revise_answers(session).await?;

        let report = session.score();
        self.render_report(session, &report).await?;

        Ok(report)
    }

    /// 询问一道题，返回 false 表示输入已结束
    async fn ask_question(&mut self, session: &mut QuizSession, index: usize) -> Result<bool> {
        let Some(record) = session.question(index) else {
            return Ok(true);
        };
        let options = session.options(index).unwrap_or_default().to_vec();

        let mut text = format!("\n第 {} 题: {}\n", index + 1, record.question);
        for (i, option) in options.iter().enumerate() {
            let marker = if session.user_choice(index) == Some(i) { "*" } else { " " };
            text.push_str(&format!("{} {}) {}\n", marker, i + 1, option));
        }
        self.print(&text).await?;

        loop {
            self.print(&format!("请选择 (1-{}，回车跳过): ", options.len()))
                .await?;
            let Some(line) = self.read_line().await? else {
                return Ok(false);
            };
            if line.is_empty() {
                return Ok(true);
            }
            match line.parse::<usize>() {
                Ok(choice) if (1..=options.len()).contains(&choice) => {
                    session.set_answer(index, &options[choice - 1])?;
                    return Ok(true);
                }
                _ => self.print("无效的输入，请重新选择。\n").await?,
            }
        }
    }

    /// 提交前允许按题号修改答案，每道题只保留最后一次选择
    async fn revise_answers(&mut self, session: &mut QuizSession) -> Result<()> {
        loop {
            self.print(&format!(
                "\n已作答 {}/{} 题。输入题号修改答案，直接回车提交: ",
                session.answered_count(),
                session.len()
            ))
            .await?;

            let Some(line) = self.read_line().await? else {
                return Ok(());
            };
            if line.is_empty() {
                return Ok(());
            }
            match line.parse::<usize>() {
                Ok(number) if (1..=session.len()).contains(&number) => {
                    if !self.ask_question(session, number - 1).await? {
                        return Ok(());
                    }
                }
                _ => self.print("无效的题号。\n").await?,
            }
        }
    }

    /// 展示得分和错题回顾
    async fn render_report(&mut self, session: &QuizSession, report: &ScoreReport) -> Result<()> {
        let mut text = format!("\n你的得分: {}/{}\n", report.correct_count, report.total());

        if report.is_perfect() {
            text.push_str("🎉 全部答对！\n");
        } else {
            match report.incorrect_count() {
                1 => text.push_str("差一点就全对了！你答错了 1 道题，来回顾一下：\n"),
                n => text.push_str(&format!("快成功了！你答错了 {} 道题，来回顾一下：\n", n)),
            }
            for (index, result) in report.missed() {
                let question = session
                    .question(index)
                    .map(|q| q.question.as_str())
                    .unwrap_or_default();
                text.push_str(&format!(
                    "\n第 {} 题: {}\n  你的答案: {}\n  正确答案: {}\n",
                    index + 1,
                    question,
                    result.chosen.as_deref().unwrap_or("未作答"),
                    result.correct
                ));
            }
        }

        self.print(&text).await
    }

    async fn read_line(&mut self) -> Result<Option<String>> {
        let mut line = String::new();
        let read = self.reader.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    async fn print(&mut self, text: &str) -> Result<()> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
