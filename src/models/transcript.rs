//! 转录文本相关的数据结构

use regex::Regex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use crate::error::TranscriptError;

/// 单条字幕
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubtitleCue {
    pub index: usize,
    pub start: Duration,
    pub end: Duration,
    pub text: String,
}

/// 拼接完成的转录文本
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transcript {
    /// 来源名称（文件路径或视频 ID），仅用于日志显示
    pub source_name: String,
    pub text: String,
}

impl Transcript {
    pub fn new(source_name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_name: source_name.into(),
            text: text.into(),
        }
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// 转录文本来源
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptSource {
    /// .srt 字幕文件
    SrtFile(PathBuf),
    /// 纯文本文件
    TextFile(PathBuf),
    /// YouTube 视频（已提取出的视频 ID）
    YouTube { video_id: String },
}

impl TranscriptSource {
    /// 根据命令行参数判断来源
    pub fn from_arg(arg: &str) -> Result<Self, TranscriptError> {
        let arg = arg.trim();
        let lower = arg.to_lowercase();

        if lower.ends_with(".srt") {
            return Ok(TranscriptSource::SrtFile(PathBuf::from(arg)));
        }
        if lower.ends_with(".txt") {
            return Ok(TranscriptSource::TextFile(PathBuf::from(arg)));
        }
        if let Some(video_id) = extract_video_id(arg) {
            return Ok(TranscriptSource::YouTube { video_id });
        }

        Err(TranscriptError::UnsupportedSource {
            input: arg.to_string(),
        })
    }

    pub fn display_name(&self) -> String {
        match self {
            TranscriptSource::SrtFile(path) | TranscriptSource::TextFile(path) => {
                path.display().to_string()
            }
            TranscriptSource::YouTube { video_id } => format!("youtube:{}", video_id),
        }
    }
}

fn video_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?:youtu\.be/|youtube(?:-nocookie)?\.com/(?:watch\?(?:[^#\s]*&)?v=|embed/|v/|shorts/))([A-Za-z0-9_-]{11})",
        )
        .expect("video id regex is valid")
    })
}

/// 从 YouTube 链接中提取视频 ID
///
/// 支持 `youtu.be/ID`、`watch?v=ID`（参数位置任意）、`embed/ID`、`v/ID`、`shorts/ID`
pub fn extract_video_id(url: &str) -> Option<String> {
    video_id_regex()
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
