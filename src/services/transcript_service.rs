//! 转录文本服务 - 业务能力层
//!
//! 只负责"拿到一段转录文本"，不关心后续如何出题
//!
//! 支持的来源：
//! - `.srt` 字幕文件
//! - 纯文本文件
//! - YouTube 视频字幕（timedtext 接口）

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, TranscriptError};
use crate::models::transcript::{SubtitleCue, Transcript, TranscriptSource};

/// 转录文本服务
pub struct TranscriptService {
    http: reqwest::Client,
    timedtext_url: String,
    language: String,
}

impl TranscriptService {
    pub fn new(config: &Config) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|source| TranscriptError::ClientBuildFailed { source })?;

        Ok(Self {
            http,
            timedtext_url: config.youtube_timedtext_url.clone(),
            language: config.youtube_language.clone(),
        })
    }

    /// 按来源获取转录文本
    pub async fn load(&self, source: &TranscriptSource) -> AppResult<Transcript> {
        let transcript = match source {
            TranscriptSource::SrtFile(path) => self.load_srt_file(path).await?,
            TranscriptSource::TextFile(path) => self.load_text_file(path).await?,
            TranscriptSource::YouTube { video_id } => {
                self.fetch_youtube_transcript(video_id).await?
            }
        };

        info!(
            "✓ 已获取转录文本: {} ({} 个词)",
            transcript.source_name,
            transcript.word_count()
        );

        Ok(transcript)
    }

    /// 读取 .srt 字幕文件并拼接为一段文本
    pub async fn load_srt_file(&self, path: &Path) -> AppResult<Transcript> {
        let bytes = read_bytes(path).await?;
        let content = decode_bytes(&bytes);
        let cues = parse_srt(&content);
        debug!("字幕文件 {} 共 {} 条字幕", path.display(), cues.len());

        let text = join_cues(&cues);
        non_empty(path.display().to_string(), text)
    }

    /// 读取纯文本文件
    pub async fn load_text_file(&self, path: &Path) -> AppResult<Transcript> {
        let bytes = read_bytes(path).await?;
        let text = collapse_whitespace(&decode_bytes(&bytes));
        non_empty(path.display().to_string(), text)
    }

    /// 获取 YouTube 视频的字幕
    pub async fn fetch_youtube_transcript(&self, video_id: &str) -> AppResult<Transcript> {
        debug!("请求视频 {} 的字幕，语言: {}", video_id, self.language);

        let fetch_failed = |source| TranscriptError::FetchFailed {
            video_id: video_id.to_string(),
            source,
        };

        let response = self
            .http
            .get(&self.timedtext_url)
            .query(&[("lang", self.language.as_str()), ("v", video_id)])
            .send()
            .await
            .map_err(fetch_failed)?;

        let status = response.status();
        if !status.is_success() {
            warn!("字幕接口返回错误状态: {}", status);
            return Err(TranscriptError::BadStatus {
                video_id: video_id.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response.text().await.map_err(fetch_failed)?;
        let text = transcript_from_timedtext(&body);

        if text.is_empty() {
            return Err(TranscriptError::Unavailable {
                video_id: video_id.to_string(),
            }
            .into());
        }

        Ok(Transcript::new(video_id, text))
    }
}

async fn read_bytes(path: &Path) -> AppResult<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))
}

fn non_empty(source_name: String, text: String) -> AppResult<Transcript> {
    if text.trim().is_empty() {
        return Err(TranscriptError::Empty { source_name }.into());
    }
    Ok(Transcript::new(source_name, text))
}

// ========== 解析辅助函数 ==========

fn timing_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{1,3})",
        )
        .expect("timing regex is valid")
    })
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?[A-Za-z][^>]*>").expect("tag regex is valid"))
}

fn entity_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"&(#[0-9]+|#[xX][0-9A-Fa-f]+|[A-Za-z]+);").expect("entity regex is valid")
    })
}

fn timedtext_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<text[^>]*>(.*?)</text>").expect("timedtext regex is valid"))
}

/// 字节解码：优先 UTF-8，失败时按 ISO-8859-1 逐字节解码
pub fn decode_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.trim_start_matches('\u{feff}').to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// 解析 SRT 字幕内容
///
/// 没有时间轴的块会被跳过；字幕中的格式标签会被去掉，HTML 实体会被还原。
pub fn parse_srt(content: &str) -> Vec<SubtitleCue> {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    let mut cues = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in normalized.lines().chain(std::iter::once("")) {
        if !line.trim().is_empty() {
            block.push(line.trim());
            continue;
        }
        if block.is_empty() {
            continue;
        }
        if let Some(cue) = parse_block(&block, cues.len() + 1) {
            cues.push(cue);
        }
        block.clear();
    }

    cues
}

fn parse_block(lines: &[&str], fallback_index: usize) -> Option<SubtitleCue> {
    let timing_pos = lines
        .iter()
        .take(2)
        .position(|line| timing_regex().is_match(line))?;
    let caps = timing_regex().captures(lines[timing_pos])?;

    let index = if timing_pos == 1 {
        lines[0].parse().unwrap_or(fallback_index)
    } else {
        fallback_index
    };

    let field = |i: usize| caps.get(i).map(|m| m.as_str()).unwrap_or("0");
    let start = to_duration(field(1), field(2), field(3), field(4));
    let end = to_duration(field(5), field(6), field(7), field(8));

    let text = lines[timing_pos + 1..]
        .iter()
        .map(|line| clean_text(line))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if text.is_empty() {
        return None;
    }

    Some(SubtitleCue {
        index,
        start,
        end,
        text,
    })
}

fn to_duration(hours: &str, minutes: &str, seconds: &str, millis: &str) -> Duration {
    let num = |s: &str| s.parse::<u64>().unwrap_or(0);
    // "5" 表示 500 毫秒
    let millis = format!("{:0<3}", millis);
    Duration::from_millis(
        ((num(hours) * 60 + num(minutes)) * 60 + num(seconds)) * 1000 + num(&millis),
    )
}

/// 所有字幕拼接为一段文本
pub fn join_cues(cues: &[SubtitleCue]) -> String {
    cues.iter()
        .map(|cue| cue.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// 去掉格式标签并还原 HTML 实体
fn clean_text(line: &str) -> String {
    let without_tags = tag_regex().replace_all(line, "");
    collapse_whitespace(&decode_html_entities(&without_tags))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 还原常见 HTML 实体及数字字符引用，无法识别的实体原样保留
pub fn decode_html_entities(text: &str) -> String {
    entity_regex()
        .replace_all(text, |caps: &regex::Captures| {
            let entity = &caps[1];
            let decoded = if let Some(hex) = entity
                .strip_prefix("#x")
                .or_else(|| entity.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32)
            } else if let Some(dec) = entity.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32)
            } else {
                match entity {
                    "amp" => Some('&'),
                    "lt" => Some('<'),
                    "gt" => Some('>'),
                    "quot" => Some('"'),
                    "apos" => Some('\''),
                    "nbsp" => Some(' '),
                    _ => None,
                }
            };
            decoded
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// 从 timedtext XML 中提取字幕文本
///
/// YouTube 的字幕文本会被转义两次（如 `&amp;#39;`），所以解码两遍
pub fn transcript_from_timedtext(xml: &str) -> String {
    timedtext_regex()
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1))
        .map(|m| collapse_whitespace(&decode_html_entities(&decode_html_entities(m.as_str()))))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_SRT: &str = "1\r\n00:00:01,000 --> 00:00:03,500\r\nHello <i>world</i> &amp; friends\r\n\r\n2\r\n00:00:04,000 --> 00:00:06,000\r\nSecond line\r\ncontinues here\r\n\r\n\r\n3\r\n00:00:07,000 --> 00:00:08,000\r\n\r\n";

    #[test]
    fn parses_srt_blocks() {
        let cues = parse_srt(SAMPLE_SRT);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].start, Duration::from_millis(1000));
        assert_eq!(cues[0].end, Duration::from_millis(3500));
        assert_eq!(cues[0].text, "Hello world & friends");
        assert_eq!(cues[1].text, "Second line continues here");
        assert_eq!(
            join_cues(&cues),
            "Hello world & friends Second line continues here"
        );
    }

    #[test]
    fn tolerates_missing_index_lines() {
        let cues = parse_srt("00:01:02.5 --> 00:01:03.000\nNo index\n");
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[0].start, Duration::from_millis(62_500));
    }

    #[test]
    fn skips_blocks_without_timing() {
        assert!(parse_srt("just some text\nwithout timing\n").is_empty());
    }

    #[test]
    fn decodes_entities() {
        assert_eq!(
            decode_html_entities("&lt;b&gt; &#39;hi&#x27; &quot;x&quot; &unknown;"),
            "<b> 'hi' \"x\" &unknown;"
        );
    }

    #[test]
    fn falls_back_to_latin1() {
        assert_eq!(decode_bytes(&[0x63, 0x61, 0x66, 0xE9]), "café");
        assert_eq!(decode_bytes("\u{feff}abc".as_bytes()), "abc");
    }

    #[test]
    fn extracts_timedtext_lines() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?><transcript><text start="0.5" dur="1.2">It&amp;#39;s a</text><text start="1.7" dur="2">test
of &amp;quot;captions&amp;quot;</text></transcript>"#;
        assert_eq!(
            transcript_from_timedtext(xml),
            "It's a test of \"captions\""
        );
        assert_eq!(transcript_from_timedtext("<transcript></transcript>"), "");
    }

    #[tokio::test]
    async fn load_reports_missing_files() {
        let service = TranscriptService::new(&Config::default()).unwrap();
        let result = service
            .load(&TranscriptSource::SrtFile("/definitely/missing.srt".into()))
            .await;
        assert!(matches!(result, Err(AppError::File(_))));
    }

    #[tokio::test]
    async fn load_srt_from_disk() {
        let path = std::env::temp_dir().join(format!(
            "video_quizzer_{}_sample.srt",
            std::process::id()
        ));
        tokio::fs::write(&path, SAMPLE_SRT).await.unwrap();

        let service = TranscriptService::new(&Config::default()).unwrap();
        let transcript = service
            .load(&TranscriptSource::SrtFile(path.clone()))
            .await
            .unwrap();
        let _ = tokio::fs::remove_file(&path).await;

        assert_eq!(
            transcript.text,
            "Hello world & friends Second line continues here"
        );
        assert_eq!(transcript.word_count(), 8);
    }

    #[tokio::test]
    async fn empty_text_file_is_rejected() {
        let path = std::env::temp_dir().join(format!(
            "video_quizzer_{}_empty.txt",
            std::process::id()
        ));
        tokio::fs::write(&path, "   \n ").await.unwrap();

        let service = TranscriptService::new(&Config::default()).unwrap();
        let result = service.load(&TranscriptSource::TextFile(path.clone())).await;
        let _ = tokio::fs::remove_file(&path).await;

        assert!(matches!(
            result,
            Err(AppError::Transcript(TranscriptError::Empty { .. }))
        ));
    }

    #[tokio::test]
    async fn stalled_endpoint_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // 接受连接但从不响应
        let server = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let config = Config {
            youtube_timedtext_url: format!("http://{}/api/timedtext", addr),
            request_timeout_secs: 1,
            ..Config::default()
        };
        let service = TranscriptService::new(&config).unwrap();
        let started = std::time::Instant::now();
        let result = service.fetch_youtube_transcript("SA2iWivDJiE").await;
        server.abort();

        assert!(started.elapsed() < Duration::from_secs(10));
        match result {
            Err(AppError::Transcript(TranscriptError::FetchFailed { source, .. })) => {
                assert!(source.is_timeout())
            }
            other => panic!("意外的结果: {:?}", other.map(|t| t.text)),
        }
    }

    /// 需要网络，手动运行：cargo test fetch_youtube -- --ignored
    #[tokio::test]
    #[ignore]
    async fn fetch_youtube_transcript_live() {
        let _ = tracing_subscriber::fmt::try_init();
        let service = TranscriptService::new(&Config::default()).unwrap();
        match service.fetch_youtube_transcript("SA2iWivDJiE").await {
            Ok(transcript) => assert!(!transcript.text.is_empty()),
            Err(e) => println!("获取字幕失败: {}", e),
        }
    }
}
