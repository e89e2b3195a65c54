use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

use crate::error::{AppError, AppResult, ConfigError};

/// 默认配置文件名
pub const DEFAULT_CONFIG_FILE: &str = "video_quizzer.toml";

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    /// 转录文本纠错的最大 token 数
    pub correction_max_tokens: u32,
    /// 生成测验的最大 token 数
    pub quiz_max_tokens: u32,
    /// 每次生成的题目数量
    pub quiz_question_count: usize,
    /// 是否先用 LLM 纠正转录文本再出题
    pub correct_transcript: bool,
    // --- 字幕获取配置 ---
    pub youtube_timedtext_url: String,
    pub youtube_language: String,
    /// 字幕请求超时（秒）
    pub request_timeout_secs: u64,
    // --- 会话配置 ---
    /// 固定的选项打乱种子（调试用），None 表示每次随机
    pub shuffle_seed: Option<u64>,
    // --- 日志配置 ---
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 答题结果记录文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.openai.com/v1".to_string(),
            llm_model_name: "gpt-4-1106-preview".to_string(),
            llm_temperature: 0.7,
            correction_max_tokens: 3000,
            quiz_max_tokens: 4096,
            quiz_question_count: 10,
            correct_transcript: true,
            youtube_timedtext_url: "https://www.youtube.com/api/timedtext".to_string(),
            youtube_language: "en".to_string(),
            request_timeout_secs: 30,
            shuffle_seed: None,
            verbose_logging: false,
            output_log_file: "quiz_results.txt".to_string(),
        }
    }
}

impl Config {
    /// 加载配置：默认值 → 配置文件 → 环境变量
    ///
    /// 配置文件路径取 `VIDEO_QUIZZER_CONFIG`，未设置时尝试当前目录下的 `video_quizzer.toml`
    pub fn load() -> AppResult<Self> {
        let explicit_path = std::env::var("VIDEO_QUIZZER_CONFIG").ok();
        Ok(Self::base_config(explicit_path.as_deref())?.with_env_overrides())
    }

    /// 显式指定的配置文件必须可读，默认配置文件不存在时使用默认值
    fn base_config(explicit_path: Option<&str>) -> AppResult<Self> {
        match explicit_path {
            Some(path) => Self::from_toml_file(Path::new(path)),
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_toml_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件读取配置，缺省字段使用默认值
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    pub fn from_toml_str(content: &str, path: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|source| {
            AppError::Config(ConfigError::TomlParseFailed {
                path: path.to_string(),
                source,
            })
        })
    }

    /// 用环境变量覆盖已有配置
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides<F>(self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse_var<T: FromStr>(var: &dyn Fn(&str) -> Option<String>, name: &str) -> Option<T> {
            var(name).and_then(|v| v.trim().parse().ok())
        }
        Self {
            llm_api_key: var("LLM_API_KEY")
                .or_else(|| var("OPENAI_API_KEY"))
                .unwrap_or(self.llm_api_key),
            llm_api_base_url: var("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: var("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
            llm_temperature: parse_var(&var, "LLM_TEMPERATURE").unwrap_or(self.llm_temperature),
            correction_max_tokens: parse_var(&var, "CORRECTION_MAX_TOKENS")
                .unwrap_or(self.correction_max_tokens),
            quiz_max_tokens: parse_var(&var, "QUIZ_MAX_TOKENS").unwrap_or(self.quiz_max_tokens),
            quiz_question_count: parse_var(&var, "QUIZ_QUESTION_COUNT")
                .unwrap_or(self.quiz_question_count),
            correct_transcript: parse_var(&var, "CORRECT_TRANSCRIPT")
                .unwrap_or(self.correct_transcript),
            youtube_timedtext_url: var("YOUTUBE_TIMEDTEXT_URL")
                .unwrap_or(self.youtube_timedtext_url),
            youtube_language: var("YOUTUBE_LANGUAGE").unwrap_or(self.youtube_language),
            request_timeout_secs: parse_var(&var, "REQUEST_TIMEOUT_SECS")
                .unwrap_or(self.request_timeout_secs),
            shuffle_seed: parse_var(&var, "SHUFFLE_SEED").or(self.shuffle_seed),
            verbose_logging: parse_var(&var, "VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            output_log_file: var("OUTPUT_LOG_FILE").unwrap_or(self.output_log_file),
        }
    }

    /// 检查调用 LLM 前必需的配置
    pub fn validate(&self) -> AppResult<()> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey.into());
        }
        Ok(())
    }
}
