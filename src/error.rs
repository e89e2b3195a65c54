use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 测验解析 / 会话错误
    #[error("测验错误: {0}")]
    Quiz(#[from] QuizError),
    /// 转录文本获取错误
    #[error("转录文本错误: {0}")]
    Transcript(#[from] TranscriptError),
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
}

/// 测验核心错误
///
/// 解析错误会丢弃整次解析结果，不会产生部分测验。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuizError {
    /// 文本不是合法的嵌套列表字面量
    #[error("无法解析测验文本 (位置 {position}): {message}")]
    InvalidLiteral { position: usize, message: String },
    /// 某道题的结构不符合 [题干, 正确答案, 错误1, 错误2, 错误3]
    #[error("题目 #{index} 格式错误: {reason}")]
    MalformedQuestion { index: usize, reason: String },
    /// 生成结果中没有任何题目
    #[error("测验中没有题目")]
    EmptyQuiz,
    /// 选择的题号或选项不存在
    #[error("无效的选择 (题目 {index}): {choice}")]
    InvalidSelection { index: usize, choice: String },
}

/// 转录文本获取错误
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// 无法识别的输入来源
    #[error("不支持的转录来源: {input}")]
    UnsupportedSource { input: String },
    /// 转录文本为空
    #[error("转录文本为空: {source_name}")]
    Empty { source_name: String },
    /// 请求转录失败
    #[error("获取视频 {video_id} 的字幕失败: {source}")]
    FetchFailed {
        video_id: String,
        #[source]
        source: reqwest::Error,
    },
    /// 服务端返回错误状态码
    #[error("获取视频 {video_id} 的字幕失败: HTTP {status}")]
    BadStatus { video_id: String, status: u16 },
    /// HTTP 客户端创建失败
    #[error("无法创建 HTTP 客户端: {source}")]
    ClientBuildFailed {
        #[source]
        source: reqwest::Error,
    },
    /// 视频没有可用字幕
    #[error("视频 {video_id} 没有可用的字幕，请换一个视频")]
    Unavailable { video_id: String },
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: async_openai::error::OpenAIError,
    },
    /// API Key 无效
    #[error("API Key 无效 (模型: {model})，请检查并更新 API Key")]
    AuthenticationFailed { model: String },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 写入文件失败
    #[error("写入文件失败 ({path}): {source}")]
    WriteFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件解析失败
    #[error("配置文件 {path} 解析失败: {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    /// 缺少 API Key
    #[error("未设置 API Key，请在 .env 或环境变量 OPENAI_API_KEY 中配置")]
    MissingApiKey,
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建文件写入错误
    pub fn file_write_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::WriteFailed {
            path: path.into(),
            source,
        })
    }

    /// 创建 LLM API 调用错误
    ///
    /// 鉴权失败会被单独归类，便于界面提示用户检查 API Key
    pub fn llm_api_failed(
        model: impl Into<String>,
        source: async_openai::error::OpenAIError,
    ) -> Self {
        let model = model.into();
        let message = source.to_string().to_lowercase();
        if message.contains("401")
            || message.contains("invalid api key")
            || message.contains("incorrect api key")
        {
            return AppError::Llm(LlmError::AuthenticationFailed { model });
        }
        AppError::Llm(LlmError::ApiCallFailed { model, source })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

/// 测验核心结果类型
pub type QuizResult<T> = Result<T, QuizError>;
