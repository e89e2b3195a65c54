//! LLM 服务 - 业务能力层
//!
//! 只负责"转录文本纠错"和"根据文本出题"两种能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, LlmError};

/// 转录文本纠错的系统提示词
const CORRECTION_PROMPT: &str = "You are a helpful assistant programmed to make corrections in grammar and structure for text provided. \
For every chunk of text you receive, you will make the necessary corrections. \
Return only the corrected text, without any commentary.";

/// LLM 服务
///
/// 职责：
/// - 纠正转录文本的语法和结构
/// - 根据转录文本生成选择题（原始文本，由 `quiz::parser` 解析）
/// - 不重试，第一次失败直接返回给调用方
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    correction_max_tokens: u32,
    quiz_max_tokens: u32,
    question_count: usize,
}

impl LlmService {
    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Self {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
            correction_max_tokens: config.correction_max_tokens,
            quiz_max_tokens: config.quiz_max_tokens,
            question_count: config.quiz_question_count,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// 通用的 LLM 调用函数
    ///
    /// # 参数
    /// - `user_message`: 用户消息内容
    /// - `system_message`: 系统消息（可选）
    /// - `max_tokens`: 最大输出 token 数
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（已去除首尾空白）
    pub async fn send_to_llm(
        &self,
        user_message: &str,
        system_message: Option<&str>,
        max_tokens: u32,
    ) -> AppResult<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("用户消息长度: {} 字符", user_message.len());

        let api_failed = |e| AppError::llm_api_failed(&self.model_name, e);

        let mut messages = Vec::new();

        if let Some(sys_msg) = system_message {
            let system_msg = ChatCompletionRequestSystemMessageArgs::default()
                .content(sys_msg)
                .build()
                .map_err(api_failed)?;
            messages.push(ChatCompletionRequestMessage::System(system_msg));
        }

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_message)
            .build()
            .map_err(api_failed)?;
        messages.push(ChatCompletionRequestMessage::User(user_msg));

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(max_tokens)
            .build()
            .map_err(api_failed)?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            api_failed(e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })?;

        Ok(content)
    }

    /// 纠正转录文本的语法和结构
    pub async fn correct_transcript(&self, text: &str) -> AppResult<String> {
        debug!("开始纠正转录文本，长度: {} 字符", text.len());
        self.send_to_llm(text, Some(CORRECTION_PROMPT), self.correction_max_tokens)
            .await
    }

    /// 根据文本生成测验
    ///
    /// 返回模型的原始输出，调用方需用 `quiz::parse` 解析
    pub async fn generate_quiz(&self, text: &str) -> AppResult<String> {
        debug!("开始生成测验，题目数量: {}", self.question_count);
        let system_message = build_quiz_prompt(self.question_count);
        self.send_to_llm(text, Some(&system_message), self.quiz_max_tokens)
            .await
    }
}

/// 构建出题的系统提示词
fn build_quiz_prompt(question_count: usize) -> String {
    format!(
        r#"You are a helpful assistant programmed to generate questions based on any text provided. For every chunk of text you receive, you're tasked with designing {count} distinct questions. Each of these questions will be accompanied by 4 possible answers: one correct answer and three incorrect ones.

For clarity and ease of processing, structure your response as a list of lists.

Your output should be shaped as follows:

1. An outer list that contains {count} inner lists.
2. Each inner list represents a set of question and answers, and contains exactly 5 strings in this order:
- The generated question.
- The correct answer.
- The first incorrect answer.
- The second incorrect answer.
- The third incorrect answer.

Your output should mirror this structure:
[
    ["Generated Question 1", "Correct Answer 1", "Incorrect Answer 1.1", "Incorrect Answer 1.2", "Incorrect Answer 1.3"],
    ["Generated Question 2", "Correct Answer 2", "Incorrect Answer 2.1", "Incorrect Answer 2.2", "Incorrect Answer 2.3"],
    ...
]

Respond with the list only. Every answer must be a quoted string, and the correct answer must not repeat any incorrect answer."#,
        count = question_count
    )
}
