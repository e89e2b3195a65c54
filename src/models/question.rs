use serde::{Deserialize, Serialize};

/// 每道题的错误答案数量
pub const INCORRECT_ANSWER_COUNT: usize = 3;

/// 每道题的选项总数（1 个正确答案 + 3 个错误答案）
pub const ANSWER_COUNT: usize = INCORRECT_ANSWER_COUNT + 1;

/// 一道由 LLM 生成的选择题
///
/// 解析完成后不再修改。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub question: String,
    pub correct_answer: String,
    pub incorrect_answers: [String; INCORRECT_ANSWER_COUNT],
}

impl QuestionRecord {
    pub fn new(
        question: impl Into<String>,
        correct_answer: impl Into<String>,
        incorrect_answers: [String; INCORRECT_ANSWER_COUNT],
    ) -> Self {
        Self {
            question: question.into(),
            correct_answer: correct_answer.into(),
            incorrect_answers,
        }
    }

    /// 答案池：正确答案在前，错误答案依次在后
    pub fn answer_pool(&self) -> [String; ANSWER_COUNT] {
        let [a, b, c] = self.incorrect_answers.clone();
        [self.correct_answer.clone(), a, b, c]
    }
}

impl std::fmt::Display for QuestionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // 截断题干以便日志显示（最多80个字符）
        let preview = if self.question.chars().count() > 80 {
            self.question.chars().take(80).collect::<String>() + "..."
        } else {
            self.question.clone()
        };
        write!(f, "{} [正确答案: {}]", preview, self.correct_answer)
    }
}
