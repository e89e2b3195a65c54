//! 测验文本解析器
//!
//! LLM 的输出应当是一个"列表的列表"字面量：
//!
//! ```text
//! [
//!     ["题干", "正确答案", "错误答案1", "错误答案2", "错误答案3"],
//!     ...
//! ]
//! ```
//!
//! 输入来自外部模型，属于不可信内容，这里只接受固定的嵌套列表语法：
//! 列表、单/双引号字符串、数字字面量。其它任何内容都会报错，绝不会被当作代码执行。

use tracing::debug;

use crate::error::{QuizError, QuizResult};
use crate::models::question::{QuestionRecord, INCORRECT_ANSWER_COUNT};

/// 每道题的字段数：题干 + 正确答案 + 3 个错误答案
pub const FIELDS_PER_QUESTION: usize = INCORRECT_ANSWER_COUNT + 2;

/// 最大嵌套层级
const MAX_DEPTH: usize = 16;

/// 解析后的字面量
#[derive(Debug, Clone, PartialEq, Eq)]
enum Literal {
    Text(String),
    List(Vec<Literal>),
}

impl Literal {
    fn kind(&self) -> &'static str {
        match self {
            Literal::Text(_) => "字符串",
            Literal::List(_) => "列表",
        }
    }
}

/// 将 LLM 返回的原始文本解析为题目列表
///
/// 任意一道题格式不对都会让整次解析失败，不会返回部分结果。
/// 不做去重，也不检查内容质量。
pub fn parse(raw_text: &str) -> QuizResult<Vec<QuestionRecord>> {
    let body = strip_code_fence(raw_text);
    let literal = LiteralParser::new(body).parse_document()?;

    let items = match literal {
        Literal::List(items) => items,
        other => {
            return Err(QuizError::InvalidLiteral {
                position: 0,
                message: format!("最外层应为列表，实际为{}", other.kind()),
            })
        }
    };

    if items.is_empty() {
        return Err(QuizError::EmptyQuiz);
    }

    let records = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| to_record(index, item))
        .collect::<QuizResult<Vec<_>>>()?;

    debug!("解析出 {} 道题目", records.len());

    Ok(records)
}

fn to_record(index: usize, item: Literal) -> QuizResult<QuestionRecord> {
    let fields = match item {
        Literal::List(fields) => fields,
        other => {
            return Err(QuizError::MalformedQuestion {
                index,
                reason: format!("应为列表，实际为{}", other.kind()),
            })
        }
    };

    if fields.len() != FIELDS_PER_QUESTION {
        return Err(QuizError::MalformedQuestion {
            index,
            reason: format!(
                "需要 {} 个元素，实际 {} 个",
                FIELDS_PER_QUESTION,
                fields.len()
            ),
        });
    }

    let mut texts = Vec::with_capacity(FIELDS_PER_QUESTION);
    for (position, field) in fields.into_iter().enumerate() {
        match field {
            Literal::Text(text) if !text.trim().is_empty() => texts.push(text),
            Literal::Text(_) => {
                return Err(QuizError::MalformedQuestion {
                    index,
                    reason: format!("第 {} 个元素为空字符串", position + 1),
                })
            }
            Literal::List(_) => {
                return Err(QuizError::MalformedQuestion {
                    index,
                    reason: format!("第 {} 个元素应为字符串，实际为列表", position + 1),
                })
            }
        }
    }

    let mut texts = texts.into_iter();
    let mut next = || texts.next().unwrap_or_default();
    let question = next();
    let correct_answer = next();
    let incorrect_answers = [next(), next(), next()];

    Ok(QuestionRecord {
        question,
        correct_answer,
        incorrect_answers,
    })
}

/// 去掉模型常加的 markdown 代码块包裹（```python ... ```）
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

/// 递归下降解析器，只认识列表、字符串和数字
struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            depth: 0,
        }
    }

    fn parse_document(mut self) -> QuizResult<Literal> {
        self.skip_ws();
        let value = self.parse_value()?;
        self.skip_ws();
        if self.pos < self.src.len() {
            return Err(self.error("列表结束后仍有多余内容"));
        }
        Ok(value)
    }

    fn parse_value(&mut self) -> QuizResult<Literal> {
        match self.peek() {
            Some('[') => self.parse_list(),
            Some(quote @ ('"' | '\'')) => self.parse_string(quote).map(Literal::Text),
            Some(c) if c == '-' || c.is_ascii_digit() => self.parse_number().map(Literal::Text),
            Some(c) => Err(self.error(format!("不支持的字符 '{}'", c))),
            None => Err(self.error("内容意外结束")),
        }
    }

    fn parse_list(&mut self) -> QuizResult<Literal> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(self.error("嵌套层级过深"));
        }
        self.bump(); // '['

        let mut items = Vec::new();
        loop {
            self.skip_ws();
            if self.eat(']') {
                break;
            }
            items.push(self.parse_value()?);
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            if self.eat(']') {
                break;
            }
            return Err(match self.peek() {
                Some(c) => self.error(format!("应为 ',' 或 ']'，实际为 '{}'", c)),
                None => self.error("列表缺少结尾的 ']'"),
            });
        }

        self.depth -= 1;
        Ok(Literal::List(items))
    }

    fn parse_string(&mut self, quote: char) -> QuizResult<String> {
        let start = self.pos;
        self.bump(); // opening quote

        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                self.pos = start;
                return Err(self.error("字符串缺少结尾引号"));
            };
            match c {
                c if c == quote => return Ok(out),
                '\\' => out.push(self.parse_escape()?),
                '\n' => return Err(self.error("字符串中不允许换行")),
                c => out.push(c),
            }
        }
    }

    fn parse_escape(&mut self) -> QuizResult<char> {
        let escaped = self.bump().ok_or_else(|| self.error("转义符后内容意外结束"))?;
        let c = match escaped {
            'n' => '\n',
            't' => '\t',
            'r' => '\r',
            '\\' | '\'' | '"' => escaped,
            'x' => {
                let code = self.read_hex(2, 'x')?;
                char::from_u32(code).ok_or_else(|| self.error("无效的 \\x 转义"))?
            }
            'u' => self.parse_unicode_escape()?,
            '0'..='7' => {
                let mut code = escaped.to_digit(8).unwrap_or_default();
                for _ in 0..2 {
                    match self.peek().and_then(|d| d.to_digit(8)) {
                        Some(digit) => {
                            code = code * 8 + digit;
                            self.bump();
                        }
                        None => break,
                    }
                }
                char::from_u32(code).ok_or_else(|| self.error("无效的八进制转义"))?
            }
            // 未知转义按原样保留
            other => {
                self.pos -= other.len_utf8();
                '\\'
            }
        };
        Ok(c)
    }

    /// `\uXXXX`，高位代理项须紧跟 `\uXXXX` 低位代理项
    fn parse_unicode_escape(&mut self) -> QuizResult<char> {
        let code = self.read_hex(4, 'u')?;
        let code = if (0xD800..0xDC00).contains(&code) {
            if !(self.eat('\\') && self.eat('u')) {
                return Err(
                    self.error(format!("代理项 '\\u{:04x}' 后缺少低位代理项", code)),
                );
            }
            let low = self.read_hex(4, 'u')?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(self.error(format!("无效的低位代理项 '\\u{:04x}'", low)));
            }
            0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00)
        } else {
            code
        };
        char::from_u32(code)
            .ok_or_else(|| self.error(format!("无效的 unicode 转义 '\\u{:04x}'", code)))
    }

    fn read_hex(&mut self, digits: usize, kind: char) -> QuizResult<u32> {
        let mut code = 0;
        for _ in 0..digits {
            let digit = self.peek().and_then(|c| c.to_digit(16)).ok_or_else(|| {
                self.error(format!("\\{} 转义需要 {} 位十六进制数字", kind, digits))
            })?;
            code = code * 16 + digit;
            self.bump();
        }
        Ok(code)
    }

    fn parse_number(&mut self) -> QuizResult<String> {
        let start = self.pos;
        self.eat('-');
        let int_start = self.pos;
        self.take_while(|c| c.is_ascii_digit());
        if self.pos == int_start {
            return Err(self.error("数字格式错误"));
        }
        if self.eat('.') {
            let frac_start = self.pos;
            self.take_while(|c| c.is_ascii_digit());
            if self.pos == frac_start {
                return Err(self.error("数字格式错误"));
            }
        }
        Ok(self.src[start..self.pos].to_string())
    }

    fn skip_ws(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> QuizError {
        QuizError::InvalidLiteral {
            position: self.pos,
            message: message.into(),
        }
    }
}
