//! 测验会话
//!
//! 一次答题对应一个 [`QuizSession`]：
//! - 创建时为每道题打乱一次选项顺序，之后不再改变（重新打乱会让已作答的选择失效）
//! - 每道题只保留用户最后一次的选择
//! - 评分按字符串比较，未作答的题目计为错误

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::debug;

use crate::error::{QuizError, QuizResult};
use crate::models::question::{QuestionRecord, ANSWER_COUNT};

/// 单道题的评分结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionResult {
    pub is_correct: bool,
    /// 用户选择的选项文本，未作答为 None
    pub chosen: Option<String>,
    pub correct: String,
}

/// 整份测验的评分结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreReport {
    pub correct_count: usize,
    pub per_question_results: Vec<QuestionResult>,
}

impl ScoreReport {
    pub fn total(&self) -> usize {
        self.per_question_results.len()
    }

    pub fn incorrect_count(&self) -> usize {
        self.total() - self.correct_count
    }

    pub fn is_perfect(&self) -> bool {
        self.correct_count == self.total()
    }

    /// 答错（含未作答）的题目，附带题目索引
    pub fn missed(&self) -> impl Iterator<Item = (usize, &QuestionResult)> {
        self.per_question_results
            .iter()
            .enumerate()
            .filter(|(_, result)| !result.is_correct)
    }
}

/// 测验会话
#[derive(Debug, Clone)]
pub struct QuizSession {
    questions: Vec<QuestionRecord>,
    randomized_options: Vec<[String; ANSWER_COUNT]>,
    correct_answer_value: Vec<String>,
    user_choice_index: Vec<Option<usize>>,
}

impl QuizSession {
    /// 使用系统随机源创建会话
    pub fn start(questions: Vec<QuestionRecord>) -> Self {
        Self::start_with_rng(questions, &mut rand::thread_rng())
    }

    /// 使用固定种子创建会话，相同种子得到相同的选项顺序
    pub fn start_seeded(questions: Vec<QuestionRecord>, seed: u64) -> Self {
        Self::start_with_rng(questions, &mut StdRng::seed_from_u64(seed))
    }

    pub fn start_with_rng<R: Rng + ?Sized>(questions: Vec<QuestionRecord>, rng: &mut R) -> Self {
        let randomized_options: Vec<[String; ANSWER_COUNT]> = questions
            .iter()
            .map(|q| {
                let mut pool = q.answer_pool();
                pool.shuffle(rng);
                pool
            })
            .collect();

        let correct_answer_value = questions.iter().map(|q| q.correct_answer.clone()).collect();
        let user_choice_index = vec![None; questions.len()];

        debug!("测验会话已创建，共 {} 道题", questions.len());

        Self {
            questions,
            randomized_options,
            correct_answer_value,
            user_choice_index,
        }
    }

    /// 记录用户对第 `index` 题的选择，覆盖之前的选择
    pub fn set_answer(&mut self, index: usize, chosen_text: &str) -> QuizResult<()> {
        let invalid = || QuizError::InvalidSelection {
            index,
            choice: chosen_text.to_string(),
        };

        let options = self.randomized_options.get(index).ok_or_else(invalid)?;
        let position = options
            .iter()
            .position(|option| option == chosen_text)
            .ok_or_else(invalid)?;

        self.user_choice_index[index] = Some(position);
        debug!("题目 {} 选择了选项 {}", index, position);

        Ok(())
    }

    /// 清除第 `index` 题的选择
    pub fn clear_answer(&mut self, index: usize) -> QuizResult<()> {
        let slot = self
            .user_choice_index
            .get_mut(index)
            .ok_or_else(|| QuizError::InvalidSelection {
                index,
                choice: String::new(),
            })?;
        *slot = None;
        Ok(())
    }

    /// 计算得分
    ///
    /// 不修改会话状态，未作答的题目计为错误。
    pub fn score(&self) -> ScoreReport {
        let per_question_results: Vec<QuestionResult> = (0..self.questions.len())
            .map(|i| {
                let chosen = self.chosen_text(i).map(str::to_string);
                let correct = self.correct_answer_value[i].clone();
                QuestionResult {
                    is_correct: chosen.as_deref() == Some(correct.as_str()),
                    chosen,
                    correct,
                }
            })
            .collect();

        let correct_count = per_question_results.iter().filter(|r| r.is_correct).count();

        ScoreReport {
            correct_count,
            per_question_results,
        }
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn questions(&self) -> &[QuestionRecord] {
        &self.questions
    }

    pub fn question(&self, index: usize) -> Option<&QuestionRecord> {
        self.questions.get(index)
    }

    /// 第 `index` 题打乱后的选项（用于界面渲染）
    pub fn options(&self, index: usize) -> Option<&[String]> {
        self.randomized_options.get(index).map(|o| o.as_slice())
    }

    pub fn correct_answer(&self, index: usize) -> Option<&str> {
        self.correct_answer_value.get(index).map(String::as_str)
    }

    /// 第 `index` 题当前选择的选项下标
    pub fn user_choice(&self, index: usize) -> Option<usize> {
        self.user_choice_index.get(index).copied().flatten()
    }

    pub fn chosen_text(&self, index: usize) -> Option<&str> {
        let choice = self.user_choice(index)?;
        self.randomized_options
            .get(index)
            .map(|options| options[choice].as_str())
    }

    pub fn answered_count(&self) -> usize {
        self.user_choice_index.iter().filter(|c| c.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn record(q: &str, correct: &str, wrong: [&str; 3]) -> QuestionRecord {
        QuestionRecord::new(q, correct, wrong.map(String::from))
    }

    fn sample_questions() -> Vec<QuestionRecord> {
        vec![
            record("2+2?", "4", ["3", "5", "22"]),
            record("Capital of France?", "Paris", ["London", "Berlin", "Rome"]),
            record("Red planet?", "Mars", ["Venus", "Earth", "Pluto"]),
        ]
    }

    #[test]
    fn options_are_permutations_of_answer_pool() {
        let questions = sample_questions();
        let session = QuizSession::start(questions.clone());

        assert_eq!(session.len(), questions.len());
        for (i, q) in questions.iter().enumerate() {
            let options = session.options(i).unwrap();
            assert_eq!(options.len(), ANSWER_COUNT);
            let shown: HashSet<&String> = options.iter().collect();
            let pool = q.answer_pool();
            let expected: HashSet<&String> = pool.iter().collect();
            assert_eq!(shown, expected);
            assert_eq!(session.correct_answer(i), Some(q.correct_answer.as_str()));
            assert_eq!(session.user_choice(i), None);
        }
    }

    #[test]
    fn seeded_sessions_are_reproducible() {
        let a = QuizSession::start_seeded(sample_questions(), 7);
        let b = QuizSession::start_seeded(sample_questions(), 7);
        for i in 0..a.len() {
            assert_eq!(a.options(i), b.options(i));
        }
    }

    #[test]
    fn shuffling_moves_the_correct_answer() {
        // 50 个种子下正确答案都在第一位的概率可以忽略
        let positions: HashSet<usize> = (0..50)
            .map(|seed| {
                let session = QuizSession::start_seeded(sample_questions(), seed);
                session
                    .options(0)
                    .unwrap()
                    .iter()
                    .position(|o| o == "4")
                    .unwrap()
            })
            .collect();
        assert!(positions.len() > 1);
    }

    #[test]
    fn end_to_end_single_question() {
        let mut session = QuizSession::start(vec![record("2+2?", "4", ["3", "5", "22"])]);
        assert!(session.options(0).unwrap().contains(&"4".to_string()));

        session.set_answer(0, "4").unwrap();
        let report = session.score();
        assert_eq!(report.correct_count, 1);
        assert_eq!(
            report.per_question_results[0],
            QuestionResult {
                is_correct: true,
                chosen: Some("4".to_string()),
                correct: "4".to_string(),
            }
        );

        session.set_answer(0, "3").unwrap();
        assert_eq!(session.score().correct_count, 0);
    }

    #[test]
    fn last_write_wins() {
        let mut session = QuizSession::start(sample_questions());
        session.set_answer(1, "London").unwrap();
        session.set_answer(1, "Paris").unwrap();

        let position = session
            .options(1)
            .unwrap()
            .iter()
            .position(|o| o == "Paris")
            .unwrap();
        assert_eq!(session.user_choice(1), Some(position));
        assert_eq!(session.chosen_text(1), Some("Paris"));
        assert_eq!(session.answered_count(), 1);
    }

    #[test]
    fn unanswered_questions_score_as_incorrect() {
        let session = QuizSession::start(vec![record("2+2?", "4", ["3", "5", "22"])]);
        let report = session.score();
        assert_eq!(report.correct_count, 0);
        assert_eq!(report.per_question_results[0].chosen, None);
        assert_eq!(report.per_question_results[0].correct, "4");
        assert!(!report.is_perfect());
    }

    #[test]
    fn score_is_idempotent() {
        let mut session = QuizSession::start(sample_questions());
        session.set_answer(0, "4").unwrap();
        session.set_answer(2, "Venus").unwrap();
        assert_eq!(session.score(), session.score());
    }

    #[test]
    fn questions_are_scored_independently() {
        let mut session = QuizSession::start(sample_questions());
        session.set_answer(0, "4").unwrap();
        session.set_answer(1, "Berlin").unwrap();

        let report = session.score();
        let flags: Vec<bool> = report
            .per_question_results
            .iter()
            .map(|r| r.is_correct)
            .collect();
        assert_eq!(flags, vec![true, false, false]);
        assert_eq!(report.correct_count, 1);
        assert_eq!(report.incorrect_count(), 2);

        let missed: Vec<usize> = report.missed().map(|(i, _)| i).collect();
        assert_eq!(missed, vec![1, 2]);
    }

    #[test]
    fn invalid_selections_are_rejected() {
        let mut session = QuizSession::start(sample_questions());
        assert!(matches!(
            session.set_answer(0, "not an option"),
            Err(QuizError::InvalidSelection { index: 0, .. })
        ));
        assert!(matches!(
            session.set_answer(9, "4"),
            Err(QuizError::InvalidSelection { index: 9, .. })
        ));
        // 失败的调用不影响会话
        assert_eq!(session.answered_count(), 0);
    }

    #[test]
    fn failed_selection_keeps_earlier_choice() {
        let mut session = QuizSession::start(sample_questions());
        session.set_answer(0, "4").unwrap();
        let before = session.user_choice(0);

        assert!(matches!(
            session.set_answer(0, "not an option"),
            Err(QuizError::InvalidSelection { index: 0, .. })
        ));
        assert_eq!(session.user_choice(0), before);
        assert_eq!(session.chosen_text(0), Some("4"));
        assert_eq!(session.answered_count(), 1);

        session.set_answer(0, "5").unwrap();
        assert_eq!(session.chosen_text(0), Some("5"));
        assert!(!session.score().per_question_results[0].is_correct);
    }

    #[test]
    fn options_never_change_after_start() {
        let mut session = QuizSession::start(sample_questions());
        let before: Vec<Vec<String>> = (0..session.len())
            .map(|i| session.options(i).unwrap().to_vec())
            .collect();
        session.set_answer(0, "5").unwrap();
        let _ = session.score();
        let after: Vec<Vec<String>> = (0..session.len())
            .map(|i| session.options(i).unwrap().to_vec())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn duplicate_answer_text_still_scores_by_value() {
        let mut session = QuizSession::start(vec![record("Q", "A", ["A", "B", "C"])]);
        session.set_answer(0, "A").unwrap();
        assert_eq!(session.score().correct_count, 1);
    }

    #[test]
    fn clear_answer_resets_selection() {
        let mut session = QuizSession::start(sample_questions());
        session.set_answer(0, "4").unwrap();
        session.clear_answer(0).unwrap();
        assert_eq!(session.user_choice(0), None);
        assert!(session.clear_answer(5).is_err());
    }
}
