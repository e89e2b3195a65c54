use std::collections::HashSet;

use video_quizzer::config::Config;
use video_quizzer::models::TranscriptSource;
use video_quizzer::services::TranscriptService;
use video_quizzer::utils::logging;
use video_quizzer::{parse, QuizError, QuizFlow, QuizRunner, QuizSession};

const LLM_OUTPUT: &str = r#"```python
[
    ["What does the mitochondria produce?", "ATP", "DNA", "Glucose", "Oxygen"],
    ["Where does glycolysis happen?", "Cytoplasm", "Nucleus", "Ribosome", "Golgi apparatus"],
    ["How many ATP does glycolysis net?", "2", "4", "36", "0"]
]
```"#;

#[test]
fn every_question_gets_a_permutation_of_its_answers() {
    let questions = parse(LLM_OUTPUT).expect("解析失败");
    assert_eq!(questions.len(), 3);

    for seed in 0..20 {
        let session = QuizSession::start_seeded(questions.clone(), seed);
        assert_eq!(session.len(), questions.len());

        for (i, q) in questions.iter().enumerate() {
            let options = session.options(i).unwrap();
            assert_eq!(options.len(), 4);
            let shown: HashSet<&str> = options.iter().map(String::as_str).collect();
            let mut expected: HashSet<&str> =
                q.incorrect_answers.iter().map(String::as_str).collect();
            expected.insert(q.correct_answer.as_str());
            assert_eq!(shown, expected);
        }
    }
}

#[test]
fn score_matches_selected_positions() {
    let questions = parse(LLM_OUTPUT).unwrap();
    let mut session = QuizSession::start(questions.clone());

    // 第 1 题答对，第 2 题答错，第 3 题不答
    session.set_answer(0, "ATP").unwrap();
    session.set_answer(1, "Nucleus").unwrap();

    let report = session.score();
    assert_eq!(report.correct_count, 1);
    for (i, result) in report.per_question_results.iter().enumerate() {
        let expected = session
            .user_choice(i)
            .map(|choice| session.options(i).unwrap()[choice] == questions[i].correct_answer)
            .unwrap_or(false);
        assert_eq!(result.is_correct, expected);
        assert_eq!(result.correct, questions[i].correct_answer);
    }
    assert_eq!(report.per_question_results[2].chosen, None);
    assert_eq!(report, session.score());
}

#[test]
fn malformed_output_is_rejected_whole() {
    assert!(matches!(
        parse(r#"[["Q1","A","B"]]"#),
        Err(QuizError::MalformedQuestion { index: 0, .. })
    ));
    assert_eq!(parse("[]"), Err(QuizError::EmptyQuiz));
    assert!(matches!(
        parse("Sure! Here is your quiz: [[...]]"),
        Err(QuizError::InvalidLiteral { .. })
    ));
}

#[tokio::test]
async fn srt_file_to_scored_quiz_without_llm() {
    logging::init(false);

    let path = std::env::temp_dir().join(format!(
        "video_quizzer_it_{}.srt",
        std::process::id()
    ));
    tokio::fs::write(
        &path,
        "1\n00:00:00,000 --> 00:00:02,000\nCells make ATP\n\n2\n00:00:02,000 --> 00:00:04,000\nin the mitochondria.\n",
    )
    .await
    .unwrap();

    let config = Config {
        shuffle_seed: Some(5),
        ..Config::default()
    };
    let source = TranscriptSource::from_arg(&path.to_string_lossy()).unwrap();
    let transcript = TranscriptService::new(&config)
        .unwrap()
        .load(&source)
        .await
        .unwrap();
    let _ = tokio::fs::remove_file(&path).await;
    assert_eq!(transcript.text, "Cells make ATP in the mitochondria.");

    let mut session = QuizFlow::new(&config)
        .unwrap()
        .build_session(LLM_OUTPUT)
        .unwrap();
    let atp = session
        .options(0)
        .unwrap()
        .iter()
        .position(|o| o == "ATP")
        .unwrap()
        + 1;

    let input = format!("{}\n\n\n\n", atp);
    let mut runner = QuizRunner::new(input.as_bytes(), Vec::new());
    let report = runner.run(&mut session).await.unwrap();

    assert_eq!(report.correct_count, 1);
    assert_eq!(report.incorrect_count(), 2);
    let output = String::from_utf8(runner.into_writer()).unwrap();
    assert!(output.contains("你的得分: 1/3"));
    assert!(output.contains("正确答案: Cytoplasm"));
}

/// 完整流程（需要 API Key 和网络），手动运行：cargo test -- --ignored
#[tokio::test]
#[ignore]
async fn test_prepare_quiz_from_youtube() {
    logging::init(true);

    let config = Config::from_env();
    config.validate().expect("请先配置 OPENAI_API_KEY");

    let source = TranscriptSource::from_arg("https://youtu.be/SA2iWivDJiE").unwrap();
    let prepared = QuizFlow::new(&config)
        .unwrap()
        .prepare(&source)
        .await
        .expect("准备测验失败");

    assert!(!prepared.session.is_empty());
    assert_eq!(prepared.session.score().correct_count, 0);
}
