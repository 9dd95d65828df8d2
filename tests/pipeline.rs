mod support;

use sqlgrade::{
    grade::{
        Assignment, Pipeline, PipelineError, PropertyLevel, PropertyState, SessionConfig,
        SubmissionInput, default_session, grade_assignment,
    },
    types::DiffEntry,
};
use support::{FixtureBackend, FixtureParser, insert_values, select_ordered, select_star};

const MODEL: &str = "SELECT * FROM t";

fn parser() -> FixtureParser {
    FixtureParser::default()
        .with(MODEL, select_star("t", None))
        .with("SELECT * FROM u", select_star("u", None))
}

fn backend() -> FixtureBackend {
    FixtureBackend::default()
        .rows(MODEL, &[&["1", "Ada"], &["2", "Grace"]])
        .failing("SELECT * FROM u", "connection reset by peer")
}

fn input(id: &str, query: &str) -> SubmissionInput {
    SubmissionInput {
        id:       id.to_string(),
        attempt:  1,
        question: "q1".to_string(),
        query:    query.to_string(),
    }
}

async fn pipeline() -> Pipeline<FixtureParser, FixtureBackend> {
    Pipeline::new(default_session(), parser(), backend(), &[MODEL.to_string()], 4)
        .await
        .expect("pipeline")
}

#[tokio::test]
async fn correct_submission_gets_full_grade() {
    let graded = pipeline().await.run(vec![input("s1", "select *  from T;")]).await;
    let sub = &graded[0];

    assert_eq!(sub.syntax, PropertyState::Correct);
    assert_eq!(sub.results, PropertyState::Correct);
    assert_eq!(sub.semantics, PropertyState::Correct);
    assert_eq!(sub.grade, 1.0);
    assert_eq!(sub.message, "🟢 Correct.");
}

#[tokio::test]
async fn misspelled_keywords_are_repaired_from_the_model() {
    let graded = pipeline().await.run(vec![input("s1", "SELEC * FORM t")]).await;
    let sub = &graded[0];

    assert!(sub.parseable);
    assert_eq!(sub.original_text.as_deref(), Some("SELEC * FORM t"));
    assert_eq!(sub.text, "select * from t");
    assert_eq!(sub.syntax, PropertyState::MinorIncorrect);
    assert_eq!(sub.results, PropertyState::Correct);
    assert!(sub.grade > 0.0 && sub.grade < 1.0);
    assert!(
        sub.message
            .contains("Syntax minor error. The query was changed to 'select * from t'")
    );
}

#[tokio::test]
async fn unparseable_garbage_gets_zero() {
    let graded = pipeline().await.run(vec![input("s1", "zzqxv kkjwq")]).await;
    let sub = &graded[0];

    assert!(!sub.parseable);
    assert_eq!(sub.syntax, PropertyState::Incorrect);
    assert_eq!(sub.semantics, PropertyState::Incorrect);
    assert_eq!(sub.results, PropertyState::Incorrect);
    assert_eq!(sub.correctness_level, 1);
    assert_eq!(sub.grade, 0.0);
}

#[tokio::test]
async fn backend_failure_is_noted_not_fatal() {
    let graded = pipeline().await.run(vec![input("s1", "SELECT * FROM u")]).await;
    let sub = &graded[0];

    assert!(sub.parseable);
    assert!(sub.execution_error.is_some());
    assert!(sub.feedback.contains("DBMS crashed."));
    assert!(sub.correctness_level >= 1);
}

#[tokio::test]
async fn submissions_come_back_in_input_order() {
    let inputs = (0..12)
        .map(|i| {
            let query = if i % 2 == 0 { MODEL } else { "nonsense" };
            input(&format!("s{i}"), query)
        })
        .collect();
    let graded = pipeline().await.run(inputs).await;

    let ids: Vec<&str> = graded.iter().map(|s| s.id.as_str()).collect();
    let expected: Vec<String> = (0..12).map(|i| format!("s{i}")).collect();
    assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
    assert!(graded.iter().step_by(2).all(|s| s.grade == 1.0));
}

#[tokio::test]
async fn unparseable_model_aborts_the_run() {
    let models = vec![MODEL.to_string(), "SELEKT nothing".to_string()];
    let err = Pipeline::new(default_session(), parser(), backend(), &models, 1)
        .await
        .err()
        .expect("model must be rejected");

    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::ModelNotParseable { index, .. }) => assert_eq!(*index, 1),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn missing_models_abort_the_run() {
    let err = Pipeline::new(default_session(), parser(), backend(), &[], 1)
        .await
        .err()
        .expect("models are required");
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::NoModels)
    ));
}

#[tokio::test]
async fn assignment_records_carry_grades_and_comment() {
    let assignment = Assignment {
        session:     default_session(),
        models:      vec![MODEL.to_string()],
        submissions: vec![input("s1", MODEL), input("s2", "SELEC * FORM t")],
    };
    let records = grade_assignment(assignment, parser(), backend(), 2)
        .await
        .expect("records");

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].grade, 1.0);
    assert_eq!(records[0].out_of, 1.0);
    assert_eq!(records[0].corrected_query, None);
    assert_eq!(records[1].corrected_query.as_deref(), Some("select * from t"));
    assert_eq!(records[1].query, "SELEC * FORM t");
    assert!(!records[1].grader_comment.is_empty());
}

#[tokio::test]
async fn six_level_semantics_gives_partial_credit_to_near_misses() {
    let session = SessionConfig::builder()
        .semantics_level(PropertyLevel::SixLevels)
        .build();
    let parser = parser().with("SELECT * FROM archive", select_star("archive", None));
    let backend = backend().rows("SELECT * FROM archive", &[&["9", "Zed"]]);
    let pipeline = Pipeline::new(session, parser, backend, &[MODEL.to_string()], 2)
        .await
        .expect("pipeline");

    let graded = pipeline.run(vec![input("s1", "SELECT * FROM archive")]).await;
    let sub = &graded[0];

    assert_eq!(sub.syntax, PropertyState::Correct);
    assert_eq!(sub.results, PropertyState::Incorrect);
    assert_eq!(sub.semantics, PropertyState::Sm3);
    assert!(sub.semantics_message.contains("FROM clause"));
    assert!(sub.grade > 0.0 && sub.grade < 1.0);
}

#[tokio::test]
async fn syntax_repair_falls_back_to_parseable_peers() {
    const PEER: &str = "SELECT title FROM books ORDER BY title";
    let parser = parser().with(PEER, select_ordered("books", "title"));
    let backend = backend().rows(PEER, &[&["1", "Ada"], &["2", "Grace"]]);
    let pipeline = Pipeline::new(default_session(), parser, backend, &[MODEL.to_string()], 2)
        .await
        .expect("pipeline");

    let graded = pipeline
        .run(vec![
            input("s1", PEER),
            input("s2", "SELECT title FROM books ORDER title"),
        ])
        .await;
    let repaired = &graded[1];

    assert!(repaired.parseable);
    assert_eq!(repaired.syntax, PropertyState::MinorIncorrect);
    assert_eq!(repaired.text, "select title from books order by title");
    assert_eq!(
        repaired.original_text.as_deref(),
        Some("SELECT title FROM books ORDER title")
    );
    assert_eq!(repaired.text_edit_distance, Some(1));
    assert_eq!(repaired.results, PropertyState::Correct);
}

#[tokio::test]
async fn case_only_difference_is_credited_by_semantics() {
    let backend = backend().rows_exact("select * from T", &[]);
    let pipeline = Pipeline::new(default_session(), parser(), backend, &[MODEL.to_string()], 2)
        .await
        .expect("pipeline");

    let graded = pipeline.run(vec![input("s1", "select * from T")]).await;
    let sub = &graded[0];

    assert_eq!(sub.results, PropertyState::Correct);
    assert_eq!(sub.semantics, PropertyState::Correct);
    assert_eq!(sub.text_edit_distance, Some(0));
    assert_eq!(
        sub.semantics_message,
        format!("Semantics minor error. Maybe you meant '{MODEL}'?\n")
    );
    assert!(sub.feedback.contains("SEMANTICS MINOR ERROR"));
    assert_eq!(sub.grade, 1.0);
}

#[tokio::test]
async fn insert_with_extra_rows_is_a_minor_results_error() {
    const INSERT: &str = "INSERT INTO book (isbn, price) VALUES (1, 20)";
    const EXTRA: &str = "INSERT INTO book (isbn, price) VALUES (1, 20), (2, 35)";
    let parser = FixtureParser::default()
        .with(INSERT, insert_values("book", &["isbn", "price"], &[&[1, 20]]))
        .with(EXTRA, insert_values("book", &["isbn", "price"], &[&[1, 20], &[2, 35]]));
    let backend = FixtureBackend::default()
        .changes(INSERT, vec![DiffEntry::new("book", "added", "1, 20")])
        .changes(EXTRA, vec![
            DiffEntry::new("book", "added", "1, 20"),
            DiffEntry::new("book", "added", "2, 35"),
        ]);
    let pipeline = Pipeline::new(default_session(), parser, backend, &[INSERT.to_string()], 2)
        .await
        .expect("pipeline");

    let graded = pipeline.run(vec![input("s1", INSERT), input("s2", EXTRA)]).await;

    assert_eq!(graded[0].grade, 1.0);
    let sub = &graded[1];
    assert_eq!(sub.syntax, PropertyState::Correct);
    assert_eq!(sub.results, PropertyState::MinorIncorrect);
    assert_eq!(sub.semantics, PropertyState::Incorrect);
    assert!(sub.semantics_message.contains("Mismatch in number of rows"));
    assert!(sub.grade > 0.0 && sub.grade < 1.0);
}

#[tokio::test]
async fn backend_panic_is_isolated_to_one_submission() {
    let parser = parser().with("SELECT * FROM crash", select_star("crash", None));
    let backend = backend().panicking("SELECT * FROM crash");
    let pipeline = Pipeline::new(default_session(), parser, backend, &[MODEL.to_string()], 4)
        .await
        .expect("pipeline");

    let graded = pipeline
        .run(vec![
            input("s1", MODEL),
            input("s2", "SELECT * FROM crash"),
            input("s3", "select * from T"),
        ])
        .await;

    assert_eq!(graded.len(), 3);
    assert!(graded[1].feedback.contains("preprocess analysis crashed"));
    assert_ne!(graded[1].grade, 1.0);
    for sub in [&graded[0], &graded[2]] {
        assert_eq!(sub.results, PropertyState::Correct);
        assert_eq!(sub.semantics, PropertyState::Correct);
        assert_eq!(sub.grade, 1.0);
    }
}
