use sharp::auth::{unsigned_token, Anonymous, StaticToken, TokenProvider};
use sharp::cancel::CancelSource;
use sharp::client::SharpClient;
use sharp::community::NewCommunity;
use sharp::config::{ClientConfig, ServerConfig};
use sharp::editor::QuizEditor;
use sharp::grading::Verdict;
use sharp::question::{QuestionKind, QuestionType};
use sharp::quiz::QuizSession;
use sharp::{build_state, routes::build_router, SharpError};
use std::sync::Arc;
use std::time::Duration;

async fn spawn_server() -> String {
    let state = build_state(&ServerConfig::default());
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client_for(base: &str, user: &str) -> SharpClient {
    let tokens: Arc<dyn TokenProvider> = Arc::new(StaticToken(unsigned_token(user)));
    SharpClient::new(ClientConfig::single(base), tokens).unwrap()
}

fn geography_editor(community_id: &str) -> QuizEditor {
    let mut editor = QuizEditor::new(community_id);
    editor.set_title("Geography");
    editor.set_description("Capitals and ordering");

    let mc = editor.add_question().unwrap();
    editor.set_question_type(mc, QuestionType::MultipleChoice).unwrap();
    editor
        .edit_question(mc, |d| {
            d.question_text = "capital?".into();
            d.add_option("Paris");
            d.add_option("Berlin");
            d.answer = vec!["Paris".into()];
        })
        .unwrap();

    let io = editor.add_question().unwrap();
    editor.set_question_type(io, QuestionType::ItemOrdering).unwrap();
    editor
        .edit_question(io, |d| {
            d.question_text = "Order the letters".into();
            for item in ["A", "B", "C"] {
                d.add_option(item);
            }
        })
        .unwrap();

    let card = editor.add_question().unwrap();
    editor.set_question_type(card, QuestionType::Flashcard).unwrap();
    editor
        .edit_question(card, |d| {
            d.question_text = "Capital of Italy?".into();
            d.set_text_answer("Rome");
        })
        .unwrap();
    editor
}

#[tokio::test]
async fn community_membership_flow() {
    let base = spawn_server().await;
    let alice = client_for(&base, "alice");
    let bob = client_for(&base, "bob");

    let created = alice
        .create_community(&NewCommunity::new("Rustaceans", "Systems programming").with_keywords(["rust", "tokio"]))
        .await
        .unwrap();
    assert!(created.is_owned_by("alice"));

    let joined = bob.join_community(&created.community_id).await.unwrap();
    assert!(joined.is_member("bob"));
    assert_eq!(joined.member_count(), 2);

    let listed = bob.list_communities().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].display_keywords(), ["rust", "tokio"]);

    let left = bob.leave_community(&created.community_id).await.unwrap();
    assert!(!left.is_member("bob"));

    let fetched = alice.get_community(&created.community_id).await.unwrap();
    assert_eq!(fetched.member_count(), 1);

    let missing = alice.get_community("nope").await.unwrap_err();
    assert!(matches!(missing, SharpError::NetworkFailure { status: Some(404), .. }));
}

#[tokio::test]
async fn author_take_update_delete_quiz() {
    let base = spawn_server().await;
    let alice = client_for(&base, "alice");
    let community = alice
        .create_community(&NewCommunity::new("Geo", "Maps"))
        .await
        .unwrap();

    let document = geography_editor(&community.community_id).build().unwrap();
    let created = alice.create_quiz(&document).await.unwrap();
    assert!(created.rejected.is_empty());
    assert!(created.quiz.is_owned_by("alice"));
    assert!(created.quiz.created_at.is_some());

    let loaded = alice.get_quiz(&community.community_id, &document.quiz_id).await.unwrap();
    let mut session = QuizSession::new(loaded.quiz);
    assert_eq!(session.len(), 3);

    session.answer_current(vec!["Paris".into()]).unwrap();
    assert_eq!(session.verdict_for(0), Some(Verdict::Correct));

    session.advance();
    let ordering = session.current().unwrap().clone();
    assert!(matches!(ordering.kind, QuestionKind::ItemOrdering { .. }));
    session.answer_current(vec!["B".into(), "A".into(), "C".into()]).unwrap();
    assert_eq!(session.verdict_for(1), Some(Verdict::Incorrect));
    session.answer_current(vec!["A".into(), "B".into(), "C".into()]).unwrap();
    assert_eq!(session.verdict_for(1), Some(Verdict::Correct));

    session.advance();
    assert_eq!(session.advance(), 2);
    session.answer_current(vec![" rome ".into()]).unwrap();
    assert_eq!(session.score().correct, 3);

    let mut editor = QuizEditor::from_quiz(session.quiz());
    editor.set_title("Geography II");
    editor.remove_question(2).unwrap();
    let updated = alice.update_quiz(&editor.build().unwrap()).await.unwrap();
    assert_eq!(updated.quiz.title, "Geography II");
    assert_eq!(updated.quiz.questions.len(), 2);

    let quizzes = alice.list_quizzes(&community.community_id).await.unwrap();
    assert_eq!(quizzes.len(), 1);

    let bob = client_for(&base, "bob");
    let forbidden = bob
        .delete_quiz(&community.community_id, &document.quiz_id)
        .await
        .unwrap_err();
    assert!(matches!(forbidden, SharpError::NetworkFailure { status: Some(403), .. }));

    alice.delete_quiz(&community.community_id, &document.quiz_id).await.unwrap();
    assert!(alice.list_quizzes(&community.community_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn question_sub_resource_round_trip() {
    let base = spawn_server().await;
    let alice = client_for(&base, "alice");
    let community = alice.create_community(&NewCommunity::new("Geo", "Maps")).await.unwrap();
    let document = geography_editor(&community.community_id).build().unwrap();
    alice.create_quiz(&document).await.unwrap();

    let cid = &community.community_id;
    let qid = &document.quiz_id;
    assert_eq!(alice.list_questions(cid, qid).await.unwrap().len(), 3);

    let mut card = alice
        .get_question(cid, qid, &document.questions[2].question_id)
        .await
        .unwrap();
    assert_eq!(card.kind, QuestionKind::Flashcard);

    card.expected = vec!["Roma".into()];
    let updated = alice.update_question(cid, qid, &card).await.unwrap();
    assert_eq!(updated.expected, vec!["Roma".to_string()]);

    card.id = "extra".into();
    alice.create_question(cid, qid, &card).await.unwrap();
    assert_eq!(alice.list_questions(cid, qid).await.unwrap().len(), 4);

    let mut broken = card.clone();
    broken.id = "broken".into();
    broken.expected.clear();
    let err = alice.create_question(cid, qid, &broken).await.unwrap_err();
    assert!(matches!(err, SharpError::NetworkFailure { status: Some(400), .. }));

    alice.delete_question(cid, qid, "extra").await.unwrap();
    assert_eq!(alice.list_questions(cid, qid).await.unwrap().len(), 3);
}

#[tokio::test]
async fn anonymous_requests_follow_client_policy() {
    let base = spawn_server().await;
    let strict = SharpClient::new(ClientConfig::single(&base), Arc::new(Anonymous)).unwrap();
    assert!(matches!(strict.list_communities().await, Err(SharpError::Unauthenticated)));

    let lenient = SharpClient::new(ClientConfig::single(&base).allow_anonymous(true), Arc::new(Anonymous)).unwrap();
    assert!(lenient.list_communities().await.unwrap().is_empty());
    let err = lenient
        .create_community(&NewCommunity::new("Anon", "No token"))
        .await
        .unwrap_err();
    assert!(matches!(err, SharpError::NetworkFailure { status: Some(401), .. }));
}

#[tokio::test]
async fn cancelled_calls_return_cancelled() {
    let base = spawn_server().await;
    let source = CancelSource::new();
    let client = client_for(&base, "alice").with_cancel(source.token());
    source.cancel();
    let err = client.list_communities().await.unwrap_err();
    assert!(matches!(err, SharpError::Cancelled));

    // a dead endpoint would otherwise hang until the timeout
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let silent = format!("http://{}", listener.local_addr().unwrap());
    let source = CancelSource::new();
    let client = client_for(&silent, "alice").with_cancel(source.token());
    let pending = tokio::spawn(async move { client.list_communities().await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    source.cancel();
    let out = tokio::time::timeout(Duration::from_secs(5), pending).await.unwrap().unwrap();
    assert!(matches!(out, Err(SharpError::Cancelled)));
    drop(listener);
}
