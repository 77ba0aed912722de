use std::sync::{Arc, atomic::Ordering};

use tabrank_service::ModelSessions;

use super::ScriptedModel;

#[tokio::test]
async fn concurrent_requests_share_one_session_per_purpose() {
	let model = Arc::new(ScriptedModel::replying(Vec::new()));
	let sessions = ModelSessions::new(model.clone());
	let (a, b) =
		tokio::join!(sessions.session("search", "judge"), sessions.session("search", "judge"));
	let a = a.unwrap().unwrap();
	let b = b.unwrap().unwrap();

	assert_eq!(a.id(), b.id());
	assert_eq!(model.sessions_created.load(Ordering::SeqCst), 1);

	let other = sessions.session("summarize", "summarizer").await.unwrap().unwrap();

	assert_ne!(other.id(), a.id());
	assert_eq!(other.system_prompt(), "summarizer");
	assert_eq!(model.sessions_created.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn an_unavailable_model_is_retried_on_the_next_call() {
	let model = Arc::new(ScriptedModel::unavailable());
	let sessions = ModelSessions::new(model.clone());

	assert!(sessions.session("search", "judge").await.unwrap().is_none());

	model.available.store(true, Ordering::SeqCst);

	assert!(sessions.session("search", "judge").await.unwrap().is_some());
	assert_eq!(model.sessions_created.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn reset_forces_a_fresh_session() {
	let model = Arc::new(ScriptedModel::replying(Vec::new()));
	let sessions = ModelSessions::new(model.clone());
	let first = sessions.session("search", "judge").await.unwrap().unwrap();

	sessions.reset("search");

	let second = sessions.session("search", "judge").await.unwrap().unwrap();

	assert_ne!(first.id(), second.id());
}
