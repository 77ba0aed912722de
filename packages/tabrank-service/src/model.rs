use std::{
	collections::HashMap,
	sync::{
		Arc, Mutex,
		atomic::{AtomicU64, Ordering},
	},
};

use serde_json::Value;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::{Error, LanguageModel, Result};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Handle to a model conversation primed with a system prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSession {
	id: u64,
	system_prompt: String,
}
impl ModelSession {
	pub fn new(system_prompt: impl Into<String>) -> Self {
		Self {
			id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
			system_prompt: system_prompt.into(),
		}
	}

	pub fn id(&self) -> u64 {
		self.id
	}

	pub fn system_prompt(&self) -> &str {
		&self.system_prompt
	}
}

enum SessionInit {
	Unavailable,
	Failed(Error),
}

/// Reuses one model session per purpose.
///
/// Concurrent callers asking for the same purpose wait for the in-flight creation instead of
/// creating a second session. An unavailable model is not remembered, so the next call retries.
#[derive(Clone)]
pub struct ModelSessions {
	model: Arc<dyn LanguageModel>,
	slots: Arc<Mutex<HashMap<String, Arc<OnceCell<ModelSession>>>>>,
}
impl ModelSessions {
	pub fn new(model: Arc<dyn LanguageModel>) -> Self {
		Self { model, slots: Arc::new(Mutex::new(HashMap::new())) }
	}

	pub async fn session(
		&self,
		purpose: &str,
		system_prompt: &str,
	) -> Result<Option<ModelSession>> {
		let slot = {
			let mut slots = self.slots.lock().unwrap_or_else(|err| err.into_inner());

			slots.entry(purpose.to_string()).or_default().clone()
		};
		let created = slot
			.get_or_try_init(|| async {
				match self.model.create_session(system_prompt).await {
					Ok(Some(session)) => {
						tracing::debug!(
							purpose,
							session_id = session.id(),
							"Model session created."
						);

						Ok(session)
					},
					Ok(None) => Err(SessionInit::Unavailable),
					Err(err) => Err(SessionInit::Failed(err)),
				}
			})
			.await;

		match created {
			Ok(session) => Ok(Some(session.clone())),
			Err(SessionInit::Unavailable) => Ok(None),
			Err(SessionInit::Failed(err)) => Err(err),
		}
	}

	/// Drops the cached session for `purpose`; the next call creates a fresh one.
	pub fn reset(&self, purpose: &str) {
		self.slots.lock().unwrap_or_else(|err| err.into_inner()).remove(purpose);
	}

	pub async fn prompt(
		&self,
		session: &ModelSession,
		text: &str,
		schema: Option<&Value>,
		cancel: &CancellationToken,
	) -> Result<Option<String>> {
		self.model.prompt(session, text, schema, cancel).await
	}
}
