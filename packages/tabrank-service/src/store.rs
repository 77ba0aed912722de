use std::{collections::HashMap, sync::Mutex};

use serde_json::Value;

use crate::{BoxFuture, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreScope {
	/// Cleared when the browser session ends.
	Session,
	/// Survives restarts.
	Durable,
}

/// Asynchronous key-value storage with a session and a durable scope.
pub trait KvStore
where
	Self: Send + Sync,
{
	fn get<'a>(
		&'a self,
		scope: StoreScope,
		keys: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, Value>>>;

	fn set(&self, scope: StoreScope, entries: HashMap<String, Value>) -> BoxFuture<'_, Result<()>>;

	fn remove<'a>(&'a self, scope: StoreScope, keys: &'a [String]) -> BoxFuture<'a, Result<()>>;
}

/// Process-local store. Last write wins.
#[derive(Debug, Default)]
pub struct MemoryStore {
	session: Mutex<HashMap<String, Value>>,
	durable: Mutex<HashMap<String, Value>>,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Drops every session-scoped entry, as a browser restart would.
	pub fn clear_session(&self) {
		self.scope(StoreScope::Session).lock().unwrap_or_else(|err| err.into_inner()).clear();
	}

	pub fn len(&self, scope: StoreScope) -> usize {
		self.scope(scope).lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn is_empty(&self, scope: StoreScope) -> bool {
		self.len(scope) == 0
	}

	fn scope(&self, scope: StoreScope) -> &Mutex<HashMap<String, Value>> {
		match scope {
			StoreScope::Session => &self.session,
			StoreScope::Durable => &self.durable,
		}
	}
}

impl KvStore for MemoryStore {
	fn get<'a>(
		&'a self,
		scope: StoreScope,
		keys: &'a [String],
	) -> BoxFuture<'a, Result<HashMap<String, Value>>> {
		let map = self.scope(scope).lock().unwrap_or_else(|err| err.into_inner());
		let found: HashMap<String, Value> = keys
			.iter()
			.filter_map(|key| map.get(key).map(|value| (key.clone(), value.clone())))
			.collect();

		Box::pin(async move { Ok(found) })
	}

	fn set(&self, scope: StoreScope, entries: HashMap<String, Value>) -> BoxFuture<'_, Result<()>> {
		self.scope(scope).lock().unwrap_or_else(|err| err.into_inner()).extend(entries);

		Box::pin(async move { Ok(()) })
	}

	fn remove<'a>(&'a self, scope: StoreScope, keys: &'a [String]) -> BoxFuture<'a, Result<()>> {
		let mut map = self.scope(scope).lock().unwrap_or_else(|err| err.into_inner());

		for key in keys {
			map.remove(key);
		}

		Box::pin(async move { Ok(()) })
	}
}
