use std::{
	collections::HashMap,
	fs,
	path::{Path, PathBuf},
	str::FromStr,
	sync::Arc,
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use tabrank_service::{
	BoxFuture, DocumentId, DocumentMeta, DocumentProvider, MemoryStore, RequestedMode, ResultSet,
	SearchContext, SearchRequest, SearchStatus, TabRankService,
};

#[derive(Debug, Parser)]
#[command(
	version = tabrank_cli::VERSION,
	rename_all = "kebab",
	styles = tabrank_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// JSON array of `{ "id", "title", "url", "text" }` objects.
	#[arg(long, short = 'd', value_name = "FILE")]
	pub documents: PathBuf,
	/// Overrides `search.mode` for this query.
	#[arg(long, short = 'm', value_name = "MODE")]
	pub mode: Option<String>,
	pub query: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileDocument {
	pub id: u64,
	pub title: String,
	pub url: String,
	#[serde(default)]
	pub text: String,
}

/// Document provider over a fixed snapshot of tabs.
#[derive(Debug, Default)]
pub struct FileDocuments {
	documents: Vec<FileDocument>,
	texts: HashMap<DocumentId, String>,
}
impl FileDocuments {
	pub fn new(documents: Vec<FileDocument>) -> Self {
		let texts = documents
			.iter()
			.map(|document| (DocumentId(document.id), document.text.clone()))
			.collect();

		Self { documents, texts }
	}

	pub fn load(path: &Path) -> eyre::Result<Self> {
		let raw = fs::read_to_string(path)
			.map_err(|err| eyre::eyre!("Failed to read {}: {err}.", path.display()))?;
		let documents: Vec<FileDocument> = serde_json::from_str(&raw)
			.map_err(|err| eyre::eyre!("Failed to parse {}: {err}.", path.display()))?;

		Ok(Self::new(documents))
	}

	pub fn len(&self) -> usize {
		self.documents.len()
	}

	pub fn is_empty(&self) -> bool {
		self.documents.is_empty()
	}
}

impl DocumentProvider for FileDocuments {
	fn list_documents(&self) -> BoxFuture<'_, tabrank_service::Result<Vec<DocumentMeta>>> {
		Box::pin(async move {
			Ok(self
				.documents
				.iter()
				.map(|document| DocumentMeta {
					id: DocumentId(document.id),
					title: document.title.clone(),
					url: document.url.clone(),
				})
				.collect())
		})
	}

	fn document_text(&self, id: DocumentId) -> BoxFuture<'_, tabrank_service::Result<String>> {
		Box::pin(async move {
			self.texts.get(&id).cloned().ok_or_else(|| tabrank_service::Error::DocumentProvider {
				message: format!("Unknown document {id}."),
			})
		})
	}
}

#[derive(Debug, Serialize)]
pub struct Report {
	pub query: String,
	pub mode: String,
	pub keywords: Vec<String>,
	pub source: String,
	pub status: String,
	pub results: Vec<ReportItem>,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct ReportItem {
	pub id: u64,
	pub score: Option<f32>,
	pub reason: Option<String>,
}

impl Report {
	pub fn new(query: &str, mode: String, keywords: Vec<String>, results: &ResultSet) -> Self {
		let items = results
			.ids()
			.iter()
			.map(|id| ReportItem {
				id: id.0,
				score: results.score(*id),
				reason: results.reason(*id).map(str::to_string),
			})
			.collect();

		Self {
			query: query.to_string(),
			mode,
			keywords,
			source: results.source().as_str().to_string(),
			status: SearchStatus::for_results(results).to_string(),
			results: items,
		}
	}
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = tabrank_config::load(&args.config)?;

	init_tracing(&config)?;

	let documents = FileDocuments::load(&args.documents)?;

	tracing::info!(documents = documents.len(), "Loaded document snapshot.");

	let mut request = SearchRequest::new(args.query.clone());

	if let Some(mode) = args.mode.as_deref() {
		request = request.with_mode(RequestedMode::from_str(mode)?);
	}

	let service = TabRankService::new(config, Arc::new(documents), Arc::new(MemoryStore::new()));
	let ctx = SearchContext::new();
	let outcome = service.search(&ctx, request).await?;
	let results = match outcome.refinement {
		Some(refinement) => refinement.wait().await?,
		None => outcome.results,
	};
	let report = Report::new(&args.query, outcome.mode.to_string(), outcome.keywords, &results);

	println!("{}", serde_json::to_string_pretty(&report)?);

	Ok(())
}

fn init_tracing(config: &tabrank_config::Config) -> color_eyre::Result<()> {
	let filter =
		EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	Ok(())
}
