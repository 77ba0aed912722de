use tabrank_service::{
	Document, DocumentId, ParsedQuery, SearchContext, SearchRequest, search::lexical::LexicalScorer,
};

use super::{Harness, ScriptedModel, SpySummarizer, StubDocuments, ids, meta, test_config};

fn harness() -> Harness {
	let documents = StubDocuments::new(vec![
		meta(1, "Ice cream recipes", "https://example.com/ice-cream"),
		meta(2, "Food for thought: essays", "https://example.com/essays"),
	]);
	let summarizer =
		SpySummarizer::with(&[(1, "", &["food", "dessert"]), (2, "", &["writing"])]);

	Harness::new(documents, summarizer, ScriptedModel::unavailable())
}

#[tokio::test]
async fn tagged_documents_outrank_incidental_title_matches() {
	let harness = harness();
	let outcome = harness
		.service
		.search(&SearchContext::new(), SearchRequest::new("best food to try"))
		.await
		.unwrap();

	assert_eq!(outcome.keywords, vec!["best", "food", "try"]);
	assert_eq!(ids(outcome.results.ids()), vec![1]);
	assert_eq!(outcome.results.reason(DocumentId(1)), Some("Matched \"food\" in tags"));

	let active = outcome.refinement.unwrap().wait().await.unwrap();

	assert_eq!(ids(active.ids()), vec![1]);
}

#[tokio::test]
async fn repeated_searches_return_the_same_order() {
	let harness = harness();
	let ctx = SearchContext::new();
	let mut orders = Vec::new();

	for _ in 0..3 {
		let outcome = harness.service.search(&ctx, SearchRequest::new("food")).await.unwrap();
		let active = match outcome.refinement {
			Some(refinement) => refinement.wait().await.unwrap(),
			None => outcome.results,
		};

		orders.push(ids(active.ids()));
	}

	assert_eq!(orders[0], vec![1, 2]);
	assert!(orders.iter().all(|order| *order == orders[0]));
}

#[test]
fn title_hits_outscore_url_hits() {
	let scorer = LexicalScorer::new(test_config().lexical);
	let terms = ParsedQuery::parse("lifetimes").keywords;
	let titled = Document::from_meta(meta(1, "Lifetimes", "https://example.com/"));
	let linked = Document::from_meta(meta(2, "Notes", "https://example.com/lifetimes"));
	let titled = scorer.score_document(&titled, &terms);
	let linked = scorer.score_document(&linked, &terms);

	assert_eq!(titled.score, 5.0);
	assert_eq!(linked.score, 1.0);
	assert!(titled.score > linked.score);
	assert!(!scorer.qualifies(&linked, &terms));
}
