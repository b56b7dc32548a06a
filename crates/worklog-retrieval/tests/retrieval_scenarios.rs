//! End-to-end retrieval scenarios through the public API: parsing, strategy
//! selection, context assembly, and the chat use case on top.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime};

use worklog_core::RetrievalConfig;
use worklog_retrieval::{
    ChatRequest, ChatService, DateRange, ExtractiveAnswerer, RetrievalDocument, RetrievalError,
    RetrievalSelector, ScoredCandidate, SimilarityIndex, TemporalQueryParser, NO_DATA_ANSWER,
};

// =============================================================================
// Helpers
// =============================================================================

/// Index answering each query text with a scripted candidate list.
#[derive(Default)]
struct ScriptedIndex {
    responses: HashMap<String, Vec<ScoredCandidate>>,
    total: usize,
}

impl ScriptedIndex {
    fn respond(mut self, query: &str, candidates: Vec<ScoredCandidate>) -> Self {
        self.total += candidates.len();
        self.responses.insert(query.to_string(), candidates);
        self
    }
}

#[async_trait]
impl SimilarityIndex for ScriptedIndex {
    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredCandidate>, RetrievalError> {
        Ok(self
            .responses
            .get(query)
            .map(|c| c.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn document_count(&self) -> Result<usize, RetrievalError> {
        Ok(self.total)
    }
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 9, 20)
        .unwrap()
        .and_hms_opt(10, 15, 0)
        .unwrap()
}

fn dated(days_ago: i64, text: &str) -> ScoredCandidate {
    let date = now().date() - Duration::days(days_ago);
    let source = format!("2024/{}.md", date.format("%Y-%m-%d"));
    ScoredCandidate::new(RetrievalDocument::new(text, source, 0).unwrap(), 0.3)
}

fn scored(score: f32, text: &str) -> ScoredCandidate {
    let source = format!("connect/{}.md", text);
    ScoredCandidate::new(RetrievalDocument::new(text, source, 0).unwrap(), score)
}

fn selector(index: ScriptedIndex) -> RetrievalSelector {
    RetrievalSelector::new(Arc::new(index), RetrievalConfig::default())
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn temporal_query_keeps_window_newest_first() {
    let index = ScriptedIndex::default().respond(
        "work tasks projects",
        vec![
            dated(2, "migrated billing"),
            dated(9, "planning offsite"),
            dated(4, "on-call handover"),
        ],
    );
    let result = selector(index)
        .select("what did I do last week", None, now())
        .await
        .unwrap();

    assert!(result.is_temporal);
    assert_eq!(result.document_count, 2);
    assert_eq!(
        result.context_text,
        "[2024-09-18] migrated billing\n\n---\n\n[2024-09-16] on-call handover"
    );
    assert_eq!(
        result.source_ids.into_iter().collect::<Vec<_>>(),
        vec!["2024/2024-09-16.md", "2024/2024-09-18.md"]
    );
}

#[tokio::test]
async fn content_query_keeps_relevant_in_ranked_order() {
    let index = ScriptedIndex::default().respond(
        "Amazon Connect setup",
        vec![
            scored(0.1, "flows"),
            scored(0.3, "queues"),
            scored(0.6, "billing"),
            scored(0.45, "lambda"),
            scored(0.9, "offsite"),
        ],
    );
    let result = selector(index)
        .select("Amazon Connect setup", None, now())
        .await
        .unwrap();

    assert!(!result.is_temporal);
    assert_eq!(result.document_count, 3);
    let texts: Vec<&str> = result.context_text.split("\n\n---\n\n").collect();
    assert_eq!(
        texts,
        vec![
            "[Unknown date] flows",
            "[Unknown date] queues",
            "[Unknown date] lambda"
        ]
    );
}

#[tokio::test]
async fn unmatched_query_yields_empty_result() {
    let result = selector(ScriptedIndex::default())
        .select("random unrelated text", None, now())
        .await
        .unwrap();

    assert!(result.is_empty());
    assert_eq!(result.document_count, 0);
    assert!(result.context_text.is_empty());
    assert!(result.source_ids.is_empty());
}

#[test]
fn month_third_query_resolves_to_first_ten_days() {
    let range = TemporalQueryParser::new()
        .parse("early September wrap-up", now())
        .unwrap();
    let first = NaiveDate::from_ymd_opt(2024, 9, 1).unwrap();
    let tenth = NaiveDate::from_ymd_opt(2024, 9, 10).unwrap();

    assert_eq!(range.start(), first.and_hms_opt(0, 0, 0).unwrap());
    assert!(range.contains_date(tenth));
    assert!(!range.contains_date(tenth.succ_opt().unwrap()));
    assert_eq!(
        range,
        DateRange::month_third(worklog_core::MonthThird::Early, "september", 2024).unwrap()
    );
}

#[tokio::test]
async fn chat_answers_from_selected_entries() {
    let index = ScriptedIndex::default()
        .respond(
            "work tasks projects",
            vec![dated(0, "paired on the parser"), dated(1, "fixed flaky test")],
        )
        .respond("kafka lag", Vec::new());
    let chat = ChatService::new(
        Arc::new(index),
        Arc::new(ExtractiveAnswerer::default()),
        RetrievalConfig::default(),
    );

    let response = chat
        .process_query(&ChatRequest::new("What did I do today?"), now())
        .await
        .unwrap();
    assert!(response.is_temporal);
    assert_eq!(response.documents_found, 1);
    assert_eq!(response.sources, vec!["2024/2024-09-20.md"]);
    assert!(response.answer.contains("- [2024-09-20] paired on the parser"));
    assert!(!response.answer.contains("flaky"));

    let response = chat
        .process_query(&ChatRequest::new("kafka lag"), now())
        .await
        .unwrap();
    assert_eq!(response.answer, NO_DATA_ANSWER);
    assert_eq!(response.documents_found, 0);
}
