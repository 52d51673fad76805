//! Document search tools.
//!
//! Failures inside a tool (no index, store errors, bad arguments) come back
//! as ordinary text content so the client always has something to render.
//! Only an unknown tool name is a routing error.

use serde_json::{json, Value};

use crate::error::RouteError;
use crate::mcp::types::{Tool, ToolCallResult};
use crate::server::context::ServerContext;
use crate::server::store::SearchHit;

/// Results returned by `query_document` when `num_results` is omitted.
pub const DEFAULT_NUM_RESULTS: usize = 5;

/// Upper bound on `num_results`.
pub const MAX_NUM_RESULTS: usize = 100;

const NOT_INITIALIZED: &str =
    "Error: search collection is not initialized. Build the document index first.";

const RESULT_SEPARATOR: &str = "\n\n---\n\n";

/// Runs the document tools against a [`ServerContext`].
pub struct ToolExecutor<'a> {
    ctx: &'a ServerContext,
}

impl<'a> ToolExecutor<'a> {
    /// Creates an executor over `ctx`.
    #[must_use]
    pub const fn new(ctx: &'a ServerContext) -> Self {
        Self { ctx }
    }

    /// Returns the advertised tools.
    #[must_use]
    pub fn definitions() -> Vec<Tool> {
        vec![
            Tool {
                name: "query_document".to_string(),
                description: Some(
                    "Search for information in the document based on semantic similarity"
                        .to_string(),
                ),
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "query_text": {
                            "type": "string",
                            "description": "The search query text"
                        },
                        "num_results": {
                            "type": "integer",
                            "minimum": 1,
                            "maximum": MAX_NUM_RESULTS,
                            "description": format!(
                                "Number of results to return (default: {DEFAULT_NUM_RESULTS}, \
                                 max: {MAX_NUM_RESULTS})"
                            )
                        }
                    },
                    "required": ["query_text"]
                }),
            },
            Tool {
                name: "get_collection_info".to_string(),
                description: Some("Get information about the document collection".to_string()),
                input_schema: json!({
                    "type": "object",
                    "properties": {}
                }),
            },
        ]
    }

    /// Calls the tool named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::UnknownTool`] if no such tool exists.
    pub fn call(&self, name: &str, arguments: &Value) -> Result<ToolCallResult, RouteError> {
        match name {
            "query_document" => Ok(self.call_query_document(arguments)),
            "get_collection_info" => Ok(self.call_get_collection_info()),
            _ => Err(RouteError::UnknownTool(name.to_string())),
        }
    }

    fn call_query_document(&self, arguments: &Value) -> ToolCallResult {
        let Some(query_text) = arguments.get("query_text").and_then(Value::as_str) else {
            return ToolCallResult::error("Missing required parameter: query_text");
        };

        let num_results = match arguments.get("num_results") {
            None | Some(Value::Null) => DEFAULT_NUM_RESULTS,
            Some(value) => match value.as_u64().and_then(|n| usize::try_from(n).ok()) {
                Some(n) if (1..=MAX_NUM_RESULTS).contains(&n) => n,
                _ => {
                    return ToolCallResult::error(format!(
                        "Invalid parameter: num_results must be an integer between 1 and \
                         {MAX_NUM_RESULTS}"
                    ))
                }
            },
        };

        let Some(store) = self.ctx.store() else {
            return ToolCallResult::text(NOT_INITIALIZED);
        };

        match store.query(query_text, num_results) {
            Ok(hits) if hits.is_empty() => ToolCallResult::text("No results found for your query."),
            Ok(hits) => {
                let blocks: Vec<String> = hits
                    .iter()
                    .enumerate()
                    .map(|(i, hit)| format!("Result {}:\n{}", i + 1, format_search_result(hit)))
                    .collect();
                ToolCallResult::text(blocks.join(RESULT_SEPARATOR))
            }
            Err(e) => {
                let message = format!("Error querying document: {e}");
                tracing::error!(error = %e, "Search query failed");
                ToolCallResult::text(message)
            }
        }
    }

    fn call_get_collection_info(&self) -> ToolCallResult {
        let Some(store) = self.ctx.store() else {
            return ToolCallResult::text(NOT_INITIALIZED);
        };

        match store.count() {
            Ok(count) => ToolCallResult::text(format!(
                "Collection name: {}\nNumber of documents: {count}",
                self.ctx.collection_name()
            )),
            Err(e) => {
                let message = format!("Error getting collection info: {e}");
                tracing::error!(error = %e, "Collection count failed");
                ToolCallResult::text(message)
            }
        }
    }
}

/// Formats one hit: similarity score, page when known, then the text.
fn format_search_result(hit: &SearchHit) -> String {
    let mut block = format!("Score: {:.4} (closer to 1 is better)\n", 1.0 - hit.distance);

    if let Some(page) = hit.metadata.get("page") {
        match page {
            Value::String(s) => block.push_str(&format!("Page: {s}\n")),
            other => block.push_str(&format!("Page: {other}\n")),
        }
    }

    block.push_str("Content: ");
    block.push_str(&hit.document);
    block
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::StoreError;
    use crate::server::store::SearchStore;

    struct FixedStore(Vec<SearchHit>);

    impl SearchStore for FixedStore {
        fn query(&self, _text: &str, k: usize) -> Result<Vec<SearchHit>, StoreError> {
            Ok(self.0.iter().take(k).cloned().collect())
        }

        fn count(&self) -> Result<usize, StoreError> {
            Ok(self.0.len())
        }
    }

    struct BrokenStore;

    impl SearchStore for BrokenStore {
        fn query(&self, _text: &str, _k: usize) -> Result<Vec<SearchHit>, StoreError> {
            Err(StoreError::Query("index corrupted".to_string()))
        }

        fn count(&self) -> Result<usize, StoreError> {
            Err(StoreError::Query("index corrupted".to_string()))
        }
    }

    fn hit(document: &str, distance: f64, page: Option<u64>) -> SearchHit {
        let mut metadata = serde_json::Map::new();
        if let Some(page) = page {
            metadata.insert("page".to_string(), json!(page));
        }
        SearchHit {
            document: document.to_string(),
            distance,
            metadata,
        }
    }

    fn ctx_with(store: impl SearchStore + 'static) -> ServerContext {
        ServerContext::new("docs", "pdf").with_store(Arc::new(store))
    }

    #[test]
    fn tool_definitions_valid() {
        let tools = ToolExecutor::definitions();
        assert_eq!(tools.len(), 2);
        for tool in &tools {
            assert!(!tool.name.is_empty());
            assert!(tool.input_schema.is_object());
        }
        assert_eq!(tools[0].input_schema["required"], json!(["query_text"]));
        let num_results = &tools[0].input_schema["properties"]["num_results"];
        assert_eq!(num_results["maximum"], json!(MAX_NUM_RESULTS));
        assert!(num_results["description"].as_str().unwrap().contains("max: 100"));
    }

    #[test]
    fn uninitialised_store_is_text_not_error() {
        let ctx = ServerContext::new("docs", "pdf");
        let executor = ToolExecutor::new(&ctx);

        let result = executor
            .call("query_document", &json!({"query_text": "x"}))
            .unwrap();
        assert!(!result.is_error);
        assert!(result.joined_text().contains("not initialized"));

        let info = executor.call("get_collection_info", &json!({})).unwrap();
        assert!(info.joined_text().contains("not initialized"));
    }

    #[test]
    fn formats_ranked_hits() {
        let ctx = ctx_with(FixedStore(vec![
            hit("first chunk", 0.1, Some(4)),
            hit("second chunk", 0.25, None),
        ]));
        let result = ToolExecutor::new(&ctx)
            .call("query_document", &json!({"query_text": "chunk"}))
            .unwrap();
        let text = result.joined_text();

        assert_eq!(
            text,
            "Result 1:\nScore: 0.9000 (closer to 1 is better)\nPage: 4\nContent: first chunk\
             \n\n---\n\n\
             Result 2:\nScore: 0.7500 (closer to 1 is better)\nContent: second chunk"
        );
    }

    #[test]
    fn num_results_limits_hits() {
        let ctx = ctx_with(FixedStore(vec![
            hit("a", 0.1, None),
            hit("b", 0.2, None),
            hit("c", 0.3, None),
        ]));
        let result = ToolExecutor::new(&ctx)
            .call("query_document", &json!({"query_text": "x", "num_results": 2}))
            .unwrap();
        assert_eq!(result.joined_text().matches("Result ").count(), 2);
    }

    #[test]
    fn no_hits_reports_no_results() {
        let ctx = ctx_with(FixedStore(Vec::new()));
        let result = ToolExecutor::new(&ctx)
            .call("query_document", &json!({"query_text": "x"}))
            .unwrap();
        assert_eq!(result.joined_text(), "No results found for your query.");
    }

    #[test]
    fn bad_arguments_are_error_results() {
        let ctx = ctx_with(FixedStore(Vec::new()));
        let executor = ToolExecutor::new(&ctx);

        let missing = executor.call("query_document", &json!({})).unwrap();
        assert!(missing.is_error);
        assert!(missing.joined_text().contains("query_text"));

        let negative = executor
            .call("query_document", &json!({"query_text": "x", "num_results": -1}))
            .unwrap();
        assert!(negative.is_error);

        let too_many = executor
            .call("query_document", &json!({"query_text": "x", "num_results": 101}))
            .unwrap();
        assert!(too_many.is_error);
        assert!(too_many.joined_text().contains("between 1 and 100"));

        let largest = executor
            .call("query_document", &json!({"query_text": "x", "num_results": 100}))
            .unwrap();
        assert!(!largest.is_error);
    }

    #[test]
    fn store_failure_is_text() {
        let ctx = ctx_with(BrokenStore);
        let executor = ToolExecutor::new(&ctx);

        let result = executor
            .call("query_document", &json!({"query_text": "x"}))
            .unwrap();
        assert!(result.joined_text().contains("index corrupted"));

        let info = executor.call("get_collection_info", &json!({})).unwrap();
        assert!(info.joined_text().starts_with("Error getting collection info"));
    }

    #[test]
    fn collection_info_two_lines() {
        let ctx = ctx_with(FixedStore(vec![hit("a", 0.0, None)]));
        let result = ToolExecutor::new(&ctx)
            .call("get_collection_info", &json!({}))
            .unwrap();
        assert_eq!(
            result.joined_text(),
            "Collection name: pdf_collection\nNumber of documents: 1"
        );
    }

    #[test]
    fn unknown_tool_is_routing_error() {
        let ctx = ServerContext::new("docs", "pdf");
        let err = ToolExecutor::new(&ctx).call("drop_tables", &json!({})).unwrap_err();
        assert_eq!(err, RouteError::UnknownTool("drop_tables".to_string()));
    }
}
