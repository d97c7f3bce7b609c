//! Corpus question answering exposed as a JSON tool call.
//!
//! The [`RagQueryTool`] wraps a [`RagPipeline`](crate::RagPipeline) so that an
//! agent loop or RPC layer can answer questions by name with JSON arguments.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docrag::{RagPipeline, RagQueryTool};
//!
//! let pipeline = Arc::new(build_pipeline()?);
//! let tool = RagQueryTool::new(pipeline);
//!
//! // The caller invokes the tool with:
//! // { "query": "How do I add a child node?", "top_k": 5 }
//! let result = tool.execute(args).await?;
//! ```

use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{error, info};

use crate::error::{RagError, Result};
use crate::pipeline::RagPipeline;

/// A question-answering tool backed by a [`RagPipeline`].
///
/// Accepts a required `query` string and an optional `top_k`, and returns
/// `{"answer": .., "citations": [..]}`.
pub struct RagQueryTool {
    pipeline: Arc<RagPipeline>,
}

impl RagQueryTool {
    /// Create a new tool answering from `pipeline`.
    pub fn new(pipeline: Arc<RagPipeline>) -> Self {
        Self { pipeline }
    }

    /// Name the tool is registered under.
    pub fn name(&self) -> &str {
        "rag.query"
    }

    /// One-line description for tool listings.
    pub fn description(&self) -> &str {
        "Answer a question from the documentation corpus, with citations"
    }

    /// JSON schema of the accepted arguments.
    pub fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The question to answer from the documentation"
                },
                "top_k": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Number of chunks to retrieve. Uses the pipeline default if omitted."
                }
            },
            "required": ["query"]
        })
    }

    /// Answer the question in `args`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if `query` is missing or `top_k` is
    /// not a positive integer, and propagates pipeline failures.
    pub async fn execute(&self, args: Value) -> Result<Value> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .ok_or_else(|| RagError::ConfigError("missing required 'query' parameter".into()))?;

        let top_k = match args.get("top_k") {
            None | Some(Value::Null) => self.pipeline.config().top_k,
            Some(v) => v
                .as_u64()
                .filter(|&k| k > 0)
                .map(|k| k as usize)
                .ok_or_else(|| RagError::ConfigError("'top_k' must be a positive integer".into()))?,
        };

        info!(query, top_k, "rag.query tool called");

        let answer = self.pipeline.answer(query, top_k, &[]).await.map_err(|e| {
            error!(error = %e, "rag.query failed");
            e
        })?;

        Ok(serde_json::to_value(&answer)?)
    }
}
