//! Fixed prompt templates for document analysis.
//!
//! Each prompt renders to two messages: an assistant message establishing
//! the persona, then a user message carrying the task with the argument
//! substituted verbatim.

use serde_json::{Map, Value};

use crate::error::RouteError;
use crate::mcp::types::{GetPromptResult, Prompt, PromptArgument, PromptMessage, Role};

const DEEP_ANALYSIS: &str = "deep_analysis";
const EXTRACT_KEY_INFORMATION: &str = "extract_key_information";

/// Renders the document prompts.
pub struct PromptRenderer;

impl PromptRenderer {
    /// Returns the advertised prompts.
    #[must_use]
    pub fn definitions() -> Vec<Prompt> {
        vec![
            Prompt {
                name: DEEP_ANALYSIS.to_string(),
                description: Some("Perform deep analysis on document sections".to_string()),
                arguments: vec![PromptArgument {
                    name: "query".to_string(),
                    description: Some(
                        "What aspect to analyze (e.g., 'main themes', 'methodology')".to_string(),
                    ),
                    required: true,
                }],
            },
            Prompt {
                name: EXTRACT_KEY_INFORMATION.to_string(),
                description: Some(
                    "Extract specific types of information from document sections".to_string(),
                ),
                arguments: vec![PromptArgument {
                    name: "info_type".to_string(),
                    description: Some(
                        "Type of information to extract (definitions, people, statistics, \
                         processes, arguments)"
                            .to_string(),
                    ),
                    required: true,
                }],
            },
        ]
    }

    /// Renders the prompt named `name`.
    ///
    /// Missing arguments fall back to `"main themes"` (`query`) and
    /// `"key information"` (`info_type`).
    ///
    /// # Errors
    ///
    /// Returns [`RouteError::UnknownPrompt`] if no such prompt exists.
    pub fn render(
        name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<GetPromptResult, RouteError> {
        match name {
            DEEP_ANALYSIS => {
                let query = argument(arguments, "query", "main themes");
                Ok(deep_analysis(&query))
            }
            EXTRACT_KEY_INFORMATION => {
                let info_type = argument(arguments, "info_type", "key information");
                Ok(extract_key_information(&info_type))
            }
            _ => Err(RouteError::UnknownPrompt(name.to_string())),
        }
    }
}

/// Reads a string argument; non-string scalars are rendered as JSON.
fn argument(arguments: &Map<String, Value>, name: &str, default: &str) -> String {
    match arguments.get(name) {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => default.to_string(),
        Some(other) => other.to_string(),
    }
}

fn deep_analysis(query: &str) -> GetPromptResult {
    GetPromptResult {
        description: Some(format!("Deep analysis focusing on {query}")),
        messages: vec![
            PromptMessage::text(
                Role::Assistant,
                "I am a document analysis expert specializing in identifying key themes, \
                 arguments, and evidence in academic and technical documents.",
            ),
            PromptMessage::text(
                Role::User,
                format!(
                    "Please perform a deep analysis of the document section provided in the \
                     conversation, focusing on {query}.\n\
                     Include in your analysis:\n\
                     - Main themes and arguments presented\n\
                     - Key evidence and supporting details\n\
                     - Logical structure and flow of information\n\
                     - Implicit assumptions made in the text\n\
                     - Strengths and weaknesses of the arguments\n\
                     - Connections to broader context if applicable\n\n\
                     Format your analysis in a well-structured manner with clear headings and \
                     concise explanations."
                ),
            ),
        ],
    }
}

fn extract_key_information(info_type: &str) -> GetPromptResult {
    GetPromptResult {
        description: Some(format!(
            "Extracting all mentions of {info_type} from document"
        )),
        messages: vec![
            PromptMessage::text(
                Role::Assistant,
                "I am a precise information extraction specialist with expertise in technical \
                 documents.",
            ),
            PromptMessage::text(
                Role::User,
                format!(
                    "Based on the document section provided in the conversation, please extract \
                     all mentions of {info_type}.\n\
                     Format your response as a structured list with:\n\
                     1. Clear headers for each extracted element\n\
                     2. Direct quotes or references when applicable\n\
                     3. Brief explanations of significance where helpful\n\
                     4. Page or section references if available\n\
                     Be comprehensive but focus on quality over quantity. If no mention of the \
                     requested {info_type} is found, just return \"No mentions of {info_type} \
                     found.\""
                ),
            ),
        ],
    }
}
