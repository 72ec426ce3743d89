//! Knowledge-base backend
//!
//! Answers questions about internal documents. A [`Retriever`] fetches the
//! most relevant passages; the agent is given them through a single
//! `search_knowledge_base` tool and writes the answer in Japanese, citing
//! sources.
//!
//! [`BedrockRetriever`] calls the Bedrock Agent Runtime `Retrieve` operation
//! over HTTPS. Requests carry an optional bearer token; SigV4 signing is left
//! to a proxy in front of the endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::agent::{extract_final_answer, AgentCore};
use crate::config::{AgentConfig, KnowledgeBaseConfig};
use crate::llm::router::LLMRouter;
use crate::secrets::{scrub, SecretString};
use crate::tools::{Tool, ToolRegistry};
use sdk::errors::EngineError;

/// Keychain / environment key for the retrieval bearer token
pub const KNOWLEDGE_BASE_TOKEN: &str = "knowledge_base_token";

/// Returned when the agent produced no usable answer
pub const KNOWLEDGE_BASE_FALLBACK: &str = "申し訳ございません。関連する文書が見つかりませんでした。";

/// Tool output when retrieval returns nothing
const NO_DOCUMENTS: &str = "関連する文書が見つかりませんでした。";

const SYSTEM_PROMPT: &str = "\
あなたは社内文書検索のアシスタントです。
AWS Bedrock Knowledge Baseから関連する文書を検索し、その内容に基づいて日本語で正確に回答してください。

重要なルール：
1. 常に日本語で応答する
2. Knowledge Baseから取得した情報に基づいて回答する
3. 情報が見つからない場合は、その旨を明確に伝える
4. 複数の関連文書が見つかった場合は、最も関連性の高い情報を優先する
5. 回答には出典（文書名やセクション）を含める
6. 推測や憶測は避け、文書に記載されている内容のみを伝える

回答フォーマット：
- 見つかった情報を簡潔にまとめる
- 必要に応じて箇条書きを使用する
- 出典を明記する（例：「〇〇マニュアルによると...」）";

/// One passage returned by a retriever
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDocument {
    /// Passage text
    pub content: String,

    /// Location of the source document, if known
    pub source: Option<String>,

    /// Relevance score, higher is better
    pub score: Option<f64>,
}

/// Fetches passages relevant to a query
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, EngineError>;
}

/// Bedrock knowledge base retriever
pub struct BedrockRetriever {
    client: Client,
    endpoint: String,
    knowledge_base_id: String,
    number_of_results: u32,
    search_type: String,
    token: Option<SecretString>,
}

impl BedrockRetriever {
    /// Build a retriever from the `[knowledge_base]` section
    ///
    /// # Errors
    /// `EngineError::IntegrationDisabled` if no knowledge base id is set.
    pub fn new(config: &KnowledgeBaseConfig, token: Option<SecretString>) -> Result<Self, EngineError> {
        let knowledge_base_id = config
            .knowledge_base_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| {
                EngineError::IntegrationDisabled("knowledge_base_id is not configured".to_string())
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| EngineError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.resolved_endpoint(),
            knowledge_base_id,
            number_of_results: config.number_of_results,
            search_type: config.search_type.clone(),
            token,
        })
    }

    pub fn knowledge_base_id(&self) -> &str {
        &self.knowledge_base_id
    }

    fn request_body(&self, query: &str) -> Value {
        json!({
            "retrievalQuery": { "text": query },
            "retrievalConfiguration": {
                "vectorSearchConfiguration": {
                    "numberOfResults": self.number_of_results,
                    "overrideSearchType": self.search_type,
                }
            }
        })
    }
}

#[async_trait]
impl Retriever for BedrockRetriever {
    async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, EngineError> {
        let url = format!(
            "{}/knowledgebases/{}/retrieve",
            self.endpoint, self.knowledge_base_id
        );

        let mut request = self.client.post(&url).json(&self.request_body(query));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.unsecure());
        }

        let response = request
            .send()
            .await
            .map_err(|e| EngineError::Network(format!("Knowledge base request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Retrieval(format!(
                "Knowledge base returned {}: {}",
                status,
                scrub(&body)
            )));
        }

        let body: RetrieveResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Retrieval(format!("Invalid retrieve response: {}", e)))?;

        let documents: Vec<RetrievedDocument> = body
            .retrieval_results
            .into_iter()
            .map(RetrievalResult::into_document)
            .collect();

        tracing::info!(
            "Retrieved {} documents from knowledge base {}",
            documents.len(),
            self.knowledge_base_id
        );

        Ok(documents)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RetrieveResponse {
    #[serde(default)]
    retrieval_results: Vec<RetrievalResult>,
}

#[derive(Debug, Deserialize)]
struct RetrievalResult {
    #[serde(default)]
    content: Value,
    #[serde(default)]
    location: Value,
    #[serde(default)]
    metadata: Value,
    #[serde(default)]
    score: Option<f64>,
}

impl RetrievalResult {
    fn into_document(self) -> RetrievedDocument {
        let content = self
            .content
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        RetrievedDocument {
            content,
            source: find_location(&self.location).or_else(|| {
                self.metadata
                    .get("x-amz-bedrock-kb-source-uri")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            }),
            score: self.score,
        }
    }
}

/// First `uri` or `url` string inside a location object of any type
fn find_location(location: &Value) -> Option<String> {
    match location {
        Value::Object(map) => {
            for key in ["uri", "url"] {
                if let Some(found) = map.get(key).and_then(Value::as_str) {
                    return Some(found.to_string());
                }
            }
            map.values().find_map(find_location)
        }
        _ => None,
    }
}

/// Render passages for the model, numbered, with their sources
pub fn format_documents(documents: &[RetrievedDocument]) -> String {
    if documents.is_empty() {
        return NO_DOCUMENTS.to_string();
    }

    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| {
            let mut header = format!("[{}]", i + 1);
            if let Some(source) = &doc.source {
                header.push_str(&format!(" 出典: {}", source));
            }
            if let Some(score) = doc.score {
                header.push_str(&format!(" (score: {:.2})", score));
            }
            format!("{}\n{}", header, doc.content.trim())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `search_knowledge_base` tool over a retriever
pub struct SearchKnowledgeBaseTool {
    retriever: Arc<dyn Retriever>,
}

impl SearchKnowledgeBaseTool {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Tool for SearchKnowledgeBaseTool {
    fn name(&self) -> &str {
        "search_knowledge_base"
    }

    fn description(&self) -> &str {
        "社内文書やマニュアルを検索します。質問に関連する文書を探すときに使用します。"
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": { "type": "string", "description": "検索クエリ" }
            },
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> Result<String, EngineError> {
        let query = match &args {
            Value::String(s) => s.as_str(),
            _ => args
                .get("query")
                .and_then(Value::as_str)
                .ok_or_else(|| EngineError::ToolError("missing 'query' argument".to_string()))?,
        };

        let documents = self.retriever.retrieve(query).await?;
        Ok(format_documents(&documents))
    }
}

/// Document-retrieval backend
pub struct KnowledgeBaseBackend {
    agent: AgentCore,
}

impl KnowledgeBaseBackend {
    pub fn new(retriever: Arc<dyn Retriever>, router: Arc<LLMRouter>, agent_config: &AgentConfig) -> Self {
        let tools = ToolRegistry::empty().with_tool(Box::new(SearchKnowledgeBaseTool::new(retriever)));
        let agent = AgentCore::new(router, Arc::new(tools), SYSTEM_PROMPT).with_config(agent_config);

        Self { agent }
    }

    /// Answer a document question
    pub async fn handle(&self, query: &str) -> Result<String, EngineError> {
        let run = self.agent.run(query).await?;
        Ok(extract_final_answer(&run.transcript, KNOWLEDGE_BASE_FALLBACK))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_knowledge_base_id() {
        let config = KnowledgeBaseConfig::default();
        assert!(matches!(
            BedrockRetriever::new(&config, None),
            Err(EngineError::IntegrationDisabled(_))
        ));
    }

    #[test]
    fn test_request_body_shape() {
        let config = KnowledgeBaseConfig {
            knowledge_base_id: Some("KB123".to_string()),
            ..KnowledgeBaseConfig::default()
        };
        let retriever = BedrockRetriever::new(&config, None).unwrap();

        let body = retriever.request_body("経費精算の手順");
        assert_eq!(body["retrievalQuery"]["text"], "経費精算の手順");
        assert_eq!(
            body["retrievalConfiguration"]["vectorSearchConfiguration"]["numberOfResults"],
            5
        );
        assert_eq!(
            body["retrievalConfiguration"]["vectorSearchConfiguration"]["overrideSearchType"],
            "HYBRID"
        );
        assert_eq!(
            retriever.endpoint,
            "https://bedrock-agent-runtime.us-west-2.amazonaws.com"
        );
    }

    #[test]
    fn test_result_conversion() {
        let result: RetrievalResult = serde_json::from_value(json!({
            "content": { "text": "経費は月末までに申請してください。" },
            "location": { "type": "S3", "s3Location": { "uri": "s3://docs/expense.pdf" } },
            "score": 0.87
        }))
        .unwrap();

        let doc = result.into_document();
        assert_eq!(doc.content, "経費は月末までに申請してください。");
        assert_eq!(doc.source.as_deref(), Some("s3://docs/expense.pdf"));
        assert_eq!(doc.score, Some(0.87));
    }

    #[test]
    fn test_source_falls_back_to_metadata() {
        let result: RetrievalResult = serde_json::from_value(json!({
            "content": { "text": "x" },
            "metadata": { "x-amz-bedrock-kb-source-uri": "s3://docs/a.md" }
        }))
        .unwrap();
        assert_eq!(result.into_document().source.as_deref(), Some("s3://docs/a.md"));
    }

    #[test]
    fn test_format_documents() {
        assert_eq!(format_documents(&[]), NO_DOCUMENTS);

        let text = format_documents(&[
            RetrievedDocument {
                content: "本文A".to_string(),
                source: Some("s3://docs/a.pdf".to_string()),
                score: Some(0.9),
            },
            RetrievedDocument {
                content: "本文B".to_string(),
                source: None,
                score: None,
            },
        ]);
        assert_eq!(
            text,
            "[1] 出典: s3://docs/a.pdf (score: 0.90)\n本文A\n\n[2]\n本文B"
        );
    }

    struct StaticRetriever;

    #[async_trait]
    impl Retriever for StaticRetriever {
        async fn retrieve(&self, query: &str) -> Result<Vec<RetrievedDocument>, EngineError> {
            Ok(vec![RetrievedDocument {
                content: format!("hit for {}", query),
                source: None,
                score: None,
            }])
        }
    }

    #[tokio::test]
    async fn test_search_tool_accepts_object_or_string() {
        let tool = SearchKnowledgeBaseTool::new(Arc::new(StaticRetriever));

        let out = tool.call(json!({ "query": "規程" })).await.unwrap();
        assert!(out.contains("hit for 規程"));

        let out = tool.call(json!("ポリシー")).await.unwrap();
        assert!(out.contains("hit for ポリシー"));

        assert!(tool.call(json!({})).await.is_err());
    }
}
