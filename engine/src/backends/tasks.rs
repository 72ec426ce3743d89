//! Task backend
//!
//! Answers task-management questions through the Asana MCP server. The
//! server runs as a child process for the lifetime of the backend; each of
//! its tools is exposed to a Japanese task-assistant agent.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::agent::{extract_final_answer, AgentCore};
use crate::config::{AgentConfig, TasksConfig};
use crate::llm::router::LLMRouter;
use crate::mcp::{McpClient, McpServerConfig, McpTool};
use crate::secrets::SecretCache;
use crate::tools::ToolRegistry;
use sdk::errors::EngineError;

/// Keychain / environment key for the Asana personal access token
pub const ASANA_ACCESS_TOKEN: &str = "asana_access_token";

/// Returned when the agent produced no usable answer
pub const TASK_FALLBACK: &str = "申し訳ございません。Asanaからの情報を取得できませんでした。";

const SYSTEM_PROMPT: &str = "\
あなたはAsanaタスク管理のアシスタントです。
ユーザーの質問に対して、利用可能なAsanaツールを使用して情報を取得し、日本語で応答してください。

重要なルール：
1. 常に日本語で応答する
2. プロジェクト一覧を取得する場合、まずワークスペース一覧を取得してから、各ワークスペースのプロジェクトを検索する
3. エラーが発生した場合は、わかりやすく日本語で説明する
4. 思考過程（<thinking>タグ）は最終出力に含めない
5. ツールの実行結果を元に、簡潔でわかりやすい応答を生成する

利用可能なツール:
- asana_list_workspaces: ワークスペース一覧を取得
- asana_search_projects: 特定のワークスペース内のプロジェクトを検索
- asana_search_tasks: タスクを検索
- その他多数のAsana操作ツール";

const QUERY_NOTES: &str = "注意: \n\
- プロジェクト一覧を取得する場合は、まずasana_list_workspacesでワークスペースを取得してください\n\
- その後、各ワークスペースに対してasana_search_projectsを使用してプロジェクトを検索してください\n\
- 最終的な応答は日本語で、ユーザーにわかりやすく整形してください";

/// Append the workspace-first lookup instructions to a user query
pub fn enhance_query(query: &str) -> String {
    format!("{}\n\n{}", query, QUERY_NOTES)
}

/// Task-management backend backed by an MCP tool server
pub struct TaskBackend {
    client: Arc<McpClient>,
    agent: AgentCore,
    tool_count: usize,
}

impl TaskBackend {
    /// Spawn the tool server and build the agent over its tools
    ///
    /// # Errors
    ///
    /// - `KeyringError` if no access token is available
    /// - `Mcp` if the server cannot be started or listed
    pub async fn connect(
        tasks: &TasksConfig,
        agent_config: &AgentConfig,
        secrets: &SecretCache,
        router: Arc<LLMRouter>,
    ) -> Result<Self, EngineError> {
        let token = secrets.get_secret(ASANA_ACCESS_TOKEN)?;

        let server = McpServerConfig::new("asana", &tasks.command, tasks.args.clone())
            .with_env(SecretCache::env_var_name(ASANA_ACCESS_TOKEN), token)
            .with_timeout(Duration::from_secs(tasks.request_timeout_secs));

        let client = Arc::new(McpClient::spawn(server).await?);
        Self::from_client(client, agent_config, router).await
    }

    /// Build the backend over an already-connected client
    pub async fn from_client(
        client: Arc<McpClient>,
        agent_config: &AgentConfig,
        router: Arc<LLMRouter>,
    ) -> Result<Self, EngineError> {
        let infos = client.list_tools().await?;
        let names: Vec<&str> = infos.iter().map(|t| t.name.as_str()).collect();
        info!("Loaded {} Asana tools: {}", infos.len(), names.join(", "));

        let mut registry = ToolRegistry::empty();
        for tool in McpTool::wrap_all(&client, infos) {
            registry.register(tool);
        }
        let tool_count = registry.len();

        let agent = AgentCore::new(router, Arc::new(registry), SYSTEM_PROMPT).with_config(agent_config);

        Ok(Self {
            client,
            agent,
            tool_count,
        })
    }

    /// Answer a task question
    pub async fn handle(&self, query: &str) -> Result<String, EngineError> {
        let run = self.agent.run(&enhance_query(query)).await?;
        Ok(extract_final_answer(&run.transcript, TASK_FALLBACK))
    }

    /// The tool server is still running
    pub fn is_connected(&self) -> bool {
        self.client.is_connected()
    }

    /// Number of tools exposed to the agent
    pub fn tool_count(&self) -> usize {
        self.tool_count
    }

    /// Stop the tool server
    pub async fn close(&self) -> Result<(), EngineError> {
        self.client.close().await?;
        Ok(())
    }
}
