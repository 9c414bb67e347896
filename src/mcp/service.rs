//! MCP service implementation using rmcp.
//!
//! This module defines the MySqlService struct with every tool exposed via
//! the MCP protocol using the rmcp framework's macros. All tools run against
//! the registry's active connection.

use crate::db::{ConnectionRegistry, QueryExecutor, SchemaInspector};
use crate::error::DbError;
use crate::tools::connection::{
    ConnectionToolHandler, ListConnectionsOutput, UseConnectionInput, UseConnectionOutput,
};
use crate::tools::query::{ExplainQueryInput, QueryOutput, QueryToolHandler, RunQueryInput};
use crate::tools::schema::{
    DescribeTableInput, DescribeTableOutput, ListDatabasesOutput, ListIndexesOutput,
    ListTablesInput, ListTablesOutput, SchemaToolHandler, ShowCreateTableOutput, TableRefInput,
};
use crate::tools::vector::{VectorSearchInput, VectorToolHandler};
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct MySqlService {
    /// Shared registry of named pools
    registry: Arc<ConnectionRegistry>,
    /// Row limits and query timeout for every statement
    executor: QueryExecutor,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl MySqlService {
    /// Create a new MySqlService instance.
    pub fn new(registry: Arc<ConnectionRegistry>, executor: QueryExecutor) -> Self {
        Self {
            registry,
            executor,
            tool_router: Self::tool_router(),
        }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    fn query_handler(&self) -> QueryToolHandler {
        QueryToolHandler::new(self.registry.clone(), self.executor)
    }

    fn schema_handler(&self) -> SchemaToolHandler {
        SchemaToolHandler::new(self.registry.clone(), SchemaInspector::new(self.executor))
    }
}

fn to_mcp(err: DbError) -> McpError {
    McpError::from(err)
}

#[tool_router]
impl MySqlService {
    #[tool(
        description = "List the configured MySQL connections.\nReturns names, masked DSNs, descriptions and which connection is active."
    )]
    async fn list_connections(&self) -> Json<ListConnectionsOutput> {
        let handler = ConnectionToolHandler::new(self.registry.clone());
        Json(handler.list_connections().await)
    }

    #[tool(
        description = "Switch the active connection.\nAll other tools run against the active connection."
    )]
    async fn use_connection(
        &self,
        Parameters(input): Parameters<UseConnectionInput>,
    ) -> Result<Json<UseConnectionOutput>, McpError> {
        let handler = ConnectionToolHandler::new(self.registry.clone());
        handler.use_connection(input).await.map(Json).map_err(to_mcp)
    }

    #[tool(
        description = "Execute a single read-only statement (SELECT, SHOW, DESCRIBE, EXPLAIN) and return results.\nWrites, DDL, multiple statements, comments, file access, locking functions and system schemas are rejected.\nOptional `database` runs USE first for this statement only.\nOutput format: json (default), table, or markdown."
    )]
    async fn run_query(
        &self,
        Parameters(input): Parameters<RunQueryInput>,
    ) -> Result<Json<QueryOutput>, McpError> {
        self.query_handler()
            .run_query(input)
            .await
            .map(Json)
            .map_err(to_mcp)
    }

    #[tool(
        description = "Show the execution plan of a SELECT statement without running it.\nUseful for understanding index usage.\nOutput format: json (default), table, or markdown."
    )]
    async fn explain_query(
        &self,
        Parameters(input): Parameters<ExplainQueryInput>,
    ) -> Result<Json<QueryOutput>, McpError> {
        self.query_handler()
            .explain_query(input)
            .await
            .map(Json)
            .map_err(to_mcp)
    }

    #[tool(description = "List all databases visible on the active connection.")]
    async fn list_databases(&self) -> Result<Json<ListDatabasesOutput>, McpError> {
        self.schema_handler()
            .list_databases()
            .await
            .map(Json)
            .map_err(to_mcp)
    }

    #[tool(
        description = "List tables and views in a database with engine, estimated row count, size and comment."
    )]
    async fn list_tables(
        &self,
        Parameters(input): Parameters<ListTablesInput>,
    ) -> Result<Json<ListTablesOutput>, McpError> {
        self.schema_handler()
            .list_tables(input)
            .await
            .map(Json)
            .map_err(to_mcp)
    }

    #[tool(
        description = "Describe the columns of a table: type, nullability, key, default, extra, collation and comment."
    )]
    async fn describe_table(
        &self,
        Parameters(input): Parameters<DescribeTableInput>,
    ) -> Result<Json<DescribeTableOutput>, McpError> {
        self.schema_handler()
            .describe_table(input)
            .await
            .map(Json)
            .map_err(to_mcp)
    }

    #[tool(description = "List the indexes of a table with their columns in index order.")]
    async fn list_indexes(
        &self,
        Parameters(input): Parameters<TableRefInput>,
    ) -> Result<Json<ListIndexesOutput>, McpError> {
        self.schema_handler()
            .list_indexes(input)
            .await
            .map(Json)
            .map_err(to_mcp)
    }

    #[tool(description = "Return the CREATE TABLE (or CREATE VIEW) statement of a table.")]
    async fn show_create_table(
        &self,
        Parameters(input): Parameters<TableRefInput>,
    ) -> Result<Json<ShowCreateTableOutput>, McpError> {
        self.schema_handler()
            .show_create_table(input)
            .await
            .map(Json)
            .map_err(to_mcp)
    }

    #[tool(
        description = "Nearest-neighbour search over a VECTOR column.\nReturns rows ordered by the `_distance` column (COSINE, EUCLIDEAN or DOT).\n`select` is a column list and `where` a filter body; both are validated."
    )]
    async fn vector_search(
        &self,
        Parameters(input): Parameters<VectorSearchInput>,
    ) -> Result<Json<QueryOutput>, McpError> {
        VectorToolHandler::new(self.registry.clone(), self.executor)
            .vector_search(input)
            .await
            .map(Json)
            .map_err(to_mcp)
    }
}

#[tool_handler]
impl ServerHandler for MySqlService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: env!("CARGO_PKG_NAME").to_owned(),
                title: Some("MySQL MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Read-only tools for inspecting and querying MySQL.\n\
                \n\
                ## Workflow\n\
                1. Call `list_connections` to see the configured connections and which is active\n\
                2. Optionally switch with `use_connection`\n\
                3. Explore with `list_databases`, `list_tables`, `describe_table`, `list_indexes`\n\
                4. Query with `run_query`; pass `database` instead of writing `USE`\n\
                \n\
                ## Safety\n\
                Every statement passes a read-only gate. Only one SELECT, SHOW, DESCRIBE or\n\
                EXPLAIN statement is accepted per call. Comments, INTO OUTFILE, LOAD_FILE,\n\
                SLEEP, lock functions and the mysql/sys/information_schema/performance_schema\n\
                schemas are rejected. A rejection names the reason; rewrite the statement\n\
                rather than retrying it unchanged."
                    .to_string(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn create_test_service() -> MySqlService {
        MySqlService::new(
            Arc::new(ConnectionRegistry::new()),
            QueryExecutor::new(Duration::from_secs(5), 0),
        )
    }

    #[test]
    fn test_server_info() {
        let service = create_test_service();
        let info = service.get_info();
        assert_eq!(info.server_info.name, "mysql-mcp-server");
        assert!(info.capabilities.tools.is_some());
        assert!(info.instructions.unwrap().contains("run_query"));
    }

    #[test]
    fn test_all_tools_registered() {
        let service = create_test_service();
        let mut names: Vec<String> = service
            .tool_router
            .list_all()
            .into_iter()
            .map(|t| t.name.to_string())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "describe_table",
                "explain_query",
                "list_connections",
                "list_databases",
                "list_indexes",
                "list_tables",
                "run_query",
                "show_create_table",
                "use_connection",
                "vector_search",
            ]
        );
    }

    #[tokio::test]
    async fn test_rejection_surfaces_as_invalid_params() {
        let service = create_test_service();
        let result = service
            .run_query(Parameters(RunQueryInput {
                sql: "SELECT * FROM users; DROP TABLE users".to_string(),
                database: None,
                max_rows: None,
                format: Default::default(),
            }))
            .await;
        let Err(err) = result else {
            panic!("stacked statements were accepted");
        };
        assert_eq!(err.code.0, -32602);
        assert!(err.message.contains("multiple statements"));
    }

    #[tokio::test]
    async fn test_no_active_connection_is_internal_error() {
        let service = create_test_service();
        let Err(err) = service.list_databases().await else {
            panic!("expected an error without an active connection");
        };
        assert_eq!(err.code.0, -32603);
    }
}
