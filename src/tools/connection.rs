//! Connection tools: `list_connections` and `use_connection`.

use crate::db::ConnectionRegistry;
use crate::error::DbResult;
use crate::models::ConnectionSummary;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Output for the list_connections tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ListConnectionsOutput {
    /// Configured connections; passwords are masked
    pub connections: Vec<ConnectionSummary>,
    /// Name of the connection tools currently run against
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<String>,
}

/// Input for the use_connection tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UseConnectionInput {
    /// Connection name from list_connections
    pub name: String,
}

/// Output for the use_connection tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct UseConnectionOutput {
    pub active: String,
    pub message: String,
}

/// Handler for the registry facade tools.
pub struct ConnectionToolHandler {
    registry: Arc<ConnectionRegistry>,
}

impl ConnectionToolHandler {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub async fn list_connections(&self) -> ListConnectionsOutput {
        let connections = self.registry.list().await;
        let active = connections
            .iter()
            .find(|c| c.active)
            .map(|c| c.name.clone());
        ListConnectionsOutput {
            connections,
            active,
        }
    }

    pub async fn use_connection(&self, input: UseConnectionInput) -> DbResult<UseConnectionOutput> {
        let name = input.name.trim();
        self.registry.set_active(name).await?;
        Ok(UseConnectionOutput {
            active: name.to_string(),
            message: format!("Switched to connection '{}'", name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::registry::build_pool;
    use crate::error::DbError;
    use crate::models::ConnectionConfig;

    async fn handler(names: &[&str]) -> (ConnectionToolHandler, Arc<ConnectionRegistry>) {
        let registry = Arc::new(ConnectionRegistry::new());
        for name in names {
            let config = ConnectionConfig::new(*name, "u:secret@tcp(db.invalid:3306)/app");
            let pool = build_pool(&config).unwrap();
            registry.add_pool(config, pool).await.unwrap();
        }
        (ConnectionToolHandler::new(registry.clone()), registry)
    }

    #[tokio::test]
    async fn test_list_connections() {
        let (handler, registry) = handler(&["primary", "replica"]).await;
        let output = handler.list_connections().await;

        assert_eq!(output.connections.len(), 2);
        assert_eq!(output.active.as_deref(), Some("primary"));
        assert!(output.connections.iter().all(|c| !c.dsn.contains("secret")));
        registry.close().await;
    }

    #[tokio::test]
    async fn test_use_connection() {
        let (handler, registry) = handler(&["primary", "replica"]).await;

        let output = handler
            .use_connection(UseConnectionInput {
                name: "replica".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(output.active, "replica");
        assert_eq!(
            handler.list_connections().await.active.as_deref(),
            Some("replica")
        );

        let err = handler
            .use_connection(UseConnectionInput {
                name: "missing".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, DbError::unknown_connection("missing"));
        registry.close().await;
    }

    #[tokio::test]
    async fn test_list_empty_registry() {
        let (handler, _registry) = handler(&[]).await;
        let output = handler.list_connections().await;
        assert!(output.connections.is_empty());
        assert_eq!(output.active, None);
    }
}
