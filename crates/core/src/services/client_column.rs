//! Per-gallery client column definitions.

use std::collections::HashSet;

use chrono::Utc;
use maws_common::{AppResult, IdGenerator};
use maws_db::{entities::client_column, repositories::ClientColumnRepository};
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::Validate;

fn default_column_type() -> String {
    "text".to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateColumnInput {
    #[validate(length(min = 1, max = 100))]
    pub header: String,
    #[validate(length(min = 1, max = 100))]
    pub accessor: String,
    #[serde(default = "default_column_type", alias = "type")]
    #[validate(length(min = 1, max = 20))]
    pub column_type: String,
    #[serde(default)]
    pub order: i32,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateColumnInput {
    #[validate(length(min = 1, max = 100))]
    pub header: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub accessor: Option<String>,
    #[serde(alias = "type")]
    #[validate(length(min = 1, max = 20))]
    pub column_type: Option<String>,
    pub order: Option<i32>,
}

/// One entry of a posted column list. Entries without an accessor or header
/// are skipped.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncColumn {
    pub accessor: Option<String>,
    pub header: Option<String>,
    #[serde(rename = "type")]
    pub column_type: Option<String>,
}

/// Client column service.
#[derive(Clone)]
pub struct ClientColumnService {
    column_repo: ClientColumnRepository,
    id_gen: IdGenerator,
}

impl ClientColumnService {
    /// Create a new client column service.
    #[must_use]
    pub const fn new(column_repo: ClientColumnRepository) -> Self {
        Self {
            column_repo,
            id_gen: IdGenerator::new(),
        }
    }

    #[must_use]
    pub const fn repository(&self) -> &ClientColumnRepository {
        &self.column_repo
    }

    pub(crate) fn new_model(
        &self,
        gallery_id: &str,
        header: String,
        accessor: String,
        column_type: String,
        order: i32,
    ) -> client_column::ActiveModel {
        client_column::ActiveModel {
            id: Set(self.id_gen.generate()),
            gallery_id: Set(gallery_id.to_string()),
            header: Set(header),
            accessor: Set(accessor),
            column_type: Set(column_type),
            order: Set(order),
            created_at: Set(Utc::now().into()),
        }
    }

    /// Columns ordered by position.
    pub async fn list(&self, gallery_id: &str) -> AppResult<Vec<client_column::Model>> {
        self.column_repo.find_by_gallery(gallery_id).await
    }

    pub async fn get(&self, gallery_id: &str, id: &str) -> AppResult<client_column::Model> {
        self.column_repo.get_in_gallery(gallery_id, id).await
    }

    pub async fn create(
        &self,
        gallery_id: &str,
        input: CreateColumnInput,
    ) -> AppResult<client_column::Model> {
        input.validate()?;
        self.column_repo
            .create(self.new_model(
                gallery_id,
                input.header,
                input.accessor,
                input.column_type,
                input.order,
            ))
            .await
    }

    pub async fn update(
        &self,
        gallery_id: &str,
        id: &str,
        input: UpdateColumnInput,
    ) -> AppResult<client_column::Model> {
        input.validate()?;
        let existing = self.column_repo.get_in_gallery(gallery_id, id).await?;

        let mut active: client_column::ActiveModel = existing.into();
        if let Some(header) = input.header {
            active.header = Set(header);
        }
        if let Some(accessor) = input.accessor {
            active.accessor = Set(accessor);
        }
        if let Some(column_type) = input.column_type {
            active.column_type = Set(column_type);
        }
        if let Some(order) = input.order {
            active.order = Set(order);
        }
        self.column_repo.update(active).await
    }

    pub async fn delete(&self, gallery_id: &str, id: &str) -> AppResult<()> {
        let column = self.column_repo.get_in_gallery(gallery_id, id).await?;
        self.column_repo.delete(&column.id).await
    }

    /// Replace the gallery's column set with `columns`, ordered by list
    /// position. A repeated accessor keeps its first entry.
    pub async fn sync(
        &self,
        gallery_id: &str,
        columns: Vec<SyncColumn>,
    ) -> AppResult<Vec<client_column::Model>> {
        let mut seen = HashSet::new();
        let models: Vec<_> = columns
            .into_iter()
            .enumerate()
            .filter_map(|(idx, col)| {
                let accessor = col.accessor.filter(|a| !a.trim().is_empty())?;
                let header = col.header.filter(|h| !h.trim().is_empty())?;
                seen.insert(accessor.clone()).then(|| {
                    self.new_model(
                        gallery_id,
                        header,
                        accessor,
                        col.column_type.unwrap_or_else(default_column_type),
                        i32::try_from(idx).unwrap_or(i32::MAX),
                    )
                })
            })
            .collect();

        let removed = self.column_repo.delete_by_gallery(gallery_id).await?;
        let created = models.len();
        self.column_repo.create_many(models).await?;

        info!(gallery_id = %gallery_id, removed, created, "Client columns synced");
        self.column_repo.find_by_gallery(gallery_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn column(accessor: &str, order: i32) -> client_column::Model {
        client_column::Model {
            id: format!("col-{accessor}"),
            gallery_id: "g1".to_string(),
            header: accessor.to_string(),
            accessor: accessor.to_string(),
            column_type: "text".to_string(),
            order,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_sync_replaces_columns() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // delete_by_gallery
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 3,
            }])
            // create_many
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 2,
            }])
            .append_query_results([[column("고객명", 0), column("직업", 2)]])
            .into_connection();

        let service = ClientColumnService::new(ClientColumnRepository::new(Arc::new(db)));
        let result = service
            .sync(
                "g1",
                vec![
                    SyncColumn {
                        accessor: Some("고객명".to_string()),
                        header: Some("고객명".to_string()),
                        column_type: None,
                    },
                    SyncColumn {
                        accessor: None,
                        header: Some("무시".to_string()),
                        column_type: None,
                    },
                    SyncColumn {
                        accessor: Some("직업".to_string()),
                        header: Some("직업".to_string()),
                        column_type: Some("text".to_string()),
                    },
                ],
            )
            .await
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[1].order, 2);
    }

    #[test]
    fn test_create_input_accepts_type_alias() {
        let input: CreateColumnInput =
            serde_json::from_str(r#"{"header":"직업","accessor":"job","type":"tag"}"#).unwrap();
        assert_eq!(input.column_type, "tag");
        assert_eq!(input.order, 0);
    }
}
