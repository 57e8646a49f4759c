//! Client service.
//!
//! Every creation path goes through [`ClientService::create_client`], which
//! ends by attaching the gallery's default tag to clients left untagged.

use chrono::Utc;
use maws_common::{AppError, AppResult, IdGenerator};
use maws_db::{
    entities::{client, tag},
    repositories::ClientRepository,
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use super::tag::TagService;

/// `data` keys that may hold the client's name when the column is empty.
const NAME_CANDIDATES: [&str; 3] = ["고객명", "customer_name", "name"];
/// `data` keys that may hold the client's phone when the column is empty.
const PHONE_CANDIDATES: [&str; 5] = ["연락처", "전화번호", "휴대폰", "핸드폰", "phone"];
/// `data` keys never lifted to the top level of the representation.
const RESERVED_KEYS: [&str; 9] = [
    "name",
    "phone",
    "tags",
    "고객명",
    "연락처",
    "전화번호",
    "휴대폰",
    "핸드폰",
    "customer_name",
];

/// Fields of a client to create.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewClient {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub tag_ids: Vec<String>,
}

/// Client changes. `tag_ids` replaces the tags only when present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateClient {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub data: Option<Map<String, Value>>,
    pub tag_ids: Option<Vec<String>>,
}

/// API shape of a client: fixed fields, tags, raw `data`, and the dynamic
/// fields merged to the top level.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ClientView(pub Map<String, Value>);

impl ClientView {
    #[must_use]
    pub fn new(client: &client::Model, tags: &[tag::Model]) -> Self {
        let data = client.data.as_object();
        let lookup = |candidates: &[&str]| {
            data.and_then(|d| {
                candidates.iter().find_map(|key| match d.get(*key) {
                    Some(Value::Null) | None => None,
                    Some(Value::String(s)) if s.trim().is_empty() => None,
                    Some(Value::String(s)) => Some(s.trim().to_string()),
                    Some(other) => Some(other.to_string()),
                })
            })
        };

        let name = client
            .name
            .clone()
            .filter(|n| !n.is_empty())
            .or_else(|| lookup(&NAME_CANDIDATES));
        let phone = client
            .phone
            .clone()
            .filter(|p| !p.is_empty())
            .or_else(|| lookup(&PHONE_CANDIDATES));

        let mut rep = Map::new();
        rep.insert("id".into(), json!(client.id));
        rep.insert("gallery_id".into(), json!(client.gallery_id));
        rep.insert("name".into(), json!(name.unwrap_or_default()));
        rep.insert("phone".into(), json!(phone.unwrap_or_default()));
        rep.insert(
            "tags".into(),
            Value::Array(
                tags.iter()
                    .map(|t| json!({"id": t.id, "name": t.name, "color": t.color, "created_at": t.created_at}))
                    .collect(),
            ),
        );
        rep.insert("data".into(), client.data.clone());
        rep.insert("created_at".into(), json!(client.created_at));
        rep.insert("updated_at".into(), json!(client.updated_at));

        if let Some(data) = data {
            for (key, value) in data {
                if !RESERVED_KEYS.contains(&key.as_str()) && !rep.contains_key(key) {
                    rep.insert(key.clone(), value.clone());
                }
            }
        }
        Self(rep)
    }

    /// Value of a top-level field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

/// Trim, and treat blank as absent.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Client service.
#[derive(Clone)]
pub struct ClientService {
    client_repo: ClientRepository,
    tags: TagService,
    id_gen: IdGenerator,
}

impl ClientService {
    /// Create a new client service.
    #[must_use]
    pub const fn new(client_repo: ClientRepository, tags: TagService) -> Self {
        Self {
            client_repo,
            tags,
            id_gen: IdGenerator::new(),
        }
    }

    #[must_use]
    pub const fn repository(&self) -> &ClientRepository {
        &self.client_repo
    }

    async fn view(&self, client: &client::Model) -> AppResult<ClientView> {
        let tags = self.tags.repository().find_for_client(&client.id).await?;
        Ok(ClientView::new(client, &tags))
    }

    async fn views(&self, clients: Vec<client::Model>) -> AppResult<Vec<ClientView>> {
        let ids: Vec<String> = clients.iter().map(|c| c.id.clone()).collect();
        let mut tags = self.tags.repository().find_for_clients(&ids).await?;
        Ok(clients
            .iter()
            .map(|c| ClientView::new(c, &tags.remove(&c.id).unwrap_or_default()))
            .collect())
    }

    /// Keep only tag ids that belong to the gallery.
    async fn gallery_tag_ids(&self, gallery_id: &str, tag_ids: &[String]) -> AppResult<Vec<String>> {
        Ok(self
            .tags
            .repository()
            .find_by_ids_in_gallery(gallery_id, tag_ids)
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect())
    }

    /// The single client creation path: insert, attach requested tags, then
    /// attach the default tag if the client is still untagged.
    pub async fn create_client(
        &self,
        gallery_id: &str,
        input: NewClient,
    ) -> AppResult<client::Model> {
        let now = Utc::now();
        let client = self
            .client_repo
            .create(client::ActiveModel {
                id: Set(self.id_gen.generate()),
                gallery_id: Set(gallery_id.to_string()),
                name: Set(non_blank(input.name)),
                phone: Set(non_blank(input.phone)),
                data: Set(Value::Object(input.data)),
                created_at: Set(now.into()),
                updated_at: Set(Some(now.into())),
            })
            .await?;

        let tag_ids = self.gallery_tag_ids(gallery_id, &input.tag_ids).await?;
        self.tags.repository().attach(&client.id, &tag_ids).await?;
        let defaulted = self.tags.ensure_default_tag(gallery_id, &client.id).await?;

        debug!(client_id = %client.id, tags = tag_ids.len(), defaulted, "Client created");
        Ok(client)
    }

    /// All clients of the gallery, newest first.
    pub async fn list(&self, gallery_id: &str) -> AppResult<Vec<ClientView>> {
        let clients = self.client_repo.find_by_gallery(gallery_id).await?;
        self.views(clients).await
    }

    /// A client of the gallery. Clients of other galleries are `ClientNotFound`.
    pub async fn get(&self, gallery_id: &str, id: &str) -> AppResult<ClientView> {
        let client = self.client_repo.get_in_gallery(gallery_id, id).await?;
        self.view(&client).await
    }

    /// Create through [`Self::create_client`] and return the view.
    pub async fn create(&self, gallery_id: &str, input: NewClient) -> AppResult<ClientView> {
        let client = self.create_client(gallery_id, input).await?;
        self.view(&client).await
    }

    /// Update the present fields.
    ///
    /// `data` replaces the stored object as a whole. `tag_ids` replaces the
    /// tags, keeping only ids of this gallery, and `Some(vec![])` clears them.
    pub async fn update(
        &self,
        gallery_id: &str,
        id: &str,
        input: UpdateClient,
    ) -> AppResult<ClientView> {
        let existing = self.client_repo.get_in_gallery(gallery_id, id).await?;

        let mut active: client::ActiveModel = existing.into();
        if let Some(name) = input.name {
            active.name = Set(non_blank(Some(name)));
        }
        if let Some(phone) = input.phone {
            active.phone = Set(non_blank(Some(phone)));
        }
        if let Some(data) = input.data {
            active.data = Set(Value::Object(data));
        }
        active.updated_at = Set(Some(Utc::now().into()));
        let client = self.client_repo.update(active).await?;

        if let Some(tag_ids) = input.tag_ids {
            let tag_ids = self.gallery_tag_ids(gallery_id, &tag_ids).await?;
            self.tags
                .repository()
                .set_client_tags(&client.id, &tag_ids)
                .await?;
        }
        self.view(&client).await
    }

    /// Replace a client's tags without touching other fields. An empty list
    /// clears them.
    pub async fn update_tags(
        &self,
        gallery_id: &str,
        id: &str,
        tag_ids: &[String],
    ) -> AppResult<ClientView> {
        let existing = self.client_repo.get_in_gallery(gallery_id, id).await?;
        let tag_ids = self.gallery_tag_ids(gallery_id, tag_ids).await?;
        self.tags
            .repository()
            .set_client_tags(&existing.id, &tag_ids)
            .await?;

        let mut active: client::ActiveModel = existing.into();
        active.updated_at = Set(Some(Utc::now().into()));
        let client = self.client_repo.update(active).await?;
        self.view(&client).await
    }

    /// Delete a client. Tag links and deliveries go with it.
    pub async fn delete(&self, gallery_id: &str, id: &str) -> AppResult<()> {
        let client = self.client_repo.get_in_gallery(gallery_id, id).await?;
        self.client_repo.delete(&client.id).await
    }

    /// Clients carrying any of the tags.
    pub async fn filter_by_tags(
        &self,
        gallery_id: &str,
        tag_ids: &[String],
    ) -> AppResult<Vec<ClientView>> {
        if tag_ids.is_empty() {
            return Err(AppError::BadRequest("태그를 지정해주세요.".to_string()));
        }
        let client_ids = self.tags.repository().find_client_ids_with_any(tag_ids).await?;
        let clients = self
            .client_repo
            .find_by_ids_in_gallery(gallery_id, &client_ids)
            .await?;
        self.views(clients).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::tag::{DEFAULT_TAG_NAME, tests::test_tag};
    use maws_db::repositories::TagRepository;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn service(db: DatabaseConnection) -> ClientService {
        let db = Arc::new(db);
        ClientService::new(
            ClientRepository::new(db.clone()),
            TagService::new(TagRepository::new(db)),
        )
    }

    fn test_client(name: Option<&str>, data: Value) -> client::Model {
        client::Model {
            id: "c1".to_string(),
            gallery_id: "g1".to_string(),
            name: name.map(str::to_string),
            phone: None,
            data,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[test]
    fn test_view_restores_fixed_fields_from_data() {
        let client = test_client(
            None,
            json!({"고객명": " 김철수 ", "휴대폰": "010-9999-0000", "직업": "작가"}),
        );
        let view = ClientView::new(&client, &[test_tag("t1", DEFAULT_TAG_NAME)]);

        assert_eq!(view.get("name").unwrap(), "김철수");
        assert_eq!(view.get("phone").unwrap(), "010-9999-0000");
        assert_eq!(view.get("직업").unwrap(), "작가");
        assert!(view.get("고객명").is_none());
        assert_eq!(view.get("tags").unwrap().as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_view_does_not_overwrite_fixed_fields() {
        let client = test_client(Some("홍길동"), json!({"id": "spoof", "메모": "VIP"}));
        let view = ClientView::new(&client, &[]);

        assert_eq!(view.get("id").unwrap(), "c1");
        assert_eq!(view.get("name").unwrap(), "홍길동");
        assert_eq!(view.get("메모").unwrap(), "VIP");
    }

    #[tokio::test]
    async fn test_create_client_attaches_default_tag() {
        let created = test_client(Some("홍길동"), json!({"직업": "작가"}));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // insert client
            .append_query_results([[created]])
            // count_for_client
            .append_query_results([[BTreeMap::from([(
                "num_items",
                sea_orm::Value::BigInt(Some(0)),
            )])]])
            // default tag lookup
            .append_query_results([[test_tag("t1", DEFAULT_TAG_NAME)]])
            // attach
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let client = service(db)
            .create_client(
                "g1",
                NewClient {
                    name: Some("홍길동".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(client.id, "c1");
    }

    #[tokio::test]
    async fn test_filter_by_tags_requires_tags() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let result = service(db).filter_by_tags("g1", &[]).await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_get_other_gallery_client() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<client::Model>::new()])
            .into_connection();
        let result = service(db).get("g2", "c1").await;
        assert!(matches!(result, Err(AppError::ClientNotFound(_))));
    }
}
