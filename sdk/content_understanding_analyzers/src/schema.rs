//! Extraction schema validation and registration.
//!
//! Schemas are registered with the service once per `(name, version)` and the
//! registration response is cached. [`SchemaRegistry::get_or_register`] holds a
//! single lock across the check, the registration call, and the insert, so
//! concurrent callers for the same key produce exactly one registration.

use std::collections::HashMap;

use content_understanding_core::client::ContentUnderstandingClient;
use content_understanding_core::error::{ContentUnderstandingError, ContentUnderstandingResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::models::{api_version_query, SCHEMAS_PATH};

/// Version assumed for schemas that do not declare one.
pub const DEFAULT_SCHEMA_VERSION: &str = "1.0";

/// One field of an extraction schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    /// Field name.
    pub name: String,
    /// Field type, e.g. `string`, `number`, `date`.
    #[serde(rename = "type")]
    pub field_type: String,
    /// Remaining field properties, passed through to the service.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A validated extraction schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    /// Schema name.
    pub name: String,
    /// Schema version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Fields to extract.
    pub fields: Vec<SchemaField>,
    /// Remaining schema properties, passed through to the service.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SchemaDefinition {
    /// Validates a raw JSON schema and converts it.
    ///
    /// The schema must have `name` and `fields`; `fields` must be a list of
    /// objects, each with `name` and `type`.
    pub fn from_value(value: Value) -> ContentUnderstandingResult<Self> {
        let invalid = |msg: String| ContentUnderstandingError::InvalidSchema(msg);

        let obj = value
            .as_object()
            .ok_or_else(|| invalid("schema must be a JSON object".into()))?;

        for key in ["name", "fields"] {
            if !obj.contains_key(key) {
                return Err(invalid(format!("schema missing required key `{key}`")));
            }
        }

        let fields = obj["fields"]
            .as_array()
            .ok_or_else(|| invalid("schema `fields` must be a list".into()))?;

        for (index, field) in fields.iter().enumerate() {
            let field = field
                .as_object()
                .ok_or_else(|| invalid(format!("field {index} must be an object")))?;
            if !field.contains_key("name") || !field.contains_key("type") {
                return Err(invalid(format!(
                    "field {index} must have `name` and `type` properties"
                )));
            }
        }

        let schema: Self =
            serde_json::from_value(value).map_err(|e| invalid(e.to_string()))?;
        tracing::debug!(schema = %schema.name, "schema validation passed");
        Ok(schema)
    }

    /// The schema version, or [`DEFAULT_SCHEMA_VERSION`].
    pub fn version_or_default(&self) -> &str {
        self.version.as_deref().unwrap_or(DEFAULT_SCHEMA_VERSION)
    }

    /// Cache key of this schema.
    pub fn key(&self) -> SchemaKey {
        SchemaKey {
            name: self.name.clone(),
            version: self.version_or_default().to_string(),
        }
    }
}

/// Identity of a registered schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    pub name: String,
    pub version: String,
}

/// The service response to a schema registration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegisteredSchema {
    /// Identifier to pass as the analyzer/schema id.
    pub id: String,
    /// Registered version, when the service reports one.
    #[serde(default)]
    pub version: Option<String>,
    /// Remaining response properties.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Register a schema with the service.
///
/// # Tracing
///
/// Emits a span named `content_understanding::schema::register` with field `schema`.
#[tracing::instrument(
    name = "content_understanding::schema::register",
    skip(client, schema),
    fields(schema = %schema.name)
)]
pub async fn register_schema(
    client: &ContentUnderstandingClient,
    schema: &SchemaDefinition,
) -> ContentUnderstandingResult<RegisteredSchema> {
    tracing::info!("registering schema");

    let path = format!("{SCHEMAS_PATH}?{}", api_version_query(client));
    let response = client.post(&path, schema).await?;
    let registered = response.json::<RegisteredSchema>().await?;

    tracing::info!(id = %registered.id, "schema registered");
    Ok(registered)
}

/// List the schemas registered with the service.
#[tracing::instrument(name = "content_understanding::schema::list", skip(client))]
pub async fn list_schemas(client: &ContentUnderstandingClient) -> ContentUnderstandingResult<Value> {
    let path = format!("{SCHEMAS_PATH}?{}", api_version_query(client));
    let response = client.get(&path).await?;
    Ok(response.json::<Value>().await?)
}

/// Cache of registered schemas keyed by `(name, version)`.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    registered: Mutex<HashMap<SchemaKey, RegisteredSchema>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached registration for `name` and `version`.
    pub async fn get(&self, name: &str, version: &str) -> Option<RegisteredSchema> {
        let key = SchemaKey {
            name: name.to_string(),
            version: version.to_string(),
        };
        self.registered.lock().await.get(&key).cloned()
    }

    /// Returns the cached registration for `schema`, registering it first if needed.
    ///
    /// A failed registration is not cached; the next call retries it.
    pub async fn get_or_register(
        &self,
        client: &ContentUnderstandingClient,
        schema: &SchemaDefinition,
    ) -> ContentUnderstandingResult<RegisteredSchema> {
        let key = schema.key();
        let mut registered = self.registered.lock().await;

        if let Some(existing) = registered.get(&key) {
            tracing::trace!(schema = %key.name, version = %key.version, "schema already registered");
            return Ok(existing.clone());
        }

        let fresh = register_schema(client, schema).await?;
        registered.insert(key, fresh.clone());
        Ok(fresh)
    }

    /// Number of cached registrations.
    pub async fn len(&self) -> usize {
        self.registered.lock().await.len()
    }

    /// Returns `true` if nothing has been registered yet.
    pub async fn is_empty(&self) -> bool {
        self.registered.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use content_understanding_core::test_support::setup_mock_client;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn invoice_schema() -> SchemaDefinition {
        SchemaDefinition::from_value(json!({
            "name": "invoice",
            "version": "v1",
            "description": "Invoice fields",
            "fields": [
                {"name": "VendorName", "type": "string", "description": "Vendor"},
                {"name": "Total", "type": "number"}
            ]
        }))
        .expect("valid schema")
    }

    #[test]
    fn test_valid_schema_keeps_extra_properties() {
        let schema = invoice_schema();
        assert_eq!(schema.name, "invoice");
        assert_eq!(schema.fields.len(), 2);
        assert_eq!(schema.fields[0].field_type, "string");
        assert_eq!(schema.extra["description"], "Invoice fields");
        assert_eq!(schema.fields[0].extra["description"], "Vendor");
    }

    #[test]
    fn test_schema_missing_fields_is_rejected() {
        let err = SchemaDefinition::from_value(json!({"name": "x"})).unwrap_err();
        assert!(matches!(err, ContentUnderstandingError::InvalidSchema(_)));
        assert!(err.to_string().contains("fields"), "error: {err}");
    }

    #[test]
    fn test_schema_fields_must_be_list() {
        let err = SchemaDefinition::from_value(json!({"name": "x", "fields": {}})).unwrap_err();
        assert!(err.to_string().contains("list"), "error: {err}");
    }

    #[test]
    fn test_schema_field_requires_name_and_type() {
        let err = SchemaDefinition::from_value(json!({
            "name": "x",
            "fields": [{"name": "a"}]
        }))
        .unwrap_err();
        assert!(err.to_string().contains("`type`"), "error: {err}");

        let err = SchemaDefinition::from_value(json!({"name": "x", "fields": ["a"]})).unwrap_err();
        assert!(err.to_string().contains("object"), "error: {err}");
    }

    #[test]
    fn test_version_defaults_to_one_point_zero() {
        let schema = SchemaDefinition::from_value(json!({"name": "x", "fields": []}))
            .expect("valid schema");
        assert_eq!(schema.key().version, "1.0");
    }

    #[tokio::test]
    async fn test_register_posts_schema() {
        let server = MockServer::start().await;
        let client = setup_mock_client(&server).await;

        Mock::given(method("POST"))
            .and(path("/authoring/schemas"))
            .and(query_param("api-version", "2025-05-01-preview"))
            .and(body_partial_json(json!({"name": "invoice", "version": "v1"})))
            .respond_with(
                ResponseTemplate::new(201).set_body_json(json!({"id": "schema-123", "version": "v1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let registered = register_schema(&client, &invoice_schema())
            .await
            .expect("should register");
        assert_eq!(registered.id, "schema-123");
        assert_eq!(registered.version.as_deref(), Some("v1"));
    }

    #[tokio::test]
    async fn test_list_returns_service_payload() {
        let server = MockServer::start().await;
        let client = setup_mock_client(&server).await;

        Mock::given(method("GET"))
            .and(path("/authoring/schemas"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": [{"id": "s1"}]})))
            .mount(&server)
            .await;

        let listed = list_schemas(&client).await.expect("should list");
        assert_eq!(listed["value"][0]["id"], "s1");
    }

    #[tokio::test]
    async fn test_get_or_register_registers_once_under_concurrency() {
        let server = MockServer::start().await;
        let client = setup_mock_client(&server).await;

        Mock::given(method("POST"))
            .and(path("/authoring/schemas"))
            .respond_with(
                ResponseTemplate::new(201)
                    .set_body_json(json!({"id": "schema-123"}))
                    .set_delay(Duration::from_millis(50)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let registry = Arc::new(SchemaRegistry::new());
        let schema = invoice_schema();

        let tasks: Vec<_> = (0..5)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let client = client.clone();
                let schema = schema.clone();
                tokio::spawn(async move { registry.get_or_register(&client, &schema).await })
            })
            .collect();

        for task in tasks {
            let registered = task.await.expect("task joins").expect("should register");
            assert_eq!(registered.id, "schema-123");
        }

        assert_eq!(registry.len().await, 1);
        let cached = registry.get("invoice", "v1").await.expect("cached");
        assert_eq!(cached.id, "schema-123");
    }

    #[tokio::test]
    async fn test_failed_registration_is_not_cached() {
        let server = MockServer::start().await;
        let client = setup_mock_client(&server).await;

        Mock::given(method("POST"))
            .and(path("/authoring/schemas"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": "InvalidSchema", "message": "bad field type"}
            })))
            .mount(&server)
            .await;

        let registry = SchemaRegistry::new();
        let err = registry
            .get_or_register(&client, &invoice_schema())
            .await
            .unwrap_err();
        assert!(matches!(err, ContentUnderstandingError::Api { .. }), "got: {err:?}");
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_register_emits_span() {
        let server = MockServer::start().await;
        let client = setup_mock_client(&server).await;

        Mock::given(method("POST"))
            .and(path("/authoring/schemas"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "s"})))
            .mount(&server)
            .await;

        let _ = register_schema(&client, &invoice_schema()).await;
        assert!(logs_contain("content_understanding::schema::register"));
    }
}
