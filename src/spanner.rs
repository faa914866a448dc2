use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gcloud_gax::grpc::Code;
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig, Error as ClientError};
use gcloud_spanner::key::Key;
use gcloud_spanner::mutation;
use gcloud_spanner::row::Row;
use gcloud_spanner::statement::Statement;
use gcloud_spanner::value::CommitTimestamp;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::SpannerConfig;
use crate::models::{Route, ShareEntry, User};
use crate::store::{NewRoute, RouteStore, StoreError, StoreResult, UserDirectory};

/// Columns selected for every route query; JSON and timestamps come back as strings
const ROUTE_COLUMNS: &str = "id, path, TO_JSON_STRING(response) AS response, owner_id, name, description, \
     TO_JSON_STRING(shared_with) AS shared_with, \
     FORMAT_TIMESTAMP('%Y-%m-%dT%H:%M:%E*SZ', created_at, 'UTC') AS created_at, \
     FORMAT_TIMESTAMP('%Y-%m-%dT%H:%M:%E*SZ', updated_at, 'UTC') AS updated_at";

const ROUTES_TABLE_DDL: &str = r#"
CREATE TABLE routes (
    id STRING(36) NOT NULL,
    path STRING(MAX) NOT NULL,
    response JSON NOT NULL,
    owner_id STRING(36) NOT NULL,
    name STRING(MAX),
    description STRING(MAX),
    shared_with JSON NOT NULL,
    created_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
    updated_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
) PRIMARY KEY (id)
"#;

const ROUTES_INDEX_DDL: &str = "CREATE UNIQUE INDEX routes_by_path_owner ON routes (path, owner_id)";

const USERS_TABLE_DDL: &str = r#"
CREATE TABLE users (
    id STRING(36) NOT NULL,
    email STRING(MAX) NOT NULL,
    name STRING(MAX) NOT NULL,
) PRIMARY KEY (id)
"#;

const USERS_INDEX_DDL: &str = "CREATE UNIQUE INDEX users_by_email ON users (email)";

/// Schema objects checked at startup: (name, marker in DDL, statement)
const SCHEMA: &[(&str, &str, &str)] = &[
    ("routes", "CREATE TABLE routes", ROUTES_TABLE_DDL),
    ("routes_by_path_owner", "routes_by_path_owner", ROUTES_INDEX_DDL),
    ("users", "CREATE TABLE users", USERS_TABLE_DDL),
    ("users_by_email", "users_by_email", USERS_INDEX_DDL),
];

/// Escape `\`, `%` and `_` so a folder prefix is matched literally by LIKE
pub fn escape_like(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// LIKE pattern matching every path strictly below `folder`
pub fn folder_like_pattern(folder: &str) -> String {
    if folder == "/" {
        "/%".to_string()
    } else {
        format!("{}/%", escape_like(folder))
    }
}

/// Whether a commit was rejected by a primary key or unique index
fn is_already_exists(err: &ClientError) -> bool {
    matches!(err, ClientError::GRPC(status) if status.code() == Code::AlreadyExists)
}

/// Shareable Spanner client backing both the route store and the user directory
#[derive(Clone)]
pub struct SpannerClient {
    inner: Arc<Client>,
}

impl SpannerClient {
    /// Create a new Spanner client from configuration
    ///
    /// The gcloud-spanner library automatically detects the
    /// SPANNER_EMULATOR_HOST environment variable and connects to
    /// the emulator when set, or production Spanner otherwise.
    ///
    /// The instance, database, tables and indexes are created first if missing.
    pub async fn from_config(config: &SpannerConfig) -> Result<Self> {
        auto_provision(config).await?;

        let database_path = config.database_path();

        match &config.emulator_host {
            Some(host) => tracing::info!("Connecting to Spanner emulator at: {}", host),
            None => tracing::info!("Connecting to production Spanner"),
        }

        // ClientConfig::default() automatically uses SPANNER_EMULATOR_HOST if set
        let client = Client::new(&database_path, ClientConfig::default())
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!(
            "Successfully connected to Spanner database: {}",
            database_path
        );

        Ok(Self {
            inner: Arc::new(client),
        })
    }

    async fn query_routes(&self, statement: Statement) -> Result<Vec<Route>> {
        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query routes from Spanner")?;

        let mut routes = Vec::new();
        while let Some(row) = result_set.next().await? {
            routes.push(route_from_row(&row)?);
        }
        Ok(routes)
    }

    async fn query_one_route(&self, statement: Statement) -> Result<Option<Route>> {
        Ok(self.query_routes(statement).await?.into_iter().next())
    }

    async fn query_users(&self, statement: Statement) -> Result<Vec<User>> {
        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query users from Spanner")?;

        let mut users = Vec::new();
        while let Some(row) = result_set.next().await? {
            let id: String = row.column_by_name("id")?;
            users.push(User {
                id: Uuid::parse_str(&id).context("Invalid user id in Spanner")?,
                email: row.column_by_name("email")?,
                name: row.column_by_name("name")?,
            });
        }
        Ok(users)
    }
}

fn route_from_row(row: &Row) -> Result<Route> {
    let id: String = row.column_by_name("id")?;
    let owner_id: String = row.column_by_name("owner_id")?;
    let response_str: String = row.column_by_name("response")?;
    let shared_str: String = row.column_by_name("shared_with")?;
    let created_at_str: String = row.column_by_name("created_at")?;
    let updated_at_str: String = row.column_by_name("updated_at")?;

    let response: JsonValue = serde_json::from_str(&response_str)
        .context("Failed to deserialize route response")?;
    let shared_with: Vec<ShareEntry> = serde_json::from_str(&shared_str)
        .context("Failed to deserialize route shares")?;

    Ok(Route {
        id: Uuid::parse_str(&id).context("Invalid route id in Spanner")?,
        path: row.column_by_name("path")?,
        response,
        owner_id: Uuid::parse_str(&owner_id).context("Invalid owner id in Spanner")?,
        name: row.column_by_name("name")?,
        description: row.column_by_name("description")?,
        shared_with,
        created_at: parse_timestamp(&created_at_str).context("Failed to parse created_at timestamp")?,
        updated_at: parse_timestamp(&updated_at_str).context("Failed to parse updated_at timestamp")?,
    })
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)?.with_timezone(&Utc))
}

fn route_statement(condition: &str) -> Statement {
    Statement::new(format!("SELECT {} FROM routes WHERE {}", ROUTE_COLUMNS, condition))
}

#[async_trait]
impl RouteStore for SpannerClient {
    async fn find_by_path(&self, path: &str) -> StoreResult<Option<Route>> {
        let mut statement = route_statement("path = @path ORDER BY created_at ASC, id ASC LIMIT 1");
        statement.add_param("path", &path.to_string());
        Ok(self.query_one_route(statement).await?)
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<Route>> {
        let mut statement = route_statement("id = @id");
        statement.add_param("id", &id.to_string());
        Ok(self.query_one_route(statement).await?)
    }

    async fn find_owned_by_path(&self, path: &str, owner_id: Uuid) -> StoreResult<Option<Route>> {
        let mut statement = route_statement("path = @path AND owner_id = @owner");
        statement.add_param("path", &path.to_string());
        statement.add_param("owner", &owner_id.to_string());
        Ok(self.query_one_route(statement).await?)
    }

    async fn find_by_prefix(&self, folder: &str, owner_id: Uuid) -> StoreResult<Vec<Route>> {
        let mut statement = route_statement(
            "owner_id = @owner AND (path = @folder OR path LIKE @pattern) ORDER BY path, created_at",
        );
        statement.add_param("owner", &owner_id.to_string());
        statement.add_param("folder", &folder.to_string());
        statement.add_param("pattern", &folder_like_pattern(folder));

        let routes = self.query_routes(statement).await?;
        tracing::debug!("Found {} routes in folder {} of {}", routes.len(), folder, owner_id);
        Ok(routes)
    }

    async fn find_by_owner_or_shared_with(&self, user_id: Uuid) -> StoreResult<Vec<Route>> {
        let mut statement = route_statement(
            "owner_id = @user OR EXISTS (\
                SELECT 1 FROM UNNEST(JSON_QUERY_ARRAY(shared_with)) AS share \
                WHERE JSON_VALUE(share, '$.userId') = @user\
             ) ORDER BY path, created_at",
        );
        statement.add_param("user", &user_id.to_string());
        Ok(self.query_routes(statement).await?)
    }

    async fn insert(&self, route: NewRoute) -> StoreResult<Route> {
        if self.find_owned_by_path(&route.path, route.owner_id).await?.is_some() {
            return Err(StoreError::DuplicatePath { path: route.path });
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let owner_str = route.owner_id.to_string();
        let response_str = serde_json::to_string(&route.response)
            .context("Failed to serialize route response")?;
        let shared_str = serde_json::to_string(&route.shared_with)
            .context("Failed to serialize route shares")?;

        let mutation = mutation::insert(
            "routes",
            &["id", "path", "response", "owner_id", "name", "description", "shared_with", "created_at", "updated_at"],
            &[
                &id_str,
                &route.path,
                &response_str,
                &owner_str,
                &route.name,
                &route.description,
                &shared_str,
                &CommitTimestamp::new(),
                &CommitTimestamp::new(),
            ],
        );

        match self.inner.apply(vec![mutation]).await {
            Ok(_) => {}
            // Concurrent insert of the same path and owner
            Err(e) if is_already_exists(&e) => {
                return Err(StoreError::DuplicatePath { path: route.path });
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context("Failed to insert route into Spanner")
                    .into());
            }
        }

        tracing::debug!("Inserted route {} at {}", id, route.path);
        RouteStore::find_by_id(self, id)
            .await?
            .ok_or_else(|| StoreError::Other(anyhow::anyhow!("Route {} vanished after insert", id)))
    }

    async fn update(&self, route: &Route) -> StoreResult<Option<Route>> {
        match RouteStore::find_by_id(self, route.id).await? {
            Some(existing) if existing.owner_id == route.owner_id => {}
            _ => return Ok(None),
        }
        if let Some(other) = self.find_owned_by_path(&route.path, route.owner_id).await? {
            if other.id != route.id {
                return Err(StoreError::DuplicatePath {
                    path: route.path.clone(),
                });
            }
        }

        let id_str = route.id.to_string();
        let response_str = serde_json::to_string(&route.response)
            .context("Failed to serialize route response")?;
        let shared_str = serde_json::to_string(&route.shared_with)
            .context("Failed to serialize route shares")?;

        let mutation = mutation::update(
            "routes",
            &["id", "path", "response", "name", "description", "shared_with", "updated_at"],
            &[
                &id_str,
                &route.path,
                &response_str,
                &route.name,
                &route.description,
                &shared_str,
                &CommitTimestamp::new(),
            ],
        );

        match self.inner.apply(vec![mutation]).await {
            Ok(_) => {}
            Err(e) if is_already_exists(&e) => {
                return Err(StoreError::DuplicatePath {
                    path: route.path.clone(),
                });
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context("Failed to update route in Spanner")
                    .into());
            }
        }

        tracing::debug!("Updated route {}", route.id);
        RouteStore::find_by_id(self, route.id).await
    }

    async fn delete(&self, id: Uuid, owner_id: Uuid) -> StoreResult<bool> {
        match RouteStore::find_by_id(self, id).await? {
            Some(existing) if existing.owner_id == owner_id => {}
            _ => return Ok(false),
        }

        let id_str = id.to_string();
        self.inner
            .apply(vec![mutation::delete("routes", Key::new(&id_str))])
            .await
            .context("Failed to delete route from Spanner")?;

        tracing::debug!("Deleted route {}", id);
        Ok(true)
    }

    /// Perform a health check by executing a simple query
    async fn health_check(&self) -> StoreResult<()> {
        let statement = Statement::new("SELECT 1");

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        // Just verify that we can execute the query and get a result
        if result_set.next().await.context("Failed to read health check result")?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned no results").into())
        }
    }

    fn name(&self) -> &'static str {
        "spanner"
    }
}

#[async_trait]
impl UserDirectory for SpannerClient {
    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        let mut statement = Statement::new("SELECT id, email, name FROM users WHERE id = @id");
        statement.add_param("id", &id.to_string());
        Ok(self.query_users(statement).await?.into_iter().next())
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let mut statement =
            Statement::new("SELECT id, email, name FROM users WHERE LOWER(email) = LOWER(@email) LIMIT 1");
        statement.add_param("email", &email.to_string());
        Ok(self.query_users(statement).await?.into_iter().next())
    }

    async fn upsert(&self, user: User) -> StoreResult<User> {
        if let Some(other) = self.find_by_email(&user.email).await? {
            if other.id != user.id {
                return Err(StoreError::DuplicateEmail { email: user.email });
            }
        }

        let id_str = user.id.to_string();
        let mutation = mutation::insert_or_update(
            "users",
            &["id", "email", "name"],
            &[&id_str, &user.email, &user.name],
        );

        match self.inner.apply(vec![mutation]).await {
            Ok(_) => {}
            Err(e) if is_already_exists(&e) => {
                return Err(StoreError::DuplicateEmail { email: user.email });
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context("Failed to upsert user in Spanner")
                    .into());
            }
        }

        tracing::debug!("Upserted user {}", user.id);
        Ok(user)
    }

    async fn search_by_name_or_email(
        &self,
        query: &str,
        exclude_user_id: Uuid,
        limit: usize,
    ) -> StoreResult<Vec<User>> {
        let mut statement = Statement::new(
            "SELECT id, email, name FROM users \
             WHERE id != @exclude AND (STRPOS(LOWER(name), @query) > 0 OR STRPOS(LOWER(email), @query) > 0) \
             ORDER BY name, email LIMIT @limit",
        );
        statement.add_param("exclude", &exclude_user_id.to_string());
        statement.add_param("query", &query.to_lowercase());
        statement.add_param("limit", &(limit as i64));
        Ok(self.query_users(statement).await?)
    }
}

/// Automatically provision Spanner instance, database, tables and indexes
///
/// This function checks if the configured resources exist and creates them if needed.
/// It's designed to enable zero-setup local development with the emulator.
async fn auto_provision(config: &SpannerConfig) -> Result<()> {
    tracing::info!("Starting auto-provisioning checks...");

    let admin_client = AdminClient::new(AdminClientConfig::default())
        .await
        .context("Failed to create Spanner admin client")?;

    let project_path = format!("projects/{}", config.project);
    let instance_path = format!("{}/instances/{}", project_path, config.instance);
    let database_path = config.database_path();

    ensure_instance_exists(&admin_client, config, &project_path, &instance_path).await?;
    ensure_database_exists(&admin_client, &instance_path, &database_path).await?;
    ensure_schema_exists(&admin_client, &database_path).await?;

    tracing::info!("Auto-provisioning complete");
    Ok(())
}

/// Ensure the Spanner instance exists, creating it if necessary
async fn ensure_instance_exists(
    admin_client: &AdminClient,
    config: &SpannerConfig,
    project_path: &str,
    instance_path: &str,
) -> Result<()> {
    let get_request = GetInstanceRequest {
        name: instance_path.to_string(),
        field_mask: None,
    };

    match admin_client.instance().get_instance(get_request, None).await {
        Ok(_) => {
            tracing::info!("Instance already exists: {}", instance_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Instance not found, creating: {}", instance_path);

            let instance_config = if config.emulator_host.is_some() {
                format!("{}/instanceConfigs/emulator-config", project_path)
            } else {
                format!("{}/instanceConfigs/regional-us-central1", project_path)
            };

            let create_request = CreateInstanceRequest {
                parent: project_path.to_string(),
                instance_id: config.instance.clone(),
                instance: Some(Instance {
                    name: instance_path.to_string(),
                    config: instance_config,
                    display_name: format!("{} instance", config.instance),
                    node_count: 1,
                    ..Default::default()
                }),
            };

            let mut operation = admin_client
                .instance()
                .create_instance(create_request, None)
                .await
                .context("Failed to start instance creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create instance")?;

            tracing::info!("Instance created successfully: {}", instance_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check instance existence: {}",
            e.message()
        )),
    }
}

/// Ensure the Spanner database exists, creating it if necessary
async fn ensure_database_exists(
    admin_client: &AdminClient,
    instance_path: &str,
    database_path: &str,
) -> Result<()> {
    let get_request = GetDatabaseRequest {
        name: database_path.to_string(),
    };

    match admin_client
        .database()
        .get_database(get_request, None)
        .await
    {
        Ok(_) => {
            tracing::info!("Database already exists: {}", database_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Database not found, creating: {}", database_path);

            let database_id = database_path
                .split('/')
                .next_back()
                .context("Invalid database path")?;

            let create_request = CreateDatabaseRequest {
                parent: instance_path.to_string(),
                create_statement: format!("CREATE DATABASE `{}`", database_id),
                extra_statements: vec![],
                encryption_config: None,
                database_dialect: 1, // Google Standard SQL
                proto_descriptors: vec![],
            };

            let mut operation = admin_client
                .database()
                .create_database(create_request, None)
                .await
                .context("Failed to start database creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create database")?;

            tracing::info!("Database created successfully: {}", database_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check database existence: {}",
            e.message()
        )),
    }
}

/// Ensure the routes and users tables and their unique indexes exist
async fn ensure_schema_exists(admin_client: &AdminClient, database_path: &str) -> Result<()> {
    let get_ddl_request = GetDatabaseDdlRequest {
        database: database_path.to_string(),
    };

    let existing = admin_client
        .database()
        .get_database_ddl(get_ddl_request, None)
        .await
        .context("Failed to get database DDL")?
        .into_inner()
        .statements;

    let missing = missing_schema(&existing);
    if missing.is_empty() {
        tracing::info!("Schema already up to date");
        return Ok(());
    }

    for (name, _) in &missing {
        tracing::info!("Schema object '{}' not found, creating...", name);
    }

    // Tables precede their indexes in SCHEMA, so one batch applies in order
    let update_request = UpdateDatabaseDdlRequest {
        database: database_path.to_string(),
        statements: missing.iter().map(|(_, ddl)| ddl.trim().to_string()).collect(),
        operation_id: String::new(),
        proto_descriptors: vec![],
        throughput_mode: false,
    };

    let mut operation = admin_client
        .database()
        .update_database_ddl(update_request, None)
        .await
        .context("Failed to start schema update")?;

    operation
        .wait(None)
        .await
        .context("Failed to update schema")?;

    tracing::info!("Schema created successfully");
    Ok(())
}

fn missing_schema(existing: &[String]) -> Vec<(&'static str, &'static str)> {
    SCHEMA
        .iter()
        .filter(|(_, marker, _)| {
            let quoted = marker.replacen("TABLE ", "TABLE `", 1);
            !existing
                .iter()
                .any(|stmt| stmt.contains(marker) || stmt.contains(&quoted))
        })
        .map(|(name, _, ddl)| (*name, *ddl))
        .collect()
}
