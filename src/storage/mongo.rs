//! MongoDB-backed document store
//!
//! One client, one named database, held for the process lifetime. The
//! client pools connections internally and is safe to share across tasks.

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::options::{ClientOptions, Credential, FindOptions, ServerAddress, UpdateOptions};
use mongodb::{Client, Database};
use tracing::debug;

use super::store::{DocumentStore, SortDirection, StoreResult};
use crate::config::DatabaseSettings;

/// Production document store over a MongoDB database
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Connect to the database described by the settings.
    ///
    /// Credentials are attached only when a user is configured; otherwise
    /// the connection is anonymous. A ping is issued so connection
    /// failures surface here rather than on the first operation.
    pub async fn connect(settings: &DatabaseSettings) -> StoreResult<Self> {
        let address = ServerAddress::Tcp {
            host: settings.host.clone(),
            port: Some(settings.port),
        };

        let mut options = ClientOptions::builder().hosts(vec![address]).build();
        options.app_name = Some("market-store".to_string());
        if let Some(user) = &settings.user {
            let mut credential = Credential::default();
            credential.username = Some(user.clone());
            credential.password = settings.password.clone();
            credential.source = settings.authentication_source.clone();
            options.credential = Some(credential);
        }

        let client = Client::with_options(options)?;
        let db = client.database(&settings.database);
        db.run_command(doc! { "ping": 1 }, None).await?;

        debug!(
            "Connected to {}:{}/{}",
            settings.host, settings.port, settings.database
        );
        Ok(Self { db })
    }

    fn collection(&self, name: &str) -> mongodb::Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn find(
        &self,
        collection: &str,
        filter: Document,
        sort: Option<(&str, SortDirection)>,
        limit: Option<i64>,
    ) -> StoreResult<Vec<Document>> {
        let mut options = FindOptions::default();
        if let Some((field, direction)) = sort {
            let mut sort_doc = Document::new();
            sort_doc.insert(field, direction.as_i32());
            options.sort = Some(sort_doc);
        }
        options.limit = limit;

        let cursor = self.collection(collection).find(filter, options).await?;
        let docs = cursor.try_collect().await?;
        Ok(docs)
    }

    async fn insert_many(&self, collection: &str, docs: Vec<Document>) -> StoreResult<()> {
        self.collection(collection).insert_many(docs, None).await?;
        Ok(())
    }

    async fn delete_many(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let result = self.collection(collection).delete_many(filter, None).await?;
        Ok(result.deleted_count)
    }

    async fn upsert_one(
        &self,
        collection: &str,
        filter: Document,
        set: Document,
    ) -> StoreResult<()> {
        let mut options = UpdateOptions::default();
        options.upsert = Some(true);
        self.collection(collection)
            .update_one(filter, doc! { "$set": set }, options)
            .await?;
        Ok(())
    }

    async fn count(&self, collection: &str, filter: Document) -> StoreResult<u64> {
        let count = self
            .collection(collection)
            .count_documents(filter, None)
            .await?;
        Ok(count)
    }

    async fn estimated_count(&self, collection: &str) -> StoreResult<u64> {
        let count = self
            .collection(collection)
            .estimated_document_count(None)
            .await?;
        Ok(count)
    }

    async fn list_collections(&self, prefix: &str) -> StoreResult<Vec<String>> {
        // Partition prefixes contain no regex metacharacters.
        let filter = doc! { "name": { "$regex": format!("^{}", prefix) } };
        let names = self.db.list_collection_names(filter).await?;
        Ok(names)
    }

    async fn distinct(&self, collection: &str, field: &str) -> StoreResult<Vec<Bson>> {
        let values = self
            .collection(collection)
            .distinct(field, None, None)
            .await?;
        Ok(values)
    }

    async fn drop_collection(&self, collection: &str) -> StoreResult<()> {
        self.collection(collection).drop(None).await?;
        Ok(())
    }
}

impl std::fmt::Debug for MongoStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoStore")
            .field("database", &self.db.name())
            .finish()
    }
}
