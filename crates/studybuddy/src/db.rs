//! MongoDB database connection and configuration

use mongodb::bson::doc;
use mongodb::{options::ClientOptions, options::IndexOptions, Client, Database, IndexModel};
use std::time::Duration;

/// MongoDB database wrapper
#[derive(Clone)]
pub struct MongoDb {
    client: Client,
    db: Database,
}

impl MongoDb {
    /// Connect to MongoDB, verify the connection and ensure indexes
    pub async fn connect(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let instance = Self::connect_lazy(uri, db_name).await?;

        // Test connection
        instance.ping().await?;
        tracing::info!("Connected to MongoDB: {}", db_name);

        instance.ensure_indexes().await?;

        Ok(instance)
    }

    /// Build a client without touching the server. Connections are opened on
    /// first use.
    pub async fn connect_lazy(uri: &str, db_name: &str) -> anyhow::Result<Self> {
        let mut options = ClientOptions::parse(uri).await?;
        options.app_name = Some("studybuddy".to_string());
        if options.server_selection_timeout.is_none() {
            options.server_selection_timeout = Some(Duration::from_secs(10));
        }
        let client = Client::with_options(options)?;
        let db = client.database(db_name);
        Ok(Self { client, db })
    }

    /// Get database reference
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Get collection
    pub fn collection<T>(&self, name: &str) -> mongodb::Collection<T> {
        self.db.collection(name)
    }

    /// Ping the database to check connection
    pub async fn ping(&self) -> anyhow::Result<()> {
        self.db.run_command(doc! { "ping": 1 }, None).await?;
        Ok(())
    }

    /// Shut the client down, waiting for in-flight operations
    pub async fn close(self) {
        self.client.shutdown().await;
        tracing::info!("MongoDB connection closed");
    }

    /// Ensure all required indexes exist
    pub async fn ensure_indexes(&self) -> anyhow::Result<()> {
        tracing::info!("Ensuring MongoDB indexes...");

        self.create_indexes(
            collections::USERS,
            vec![
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(IndexOptions::builder().unique(true).build())
                    .build(),
                IndexModel::builder()
                    .keys(doc! { "stripe_customer_id": 1 })
                    .build(),
            ],
        )
        .await?;

        self.create_indexes(
            collections::FOLDERS,
            vec![IndexModel::builder()
                .keys(doc! { "user_id": 1, "created_at": -1 })
                .build()],
        )
        .await?;

        for name in collections::RESOURCES {
            self.create_indexes(
                name,
                vec![
                    IndexModel::builder()
                        .keys(doc! { "user_id": 1, "created_at": -1 })
                        .build(),
                    IndexModel::builder()
                        .keys(doc! { "user_id": 1, "folder_id": 1 })
                        .build(),
                ],
            )
            .await?;
        }

        tracing::info!("MongoDB indexes ensured successfully");
        Ok(())
    }

    /// Helper to create indexes for a collection
    async fn create_indexes(
        &self,
        collection: &str,
        indexes: Vec<IndexModel>,
    ) -> anyhow::Result<()> {
        let coll = self.db.collection::<mongodb::bson::Document>(collection);
        coll.create_indexes(indexes, None).await?;
        Ok(())
    }
}

/// Collection names
pub mod collections {
    pub const USERS: &str = "users";
    pub const UPLOADS: &str = "uploads";
    pub const FLASHCARDS: &str = "flashcards";
    pub const QUIZZES: &str = "multiple-choice-quizzes";
    pub const SUMMARIES: &str = "summaries";
    pub const CHATS: &str = "aichats";
    pub const FOLDERS: &str = "folders";

    /// Collections holding folder-assignable resources
    pub const RESOURCES: [&str; 5] = [UPLOADS, FLASHCARDS, QUIZZES, SUMMARIES, CHATS];
}
