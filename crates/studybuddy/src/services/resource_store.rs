//! Generic ownership-checked CRUD over one resource collection

use chrono::Utc;
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument};
use std::marker::PhantomData;

use crate::config::StudyConfig;
use crate::db::MongoDb;
use crate::error::{StudyError, StudyResult};
use crate::models::{Folder, OwnedResource};
use crate::AuthenticatedUser;

/// Parse a path id. A malformed id is reported as not found, like any other miss.
pub fn parse_object_id(id: &str, label: &str) -> StudyResult<ObjectId> {
    ObjectId::parse_str(id.trim()).map_err(|_| StudyError::not_found(label))
}

/// Filter matching one document owned by `user_id`
fn owned_filter(oid: ObjectId, user_id: &str) -> Document {
    doc! { "_id": oid, "user_id": user_id }
}

/// CRUD for documents of type `T`, always scoped to the owning user
pub struct ResourceStore<T: OwnedResource> {
    db: MongoDb,
    _marker: PhantomData<T>,
}

impl<T: OwnedResource> ResourceStore<T> {
    pub fn new(db: MongoDb) -> Self {
        Self {
            db,
            _marker: PhantomData,
        }
    }

    fn coll(&self) -> mongodb::Collection<T> {
        self.db.collection::<T>(T::COLLECTION)
    }

    /// Insert a new document and return it with its id set
    pub async fn insert(&self, mut item: T) -> StudyResult<T> {
        let result = self.coll().insert_one(&item, None).await?;
        if let Some(id) = result.inserted_id.as_object_id() {
            item.set_id(id);
        }
        tracing::info!(
            collection = T::COLLECTION,
            user_id = item.user_id(),
            "Created {}",
            T::SINGULAR
        );
        Ok(item)
    }

    /// Fetch a document by id, only if owned by `user_id`
    pub async fn find_owned(&self, id: &str, user_id: &str) -> StudyResult<T> {
        let oid = parse_object_id(id, T::LABEL)?;
        self.coll()
            .find_one(owned_filter(oid, user_id), None)
            .await?
            .ok_or_else(|| StudyError::not_found(T::LABEL))
    }

    /// All documents of a user, newest first
    pub async fn list(&self, user_id: &str) -> StudyResult<Vec<T>> {
        self.find_many(doc! { "user_id": user_id }).await
    }

    /// Documents of a user assigned to `folder_id`, newest first
    pub async fn list_by_folder(&self, user_id: &str, folder_id: &str) -> StudyResult<Vec<T>> {
        self.find_many(doc! { "user_id": user_id, "folder_id": folder_id })
            .await
    }

    async fn find_many(&self, filter: Document) -> StudyResult<Vec<T>> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();
        let cursor = self.coll().find(filter, options).await?;
        Ok(cursor.try_collect().await?)
    }

    pub async fn count(&self, user_id: &str) -> StudyResult<u64> {
        Ok(self
            .coll()
            .count_documents(doc! { "user_id": user_id }, None)
            .await?)
    }

    /// Reject creation when a free account already owns `free_tier_limit` documents.
    /// Not atomic with the later insert; concurrent creates may overshoot.
    pub async fn ensure_quota(
        &self,
        user: &AuthenticatedUser,
        config: &StudyConfig,
    ) -> StudyResult<()> {
        if user.is_paid() {
            return Ok(());
        }
        let owned = self.count(&user.user_id).await?;
        if owned >= config.free_tier_limit {
            return Err(StudyError::LimitReached {
                resource: T::PLURAL.to_string(),
            });
        }
        Ok(())
    }

    /// Apply `$set` fields (plus `updated_at`) and return the updated document
    pub async fn update_fields(&self, id: &str, user_id: &str, mut set: Document) -> StudyResult<T> {
        let oid = parse_object_id(id, T::LABEL)?;
        set.insert("updated_at", bson::DateTime::from_chrono(Utc::now()));
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();
        self.coll()
            .find_one_and_update(owned_filter(oid, user_id), doc! { "$set": set }, options)
            .await?
            .ok_or_else(|| StudyError::not_found(T::LABEL))
    }

    /// Rename. Renaming to the current name succeeds and changes nothing visible.
    pub async fn rename(&self, id: &str, user_id: &str, name: &str) -> StudyResult<T> {
        let mut set = Document::new();
        set.insert(T::NAME_FIELD, name);
        self.update_fields(id, user_id, set).await
    }

    /// Assign to a folder owned by the same user, or unassign with `None`
    pub async fn assign_folder(
        &self,
        id: &str,
        user_id: &str,
        folder_id: Option<&str>,
    ) -> StudyResult<T> {
        let value = match folder_id {
            Some(fid) => {
                let folder = ResourceStore::<Folder>::new(self.db.clone())
                    .find_owned(fid, user_id)
                    .await?;
                Bson::String(folder.id.map(|id| id.to_hex()).unwrap_or_default())
            }
            None => Bson::Null,
        };
        self.update_fields(id, user_id, doc! { "folder_id": value })
            .await
    }

    /// Hard delete
    pub async fn delete(&self, id: &str, user_id: &str) -> StudyResult<()> {
        let oid = parse_object_id(id, T::LABEL)?;
        let result = self
            .coll()
            .delete_one(owned_filter(oid, user_id), None)
            .await?;
        if result.deleted_count == 0 {
            return Err(StudyError::not_found(T::LABEL));
        }
        tracing::info!(collection = T::COLLECTION, user_id, "Deleted {} {}", T::SINGULAR, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_id_is_not_found() {
        let err = parse_object_id("not-an-id", "Quiz").unwrap_err();
        assert!(matches!(err, StudyError::NotFound { ref resource } if resource == "Quiz"));
        assert!(parse_object_id("507f1f77bcf86cd799439011", "Quiz").is_ok());
    }

    #[test]
    fn test_owned_filter_scopes_user() {
        let oid = ObjectId::new();
        let filter = owned_filter(oid, "user-1");
        assert_eq!(filter.get_object_id("_id").unwrap(), oid);
        assert_eq!(filter.get_str("user_id").unwrap(), "user-1");
    }
}
