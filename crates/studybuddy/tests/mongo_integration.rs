//! Integration tests against a live MongoDB.
//!
//! Set `STUDYBUDDY_TEST_MONGODB_URI` to run them; each test uses its own
//! throwaway database. Without the variable the tests return early.

use mongodb::bson::oid::ObjectId;
use studybuddy::models::{FileType, Flashcard, FlashcardSession, Folder, Upload};
use studybuddy::services::{
    FolderService, ResourceStore, SaveFlashcardsRequest, StudyService, UploadService,
};
use studybuddy::{AccountType, AuthenticatedUser, MongoDb, StudyConfig, StudyError};

async fn test_db() -> Option<MongoDb> {
    let uri = match std::env::var("STUDYBUDDY_TEST_MONGODB_URI") {
        Ok(uri) if !uri.is_empty() => uri,
        _ => {
            eprintln!("STUDYBUDDY_TEST_MONGODB_URI not set, skipping");
            return None;
        }
    };
    let name = format!("studybuddy_test_{}", ObjectId::new().to_hex());
    Some(MongoDb::connect(&uri, &name).await.unwrap())
}

async fn drop_db(db: MongoDb) {
    db.db().drop(None).await.unwrap();
    db.close().await;
}

fn user(id: &str) -> AuthenticatedUser {
    AuthenticatedUser {
        user_id: id.to_string(),
        account_type: AccountType::Free,
    }
}

async fn text_upload(db: &MongoDb, owner: &AuthenticatedUser) -> Upload {
    UploadService::new(db.clone())
        .create_from_text(
            owner,
            &StudyConfig::default(),
            Some("Biology notes"),
            FileType::Text,
            "Mitochondria are the powerhouse of the cell.",
            None,
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_other_users_resources_are_not_found() {
    let Some(db) = test_db().await else { return };
    let alice = user("alice");
    let upload = text_upload(&db, &alice).await;
    let id = upload.id.unwrap().to_hex();

    let store = ResourceStore::<Upload>::new(db.clone());
    let err = store.find_owned(&id, "bob").await.unwrap_err();
    assert!(matches!(err, StudyError::NotFound { .. }));
    let err = store.delete(&id, "bob").await.unwrap_err();
    assert!(matches!(err, StudyError::NotFound { .. }));
    let err = store.rename(&id, "bob", "Stolen").await.unwrap_err();
    assert!(matches!(err, StudyError::NotFound { .. }));

    // Still there for the owner
    assert!(store.find_owned(&id, "alice").await.is_ok());
    drop_db(db).await;
}

#[tokio::test]
async fn test_folder_round_trip_and_delete_unassigns() {
    let Some(db) = test_db().await else { return };
    let alice = user("alice");
    let folders = FolderService::new(db.clone());
    let folder = folders.create("alice", "Biology").await.unwrap();
    let folder_id = folder.id.unwrap().to_hex();

    let upload = text_upload(&db, &alice).await;
    let upload_id = upload.id.unwrap().to_hex();
    let store = ResourceStore::<Upload>::new(db.clone());
    store
        .assign_folder(&upload_id, "alice", Some(&folder_id))
        .await
        .unwrap();

    let in_folder = store.list_by_folder("alice", &folder_id).await.unwrap();
    assert_eq!(in_folder.len(), 1);
    assert_eq!(in_folder[0].id, upload.id);

    // Someone else's folder cannot be used
    let bob_folder = folders.create("bob", "Bob's").await.unwrap();
    let err = store
        .assign_folder(&upload_id, "alice", Some(&bob_folder.id.unwrap().to_hex()))
        .await
        .unwrap_err();
    assert!(matches!(err, StudyError::NotFound { .. }));

    folders.delete(&folder_id, "alice").await.unwrap();
    let upload = store.find_owned(&upload_id, "alice").await.unwrap();
    assert_eq!(upload.folder_id, None);
    let err = ResourceStore::<Folder>::new(db.clone())
        .find_owned(&folder_id, "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, StudyError::NotFound { .. }));
    drop_db(db).await;
}

#[tokio::test]
async fn test_rename_to_same_name_is_idempotent() {
    let Some(db) = test_db().await else { return };
    let folders = FolderService::new(db.clone());
    let folder = folders.create("alice", "Chemistry").await.unwrap();
    let id = folder.id.unwrap().to_hex();

    let first = folders.rename(&id, "alice", "Organic").await.unwrap();
    let second = folders.rename(&id, "alice", "Organic").await.unwrap();
    assert_eq!(first.folder_name, "Organic");
    assert_eq!(second.folder_name, "Organic");
    drop_db(db).await;
}

#[tokio::test]
async fn test_saved_flashcards_read_back_unchanged() {
    let Some(db) = test_db().await else { return };
    let alice = user("alice");
    let request: SaveFlashcardsRequest = serde_json::from_value(serde_json::json!({
        "sessionName": "Cells",
        "studyCards": [
            { "question": "Powerhouse of the cell?", "answer": "Mitochondria" },
            { "question": "Control centre?", "answer": "Nucleus" }
        ],
        "transcript": "Cells have organelles."
    }))
    .unwrap();

    let saved = StudyService::new(db.clone())
        .save_flashcards(&alice, &StudyConfig::default(), request)
        .await
        .unwrap();
    let id = saved.id.unwrap().to_hex();

    let loaded = ResourceStore::<FlashcardSession>::new(db.clone())
        .find_owned(&id, "alice")
        .await
        .unwrap();
    assert_eq!(loaded.study_session, "Cells");
    assert_eq!(loaded.transcript.as_deref(), Some("Cells have organelles."));
    assert_eq!(
        loaded.flashcards,
        vec![
            Flashcard {
                question: "Powerhouse of the cell?".to_string(),
                answer: "Mitochondria".to_string(),
            },
            Flashcard {
                question: "Control centre?".to_string(),
                answer: "Nucleus".to_string(),
            },
        ]
    );
    drop_db(db).await;
}

#[tokio::test]
async fn test_free_tier_limit() {
    let Some(db) = test_db().await else { return };
    let config = StudyConfig::default().with_free_tier_limit(1);
    let uploads = UploadService::new(db.clone());
    let free = user("alice");

    uploads
        .create_from_text(&free, &config, None, FileType::Text, "first", None)
        .await
        .unwrap();
    let err = uploads
        .create_from_text(&free, &config, None, FileType::Text, "second", None)
        .await
        .unwrap_err();
    assert!(matches!(err, StudyError::LimitReached { .. }));

    let paid = AuthenticatedUser {
        user_id: "alice".to_string(),
        account_type: AccountType::Paid,
    };
    assert!(uploads
        .create_from_text(&paid, &config, None, FileType::Text, "third", None)
        .await
        .is_ok());
    drop_db(db).await;
}
