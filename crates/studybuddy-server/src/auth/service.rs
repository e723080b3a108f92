//! User accounts: registration, password login and billing/Notion fields

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, oid::ObjectId, Bson, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use serde::{Deserialize, Serialize};
use validator::Validate;

use studybuddy::db::collections;
use studybuddy::services::parse_object_id;
use studybuddy::{AccountType, MongoDb, StudyError, StudyResult};

/// Message for every failed login, whatever the cause
const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// MongoDB duplicate key error
const DUPLICATE_KEY: i32 = 11000;

/// User document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub email: String,
    pub password_hash: String,
    #[serde(default)]
    pub account_type: AccountType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_subscription_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notion_access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notion_workspace_name: Option<String>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn id_hex(&self) -> String {
        studybuddy::models::oid_hex(&self.id)
    }
}

/// User as returned by the API (no password hash, no tokens)
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    #[serde(rename = "accountType")]
    pub account_type: AccountType,
    #[serde(rename = "subscriptionStatus")]
    pub subscription_status: Option<String>,
    #[serde(rename = "notionConnected")]
    pub notion_connected: bool,
    #[serde(rename = "notionWorkspaceName")]
    pub notion_workspace_name: Option<String>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id_hex(),
            email: u.email,
            account_type: u.account_type,
            subscription_status: u.subscription_status,
            notion_connected: u.notion_access_token.is_some(),
            notion_workspace_name: u.notion_workspace_name,
            created_at: u.created_at,
        }
    }
}

/// Register/login body
#[derive(Debug, Deserialize, Validate)]
pub struct Credentials {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Validate and normalize an email address
pub fn validate_and_normalize_email(email: &str) -> StudyResult<String> {
    let invalid = || StudyError::validation("Invalid email format");
    let email = email.trim().to_lowercase();
    if email.is_empty() || email.len() > 254 {
        return Err(invalid());
    }
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(invalid());
    }
    if !parts[1].contains('.') || email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    Ok(email)
}

/// Selects the user a billing change applies to
#[derive(Debug, Clone, Copy)]
pub enum BillingTarget<'a> {
    User(&'a str),
    Customer(&'a str),
}

/// Partial update of a user's billing fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BillingUpdate {
    pub account_type: Option<AccountType>,
    pub customer_id: Option<String>,
    pub subscription_id: Option<String>,
    /// Remove the stored subscription id
    pub clear_subscription: bool,
    pub status: Option<String>,
}

impl BillingUpdate {
    fn to_update(&self) -> Document {
        let mut set = doc! { "updated_at": bson::DateTime::from_chrono(Utc::now()) };
        if let Some(account_type) = self.account_type {
            set.insert("account_type", account_type.to_string());
        }
        if let Some(customer) = &self.customer_id {
            set.insert("stripe_customer_id", customer.as_str());
        }
        if let Some(subscription) = &self.subscription_id {
            set.insert("stripe_subscription_id", subscription.as_str());
        }
        if let Some(status) = &self.status {
            set.insert("subscription_status", status.as_str());
        }

        let mut update = doc! { "$set": set };
        if self.clear_subscription && self.subscription_id.is_none() {
            update.insert("$unset", doc! { "stripe_subscription_id": "" });
        }
        update
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

fn hash_password(password: &str) -> StudyResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StudyError::Internal(format!("Failed to hash password: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// Account service
pub struct AuthService {
    db: MongoDb,
}

impl AuthService {
    pub fn new(db: MongoDb) -> Self {
        Self { db }
    }

    fn users(&self) -> mongodb::Collection<User> {
        self.db.collection(collections::USERS)
    }

    /// Create a free account. A taken email is a 409 and nothing is written.
    pub async fn register(&self, credentials: Credentials) -> StudyResult<User> {
        let email = validate_and_normalize_email(&credentials.email)?;
        credentials.validate().map_err(|e| {
            let message = e
                .field_errors()
                .values()
                .flat_map(|errors| errors.iter())
                .find_map(|error| error.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "Invalid password".to_string());
            StudyError::Validation(message)
        })?;

        if self
            .users()
            .find_one(doc! { "email": &email }, None)
            .await?
            .is_some()
        {
            return Err(StudyError::Conflict("Email already registered".to_string()));
        }

        let now = Utc::now();
        let mut user = User {
            id: None,
            email,
            password_hash: hash_password(&credentials.password)?,
            account_type: AccountType::Free,
            stripe_customer_id: None,
            stripe_subscription_id: None,
            subscription_status: None,
            notion_access_token: None,
            notion_workspace_name: None,
            created_at: now,
            updated_at: now,
        };

        // The unique index catches a concurrent registration of the same email
        let result = match self.users().insert_one(&user, None).await {
            Ok(result) => result,
            Err(e) if is_duplicate_key(&e) => {
                return Err(StudyError::Conflict("Email already registered".to_string()))
            }
            Err(e) => return Err(e.into()),
        };
        user.id = result.inserted_id.as_object_id();

        tracing::info!(user_id = %user.id_hex(), "User registered");
        Ok(user)
    }

    /// Password login. Unknown email and wrong password look the same.
    pub async fn login(&self, credentials: &Credentials) -> StudyResult<User> {
        let unauthorized = || StudyError::Unauthorized(INVALID_CREDENTIALS.to_string());
        let email = validate_and_normalize_email(&credentials.email).map_err(|_| unauthorized())?;

        let user = self
            .users()
            .find_one(doc! { "email": &email }, None)
            .await?
            .ok_or_else(unauthorized)?;

        if !verify_password(&credentials.password, &user.password_hash) {
            return Err(unauthorized());
        }
        Ok(user)
    }

    pub async fn find_by_id(&self, user_id: &str) -> StudyResult<User> {
        let oid = parse_object_id(user_id, "User")?;
        self.users()
            .find_one(doc! { "_id": oid }, None)
            .await?
            .ok_or_else(|| StudyError::not_found("User"))
    }

    /// Apply a billing change. Returns false when no user matched.
    pub async fn update_billing(
        &self,
        target: BillingTarget<'_>,
        update: &BillingUpdate,
    ) -> StudyResult<bool> {
        let filter = match target {
            BillingTarget::User(user_id) => {
                let Ok(oid) = ObjectId::parse_str(user_id) else {
                    return Ok(false);
                };
                doc! { "_id": oid }
            }
            BillingTarget::Customer(customer_id) => doc! { "stripe_customer_id": customer_id },
        };
        let result = self
            .users()
            .update_one(filter, update.to_update(), None)
            .await?;
        Ok(result.matched_count > 0)
    }

    /// Store the Notion connection of a user
    pub async fn set_notion_connection(
        &self,
        user_id: &str,
        access_token: &str,
        workspace_name: Option<&str>,
    ) -> StudyResult<()> {
        let oid = parse_object_id(user_id, "User")?;
        let update = doc! { "$set": {
            "notion_access_token": access_token,
            "notion_workspace_name": workspace_name.map(Bson::from).unwrap_or(Bson::Null),
            "updated_at": bson::DateTime::from_chrono(Utc::now()),
        } };
        let result = self
            .users()
            .update_one(doc! { "_id": oid }, update, None)
            .await?;
        if result.matched_count == 0 {
            return Err(StudyError::not_found("User"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_and_normalize_email() {
        assert_eq!(
            validate_and_normalize_email("  Alice@Example.COM ").unwrap(),
            "alice@example.com"
        );
        assert!(validate_and_normalize_email("").is_err());
        assert!(validate_and_normalize_email("alice").is_err());
        assert!(validate_and_normalize_email("alice@localhost").is_err());
        assert!(validate_and_normalize_email("a@b@c.com").is_err());
        assert!(validate_and_normalize_email("@example.com").is_err());
        assert!(validate_and_normalize_email("al ice@example.com").is_err());
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
        assert!(!verify_password("correct horse", "not-a-hash"));
    }

    #[test]
    fn test_short_password_is_rejected() {
        let credentials = Credentials {
            email: "a@example.com".to_string(),
            password: "short".to_string(),
        };
        assert!(credentials.validate().is_err());
    }

    #[test]
    fn test_billing_update_document() {
        let update = BillingUpdate {
            account_type: Some(AccountType::Paid),
            customer_id: Some("cus_1".to_string()),
            subscription_id: Some("sub_1".to_string()),
            status: Some("active".to_string()),
            ..Default::default()
        }
        .to_update();
        let set = update.get_document("$set").unwrap();
        assert_eq!(set.get_str("account_type").unwrap(), "paid");
        assert_eq!(set.get_str("stripe_customer_id").unwrap(), "cus_1");
        assert_eq!(set.get_str("stripe_subscription_id").unwrap(), "sub_1");
        assert!(update.get("$unset").is_none());

        let update = BillingUpdate {
            account_type: Some(AccountType::Free),
            clear_subscription: true,
            status: Some("canceled".to_string()),
            ..Default::default()
        }
        .to_update();
        assert_eq!(
            update
                .get_document("$set")
                .unwrap()
                .get_str("account_type")
                .unwrap(),
            "free"
        );
        assert!(update
            .get_document("$unset")
            .unwrap()
            .contains_key("stripe_subscription_id"));
    }

    /// Needs `STUDYBUDDY_TEST_MONGODB_URI`; skipped otherwise
    #[tokio::test]
    async fn test_duplicate_registration_conflicts() {
        let uri = match std::env::var("STUDYBUDDY_TEST_MONGODB_URI") {
            Ok(uri) if !uri.is_empty() => uri,
            _ => return,
        };
        let name = format!("studybuddy_test_{}", ObjectId::new().to_hex());
        let db = MongoDb::connect(&uri, &name).await.unwrap();
        let service = AuthService::new(db.clone());

        let credentials = || Credentials {
            email: "Dup@Example.com".to_string(),
            password: "password123".to_string(),
        };
        let user = service.register(credentials()).await.unwrap();
        assert_eq!(user.email, "dup@example.com");
        assert_eq!(user.account_type, AccountType::Free);

        let err = service.register(credentials()).await.unwrap_err();
        assert!(matches!(err, StudyError::Conflict(_)));
        let count = db
            .collection::<Document>(collections::USERS)
            .count_documents(doc! {}, None)
            .await
            .unwrap();
        assert_eq!(count, 1);

        let logged_in = service.login(&credentials()).await.unwrap();
        assert_eq!(logged_in.id, user.id);
        let err = service
            .login(&Credentials {
                email: "dup@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), INVALID_CREDENTIALS);

        db.db().drop(None).await.unwrap();
        db.close().await;
    }
}
