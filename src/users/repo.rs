use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::users::repo_types::{PublicUser, User};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A user with the same email is already stored.
    #[error("email already registered")]
    UniquenessViolation,

    #[error("storage error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return Self::UniquenessViolation;
            }
        }
        Self::Internal(e.into())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence for users. Email uniqueness is enforced here, not by callers.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn insert(&self, user: &User) -> StoreResult<()>;

    /// Every stored user without the credential hash, in storage order.
    async fn list_all(&self) -> StoreResult<Vec<PublicUser>>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, fullname, email, phone, password_hash, country, gender, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn insert(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, fullname, email, phone, password_hash, country, gender, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.fullname)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .bind(&user.country)
        .bind(&user.gender)
        .bind(user.created_at)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn list_all(&self) -> StoreResult<Vec<PublicUser>> {
        let rows = sqlx::query_as::<_, PublicUser>(
            r#"
            SELECT id, fullname, email, phone, country, gender, created_at
            FROM users
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }
}

/// Process-local store, kept in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn insert(&self, user: &User) -> StoreResult<()> {
        // Check and push under one write lock so racing inserts cannot both land.
        let mut users = self.users.write().await;
        if users.iter().any(|u| u.email == user.email) {
            return Err(StoreError::UniquenessViolation);
        }
        users.push(user.clone());
        Ok(())
    }

    async fn list_all(&self) -> StoreResult<Vec<PublicUser>> {
        let users = self.users.read().await;
        Ok(users.iter().cloned().map(PublicUser::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;
    use uuid::Uuid;

    fn user(email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            fullname: "Test User".into(),
            email: email.into(),
            phone: "555-0100".into(),
            password_hash: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".into(),
            country: "US".into(),
            gender: "F".into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn insert_then_find_by_email() {
        let store = InMemoryUserStore::new();
        let u = user("a@example.com");
        store.insert(&u).await.expect("insert");

        let found = store
            .find_by_email("a@example.com")
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found.id, u.id);
        assert!(store.find_by_email("b@example.com").await.expect("find").is_none());
    }

    #[tokio::test]
    async fn email_lookup_is_case_sensitive() {
        let store = InMemoryUserStore::new();
        store.insert(&user("Jane@example.com")).await.expect("insert");
        assert!(store.find_by_email("jane@example.com").await.expect("find").is_none());
        store
            .insert(&user("jane@example.com"))
            .await
            .expect("differently-cased email is a distinct user");
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_uniqueness_violation() {
        let store = InMemoryUserStore::new();
        store.insert(&user("dup@example.com")).await.expect("first");
        let err = store.insert(&user("dup@example.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::UniquenessViolation));
        assert_eq!(store.list_all().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn concurrent_inserts_with_same_email_admit_one() {
        let store = std::sync::Arc::new(InMemoryUserStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.insert(&user("race@example.com")).await })
            })
            .collect();

        let mut ok = 0;
        for h in handles {
            match h.await.expect("join") {
                Ok(()) => ok += 1,
                Err(StoreError::UniquenessViolation) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.list_all().await.expect("list").len(), 1);
    }

    #[tokio::test]
    async fn list_all_keeps_insertion_order() {
        let store = InMemoryUserStore::new();
        for email in ["one@example.com", "two@example.com", "three@example.com"] {
            store.insert(&user(email)).await.expect("insert");
        }
        let emails: Vec<String> = store
            .list_all()
            .await
            .expect("list")
            .into_iter()
            .map(|u| u.email)
            .collect();
        assert_eq!(emails, ["one@example.com", "two@example.com", "three@example.com"]);
    }

    // Needs a reachable Postgres in DATABASE_URL:
    //   cargo test -- --ignored
    #[tokio::test]
    #[ignore = "requires Postgres"]
    async fn postgres_rejects_duplicate_email_and_hides_hash() {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            return;
        };
        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .expect("connect");
        sqlx::migrate!("./migrations").run(&db).await.expect("migrate");
        let store = PgUserStore::new(db);

        let email = format!("jane-{}@example.com", Uuid::new_v4());
        let first = user(&email);
        store.insert(&first).await.expect("first insert");

        let err = store.insert(&user(&email)).await.unwrap_err();
        assert!(matches!(err, StoreError::UniquenessViolation), "got {err}");

        let upper = email.replacen("jane", "Jane", 1);
        store
            .insert(&user(&upper))
            .await
            .expect("differently-cased email is a distinct user");

        let found = store
            .find_by_email(&email)
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found.id, first.id);
        assert_eq!(found.password_hash, first.password_hash);

        let listed: Vec<PublicUser> = store
            .list_all()
            .await
            .expect("list")
            .into_iter()
            .filter(|u| u.email == email)
            .collect();
        assert_eq!(listed.len(), 1);
        let json = serde_json::to_value(&listed[0]).expect("serialize");
        assert_eq!(json["email"], email.as_str());
        assert!(json.get("password_hash").is_none());
        assert!(json.get("password").is_none());
    }

    #[test]
    fn non_unique_sqlx_errors_are_internal() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Internal(_)));
    }
}
