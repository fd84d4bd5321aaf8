//! SQLite persistence for users, mailbox, CVs, and the document index
//!
//! All stores share one connection pool. Schemas are created on connect with
//! `CREATE TABLE IF NOT EXISTS` migrations, so a fresh deployment boots
//! against an empty database file.

use crate::error::{Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

/// Shared database handle
///
/// Owns the pool and runs every store's migrations once at connect time.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database and run migrations
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .map_err(|e| Error::config(format!("Failed to connect to SQLite: {e}")))?;
        Self::from_pool(pool).await
    }

    /// Create an in-memory database, used by tests
    pub async fn in_memory() -> Result<Self> {
        // A multi-connection pool against :memory: would see one database per
        // connection, so the pool is pinned to a single connection.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| Error::config(format!("Failed to open in-memory SQLite: {e}")))?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let db = Self { pool };
        UserStore::new(db.pool()).migrate().await?;
        MailStore::new(db.pool()).migrate().await?;
        CvStore::new(db.pool()).migrate().await?;
        DocStore::new(db.pool()).migrate().await?;
        Ok(db)
    }

    /// Get a clone of the underlying pool
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }
}

/// A registered portal user
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRecord {
    /// Row id
    pub id: i64,
    /// Unique login name
    pub username: String,
    /// Unique email address
    pub email: String,
    /// Argon2 password hash
    pub password_hash: String,
    /// Role string (`employee` or `hr`)
    pub role: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

/// User account store
#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    /// Create a store over an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the users table
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a new user, returning its row id
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, role, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(role)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Look up a user by login name
    pub async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// Look up a user by email address
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let record = sqlx::query_as::<_, UserRecord>("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }
}

/// A stored email message
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct MailRecord {
    /// Row id
    pub id: i64,
    /// `sent` or `received`
    pub direction: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
    /// Sender address
    pub sender_email: Option<String>,
    /// Recipient address
    pub recipient_email: Option<String>,
    /// Subject line
    pub subject: Option<String>,
    /// Message body
    pub body: Option<String>,
    /// Delivery status
    pub status: Option<String>,
    /// Free-form category assigned at drafting time
    pub email_type: Option<String>,
    /// Conversation thread id
    pub thread_id: String,
    /// Row id of the message this replies to
    pub in_reply_to: Option<i64>,
}

/// Fields for inserting a new mail row
#[derive(Debug, Clone)]
pub struct NewMail {
    /// `sent` or `received`
    pub direction: String,
    /// Sender address
    pub sender_email: String,
    /// Recipient address
    pub recipient_email: String,
    /// Subject line
    pub subject: String,
    /// Message body
    pub body: String,
    /// Delivery status
    pub status: String,
    /// Free-form category
    pub email_type: Option<String>,
    /// Conversation thread id
    pub thread_id: String,
    /// Row id of the message this replies to
    pub in_reply_to: Option<i64>,
}

/// One row of the inbox thread listing
#[derive(Debug, Clone, Serialize)]
pub struct ThreadSummary {
    /// Conversation thread id
    pub thread_id: String,
    /// Timestamp of the most recent message
    pub last_time: String,
    /// Thread subject
    pub subject: String,
    /// Up to five participant addresses, comma separated
    pub participants: String,
}

/// Count of messages per drafted email category
#[derive(Debug, Clone, Serialize)]
pub struct EmailTypeCount {
    /// Category name
    #[serde(rename = "type")]
    pub email_type: String,
    /// Number of messages in the category
    pub count: i64,
}

/// Mailbox statistics
#[derive(Debug, Clone, Serialize)]
pub struct EmailStats {
    /// Total stored messages
    pub total_emails: i64,
    /// Messages with direction `sent`
    pub sent_emails: i64,
    /// Messages with direction `received`
    pub received_emails: i64,
    /// Distinct conversation threads
    pub total_threads: i64,
    /// Up to five most common categories
    pub top_email_types: Vec<EmailTypeCount>,
}

/// Mailbox store
#[derive(Clone)]
pub struct MailStore {
    pool: SqlitePool,
}

impl MailStore {
    /// Create a store over an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the mails table
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS mails (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                direction TEXT,
                timestamp TEXT,
                sender_email TEXT,
                recipient_email TEXT,
                subject TEXT,
                body TEXT,
                status TEXT,
                email_type TEXT,
                thread_id TEXT,
                in_reply_to INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert a mail row, returning its id
    pub async fn insert(&self, mail: &NewMail) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO mails (direction, timestamp, sender_email, recipient_email, subject, \
             body, status, email_type, thread_id, in_reply_to) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&mail.direction)
        .bind(Utc::now().to_rfc3339())
        .bind(&mail.sender_email)
        .bind(&mail.recipient_email)
        .bind(&mail.subject)
        .bind(&mail.body)
        .bind(&mail.status)
        .bind(&mail.email_type)
        .bind(&mail.thread_id)
        .bind(mail.in_reply_to)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Summaries of the most recently active threads
    pub async fn inbox_threads(&self, limit: i64) -> Result<Vec<ThreadSummary>> {
        let rows = sqlx::query(
            "SELECT thread_id, MAX(timestamp) as last_time, subject \
             FROM mails GROUP BY thread_id ORDER BY last_time DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut threads = Vec::with_capacity(rows.len());
        for row in rows {
            let thread_id: String = row.try_get("thread_id")?;
            let participants = self.thread_participants(&thread_id).await?;
            threads.push(ThreadSummary {
                last_time: row.try_get("last_time")?,
                subject: row
                    .try_get::<Option<String>, _>("subject")?
                    .unwrap_or_else(|| "(No Subject)".to_string()),
                participants,
                thread_id,
            });
        }
        Ok(threads)
    }

    async fn thread_participants(&self, thread_id: &str) -> Result<String> {
        let rows = sqlx::query(
            "SELECT sender_email, recipient_email FROM mails WHERE thread_id = ? LIMIT 10",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;

        let mut participants: Vec<String> = Vec::new();
        for row in rows {
            for column in ["sender_email", "recipient_email"] {
                if let Some(address) = row.try_get::<Option<String>, _>(column)? {
                    if !address.is_empty() && !participants.contains(&address) {
                        participants.push(address);
                    }
                }
            }
        }
        participants.truncate(5);
        Ok(participants.join(", "))
    }

    /// All messages in a thread, oldest first
    pub async fn thread_messages(&self, thread_id: &str) -> Result<Vec<MailRecord>> {
        let messages = sqlx::query_as::<_, MailRecord>(
            "SELECT * FROM mails WHERE thread_id = ? ORDER BY timestamp ASC",
        )
        .bind(thread_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(messages)
    }

    /// Most recent sent messages
    pub async fn sent_emails(&self, limit: i64) -> Result<Vec<MailRecord>> {
        let emails = sqlx::query_as::<_, MailRecord>(
            "SELECT * FROM mails WHERE direction = 'sent' ORDER BY timestamp DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(emails)
    }

    /// Mailbox statistics
    pub async fn stats(&self) -> Result<EmailStats> {
        let total_emails = self.count("SELECT COUNT(*) FROM mails").await?;
        let sent_emails = self
            .count("SELECT COUNT(*) FROM mails WHERE direction = 'sent'")
            .await?;
        let received_emails = self
            .count("SELECT COUNT(*) FROM mails WHERE direction = 'received'")
            .await?;
        let total_threads = self
            .count("SELECT COUNT(DISTINCT thread_id) FROM mails")
            .await?;

        let rows = sqlx::query(
            "SELECT email_type, COUNT(*) as count FROM mails \
             WHERE email_type IS NOT NULL \
             GROUP BY email_type ORDER BY count DESC LIMIT 5",
        )
        .fetch_all(&self.pool)
        .await?;
        let mut top_email_types = Vec::with_capacity(rows.len());
        for row in rows {
            top_email_types.push(EmailTypeCount {
                email_type: row.try_get("email_type")?,
                count: row.try_get("count")?,
            });
        }

        Ok(EmailStats {
            total_emails,
            sent_emails,
            received_emails,
            total_threads,
            top_email_types,
        })
    }

    async fn count(&self, query: &str) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(query)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// A stored CV
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CvRecord {
    /// Row id
    pub id: i64,
    /// Filename the CV was uploaded as
    pub filename: String,
    /// Extracted text content
    pub content: String,
    /// JSON metadata supplied at upload time
    pub metadata: Option<String>,
    /// RFC 3339 upload timestamp
    pub added_at: String,
}

/// CV database statistics
#[derive(Debug, Clone, Serialize)]
pub struct CvStats {
    /// Number of stored CVs
    pub total_cvs: i64,
    /// Upload timestamp of the most recent CV
    pub last_added: Option<String>,
}

/// CV database store
#[derive(Clone)]
pub struct CvStore {
    pool: SqlitePool,
}

impl CvStore {
    /// Create a store over an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the cvs table
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS cvs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                filename TEXT NOT NULL,
                content TEXT NOT NULL,
                metadata TEXT,
                added_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Store a CV, returning its row id
    pub async fn add(
        &self,
        filename: &str,
        content: &str,
        metadata: Option<&serde_json::Value>,
    ) -> Result<i64> {
        let metadata_json = metadata.map(serde_json::to_string).transpose()?;
        let result = sqlx::query(
            "INSERT INTO cvs (filename, content, metadata, added_at) VALUES (?, ?, ?, ?)",
        )
        .bind(filename)
        .bind(content)
        .bind(metadata_json)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// All stored CVs
    pub async fn all(&self) -> Result<Vec<CvRecord>> {
        let records = sqlx::query_as::<_, CvRecord>("SELECT * FROM cvs ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    /// A single CV by row id
    pub async fn get(&self, id: i64) -> Result<Option<CvRecord>> {
        let record = sqlx::query_as::<_, CvRecord>("SELECT * FROM cvs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// CV database statistics
    pub async fn stats(&self) -> Result<CvStats> {
        let total_cvs = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM cvs")
            .fetch_one(&self.pool)
            .await?;
        let last_added =
            sqlx::query_scalar::<_, Option<String>>("SELECT MAX(added_at) FROM cvs")
                .fetch_one(&self.pool)
                .await?;
        Ok(CvStats {
            total_cvs,
            last_added,
        })
    }
}

/// A document in the company-document index
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DocRecord {
    /// Row id
    pub id: i64,
    /// Document title
    pub title: String,
    /// Document text
    pub content: String,
    /// Where the document came from
    pub source: Option<String>,
    /// RFC 3339 ingestion timestamp
    pub added_at: String,
}

/// Company-document index backing the Q&A agent
#[derive(Clone)]
pub struct DocStore {
    pool: SqlitePool,
}

impl DocStore {
    /// Create a store over an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create the documents table
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                source TEXT,
                added_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Ingest a document, returning its row id
    pub async fn add(&self, title: &str, content: &str, source: Option<&str>) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO documents (title, content, source, added_at) VALUES (?, ?, ?, ?)",
        )
        .bind(title)
        .bind(content)
        .bind(source)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// All indexed documents
    pub async fn all(&self) -> Result<Vec<DocRecord>> {
        let records = sqlx::query_as::<_, DocRecord>("SELECT * FROM documents ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(records)
    }

    /// Number of indexed documents
    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Titles of all indexed documents
    pub async fn titles(&self) -> Result<Vec<String>> {
        let titles = sqlx::query_scalar::<_, String>("SELECT title FROM documents ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(titles)
    }
}
