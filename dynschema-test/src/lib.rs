use std::future::Future;

use dynschema::{conn::Connection, SchemaMetadata};

/// Run a test body against a fresh in-memory database seeded with a small
/// telecom-flavoured schema: user tables (`vendors`, `posts`, `articles`,
/// `devices`, `notes`, `samples`, `plain`) plus framework tables that must
/// stay hidden (`migrations`, `cache`).
pub async fn run_test<Fn, Fut>(f: Fn)
where
    Fn: FnOnce(SchemaMetadata) -> Fut,
    Fut: Future<Output = ()>,
{
    env_logger::try_init().ok();

    let conn = Connection::connect("sqlite://memory").await.unwrap();
    seed(&conn).await;

    f(SchemaMetadata::new(conn)).await;
}

async fn seed(conn: &Connection) {
    conn.execute_ddl(
        r#"
        CREATE TABLE vendors (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            vendor_code VARCHAR(50) NOT NULL,
            vendor_name VARCHAR(100) NOT NULL
        );
        CREATE INDEX vendors_vendor_code_index ON vendors (vendor_code);

        CREATE TABLE posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title VARCHAR(255) NOT NULL,
            vendor_id BIGINT,
            created_at DATETIME,
            updated_at DATETIME,
            FOREIGN KEY (vendor_id) REFERENCES vendors (id)
        );

        CREATE TABLE articles (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title VARCHAR(255) NOT NULL,
            body TEXT,
            created_at DATETIME,
            updated_at DATETIME,
            deleted_at DATETIME
        );

        CREATE TABLE devices (
            serial VARCHAR(64) PRIMARY KEY,
            status VARCHAR(20) NOT NULL
        );

        CREATE TABLE notes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            note VARCHAR(255)
        );

        CREATE TABLE samples (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            foo VARCHAR(50)
        );

        CREATE TABLE plain (
            id INTEGER PRIMARY KEY AUTOINCREMENT
        );

        CREATE TABLE migrations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            migration VARCHAR(255) NOT NULL
        );

        CREATE TABLE cache (
            key VARCHAR(255) PRIMARY KEY,
            value TEXT
        );

        INSERT INTO vendors (vendor_code, vendor_name) VALUES ('AC', 'Acme'), ('BO', 'Bolt');
        INSERT INTO posts (title, vendor_id) VALUES ('First post', 1), ('Second post', 2);
        INSERT INTO articles (title, body) VALUES ('Kept', 'kept body'), ('Gone', 'gone body');
        UPDATE articles SET deleted_at = CURRENT_TIMESTAMP WHERE title = 'Gone';
        INSERT INTO devices (serial, status) VALUES ('SN-1', 'active');
        INSERT INTO samples (foo) VALUES ('X');
        INSERT INTO plain DEFAULT VALUES;
        "#,
    )
    .await
    .unwrap();
}
