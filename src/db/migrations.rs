// Database migrations
use sqlx::SqlitePool;

const TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        username VARCHAR(50) NOT NULL,
        email VARCHAR(250) UNIQUE NOT NULL,
        password VARCHAR(255) NOT NULL,
        avatar VARCHAR(255),
        created_at TEXT NOT NULL,
        role VARCHAR(20) NOT NULL DEFAULT 'user',
        refresh_token VARCHAR(255),
        is_active BOOLEAN NOT NULL DEFAULT 1,
        is_verify BOOLEAN NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS fotos (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        image_url VARCHAR(300) NOT NULL,
        transform_url TEXT,
        title VARCHAR(50) NOT NULL DEFAULT '',
        descr VARCHAR(500) NOT NULL DEFAULT '',
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        done BOOLEAN NOT NULL DEFAULT 0,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        public_id VARCHAR(255) NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS tags (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        title VARCHAR(50) UNIQUE NOT NULL,
        created_at TEXT NOT NULL,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS foto_tags (
        foto_id INTEGER NOT NULL REFERENCES fotos(id) ON DELETE CASCADE,
        tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
        PRIMARY KEY (foto_id, tag_id)
    )",
    "CREATE TABLE IF NOT EXISTS comments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        text VARCHAR(500) NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        foto_id INTEGER NOT NULL REFERENCES fotos(id) ON DELETE CASCADE,
        update_status BOOLEAN NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS ratings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        rate INTEGER NOT NULL CHECK (rate BETWEEN 1 AND 5),
        created_at TEXT NOT NULL,
        foto_id INTEGER NOT NULL REFERENCES fotos(id) ON DELETE CASCADE,
        user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE
    )",
    "CREATE TABLE IF NOT EXISTS blacklist_tokens (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        token VARCHAR(500) UNIQUE NOT NULL,
        blacklisted_on TEXT NOT NULL
    )",
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_fotos_user ON fotos(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_foto_tags_tag ON foto_tags(tag_id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_foto ON comments(foto_id)",
    "CREATE INDEX IF NOT EXISTS idx_comments_user ON comments(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_ratings_foto ON ratings(foto_id)",
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_ratings_foto_user ON ratings(foto_id, user_id)",
    "CREATE INDEX IF NOT EXISTS idx_ratings_user ON ratings(user_id)",
    "CREATE INDEX IF NOT EXISTS idx_tags_user ON tags(user_id)",
];

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;

    for statement in TABLES.iter().chain(INDEXES) {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::debug!("Migrations applied ({} tables)", TABLES.len());
    Ok(())
}
