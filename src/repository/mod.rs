// Data access, one module per table family. Functions take the pool and
// return domain rows; permission checks that depend on row ownership live
// here too.

pub mod comments;
pub mod fotos;
pub mod ratings;
pub mod tags;
pub mod users;

/// Turns a unique-constraint violation into `conflict()`; other errors pass through
pub(crate) fn on_unique_violation(
    error: sqlx::Error,
    conflict: impl FnOnce() -> crate::models::errors::AppError,
) -> crate::models::errors::AppError {
    match &error {
        sqlx::Error::Database(db) if db.is_unique_violation() => conflict(),
        _ => error.into(),
    }
}

/// Lower-cased `%text%` pattern with LIKE metacharacters escaped by `\`
pub(crate) fn like_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
pub(crate) async fn test_pool() -> sqlx::SqlitePool {
    let pool = crate::db::connect_in_memory().await.unwrap();
    crate::db::migrations::run_migrations(&pool).await.unwrap();
    pool
}
