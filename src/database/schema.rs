use sqlx::{Pool, Postgres};

// Creates the tables and lookup indexes if they are missing
pub async fn init_db(pool: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(
        r#"
        CREATE TABLE IF NOT EXISTS groups (
            id SERIAL PRIMARY KEY,
            kind TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS users (
            id SERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            age INTEGER NOT NULL,
            metadata TEXT,
            group_id INTEGER REFERENCES groups (id)
        );
        CREATE TABLE IF NOT EXISTS todos (
            id SERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            user_id INTEGER NOT NULL REFERENCES users (id)
        );
        CREATE INDEX IF NOT EXISTS idx_users_group_id ON users (group_id);
        CREATE INDEX IF NOT EXISTS idx_todos_user_id ON todos (user_id);
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
