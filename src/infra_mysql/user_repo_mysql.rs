use super::util::{downcast, is_dup_key};
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{SubsecRound, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row};

const USER_COLUMNS: &str = "SELECT id, username, password, created_at, updated_at FROM users";

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }

    fn row_to_record(r: &MySqlRow) -> Result<UserRecord, sqlx::Error> {
        Ok(UserRecord {
            user_id: r.try_get("id")?,
            username: r.try_get("username")?,
            password_hash: r.try_get("password")?,
            created_at: r.try_get("created_at")?,
            updated_at: r.try_get("updated_at")?,
        })
    }

    async fn find_one(&self, column: &str, value: &str) -> Result<Option<UserRecord>, RepoError> {
        let mut qb = QueryBuilder::<MySql>::new(USER_COLUMNS);
        qb.push(format!(" WHERE {column} = "))
            .push_bind(value.to_string())
            .push(" LIMIT 1");

        let row = qb
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Store(format!("query user by {column}: {e}")))?;

        row.as_ref()
            .map(Self::row_to_record)
            .transpose()
            .map_err(|e| RepoError::Store(e.to_string()))
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, MySql>, filter: &UserFilter) {
    let mut sep = " WHERE ";
    if let Some(user_id) = filter.user_id {
        qb.push(sep).push("id = ").push_bind(user_id);
        sep = " AND ";
    }
    if let Some(username) = &filter.username {
        qb.push(sep).push("username = ").push_bind(username.clone());
    }
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn create_in_tx<'t>(
        &self,
        tx: &mut dyn StorageTx<'t>,
        username: &str,
        password_hash: &str,
    ) -> Result<UserRecord, RepoError> {
        let tx = downcast(tx);
        let now = Utc::now().trunc_subsecs(0);

        let res = sqlx::query(
            r#"
INSERT INTO users (username, password, created_at, updated_at)
VALUES (?, ?, ?, ?)
"#,
        )
        .bind(username)
        .bind(password_hash)
        .bind(now)
        .bind(now)
        .execute(tx.conn())
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                RepoError::Duplicate(username.to_string())
            } else {
                RepoError::Store(format!("insert user: {e}"))
            }
        })?;

        Ok(UserRecord {
            user_id: UserId(res.last_insert_id()),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: now,
            updated_at: now,
        })
    }

    async fn list(&self, filter: &UserFilter) -> Result<(Vec<UserRecord>, u64), RepoError> {
        let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(id) FROM users");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Store(format!("count users: {e}")))?;

        let mut qb = QueryBuilder::<MySql>::new(USER_COLUMNS);
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY id ASC LIMIT ")
            .push_bind(filter.page.limit)
            .push(" OFFSET ")
            .push_bind(filter.page.offset);

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Store(format!("list users: {e}")))?;

        let users = rows
            .iter()
            .map(Self::row_to_record)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RepoError::Store(e.to_string()))?;

        Ok((users, total as u64))
    }

    async fn find_by_id(&self, user_id: UserId) -> Result<Option<UserRecord>, RepoError> {
        self.find_one("id", &user_id.to_string()).await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepoError> {
        self.find_one("username", username).await
    }

    async fn update_password(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), RepoError> {
        sqlx::query("UPDATE users SET password = ?, updated_at = ? WHERE id = ?")
            .bind(password_hash)
            .bind(Utc::now().trunc_subsecs(0))
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepoError::Store(format!("update password: {e}")))?;
        Ok(())
    }

    async fn count_by_username(&self, username: &str) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(id) FROM users WHERE username = ?")
            .bind(username)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Store(e.to_string()))?;

        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_adds_only_present_conditions() {
        let mut qb = QueryBuilder::<MySql>::new("SELECT COUNT(id) FROM users");
        push_filter(&mut qb, &UserFilter::default());
        assert_eq!(qb.sql(), "SELECT COUNT(id) FROM users");

        let mut qb = QueryBuilder::<MySql>::new("SELECT COUNT(id) FROM users");
        push_filter(
            &mut qb,
            &UserFilter {
                user_id: Some(UserId(1)),
                username: Some("johndoe".to_string()),
                page: Page::default(),
            },
        );
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(id) FROM users WHERE id = ? AND username = ?"
        );
    }
}
