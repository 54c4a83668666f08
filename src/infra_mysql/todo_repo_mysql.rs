use crate::domain_model::*;
use crate::domain_port::*;
use chrono::{SubsecRound, Utc};
use sqlx::mysql::MySqlRow;
use sqlx::{MySql, MySqlPool, QueryBuilder, Row};

const TODO_COLUMNS: &str =
    "SELECT id, user_id, title, description, status, created_at, updated_at FROM todos";

pub struct MySqlTodoRepo {
    pool: MySqlPool,
}

impl MySqlTodoRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlTodoRepo { pool }
    }

    fn row_to_record(r: &MySqlRow) -> Result<TodoRecord, RepoError> {
        let get_err = |e: sqlx::Error| RepoError::Store(e.to_string());
        let status: i8 = r.try_get("status").map_err(get_err)?;
        Ok(TodoRecord {
            todo_id: r.try_get("id").map_err(get_err)?,
            user_id: r.try_get("user_id").map_err(get_err)?,
            title: r.try_get("title").map_err(get_err)?,
            description: r.try_get("description").map_err(get_err)?,
            status: TodoStatus::try_from(status).map_err(|e| RepoError::Store(e.to_string()))?,
            created_at: r.try_get("created_at").map_err(get_err)?,
            updated_at: r.try_get("updated_at").map_err(get_err)?,
        })
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, MySql>, filter: &TodoFilter) {
    qb.push(" WHERE user_id = ").push_bind(filter.user_id);
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_i8());
    }
}

#[async_trait::async_trait]
impl TodoRepo for MySqlTodoRepo {
    async fn create(&self, todo: NewTodo) -> Result<TodoRecord, RepoError> {
        let now = Utc::now().trunc_subsecs(0);

        let res = sqlx::query(
            r#"
INSERT INTO todos (user_id, title, description, status, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?)
"#,
        )
        .bind(todo.user_id)
        .bind(&todo.title)
        .bind(&todo.description)
        .bind(todo.status.as_i8())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Store(format!("insert todo: {e}")))?;

        Ok(TodoRecord {
            todo_id: TodoId(res.last_insert_id()),
            user_id: todo.user_id,
            title: todo.title,
            description: todo.description,
            status: todo.status,
            created_at: now,
            updated_at: now,
        })
    }

    async fn list(&self, filter: &TodoFilter) -> Result<(Vec<TodoRecord>, u64), RepoError> {
        let mut count = QueryBuilder::<MySql>::new("SELECT COUNT(id) FROM todos");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| RepoError::Store(format!("count todos: {e}")))?;

        let mut qb = QueryBuilder::<MySql>::new(TODO_COLUMNS);
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY id ASC LIMIT ")
            .push_bind(filter.page.limit)
            .push(" OFFSET ")
            .push_bind(filter.page.offset);

        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| RepoError::Store(format!("list todos: {e}")))?;

        let todos = rows
            .iter()
            .map(Self::row_to_record)
            .collect::<Result<Vec<_>, _>>()?;

        Ok((todos, total as u64))
    }

    async fn find_by_id(&self, todo_id: TodoId) -> Result<Option<TodoRecord>, RepoError> {
        let row = sqlx::query(&format!("{TODO_COLUMNS} WHERE id = ? LIMIT 1"))
            .bind(todo_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| RepoError::Store(format!("query todo: {e}")))?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn update_by_id(&self, todo_id: TodoId, changes: &TodoChanges) -> Result<(), RepoError> {
        sqlx::query(
            r#"
UPDATE todos SET title = ?, description = ?, status = ?, updated_at = ?
WHERE id = ?
"#,
        )
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(changes.status.as_i8())
        .bind(Utc::now().trunc_subsecs(0))
        .bind(todo_id)
        .execute(&self.pool)
        .await
        .map_err(|e| RepoError::Store(format!("update todo: {e}")))?;
        Ok(())
    }
}
