use crate::application_port::*;
use crate::domain_model::{TodoId, TodoStatus, UserId};
use crate::domain_port::*;
use std::sync::Arc;

pub struct RealTodoService {
    todo_repo: Arc<dyn TodoRepo>,
}

impl RealTodoService {
    pub fn new(todo_repo: Arc<dyn TodoRepo>) -> RealTodoService {
        RealTodoService { todo_repo }
    }

    /// Load a todo and make sure `user_id` owns it.
    async fn owned(&self, todo_id: TodoId, user_id: UserId) -> Result<TodoRecord, TodoError> {
        let record = self
            .todo_repo
            .find_by_id(todo_id)
            .await?
            .ok_or(TodoError::NotFound)?;
        if record.user_id != user_id {
            return Err(TodoError::Forbidden);
        }
        Ok(record)
    }
}

#[async_trait::async_trait]
impl TodoService for RealTodoService {
    async fn create(&self, request: CreateTodoInput) -> Result<TodoView, TodoError> {
        let record = self
            .todo_repo
            .create(NewTodo {
                user_id: request.user_id,
                title: request.title,
                description: request.description,
                status: TodoStatus::Pending,
            })
            .await?;
        Ok(TodoView::from(&record))
    }

    async fn list(&self, request: SearchTodoInput) -> Result<(Vec<TodoView>, u64), TodoError> {
        let filter = TodoFilter {
            user_id: request.user_id,
            status: request.status,
            page: request.page,
        };
        let (records, total) = self.todo_repo.list(&filter).await?;
        Ok((records.iter().map(TodoView::from).collect(), total))
    }

    async fn find_by_id(&self, todo_id: TodoId, user_id: UserId) -> Result<TodoView, TodoError> {
        let record = self.owned(todo_id, user_id).await?;
        Ok(TodoView::from(&record))
    }

    async fn update_by_id(&self, request: UpdateTodoInput) -> Result<(), TodoError> {
        self.owned(request.todo_id, request.user_id).await?;
        self.todo_repo
            .update_by_id(
                request.todo_id,
                &TodoChanges {
                    title: request.title,
                    description: request.description,
                    status: request.status,
                },
            )
            .await?;
        Ok(())
    }
}
