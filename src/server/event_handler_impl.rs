use crate::application_port::{CreateTodoInput, TodoService};
use crate::domain_model::UserEvent;
use crate::logger::*;
use crate::server::{EventHandler, HandlerContext, HandlerError, QueuedMessage};
use anyhow::Context;
use std::sync::Arc;

pub const WELCOME_TODO_TITLE: &str = "Welcome to the Todo App";
pub const WELCOME_TODO_DESCRIPTION: &str = "Add your first real todo!";

/// Seeds a welcome todo for every newly registered user.
pub struct WelcomeTodoHandler {
    todo_service: Arc<dyn TodoService>,
}

impl WelcomeTodoHandler {
    pub fn new(todo_service: Arc<dyn TodoService>) -> Self {
        Self { todo_service }
    }
}

#[async_trait::async_trait]
impl EventHandler for WelcomeTodoHandler {
    async fn handle(
        &self,
        _ctx: HandlerContext,
        message: &QueuedMessage,
    ) -> Result<(), HandlerError> {
        let event: UserEvent =
            serde_json::from_slice(&message.payload).map_err(|source| HandlerError::Decode {
                coordinates: message.coordinates(),
                source,
            })?;

        let todo = self
            .todo_service
            .create(CreateTodoInput {
                user_id: event.id,
                title: WELCOME_TODO_TITLE.to_string(),
                description: Some(WELCOME_TODO_DESCRIPTION.to_string()),
            })
            .await
            .with_context(|| format!("failed to create welcome todo for user {}", event.id))?;

        info!(user_id = %event.id, todo_id = %todo.id, "welcome todo created");
        Ok(())
    }
}
