use async_graphql::{ComplexObject, Context};

use super::super::context::RequestContext;
use super::super::models::{Group, Role, Todo, User};
use super::RoleGuard;

// Relationship fields, resolved through the request's loaders
#[ComplexObject]
impl User {
    async fn todos(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Option<Todo>>> {
        let request = ctx.data::<RequestContext>()?;
        let todos = request.todos_by_user_id().load(self.id).await?;
        Ok(todos.into_iter().map(Some).collect())
    }
}

#[ComplexObject]
impl Todo {
    async fn user(&self, ctx: &Context<'_>) -> async_graphql::Result<Option<User>> {
        let request = ctx.data::<RequestContext>()?;
        Ok(request.users_by_id().load(self.user_id).await?)
    }
}

#[ComplexObject]
impl Group {
    #[graphql(guard = "RoleGuard::new(Role::Admin)")]
    async fn users(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<Option<User>>> {
        let request = ctx.data::<RequestContext>()?;
        let members = request.users_by_group_id().load(self.id).await?;
        Ok(members.into_iter().map(Some).collect())
    }
}
