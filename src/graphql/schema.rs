use async_graphql::{Context, Object};

use super::super::context::RequestContext;
use super::super::database::{EntityKind, Record};
use super::super::models::{Group, Todo, User};

// Root object for GraphQL queries
pub struct QueryRoot;

// Top-level fields issue one direct lookup each; nested fields go through loaders
#[Object]
impl QueryRoot {
    // Queries the todos with the given ids
    async fn todos(&self, ctx: &Context<'_>, ids: Vec<i32>) -> async_graphql::Result<Vec<Option<Todo>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let request = ctx.data::<RequestContext>()?;
        let records = request.store().fetch_by_keys(EntityKind::Todo, &ids).await?;
        Ok(records.into_iter().filter_map(Record::into_todo).map(Some).collect())
    }

    // Queries a single todo by id
    async fn todo(&self, ctx: &Context<'_>, id: i32) -> async_graphql::Result<Option<Todo>> {
        let request = ctx.data::<RequestContext>()?;
        let records = request.store().fetch_by_keys(EntityKind::Todo, &[id]).await?;
        Ok(records.into_iter().find_map(Record::into_todo))
    }

    // Queries a single user by id
    async fn user(&self, ctx: &Context<'_>, id: i32) -> async_graphql::Result<Option<User>> {
        let request = ctx.data::<RequestContext>()?;
        let records = request.store().fetch_by_keys(EntityKind::User, &[id]).await?;

        match records.into_iter().find_map(Record::into_user) {
            Some(row) => {
                let user = User::try_from(row)?;
                request.users_by_id().prime(user.id, Some(user.clone()));
                Ok(Some(user))
            }
            None => Ok(None),
        }
    }

    // Queries the users with the given ids
    async fn users(&self, ctx: &Context<'_>, ids: Vec<i32>) -> async_graphql::Result<Vec<Option<User>>> {
        let request = ctx.data::<RequestContext>()?;
        let records = request.store().fetch_by_keys(EntityKind::User, &ids).await?;

        let mut users = Vec::with_capacity(records.len());
        for row in records.into_iter().filter_map(Record::into_user) {
            let user = User::try_from(row)?;
            // Later `Todo.user` lookups in this request can reuse what was just read
            request.users_by_id().prime(user.id, Some(user.clone()));
            users.push(Some(user));
        }
        Ok(users)
    }

    // Queries a group by id
    async fn group(&self, ctx: &Context<'_>, id: i32) -> async_graphql::Result<Option<Group>> {
        let request = ctx.data::<RequestContext>()?;
        let records = request.store().fetch_by_keys(EntityKind::Group, &[id]).await?;
        Ok(records.into_iter().find_map(Record::into_group))
    }
}
