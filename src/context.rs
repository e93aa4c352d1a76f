use std::sync::Arc;

use super::database::StoreGateway;
use super::loader::{
    LoaderConfig, TodosByUserId, TodosByUserLoader, UserLoader, UsersByGroupId, UsersByGroupLoader, UsersById,
};
use super::models::Role;

// Everything a resolver may touch while serving one GraphQL request.
//
// Built fresh for each incoming request and attached to it as request data,
// so loader caches never outlive the request that filled them.
pub struct RequestContext {
    store: Arc<dyn StoreGateway>,
    role: Role,
    users_by_id: UserLoader,
    todos_by_user_id: TodosByUserLoader,
    users_by_group_id: UsersByGroupLoader,
}

impl RequestContext {
    pub fn new(store: Arc<dyn StoreGateway>, role: Role, config: LoaderConfig) -> Self {
        RequestContext {
            users_by_id: UserLoader::new("users_by_id", UsersById::new(store.clone()), config),
            todos_by_user_id: TodosByUserLoader::new("todos_by_user_id", TodosByUserId::new(store.clone()), config),
            users_by_group_id: UsersByGroupLoader::new("users_by_group_id", UsersByGroupId::new(store.clone()), config),
            store,
            role,
        }
    }

    // Shared gateway for direct, unbatched lookups
    pub fn store(&self) -> &dyn StoreGateway {
        self.store.as_ref()
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn users_by_id(&self) -> &UserLoader {
        &self.users_by_id
    }

    pub fn todos_by_user_id(&self) -> &TodosByUserLoader {
        &self.todos_by_user_id
    }

    pub fn users_by_group_id(&self) -> &UsersByGroupLoader {
        &self.users_by_group_id
    }
}
