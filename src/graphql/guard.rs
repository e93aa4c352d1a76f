use async_graphql::{Context, Guard, Result};

use super::super::context::RequestContext;
use super::super::models::Role;

// Lets a field resolve only for callers acting under `role`
pub struct RoleGuard {
    role: Role,
}

impl RoleGuard {
    pub fn new(role: Role) -> Self {
        RoleGuard { role }
    }
}

impl Guard for RoleGuard {
    async fn check(&self, ctx: &Context<'_>) -> Result<()> {
        let request = ctx.data::<RequestContext>()?;
        if request.role() == self.role {
            Ok(())
        } else {
            Err("you are not allowed".into())
        }
    }
}
