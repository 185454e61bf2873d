//! `axiom_user`: organisation members.

use async_trait::async_trait;

use super::{
    create_failed, delete_failed, read_failed, require_id, update_failed, Resource, ResourceKind,
    SCHEMA_VERSION,
};
use crate::client::models::{CreateUserRequest, UpdateUserRequest, User, UserRole};
use crate::client::AxiomApi;
use crate::diagnostics::Diagnostics;
use crate::schema::{Attribute, Schema, Validator};
use crate::state::PlanState;

/// Handler for `axiom_user`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UserResource;

/// Attribute schema of `axiom_user`.
pub fn schema() -> Schema {
    Schema::new(SCHEMA_VERSION)
        .with_attribute("id", Attribute::computed_string().with_description("User identifier"))
        .with_attribute("name", Attribute::required_string().with_description("User name"))
        .with_attribute(
            "email",
            Attribute::required_string()
                .with_force_new()
                .with_validator(Validator::matches(r"^[^@\s]+@[^@\s]+$", "Must be an email address"))
                .with_description("User email"),
        )
        .with_attribute(
            "role",
            Attribute::required_string().with_description("User role id"),
        )
}

/// Build the user described by `plan`. Only the role id is known locally.
pub fn extract(plan: &PlanState) -> Result<User, Diagnostics> {
    Ok(User {
        id: plan.id().unwrap_or_default().to_string(),
        name: plan.require("name")?,
        email: plan.require("email")?,
        role: UserRole {
            id: plan.require("role")?,
            name: String::new(),
        },
    })
}

/// Flatten a remote user; `role` is the role id.
pub fn flatten(user: &User) -> PlanState {
    PlanState::new()
        .with("id", user.id.as_str())
        .with("name", user.name.as_str())
        .with("email", user.email.as_str())
        .with("role", user.role.id.as_str())
}

#[async_trait]
impl Resource for UserResource {
    fn kind(&self) -> ResourceKind {
        ResourceKind::User
    }

    fn schema(&self) -> Schema {
        schema()
    }

    async fn create(
        &self,
        client: &dyn AxiomApi,
        plan: &PlanState,
    ) -> Result<PlanState, Diagnostics> {
        let desired = extract(plan)?;
        let request = CreateUserRequest {
            name: desired.name,
            email: desired.email,
            role: desired.role.id,
        };
        let created = client
            .create_user(&request)
            .await
            .map_err(|e| create_failed(self.kind(), &e))?;
        Ok(flatten(&created))
    }

    async fn read(
        &self,
        client: &dyn AxiomApi,
        state: &PlanState,
    ) -> Result<PlanState, Diagnostics> {
        let id = require_id(state)?;
        let user = client
            .get_user(&id)
            .await
            .map_err(|e| read_failed(self.kind(), &e))?;
        Ok(flatten(&user))
    }

    /// Only the display name can change in place.
    async fn update(
        &self,
        client: &dyn AxiomApi,
        prior: &PlanState,
        plan: &PlanState,
    ) -> Result<PlanState, Diagnostics> {
        let id = require_id(prior)?;
        let desired = extract(plan)?;
        let updated = client
            .update_user(&id, &UpdateUserRequest { name: desired.name })
            .await
            .map_err(|e| update_failed(self.kind(), &e))?;
        Ok(flatten(&updated))
    }

    async fn delete(&self, client: &dyn AxiomApi, state: &PlanState) -> Result<(), Diagnostics> {
        let id = require_id(state)?;
        client
            .delete_user(&id)
            .await
            .map_err(|e| delete_failed(self.kind(), &e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Reconciler, Transition};
    use crate::testing::FakeAxiom;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_round_trip() {
        let user = User {
            id: "usr_1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role: UserRole {
                id: "admin".to_string(),
                name: String::new(),
            },
        };
        assert_eq!(extract(&flatten(&user)).unwrap(), user);
    }

    #[test]
    fn test_flatten_uses_role_id() {
        let state = flatten(&User {
            id: "usr_1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            role: UserRole {
                id: "rol_7".to_string(),
                name: "Read Only".to_string(),
            },
        });
        assert_eq!(state.raw("role"), Some(&json!("rol_7")));
    }

    #[tokio::test]
    async fn test_update_sends_name_only() {
        let fake = Arc::new(FakeAxiom::new());
        let reconciler = Reconciler::new(fake.clone());
        let plan = PlanState::new()
            .with("name", "Ada")
            .with("email", "ada@example.com")
            .with("role", "user");

        let Transition::Persist(prior) = reconciler.create(&UserResource, &plan).await.transition
        else {
            panic!("expected persisted state");
        };

        let desired = prior.clone().with("name", "Ada Lovelace");
        let Transition::Persist(state) = reconciler.update(&UserResource, &prior, &desired).await.transition
        else {
            panic!("expected persisted state");
        };

        assert_eq!(state.raw("name"), Some(&json!("Ada Lovelace")));
        assert_eq!(
            fake.last_body("update_user").unwrap(),
            json!({"name": "Ada Lovelace"})
        );
    }
}
