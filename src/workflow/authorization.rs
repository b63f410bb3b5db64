use serde::{Deserialize, Serialize};

use crate::errors::{CostSheetError, Result};
use crate::types::{Capability, Role, UserId};

/// the user performing an action, as vouched for by the session layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<UserId>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn staff(user_id: impl Into<UserId>) -> Self {
        Self::new(user_id, Role::Staff)
    }

    pub fn admin(user_id: impl Into<UserId>) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn super_admin(user_id: impl Into<UserId>) -> Self {
        Self::new(user_id, Role::SuperAdmin)
    }
}

/// capabilities held by one role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CapabilitySet {
    pub submit: bool,
    pub approve: bool,
    pub edit_any: bool,
    pub manage_rates: bool,
}

impl CapabilitySet {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            submit: true,
            approve: true,
            edit_any: true,
            manage_rates: true,
        }
    }

    pub fn contains(&self, capability: Capability) -> bool {
        match capability {
            Capability::Submit => self.submit,
            Capability::Approve => self.approve,
            Capability::EditAny => self.edit_any,
            Capability::ManageRates => self.manage_rates,
        }
    }
}

/// who may approve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationModel {
    /// admins and super admins approve
    AdminApproves,
    /// only super admins approve; admins edit, submit and manage rates
    SuperAdminApproves,
}

impl Default for AuthorizationModel {
    fn default() -> Self {
        AuthorizationModel::SuperAdminApproves
    }
}

/// capability set resolved per role
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationPolicy {
    pub staff: CapabilitySet,
    pub admin: CapabilitySet,
    pub super_admin: CapabilitySet,
}

impl AuthorizationPolicy {
    pub fn from_model(model: AuthorizationModel) -> Self {
        let admin = match model {
            AuthorizationModel::AdminApproves => CapabilitySet::all(),
            AuthorizationModel::SuperAdminApproves => CapabilitySet {
                approve: false,
                ..CapabilitySet::all()
            },
        };

        Self {
            staff: CapabilitySet::none(),
            admin,
            super_admin: CapabilitySet::all(),
        }
    }

    pub fn capabilities(&self, role: Role) -> CapabilitySet {
        match role {
            Role::Staff => self.staff,
            Role::Admin => self.admin,
            Role::SuperAdmin => self.super_admin,
        }
    }

    pub fn allows(&self, actor: &Actor, capability: Capability) -> bool {
        self.capabilities(actor.role).contains(capability)
    }

    /// fail with a privilege error unless the actor's role holds the capability
    pub fn require(&self, actor: &Actor, capability: Capability) -> Result<()> {
        if self.allows(actor, capability) {
            Ok(())
        } else {
            Err(CostSheetError::InsufficientPrivilege {
                role: actor.role,
                capability,
            })
        }
    }

    /// roles holding a capability, in ascending privilege
    pub fn roles_with(&self, capability: Capability) -> Vec<Role> {
        [Role::Staff, Role::Admin, Role::SuperAdmin]
            .into_iter()
            .filter(|role| self.capabilities(*role).contains(capability))
            .collect()
    }
}

impl Default for AuthorizationPolicy {
    fn default() -> Self {
        Self::from_model(AuthorizationModel::default())
    }
}
