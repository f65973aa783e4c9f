/// Static role policy table
///
/// Each operation declares the organization roles allowed to perform it in
/// one table, evaluated by a pure function after tenant (and, where
/// relevant, project) context has been resolved. An empty role set means
/// "any active member". There is no runtime registration and no reflection;
/// adding an operation means adding an enum variant and a table row, and the
/// compiler enforces the table stays total.
///
/// # Example
///
/// ```
/// use teamgrid_shared::auth::policy::{check_operation, Operation};
/// use teamgrid_shared::models::org_membership::OrgRole;
///
/// assert!(check_operation(Operation::CreateProject, OrgRole::Admin));
/// assert!(!check_operation(Operation::CreateProject, OrgRole::Member));
/// assert!(check_operation(Operation::ListProjects, OrgRole::Member));
/// ```

use crate::guards::GuardError;
use crate::models::org_membership::OrgRole;

/// Operations subject to role policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Create a project in the organization
    CreateProject,

    /// Soft-delete a project (org-level override path)
    DeleteProject,

    /// List the organization's projects
    ListProjects,

    /// Read organization details
    ViewOrganization,

    /// Soft-delete the organization
    DeleteOrganization,

    /// List organization members
    ListMembers,

    /// Change a member's role or deactivate a member
    ManageMembers,

    /// Send or resend an invitation, or list pending invitations
    ManageInvites,
}

/// Roles allowed to perform an operation
///
/// An empty slice places no restriction beyond active membership, which the
/// tenant context resolver has already established.
pub fn allowed_roles(op: Operation) -> &'static [OrgRole] {
    use OrgRole::*;

    match op {
        Operation::CreateProject => &[Owner, Admin],
        Operation::DeleteProject => &[Owner, Admin],
        Operation::ListProjects => &[],
        Operation::ViewOrganization => &[],
        Operation::DeleteOrganization => &[Owner],
        Operation::ListMembers => &[],
        Operation::ManageMembers => &[Owner, Admin],
        Operation::ManageInvites => &[Owner, Admin],
    }
}

/// Checks whether a role may perform an operation
pub fn check_operation(op: Operation, role: OrgRole) -> bool {
    let roles = allowed_roles(op);
    roles.is_empty() || roles.contains(&role)
}

/// Fails with `GuardError::Forbidden` unless the role may perform the
/// operation
///
/// Runs last in the guard chain: it assumes tenant context (and project
/// context, where applicable) has already been established.
pub fn require_operation(op: Operation, role: OrgRole) -> Result<(), GuardError> {
    if check_operation(op, role) {
        Ok(())
    } else {
        Err(GuardError::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_cannot_create_project() {
        assert!(!check_operation(Operation::CreateProject, OrgRole::Member));
        assert!(check_operation(Operation::CreateProject, OrgRole::Admin));
        assert!(check_operation(Operation::CreateProject, OrgRole::Owner));
    }

    #[test]
    fn test_only_owner_deletes_organization() {
        assert!(check_operation(Operation::DeleteOrganization, OrgRole::Owner));
        assert!(!check_operation(Operation::DeleteOrganization, OrgRole::Admin));
        assert!(!check_operation(Operation::DeleteOrganization, OrgRole::Member));
    }

    #[test]
    fn test_empty_set_admits_any_member() {
        for role in [OrgRole::Owner, OrgRole::Admin, OrgRole::Member] {
            assert!(check_operation(Operation::ListProjects, role));
            assert!(check_operation(Operation::ViewOrganization, role));
            assert!(check_operation(Operation::ListMembers, role));
        }
    }

    #[test]
    fn test_invite_management_requires_admin() {
        assert!(!check_operation(Operation::ManageInvites, OrgRole::Member));
        assert!(check_operation(Operation::ManageInvites, OrgRole::Admin));
    }

    #[test]
    fn test_require_operation_maps_to_forbidden() {
        let err = require_operation(Operation::ManageMembers, OrgRole::Member).unwrap_err();
        assert!(matches!(err, GuardError::Forbidden));
        assert!(require_operation(Operation::ManageMembers, OrgRole::Owner).is_ok());
    }
}
