// src/services/policy.rs

use uuid::Uuid;

use crate::middleware::auth::AuthenticatedUser;

/// Pode alterar/excluir o recurso: dono, loueur ou admin.
pub fn can_manage(user: &AuthenticatedUser, owner_id: Option<Uuid>) -> bool {
    user.role.is_elevated() || owner_id == Some(user.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::auth::Role;

    fn user(role: Role) -> AuthenticatedUser {
        AuthenticatedUser { id: Uuid::new_v4(), role }
    }

    #[test]
    fn owner_can_manage_own_resource() {
        let u = user(Role::User);
        assert!(can_manage(&u, Some(u.id)));
    }

    #[test]
    fn plain_user_cannot_manage_someone_elses_resource() {
        assert!(!can_manage(&user(Role::User), Some(Uuid::new_v4())));
        assert!(!can_manage(&user(Role::User), None));
    }

    #[test]
    fn loueur_and_admin_can_manage_anything() {
        for role in [Role::Loueur, Role::Admin] {
            assert!(can_manage(&user(role), Some(Uuid::new_v4())));
            assert!(can_manage(&user(role), None));
        }
    }
}
