// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::auth::Role,
};

/// 1. O Trait que define quais papéis passam pelo portão
pub trait RoleDef: Send + Sync + 'static {
    fn allows(role: Role) -> bool;
}

/// 2. O Extractor (Guardião). Admins passam por todos.
pub struct RequireRole<T>(pub PhantomData<T>);

pub(crate) fn is_allowed<T: RoleDef>(role: Role) -> bool {
    role == Role::Admin || T::allows(role)
}

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_request_parts(parts, state)
            .await
            .unwrap_or_default();

        // A. Extrai Usuário (401 se o auth_guard não rodou)
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        // B. Verifica o papel
        if !is_allowed::<T>(user.role) {
            tracing::warn!(user_id = %user.id, role = user.role.as_str(), "Acesso negado pelo papel");
            return Err(AppError::Forbidden.to_api_error(&locale, &app_state.i18n_store));
        }

        Ok(RequireRole(PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS PORTÕES (TIPOS)
// ---

/// Gestão do catálogo: loueurs (e admins)
pub struct RoleLoueur;
impl RoleDef for RoleLoueur {
    fn allows(role: Role) -> bool {
        role.is_elevated()
    }
}

/// Somente administradores
pub struct RoleAdmin;
impl RoleDef for RoleAdmin {
    fn allows(_role: Role) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_passes_every_gate() {
        assert!(is_allowed::<RoleAdmin>(Role::Admin));
        assert!(is_allowed::<RoleLoueur>(Role::Admin));
    }

    #[test]
    fn loueur_gate() {
        assert!(is_allowed::<RoleLoueur>(Role::Loueur));
        assert!(!is_allowed::<RoleLoueur>(Role::User));
    }

    #[test]
    fn admin_gate_rejects_everyone_else() {
        assert!(!is_allowed::<RoleAdmin>(Role::Loueur));
        assert!(!is_allowed::<RoleAdmin>(Role::User));
    }
}
