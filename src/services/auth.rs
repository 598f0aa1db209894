// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::UserRepository,
    middleware::auth::AuthenticatedUser,
    models::auth::{AuthResponse, Claims, RegisterUserPayload, Role, UpdateUserPayload, User},
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    token_ttl: Duration,
    pool: PgPool,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, token_ttl: Duration, pool: PgPool) -> Self {
        Self { user_repo, jwt_secret, token_ttl, pool }
    }

    pub async fn register_user(&self, payload: RegisterUserPayload) -> Result<User, AppError> {
        // 1. Auto-cadastro nunca cria administradores
        let role = payload.role.unwrap_or_default();
        if role == Role::Admin {
            return Err(AppError::Forbidden);
        }

        // 2. Hashing fora do runtime assíncrono
        let password = payload.password;
        let hashed_password = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;

        // 3. Cria Usuário
        let user = self
            .user_repo
            .create_user(
                &self.pool,
                payload.name.trim(),
                payload.email.trim(),
                &hashed_password,
                payload.telephone.as_deref(),
                role,
            )
            .await?;

        tracing::info!(user_id = %user.id, role = role.as_str(), "Novo usuário registrado");
        Ok(user)
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_email(email.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            return Err(AppError::InvalidCredentials);
        }

        self.issue(user)
    }

    /// Novo token para um usuário já autenticado; o token atual é revogado.
    pub async fn refresh(&self, current: &AuthenticatedUser, claims: &Claims) -> Result<AuthResponse, AppError> {
        let user = self.current_user(current).await?;
        self.revoke(claims).await?;
        self.issue(user)
    }

    /// Encerra a sessão do token apresentado.
    pub async fn logout(&self, claims: &Claims) -> Result<(), AppError> {
        self.revoke(claims).await?;
        tracing::info!(user_id = %claims.sub, "Logout");
        Ok(())
    }

    /// Token válido, não revogado e usuário ainda existente.
    pub async fn validate_token(&self, token: &str) -> Result<(User, Claims), AppError> {
        let claims = decode_token(&self.jwt_secret, token)?;

        if self.user_repo.is_token_revoked(claims.jti).await? {
            return Err(AppError::InvalidToken);
        }

        let user = self
            .user_repo
            .find_by_id(&self.pool, claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;
        Ok((user, claims))
    }

    async fn revoke(&self, claims: &Claims) -> Result<(), AppError> {
        let expires_at = DateTime::<Utc>::from_timestamp(claims.exp as i64, 0).ok_or(AppError::InvalidToken)?;
        self.user_repo.revoke_token(claims.jti, claims.sub, expires_at).await
    }

    pub async fn current_user(&self, current: &AuthenticatedUser) -> Result<User, AppError> {
        self.user_repo
            .find_by_id(&self.pool, current.id)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    fn issue(&self, user: User) -> Result<AuthResponse, AppError> {
        let access_token = encode_token(&self.jwt_secret, user.id, user.role, self.token_ttl)?;
        Ok(AuthResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.token_ttl.num_seconds(),
            user,
        })
    }

    // ---
    // Gestão de usuários
    // ---

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.user_repo.list().await
    }

    /// O próprio usuário ou um admin.
    pub async fn get_user(&self, caller: &AuthenticatedUser, id: Uuid) -> Result<User, AppError> {
        ensure_self_or_admin(caller, id)?;
        self.user_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::ResourceNotFound("resource.user"))
    }

    pub async fn update_user(
        &self,
        caller: &AuthenticatedUser,
        id: Uuid,
        payload: UpdateUserPayload,
    ) -> Result<User, AppError> {
        ensure_self_or_admin(caller, id)?;
        if payload.role.is_some() && caller.role != Role::Admin {
            return Err(AppError::Forbidden);
        }

        self.user_repo
            .update_user(
                id,
                payload.name.as_deref().map(str::trim),
                payload.telephone.as_deref(),
                payload.role,
            )
            .await?
            .ok_or(AppError::ResourceNotFound("resource.user"))
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<(), AppError> {
        if !self.user_repo.delete_user(id).await? {
            return Err(AppError::ResourceNotFound("resource.user"));
        }
        tracing::info!(user_id = %id, "Usuário removido");
        Ok(())
    }
}

fn ensure_self_or_admin(caller: &AuthenticatedUser, id: Uuid) -> Result<(), AppError> {
    if caller.id == id || caller.role == Role::Admin {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

pub fn encode_token(secret: &str, user_id: Uuid, role: Role, ttl: Duration) -> Result<String, AppError> {
    let now = Utc::now();
    let expires_at = now + ttl;

    let claims = Claims {
        sub: user_id,
        jti: Uuid::new_v4(),
        role,
        exp: expires_at.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

/// Assinatura, expiração e formato; qualquer falha vira `InvalidToken`.
pub fn decode_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| AppError::InvalidToken)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_subject_and_role() {
        let id = Uuid::new_v4();
        let token = encode_token("segredo", id, Role::Loueur, Duration::hours(1)).unwrap();
        let claims = decode_token("segredo", &token).unwrap();
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, Role::Loueur);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn every_token_gets_its_own_id() {
        let id = Uuid::new_v4();
        let first = encode_token("segredo", id, Role::User, Duration::hours(1)).unwrap();
        let second = encode_token("segredo", id, Role::User, Duration::hours(1)).unwrap();
        assert_ne!(
            decode_token("segredo", &first).unwrap().jti,
            decode_token("segredo", &second).unwrap().jti
        );
    }

    #[test]
    fn token_signed_with_another_secret_is_rejected() {
        let token = encode_token("segredo", Uuid::new_v4(), Role::User, Duration::hours(1)).unwrap();
        assert!(matches!(decode_token("outro", &token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let token = encode_token("segredo", Uuid::new_v4(), Role::User, Duration::hours(-2)).unwrap();
        assert!(matches!(decode_token("segredo", &token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn profile_access_is_self_or_admin() {
        let me = AuthenticatedUser { id: Uuid::new_v4(), role: Role::Loueur };
        assert!(ensure_self_or_admin(&me, me.id).is_ok());
        assert!(ensure_self_or_admin(&me, Uuid::new_v4()).is_err());

        let admin = AuthenticatedUser { id: Uuid::new_v4(), role: Role::Admin };
        assert!(ensure_self_or_admin(&admin, me.id).is_ok());
    }
}
