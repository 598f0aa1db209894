// src/models/auth.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use utoipa::ToSchema;

// Papéis da plataforma (enum `user_role` no Postgres)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "user_role")]
pub enum Role {
    #[sqlx(rename = "ROLE_USER")]
    #[serde(rename = "ROLE_USER")]
    User,
    #[sqlx(rename = "ROLE_LOUEUR")]
    #[serde(rename = "ROLE_LOUEUR")]
    Loueur,
    #[sqlx(rename = "ROLE_ADMIN")]
    #[serde(rename = "ROLE_ADMIN")]
    Admin,
}

impl Role {
    /// Loueurs e admins ignoram as checagens de dono.
    pub fn is_elevated(self) -> bool {
        matches!(self, Role::Loueur | Role::Admin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "ROLE_USER",
            Role::Loueur => "ROLE_LOUEUR",
            Role::Admin => "ROLE_ADMIN",
        }
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

// Representa um usuário vindo do banco de dados
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    #[schema(example = "Camille Martin")]
    pub name: String,
    #[schema(example = "camille@example.com")]
    pub email: String,

    #[serde(skip_serializing)] // IMPORTANTE para segurança
    #[schema(ignore)]
    pub password_hash: String,

    #[schema(example = "0601020304")]
    pub telephone: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Resumo público do cliente, anexado às reservas
#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

// Dados para registro de um novo usuário
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RegisterUserPayload {
    #[validate(length(min = 1, max = 255, message = "Le nom est obligatoire."))]
    #[schema(example = "Camille Martin")]
    pub name: String,
    #[validate(email(message = "L'adresse e-mail est invalide."))]
    #[schema(example = "camille@example.com")]
    pub email: String,
    #[validate(length(min = 6, message = "Le mot de passe doit contenir au moins 6 caractères."))]
    pub password: String,
    pub telephone: Option<String>,
    // Auto-cadastro: ROLE_USER (padrão) ou ROLE_LOUEUR
    pub role: Option<Role>,
}

// Dados para login
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct LoginUserPayload {
    #[validate(email(message = "L'adresse e-mail est invalide."))]
    pub email: String,
    #[validate(length(min = 1, message = "Le mot de passe est obligatoire."))]
    pub password: String,
}

// Resposta de autenticação com o token
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    #[schema(example = "bearer")]
    pub token_type: String,
    /// Segundos até a expiração
    #[schema(example = 3600)]
    pub expires_in: i64,
    pub user: User,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateUserPayload {
    #[validate(length(min = 1, max = 255, message = "Le nom est obligatoire."))]
    pub name: Option<String>,
    pub telephone: Option<String>,
    // Só admins podem trocar papéis
    pub role: Option<Role>,
}

// Estrutura de dados ("claims") dentro do JWT
// Vai para as extensions junto do `AuthenticatedUser` (logout/refresh revogam pelo `jti`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub jti: Uuid,  // ID do token, alvo da revogação
    pub role: Role,
    pub exp: usize, // Expiration time (quando o token expira)
    pub iat: usize, // Issued At (quando o token foi criado)
}
