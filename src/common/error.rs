// src/common/error.rs

use std::collections::HashMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::common::i18n::I18nStore;
use crate::middleware::i18n::Locale;
use crate::services::availability::Unavailability;

// Erros de domínio. Os handlers convertem para `ApiError` no idioma do cliente.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    // Linha fora da janela, slot já ocupado ou conflito dentro do próprio pedido
    #[error("Indisponível: {product} ({reason:?})")]
    AvailabilityConflict { product: String, reason: Unavailability },

    #[error("E-mail já existe")]
    EmailAlreadyExists,

    #[error("Categoria já existe")]
    CategoryAlreadyExists,

    #[error("Credenciais inválidas")]
    InvalidCredentials,

    #[error("Token inválido")]
    InvalidToken,

    #[error("Acesso negado")]
    Forbidden,

    // Chave i18n do recurso ("resource.product", ...)
    #[error("Recurso não encontrado: {0}")]
    ResourceNotFound(&'static str),

    // Estado que não deveria existir (produto sumiu no meio do cálculo, etc.)
    #[error("Inconsistência: {0}")]
    Consistency(String),

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),

    #[error("Erro de Bcrypt: {0}")]
    BcryptError(#[from] bcrypt::BcryptError),

    #[error("Erro de JWT: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) | AppError::AvailabilityConflict { .. } => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::ResourceNotFound(_) => StatusCode::NOT_FOUND,
            AppError::EmailAlreadyExists | AppError::CategoryAlreadyExists => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Traduz o erro para a resposta HTTP no idioma pedido.
    pub fn to_api_error(&self, locale: &Locale, i18n: &I18nStore) -> ApiError {
        let lang = locale.0.as_str();
        let status = self.status();

        let (error, details) = match self {
            AppError::ValidationError(errors) => {
                let mut details: HashMap<String, Vec<String>> = HashMap::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages = field_errors
                        .iter()
                        .map(|e| match &e.message {
                            Some(m) => m.to_string(),
                            None => i18n.translate(lang, "errors.invalid_field"),
                        })
                        .collect();
                    details.insert(field.to_string(), messages);
                }
                (i18n.translate(lang, "errors.validation"), Some(json!(details)))
            }
            AppError::AvailabilityConflict { product, reason } => (
                i18n.translate_with(lang, reason.message_key(), &[("product", product.as_str())]),
                None,
            ),
            AppError::EmailAlreadyExists => (i18n.translate(lang, "errors.email_exists"), None),
            AppError::CategoryAlreadyExists => (i18n.translate(lang, "errors.category_exists"), None),
            AppError::InvalidCredentials => (i18n.translate(lang, "errors.invalid_credentials"), None),
            AppError::InvalidToken => (i18n.translate(lang, "errors.invalid_token"), None),
            AppError::Forbidden => (i18n.translate(lang, "errors.forbidden"), None),
            AppError::ResourceNotFound(resource) => {
                let resource = i18n.translate(lang, resource);
                (i18n.translate_with(lang, "errors.not_found", &[("resource", resource.as_str())]), None)
            }
            // Detalhes internos só vão para o log
            e => {
                tracing::error!("Erro Interno do Servidor: {}", e);
                (i18n.translate(lang, "errors.internal"), None)
            }
        };

        ApiError { status, error, details }
    }
}

// Resposta de erro pronta para o cliente
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub error: String,
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut body = json!({
            "success": false,
            "message": self.error,
        });
        if let Some(details) = self.details {
            body["details"] = details;
        }
        (self.status, Json(body)).into_response()
    }
}
