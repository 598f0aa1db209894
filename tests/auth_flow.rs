// Sessões JWT contra um Postgres real.
// DATABASE_URL=... cargo test -- --ignored

use sqlx::PgPool;

use coworking_backend::{
    common::error::AppError,
    config::{AppState, Config},
    middleware::auth::AuthenticatedUser,
    models::auth::RegisterUserPayload,
};

fn config() -> Config {
    Config {
        database_url: String::new(),
        jwt_secret: "segredo-de-teste".into(),
        jwt_ttl_hours: 1,
        bind_addr: "127.0.0.1:0".into(),
        db_max_connections: 5,
    }
}

async fn registered(state: &AppState, email: &str) -> anyhow::Result<()> {
    state
        .auth_service
        .register_user(RegisterUserPayload {
            name: "Camille".into(),
            email: email.into(),
            password: "motdepasse".into(),
            telephone: None,
            role: None,
        })
        .await?;
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer DATABASE_URL"]
async fn logout_revokes_only_the_presented_token(pool: PgPool) -> anyhow::Result<()> {
    let state = AppState::from_pool(pool.clone(), &config())?;
    let auth = &state.auth_service;
    registered(&state, "camille@example.com").await?;

    let first = auth.login_user("camille@example.com", "motdepasse").await?;
    let second = auth.login_user("camille@example.com", "motdepasse").await?;

    let (_, claims) = auth.validate_token(&first.access_token).await?;
    auth.logout(&claims).await?;

    let err = auth.validate_token(&first.access_token).await.unwrap_err();
    assert!(matches!(err, AppError::InvalidToken));

    // A outra sessão segue válida
    let (user, _) = auth.validate_token(&second.access_token).await?;
    assert_eq!(user.email, "camille@example.com");

    // Logout repetido não falha
    auth.logout(&claims).await?;
    Ok(())
}

#[sqlx::test(migrations = "./migrations")]
#[ignore = "requer DATABASE_URL"]
async fn refresh_replaces_the_current_token(pool: PgPool) -> anyhow::Result<()> {
    let state = AppState::from_pool(pool.clone(), &config())?;
    let auth = &state.auth_service;
    registered(&state, "camille@example.com").await?;

    let login = auth.login_user("camille@example.com", "motdepasse").await?;
    let (user, claims) = auth.validate_token(&login.access_token).await?;
    let current = AuthenticatedUser { id: user.id, role: user.role };

    let refreshed = auth.refresh(&current, &claims).await?;
    assert!(auth.validate_token(&refreshed.access_token).await.is_ok());
    assert!(matches!(
        auth.validate_token(&login.access_token).await.unwrap_err(),
        AppError::InvalidToken
    ));
    Ok(())
}
