//src/main.rs

use axum::{
    middleware as axum_middleware,
    routing::{get, post, put},
    Router,
};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use coworking_backend::{
    config::{AppState, Config},
    docs::ApiDoc,
    handlers,
    middleware::auth::auth_guard,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Inicializa o logger (RUST_LOG, padrão "info")
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    // Se a configuração falhar, a aplicação não deve iniciar.
    let config = Config::from_env()?;
    let app_state = AppState::new(&config).await?;

    // Faz o app rodar as migrações do SQLx na inicialização
    sqlx::migrate!().run(&app_state.db_pool).await?;
    tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

    // Converte a disponibilidade herdada (uma vez por produto)
    let converted = app_state.catalog_service.backfill_legacy_availability().await?;
    if converted > 0 {
        tracing::info!("🗓️ {} produtos com janela de disponibilidade convertida", converted);
    }

    // Rotas públicas
    let public_routes = Router::new()
        .route("/auth/register", post(handlers::auth::register))
        .route("/auth/login", post(handlers::auth::login))
        .route("/categories_public", get(handlers::categories::list_public))
        .route("/produits", get(handlers::products::list_products));

    // Rotas protegidas pelo middleware (o papel é checado por handler)
    let protected_routes = Router::new()
        .route("/me", get(handlers::auth::get_me))
        .route("/refresh", post(handlers::auth::refresh))
        .route("/logout", post(handlers::auth::logout))
        // Usuários
        .route("/users", get(handlers::users::list_users))
        .route("/users/{id}"
               ,get(handlers::users::get_user)
               .put(handlers::users::update_user)
               .delete(handlers::users::delete_user)
        )
        // Categorias (admin)
        .route("/categories"
               ,get(handlers::categories::list_categories)
               .post(handlers::categories::create_category)
        )
        .route("/categories/{id}"
               ,get(handlers::categories::get_category)
               .put(handlers::categories::update_category)
               .delete(handlers::categories::delete_category)
        )
        // Produtos
        .route("/produits", post(handlers::products::create_product))
        .route("/produits/{id}"
               ,get(handlers::products::get_product)
               .put(handlers::products::update_product)
               .delete(handlers::products::delete_product)
        )
        // Reservas
        .route("/commandes", post(handlers::reservations::create_reservation))
        .route("/commandes/create", post(handlers::reservations::create_reservation))
        .route("/commandes/verifier-disponibilite", post(handlers::reservations::check_availability))
        .route("/commandes/creneaux-reserves", post(handlers::reservations::booked_slots))
        .route("/commandes/{id}"
               ,put(handlers::reservations::update_reservation)
               .delete(handlers::reservations::delete_reservation)
        )
        .route("/commandes_complete", get(handlers::reservations::list_complete))
        .route("/commandes_complete/{id}", get(handlers::reservations::get_complete))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            auth_guard,
        ));

    // Combina tudo no router principal
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api", public_routes.merge(protected_routes))
        .with_state(app_state);

    // Inicia o servidor
    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("🚀 Servidor escutando em {}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
