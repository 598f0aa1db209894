// src/services/catalog_service.rs

use std::collections::HashMap;

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;
use validator::ValidationErrors;

use crate::{
    common::error::AppError,
    db::{CategoryRepository, ProductRepository, ReservationRepository},
    middleware::auth::AuthenticatedUser,
    models::catalog::{Category, CreateProductPayload, Product, ProductDetail, UpdateProductPayload},
    services::{
        availability::{AvailabilityWindow, TimeSlot},
        policy::can_manage,
        pricing,
    },
};

#[derive(Clone)]
pub struct CatalogService {
    category_repo: CategoryRepository,
    product_repo: ProductRepository,
    reservation_repo: ReservationRepository,
    pool: PgPool,
}

impl CatalogService {
    pub fn new(
        category_repo: CategoryRepository,
        product_repo: ProductRepository,
        reservation_repo: ReservationRepository,
        pool: PgPool,
    ) -> Self {
        Self { category_repo, product_repo, reservation_repo, pool }
    }

    // ---
    // Categorias
    // ---

    pub async fn list_categories(&self) -> Result<Vec<Category>, AppError> {
        self.category_repo.list().await
    }

    pub async fn get_category(&self, id: Uuid) -> Result<Category, AppError> {
        self.category_repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::ResourceNotFound("resource.category"))
    }

    pub async fn create_category(&self, name: &str) -> Result<Category, AppError> {
        let name = name.trim();
        self.category_repo.create(name, &slugify(name)).await
    }

    pub async fn update_category(&self, id: Uuid, name: &str) -> Result<Category, AppError> {
        let name = name.trim();
        self.category_repo
            .update(id, name, &slugify(name))
            .await?
            .ok_or(AppError::ResourceNotFound("resource.category"))
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<(), AppError> {
        if !self.category_repo.delete(id).await? {
            return Err(AppError::ResourceNotFound("resource.category"));
        }
        Ok(())
    }

    // ---
    // Produtos
    // ---

    /// Catálogo público, cada produto com suas categorias.
    pub async fn list_products(&self) -> Result<Vec<ProductDetail>, AppError> {
        let products = self.product_repo.list().await?;
        self.with_categories(products).await
    }

    pub async fn get_product(&self, id: Uuid) -> Result<ProductDetail, AppError> {
        let product = self
            .product_repo
            .find_by_id(&self.pool, id)
            .await?
            .ok_or(AppError::ResourceNotFound("resource.product"))?;

        self.with_categories(vec![product])
            .await?
            .pop()
            .ok_or_else(|| AppError::Consistency(format!("produto {id} sumiu durante a leitura")))
    }

    pub async fn create_product(
        &self,
        owner: &AuthenticatedUser,
        payload: CreateProductPayload,
    ) -> Result<ProductDetail, AppError> {
        // 1. Janela coerente
        let window = payload.validate_window().map_err(|e| field_error("date_fin", e))?;

        let mut tx = self.pool.begin().await?;

        // 2. Categorias existentes
        self.ensure_categories_exist(&mut tx, &payload.categories).await?;

        // 3. Produto + vínculos
        let product = self
            .product_repo
            .create(
                &mut *tx,
                owner.id,
                payload.nom.trim(),
                payload.description.trim(),
                payload.prix,
                payload.image.as_deref(),
                window,
            )
            .await?;
        self.product_repo
            .set_categories(&mut tx, product.id, &payload.categories)
            .await?;

        tx.commit().await?;

        tracing::info!(product_id = %product.id, owner_id = %owner.id, %window, "Produto criado");
        self.get_product(product.id).await
    }

    pub async fn update_product(
        &self,
        caller: &AuthenticatedUser,
        id: Uuid,
        payload: UpdateProductPayload,
    ) -> Result<ProductDetail, AppError> {
        let window = payload.validate_window().map_err(|e| field_error("date_fin", e))?;

        let mut tx = self.pool.begin().await?;

        let current = self
            .product_repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::ResourceNotFound("resource.product"))?;
        if !can_manage(caller, current.owner_id) {
            return Err(AppError::Forbidden);
        }

        if let Some(categories) = &payload.categories {
            if categories.is_empty() {
                let mut e = validator::ValidationError::new("length");
                e.message = Some("Sélectionnez au moins une catégorie.".into());
                return Err(field_error("categories", e));
            }
            self.ensure_categories_exist(&mut tx, categories).await?;
            self.product_repo.set_categories(&mut tx, id, categories).await?;
        }

        self.product_repo
            .update(
                &mut *tx,
                id,
                payload.nom.as_deref().map(str::trim),
                payload.description.as_deref().map(str::trim),
                payload.prix,
                payload.image.as_deref(),
                window,
            )
            .await?
            .ok_or(AppError::ResourceNotFound("resource.product"))?;

        tx.commit().await?;

        self.get_product(id).await
    }

    /// Remove o produto e somente as linhas de reserva dele.
    ///
    /// As reservas afetadas têm o total recalculado; as que ficam sem
    /// nenhuma linha são removidas. Tudo numa transação.
    pub async fn delete_product(&self, caller: &AuthenticatedUser, id: Uuid) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        let product = self
            .product_repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or(AppError::ResourceNotFound("resource.product"))?;
        if !can_manage(caller, product.owner_id) {
            return Err(AppError::Forbidden);
        }

        // 1. Trava as reservas afetadas antes de tocar nas linhas
        self.reservation_repo.lock_for_product(&mut tx, id).await?;

        // 2. Linhas do produto
        let affected = self.reservation_repo.delete_lines_for_product(&mut *tx, id).await?;

        // 3. Recalcula os totais com as linhas que sobraram
        let remaining = self.reservation_repo.priced_lines(&mut *tx, &affected).await?;
        let mut totals: HashMap<Uuid, Decimal> = HashMap::new();
        for line in &remaining {
            let slot = TimeSlot::new(line.start_time, line.end_time)
                .ok_or_else(|| AppError::Consistency(format!("linha inválida na reserva {}", line.reservation_id)))?;
            *totals.entry(line.reservation_id).or_default() += pricing::line_amount(line.hourly_price, &slot);
        }

        let mut emptied = Vec::new();
        for reservation_id in &affected {
            match totals.get(reservation_id) {
                Some(total) => {
                    self.reservation_repo.set_total(&mut *tx, *reservation_id, *total).await?;
                }
                None => emptied.push(*reservation_id),
            }
        }

        // 4. Reservas vazias
        if !emptied.is_empty() {
            self.reservation_repo.delete_many(&mut *tx, &emptied).await?;
        }

        // 5. O produto
        self.product_repo.delete(&mut *tx, id).await?;

        tx.commit().await?;

        tracing::info!(
            product_id = %id,
            reservations_updated = affected.len() - emptied.len(),
            reservations_removed = emptied.len(),
            "Produto removido"
        );
        Ok(())
    }

    /// Converte a string de disponibilidade herdada nas colunas estruturadas.
    /// Valores ilegíveis ficam sem janela (produto não reservável).
    pub async fn backfill_legacy_availability(&self) -> Result<usize, AppError> {
        let pending = self.product_repo.find_pending_legacy().await?;
        let mut converted = 0;

        for product in pending {
            let raw = product.legacy_availability.as_deref().unwrap_or_default();
            match AvailabilityWindow::parse_legacy(raw) {
                Some(window) => {
                    self.product_repo.set_window(product.id, window).await?;
                    converted += 1;
                }
                None => {
                    tracing::warn!(product_id = %product.id, raw, "Disponibilidade herdada ilegível; produto sem janela");
                }
            }
        }

        Ok(converted)
    }

    // ---
    // Auxiliares
    // ---

    async fn with_categories(&self, products: Vec<Product>) -> Result<Vec<ProductDetail>, AppError> {
        let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
        let mut by_product: HashMap<Uuid, Vec<Category>> = HashMap::new();
        for row in self.product_repo.categories_for(&self.pool, &ids).await? {
            by_product.entry(row.product_id).or_default().push(row.category);
        }

        Ok(products
            .into_iter()
            .map(|product| {
                let categories = by_product.remove(&product.id).unwrap_or_default();
                ProductDetail { product, categories }
            })
            .collect())
    }

    async fn ensure_categories_exist(
        &self,
        conn: &mut PgConnection,
        ids: &[Uuid],
    ) -> Result<(), AppError> {
        let mut unique = ids.to_vec();
        unique.sort();
        unique.dedup();

        let found = self.category_repo.count_existing(&mut *conn, &unique).await?;
        if found != unique.len() as i64 {
            let mut e = validator::ValidationError::new("exists");
            e.message = Some("Une ou plusieurs catégories sont introuvables.".into());
            return Err(field_error("categories", e));
        }
        Ok(())
    }
}

fn field_error(field: &'static str, error: validator::ValidationError) -> AppError {
    let mut errors = ValidationErrors::new();
    errors.add(field, error);
    AppError::ValidationError(errors)
}

/// "Locaux commerciaux" -> "locaux-commerciaux"; acentos viram ASCII.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        let folded = fold_accent(c);
        if folded.is_ascii_alphanumeric() {
            slug.push(folded);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' => 'i',
        'ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' => 'o',
        'ù' | 'ú' | 'û' | 'ü' => 'u',
        'ý' | 'ÿ' => 'y',
        other => other,
    }
}
