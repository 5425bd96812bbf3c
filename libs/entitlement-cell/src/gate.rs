// libs/entitlement-cell/src/gate.rs
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};
use tracing::debug;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::bearer_token;

use crate::models::AccessStatus;
use crate::services::{AccessCache, AccessService};

/// Shared gate state: config plus the access cache. One instance is built at
/// startup and cloned into every gated router.
#[derive(Clone)]
pub struct EntitlementGate {
    config: Arc<AppConfig>,
    cache: AccessCache,
}

impl EntitlementGate {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            config,
            cache: AccessCache::default(),
        }
    }

    pub fn cache(&self) -> &AccessCache {
        &self.cache
    }

    /// Resolve access, serving token-identical re-checks from the cache.
    pub async fn check(&self, user_id: &str, token: &str) -> Result<AccessStatus, AppError> {
        if let Some(status) = self.cache.lookup(user_id, token).await {
            debug!("Access served from cache for user: {}", user_id);
            return Ok(status);
        }

        let service = AccessService::new(&self.config);
        let status = service
            .resolve_access(user_id, token)
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;

        self.cache.store(user_id, token, status.clone()).await;
        Ok(status)
    }
}

/// Middleware for gated routes. Must run after `auth_middleware` so the
/// decoded user is already in request extensions. Unentitled requests are
/// rejected; the client renders its lock view from the access endpoint.
pub async fn require_access(
    State(gate): State<EntitlementGate>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let user = request
        .extensions()
        .get::<User>()
        .cloned()
        .ok_or_else(|| AppError::Auth("User not found in request extensions".to_string()))?;

    let token = bearer_token(&request)?.to_string();

    let status = gate.check(&user.id, &token).await?;
    if !status.has_access {
        return Err(AppError::PaymentRequired(
            "Trial expired. Activate the Pro plan to continue.".to_string(),
        ));
    }

    Ok(next.run(request).await)
}
