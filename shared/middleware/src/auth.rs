use abuseguard_models::auth::{default_dev_claims, Claims};
use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error as ActixError, HttpMessage, HttpRequest, HttpResponse,
};
use futures_util::future::LocalBoxFuture;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::json;
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;

#[derive(Clone)]
enum AuthMode {
    Enabled {
        key: Arc<DecodingKey>,
        validation: Arc<Validation>,
    },
    Disabled(Claims),
}

pub struct AuthMiddleware<S> {
    service: Rc<S>,
    mode: AuthMode,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let mode = self.mode.clone();

        Box::pin(async move {
            if is_public_endpoint(req.path()) {
                let res = service.call(req).await?;
                return Ok(res.map_into_left_body());
            }

            match mode {
                AuthMode::Enabled { key, validation } => {
                    let token = req
                        .headers()
                        .get("Authorization")
                        .and_then(|h| h.to_str().ok())
                        .and_then(|h| h.strip_prefix("Bearer "))
                        .map(str::to_string);

                    let Some(token) = token else {
                        return Ok(req
                            .into_response(HttpResponse::Unauthorized().json(json!({
                                "error": "Authentication required",
                                "message": "Please provide a valid Bearer token in the Authorization header"
                            })))
                            .map_into_right_body());
                    };

                    match verify_jwt_token(&token, &key, &validation) {
                        Ok(claims) => {
                            req.extensions_mut().insert(claims);
                            let res = service.call(req).await?;
                            Ok(res.map_into_left_body())
                        }
                        Err(e) => {
                            tracing::warn!("JWT verification failed: {}", e);
                            Ok(req
                                .into_response(HttpResponse::Unauthorized().json(json!({
                                    "error": "Invalid or expired token"
                                })))
                                .map_into_right_body())
                        }
                    }
                }
                AuthMode::Disabled(default_claims) => {
                    req.extensions_mut().insert(default_claims);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
            }
        })
    }
}

#[derive(Clone)]
pub struct AuthMiddlewareFactory {
    mode: AuthMode,
}

impl AuthMiddlewareFactory {
    /// RS256 verification with the public key from `JWT_PUBLIC_KEY_PATH` or
    /// `JWT_PUBLIC_KEY`. Falls back to dev claims when no usable key is set.
    pub fn new() -> Self {
        match load_public_key() {
            Ok(key) => Self::from_decoding_key(key, Algorithm::RS256),
            Err(e) => {
                tracing::warn!(
                    "JWT public key not found or invalid ({}). Falling back to disabled auth (dev claims). Set `JWT_PUBLIC_KEY_PATH` or `JWT_PUBLIC_KEY` to enable.",
                    e
                );
                Self::disabled()
            }
        }
    }

    pub fn from_decoding_key(key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.set_issuer(&[std::env::var("JWT_ISSUER").unwrap_or_else(|_| "abuseguard".to_string())]);
        validation.set_audience(&[std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "abuseguard-users".to_string())]);

        Self {
            mode: AuthMode::Enabled {
                key: Arc::new(key),
                validation: Arc::new(validation),
            },
        }
    }

    pub fn disabled() -> Self {
        Self::with_claims(default_dev_claims())
    }

    /// Inject fixed claims into every request; for development and tests.
    pub fn with_claims(claims: Claims) -> Self {
        Self {
            mode: AuthMode::Disabled(claims),
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = ActixError> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = ActixError;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddleware {
            service: Rc::new(service),
            mode: self.mode.clone(),
        }))
    }
}

fn verify_jwt_token(token: &str, key: &DecodingKey, validation: &Validation) -> Result<Claims, jsonwebtoken::errors::Error> {
    // exp is checked by Validation
    decode::<Claims>(token, key, validation).map(|data| data.claims)
}

fn load_public_key() -> Result<DecodingKey, Box<dyn std::error::Error>> {
    // Prefer file path to avoid .env multiline pitfalls
    let raw = if let Ok(path) = std::env::var("JWT_PUBLIC_KEY_PATH") {
        std::fs::read_to_string(&path)?
    } else if let Ok(inline) = std::env::var("JWT_PUBLIC_KEY") {
        inline
    } else {
        return Err("No public key found".into());
    };

    let pem = normalize_pem(&raw);
    if !pem.contains("-----BEGIN") {
        return Err("Public key is not PEM encoded".into());
    }
    Ok(DecodingKey::from_rsa_pem(pem.as_bytes())?)
}

// Strip surrounding quotes and unescape \n from values pasted into .env files
fn normalize_pem(input: &str) -> String {
    let trimmed = input.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .or_else(|| trimmed.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')))
        .unwrap_or(trimmed);
    unquoted.replace("\\n", "\n").replace("\\r", "")
}

fn is_public_endpoint(path: &str) -> bool {
    ["/health", "/metrics"].iter().any(|public| path.starts_with(public))
}

pub fn extract_claims_from_request(req: &HttpRequest) -> Option<Claims> {
    req.extensions().get::<Claims>().cloned()
}

pub fn extract_user_id_from_request(req: &HttpRequest) -> Option<String> {
    extract_claims_from_request(req).map(|c| c.sub)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test, web, App};
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"test-secret";

    async fn whoami(req: HttpRequest) -> HttpResponse {
        HttpResponse::Ok().body(extract_user_id_from_request(&req).unwrap_or_default())
    }

    fn token_for(sub: &str, issuer: &str) -> String {
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: sub.to_string(),
            email: None,
            exp: now + 600,
            iat: now,
            iss: issuer.to_string(),
            aud: "abuseguard-users".to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    #[actix_web::test]
    async fn test_valid_token_sets_claims() {
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddlewareFactory::from_decoding_key(DecodingKey::from_secret(SECRET), Algorithm::HS256))
                .route("/whoami", web::get().to(whoami)),
        )
        .await;

        let req = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", format!("Bearer {}", token_for("user-42", "abuseguard"))))
            .to_request();
        let resp = test::call_service(&app, req).await;

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(test::read_body(resp).await, "user-42");
    }

    #[actix_web::test]
    async fn test_rejects_missing_and_foreign_tokens() {
        let app = test::init_service(
            App::new()
                .wrap(AuthMiddlewareFactory::from_decoding_key(DecodingKey::from_secret(SECRET), Algorithm::HS256))
                .route("/whoami", web::get().to(whoami))
                .route("/health", web::get().to(|| async { HttpResponse::Ok().finish() })),
        )
        .await;

        let missing = test::call_service(&app, test::TestRequest::get().uri("/whoami").to_request()).await;
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let foreign = test::TestRequest::get()
            .uri("/whoami")
            .insert_header(("Authorization", format!("Bearer {}", token_for("user-42", "someone-else"))))
            .to_request();
        assert_eq!(test::call_service(&app, foreign).await.status(), StatusCode::UNAUTHORIZED);

        let health = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(health.status(), StatusCode::OK);
    }

    #[::core::prelude::v1::test]
    fn test_normalize_pem() {
        assert_eq!(normalize_pem("\"-----BEGIN\\nabc\""), "-----BEGIN\nabc");
        assert_eq!(normalize_pem("  plain  "), "plain");
    }
}
