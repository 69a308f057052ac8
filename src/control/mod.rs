use actix_web::body::EitherBody;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::HttpResponse;
use derive_more::{Display, Error};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::sync::Arc;
use url::form_urlencoded;

pub mod catalog_api;
pub mod sitemap_api;
pub mod sitemap_proxy;

pub type Response = Result<HttpResponse, ControllerError>;

#[derive(Debug, Display, Error)]
pub enum ControllerError {
    #[display("{message}")]
    #[error(ignore)]
    NotFound { message: &'static str },
    #[error(ignore)]
    InternalServerError(anyhow::Error),
}

impl From<anyhow::Error> for ControllerError {
    fn from(err: anyhow::Error) -> Self {
        Self::InternalServerError(err)
    }
}

impl actix_web::error::ResponseError for ControllerError {
    fn error_response(&self) -> HttpResponse {
        log::warn!("{self:?}");
        match self {
            Self::NotFound { message } => HttpResponse::NotFound().json(serde_json::json!({
                "statusCode": 404,
                "message": message,
            })),
            Self::InternalServerError(err) => {
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "statusCode": 500,
                    "message": err.to_string(),
                }))
            }
        }
    }
}

// Escape sequences of these characters survive decoding, so a `%26` in a
// segment round-trips to `%2526` in the query string instead of `%26`.
const RESERVED: &[u8] = b";/?:@&=+$,#";

fn hex_val(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Percent-decodes a path segment with `decodeURI` semantics: escapes of
/// URI-reserved characters are left encoded, everything else is decoded.
fn decode_uri_segment(segment: &str) -> String {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_val(bytes[i + 1]), hex_val(bytes[i + 2])) {
                let decoded = hi * 16 + lo;
                if RESERVED.contains(&decoded) {
                    out.extend_from_slice(&bytes[i..i + 3]);
                } else {
                    out.push(decoded);
                }
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Rewrites a legacy `/search/k1/v1/k2/v2/...` path to `/?k1=v1&k2=v2`. A
/// trailing key without a value keeps the literal `undefined` placeholder the
/// legacy front end produced.
pub fn legacy_search_location(path: &str) -> String {
    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(decode_uri_segment)
        .collect();
    let mut params = form_urlencoded::Serializer::new(String::new());
    let mut i = 1;
    while i < segments.len() {
        let value = segments
            .get(i + 1)
            .map(String::as_str)
            .unwrap_or("undefined");
        params.append_pair(&segments[i], value);
        i += 2;
    }
    // Spaces survive as %20 rather than +.
    let query = params.finish().replace('+', "%20");
    format!("/?{query}")
}

pub struct LegacySearchRedirect;

impl<S, B> Transform<S, ServiceRequest> for LegacySearchRedirect
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Transform = LegacySearchRedirectMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(LegacySearchRedirectMiddleware {
            service: Arc::new(service),
        }))
    }
}

pub struct LegacySearchRedirectMiddleware<S> {
    service: Arc<S>,
}

impl<S, B> Service<ServiceRequest> for LegacySearchRedirectMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = actix_web::Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = actix_web::Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if req.path().starts_with("/search/") {
            let location = legacy_search_location(req.path());
            let (req, _pl) = req.into_parts();
            let res = HttpResponse::MovedPermanently()
                .insert_header((header::LOCATION, location))
                .finish()
                .map_into_right_body();
            return Box::pin(async move { Ok(ServiceResponse::new(req, res)) });
        }
        let fut = self.service.call(req);
        Box::pin(async move { Ok(fut.await?.map_into_left_body()) })
    }
}
