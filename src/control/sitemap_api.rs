use crate::catalog::{CatalogClient, Manufacturer, PartSummary, ALL_RESULTS};
use crate::control::{ControllerError, Response};
use crate::sitemap;
use actix_web::{get, HttpResponse};
use actix_web::web::{Data, Path};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::OffsetDateTime;
use tokio::sync::RwLock;

const SITEMAP_CACHE_CONTROL: &str = "public, max-age=86400, stale-while-revalidate=3600";

fn cache_ttl_from_env(key: &str, default_secs: u64) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .map(Duration::from_secs)
        .unwrap_or_else(|| Duration::from_secs(default_secs))
}

static SITEMAP_CACHE_TTL: Lazy<Duration> =
    Lazy::new(|| cache_ttl_from_env("SITEMAP_CACHE_TTL_SECS", 86400));

static SITEMAP_STALE_GRACE: Lazy<Duration> =
    Lazy::new(|| cache_ttl_from_env("SITEMAP_STALE_GRACE_SECS", 3600));

#[derive(Clone)]
struct CacheEntry<T> {
    cached_at: Instant,
    value: T,
}

/// Resolved sitemap data for one manufacturer slug. The full part summaries
/// are kept so the JSON and XML views render from the same cache entry.
pub struct ManufacturerSitemap {
    pub manufacturer: Manufacturer,
    pub parts: Vec<PartSummary>,
    pub total_items: usize,
}

pub struct ModalitySitemap {
    pub parts: Vec<PartSummary>,
    pub total_items: usize,
}

static MANUFACTURER_SITEMAP_CACHE: Lazy<RwLock<HashMap<String, CacheEntry<Arc<ManufacturerSitemap>>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

static MODALITY_SITEMAP_CACHE: Lazy<RwLock<HashMap<String, CacheEntry<Arc<ModalitySitemap>>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

#[derive(Serialize)]
pub struct SitemapPart {
    pub part_number: Option<String>,
    pub display_part_number: Option<String>,
    pub title: Option<String>,
}

#[derive(Serialize)]
struct ManufacturerSitemapDto<'a> {
    manufacturer: &'a Manufacturer,
    parts: Vec<SitemapPart>,
    #[serde(rename = "totalItems")]
    total_items: usize,
}

#[derive(Serialize)]
struct ModalitySitemapDto {
    parts: Vec<SitemapPart>,
    #[serde(rename = "totalItems")]
    total_items: usize,
}

fn sitemap_parts(parts: &[PartSummary]) -> Vec<SitemapPart> {
    parts
        .iter()
        .map(|part| SitemapPart {
            part_number: part.part_number.clone(),
            display_part_number: part.display_part_number.clone(),
            title: part.title.clone(),
        })
        .collect()
}

async fn build_manufacturer_sitemap(
    client: &CatalogClient,
    slug: &str,
) -> Option<ManufacturerSitemap> {
    let manufacturer = client.manufacturer_by_slug(slug).await?;
    let parts = client
        .parts_by_manufacturer(&manufacturer.id, 1, ALL_RESULTS)
        .await;
    Some(ManufacturerSitemap {
        manufacturer,
        total_items: parts.meta.filter_count,
        parts: parts.data,
    })
}

async fn build_modality_sitemap(client: &CatalogClient, slug: &str) -> Option<ModalitySitemap> {
    let modality = client.modality_by_slug(slug).await?;
    let parts = client
        .parts_by_modality(&modality.name, 1, ALL_RESULTS)
        .await;
    Some(ModalitySitemap {
        total_items: parts.meta.filter_count,
        parts: parts.data,
    })
}

/// Read-through cache with a stale-while-revalidate window: a fresh entry is
/// served as-is, a stale-within-grace entry is served immediately while a
/// background task rebuilds it, anything older is rebuilt inline.
async fn cached_manufacturer_sitemap(
    client: Data<CatalogClient>,
    slug: String,
) -> Option<Arc<ManufacturerSitemap>> {
    lookup_manufacturer_sitemap(client, slug, *SITEMAP_CACHE_TTL, *SITEMAP_STALE_GRACE).await
}

async fn lookup_manufacturer_sitemap(
    client: Data<CatalogClient>,
    slug: String,
    ttl: Duration,
    grace: Duration,
) -> Option<Arc<ManufacturerSitemap>> {
    let key = format!("sitemap:manufacturers:{slug}");
    let entry = {
        let cache = MANUFACTURER_SITEMAP_CACHE.read().await;
        cache.get(&key).cloned()
    };
    if let Some(entry) = entry {
        let age = entry.cached_at.elapsed();
        if age < ttl {
            return Some(entry.value);
        }
        if age < ttl + grace {
            tokio::spawn(async move {
                if let Some(fresh) = build_manufacturer_sitemap(&client, &slug).await {
                    let mut cache = MANUFACTURER_SITEMAP_CACHE.write().await;
                    cache.insert(
                        key,
                        CacheEntry {
                            cached_at: Instant::now(),
                            value: Arc::new(fresh),
                        },
                    );
                }
            });
            return Some(entry.value);
        }
    }
    let fresh = Arc::new(build_manufacturer_sitemap(&client, &slug).await?);
    let mut cache = MANUFACTURER_SITEMAP_CACHE.write().await;
    cache.insert(
        key,
        CacheEntry {
            cached_at: Instant::now(),
            value: fresh.clone(),
        },
    );
    Some(fresh)
}

async fn cached_modality_sitemap(
    client: Data<CatalogClient>,
    slug: String,
) -> Option<Arc<ModalitySitemap>> {
    lookup_modality_sitemap(client, slug, *SITEMAP_CACHE_TTL, *SITEMAP_STALE_GRACE).await
}

async fn lookup_modality_sitemap(
    client: Data<CatalogClient>,
    slug: String,
    ttl: Duration,
    grace: Duration,
) -> Option<Arc<ModalitySitemap>> {
    let key = format!("sitemap:modalities:{slug}");
    let entry = {
        let cache = MODALITY_SITEMAP_CACHE.read().await;
        cache.get(&key).cloned()
    };
    if let Some(entry) = entry {
        let age = entry.cached_at.elapsed();
        if age < ttl {
            return Some(entry.value);
        }
        if age < ttl + grace {
            tokio::spawn(async move {
                if let Some(fresh) = build_modality_sitemap(&client, &slug).await {
                    let mut cache = MODALITY_SITEMAP_CACHE.write().await;
                    cache.insert(
                        key,
                        CacheEntry {
                            cached_at: Instant::now(),
                            value: Arc::new(fresh),
                        },
                    );
                }
            });
            return Some(entry.value);
        }
    }
    let fresh = Arc::new(build_modality_sitemap(&client, &slug).await?);
    let mut cache = MODALITY_SITEMAP_CACHE.write().await;
    cache.insert(
        key,
        CacheEntry {
            cached_at: Instant::now(),
            value: fresh.clone(),
        },
    );
    Some(fresh)
}

#[get("/sitemap/manufacturers/{slug}")]
pub async fn manufacturer_sitemap(client: Data<CatalogClient>, slug: Path<String>) -> Response {
    let data = cached_manufacturer_sitemap(client, slug.into_inner())
        .await
        .ok_or(ControllerError::NotFound {
            message: "Manufacturer not found",
        })?;
    let dto = ManufacturerSitemapDto {
        manufacturer: &data.manufacturer,
        parts: sitemap_parts(&data.parts),
        total_items: data.total_items,
    };
    let mut resp = HttpResponse::Ok();
    resp.insert_header(("Cache-Control", SITEMAP_CACHE_CONTROL));
    Ok(resp.json(dto))
}

#[get("/sitemap/modalities/{slug}")]
pub async fn modality_sitemap(client: Data<CatalogClient>, slug: Path<String>) -> Response {
    let data = cached_modality_sitemap(client, slug.into_inner())
        .await
        .ok_or(ControllerError::NotFound {
            message: "Modality not found",
        })?;
    let dto = ModalitySitemapDto {
        parts: sitemap_parts(&data.parts),
        total_items: data.total_items,
    };
    let mut resp = HttpResponse::Ok();
    resp.insert_header(("Cache-Control", SITEMAP_CACHE_CONTROL));
    Ok(resp.json(dto))
}

#[get("/sitemap/manufacturers/{slug}.xml")]
pub async fn manufacturer_sitemap_xml(client: Data<CatalogClient>, slug: Path<String>) -> Response {
    let asset_url = {
        let client = client.clone();
        move |id: &str| client.asset_url(id)
    };
    let data = cached_manufacturer_sitemap(client, slug.into_inner())
        .await
        .ok_or(ControllerError::NotFound {
            message: "Manufacturer not found",
        })?;
    let entries = sitemap::part_entries(&data.parts, asset_url, OffsetDateTime::now_utc());
    let xml = sitemap::write_urlset(&entries)?;
    let mut resp = HttpResponse::Ok();
    resp.content_type("application/xml");
    resp.insert_header(("Cache-Control", SITEMAP_CACHE_CONTROL));
    Ok(resp.body(xml))
}

#[get("/sitemap/modalities/{slug}.xml")]
pub async fn modality_sitemap_xml(client: Data<CatalogClient>, slug: Path<String>) -> Response {
    let asset_url = {
        let client = client.clone();
        move |id: &str| client.asset_url(id)
    };
    let data = cached_modality_sitemap(client, slug.into_inner())
        .await
        .ok_or(ControllerError::NotFound {
            message: "Modality not found",
        })?;
    let entries = sitemap::part_entries(&data.parts, asset_url, OffsetDateTime::now_utc());
    let xml = sitemap::write_urlset(&entries)?;
    let mut resp = HttpResponse::Ok();
    resp.content_type("application/xml");
    resp.insert_header(("Cache-Control", SITEMAP_CACHE_CONTROL));
    Ok(resp.body(xml))
}
