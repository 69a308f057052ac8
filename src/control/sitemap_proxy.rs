use crate::control::{ControllerError, Response};
use actix_web::{get, HttpResponse};
use actix_web::web::{Data, Path};
use anyhow::{anyhow, Context};
use bytes::Bytes;

const PROXY_CACHE_CONTROL: &str = "public, max-age=43200";

/// Pass-through client for the pre-rendered sitemap files hosted on the
/// external sitemap generator.
#[derive(Clone)]
pub struct SitemapProxy {
    upstream: String,
    client: reqwest::Client,
}

impl SitemapProxy {
    pub fn new(upstream: impl Into<String>, client: reqwest::Client) -> Self {
        let upstream = upstream.into().trim_end_matches('/').to_string();
        Self { upstream, client }
    }

    async fn fetch(&self, name: &str) -> anyhow::Result<Bytes> {
        let url = format!("{}/sitemaps/{name}.xml", self.upstream);
        let resp = self
            .client
            .get(&url)
            .header("Accept", "application/xml")
            .send()
            .await
            .with_context(|| format!("Unable to reach sitemap upstream at {url}"))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow!("Sitemap upstream returned {status} for {url}"));
        }
        Ok(resp.bytes().await?)
    }
}

/// Strips the `.xml` suffix from a sitemap file path when present; the
/// upstream URL re-appends it either way. Returns None only when nothing
/// remains.
fn sitemap_name(path: &str) -> Option<&str> {
    let name = path.strip_suffix(".xml").unwrap_or(path);
    if name.is_empty() {
        return None;
    }
    Some(name)
}

fn xml_response(body: Bytes) -> Response {
    let mut resp = HttpResponse::Ok();
    resp.content_type("application/xml");
    resp.insert_header(("Cache-Control", PROXY_CACHE_CONTROL));
    Ok(resp.body(body))
}

#[get("/sitemaps/index.xml")]
pub async fn sitemap_index(proxy: Data<SitemapProxy>) -> Response {
    match proxy.fetch("index").await {
        Ok(body) => xml_response(body),
        Err(err) => {
            log::error!("Error proxying sitemap index: {err}");
            Err(ControllerError::InternalServerError(
                err.context("Error proxying sitemap index"),
            ))
        }
    }
}

#[get("/sitemaps/{path:.*}")]
pub async fn sitemap_file(proxy: Data<SitemapProxy>, path: Path<String>) -> Response {
    let name = sitemap_name(&path).ok_or(ControllerError::NotFound {
        message: "Sitemap not found",
    })?;
    match proxy.fetch(name).await {
        Ok(body) => xml_response(body),
        Err(err) => {
            log::error!("Error proxying sitemap {name}: {err}");
            Err(ControllerError::InternalServerError(
                err.context(format!("Error proxying sitemap {name}")),
            ))
        }
    }
}
