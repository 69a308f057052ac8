use actix_web::middleware::TrailingSlash;
use actix_web::{web::Data, App, HttpServer};
use anyhow::Context as AnyhowContext;
use parts_catalog::catalog::CatalogClient;
use parts_catalog::control;
use parts_catalog::control::sitemap_proxy::SitemapProxy;
use parts_catalog::SELF_ADDR;
use reqwest::header::{HeaderMap, HeaderValue};
use std::env;

static DEFAULT_ACCEPT_ENCODING: &str = "br;q=1.0, gzip;q=0.6, deflate;q=0.4, *;q=0.2";

#[actix_web::main]
async fn main() -> Result<(), anyhow::Error> {
    if let Err(env::VarError::NotPresent) = env::var("RUST_LOG") {
        env::set_var("RUST_LOG", "INFO");
    }
    pretty_env_logger::formatted_timed_builder()
        .parse_default_env()
        .init();

    match std::fs::File::open(".env") {
        Ok(_) => envmnt::load_file(".env")?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            std::fs::File::create(".env")?;
            envmnt::load_file(".env")?;
        }
        Err(err) => {
            return Err(anyhow::anyhow!("Unable to open .env file: {err}"));
        }
    }

    let mut map = HeaderMap::new();
    map.append(
        reqwest::header::ACCEPT_ENCODING,
        HeaderValue::from_str(DEFAULT_ACCEPT_ENCODING)?,
    );

    // One shared client; timeouts are left to the hosting platform.
    let client = reqwest::ClientBuilder::new()
        .use_rustls_tls()
        .default_headers(map)
        .build()?;

    let catalog_base = envmnt::get_or("CATALOG_BASE_URL", "https://order.multi-inc.com");
    let sitemap_upstream = envmnt::get_or(
        "SITEMAP_UPSTREAM_URL",
        "https://sitemaps-multi-3dyyx.ondigitalocean.app",
    );
    let catalog = Data::new(CatalogClient::new(catalog_base, client.clone()));
    let proxy = Data::new(SitemapProxy::new(sitemap_upstream, client));

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Compress::default())
            .wrap(control::LegacySearchRedirect)
            .wrap(actix_web::middleware::NormalizePath::new(
                TrailingSlash::Trim,
            ))
            .app_data(catalog.clone())
            .app_data(proxy.clone())
            // Important: register the `.xml` sitemap routes before their
            // `{slug}` twins so that `{slug}` does not capture the suffix.
            .service(control::sitemap_api::manufacturer_sitemap_xml)
            .service(control::sitemap_api::modality_sitemap_xml)
            .service(control::sitemap_api::manufacturer_sitemap)
            .service(control::sitemap_api::modality_sitemap)
            .service(control::sitemap_proxy::sitemap_index)
            .service(control::sitemap_proxy::sitemap_file)
            .service(control::catalog_api::get_part)
            .service(control::catalog_api::list_parts)
            .service(control::catalog_api::list_manufacturers)
            .service(control::catalog_api::list_modalities)
    })
    .bind((SELF_ADDR.as_str(), 8080))
    .context("Failed to bind server to port 8080. Is the port already in use?")?
    .run()
    .await?;
    Ok(())
}
