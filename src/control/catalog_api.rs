use crate::catalog::{CatalogClient, ListMeta, Manufacturer, PartsQuery};
use crate::control::{ControllerError, Response};
use actix_web::{get, HttpResponse};
use actix_web::web::{Data, Path, Query};
use serde::{Deserialize, Serialize};

const LIST_CACHE_CONTROL: &str = "public, max-age=300";

#[derive(Debug, Default, Deserialize)]
pub struct PartsParams {
    #[serde(default, deserialize_with = "crate::empty_string_as_none")]
    pub term: Option<String>,
    #[serde(default, deserialize_with = "crate::empty_string_as_none")]
    pub manufacturer: Option<String>,
    #[serde(default, deserialize_with = "crate::empty_string_as_none")]
    pub modality: Option<String>,
    #[serde(default, deserialize_with = "crate::empty_string_as_none_parse")]
    pub page: Option<i64>,
    #[serde(default, deserialize_with = "crate::empty_string_as_none_parse")]
    pub limit: Option<i64>,
}

impl PartsParams {
    fn into_query(self) -> PartsQuery {
        let defaults = PartsQuery::default();
        PartsQuery {
            term: self.term.unwrap_or_default(),
            manufacturer: self.manufacturer.unwrap_or_default(),
            modality: self.modality.unwrap_or_default(),
            page: self.page.unwrap_or(defaults.page),
            limit: self.limit.unwrap_or(defaults.limit),
        }
    }
}

#[derive(Serialize)]
struct ManufacturerEntry {
    #[serde(flatten)]
    manufacturer: Manufacturer,
    logo_url: String,
}

#[derive(Serialize)]
struct ManufacturerList {
    data: Vec<ManufacturerEntry>,
    meta: ListMeta,
}

fn manufacturer_entries(client: &CatalogClient, manufacturers: Vec<Manufacturer>) -> Vec<ManufacturerEntry> {
    manufacturers
        .into_iter()
        .map(|manufacturer| ManufacturerEntry {
            logo_url: client.manufacturer_logo_url(manufacturer.logo.as_ref()),
            manufacturer,
        })
        .collect()
}

#[get("/api/catalog/manufacturers")]
pub async fn list_manufacturers(client: Data<CatalogClient>) -> Response {
    let page = client.list_manufacturers().await;
    let list = ManufacturerList {
        data: manufacturer_entries(&client, page.data),
        meta: page.meta,
    };
    let mut resp = HttpResponse::Ok();
    resp.insert_header(("Cache-Control", LIST_CACHE_CONTROL));
    Ok(resp.json(list))
}

#[get("/api/catalog/modalities")]
pub async fn list_modalities(client: Data<CatalogClient>) -> Response {
    let page = client.list_modalities().await;
    let mut resp = HttpResponse::Ok();
    resp.insert_header(("Cache-Control", LIST_CACHE_CONTROL));
    Ok(resp.json(page))
}

#[get("/api/catalog/parts")]
pub async fn list_parts(client: Data<CatalogClient>, params: Query<PartsParams>) -> Response {
    let page = client.fetch_parts(&params.into_inner().into_query()).await;
    let mut resp = HttpResponse::Ok();
    resp.insert_header(("Cache-Control", LIST_CACHE_CONTROL));
    Ok(resp.json(page))
}

#[get("/api/catalog/parts/{part_number:.*}")]
pub async fn get_part(client: Data<CatalogClient>, part_number: Path<String>) -> Response {
    let part_number = part_number.trim();
    if part_number.is_empty() {
        return Err(ControllerError::NotFound {
            message: "Part not found",
        });
    }
    let detail = client
        .part_details(part_number)
        .await?
        .ok_or(ControllerError::NotFound {
            message: "Part not found",
        })?;
    Ok(HttpResponse::Ok().json(detail))
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::http::StatusCode;
    use actix_web::{test as actix_test, App};

    #[test]
    fn missing_params_fall_back_to_defaults() {
        let query = PartsParams::default().into_query();
        assert_eq!(query.page, 1);
        assert_eq!(query.limit, 25);
        assert!(query.term.is_empty());
        assert!(query.manufacturer.is_empty());
        assert!(query.modality.is_empty());
    }

    #[actix_web::test]
    async fn empty_query_strings_parse_as_defaults() {
        let app = actix_test::init_service(
            App::new()
                .app_data(Data::new(CatalogClient::new(
                    "http://127.0.0.1:1",
                    reqwest::Client::new(),
                )))
                .service(list_parts),
        )
        .await;
        let req = actix_test::TestRequest::get()
            .uri("/api/catalog/parts?term=&page=&limit=")
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        // The backing catalog is unreachable, so the degraded empty page comes
        // back rather than a query deserialization error.
        assert_eq!(res.status(), StatusCode::OK);
        let body: serde_json::Value = actix_test::read_body_json(res).await;
        assert_eq!(body["data"], serde_json::json!([]));
    }

    #[test]
    fn manufacturer_entries_carry_logo_url() {
        use crate::catalog::ImageFile;
        let client = CatalogClient::new("https://catalog.example.com", reqwest::Client::new());
        let manufacturers = vec![
            Manufacturer {
                id: "1".into(),
                name: Some("GE Healthcare".into()),
                slug: Some("ge-healthcare".into()),
                description: None,
                logo: Some(ImageFile {
                    id: "logo-1".into(),
                    title: None,
                    description: None,
                    extra: serde_json::Value::Null,
                }),
            },
            Manufacturer {
                id: "2".into(),
                name: Some("Siemens".into()),
                slug: Some("siemens".into()),
                description: None,
                logo: None,
            },
        ];
        let entries = manufacturer_entries(&client, manufacturers);
        assert_eq!(entries[0].logo_url, "https://catalog.example.com/assets/logo-1");
        assert_eq!(entries[1].logo_url, "");
    }

    #[actix_web::test]
    async fn blank_part_number_yields_404() {
        let app = actix_test::init_service(
            App::new()
                .app_data(Data::new(CatalogClient::new(
                    "http://127.0.0.1:1",
                    reqwest::Client::new(),
                )))
                .service(get_part),
        )
        .await;
        let req = actix_test::TestRequest::get()
            .uri("/api/catalog/parts/%20")
            .to_request();
        let res = actix_test::call_service(&app, req).await;
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
