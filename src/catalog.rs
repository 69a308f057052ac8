use anyhow::anyhow;
use serde::{Deserialize, Serialize};

/// Signals "all results, unpaginated" to the catalog API.
pub const ALL_RESULTS: i64 = -1;

const DEFAULT_IMAGE_ALT: &str = "MULTI, INC. Logo";

const LIST_FIELDS: &[&str] = &[
    "part_number",
    "display_part_number",
    "manufacturer.*",
    "manufacturer.logo.*",
    "title",
    "primary_image.*",
];

const DETAIL_FIELDS: &str = "part_number,display_part_number,content,title,primary_image,\
gallery.*.*,manufacturer.*,manufacturer.logo.*,modalities.*.name,condition,warranty,\
returnable,attributes";

const STATUS: &[&str] = &["status"];
const MANUFACTURER_NAME: &[&str] = &["manufacturer", "name"];
const MODALITY_NAME: &[&str] = &["modalities", "modalities_id", "name"];
const SLUG: &[&str] = &["slug"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "_eq",
            Self::Neq => "_neq",
        }
    }
}

/// One comparison in the catalog API filter dialect. The field path nests
/// left to right, so `eq(&["manufacturer", "name"], "GE")` renders as
/// `{"manufacturer":{"name":{"_eq":"GE"}}}`.
#[derive(Debug, Clone)]
pub struct Condition {
    path: &'static [&'static str],
    op: Operator,
    value: String,
}

impl Condition {
    pub fn eq(path: &'static [&'static str], value: impl Into<String>) -> Self {
        Self {
            path,
            op: Operator::Eq,
            value: value.into(),
        }
    }

    pub fn neq(path: &'static [&'static str], value: impl Into<String>) -> Self {
        Self {
            path,
            op: Operator::Neq,
            value: value.into(),
        }
    }

    fn to_value(&self) -> serde_json::Value {
        let mut value = serde_json::Value::Object(
            [(
                self.op.as_str().to_string(),
                serde_json::Value::String(self.value.clone()),
            )]
            .into_iter()
            .collect(),
        );
        for key in self.path.iter().rev() {
            value = serde_json::Value::Object([(key.to_string(), value)].into_iter().collect());
        }
        value
    }
}

/// AND-combined set of conditions, serialized to the `filter` query parameter.
#[derive(Debug, Clone, Default)]
pub struct FilterSet {
    conditions: Vec<Condition>,
}

impl FilterSet {
    /// Base filter for every parts query: archived parts never show up.
    pub fn active_parts() -> Self {
        Self::default().with(Condition::neq(STATUS, "archived"))
    }

    pub fn with(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn to_query_value(&self) -> String {
        let conditions = self.conditions.iter().map(Condition::to_value).collect();
        serde_json::Value::Object(
            [("_and".to_string(), serde_json::Value::Array(conditions))]
                .into_iter()
                .collect(),
        )
        .to_string()
    }
}

#[derive(Debug, Clone)]
pub struct PartsQuery {
    pub term: String,
    pub manufacturer: String,
    pub modality: String,
    pub page: i64,
    pub limit: i64,
}

impl Default for PartsQuery {
    fn default() -> Self {
        Self {
            term: String::new(),
            manufacturer: String::new(),
            modality: String::new(),
            page: 1,
            limit: 25,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageFile {
    #[serde(deserialize_with = "de_string")]
    pub id: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manufacturer {
    #[serde(deserialize_with = "de_string")]
    pub id: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub description: Option<String>,
    #[serde(default)]
    pub logo: Option<ImageFile>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Modality {
    #[serde(deserialize_with = "de_string")]
    pub id: String,
    #[serde(deserialize_with = "de_string")]
    pub name: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartSummary {
    #[serde(default, deserialize_with = "de_opt_string")]
    pub part_number: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub display_part_number: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    pub title: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<Manufacturer>,
    #[serde(default)]
    pub primary_image: Option<ImageFile>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ListMeta {
    #[serde(default)]
    pub filter_count: usize,
    #[serde(default)]
    pub total_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartsPage {
    #[serde(default)]
    pub data: Vec<PartSummary>,
    #[serde(default)]
    pub meta: ListMeta,
}

impl PartsPage {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// One full collection listing (`manufacturers`, `modalities`) with its
/// counts. Collections are small enough that the API is asked for all rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionPage<T> {
    #[serde(default)]
    pub data: Vec<T>,
    #[serde(default)]
    pub meta: ListMeta,
}

impl<T> Default for CollectionPage<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            meta: ListMeta::default(),
        }
    }
}

impl<T> CollectionPage<T> {
    pub fn empty() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GalleryImage {
    pub id: String,
    pub url: String,
    pub alt: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartDetail {
    pub part_number: String,
    pub display_part_number: Option<String>,
    pub title: String,
    pub content: String,
    pub primary_image: GalleryImage,
    pub gallery: Vec<GalleryImage>,
    pub manufacturer: Option<Manufacturer>,
    pub modalities: Vec<String>,
    pub condition: serde_json::Value,
    pub warranty: serde_json::Value,
    pub returnable: serde_json::Value,
    pub attributes: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct RawPartDetail {
    #[serde(deserialize_with = "de_string")]
    part_number: String,
    #[serde(default, deserialize_with = "de_opt_string")]
    display_part_number: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    title: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    content: Option<String>,
    #[serde(default, deserialize_with = "de_opt_string")]
    primary_image: Option<String>,
    #[serde(default)]
    gallery: Vec<RawGalleryEntry>,
    #[serde(default)]
    manufacturer: Option<Manufacturer>,
    #[serde(default)]
    modalities: Vec<RawModalityEntry>,
    #[serde(default)]
    condition: serde_json::Value,
    #[serde(default)]
    warranty: serde_json::Value,
    #[serde(default)]
    returnable: serde_json::Value,
    #[serde(default)]
    attributes: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct RawGalleryEntry {
    #[serde(default)]
    directus_files_id: Option<ImageFile>,
}

#[derive(Debug, Deserialize)]
struct RawModalityEntry {
    #[serde(default)]
    modalities_id: Option<RawModalityName>,
}

#[derive(Debug, Deserialize)]
struct RawModalityName {
    #[serde(default, deserialize_with = "de_opt_string")]
    name: Option<String>,
}

fn parts_query_string(filter: &FilterSet, term: Option<&str>, page: i64, limit: i64) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("sort", "-sort,part_number");
    query.append_pair("meta", "filter_count,total_count");
    query.append_pair("fields[]", &LIST_FIELDS.join(","));
    query.append_pair("limit", &limit.to_string());
    query.append_pair("page", &page.to_string());
    if let Some(term) = term {
        query.append_pair("search", term);
    }
    query.append_pair("filter", &filter.to_query_value());
    query.finish()
}

fn collection_query_string(sort: &str) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("sort", sort);
    query.append_pair("meta", "filter_count,total_count");
    query.finish()
}

/// Client for the external catalog service. Constructed once in `main` with
/// its base URL and the shared HTTP client, shared via `web::Data`.
#[derive(Clone)]
pub struct CatalogClient {
    base: String,
    client: reqwest::Client,
}

impl CatalogClient {
    pub fn new(base: impl Into<String>, client: reqwest::Client) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        Self { base, client }
    }

    pub fn asset_url(&self, file_id: &str) -> String {
        format!(
            "{}/assets/{file_id}?fit=inside&width=600&height=600",
            self.base
        )
    }

    /// Manufacturer logos are served without size constraints; no logo means
    /// an empty URL.
    pub fn manufacturer_logo_url(&self, logo: Option<&ImageFile>) -> String {
        match logo {
            Some(logo) => format!("{}/assets/{}", self.base, logo.id),
            None => String::new(),
        }
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> anyhow::Result<T> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(anyhow!("catalog API {status}: {}", truncate_body(&text)));
        }
        serde_json::from_str::<T>(&text).map_err(|err| {
            anyhow!(
                "catalog API decode error: {err}. Body: {}",
                truncate_body(&text)
            )
        })
    }

    pub async fn try_fetch_parts(&self, query: &PartsQuery) -> anyhow::Result<PartsPage> {
        let mut filter = FilterSet::active_parts();
        let manufacturer = query.manufacturer.trim();
        if !manufacturer.is_empty() {
            filter = filter.with(Condition::eq(MANUFACTURER_NAME, manufacturer));
        }
        let modality = query.modality.trim();
        if !modality.is_empty() {
            filter = filter.with(Condition::eq(MODALITY_NAME, modality));
        }
        let term = Some(query.term.trim()).filter(|t| !t.is_empty());
        let qs = parts_query_string(&filter, term, query.page, query.limit);
        self.get_json(&format!("{}/items/parts?{qs}", self.base))
            .await
    }

    /// Degraded form: transport and API failures are logged and collapse into
    /// an empty page, indistinguishable from "no matches".
    pub async fn fetch_parts(&self, query: &PartsQuery) -> PartsPage {
        match self.try_fetch_parts(query).await {
            Ok(page) => page,
            Err(err) => {
                log::error!("Unable to fetch parts: {err}");
                PartsPage::empty()
            }
        }
    }

    /// Manufacturers ordered by their curated `order` field.
    pub async fn try_list_manufacturers(&self) -> anyhow::Result<CollectionPage<Manufacturer>> {
        let qs = collection_query_string("order");
        self.get_json(&format!("{}/items/manufacturers?{qs}", self.base))
            .await
    }

    pub async fn list_manufacturers(&self) -> CollectionPage<Manufacturer> {
        match self.try_list_manufacturers().await {
            Ok(page) => page,
            Err(err) => {
                log::error!("Unable to list manufacturers: {err}");
                CollectionPage::empty()
            }
        }
    }

    /// Modalities ordered by their `sort` field.
    pub async fn try_list_modalities(&self) -> anyhow::Result<CollectionPage<Modality>> {
        let qs = collection_query_string("sort");
        self.get_json(&format!("{}/items/modalities?{qs}", self.base))
            .await
    }

    pub async fn list_modalities(&self) -> CollectionPage<Modality> {
        match self.try_list_modalities().await {
            Ok(page) => page,
            Err(err) => {
                log::error!("Unable to list modalities: {err}");
                CollectionPage::empty()
            }
        }
    }

    async fn manufacturer_name(&self, manufacturer_id: &str) -> anyhow::Result<Option<String>> {
        #[derive(Deserialize)]
        struct ManufacturerName {
            #[serde(default, deserialize_with = "de_opt_string")]
            name: Option<String>,
        }
        let resp: ApiResponse<ManufacturerName> = self
            .get_json(&format!(
                "{}/items/manufacturers/{manufacturer_id}?fields=name",
                self.base
            ))
            .await?;
        Ok(resp.data.name)
    }

    /// Parts for one manufacturer. The catalog API filters parts by
    /// manufacturer name, so the id is resolved to a name first; an
    /// unresolvable name yields an empty page.
    pub async fn try_parts_by_manufacturer(
        &self,
        manufacturer_id: &str,
        page: i64,
        limit: i64,
    ) -> anyhow::Result<PartsPage> {
        let name = match self.manufacturer_name(manufacturer_id).await? {
            Some(name) => name,
            None => return Ok(PartsPage::empty()),
        };
        let filter = FilterSet::active_parts().with(Condition::eq(MANUFACTURER_NAME, name));
        let qs = parts_query_string(&filter, None, page, limit);
        self.get_json(&format!("{}/items/parts?{qs}", self.base))
            .await
    }

    pub async fn parts_by_manufacturer(
        &self,
        manufacturer_id: &str,
        page: i64,
        limit: i64,
    ) -> PartsPage {
        match self
            .try_parts_by_manufacturer(manufacturer_id, page, limit)
            .await
        {
            Ok(page) => page,
            Err(err) => {
                log::error!("Unable to fetch parts by manufacturer {manufacturer_id}: {err}");
                PartsPage::empty()
            }
        }
    }

    pub async fn try_parts_by_modality(
        &self,
        modality_name: &str,
        page: i64,
        limit: i64,
    ) -> anyhow::Result<PartsPage> {
        let filter = FilterSet::active_parts().with(Condition::eq(MODALITY_NAME, modality_name));
        let qs = parts_query_string(&filter, None, page, limit);
        self.get_json(&format!("{}/items/parts?{qs}", self.base))
            .await
    }

    pub async fn parts_by_modality(&self, modality_name: &str, page: i64, limit: i64) -> PartsPage {
        match self.try_parts_by_modality(modality_name, page, limit).await {
            Ok(page) => page,
            Err(err) => {
                log::error!("Unable to fetch parts by modality {modality_name}: {err}");
                PartsPage::empty()
            }
        }
    }

    pub async fn manufacturer_by_slug(&self, slug: &str) -> Option<Manufacturer> {
        let filter = FilterSet::default().with(Condition::eq(SLUG, slug));
        let url = {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            query.append_pair("filter", &filter.to_query_value());
            query.append_pair("fields", "id,name,slug,description,logo.*");
            format!("{}/items/manufacturers?{}", self.base, query.finish())
        };
        match self.get_json::<ApiResponse<Vec<Manufacturer>>>(&url).await {
            Ok(resp) => resp.data.into_iter().next(),
            Err(err) => {
                log::error!("Unable to fetch manufacturer by slug {slug}: {err}");
                None
            }
        }
    }

    pub async fn modality_by_slug(&self, slug: &str) -> Option<Modality> {
        let filter = FilterSet::default().with(Condition::eq(SLUG, slug));
        let url = {
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            query.append_pair("filter", &filter.to_query_value());
            query.append_pair("fields", "id,name,slug,description");
            format!("{}/items/modalities?{}", self.base, query.finish())
        };
        match self.get_json::<ApiResponse<Vec<Modality>>>(&url).await {
            Ok(resp) => resp.data.into_iter().next(),
            Err(err) => {
                log::error!("Unable to fetch modality by slug {slug}: {err}");
                None
            }
        }
    }

    /// Site-wide fallback image from application settings.
    pub async fn default_image(&self) -> anyhow::Result<GalleryImage> {
        #[derive(Deserialize)]
        struct Settings {
            #[serde(default, deserialize_with = "de_opt_string")]
            default_image: Option<String>,
        }
        let resp: ApiResponse<Settings> = self
            .get_json(&format!(
                "{}/items/application_settings?fields=default_image",
                self.base
            ))
            .await?;
        let id = resp
            .data
            .default_image
            .ok_or_else(|| anyhow!("application settings carry no default image"))?;
        Ok(GalleryImage {
            url: self.asset_url(&id),
            id,
            alt: DEFAULT_IMAGE_ALT.to_string(),
        })
    }

    pub async fn part_details(&self, part_number: &str) -> anyhow::Result<Option<PartDetail>> {
        let url = format!(
            "{}/items/parts/{part_number}?fields={DETAIL_FIELDS}",
            self.base
        );
        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(anyhow!("catalog API {status}: {}", truncate_body(&text)));
        }
        let raw: ApiResponse<RawPartDetail> = serde_json::from_str(&text).map_err(|err| {
            anyhow!(
                "catalog API decode error: {err}. Body: {}",
                truncate_body(&text)
            )
        })?;
        let raw = raw.data;
        let primary = match raw.primary_image.as_deref() {
            Some(id) => GalleryImage {
                id: id.to_string(),
                url: self.asset_url(id),
                alt: raw.title.clone().unwrap_or_default(),
            },
            None => self.default_image().await?,
        };
        Ok(Some(assemble_detail(raw, primary, |id| self.asset_url(id))))
    }
}

fn assemble_detail(
    raw: RawPartDetail,
    primary: GalleryImage,
    asset_url: impl Fn(&str) -> String,
) -> PartDetail {
    let title = raw.title.unwrap_or_default();
    let gallery = flatten_gallery(&primary, &raw.gallery, &title, asset_url);
    PartDetail {
        part_number: raw.part_number,
        display_part_number: raw.display_part_number,
        content: raw.content.unwrap_or_default(),
        primary_image: primary,
        gallery,
        manufacturer: raw.manufacturer,
        modalities: raw
            .modalities
            .into_iter()
            .filter_map(|m| m.modalities_id.and_then(|m| m.name))
            .collect(),
        condition: raw.condition,
        warranty: raw.warranty,
        returnable: raw.returnable,
        attributes: raw.attributes,
        title,
    }
}

/// Uniform image list: primary first, then the gallery, alt text falling back
/// image title -> part title.
fn flatten_gallery(
    primary: &GalleryImage,
    gallery: &[RawGalleryEntry],
    part_title: &str,
    asset_url: impl Fn(&str) -> String,
) -> Vec<GalleryImage> {
    let mut images = vec![primary.clone()];
    images.extend(
        gallery
            .iter()
            .filter_map(|entry| entry.directus_files_id.as_ref())
            .map(|file| GalleryImage {
                id: file.id.clone(),
                url: asset_url(&file.id),
                alt: file
                    .title
                    .clone()
                    .unwrap_or_else(|| part_title.to_string()),
            }),
    );
    images
}

fn de_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(de_opt_string(deserializer)?.unwrap_or_default())
}

fn de_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StrOrNum {
        Str(String),
        Int(i64),
        Float(f64),
        Bool(bool),
    }
    let v = Option::<StrOrNum>::deserialize(deserializer)?;
    let out = v.map(|val| match val {
        StrOrNum::Str(s) => s,
        StrOrNum::Int(i) => i.to_string(),
        StrOrNum::Float(f) => {
            let mut s = f.to_string();
            if s.ends_with(".0") {
                s.truncate(s.len() - 2);
            }
            s
        }
        StrOrNum::Bool(b) => b.to_string(),
    });
    Ok(out.and_then(|s| {
        let trimmed = s.trim().to_string();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }))
}

fn truncate_body(body: &str) -> String {
    const LIMIT: usize = 220;
    let trimmed = body.trim();
    if trimmed.len() <= LIMIT {
        return trimmed.to_string();
    }
    let mut end = 0usize;
    for (idx, _) in trimmed.char_indices() {
        if idx > LIMIT {
            break;
        }
        end = idx;
    }
    if end == 0 {
        return trimmed.to_string();
    }
    format!("{}…", &trimmed[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_param(qs: &str) -> serde_json::Value {
        let (_, filter) = url::form_urlencoded::parse(qs.as_bytes())
            .find(|(k, _)| k == "filter")
            .expect("query string has no filter param");
        serde_json::from_str(&filter).expect("filter param is not JSON")
    }

    #[test]
    fn condition_nests_field_path() {
        let value = Condition::eq(MODALITY_NAME, "MRI").to_value();
        assert_eq!(
            value,
            serde_json::json!({"modalities": {"modalities_id": {"name": {"_eq": "MRI"}}}})
        );
    }

    #[test]
    fn parts_filter_always_excludes_archived() {
        let qs = parts_query_string(&FilterSet::active_parts(), None, 1, 25);
        let filter = filter_param(&qs);
        assert_eq!(
            filter["_and"][0],
            serde_json::json!({"status": {"_neq": "archived"}})
        );
    }

    #[test]
    fn manufacturer_and_modality_filters_are_and_combined() {
        let filter = FilterSet::active_parts()
            .with(Condition::eq(MANUFACTURER_NAME, "GE Healthcare"))
            .with(Condition::eq(MODALITY_NAME, "CT"));
        let value: serde_json::Value =
            serde_json::from_str(&filter.to_query_value()).expect("filter is not JSON");
        let and = value["_and"].as_array().expect("_and is not an array");
        assert_eq!(and.len(), 3);
        assert_eq!(
            and[1],
            serde_json::json!({"manufacturer": {"name": {"_eq": "GE Healthcare"}}})
        );
        assert_eq!(
            and[2],
            serde_json::json!({"modalities": {"modalities_id": {"name": {"_eq": "CT"}}}})
        );
    }

    #[test]
    fn search_term_only_added_when_present() {
        let with_term = parts_query_string(&FilterSet::active_parts(), Some("tube"), 1, 25);
        assert!(with_term.contains("search=tube"));
        let without = parts_query_string(&FilterSet::active_parts(), None, 1, 25);
        assert!(!without.contains("search="));
    }

    #[test]
    fn unpaginated_limit_passes_through() {
        let qs = parts_query_string(&FilterSet::active_parts(), None, 1, ALL_RESULTS);
        assert!(qs.contains("limit=-1"));
        assert!(qs.contains("page=1"));
    }

    #[test]
    fn list_query_carries_sort_and_meta() {
        let qs = parts_query_string(&FilterSet::active_parts(), None, 2, 25);
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(qs.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("sort".into(), "-sort,part_number".into())));
        assert!(pairs.contains(&("meta".into(), "filter_count,total_count".into())));
        assert!(pairs.contains(&("page".into(), "2".into())));
    }

    #[test]
    fn gallery_flattens_primary_first_with_alt_fallback() {
        let primary = GalleryImage {
            id: "p1".into(),
            url: "http://assets/p1".into(),
            alt: "Tube Assembly".into(),
        };
        let gallery = vec![
            RawGalleryEntry {
                directus_files_id: Some(ImageFile {
                    id: "g1".into(),
                    title: Some("Side view".into()),
                    description: None,
                    extra: serde_json::Value::Null,
                }),
            },
            RawGalleryEntry {
                directus_files_id: Some(ImageFile {
                    id: "g2".into(),
                    title: None,
                    description: None,
                    extra: serde_json::Value::Null,
                }),
            },
            RawGalleryEntry {
                directus_files_id: None,
            },
        ];
        let images = flatten_gallery(&primary, &gallery, "Tube Assembly", |id| {
            format!("http://assets/{id}")
        });
        assert_eq!(images.len(), 3);
        assert_eq!(images[0].id, "p1");
        assert_eq!(images[1].alt, "Side view");
        assert_eq!(images[2].alt, "Tube Assembly");
    }

    #[test]
    fn detail_content_normalizes_to_empty_string() {
        let raw: ApiResponse<RawPartDetail> = serde_json::from_str(
            r#"{"data": {"part_number": "A-100", "content": null, "title": "Coil"}}"#,
        )
        .expect("detail payload did not parse");
        let primary = GalleryImage {
            id: "p".into(),
            url: "u".into(),
            alt: "Coil".into(),
        };
        let detail = assemble_detail(raw.data, primary, |id| id.to_string());
        assert_eq!(detail.content, "");
        assert_eq!(detail.title, "Coil");
    }

    #[test]
    fn collection_query_sorts_per_collection() {
        let manufacturers = collection_query_string("order");
        assert!(manufacturers.contains("sort=order"));
        assert!(manufacturers.contains("meta=filter_count%2Ctotal_count"));
        assert!(!manufacturers.contains("filter="));
        let modalities = collection_query_string("sort");
        assert!(modalities.contains("sort=sort"));
    }

    #[test]
    fn logo_url_has_no_size_constraints() {
        let client = CatalogClient::new("https://catalog.example.com", reqwest::Client::new());
        let logo = ImageFile {
            id: "logo-1".into(),
            title: None,
            description: None,
            extra: serde_json::Value::Null,
        };
        assert_eq!(
            client.manufacturer_logo_url(Some(&logo)),
            "https://catalog.example.com/assets/logo-1"
        );
        assert_eq!(client.manufacturer_logo_url(None), "");
    }

    #[test]
    fn asset_url_carries_fit_parameters() {
        let client = CatalogClient::new("https://catalog.example.com/", reqwest::Client::new());
        assert_eq!(
            client.asset_url("abc"),
            "https://catalog.example.com/assets/abc?fit=inside&width=600&height=600"
        );
    }

    #[tokio::test]
    async fn fetch_parts_degrades_to_empty_on_transport_error() {
        let client = CatalogClient::new("http://127.0.0.1:1", reqwest::Client::new());
        let page = client.fetch_parts(&PartsQuery::default()).await;
        assert!(page.data.is_empty());
        assert_eq!(page.meta.filter_count, 0);
        assert_eq!(page.meta.total_count, 0);
    }

    #[tokio::test]
    async fn collection_listing_degrades_to_empty_on_transport_error() {
        let client = CatalogClient::new("http://127.0.0.1:1", reqwest::Client::new());
        let manufacturers = client.list_manufacturers().await;
        assert!(manufacturers.data.is_empty());
        assert_eq!(manufacturers.meta.filter_count, 0);
        let modalities = client.list_modalities().await;
        assert!(modalities.data.is_empty());
    }

    #[tokio::test]
    async fn slug_lookup_degrades_to_none_on_transport_error() {
        let client = CatalogClient::new("http://127.0.0.1:1", reqwest::Client::new());
        assert!(client.manufacturer_by_slug("ge").await.is_none());
        assert!(client.modality_by_slug("mri").await.is_none());
    }
}
