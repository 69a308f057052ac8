use crate::catalog::PartSummary;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::writer::Writer;
use serde::Serialize;
use time::OffsetDateTime;

const CHANGEFREQ: &str = "weekly";
const PRIORITY_WITH_IMAGE: f64 = 1.0;
const PRIORITY_WITHOUT_IMAGE: f64 = 0.8;

#[derive(Debug, Clone, Serialize)]
pub struct SitemapImage {
    pub loc: String,
    pub title: String,
    pub caption: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SitemapUrl {
    pub loc: String,
    pub lastmod: String,
    pub changefreq: &'static str,
    pub priority: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<SitemapImage>,
}

fn format_lastmod(dt: OffsetDateTime) -> String {
    dt.date().to_string()
}

/// One sitemap entry per part with a usable part number; blank part numbers
/// are skipped. `lastmod` is the generation timestamp, not the record's own
/// update time.
pub fn part_entries(
    parts: &[PartSummary],
    asset_url: impl Fn(&str) -> String,
    generated_at: OffsetDateTime,
) -> Vec<SitemapUrl> {
    let lastmod = format_lastmod(generated_at);
    parts
        .iter()
        .filter_map(|part| {
            let part_number = part.part_number.as_deref()?.trim();
            if part_number.is_empty() {
                return None;
            }
            let image = part.primary_image.as_ref().map(|file| {
                let fallback = fallback_caption(part);
                SitemapImage {
                    loc: asset_url(&file.id),
                    title: file.title.clone().unwrap_or_else(|| fallback.clone()),
                    caption: file.description.clone().unwrap_or(fallback),
                }
            });
            Some(SitemapUrl {
                loc: format!("/part/{part_number}"),
                lastmod: lastmod.clone(),
                changefreq: CHANGEFREQ,
                priority: if image.is_some() {
                    PRIORITY_WITH_IMAGE
                } else {
                    PRIORITY_WITHOUT_IMAGE
                },
                image,
            })
        })
        .collect()
}

fn fallback_caption(part: &PartSummary) -> String {
    let number = part
        .display_part_number
        .as_deref()
        .or(part.part_number.as_deref())
        .unwrap_or_default();
    match part
        .manufacturer
        .as_ref()
        .and_then(|m| m.name.as_deref())
        .filter(|name| !name.is_empty())
    {
        Some(manufacturer) => format!("Part {number} - {manufacturer}"),
        None => format!("Part {number}"),
    }
}

pub fn write_urlset(entries: &[SitemapUrl]) -> Result<String, anyhow::Error> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut urlset = BytesStart::new("urlset");
    urlset.push_attribute(("xmlns", "http://www.sitemaps.org/schemas/sitemap/0.9"));
    urlset.push_attribute((
        "xmlns:image",
        "http://www.google.com/schemas/sitemap-image/1.1",
    ));
    writer.write_event(Event::Start(urlset))?;
    for entry in entries {
        writer
            .create_element("url")
            .write_inner_content::<_, quick_xml::Error>(|writer| {
                writer
                    .create_element("loc")
                    .write_text_content(BytesText::new(&entry.loc))?;
                writer
                    .create_element("lastmod")
                    .write_text_content(BytesText::new(&entry.lastmod))?;
                writer
                    .create_element("changefreq")
                    .write_text_content(BytesText::new(entry.changefreq))?;
                writer
                    .create_element("priority")
                    .write_text_content(BytesText::new(&format!("{:.1}", entry.priority)))?;
                if let Some(image) = &entry.image {
                    writer
                        .create_element("image:image")
                        .write_inner_content::<_, quick_xml::Error>(|writer| {
                            writer
                                .create_element("image:loc")
                                .write_text_content(BytesText::new(&image.loc))?;
                            writer
                                .create_element("image:title")
                                .write_text_content(BytesText::new(&image.title))?;
                            writer
                                .create_element("image:caption")
                                .write_text_content(BytesText::new(&image.caption))?;
                            Ok(())
                        })?;
                }
                Ok(())
            })?;
    }
    writer.write_event(Event::End(BytesEnd::new("urlset")))?;
    Ok(String::from_utf8(writer.into_inner())?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ImageFile, Manufacturer, PartSummary};

    fn part(number: Option<&str>, image: bool) -> PartSummary {
        PartSummary {
            part_number: number.map(str::to_string),
            display_part_number: number.map(str::to_string),
            title: Some("X-Ray Tube".to_string()),
            manufacturer: Some(Manufacturer {
                id: "1".to_string(),
                name: Some("GE Healthcare".to_string()),
                slug: Some("ge-healthcare".to_string()),
                description: None,
                logo: None,
            }),
            primary_image: image.then(|| ImageFile {
                id: "img-1".to_string(),
                title: None,
                description: None,
                extra: serde_json::Value::Null,
            }),
        }
    }

    fn assets(id: &str) -> String {
        format!("https://catalog.example.com/assets/{id}")
    }

    #[test]
    fn skips_parts_without_part_number() {
        let parts = vec![part(Some("A-100"), true), part(None, true)];
        let entries = part_entries(&parts, assets, OffsetDateTime::now_utc());
        assert_eq!(entries.len(), 1);
        assert!(entries.len() <= parts.len());
        assert_eq!(entries[0].loc, "/part/A-100");
    }

    #[test]
    fn priority_follows_primary_image() {
        let parts = vec![part(Some("A-100"), true), part(Some("B-200"), false)];
        let entries = part_entries(&parts, assets, OffsetDateTime::now_utc());
        assert_eq!(entries[0].priority, 1.0);
        assert!(entries[0].image.is_some());
        assert_eq!(entries[1].priority, 0.8);
        assert!(entries[1].image.is_none());
    }

    #[test]
    fn image_caption_falls_back_to_synthesized_text() {
        let parts = vec![part(Some("A-100"), true)];
        let entries = part_entries(&parts, assets, OffsetDateTime::now_utc());
        let image = entries[0].image.as_ref().expect("entry has no image");
        assert_eq!(image.loc, "https://catalog.example.com/assets/img-1");
        assert_eq!(image.title, "Part A-100 - GE Healthcare");
        assert_eq!(image.caption, "Part A-100 - GE Healthcare");
    }

    #[test]
    fn urlset_emits_image_block_only_when_present() {
        let parts = vec![part(Some("A-100"), true), part(Some("B-200"), false)];
        let entries = part_entries(&parts, assets, OffsetDateTime::now_utc());
        let xml = write_urlset(&entries).expect("urlset did not render");
        assert!(xml.starts_with("<?xml"));
        assert_eq!(xml.matches("<url>").count(), 2);
        assert_eq!(xml.matches("<image:image>").count(), 1);
        assert!(xml.contains("<priority>1.0</priority>"));
        assert!(xml.contains("<priority>0.8</priority>"));
    }
}
