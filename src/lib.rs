#![deny(clippy::unwrap_used)]

use anyhow::Context;
use log_error::LogError;
use once_cell::sync::Lazy;
use serde::de::IntoDeserializer;
use serde::Deserialize;

pub mod catalog;
pub mod control;
pub mod sitemap;

pub static SELF_ADDR: Lazy<String> = Lazy::new(|| {
    envmnt::get_parse("SELF_ADDR")
        .context("SELF_ADDR not set")
        .log_error("Unable to get SELF_ADDR")
        .unwrap_or("0.0.0.0".to_string())
});

pub fn empty_string_as_none<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::Deserialize<'de>,
{
    let opt = Option::<String>::deserialize(de)?;
    let opt = opt.as_deref();
    match opt {
        None | Some("") => Ok(None),
        Some(s) => T::deserialize(s.into_deserializer()).map(Some),
    }
}

pub fn empty_string_as_none_parse<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: std::str::FromStr,
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    let opt = Option::<String>::deserialize(de)?;
    let opt = opt.as_deref();
    match opt {
        None | Some("") => Ok(None),
        Some(s) => s
            .parse()
            .map_err(|err| serde::de::Error::custom(format!("{err:?}")))
            .map(Some),
    }
}
