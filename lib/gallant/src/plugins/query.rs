//! Query string plugins.
//!
//! Pairs are form-urlencoded; the order of untouched pairs is kept.

use crate::{Context, Error, PhasePlugin, Result};

type Pairs = Vec<(String, String)>;

fn with_query<F>(update: F) -> PhasePlugin
where
    F: Fn(&mut Pairs) + Send + Sync + 'static,
{
    PhasePlugin::request(move |mut ctx, h| match rewrite(&mut ctx, &update) {
        Ok(()) => h.next(ctx),
        Err(err) => h.error(ctx, err),
    })
}

fn rewrite(ctx: &mut Context, update: &dyn Fn(&mut Pairs)) -> Result<()> {
    let url = ctx
        .request_mut()
        .url_mut()
        .ok_or_else(|| Error::invalid_request("request URL is not set"))?;

    let mut pairs: Pairs = url.query_pairs().into_owned().collect();
    update(&mut pairs);

    if pairs.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(&pairs);
    }
    Ok(())
}

/// Set a query parameter, replacing previous values.
#[must_use]
pub fn set(key: impl Into<String>, value: impl Into<String>) -> PhasePlugin {
    let (key, value) = (key.into(), value.into());
    with_query(move |pairs| replace(pairs, &key, &value))
}

/// Append a query parameter value.
#[must_use]
pub fn add(key: impl Into<String>, value: impl Into<String>) -> PhasePlugin {
    let (key, value) = (key.into(), value.into());
    with_query(move |pairs| pairs.push((key.clone(), value.clone())))
}

/// Set several query parameters at once.
#[must_use]
pub fn set_all<I, K, V>(params: I) -> PhasePlugin
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    let params: Pairs = params
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect();
    with_query(move |pairs| {
        for (key, value) in &params {
            replace(pairs, key, value);
        }
    })
}

/// Remove every value of a query parameter.
#[must_use]
pub fn del(key: impl Into<String>) -> PhasePlugin {
    let key = key.into();
    with_query(move |pairs| pairs.retain(|(name, _)| *name != key))
}

/// Remove the whole query string.
#[must_use]
pub fn del_all() -> PhasePlugin {
    with_query(Vec::clear)
}

fn replace(pairs: &mut Pairs, key: &str, value: &str) {
    match pairs.iter().position(|(name, _)| name == key) {
        Some(first) => {
            pairs[first].1 = value.to_string();
            let mut index = 0;
            pairs.retain(|(name, _)| {
                let keep = index <= first || name != key;
                index += 1;
                keep
            });
        }
        None => pairs.push((key.to_string(), value.to_string())),
    }
}
