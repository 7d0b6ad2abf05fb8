use serde::Deserialize;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;

/// Raw `page`/`limit` query values. Missing, malformed and non-positive
/// values fall back to the defaults instead of failing the request.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PageParams {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageParams {
    pub fn page(&self) -> u32 {
        positive_or(self.page.as_deref(), DEFAULT_PAGE)
    }

    pub fn limit(&self) -> u32 {
        positive_or(self.limit.as_deref(), DEFAULT_LIMIT)
    }
}

fn positive_or(raw: Option<&str>, default: u32) -> u32 {
    raw.and_then(|value| value.trim().parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

/// Splits lyrics into newline-separated verses and returns the verses that
/// fall on `page`. Out-of-range pages yield an empty slice.
pub fn paginate_verses(text: &str, page: u32, limit: u32) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let verses: Vec<&str> = text.split('\n').collect();
    let start = (page.saturating_sub(1) as usize).saturating_mul(limit as usize);
    if start > verses.len() {
        return Vec::new();
    }
    let end = start.saturating_add(limit as usize).min(verses.len());
    verses[start..end].to_vec()
}
