//! `NewsAPI` `everything` search, used as the narrative-only tier.

use async_trait::async_trait;
use leea_hazard_models::NewsArticle;

use crate::parsing::parse_rfc3339;
use crate::{
    HttpSettings, NewsSource, SourceBatch, SourceError, SourceOutcome, Unavailable, retry,
};

/// Search endpoint.
pub const NEWSAPI_URL: &str = "https://newsapi.org/v2/everything";

/// Default search terms.
pub const DEFAULT_QUERY_TERMS: &str = "earthquake aftershock damage power outage";

/// Placeholder title `NewsAPI` uses for retracted articles.
const REMOVED_TITLE: &str = "[Removed]";

/// Joins the search terms and an optional region hint with single spaces.
#[must_use]
pub fn build_query(terms: &str, region_hint: Option<&str>) -> String {
    terms
        .split_whitespace()
        .chain(region_hint.into_iter().flat_map(str::split_whitespace))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses an `everything` response.
///
/// Articles without a usable title are dropped and counted.
///
/// # Errors
///
/// Returns [`SourceError::Malformed`] if `status` is not `"ok"` or the
/// body has no `articles` array.
pub fn parse_articles(body: &serde_json::Value) -> Result<(Vec<NewsArticle>, usize), SourceError> {
    let status = body["status"].as_str().unwrap_or_default();
    if status != "ok" {
        let message = body["message"].as_str().unwrap_or("no message");
        return Err(SourceError::Malformed {
            message: format!("NewsAPI status '{status}': {message}"),
        });
    }
    let records = body["articles"]
        .as_array()
        .ok_or_else(|| SourceError::Malformed {
            message: "no articles array in NewsAPI response".to_string(),
        })?;

    let mut articles = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for record in records {
        let title = text(&record["title"]);
        match title {
            Some(title) if title != REMOVED_TITLE => articles.push(NewsArticle {
                title,
                url: text(&record["url"]),
                source: text(&record["source"]["name"]),
                published_at: record["publishedAt"].as_str().and_then(parse_rfc3339),
                description: text(&record["description"]),
            }),
            _ => dropped += 1,
        }
    }

    Ok((articles, dropped))
}

fn text(value: &serde_json::Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Disaster news from `NewsAPI`.
pub struct NewsApiSource {
    client: reqwest::Client,
    settings: HttpSettings,
    api_key: Option<String>,
    query_terms: String,
    region_hint: Option<String>,
    page_size: u32,
}

impl NewsApiSource {
    /// Creates a news source. Without an API key every fetch reports
    /// [`Unavailable::NotConfigured`].
    #[must_use]
    pub fn new(client: reqwest::Client, settings: HttpSettings, api_key: Option<String>) -> Self {
        Self {
            client,
            settings,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            query_terms: DEFAULT_QUERY_TERMS.to_string(),
            region_hint: None,
            page_size: 10,
        }
    }

    /// Overrides the search terms.
    #[must_use]
    pub fn with_query_terms(mut self, terms: impl Into<String>) -> Self {
        self.query_terms = terms.into();
        self
    }

    /// Narrows the search to a region name (e.g. `"Florida"`).
    #[must_use]
    pub fn with_region_hint(mut self, region: Option<String>) -> Self {
        self.region_hint = region;
        self
    }

    /// Sets the page size, clamped to `1..=50`.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, 50);
        self
    }

    async fn fetch_batch(&self, api_key: &str) -> Result<SourceBatch<NewsArticle>, SourceError> {
        let query = build_query(&self.query_terms, self.region_hint.as_deref());
        let params = vec![
            ("q", query.clone()),
            ("language", "en".to_string()),
            ("sortBy", "publishedAt".to_string()),
            ("pageSize", self.page_size.to_string()),
            ("apiKey", api_key.to_string()),
        ];
        let body = retry::send_json(&self.settings, NEWSAPI_URL, &params, || {
            self.client.get(NEWSAPI_URL).query(&params)
        })
        .await?;
        let (items, dropped) = parse_articles(&body)?;

        log::info!("NewsAPI '{query}': {} articles ({dropped} dropped)", items.len());

        Ok(SourceBatch {
            items,
            dropped,
            title: format!("NewsAPI: {query}"),
            url: NEWSAPI_URL.to_string(),
        })
    }
}

#[async_trait]
impl NewsSource for NewsApiSource {
    fn name(&self) -> &str {
        "newsapi"
    }

    async fn fetch(&self) -> SourceOutcome<NewsArticle> {
        let Some(api_key) = self.api_key.as_deref() else {
            log::info!("NewsAPI key not set, skipping news tier");
            return SourceOutcome::Unavailable(Unavailable::NotConfigured(
                "NEWSAPI_KEY".to_string(),
            ));
        };
        self.fetch_batch(api_key).await.into()
    }
}
