// src/adapters/rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use quick_xml::de::from_str;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::adapters::dates::normalize_timestamp;
use crate::adapters::{http, id_from_link, matches_term, normalize_text};
use crate::config::FeedConfig;
use crate::model::Item;
use crate::monitor::types::SourceAdapter;

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

/// RSS 2.0 source. Feeds with a search endpoint get the term as a query
/// parameter; plain feeds are fetched whole and filtered locally.
pub struct RssAdapter {
    name: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http {
        url: Url,
        term_param: Option<String>,
        client: Client,
    },
}

impl RssAdapter {
    pub fn from_fixture(name: impl Into<String>, xml: &str) -> Self {
        Self {
            name: name.into(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_feed(feed: &FeedConfig, client: Client) -> Result<Self> {
        let url = Url::parse(feed.url.trim())
            .with_context(|| format!("invalid feed url for {}: {}", feed.name, feed.url))?;
        Ok(Self {
            name: feed.name.trim().to_string(),
            mode: Mode::Http {
                url,
                term_param: feed.term_param.clone(),
                client,
            },
        })
    }

    fn parse_items(&self, xml: &str, term: &str, now: NaiveDateTime) -> Result<Vec<Item>> {
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean)
            .with_context(|| format!("parsing {} rss xml", self.name))?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            let description = normalize_text(it.description.as_deref().unwrap_or_default());
            if title.is_empty() || !matches_term(term, &[title.as_str(), description.as_str()]) {
                continue;
            }
            let link = it.link.unwrap_or_default().trim().to_string();
            // Unparseable dates stay empty and are rejected downstream.
            let timestamp = it
                .pub_date
                .as_deref()
                .and_then(|d| normalize_timestamp(d, now))
                .unwrap_or_default();

            out.push(Item {
                id: id_from_link(&link),
                title,
                link,
                timestamp,
                search_term: term.to_string(),
                source: self.name.clone(),
            });
        }
        tracing::debug!(
            target: "adapter",
            source = %self.name,
            term,
            items = out.len(),
            "feed parsed"
        );
        Ok(out)
    }
}

#[async_trait]
impl SourceAdapter for RssAdapter {
    async fn fetch(&self, search_term: &str) -> Result<Vec<Item>> {
        let now = Local::now().naive_local();
        match &self.mode {
            Mode::Fixture(xml) => self.parse_items(xml, search_term, now),
            Mode::Http {
                url,
                term_param,
                client,
            } => {
                let mut url = url.clone();
                if let Some(param) = term_param {
                    url.query_pairs_mut().append_pair(param, search_term);
                }
                let body = http::get_text(client, url).await?;
                self.parse_items(&body, search_term, now)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&middot;", "·")
}
