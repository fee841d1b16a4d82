// src/reader/rss.rs
//! RSS reader: job boards that publish plain feeds instead of channels.
//!
//! The normalized source identifier is the feed's host/path; the item
//! `pubDate` (unix seconds) doubles as the monotone message id, so the
//! watermark contract works unchanged.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use super::{ChannelHandle, FeedMessage, FetchError, SourceReader};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822_to_unix(ts: &str) -> u64 {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
        .unwrap_or(0)
}

pub struct RssReader {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { client: reqwest::Client },
}

impl RssReader {
    pub fn new() -> Self {
        Self {
            mode: Mode::Http { client: reqwest::Client::new() },
        }
    }

    /// Serve the given XML for every source; tests only.
    pub fn from_fixture_str(xml: &str) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    fn parse_feed(xml: &str) -> Result<Vec<FeedMessage>> {
        let xml_clean = scrub_html_entities_for_xml(xml);
        let rss: Rss = from_str(&xml_clean).context("parsing rss xml")?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let text = match (it.title.as_deref(), it.description.as_deref()) {
                (Some(t), Some(d)) if !t.is_empty() && !d.is_empty() => format!("{t}. {d}"),
                (Some(t), _) if !t.is_empty() => t.to_string(),
                (_, Some(d)) if !d.is_empty() => d.to_string(),
                _ => continue,
            };
            out.push(FeedMessage {
                id: it.pub_date.as_deref().map(parse_rfc2822_to_unix).unwrap_or(0),
                text,
                url: it.link,
            });
        }
        Ok(out)
    }
}

impl Default for RssReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SourceReader for RssReader {
    async fn resolve(&self, source: &str) -> Result<ChannelHandle, FetchError> {
        if source.is_empty() {
            return Err(FetchError::Unresolvable(source.to_string()));
        }
        Ok(ChannelHandle { slug: source.to_string() })
    }

    async fn fetch_newer(
        &self,
        handle: &ChannelHandle,
        min_id: u64,
        limit: usize,
    ) -> Result<Vec<FeedMessage>, FetchError> {
        let mut messages = match &self.mode {
            Mode::Fixture(xml) => {
                Self::parse_feed(xml).map_err(FetchError::Transient)?
            }
            Mode::Http { client } => {
                let url = format!("https://{}", handle.slug);
                let resp = client
                    .get(&url)
                    .send()
                    .await
                    .map_err(|e| FetchError::Transient(anyhow!(e)))?;
                let status = resp.status();
                if status == reqwest::StatusCode::FORBIDDEN
                    || status == reqwest::StatusCode::UNAUTHORIZED
                {
                    return Err(FetchError::AccessDenied(handle.slug.clone()));
                }
                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(FetchError::Unresolvable(handle.slug.clone()));
                }
                if !status.is_success() {
                    return Err(FetchError::Transient(anyhow!("feed returned {status}")));
                }
                let body = resp
                    .text()
                    .await
                    .map_err(|e| FetchError::Transient(anyhow!(e)))?;
                Self::parse_feed(&body).map_err(FetchError::Transient)?
            }
        };

        messages.retain(|m| m.id > min_id);
        messages.sort_unstable_by(|a, b| b.id.cmp(&a.id));
        messages.truncate(limit);
        Ok(messages)
    }

    fn name(&self) -> &'static str {
        "rss"
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
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel>
  <title>jobs</title>
  <item>
    <title>Rust engineer</title>
    <link>https://example.test/jobs/1</link>
    <pubDate>Mon, 01 Jan 2024 10:00:00 GMT</pubDate>
    <description>Remote, senior</description>
  </item>
  <item>
    <title>Go engineer</title>
    <link>https://example.test/jobs/2</link>
    <pubDate>Mon, 01 Jan 2024 12:00:00 GMT</pubDate>
  </item>
</channel></rss>"#;

    #[test]
    fn pub_date_becomes_id() {
        assert_eq!(
            parse_rfc2822_to_unix("Mon, 01 Jan 2024 10:00:00 GMT"),
            1_704_103_200
        );
        assert_eq!(parse_rfc2822_to_unix("not a date"), 0);
    }

    #[tokio::test]
    async fn fixture_feed_is_windowed_newest_first() {
        let reader = RssReader::from_fixture_str(FEED);
        let handle = reader.resolve("example.test/feed.xml").await.unwrap();

        let all = reader.fetch_newer(&handle, 0, 300).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].id > all[1].id);
        assert_eq!(all[0].text, "Go engineer");
        assert_eq!(all[1].text, "Rust engineer. Remote, senior");
        assert_eq!(all[1].url.as_deref(), Some("https://example.test/jobs/1"));

        let newer = reader.fetch_newer(&handle, all[1].id, 300).await.unwrap();
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].id, all[0].id);
    }
}
