//! arXiv candidate source: the bibliographic search provider boundary.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::config::SearchConfig;
use crate::models::Paper;

/// External bibliographic search provider: one query string in, a bounded
/// list of candidate records out. May fail on provider or network errors;
/// the fan-out aggregator isolates those failures.
#[async_trait]
pub trait PaperSource: Send + Sync {
    async fn search(&self, query: &str, cap: usize) -> Result<Vec<Paper>>;
}

/// arXiv API client speaking the Atom query protocol.
#[derive(Clone)]
pub struct ArxivClient {
    client: reqwest::Client,
    config: SearchConfig,
}

impl ArxivClient {
    pub fn new(client: reqwest::Client, config: SearchConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl PaperSource for ArxivClient {
    async fn search(&self, query: &str, cap: usize) -> Result<Vec<Paper>> {
        let url = format!("{}/api/query", self.config.base_url);
        let max_results = cap.min(self.config.max_results);

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("search_query", format!("all:{query}")),
                ("start", "0".to_string()),
                ("max_results", max_results.to_string()),
                ("sortBy", "relevance".to_string()),
                ("sortOrder", "descending".to_string()),
            ])
            .send()
            .await
            .context("Failed to call arXiv API")?;

        if !resp.status().is_success() {
            let status = resp.status();
            anyhow::bail!("arXiv API returned {status}");
        }

        let body = resp
            .text()
            .await
            .context("Failed to read arXiv API response")?;

        parse_atom_feed(&body)
    }
}

/// Parse an arXiv Atom feed into papers. Entries missing an id are skipped.
pub fn parse_atom_feed(xml: &str) -> Result<Vec<Paper>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut papers = Vec::new();
    let mut entry: Option<Paper> = None;
    let mut in_author = false;
    // Local name of the text-bearing element currently open inside an entry.
    let mut field: Option<String> = None;

    loop {
        match reader.read_event().context("Malformed arXiv Atom feed")? {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match name.as_str() {
                    "entry" => {
                        entry = Some(Paper::new("", "", ""));
                        in_author = false;
                        field = None;
                    }
                    "author" if entry.is_some() => in_author = true,
                    "link" if entry.is_some() => {
                        if let Some(paper) = entry.as_mut() {
                            apply_link(paper, &e);
                        }
                    }
                    "category" if entry.is_some() => {
                        if let Some(paper) = entry.as_mut() {
                            apply_category(paper, &e);
                        }
                    }
                    other if entry.is_some() => field = Some(other.to_string()),
                    _ => {}
                }
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if let Some(paper) = entry.as_mut() {
                    match name.as_str() {
                        "link" => apply_link(paper, &e),
                        "category" => apply_category(paper, &e),
                        _ => {}
                    }
                }
            }
            Event::Text(t) => {
                if let (Some(paper), Some(name)) = (entry.as_mut(), field.as_deref()) {
                    let text = t.unescape().unwrap_or_default().into_owned();
                    apply_text(paper, name, in_author, &text);
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match name.as_str() {
                    "entry" => {
                        if let Some(paper) = entry.take() {
                            if !paper.id.is_empty() {
                                papers.push(finalize(paper));
                            }
                        }
                    }
                    "author" => in_author = false,
                    _ => field = None,
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(papers)
}

fn apply_text(paper: &mut Paper, field: &str, in_author: bool, text: &str) {
    match field {
        "name" if in_author => paper.authors.push(text.to_string()),
        "id" => paper.id.push_str(text),
        "title" => push_fragment(&mut paper.title, text),
        "summary" => push_fragment(&mut paper.abstract_text, text),
        "published" => paper.published = parse_timestamp(text),
        "updated" => paper.updated = parse_timestamp(text),
        "doi" => paper.doi = Some(text.to_string()),
        "journal_ref" => paper.journal_ref = Some(text.to_string()),
        _ => {}
    }
}

/// Text nodes inside one element can arrive in fragments; glue them with a
/// space so later whitespace collapsing normalizes the result.
fn push_fragment(target: &mut String, text: &str) {
    if !target.is_empty() {
        target.push(' ');
    }
    target.push_str(text);
}

fn apply_link(paper: &mut Paper, e: &quick_xml::events::BytesStart<'_>) {
    let mut href = None;
    let mut is_pdf = false;
    for attr in e.attributes().flatten() {
        let key = attr.key.local_name();
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        match key.as_ref() {
            b"href" => href = Some(value),
            b"title" if value == "pdf" => is_pdf = true,
            b"type" if value == "application/pdf" => is_pdf = true,
            _ => {}
        }
    }
    if is_pdf {
        paper.pdf_url = href;
    }
}

fn apply_category(paper: &mut Paper, e: &quick_xml::events::BytesStart<'_>) {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == b"term" {
            let term = String::from_utf8_lossy(&attr.value).into_owned();
            if !paper.categories.contains(&term) {
                paper.categories.push(term);
            }
        }
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Collapse the newline-and-indent whitespace arXiv embeds in titles and
/// abstracts.
fn finalize(mut paper: Paper) -> Paper {
    paper.title = collapse_whitespace(&paper.title);
    paper.abstract_text = collapse_whitespace(&paper.abstract_text);
    paper
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
