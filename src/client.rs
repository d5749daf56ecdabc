use std::time::Duration;

use anyhow::bail;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::models::{RecipeDetail, SearchQuery, SearchResponse};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking client for a running `recipe-finder serve`.
pub struct RecipeClient {
    remote_addr: String,
    client: reqwest::blocking::Client,
}

impl RecipeClient {
    pub fn new(addr: &str) -> anyhow::Result<RecipeClient> {
        let remote_addr = addr.strip_suffix("/").unwrap_or(addr).to_string();
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(RecipeClient {
            remote_addr,
            client,
        })
    }

    fn get(&self, url: &str) -> reqwest::blocking::RequestBuilder {
        log::info!("{}{}", self.remote_addr, url);
        self.client.get(format!("{}{}", self.remote_addr, url))
    }

    fn post(&self, url: &str) -> reqwest::blocking::RequestBuilder {
        log::info!("{}{}", self.remote_addr, url);
        self.client.post(format!("{}{}", self.remote_addr, url))
    }

    pub fn search(&self, query: &str, offset: usize, limit: usize) -> anyhow::Result<SearchResponse> {
        let resp = self
            .post("/search")
            .query(&[("offset", offset), ("limit", limit)])
            .json(&SearchQuery {
                query: query.to_string(),
            })
            .send()?;

        handle_response(resp)
    }

    pub fn recipe(&self, id: u64) -> anyhow::Result<RecipeDetail> {
        let resp = self.get(&format!("/recipe/{id}")).send()?;

        handle_response(resp)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(untagged)]
pub enum WebResponse<T> {
    Error { error: String },
    Data(T),
}

fn handle_response<T>(response: reqwest::blocking::Response) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let status = response.status();
    let text = response.text()?;

    parse_body(status, &text)
}

fn parse_body<T>(status: reqwest::StatusCode, text: &str) -> anyhow::Result<T>
where
    T: DeserializeOwned,
{
    let web_response = serde_json::from_str::<WebResponse<T>>(text).map_err(|err| {
        log::error!("{err}. tried to parse: {text:?}");
        anyhow::anyhow!("unexpected response ({status}): {text}")
    })?;

    match web_response {
        WebResponse::Data(data) => Ok(data),
        WebResponse::Error { error } => {
            bail!("{error} ({status})")
        }
    }
}
