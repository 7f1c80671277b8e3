use reqwest::blocking::Client;
use reqwest::{Method, StatusCode, header};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::debug;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::repolist::GraphQLResponse;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Sends one GraphQL request and hands back the raw JSON body. The `errors` field is
/// left for the caller to inspect.
pub trait QueryExecutor {
    fn execute(&self, query: &str, variables: Value) -> Result<Value>;
}

pub struct GitHubClient {
    client: Client,
    endpoint: String,
    token: String,
}

impl GitHubClient {
    pub fn new(config: &Config) -> Result<Self> {
        let token = config.token()?.to_string();
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            token,
        })
    }
}

impl QueryExecutor for GitHubClient {
    fn execute(&self, query: &str, variables: Value) -> Result<Value> {
        debug!(endpoint = %self.endpoint, %variables, "sending GraphQL request");
        let response = self
            .client
            .request(Method::POST, &self.endpoint)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&json!({ "query": query, "variables": variables }))
            .send()?;
        let status = response.status();
        let body = response.text()?;
        parse_body(status, &body)
    }
}

fn parse_body(status: StatusCode, body: &str) -> Result<Value> {
    if !status.is_success() {
        return Err(Error::Transport {
            status: status.as_u16(),
            body: body.to_string(),
        });
    }
    Ok(serde_json::from_str(body)?)
}

/// Decodes a response body and returns its `data`, failing if the body carries
/// `errors` or no data at all.
pub fn into_data<T: DeserializeOwned>(body: Value) -> Result<T> {
    let response = serde_json::from_value::<GraphQLResponse<T>>(body)?;
    if let Some(message) = response.error_message() {
        return Err(Error::GraphQLResponse(message));
    }
    response
        .data
        .ok_or_else(|| Error::GraphQLResponse("no data returned".to_string()))
}
