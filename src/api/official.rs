use super::RedditApi;
use crate::config::{Credentials, RetrieverOptions};
use crate::forest::{parse_listing, CommentNode};
use anyhow::{anyhow, bail, Context, Result};
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use serde_json::Value;
use std::cell::RefCell;

/// Blocking client for the official API using the script-app password grant.
/// The bearer token is fetched on first use and cached.
pub struct RedditClient {
    http: HttpClient,
    creds: Credentials,
    base_url: String,
    auth_url: String,
    token: RefCell<Option<String>>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
}

impl RedditClient {
    pub fn new(creds: Credentials, opts: &RetrieverOptions) -> Result<Self> {
        let http = HttpClient::builder().user_agent(creds.user_agent.clone()).build()?;
        Ok(Self {
            http,
            creds,
            base_url: opts.reddit_base_url.trim_end_matches('/').to_string(),
            auth_url: opts.reddit_auth_url.clone(),
            token: RefCell::new(None),
        })
    }

    fn token(&self) -> Result<String> {
        if let Some(t) = self.token.borrow().as_ref() {
            return Ok(t.clone());
        }
        let resp = self
            .http
            .post(&self.auth_url)
            .basic_auth(&self.creds.client_id, Some(&self.creds.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", self.creds.username.as_str()),
                ("password", self.creds.password.as_str()),
            ])
            .send()
            .context("request access token")?;
        let status = resp.status();
        if !status.is_success() {
            bail!("access token request failed ({})", status);
        }
        let body: TokenResponse = resp.json()?;
        let token = match (body.access_token, body.error) {
            (Some(t), _) => t,
            (None, Some(err)) => bail!("access token request rejected: {}", err),
            (None, None) => bail!("access token response missing token"),
        };
        *self.token.borrow_mut() = Some(token.clone());
        Ok(token)
    }

    fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .get(&url)
            .bearer_auth(self.token()?)
            .query(&[("raw_json", "1")])
            .query(query)
            .send()
            .with_context(|| format!("GET {}", url))?;
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            // Expired token: drop it so the next attempt re-authenticates.
            self.token.borrow_mut().take();
        }
        if !status.is_success() {
            bail!("official API request failed ({}): {}", status, url);
        }
        Ok(resp.json()?)
    }
}

impl RedditApi for RedditClient {
    fn me(&self) -> Result<String> {
        let me = self.get("/api/v1/me", &[])?;
        me.get("name")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("identity response has no name"))
    }

    fn info(&self, fullnames: &[String]) -> Result<Vec<Value>> {
        if fullnames.is_empty() {
            return Ok(Vec::new());
        }
        let ids = fullnames.join(",");
        let listing = self.get("/api/info", &[("id", ids.as_str())])?;
        let children = listing
            .pointer("/data/children")
            .and_then(Value::as_array)
            .ok_or_else(|| anyhow!("info response is not a listing"))?;
        Ok(children.iter().filter_map(|c| c.get("data").cloned()).collect())
    }

    fn comment_forest(&self, submission_id: &str) -> Result<Vec<CommentNode>> {
        let body = self.get(&format!("/comments/{}", submission_id), &[("limit", "500")])?;
        // [submission listing, comment listing]
        let comments = body
            .as_array()
            .and_then(|a| a.get(1))
            .ok_or_else(|| anyhow!("comments response for {} has no comment listing", submission_id))?;
        Ok(parse_listing(comments))
    }

    fn subreddit_about(&self, name: &str) -> Result<Value> {
        let about = self.get(&format!("/r/{}/about", name), &[])?;
        about
            .get("data")
            .cloned()
            .ok_or_else(|| anyhow!("about response for r/{} has no data", name))
    }
}
