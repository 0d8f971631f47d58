//! HTTP plumbing for the course backend.

mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::{Context, Result, bail};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// Executes `req` and returns the body of a 2xx response.
///
/// Any other status becomes an error carrying the status and response body.
async fn send<C: HttpClient + ?Sized>(client: &C, req: Request) -> Result<Vec<u8>> {
    let method = req.method().clone();
    let url = req.url().clone();

    let resp = client
        .execute(req)
        .await
        .with_context(|| format!("{method} {url} failed"))?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("{method} {url} returned status {status}: {body}");
    }

    let bytes = resp.bytes().await?;
    debug!(%method, %url, bytes = bytes.len(), "Response received");
    Ok(bytes.to_vec())
}

fn parse_url(url: &str) -> Result<Url> {
    url.parse().with_context(|| format!("invalid URL {url}"))
}

pub async fn get_json<C, T>(client: &C, url: &str) -> Result<T>
where
    C: HttpClient + ?Sized,
    T: DeserializeOwned,
{
    let req = Request::new(Method::GET, parse_url(url)?);
    let bytes = send(client, req).await?;

    serde_json::from_slice(&bytes).with_context(|| format!("unexpected response shape from {url}"))
}

/// Sends `body` as JSON with the given method. The response body is ignored.
pub async fn send_json<C, B>(client: &C, method: Method, url: &str, body: &B) -> Result<()>
where
    C: HttpClient + ?Sized,
    B: Serialize + ?Sized,
{
    let mut req = Request::new(method, parse_url(url)?);
    req.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *req.body_mut() = Some(serde_json::to_vec(body)?.into());

    send(client, req).await?;
    Ok(())
}
