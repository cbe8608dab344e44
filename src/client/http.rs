//! Blocking HTTP implementation of [`Store`] using reqwest.

use super::fulltext::{read_fetch_body, read_find_body};
use super::{SeriesSet, Store, StoreError, MAX_INSTANT, MIN_INSTANT, TOKEN_HEADER};
use crate::config::{Cell, Config};
use reqwest::blocking::{Client, RequestBuilder, Response};
use std::io::BufReader;
use std::time::Duration;
use tracing::debug;

/// Warp 10 client bound to a resolved configuration.
pub struct Warp10Client<'a> {
    config: &'a Config,
    http: Client,
}

impl<'a> Warp10Client<'a> {
    /// Create a client. `timeout` of `None` waits indefinitely for each request.
    pub fn new(config: &'a Config, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { config, http })
    }

    fn cell(&self, name: &str) -> Result<&'a Cell, StoreError> {
        self.config
            .cell(name)
            .ok_or_else(|| StoreError::UnknownCell(name.to_string()))
    }

    /// Send the request and reject non-success statuses.
    fn send(&self, url: &str, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request.send().map_err(|source| StoreError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(StoreError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    fn get(
        &self,
        url: &str,
        token: &str,
        params: &[(&str, &str)],
    ) -> Result<Response, StoreError> {
        debug!("GET {} {:?}", url, params);
        let request = self.http.get(url).header(TOKEN_HEADER, token).query(params);
        self.send(url, request)
    }

    fn text(url: &str, response: Response) -> Result<String, StoreError> {
        response.text().map_err(|source| StoreError::Transport {
            url: url.to_string(),
            source,
        })
    }
}

impl Store for Warp10Client<'_> {
    fn find(&self, cell: &str, selector: &str, read_token: &str) -> Result<SeriesSet, StoreError> {
        let url = &self.cell(cell)?.find_endpoint;
        let response = self.get(
            url,
            read_token,
            &[
                ("selector", selector),
                ("sortmeta", "true"),
                ("showattr", "true"),
                ("format", "fulltext"),
            ],
        )?;

        read_find_body(BufReader::new(response)).map_err(|source| StoreError::Response {
            url: url.clone(),
            source,
        })
    }

    fn fetch(
        &self,
        cell: &str,
        selector: &str,
        read_token: &str,
    ) -> Result<SeriesSet, StoreError> {
        let url = &self.cell(cell)?.fetch_endpoint;
        let now = MAX_INSTANT.to_string();
        let response = self.get(
            url,
            read_token,
            &[
                ("selector", selector),
                ("now", now.as_str()),
                ("timespan", "-1"),
                ("sortmeta", "true"),
                ("showattr", "true"),
                ("format", "fulltext"),
            ],
        )?;

        read_fetch_body(BufReader::new(response)).map_err(|source| StoreError::Response {
            url: url.clone(),
            source,
        })
    }

    fn delete_older(
        &self,
        cell: &str,
        selector: &str,
        write_token: &str,
        instant: i64,
    ) -> Result<String, StoreError> {
        let url = &self.cell(cell)?.delete_endpoint;
        let end = instant.to_string();
        let start = MIN_INSTANT.to_string();
        let response = self.get(
            url,
            write_token,
            &[("selector", selector), ("end", end.as_str()), ("start", start.as_str())],
        )?;
        Self::text(url, response)
    }

    fn delete_all(
        &self,
        cell: &str,
        selector: &str,
        write_token: &str,
    ) -> Result<String, StoreError> {
        let url = &self.cell(cell)?.delete_endpoint;
        let response = self.get(
            url,
            write_token,
            &[("selector", selector), ("deleteall", "true")],
        )?;
        Self::text(url, response)
    }

    fn update_meta(
        &self,
        cell: &str,
        write_token: &str,
        body: &str,
    ) -> Result<String, StoreError> {
        let url = &self.cell(cell)?.meta_endpoint;
        debug!("POST {} ({} bytes)", url, body.len());
        let request = self
            .http
            .post(url)
            .header(TOKEN_HEADER, write_token)
            .body(body.to_string());
        let response = self.send(url, request)?;
        Self::text(url, response)
    }
}
