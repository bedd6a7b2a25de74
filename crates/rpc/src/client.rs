//! Authenticated XML-RPC connection to an OpenERP server.
//!
//! OpenERP 7 exposes two services: `/xmlrpc/common` for login and version queries, and
//! `/xmlrpc/object` where every model method is reached through
//! `execute(db, uid, password, model, method, *args)`.

use crate::codec::{decode_response, encode_call};
use crate::value::Value;
use crate::{RpcError, RpcResult};
use eobs_types::NonEmptyText;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::fmt;

const COMMON_ENDPOINT: &str = "xmlrpc/common";
const OBJECT_ENDPOINT: &str = "xmlrpc/object";

/// Server address and credentials.
#[derive(Clone)]
pub struct ConnectionConfig {
    server: String,
    database: NonEmptyText,
    user: NonEmptyText,
    password: String,
}

impl ConnectionConfig {
    /// Create a new `ConnectionConfig`.
    ///
    /// `server` must be an `http://` or `https://` base URL; a trailing slash is dropped.
    pub fn new(
        server: impl Into<String>,
        database: impl AsRef<str>,
        user: impl AsRef<str>,
        password: impl Into<String>,
    ) -> RpcResult<Self> {
        let server = server.into().trim().trim_end_matches('/').to_string();
        if !(server.starts_with("http://") || server.starts_with("https://")) {
            return Err(RpcError::InvalidConfig(format!(
                "server '{server}' must start with http:// or https://"
            )));
        }

        let database = NonEmptyText::new(database)
            .map_err(|_| RpcError::InvalidConfig("database cannot be empty".into()))?;
        let user = NonEmptyText::new(user)
            .map_err(|_| RpcError::InvalidConfig("user cannot be empty".into()))?;

        Ok(Self {
            server,
            database,
            user,
            password: password.into(),
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    pub fn database(&self) -> &str {
        self.database.as_str()
    }

    pub fn user(&self) -> &str {
        self.user.as_str()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.server)
    }

    fn connection_error(&self, reason: impl Into<String>) -> RpcError {
        RpcError::Connection {
            server: self.server.clone(),
            database: self.database().to_string(),
            user: self.user().to_string(),
            reason: reason.into(),
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("server", &self.server)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A logged-in session.
pub struct OpenErpClient {
    http: Client,
    config: ConnectionConfig,
    uid: i64,
}

impl fmt::Debug for OpenErpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenErpClient")
            .field("config", &self.config)
            .field("uid", &self.uid)
            .finish()
    }
}

impl OpenErpClient {
    /// Logs in through `/xmlrpc/common`.
    ///
    /// Any failure, including a rejected login, is reported as [`RpcError::Connection`].
    pub fn connect(config: ConnectionConfig) -> RpcResult<Self> {
        let http = Client::builder()
            .build()
            .map_err(|e| config.connection_error(e.to_string()))?;

        let params = [
            Value::from(config.database()),
            Value::from(config.user()),
            Value::from(config.password.as_str()),
        ];
        let uid = match call(&http, &config.endpoint(COMMON_ENDPOINT), "login", &params) {
            Ok(Value::Int(uid)) => uid,
            Ok(other) if other.is_falsy() => {
                return Err(config.connection_error("credentials rejected"))
            }
            Ok(other) => {
                return Err(config.connection_error(format!("unexpected login result {other:?}")))
            }
            Err(e) => return Err(config.connection_error(e.to_string())),
        };

        tracing::info!(
            server = config.server(),
            database = config.database(),
            user = config.user(),
            uid,
            "connected"
        );
        Ok(Self { http, config, uid })
    }

    pub fn uid(&self) -> i64 {
        self.uid
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Server version string from `/xmlrpc/common` `version`.
    pub fn server_version(&self) -> RpcResult<String> {
        version_of(&self.http, &self.config)
    }

    /// Proxy for calling methods on one model.
    pub fn model(&self, name: impl Into<String>) -> ModelProxy<'_> {
        ModelProxy {
            client: self,
            model: name.into(),
        }
    }
}

/// Calls on a single model, e.g. `nh.eobs.demo.loader`.
pub struct ModelProxy<'a> {
    client: &'a OpenErpClient,
    model: String,
}

impl ModelProxy<'_> {
    pub fn name(&self) -> &str {
        &self.model
    }

    /// Calls `method` with `args` passed through unchanged.
    pub fn execute(&self, method: &str, args: Vec<Value>) -> RpcResult<Value> {
        let config = &self.client.config;
        let mut params = vec![
            Value::from(config.database()),
            Value::Int(self.client.uid),
            Value::from(config.password.as_str()),
            Value::from(self.model.as_str()),
            Value::from(method),
        ];
        params.extend(args);

        tracing::debug!(model = %self.model, method, "execute");
        call(
            &self.client.http,
            &config.endpoint(OBJECT_ENDPOINT),
            "execute",
            &params,
        )
    }

    /// Ids of the records matching `domain`.
    pub fn search(&self, domain: Vec<Value>) -> RpcResult<Vec<i64>> {
        let result = self.execute("search", vec![Value::Array(domain)])?;
        result
            .as_array()
            .and_then(|ids| ids.iter().map(Value::as_i64).collect::<Option<Vec<_>>>())
            .ok_or_else(|| RpcError::Malformed(format!("search returned {result:?}")))
    }

    /// Number of records matching `domain`.
    pub fn search_count(&self, domain: Vec<Value>) -> RpcResult<i64> {
        let result = self.execute("search_count", vec![Value::Array(domain)])?;
        result
            .as_i64()
            .ok_or_else(|| RpcError::Malformed(format!("search_count returned {result:?}")))
    }
}

/// Queries the server version without logging in.
pub fn server_version(config: &ConnectionConfig) -> RpcResult<String> {
    let http = Client::builder()
        .build()
        .map_err(|e| config.connection_error(e.to_string()))?;
    version_of(&http, config)
}

fn version_of(http: &Client, config: &ConnectionConfig) -> RpcResult<String> {
    let value = call(http, &config.endpoint(COMMON_ENDPOINT), "version", &[])?;
    let version = match &value {
        Value::String(version) => Some(version.clone()),
        Value::Struct(_) => value
            .get("server_version")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    };
    version.ok_or_else(|| RpcError::Malformed(format!("unexpected version result {value:?}")))
}

fn call(http: &Client, url: &str, method: &str, params: &[Value]) -> RpcResult<Value> {
    let body = encode_call(method, params)?;
    let response = http
        .post(url)
        .header(CONTENT_TYPE, "text/xml")
        .body(body)
        .send()
        .map_err(|source| RpcError::Http {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(RpcError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let text = response.text().map_err(|source| RpcError::Http {
        url: url.to_string(),
        source,
    })?;
    decode_response(&text)
}
