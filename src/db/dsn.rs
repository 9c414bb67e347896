//! MySQL DSN handling.
//!
//! Connections are configured with driver-style DSNs,
//! `user:password@tcp(host:port)/database?param=value&…`. This module masks
//! them for display, applies the configured TLS mode, and turns them into
//! [`MySqlConnectOptions`] for sqlx.

use crate::error::{DbError, DbResult};
use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};
use tracing::debug;

/// Replacement for the password span in a masked DSN.
pub const MASK: &str = "***";

const DEFAULT_ADDR: &str = "127.0.0.1:3306";
const DEFAULT_PORT: u16 = 3306;
const DEFAULT_CHARSET: &str = "utf8mb4";

/// Mask the password segment of a DSN.
///
/// Everything between the first `:` and the last `@` is replaced with
/// [`MASK`]. The last `@` is used because passwords may contain `@`. A DSN
/// without both separators, in that order, is returned unchanged.
///
/// # Examples
///
/// ```
/// use mysql_mcp_server::db::dsn::mask_dsn;
///
/// assert_eq!(
///     mask_dsn("app:s3cr@t@tcp(db:3306)/shop"),
///     "app:***@tcp(db:3306)/shop"
/// );
/// ```
pub fn mask_dsn(dsn: &str) -> String {
    match (dsn.find(':'), dsn.rfind('@')) {
        (Some(colon), Some(at)) if colon < at => {
            format!("{}{}{}", &dsn[..=colon], MASK, &dsn[at..])
        }
        _ => dsn.to_string(),
    }
}

/// Map a configured SSL setting to the DSN `tls` value. `None` means TLS is off.
fn tls_value(ssl: &str) -> Option<&'static str> {
    match ssl.trim().to_lowercase().as_str() {
        "" | "false" | "0" => None,
        "skip-verify" => Some("skip-verify"),
        "preferred" => Some("preferred"),
        _ => Some("true"),
    }
}

/// Apply a TLS mode to a DSN.
///
/// An empty, `false` or `0` setting leaves the DSN alone, as does a DSN whose
/// query string already carries `tls=`. Otherwise `tls=<mode>` is appended.
/// Unknown non-empty settings mean `true`.
pub fn apply_tls_mode(dsn: &str, ssl: &str) -> String {
    let Some(mode) = tls_value(ssl) else {
        return dsn.to_string();
    };

    match dsn.find('?') {
        Some(q) => {
            let query = &dsn[q + 1..];
            if query.split('&').any(|kv| kv.starts_with("tls=")) {
                return dsn.to_string();
            }
            if query.is_empty() || query.ends_with('&') {
                format!("{}tls={}", dsn, mode)
            } else {
                format!("{}&tls={}", dsn, mode)
            }
        }
        None => format!("{}?tls={}", dsn, mode),
    }
}

/// Network part of a DSN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DsnAddress {
    Tcp { host: String, port: u16 },
    Unix { socket: String },
}

/// A parsed DSN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dsn {
    pub user: Option<String>,
    pub password: Option<String>,
    pub address: DsnAddress,
    pub database: Option<String>,
    pub params: Vec<(String, String)>,
}

impl Dsn {
    /// Parse `[user[:password]@][net[(addr)]]/dbname[?param=value&…]`.
    pub fn parse(dsn: &str) -> DbResult<Self> {
        let invalid = |reason: &str| {
            DbError::connection(
                format!("Invalid DSN '{}': {}", mask_dsn(dsn), reason),
                "Use the form user:password@tcp(host:port)/database?param=value",
            )
        };

        // The last '/' separates the database; the password or a unix socket
        // path may contain '/' too.
        let (head, tail) = dsn
            .rsplit_once('/')
            .ok_or_else(|| invalid("missing '/' before the database name"))?;

        let (database, query) = match tail.split_once('?') {
            Some((db, query)) => (db, Some(query)),
            None => (tail, None),
        };

        let (credentials, net) = match head.rfind('@') {
            Some(at) => (Some(&head[..at]), &head[at + 1..]),
            None => (None, head),
        };

        let (user, password) = match credentials {
            Some(creds) => match creds.split_once(':') {
                Some((u, p)) => (Some(u.to_string()), Some(p.to_string())),
                None => (Some(creds.to_string()), None),
            },
            None => (None, None),
        };

        let address = parse_address(net).map_err(|reason| invalid(&reason))?;

        let params = query
            .unwrap_or_default()
            .split('&')
            .filter(|kv| !kv.is_empty())
            .map(|kv| match kv.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (kv.to_string(), String::new()),
            })
            .collect();

        Ok(Self {
            user: user.filter(|u| !u.is_empty()),
            password,
            address,
            database: Some(database.to_string()).filter(|d| !d.is_empty()),
            params,
        })
    }

    /// Value of a query-string parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// SSL mode requested by the `tls` parameter.
    pub fn ssl_mode(&self) -> MySqlSslMode {
        match self.param("tls").map(str::to_lowercase).as_deref() {
            Some("true") => MySqlSslMode::VerifyIdentity,
            Some("skip-verify") => MySqlSslMode::Required,
            Some("preferred") => MySqlSslMode::Preferred,
            _ => MySqlSslMode::Disabled,
        }
    }

    /// Build sqlx connect options.
    pub fn connect_options(&self) -> MySqlConnectOptions {
        let mut options = MySqlConnectOptions::new();

        options = match &self.address {
            DsnAddress::Tcp { host, port } => options.host(host).port(*port),
            DsnAddress::Unix { socket } => options.socket(socket),
        };
        if let Some(user) = &self.user {
            options = options.username(user);
        }
        if let Some(password) = &self.password {
            options = options.password(password);
        }
        if let Some(database) = &self.database {
            options = options.database(database);
        }

        let charset = self.param("charset").unwrap_or(DEFAULT_CHARSET);
        options = options.charset(charset).ssl_mode(self.ssl_mode());

        for (key, _) in &self.params {
            if !matches!(key.as_str(), "tls" | "charset") {
                debug!(param = %key, "Ignoring unsupported DSN parameter");
            }
        }

        options
    }

    /// Short `host:port/database` summary, free of credentials.
    pub fn summary(&self) -> String {
        let addr = match &self.address {
            DsnAddress::Tcp { host, port } => format!("{}:{}", host, port),
            DsnAddress::Unix { socket } => socket.clone(),
        };
        match &self.database {
            Some(db) => format!("{}/{}", addr, db),
            None => addr,
        }
    }
}

fn parse_address(net: &str) -> Result<DsnAddress, String> {
    if net.is_empty() {
        return tcp_address(DEFAULT_ADDR);
    }

    let (protocol, addr) = match net.split_once('(') {
        Some((protocol, rest)) => {
            let addr = rest
                .strip_suffix(')')
                .ok_or_else(|| "address must be wrapped in parentheses".to_string())?;
            (protocol, addr)
        }
        None => (net, ""),
    };

    match protocol {
        "tcp" | "" => tcp_address(if addr.is_empty() { DEFAULT_ADDR } else { addr }),
        "unix" if !addr.is_empty() => Ok(DsnAddress::Unix {
            socket: addr.to_string(),
        }),
        "unix" => Err("unix address requires a socket path".to_string()),
        other => Err(format!("unsupported network '{}'", other)),
    }
}

fn tcp_address(addr: &str) -> Result<DsnAddress, String> {
    // Bracketed IPv6, e.g. [::1]:3306
    if let Some(rest) = addr.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| "unterminated IPv6 address".to_string())?;
        let port = match after.strip_prefix(':') {
            Some(port) => parse_port(port)?,
            None => DEFAULT_PORT,
        };
        return Ok(DsnAddress::Tcp {
            host: host.to_string(),
            port,
        });
    }

    match addr.rsplit_once(':') {
        Some((host, port)) => Ok(DsnAddress::Tcp {
            host: host.to_string(),
            port: parse_port(port)?,
        }),
        None => Ok(DsnAddress::Tcp {
            host: addr.to_string(),
            port: DEFAULT_PORT,
        }),
    }
}

fn parse_port(port: &str) -> Result<u16, String> {
    port.parse()
        .map_err(|_| format!("invalid port '{}'", port))
}
