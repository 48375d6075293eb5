//! Startup and authentication phase.
//!
//! <https://www.postgresql.org/docs/current/protocol-flow.html#PROTOCOL-FLOW-START-UP>
use std::{borrow::Cow, fmt};

use md5::{Digest, Md5};

use super::{Connection, ConfigError, State};
use crate::{
    Result,
    common::verbose,
    postgres::{
        BackendMessage, FrontendMessage,
        backend::Authentication,
        frontend::{PasswordMessage, Startup},
    },
};

/// Parameters of the startup phase.
#[derive(Debug, Clone)]
pub struct StartupConfig<'a> {
    pub(crate) user: Cow<'a, str>,
    pub(crate) database: Option<Cow<'a, str>>,
    pub(crate) password: Option<Cow<'a, str>>,
    pub(crate) params: Vec<(Cow<'a, str>, Cow<'a, str>)>,
}

impl<'a> StartupConfig<'a> {
    pub fn new(user: impl Into<Cow<'a, str>>) -> Self {
        Self { user: user.into(), database: None, password: None, params: vec![] }
    }

    /// The database to connect to, defaults to the user name.
    pub fn database(mut self, database: impl Into<Cow<'a, str>>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Password for cleartext or md5 authentication, empty password is ignored.
    pub fn password(mut self, password: impl Into<Cow<'a, str>>) -> Self {
        let password = password.into();
        self.password = (!password.is_empty()).then_some(password);
        self
    }

    /// Additional run-time parameter, e.g. `application_name`.
    pub fn param(mut self, key: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, str>>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    fn startup_message(&self) -> Startup {
        let mut startup = Startup::new(&self.user, self.database.as_deref());
        for (key, value) in &self.params {
            startup.params.push((key.clone().into_owned(), value.clone().into_owned()));
        }
        startup
    }

    fn require_password(&self, method: &'static str) -> Result<&str, AuthError> {
        self.password.as_deref().ok_or(AuthError::PasswordRequired(method))
    }
}

/// Compute the md5 password message.
///
/// `"md5" + hex(md5(hex(md5(password + user)) + salt))`
pub fn md5_password(user: &str, password: &str, salt: [u8; 4]) -> String {
    let mut md5 = Md5::new();
    md5.update(password);
    md5.update(user);
    let inner = hex(&md5.finalize_reset());

    md5.update(&inner);
    md5.update(salt);
    let mut output = String::with_capacity(35);
    output.push_str("md5");
    output.push_str(&hex(&md5.finalize()));
    output
}

fn hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0xf) as usize] as char);
    }
    out
}

impl Connection {
    /// Perform the startup phase.
    ///
    /// Sends `StartupMessage`, answers the authentication request, then waits for
    /// `ReadyForQuery` while storing `ParameterStatus` and `BackendKeyData`.
    pub async fn authenticate(&mut self, config: impl Into<StartupConfig<'_>>) -> Result<()> {
        let config = config.into();
        verbose!(user = %config.user, "authenticate");
        self.ensure_state(&[State::Connecting, State::Authenticating])?;
        self.state = State::Authenticating;

        let result = self.authenticate_inner(&config).await;
        match &result {
            Ok(()) => self.state = State::Idle,
            Err(_) => self.state = State::Closed,
        }
        result
    }

    async fn authenticate_inner(&mut self, config: &StartupConfig<'_>) -> Result<()> {
        self.stream.send(&FrontendMessage::Startup(config.startup_message()));
        self.stream.flush().await?;

        loop {
            let auth = match self.recv().await? {
                BackendMessage::Authentication(auth) => auth,
                BackendMessage::ErrorResponse(err) => return Err(err.0.into()),
                BackendMessage::NegotiateProtocolVersion(_) => continue,
                message => return Err(message.unexpected("authentication").into()),
            };

            verbose!("authentication method: {}", auth.method_name());

            let password = match auth {
                Authentication::Ok => {
                    if config.password.is_some() {
                        return Err(ConfigError::new(
                            "password supplied but server did not request authentication",
                        )
                        .into());
                    }
                    break;
                },
                Authentication::CleartextPassword => {
                    config.require_password("cleartext")?.to_owned()
                },
                Authentication::MD5Password { salt } => {
                    let password = config.require_password("md5")?;
                    md5_password(&config.user, password, salt)
                },
                other => return Err(AuthError::Unsupported(other.method_name()).into()),
            };

            self.stream.send(&FrontendMessage::Password(PasswordMessage { password }));
            self.stream.flush().await?;

            match self.recv().await? {
                BackendMessage::Authentication(Authentication::Ok) => break,
                BackendMessage::ErrorResponse(err) => return Err(err.0.into()),
                message => return Err(message.unexpected("authentication").into()),
            }
        }

        loop {
            match self.recv().await? {
                BackendMessage::BackendKeyData(key) => self.key_data = Some(key),
                BackendMessage::ReadyForQuery(ready) => {
                    self.status = ready.status;
                    return Ok(());
                },
                BackendMessage::ErrorResponse(err) => return Err(err.0.into()),
                message => return Err(message.unexpected("startup").into()),
            }
        }
    }
}

/// An error when authentication or TLS negotiation failed.
pub enum AuthError {
    /// Server request authentication method that is not supported.
    Unsupported(&'static str),
    /// Server request password but none supplied.
    PasswordRequired(&'static str),
    /// TLS is required but server refuse it.
    TlsRejected,
    /// TLS is required but `tls` feature is disabled.
    TlsUnavailable,
    /// TLS handshake failed.
    #[cfg(feature = "tls")]
    Tls(native_tls::Error),
}

impl std::error::Error for AuthError { }

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported(method) => write!(f, "unsupported authentication method: {method}"),
            Self::PasswordRequired(method) => write!(f, "password required for {method} authentication"),
            Self::TlsRejected => f.write_str("TLS is required but server does not support it"),
            Self::TlsUnavailable => f.write_str("TLS is required but `tls` feature is disabled"),
            #[cfg(feature = "tls")]
            Self::Tls(e) => write!(f, "TLS handshake failed: {e}"),
        }
    }
}

impl fmt::Debug for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}
