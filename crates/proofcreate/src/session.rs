//! Explicit session state: who is acting, and through which connection.
//!
//! A [`Session`] is passed into every workflow call. It pairs the current
//! identity with the ledger connection opened for it. Switching accounts
//! changes the identity but keeps the old connection, so any operation
//! issued before reconnecting fails with [`ProofError::StaleSession`]
//! instead of acting as the previous account.

use std::fmt;
use std::sync::Arc;

use proofcreate_core::Identity;
use proofcreate_ledger::{Connector, LedgerClient};
use tracing::{debug, info};

use crate::error::{ProofError, Result};

struct Connection {
    client: Arc<dyn LedgerClient>,
    /// Identity the connection was opened for; `None` for read-only.
    opened_for: Option<Identity>,
}

/// Per-user session state.
pub struct Session {
    identity: Option<Identity>,
    connection: Option<Connection>,
}

impl Session {
    /// A session without an identity. It can only read.
    pub fn anonymous() -> Self {
        Self {
            identity: None,
            connection: None,
        }
    }

    /// A session for an authenticated identity, not yet connected.
    pub fn authenticated(identity: Identity) -> Self {
        Self {
            identity: Some(identity),
            connection: None,
        }
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Apply an account change from the authentication collaborator.
    ///
    /// `None` (no accounts) makes the session anonymous. The existing
    /// connection is kept but no longer usable until [`Session::connect`]
    /// re-acquires one.
    pub fn set_identity(&mut self, identity: Option<Identity>) {
        if self.identity != identity {
            info!(
                from = ?self.identity,
                to = ?identity,
                "session identity changed"
            );
            self.identity = identity;
        }
    }

    /// Open a connection for the current identity, replacing any existing one.
    ///
    /// Anonymous sessions get a read-only connection.
    pub async fn connect(&mut self, connector: &dyn Connector) -> Result<()> {
        let client = match &self.identity {
            Some(identity) => connector.connect(identity).await?,
            None => connector.connect_read_only().await?,
        };
        self.attach(client);
        Ok(())
    }

    /// Bind an already-open client to the current identity.
    pub fn attach(&mut self, client: Arc<dyn LedgerClient>) {
        debug!(identity = ?self.identity, signer = ?client.signer(), "session connected");
        self.connection = Some(Connection {
            client,
            opened_for: self.identity,
        });
    }

    /// Drop the connection.
    pub fn disconnect(&mut self) {
        self.connection = None;
    }

    /// The connection, checked against the current identity.
    ///
    /// `Ok(None)` means the session has no connection at all.
    pub(crate) fn current_client(&self) -> Result<Option<Arc<dyn LedgerClient>>> {
        let Some(connection) = &self.connection else {
            return Ok(None);
        };

        if connection.opened_for != self.identity {
            return Err(ProofError::StaleSession(format!(
                "connection opened for {}, current identity is {}",
                describe(connection.opened_for),
                describe(self.identity)
            )));
        }

        if let Some(identity) = &self.identity {
            if connection.client.signer() != Some(identity.address()) {
                return Err(ProofError::StaleSession(format!(
                    "ledger signer {} does not match identity {}",
                    connection
                        .client
                        .signer()
                        .map(|a| a.short())
                        .unwrap_or_else(|| "none".into()),
                    identity.address().short()
                )));
            }
        }

        Ok(Some(Arc::clone(&connection.client)))
    }

    /// A client able to submit claims for the current identity.
    pub(crate) fn signing_client(&self) -> Result<Arc<dyn LedgerClient>> {
        if self.identity.is_none() {
            return Err(ProofError::NotAuthenticated);
        }
        self.current_client()?.ok_or(ProofError::NotConnected)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("identity", &self.identity)
            .field("connected", &self.is_connected())
            .finish()
    }
}

fn describe(identity: Option<Identity>) -> String {
    identity
        .map(|i| i.address().short())
        .unwrap_or_else(|| "anonymous".into())
}

/// How read-only workflows obtain a connection when the session has none.
#[derive(Clone, Default)]
pub enum ReadFallback {
    /// Fail with [`ProofError::NotConnected`].
    #[default]
    Disabled,
    /// Open a read-only connection through this connector.
    Connector(Arc<dyn Connector>),
}

impl ReadFallback {
    pub fn connector(connector: Arc<dyn Connector>) -> Self {
        ReadFallback::Connector(connector)
    }

    /// A client for reads: the session's connection, else the fallback.
    pub(crate) async fn read_client(&self, session: &Session) -> Result<Arc<dyn LedgerClient>> {
        if let Some(client) = session.current_client()? {
            return Ok(client);
        }
        match self {
            ReadFallback::Disabled => Err(ProofError::NotConnected),
            ReadFallback::Connector(connector) => {
                debug!("using read-only fallback connection");
                Ok(connector.connect_read_only().await?)
            }
        }
    }
}

impl fmt::Debug for ReadFallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadFallback::Disabled => write!(f, "ReadFallback::Disabled"),
            ReadFallback::Connector(_) => write!(f, "ReadFallback::Connector(..)"),
        }
    }
}
