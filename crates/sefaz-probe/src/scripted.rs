//! In-process transport with canned replies.
//!
//! Lets the whole engine run without touching the network. Every call is
//! counted per URL so tests can assert on probe volume.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::transport::{Transport, TransportError, TransportRequest, TransportResponse};

/// What the scripted endpoint does when posted to.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Respond { status: u16, body: Bytes },
    Fail(TransportError),
    /// Never answers; the caller's timeout decides.
    Hang,
    Delayed(Duration, Box<ScriptedReply>),
}

impl ScriptedReply {
    /// A 200 reply carrying `cStat`/`xMotivo`.
    pub fn status(code: &str, reason: &str) -> Self {
        Self::Respond {
            status: 200,
            body: Bytes::from(status_reply_xml(code, reason)),
        }
    }

    /// `cStat` 107, "Servico em Operacao".
    pub fn in_operation() -> Self {
        Self::status("107", "Servico em Operacao")
    }

    pub fn http_status(status: u16) -> Self {
        Self::Respond {
            status,
            body: Bytes::new(),
        }
    }

    pub fn body(body: &str) -> Self {
        Self::Respond {
            status: 200,
            body: Bytes::from(body.to_string()),
        }
    }

    pub fn connection_refused() -> Self {
        Self::Fail(TransportError::Connect("connection refused".to_string()))
    }

    pub fn after(self, delay: Duration) -> Self {
        Self::Delayed(delay, Box::new(self))
    }
}

/// A minimal `retConsStatServ` document.
pub fn status_reply_xml(code: &str, reason: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope">
  <soap:Body>
    <nfeResultMsg xmlns="http://www.portalfiscal.inf.br/nfe/wsdl/NFeStatusServico4">
      <retConsStatServ versao="4.00" xmlns="http://www.portalfiscal.inf.br/nfe">
        <cStat>{code}</cStat>
        <xMotivo>{reason}</xMotivo>
      </retConsStatServ>
    </nfeResultMsg>
  </soap:Body>
</soap:Envelope>"#
    )
}

#[derive(Default)]
struct Script {
    posts: HashMap<String, ScriptedReply>,
    reachability: HashMap<String, Result<(), TransportError>>,
    post_calls: HashMap<String, u32>,
    reachability_calls: HashMap<String, u32>,
    last_bodies: HashMap<String, Bytes>,
}

/// Transport answering from a per-URL script.
///
/// Unknown URLs refuse connections. A URL with a post reply is reachable
/// unless reachability was scripted separately.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<Script>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_post(&self, url: &str, reply: ScriptedReply) -> &Self {
        self.lock().posts.insert(url.to_string(), reply);
        self
    }

    pub fn on_reachable(&self, url: &str, outcome: Result<(), TransportError>) -> &Self {
        self.lock().reachability.insert(url.to_string(), outcome);
        self
    }

    pub fn unreachable(&self, url: &str) -> &Self {
        self.on_reachable(
            url,
            Err(TransportError::Connect(format!("{url}: connection refused"))),
        )
    }

    pub fn post_count(&self, url: &str) -> u32 {
        self.lock().post_calls.get(url).copied().unwrap_or(0)
    }

    pub fn reachable_count(&self, url: &str) -> u32 {
        self.lock().reachability_calls.get(url).copied().unwrap_or(0)
    }

    pub fn total_reachable_checks(&self) -> u32 {
        self.lock().reachability_calls.values().sum()
    }

    pub fn total_posts(&self) -> u32 {
        self.lock().post_calls.values().sum()
    }

    /// Body of the most recent request posted to `url`.
    pub fn last_body(&self, url: &str) -> Option<Bytes> {
        self.lock().last_bodies.get(url).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn post(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        let reply = {
            let mut script = self.lock();
            *script.post_calls.entry(request.url.clone()).or_default() += 1;
            script
                .last_bodies
                .insert(request.url.clone(), request.body.clone());
            script.posts.get(&request.url).cloned()
        };

        let mut reply = reply.unwrap_or_else(|| {
            ScriptedReply::Fail(TransportError::Connect(format!(
                "{}: connection refused",
                request.url
            )))
        });

        loop {
            match reply {
                ScriptedReply::Respond { status, body } => {
                    return Ok(TransportResponse { status, body });
                }
                ScriptedReply::Fail(e) => return Err(e),
                ScriptedReply::Hang => return std::future::pending().await,
                ScriptedReply::Delayed(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }

    async fn reachable(&self, url: &str) -> Result<(), TransportError> {
        let mut script = self.lock();
        *script.reachability_calls.entry(url.to_string()).or_default() += 1;
        if let Some(outcome) = script.reachability.get(url) {
            return outcome.clone();
        }
        if script.posts.contains_key(url) {
            Ok(())
        } else {
            Err(TransportError::Connect(format!("{url}: connection refused")))
        }
    }
}
