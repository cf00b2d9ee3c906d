//! Shared scripted transport for the dispatch integration tests.
//!
//! The stub records every lifecycle call and can be told to fail specific
//! steps or specific recipients. The optional semaphore gates let a test
//! park the worker inside `connect` or `submit` and step it forward one
//! permit at a time, which makes cancellation timing deterministic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use lettre::Message;
use tokio::sync::Semaphore;

use mailburst::dispatch::{
    DispatchEngine, DispatchEvent, DispatchEvents, DispatchRequest, MailTransport, TransportError,
    TransportFactory,
};
use mailburst::models::{EncryptionMode, TransportSettings};

#[derive(Clone, Default)]
pub struct StubBehavior {
    pub fail_connect: bool,
    pub fail_auth: bool,
    /// Recipients whose submission is rejected with a 550.
    pub fail_recipients: Vec<String>,
    /// When set, `connect` consumes one permit before proceeding.
    pub connect_gate: Option<Arc<Semaphore>>,
    /// When set, `submit` consumes one permit before proceeding.
    pub submit_gate: Option<Arc<Semaphore>>,
}

/// One accepted submission, as the server would have seen it.
pub struct SubmittedMail {
    pub recipient: String,
    pub raw: Vec<u8>,
}

/// Counters shared between a test and every transport the factory creates.
#[derive(Default)]
pub struct StubState {
    pub created: AtomicUsize,
    pub connect_calls: AtomicUsize,
    pub auth_calls: AtomicUsize,
    pub submit_calls: AtomicUsize,
    pub close_calls: AtomicUsize,
    pub submitted: Mutex<Vec<SubmittedMail>>,
}

pub struct StubTransportFactory {
    behavior: StubBehavior,
    state: Arc<StubState>,
}

impl TransportFactory for StubTransportFactory {
    fn create(&self) -> Box<dyn MailTransport> {
        self.state.created.fetch_add(1, Ordering::SeqCst);
        Box::new(StubTransport {
            behavior: self.behavior.clone(),
            state: self.state.clone(),
        })
    }
}

struct StubTransport {
    behavior: StubBehavior,
    state: Arc<StubState>,
}

#[async_trait]
impl MailTransport for StubTransport {
    async fn connect(&mut self, _settings: &TransportSettings) -> Result<(), TransportError> {
        if let Some(gate) = &self.behavior.connect_gate {
            gate.acquire().await.unwrap().forget();
        }
        self.state.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.behavior.fail_connect {
            return Err(TransportError::Connect("connection refused".to_string()));
        }
        Ok(())
    }

    async fn authenticate(
        &mut self,
        _username: &str,
        _password: &str,
    ) -> Result<(), TransportError> {
        self.state.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.behavior.fail_auth {
            return Err(TransportError::Auth("535 bad credentials".to_string()));
        }
        Ok(())
    }

    async fn submit(&mut self, message: &Message) -> Result<(), TransportError> {
        if let Some(gate) = &self.behavior.submit_gate {
            gate.acquire().await.unwrap().forget();
        }
        self.state.submit_calls.fetch_add(1, Ordering::SeqCst);
        let recipient = message
            .envelope()
            .to()
            .first()
            .map(ToString::to_string)
            .unwrap_or_default();
        if self.behavior.fail_recipients.contains(&recipient) {
            return Err(TransportError::Send("550 mailbox unavailable".to_string()));
        }
        self.state.submitted.lock().unwrap().push(SubmittedMail {
            recipient,
            raw: message.formatted(),
        });
        Ok(())
    }

    async fn close(&mut self) {
        self.state.close_calls.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn engine_with(behavior: StubBehavior) -> (DispatchEngine, Arc<StubState>) {
    let state = Arc::new(StubState::default());
    let engine = DispatchEngine::with_transport_factory(Arc::new(StubTransportFactory {
        behavior,
        state: state.clone(),
    }));
    (engine, state)
}

pub fn settings() -> TransportSettings {
    TransportSettings {
        host: "smtp.example.com".to_string(),
        port: 587,
        encryption: EncryptionMode::StartTls,
        username: "mailer@example.com".to_string(),
        password: "secret".to_string(),
    }
}

pub fn request(recipients: &[&str]) -> DispatchRequest {
    DispatchRequest {
        settings: settings(),
        recipients: recipients.iter().map(|r| r.to_string()).collect(),
        subject: "Greetings".to_string(),
        body: "Hello".to_string(),
        attachments: Vec::new(),
    }
}

/// Collects the whole event stream; terminates because every run ends with
/// `Finished` and then closes the channel.
pub async fn drain(mut events: DispatchEvents) -> Vec<DispatchEvent> {
    let mut collected = Vec::new();
    while let Some(event) = events.recv().await {
        collected.push(event);
    }
    collected
}
