//! The service handler.
//!
//! A [`ServiceHandler`] speaks one service over one channel end, as either the
//! block or the embedder. It validates every registration and send against the
//! service's [`ServiceCatalog`], correlates requests with responses by
//! `requestId`, and runs the `init`/`initResponse` handshake:
//!
//! 1. The block calls [`ServiceHandler::initialize`], which sends `init`.
//! 2. The embedder answers `initResponse` with the latest value of every
//!    message marked `sent_on_initialization`.
//! 3. The block hands each of those values to its registered callbacks.
//!
//! Both sides hold outbound application messages in a queue until their half
//! of the handshake is done, then flush it in order. Inbound application
//! messages that arrive early are held the same way and dispatched once the
//! handshake completes.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use crate::catalog::{ErrorKind, MessageDefinition, MessageKind, ServiceCatalog};
use crate::channel::{Channel, Envelope, Subscription};
use crate::config::ServiceConfig;
use crate::error::{Result, ServiceError};
use crate::message::{
    response_name, ErrorCode, Message, MessageData, MessageReturn, SourceRole, INIT, INIT_RESPONSE,
};

/// Handles one inbound message.
///
/// For notifications the returned value is ignored. For requests it becomes
/// the response and must carry exactly one of data or errors.
#[async_trait]
pub trait MessageCallback: Send + Sync {
    async fn call(&self, message: MessageData) -> MessageData;
}

#[async_trait]
impl<F, Fut> MessageCallback for F
where
    F: Fn(MessageData) -> Fut + Send + Sync,
    Fut: Future<Output = MessageData> + Send,
{
    async fn call(&self, message: MessageData) -> MessageData {
        (self)(message).await
    }
}

struct PendingRequest {
    expected_response: String,
    tx: oneshot::Sender<Result<MessageData>>,
}

#[derive(Default)]
struct State {
    callbacks: HashMap<&'static str, Arc<dyn MessageCallback>>,
    pending: HashMap<String, PendingRequest>,
    queue: VecDeque<Message>,
    /// Inbound messages received before the handshake completed.
    inbox: VecDeque<Message>,
    /// Latest value of each `sent_on_initialization` message (embedder only).
    init_values: BTreeMap<&'static str, Value>,
    init_sent: bool,
    initialized: bool,
    destroyed: bool,
}

struct Shared {
    catalog: &'static ServiceCatalog,
    role: SourceRole,
    config: ServiceConfig,
    channel: Arc<dyn Channel>,
    state: Mutex<State>,
    ready: watch::Sender<bool>,
}

/// One service spoken over one channel end.
pub struct ServiceHandler {
    shared: Arc<Shared>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl ServiceHandler {
    /// Subscribe to `channel` and start listening.
    ///
    /// Must be called from within a Tokio runtime. Register callbacks with
    /// [`on`](Self::on) before calling [`initialize`](Self::initialize), or
    /// values delivered by the handshake may be missed.
    pub fn new(
        catalog: &'static ServiceCatalog,
        role: SourceRole,
        channel: Arc<dyn Channel>,
        config: ServiceConfig,
    ) -> Self {
        let subscription = channel.subscribe();
        let shared = Arc::new(Shared {
            catalog,
            role,
            config,
            channel,
            state: Mutex::new(State::default()),
            ready: watch::channel(false).0,
        });
        let listener = tokio::spawn(listen(Arc::downgrade(&shared), subscription));
        debug!(service = catalog.service_name, %role, "service handler started");

        Self {
            shared,
            listener: Mutex::new(Some(listener)),
        }
    }

    pub fn service_name(&self) -> &'static str {
        self.shared.catalog.service_name
    }

    pub fn role(&self) -> SourceRole {
        self.shared.role
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.lock().initialized
    }

    /// Register the callback for an inbound message.
    ///
    /// Fails if the catalog has no such message sent by the other side.
    /// Replaces any earlier callback for the same message.
    pub fn on<C>(&self, message_name: &str, callback: C) -> Result<()>
    where
        C: MessageCallback + 'static,
    {
        let sender = self.shared.role.peer();
        let def = self.shared.definition(message_name, sender)?;
        let mut state = self.shared.lock();
        if state.destroyed {
            return Err(self.shared.destroyed());
        }
        state.callbacks.insert(def.message_name, Arc::new(callback));
        Ok(())
    }

    /// Remove the callback for an inbound message, if any.
    pub fn off(&self, message_name: &str) {
        self.shared.lock().callbacks.remove(message_name);
    }

    /// Send a notification.
    ///
    /// On the embedder, a `sent_on_initialization` notification is also
    /// remembered for the handshake. Sent before the handshake, it is
    /// delivered only as part of `initResponse`.
    pub fn send(&self, message_name: &str, data: Value) -> Result<()> {
        let def = self.shared.definition(message_name, self.shared.role)?;
        if def.is_request() {
            return Err(ServiceError::NotANotification(message_name.to_string()));
        }

        let mut state = self.shared.lock();
        if state.destroyed {
            return Err(self.shared.destroyed());
        }
        if self.shared.role == SourceRole::Embedder && def.sent_on_initialization {
            state.init_values.insert(def.message_name, data.clone());
            if !state.initialized {
                return Ok(());
            }
        }
        let message = self.shared.message(def.message_name).with_data(data);
        self.shared.post(&mut state, message)
    }

    /// Send a request and wait for its response.
    ///
    /// Resolves to the response data or the resource errors the other side
    /// reported. Protocol violations (a malformed response, an error code the
    /// request may not fail with) are returned as [`ServiceError`]s. Dropping
    /// the future abandons the request; a late response is then ignored.
    pub async fn request(&self, message_name: &str, data: Value) -> Result<MessageReturn<Value>> {
        let def = self.shared.definition(message_name, self.shared.role)?;
        let MessageKind::Request { errors } = def.kind else {
            return Err(ServiceError::NotARequest(message_name.to_string()));
        };

        let request_id = Uuid::new_v4().to_string();
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.shared.lock();
            if state.destroyed {
                return Err(self.shared.destroyed());
            }
            state.pending.insert(
                request_id.clone(),
                PendingRequest {
                    expected_response: response_name(def.message_name),
                    tx,
                },
            );
            let message = self
                .shared
                .message(def.message_name)
                .with_request_id(request_id.clone())
                .with_data(data);
            if let Err(err) = self.shared.post(&mut state, message) {
                state.pending.remove(&request_id);
                return Err(err);
            }
        }
        debug!(service = self.service_name(), message_name, %request_id, "request sent");

        let guard = PendingGuard {
            shared: &self.shared,
            request_id: &request_id,
        };
        let response = rx
            .await
            .map_err(|_| ServiceError::RequestDropped(request_id.clone()))??;
        drop(guard);

        let result = response.into_return(def.message_name)?;
        check_error_codes(def.message_name, errors, &result)?;
        Ok(result)
    }

    /// Start the handshake.
    ///
    /// On the block this sends `init`; calling it again does nothing. On the
    /// embedder the handshake starts when `init` arrives, so this is a no-op.
    pub fn initialize(&self) -> Result<()> {
        if self.shared.role == SourceRole::Embedder {
            return Ok(());
        }
        let mut state = self.shared.lock();
        if state.destroyed {
            return Err(self.shared.destroyed());
        }
        if state.init_sent {
            return Ok(());
        }
        let message = self
            .shared
            .message(INIT)
            .with_request_id(Uuid::new_v4().to_string());
        self.shared.channel.send(message)?;
        state.init_sent = true;
        debug!(service = self.service_name(), "init sent");
        Ok(())
    }

    /// Wait until this side's half of the handshake has completed.
    pub async fn ready(&self) -> Result<()> {
        let mut ready = self.shared.ready.subscribe();
        ready
            .wait_for(|ready| *ready)
            .await
            .map_err(|_| self.shared.destroyed())?;
        Ok(())
    }

    /// Stop listening and refuse further use.
    ///
    /// Requests still waiting for a response are left alone; callers bound
    /// them with their own timeout.
    pub fn destroy(&self) {
        {
            let mut state = self.shared.lock();
            state.destroyed = true;
            state.callbacks.clear();
            state.queue.clear();
            state.inbox.clear();
        }
        self.abort_listener();
        debug!(service = self.service_name(), "service handler destroyed");
    }

    fn abort_listener(&self) {
        let listener = self
            .listener
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(listener) = listener {
            listener.abort();
        }
    }
}

impl Drop for ServiceHandler {
    fn drop(&mut self) {
        self.abort_listener();
    }
}

/// Removes an abandoned request from the pending table.
struct PendingGuard<'a> {
    shared: &'a Shared,
    request_id: &'a str,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.shared.lock().pending.remove(self.request_id);
    }
}

fn check_error_codes(
    message_name: &str,
    allowed: ErrorKind,
    result: &MessageReturn<Value>,
) -> Result<()> {
    if let Err(errors) = result {
        if let Some(error) = errors.iter().find(|error| !allowed.allows(error.code)) {
            return Err(ServiceError::DisallowedErrorCode {
                message_name: message_name.to_string(),
                code: error.code,
            });
        }
    }
    Ok(())
}

async fn listen(shared: Weak<Shared>, mut subscription: Subscription) {
    while let Some(envelope) = subscription.recv().await {
        let Some(shared) = shared.upgrade() else {
            break;
        };
        shared.receive(envelope).await;
    }
    trace!("service listener stopped");
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn destroyed(&self) -> ServiceError {
        ServiceError::Destroyed(self.catalog.service_name.to_string())
    }

    fn message(&self, message_name: &str) -> Message {
        Message::new(self.catalog.service_name, message_name)
    }

    fn definition(
        &self,
        message_name: &str,
        sender: SourceRole,
    ) -> Result<&'static MessageDefinition> {
        self.catalog
            .find(message_name, sender)
            .ok_or_else(|| ServiceError::UnknownMessage {
                service: self.catalog.service_name.to_string(),
                message_name: message_name.to_string(),
                sender,
            })
    }

    /// Send now, or queue until the handshake completes.
    fn post(&self, state: &mut State, message: Message) -> Result<()> {
        if state.initialized {
            return self.channel.send(message);
        }
        if state.queue.len() >= self.config.queue_capacity {
            return Err(ServiceError::QueueFull(state.queue.len()));
        }
        trace!(
            service = self.catalog.service_name,
            message_name = %message.message_name,
            "queued until handshake completes"
        );
        state.queue.push_back(message);
        Ok(())
    }

    fn complete_handshake(&self, state: &mut State) {
        if state.initialized {
            return;
        }
        state.initialized = true;
        while let Some(message) = state.queue.pop_front() {
            if let Err(err) = self.channel.send(message) {
                error!(service = self.catalog.service_name, %err, "failed to flush queued message");
            }
        }
        self.ready.send_replace(true);
        debug!(service = self.catalog.service_name, role = %self.role, "handshake complete");
    }

    async fn receive(self: Arc<Self>, envelope: Envelope) {
        let Envelope { origin, message } = envelope;
        if !self.config.allows_origin(&origin) {
            trace!(%origin, message_name = %message.message_name, "dropping message from disallowed origin");
            return;
        }
        if message.service != self.catalog.service_name {
            trace!(
                service = %message.service,
                message_name = %message.message_name,
                "dropping message for another service"
            );
            return;
        }

        if self.role == SourceRole::Embedder && message.message_name == INIT {
            if self.lock().destroyed {
                return;
            }
            self.answer_init(message);
            self.drain_inbox().await;
            return;
        }
        if self.role == SourceRole::Block && message.message_name == INIT_RESPONSE {
            if self.lock().destroyed {
                return;
            }
            self.accept_init_response(message).await;
            self.drain_inbox().await;
            return;
        }

        {
            let mut state = self.lock();
            if state.destroyed {
                return;
            }
            if !state.initialized {
                if state.inbox.len() >= self.config.queue_capacity {
                    warn!(
                        service = self.catalog.service_name,
                        message_name = %message.message_name,
                        "dropping message received before handshake; inbox full"
                    );
                } else {
                    trace!(
                        service = self.catalog.service_name,
                        message_name = %message.message_name,
                        "holding message until handshake completes"
                    );
                    state.inbox.push_back(message);
                }
                return;
            }
        }
        self.dispatch(message).await;
    }

    /// Dispatch everything held back while the handshake was pending.
    async fn drain_inbox(self: &Arc<Self>) {
        let inbox = {
            let mut state = self.lock();
            if !state.initialized {
                return;
            }
            std::mem::take(&mut state.inbox)
        };
        for message in inbox {
            Arc::clone(self).dispatch(message).await;
        }
    }

    async fn dispatch(self: Arc<Self>, message: Message) {
        if let Some(request_id) = message.request_id.as_deref() {
            if self.settle_pending(request_id, &message) {
                return;
            }
        }
        if self
            .catalog
            .request_for_response(&message.message_name, self.role)
            .is_some()
        {
            warn!(
                message_name = %message.message_name,
                request_id = ?message.request_id,
                "ignoring response with no pending request"
            );
            return;
        }

        let Some(def) = self.catalog.find(&message.message_name, self.role.peer()) else {
            warn!(
                service = self.catalog.service_name,
                message_name = %message.message_name,
                "ignoring message not listed in the catalog"
            );
            return;
        };
        let callback = self.lock().callbacks.get(def.message_name).cloned();

        match def.kind {
            MessageKind::Notification => match callback {
                Some(callback) => {
                    debug!(message_name = def.message_name, "dispatching notification");
                    callback.call(message.into_payload()).await;
                }
                None => debug!(message_name = def.message_name, "no callback for notification"),
            },
            MessageKind::Request { .. } => {
                let Some(request_id) = message.request_id.clone() else {
                    warn!(message_name = def.message_name, "ignoring request without requestId");
                    return;
                };
                let payload = message.into_payload();
                tokio::spawn(self.answer_request(def, request_id, callback, payload));
            }
        }
    }

    /// Hand a response to its waiting request. False if nothing was waiting.
    fn settle_pending(&self, request_id: &str, message: &Message) -> bool {
        let Some(pending) = self.lock().pending.remove(request_id) else {
            return false;
        };
        let outcome = if pending.expected_response == message.message_name {
            Ok(message.payload())
        } else {
            Err(ServiceError::UnexpectedResponse {
                request_id: request_id.to_string(),
                expected: pending.expected_response,
                received: message.message_name.clone(),
            })
        };
        // The requester may have given up already.
        let _ = pending.tx.send(outcome);
        true
    }

    async fn answer_request(
        self: Arc<Self>,
        def: &'static MessageDefinition,
        request_id: String,
        callback: Option<Arc<dyn MessageCallback>>,
        payload: MessageData,
    ) {
        debug!(message_name = def.message_name, %request_id, "handling request");
        let response = match callback {
            Some(callback) => callback.call(payload).await,
            None => {
                warn!(message_name = def.message_name, "no callback registered for request");
                MessageData::error(
                    ErrorCode::InternalError,
                    format!("no handler registered for `{}`", def.message_name),
                )
            }
        };
        let has_errors = response.errors.as_ref().is_some_and(|errors| !errors.is_empty());
        let response = if response.data.is_none() && !has_errors {
            error!(message_name = def.message_name, "request callback returned neither data nor errors");
            MessageData::error(ErrorCode::InternalError, "handler produced no result")
        } else {
            response
        };

        let reply = self
            .message(&response_name(def.message_name))
            .with_request_id(request_id)
            .with_payload(response);
        let mut state = self.lock();
        if state.destroyed {
            return;
        }
        if let Err(err) = self.post(&mut state, reply) {
            error!(message_name = def.message_name, %err, "failed to send response");
        }
    }

    fn answer_init(&self, message: Message) {
        let mut state = self.lock();
        let values: Map<String, Value> = state
            .init_values
            .iter()
            .map(|(name, value)| (name.to_string(), value.clone()))
            .collect();
        let mut reply = self.message(INIT_RESPONSE).with_data(Value::Object(values));
        reply.request_id = message.request_id;
        if let Err(err) = self.channel.send(reply) {
            error!(service = self.catalog.service_name, %err, "failed to answer init");
            return;
        }
        self.complete_handshake(&mut state);
    }

    async fn accept_init_response(&self, message: Message) {
        let callbacks = {
            let state = self.lock();
            if state.initialized {
                warn!(service = self.catalog.service_name, "ignoring repeated initResponse");
                return;
            }
            state.callbacks.clone()
        };

        if let Some(Value::Object(values)) = message.data {
            for (name, value) in values {
                let def = self.catalog.find(&name, self.role.peer());
                let Some(def) = def.filter(|def| def.sent_on_initialization) else {
                    warn!(message_name = %name, "initResponse carried an unexpected message");
                    continue;
                };
                match callbacks.get(def.message_name) {
                    Some(callback) => {
                        callback.call(MessageData::data(value)).await;
                    }
                    None => debug!(message_name = def.message_name, "no callback for init value"),
                }
            }
        }

        let mut state = self.lock();
        self.complete_handshake(&mut state);
    }
}
