//! Static message catalogs.
//!
//! A catalog lists every message a service may carry, who sends it and how
//! the receiver must answer. Handlers check registrations and sends against
//! it before anything reaches the channel.

use crate::message::{ErrorCode, SourceRole};

/// Which error codes a request may fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Creating something: there is nothing to be missing, so no `NOT_FOUND`.
    Create,
    /// Reading or changing something that may not exist.
    ReadOrModify,
}

impl ErrorKind {
    pub fn allows(self, code: ErrorCode) -> bool {
        match self {
            ErrorKind::Create => code != ErrorCode::NotFound,
            ErrorKind::ReadOrModify => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Fire and forget.
    Notification,
    /// Answered by `<messageName>Response`.
    Request { errors: ErrorKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageDefinition {
    pub message_name: &'static str,
    pub source: SourceRole,
    pub kind: MessageKind,
    /// Delivered to the block as part of the handshake.
    pub sent_on_initialization: bool,
    pub description: &'static str,
}

impl MessageDefinition {
    pub const fn notification(
        message_name: &'static str,
        source: SourceRole,
        description: &'static str,
    ) -> Self {
        Self {
            message_name,
            source,
            kind: MessageKind::Notification,
            sent_on_initialization: false,
            description,
        }
    }

    pub const fn request(
        message_name: &'static str,
        source: SourceRole,
        errors: ErrorKind,
        description: &'static str,
    ) -> Self {
        Self {
            message_name,
            source,
            kind: MessageKind::Request { errors },
            sent_on_initialization: false,
            description,
        }
    }

    pub const fn on_initialization(mut self) -> Self {
        self.sent_on_initialization = true;
        self
    }

    pub fn is_request(&self) -> bool {
        matches!(self.kind, MessageKind::Request { .. })
    }
}

/// Every message one service may carry.
#[derive(Debug, Clone, Copy)]
pub struct ServiceCatalog {
    pub service_name: &'static str,
    pub messages: &'static [MessageDefinition],
}

impl ServiceCatalog {
    pub const fn new(service_name: &'static str, messages: &'static [MessageDefinition]) -> Self {
        Self {
            service_name,
            messages,
        }
    }

    pub fn find(&self, message_name: &str, source: SourceRole) -> Option<&'static MessageDefinition> {
        self.messages
            .iter()
            .find(|def| def.message_name == message_name && def.source == source)
    }

    /// Messages `role` sends.
    pub fn outbound(&self, role: SourceRole) -> impl Iterator<Item = &'static MessageDefinition> {
        self.messages.iter().filter(move |def| def.source == role)
    }

    /// Messages `role` receives.
    pub fn inbound(&self, role: SourceRole) -> impl Iterator<Item = &'static MessageDefinition> {
        self.outbound(role.peer())
    }

    /// The request `response_name` answers, if `requester` sends such a
    /// request.
    pub fn request_for_response(
        &self,
        response_name: &str,
        requester: SourceRole,
    ) -> Option<&'static MessageDefinition> {
        let request_name = response_name.strip_suffix("Response")?;
        self.find(request_name, requester)
            .filter(|def| def.is_request())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: ServiceCatalog = ServiceCatalog::new(
        "test",
        &[
            MessageDefinition::notification("ping", SourceRole::Embedder, "").on_initialization(),
            MessageDefinition::request("make", SourceRole::Block, ErrorKind::Create, ""),
            MessageDefinition::request("fetch", SourceRole::Block, ErrorKind::ReadOrModify, ""),
        ],
    );

    #[test]
    fn lookup_is_directional() {
        assert!(CATALOG.find("ping", SourceRole::Embedder).is_some());
        assert!(CATALOG.find("ping", SourceRole::Block).is_none());
        assert_eq!(CATALOG.outbound(SourceRole::Block).count(), 2);
        assert_eq!(CATALOG.inbound(SourceRole::Block).count(), 1);
    }

    #[test]
    fn create_requests_cannot_be_not_found() {
        assert!(!ErrorKind::Create.allows(ErrorCode::NotFound));
        assert!(ErrorKind::Create.allows(ErrorCode::Forbidden));
        assert!(ErrorKind::Create.allows(ErrorCode::InvalidInput));
        assert!(ErrorKind::ReadOrModify.allows(ErrorCode::NotFound));
    }

    #[test]
    fn responses_map_back_to_requests() {
        let def = CATALOG
            .request_for_response("fetchResponse", SourceRole::Block)
            .unwrap();
        assert_eq!(def.message_name, "fetch");
        assert!(CATALOG
            .request_for_response("pingResponse", SourceRole::Embedder)
            .is_none());
    }
}
