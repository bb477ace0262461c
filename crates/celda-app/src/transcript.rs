// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::ids::MessageId;
use crate::intent::Intent;
use crate::model::{Message, MessageBody, MessageOrigin};

/// Payload frames for the in-progress placeholder animation.
pub const PROGRESS_FRAMES: [&str; 3] = [".", "..", "..."];

/// Append-only message log for one session.
///
/// Invariants: message ids are strictly monotonic; at most one message is
/// pending at a time; the pending placeholder is removed before the turn's
/// terminal response is appended. Messages are never mutated after creation
/// except for the placeholder's animated payload.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    next_id: i64,
}

impl Transcript {
    pub fn with_greeting(greeting: &str) -> Self {
        let mut transcript = Self::default();
        transcript.push_assistant_text(greeting);
        transcript
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn has_pending(&self) -> bool {
        self.messages.iter().any(|message| message.pending)
    }

    pub fn push_user(&mut self, text: impl Into<String>) -> MessageId {
        self.push(MessageOrigin::User, MessageBody::Text(text.into()), false, None)
    }

    pub fn push_assistant_text(&mut self, text: impl Into<String>) -> MessageId {
        self.push(
            MessageOrigin::Assistant,
            MessageBody::Text(text.into()),
            false,
            None,
        )
    }

    /// Append the in-progress placeholder for a new turn.
    pub fn push_placeholder(&mut self) -> Result<MessageId> {
        if self.has_pending() {
            bail!("a turn is already in progress");
        }
        Ok(self.push(
            MessageOrigin::Assistant,
            MessageBody::Text(PROGRESS_FRAMES[0].to_owned()),
            true,
            None,
        ))
    }

    /// Advance the placeholder's progress-dots payload.
    ///
    /// Stale calls (placeholder already resolved) are ignored so a late
    /// animation tick can never touch another message.
    pub fn animate_placeholder(&mut self, id: MessageId, frame: usize) {
        if let Some(message) = self.messages.iter_mut().find(|message| message.id == id)
            && message.pending
        {
            let dots = PROGRESS_FRAMES[frame % PROGRESS_FRAMES.len()];
            message.body = MessageBody::Text(dots.to_owned());
        }
    }

    /// Remove the placeholder and append the turn's terminal response.
    pub fn resolve_placeholder(
        &mut self,
        id: MessageId,
        body: MessageBody,
        commit: Option<Intent>,
    ) -> Result<MessageId> {
        let Some(index) = self
            .messages
            .iter()
            .position(|message| message.id == id && message.pending)
        else {
            bail!("no pending placeholder with id {}", id.get());
        };
        self.messages.remove(index);
        Ok(self.push(MessageOrigin::Assistant, body, false, commit))
    }

    /// The newest message carrying a commit affordance, if any.
    pub fn latest_committable(&self) -> Option<(MessageId, Intent)> {
        self.messages
            .iter()
            .rev()
            .find_map(|message| message.commit.map(|intent| (message.id, intent)))
    }

    fn push(
        &mut self,
        origin: MessageOrigin,
        body: MessageBody,
        pending: bool,
        commit: Option<Intent>,
    ) -> MessageId {
        self.next_id += 1;
        let id = MessageId::new(self.next_id);
        self.messages.push(Message {
            id,
            origin,
            body,
            pending,
            commit,
        });
        id
    }
}
