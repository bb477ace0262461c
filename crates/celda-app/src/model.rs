// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

use crate::ids::MessageId;
use crate::intent::Intent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageOrigin {
    User,
    Assistant,
}

impl MessageOrigin {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A grid of display strings; row 0 is the header row.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TablePreview {
    pub rows: Vec<Vec<String>>,
}

impl TablePreview {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    pub fn body_row_count(&self) -> usize {
        self.rows.len().saturating_sub(1)
    }
}

/// A rendered chart, base64-encoded PNG bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPreview {
    pub image_base64: String,
}

impl ChartPreview {
    pub fn new(image_base64: impl Into<String>) -> Self {
        Self {
            image_base64: image_base64.into(),
        }
    }

    /// Decoded size of the underlying PNG, in bytes.
    pub fn image_byte_len(&self) -> usize {
        let encoded = self.image_base64.trim_end_matches('=');
        encoded.len() * 3 / 4
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessageBody {
    Text(String),
    Table(TablePreview),
    Image(ChartPreview),
}

impl MessageBody {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Table(_) => "table",
            Self::Image(_) => "image",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub origin: MessageOrigin,
    pub body: MessageBody,
    pub pending: bool,
    /// Set on assistant results that can be applied to the live document.
    pub commit: Option<Intent>,
}
