// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Operation executors: one per recognized intent, each with a preview
//! path that never mutates the live document and a commit path that does.
//!
//! The dispatcher maps a classified intent onto its executor and wraps the
//! result in a [`Reply`] ready to append to the transcript.

pub mod profit;
pub mod scatter;
pub mod sort;

use anyhow::anyhow;
use celda_app::{Intent, MessageBody, UNRECOGNIZED_REPLY};
use celda_sheet::{Result, SheetError, SheetHost};

/// One turn's terminal payload plus its commit affordance, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub body: MessageBody,
    pub commit: Option<Intent>,
}

impl Reply {
    fn text(text: impl Into<String>) -> Self {
        Self {
            body: MessageBody::Text(text.into()),
            commit: None,
        }
    }

    fn committable(body: MessageBody, intent: Intent) -> Self {
        Self {
            body,
            commit: Some(intent),
        }
    }
}

/// Run the preview path for an intent.
///
/// Every successful preview of a recognized intent carries the commit
/// affordance; the profit explainer is text but still committable, since
/// the column is only added once the user applies it.
pub fn preview_reply<H: SheetHost>(host: &mut H, intent: Intent) -> Result<Reply> {
    match intent {
        Intent::SortBySales => {
            let preview = sort::preview(host)?;
            Ok(Reply::committable(MessageBody::Table(preview), intent))
        }
        Intent::ScatterSalesCosts => {
            let preview = scatter::preview(host)?;
            Ok(Reply::committable(MessageBody::Image(preview), intent))
        }
        Intent::InsertProfitColumn => {
            let text = profit::preview(host)?;
            Ok(Reply::committable(MessageBody::Text(text), intent))
        }
        Intent::Unrecognized => Ok(Reply::text(UNRECOGNIZED_REPLY)),
    }
}

/// Apply a previously previewed intent to the live document.
pub fn commit_intent<H: SheetHost>(host: &mut H, intent: Intent) -> Result<String> {
    match intent {
        Intent::SortBySales => {
            sort::commit(host)?;
            Ok("Sorted the table by sales in descending order.".to_owned())
        }
        Intent::ScatterSalesCosts => {
            scatter::commit(host)?;
            Ok(format!(
                "Placed the {:?} scatter chart on the sheet.",
                scatter::CHART_TITLE
            ))
        }
        Intent::InsertProfitColumn => {
            profit::commit(host)?;
            Ok(format!(
                "Added the {:?} column to the table.",
                profit::PROFIT_HEADER
            ))
        }
        Intent::Unrecognized => Err(SheetError::Host(anyhow!(
            "an unrecognized command cannot be applied"
        ))),
    }
}
