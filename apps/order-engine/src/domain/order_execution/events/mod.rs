//! Outcome events reported by the venue.
//!
//! The venue never answers a call directly. Every state transition of an
//! order is published as one [`OutcomeEvent`] on the shared feed, and the
//! caller correlates it back to the call by order identity.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::shared::{OrderId, Timestamp};

/// Tag describing which transition an outcome event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    /// Informational message about the order.
    Notification,
    /// Order accepted by the venue.
    SubmitOk,
    /// Conditional order accepted and resting.
    SubmitConditionalOk,
    /// Submission rejected.
    SubmitRejected,
    /// Part of the amount filled.
    PartialFillOk,
    /// Whole amount filled.
    FullFillOk,
    /// Fill rejected.
    FillRejected,
    /// Order fully closed.
    CloseOk,
    /// Part of the amount closed.
    PartialCloseOk,
    /// Close rejected.
    CloseRejected,
    /// Merge produced a new order.
    MergeOk,
    /// Order closed as part of a merge.
    MergeCloseOk,
    /// Merge rejected.
    MergeRejected,
    /// Stop-loss changed.
    ChangedSl,
    /// Stop-loss change rejected.
    ChangeSlRejected,
    /// Take-profit changed.
    ChangedTp,
    /// Take-profit change rejected.
    ChangeTpRejected,
    /// Label changed.
    ChangedLabel,
    /// Label change rejected.
    ChangeLabelRejected,
    /// Requested amount changed.
    ChangedAmount,
    /// Amount change rejected.
    ChangeAmountRejected,
    /// Good-till time changed.
    ChangedGtt,
    /// Good-till time change rejected.
    ChangeGttRejected,
    /// Open price changed.
    ChangedPrice,
    /// Open price change rejected.
    ChangePriceRejected,
    /// Order canceled by the venue.
    Canceled,
}

impl OutcomeKind {
    /// Every kind the venue can emit.
    pub const ALL: [Self; 26] = [
        Self::Notification,
        Self::SubmitOk,
        Self::SubmitConditionalOk,
        Self::SubmitRejected,
        Self::PartialFillOk,
        Self::FullFillOk,
        Self::FillRejected,
        Self::CloseOk,
        Self::PartialCloseOk,
        Self::CloseRejected,
        Self::MergeOk,
        Self::MergeCloseOk,
        Self::MergeRejected,
        Self::ChangedSl,
        Self::ChangeSlRejected,
        Self::ChangedTp,
        Self::ChangeTpRejected,
        Self::ChangedLabel,
        Self::ChangeLabelRejected,
        Self::ChangedAmount,
        Self::ChangeAmountRejected,
        Self::ChangedGtt,
        Self::ChangeGttRejected,
        Self::ChangedPrice,
        Self::ChangePriceRejected,
        Self::Canceled,
    ];

    /// Returns true if the order's lifecycle ends with this event.
    #[must_use]
    pub const fn is_end_of_order(&self) -> bool {
        matches!(
            self,
            Self::CloseOk
                | Self::MergeCloseOk
                | Self::SubmitRejected
                | Self::FillRejected
                | Self::Canceled
        )
    }

    /// Wire name of the kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Notification => "NOTIFICATION",
            Self::SubmitOk => "SUBMIT_OK",
            Self::SubmitConditionalOk => "SUBMIT_CONDITIONAL_OK",
            Self::SubmitRejected => "SUBMIT_REJECTED",
            Self::PartialFillOk => "PARTIAL_FILL_OK",
            Self::FullFillOk => "FULL_FILL_OK",
            Self::FillRejected => "FILL_REJECTED",
            Self::CloseOk => "CLOSE_OK",
            Self::PartialCloseOk => "PARTIAL_CLOSE_OK",
            Self::CloseRejected => "CLOSE_REJECTED",
            Self::MergeOk => "MERGE_OK",
            Self::MergeCloseOk => "MERGE_CLOSE_OK",
            Self::MergeRejected => "MERGE_REJECTED",
            Self::ChangedSl => "CHANGED_SL",
            Self::ChangeSlRejected => "CHANGE_SL_REJECTED",
            Self::ChangedTp => "CHANGED_TP",
            Self::ChangeTpRejected => "CHANGE_TP_REJECTED",
            Self::ChangedLabel => "CHANGED_LABEL",
            Self::ChangeLabelRejected => "CHANGE_LABEL_REJECTED",
            Self::ChangedAmount => "CHANGED_AMOUNT",
            Self::ChangeAmountRejected => "CHANGE_AMOUNT_REJECTED",
            Self::ChangedGtt => "CHANGED_GTT",
            Self::ChangeGttRejected => "CHANGE_GTT_REJECTED",
            Self::ChangedPrice => "CHANGED_PRICE",
            Self::ChangePriceRejected => "CHANGE_PRICE_REJECTED",
            Self::Canceled => "CANCELED",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One state transition of one order, as reported by the venue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeEvent {
    /// Order the event is about.
    pub order: OrderId,
    /// Transition tag.
    pub kind: OutcomeKind,
    /// Whether the venue considers a retry of the rejected call meaningful.
    pub is_retry_compatible: bool,
    /// When the event occurred.
    pub occurred_at: Timestamp,
}

impl OutcomeEvent {
    /// Create an event stamped with the current time.
    #[must_use]
    pub fn new(order: OrderId, kind: OutcomeKind) -> Self {
        Self {
            order,
            kind,
            is_retry_compatible: true,
            occurred_at: Timestamp::now(),
        }
    }

    /// Mark the event as not retry compatible.
    #[must_use]
    pub const fn not_retry_compatible(mut self) -> Self {
        self.is_retry_compatible = false;
        self
    }

    /// Returns true if this event ends the order's lifecycle.
    #[must_use]
    pub const fn is_end_of_order(&self) -> bool {
        self.kind.is_end_of_order()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(OutcomeKind::CloseOk, true)]
    #[test_case(OutcomeKind::MergeCloseOk, true)]
    #[test_case(OutcomeKind::SubmitRejected, true)]
    #[test_case(OutcomeKind::FillRejected, true)]
    #[test_case(OutcomeKind::Canceled, true)]
    #[test_case(OutcomeKind::PartialCloseOk, false)]
    #[test_case(OutcomeKind::MergeOk, false)]
    #[test_case(OutcomeKind::CloseRejected, false)]
    fn end_of_order_kinds(kind: OutcomeKind, expected: bool) {
        assert_eq!(kind.is_end_of_order(), expected);
    }

    #[test]
    fn serializes_with_wire_name() {
        let event = OutcomeEvent::new(OrderId::new("ord-1"), OutcomeKind::ChangedSl);
        let json = serde_json::to_value(&event).unwrap();

        assert_eq!(json["kind"], "CHANGED_SL");
        assert_eq!(json["order"], "ord-1");
        assert_eq!(event.kind.to_string(), "CHANGED_SL");
    }

    #[test]
    fn all_kinds_are_distinct() {
        let unique: std::collections::BTreeSet<_> = OutcomeKind::ALL.iter().collect();
        assert_eq!(unique.len(), OutcomeKind::ALL.len());
    }
}
