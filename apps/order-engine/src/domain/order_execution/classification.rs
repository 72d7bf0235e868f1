//! Event classification.
//!
//! Maps an [`OutcomeKind`] to a bucket relative to one in-flight call.
//! Kinds outside all three buckets are [`Classification::Ignored`]: they
//! are dropped as noise instead of stalling or failing the call.

use std::collections::BTreeSet;

use super::errors::ClassificationError;
use super::events::OutcomeKind;
use super::value_objects::CallReason;

/// Bucket an outcome kind falls into for a given call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// The call completed successfully.
    Done,
    /// The venue rejected the call.
    Reject,
    /// Intermediate event, forwarded without terminating.
    Other,
    /// Not relevant to the call.
    Ignored,
}

/// Three pairwise disjoint sets of outcome kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventClassification {
    done: BTreeSet<OutcomeKind>,
    reject: BTreeSet<OutcomeKind>,
    other: BTreeSet<OutcomeKind>,
}

impl EventClassification {
    /// Build a classification, rejecting overlapping buckets.
    ///
    /// # Errors
    ///
    /// Returns [`ClassificationError::Overlap`] if any kind is in two
    /// buckets and [`ClassificationError::NoDoneKinds`] if `done` is empty.
    pub fn new(
        done: impl IntoIterator<Item = OutcomeKind>,
        reject: impl IntoIterator<Item = OutcomeKind>,
        other: impl IntoIterator<Item = OutcomeKind>,
    ) -> Result<Self, ClassificationError> {
        let done: BTreeSet<_> = done.into_iter().collect();
        let reject: BTreeSet<_> = reject.into_iter().collect();
        let other: BTreeSet<_> = other.into_iter().collect();

        if done.is_empty() {
            return Err(ClassificationError::NoDoneKinds);
        }

        let pairs = [
            (&done, "done", &reject, "reject"),
            (&done, "done", &other, "other"),
            (&reject, "reject", &other, "other"),
        ];
        for (a, first, b, second) in pairs {
            if let Some(kind) = a.intersection(b).next() {
                return Err(ClassificationError::Overlap {
                    kind: *kind,
                    first,
                    second,
                });
            }
        }

        Ok(Self {
            done,
            reject,
            other,
        })
    }

    /// Static table for a call reason.
    #[must_use]
    pub fn for_reason(reason: CallReason) -> Self {
        use OutcomeKind as K;

        let (done, reject, other): (&[K], &[K], &[K]) = match reason {
            CallReason::Submit => (
                &[K::FullFillOk, K::SubmitConditionalOk],
                &[K::SubmitRejected, K::FillRejected],
                &[K::SubmitOk, K::PartialFillOk, K::Notification],
            ),
            CallReason::Close => (
                &[K::CloseOk],
                &[K::CloseRejected],
                &[K::PartialCloseOk, K::Notification],
            ),
            CallReason::Merge => (
                &[K::MergeOk, K::MergeCloseOk],
                &[K::MergeRejected],
                &[K::Notification],
            ),
            CallReason::ChangeStopLoss => {
                (&[K::ChangedSl], &[K::ChangeSlRejected], &[K::Notification])
            }
            CallReason::ChangeTakeProfit => {
                (&[K::ChangedTp], &[K::ChangeTpRejected], &[K::Notification])
            }
            CallReason::ChangeLabel => (
                &[K::ChangedLabel],
                &[K::ChangeLabelRejected],
                &[K::Notification],
            ),
            CallReason::ChangeAmount => (
                &[K::ChangedAmount],
                &[K::ChangeAmountRejected],
                &[K::Notification],
            ),
            CallReason::ChangeGoodTillTime => {
                (&[K::ChangedGtt], &[K::ChangeGttRejected], &[K::Notification])
            }
            CallReason::ChangeOpenPrice => (
                &[K::ChangedPrice],
                &[K::ChangePriceRejected],
                &[K::Notification],
            ),
        };

        // Tables are checked for disjointness in tests.
        Self {
            done: done.iter().copied().collect(),
            reject: reject.iter().copied().collect(),
            other: other.iter().copied().collect(),
        }
    }

    /// Classify one outcome kind.
    #[must_use]
    pub fn classify(&self, kind: OutcomeKind) -> Classification {
        if self.done.contains(&kind) {
            Classification::Done
        } else if self.reject.contains(&kind) {
            Classification::Reject
        } else if self.other.contains(&kind) {
            Classification::Other
        } else {
            Classification::Ignored
        }
    }

    /// Kinds that complete the call.
    #[must_use]
    pub const fn done_kinds(&self) -> &BTreeSet<OutcomeKind> {
        &self.done
    }

    /// Kinds that reject the call.
    #[must_use]
    pub const fn reject_kinds(&self) -> &BTreeSet<OutcomeKind> {
        &self.reject
    }

    /// Intermediate kinds.
    #[must_use]
    pub const fn other_kinds(&self) -> &BTreeSet<OutcomeKind> {
        &self.other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test]
    fn every_static_table_is_disjoint() {
        for reason in CallReason::ALL {
            let table = EventClassification::for_reason(reason);
            let rebuilt = EventClassification::new(
                table.done_kinds().iter().copied(),
                table.reject_kinds().iter().copied(),
                table.other_kinds().iter().copied(),
            );
            assert_eq!(rebuilt, Ok(table), "table for {reason} overlaps");
        }
    }

    #[test_case(CallReason::Submit, OutcomeKind::FullFillOk, Classification::Done)]
    #[test_case(CallReason::Submit, OutcomeKind::SubmitConditionalOk, Classification::Done)]
    #[test_case(CallReason::Submit, OutcomeKind::FillRejected, Classification::Reject)]
    #[test_case(CallReason::Submit, OutcomeKind::PartialFillOk, Classification::Other)]
    #[test_case(CallReason::Close, OutcomeKind::CloseOk, Classification::Done)]
    #[test_case(CallReason::Close, OutcomeKind::CloseRejected, Classification::Reject)]
    #[test_case(CallReason::Close, OutcomeKind::PartialCloseOk, Classification::Other)]
    #[test_case(CallReason::Close, OutcomeKind::ChangedSl, Classification::Ignored)]
    #[test_case(CallReason::Merge, OutcomeKind::MergeCloseOk, Classification::Done)]
    #[test_case(CallReason::ChangeStopLoss, OutcomeKind::ChangeSlRejected, Classification::Reject)]
    #[test_case(CallReason::ChangeTakeProfit, OutcomeKind::ChangedSl, Classification::Ignored)]
    #[test_case(CallReason::ChangeGoodTillTime, OutcomeKind::ChangedGtt, Classification::Done)]
    fn static_tables(reason: CallReason, kind: OutcomeKind, expected: Classification) {
        assert_eq!(EventClassification::for_reason(reason).classify(kind), expected);
    }

    #[test]
    fn overlap_is_rejected() {
        let result = EventClassification::new(
            [OutcomeKind::CloseOk],
            [OutcomeKind::CloseOk],
            [],
        );
        assert_eq!(
            result,
            Err(ClassificationError::Overlap {
                kind: OutcomeKind::CloseOk,
                first: "done",
                second: "reject",
            })
        );
    }

    #[test]
    fn empty_done_is_rejected() {
        let result = EventClassification::new([], [OutcomeKind::CloseRejected], []);
        assert_eq!(result, Err(ClassificationError::NoDoneKinds));
    }

    fn arb_kinds() -> impl Strategy<Value = Vec<OutcomeKind>> {
        proptest::sample::subsequence(OutcomeKind::ALL.to_vec(), 0..=OutcomeKind::ALL.len())
    }

    proptest! {
        #[test]
        fn accepted_classifications_put_each_kind_in_one_bucket(
            done in arb_kinds(),
            reject in arb_kinds(),
            other in arb_kinds(),
        ) {
            let Ok(table) = EventClassification::new(done.clone(), reject.clone(), other.clone()) else {
                return Ok(());
            };

            for kind in OutcomeKind::ALL {
                let memberships = [done.contains(&kind), reject.contains(&kind), other.contains(&kind)]
                    .into_iter()
                    .filter(|m| *m)
                    .count();
                prop_assert!(memberships <= 1);

                let expected = if done.contains(&kind) {
                    Classification::Done
                } else if reject.contains(&kind) {
                    Classification::Reject
                } else if other.contains(&kind) {
                    Classification::Other
                } else {
                    Classification::Ignored
                };
                prop_assert_eq!(table.classify(kind), expected);
            }
        }

        #[test]
        fn overlapping_buckets_never_build(
            kinds in arb_kinds(),
            pick in any::<prop::sample::Index>(),
        ) {
            prop_assume!(!kinds.is_empty());
            let shared = *pick.get(&kinds);
            let result = EventClassification::new(kinds.clone(), [shared], []);
            let is_overlap = matches!(result, Err(ClassificationError::Overlap { .. }));
            prop_assert!(is_overlap);
        }
    }
}
