use super::common::*;
use crate::rewards::domain::{RedemptionId, RedemptionStatus, TransitionError};
use crate::rewards::ledger::LedgerError;
use crate::rewards::service::RewardServiceError;

fn service_with_pending(
    amount_cents: i64,
) -> (
    crate::rewards::service::RewardService<crate::rewards::ledger::InMemoryLedger>,
    crate::rewards::domain::Redemption,
) {
    let (service, _) = build_service();
    let customer = user("cust-1");
    service.create_voucher(&customer, 1_000).expect("voucher");
    let redemption = service
        .create_redemption(&customer, redemption_request(amount_cents))
        .expect("redemption");
    (service, redemption)
}

#[test]
fn happy_path_runs_pending_approved_paid() {
    let (service, redemption) = service_with_pending(400);

    let approved = service.approve(&redemption.id).expect("approve");
    assert_eq!(approved.status, RedemptionStatus::Approved);

    let paid = service
        .mark_paid(&redemption.id, "stripe_po_914")
        .expect("mark paid");
    assert_eq!(paid.status, RedemptionStatus::Paid);
    assert_eq!(paid.provider_ref.as_deref(), Some("stripe_po_914"));
}

#[test]
fn reject_is_terminal() {
    let (service, redemption) = service_with_pending(400);

    let rejected = service.reject(&redemption.id).expect("reject");
    assert_eq!(rejected.status, RedemptionStatus::Rejected);

    match service.approve(&redemption.id) {
        Err(RewardServiceError::Transition(TransitionError::InvalidTransition {
            action,
            status,
        })) => {
            assert_eq!(action, "approve");
            assert_eq!(status, "rejected");
        }
        other => panic!("expected invalid transition, got {other:?}"),
    }
}

#[test]
fn mark_paid_requires_prior_approval() {
    let (service, redemption) = service_with_pending(400);

    assert!(matches!(
        service.mark_paid(&redemption.id, "stripe_po_914"),
        Err(RewardServiceError::Transition(
            TransitionError::InvalidTransition { .. }
        ))
    ));
}

#[test]
fn mark_paid_rejects_blank_provider_ref() {
    let (service, redemption) = service_with_pending(400);
    service.approve(&redemption.id).expect("approve");

    for blank in ["", "   "] {
        assert!(matches!(
            service.mark_paid(&redemption.id, blank),
            Err(RewardServiceError::Transition(
                TransitionError::MissingProviderRef
            ))
        ));
    }

    // The failed attempts left the redemption approved.
    let paid = service
        .mark_paid(&redemption.id, "paypal_batch_7")
        .expect("mark paid");
    assert_eq!(paid.status, RedemptionStatus::Paid);
}

#[test]
fn paid_redemption_cannot_be_moderated_again() {
    let (service, redemption) = service_with_pending(400);
    service.approve(&redemption.id).expect("approve");
    service
        .mark_paid(&redemption.id, "stripe_po_914")
        .expect("mark paid");

    assert!(service.approve(&redemption.id).is_err());
    assert!(service.reject(&redemption.id).is_err());
    assert!(matches!(
        service.mark_paid(&redemption.id, "stripe_po_915"),
        Err(RewardServiceError::Transition(
            TransitionError::InvalidTransition { .. }
        ))
    ));
}

#[test]
fn reject_returns_reserved_funds() {
    let (service, redemption) = service_with_pending(400);
    let customer = user("cust-1");

    let before = service.profile(&customer).expect("profile");
    assert_eq!(before.available_cents, 600);

    service.reject(&redemption.id).expect("reject");

    let after = service.profile(&customer).expect("profile");
    assert_eq!(after.available_cents, 1_000);
}

#[test]
fn approval_keeps_funds_reserved() {
    let (service, redemption) = service_with_pending(400);
    let customer = user("cust-1");

    service.approve(&redemption.id).expect("approve");

    let profile = service.profile(&customer).expect("profile");
    assert_eq!(profile.available_cents, 600);
}

#[test]
fn moderating_unknown_redemption_is_not_found() {
    let (service, _) = build_service();
    let missing = RedemptionId("rdm-does-not-exist".to_string());

    assert!(matches!(
        service.approve(&missing),
        Err(RewardServiceError::Ledger(LedgerError::NotFound))
    ));
}
