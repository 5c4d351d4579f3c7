//! Integration tests for the OTP countdown and resend affordance.

mod common;

use imagelab_signup::{OTP_EXPIRY_SECONDS, SignupDetails, SignupPhase};
use imagelab_transport::SYNTHETIC_OTP_CODE;

fn valid_details() -> SignupDetails {
    SignupDetails {
        username: "grace".to_string(),
        password: "abc123".to_string(),
        confirm_password: "abc123".to_string(),
    }
}

#[test]
fn otp_countdown_tests_starts_at_sixty_and_decrements_once_per_tick() {
    let (_, mut context) = common::synthetic_context();
    context.signup.submit_details(&context.client, valid_details());

    assert_eq!(
        context.signup.otp().map(|otp| otp.expires_in_seconds),
        Some(OTP_EXPIRY_SECONDS)
    );

    context.tick_second();
    context.tick_second();
    assert_eq!(
        context.signup.otp().map(|otp| otp.expires_in_seconds),
        Some(OTP_EXPIRY_SECONDS - 2)
    );
}

#[test]
fn otp_countdown_tests_never_goes_negative_and_enables_resend_at_zero() {
    let (_, mut context) = common::synthetic_context();
    context.signup.submit_details(&context.client, valid_details());

    for _ in 0..OTP_EXPIRY_SECONDS + 10 {
        context.tick_second();
    }

    assert_eq!(
        context.signup.otp().map(|otp| otp.expires_in_seconds),
        Some(0)
    );
    assert!(context.ui.resend_enabled);
}

#[test]
fn otp_countdown_tests_stops_once_phase_leaves_awaiting() {
    let (_, mut context) = common::synthetic_context();
    context.signup.submit_details(&context.client, valid_details());

    context.signup.set_code(SYNTHETIC_OTP_CODE);
    context.signup.verify(&context.client);
    assert_eq!(context.signup.phase(), SignupPhase::Completed);

    // Completed: there is no OTP session left to tick.
    context.tick_second();
    assert!(context.signup.otp().is_none());
}

#[test]
fn otp_countdown_tests_resend_restarts_the_countdown() {
    let (_, mut context) = common::synthetic_context();
    context.signup.submit_details(&context.client, valid_details());

    for _ in 0..OTP_EXPIRY_SECONDS {
        context.tick_second();
    }
    assert!(context.signup.resend_available());

    context.signup.resend(&context.client);
    assert_eq!(
        context.signup.otp().map(|otp| otp.expires_in_seconds),
        Some(OTP_EXPIRY_SECONDS)
    );
    assert!(!context.signup.resend_available());
}
