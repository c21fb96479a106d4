//! Collaborator interfaces implemented by the surrounding app shell: haptic
//! feedback and the destructive-action confirmation dialog.

use futures::future::BoxFuture;

/// Kind of haptic feedback to trigger for an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackKind {
    /// Light tick for an ordinary action (score button press).
    Selection,
    /// Positive confirmation (game started, reset performed).
    Success,
    /// Something was rejected (empty undo stack, roster at capacity).
    Warning,
    /// Stronger pulse for an undo taking effect.
    Impact,
}

/// Fire-and-forget haptic sink; the shell maps kinds onto platform APIs.
pub trait Haptics: Send + Sync {
    /// Trigger feedback of the given kind. Must not block.
    fn notify(&self, kind: FeedbackKind);
}

/// Haptic sink that drops every notification, for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHaptics;

impl Haptics for NoHaptics {
    fn notify(&self, _kind: FeedbackKind) {}
}

/// Yes/no gate shown before destructive actions.
///
/// From the core's perspective this is a single awaited question; the shell
/// typically backs it with a blocking dialog. Declining leaves all state
/// untouched.
pub trait ConfirmGate: Send + Sync {
    /// Ask the user to confirm `prompt`; resolves true to proceed.
    fn confirm(&self, prompt: &str) -> BoxFuture<'_, bool>;
}

/// Gate that accepts every prompt, for headless shells and tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl ConfirmGate for AlwaysConfirm {
    fn confirm(&self, _prompt: &str) -> BoxFuture<'_, bool> {
        Box::pin(async { true })
    }
}

/// Gate that declines every prompt.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

impl ConfirmGate for NeverConfirm {
    fn confirm(&self, _prompt: &str) -> BoxFuture<'_, bool> {
        Box::pin(async { false })
    }
}
