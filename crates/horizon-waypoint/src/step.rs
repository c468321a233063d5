//! Wizard steps and their lifecycle contract.
//!
//! A [`Step`] is one navigable unit of a wizard: a view container plus the
//! behavior that decides what happens when the user enters it, leaves it,
//! or asks for the next step. Steps are identified by [`StepId`] handles
//! into the wizard's step arena, which is how the engine recognizes a
//! forward transition that targets an already-visited step (a "rejoin").
//!
//! # Lifecycle
//!
//! A step moves through the states of [`StepState`]:
//!
//! ```text
//! NotEntered ──► Current ──► Superseded ──► (Current again on Back)
//!                   │             │
//!                   └─────────────┴──► Removed ──► (Current again if
//!                                                  compute_next re-appends)
//! ```
//!
//! The enter hook fires when a step first becomes current and again when a
//! rejoin makes it current; redisplaying a step because the user went Back
//! does *not* re-fire it, since the step's container was never destroyed
//! and simply reappears in its prior state.
//!
//! # Example
//!
//! ```
//! use horizon_waypoint::{FnBehavior, LeaveDecision, Step};
//! use horizon_waypoint_core::global_registry;
//!
//! let container = global_registry().register("account-page");
//!
//! let step = Step::new(container)
//!     .with_title("Create Account")
//!     .with_help_context("wizard.account")
//!     .with_behavior(
//!         FnBehavior::new()
//!             .on_leave(|_data, _reason| Ok(LeaveDecision::Continue)),
//!     );
//! ```

use std::any::Any;
use std::fmt;

use horizon_waypoint_core::{Cancelled, ContainerId};
use slotmap::new_key_type;
use thiserror::Error;

new_key_type! {
    /// A unique identifier for a step in a wizard's step arena.
    ///
    /// Stable for the lifetime of the wizard session; used by
    /// `compute_next` hooks to point at already-registered steps.
    pub struct StepId;
}

// ============================================================================
// Navigation reasons
// ============================================================================

/// Why a step is being entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterReason {
    /// The step was appended by a normal forward transition.
    Next,
    /// The step was rejoined by a forward transition that collapsed a cycle.
    CircleNext,
}

/// Why a step is being left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveReason {
    /// A forward transition to another step.
    Next,
    /// A backward transition to the previous step.
    Back,
    /// A forward transition on a final step, completing the session.
    Finish,
    /// A cancel or host-surface close request.
    Cancel,
}

/// A leave hook's verdict on the pending transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LeaveDecision {
    /// The transition may proceed.
    #[default]
    Continue,
    /// The transition is declined; the step stays current.
    Veto,
}

// ============================================================================
// Step errors
// ============================================================================

/// Failure raised by a step hook.
///
/// `Cancelled` is the cooperative user-cancel signal: the engine aborts the
/// transition silently and never propagates it further. `Failed` is any
/// other hook failure: the engine aborts the transition and reports the
/// message through the host surface's error channel.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepError {
    /// The user cancelled the work the hook was doing.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),

    /// The hook failed for any other reason.
    #[error("{0}")]
    Failed(String),
}

impl StepError {
    /// Create a `Failed` error from a message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Result type for step hooks.
pub type StepResult<T> = std::result::Result<T, StepError>;

// ============================================================================
// Next-step selection
// ============================================================================

/// The target of a forward transition, chosen by a `compute_next` hook.
pub enum NextStep {
    /// Mint a new step and navigate to it.
    New(Step),
    /// Navigate to a step already registered with the wizard.
    ///
    /// If the step is currently on the navigation stack this collapses the
    /// cycle back to it; otherwise it is appended like a new step.
    Existing(StepId),
}

impl fmt::Debug for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NextStep::New(step) => f.debug_tuple("New").field(step).finish(),
            NextStep::Existing(id) => f.debug_tuple("Existing").field(id).finish(),
        }
    }
}

// ============================================================================
// Step lifecycle state
// ============================================================================

/// Where a step stands in its session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepState {
    /// Registered but never displayed.
    #[default]
    NotEntered,
    /// The visible step at the top of the navigation stack.
    Current,
    /// On the stack below the current step.
    Superseded,
    /// Truncated off the stack by a rejoin or by repeated Back.
    ///
    /// The engine never recycles a removed step on its own, but a
    /// `compute_next` hook may still point at it, in which case it is
    /// appended like a new step (the cycle search only matches steps
    /// currently on the stack).
    Removed,
}

// ============================================================================
// StepBehavior
// ============================================================================

/// The lifecycle contract every step honors.
///
/// All three methods are required, which keeps the state machine's contract
/// total: there is no "callback may be absent" case for the engine to
/// special-case. Steps built from plain glue code can use [`FnBehavior`],
/// whose unset hooks default to "do nothing / continue / no next step".
///
/// Hooks receive the step's own [`StepData`] so they can read and adjust
/// gating flags, titles, and the user tag; they never see the rest of the
/// wizard, which keeps them trivially reentrancy-safe.
pub trait StepBehavior: Send {
    /// Called when the step becomes current: once on first display, and
    /// again each time a rejoin transition collapses a cycle back to it.
    /// Not called on Back-redisplay.
    ///
    /// Failures are reported but do not block the transition; there is no
    /// previous state to roll back to.
    fn on_enter(&mut self, data: &mut StepData, reason: EnterReason) -> StepResult<()>;

    /// Called before the step stops being current. Returning
    /// [`LeaveDecision::Veto`] declines the transition and keeps the step
    /// current.
    fn on_leave(&mut self, data: &mut StepData, reason: LeaveReason) -> StepResult<LeaveDecision>;

    /// Called on a forward transition from a non-final step to obtain the
    /// next step. Returning `Ok(None)` means no next step is defined,
    /// which the engine reports as a programming error and aborts.
    fn compute_next(&mut self, data: &mut StepData) -> StepResult<Option<NextStep>>;
}

/// Hook function stored by [`FnBehavior`] for enter.
pub type EnterFn = Box<dyn FnMut(&mut StepData, EnterReason) -> StepResult<()> + Send>;
/// Hook function stored by [`FnBehavior`] for leave.
pub type LeaveFn = Box<dyn FnMut(&mut StepData, LeaveReason) -> StepResult<LeaveDecision> + Send>;
/// Hook function stored by [`FnBehavior`] for compute-next.
pub type ComputeNextFn = Box<dyn FnMut(&mut StepData) -> StepResult<Option<NextStep>> + Send>;

/// A [`StepBehavior`] assembled from closures.
///
/// Unset hooks fall back to neutral behavior: enter does nothing, leave
/// continues, compute-next reports no next step.
///
/// # Example
///
/// ```
/// use horizon_waypoint::{FnBehavior, LeaveDecision, LeaveReason};
///
/// let behavior = FnBehavior::new().on_leave(|_data, reason| {
///     if reason == LeaveReason::Cancel {
///         Ok(LeaveDecision::Veto)
///     } else {
///         Ok(LeaveDecision::Continue)
///     }
/// });
/// ```
#[derive(Default)]
pub struct FnBehavior {
    enter: Option<EnterFn>,
    leave: Option<LeaveFn>,
    next: Option<ComputeNextFn>,
}

impl FnBehavior {
    /// Create a behavior with all hooks unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the enter hook.
    pub fn on_enter<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut StepData, EnterReason) -> StepResult<()> + Send + 'static,
    {
        self.enter = Some(Box::new(f));
        self
    }

    /// Set the leave hook.
    pub fn on_leave<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut StepData, LeaveReason) -> StepResult<LeaveDecision> + Send + 'static,
    {
        self.leave = Some(Box::new(f));
        self
    }

    /// Set the compute-next hook.
    pub fn compute_next<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut StepData) -> StepResult<Option<NextStep>> + Send + 'static,
    {
        self.next = Some(Box::new(f));
        self
    }
}

impl StepBehavior for FnBehavior {
    fn on_enter(&mut self, data: &mut StepData, reason: EnterReason) -> StepResult<()> {
        match &mut self.enter {
            Some(f) => f(data, reason),
            None => Ok(()),
        }
    }

    fn on_leave(&mut self, data: &mut StepData, reason: LeaveReason) -> StepResult<LeaveDecision> {
        match &mut self.leave {
            Some(f) => f(data, reason),
            None => Ok(LeaveDecision::Continue),
        }
    }

    fn compute_next(&mut self, data: &mut StepData) -> StepResult<Option<NextStep>> {
        match &mut self.next {
            Some(f) => f(data),
            None => Ok(None),
        }
    }
}

// ============================================================================
// StepData
// ============================================================================

/// The attribute record of a step.
///
/// Hooks receive this mutably, so gating flags, titles, and the user tag
/// can change while the session runs; the wizard re-reads them after every
/// transition.
pub struct StepData {
    /// The view container this step exclusively owns.
    container: ContainerId,
    /// Whether a forward transition from this step finishes the session.
    is_final: bool,
    /// Whether the forward control is enabled while this step is current.
    forward_enabled: bool,
    /// Whether the back control is enabled while this step is current.
    back_enabled: bool,
    /// Title shown while this step is current.
    title: Option<String>,
    /// Whether the title applies to this step only and is never remembered
    /// as the session title.
    title_scoped: bool,
    /// Help context shown while this step is current.
    help_context: Option<String>,
    /// Arbitrary user data.
    tag: Option<Box<dyn Any + Send>>,
}

impl StepData {
    fn new(container: ContainerId) -> Self {
        Self {
            container,
            is_final: false,
            forward_enabled: true,
            back_enabled: true,
            title: None,
            title_scoped: false,
            help_context: None,
            tag: None,
        }
    }

    /// The view container this step owns.
    pub fn container(&self) -> ContainerId {
        self.container
    }

    /// Check whether a forward transition from this step finishes the session.
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// Set whether this step is final.
    pub fn set_final(&mut self, is_final: bool) {
        self.is_final = is_final;
    }

    /// Check whether the forward control is enabled for this step.
    pub fn forward_enabled(&self) -> bool {
        self.forward_enabled
    }

    /// Enable or disable the forward control for this step.
    pub fn set_forward_enabled(&mut self, enabled: bool) {
        self.forward_enabled = enabled;
    }

    /// Check whether the back control is enabled for this step.
    pub fn back_enabled(&self) -> bool {
        self.back_enabled
    }

    /// Enable or disable the back control for this step.
    pub fn set_back_enabled(&mut self, enabled: bool) {
        self.back_enabled = enabled;
    }

    /// The step title, if any.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Set the step title.
    pub fn set_title(&mut self, title: Option<String>) {
        self.title = title;
    }

    /// Check whether the title applies to this step only.
    pub fn title_scoped(&self) -> bool {
        self.title_scoped
    }

    /// Set whether the title applies to this step only.
    pub fn set_title_scoped(&mut self, scoped: bool) {
        self.title_scoped = scoped;
    }

    /// The help context, if any.
    pub fn help_context(&self) -> Option<&str> {
        self.help_context.as_deref()
    }

    /// Set the help context.
    pub fn set_help_context(&mut self, context: Option<String>) {
        self.help_context = context;
    }

    /// Borrow the user tag, downcast to `T`.
    pub fn tag_ref<T: Any>(&self) -> Option<&T> {
        self.tag.as_ref().and_then(|tag| tag.downcast_ref::<T>())
    }

    /// Mutably borrow the user tag, downcast to `T`.
    pub fn tag_mut<T: Any>(&mut self) -> Option<&mut T> {
        self.tag.as_mut().and_then(|tag| tag.downcast_mut::<T>())
    }

    /// Replace the user tag.
    pub fn set_tag<T: Any + Send>(&mut self, tag: T) {
        self.tag = Some(Box::new(tag));
    }

    /// Remove and return the user tag if it is a `T`.
    pub fn take_tag<T: Any>(&mut self) -> Option<Box<T>> {
        match self.tag.take() {
            Some(tag) => match tag.downcast::<T>() {
                Ok(value) => Some(value),
                Err(original) => {
                    self.tag = Some(original);
                    None
                }
            },
            None => None,
        }
    }
}

impl fmt::Debug for StepData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepData")
            .field("container", &self.container)
            .field("is_final", &self.is_final)
            .field("forward_enabled", &self.forward_enabled)
            .field("back_enabled", &self.back_enabled)
            .field("title", &self.title)
            .field("title_scoped", &self.title_scoped)
            .field("help_context", &self.help_context)
            .field("has_tag", &self.tag.is_some())
            .finish()
    }
}

// ============================================================================
// Step
// ============================================================================

/// One navigable unit of a wizard.
///
/// Pairs an attribute record with the behavior that drives it. Created by
/// application code before the session starts (the first step) or inside a
/// `compute_next` hook (subsequent steps); owned by the wizard once
/// registered.
pub struct Step {
    pub(crate) data: StepData,
    pub(crate) behavior: Box<dyn StepBehavior>,
    pub(crate) state: StepState,
}

impl Step {
    /// Create a step owning the given container, with neutral behavior.
    pub fn new(container: ContainerId) -> Self {
        Self {
            data: StepData::new(container),
            behavior: Box::new(FnBehavior::new()),
            state: StepState::NotEntered,
        }
    }

    // =========================================================================
    // Builder Pattern Methods
    // =========================================================================

    /// Set the behavior using builder pattern.
    pub fn with_behavior(mut self, behavior: impl StepBehavior + 'static) -> Self {
        self.behavior = Box::new(behavior);
        self
    }

    /// Set the title using builder pattern.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.data.title = Some(title.into());
        self
    }

    /// Scope the title to this step only using builder pattern.
    ///
    /// A scoped title is shown while the step is current but is never
    /// remembered as the session title.
    pub fn title_scoped(mut self) -> Self {
        self.data.title_scoped = true;
        self
    }

    /// Set the help context using builder pattern.
    pub fn with_help_context(mut self, context: impl Into<String>) -> Self {
        self.data.help_context = Some(context.into());
        self
    }

    /// Mark this step as final using builder pattern.
    ///
    /// A forward transition from a final step finishes the session.
    pub fn final_step(mut self) -> Self {
        self.data.is_final = true;
        self
    }

    /// Set whether the forward control is enabled, using builder pattern.
    pub fn with_forward_enabled(mut self, enabled: bool) -> Self {
        self.data.forward_enabled = enabled;
        self
    }

    /// Set whether the back control is enabled, using builder pattern.
    pub fn with_back_enabled(mut self, enabled: bool) -> Self {
        self.data.back_enabled = enabled;
        self
    }

    /// Set the user tag using builder pattern.
    pub fn with_tag<T: Any + Send>(mut self, tag: T) -> Self {
        self.data.tag = Some(Box::new(tag));
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The step's attribute record.
    pub fn data(&self) -> &StepData {
        &self.data
    }

    /// The step's attribute record, mutably.
    pub fn data_mut(&mut self) -> &mut StepData {
        &mut self.data
    }

    /// Where the step stands in its session lifecycle.
    pub fn state(&self) -> StepState {
        self.state
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("data", &self.data)
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use horizon_waypoint_core::global_registry;

    fn container() -> ContainerId {
        global_registry().register("test-container")
    }

    #[test]
    fn test_step_builder() {
        let step = Step::new(container())
            .with_title("Choose Folder")
            .with_help_context("wizard.folder")
            .with_forward_enabled(false)
            .final_step();

        assert_eq!(step.data().title(), Some("Choose Folder"));
        assert_eq!(step.data().help_context(), Some("wizard.folder"));
        assert!(!step.data().forward_enabled());
        assert!(step.data().back_enabled());
        assert!(step.data().is_final());
        assert!(!step.data().title_scoped());
        assert_eq!(step.state(), StepState::NotEntered);
    }

    #[test]
    fn test_scoped_title() {
        let step = Step::new(container()).with_title("Progress").title_scoped();
        assert!(step.data().title_scoped());
    }

    #[test]
    fn test_tag_downcast() {
        let mut step = Step::new(container()).with_tag(42_u32);

        assert_eq!(step.data().tag_ref::<u32>(), Some(&42));
        assert_eq!(step.data().tag_ref::<String>(), None);

        *step.data_mut().tag_mut::<u32>().unwrap() = 7;
        assert_eq!(step.data().tag_ref::<u32>(), Some(&7));

        // take with the wrong type leaves the tag in place
        assert!(step.data_mut().take_tag::<String>().is_none());
        assert_eq!(*step.data_mut().take_tag::<u32>().unwrap(), 7);
        assert!(step.data().tag_ref::<u32>().is_none());
    }

    #[test]
    fn test_fn_behavior_defaults() {
        let mut behavior = FnBehavior::new();
        let mut data = StepData::new(container());

        assert_eq!(
            StepBehavior::on_enter(&mut behavior, &mut data, EnterReason::Next),
            Ok(())
        );
        assert_eq!(
            StepBehavior::on_leave(&mut behavior, &mut data, LeaveReason::Next),
            Ok(LeaveDecision::Continue)
        );
        assert!(
            StepBehavior::compute_next(&mut behavior, &mut data)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_fn_behavior_hooks_observe_data() {
        let mut behavior = FnBehavior::new().on_enter(|data, reason| {
            assert_eq!(reason, EnterReason::Next);
            data.set_forward_enabled(false);
            Ok(())
        });

        let mut data = StepData::new(container());
        StepBehavior::on_enter(&mut behavior, &mut data, EnterReason::Next).unwrap();
        assert!(!data.forward_enabled());
    }

    #[test]
    fn test_step_error_from_cancelled() {
        fn long_work() -> StepResult<()> {
            let token = horizon_waypoint_core::CancelToken::new();
            token.cancel();
            token.checkpoint()?;
            Ok(())
        }

        assert_eq!(long_work(), Err(StepError::Cancelled(Cancelled)));
    }

    #[test]
    fn test_step_error_failed_message() {
        let err = StepError::failed("could not scan drive");
        assert_eq!(err.to_string(), "could not scan drive");
    }
}
