//! The wizard navigation controller.
//!
//! This module provides [`Wizard`], the state machine that drives a
//! multi-step dialog session: forward/back/finish/cancel transitions
//! between steps, "rejoin" transitions that collapse cycles in the
//! navigation graph, a secondary stack of transient overlay pages, and the
//! validation-gating and disposal protocol every step honors.
//!
//! The wizard never draws anything and never blocks: the host surface owns
//! the modal display loop and forwards raw input here; the wizard answers
//! by telling the host which container to show and which controls to
//! enable.
//!
//! # Example
//!
//! ```ignore
//! use horizon_waypoint::{FnBehavior, NextStep, Step, Wizard};
//! use horizon_waypoint_core::global_registry;
//!
//! let welcome = global_registry().register("welcome");
//! let summary = global_registry().register("summary");
//!
//! let first = Step::new(welcome)
//!     .with_title("Welcome")
//!     .with_behavior(FnBehavior::new().compute_next(move |_| {
//!         Ok(Some(NextStep::New(
//!             Step::new(summary).with_title("Summary").final_step(),
//!         )))
//!     }));
//!
//! let mut wizard = Wizard::new(first);
//! wizard.finished.connect(|()| println!("Wizard completed!"));
//!
//! // Driven by the host surface's input handlers:
//! wizard.start(&mut shell)?;
//! wizard.forward(&mut shell)?;   // -> Summary
//! wizard.forward(&mut shell)?;   // final step: session finishes
//! ```
//!
//! # Navigation model
//!
//! The wizard keeps an append/truncate-only stack of step ids over an
//! arena of step records. Forward either appends the computed next step or,
//! when that step is already on the stack, truncates back to it: a rejoin
//! that collapses a cycle so a looping flow never grows the stack.
//! Back removes exactly the last step. Overlay pages stack independently
//! and never touch the step stack.
//!
//! # Signals
//!
//! - `current_step_changed(StepId)`: Emitted when the current step changes
//! - `finished()`: Emitted once, only when a final step completes the session
//! - `disposed()`: Emitted exactly once, on every termination path
//! - `validation_failed(String)`: Emitted when the validation gate rejects

use horizon_waypoint_core::{ContainerId, Signal, ThreadAffinity, global_registry};
use slotmap::SlotMap;

use crate::dispose::Disposable;
use crate::error::{WizardError, WizardResult};
use crate::host::{CloseResponse, HostSurface};
use crate::overlay::OverlayPage;
use crate::step::{
    EnterReason, LeaveDecision, LeaveReason, NextStep, Step, StepData, StepError, StepId,
    StepState,
};
use crate::store::{LAST_STEP_TITLE_KEY, MemoryStore, SessionStore, StoreValue};
use crate::validate::{AcceptAll, ValidationGate, ValidationOutcome};

// ============================================================================
// Transition
// ============================================================================

/// The outcome of a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// A step was appended to the stack and entered.
    Advanced(StepId),
    /// An earlier step was rejoined, collapsing a cycle; every step after
    /// it was discarded.
    Rejoined(StepId),
    /// The previous step was redisplayed after Back removed the current one.
    ReturnedTo(StepId),
    /// A final step completed the session; the wizard is disposed.
    Finished,
    /// The transition was aborted; navigation state is unchanged.
    ///
    /// Raised for validation rejections, leave-hook vetoes, user
    /// cancellation, hook failures, and input that arrives while the
    /// session is inactive: all the absorbed, non-fatal cases.
    Stayed,
}

// ============================================================================
// Wizard
// ============================================================================

/// The navigation controller for one wizard session.
///
/// Owns the step arena, the navigation stack, the overlay stack, the bound
/// validation gate, and the disposal protocol. Constructed with the first
/// step; disposed exactly once, either after a final step completes or
/// after cancellation.
///
/// # Threading
///
/// Not reentrant and not thread-safe: every operation must be invoked from
/// the one thread that owns the host surface's display loop. Debug builds
/// assert this.
pub struct Wizard {
    /// Thread the wizard was created on; all operations must stay there.
    affinity: ThreadAffinity,

    /// Arena of every step this session has seen.
    steps: SlotMap<StepId, Step>,

    /// Navigation history, first step to current. Append/truncate only.
    stack: Vec<StepId>,

    /// Transient overlay pages, bottom to top.
    overlays: Vec<OverlayPage>,

    /// The step supplied at construction; never removed from the stack.
    first_step: StepId,

    /// Validation gate consulted before every forward transition.
    gate: Box<dyn ValidationGate>,

    /// Injected session store for state remembered across runs.
    store: Box<dyn SessionStore>,

    /// Resources released when the session is disposed.
    disposables: Vec<Box<dyn Disposable>>,

    /// Whether `start` has run.
    started: bool,

    /// Whether a final step completed the session.
    is_finished: bool,

    /// Whether the session has been disposed.
    is_disposed: bool,

    // Signals
    /// Signal emitted when the current step changes.
    pub current_step_changed: Signal<StepId>,
    /// Signal emitted once, only when a final step completes the session.
    pub finished: Signal<()>,
    /// Signal emitted exactly once, on every termination path.
    pub disposed: Signal<()>,
    /// Signal emitted when the validation gate rejects a forward transition.
    pub validation_failed: Signal<String>,
}

impl Wizard {
    /// Create a wizard session starting at the given step.
    ///
    /// The first step is pushed onto the navigation stack immediately and
    /// stays there for the life of the session; it is displayed when
    /// [`start`](Self::start) runs.
    pub fn new(first_step: Step) -> Self {
        let mut steps = SlotMap::with_key();
        let first = steps.insert(first_step);

        Self {
            affinity: ThreadAffinity::current(),
            steps,
            stack: vec![first],
            overlays: Vec::new(),
            first_step: first,
            gate: Box::new(AcceptAll),
            store: Box::new(MemoryStore::new()),
            disposables: Vec::new(),
            started: false,
            is_finished: false,
            is_disposed: false,
            current_step_changed: Signal::new(),
            finished: Signal::new(),
            disposed: Signal::new(),
            validation_failed: Signal::new(),
        }
    }

    // =========================================================================
    // Builder Pattern Methods
    // =========================================================================

    /// Bind the validation gate using builder pattern.
    ///
    /// The gate is supplied by the host surface and consulted before every
    /// forward transition. Defaults to [`AcceptAll`].
    pub fn with_gate(mut self, gate: impl ValidationGate + 'static) -> Self {
        self.gate = Box::new(gate);
        self
    }

    /// Inject the session store using builder pattern.
    ///
    /// Defaults to an in-memory store whose contents die with the wizard.
    pub fn with_store(mut self, store: impl SessionStore + 'static) -> Self {
        self.store = Box::new(store);
        self
    }

    // =========================================================================
    // Step Registration
    // =========================================================================

    /// Register a step without entering it.
    ///
    /// Returns the step's id for use in `compute_next` hooks. Registering
    /// a step whose container is already owned by another step, or whose
    /// container has been destroyed, is a protocol error.
    pub fn register_step(&mut self, step: Step) -> WizardResult<StepId> {
        self.affinity.debug_assert_same_thread();
        if self.is_disposed {
            return Err(WizardError::Disposed);
        }
        self.check_new_step(&step)?;
        Ok(self.steps.insert(step))
    }

    /// Register a resource to be released when the session is disposed.
    ///
    /// Resources are released in reverse registration order; failures are
    /// logged and swallowed so disposal always completes.
    pub fn register_disposable(&mut self, disposable: impl Disposable + 'static) {
        self.disposables.push(Box::new(disposable));
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The id of the step supplied at construction.
    pub fn first_step_id(&self) -> StepId {
        self.first_step
    }

    /// The id of the current (visible or covered-by-overlay) step.
    ///
    /// `None` only after the session has been disposed.
    pub fn current_step_id(&self) -> Option<StepId> {
        self.stack.last().copied()
    }

    /// The number of steps on the navigation stack.
    pub fn stack_len(&self) -> usize {
        self.stack.len()
    }

    /// The number of steps in the arena, whatever their state.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// The number of overlay pages currently stacked.
    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    /// Check whether `start` has run.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Check whether a final step completed the session.
    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    /// Check whether the session has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.is_disposed
    }

    /// A step's attribute record.
    pub fn step_data(&self, id: StepId) -> Option<&StepData> {
        self.steps.get(id).map(|step| &step.data)
    }

    /// A step's attribute record, mutably.
    ///
    /// Call [`refresh_gating`](Self::refresh_gating) after changing gating
    /// flags outside a transition so the host surface picks them up.
    pub fn step_data_mut(&mut self, id: StepId) -> Option<&mut StepData> {
        self.steps.get_mut(id).map(|step| &mut step.data)
    }

    /// Where a step stands in its session lifecycle.
    pub fn step_state(&self, id: StepId) -> Option<StepState> {
        self.steps.get(id).map(|step| step.state)
    }

    // =========================================================================
    // Session Lifecycle
    // =========================================================================

    /// Display the first step and begin the session.
    ///
    /// Must be called exactly once, after the host surface is first
    /// visible. The first step's enter hook fires with
    /// [`EnterReason::Next`].
    pub fn start(&mut self, host: &mut dyn HostSurface) -> WizardResult<()> {
        horizon_waypoint_core::debug_assert_ui_thread!();
        self.affinity.debug_assert_same_thread();
        if self.is_disposed {
            return Err(WizardError::Disposed);
        }
        if self.started {
            return Err(WizardError::AlreadyStarted);
        }

        let first = self.first_step;
        self.ensure_container_alive(self.steps[first].data.container())?;

        self.started = true;
        tracing::info!(target: "horizon_waypoint::wizard", "session started");

        self.steps[first].state = StepState::Current;
        self.run_enter(first, EnterReason::Next, host);
        self.display_step(first, host);
        self.refresh_gating(host);
        self.current_step_changed.emit(first);
        Ok(())
    }

    /// Handle a forward (Next/Finish) request from the host surface.
    ///
    /// Runs the validation gate, then the current step's leave hook, then
    /// either completes the session (final step) or computes, enters, and
    /// displays the next step. All hook failures are absorbed and reported;
    /// the result is [`Transition::Stayed`] and the stack is unchanged.
    #[tracing::instrument(skip_all, target = "horizon_waypoint::wizard", level = "debug")]
    pub fn forward(&mut self, host: &mut dyn HostSurface) -> WizardResult<Transition> {
        self.affinity.debug_assert_same_thread();
        if self.is_disposed {
            tracing::debug!(target: "horizon_waypoint::wizard", "forward ignored: session inactive");
            return Ok(Transition::Stayed);
        }
        if !self.started {
            return Err(WizardError::NotStarted);
        }
        if !self.overlays.is_empty() {
            tracing::warn!(target: "horizon_waypoint::wizard", "forward ignored: an overlay page is current");
            return Ok(Transition::Stayed);
        }

        let current = *self.stack.last().expect("stack is never empty while active");

        // Validation gate, forward transitions only.
        let container = self.steps[current].data.container();
        match self.gate.validate(container) {
            ValidationOutcome::Accept => {}
            ValidationOutcome::Warn(message) => {
                tracing::warn!(target: "horizon_waypoint::validate", %message, "validation warning, proceeding");
                host.report_error(&message);
            }
            ValidationOutcome::Reject(message) => {
                tracing::debug!(target: "horizon_waypoint::validate", %message, "validation rejected forward transition");
                self.validation_failed.emit(message.clone());
                host.report_error(&message);
                return Ok(Transition::Stayed);
            }
        }

        let is_final = self.steps[current].data.is_final();
        let reason = if is_final {
            LeaveReason::Finish
        } else {
            LeaveReason::Next
        };
        if !self.run_leave(current, reason, host) {
            return Ok(Transition::Stayed);
        }

        if is_final {
            tracing::info!(target: "horizon_waypoint::wizard", "final step left, session finished");
            self.is_finished = true;
            host.close();
            self.finished.emit(());
            self.dispose();
            return Ok(Transition::Finished);
        }

        let next = {
            let step = self
                .steps
                .get_mut(current)
                .expect("current step is in the arena");
            step.behavior.compute_next(&mut step.data)
        };
        let next = match next {
            Ok(next) => next,
            Err(StepError::Cancelled(_)) => {
                tracing::debug!(target: "horizon_waypoint::wizard", "compute-next cancelled by user");
                return Ok(Transition::Stayed);
            }
            Err(StepError::Failed(message)) => {
                tracing::warn!(target: "horizon_waypoint::wizard", %message, "compute-next hook failed");
                host.report_error(&message);
                return Ok(Transition::Stayed);
            }
        };
        let Some(next) = next else {
            const MESSAGE: &str = "no next step defined for the current step";
            tracing::warn!(target: "horizon_waypoint::wizard", "{}", MESSAGE);
            host.report_error(MESSAGE);
            return Ok(Transition::Stayed);
        };

        match next {
            NextStep::New(step) => {
                self.check_new_step(&step)?;
                let id = self.steps.insert(step);
                self.advance_to(id, host);
                Ok(Transition::Advanced(id))
            }
            NextStep::Existing(id) => {
                if !self.steps.contains_key(id) {
                    return Err(WizardError::UnknownStep(id));
                }
                self.ensure_container_alive(self.steps[id].data.container())?;

                if let Some(position) = self.stack.iter().position(|&on_stack| on_stack == id) {
                    self.rejoin(id, position, host);
                    Ok(Transition::Rejoined(id))
                } else {
                    self.advance_to(id, host);
                    Ok(Transition::Advanced(id))
                }
            }
        }
    }

    /// Handle a back request from the host surface.
    ///
    /// Removes exactly the current step and redisplays the one below it,
    /// without re-firing its enter hook; the step's container was never
    /// destroyed, so it reappears in its prior state.
    #[tracing::instrument(skip_all, target = "horizon_waypoint::wizard", level = "debug")]
    pub fn back(&mut self, host: &mut dyn HostSurface) -> WizardResult<Transition> {
        self.affinity.debug_assert_same_thread();
        if self.is_disposed {
            tracing::debug!(target: "horizon_waypoint::wizard", "back ignored: session inactive");
            return Ok(Transition::Stayed);
        }
        if !self.started {
            return Err(WizardError::NotStarted);
        }
        if !self.overlays.is_empty() {
            tracing::warn!(target: "horizon_waypoint::wizard", "back ignored: an overlay page is current");
            return Ok(Transition::Stayed);
        }
        if self.stack.len() == 1 {
            return Err(WizardError::BackAtFirstStep);
        }

        let current = *self.stack.last().expect("stack is never empty while active");
        let target = self.stack[self.stack.len() - 2];
        self.ensure_container_alive(self.steps[target].data.container())?;

        if !self.run_leave(current, LeaveReason::Back, host) {
            return Ok(Transition::Stayed);
        }

        self.stack.pop();
        self.steps[current].state = StepState::Removed;
        self.steps[target].state = StepState::Current;
        tracing::debug!(
            target: "horizon_waypoint::wizard",
            from = ?current,
            to = ?target,
            stack_len = self.stack.len(),
            "navigated back",
        );

        // Redisplay only; the enter hook never re-fires on Back.
        self.display_step(target, host);
        self.refresh_gating(host);
        self.current_step_changed.emit(target);
        Ok(Transition::ReturnedTo(target))
    }

    /// Handle a cancel or host-surface close request.
    ///
    /// While an overlay page is current the request is routed to it and
    /// the step stack is untouched. Otherwise the current step's leave
    /// hook decides: continue disposes the session and allows the close,
    /// veto suppresses it.
    #[tracing::instrument(skip_all, target = "horizon_waypoint::wizard", level = "debug")]
    pub fn cancel(&mut self, host: &mut dyn HostSurface) -> WizardResult<CloseResponse> {
        self.affinity.debug_assert_same_thread();
        if self.is_disposed {
            return Ok(CloseResponse::Allow);
        }
        if !self.started {
            // Nothing displayed yet; tear down and let the host close.
            self.dispose();
            return Ok(CloseResponse::Allow);
        }

        if let Some(top) = self.overlays.last() {
            if top.cancel_enabled() {
                self.cancel_top_overlay(host);
            } else {
                tracing::debug!(target: "horizon_waypoint::overlay", "close suppressed: non-cancellable overlay is current");
            }
            return Ok(CloseResponse::Deny);
        }

        let current = *self.stack.last().expect("stack is never empty while active");
        if self.run_leave(current, LeaveReason::Cancel, host) {
            tracing::info!(target: "horizon_waypoint::wizard", "session cancelled");
            host.close();
            self.dispose();
            Ok(CloseResponse::Allow)
        } else {
            Ok(CloseResponse::Deny)
        }
    }

    /// Handle the host surface's closing notification.
    ///
    /// Identical to [`cancel`](Self::cancel); the close button and the
    /// cancel control share one path.
    pub fn close_requested(&mut self, host: &mut dyn HostSurface) -> WizardResult<CloseResponse> {
        self.cancel(host)
    }

    // =========================================================================
    // Overlay Stack
    // =========================================================================

    /// Push an overlay page on top of whatever is visible.
    ///
    /// The page's container is displayed in place of the current step (or
    /// the previous overlay), forward and back are disabled, and cancel
    /// follows the page's `cancel_enabled`. The step stack is untouched.
    pub fn push_overlay(&mut self, host: &mut dyn HostSurface, page: OverlayPage) -> WizardResult<()> {
        self.affinity.debug_assert_same_thread();
        if self.is_disposed {
            return Err(WizardError::Disposed);
        }
        if !self.started {
            return Err(WizardError::NotStarted);
        }

        let container = page.container();
        self.ensure_container_alive(container)?;
        if self.overlays.iter().any(|on_stack| on_stack.container() == container) {
            return Err(WizardError::OverlayAlreadyPushed(container));
        }

        tracing::debug!(
            target: "horizon_waypoint::overlay",
            container = ?container,
            depth = self.overlays.len() + 1,
            "pushed overlay page",
        );
        host.show_container(container);
        self.overlays.push(page);
        self.refresh_gating(host);
        Ok(())
    }

    /// Pop the top overlay page, restoring whatever was underneath.
    ///
    /// Returns the popped page so callers can inspect its cancel token or
    /// tag. Popping with no overlay on the stack is a protocol error.
    pub fn pop_overlay(&mut self, host: &mut dyn HostSurface) -> WizardResult<OverlayPage> {
        self.affinity.debug_assert_same_thread();
        if self.is_disposed {
            return Err(WizardError::Disposed);
        }
        let page = self.overlays.pop().ok_or(WizardError::NoOverlay)?;
        tracing::debug!(
            target: "horizon_waypoint::overlay",
            container = ?page.container(),
            depth = self.overlays.len(),
            "popped overlay page",
        );
        self.restore_display(host);
        self.refresh_gating(host);
        Ok(page)
    }

    // =========================================================================
    // Gating
    // =========================================================================

    /// Push the current gating state to the host surface.
    ///
    /// Runs automatically after every transition; call it directly after
    /// changing a step's gating flags outside a transition.
    pub fn refresh_gating(&self, host: &mut dyn HostSurface) {
        let Some(&current) = self.stack.last() else {
            return;
        };
        let overlay_current = !self.overlays.is_empty();
        let data = &self.steps[current].data;

        host.set_forward_enabled(!overlay_current && data.forward_enabled());
        host.set_back_enabled(!overlay_current && self.stack.len() > 1 && data.back_enabled());
        host.set_cancel_enabled(match self.overlays.last() {
            Some(page) => page.cancel_enabled(),
            None => true,
        });
    }

    // =========================================================================
    // Disposal
    // =========================================================================

    /// Dispose the session.
    ///
    /// Idempotent and irreversible: the disposed signal fires, outstanding
    /// overlays are popped LIFO without cancel notification, registered
    /// disposables are released in reverse registration order, and every
    /// step's container is destroyed. Runs automatically when a final step
    /// completes or a cancel succeeds.
    pub fn dispose(&mut self) {
        if self.is_disposed {
            return;
        }
        self.is_disposed = true;
        tracing::debug!(target: "horizon_waypoint::wizard", "disposing session");

        self.disposed.emit(());

        while let Some(page) = self.overlays.pop() {
            tracing::trace!(
                target: "horizon_waypoint::overlay",
                container = ?page.container(),
                "discarding overlay page at disposal",
            );
        }

        for mut disposable in self.disposables.drain(..).rev() {
            if let Err(error) = disposable.dispose() {
                tracing::warn!(target: "horizon_waypoint::wizard", %error, "disposable failed during session teardown");
            }
        }

        let registry = global_registry();
        for (_, step) in self.steps.drain() {
            let _ = registry.destroy(step.data.container());
        }
        self.stack.clear();
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Append a step to the stack and enter it.
    fn advance_to(&mut self, id: StepId, host: &mut dyn HostSurface) {
        let previous = *self.stack.last().expect("stack is never empty while active");
        self.steps[previous].state = StepState::Superseded;
        self.stack.push(id);
        self.steps[id].state = StepState::Current;
        tracing::debug!(
            target: "horizon_waypoint::wizard",
            from = ?previous,
            to = ?id,
            stack_len = self.stack.len(),
            "advanced to next step",
        );

        self.run_enter(id, EnterReason::Next, host);
        self.display_step(id, host);
        self.refresh_gating(host);
        self.current_step_changed.emit(id);
    }

    /// Truncate the stack back to a step already on it and re-enter it.
    fn rejoin(&mut self, id: StepId, position: usize, host: &mut dyn HostSurface) {
        // Everything after the match is discarded, including the step just
        // exited. Discarded steps are not notified.
        for discarded in self.stack.drain(position + 1..) {
            self.steps[discarded].state = StepState::Removed;
            tracing::trace!(
                target: "horizon_waypoint::wizard",
                step = ?discarded,
                "discarded by rejoin truncation",
            );
        }
        self.steps[id].state = StepState::Current;
        tracing::debug!(
            target: "horizon_waypoint::wizard",
            to = ?id,
            stack_len = self.stack.len(),
            "rejoined earlier step, cycle collapsed",
        );

        self.run_enter(id, EnterReason::CircleNext, host);
        self.display_step(id, host);
        self.refresh_gating(host);
        self.current_step_changed.emit(id);
    }

    /// Run a step's leave hook. Returns whether the transition may proceed.
    fn run_leave(&mut self, id: StepId, reason: LeaveReason, host: &mut dyn HostSurface) -> bool {
        let result = {
            let step = self.steps.get_mut(id).expect("step is in the arena");
            step.behavior.on_leave(&mut step.data, reason)
        };
        match result {
            Ok(LeaveDecision::Continue) => true,
            Ok(LeaveDecision::Veto) => {
                tracing::debug!(target: "horizon_waypoint::wizard", step = ?id, ?reason, "leave hook vetoed transition");
                false
            }
            Err(StepError::Cancelled(_)) => {
                tracing::debug!(target: "horizon_waypoint::wizard", step = ?id, ?reason, "leave hook cancelled by user");
                false
            }
            Err(StepError::Failed(message)) => {
                tracing::warn!(target: "horizon_waypoint::wizard", step = ?id, ?reason, %message, "leave hook failed");
                host.report_error(&message);
                false
            }
        }
    }

    /// Run a step's enter hook. Failures are reported but never block;
    /// there is no previous state to roll back to.
    fn run_enter(&mut self, id: StepId, reason: EnterReason, host: &mut dyn HostSurface) {
        let result = {
            let step = self.steps.get_mut(id).expect("step is in the arena");
            step.behavior.on_enter(&mut step.data, reason)
        };
        match result {
            Ok(()) => {}
            Err(StepError::Cancelled(_)) => {
                tracing::debug!(target: "horizon_waypoint::wizard", step = ?id, ?reason, "enter hook cancelled by user");
            }
            Err(StepError::Failed(message)) => {
                tracing::warn!(target: "horizon_waypoint::wizard", step = ?id, ?reason, %message, "enter hook failed");
                host.report_error(&message);
            }
        }
    }

    /// Show a step's container and propagate its title and help context.
    fn display_step(&mut self, id: StepId, host: &mut dyn HostSurface) {
        let container = self.steps[id].data.container();
        host.show_container(container);
        self.apply_chrome(id, host);
    }

    /// Propagate a step's title and help context to the host surface.
    ///
    /// A step without a title inherits the session's remembered title; a
    /// non-scoped title becomes the remembered one.
    fn apply_chrome(&mut self, id: StepId, host: &mut dyn HostSurface) {
        let (title, scoped, help) = {
            let data = &self.steps[id].data;
            (
                data.title().map(str::to_string),
                data.title_scoped(),
                data.help_context().map(str::to_string),
            )
        };

        match title {
            Some(title) => {
                host.set_title(&title);
                if !scoped {
                    self.store.set(LAST_STEP_TITLE_KEY, StoreValue::String(title));
                }
            }
            None => {
                if let Some(remembered) = self.store.get(LAST_STEP_TITLE_KEY)
                    && let Some(title) = remembered.as_str()
                {
                    host.set_title(title);
                }
            }
        }

        if let Some(help) = help {
            host.set_help_context(&help);
        }
    }

    /// Show whatever the top of the display order is: the top overlay if
    /// any, otherwise the current step.
    fn restore_display(&mut self, host: &mut dyn HostSurface) {
        let container = match self.overlays.last() {
            Some(page) => page.container(),
            None => {
                let current = *self.stack.last().expect("stack is never empty while active");
                self.steps[current].data.container()
            }
        };
        host.show_container(container);
    }

    /// Route a cancel request to the top overlay page.
    fn cancel_top_overlay(&mut self, host: &mut dyn HostSurface) {
        let page = self.overlays.pop().expect("overlay is on the stack");
        tracing::debug!(
            target: "horizon_waypoint::overlay",
            container = ?page.container(),
            "overlay cancelled by user",
        );
        page.cancel();
        self.restore_display(host);
        self.refresh_gating(host);
    }

    /// Reject a step whose container is dead or already owned.
    fn check_new_step(&self, step: &Step) -> WizardResult<()> {
        let container = step.data.container();
        self.ensure_container_alive(container)?;
        if self
            .steps
            .values()
            .any(|existing| existing.data.container() == container)
        {
            return Err(WizardError::ContainerInUse(container));
        }
        Ok(())
    }

    fn ensure_container_alive(&self, container: ContainerId) -> WizardResult<()> {
        if global_registry().contains(container) {
            Ok(())
        } else {
            Err(WizardError::DeadContainer(container))
        }
    }
}

impl Drop for Wizard {
    fn drop(&mut self) {
        if !self.is_disposed {
            self.dispose();
        }
    }
}

impl std::fmt::Debug for Wizard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wizard")
            .field("stack_len", &self.stack.len())
            .field("step_count", &self.steps.len())
            .field("overlay_count", &self.overlays.len())
            .field("started", &self.started)
            .field("is_finished", &self.is_finished)
            .field("is_disposed", &self.is_disposed)
            .finish()
    }
}

static_assertions::assert_impl_all!(Wizard: Send);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispose::DisposeError;
    use crate::step::FnBehavior;
    use horizon_waypoint_core::init_global_registry;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

    fn setup() {
        init_global_registry();
    }

    fn container(name: &str) -> ContainerId {
        global_registry().register(name)
    }

    /// Records every call the wizard makes across the host boundary.
    #[derive(Default)]
    struct RecordingHost {
        shown: Vec<ContainerId>,
        forward_enabled: bool,
        back_enabled: bool,
        cancel_enabled: bool,
        title: Option<String>,
        help_context: Option<String>,
        closed: bool,
        errors: Vec<String>,
    }

    impl RecordingHost {
        fn new() -> Self {
            Self::default()
        }

        fn visible(&self) -> Option<ContainerId> {
            self.shown.last().copied()
        }
    }

    impl HostSurface for RecordingHost {
        fn show_container(&mut self, container: ContainerId) {
            self.shown.push(container);
        }

        fn set_forward_enabled(&mut self, enabled: bool) {
            self.forward_enabled = enabled;
        }

        fn set_back_enabled(&mut self, enabled: bool) {
            self.back_enabled = enabled;
        }

        fn set_cancel_enabled(&mut self, enabled: bool) {
            self.cancel_enabled = enabled;
        }

        fn set_title(&mut self, title: &str) {
            self.title = Some(title.to_string());
        }

        fn set_help_context(&mut self, context: &str) {
            self.help_context = Some(context.to_string());
        }

        fn close(&mut self) {
            self.closed = true;
        }

        fn report_error(&mut self, message: &str) {
            self.errors.push(message.to_string());
        }
    }

    /// Shared cell for wiring `compute_next` closures to ids that only
    /// exist after registration.
    type IdCell = Arc<Mutex<Option<StepId>>>;

    fn goto(cell: &IdCell) -> FnBehavior {
        let cell = cell.clone();
        FnBehavior::new().compute_next(move |_| Ok((*cell.lock()).map(NextStep::Existing)))
    }

    #[test]
    fn test_linear_flow_finishes() {
        // A two-step flow whose second step is final.
        setup();
        let c1 = container("s1");
        let c2 = container("s2");

        let first = Step::new(c1).with_behavior(
            FnBehavior::new()
                .compute_next(move |_| Ok(Some(NextStep::New(Step::new(c2).final_step())))),
        );
        let mut wizard = Wizard::new(first);
        let mut host = RecordingHost::new();

        let finish_count = Arc::new(AtomicI32::new(0));
        let finish_clone = finish_count.clone();
        wizard.finished.connect(move |()| {
            finish_clone.fetch_add(1, Ordering::SeqCst);
        });
        let dispose_count = Arc::new(AtomicI32::new(0));
        let dispose_clone = dispose_count.clone();
        wizard.disposed.connect(move |()| {
            dispose_clone.fetch_add(1, Ordering::SeqCst);
        });

        wizard.start(&mut host).unwrap();
        assert_eq!(wizard.current_step_id(), Some(wizard.first_step_id()));
        assert_eq!(host.visible(), Some(c1));

        let transition = wizard.forward(&mut host).unwrap();
        assert!(matches!(transition, Transition::Advanced(_)));
        assert_eq!(host.visible(), Some(c2));
        assert!(host.forward_enabled);
        assert_eq!(wizard.stack_len(), 2);

        let transition = wizard.forward(&mut host).unwrap();
        assert_eq!(transition, Transition::Finished);
        assert!(wizard.is_finished());
        assert!(wizard.is_disposed());
        assert!(host.closed);
        assert_eq!(finish_count.load(Ordering::SeqCst), 1);
        assert_eq!(dispose_count.load(Ordering::SeqCst), 1);

        // Terminal: further navigation is a no-op.
        assert_eq!(wizard.forward(&mut host).unwrap(), Transition::Stayed);
        assert_eq!(wizard.back(&mut host).unwrap(), Transition::Stayed);
        assert_eq!(wizard.cancel(&mut host).unwrap(), CloseResponse::Allow);
        assert_eq!(finish_count.load(Ordering::SeqCst), 1);
        assert_eq!(dispose_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_cycle_collapse() {
        // A looping flow S1 -> S2 -> S1 -> S2 stabilizes at [S1, S2].
        setup();
        let c1 = container("s1");
        let c2 = container("s2");

        let s1_cell: IdCell = Arc::new(Mutex::new(None));
        let s2_cell: IdCell = Arc::new(Mutex::new(None));

        let mut wizard = Wizard::new(Step::new(c1).with_behavior(goto(&s2_cell)));
        *s1_cell.lock() = Some(wizard.first_step_id());
        let s2 = wizard
            .register_step(Step::new(c2).with_behavior(goto(&s1_cell)))
            .unwrap();
        *s2_cell.lock() = Some(s2);
        let s1 = wizard.first_step_id();

        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();

        assert_eq!(wizard.forward(&mut host).unwrap(), Transition::Advanced(s2));
        assert_eq!(wizard.stack_len(), 2);

        // S2 -> S1 is a rejoin: S2 is truncated off.
        assert_eq!(wizard.forward(&mut host).unwrap(), Transition::Rejoined(s1));
        assert_eq!(wizard.stack_len(), 1);
        assert_eq!(wizard.step_state(s2), Some(StepState::Removed));

        // The third forward re-appends S2; the stack never grows past 2.
        assert_eq!(wizard.forward(&mut host).unwrap(), Transition::Advanced(s2));
        assert_eq!(wizard.stack_len(), 2);
        assert_eq!(wizard.current_step_id(), Some(s2));
        assert_eq!(host.visible(), Some(c2));
    }

    #[test]
    fn test_rejoin_enters_with_circle_next() {
        setup();
        let c1 = container("s1");
        let c2 = container("s2");

        let s1_cell: IdCell = Arc::new(Mutex::new(None));
        let reasons = Arc::new(Mutex::new(Vec::<EnterReason>::new()));

        let reasons_clone = reasons.clone();
        let s1_cell_clone = s1_cell.clone();
        let first = Step::new(c1).with_behavior(
            FnBehavior::new()
                .on_enter(move |_, reason| {
                    reasons_clone.lock().push(reason);
                    Ok(())
                })
                .compute_next(move |_| {
                    let cell = s1_cell_clone.clone();
                    Ok(Some(NextStep::New(
                        Step::new(c2).with_behavior(goto(&cell)),
                    )))
                }),
        );
        let mut wizard = Wizard::new(first);
        *s1_cell.lock() = Some(wizard.first_step_id());

        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();
        wizard.forward(&mut host).unwrap();
        wizard.forward(&mut host).unwrap();

        assert_eq!(&*reasons.lock(), &[EnterReason::Next, EnterReason::CircleNext]);
    }

    #[test]
    fn test_validation_rejection_blocks_forward() {
        // When the gate rejects, no hooks beyond validate run.
        setup();
        let c1 = container("s1");

        let hooks_ran = Arc::new(AtomicBool::new(false));
        let hooks_clone = hooks_ran.clone();
        let hooks_clone2 = hooks_ran.clone();
        let first = Step::new(c1).with_behavior(
            FnBehavior::new()
                .on_leave(move |_, _| {
                    hooks_clone.store(true, Ordering::SeqCst);
                    Ok(LeaveDecision::Continue)
                })
                .compute_next(move |_| {
                    hooks_clone2.store(true, Ordering::SeqCst);
                    Ok(None)
                }),
        );

        let mut wizard = Wizard::new(first)
            .with_gate(|_container: ContainerId| ValidationOutcome::Reject("x".into()));

        let failures = Arc::new(Mutex::new(Vec::<String>::new()));
        let failures_clone = failures.clone();
        wizard.validation_failed.connect(move |message| {
            failures_clone.lock().push(message.clone());
        });

        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();

        assert_eq!(wizard.forward(&mut host).unwrap(), Transition::Stayed);
        assert_eq!(wizard.stack_len(), 1);
        assert_eq!(wizard.current_step_id(), Some(wizard.first_step_id()));
        assert!(!hooks_ran.load(Ordering::SeqCst));
        assert_eq!(&*failures.lock(), &["x".to_string()]);
        assert_eq!(host.errors, vec!["x".to_string()]);
    }

    #[test]
    fn test_validation_warning_proceeds() {
        setup();
        let c1 = container("s1");
        let c2 = container("s2");

        let first = Step::new(c1).with_behavior(
            FnBehavior::new()
                .compute_next(move |_| Ok(Some(NextStep::New(Step::new(c2))))),
        );
        let mut wizard = Wizard::new(first)
            .with_gate(|_container: ContainerId| ValidationOutcome::Warn("double-check".into()));

        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();

        assert!(matches!(
            wizard.forward(&mut host).unwrap(),
            Transition::Advanced(_)
        ));
        assert_eq!(host.errors, vec!["double-check".to_string()]);
    }

    #[test]
    fn test_overlay_independence() {
        // N pushes and N pops leave the visible container and the step
        // stack exactly as they were.
        setup();
        let c1 = container("s1");
        let oa = container("overlay-a");
        let ob = container("overlay-b");

        let mut wizard = Wizard::new(Step::new(c1));
        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();
        assert_eq!(host.visible(), Some(c1));
        assert!(host.forward_enabled);

        wizard.push_overlay(&mut host, OverlayPage::new(oa)).unwrap();
        assert_eq!(host.visible(), Some(oa));
        assert!(!host.forward_enabled);
        assert!(!host.back_enabled);

        wizard.push_overlay(&mut host, OverlayPage::new(ob)).unwrap();
        assert_eq!(host.visible(), Some(ob));
        assert_eq!(wizard.overlay_count(), 2);

        // Forward input while an overlay is current is absorbed.
        assert_eq!(wizard.forward(&mut host).unwrap(), Transition::Stayed);

        let popped = wizard.pop_overlay(&mut host).unwrap();
        assert_eq!(popped.container(), ob);
        assert_eq!(host.visible(), Some(oa));

        wizard.pop_overlay(&mut host).unwrap();
        assert_eq!(host.visible(), Some(c1));
        assert_eq!(wizard.overlay_count(), 0);
        assert_eq!(wizard.stack_len(), 1);
        assert!(host.forward_enabled);
    }

    #[test]
    fn test_cancel_veto_keeps_session_alive() {
        // The leave hook denies the cancel.
        setup();
        let c1 = container("s1");

        let first = Step::new(c1).with_behavior(FnBehavior::new().on_leave(|_, reason| {
            if reason == LeaveReason::Cancel {
                Ok(LeaveDecision::Veto)
            } else {
                Ok(LeaveDecision::Continue)
            }
        }));
        let mut wizard = Wizard::new(first);
        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();

        assert_eq!(wizard.cancel(&mut host).unwrap(), CloseResponse::Deny);
        assert!(!wizard.is_disposed());
        assert!(!host.closed);
        assert_eq!(wizard.stack_len(), 1);
    }

    #[test]
    fn test_cancel_disposes_session() {
        setup();
        let c1 = container("s1");

        let mut wizard = Wizard::new(Step::new(c1));
        let dispose_count = Arc::new(AtomicI32::new(0));
        let dispose_clone = dispose_count.clone();
        wizard.disposed.connect(move |()| {
            dispose_clone.fetch_add(1, Ordering::SeqCst);
        });

        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();

        assert_eq!(wizard.cancel(&mut host).unwrap(), CloseResponse::Allow);
        assert!(host.closed);
        assert!(wizard.is_disposed());
        assert!(!wizard.is_finished());
        assert_eq!(dispose_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_back_removes_exactly_last() {
        setup();
        let c1 = container("s1");
        let c2 = container("s2");
        let c3 = container("s3");

        let s2_cell: IdCell = Arc::new(Mutex::new(None));
        let s3_cell: IdCell = Arc::new(Mutex::new(None));

        let mut wizard = Wizard::new(Step::new(c1).with_behavior(goto(&s2_cell)));
        let s2 = wizard
            .register_step(Step::new(c2).with_behavior(goto(&s3_cell)))
            .unwrap();
        *s2_cell.lock() = Some(s2);
        let s3 = wizard.register_step(Step::new(c3)).unwrap();
        *s3_cell.lock() = Some(s3);

        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();
        wizard.forward(&mut host).unwrap();
        wizard.forward(&mut host).unwrap();
        assert_eq!(wizard.stack_len(), 3);

        assert_eq!(wizard.back(&mut host).unwrap(), Transition::ReturnedTo(s2));
        assert_eq!(wizard.stack_len(), 2);
        assert_eq!(wizard.current_step_id(), Some(s2));
        assert_eq!(host.visible(), Some(c2));
        assert_eq!(wizard.step_state(s3), Some(StepState::Removed));

        wizard.back(&mut host).unwrap();
        assert_eq!(wizard.stack_len(), 1);

        // Backing past the first step is a protocol error.
        assert_eq!(wizard.back(&mut host), Err(WizardError::BackAtFirstStep));
        assert_eq!(wizard.stack_len(), 1);
    }

    #[test]
    fn test_back_does_not_refire_enter() {
        setup();
        let c1 = container("s1");
        let c2 = container("s2");

        let enter_count = Arc::new(AtomicI32::new(0));
        let enter_clone = enter_count.clone();
        let first = Step::new(c1).with_behavior(
            FnBehavior::new()
                .on_enter(move |_, _| {
                    enter_clone.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                })
                .compute_next(move |_| Ok(Some(NextStep::New(Step::new(c2))))),
        );
        let mut wizard = Wizard::new(first);
        let mut host = RecordingHost::new();

        wizard.start(&mut host).unwrap();
        assert_eq!(enter_count.load(Ordering::SeqCst), 1);

        wizard.forward(&mut host).unwrap();
        wizard.back(&mut host).unwrap();

        // Redisplayed, not re-entered.
        assert_eq!(enter_count.load(Ordering::SeqCst), 1);
        assert_eq!(host.visible(), Some(c1));
    }

    #[test]
    fn test_back_veto() {
        setup();
        let c1 = container("s1");
        let c2 = container("s2");

        let first = Step::new(c1).with_behavior(
            FnBehavior::new().compute_next(move |_| {
                Ok(Some(NextStep::New(Step::new(c2).with_behavior(
                    FnBehavior::new().on_leave(|_, _| Ok(LeaveDecision::Veto)),
                ))))
            }),
        );
        let mut wizard = Wizard::new(first);
        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();
        wizard.forward(&mut host).unwrap();

        assert_eq!(wizard.back(&mut host).unwrap(), Transition::Stayed);
        assert_eq!(wizard.stack_len(), 2);
    }

    #[test]
    fn test_gating_rules() {
        setup();
        let c1 = container("s1");
        let c2 = container("s2");

        let first = Step::new(c1).with_behavior(
            FnBehavior::new()
                .compute_next(move |_| Ok(Some(NextStep::New(Step::new(c2))))),
        );
        let mut wizard = Wizard::new(first);
        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();

        // One step on the stack: back disabled.
        assert!(host.forward_enabled);
        assert!(!host.back_enabled);
        assert!(host.cancel_enabled);

        wizard.forward(&mut host).unwrap();
        assert!(host.back_enabled);

        // A step can disable its own forward control.
        let current = wizard.current_step_id().unwrap();
        wizard
            .step_data_mut(current)
            .unwrap()
            .set_forward_enabled(false);
        wizard.refresh_gating(&mut host);
        assert!(!host.forward_enabled);
        assert!(host.back_enabled);
    }

    #[test]
    fn test_non_cancellable_overlay_gates_cancel() {
        setup();
        let c1 = container("s1");
        let oa = container("overlay");

        let mut wizard = Wizard::new(Step::new(c1));
        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();

        wizard
            .push_overlay(&mut host, OverlayPage::new(oa).with_cancel_enabled(false))
            .unwrap();
        assert!(!host.cancel_enabled);

        // Close requests are suppressed and the overlay stays.
        assert_eq!(wizard.cancel(&mut host).unwrap(), CloseResponse::Deny);
        assert_eq!(wizard.overlay_count(), 1);
        assert!(!wizard.is_disposed());
    }

    #[test]
    fn test_cancel_routed_to_overlay() {
        setup();
        let c1 = container("s1");
        let oa = container("overlay");

        let mut wizard = Wizard::new(Step::new(c1));
        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();

        let page = OverlayPage::new(oa);
        let token = page.cancel_token();
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancelled_clone = cancelled.clone();
        page.cancelled.connect(move |()| {
            cancelled_clone.store(true, Ordering::SeqCst);
        });

        wizard.push_overlay(&mut host, page).unwrap();
        assert_eq!(wizard.cancel(&mut host).unwrap(), CloseResponse::Deny);

        // The overlay was cancelled and popped; the session continues on
        // the step that opened it.
        assert!(token.is_cancelled());
        assert!(cancelled.load(Ordering::SeqCst));
        assert_eq!(wizard.overlay_count(), 0);
        assert_eq!(host.visible(), Some(c1));
        assert!(!wizard.is_disposed());
        assert_eq!(wizard.stack_len(), 1);
    }

    #[test]
    fn test_overlay_protocol_misuse() {
        setup();
        let c1 = container("s1");
        let oa = container("overlay");

        let mut wizard = Wizard::new(Step::new(c1));
        let mut host = RecordingHost::new();

        // Overlays require a started session.
        assert_eq!(
            wizard.push_overlay(&mut host, OverlayPage::new(oa)),
            Err(WizardError::NotStarted)
        );

        wizard.start(&mut host).unwrap();
        assert!(matches!(
            wizard.pop_overlay(&mut host),
            Err(WizardError::NoOverlay)
        ));

        wizard.push_overlay(&mut host, OverlayPage::new(oa)).unwrap();
        assert_eq!(
            wizard.push_overlay(&mut host, OverlayPage::new(oa)),
            Err(WizardError::OverlayAlreadyPushed(oa))
        );
    }

    #[test]
    fn test_no_next_step_reported() {
        setup();
        let c1 = container("s1");

        let mut wizard = Wizard::new(Step::new(c1));
        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();

        assert_eq!(wizard.forward(&mut host).unwrap(), Transition::Stayed);
        assert_eq!(wizard.stack_len(), 1);
        assert_eq!(host.errors.len(), 1);
        assert!(host.errors[0].contains("no next step"));
    }

    #[test]
    fn test_hook_failure_aborts_and_reports() {
        setup();
        let c1 = container("s1");

        let first = Step::new(c1).with_behavior(
            FnBehavior::new()
                .on_leave(|_, _| Err(StepError::failed("drive scan failed"))),
        );
        let mut wizard = Wizard::new(first);
        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();

        assert_eq!(wizard.forward(&mut host).unwrap(), Transition::Stayed);
        assert_eq!(wizard.stack_len(), 1);
        assert_eq!(host.errors, vec!["drive scan failed".to_string()]);
    }

    #[test]
    fn test_user_cancel_aborts_silently() {
        setup();
        let c1 = container("s1");

        let first = Step::new(c1).with_behavior(FnBehavior::new().compute_next(|_| {
            let token = horizon_waypoint_core::CancelToken::new();
            token.cancel();
            token.checkpoint()?;
            unreachable!("checkpoint returns Err above");
        }));
        let mut wizard = Wizard::new(first);
        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();

        assert_eq!(wizard.forward(&mut host).unwrap(), Transition::Stayed);
        assert_eq!(wizard.stack_len(), 1);
        // User cancellation is not an error; nothing is reported.
        assert!(host.errors.is_empty());
    }

    #[test]
    fn test_title_propagation_and_restore() {
        setup();
        let shared = SharedStore::default();

        // First session: the step title becomes the remembered title.
        {
            let c1 = container("s1");
            let mut wizard =
                Wizard::new(Step::new(c1).with_title("Select Folder")).with_store(shared.clone());
            let mut host = RecordingHost::new();
            wizard.start(&mut host).unwrap();
            assert_eq!(host.title.as_deref(), Some("Select Folder"));
            wizard.cancel(&mut host).unwrap();
        }

        // Second session: an untitled first step inherits it.
        {
            let c1 = container("s1-second-run");
            let mut wizard = Wizard::new(Step::new(c1)).with_store(shared.clone());
            let mut host = RecordingHost::new();
            wizard.start(&mut host).unwrap();
            assert_eq!(host.title.as_deref(), Some("Select Folder"));
        }
    }

    #[test]
    fn test_scoped_title_not_remembered() {
        setup();
        let shared = SharedStore::default();

        let c1 = container("s1");
        let c2 = container("s2");
        let first = Step::new(c1)
            .with_title("Progress")
            .title_scoped()
            .with_behavior(FnBehavior::new().compute_next(move |_| {
                Ok(Some(NextStep::New(Step::new(c2))))
            }));
        let mut wizard = Wizard::new(first).with_store(shared.clone());
        let mut host = RecordingHost::new();

        wizard.start(&mut host).unwrap();
        assert_eq!(host.title.as_deref(), Some("Progress"));

        // The scoped title was shown but never remembered, so the untitled
        // second step has nothing to inherit.
        wizard.forward(&mut host).unwrap();
        assert!(shared.0.lock().get(LAST_STEP_TITLE_KEY).is_none());
        assert_eq!(host.title.as_deref(), Some("Progress"));
    }

    #[test]
    fn test_help_context_propagation() {
        setup();
        let c1 = container("s1");

        let mut wizard = Wizard::new(Step::new(c1).with_help_context("wizard.folder"));
        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();

        assert_eq!(host.help_context.as_deref(), Some("wizard.folder"));
    }

    #[test]
    fn test_dispose_releases_disposables_in_reverse_order() {
        setup();
        let c1 = container("s1");

        let order = Arc::new(Mutex::new(Vec::<&'static str>::new()));
        let mut wizard = Wizard::new(Step::new(c1));

        let order_a = order.clone();
        wizard.register_disposable(move || -> Result<(), DisposeError> {
            order_a.lock().push("a");
            Ok(())
        });
        let order_b = order.clone();
        wizard.register_disposable(move || -> Result<(), DisposeError> {
            order_b.lock().push("b");
            Ok(())
        });
        // A failing disposable is logged and swallowed; the rest still run.
        wizard.register_disposable(|| -> Result<(), DisposeError> { Err("already closed".into()) });

        wizard.dispose();
        assert_eq!(&*order.lock(), &["b", "a"]);

        // Idempotent: disposing again releases nothing twice.
        wizard.dispose();
        assert_eq!(&*order.lock(), &["b", "a"]);
    }

    #[test]
    fn test_dispose_destroys_containers_and_overlays() {
        setup();
        let c1 = container("s1");
        let oa = container("overlay");

        let mut wizard = Wizard::new(Step::new(c1));
        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();
        wizard.push_overlay(&mut host, OverlayPage::new(oa)).unwrap();

        wizard.dispose();
        assert_eq!(wizard.overlay_count(), 0);
        assert_eq!(wizard.step_count(), 0);
        assert_eq!(wizard.current_step_id(), None);
        assert!(!global_registry().contains(c1));
        // Overlay containers belong to application code and survive.
        assert!(global_registry().contains(oa));
    }

    #[test]
    fn test_start_protocol_misuse() {
        setup();
        let c1 = container("s1");

        let mut wizard = Wizard::new(Step::new(c1));
        let mut host = RecordingHost::new();

        assert_eq!(wizard.forward(&mut host), Err(WizardError::NotStarted));
        wizard.start(&mut host).unwrap();
        assert_eq!(wizard.start(&mut host), Err(WizardError::AlreadyStarted));

        wizard.dispose();
        assert_eq!(wizard.start(&mut host), Err(WizardError::Disposed));
    }

    #[test]
    fn test_shared_container_rejected() {
        setup();
        let c1 = container("s1");

        let mut wizard = Wizard::new(Step::new(c1));
        assert_eq!(
            wizard.register_step(Step::new(c1)),
            Err(WizardError::ContainerInUse(c1))
        );
    }

    #[test]
    fn test_dead_container_rejected() {
        setup();
        let c1 = container("s1");
        let dead = container("doomed");
        global_registry().destroy(dead).unwrap();

        let mut wizard = Wizard::new(Step::new(c1));
        assert_eq!(
            wizard.register_step(Step::new(dead)),
            Err(WizardError::DeadContainer(dead))
        );

        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();
        assert_eq!(
            wizard.push_overlay(&mut host, OverlayPage::new(dead)),
            Err(WizardError::DeadContainer(dead))
        );
    }

    #[test]
    fn test_drop_disposes() {
        setup();
        let c1 = container("s1");

        let dispose_count = Arc::new(AtomicI32::new(0));
        {
            let mut wizard = Wizard::new(Step::new(c1));
            let dispose_clone = dispose_count.clone();
            wizard.disposed.connect(move |()| {
                dispose_clone.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(dispose_count.load(Ordering::SeqCst), 1);
        assert!(!global_registry().contains(c1));
    }

    #[test]
    fn test_step_states_track_stack() {
        setup();
        let c1 = container("s1");
        let c2 = container("s2");

        let s2_cell: IdCell = Arc::new(Mutex::new(None));
        let mut wizard = Wizard::new(Step::new(c1).with_behavior(goto(&s2_cell)));
        let s2 = wizard.register_step(Step::new(c2)).unwrap();
        *s2_cell.lock() = Some(s2);
        let s1 = wizard.first_step_id();

        assert_eq!(wizard.step_state(s1), Some(StepState::NotEntered));
        assert_eq!(wizard.step_state(s2), Some(StepState::NotEntered));

        let mut host = RecordingHost::new();
        wizard.start(&mut host).unwrap();
        assert_eq!(wizard.step_state(s1), Some(StepState::Current));

        wizard.forward(&mut host).unwrap();
        assert_eq!(wizard.step_state(s1), Some(StepState::Superseded));
        assert_eq!(wizard.step_state(s2), Some(StepState::Current));

        wizard.back(&mut host).unwrap();
        assert_eq!(wizard.step_state(s1), Some(StepState::Current));
        assert_eq!(wizard.step_state(s2), Some(StepState::Removed));
    }

    /// A session store that outlives a single wizard, for cross-run tests.
    #[derive(Clone, Default)]
    struct SharedStore(Arc<Mutex<MemoryStore>>);

    impl SessionStore for SharedStore {
        fn get(&self, key: &str) -> Option<StoreValue> {
            self.0.lock().get(key)
        }

        fn set(&mut self, key: &str, value: StoreValue) {
            self.0.lock().set(key, value);
        }

        fn remove(&mut self, key: &str) {
            self.0.lock().remove(key);
        }
    }
}
