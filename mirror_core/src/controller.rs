// Mode controller: Idle / OptionPicker / LivePreview.
// Transitions are the only place side effects happen, and every transition
// emits the layout for the new mode, so the dashboard and the try-on surfaces
// are never visible together.

use log::{debug, info, warn};

use crate::catalog::{CandidateCard, CatalogQuery, QueryId};
use crate::error::EngineError;
use crate::events::{RemoteEvent, TriggerPayload};
use crate::host::Host;
use crate::landmarks::PoseOutput;
use crate::render::Canvas;
use crate::session::{FrameOutcome, SkipReason, TryOnSession};
use crate::timer::SessionTimer;
use crate::types::*;

enum ModeState {
    Idle,
    OptionPicker,
    LivePreview(TryOnSession),
}

/// Owns the mode, the candidate list and the timers. One per page.
pub struct ModeController {
    config: EngineConfig,
    state: ModeState,
    candidates: Vec<TryOnCandidate>,
    pending_query: Option<QueryId>,
    last_query: QueryId,
    last_session: SessionId,
    picker_timer: SessionTimer,
    notice_timer: SessionTimer,
}

impl ModeController {
    pub fn new(config: EngineConfig) -> Self {
        ModeController {
            config,
            state: ModeState::Idle,
            candidates: Vec::new(),
            pending_query: None,
            last_query: QueryId::new(0),
            last_session: SessionId::new(0),
            picker_timer: SessionTimer::new(),
            notice_timer: SessionTimer::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn mode(&self) -> SessionMode {
        match self.state {
            ModeState::Idle => SessionMode::Idle,
            ModeState::OptionPicker => SessionMode::OptionPicker,
            ModeState::LivePreview(_) => SessionMode::LivePreview,
        }
    }

    pub fn candidates(&self) -> &[TryOnCandidate] {
        &self.candidates
    }

    pub fn pending_query(&self) -> Option<QueryId> {
        self.pending_query
    }

    pub fn session(&self) -> Option<&TryOnSession> {
        match &self.state {
            ModeState::LivePreview(session) => Some(session),
            _ => None,
        }
    }

    /// Apply one remote event. Events are applied strictly in arrival order.
    pub fn handle_event<H: Host + ?Sized>(&mut self, event: RemoteEvent, now: Timestamp, host: &mut H) {
        match event {
            RemoteEvent::TriggerTryOn(trigger) => self.on_trigger(trigger, now, host),
            RemoteEvent::SelectItem { index } => {
                if let Err(err) = self.on_select(index, now, host) {
                    warn!("Selection ignored: {}", err);
                }
            }
            RemoteEvent::HideTryOn => {
                info!("Hiding try-on interface");
                self.enter_idle(host);
            }
            RemoteEvent::Passthrough(name) => {
                debug!("Event {} is not handled by the try-on core", name);
            }
        }
    }

    /// Open the picker and ask for candidates, or report "no matches" when the
    /// trigger has no category.
    pub fn on_trigger<H: Host + ?Sized>(&mut self, trigger: TriggerPayload, now: Timestamp, host: &mut H) {
        let Some(query) = CatalogQuery::from_trigger(&trigger) else {
            info!("Try-on trigger without category");
            self.no_matches(now, host);
            return;
        };

        self.leave(host);
        self.candidates.clear();
        self.state = ModeState::OptionPicker;
        host.set_layout(Layout::for_mode(SessionMode::OptionPicker));
        host.render_options(&[]);
        if self.notice_timer.disarm() {
            host.show_notice(None);
        }
        self.picker_timer
            .arm(now, self.config.timers.picker_timeout_ms, ());

        match trigger.items {
            Some(items) if !items.is_empty() => self.populate(items, now, host),
            _ => {
                let id = self.last_query.next();
                self.last_query = id;
                self.pending_query = Some(id);
                info!("Querying catalog for {:?} (query {})", query.category, id.as_u32());
                host.request(id, &query);
            }
        }
    }

    /// Apply the answer to a catalog query. Answers to a query that is no
    /// longer pending are dropped.
    pub fn on_catalog_response<H: Host + ?Sized>(
        &mut self,
        id: QueryId,
        result: Result<Vec<TryOnCandidate>, EngineError>,
        now: Timestamp,
        host: &mut H,
    ) {
        if self.pending_query != Some(id) {
            debug!("Dropping stale catalog response {}", id.as_u32());
            return;
        }
        self.pending_query = None;

        match result {
            Ok(items) if !items.is_empty() => self.populate(items, now, host),
            Ok(_) => {
                info!("No matching try-on items");
                self.no_matches(now, host);
            }
            Err(err) => {
                warn!("{}", err);
                self.no_matches(now, host);
            }
        }
    }

    /// Resolve a spoken "option N" against the list on screen.
    /// Fails with `IndexOutOfRange` without changing mode.
    pub fn on_select<H: Host + ?Sized>(
        &mut self,
        index: i64,
        now: Timestamp,
        host: &mut H,
    ) -> Result<(), EngineError> {
        let item = usize::try_from(index)
            .ok()
            .and_then(|i| self.candidates.get(i))
            .map(OverlayItem::from)
            .ok_or(EngineError::IndexOutOfRange {
                index,
                len: self.candidates.len(),
            })?;

        if let ModeState::LivePreview(session) = &mut self.state {
            session.set_overlay(Some(item), now, host);
            return Ok(());
        }

        info!("Trying on option {}", index + 1);
        self.pending_query = None;
        self.picker_timer.disarm();
        host.set_layout(Layout::for_mode(SessionMode::LivePreview));
        let id = self.last_session.next();
        self.last_session = id;
        let mut session = TryOnSession::new(id, &self.config);
        session.start(item, now, host);
        self.state = ModeState::LivePreview(session);
        Ok(())
    }

    /// The host could not open the camera or the estimator for `session`.
    /// Reports for a session that already ended are dropped.
    pub fn on_capture_error<H: Host + ?Sized>(
        &mut self,
        session: SessionId,
        message: &str,
        now: Timestamp,
        host: &mut H,
    ) {
        if self.session().map(TryOnSession::id) != Some(session) {
            debug!(
                "Dropping capture error for ended session {}: {}",
                session.as_u32(),
                message
            );
            return;
        }
        warn!("{}", EngineError::CaptureResource(message.to_string()));
        self.enter_idle(host);
        let text = format!("{}: {}", self.config.catalog.capture_error_text, message);
        self.show_notice(&text, now, host);
    }

    pub fn overlay_loaded(&mut self, source_url: &str, natural_width: f64, natural_height: f64) {
        if let ModeState::LivePreview(session) = &mut self.state {
            session.overlay_loaded(source_url, natural_width, natural_height);
        }
    }

    /// Fire due timers.
    pub fn tick<H: Host + ?Sized>(&mut self, now: Timestamp, host: &mut H) {
        if self.notice_timer.poll(now).is_some() {
            host.show_notice(None);
        }

        let expired = match &mut self.state {
            ModeState::Idle => false,
            ModeState::OptionPicker => self.picker_timer.poll(now).is_some(),
            ModeState::LivePreview(session) => session.poll_timer(now),
        };
        if expired {
            info!("{} timed out", self.mode().as_str());
            self.enter_idle(host);
        }
    }

    /// Earliest pending timer, so the host can schedule a single wakeup.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        let mode_deadline = match &self.state {
            ModeState::Idle => None,
            ModeState::OptionPicker => self.picker_timer.deadline(),
            ModeState::LivePreview(session) => session.deadline(),
        };
        [mode_deadline, self.notice_timer.deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    /// Paint one estimator result. Outside live preview the frame loop is over.
    pub fn process_frame<C: Canvas + ?Sized>(
        &mut self,
        pose: &PoseOutput,
        frame: CanvasSize,
        size: CanvasSize,
        canvas: &mut C,
    ) -> FrameOutcome {
        let ModeState::LivePreview(session) = &mut self.state else {
            return FrameOutcome::Stopped;
        };
        session
            .process_frame(pose, frame, size, canvas)
            .unwrap_or_else(|err| {
                warn!("Frame render failed: {}", err);
                FrameOutcome::Skipped {
                    reason: SkipReason::RenderFailed,
                }
            })
    }

    /// Page unload: release everything and show the dashboard.
    pub fn shutdown<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.enter_idle(host);
        if self.notice_timer.disarm() {
            host.show_notice(None);
        }
    }

    fn populate<H: Host + ?Sized>(&mut self, items: Vec<TryOnCandidate>, now: Timestamp, host: &mut H) {
        info!("Showing {} try-on options", items.len());
        let cards = CandidateCard::for_list(&items, &self.config.catalog.currency_label);
        self.candidates = items;
        host.render_options(&cards);
        self.picker_timer
            .arm(now, self.config.timers.picker_timeout_ms, ());
    }

    fn no_matches<H: Host + ?Sized>(&mut self, now: Timestamp, host: &mut H) {
        self.enter_idle(host);
        let text = self.config.catalog.no_matches_text.clone();
        self.show_notice(&text, now, host);
    }

    fn show_notice<H: Host + ?Sized>(&mut self, text: &str, now: Timestamp, host: &mut H) {
        host.show_notice(Some(text));
        self.notice_timer
            .arm(now, self.config.timers.notice_duration_ms, ());
    }

    /// Exit side effects of the current mode: release capture, cancel the
    /// picker timer, forget the pending query.
    fn leave<H: Host + ?Sized>(&mut self, host: &mut H) {
        self.pending_query = None;
        self.picker_timer.disarm();
        if let ModeState::LivePreview(mut session) = std::mem::replace(&mut self.state, ModeState::Idle) {
            session.stop(host);
        }
    }

    fn enter_idle<H: Host + ?Sized>(&mut self, host: &mut H) {
        let previous = self.mode();
        self.leave(host);
        self.candidates.clear();
        host.set_layout(Layout::for_mode(SessionMode::Idle));
        if previous != SessionMode::Idle {
            info!("{} -> Idle", previous.as_str());
        }
    }
}
