//! Lucky draw session
//!
//! Ties the roster, spin animator, renderer and winner history together.
//! Every roster mutation is persisted immediately and invalidates the wheel
//! image; the winner is fixed before the first animation frame.

use rand::SeedableRng;
use rand_pcg::Pcg32;

use crate::api::SpinResponse;
use crate::draw::{FrameStep, Selector, SpinAnimator, SpinResult, WheelState};
use crate::error::{DrawError, StateError, ValidationError};
use crate::history::WinnerHistory;
use crate::persistence::Store;
use crate::renderer::{Surface, WheelRenderer};
use crate::roster::{Participant, Roster};
use crate::settings::Settings;

/// One wheel with its participants, history and drawing surface
pub struct LuckyDraw<S: Surface> {
    settings: Settings,
    roster: Roster,
    history: WinnerHistory,
    store: Box<dyn Store>,
    animator: SpinAnimator,
    renderer: WheelRenderer<S>,
    selector: Selector,
    rng: Pcg32,
    last_winner: Option<Participant>,
}

impl<S: Surface> LuckyDraw<S> {
    /// Restore roster and history from `store`
    pub fn new(settings: Settings, store: Box<dyn Store>, surface: Option<S>) -> Self {
        Self::with_rngs(
            settings,
            store,
            surface,
            Roster::new(),
            Pcg32::from_rng(&mut rand::rng()),
        )
    }

    /// Explicit roster and selection RNG (deterministic tests)
    pub fn with_rngs(
        settings: Settings,
        store: Box<dyn Store>,
        surface: Option<S>,
        mut roster: Roster,
        rng: Pcg32,
    ) -> Self {
        let settings = settings.clamped();
        roster.set_max_name_len(settings.max_name_len);
        roster.load(store.as_ref());
        let history = WinnerHistory::load(store.as_ref());

        let mut animator = SpinAnimator::new(settings.timing());
        animator.set_segment_count(roster.len());

        let mut app = Self {
            renderer: WheelRenderer::new(surface, settings.view_size),
            selector: Selector::with_max(settings.max_participants),
            settings,
            roster,
            history,
            store,
            animator,
            rng,
            last_winner: None,
        };
        app.redraw();
        app
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn history(&self) -> &WinnerHistory {
        &self.history
    }

    pub fn renderer(&self) -> &WheelRenderer<S> {
        &self.renderer
    }

    pub fn wheel(&self) -> WheelState {
        self.animator.state()
    }

    pub fn is_spinning(&self) -> bool {
        self.animator.is_spinning()
    }

    /// Most recently announced winner
    pub fn last_winner(&self) -> Option<&Participant> {
        self.last_winner.as_ref()
    }

    // === Participants ===

    fn ensure_idle(&self) -> Result<(), StateError> {
        if self.animator.is_spinning() {
            return Err(StateError::AlreadySpinning);
        }
        Ok(())
    }

    /// Persist, resync and repaint after a roster change
    fn roster_changed(&mut self) {
        if let Err(e) = self.roster.save(self.store.as_mut()) {
            log::warn!("Could not save participants: {}", e);
        }
        self.animator.set_segment_count(self.roster.len());
        self.renderer.invalidate();
        self.redraw();
    }

    pub fn add(&mut self, name: &str) -> Result<Participant, DrawError> {
        self.ensure_idle()?;
        let participant = self.roster.add(name)?;
        self.roster_changed();
        Ok(participant)
    }

    /// One name per line
    pub fn add_bulk(&mut self, text: &str) -> Result<Vec<Participant>, DrawError> {
        self.ensure_idle()?;
        let added = self.roster.add_lines(text)?;
        self.roster_changed();
        Ok(added)
    }

    pub fn remove(&mut self, id: &str) -> Result<Participant, DrawError> {
        self.ensure_idle()?;
        let removed = self.roster.remove(id)?;
        self.roster_changed();
        Ok(removed)
    }

    pub fn remove_by_name(&mut self, name: &str) -> Result<Participant, DrawError> {
        self.ensure_idle()?;
        let removed = self.roster.remove_by_name(name)?;
        self.roster_changed();
        Ok(removed)
    }

    /// Take the last announced winner off the wheel
    pub fn remove_winner(&mut self) -> Result<Participant, DrawError> {
        let id = self
            .last_winner
            .as_ref()
            .map(|p| p.id.clone())
            .ok_or_else(|| ValidationError::NotFound("no winner yet".to_string()))?;
        let removed = self.remove(&id)?;
        self.last_winner = None;
        Ok(removed)
    }

    /// Empty the wheel and reset its rotation
    pub fn clear(&mut self) -> Result<(), DrawError> {
        self.ensure_idle()?;
        self.roster.clear();
        self.animator.reset_rotation();
        self.roster_changed();
        Ok(())
    }

    pub fn shuffle(&mut self) -> Result<(), DrawError> {
        self.ensure_idle()?;
        self.roster.shuffle()?;
        self.roster_changed();
        Ok(())
    }

    // === History ===

    pub fn clear_history(&mut self) {
        self.history.clear();
        if let Err(e) = self.history.save(self.store.as_mut()) {
            log::warn!("Could not save winner history: {}", e);
        }
    }

    // === Settings ===

    /// Spin length from the seconds slider; applies from the next spin
    pub fn set_spin_seconds(&mut self, seconds: f64) {
        self.settings.set_spin_seconds(seconds);
        self.animator.set_timing(self.settings.timing());
        if let Err(e) = self.settings.save_to(self.store.as_mut()) {
            log::warn!("Could not save settings: {}", e);
        }
    }

    // === Spinning ===

    fn flush_announcement(&mut self) {
        if let Some(result) = self.animator.take_pending() {
            self.announce(&result);
        }
    }

    /// Client-side draw: pick a winner now, then animate to it
    pub fn spin(&mut self, now_ms: f64) -> Result<usize, DrawError> {
        self.ensure_idle()?;
        self.flush_announcement();

        let count = self.roster.len();
        let index = self.selector.pick(count, &mut self.rng)?;
        self.start_spin(index, now_ms)?;
        Ok(index)
    }

    /// Server-authoritative draw: animate to a winner chosen elsewhere.
    /// `participant_count` is the roster size the server spun.
    pub fn spin_to(
        &mut self,
        winner_index: usize,
        participant_count: usize,
        now_ms: f64,
    ) -> Result<(), DrawError> {
        self.ensure_idle()?;
        self.flush_announcement();

        if participant_count != self.roster.len() {
            return Err(StateError::RosterMismatch {
                expected: participant_count,
                actual: self.roster.len(),
            }
            .into());
        }
        self.selector.check(participant_count)?;
        self.start_spin(winner_index, now_ms)
    }

    /// Body for `POST /api/spin` covering the current roster
    pub fn spin_request(&self) -> serde_json::Value {
        serde_json::json!({ "participants": self.roster.participants() })
    }

    /// Animate to the server's draw when there is one, otherwise draw locally
    pub fn spin_from(
        &mut self,
        server: Option<&SpinResponse>,
        now_ms: f64,
    ) -> Result<usize, DrawError> {
        match server {
            Some(response) => {
                self.spin_to(response.winner_index, response.participants.len(), now_ms)?;
                Ok(response.winner_index)
            }
            None => self.spin(now_ms),
        }
    }

    fn start_spin(&mut self, index: usize, now_ms: f64) -> Result<(), DrawError> {
        let count = self.roster.len();
        let winner = self
            .roster
            .get(index)
            .cloned()
            .ok_or(ValidationError::IndexOutOfRange { index, count })?;
        self.animator.start(index, winner, count, now_ms)?;
        Ok(())
    }

    /// Host frame callback
    pub fn frame(&mut self, now_ms: f64) -> FrameStep {
        let step = self.animator.step(now_ms);
        if step.keep_running || step.stopped {
            self.renderer.draw(&self.roster, step.rotation);
        }
        if let Some(result) = &step.announce {
            self.announce(result);
        }
        step
    }

    fn announce(&mut self, result: &SpinResult) {
        log::info!("Winner: {} (#{})", result.winner.name, result.winner_index);
        self.history.record(&result.winner, crate::now_ms());
        if let Err(e) = self.history.save(self.store.as_mut()) {
            log::warn!("Could not save winner history: {}", e);
        }
        self.last_winner = Some(result.winner.clone());

        if self.settings.auto_remove_winner {
            match self.roster.remove(&result.winner.id) {
                Ok(_) => self.roster_changed(),
                Err(e) => log::warn!("Winner already gone: {}", e),
            }
        }
    }

    /// Repaint at the current rotation
    pub fn redraw(&mut self) {
        let rotation = self.animator.state().current_rotation;
        self.renderer.draw(&self.roster, rotation);
    }

    /// Host teardown
    pub fn cancel(&mut self) {
        self.animator.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::segment_under_pointer;
    use crate::persistence::MemoryStore;
    use crate::renderer::SvgSurface;

    fn app(names: &[&str]) -> LuckyDraw<SvgSurface> {
        let mut settings = Settings::default();
        settings.spin_duration_ms = 3000.0;
        let mut app = LuckyDraw::with_rngs(
            settings,
            Box::new(MemoryStore::default()),
            Some(SvgSurface::new(800.0, 800.0)),
            Roster::with_rng(Pcg32::seed_from_u64(11)),
            Pcg32::seed_from_u64(12),
        );
        if !names.is_empty() {
            app.add_bulk(&names.join("\n")).unwrap();
        }
        app
    }

    fn run_to_end(app: &mut LuckyDraw<SvgSurface>, start: f64) -> Option<SpinResult> {
        let mut now = start;
        loop {
            now += 16.0;
            let step = app.frame(now);
            if let Some(result) = step.announce {
                return Some(result);
            }
            if !step.keep_running {
                return None;
            }
        }
    }

    #[test]
    fn test_spin_needs_two_participants() {
        let mut a = app(&["solo"]);
        let err = a.spin(0.0).unwrap_err();
        assert!(matches!(
            err,
            DrawError::Validation(ValidationError::TooFewParticipants { count: 1, .. })
        ));
        assert!(!a.is_spinning());
    }

    #[test]
    fn test_full_spin_records_winner() {
        let mut a = app(&["Ann", "Ben", "Cat", "Dan"]);
        let index = a.spin(0.0).unwrap();
        let expected = a.roster().get(index).unwrap().clone();

        let result = run_to_end(&mut a, 0.0).expect("winner announced");
        assert_eq!(result.winner, expected);
        assert_eq!(a.history().latest().unwrap().id, expected.id);
        assert_eq!(a.last_winner(), Some(&expected));

        let landed = segment_under_pointer(a.wheel().current_rotation.to_degrees(), 4, 90.0);
        assert_eq!(landed, index);
    }

    #[test]
    fn test_second_spin_is_rejected_while_spinning() {
        let mut a = app(&["a", "b", "c"]);
        a.spin(0.0).unwrap();
        a.frame(100.0);
        let before = a.wheel();
        assert!(matches!(
            a.spin(120.0),
            Err(DrawError::State(StateError::AlreadySpinning))
        ));
        assert_eq!(a.wheel(), before);
    }

    #[test]
    fn test_roster_locked_during_spin() {
        let mut a = app(&["a", "b"]);
        a.spin(0.0).unwrap();
        assert!(a.add("c").is_err());
        assert!(a.clear().is_err());
        assert_eq!(a.roster().len(), 2);
    }

    #[test]
    fn test_mutation_rebuilds_cache_once() {
        let mut a = app(&["a", "b"]);
        let before = a.renderer().cache().rebuilds();
        a.add("c").unwrap();
        assert_eq!(a.renderer().cache().rebuilds(), before + 1);
        a.redraw();
        a.redraw();
        assert_eq!(a.renderer().cache().rebuilds(), before + 1);
    }

    #[test]
    fn test_auto_remove_winner() {
        let mut a = app(&["a", "b", "c"]);
        a.settings.auto_remove_winner = true;
        a.spin(0.0).unwrap();
        let result = run_to_end(&mut a, 0.0).unwrap();
        assert_eq!(a.roster().len(), 2);
        assert!(a.roster().position(&result.winner.id).is_none());
    }

    #[test]
    fn test_remove_winner_by_id() {
        let mut a = app(&["a", "b", "c"]);
        a.spin(0.0).unwrap();
        let result = run_to_end(&mut a, 0.0).unwrap();
        let removed = a.remove_winner().unwrap();
        assert_eq!(removed.id, result.winner.id);
        assert!(a.remove_winner().is_err());
    }

    #[test]
    fn test_server_authoritative_spin_lands_on_server_index() {
        let mut a = app(&["a", "b", "c", "d", "e"]);
        a.spin_to(3, 5, 0.0).unwrap();
        let result = run_to_end(&mut a, 0.0).unwrap();
        assert_eq!(result.winner_index, 3);
        assert_eq!(result.winner.name, "d");
        let landed = segment_under_pointer(a.wheel().current_rotation.to_degrees(), 5, 90.0);
        assert_eq!(landed, 3);
    }

    #[test]
    fn test_server_draw_drives_the_wheel() {
        let mut a = app(&["Ann", "Ben", "Cat", "Dan", "Eve", "Fay"]);
        let mut server = crate::api::ApiState::with_rngs(
            Settings::default(),
            Box::new(MemoryStore::default()),
            Roster::with_rng(Pcg32::seed_from_u64(21)),
            Pcg32::seed_from_u64(22),
        );
        let reply = server.handle(
            crate::api::Method::Post,
            "/api/spin",
            &a.spin_request().to_string(),
        );
        assert_eq!(reply.status, 200);
        let response: SpinResponse = serde_json::from_value(reply.value().unwrap().clone()).unwrap();

        let index = a.spin_from(Some(&response), 0.0).unwrap();
        assert_eq!(index, response.winner_index);
        let result = run_to_end(&mut a, 0.0).unwrap();
        assert_eq!(result.winner.id, response.winner["id"].as_str().unwrap());
        let landed = segment_under_pointer(a.wheel().current_rotation.to_degrees(), 6, 90.0);
        assert_eq!(landed, response.winner_index);
    }

    #[test]
    fn test_spin_from_without_server_draws_locally() {
        let mut a = app(&["a", "b", "c"]);
        let index = a.spin_from(None, 0.0).unwrap();
        assert!(index < 3);
        assert!(a.is_spinning());
    }

    #[test]
    fn test_cancel_mid_spin_announces_nothing() {
        let mut a = app(&["a", "b", "c"]);
        a.spin(0.0).unwrap();
        a.frame(1000.0);
        a.cancel();
        assert!(!a.is_spinning());
        let step = a.frame(5000.0);
        assert!(!step.keep_running);
        assert!(step.announce.is_none());
        assert!(a.history().is_empty());
        assert!(a.last_winner().is_none());
        assert!(a.spin(6000.0).is_ok());
    }

    #[test]
    fn test_server_roster_mismatch() {
        let mut a = app(&["a", "b", "c"]);
        assert!(matches!(
            a.spin_to(0, 4, 0.0),
            Err(DrawError::State(StateError::RosterMismatch { expected: 4, actual: 3 }))
        ));
        assert!(matches!(a.spin_to(3, 3, 0.0), Err(DrawError::Validation(_))));
    }

    #[test]
    fn test_clear_resets_rotation() {
        let mut a = app(&["a", "b"]);
        a.spin(0.0).unwrap();
        run_to_end(&mut a, 0.0);
        assert!(a.wheel().current_rotation > 0.0);
        a.clear().unwrap();
        assert_eq!(a.wheel().current_rotation, 0.0);
        assert_eq!(a.wheel().segment_count, 0);
    }

    #[test]
    fn test_spin_flushes_pending_announcement() {
        let mut a = app(&["a", "b", "c"]);
        a.spin(0.0).unwrap();
        // Stop the wheel but not the display delay
        a.frame(3000.0);
        assert!(a.history().is_empty());
        a.spin(3100.0).unwrap();
        assert_eq!(a.history().len(), 1);
    }

    #[test]
    fn test_spin_seconds_persisted() {
        let mut a = app(&["a", "b"]);
        a.set_spin_seconds(4.5);
        assert_eq!(a.settings().spin_duration_ms, 4500.0);
        assert_eq!(Settings::load_from(a.store.as_ref()).spin_duration_ms, 4500.0);
    }

    #[test]
    fn test_restores_from_store() {
        let mut store = MemoryStore::default();
        let mut roster = Roster::with_rng(Pcg32::seed_from_u64(1));
        roster.add_bulk(["x", "y"]).unwrap();
        roster.save(&mut store).unwrap();

        let a: LuckyDraw<SvgSurface> =
            LuckyDraw::new(Settings::default(), Box::new(store), None);
        assert_eq!(a.roster().participants(), roster.participants());
        assert_eq!(a.wheel().segment_count, 2);
    }
}
