//! Binds [`EditorState`] to an editable [`Surface`] and host callbacks.

use crate::debounce::TimerToken;
use crate::editor::{EditorEvent, EditorState, Effect};
use crate::format::TokenFormatter;
use crate::render::{apply_render, caret_offset, Surface};
use crate::suggest::{
    filter_candidates, Candidate, ProviderError, RequestId, SuggestionRequest, SuggestionSelection,
};
use crate::token::{Token, TokenKind};
use std::time::{Duration, Instant};
use tracing::warn;

/// Callbacks the host receives from the editor. All default to no-ops.
pub trait EditorHooks {
    /// Raw surface text on every keystroke, before tokenizing.
    fn on_input(&mut self, _raw: &str) {}
    /// Normalized query string after a committed change.
    fn on_change(&mut self, _query: &str) {}
    /// Fragment the popup list should be filtered by.
    fn on_search(&mut self, _fragment: &str) {}
    /// Submit.
    fn on_query(&mut self) {}
    fn pop_up(&mut self, _id: RequestId, _request: &SuggestionRequest) {}
    fn pop_down(&mut self) {}
}

pub struct QueryStringEditor<S: Surface, H: EditorHooks> {
    state: EditorState,
    surface: S,
    hooks: H,
    timers: Vec<(TimerToken, Instant)>,
    search: String,
}

impl<S: Surface, H: EditorHooks> QueryStringEditor<S, H> {
    pub fn new(
        mut surface: S,
        initial: &str,
        hooks: H,
        debounce: Duration,
        formatter: Box<dyn TokenFormatter>,
    ) -> Self {
        let state = EditorState::with_options(initial, debounce, formatter);
        apply_render(&mut surface, &state.render());
        Self {
            state,
            surface,
            hooks,
            timers: Vec::new(),
            search: String::new(),
        }
    }

    pub fn query_string(&self) -> &str {
        self.state.query_string()
    }

    pub fn tokens(&self) -> &[Token] {
        self.state.tokens()
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// The surface for the platform layer to type into.
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn hooks(&self) -> &H {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut H {
        &mut self.hooks
    }

    /// Last fragment sent through `on_search`.
    pub fn search(&self) -> &str {
        &self.search
    }

    /// The surface content changed.
    pub fn input(&mut self, now: Instant) {
        let event = EditorEvent::Input {
            text: self.surface.text(),
            caret: caret_offset(&self.surface),
        };
        self.dispatch(event, now);
    }

    pub fn composition_start(&mut self, now: Instant) {
        self.dispatch(EditorEvent::CompositionStart, now);
    }

    pub fn composition_end(&mut self, now: Instant) {
        let event = EditorEvent::CompositionEnd {
            text: self.surface.text(),
            caret: caret_offset(&self.surface),
        };
        self.dispatch(event, now);
    }

    pub fn click(&mut self, now: Instant) {
        let caret = caret_offset(&self.surface);
        self.dispatch(EditorEvent::Click { caret }, now);
    }

    pub fn enter(&mut self, now: Instant) {
        let text = self.surface.text();
        self.dispatch(EditorEvent::Enter { text }, now);
    }

    pub fn escape(&mut self, now: Instant) {
        self.dispatch(EditorEvent::Escape, now);
    }

    /// Fires every debounce timer due at `now`.
    pub fn tick(&mut self, now: Instant) {
        let (due, waiting): (Vec<_>, Vec<_>) =
            self.timers.drain(..).partition(|(_, deadline)| *deadline <= now);
        self.timers = waiting;
        for (token, _) in due {
            self.dispatch(EditorEvent::TimerFired(token), now);
        }
    }

    /// Earliest pending timer deadline.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.iter().map(|(_, deadline)| *deadline).min()
    }

    /// Replaces the buffer without notifying `on_change`.
    pub fn set_query_string(&mut self, text: &str) {
        let caret = caret_offset(&self.surface);
        let event = EditorEvent::SetQueryString {
            text: text.to_string(),
            caret,
        };
        self.dispatch(event, Instant::now());
    }

    /// Inserts a picked suggestion.
    pub fn set_token(&mut self, value: &str, kind: TokenKind) {
        let event = EditorEvent::SetToken(SuggestionSelection::new(value, kind));
        self.dispatch(event, Instant::now());
    }

    pub fn set_is_popup(&mut self, open: bool) {
        self.dispatch(EditorEvent::SetPopup(open), Instant::now());
    }

    /// Accepts the provider's answer for request `id`.
    ///
    /// Returns `None` when a newer request superseded `id`. Provider failures
    /// degrade to an empty list.
    pub fn receive_candidates(
        &self,
        id: RequestId,
        result: Result<Vec<Candidate>, ProviderError>,
    ) -> Option<Vec<Candidate>> {
        if !self.state.accepts(id) {
            return None;
        }
        match result {
            Ok(candidates) => Some(filter_candidates(candidates, &self.search)),
            Err(err) => {
                warn!(%err, "suggestion provider failed");
                Some(Vec::new())
            }
        }
    }

    fn dispatch(&mut self, event: EditorEvent, now: Instant) {
        for effect in self.state.handle(event) {
            self.apply(effect, now);
        }
    }

    fn apply(&mut self, effect: Effect, now: Instant) {
        match effect {
            Effect::Input(raw) => self.hooks.on_input(&raw),
            Effect::Change(query) => self.hooks.on_change(&query),
            Effect::Search(fragment) => {
                self.hooks.on_search(&fragment);
                self.search = fragment;
            }
            Effect::Query => self.hooks.on_query(),
            Effect::PopUp { id, request } => self.hooks.pop_up(id, &request),
            Effect::PopDown => self.hooks.pop_down(),
            Effect::Render(rendered) => apply_render(&mut self.surface, &rendered),
            Effect::ScheduleTimer { token, delay } => self.timers.push((token, now + delay)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{EqualityQuoteFormatter, PlainFormatter};
    use crate::render::TextSurface;

    #[derive(Debug, Default)]
    struct Recorder {
        inputs: Vec<String>,
        changes: Vec<String>,
        searches: Vec<String>,
        queries: usize,
        popups: Vec<(RequestId, SuggestionRequest)>,
        popdowns: usize,
    }

    impl EditorHooks for Recorder {
        fn on_input(&mut self, raw: &str) {
            self.inputs.push(raw.to_string());
        }
        fn on_change(&mut self, query: &str) {
            self.changes.push(query.to_string());
        }
        fn on_search(&mut self, fragment: &str) {
            self.searches.push(fragment.to_string());
        }
        fn on_query(&mut self) {
            self.queries += 1;
        }
        fn pop_up(&mut self, id: RequestId, request: &SuggestionRequest) {
            self.popups.push((id, request.clone()));
        }
        fn pop_down(&mut self) {
            self.popdowns += 1;
        }
    }

    const DELAY: Duration = Duration::from_millis(300);

    fn editor(initial: &str) -> QueryStringEditor<TextSurface, Recorder> {
        QueryStringEditor::new(
            TextSurface::new(),
            initial,
            Recorder::default(),
            DELAY,
            Box::new(PlainFormatter),
        )
    }

    #[test]
    fn test_typing_is_debounced_and_caret_survives() {
        let mut ed = editor("status:activ");
        let start = Instant::now();
        assert_eq!(caret_offset(ed.surface()), 12);

        ed.surface_mut().type_text("e");
        ed.input(start);
        assert_eq!(ed.hooks().inputs, vec!["status:active"]);
        assert!(ed.hooks().changes.is_empty());

        ed.tick(start + Duration::from_millis(100));
        assert!(ed.hooks().changes.is_empty());

        ed.tick(start + DELAY);
        assert_eq!(ed.hooks().changes, vec!["status:active"]);
        assert_eq!(caret_offset(ed.surface()), 13);
        assert_eq!(ed.surface().spans().len(), 3);
        assert!(ed.surface().is_focused());
        assert_eq!(ed.next_deadline(), None);
    }

    #[test]
    fn test_rapid_typing_commits_once() {
        let mut ed = editor("");
        let start = Instant::now();
        for (i, c) in ["h", "o", "s", "t"].into_iter().enumerate() {
            ed.surface_mut().type_text(c);
            ed.input(start + Duration::from_millis(50 * i as u64));
        }
        ed.tick(start + Duration::from_secs(5));
        assert_eq!(ed.hooks().inputs.len(), 4);
        assert_eq!(ed.hooks().changes, vec!["host"]);
        let (_, request) = ed.hooks().popups.last().unwrap();
        assert_eq!(request, &SuggestionRequest::new(TokenKind::Method, "host"));
        assert_eq!(ed.search(), "host");
        assert_eq!(ed.hooks().searches.last().map(String::as_str), Some("host"));
    }

    #[test]
    fn test_paste_then_enter_flushes() {
        let mut ed = editor("");
        ed.surface_mut().set_raw_text("level:error");
        ed.enter(Instant::now());
        assert_eq!(ed.hooks().changes, vec!["level:error"]);
        assert_eq!(ed.hooks().queries, 1);
        assert_eq!(ed.query_string(), "level:error");
    }

    #[test]
    fn test_set_query_string_is_silent_and_keeps_caret() {
        let mut ed = editor("ab");
        ed.surface_mut().move_caret(1);
        ed.set_query_string("level:error");
        assert!(ed.hooks().changes.is_empty());
        assert_eq!(ed.surface().text(), "level:error");
        assert_eq!(caret_offset(ed.surface()), 1);
    }

    #[test]
    fn test_set_token_quotes_equality_value() {
        let mut ed = QueryStringEditor::new(
            TextSurface::new(),
            "env:",
            Recorder::default(),
            DELAY,
            Box::new(EqualityQuoteFormatter),
        );
        ed.set_token("prod", TokenKind::Value);
        assert!(ed.query_string().contains(r#"env:"prod""#));
        assert_eq!(ed.hooks().changes, vec![r#"env:"prod""#]);
        assert_eq!(caret_offset(ed.surface()), ed.query_string().chars().count());
    }

    #[test]
    fn test_click_opens_then_closes() {
        let mut ed = editor("");
        ed.click(Instant::now());
        assert_eq!(ed.hooks().popups.len(), 1);
        ed.click(Instant::now());
        assert_eq!(ed.hooks().popdowns, 1);
    }

    #[test]
    fn test_stale_candidates_are_dropped() {
        let mut ed = editor("");
        ed.click(Instant::now());
        let (old, _) = ed.hooks().popups[0].clone();
        ed.set_is_popup(false);
        ed.click(Instant::now());
        let (new, _) = ed.hooks().popups[1].clone();

        let answer = || Ok(vec![Candidate::new("host", "host")]);
        assert_eq!(ed.receive_candidates(old, answer()), None);
        assert_eq!(ed.receive_candidates(new, answer()).map(|c| c.len()), Some(1));
        assert_eq!(
            ed.receive_candidates(new, Err(ProviderError::Unavailable("timeout".into()))),
            Some(Vec::new())
        );
    }

    #[test]
    fn test_composition_window() {
        let mut ed = editor("");
        let now = Instant::now();
        ed.composition_start(now);
        ed.surface_mut().type_text("zhuang");
        ed.input(now);
        assert!(ed.hooks().inputs.is_empty());
        ed.surface_mut().set_raw_text("状态");
        ed.composition_end(now);
        ed.tick(now + DELAY);
        assert_eq!(ed.hooks().changes, vec!["状态"]);
    }
}
