use tokio::{
    sync::mpsc,
    time::{sleep_until, Instant},
};

use crate::{
    client::{Backend, QueryClient, Reply},
    models::Settings,
    nav::{self, Navigator},
    page::{Page, View},
    render::ResultRenderer,
};

/// Key code of the activate key (Enter).
const KEY_ENTER: u32 = 13;

/// A key press. Browsers have reported the key in three different fields
/// over the years; any of them may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Option<String>,
    pub key_code: Option<u32>,
    pub which: Option<u32>,
}

impl KeyEvent {
    pub fn enter() -> Self {
        Self {
            key: Some("Enter".to_string()),
            key_code: Some(KEY_ENTER),
            which: Some(KEY_ENTER),
        }
    }

    pub fn is_activate(&self) -> bool {
        let by_key = match self.key.as_deref() {
            Some("Enter") => true,
            Some(k) => k.parse::<u32>().ok() == Some(KEY_ENTER),
            None => false,
        };
        by_key || self.key_code == Some(KEY_ENTER) || self.which == Some(KEY_ENTER)
    }
}

/// Events coming from the search input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// The input value changed to the given text.
    Input(String),
    Key(KeyEvent),
}

/// Owns the search input state and wires it to the index, the renderer and
/// the navigator. Everything runs on one task; replies from in-flight
/// lookups are applied only while they are still the latest.
pub struct InputController<B, V, N> {
    settings: Settings,
    client: QueryClient<B>,
    renderer: ResultRenderer,
    page: Page,
    view: V,
    nav: N,

    // Debounced input waiting to be sent, and when.
    pending: Option<Instant>,
}

impl<B: Backend, V: View, N: Navigator> InputController<B, V, N> {
    pub fn new(settings: Settings, backend: B, view: V, nav: N) -> Self {
        Self {
            client: QueryClient::new(backend, settings.timeout),
            renderer: ResultRenderer::new(&settings),
            page: Page::default(),
            pending: None,
            settings,
            view,
            nav,
        }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn client(&self) -> &QueryClient<B> {
        &self.client
    }

    /// The input value changed.
    pub fn on_input(&mut self, value: &str) {
        self.page.word = value.to_string();

        if value.chars().count() <= self.settings.min_length {
            // Anything still in flight belongs to a longer input.
            self.pending = None;
            self.client.supersede();
            self.page.clear();
            self.view.refresh(&self.page);
            return;
        }

        if self.settings.debounce.is_zero() {
            self.client.query(value);
            return;
        }

        self.client.supersede();
        self.pending = Some(Instant::now() + self.settings.debounce);
    }

    /// Send the debounced input right away, if there is one.
    pub fn flush(&mut self) {
        if self.pending.take().is_some() {
            let word = self.page.word.clone();
            self.client.query(&word);
        }
    }

    /// A key was pressed. Returns the navigation target if the key
    /// activated the top entry.
    pub fn on_key(&mut self, ev: &KeyEvent) -> Option<String> {
        if !ev.is_activate() {
            return None;
        }
        nav::activate(&self.page, &mut self.nav).map(str::to_string)
    }

    /// A lookup finished.
    pub fn on_reply(&mut self, reply: Reply) {
        let Some(reply) = self.client.accept(reply) else {
            return;
        };

        match reply.result {
            Ok(model) => {
                let list = self.renderer.render(&reply.word, &model);
                self.page.show(
                    list,
                    &self.settings.exists_color,
                    &self.settings.not_exists_color,
                );
            }
            Err(e) => {
                log::warn!("query '{}' failed: {}", reply.word, e);
                self.page.mark_error(e.to_string());
            }
        }

        self.view.refresh(&self.page);
    }

    /// Wait for one reply and apply it if it is current.
    pub async fn process_reply(&mut self) -> bool {
        match self.client.next_reply().await {
            Some(reply) => {
                self.on_reply(reply);
                true
            }
            None => false,
        }
    }

    /// Event loop: runs until the event source closes. The last input is
    /// still sent and its reply applied before returning.
    pub async fn run(mut self, mut events: mpsc::Receiver<UiEvent>) {
        loop {
            let deadline = self.pending;

            tokio::select! {
                ev = events.recv() => match ev {
                    Some(UiEvent::Input(value)) => self.on_input(&value),
                    Some(UiEvent::Key(key)) => {
                        self.on_key(&key);
                    }
                    None => break,
                },
                Some(reply) = self.client.next_reply() => self.on_reply(reply),
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    self.flush();
                }
            }
        }

        self.flush();
        while self.client.awaiting() {
            if !self.process_reply().await {
                break;
            }
        }

        log::debug!("input closed, {} queries sent", self.client.dispatched());
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{Arc, Mutex},
        time::Duration,
    };

    use super::*;
    use crate::{
        client::{testing::ScriptedBackend, QueryError},
        models::{CompletionEntry, ResultModel},
        nav::testing::RecordingNavigator,
    };

    #[derive(Clone, Default)]
    struct RecordingView {
        pages: Arc<Mutex<Vec<Page>>>,
    }

    impl View for RecordingView {
        fn refresh(&mut self, page: &Page) {
            self.pages.lock().unwrap().push(page.clone());
        }
    }

    type Controller = InputController<ScriptedBackend, RecordingView, RecordingNavigator>;

    fn controller(settings: Settings) -> (Controller, ScriptedBackend, RecordingView) {
        let backend = ScriptedBackend::default();
        let view = RecordingView::default();
        let c = InputController::new(
            settings,
            backend.clone(),
            view.clone(),
            RecordingNavigator::default(),
        );
        (c, backend, view)
    }

    fn model(exists: bool, indexes: &[&str], completions: &[(&str, &[&str])]) -> ResultModel {
        let strings = |s: &[&str]| s.iter().map(|x| x.to_string()).collect::<Vec<_>>();
        ResultModel {
            exists,
            indexes: strings(indexes),
            completions: Some(
                completions
                    .iter()
                    .map(|(w, idx)| CompletionEntry {
                        word: w.to_string(),
                        indexes: strings(idx),
                    })
                    .collect(),
            ),
            stats: None,
        }
    }

    fn labels(page: &Page) -> Vec<String> {
        page.entries
            .iter()
            .map(|e| format!("{}/{}", e.label, e.index))
            .collect()
    }

    #[tokio::test]
    async fn test_short_input_is_not_queried() {
        let (mut c, _, view) = controller(Settings {
            min_length: 2,
            ..Settings::default()
        });

        c.on_input("a");
        c.on_input("ab");
        c.on_input("");

        assert_eq!(c.client().dispatched(), 0);
        assert!(c.page().entries.is_empty());
        assert!(c.page().color.is_none());
        assert_eq!(view.pages.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_last_input_wins_regardless_of_arrival() {
        let (mut c, backend, view) = controller(Settings::default());
        let r1 = backend.expect("c");
        let r2 = backend.expect("ca");
        let r3 = backend.expect("cat");

        c.on_input("c");
        c.on_input("ca");
        c.on_input("cat");
        assert_eq!(c.client().dispatched(), 3);

        r2.send(Ok(model(false, &[], &[("cab", &["en"])]))).unwrap();
        r3.send(Ok(model(true, &["en", "simple"], &[("catalog", &["en"])])))
            .unwrap();
        r1.send(Ok(model(false, &[], &[("cow", &["en"])]))).unwrap();

        for _ in 0..3 {
            assert!(c.process_reply().await);
        }

        assert_eq!(
            labels(c.page()),
            vec!["cat/en", "cat/simple", "catalog/en"]
        );
        assert_eq!(c.page().color.as_deref(), Some("#000000"));

        // Stale replies never reached the view.
        let pages = view.pages.lock().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].word, "cat");
    }

    #[tokio::test]
    async fn test_no_match_scenario() {
        let (mut c, backend, _) = controller(Settings::default());
        backend.respond("zzqx", Ok(model(false, &[], &[])));

        c.on_input("zzqx");
        c.process_reply().await;

        assert!(c.page().entries.is_empty());
        assert_eq!(c.page().color.as_deref(), Some("#CC0000"));
        assert_eq!(c.on_key(&KeyEvent::enter()), None);
        assert!(c.nav.visited.is_empty());
    }

    #[tokio::test]
    async fn test_clear_discards_in_flight_reply() {
        let (mut c, backend, _) = controller(Settings::default());
        let dog = backend.expect("dog");

        c.on_input("dog");
        c.on_input("");
        dog.send(Ok(model(true, &["en"], &[]))).unwrap();
        c.process_reply().await;

        assert_eq!(c.page().word, "");
        assert!(c.page().entries.is_empty());
        assert!(c.page().color.is_none());
    }

    #[tokio::test]
    async fn test_error_keeps_previous_results() {
        let (mut c, backend, _) = controller(Settings::default());
        backend.respond("cat", Ok(model(true, &["en"], &[])));
        backend.respond("cats", Err(QueryError::Status(500)));

        c.on_input("cat");
        c.process_reply().await;
        c.on_input("cats");
        c.process_reply().await;

        assert_eq!(labels(c.page()), vec!["cat/en"]);
        assert_eq!(c.page().error.as_deref(), Some("index returned HTTP 500"));

        // The next good reply clears the marker.
        backend.respond("cat", Ok(model(true, &["en"], &[])));
        c.on_input("cat");
        c.process_reply().await;
        assert!(c.page().error.is_none());
    }

    #[tokio::test]
    async fn test_enter_navigates_to_first_entry() {
        let (mut c, backend, _) = controller(Settings::default());
        backend.respond(
            "cat",
            Ok(model(true, &["simple", "en"], &[("catalog", &["en"])])),
        );

        c.on_input("cat");
        c.process_reply().await;

        let other = KeyEvent {
            key: Some("a".to_string()),
            key_code: Some(65),
            which: Some(65),
        };
        assert_eq!(c.on_key(&other), None);

        let target = c.on_key(&KeyEvent::enter());
        assert_eq!(
            target.as_deref(),
            Some("https://simple.wikipedia.org/wiki/cat")
        );
        assert_eq!(c.nav.visited, vec!["https://simple.wikipedia.org/wiki/cat"]);
    }

    #[test]
    fn test_activate_key_fields() {
        let only = |key: Option<&str>, key_code: Option<u32>, which: Option<u32>| KeyEvent {
            key: key.map(str::to_string),
            key_code,
            which,
        };

        assert!(only(Some("Enter"), None, None).is_activate());
        assert!(only(Some("13"), None, None).is_activate());
        assert!(only(None, Some(13), None).is_activate());
        assert!(only(None, None, Some(13)).is_activate());
        assert!(!only(Some("Tab"), Some(9), Some(9)).is_activate());
        assert!(!KeyEvent::default().is_activate());
    }

    #[tokio::test]
    async fn test_debounce_sends_only_settled_input() {
        let (c, backend, view) = controller(Settings {
            debounce: Duration::from_millis(30),
            ..Settings::default()
        });
        // Lookups of "c" or "ca" would fail as unexpected.
        backend.respond("cat", Ok(model(true, &["en"], &[])));

        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(c.run(rx));

        for w in ["c", "ca", "cat"] {
            tx.send(UiEvent::Input(w.to_string())).await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
        drop(tx);
        handle.await.unwrap();

        let pages = view.pages.lock().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].word, "cat");
        assert_eq!(labels(&pages[0]), vec!["cat/en"]);
        assert!(pages[0].error.is_none());
    }

    #[tokio::test]
    async fn test_reply_after_input_closed_is_shown() {
        let (c, backend, view) = controller(Settings::default());
        let dog = backend.expect("dog");

        let (tx, rx) = mpsc::channel(8);
        tx.send(UiEvent::Input("dog".to_string())).await.unwrap();
        drop(tx);

        let handle = tokio::spawn(c.run(rx));
        tokio::time::sleep(Duration::from_millis(20)).await;
        dog.send(Ok(model(true, &["en"], &[]))).unwrap();
        handle.await.unwrap();

        let pages = view.pages.lock().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(labels(&pages[0]), vec!["dog/en"]);
    }

    #[tokio::test]
    async fn test_pending_debounce_is_sent_when_input_closes() {
        let (c, backend, view) = controller(Settings {
            debounce: Duration::from_secs(60),
            ..Settings::default()
        });
        backend.respond("cat", Ok(model(true, &["en"], &[])));

        let (tx, rx) = mpsc::channel(8);
        tx.send(UiEvent::Input("cat".to_string())).await.unwrap();
        drop(tx);

        tokio::time::timeout(Duration::from_secs(5), c.run(rx))
            .await
            .unwrap();

        let pages = view.pages.lock().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].word, "cat");
    }

    #[tokio::test]
    async fn test_closed_input_after_clear_returns() {
        let (c, _, view) = controller(Settings::default());

        let (tx, rx) = mpsc::channel(8);
        tx.send(UiEvent::Input(String::new())).await.unwrap();
        drop(tx);
        c.run(rx).await;

        assert_eq!(view.pages.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_run_loop_applies_replies_and_keys() {
        let (c, backend, view) = controller(Settings::default());
        backend.respond("dog", Ok(model(true, &["en"], &[("dogma", &["en"])])));

        let (tx, rx) = mpsc::channel(8);
        let handle = tokio::spawn(c.run(rx));

        tx.send(UiEvent::Input("dog".to_string())).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(UiEvent::Key(KeyEvent::enter())).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        let pages = view.pages.lock().unwrap();
        assert_eq!(labels(pages.last().unwrap()), vec!["dog/en", "dogma/en"]);
    }
}
