//! Spins the whole app up on a random local port against an in-memory
//! local backend.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use top10::api::{AppState, build_app_router};
use top10::auth::SessionManager;
use top10::backend::LocalBackend;
use top10::draft::DraftStore;
use top10::draft::store::CACHE_NAMESPACE;
use top10::test_helpers;
use top10::toast::ToastBoard;

pub struct TestApp {
    pub base: String,
    pub backend: LocalBackend,
    pub drafts: DraftStore,
    drafts_dir: TempDir,
    shutdown: CancellationToken,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let pool = test_helpers::create_test_pool().await.unwrap();
        let backend = LocalBackend::new(pool);
        let drafts_dir = TempDir::new().unwrap();
        let drafts = DraftStore::new(drafts_dir.path(), Duration::from_millis(10)).unwrap();
        let shutdown = CancellationToken::new();
        tokio::spawn(drafts.clone().run_flusher(shutdown.clone()));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let state = AppState {
            tables: Arc::new(backend.clone()),
            auth: Arc::new(backend.clone()),
            sessions: SessionManager::new(),
            drafts: drafts.clone(),
            toasts: ToastBoard::default(),
            public_url: base.clone(),
        };

        tokio::spawn(async move {
            axum::serve(listener, build_app_router(state)).await.unwrap();
        });

        TestApp {
            base,
            backend,
            drafts,
            drafts_dir,
            shutdown,
        }
    }

    /// Contents of every draft file the flusher has written so far.
    pub fn draft_files(&self) -> Vec<String> {
        let dir = self.drafts_dir.path().join(CACHE_NAMESPACE);
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "json"))
            .filter_map(|entry| std::fs::read_to_string(entry.path()).ok())
            .collect()
    }

    /// Wait up to a second for a draft file containing `needle`.
    pub async fn wait_for_draft_file(&self, needle: &str) -> bool {
        for _ in 0..50 {
            if self.draft_files().iter().any(|contents| contents.contains(needle)) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// A client that keeps cookies, like a browser tab.
    pub fn browser(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .unwrap()
    }

    pub async fn get_html(&self, client: &reqwest::Client, path: &str) -> (u16, String) {
        let response = client.get(self.url(path)).send().await.unwrap();
        let status = response.status().as_u16();
        (status, response.text().await.unwrap())
    }

    /// Request a link for `email` and follow it. Returns the page landed on.
    pub async fn sign_in(&self, client: &reqwest::Client, email: &str) -> String {
        client
            .post(self.url("/auth/magic-link"))
            .form(&[("email", email)])
            .send()
            .await
            .unwrap();

        let link = self
            .backend
            .sent_links()
            .into_iter()
            .rev()
            .find(|link| link.email == email)
            .expect("no link was sent");

        client
            .get(&link.url)
            .send()
            .await
            .unwrap()
            .text()
            .await
            .unwrap()
    }

    /// Post the editor form. Returns the final URL path and body after the redirect.
    pub async fn submit(&self, client: &reqwest::Client, fields: &[(&str, &str)]) -> (String, String) {
        let response = client
            .post(self.url("/app"))
            .form(fields)
            .send()
            .await
            .unwrap();
        let path = response.url().path().to_string();
        (path, response.text().await.unwrap())
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
