//! Browser session lifecycle and its tool-class adapter.
//!
//! `BrowserManager` owns the Chromium process for one session: launch with
//! the persona fingerprint, hand out stealth-initialized pages, tear down.
//! `BrowserManagerClass` declares that surface as a tool class so the
//! synthesizer can expose `initialize_browser_manager`,
//! `start_browser_manager` and `stop_browser_manager` to the model.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport;
use futures_util::StreamExt;
use serde_json::{json, Map, Value};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::toolgen::{
    expect_instance, BoxedInstance, DeclaredType, FunctionDecl, InstanceArena, ParamDecl,
    ToolClass, ToolError,
};

use super::cdp::CdpPage;
use super::fingerprint::DeviceProfile;
use super::{BrowserError, PageRef};

const DEFAULT_USER_DATA_DIR: &str = "./browser_data";

/// Manages a persistent Chromium instance with a realistic user profile.
pub struct BrowserManager {
    user_data_dir: PathBuf,
    debug: bool,
    profile: DeviceProfile,
    browser: Option<Browser>,
    handler_task: Option<JoinHandle<()>>,
}

impl BrowserManager {
    pub fn new(user_data_dir: Option<PathBuf>, debug: bool) -> Self {
        Self {
            user_data_dir: user_data_dir
                .unwrap_or_else(|| PathBuf::from(DEFAULT_USER_DATA_DIR)),
            debug,
            profile: DeviceProfile::macbook_pro(),
            browser: None,
            handler_task: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.browser.is_some()
    }

    /// Launches Chromium with the persona fingerprint and returns a fresh
    /// stealth-initialized page.
    pub async fn start(&mut self) -> Result<PageRef, BrowserError> {
        if self.browser.is_some() {
            return Err(BrowserError::Launch(
                "browser session already started".to_string(),
            ));
        }

        std::fs::create_dir_all(&self.user_data_dir)
            .map_err(|e| BrowserError::Launch(format!("user data dir: {}", e)))?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&self.user_data_dir)
            .window_size(self.profile.screen_width, self.profile.screen_height)
            .viewport(Viewport {
                width: self.profile.screen_width,
                height: self.profile.screen_height,
                device_scale_factor: Some(self.profile.scale_factor),
                emulating_mobile: false,
                is_landscape: false,
                has_touch: false,
            });
        if self.debug {
            builder = builder.with_head();
        }
        for arg in self.profile.launch_args() {
            builder = builder.arg(arg);
        }
        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Launch(format!("new page: {}", e)))?;
        if let Err(e) = page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(
                self.profile.stealth_script(),
            ))
            .await
        {
            warn!(error = %e, "stealth script injection failed");
        }

        debug!(user_data_dir = %self.user_data_dir.display(), "browser session started");
        self.browser = Some(browser);
        self.handler_task = Some(handler_task);
        Ok(Arc::new(CdpPage::new(page)))
    }

    /// Tears the session down. Safe to call when nothing is running.
    pub async fn stop(&mut self) -> Result<(), BrowserError> {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "browser close failed");
            }
        }
        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
        Ok(())
    }
}

/// Declares `BrowserManager` for the class-function synthesizer. The
/// configured defaults apply when the model omits constructor arguments.
pub struct BrowserManagerClass {
    default_user_data_dir: Option<PathBuf>,
    default_debug: bool,
}

impl BrowserManagerClass {
    pub fn new(default_user_data_dir: Option<PathBuf>, default_debug: bool) -> Self {
        Self {
            default_user_data_dir,
            default_debug,
        }
    }
}

#[async_trait]
impl ToolClass for BrowserManagerClass {
    fn class_name(&self) -> &str {
        "BrowserManager"
    }

    fn constructor(&self) -> FunctionDecl {
        FunctionDecl::new(
            "new",
            "Initialize the browser manager with a consistent user profile.\n\n\
             Args:\n    \
             user_data_dir (str): Directory to store persistent browser data. \
             If omitted, defaults to './browser_data'.\n    \
             debug (bool): Run the browser headfully for debugging.",
            vec![
                ParamDecl::optional("user_data_dir", DeclaredType::Str, Value::Null),
                ParamDecl::optional("debug", DeclaredType::Bool, json!(false)),
            ],
        )
    }

    fn methods(&self) -> Vec<FunctionDecl> {
        vec![
            FunctionDecl::new(
                "start",
                "Initializes and launches a new browser instance.\n\n\
                 Returns:\n    BrowserPage: a handle to a new browser page \
                 ready for automation. Pass it to the grocery and scraping \
                 tools that take a page argument.",
                vec![],
            )
            .returning(DeclaredType::Named("BrowserPage".to_string())),
            FunctionDecl::new(
                "stop",
                "Stops and cleans up browser automation resources.\n\n\
                 Closes the active browser and releases the session. Page \
                 handles from this session become unusable afterwards.",
                vec![],
            ),
        ]
    }

    async fn construct(&self, args: &Map<String, Value>) -> Result<BoxedInstance, ToolError> {
        let user_data_dir = args
            .get("user_data_dir")
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .or_else(|| self.default_user_data_dir.clone());
        let debug = args
            .get("debug")
            .and_then(Value::as_bool)
            .unwrap_or(self.default_debug);
        Ok(Box::new(BrowserManager::new(user_data_dir, debug)))
    }

    async fn invoke(
        &self,
        arena: &InstanceArena,
        method: &str,
        handle: &str,
        _args: &Map<String, Value>,
    ) -> Result<Value, ToolError> {
        enum Outcome {
            Page(PageRef),
            Done,
        }

        let mut boxed = arena.checkout(handle).await?;
        let manager = match expect_instance::<BrowserManager>(&mut boxed, handle, "BrowserManager")
        {
            Ok(manager) => manager,
            Err(e) => {
                arena.checkin(handle, boxed).await;
                return Err(e);
            }
        };

        let outcome = match method {
            "start" => manager
                .start()
                .await
                .map(Outcome::Page)
                .map_err(|e| ToolError::invocation("start_browser_manager", e)),
            "stop" => manager
                .stop()
                .await
                .map(|_| Outcome::Done)
                .map_err(|e| ToolError::invocation("stop_browser_manager", e)),
            other => Err(ToolError::invocation(
                other,
                format!("BrowserManager has no method `{}`", other),
            )),
        };
        arena.checkin(handle, boxed).await;

        match outcome? {
            Outcome::Page(page) => {
                let page_handle = arena.insert("browser_page", Box::new(page)).await;
                Ok(Value::String(page_handle))
            }
            Outcome::Done => Ok(Value::Null),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolgen::synthesize::synthesize;

    fn rt() -> tokio::runtime::Runtime {
        tokio::runtime::Runtime::new().unwrap()
    }

    #[test]
    fn test_synthesized_surface() {
        let arena = Arc::new(InstanceArena::new());
        let funcs = synthesize(Arc::new(BrowserManagerClass::new(None, false)), arena);
        let names: Vec<&str> = funcs.iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            vec![
                "initialize_browser_manager",
                "start_browser_manager",
                "stop_browser_manager"
            ]
        );
    }

    #[test]
    fn test_initialize_stores_manager_without_launching() {
        let rt = rt();
        rt.block_on(async {
            let arena = Arc::new(InstanceArena::new());
            let funcs = synthesize(Arc::new(BrowserManagerClass::new(None, false)), arena.clone());
            let handle = (funcs[0].callable)(json!({ "debug": true }))
                .await
                .unwrap();
            assert!(handle.as_str().unwrap().starts_with("browser_manager-"));

            let mut boxed = arena.checkout(handle.as_str().unwrap()).await.unwrap();
            let manager =
                expect_instance::<BrowserManager>(&mut boxed, "h", "BrowserManager").unwrap();
            assert!(!manager.is_running());
        });
    }

    #[test]
    fn test_stop_without_start_is_harmless() {
        let rt = rt();
        rt.block_on(async {
            let mut manager = BrowserManager::new(None, false);
            manager.stop().await.unwrap();
            assert!(!manager.is_running());
        });
    }
}
