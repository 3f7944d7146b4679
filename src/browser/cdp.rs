//! Chrome DevTools Protocol implementations of `Page` and `Locator`.
//!
//! Locators here are selector chains resolved at action time: each `Css`
//! step queries within the elements of the previous step, and `Nth` picks
//! one match. A `:has-text("...")` suffix on a selector is handled by
//! filtering resolved elements on their inner text, since it is not valid
//! CSS the DOM can evaluate.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::element::Element;
use serde_json::Value;

use super::{BrowserError, Locator, Page, WaitPolicy};

const WAIT_TIMEOUT: Duration = Duration::from_secs(10);
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// `Page` backed by a live CDP page.
pub struct CdpPage {
    inner: chromiumoxide::Page,
}

impl CdpPage {
    pub fn new(inner: chromiumoxide::Page) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl Page for CdpPage {
    async fn navigate(&self, url: &str, wait: WaitPolicy) -> Result<(), BrowserError> {
        self.inner
            .goto(url)
            .await
            .map_err(|e| BrowserError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        if wait == WaitPolicy::NetworkIdle {
            // Best effort: a page that is already settled reports nothing
            // further to wait for.
            let _ = self.inner.wait_for_navigation().await;
        }
        Ok(())
    }

    fn locate(&self, selector: &str) -> Box<dyn Locator> {
        Box::new(CdpLocator {
            page: self.inner.clone(),
            steps: vec![Step::css(selector)],
        })
    }

    async fn evaluate(&self, script: &str) -> Result<Value, BrowserError> {
        let evaluation = self
            .inner
            .evaluate(script)
            .await
            .map_err(|e| BrowserError::Script(e.to_string()))?;
        Ok(evaluation.value().cloned().unwrap_or(Value::Null))
    }
}

#[derive(Debug, Clone)]
enum Step {
    Css {
        selector: String,
        has_text: Option<String>,
    },
    Nth(usize),
}

impl Step {
    fn css(raw: &str) -> Self {
        let (selector, has_text) = split_has_text(raw);
        Step::Css { selector, has_text }
    }
}

/// Splits a trailing `:has-text("...")` pseudo-class off a selector.
fn split_has_text(raw: &str) -> (String, Option<String>) {
    const MARKER: &str = ":has-text(";
    let Some(start) = raw.rfind(MARKER) else {
        return (raw.to_string(), None);
    };
    let rest = &raw[start + MARKER.len()..];
    let Some(end) = rest.rfind(')') else {
        return (raw.to_string(), None);
    };
    let needle = rest[..end].trim().trim_matches('"').trim_matches('\'');
    (raw[..start].trim().to_string(), Some(needle.to_string()))
}

/// Lazy locator over a selector chain.
pub struct CdpLocator {
    page: chromiumoxide::Page,
    steps: Vec<Step>,
}

impl CdpLocator {
    fn describe(&self) -> String {
        self.steps
            .iter()
            .map(|step| match step {
                Step::Css { selector, has_text } => match has_text {
                    Some(text) => format!("{}:has-text(\"{}\")", selector, text),
                    None => selector.clone(),
                },
                Step::Nth(i) => format!(":nth({})", i),
            })
            .collect::<Vec<_>>()
            .join(" >> ")
    }

    fn extend(&self, step: Step) -> Box<dyn Locator> {
        let mut steps = self.steps.clone();
        steps.push(step);
        Box::new(CdpLocator {
            page: self.page.clone(),
            steps,
        })
    }

    async fn resolve(&self) -> Result<Vec<Element>, BrowserError> {
        let mut current: Option<Vec<Element>> = None;
        for step in &self.steps {
            match step {
                Step::Css { selector, has_text } => {
                    let mut found = match &current {
                        None => self.page.find_elements(selector.as_str()).await.map_err(
                            |e| BrowserError::Selector {
                                selector: selector.clone(),
                                reason: e.to_string(),
                            },
                        )?,
                        Some(scope) => {
                            let mut all = Vec::new();
                            for element in scope {
                                if let Ok(children) =
                                    element.find_elements(selector.as_str()).await
                                {
                                    all.extend(children);
                                }
                            }
                            all
                        }
                    };
                    if let Some(needle) = has_text {
                        let mut kept = Vec::new();
                        for element in found {
                            let text = element.inner_text().await.ok().flatten();
                            if text.is_some_and(|t| t.contains(needle.as_str())) {
                                kept.push(element);
                            }
                        }
                        found = kept;
                    }
                    current = Some(found);
                }
                Step::Nth(index) => {
                    let elements = current.take().unwrap_or_default();
                    current = Some(elements.into_iter().nth(*index).into_iter().collect());
                }
            }
        }
        Ok(current.unwrap_or_default())
    }

    async fn first(&self) -> Result<Element, BrowserError> {
        self.resolve()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::Selector {
                selector: self.describe(),
                reason: "no matching element".to_string(),
            })
    }
}

#[async_trait]
impl Locator for CdpLocator {
    async fn count(&self) -> Result<usize, BrowserError> {
        Ok(self.resolve().await?.len())
    }

    async fn wait(&self) -> Result<(), BrowserError> {
        let started = Instant::now();
        loop {
            if !self.resolve().await?.is_empty() {
                return Ok(());
            }
            if started.elapsed() > WAIT_TIMEOUT {
                return Err(BrowserError::WaitTimeout(self.describe()));
            }
            tokio::time::sleep(WAIT_POLL_INTERVAL).await;
        }
    }

    async fn click(&self) -> Result<(), BrowserError> {
        let element = self.first().await?;
        element.click().await.map_err(|e| BrowserError::Selector {
            selector: self.describe(),
            reason: format!("click failed: {}", e),
        })?;
        Ok(())
    }

    async fn fill(&self, text: &str) -> Result<(), BrowserError> {
        let element = self.first().await?;
        element.click().await.map_err(|e| BrowserError::Selector {
            selector: self.describe(),
            reason: format!("focus failed: {}", e),
        })?;
        element
            .type_str(text)
            .await
            .map_err(|e| BrowserError::Selector {
                selector: self.describe(),
                reason: format!("typing failed: {}", e),
            })?;
        Ok(())
    }

    async fn get_attribute(&self, name: &str) -> Result<Option<String>, BrowserError> {
        let element = self.first().await?;
        element
            .attribute(name)
            .await
            .map_err(|e| BrowserError::Selector {
                selector: self.describe(),
                reason: format!("attribute `{}` failed: {}", name, e),
            })
    }

    fn nth(&self, index: usize) -> Box<dyn Locator> {
        self.extend(Step::Nth(index))
    }

    fn scoped(&self, selector: &str) -> Box<dyn Locator> {
        self.extend(Step::css(selector))
    }
}
