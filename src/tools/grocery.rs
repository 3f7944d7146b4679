//! HEB grocery store tools.
//!
//! Site-specific scraping callables registered into the tool registry as a
//! flat function module. Both functions operate on a browser page handle
//! produced by `start_browser_manager`.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tracing::warn;
use url::Url;

use crate::browser::{page_from_handle, BrowserError, Page, WaitPolicy};
use crate::toolgen::{
    DeclaredType, FunctionDecl, FunctionModule, InstanceArena, ParamDecl, RegisteredFunction,
    ToolError, ToolFn,
};

const HEB_HOME_URL: &str = "https://www.heb.com/";
const HEB_SEARCH_URL: &str = "https://www.heb.com/search";
const DEFAULT_ZIP_CODE: i64 = 78209;

/// Sets up the HEB store location for this scraping session: opens the
/// store picker, searches the zip code, selects the first nearby store.
pub async fn setup_heb_search_location(
    page: &dyn Page,
    zip_code: i64,
) -> Result<(), BrowserError> {
    page.navigate(HEB_HOME_URL, WaitPolicy::NetworkIdle).await?;

    let change_store = page.locate("[data-testid=\"header_change_store\"]");
    change_store.wait().await?;
    change_store.click().await?;

    let address_input = page.locate("#address-input");
    address_input.wait().await?;
    address_input.fill(&zip_code.to_string()).await?;

    let search_button = page.locate("button:has-text(\"Search\")");
    search_button.wait().await?;
    search_button.click().await?;

    page.locate("p:has-text(\" stores near \")").wait().await?;

    let store_card = page.locate("[data-qe-id=\"storeCard\"]").nth(0);
    store_card.wait().await?;
    store_card
        .scoped("button:has-text(\"Store\")")
        .click()
        .await?;
    Ok(())
}

/// Searches HEB for a product and returns the titles of in-stock results.
/// Scraping failures are swallowed into an empty list so a single flaky
/// page does not derail the plan.
pub async fn find_product_at_heb(product_query: &str, page: &dyn Page) -> Vec<String> {
    match find_product_inner(product_query, page).await {
        Ok(titles) => titles,
        Err(e) => {
            warn!(query = %product_query, error = %e, "product search failed");
            Vec::new()
        }
    }
}

async fn find_product_inner(
    product_query: &str,
    page: &dyn Page,
) -> Result<Vec<String>, BrowserError> {
    let mut search_url = Url::parse(HEB_SEARCH_URL).map_err(|e| BrowserError::Navigation {
        url: HEB_SEARCH_URL.to_string(),
        reason: e.to_string(),
    })?;
    search_url
        .query_pairs_mut()
        .append_pair("esc", "true")
        .append_pair("q", product_query);
    page.navigate(search_url.as_str(), WaitPolicy::NetworkIdle)
        .await?;

    let product_cards = page.locate("div[data-qe-id=\"productCard\"]");
    let count = product_cards.count().await?;

    let mut results = Vec::new();
    for i in 0..count {
        let card = product_cards.nth(i);
        let out_of_stock = card
            .scoped("button[data-qe-id=\"addToCart\"] span:has-text(\"Out of stock\")")
            .count()
            .await?
            > 0;
        if out_of_stock {
            continue;
        }
        if let Some(title) = card
            .scoped("div[data-qe-id=\"productTitle\"] span")
            .get_attribute("title")
            .await?
        {
            results.push(title);
        }
    }
    Ok(results)
}

fn argument_map(tool: &str, args: &Value) -> Result<Map<String, Value>, ToolError> {
    match args {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        other => Err(ToolError::ArgumentDecode {
            name: tool.to_string(),
            reason: format!("expected a JSON object, got {}", other),
        }),
    }
}

fn setup_callable(arena: Arc<InstanceArena>) -> ToolFn {
    Arc::new(move |args: Value| {
        let arena = arena.clone();
        Box::pin(async move {
            let map = argument_map("setup_heb_search_location", &args)?;
            let page_handle = map
                .get("page")
                .and_then(Value::as_str)
                .ok_or_else(|| ToolError::missing_argument("setup_heb_search_location", "page"))?
                .to_string();
            let zip_code = map
                .get("zip_code")
                .and_then(Value::as_i64)
                .unwrap_or(DEFAULT_ZIP_CODE);

            let page = page_from_handle(&arena, &page_handle).await?;
            setup_heb_search_location(page.as_ref(), zip_code)
                .await
                .map_err(|e| ToolError::invocation("setup_heb_search_location", e))?;
            Ok(Value::Null)
        })
    })
}

fn find_callable(arena: Arc<InstanceArena>) -> ToolFn {
    Arc::new(move |args: Value| {
        let arena = arena.clone();
        Box::pin(async move {
            let map = argument_map("find_product_at_heb", &args)?;
            let product_query = map
                .get("product_query")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ToolError::missing_argument("find_product_at_heb", "product_query")
                })?
                .to_string();
            let page_handle = map
                .get("browser_page")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    ToolError::missing_argument("find_product_at_heb", "browser_page")
                })?
                .to_string();

            let page = page_from_handle(&arena, &page_handle).await?;
            let titles = find_product_at_heb(&product_query, page.as_ref()).await;
            Ok(json!(titles))
        })
    })
}

/// The grocery function module, ready for the registry builder.
pub fn module(arena: Arc<InstanceArena>) -> FunctionModule {
    FunctionModule::new("grocery")
        .register(RegisteredFunction::declared(
            FunctionDecl::new(
                "setup_heb_search_location",
                "Sets up HEB store location for the web scraping session.\n\n\
                 Navigates to the HEB website and configures the store \
                 location based on the provided zip code by selecting the \
                 first available store in that area.\n\n\
                 Args:\n    \
                 page (BrowserPage): browser page handle for web interaction\n    \
                 zip_code (int): ZIP code to search for nearby HEB stores",
                vec![
                    ParamDecl::required("page", DeclaredType::Named("BrowserPage".to_string())),
                    ParamDecl::optional("zip_code", DeclaredType::Int, json!(DEFAULT_ZIP_CODE)),
                ],
            ),
            setup_callable(arena.clone()),
        ))
        .register(RegisteredFunction::declared(
            FunctionDecl::new(
                "find_product_at_heb",
                "Search for available products at the HEB grocery store \
                 website.\n\n\
                 Args:\n    \
                 product_query (str): search term for the product\n    \
                 browser_page (BrowserPage): browser page handle for web \
                 interaction\n\n\
                 Returns:\n    \
                 list[str]: titles of in-stock products; empty when nothing \
                 is found or the search fails",
                vec![
                    ParamDecl::required("product_query", DeclaredType::Str),
                    ParamDecl::required(
                        "browser_page",
                        DeclaredType::Named("BrowserPage".to_string()),
                    ),
                ],
            )
            .returning(DeclaredType::List),
            find_callable(arena),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::Locator;
    use async_trait::async_trait;

    #[derive(Default)]
    struct MockCard {
        out_of_stock: bool,
        title: Option<String>,
    }

    /// Scripted stand-in for a live page: a fixed set of product cards and
    /// an optional navigation failure.
    #[derive(Default)]
    struct MockState {
        fail_navigation: bool,
        cards: Vec<MockCard>,
    }

    struct MockPage {
        state: Arc<MockState>,
    }

    #[async_trait]
    impl Page for MockPage {
        async fn navigate(&self, url: &str, _wait: WaitPolicy) -> Result<(), BrowserError> {
            if self.state.fail_navigation {
                return Err(BrowserError::Navigation {
                    url: url.to_string(),
                    reason: "network error".to_string(),
                });
            }
            Ok(())
        }

        fn locate(&self, selector: &str) -> Box<dyn Locator> {
            Box::new(MockLocator {
                state: self.state.clone(),
                selector: selector.to_string(),
                index: None,
                scope: None,
            })
        }

        async fn evaluate(&self, _script: &str) -> Result<Value, BrowserError> {
            Ok(Value::Null)
        }
    }

    struct MockLocator {
        state: Arc<MockState>,
        selector: String,
        index: Option<usize>,
        scope: Option<String>,
    }

    impl MockLocator {
        fn card(&self) -> Option<&MockCard> {
            self.index.and_then(|i| self.state.cards.get(i))
        }
    }

    #[async_trait]
    impl Locator for MockLocator {
        async fn count(&self) -> Result<usize, BrowserError> {
            if let Some(scope) = &self.scope {
                if scope.contains("addToCart") {
                    let out = self.card().map(|c| c.out_of_stock).unwrap_or(false);
                    return Ok(usize::from(out));
                }
                return Ok(1);
            }
            if self.selector.contains("productCard") {
                return Ok(self.state.cards.len());
            }
            Ok(1)
        }

        async fn wait(&self) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn click(&self) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn fill(&self, _text: &str) -> Result<(), BrowserError> {
            Ok(())
        }

        async fn get_attribute(&self, name: &str) -> Result<Option<String>, BrowserError> {
            if name == "title" {
                return Ok(self.card().and_then(|c| c.title.clone()));
            }
            Ok(None)
        }

        fn nth(&self, index: usize) -> Box<dyn Locator> {
            Box::new(MockLocator {
                state: self.state.clone(),
                selector: self.selector.clone(),
                index: Some(index),
                scope: self.scope.clone(),
            })
        }

        fn scoped(&self, selector: &str) -> Box<dyn Locator> {
            Box::new(MockLocator {
                state: self.state.clone(),
                selector: self.selector.clone(),
                index: self.index,
                scope: Some(selector.to_string()),
            })
        }
    }

    fn page(state: MockState) -> MockPage {
        MockPage {
            state: Arc::new(state),
        }
    }

    fn rt() -> tokio::runtime::Runtime {
        tokio::runtime::Runtime::new().unwrap()
    }

    #[test]
    fn test_find_product_in_stock() {
        let rt = rt();
        rt.block_on(async {
            let page = page(MockState {
                fail_navigation: false,
                cards: vec![
                    MockCard {
                        out_of_stock: false,
                        title: Some("Test Product".to_string()),
                    },
                    MockCard {
                        out_of_stock: false,
                        title: Some("Test Product".to_string()),
                    },
                ],
            });
            let results = find_product_at_heb("milk", &page).await;
            assert_eq!(results, vec!["Test Product", "Test Product"]);
        });
    }

    #[test]
    fn test_find_product_out_of_stock() {
        let rt = rt();
        rt.block_on(async {
            let page = page(MockState {
                fail_navigation: false,
                cards: vec![MockCard {
                    out_of_stock: true,
                    title: Some("Hidden".to_string()),
                }],
            });
            let results = find_product_at_heb("milk", &page).await;
            assert!(results.is_empty());
        });
    }

    #[test]
    fn test_find_product_no_cards() {
        let rt = rt();
        rt.block_on(async {
            let page = page(MockState::default());
            let results = find_product_at_heb("milk", &page).await;
            assert!(results.is_empty());
        });
    }

    #[test]
    fn test_find_product_navigation_error_is_swallowed() {
        let rt = rt();
        rt.block_on(async {
            let page = page(MockState {
                fail_navigation: true,
                cards: vec![],
            });
            let results = find_product_at_heb("milk", &page).await;
            assert!(results.is_empty());
        });
    }

    #[test]
    fn test_module_declares_both_functions() {
        let module = module(Arc::new(InstanceArena::new()));
        let names: Vec<&str> = module.functions().iter().map(|f| f.name()).collect();
        assert_eq!(
            names,
            vec!["setup_heb_search_location", "find_product_at_heb"]
        );
    }

    #[test]
    fn test_callable_rejects_missing_page_handle() {
        let rt = rt();
        rt.block_on(async {
            let module = module(Arc::new(InstanceArena::new()));
            let setup = &module.functions()[0];
            let err = (setup.callable)(json!({ "zip_code": 78701 }))
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::ArgumentDecode { .. }));
        });
    }

    #[test]
    fn test_callable_resolves_page_through_arena() {
        let rt = rt();
        rt.block_on(async {
            let arena = Arc::new(InstanceArena::new());
            let page: crate::browser::PageRef = Arc::new(page(MockState {
                fail_navigation: false,
                cards: vec![MockCard {
                    out_of_stock: false,
                    title: Some("Milk".to_string()),
                }],
            }));
            let handle = arena.insert("browser_page", Box::new(page)).await;

            let module = module(arena.clone());
            let find = &module.functions()[1];
            let out = (find.callable)(json!({
                "product_query": "milk",
                "browser_page": handle
            }))
            .await
            .unwrap();
            assert_eq!(out, json!(["Milk"]));
        });
    }
}
