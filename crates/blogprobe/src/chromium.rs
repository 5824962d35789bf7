//! Chromium page driver over CDP (chromiumoxide).
//!
//! Each driver launches its own browser with one page. Request interception
//! uses the Fetch domain: every paused request goes through the installed
//! [`Router`](crate::network::Router), which either fulfills it or lets it
//! continue. JavaScript dialogs are answered by the installed
//! [`DialogHandler`] as they open. Both listeners run as tasks owned by the
//! driver and are aborted on close or drop.

use crate::config::HarnessConfig;
use crate::dialog::{Dialog, DialogHandler, DialogKind};
use crate::locator::{Selector, IS_VISIBLE_JS};
use crate::network::{
    dispatch_shared, Fulfillment, HttpMethod, InterceptedRequest, RouteDecision, SharedRouter,
};
use crate::page::PageDriver;
use crate::result::{ProbeError, ProbeResult};
use crate::suite::DriverFactory;
use async_trait::async_trait;
use base64::Engine;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::fetch::{
    ContinueRequestParams, EnableParams, EventRequestPaused, FulfillRequestParams, HeaderEntry,
    RequestPattern, RequestStage,
};
use chromiumoxide::cdp::browser_protocol::page::{
    DialogType, EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::layout::Point;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use std::collections::HashMap;
use tokio::task::JoinHandle;

/// Page driver backed by a real Chromium
#[derive(Debug)]
pub struct ChromiumDriver {
    browser: Option<Browser>,
    page: Option<CdpPage>,
    handler: JoinHandle<()>,
    listeners: Vec<JoinHandle<()>>,
}

impl ChromiumDriver {
    /// Launch a browser and open a blank page
    pub async fn launch(config: &HarnessConfig) -> ProbeResult<Self> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height);

        if !config.headless {
            builder = builder.with_head();
        }
        if !config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder
            .build()
            .map_err(|message| ProbeError::BrowserLaunch { message })?;

        let (browser, mut handler) =
            Browser::launch(cdp_config)
                .await
                .map_err(|e| ProbeError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ProbeError::page(e.to_string()))?;

        tracing::info!(headless = config.headless, "chromium launched");
        Ok(Self {
            browser: Some(browser),
            page: Some(page),
            handler,
            listeners: Vec::new(),
        })
    }

    fn page(&self) -> ProbeResult<&CdpPage> {
        self.page
            .as_ref()
            .ok_or_else(|| ProbeError::page("page is closed"))
    }

    async fn eval(&self, script: &str) -> ProbeResult<serde_json::Value> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(ProbeError::page)?;
        let result = self
            .page()?
            .evaluate_expression(params)
            .await
            .map_err(|e| ProbeError::page(e.to_string()))?;
        Ok(result.value().cloned().unwrap_or(serde_json::Value::Null))
    }

    /// Scroll the first match into view and return its center
    async fn center_of(&self, selector: &Selector) -> ProbeResult<Point> {
        let script = format!(
            "(() => {{ const el = {}[0]; if (!el) return null; \
             el.scrollIntoView({{block: 'center', inline: 'center'}}); \
             const r = el.getBoundingClientRect(); \
             return {{x: r.left + r.width / 2, y: r.top + r.height / 2}}; }})()",
            selector.to_query()
        );
        let value = self.eval(&script).await?;
        match (value["x"].as_f64(), value["y"].as_f64()) {
            (Some(x), Some(y)) => Ok(Point { x, y }),
            _ => Err(ProbeError::ElementNotFound {
                selector: selector.to_string(),
            }),
        }
    }

    fn abort_listeners(&mut self) {
        for task in self.listeners.drain(..) {
            task.abort();
        }
    }
}

impl Drop for ChromiumDriver {
    fn drop(&mut self) {
        self.abort_listeners();
        self.handler.abort();
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn goto(&mut self, url: &str) -> ProbeResult<()> {
        self.page()?
            .goto(url)
            .await
            .map_err(|e| ProbeError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn count(&self, selector: &Selector) -> ProbeResult<usize> {
        let value = self.eval(&selector.to_count_query()).await?;
        Ok(value.as_u64().unwrap_or(0) as usize)
    }

    async fn is_visible(&self, selector: &Selector) -> ProbeResult<bool> {
        let value = self.eval(&selector.to_visible_query()).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn click(&mut self, selector: &Selector) -> ProbeResult<()> {
        let point = self.center_of(selector).await?;
        self.page()?
            .click(point)
            .await
            .map_err(|e| ProbeError::page(e.to_string()))?;
        Ok(())
    }

    async fn fill(&mut self, selector: &Selector, value: &str) -> ProbeResult<()> {
        let value_json = serde_json::to_string(value)?;
        // The native setter keeps React's controlled inputs in sync.
        let script = format!(
            "(() => {{ const el = {}[0]; if (!el) return false; el.focus(); \
             const proto = el.tagName === 'TEXTAREA' ? HTMLTextAreaElement.prototype : HTMLInputElement.prototype; \
             Object.getOwnPropertyDescriptor(proto, 'value').set.call(el, {value_json}); \
             el.dispatchEvent(new Event('input', {{bubbles: true}})); \
             el.dispatchEvent(new Event('change', {{bubbles: true}})); \
             return true; }})()",
            selector.to_query()
        );
        if self.eval(&script).await?.as_bool() == Some(true) {
            Ok(())
        } else {
            Err(ProbeError::ElementNotFound {
                selector: selector.to_string(),
            })
        }
    }

    async fn text_content(&self, selector: &Selector) -> ProbeResult<Vec<String>> {
        let script = format!("{}.map((el) => el.textContent || '')", selector.to_query());
        Ok(serde_json::from_value(self.eval(&script).await?).unwrap_or_default())
    }

    async fn computed_style(
        &self,
        selector: &Selector,
        property: &str,
    ) -> ProbeResult<Option<String>> {
        let property = serde_json::to_string(property)?;
        let script = format!(
            "(() => {{ const el = {}.find({IS_VISIBLE_JS}); \
             return el ? window.getComputedStyle(el).getPropertyValue({property}) : null; }})()",
            selector.to_query()
        );
        Ok(self.eval(&script).await?.as_str().map(str::to_string))
    }

    async fn evaluate(&mut self, script: &str) -> ProbeResult<serde_json::Value> {
        self.eval(script).await
    }

    async fn install_router(&mut self, router: SharedRouter) -> ProbeResult<()> {
        let page = self.page()?.clone();
        let mut events = page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(|e| ProbeError::page(e.to_string()))?;

        let pattern = RequestPattern::builder()
            .url_pattern("*")
            .request_stage(RequestStage::Request)
            .build();
        page.execute(EnableParams::builder().patterns(vec![pattern]).build())
            .await
            .map_err(|e| ProbeError::page(e.to_string()))?;

        self.listeners.push(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let request = intercepted_request(&event);
                let (method, url) = (request.method, request.url.clone());
                let outcome = match dispatch_shared(&router, request) {
                    RouteDecision::Fulfill(response) => fulfill(&page, &event, &response).await,
                    RouteDecision::Continue => continue_request(&page, &event).await.map_err(|e| {
                        ProbeError::PassThrough {
                            method: method.to_string(),
                            url: url.clone(),
                            message: e.to_string(),
                        }
                    }),
                };
                if let Err(err) = outcome {
                    tracing::warn!(%method, %url, error = %err, "interception failed");
                }
            }
        }));
        Ok(())
    }

    async fn install_dialog_handler(&mut self, handler: DialogHandler) -> ProbeResult<()> {
        let page = self.page()?.clone();
        let mut events = page
            .event_listener::<EventJavascriptDialogOpening>()
            .await
            .map_err(|e| ProbeError::page(e.to_string()))?;

        self.listeners.push(tokio::spawn(async move {
            while let Some(event) = events.next().await {
                let kind = match event.r#type {
                    DialogType::Alert => DialogKind::Alert,
                    DialogType::Confirm => DialogKind::Confirm,
                    DialogType::Prompt => DialogKind::Prompt,
                    DialogType::Beforeunload => DialogKind::BeforeUnload,
                };
                let mut dialog = Dialog::new(kind, event.message.clone());
                if kind == DialogKind::Prompt {
                    dialog = Dialog::prompt(event.message.clone(), event.default_prompt.clone());
                }
                let decided = handler.handle(dialog);

                let mut params = HandleJavaScriptDialogParams::builder()
                    .accept(decided.action().is_accept());
                if let Some(text) = decided.action().prompt_text() {
                    params = params.prompt_text(text);
                }
                let answered = match params.build() {
                    Ok(params) => page.execute(params).await.map(|_| ()).map_err(|e| e.to_string()),
                    Err(e) => Err(e),
                };
                if let Err(error) = answered {
                    tracing::warn!(%error, "failed to answer dialog");
                }
            }
        }));
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        let url = self
            .page()?
            .url()
            .await
            .map_err(|e| ProbeError::page(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn close(&mut self) -> ProbeResult<()> {
        self.abort_listeners();
        if let Some(page) = self.page.take() {
            page.close()
                .await
                .map_err(|e| ProbeError::page(e.to_string()))?;
        }
        if let Some(mut browser) = self.browser.take() {
            browser
                .close()
                .await
                .map_err(|e| ProbeError::page(e.to_string()))?;
            let _ = browser.wait().await;
        }
        Ok(())
    }
}

/// Launches one Chromium per case
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    config: HarnessConfig,
}

impl ChromiumLauncher {
    /// Launcher using the browser settings of `config`
    #[must_use]
    pub const fn new(config: HarnessConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl DriverFactory<ChromiumDriver> for ChromiumLauncher {
    async fn create(&self) -> ProbeResult<ChromiumDriver> {
        ChromiumDriver::launch(&self.config).await
    }
}

/// Convert a paused CDP request into the router's request type.
///
/// Read through the serialized form so both `postData` and
/// `postDataEntries` bodies are picked up.
fn intercepted_request(event: &EventRequestPaused) -> InterceptedRequest {
    let raw = serde_json::to_value(&event.request).unwrap_or_default();
    let method = HttpMethod::parse(raw["method"].as_str().unwrap_or_default());
    let url = raw["url"].as_str().unwrap_or_default().to_string();
    let mut request = InterceptedRequest::new(method, url);

    if let Some(headers) = raw["headers"].as_object() {
        let headers: HashMap<String, String> = headers
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect();
        request.headers = headers;
    }

    if let Some(body) = raw["postData"].as_str() {
        request = request.with_body(body.as_bytes().to_vec());
    } else if let Some(entries) = raw["postDataEntries"].as_array() {
        let engine = base64::engine::general_purpose::STANDARD;
        let body: Vec<u8> = entries
            .iter()
            .filter_map(|e| e["bytes"].as_str())
            .filter_map(|b| engine.decode(b).ok())
            .flatten()
            .collect();
        request = request.with_body(body);
    }
    request
}

async fn fulfill(
    page: &CdpPage,
    event: &EventRequestPaused,
    response: &Fulfillment,
) -> ProbeResult<()> {
    let headers = response
        .header_list()
        .into_iter()
        .map(|(name, value)| HeaderEntry::builder().name(name).value(value).build())
        .collect::<Result<Vec<_>, _>>()
        .map_err(ProbeError::page)?;

    let mut params = FulfillRequestParams::builder()
        .request_id(event.request_id.clone())
        .response_code(i64::from(response.status))
        .response_headers(headers);
    if !response.body.is_empty() {
        params = params.body(base64::engine::general_purpose::STANDARD.encode(&response.body));
    }
    let params = params.build().map_err(ProbeError::page)?;

    page.execute(params)
        .await
        .map_err(|e| ProbeError::page(e.to_string()))?;
    Ok(())
}

async fn continue_request(page: &CdpPage, event: &EventRequestPaused) -> ProbeResult<()> {
    let params = ContinueRequestParams::builder()
        .request_id(event.request_id.clone())
        .build()
        .map_err(ProbeError::page)?;
    page.execute(params)
        .await
        .map_err(|e| ProbeError::page(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_launcher_keeps_config() {
        let config = HarnessConfig::default().with_headless(false);
        let launcher = ChromiumLauncher::new(config.clone());
        assert_eq!(launcher.config, config);
    }

    #[tokio::test]
    #[ignore = "requires a local chromium"]
    async fn test_launch_and_evaluate() {
        let config = HarnessConfig::default();
        let mut driver = ChromiumDriver::launch(&config).await.unwrap();
        assert_eq!(
            driver.evaluate("1 + 2").await.unwrap(),
            serde_json::json!(3)
        );
        driver.close().await.unwrap();
    }
}
