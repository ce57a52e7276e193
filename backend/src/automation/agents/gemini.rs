use async_trait::async_trait;
use chromiumoxide::{Element, Page};
use tracing::debug;

use crate::automation::agents::protocol::{HostPageAdapter, ReplyMarkup};
use crate::config::PageConfig;
use crate::error::RelayResult;

/// The Gemini chat tab, driven over CDP.
pub struct GeminiPage {
    page: Page,
    selectors: PageConfig,
}

impl GeminiPage {
    pub fn new(page: Page, selectors: PageConfig) -> Self {
        Self { page, selectors }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    async fn find(&self, selector: &str) -> Option<Element> {
        match self.page.find_element(selector).await {
            Ok(element) => Some(element),
            Err(e) => {
                debug!(selector, error = %e, "element lookup failed");
                None
            }
        }
    }
}

fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

#[async_trait]
impl HostPageAdapter for GeminiPage {
    type InputSurface = Element;
    type SubmitControl = Element;

    async fn find_input_surface(&self) -> RelayResult<Option<Element>> {
        Ok(self.find(&self.selectors.input_selector).await)
    }

    async fn write_prompt(&self, surface: &Element, text: &str) -> RelayResult<()> {
        // Quill only registers the edit once an input event bubbles out of the editor.
        let js = format!(
            "function() {{ this.innerText = {}; this.dispatchEvent(new Event('input', {{ bubbles: true }})); }}",
            js_string(text)
        );
        surface.call_js_fn(js, false).await?;
        Ok(())
    }

    async fn find_submit_control(&self) -> RelayResult<Option<Element>> {
        Ok(self.find(&self.selectors.submit_selector).await)
    }

    async fn is_control_enabled(&self, control: &Element) -> RelayResult<bool> {
        if control.attribute("disabled").await?.is_some() {
            return Ok(false);
        }
        let aria = control.attribute("aria-disabled").await?;
        Ok(aria.as_deref() != Some("true"))
    }

    async fn activate_control(&self, control: &Element) -> RelayResult<()> {
        control.click().await?;
        Ok(())
    }

    async fn indicator_visible(&self) -> RelayResult<bool> {
        let js = format!(
            "() => {{ const el = document.querySelector({}); return !!el && !el.classList.contains({}); }}",
            js_string(&self.selectors.completion_indicator_selector),
            js_string(&self.selectors.hidden_class),
        );
        let visible = self
            .page
            .evaluate(js)
            .await?
            .value()
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        Ok(visible)
    }

    async fn read_latest_reply(&self) -> RelayResult<Option<ReplyMarkup>> {
        let js = format!(
            r#"() => {{
                const replies = document.querySelectorAll({});
                if (replies.length === 0) return null;
                return replies[replies.length - 1].innerHTML;
            }}"#,
            js_string(&self.selectors.reply_selector)
        );
        let result = self.page.evaluate(js).await?;
        Ok(result.value().and_then(|v| v.as_str().map(ReplyMarkup::new)))
    }
}
