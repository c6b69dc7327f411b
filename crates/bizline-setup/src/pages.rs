//! HTML pages served to the operator's browser.
//!
//! Templates are compiled in and auto-escaped.

use minijinja::{Environment, context};

const INDEX_TEMPLATE: &str = "index.html";
const SUCCESS_TEMPLATE: &str = "success.html";

/// Page renderer.
pub struct Pages {
    env: Environment<'static>,
}

impl std::fmt::Debug for Pages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pages").finish_non_exhaustive()
    }
}

impl Pages {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template(INDEX_TEMPLATE, include_str!("../templates/index.html"))?;
        env.add_template(SUCCESS_TEMPLATE, include_str!("../templates/success.html"))?;
        Ok(Self { env })
    }

    /// Linking page with the handshake token embedded.
    pub fn render_index(&self, token: &str) -> Result<String, minijinja::Error> {
        self.env
            .get_template(INDEX_TEMPLATE)?
            .render(context! { token => token })
    }

    /// Confirmation page; triggers completion from the browser.
    pub fn render_success(&self, name: &str, bot: &str) -> Result<String, minijinja::Error> {
        self.env
            .get_template(SUCCESS_TEMPLATE)?
            .render(context! { name => name, bot => bot })
    }
}
