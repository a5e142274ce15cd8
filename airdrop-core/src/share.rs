//! Promotional post text
//!
//! The generated text embeds the participant's wallet and satisfies the
//! default [`ContentRules`](crate::ContentRules), so posting it unchanged
//! passes content validation.

use reqwest::Url;
use serde::{Deserialize, Serialize};

const DEFAULT_TEMPLATE: &str = "🚀 ¡Descubre el futuro de la tokenización con @tokenizados! \n\n\
💎 Información confiable sobre blockchain y Web3\n\
🔒 100% garantizado y verificado\n\
⚡ Acceso rápido a las últimas novedades\n\n\
Mi wallet: {wallet}\n\n\
#Tokenización #Blockchain #Web3 #BNB\n\n\
https://tokenizados.net/";

const DEFAULT_COMPOSE_URL: &str = "https://x.com/intent/post";

/// Placeholder replaced by the wallet address
pub const WALLET_PLACEHOLDER: &str = "{wallet}";

/// Share text template and compose endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareTemplate {
    pub template: String,
    pub compose_url: String,
}

impl Default for ShareTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            compose_url: DEFAULT_COMPOSE_URL.to_string(),
        }
    }
}

/// Text plus a pre-filled compose link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharePost {
    pub text: String,
    pub intent_url: String,
}

impl ShareTemplate {
    pub fn render(&self, wallet: &str) -> String {
        self.template.replace(WALLET_PLACEHOLDER, wallet)
    }

    /// Render the text and the compose URL carrying it
    pub fn share_post(&self, wallet: &str) -> SharePost {
        let text = self.render(wallet);
        let intent_url = match Url::parse_with_params(&self.compose_url, &[("text", &text)]) {
            Ok(url) => url.to_string(),
            Err(_) => self.compose_url.clone(),
        };
        SharePost { text, intent_url }
    }
}
