use url::Url;

use crate::dto::LlmProvider;

pub const OPENAI_HOSTS: [&str; 2] = ["chatgpt.com", "chat.openai.com"];
pub const GROK_HOSTS: [&str; 2] = ["grok.com", "x.com"];
pub const GEMINI_HOSTS: [&str; 1] = ["gemini.google.com"];

fn hostname_matches_any(hostname: &str, hosts: &[&str]) -> bool {
    hosts.iter().any(|host| {
        hostname == *host
            || hostname
                .strip_suffix(host)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// Picks the provider for a tab URL. Unknown hosts, unparsable URLs and a
/// missing URL all fall back to OpenAI.
pub fn provider_from_url(tab_url: Option<&str>) -> LlmProvider {
    let Some(hostname) = tab_url
        .and_then(|raw| Url::parse(raw).ok())
        .and_then(|url| url.host_str().map(str::to_string))
    else {
        return LlmProvider::Openai;
    };

    if hostname_matches_any(&hostname, &OPENAI_HOSTS) {
        LlmProvider::Openai
    } else if hostname_matches_any(&hostname, &GROK_HOSTS) {
        LlmProvider::Grok
    } else if hostname_matches_any(&hostname, &GEMINI_HOSTS) {
        LlmProvider::Gemini
    } else {
        LlmProvider::Openai
    }
}
