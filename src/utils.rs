use reqwest::{header::CONTENT_LENGTH, Client};
use url::Url;

/// Strips characters that are invalid in filenames and replaces spaces with
/// underscores.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '\\' | '/' | '*' | '?' | '"' | '<' | '>' | '|'))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// Probes a resource's size with a HEAD request. A server that rejects HEAD
/// or omits Content-Length yields 0, which the planner treats as unknown
/// size; only a failed request is an error.
pub async fn content_length(client: &Client, url: &Url) -> Result<u64, reqwest::Error> {
    let response = client.head(url.clone()).send().await?;
    if !response.status().is_success() {
        return Ok(0);
    }

    let length = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(0);

    Ok(length)
}
