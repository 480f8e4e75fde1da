pub mod clock;
pub mod code;
pub mod manager;
pub mod memory;
pub mod store;

use url::Url;

/// Public link a guest opens: `<base>/invite/<code>`.
pub fn share_url(base: &Url, code: &str) -> Url {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push("invite").push(code);
    }
    url
}
