//! Search script injection.

use crate::Context;
use crate::assets::{BASE_PLACEHOLDER, Builtins, INDEX_PLACEHOLDER};
use crate::context::escape_attribute;
use crate::error::{ErrorKind, Result};
use docgate_extract::SearchIndex;
use exn::ResultExt;
use serde::Serialize;

/// Serializes a value as JSON that can sit inside a `<script>` element
/// without terminating it.
fn script_json(value: &impl Serialize) -> Result<String> {
    let json = serde_json::to_string(value).or_raise(|| ErrorKind::Serialize)?;
    Ok(json
        .replace('<', "\\u003c")
        .replace('>', "\\u003e")
        .replace('&', "\\u0026")
        .replace('\u{2028}', "\\u2028")
        .replace('\u{2029}', "\\u2029"))
}

/// Builds the complete `<script>` element for a page.
pub(crate) fn search_script(index: &SearchIndex, ctx: &Context, nonce: &str) -> Result<String> {
    let body = Builtins::search_script()?
        .replace(INDEX_PLACEHOLDER, &script_json(index)?)
        .replace(BASE_PLACEHOLDER, &script_json(&ctx.base())?);
    Ok(format!("<script nonce=\"{}\">{body}</script>", escape_attribute(nonce)))
}

/// Inserts `script` at `position`, the start of the page's closing head tag.
pub(crate) fn inject(html: &str, position: usize, script: &str) -> String {
    let mut output = String::with_capacity(html.len() + script.len());
    output.push_str(&html[..position]);
    output.push_str(script);
    output.push_str(&html[position..]);
    output
}
