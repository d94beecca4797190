use std::path::Path;

use crate::files::{list_directory, ServedRoot};
use crate::limits::AccessCounter;

/// Renders the HTML index of `dir`, which must be a resolved directory under
/// `root`.
///
/// Subdirectories come first, then the files `root` allows; both groups are
/// sorted by name and each entry shows its hit count.
pub async fn render_listing(
    root: &ServedRoot,
    dir: &Path,
    counter: &AccessCounter,
) -> std::io::Result<String> {
    let entries = list_directory(dir).await?;
    let rel = root.relative(dir);

    let mut html = String::from("<html><body>");
    html.push_str(&format!(
        "<h2>Index of [{}]/{}</h2><ul>",
        counter.count(dir),
        escape_html(&rel)
    ));

    if !rel.is_empty() {
        let parent = rel.rsplit_once('/').map(|(p, _)| p).unwrap_or("");
        html.push_str(&format!("<li><a href=\"/{}\">../</a></li>", encode_segments(parent)));
    }

    for entry in entries.iter().filter(|e| e.is_dir) {
        let child = join_rel(&rel, &entry.name);
        html.push_str(&format!(
            "<li>[{}]<b><a href=\"/{}/\">{}/</a></b></li>",
            counter.count(&dir.join(&entry.name)),
            encode_segments(&child),
            escape_html(&entry.name)
        ));
    }

    for entry in entries.iter().filter(|e| !e.is_dir && root.allows(&e.name)) {
        let child = join_rel(&rel, &entry.name);
        html.push_str(&format!(
            "<li>[{}] <a href=\"/{}\">{}</a></li>",
            counter.count(&dir.join(&entry.name)),
            encode_segments(&child),
            escape_html(&entry.name)
        ));
    }

    html.push_str("</ul></body></html>");
    Ok(html)
}

fn join_rel(rel: &str, name: &str) -> String {
    if rel.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", rel, name)
    }
}

fn encode_segments(rel: &str) -> String {
    rel.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
