//! HTML building blocks shared by every page.

use axum::response::Html;

const STYLE: &str = r#"
        * { box-sizing: border-box; }
        body {
            font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", Roboto, Helvetica, Arial, sans-serif;
            margin: 0;
            background: #fff;
            color: #111827;
        }
        header {
            position: sticky;
            top: 0;
            border-bottom: 1px solid #e5e7eb;
            background: rgba(255,255,255,0.9);
        }
        .bar, main, footer { max-width: 64rem; margin: 0 auto; padding: 12px 16px; }
        .bar { display: flex; justify-content: space-between; align-items: center; }
        .brand { font-weight: 600; color: inherit; text-decoration: none; font-size: 1.1rem; }
        main { padding-top: 32px; }
        footer { font-size: 12px; color: #9ca3af; padding-bottom: 32px; }
        .card { border: 1px solid #e5e7eb; border-radius: 16px; padding: 24px; margin-bottom: 16px; }
        .muted { color: #6b7280; }
        .center { text-align: center; }
        .row { display: flex; gap: 8px; align-items: center; flex-wrap: wrap; }
        .grid { display: grid; gap: 16px; grid-template-columns: repeat(auto-fill, minmax(16rem, 1fr)); }
        .button, button {
            display: inline-block;
            padding: 8px 14px;
            border-radius: 12px;
            border: 1px solid #111827;
            background: #111827;
            color: #fff;
            font-size: 14px;
            text-decoration: none;
            cursor: pointer;
        }
        .outline { background: #fff; color: #111827; border-color: #d1d5db; }
        button:disabled { opacity: 0.4; cursor: default; }
        input, textarea {
            border: 1px solid #d1d5db;
            border-radius: 12px;
            padding: 8px 12px;
            font: inherit;
            font-size: 14px;
        }
        textarea { width: 100%; min-height: 4rem; margin-top: 8px; }
        .badge {
            display: inline-block;
            border: 1px solid #d1d5db;
            border-radius: 999px;
            background: #f9fafb;
            padding: 2px 8px;
            font-size: 12px;
        }
        ol { list-style: none; padding: 0; }
        .toasts {
            position: fixed;
            bottom: 16px;
            left: 50%;
            transform: translateX(-50%);
        }
        .toast {
            border: 1px solid #d1d5db;
            border-radius: 12px;
            background: #fff;
            padding: 8px 12px;
            font-size: 14px;
            margin-top: 8px;
            box-shadow: 0 2px 10px rgba(0,0,0,0.1);
            animation: fade 2.4s forwards;
        }
        @keyframes fade { 0%, 80% { opacity: 1; } 100% { opacity: 0; visibility: hidden; } }
"#;

/// Escape text for use in HTML content and quoted attribute values.
pub fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Link to a user's public page.
pub fn profile_href(username: &str) -> String {
    format!("/user/{}", urlencoding::encode(username))
}

/// Everything a page needs besides its own body.
pub struct Chrome {
    pub signed_in: bool,
    pub toasts: Vec<String>,
}

pub fn page(title: &str, chrome: &Chrome, body: &str) -> Html<String> {
    let nav = if chrome.signed_in {
        r#"<a class="button outline" href="/app">My list</a>
            <form method="post" action="/auth/sign-out" style="display:inline"><button type="submit">Sign out</button></form>"#
    } else {
        r#"<a class="button" href="/app">Start</a>"#
    };

    let toasts: String = chrome
        .toasts
        .iter()
        .map(|text| format!(r#"<div class="toast">{}</div>"#, escape(text)))
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width,initial-scale=1">
    <title>{title} · Top 10 Albums</title>
    <style>{STYLE}</style>
</head>
<body>
    <header>
        <div class="bar">
            <a class="brand" href="/">Top 10 Albums</a>
            <div class="row">{nav}</div>
        </div>
    </header>
    <main>
{body}
    </main>
    <footer>Minimal design • white / gray / black • no distractions</footer>
    <div class="toasts">{toasts}</div>
</body>
</html>"#,
        title = escape(title),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_page_shows_nav_for_session_state() {
        let signed_in = Chrome {
            signed_in: true,
            toasts: vec!["Published!".to_string()],
        };
        let Html(html) = page("Home", &signed_in, "<p>hi</p>");
        assert!(html.contains("Sign out"));
        assert!(html.contains(r#"<div class="toast">Published!</div>"#));

        let signed_out = Chrome {
            signed_in: false,
            toasts: Vec::new(),
        };
        let Html(html) = page("Home", &signed_out, "");
        assert!(html.contains(">Start<"));
        assert!(!html.contains("Sign out"));
    }
}
