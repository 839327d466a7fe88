//! Page-side JavaScript evaluated by the renderer

/// `document.readyState`
pub const READY_STATE: &str = "document.readyState";

/// Number of resource timing entries recorded so far
pub const RESOURCE_COUNT: &str = "performance.getEntriesByType('resource').length";

/// HTTP status of the main document, or 0 when the browser does not expose it
pub const NAVIGATION_STATUS: &str = r#"(() => {
    const entry = performance.getEntriesByType('navigation')[0];
    return entry && typeof entry.responseStatus === 'number' ? entry.responseStatus : 0;
})()"#;

/// Full document markup, used for challenge detection
pub const OUTER_HTML: &str =
    "document.documentElement ? document.documentElement.outerHTML : ''";

/// Removes non-content elements and returns the trimmed body markup
pub const SANITIZE: &str = r#"(() => {
    document
        .querySelectorAll('script, style, noscript, template, iframe, nav, header, footer')
        .forEach((el) => el.remove());
    return document.body ? document.body.innerHTML.trim() : '';
})()"#;

/// Scrolls down by `step_px` and reports `[viewport bottom, scrollable height]`
pub fn scroll_by(step_px: u32) -> String {
    format!(
        r#"(() => {{
    window.scrollBy(0, {});
    const root = document.scrollingElement || document.documentElement || document.body;
    return [window.scrollY + window.innerHeight, root ? root.scrollHeight : 0];
}})()"#,
        step_px
    )
}
