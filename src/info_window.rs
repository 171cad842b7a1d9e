// Info-window HTML for a single footprint.
// The page listens for clicks on `.likcc-footprint-link-btn` and opens `data-article-url`.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};

use crate::source::FootprintSpec;
use crate::types::MapSettings;

const ICON_TYPE: &str = r#"<path d="M3 7v10a4 4 0 004 4h10a4 4 0 004-4V7a4 4 0 00-4-4H7a4 4 0 00-4 4z"></path><path d="M9 12h6"></path>"#;
const ICON_TIME: &str = r#"<rect x="3" y="4" width="18" height="18" rx="2" ry="2"></rect><line x1="16" y1="2" x2="16" y2="6"></line><line x1="8" y1="2" x2="8" y2="6"></line><line x1="3" y1="10" x2="21" y2="10"></line>"#;
const ICON_LOCATION: &str = r#"<path d="M21 10c0 7-9 13-9 13s-9-6-9-13a9 9 0 0118 0z"></path><circle cx="12" cy="10" r="3"></circle>"#;
const ICON_LINK: &str = r#"<path d="M10 13a5 5 0 0 0 7.54.54l3-3a5 5 0 0 0-7.07-7.07l-1.72 1.71"></path><path d="M14 11a5 5 0 0 0-7.54-.54l-3 3a5 5 0 0 0 7.07 7.07l1.71-1.71"></path>"#;

const UNKNOWN_TYPE: &str = "未知类型";
const UNKNOWN_LOCATION: &str = "未知位置";
const LINK_LABEL: &str = "查看关联";

/// CSS class of the "view linked article" action.
pub const LINK_BUTTON_CLASS: &str = "likcc-footprint-link-btn";
/// CSS class of the info-window root element.
pub const WINDOW_CLASS: &str = "info-window";

/// Escape text for use in element content and quoted attributes.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
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

/// Format an ISO-8601 instant as `YYYY-MM-DD HH:MM` at the given offset.
///
/// Timestamps without a zone (`2024-05-01 10:00:00`) are shown as written.
/// Unparseable input is returned as-is; absent input gives an empty string.
pub fn format_create_time(raw: Option<&str>, offset_minutes: i32) -> String {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return String::new();
    };
    // Out-of-range offsets fall back to UTC.
    let offset = FixedOffset::east_opt(offset_minutes.saturating_mul(60)).unwrap_or(Utc.fix());
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return instant.with_timezone(&offset).format(DISPLAY_FORMAT).to_string();
    }
    // Zone-less timestamps are already local to the display.
    LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|local| local.format(DISPLAY_FORMAT).to_string())
        .unwrap_or_else(|| raw.to_string())
}

const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M";

const LOCAL_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

fn meta_row(icon: &str, text: &str) -> String {
    format!(
        r#"<div class="meta"><span><svg viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2">{}</svg>{}</span></div>"#,
        icon,
        escape_html(text)
    )
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Render the info-window fragment for a footprint.
pub fn render_info_window(spec: &FootprintSpec, settings: &MapSettings) -> String {
    let image = non_empty(&spec.image).unwrap_or(settings.placeholder_image.as_str());
    let name = escape_html(&spec.name);

    let mut meta = String::new();
    meta.push_str(&meta_row(
        ICON_TYPE,
        non_empty(&spec.footprint_type).unwrap_or(UNKNOWN_TYPE),
    ));
    meta.push_str(&meta_row(
        ICON_TIME,
        &format_create_time(spec.create_time.as_deref(), settings.time_offset_minutes),
    ));
    meta.push_str(&meta_row(
        ICON_LOCATION,
        non_empty(&spec.address).unwrap_or(UNKNOWN_LOCATION),
    ));

    let description = non_empty(&spec.description)
        .map(|d| format!(r#"<p class="description">{}</p>"#, escape_html(d)))
        .unwrap_or_default();

    let link = non_empty(&spec.article)
        .map(|url| {
            format!(
                r#"<a href="javascript:void(0)" data-article-url="{}" class="{}"><svg viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" class="likcc-footprint-link-icon">{}</svg>{}</a>"#,
                escape_html(url),
                LINK_BUTTON_CLASS,
                ICON_LINK,
                LINK_LABEL
            )
        })
        .unwrap_or_default();

    format!(
        r#"<div class="{window}"><div class="image"><img src="{src}" alt="{alt}" style="position: absolute; width: 100%; height: 100%; object-fit: cover;"><div class="image-info"><h3 class="title">{title}</h3>{meta}{description}{link}</div></div></div>"#,
        window = WINDOW_CLASS,
        src = escape_html(image),
        alt = name,
        title = name,
        meta = meta,
        description = description,
        link = link,
    )
}
