use askama::Template;

use crate::{
    config::{Config, PageColors},
    plan::PagePlanEntry,
    posts::{PostRecord, DEFAULT_LOCALE},
};

/// Everything the shared `<head>` block needs, assembled from the explicit configuration
/// instead of some ambient site-wide state.
pub struct HeadContext {
    pub page_title: String,
    pub site_title: String,
    pub description: String,
    pub lang: String,
    pub url: String,
}

impl HeadContext {
    fn new(config: &Config, page_title: &str, description: &str, slug: &str, locale: &str) -> Self {
        Self {
            page_title: page_title.to_string(),
            site_title: config.site_title.clone(),
            description: description.to_string(),
            lang: if locale == DEFAULT_LOCALE {
                config.language.clone()
            } else {
                locale.to_string()
            },
            url: format!("{}{}", config.base_url.trim_end_matches('/'), slug),
        }
    }
}

pub struct NavLink {
    pub title: String,
    pub href: String,
}

pub struct TranslationLink {
    pub label: String,
    pub href: String,
}

#[derive(Template)]
#[template(path = "post.html")]
struct PostTemplate<'post> {
    head: HeadContext,
    title: &'post str,
    date: String,
    author_name: &'post str,
    body: String,
    previous: Option<NavLink>,
    next: Option<NavLink>,
    translations: Vec<TranslationLink>,
}

fn nav_link(record: &PostRecord) -> NavLink {
    NavLink {
        title: record.title.to_string(),
        href: record.slug.to_string(),
    }
}

/// The address the default rendition of this record lives under.
fn canonical_slug(record: &PostRecord) -> String {
    if &record.locale[..] == DEFAULT_LOCALE {
        record.slug.to_string()
    } else {
        record
            .slug
            .strip_prefix(&format!("/{}", record.locale)[..])
            .map(str::to_string)
            .unwrap_or_else(|| record.slug.to_string())
    }
}

fn translation_links(entry: &PagePlanEntry<'_>, config: &Config) -> Vec<TranslationLink> {
    let canonical = canonical_slug(entry.record);
    entry
        .translations
        .iter()
        .map(|locale| {
            if locale == DEFAULT_LOCALE {
                TranslationLink {
                    label: config.language.clone(),
                    href: canonical.clone(),
                }
            } else {
                TranslationLink {
                    label: locale.clone(),
                    href: format!("/{}{}", locale, canonical),
                }
            }
        })
        .collect()
}

/// Renders one post page: the compiled body with translated links substituted, the
/// older/newer navigation and the list of available translations.
pub fn compile_post(entry: &PagePlanEntry<'_>, config: &Config) -> askama::Result<String> {
    let record = entry.record;
    let mut body = record.body_html.clone();
    for target in &entry.translated_links {
        let localized = format!("/{}{}", record.locale, target);
        // pulldown-cmark attribute-escapes link targets, so the needle has to be
        // escaped the same way
        let needle = format!(
            "href=\"{}\"",
            html_escape::encode_double_quoted_attribute(&target[..])
        );
        let replacement = format!(
            "href=\"{}\"",
            html_escape::encode_double_quoted_attribute(&localized[..])
        );
        body = body.replace(&needle, &replacement);
    }
    PostTemplate {
        head: HeadContext::new(
            config,
            &record.title,
            record
                .spoiler
                .as_deref()
                .unwrap_or(&config.site_description),
            &record.slug,
            &record.locale,
        ),
        title: &record.title,
        date: record.date.format(&config.date_format).to_string(),
        author_name: &config.author_name,
        body,
        previous: entry.previous.map(nav_link),
        next: entry.next.map(nav_link),
        translations: translation_links(entry, config),
    }
    .render()
}

pub struct IndexPostInfo {
    pub href: String,
    pub title: String,
    pub date: String,
    pub spoiler: Option<String>,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'index> {
    head: HeadContext,
    author_name: &'index str,
    site_description: &'index str,
    posts: Vec<IndexPostInfo>,
    background_color_code: &'index str,
    title_color_code: &'index str,
}

/// Renders the front page: default-locale posts, newest first, styled with a color
/// scheme picked deterministically from the configured palette so that rebuilding an
/// unchanged site produces identical bytes.
pub fn compile_index(records: &[PostRecord], config: &Config) -> askama::Result<String> {
    let fallback_colors = PageColors::new("6661AB", "E8E7F2");
    let colors = config
        .index_page_colors
        .get(records.len() % config.index_page_colors.len().max(1))
        .unwrap_or(&fallback_colors);
    let posts = records
        .iter()
        .filter(|record| &record.locale[..] == DEFAULT_LOCALE)
        .map(|record| IndexPostInfo {
            href: record.slug.to_string(),
            title: record.title.to_string(),
            date: record.date.format(&config.date_format).to_string(),
            spoiler: record.spoiler.clone(),
        })
        .collect();
    IndexTemplate {
        head: HeadContext::new(
            config,
            &config.site_title,
            &config.site_description,
            "/",
            DEFAULT_LOCALE,
        ),
        author_name: &config.author_name,
        site_description: &config.site_description,
        posts,
        background_color_code: colors.background(),
        title_color_code: colors.title(),
    }
    .render()
}

#[derive(Template)]
#[template(path = "not_found.html")]
struct NotFoundTemplate {
    head: HeadContext,
}

pub fn compile_not_found(config: &Config) -> askama::Result<String> {
    NotFoundTemplate {
        head: HeadContext::new(
            config,
            "Not found",
            &config.site_description,
            "/404.html",
            DEFAULT_LOCALE,
        ),
    }
    .render()
}
