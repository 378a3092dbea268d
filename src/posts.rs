use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

use chrono::{DateTime, Local, NaiveDate};
use itertools::Itertools;
use peeking_take_while::PeekableExt;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    config::Config,
    utils::{ExtractBaseName, FileNameShortcut},
};

/// Locale marker of a rendition that isn't a translation. Slugs of such renditions carry no
/// locale prefix.
pub const DEFAULT_LOCALE: &str = "default";

pub type FileTime = DateTime<Local>;

/// One loaded post rendition, ready for plan building and rendering.
#[derive(Debug)]
pub struct PostRecord {
    pub slug: Arc<str>,
    pub title: Arc<str>,
    pub date: NaiveDate,
    pub spoiler: Option<String>,
    pub locale: Arc<str>,
    pub group_id: Option<Arc<str>>,
    pub body_html: String,
    /// Absolute intra-site link targets found in the Markdown body, deduplicated,
    /// in order of first appearance
    pub outbound_links: Vec<String>,
    pub source: PathBuf,
}

#[derive(Deserialize, Default)]
struct FrontMatter {
    title: Option<String>,
    date: Option<NaiveDate>,
    spoiler: Option<String>,
}

#[derive(Debug, Error)]
pub enum PostError {
    #[error("cannot list the posts directory `{}`: {source}", path.display())]
    List { path: PathBuf, source: io::Error },
    #[error("cannot read `{}`: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("broken front matter in `{}`: {source}", path.display())]
    FrontMatter {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

/// Loads every post rendition under the configured posts directory and returns them sorted
/// newest-first (ties broken by slug, so reruns produce identical output).
///
/// Two layouts are recognized: a flat `<name>.md` file, and a `<name>/` directory holding
/// `index.md` plus any number of `index.<locale>.md` translations. The directory name becomes
/// the group identifier shared by all renditions of the same post.
pub fn load_posts(config: &Config) -> Result<Vec<PostRecord>, PostError> {
    let mut records = Vec::new();
    let entries = fs::read_dir(&config.posts_directory).map_err(|source| PostError::List {
        path: config.posts_directory.clone(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| PostError::List {
            path: config.posts_directory.clone(),
            source,
        })?;
        let path = entry.path();
        if path.is_dir() {
            load_group(&path, &mut records)?;
        } else {
            let file_name = path.file_name_arc_str();
            if file_name.ends_with(".md") {
                let base_name = file_name.base_name();
                let slug: Arc<str> = format!("/{}/", base_name).into();
                records.push(load_record(&path, slug, DEFAULT_LOCALE.into(), None, base_name)?);
            }
        }
    }
    records.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.slug.cmp(&b.slug)));
    Ok(records)
}

fn load_group(group_path: &Path, records: &mut Vec<PostRecord>) -> Result<(), PostError> {
    let group: Arc<str> = group_path.file_name_arc_str();
    let entries = fs::read_dir(group_path).map_err(|source| PostError::List {
        path: group_path.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| PostError::List {
            path: group_path.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        let file_name = path.file_name_arc_str();
        let locale = match rendition_locale(&file_name) {
            Some(locale) => locale,
            None => continue,
        };
        let slug: Arc<str> = if locale == DEFAULT_LOCALE {
            format!("/{}/", group).into()
        } else {
            format!("/{}/{}/", locale, group).into()
        };
        records.push(load_record(
            &path,
            slug,
            locale.into(),
            Some(group.clone()),
            group.clone(),
        )?);
    }
    Ok(())
}

/// `index.md` is the default rendition, `index.<locale>.md` a translation;
/// everything else in a post directory is ignored.
fn rendition_locale(file_name: &str) -> Option<&str> {
    let stem = file_name.strip_suffix(".md")?;
    if stem == "index" {
        return Some(DEFAULT_LOCALE);
    }
    let locale = stem.strip_prefix("index.")?;
    if locale.is_empty() {
        None
    } else {
        Some(locale)
    }
}

fn load_record(
    path: &Path,
    slug: Arc<str>,
    locale: Arc<str>,
    group_id: Option<Arc<str>>,
    fallback_title: Arc<str>,
) -> Result<PostRecord, PostError> {
    let contents = fs::read_to_string(path).map_err(|source| PostError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let (front_matter, markdown) = split_front_matter(&contents);
    let front_matter: FrontMatter = match front_matter {
        Some(yaml) => serde_yaml::from_str(yaml).map_err(|source| PostError::FrontMatter {
            path: path.to_path_buf(),
            source,
        })?,
        None => FrontMatter::default(),
    };
    let compiled = compile_markdown(markdown);
    let date = match front_matter.date {
        Some(date) => date,
        None => {
            // Undated posts fall back to the file's modification time
            let metadata = fs::metadata(path).map_err(|source| PostError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            let modification_time: FileTime = metadata
                .modified()
                .map_err(|source| PostError::Read {
                    path: path.to_path_buf(),
                    source,
                })?
                .into();
            modification_time.naive_local().date()
        }
    };
    let title = front_matter
        .title
        .map(Into::into)
        .or(compiled.first_heading)
        .unwrap_or(fallback_title);
    Ok(PostRecord {
        slug,
        title,
        date,
        spoiler: front_matter.spoiler,
        locale,
        group_id,
        body_html: compiled.html,
        outbound_links: compiled.outbound_links,
        source: path.to_path_buf(),
    })
}

/// Front matter is a leading block delimited by `---` lines; posts without one are
/// plain Markdown from the first byte.
fn split_front_matter(contents: &str) -> (Option<&str>, &str) {
    if let Some(rest) = contents.strip_prefix("---\n") {
        if let Some(end) = rest.find("\n---") {
            let tail = &rest[end + 4..];
            let body = tail.strip_prefix('\n').unwrap_or(tail);
            return (Some(&rest[..end]), body);
        }
    }
    (None, contents)
}

pub struct CompiledPostBody {
    pub html: String,
    pub first_heading: Option<Arc<str>>,
    pub outbound_links: Vec<String>,
}

/// Compiles the Markdown body to HTML in one pass, capturing the text of the first heading
/// (a title candidate) and every absolute intra-site link target (starts and ends with `/`)
/// along the way.
pub fn compile_markdown(markdown: &str) -> CompiledPostBody {
    let mut outbound_links = Vec::new();
    let mut parser = pulldown_cmark::Parser::new_ext(markdown, {
        let mut options = pulldown_cmark::Options::empty();
        options.insert(pulldown_cmark::Options::ENABLE_STRIKETHROUGH);
        options.insert(pulldown_cmark::Options::ENABLE_FOOTNOTES);
        options
    })
    .inspect(|event| {
        if let pulldown_cmark::Event::Start(pulldown_cmark::Tag::Link(_, target, _)) = event {
            if target.starts_with('/') && target.ends_with('/') {
                outbound_links.push(target.to_string());
            }
        }
    })
    .peekable();
    let mut html = String::new();
    pulldown_cmark::html::push_html(
        &mut html,
        PeekableExt::peeking_take_while(parser.by_ref(), |event| {
            !matches!(
                event,
                pulldown_cmark::Event::Start(pulldown_cmark::Tag::Heading(..))
            )
        }),
    );
    let mut first_heading = String::new();
    pulldown_cmark::html::push_html(
        &mut html,
        PeekableExt::peeking_take_while(parser.by_ref(), |event| {
            if let pulldown_cmark::Event::Code(contents)
            | pulldown_cmark::Event::Html(contents)
            | pulldown_cmark::Event::Text(contents) = event
            {
                first_heading.push_str(contents);
            }
            !matches!(
                event,
                pulldown_cmark::Event::End(pulldown_cmark::Tag::Heading(..))
            )
        }),
    );
    pulldown_cmark::html::push_html(&mut html, parser);
    let outbound_links = outbound_links.into_iter().unique().collect();
    CompiledPostBody {
        html,
        first_heading: if first_heading.is_empty() {
            None
        } else {
            Some(first_heading.into())
        },
        outbound_links,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn front_matter_is_split_off() {
        let (yaml, body) = split_front_matter("---\ntitle: Hi\n---\nBody here\n");
        assert_eq!(yaml, Some("title: Hi"));
        assert_eq!(body, "Body here\n");
    }

    #[test]
    fn missing_front_matter_leaves_the_body_alone() {
        let (yaml, body) = split_front_matter("Just text\n");
        assert_eq!(yaml, None);
        assert_eq!(body, "Just text\n");
    }

    #[test]
    fn unterminated_front_matter_is_treated_as_body() {
        let (yaml, body) = split_front_matter("---\ntitle: Hi\nno closing line\n");
        assert_eq!(yaml, None);
        assert!(body.starts_with("---"));
    }

    #[test]
    fn front_matter_fields_are_parsed() {
        let (yaml, _) = split_front_matter(
            "---\ntitle: A post\ndate: 2018-12-25\nspoiler: Short teaser.\n---\nText\n",
        );
        let front_matter: FrontMatter = serde_yaml::from_str(yaml.unwrap()).unwrap();
        assert_eq!(front_matter.title.as_deref(), Some("A post"));
        assert_eq!(
            front_matter.date,
            Some(NaiveDate::from_ymd_opt(2018, 12, 25).unwrap())
        );
        assert_eq!(front_matter.spoiler.as_deref(), Some("Short teaser."));
    }

    #[test]
    fn rendition_locales_are_derived_from_file_names() {
        assert_eq!(rendition_locale("index.md"), Some(DEFAULT_LOCALE));
        assert_eq!(rendition_locale("index.fr.md"), Some("fr"));
        assert_eq!(rendition_locale("index.pt-br.md"), Some("pt-br"));
        assert_eq!(rendition_locale("index..md"), None);
        assert_eq!(rendition_locale("notes.md"), None);
        assert_eq!(rendition_locale("index.md.bak"), None);
    }

    #[test]
    fn first_heading_becomes_the_title_candidate() {
        let compiled = compile_markdown("Intro paragraph.\n\n# The `real` title\n\nMore text.\n");
        assert_eq!(compiled.first_heading.as_deref(), Some("The real title"));
        assert!(compiled.html.contains("<h1>"));
        assert!(compiled.html.contains("Intro paragraph."));
    }

    #[test]
    fn headingless_posts_have_no_title_candidate() {
        let compiled = compile_markdown("No headings at all.\n");
        assert!(compiled.first_heading.is_none());
    }

    #[test]
    fn absolute_intra_site_links_are_collected_once_each() {
        let compiled = compile_markdown(
            "See [one](/first-post/), [two](/second-post/),\n\
            [one again](/first-post/), [outside](https://example.com/page/)\n\
            and [no trailing slash](/first-post).\n",
        );
        assert_eq!(
            compiled.outbound_links,
            vec!["/first-post/".to_string(), "/second-post/".to_string()]
        );
    }
}
