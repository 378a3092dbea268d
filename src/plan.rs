use std::{collections::HashMap, sync::Arc};

use itertools::Itertools;
use log::warn;
use thiserror::Error;

use crate::posts::{PostRecord, DEFAULT_LOCALE};

/// Navigation and linking context for one generated page.
///
/// Entries borrow the records they were built from and are consumed right away by the
/// page writer; nothing here survives the build pass.
#[derive(Debug)]
pub struct PagePlanEntry<'records> {
    pub slug: Arc<str>,
    pub record: &'records PostRecord,
    /// The record right after this one in newest-first order, i.e. the older neighbor
    pub previous: Option<&'records PostRecord>,
    /// The record right before this one in newest-first order, i.e. the newer neighbor
    pub next: Option<&'records PostRecord>,
    /// Locales of the sibling renditions of the same post, own locale excluded, sorted
    pub translations: Vec<String>,
    /// Outbound link targets that have a rendition under this record's locale; the
    /// renderer substitutes those at page-compile time
    pub translated_links: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("both `{first}` and `{second}` want the address `{slug}`; rename one of them")]
    DuplicateSlug {
        slug: String,
        first: String,
        second: String,
    },
}

/// Walks the records once and produces one plan entry per record, order-preserving.
///
/// The input must already be sorted newest-first; this function never sorts. An empty
/// input is fine and yields an empty plan. A slug claimed by two records aborts the
/// build instead of letting one page silently shadow the other.
pub fn build_plan(records: &[PostRecord]) -> Result<Vec<PagePlanEntry<'_>>, PlanError> {
    let mut known_slugs: HashMap<&str, &PostRecord> = HashMap::with_capacity(records.len());
    for record in records {
        if let Some(existing) = known_slugs.insert(&record.slug, record) {
            return Err(PlanError::DuplicateSlug {
                slug: record.slug.to_string(),
                first: existing.source.display().to_string(),
                second: record.source.display().to_string(),
            });
        }
    }
    let locales_by_group: HashMap<&str, Vec<&str>> = records
        .iter()
        .filter_map(|record| {
            record
                .group_id
                .as_deref()
                .map(|group| (group, &record.locale[..]))
        })
        .into_group_map();
    let mut plan = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let previous = records.get(index + 1);
        let next = if index == 0 {
            None
        } else {
            Some(&records[index - 1])
        };
        let mut translations: Vec<String> = record
            .group_id
            .as_deref()
            .and_then(|group| locales_by_group.get(group))
            .map(|locales| {
                let own_locale = &record.locale[..];
                locales
                    .iter()
                    .filter(|&&locale| locale != own_locale)
                    .map(|&locale| locale.to_string())
                    .collect()
            })
            .unwrap_or_default();
        translations.sort_unstable();
        plan.push(PagePlanEntry {
            slug: record.slug.clone(),
            record,
            previous,
            next,
            translations,
            translated_links: scan_outbound_links(record, &known_slugs),
        });
    }
    Ok(plan)
}

/// Finds which of the record's outbound links already have a rendition under its locale.
///
/// Only translated renditions are scanned: the default rendition's links are canonical
/// by definition. A link that points straight at a locale-prefixed address is an
/// authoring mistake; the page is still generated, with a warning in the build log,
/// because the renderer substitutes translations on its own.
fn scan_outbound_links(record: &PostRecord, known_slugs: &HashMap<&str, &PostRecord>) -> Vec<String> {
    let mut translated_links = Vec::new();
    if &record.locale[..] == DEFAULT_LOCALE {
        return translated_links;
    }
    let locale_prefix = format!("/{}/", record.locale);
    for target in &record.outbound_links {
        if !known_slugs.contains_key(&target[..]) {
            continue;
        }
        let localized = format!("/{}{}", record.locale, target);
        if known_slugs.contains_key(&localized[..]) {
            translated_links.push(target.clone());
        } else if target.starts_with(&locale_prefix) {
            warn!(
                "It looks like the \"{}\" rendition of \"{}\" links to the translated address \
                `{}`. Don't do this: link to the original address instead, the renderer \
                substitutes a translation when one is available.",
                record.locale, record.title, target
            );
        }
    }
    translated_links
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use chrono::NaiveDate;

    use super::*;

    fn record(
        slug: &str,
        date: (i32, u32, u32),
        locale: &str,
        group_id: Option<&str>,
        outbound_links: &[&str],
    ) -> PostRecord {
        PostRecord {
            slug: slug.into(),
            title: slug.trim_matches('/').into(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            spoiler: None,
            locale: locale.into(),
            group_id: group_id.map(Into::into),
            body_html: String::new(),
            outbound_links: outbound_links.iter().map(|link| (*link).to_string()).collect(),
            source: PathBuf::from(format!("posts{}index.md", slug)),
        }
    }

    #[test]
    fn empty_input_yields_an_empty_plan() {
        assert!(build_plan(&[]).unwrap().is_empty());
    }

    #[test]
    fn one_entry_per_record_in_the_same_order() {
        let records = vec![
            record("/c/", (2022, 3, 1), DEFAULT_LOCALE, None, &[]),
            record("/b/", (2022, 2, 1), DEFAULT_LOCALE, None, &[]),
            record("/a/", (2022, 1, 1), DEFAULT_LOCALE, None, &[]),
        ];
        let plan = build_plan(&records).unwrap();
        assert_eq!(plan.len(), records.len());
        for (entry, record) in plan.iter().zip(&records) {
            assert_eq!(entry.slug, record.slug);
        }
    }

    #[test]
    fn neighbors_follow_the_newest_first_order() {
        let records = vec![
            record("/newest/", (2022, 3, 1), DEFAULT_LOCALE, None, &[]),
            record("/middle/", (2022, 2, 1), DEFAULT_LOCALE, None, &[]),
            record("/oldest/", (2022, 1, 1), DEFAULT_LOCALE, None, &[]),
        ];
        let plan = build_plan(&records).unwrap();
        assert!(plan[0].next.is_none());
        assert_eq!(&plan[0].previous.unwrap().slug[..], "/middle/");
        assert_eq!(&plan[1].previous.unwrap().slug[..], "/oldest/");
        assert_eq!(&plan[1].next.unwrap().slug[..], "/newest/");
        assert!(plan[2].previous.is_none());
        assert_eq!(&plan[2].next.unwrap().slug[..], "/middle/");
    }

    #[test]
    fn a_single_record_has_no_neighbors() {
        let records = vec![record("/alone/", (2022, 1, 1), DEFAULT_LOCALE, None, &[])];
        let plan = build_plan(&records).unwrap();
        assert!(plan[0].previous.is_none());
        assert!(plan[0].next.is_none());
    }

    #[test]
    fn sibling_renditions_see_each_other_but_not_themselves() {
        let records = vec![
            record("/en/x/", (2022, 1, 2), DEFAULT_LOCALE, Some("x"), &[]),
            record("/fr/x/", (2022, 1, 1), "fr", Some("x"), &[]),
        ];
        let plan = build_plan(&records).unwrap();
        assert_eq!(plan[0].translations, vec!["fr".to_string()]);
        assert_eq!(plan[1].translations, vec![DEFAULT_LOCALE.to_string()]);
    }

    #[test]
    fn translations_cover_every_sibling_locale() {
        let records = vec![
            record("/x/", (2022, 1, 3), DEFAULT_LOCALE, Some("x"), &[]),
            record("/es/x/", (2022, 1, 2), "es", Some("x"), &[]),
            record("/fr/x/", (2022, 1, 1), "fr", Some("x"), &[]),
        ];
        let plan = build_plan(&records).unwrap();
        assert_eq!(plan[0].translations, vec!["es".to_string(), "fr".to_string()]);
        assert_eq!(
            plan[2].translations,
            vec![DEFAULT_LOCALE.to_string(), "es".to_string()]
        );
    }

    #[test]
    fn groupless_records_have_no_translations() {
        let records = vec![record("/lonely/", (2022, 1, 1), DEFAULT_LOCALE, None, &[])];
        let plan = build_plan(&records).unwrap();
        assert!(plan[0].translations.is_empty());
    }

    #[test]
    fn duplicate_slugs_abort_the_build_naming_both_sources() {
        let mut first = record("/taken/", (2022, 1, 2), DEFAULT_LOCALE, None, &[]);
        first.source = PathBuf::from("posts/taken.md");
        let mut second = record("/taken/", (2022, 1, 1), DEFAULT_LOCALE, None, &[]);
        second.source = PathBuf::from("posts/taken/index.md");
        let error = build_plan(&[first, second]).unwrap_err();
        match error {
            PlanError::DuplicateSlug {
                slug,
                first,
                second,
            } => {
                assert_eq!(slug, "/taken/");
                assert_eq!(first, "posts/taken.md");
                assert_eq!(second, "posts/taken/index.md");
            }
        }
    }

    #[test]
    fn translated_links_are_detected_for_translated_renditions() {
        let records = vec![
            record("/other/", (2022, 1, 4), DEFAULT_LOCALE, Some("other"), &[]),
            record("/fr/other/", (2022, 1, 3), "fr", Some("other"), &[]),
            record("/x/", (2022, 1, 2), DEFAULT_LOCALE, Some("x"), &[]),
            record(
                "/fr/x/",
                (2022, 1, 1),
                "fr",
                Some("x"),
                &["/other/", "/untranslated/", "/nowhere/"],
            ),
        ];
        let plan = build_plan(&records).unwrap();
        let entry = &plan[3];
        // `/other/` has a French rendition; `/untranslated/` and `/nowhere/` don't exist
        assert_eq!(entry.translated_links, vec!["/other/".to_string()]);
        for link in &entry.translated_links {
            assert!(records[3].outbound_links.contains(link));
        }
    }

    #[test]
    fn default_rendition_links_are_left_alone() {
        let records = vec![
            record("/other/", (2022, 1, 3), DEFAULT_LOCALE, Some("other"), &[]),
            record("/fr/other/", (2022, 1, 2), "fr", Some("other"), &[]),
            record(
                "/x/",
                (2022, 1, 1),
                DEFAULT_LOCALE,
                Some("x"),
                &["/other/"],
            ),
        ];
        let plan = build_plan(&records).unwrap();
        assert!(plan[2].translated_links.is_empty());
    }

    #[test]
    fn a_direct_link_to_a_translated_address_is_not_rewritten() {
        // Linking straight to `/fr/other/` is the authoring mistake the build log warns
        // about; the plan must not list it for substitution.
        let records = vec![
            record("/other/", (2022, 1, 4), DEFAULT_LOCALE, Some("other"), &[]),
            record("/fr/other/", (2022, 1, 3), "fr", Some("other"), &[]),
            record("/x/", (2022, 1, 2), DEFAULT_LOCALE, Some("x"), &[]),
            record("/fr/x/", (2022, 1, 1), "fr", Some("x"), &["/fr/other/"]),
        ];
        let plan = build_plan(&records).unwrap();
        assert!(plan[3].translated_links.is_empty());
    }
}
