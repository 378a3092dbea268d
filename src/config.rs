use std::path::PathBuf;

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, PartialEq, Clone)]
pub struct PageColors {
    title: String,
    background: String,
}

impl PageColors {
    pub fn new<T: Into<String>, B: Into<String>>(title: T, background: B) -> Self {
        Self {
            background: background.into(),
            title: title.into(),
        }
    }

    pub fn background(&self) -> &str {
        self.background.as_ref()
    }

    pub fn title(&self) -> &str {
        self.title.as_ref()
    }
}

#[derive(Serialize, Deserialize)]
pub struct Config {
    pub site_title: String,
    pub site_description: String,
    pub author_name: String,
    /// Absolute address the site will be published under, used for the `og:url` tags
    pub base_url: String,
    /// Language tag put on pages whose rendition isn't a translation
    pub language: String,
    pub posts_directory: PathBuf,
    pub files_directory: PathBuf,
    pub output_directory: PathBuf,
    pub date_format: String,
    pub index_page_colors: Vec<PageColors>,
    pub log_level: String,
    pub file_watcher_delay_in_milliseconds: u64,
}

impl Config {
    /// Returns a sample configuration, which should __not__ be published as-is (because it
    /// lacks the author's name and the real site address)
    pub fn sample() -> Self {
        Self {
            site_title: "<site title>".into(),
            site_description: "<site description>".into(),
            author_name: "<author name>".into(),
            base_url: "https://example.com".into(),
            language: "en".into(),
            posts_directory: "posts".into(),
            files_directory: "files".into(),
            output_directory: "public".into(),
            date_format: "%Y.%m.%d".into(),
            index_page_colors: vec![
                PageColors::new("C8566B", "F6E5E8"),
                PageColors::new("E78963", "FBEDE7"),
                PageColors::new("F2D48F", "FDF8EE"),
                PageColors::new("9D75BF", "F0EAF5"),
                PageColors::new("9EC299", "F0F5EF"),
                PageColors::new("6661AB", "E8E7F2"),
            ],
            log_level: "info".into(),
            file_watcher_delay_in_milliseconds: 2,
        }
    }
}
