use std::{fs, io};

use log::info;
use thiserror::Error;

use crate::{
    config::Config,
    page_compilers,
    plan::{self, PlanError},
    posts::{self, PostError},
};

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Posts(#[from] PostError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error("page rendering failed: {0}")]
    Render(#[from] askama::Error),
    #[error("cannot write the output: {0}")]
    Output(#[from] io::Error),
}

/// Compiles the whole site into the output directory: one `index.html` per post under the
/// post's address, the front page, the 404 page and the static files copied alongside.
pub fn build(config: &Config) -> Result<(), BuildError> {
    let records = posts::load_posts(config)?;
    let plan = plan::build_plan(&records)?;
    fs::create_dir_all(&config.output_directory)?;
    for entry in &plan {
        let page = page_compilers::compile_post(entry, config)?;
        let page_directory = config.output_directory.join(entry.slug.trim_matches('/'));
        fs::create_dir_all(&page_directory)?;
        fs::write(page_directory.join("index.html"), page)?;
    }
    fs::write(
        config.output_directory.join("index.html"),
        page_compilers::compile_index(&records, config)?,
    )?;
    fs::write(
        config.output_directory.join("404.html"),
        page_compilers::compile_not_found(config)?,
    )?;
    copy_static_files(config)?;
    info!(
        "Compiled {} post pages into {:?}",
        plan.len(),
        config.output_directory
    );
    Ok(())
}

fn copy_static_files(config: &Config) -> io::Result<()> {
    if !config.files_directory.is_dir() {
        return Ok(());
    }
    for entry in fs::read_dir(&config.files_directory)? {
        let entry = entry?;
        if entry.path().is_file() {
            fs::copy(
                entry.path(),
                config.output_directory.join(entry.file_name()),
            )?;
        }
    }
    Ok(())
}
