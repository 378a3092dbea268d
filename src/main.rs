use std::{fs, path::Path, sync::mpsc, thread, time::Duration};

use clap::{crate_description, Parser, Subcommand};
use log::{error, info, warn};
use notify::{DebouncedEvent, RecommendedWatcher, RecursiveMode, Watcher};

use inkpress::{
    config::Config,
    site,
    utils::{init_logging, parse_log_level},
};

#[derive(Parser)]
#[clap(author, version, about = crate_description!(), long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a sample configuration file with all the values pre-filled
    CreateSampleConfig {
        /// Create the configuration file even if it already exists
        #[clap(long, takes_value = false)]
        force: bool,
    },
    /// Compile the whole site once and exit
    Build,
    /// Compile the site, then recompile whenever the posts or the configuration change
    Watch,
}

const CONFIG_FILE_NAME: &str = "config.json";

macro_rules! clean_panic {
    ($message:literal$(,)? $($arg:expr),*) => {
        {
            use std::process;
            eprintln!($message, $($arg),*);
            process::exit(1);
        }
    }
}

fn read_config() -> Config {
    let contents = fs::read_to_string(Path::new(CONFIG_FILE_NAME)).unwrap_or_else(|error| {
        clean_panic!(
            "Configuration file isn't accessible! Consider creating a sample configuration \
            using `inkpress create-sample-config`, and then editing it. Details: {}",
            error
        );
    });
    serde_json::from_str(&contents).unwrap_or_else(|error| {
        clean_panic!(
            "Configuration file is poorly formatted! Fix it and try again. Details: {}",
            error
        );
    })
}

struct WatchContext {
    _watcher: RecommendedWatcher,
    event_receiver: mpsc::Receiver<DebouncedEvent>,
}

fn watch(config: &Config) -> Result<WatchContext, notify::Error> {
    if !config.posts_directory.is_dir() {
        return Err(notify::Error::Generic(format!(
            "{:?} is not a directory!",
            config.posts_directory
        )));
    }
    let (event_sender, event_receiver) = mpsc::channel();
    let mut watcher: RecommendedWatcher = Watcher::new(
        event_sender,
        Duration::from_millis(config.file_watcher_delay_in_milliseconds),
    )?;
    watcher.watch(&config.posts_directory, RecursiveMode::Recursive)?;
    watcher.watch(Path::new(CONFIG_FILE_NAME), RecursiveMode::NonRecursive)?;
    Ok(WatchContext {
        _watcher: watcher,
        event_receiver,
    })
}

fn rebuild(config: &Config) {
    if let Err(error) = site::build(config) {
        error!("Rebuild failed: {}", error);
    }
}

fn watch_forever(mut config: Config) -> ! {
    loop {
        let context = loop {
            match watch(&config) {
                Ok(context) => break context,
                Err(error) => {
                    error!(
                        "Cannot watch the posts directory or the configuration file: {}. \
                        Waiting until they are accessible...",
                        error
                    );
                    thread::sleep(Duration::from_secs(1));
                }
            }
        };
        info!("Watching for changes...");
        while let Ok(event) = context.event_receiver.recv() {
            let path = match event {
                DebouncedEvent::Write(path)
                | DebouncedEvent::Create(path)
                | DebouncedEvent::Remove(path)
                | DebouncedEvent::Rename(_, path) => path,
                _ => continue,
            };
            if path
                .file_name()
                .map_or(false, |name| name == CONFIG_FILE_NAME)
            {
                match fs::read_to_string(Path::new(CONFIG_FILE_NAME)) {
                    Ok(contents) => match serde_json::from_str::<Config>(&contents) {
                        Ok(new_config) => {
                            config = new_config;
                            match parse_log_level(&config.log_level) {
                                Some(level) => log::set_max_level(level),
                                None => warn!(
                                    "The updated configuration names an unknown log level; \
                                    keeping the old one"
                                ),
                            }
                            info!("Configuration reloaded");
                            rebuild(&config);
                            // The watched directories may have moved, so the watcher is
                            // recreated from the new configuration
                            break;
                        }
                        Err(error) => warn!(
                            "Updated configuration file is poorly formatted! Consider \
                            fixing it. Using the old configuration for now. Details: {}",
                            error
                        ),
                    },
                    Err(error) => error!(
                        "Configuration file update was noticed, but the file couldn't \
                        be read. Details: {}",
                        error
                    ),
                }
            } else if path == config.posts_directory {
                // The posts directory itself was touched (likely moved or deleted);
                // rebuild and re-watch it from scratch
                rebuild(&config);
                break;
            } else {
                rebuild(&config);
            }
        }
    }
}

fn main() {
    let args = Args::parse();

    match args.command {
        Command::CreateSampleConfig { force } => {
            let config_path = Path::new(CONFIG_FILE_NAME);
            if config_path.exists() && !force {
                clean_panic!(
                    "`{:?}` already exists! To overwrite it, add a `--force` flag.",
                    config_path
                );
            }
            fs::write(
                config_path,
                serde_json::to_string_pretty(&Config::sample()).unwrap(),
            )
            .unwrap_or_else(|error| {
                clean_panic!("Cannot write `{:?}`! Details: {}", config_path, error);
            });
        }
        Command::Build => {
            let config = read_config();
            init_logging(&config.log_level);
            site::build(&config).unwrap_or_else(|error| {
                clean_panic!("Build failed! Details: {}", error);
            });
        }
        Command::Watch => {
            let config = read_config();
            init_logging(&config.log_level);
            rebuild(&config);
            watch_forever(config);
        }
    }
}
