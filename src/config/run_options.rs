use std::{env, path::PathBuf};

use getopts::Options;
use tracing::warn;

use crate::config::CONFIG_FILE;

#[derive(Clone, Debug, Default)]
pub struct Args {
    pub cfg_file: Option<PathBuf>,
}

pub fn print_usage(program: &str, opts: &Options) {
    let brief = format!("Usage: {} [options] [config_file]", program);
    print!("{}", opts.usage(&brief));
}

pub fn get_args() -> Args {
    let args: Vec<String> = env::args().collect();
    let program = args.first().cloned().unwrap_or_else(|| "bomba".to_owned());
    let mut opts = Options::new();
    opts.optflag("h", "help", "print this help menu");

    let matches = match opts.parse(args.iter().skip(1)) {
        Ok(m) => m,
        Err(f) => {
            warn!("Error parsing arguments: {}", f);
            warn!("Proceeding with defaults.");
            print_usage(&program, &opts);
            return Args { cfg_file: default_cfg_file() };
        }
    };

    if matches.opt_present("h") {
        print_usage(&program, &opts);
        std::process::exit(0);
    }

    parse_free(matches.free.first().map(String::as_str))
}

fn parse_free(config_file_path: Option<&str>) -> Args {
    let Some(config_file_path) = config_file_path else {
        return Args { cfg_file: default_cfg_file() };
    };
    let path = PathBuf::from(config_file_path);
    if !path.exists() {
        warn!(path = config_file_path, "Config file does not exist. Proceeding with defaults.");
        return Args { cfg_file: None };
    }
    Args { cfg_file: Some(path) }
}

/// `./bomba.toml` when present; the file is optional.
pub fn default_cfg_file() -> Option<PathBuf> {
    let path = PathBuf::from(CONFIG_FILE);
    path.exists().then_some(path)
}
