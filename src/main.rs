use anyhow::Result;
use argh::FromArgs;
use jobshell::{Interpreter, SearchPath, Session};
use std::path::PathBuf;

/// A line-oriented command interpreter with job control.
#[derive(FromArgs)]
struct Args {
    /// file holding the executable search list, one directory per line
    #[argh(option, default = "PathBuf::from(\"shell-config\")")]
    config: PathBuf,

    /// take the search list from the PATH environment variable instead
    #[argh(switch)]
    from_env: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args: Args = argh::from_env();

    let search_path = if args.from_env {
        SearchPath::from_path_env()?
    } else {
        SearchPath::load(&args.config)?
    };

    let mut shell = Interpreter::new(Session::new(search_path));
    shell.repl()
}
