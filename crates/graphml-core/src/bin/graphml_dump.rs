#[cfg(feature = "dump")]
mod real {
    use graphml_core::{GraphMlWriter, MemoryGraph, ParseError, WriteError};
    use std::io;
    use std::path::PathBuf;

    #[derive(Debug, thiserror::Error)]
    enum DumpError {
        #[error(transparent)]
        Parse(#[from] ParseError),

        #[error(transparent)]
        Write(#[from] WriteError),

        #[error("json error: {0}")]
        Json(#[from] serde_json::Error),
    }

    fn run_json(path: PathBuf) -> Result<(), DumpError> {
        let graph = MemoryGraph::from_graphml_path(&path)?;
        let mut json = serde_json::to_string_pretty(&graph)?;
        json.push('\n');
        print!("{json}");
        Ok(())
    }

    fn run_rewrite(path: PathBuf) -> Result<(), DumpError> {
        let graph = MemoryGraph::from_graphml_path(&path)?;
        GraphMlWriter::new(&graph).write(io::stdout().lock())?;
        println!();
        Ok(())
    }

    fn run() -> Result<(), DumpError> {
        let mut args = std::env::args().skip(1);
        let Some(first) = args.next() else {
            eprintln!(
                "usage: graphml_dump <graphml>\n\
                usage: graphml_dump rewrite <graphml>"
            );
            std::process::exit(2);
        };

        if first == "rewrite" {
            let Some(path) = args.next() else {
                eprintln!("usage: graphml_dump rewrite <graphml>");
                std::process::exit(2);
            };
            return run_rewrite(PathBuf::from(path));
        }

        run_json(PathBuf::from(first))
    }

    pub fn main() {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Warn)
            .parse_default_env()
            .init();

        if let Err(err) = run() {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    }
}

#[cfg(feature = "dump")]
fn main() {
    real::main();
}

#[cfg(not(feature = "dump"))]
fn main() {
    eprintln!("graphml_dump requires `--features dump`");
    std::process::exit(2);
}
