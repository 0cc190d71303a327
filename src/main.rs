//! Command-line wrapper around the compilation pipeline.
//!
//! `manoc [-O] <source_file> [<object_file>]` – reads the source, compiles it
//! (optimized when `-O` is given), and writes the assembly listing to the
//! object file, defaulting to `out.txt`.

use std::env;
use std::fs;
use std::process;

use manoc::compile;

fn main() {
  let args: Vec<String> = env::args().skip(1).collect();

  let (optimize, files) = match args.first().map(String::as_str) {
    Some("-O") => (true, &args[1..]),
    _ => (false, &args[..]),
  };

  let (source_file, object_file) = match files {
    [source] => (source.as_str(), "out.txt"),
    [source, object] => (source.as_str(), object.as_str()),
    _ => {
      eprintln!("usage: manoc [-O] <source_file> [<object_file>]");
      process::exit(1);
    }
  };

  let source = match fs::read_to_string(source_file) {
    Ok(source) => source,
    Err(err) => {
      eprintln!("manoc: cannot read {source_file}: {err}");
      process::exit(1);
    }
  };

  let assembly = match compile(&source, optimize) {
    Ok(assembly) => assembly,
    Err(err) => {
      eprintln!("manoc: {err}");
      process::exit(1);
    }
  };

  if let Err(err) = fs::write(object_file, assembly) {
    eprintln!("manoc: cannot write {object_file}: {err}");
    process::exit(1);
  }
}
